//! Physics collaborator interface and the bundled kinematic world
//!
//! The simulation treats bodies as opaque handles: it creates and removes
//! them, requests velocities, reads transforms back, steps the world with a
//! fixed dt, and pulls the contacts of the last step.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::CONTACT_SLOP;
use crate::error::CollaboratorError;
use crate::heading;

/// Opaque physics body reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(u32);

/// Position and orientation of a body
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub pos: Vec2,
    /// Heading in radians
    pub rotation: f32,
}

impl Transform {
    pub fn at(pos: Vec2) -> Self {
        Self { pos, rotation: 0.0 }
    }
}

/// Collision shape of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Box { half_extents: Vec2 },
}

/// Body creation parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub shape: Shape,
    /// Zero mass makes the body static
    pub mass: f32,
    pub position: Vec2,
    /// Sensors report contacts but never block
    pub sensor: bool,
}

impl BodyDesc {
    #[inline]
    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }
}

/// One overlapping pair reported by a step. `b == None` is the arena boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawContact {
    pub a: BodyHandle,
    pub b: Option<BodyHandle>,
    pub point: Vec2,
    /// Points from `b` toward `a`
    pub normal: Vec2,
}

/// Physics collaborator
pub trait PhysicsWorld {
    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, CollaboratorError>;
    /// Returns false if the body was already gone
    fn remove_body(&mut self, body: BodyHandle) -> bool;
    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2);
    fn transform(&self, body: BodyHandle) -> Option<Transform>;
    fn step(&mut self, dt: f32);
    /// Contacts produced by the most recent step(s), in report order
    fn drain_contacts(&mut self) -> Vec<RawContact>;
    fn body_count(&self) -> usize;
}

#[derive(Debug, Clone)]
struct Body {
    desc: BodyDesc,
    pos: Vec2,
    vel: Vec2,
    rotation: f32,
}

impl Body {
    fn is_dynamic(&self) -> bool {
        !self.desc.is_static()
    }
}

/// Overlap between two shapes
#[derive(Debug, Clone, Copy)]
struct Overlap {
    point: Vec2,
    /// Points from the second shape toward the first
    normal: Vec2,
    penetration: f32,
}

/// Small deterministic world: circles and axis-aligned boxes, no rotation
/// dynamics. Solid dynamic bodies are pushed out of solid static ones.
#[derive(Debug, Clone, Default)]
pub struct KinematicWorld {
    bodies: BTreeMap<BodyHandle, Body>,
    next_handle: u32,
    /// Axis-aligned play area (min, max)
    bounds: Option<(Vec2, Vec2)>,
    contacts: Vec<RawContact>,
    /// Creation fails once this many bodies exist
    capacity: Option<usize>,
}

impl KinematicWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// World whose dynamic bodies are confined to a box centred on the origin
    pub fn with_bounds(half_extents: Vec2) -> Self {
        Self {
            bounds: Some((-half_extents, half_extents)),
            ..Self::default()
        }
    }

    /// Limit the number of live bodies (creation beyond it fails)
    pub fn with_capacity_limit(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    fn integrate(&mut self, dt: f32) {
        for body in self.bodies.values_mut().filter(|b| b.is_dynamic()) {
            body.pos += body.vel * dt;
            if body.vel.length_squared() > 1e-6 {
                body.rotation = heading(body.vel);
            }
        }
    }

    /// Push solid dynamic circles out of solid static boxes
    fn resolve_solids(&mut self) {
        let walls: Vec<(Vec2, Vec2)> = self
            .bodies
            .values()
            .filter(|b| !b.is_dynamic() && !b.desc.sensor)
            .filter_map(|b| match b.desc.shape {
                Shape::Box { half_extents } => Some((b.pos, half_extents)),
                Shape::Circle { .. } => None,
            })
            .collect();

        for body in self.bodies.values_mut() {
            if !body.is_dynamic() || body.desc.sensor {
                continue;
            }
            let Shape::Circle { radius } = body.desc.shape else {
                continue;
            };
            for &(center, half) in &walls {
                if let Some(hit) = circle_box(body.pos, radius, center, half, 0.0) {
                    if hit.penetration > 0.0 {
                        body.pos += hit.normal * hit.penetration;
                        let into = body.vel.dot(hit.normal);
                        if into < 0.0 {
                            body.vel -= hit.normal * into;
                        }
                    }
                }
            }
        }
    }

    /// Confine dynamic bodies to the bounds, reporting a boundary contact
    fn resolve_bounds(&mut self) {
        let Some((min, max)) = self.bounds else {
            return;
        };
        for (&handle, body) in self.bodies.iter_mut() {
            if !body.is_dynamic() {
                continue;
            }
            let extent = match body.desc.shape {
                Shape::Circle { radius } => Vec2::splat(radius),
                Shape::Box { half_extents } => half_extents,
            };
            let lo = min + extent;
            let hi = max - extent;
            let clamped = body.pos.clamp(lo, hi);
            if clamped != body.pos {
                let push = clamped - body.pos;
                // Built per axis so a face contact gets an exact unit normal
                let normal = Vec2::new(axis_sign(push.x), axis_sign(push.y)).normalize_or_zero();
                self.contacts.push(RawContact {
                    a: handle,
                    b: None,
                    point: body.pos.clamp(min, max),
                    normal,
                });
                if !body.desc.sensor {
                    body.pos = clamped;
                    let into = body.vel.dot(normal);
                    if into < 0.0 {
                        body.vel -= normal * into;
                    }
                }
            }
        }
    }

    /// Report every overlapping pair once (static-static pairs are skipped)
    fn collect_pairs(&mut self) {
        let bodies: Vec<(BodyHandle, &Body)> = self.bodies.iter().map(|(h, b)| (*h, b)).collect();
        for (i, &(ha, a)) in bodies.iter().enumerate() {
            for &(hb, b) in &bodies[i + 1..] {
                if !a.is_dynamic() && !b.is_dynamic() {
                    continue;
                }
                if let Some(hit) = overlap(a, b) {
                    self.contacts.push(RawContact {
                        a: ha,
                        b: Some(hb),
                        point: hit.point,
                        normal: hit.normal,
                    });
                }
            }
        }
    }
}

impl PhysicsWorld for KinematicWorld {
    fn create_body(&mut self, desc: &BodyDesc) -> Result<BodyHandle, CollaboratorError> {
        if let Some(capacity) = self.capacity {
            if self.bodies.len() >= capacity {
                return Err(CollaboratorError::Body(format!(
                    "world is at capacity ({capacity} bodies)"
                )));
            }
        }
        if !desc.position.is_finite() {
            return Err(CollaboratorError::Body(format!(
                "non-finite position {}",
                desc.position
            )));
        }
        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.bodies.insert(
            handle,
            Body {
                desc: *desc,
                pos: desc.position,
                vel: Vec2::ZERO,
                rotation: 0.0,
            },
        );
        Ok(handle)
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        self.bodies.remove(&body).is_some()
    }

    fn set_velocity(&mut self, body: BodyHandle, velocity: Vec2) {
        if let Some(body) = self.bodies.get_mut(&body) {
            if body.is_dynamic() {
                body.vel = velocity;
            }
        }
    }

    fn transform(&self, body: BodyHandle) -> Option<Transform> {
        self.bodies.get(&body).map(|b| Transform {
            pos: b.pos,
            rotation: b.rotation,
        })
    }

    fn step(&mut self, dt: f32) {
        self.integrate(dt);
        self.resolve_solids();
        self.resolve_bounds();
        self.collect_pairs();
    }

    fn drain_contacts(&mut self) -> Vec<RawContact> {
        std::mem::take(&mut self.contacts)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }
}

fn axis_sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

fn overlap(a: &Body, b: &Body) -> Option<Overlap> {
    match (a.desc.shape, b.desc.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.pos, ra, b.pos, rb)
        }
        (Shape::Circle { radius }, Shape::Box { half_extents }) => {
            circle_box(a.pos, radius, b.pos, half_extents, CONTACT_SLOP)
        }
        (Shape::Box { half_extents }, Shape::Circle { radius }) => {
            circle_box(b.pos, radius, a.pos, half_extents, CONTACT_SLOP).map(|hit| Overlap {
                normal: -hit.normal,
                ..hit
            })
        }
        (Shape::Box { half_extents: ha }, Shape::Box { half_extents: hb }) => {
            box_box(a.pos, ha, b.pos, hb)
        }
    }
}

fn circle_circle(pa: Vec2, ra: f32, pb: Vec2, rb: f32) -> Option<Overlap> {
    let delta = pa - pb;
    let dist = delta.length();
    let reach = ra + rb + CONTACT_SLOP;
    if dist >= reach {
        return None;
    }
    let normal = if dist > 1e-4 { delta / dist } else { Vec2::Y };
    Some(Overlap {
        point: pb + normal * rb,
        normal,
        penetration: ra + rb - dist,
    })
}

/// Circle against an axis-aligned box; normal points from the box to the circle
fn circle_box(p: Vec2, radius: f32, center: Vec2, half: Vec2, slop: f32) -> Option<Overlap> {
    let closest = p.clamp(center - half, center + half);
    let delta = p - closest;
    let dist = delta.length();

    if dist > 1e-4 {
        if dist >= radius + slop {
            return None;
        }
        return Some(Overlap {
            point: closest,
            normal: delta / dist,
            penetration: radius - dist,
        });
    }

    // Centre inside the box: leave through the nearest face
    let local = p - center;
    let gap = half - local.abs();
    let (normal, depth) = if gap.x < gap.y {
        (Vec2::new(local.x.signum(), 0.0), gap.x)
    } else {
        (Vec2::new(0.0, local.y.signum()), gap.y)
    };
    Some(Overlap {
        point: p + normal * depth,
        normal,
        penetration: radius + depth,
    })
}

fn box_box(pa: Vec2, ha: Vec2, pb: Vec2, hb: Vec2) -> Option<Overlap> {
    let delta = pa - pb;
    let gap = (ha + hb) - delta.abs();
    if gap.x <= 0.0 || gap.y <= 0.0 {
        return None;
    }
    let normal = if gap.x < gap.y {
        Vec2::new(delta.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, delta.y.signum())
    };
    Some(Overlap {
        point: (pa + pb) * 0.5,
        normal,
        penetration: gap.x.min(gap.y),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(pos: Vec2, radius: f32) -> BodyDesc {
        BodyDesc {
            shape: Shape::Circle { radius },
            mass: 1.0,
            position: pos,
            sensor: false,
        }
    }

    fn wall(pos: Vec2) -> BodyDesc {
        BodyDesc {
            shape: Shape::Box {
                half_extents: Vec2::splat(16.0),
            },
            mass: 0.0,
            position: pos,
            sensor: false,
        }
    }

    #[test]
    fn test_dynamic_body_moves_and_faces_velocity() {
        let mut world = KinematicWorld::new();
        let body = world.create_body(&circle(Vec2::ZERO, 5.0)).unwrap();
        world.set_velocity(body, Vec2::new(0.0, 60.0));
        world.step(0.5);
        let t = world.transform(body).unwrap();
        assert_eq!(t.pos, Vec2::new(0.0, 30.0));
        assert!((t.rotation - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_static_body_ignores_velocity() {
        let mut world = KinematicWorld::new();
        let body = world.create_body(&wall(Vec2::ZERO)).unwrap();
        world.set_velocity(body, Vec2::X * 100.0);
        world.step(1.0);
        assert_eq!(world.transform(body).unwrap().pos, Vec2::ZERO);
    }

    #[test]
    fn test_solid_circle_is_pushed_out_of_wall() {
        let mut world = KinematicWorld::new();
        let wall = world.create_body(&wall(Vec2::new(32.0, 0.0))).unwrap();
        let ball = world.create_body(&circle(Vec2::ZERO, 10.0)).unwrap();
        world.set_velocity(ball, Vec2::X * 120.0);
        world.step(0.1);

        let pos = world.transform(ball).unwrap().pos;
        assert!(pos.x <= 6.0 + 1e-3, "ball penetrated wall: {pos}");

        // Touching the wall still reports one contact for the pair
        let contacts = world.drain_contacts();
        assert_eq!(contacts.len(), 1);
        let c = contacts[0];
        assert!(c.a == wall || c.b == Some(wall));
        assert!(world.drain_contacts().is_empty());
    }

    #[test]
    fn test_sensor_passes_through_and_reports() {
        let mut world = KinematicWorld::new();
        world.create_body(&wall(Vec2::new(20.0, 0.0))).unwrap();
        let shot = world
            .create_body(&BodyDesc {
                sensor: true,
                ..circle(Vec2::ZERO, 2.0)
            })
            .unwrap();
        world.set_velocity(shot, Vec2::X * 100.0);
        world.step(0.1);
        let pos = world.transform(shot).unwrap().pos;
        assert!((pos - Vec2::new(10.0, 0.0)).length() < 1e-4);
        assert_eq!(world.drain_contacts().len(), 1);
    }

    #[test]
    fn test_static_pairs_are_not_reported() {
        let mut world = KinematicWorld::new();
        world.create_body(&wall(Vec2::ZERO)).unwrap();
        world.create_body(&wall(Vec2::new(8.0, 0.0))).unwrap();
        world.step(0.1);
        assert!(world.drain_contacts().is_empty());
    }

    #[test]
    fn test_bounds_clamp_and_report() {
        let mut world = KinematicWorld::with_bounds(Vec2::splat(50.0));
        let ball = world.create_body(&circle(Vec2::ZERO, 5.0)).unwrap();
        world.set_velocity(ball, Vec2::X * 100.0);
        world.step(1.0);
        assert_eq!(world.transform(ball).unwrap().pos, Vec2::new(45.0, 0.0));
        let contacts = world.drain_contacts();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].b, None);
        assert_eq!(contacts[0].normal, Vec2::NEG_X);
    }

    #[test]
    fn test_corner_bounds_normal_is_diagonal() {
        let mut world = KinematicWorld::with_bounds(Vec2::splat(50.0));
        let ball = world.create_body(&circle(Vec2::ZERO, 5.0)).unwrap();
        world.set_velocity(ball, Vec2::new(100.0, -100.0));
        world.step(1.0);
        assert_eq!(world.transform(ball).unwrap().pos, Vec2::new(45.0, -45.0));
        let contacts = world.drain_contacts();
        assert_eq!(contacts.len(), 1);
        let normal = contacts[0].normal;
        assert!((normal - Vec2::new(-1.0, 1.0).normalize()).length() < 1e-6, "{normal}");
    }

    #[test]
    fn test_capacity_limit_and_removal() {
        let mut world = KinematicWorld::new().with_capacity_limit(1);
        let first = world.create_body(&circle(Vec2::ZERO, 1.0)).unwrap();
        assert!(matches!(
            world.create_body(&circle(Vec2::ONE, 1.0)),
            Err(CollaboratorError::Body(_))
        ));
        assert!(world.remove_body(first));
        assert!(!world.remove_body(first));
        assert_eq!(world.body_count(), 0);
        assert!(world.transform(first).is_none());
    }
}
