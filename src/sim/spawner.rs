//! Timeline-driven entity spawning
//!
//! Events fire once their trigger time has passed. Repeat groups run as
//! independent sequences so a long group never holds back other events.

use glam::IVec2;
use serde::{Deserialize, Serialize};

use super::entity::{EnemyKind, PickupKind};
use crate::consts::TIME_EPSILON;

/// What a spawn event creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpawnKind {
    Enemy(EnemyKind),
    Pickup(PickupKind),
    Crate,
}

/// Where a spawn event places its entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionRule {
    /// A fixed grid cell
    Cell(IVec2),
    /// Any cell free of obstacles, chosen with the round RNG
    #[default]
    RandomEmpty,
}

/// Fire `count` entities, `interval` seconds apart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Repeat {
    pub count: u32,
    pub interval: f32,
}

/// Declarative timeline entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnEvent {
    /// Round time (seconds) of the first spawn
    pub trigger_time: f32,
    pub kind: SpawnKind,
    #[serde(default)]
    pub position: PositionRule,
    #[serde(default)]
    pub repeat: Option<Repeat>,
    #[serde(skip)]
    fired: bool,
}

impl SpawnEvent {
    pub fn new(trigger_time: f32, kind: SpawnKind, position: PositionRule) -> Self {
        Self {
            trigger_time,
            kind,
            position,
            repeat: None,
            fired: false,
        }
    }

    pub fn with_repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Total number of entities this event produces
    pub fn total_count(&self) -> u32 {
        self.repeat.map_or(1, |r| r.count.max(1))
    }
}

/// One entity the spawner wants created now
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpawnRequest {
    /// Index of the originating event in the timeline
    pub event: usize,
    pub kind: SpawnKind,
    pub position: PositionRule,
    /// Round time at which the request was issued
    pub time: f32,
}

/// The in-flight tail of a repeat group
#[derive(Debug, Clone, Copy, PartialEq)]
struct RepeatSequence {
    event: usize,
    remaining: u32,
    interval: f32,
    next_time: f32,
}

/// Spawn timeline for one round
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    events: Vec<SpawnEvent>,
    sequences: Vec<RepeatSequence>,
    running: bool,
}

impl Spawner {
    pub fn new(events: Vec<SpawnEvent>) -> Self {
        Self {
            events,
            sequences: Vec::new(),
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop issuing requests and drop every pending sequence
    pub fn stop(&mut self) {
        self.running = false;
        self.cancel_all();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Cancel every pending repeat sequence as a unit
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.sequences.len();
        if cancelled > 0 {
            log::debug!("Cancelled {cancelled} pending spawn sequence(s)");
        }
        self.sequences.clear();
        cancelled
    }

    /// Forget fired flags and pending sequences; the spawner is left stopped
    pub fn reset(&mut self) {
        self.stop();
        for event in &mut self.events {
            event.fired = false;
        }
    }

    /// Replace the timeline (round start) and reset
    pub fn reload(&mut self, events: Vec<SpawnEvent>) {
        self.events = events;
        self.reset();
    }

    /// Scheduled repeat sequences still waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.sequences.len()
    }

    pub fn events(&self) -> &[SpawnEvent] {
        &self.events
    }

    /// Every event fired and no sequence is left
    pub fn is_exhausted(&self) -> bool {
        self.sequences.is_empty() && self.events.iter().all(|e| e.fired)
    }

    /// Issue the spawns due at round time `now`
    pub fn update(&mut self, now: f32) -> Vec<SpawnRequest> {
        let mut requests = Vec::new();
        if !self.running {
            return requests;
        }

        // In-flight sequences first, so a sequence opened below waits a full interval
        for seq in &mut self.sequences {
            if seq.remaining > 0 && now + TIME_EPSILON >= seq.next_time {
                let event = &self.events[seq.event];
                requests.push(SpawnRequest {
                    event: seq.event,
                    kind: event.kind,
                    position: event.position,
                    time: now,
                });
                seq.remaining -= 1;
                seq.next_time = seq.next_time.max(now) + seq.interval;
            }
        }
        self.sequences.retain(|seq| seq.remaining > 0);

        for (index, event) in self.events.iter_mut().enumerate() {
            if event.fired || now + TIME_EPSILON < event.trigger_time {
                continue;
            }
            event.fired = true;
            requests.push(SpawnRequest {
                event: index,
                kind: event.kind,
                position: event.position,
                time: now,
            });
            if let Some(repeat) = event.repeat {
                if repeat.count > 1 {
                    self.sequences.push(RepeatSequence {
                        event: index,
                        remaining: repeat.count - 1,
                        interval: repeat.interval,
                        next_time: event.trigger_time.max(now) + repeat.interval,
                    });
                }
            }
        }

        requests
    }
}
