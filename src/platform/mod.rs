//! Platform abstraction layer
//!
//! Input is exposed as logical actions. The frame driver polls an
//! `InputSource` once per frame into a `FrameInput` snapshot; it never sees
//! raw device events.

use std::collections::BTreeSet;

use glam::Vec2;

/// Logical buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Place a bomb
    Fire,
    /// Leave the title screen
    Start,
    /// Leave a terminal screen
    Restart,
}

/// Logical movement axes, each in [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Input collaborator interface
pub trait InputSource {
    fn axis(&self, axis: Axis) -> f32;
    fn is_held(&self, action: Action) -> bool;
    /// True only during the frame the action went down
    fn just_pressed(&self, action: Action) -> bool;
}

/// Input commands for one frame (deterministic snapshot)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    /// Desired movement direction (length <= 1)
    pub movement: Vec2,
    /// Place a bomb
    pub fire: bool,
    /// Start a round from the title
    pub start: bool,
    /// Return to the title from a terminal phase
    pub restart: bool,
}

impl FrameInput {
    /// Sample an input source once
    pub fn poll(source: &dyn InputSource) -> Self {
        let movement = Vec2::new(source.axis(Axis::Horizontal), source.axis(Axis::Vertical))
            .clamp(Vec2::NEG_ONE, Vec2::ONE)
            .clamp_length_max(1.0);
        Self {
            movement,
            fire: source.just_pressed(Action::Fire),
            start: source.just_pressed(Action::Start),
            restart: source.just_pressed(Action::Restart),
        }
    }

    /// Same input with the one-shot actions cleared (used after the first substep)
    pub fn held_only(&self) -> Self {
        Self {
            movement: self.movement,
            ..Self::default()
        }
    }
}

/// Input state fed by the host (or a script) between frames
#[derive(Debug, Clone, Default)]
pub struct InputState {
    axes: Vec2,
    held: BTreeSet<Action>,
    pressed: BTreeSet<Action>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_axes(&mut self, axes: Vec2) {
        self.axes = axes;
    }

    /// Button goes down (registers a press if it was up)
    pub fn press(&mut self, action: Action) {
        if self.held.insert(action) {
            self.pressed.insert(action);
        }
    }

    pub fn release(&mut self, action: Action) {
        self.held.remove(&action);
    }

    /// Press and release within the same frame
    pub fn tap(&mut self, action: Action) {
        self.press(action);
        self.release(action);
    }

    /// Forget this frame's presses; call after the frame has polled
    pub fn end_frame(&mut self) {
        self.pressed.clear();
    }
}

impl InputSource for InputState {
    fn axis(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Horizontal => self.axes.x,
            Axis::Vertical => self.axes.y,
        }
    }

    fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    fn just_pressed(&self, action: Action) -> bool {
        self.pressed.contains(&action)
    }
}
