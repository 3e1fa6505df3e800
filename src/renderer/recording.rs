//! In-memory scene for headless runs and tests

use std::collections::BTreeMap;

use glam::Vec2;

use super::{RenderHandle, RenderKind, RenderScene};
use crate::error::CollaboratorError;

/// A scene object as last seen by the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneNode {
    pub kind: RenderKind,
    pub pos: Vec2,
    pub rotation: f32,
    /// Number of transform updates received
    pub updates: u32,
}

/// Scene that stores nodes in a map instead of drawing them
#[derive(Debug, Clone, Default)]
pub struct RecordingScene {
    nodes: BTreeMap<RenderHandle, SceneNode>,
    next_handle: u32,
    /// Handle creations to reject before succeeding again
    pub fail_next: u32,
    /// Transform updates aimed at handles that no longer exist
    pub stale_updates: u32,
}

impl RecordingScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, handle: RenderHandle) -> Option<&SceneNode> {
        self.nodes.get(&handle)
    }

    pub fn count(&self, kind: RenderKind) -> usize {
        self.nodes.values().filter(|n| n.kind == kind).count()
    }
}

impl RenderScene for RecordingScene {
    fn create_handle(&mut self, kind: RenderKind) -> Result<RenderHandle, CollaboratorError> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(CollaboratorError::RenderHandle(format!(
                "scene refused {kind:?}"
            )));
        }
        let handle = RenderHandle(self.next_handle);
        self.next_handle += 1;
        self.nodes.insert(
            handle,
            SceneNode {
                kind,
                pos: Vec2::ZERO,
                rotation: 0.0,
                updates: 0,
            },
        );
        Ok(handle)
    }

    fn destroy_handle(&mut self, handle: RenderHandle) {
        self.nodes.remove(&handle);
    }

    fn set_transform(&mut self, handle: RenderHandle, pos: Vec2, rotation: f32) {
        match self.nodes.get_mut(&handle) {
            Some(node) => {
                node.pos = pos;
                node.rotation = rotation;
                node.updates += 1;
            }
            None => self.stale_updates += 1,
        }
    }
}
