//! Physics to render transform sync

use super::state::{Collaborators, SimContext};

/// Copy every live body's transform to its entity and render handle.
///
/// Runs once per frame after the last sub-step. Entities awaiting removal
/// and bodies the physics world no longer knows are skipped. Returns the
/// number of handles updated.
pub fn sync_render(ctx: &mut SimContext, io: &mut Collaborators<'_>) -> usize {
    let mut synced = 0;
    for entity in ctx.registry.iter_mut() {
        if entity.is_pending_removal() {
            continue;
        }
        let (Some(body), Some(handle)) = (entity.body, entity.render) else {
            continue;
        };
        let Some(transform) = io.physics.transform(body) else {
            log::trace!("{} has a stale body, skipping sync", entity.id);
            continue;
        };
        entity.transform = transform;
        io.scene.set_transform(handle, transform.pos, transform.rotation);
        synced += 1;
    }
    synced
}
