//! Transient entities owned by the world.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use outbreak_core::{CosmeticSnapshot, EntityId};
use outbreak_system_beam::Beam;
use outbreak_system_growth_field::GrowthField;

/// Fields, beams and cosmetics alive in the world.
///
/// Destruction is deferred: entities are flagged while systems run and only
/// removed by [`EntityRegistry::sweep`] once the tick finished.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntityRegistry {
    next_id: u32,
    fields: BTreeMap<EntityId, GrowthField>,
    beams: BTreeMap<EntityId, Beam>,
    cosmetics: BTreeMap<EntityId, Vec2>,
    doomed: BTreeSet<EntityId>,
}

impl EntityRegistry {
    fn allocate(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        id
    }

    pub(crate) fn insert_field(&mut self, field: GrowthField) -> EntityId {
        let id = self.allocate();
        let _ = self.fields.insert(id, field);
        id
    }

    pub(crate) fn insert_beam(&mut self, beam: Beam) -> EntityId {
        let id = self.allocate();
        let _ = self.beams.insert(id, beam);
        id
    }

    pub(crate) fn insert_cosmetic(&mut self, position: Vec2) -> EntityId {
        let id = self.allocate();
        let _ = self.cosmetics.insert(id, position);
        id
    }

    /// Flags an entity for removal at the next sweep.
    pub(crate) fn mark_destroyed(&mut self, id: EntityId) {
        let _ = self.doomed.insert(id);
    }

    pub(crate) fn is_marked(&self, id: EntityId) -> bool {
        self.doomed.contains(&id)
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = (EntityId, &GrowthField)> {
        self.fields.iter().map(|(id, field)| (*id, field))
    }

    pub(crate) fn fields_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut GrowthField)> {
        self.fields.iter_mut().map(|(id, field)| (*id, field))
    }

    pub(crate) fn beams(&self) -> impl Iterator<Item = (EntityId, &Beam)> {
        self.beams.iter().map(|(id, beam)| (*id, beam))
    }

    pub(crate) fn beams_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut Beam)> {
        self.beams.iter_mut().map(|(id, beam)| (*id, beam))
    }

    /// Cosmetics not yet flagged for removal.
    pub(crate) fn cosmetics(&self) -> Vec<CosmeticSnapshot> {
        self.cosmetics
            .iter()
            .filter(|(id, _)| !self.doomed.contains(*id))
            .map(|(id, position)| CosmeticSnapshot {
                entity: *id,
                position: *position,
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.fields.len() + self.beams.len() + self.cosmetics.len()
    }

    /// Removes every flagged entity and returns how many were dropped.
    pub(crate) fn sweep(&mut self) -> usize {
        let mut removed = 0;
        for id in std::mem::take(&mut self.doomed) {
            let dropped = self.fields.remove(&id).is_some()
                || self.beams.remove(&id).is_some()
                || self.cosmetics.remove(&id).is_some();
            if dropped {
                removed += 1;
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_only_drops_flagged_entities() {
        let mut registry = EntityRegistry::default();
        let kept = registry.insert_cosmetic(Vec2::new(1.0, 1.0));
        let doomed = registry.insert_cosmetic(Vec2::new(2.0, 2.0));
        assert_ne!(kept, doomed);

        registry.mark_destroyed(doomed);
        assert!(registry.is_marked(doomed));
        assert_eq!(registry.cosmetics().len(), 1);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.sweep(), 1);
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_marked(doomed));
        assert_eq!(registry.sweep(), 0);
    }
}
