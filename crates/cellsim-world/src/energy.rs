//! Energy sources organisms feed on.

use cellsim_core::{EnergyKind, EnergySourceId, Vec2};
use serde::{Deserialize, Serialize};

/// A morsel of food lying in the field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergySource {
    pub kind: EnergyKind,
    pub energy: f32,
    pub radius: f32,
    pub position: Vec2,
    /// Compatible with every organism regardless of its diet
    pub ignore_match: bool,
}

#[derive(Debug, Clone)]
struct SourceSlot {
    generation: u32,
    source: Option<EnergySource>,
}

/// Fixed-capacity pool of energy sources with generational ids
#[derive(Debug, Clone)]
pub struct EnergySourceSet {
    slots: Vec<SourceSlot>,
    free: Vec<u32>,
}

impl EnergySourceSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity)
                .map(|_| SourceSlot {
                    generation: 0,
                    source: None,
                })
                .collect(),
            free: (0..capacity as u32).rev().collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Place a source; `None` when every slot is taken
    pub fn spawn(&mut self, source: EnergySource) -> Option<EnergySourceId> {
        let index = self.free.pop()?;
        let slot = &mut self.slots[index as usize];
        slot.source = Some(source);
        Some(EnergySourceId::new(index, slot.generation))
    }

    pub fn get(&self, id: EnergySourceId) -> Option<&EnergySource> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.source.as_ref()
    }

    pub fn contains(&self, id: EnergySourceId) -> bool {
        self.get(id).is_some()
    }

    /// Remove a source and hand it back; stale ids return `None`
    pub fn release(&mut self, id: EnergySourceId) -> Option<EnergySource> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let source = slot.source.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        Some(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (EnergySourceId, &EnergySource)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            slot.source
                .as_ref()
                .map(|source| (EnergySourceId::new(i as u32, slot.generation), source))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn morsel(x: f32) -> EnergySource {
        EnergySource {
            kind: EnergyKind(0),
            energy: 5.0,
            radius: 0.2,
            position: Vec2::new(x, 0.0),
            ignore_match: false,
        }
    }

    #[test]
    fn test_spawn_until_full() {
        let mut set = EnergySourceSet::new(2);
        assert!(set.spawn(morsel(0.0)).is_some());
        assert!(set.spawn(morsel(1.0)).is_some());
        assert!(set.spawn(morsel(2.0)).is_none());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_release_invalidates_id() {
        let mut set = EnergySourceSet::new(1);
        let id = set.spawn(morsel(0.0)).unwrap();
        assert_eq!(set.release(id).unwrap().energy, 5.0);
        assert!(set.get(id).is_none());
        assert!(set.release(id).is_none());

        let reused = set.spawn(morsel(3.0)).unwrap();
        assert_eq!(reused.index, id.index);
        assert_ne!(reused.generation, id.generation);
        assert!(set.get(id).is_none());
    }

    #[test]
    fn test_iter_skips_empty_slots() {
        let mut set = EnergySourceSet::new(3);
        let a = set.spawn(morsel(0.0)).unwrap();
        set.spawn(morsel(1.0)).unwrap();
        set.release(a);
        assert_eq!(set.iter().count(), 1);
    }
}
