//! Shared pieces of the hunter controls.

use crate::entity::OrganismEntity;
use cellsim_core::{angle_degrees, Vec2};

/// Fixed set of stretch visuals (grab arms, tentacles).
///
/// A slot is either free or owned by exactly one target. The pool never
/// grows past the count it was created with.
#[derive(Debug, Clone)]
pub struct StretchPool<T> {
    slots: Vec<Option<T>>,
}

impl<T> StretchPool<T> {
    pub fn new(count: usize) -> Self {
        Self {
            slots: (0..count).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn free_count(&self) -> usize {
        self.capacity() - self.active_count()
    }

    pub fn has_free(&self) -> bool {
        self.slots.iter().any(|slot| slot.is_none())
    }

    /// Put `value` in the first free slot; hands it back when full
    pub fn claim(&mut self, value: T) -> Result<usize, T> {
        match self.slots.iter().position(|slot| slot.is_none()) {
            Some(i) => {
                self.slots[i] = Some(value);
                Ok(i)
            }
            None => Err(value),
        }
    }

    pub fn release(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index)?.take()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index)?.as_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|value| (i, value)))
    }

    /// Return every active slot to the free set
    pub fn drain(&mut self) -> Vec<T> {
        self.slots.iter_mut().filter_map(Option::take).collect()
    }
}

/// Whether `hunter` may prey on `target` at all
pub fn is_prey(hunter: &OrganismEntity, target: &OrganismEntity) -> bool {
    hunter.id() != target.id()
        && hunter.template() != target.template()
        && !target.is_released()
        && !target.is_attached()
        && hunter.stats.can_eat(&target.stats)
}

/// `offset` lies within the full cone of `angle` degrees around `forward`.
/// An angle of 360 or more accepts every direction.
pub fn in_cone(forward: Vec2, offset: Vec2, angle: f32) -> bool {
    if angle >= 360.0 {
        return true;
    }
    angle_degrees(forward, offset) <= angle * 0.5
}

/// Distance between two circles' edges, never negative
pub fn gap(a: &OrganismEntity, b: &OrganismEntity) -> f32 {
    (a.position.distance(b.position) - a.radius() - b.radius()).max(0.0)
}
