//! Fixed-capacity entity pools, one per registered template.
//!
//! Every entity lives in a single slot vector so handles are plain
//! generational indices. Each template owns a disjoint set of slots and a
//! free list over them; nothing is allocated after warm-up.

use crate::entity::OrganismEntity;
use crate::prefab::OrganismPrefab;
use cellsim_core::{EntityId, Error, Result, TemplateId};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct TemplatePool {
    prefab: Arc<OrganismPrefab>,
    slots: Vec<u32>,
    free: Vec<u32>,
}

#[derive(Debug, Default)]
pub struct EntityArena {
    entities: Vec<OrganismEntity>,
    pools: HashMap<TemplateId, TemplatePool>,
    order: Vec<TemplateId>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Warm up `capacity` pooled entities for `template`
    pub fn register(
        &mut self,
        template: TemplateId,
        prefab: Arc<OrganismPrefab>,
        capacity: usize,
        update_delay: f32,
    ) -> Result<()> {
        if self.pools.contains_key(&template) {
            return Err(Error::AlreadyExists(format!("Pool for template {}", template)));
        }

        let mut slots = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            let index = self.entities.len() as u32;
            self.entities
                .push(OrganismEntity::new(index, template, prefab.clone(), update_delay));
            slots.push(index);
        }
        let free = slots.iter().rev().copied().collect();
        self.pools.insert(template, TemplatePool { prefab, slots, free });
        self.order.push(template);
        Ok(())
    }

    pub fn has_pool(&self, template: TemplateId) -> bool {
        self.pools.contains_key(&template)
    }

    /// Templates in registration order
    pub fn templates(&self) -> &[TemplateId] {
        &self.order
    }

    pub fn prefab(&self, template: TemplateId) -> Option<&Arc<OrganismPrefab>> {
        self.pools.get(&template).map(|pool| &pool.prefab)
    }

    pub fn capacity(&self, template: TemplateId) -> usize {
        self.pools.get(&template).map_or(0, |pool| pool.slots.len())
    }

    pub fn free_count(&self, template: TemplateId) -> usize {
        self.pools.get(&template).map_or(0, |pool| pool.free.len())
    }

    pub fn active_count(&self, template: TemplateId) -> usize {
        self.capacity(template) - self.free_count(template)
    }

    /// Claim a free slot; `None` for an unknown template or an exhausted pool
    pub(crate) fn acquire(&mut self, template: TemplateId) -> Option<u32> {
        self.pools.get_mut(&template)?.free.pop()
    }

    pub(crate) fn give_back(&mut self, index: u32) {
        let Some(entity) = self.entities.get(index as usize) else {
            return;
        };
        if let Some(pool) = self.pools.get_mut(&entity.template()) {
            if !pool.free.contains(&index) {
                pool.free.push(index);
            }
        }
    }

    pub fn slot_count(&self) -> usize {
        self.entities.len()
    }

    pub(crate) fn slot(&self, index: u32) -> Option<&OrganismEntity> {
        self.entities.get(index as usize)
    }

    pub(crate) fn slot_mut(&mut self, index: u32) -> Option<&mut OrganismEntity> {
        self.entities.get_mut(index as usize)
    }

    /// Live entity behind `id`; stale or released handles give `None`
    pub fn get(&self, id: EntityId) -> Option<&OrganismEntity> {
        self.slot(id.index)
            .filter(|entity| entity.id() == id && !entity.is_released())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut OrganismEntity> {
        self.slot_mut(id.index)
            .filter(|entity| entity.id() == id && !entity.is_released())
    }

    /// Entity behind `id` even while it is being released
    pub(crate) fn get_any_mut(&mut self, id: EntityId) -> Option<&mut OrganismEntity> {
        self.slot_mut(id.index).filter(|entity| entity.id() == id)
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    /// Two distinct live entities at once
    pub fn pair_mut(&mut self, a: EntityId, b: EntityId) -> Option<(&mut OrganismEntity, &mut OrganismEntity)> {
        if a.index == b.index || !self.is_alive(a) || !self.is_alive(b) {
            return None;
        }
        let (lo, hi) = (a.index.min(b.index) as usize, a.index.max(b.index) as usize);
        let (left, right) = self.entities.split_at_mut(hi);
        let (first, second) = (&mut left[lo], &mut right[0]);
        if a.index < b.index {
            Some((first, second))
        } else {
            Some((second, first))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrganismEntity> + '_ {
        self.entities.iter().filter(|entity| !entity.is_released())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut OrganismEntity> + '_ {
        self.entities.iter_mut().filter(|entity| !entity.is_released())
    }

    /// Ids of live entities in slot order
    pub fn active_ids(&self) -> Vec<EntityId> {
        self.iter().map(|entity| entity.id()).collect()
    }

    /// Live entities of one template, oldest first
    pub fn active_of(&self, template: TemplateId) -> Vec<EntityId> {
        let mut live: Vec<&OrganismEntity> = self.iter().filter(|e| e.template() == template).collect();
        live.sort_by(|a, b| a.stats.spawn_time().total_cmp(&b.stats.spawn_time()));
        live.into_iter().map(|entity| entity.id()).collect()
    }
}
