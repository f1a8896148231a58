//! Live organism instances.

use crate::control::ControlSet;
use crate::definition::ComponentDefinition;
use crate::prefab::OrganismPrefab;
use crate::schedule::PeriodicTask;
use crate::sensor::OrganismSensor;
use cellsim_core::{EntityId, OrganismStats, TemplateId, Vec2};
use std::cell::Cell;
use std::sync::Arc;

/// Velocity with a lazily recomputed speed/direction split.
///
/// Writes invalidate the cache; reads of speed or direction rebuild it.
#[derive(Debug, Clone, Default)]
pub struct Velocity {
    value: Vec2,
    cache: Cell<Option<(f32, Vec2)>>,
}

impl Velocity {
    pub fn get(&self) -> Vec2 {
        self.value
    }

    pub fn set(&mut self, value: Vec2) {
        self.value = value;
        self.cache.set(None);
    }

    pub fn add(&mut self, delta: Vec2) {
        self.set(self.value + delta);
    }

    pub fn clear(&mut self) {
        self.set(Vec2::ZERO);
    }

    fn decompose(&self) -> (f32, Vec2) {
        if let Some(cached) = self.cache.get() {
            return cached;
        }
        let speed = self.value.length();
        let dir = self.value.normalize_or_zero();
        self.cache.set(Some((speed, dir)));
        (speed, dir)
    }

    pub fn speed(&self) -> f32 {
        self.decompose().0
    }

    /// Unit direction of travel, zero when stationary
    pub fn direction(&self) -> Vec2 {
        self.decompose().1
    }
}

/// Internal slots where swallowed endobionts live
#[derive(Debug, Clone, Default)]
pub struct InternalAnchors {
    offsets: Vec<Vec2>,
    next: usize,
    guests: Vec<EntityId>,
}

impl InternalAnchors {
    pub fn enable(&mut self, offsets: Vec<Vec2>) {
        self.offsets = offsets;
        self.next = 0;
        self.guests.clear();
    }

    pub fn reset(&mut self) {
        self.offsets.clear();
        self.next = 0;
        self.guests.clear();
    }

    pub fn count(&self) -> usize {
        self.offsets.len()
    }

    pub fn offset(&self, anchor: usize) -> Vec2 {
        self.offsets.get(anchor).copied().unwrap_or(Vec2::ZERO)
    }

    pub fn guests(&self) -> &[EntityId] {
        &self.guests
    }

    /// Take the round-robin anchor for `guest`; `None` without anchors
    pub fn attach(&mut self, guest: EntityId) -> Option<usize> {
        if self.offsets.is_empty() {
            return None;
        }
        let anchor = self.next;
        self.next = (self.next + 1) % self.offsets.len();
        self.guests.push(guest);
        Some(anchor)
    }

    pub fn detach(&mut self, guest: EntityId) {
        self.guests.retain(|g| *g != guest);
    }

    pub fn take_guests(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.guests)
    }
}

/// Host and anchor of an endobiont
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    pub host: EntityId,
    pub anchor: usize,
}

/// One pooled organism
#[derive(Debug)]
pub struct OrganismEntity {
    id: EntityId,
    template: TemplateId,
    prefab: Arc<OrganismPrefab>,
    pub stats: OrganismStats,
    pub position: Vec2,
    /// Unit heading
    pub forward: Vec2,
    pub velocity: Velocity,
    /// Held in place by a predator; the field does not move it
    pub physics_locked: bool,
    released: bool,
    /// Organisms currently touching this one, refreshed every physics tick
    pub contacts: Vec<EntityId>,
    pub sensor: OrganismSensor,
    pub(crate) update_task: PeriodicTask,
    pub internal: InternalAnchors,
    pub attached_to: Option<Attachment>,
    pub(crate) controls: ControlSet,
    /// Controls are checked out for a hook run
    pub(crate) busy: bool,
}

impl OrganismEntity {
    /// Pool warm-up: build the entity and generate its controls once
    pub(crate) fn new(index: u32, template: TemplateId, prefab: Arc<OrganismPrefab>, update_delay: f32) -> Self {
        let controls = ControlSet::generate(&prefab.definitions);
        Self {
            id: EntityId::new(index, 0),
            template,
            stats: prefab.stats.clone(),
            sensor: OrganismSensor::new(prefab.sensor.clone()),
            prefab,
            position: Vec2::ZERO,
            forward: Vec2::Y,
            velocity: Velocity::default(),
            physics_locked: false,
            released: true,
            contacts: Vec::new(),
            update_task: PeriodicTask::new(update_delay),
            internal: InternalAnchors::default(),
            attached_to: None,
            controls,
            busy: false,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn template(&self) -> TemplateId {
        self.template
    }

    pub fn prefab(&self) -> &Arc<OrganismPrefab> {
        &self.prefab
    }

    pub fn definitions(&self) -> &[Arc<ComponentDefinition>] {
        &self.prefab.definitions
    }

    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    pub fn controls(&self) -> &ControlSet {
        &self.controls
    }

    pub fn radius(&self) -> f32 {
        self.prefab.radius
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn is_attached(&self) -> bool {
        self.attached_to.is_some()
    }

    /// Seconds alive at `now`
    pub fn age(&self, now: f64) -> f64 {
        now - self.stats.spawn_time()
    }

    /// Pooled -> Spawning: fresh stats, placement and running tasks
    pub(crate) fn activate(&mut self, position: Vec2, forward: Vec2, now: f64) {
        self.stats.copy_from(&self.prefab.stats);
        self.stats.reset(now);
        self.position = position;
        let forward = forward.normalize_or_zero();
        self.forward = if forward == Vec2::ZERO { Vec2::Y } else { forward };
        self.velocity.clear();
        self.physics_locked = false;
        self.contacts.clear();
        self.internal.reset();
        self.attached_to = None;
        self.released = false;
        self.update_task.start();
        self.sensor.enable();
    }

    /// Despawning: stop both loops before any hook runs
    pub(crate) fn stop(&mut self) {
        self.released = true;
        self.update_task.cancel();
        self.sensor.disable();
    }

    /// Despawned -> Pooled: clear motion and flags, retire the id
    pub(crate) fn retire(&mut self) {
        self.velocity.clear();
        self.physics_locked = false;
        self.contacts.clear();
        self.attached_to = None;
        self.internal.reset();
        self.id = EntityId::new(self.id.index, self.id.generation.wrapping_add(1));
    }
}
