//! Shared simulation state and the entity lifecycle.
//!
//! [`World`] owns every pool, the energy sources and the spatial index.
//! Controls receive it mutably through their context, which is how one
//! organism acts on another.

use crate::arena::EntityArena;
use crate::control::{ControlContext, ControlSet};
use crate::energy::EnergySourceSet;
use crate::entity::{Attachment, OrganismEntity};
use crate::events::{ReleaseCause, SimEvent};
use crate::prefab::OrganismPrefab;
use crate::sensor::SensorMode;
use crate::spatial::{BodyRef, Overlap, SpatialIndex, SpatialQuery, SpatialTag};
use cellsim_core::{Bounds, EntityId, OrganismConfig, Result, StatFlags, TemplateId, Vec2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Grid cell edge for the spatial index
const SPATIAL_CELL_SIZE: f32 = 2.0;

/// Result of one [`World::eat`] call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EatOutcome {
    /// A guard refused: dead or locked hunter, gone or attached target
    Ignored,
    /// Ordinary prey; `energy` was queued for digestion
    Consumed { energy: f32 },
    /// Toxic prey; the hunter lost `toxic` energy
    Poisoned { toxic: f32 },
    /// Endobiotic prey now lives at internal `anchor`
    Attached { anchor: usize },
}

pub struct World {
    pub(crate) entities: EntityArena,
    pub sources: EnergySourceSet,
    pub(crate) spatial: SpatialIndex,
    pub bounds: Bounds,
    config: OrganismConfig,
    pub(crate) rng: ChaCha8Rng,
    time: f64,
    events: Vec<SimEvent>,
    divisions: Vec<EntityId>,
}

impl World {
    pub fn new(config: OrganismConfig, bounds: Bounds, source_capacity: usize, seed: u64) -> Self {
        let spatial = SpatialIndex::new(bounds.min, bounds.max, SPATIAL_CELL_SIZE, config.max_spatial_results);
        Self {
            entities: EntityArena::new(),
            sources: EnergySourceSet::new(source_capacity),
            spatial,
            bounds,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            time: 0.0,
            events: Vec::new(),
            divisions: Vec::new(),
        }
    }

    pub fn config(&self) -> &OrganismConfig {
        &self.config
    }

    /// Simulated seconds since the world was created
    pub fn time(&self) -> f64 {
        self.time
    }

    pub(crate) fn advance_time(&mut self, dt: f32) {
        self.time += dt as f64;
    }

    pub fn entities(&self) -> &EntityArena {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&OrganismEntity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut OrganismEntity> {
        self.entities.get_mut(id)
    }

    pub fn is_released(&self, id: EntityId) -> bool {
        !self.entities.is_alive(id)
    }

    pub fn population(&self, template: TemplateId) -> usize {
        self.entities.active_count(template)
    }

    pub fn register_pool(&mut self, template: TemplateId, prefab: Arc<OrganismPrefab>, capacity: usize) -> Result<()> {
        self.entities
            .register(template, prefab, capacity, self.config.update_delay)
    }

    /// Take a pooled entity of `template` and bring it to life.
    ///
    /// Returns `None` when the template has no pool or every slot is in use.
    pub fn spawn(&mut self, template: TemplateId, position: Vec2, forward: Vec2) -> Option<EntityId> {
        self.spawn_from(template, position, forward, None)
    }

    pub(crate) fn spawn_from(
        &mut self,
        template: TemplateId,
        position: Vec2,
        forward: Vec2,
        parent: Option<EntityId>,
    ) -> Option<EntityId> {
        let Some(index) = self.entities.acquire(template) else {
            warn!(template = %template, event = "pool_exhausted", "No free entity for template");
            return None;
        };
        let now = self.time;
        let bounds = self.bounds;
        let entity = self.entities.slot_mut(index)?;
        let position = bounds.clamp(position, entity.radius());
        entity.activate(position, forward, now);
        let id = entity.id();

        self.with_controls(id, 0.0, |set, ctx| set.run_spawn(ctx));

        debug!(entity = %id, template = %template, event = "organism_spawn", "Organism spawned");
        self.events.push(SimEvent::OrganismSpawned {
            entity: id,
            template,
            parent,
        });
        Some(id)
    }

    /// Return an entity to its pool.
    ///
    /// Stale ids are ignored. An entity whose own hooks are running is
    /// marked expired instead and goes at its next behavior update.
    pub fn release(&mut self, id: EntityId, cause: ReleaseCause) -> bool {
        let now = self.time;
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        if entity.busy {
            entity.stats.expire();
            return false;
        }

        let template = entity.template();
        let age = entity.age(now);
        let attachment = entity.attached_to.take();
        entity.stop();

        if let Some(Attachment { host, .. }) = attachment {
            if let Some(host) = self.entities.get_any_mut(host) {
                host.internal.detach(id);
            }
        }

        self.with_controls(id, 0.0, |set, ctx| set.run_despawn(ctx));

        if let Some(entity) = self.entities.slot_mut(id.index) {
            entity.retire();
        }
        self.entities.give_back(id.index);

        debug!(entity = %id, template = %template, cause = %cause, event = "organism_release", "Organism released");
        self.events.push(SimEvent::OrganismReleased {
            entity: id,
            template,
            cause,
            age,
        });
        true
    }

    /// Release every live entity with `cause`
    pub fn clear(&mut self, cause: ReleaseCause) -> usize {
        self.entities
            .active_ids()
            .into_iter()
            .filter(|id| self.release(*id, cause))
            .count()
    }

    /// `hunter` consumes `target`.
    ///
    /// Endobiotic prey moves into the hunter's next internal anchor and
    /// survives. Toxic prey costs a non-immune hunter its toxic value.
    /// Ordinary prey queues its energy for digestion. Every branch except
    /// the endobiotic one releases the prey.
    pub fn eat(&mut self, hunter: EntityId, target: EntityId) -> EatOutcome {
        if hunter == target {
            return EatOutcome::Ignored;
        }
        let Some(predator) = self.entities.get(hunter) else {
            return EatOutcome::Ignored;
        };
        if predator.stats.is_energy_locked() || predator.stats.energy() <= 0.0 {
            return EatOutcome::Ignored;
        }
        let immune = predator.stats.has_flag(StatFlags::TOXIC_IMMUNITY);
        let Some(prey) = self.entities.get(target) else {
            return EatOutcome::Ignored;
        };
        if prey.is_attached() {
            return EatOutcome::Ignored;
        }
        let endobiotic = prey.stats.has_flag(StatFlags::ENDOBIOTIC);
        let toxic = prey.stats.toxic;
        let energy = prey.stats.energy();

        if endobiotic {
            return self.attach(hunter, target);
        }

        if toxic > 0.0 && !immune {
            if let Some(predator) = self.entities.get_mut(hunter) {
                predator.stats.add_energy(-toxic);
            }
            self.release(target, ReleaseCause::Eaten);
            debug!(hunter = %hunter, target = %target, toxic, event = "organism_poisoned", "Ate toxic prey");
            return EatOutcome::Poisoned { toxic };
        }

        if let Some(predator) = self.entities.get_mut(hunter) {
            predator.stats.add_energy_consume(energy);
        }
        self.release(target, ReleaseCause::Eaten);
        EatOutcome::Consumed { energy }
    }

    fn attach(&mut self, hunter: EntityId, target: EntityId) -> EatOutcome {
        let Some(host) = self.entities.get_mut(hunter) else {
            return EatOutcome::Ignored;
        };
        let Some(anchor) = host.internal.attach(target) else {
            return EatOutcome::Ignored;
        };
        let position = host.position + host.internal.offset(anchor);

        if let Some(guest) = self.entities.get_mut(target) {
            guest.attached_to = Some(Attachment { host: hunter, anchor });
            guest.physics_locked = true;
            guest.velocity.clear();
            guest.contacts.clear();
            guest.position = position;
        }

        debug!(host = %hunter, guest = %target, anchor, event = "endobiont_attach", "Endobiont attached");
        self.events.push(SimEvent::EndobiontAttached {
            host: hunter,
            guest: target,
            anchor,
        });
        EatOutcome::Attached { anchor }
    }

    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn take_divisions(&mut self) -> Vec<EntityId> {
        std::mem::take(&mut self.divisions)
    }

    /// Re-index live organisms and energy sources
    pub fn rebuild_spatial(&mut self) {
        self.spatial.clear();
        for entity in self.entities.iter() {
            if entity.is_attached() {
                continue;
            }
            self.spatial.insert(Overlap {
                tag: SpatialTag::Organism,
                body: BodyRef::Entity(entity.id()),
                position: entity.position,
                radius: entity.radius(),
            });
        }
        for (id, source) in self.sources.iter() {
            self.spatial.insert(Overlap {
                tag: SpatialTag::Energy,
                body: BodyRef::Source(id),
                position: source.position,
                radius: source.radius,
            });
        }
    }

    /// Recompute every entity's touching organisms from the spatial index
    pub fn refresh_contacts(&mut self) {
        let margin = self.config.contact_margin;
        let mut hits = Vec::new();
        for index in 0..self.entities.slot_count() as u32 {
            let Some(entity) = self.entities.slot(index) else {
                continue;
            };
            if entity.is_released() {
                continue;
            }
            let (id, position, radius, attached) = (entity.id(), entity.position, entity.radius(), entity.is_attached());

            let mut contacts = Vec::new();
            if !attached {
                self.spatial
                    .overlap_circle(position, radius + margin, &[SpatialTag::Organism], &mut hits);
                contacts.extend(hits.iter().filter_map(|hit| match hit.body {
                    BodyRef::Entity(other) if other != id => Some(other),
                    _ => None,
                }));
            }
            if let Some(entity) = self.entities.slot_mut(index) {
                entity.contacts = contacts;
            }
        }
    }

    /// Advance every entity's sensor and behavior tasks by one physics tick
    pub fn run_tasks(&mut self, dt: f32) {
        for index in 0..self.entities.slot_count() as u32 {
            let Some(entity) = self.entities.slot_mut(index) else {
                continue;
            };
            if entity.is_released() {
                continue;
            }
            let id = entity.id();

            let scans = entity.sensor.advance(dt);
            for _ in 0..scans {
                if !self.entities.is_alive(id) {
                    break;
                }
                self.sensor_update(id);
            }

            let firings = match self.entities.get_mut(id) {
                Some(entity) => entity.update_task.advance(dt),
                None => 0,
            };
            for _ in 0..firings {
                if !self.entities.is_alive(id) {
                    break;
                }
                self.behavior_update(id);
            }
        }
    }

    /// One sensor firing: scan, then notify the sensor subscribers
    pub fn sensor_update(&mut self, id: EntityId) -> SensorMode {
        let Some(entity) = self.entities.get_mut(id) else {
            return SensorMode::None;
        };
        if entity.is_attached() {
            return SensorMode::None;
        }
        let position = entity.position;
        let mode = entity
            .sensor
            .scan(id, position, &entity.stats, &self.spatial, &self.sources);
        let delay = entity.sensor.settings().delay;
        trace!(
            entity = %id,
            mode = ?mode,
            energy = entity.sensor.energy().len(),
            organisms = entity.sensor.organisms().len(),
            "Sensor refreshed"
        );

        self.with_controls(id, delay, |set, ctx| set.run_sensor(mode, ctx));
        mode
    }

    /// One behavior firing: digest, die, feed, divide, then run update hooks
    pub fn behavior_update(&mut self, id: EntityId) {
        let dt = self.config.update_delay;
        let now = self.time;
        let Some(entity) = self.entities.get_mut(id) else {
            return;
        };

        entity.stats.energy_update(dt);
        if entity.stats.is_life_expired(now) {
            self.release(id, ReleaseCause::Expired);
            return;
        }
        let stats = &entity.stats;
        if stats.energy() <= 0.0 && stats.energy_consume() <= 0.0 && !stats.is_energy_locked() {
            self.release(id, ReleaseCause::Starved);
            return;
        }
        if entity.is_attached() {
            return;
        }

        self.feed(id);

        if let Some(entity) = self.entities.get_mut(id) {
            let stats = &mut entity.stats;
            if stats.is_energy_full() && !stats.is_energy_locked() && !stats.has_flag(StatFlags::DIVIDE_LOCKED) {
                stats.lock_energy();
                self.divisions.push(id);
            }
        }

        self.with_controls(id, dt, |set, ctx| set.run_update(ctx));
    }

    /// Absorb overlapping energy sources the organism can digest
    fn feed(&mut self, id: EntityId) {
        let Some(entity) = self.entities.get(id) else {
            return;
        };
        let mut hits = Vec::new();
        self.spatial
            .overlap_circle(entity.position, entity.radius(), &[SpatialTag::Energy], &mut hits);

        for hit in hits {
            let BodyRef::Source(source_id) = hit.body else {
                continue;
            };
            let Some(entity) = self.entities.get(id) else {
                return;
            };
            let edible = self
                .sources
                .get(source_id)
                .is_some_and(|source| entity.stats.energy_match(source.kind, source.ignore_match));
            if !edible {
                continue;
            }
            if let Some(source) = self.sources.release(source_id) {
                if let Some(entity) = self.entities.get_mut(id) {
                    entity.stats.add_energy_consume(source.energy);
                }
            }
        }
    }

    /// Check the entity's controls out, run `hooks`, and put them back
    fn with_controls(
        &mut self,
        id: EntityId,
        dt: f32,
        hooks: impl FnOnce(&mut ControlSet, &mut ControlContext<'_>),
    ) {
        let Some(entity) = self.entities.get_any_mut(id) else {
            return;
        };
        if entity.busy {
            return;
        }
        entity.busy = true;
        let mut set = std::mem::take(&mut entity.controls);

        let mut ctx = ControlContext::new(id, self, dt);
        hooks(&mut set, &mut ctx);

        if let Some(entity) = self.entities.slot_mut(id.index) {
            entity.controls = set;
            entity.busy = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use cellsim_core::EnergyKind;

    fn world() -> (World, TemplateId, TemplateId) {
        let registry = catalog::default_registry().unwrap();
        let grazer = catalog::grazer_template(&registry).unwrap();
        let hunter = catalog::hunter_template(&registry).unwrap();
        let mut world = World::new(OrganismConfig::default(), Bounds::centered(20.0, 20.0), 16, 7);
        for (name, template) in [("grazer", &grazer), ("hunter", &hunter)] {
            let prefab = Arc::new(OrganismPrefab::create(name, template, &registry).unwrap());
            world.register_pool(template.id, prefab, 4).unwrap();
        }
        (world, grazer.id, hunter.id)
    }

    #[test]
    fn test_spawn_resets_state() {
        let (mut world, grazer, _) = world();
        let id = world.spawn(grazer, Vec2::new(1.0, 2.0), Vec2::new(1.0, 0.0)).unwrap();
        let entity = world.entity(id).unwrap();
        assert_eq!(entity.stats.energy(), entity.stats.energy_capacity * 0.5);
        assert_eq!(entity.position, Vec2::new(1.0, 2.0));
        assert_eq!(entity.control_count(), entity.definitions().len());
        assert!(matches!(
            world.drain_events().as_slice(),
            [SimEvent::OrganismSpawned { parent: None, .. }]
        ));
    }

    #[test]
    fn test_spawn_fails_when_pool_exhausted() {
        let (mut world, grazer, _) = world();
        for _ in 0..4 {
            assert!(world.spawn(grazer, Vec2::ZERO, Vec2::Y).is_some());
        }
        assert!(world.spawn(grazer, Vec2::ZERO, Vec2::Y).is_none());
        assert!(world.spawn(TemplateId(404), Vec2::ZERO, Vec2::Y).is_none());
    }

    #[test]
    fn test_release_recycles_slot() {
        let (mut world, grazer, _) = world();
        let id = world.spawn(grazer, Vec2::ZERO, Vec2::Y).unwrap();
        assert!(world.release(id, ReleaseCause::Cleared));
        assert!(world.is_released(id));
        assert!(!world.release(id, ReleaseCause::Cleared));

        let again = world.spawn(grazer, Vec2::ZERO, Vec2::Y).unwrap();
        assert_eq!(again.index, id.index);
        assert_ne!(again.generation, id.generation);
    }

    #[test]
    fn test_eat_ordinary_prey_defers_energy() {
        let (mut world, grazer, hunter) = world();
        let h = world.spawn(hunter, Vec2::ZERO, Vec2::Y).unwrap();
        let g = world.spawn(grazer, Vec2::new(1.0, 0.0), Vec2::Y).unwrap();
        let prey_energy = world.entity(g).unwrap().stats.energy();
        let before = world.entity(h).unwrap().stats.energy();

        assert_eq!(world.eat(h, g), EatOutcome::Consumed { energy: prey_energy });
        assert!(world.is_released(g));
        let predator = world.entity(h).unwrap();
        assert_eq!(predator.stats.energy_consume(), prey_energy);
        assert_eq!(predator.stats.energy(), before);
    }

    #[test]
    fn test_eat_guards() {
        let (mut world, grazer, hunter) = world();
        let h = world.spawn(hunter, Vec2::ZERO, Vec2::Y).unwrap();
        let g = world.spawn(grazer, Vec2::new(1.0, 0.0), Vec2::Y).unwrap();

        assert_eq!(world.eat(h, h), EatOutcome::Ignored);

        world.entity_mut(h).unwrap().stats.lock_energy();
        assert_eq!(world.eat(h, g), EatOutcome::Ignored);
        assert!(!world.is_released(g));

        world.entity_mut(h).unwrap().stats.unlock_energy();
        world.entity_mut(h).unwrap().stats.set_energy(0.0);
        assert_eq!(world.eat(h, g), EatOutcome::Ignored);

        world.entity_mut(h).unwrap().stats.set_energy(10.0);
        world.release(g, ReleaseCause::Cleared);
        assert_eq!(world.eat(h, g), EatOutcome::Ignored);
    }

    #[test]
    fn test_feed_absorbs_matching_source() {
        let (mut world, grazer, _) = world();
        let id = world.spawn(grazer, Vec2::ZERO, Vec2::Y).unwrap();
        let source = |kind| crate::energy::EnergySource {
            kind: EnergyKind(kind),
            energy: 7.0,
            radius: 0.2,
            position: Vec2::new(0.1, 0.0),
            ignore_match: false,
        };
        let food = world.sources.spawn(source(0)).unwrap();
        let poison = world.sources.spawn(source(9)).unwrap();
        world.rebuild_spatial();

        world.feed(id);
        assert!(!world.sources.contains(food));
        assert!(world.sources.contains(poison));
        assert_eq!(world.entity(id).unwrap().stats.energy_consume(), 7.0);
    }

    #[test]
    fn test_behavior_update_releases_starved() {
        let (mut world, grazer, _) = world();
        let id = world.spawn(grazer, Vec2::ZERO, Vec2::Y).unwrap();
        world.entity_mut(id).unwrap().stats.set_energy(0.0);
        world.drain_events();

        world.behavior_update(id);
        assert!(world.is_released(id));
        assert!(matches!(
            world.drain_events().as_slice(),
            [SimEvent::OrganismReleased { cause: ReleaseCause::Starved, .. }]
        ));
    }

    #[test]
    fn test_full_energy_requests_division() {
        let (mut world, grazer, _) = world();
        let id = world.spawn(grazer, Vec2::ZERO, Vec2::Y).unwrap();
        let entity = world.entity_mut(id).unwrap();
        let capacity = entity.stats.energy_capacity;
        entity.stats.set_energy(capacity);

        world.behavior_update(id);
        assert!(world.entity(id).unwrap().stats.is_energy_locked());
        assert_eq!(world.take_divisions(), vec![id]);
    }

    #[test]
    fn test_contacts_exclude_self_and_far() {
        let (mut world, grazer, _) = world();
        let a = world.spawn(grazer, Vec2::ZERO, Vec2::Y).unwrap();
        let b = world.spawn(grazer, Vec2::new(0.8, 0.0), Vec2::Y).unwrap();
        let c = world.spawn(grazer, Vec2::new(6.0, 0.0), Vec2::Y).unwrap();
        world.rebuild_spatial();
        world.refresh_contacts();

        assert_eq!(world.entity(a).unwrap().contacts, vec![b]);
        assert_eq!(world.entity(b).unwrap().contacts, vec![a]);
        assert!(world.entity(c).unwrap().contacts.is_empty());
    }
}
