//! Timed spawning, division and population limits.

use crate::energy::EnergySource;
use crate::events::ReleaseCause;
use crate::schedule::PeriodicTask;
use crate::world::World;
use cellsim_core::{heading, EnergySourceConfig, EntityId, SpawnerConfig, TemplateId, Vec2};
use rand::Rng;
use std::collections::HashMap;
use tracing::debug;

/// Fallback share when the composed stats carry none
const DEFAULT_ENERGY_SHARE: f32 = 0.5;

fn random_position(world: &mut World, margin: f32) -> Vec2 {
    let bounds = world.bounds;
    let (lo, hi) = (bounds.min + Vec2::new(margin, margin), bounds.max - Vec2::new(margin, margin));
    let x = if hi.x > lo.x { world.rng.gen_range(lo.x..hi.x) } else { bounds.center().x };
    let y = if hi.y > lo.y { world.rng.gen_range(lo.y..hi.y) } else { bounds.center().y };
    Vec2::new(x, y)
}

fn random_heading(world: &mut World) -> Vec2 {
    heading(world.rng.gen_range(0.0..360.0))
}

/// Keeps one template's population topped up on a fixed cadence
#[derive(Debug, Clone)]
pub struct OrganismTemplateSpawner {
    template: TemplateId,
    config: SpawnerConfig,
    task: PeriodicTask,
}

impl OrganismTemplateSpawner {
    pub fn new(template: TemplateId, config: SpawnerConfig) -> Self {
        Self {
            template,
            task: PeriodicTask::new(config.spawn_delay),
            config,
        }
    }

    pub fn template(&self) -> TemplateId {
        self.template
    }

    /// Spawn the initial batch and start the timer
    pub fn start(&mut self, world: &mut World) -> usize {
        let spawned = self.spawn_batch(world, self.config.initial_count);
        if self.config.spawn_delay > 0.0 {
            self.task.start();
        }
        spawned
    }

    pub fn update(&mut self, world: &mut World, dt: f32) -> usize {
        let firings = self.task.advance(dt);
        (0..firings)
            .map(|_| self.spawn_batch(world, self.config.spawn_count))
            .sum()
    }

    fn spawn_batch(&self, world: &mut World, count: usize) -> usize {
        let mut spawned = 0;
        for _ in 0..count {
            if world.population(self.template) >= self.config.population_cap {
                break;
            }
            let position = random_position(world, 1.0);
            let heading = random_heading(world);
            if world.spawn(self.template, position, heading).is_none() {
                break;
            }
            spawned += 1;
        }
        spawned
    }
}

/// Turns division requests into children and culls over-cap templates
#[derive(Debug, Clone, Default)]
pub struct OrganismEntitySpawner {
    caps: HashMap<TemplateId, usize>,
}

impl OrganismEntitySpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cap(&mut self, template: TemplateId, cap: usize) {
        self.caps.insert(template, cap);
    }

    pub fn cap(&self, template: TemplateId) -> usize {
        self.caps.get(&template).copied().unwrap_or(usize::MAX)
    }

    /// Handle queued divisions, then cull; returns the children born
    pub fn process(&mut self, world: &mut World) -> Vec<EntityId> {
        let children = world
            .take_divisions()
            .into_iter()
            .filter_map(|parent| self.divide(world, parent))
            .collect();
        self.cull(world);
        children
    }

    fn divide(&self, world: &mut World, parent: EntityId) -> Option<EntityId> {
        let entity = world.entity(parent)?;
        let template = entity.template();
        let (position, radius) = (entity.position, entity.radius());
        let capacity = entity.stats.energy_capacity;
        let share = match entity.stats.energy_share {
            s if s > 0.0 && s < 1.0 => s,
            _ => DEFAULT_ENERGY_SHARE,
        };

        let child = if world.population(template) < self.cap(template) {
            let heading = random_heading(world);
            world.spawn_from(template, position + heading * (radius * 2.0), heading, Some(parent))
        } else {
            None
        };

        let entity = world.entity_mut(parent)?;
        entity.stats.unlock_energy();
        let child = child?;
        entity.stats.set_energy(capacity * (1.0 - share));
        if let Some(offspring) = world.entity_mut(child) {
            offspring.stats.set_energy(capacity * share);
        }
        debug!(parent = %parent, child = %child, event = "organism_divide", "Organism divided");
        Some(child)
    }

    /// Release the oldest organisms of any template above its cap
    pub fn cull(&self, world: &mut World) -> usize {
        let mut culled = 0;
        for template in world.entities().templates().to_vec() {
            let cap = self.cap(template);
            let live = world.entities().active_of(template);
            if live.len() <= cap {
                continue;
            }
            for id in live.into_iter().take(world.population(template) - cap) {
                if world.release(id, ReleaseCause::Culled) {
                    culled += 1;
                }
            }
        }
        culled
    }
}

/// Scatters energy sources, cycling through the configured kinds
#[derive(Debug, Clone)]
pub struct EnergySourceSpawner {
    config: EnergySourceConfig,
    task: PeriodicTask,
    next_kind: usize,
}

impl EnergySourceSpawner {
    pub fn new(config: EnergySourceConfig) -> Self {
        Self {
            task: PeriodicTask::new(config.spawn_delay),
            config,
            next_kind: 0,
        }
    }

    pub fn start(&mut self, world: &mut World) -> usize {
        let spawned = (0..self.config.initial_count)
            .take_while(|_| self.spawn_one(world))
            .count();
        if self.config.spawn_delay > 0.0 {
            self.task.start();
        }
        spawned
    }

    pub fn update(&mut self, world: &mut World, dt: f32) -> usize {
        let firings = self.task.advance(dt);
        (0..firings).filter(|_| self.spawn_one(world)).count()
    }

    /// Spawn one source; false when there is no kind or no free slot
    fn spawn_one(&mut self, world: &mut World) -> bool {
        if self.config.kinds.is_empty() || world.sources.len() >= self.config.capacity {
            return false;
        }
        let kind = self.config.kinds[self.next_kind % self.config.kinds.len()];
        let position = random_position(world, self.config.radius);
        let source = EnergySource {
            kind,
            energy: self.config.energy,
            radius: self.config.radius,
            position,
            ignore_match: false,
        };
        if world.sources.spawn(source).is_none() {
            return false;
        }
        self.next_kind = (self.next_kind + 1) % self.config.kinds.len();
        true
    }
}
