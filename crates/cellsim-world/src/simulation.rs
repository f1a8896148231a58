//! Fixed-step driver tying the field, spawners and entities together.

use crate::events::{ReleaseCause, SimEvent};
use crate::field::OrganismField;
use crate::prefab::PrefabCache;
use crate::registry::ComponentRegistry;
use crate::spawner::{EnergySourceSpawner, OrganismEntitySpawner, OrganismTemplateSpawner};
use crate::template::OrganismTemplate;
use crate::world::World;
use cellsim_core::{Bounds, Error, Result, SimulationConfig, TemplateId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, event, info, instrument, Level};

/// Physics ticks between population snapshots
const SNAPSHOT_INTERVAL: u64 = 500;

/// Summary of a finished (or paused) run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub ticks: u64,
    pub elapsed_seconds: f64,
    /// Live organisms per template name at the end
    pub population: BTreeMap<String, usize>,
    pub spawned: u64,
    pub divisions: u64,
    pub endobionts: u64,
    /// Releases per cause
    pub releases: BTreeMap<String, u64>,
    /// Longest life among released and surviving organisms
    pub longest_survival_seconds: f64,
}

impl SimulationResult {
    pub fn total_population(&self) -> usize {
        self.population.values().sum()
    }
}

#[derive(Debug, Default)]
struct Counters {
    spawned: u64,
    divisions: u64,
    endobionts: u64,
    releases: BTreeMap<ReleaseCause, u64>,
    longest_survival: f64,
}

pub struct Simulation {
    config: SimulationConfig,
    registry: Arc<ComponentRegistry>,
    world: World,
    field: OrganismField,
    prefabs: PrefabCache,
    template_spawners: Vec<OrganismTemplateSpawner>,
    entity_spawner: OrganismEntitySpawner,
    energy_spawner: EnergySourceSpawner,
    names: BTreeMap<TemplateId, String>,
    counters: Counters,
    tick: u64,
    started: bool,
}

impl Simulation {
    pub fn new(config: SimulationConfig, registry: Arc<ComponentRegistry>) -> Self {
        let bounds = Bounds::centered(config.field.width, config.field.height);
        let world = World::new(
            config.organism.clone(),
            bounds,
            config.energy_sources.capacity,
            config.seed,
        );
        Self {
            field: OrganismField::from_config(&config.field),
            energy_spawner: EnergySourceSpawner::new(config.energy_sources.clone()),
            registry,
            world,
            prefabs: PrefabCache::new(),
            template_spawners: Vec::new(),
            entity_spawner: OrganismEntitySpawner::new(),
            names: BTreeMap::new(),
            counters: Counters::default(),
            tick: 0,
            started: false,
            config,
        }
    }

    /// Compile `template`, warm up its pool and schedule its spawner.
    ///
    /// Only playable templates are accepted, each id once.
    pub fn add_template(&mut self, name: &str, template: &OrganismTemplate) -> Result<()> {
        if !template.is_playable() {
            return Err(Error::Validation(format!(
                "Template '{}' ({}) is not playable",
                name, template.id
            )));
        }
        if self.names.contains_key(&template.id) {
            return Err(Error::AlreadyExists(format!("Template {}", template.id)));
        }

        let prefab = self.prefabs.get_or_create(name, template, &self.registry)?;
        let spawner_config = self.config.spawner.clone();
        self.world
            .register_pool(template.id, prefab, spawner_config.capacity)?;
        self.entity_spawner
            .set_cap(template.id, spawner_config.population_cap);
        self.template_spawners
            .push(OrganismTemplateSpawner::new(template.id, spawner_config));
        self.names.insert(template.id, name.to_string());

        debug!(template = %template.id, name, "Template registered");
        Ok(())
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Lower or raise a template's population cap; excess is culled next tick
    pub fn set_population_cap(&mut self, template: TemplateId, cap: usize) {
        self.entity_spawner.set_cap(template, cap);
    }

    fn start(&mut self) {
        self.started = true;
        let sources = self.energy_spawner.start(&mut self.world);
        let organisms: usize = self
            .template_spawners
            .iter_mut()
            .map(|spawner| spawner.start(&mut self.world))
            .sum();
        self.drain_events();
        info!(organisms, sources, templates = self.names.len(), "Simulation seeded");
    }

    /// Advance one physics tick
    pub fn step(&mut self) -> Result<()> {
        if !self.started {
            self.start();
        }
        let dt = self.config.organism.fixed_delta;
        self.world.advance_time(dt);

        for spawner in &mut self.template_spawners {
            spawner.update(&mut self.world, dt);
        }
        self.energy_spawner.update(&mut self.world, dt);

        self.field.apply(&mut self.world, dt);
        self.world.rebuild_spatial();
        self.world.refresh_contacts();
        self.world.run_tasks(dt);

        self.entity_spawner.process(&mut self.world);
        self.drain_events();

        self.tick += 1;
        if self.tick % SNAPSHOT_INTERVAL == 0 {
            self.emit_population_snapshot();
        }
        Ok(())
    }

    /// Run until the configured duration has elapsed
    #[instrument(skip(self), fields(duration = self.config.duration, seed = self.config.seed))]
    pub fn run(&mut self) -> Result<SimulationResult> {
        let total = self.config.total_ticks();
        info!("Starting simulation for {} ticks", total);

        while self.tick < total {
            self.step()?;
        }

        let result = self.result();
        info!(
            event = "run_summary",
            ticks = result.ticks,
            population = result.total_population(),
            spawned = result.spawned,
            divisions = result.divisions,
            longest_survival = result.longest_survival_seconds,
            "Simulation complete"
        );
        Ok(result)
    }

    pub fn result(&self) -> SimulationResult {
        let now = self.world.time();
        let population = self
            .names
            .iter()
            .map(|(id, name)| (name.clone(), self.world.population(*id)))
            .collect();
        let surviving = self
            .world
            .entities()
            .iter()
            .map(|entity| entity.age(now))
            .fold(0.0, f64::max);

        SimulationResult {
            ticks: self.tick,
            elapsed_seconds: now,
            population,
            spawned: self.counters.spawned,
            divisions: self.counters.divisions,
            endobionts: self.counters.endobionts,
            releases: self
                .counters
                .releases
                .iter()
                .map(|(cause, count)| (cause.to_string(), *count))
                .collect(),
            longest_survival_seconds: self.counters.longest_survival.max(surviving),
        }
    }

    fn drain_events(&mut self) {
        for event in self.world.drain_events() {
            match event {
                SimEvent::OrganismSpawned { parent, .. } => {
                    self.counters.spawned += 1;
                    if parent.is_some() {
                        self.counters.divisions += 1;
                    }
                }
                SimEvent::OrganismReleased { cause, age, .. } => {
                    *self.counters.releases.entry(cause).or_default() += 1;
                    self.counters.longest_survival = self.counters.longest_survival.max(age);
                }
                SimEvent::EndobiontAttached { .. } => {
                    self.counters.endobionts += 1;
                }
            }
        }
    }

    /// Live count per registered template, ordered by template id
    pub fn populations(&self) -> Vec<(TemplateId, &str, usize)> {
        self.names
            .iter()
            .map(|(id, name)| (*id, name.as_str(), self.world.population(*id)))
            .collect()
    }

    fn emit_population_snapshot(&self) {
        for (_, name, population) in self.populations() {
            info!(
                event = "population_metrics",
                tick = self.tick,
                template = %name,
                population,
                "Population snapshot"
            );
        }
        event!(
            Level::INFO,
            gauge_name = "energy_sources",
            gauge_value = self.world.sources.len(),
            tick = self.tick,
            "Energy source gauge"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    fn config(seed: u64) -> SimulationConfig {
        let mut config = SimulationConfig {
            seed,
            duration: 4.0,
            ..Default::default()
        };
        config.spawner.capacity = 16;
        config.spawner.population_cap = 12;
        config.spawner.initial_count = 4;
        config
    }

    fn simulation(seed: u64) -> Simulation {
        let registry = Arc::new(catalog::default_registry().unwrap());
        let mut sim = Simulation::new(config(seed), registry.clone());
        for (name, template) in catalog::default_templates(&registry).unwrap() {
            sim.add_template(&name, &template).unwrap();
        }
        sim
    }

    #[test]
    fn test_unplayable_template_rejected() {
        let registry = Arc::new(catalog::default_registry().unwrap());
        let mut sim = Simulation::new(config(0), registry.clone());
        let mut template = catalog::grazer_template(&registry).unwrap();
        template
            .set_essential(&registry, 0, cellsim_core::ComponentId::INVALID)
            .unwrap();
        assert!(matches!(sim.add_template("broken", &template), Err(Error::Validation(_))));
    }

    #[test]
    fn test_duplicate_template_rejected() {
        let registry = Arc::new(catalog::default_registry().unwrap());
        let mut sim = Simulation::new(config(0), registry.clone());
        let template = catalog::grazer_template(&registry).unwrap();
        sim.add_template("grazer", &template).unwrap();
        assert!(sim.add_template("grazer", &template).is_err());
    }

    #[test]
    fn test_populations_are_ordered_by_template_id() {
        let registry = Arc::new(catalog::default_registry().unwrap());
        let mut sim = Simulation::new(config(3), registry.clone());
        let mut templates = catalog::default_templates(&registry).unwrap();
        templates.reverse();
        for (name, template) in &templates {
            sim.add_template(name, template).unwrap();
        }

        let order: Vec<_> = sim.populations().into_iter().map(|(id, name, _)| (id, name.to_string())).collect();
        assert_eq!(
            order,
            vec![
                (catalog::GRAZER, "grazer".to_string()),
                (catalog::HUNTER, "hunter".to_string()),
                (catalog::PLANT, "plant".to_string()),
            ]
        );
    }

    #[test]
    fn test_run_covers_duration() {
        let mut sim = simulation(11);
        let result = sim.run().unwrap();
        assert_eq!(result.ticks, sim.config().total_ticks());
        assert!((result.elapsed_seconds - 4.0).abs() < 1e-3);
        assert!(result.spawned >= 12);
        assert_eq!(result.population.len(), 3);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = simulation(5).run().unwrap();
        let b = simulation(5).run().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_population_never_exceeds_cap() {
        let mut sim = simulation(2);
        for _ in 0..200 {
            sim.step().unwrap();
            for template in [catalog::GRAZER, catalog::HUNTER, catalog::PLANT] {
                assert!(sim.world().population(template) <= 12);
            }
        }
    }

    #[test]
    fn test_lowered_cap_culls() {
        let mut sim = simulation(3);
        sim.step().unwrap();
        assert!(sim.world().population(catalog::GRAZER) >= 2);
        sim.set_population_cap(catalog::GRAZER, 1);
        sim.step().unwrap();
        assert_eq!(sim.world().population(catalog::GRAZER), 1);
        assert!(sim.result().releases.get("culled").copied().unwrap_or(0) >= 1);
    }
}
