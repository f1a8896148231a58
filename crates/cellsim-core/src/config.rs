//! Configuration types for the simulation.

use crate::{EnergyKind, HazardKind, Result, Vec2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Organism behavior scheduling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganismConfig {
    /// Seconds between behavior updates, shared by every organism
    pub update_delay: f32,
    /// Physics step in seconds
    pub fixed_delta: f32,
    /// Capacity of one spatial overlap query; extra hits are dropped
    pub max_spatial_results: usize,
    /// Extra distance at which two circles count as touching
    pub contact_margin: f32,
}

impl Default for OrganismConfig {
    fn default() -> Self {
        Self {
            update_delay: 0.1,
            fixed_delta: 0.02,
            max_spatial_results: 64,
            contact_margin: 0.05,
        }
    }
}

/// Circular area that drains energy from organisms without resistance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardZone {
    pub center: Vec2,
    pub radius: f32,
    pub kind: HazardKind,
    /// Energy lost per second inside the zone
    pub damage: f32,
}

impl HazardZone {
    pub fn contains(&self, point: Vec2) -> bool {
        self.center.distance(point) <= self.radius
    }
}

/// Environment the organisms live in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Name used as the persistence key for completion records
    pub name: String,
    /// Width of the field, centered on the origin
    pub width: f32,
    /// Height of the field, centered on the origin
    pub height: f32,
    /// Environmental current applied to every organism
    pub force: Vec2,
    /// Fraction of velocity lost per second
    pub drag: f32,
    pub hazards: Vec<HazardZone>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            name: "pond".to_string(),
            width: 40.0,
            height: 30.0,
            force: Vec2::ZERO,
            drag: 0.5,
            hazards: Vec::new(),
        }
    }
}

/// Timed organism spawning and population limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Pool slots per template
    pub capacity: usize,
    /// Maximum live organisms per template, divisions included
    pub population_cap: usize,
    /// Organisms spawned per template when the simulation starts
    pub initial_count: usize,
    /// Seconds between timed spawns, 0 to disable
    pub spawn_delay: f32,
    /// Organisms per timed spawn
    pub spawn_count: usize,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            population_cap: 48,
            initial_count: 8,
            spawn_delay: 5.0,
            spawn_count: 1,
        }
    }
}

/// Energy source spawning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergySourceConfig {
    /// Maximum live sources
    pub capacity: usize,
    /// Seconds between spawns
    pub spawn_delay: f32,
    /// Energy carried by each source
    pub energy: f32,
    pub radius: f32,
    /// Kinds spawned round-robin
    pub kinds: Vec<EnergyKind>,
    pub initial_count: usize,
}

impl Default for EnergySourceConfig {
    fn default() -> Self {
        Self {
            capacity: 120,
            spawn_delay: 0.25,
            energy: 10.0,
            radius: 0.2,
            kinds: vec![EnergyKind(0)],
            initial_count: 60,
        }
    }
}

/// Full simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Simulated seconds to run
    pub duration: f32,
    pub organism: OrganismConfig,
    pub field: FieldConfig,
    pub spawner: SpawnerConfig,
    pub energy_sources: EnergySourceConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            duration: 120.0,
            organism: OrganismConfig::default(),
            field: FieldConfig::default(),
            spawner: SpawnerConfig::default(),
            energy_sources: EnergySourceConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Number of physics ticks needed to cover `duration`
    pub fn total_ticks(&self) -> u64 {
        if self.organism.fixed_delta <= 0.0 {
            return 0;
        }
        (self.duration / self.organism.fixed_delta).round() as u64
    }
}
