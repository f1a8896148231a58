//! Periodic proximity sensing with alternating scan modes.

use crate::definition::SensorSettings;
use crate::energy::EnergySourceSet;
use crate::schedule::PeriodicTask;
use crate::spatial::{BodyRef, Overlap, SpatialQuery, SpatialTag};
use cellsim_core::{EnergySourceId, EntityId, OrganismStats, Vec2};
use serde::{Deserialize, Serialize};

/// What one sensor firing looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorMode {
    None,
    Energy,
    Organism,
}

/// Proximity scanner owned by one entity.
///
/// Each firing runs exactly one query and replaces that mode's cache. The
/// caches can go stale between firings, so readers must re-validate ids.
#[derive(Debug, Clone)]
pub struct OrganismSensor {
    settings: SensorSettings,
    mode: SensorMode,
    task: PeriodicTask,
    energy: Vec<EnergySourceId>,
    organisms: Vec<EntityId>,
    scratch: Vec<Overlap>,
}

impl OrganismSensor {
    pub fn new(settings: SensorSettings) -> Self {
        let task = PeriodicTask::new(settings.delay);
        Self {
            settings,
            mode: SensorMode::None,
            task,
            energy: Vec::new(),
            organisms: Vec::new(),
            scratch: Vec::new(),
        }
    }

    pub fn settings(&self) -> &SensorSettings {
        &self.settings
    }

    /// Mode used by the most recent firing
    pub fn mode(&self) -> SensorMode {
        self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.task.is_running()
    }

    pub fn energy(&self) -> &[EnergySourceId] {
        &self.energy
    }

    pub fn organisms(&self) -> &[EntityId] {
        &self.organisms
    }

    /// Start scanning; no-op when neither radius is positive
    pub fn enable(&mut self) {
        self.mode = SensorMode::None;
        self.energy.clear();
        self.organisms.clear();
        if self.settings.energy_check_radius > 0.0 || self.settings.organism_check_radius > 0.0 {
            self.task.start();
        }
    }

    /// Stop immediately and forget cached results
    pub fn disable(&mut self) {
        self.task.cancel();
        self.mode = SensorMode::None;
        self.energy.clear();
        self.organisms.clear();
    }

    /// Number of scans due after `dt` seconds
    pub fn advance(&mut self, dt: f32) -> u32 {
        self.task.advance(dt)
    }

    /// Mode the next firing will use
    pub fn next_mode(&self) -> SensorMode {
        let energy = self.settings.energy_check_radius > 0.0;
        let organism = self.settings.organism_check_radius > 0.0;
        match (self.mode, energy, organism) {
            (_, false, false) => SensorMode::None,
            (SensorMode::Energy, _, true) => SensorMode::Organism,
            (SensorMode::Organism, true, _) => SensorMode::Energy,
            (_, true, _) => SensorMode::Energy,
            (_, false, true) => SensorMode::Organism,
        }
    }

    /// Run one firing and return the mode that was refreshed
    pub fn scan(
        &mut self,
        owner: EntityId,
        center: Vec2,
        stats: &OrganismStats,
        spatial: &dyn SpatialQuery,
        sources: &EnergySourceSet,
    ) -> SensorMode {
        let mode = self.next_mode();
        match mode {
            SensorMode::None => {}
            SensorMode::Energy => {
                self.energy.clear();
                spatial.overlap_circle(
                    center,
                    self.settings.energy_check_radius,
                    &[SpatialTag::Energy],
                    &mut self.scratch,
                );
                for hit in &self.scratch {
                    let BodyRef::Source(id) = hit.body else {
                        continue;
                    };
                    if let Some(source) = sources.get(id) {
                        if stats.energy_match(source.kind, source.ignore_match) {
                            self.energy.push(id);
                        }
                    }
                }
            }
            SensorMode::Organism => {
                self.organisms.clear();
                spatial.overlap_circle(
                    center,
                    self.settings.organism_check_radius,
                    &self.settings.organism_tags,
                    &mut self.scratch,
                );
                for hit in &self.scratch {
                    if let BodyRef::Entity(id) = hit.body {
                        if id != owner {
                            self.organisms.push(id);
                        }
                    }
                }
            }
        }
        self.scratch.clear();
        self.mode = mode;
        mode
    }
}
