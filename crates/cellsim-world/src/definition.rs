//! Authored component definitions.
//!
//! A definition describes one pluggable organism capability: how it looks,
//! where it attaches on a body, what it adds to the organism's stats and the
//! tuning its runtime control reads. Definitions are loaded once and shared
//! read-only by every template and entity that uses them.

use crate::spatial::SpatialTag;
use cellsim_core::{ComponentId, OrganismStats, Vec2};
use serde::{Deserialize, Serialize};

/// Player-facing description
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DisplayInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
}

/// One authored organism component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDefinition {
    pub id: ComponentId,
    pub info: DisplayInfo,
    /// Name of the body anchor(s) this component attaches to
    #[serde(default)]
    pub anchor: String,
    /// Appearance while editing a template
    #[serde(default)]
    pub edit_visual: Option<String>,
    /// Appearance inside the simulation
    #[serde(default)]
    pub sim_visual: Option<String>,
    /// Contribution to the organism's aggregate stats
    #[serde(default)]
    pub stats: OrganismStats,
    pub kind: ComponentKind,
}

impl ComponentDefinition {
    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn as_body(&self) -> Option<&BodyDefinition> {
        match &self.kind {
            ComponentKind::Body(body) => Some(body),
            _ => None,
        }
    }

    pub fn is_body(&self) -> bool {
        self.as_body().is_some()
    }

    /// Largest distance at which this component acts on other organisms
    pub fn reach(&self) -> f32 {
        match &self.kind {
            ComponentKind::HunterGrab(t) => t.grab_radius,
            ComponentKind::HunterTentacle(t) => t.tentacle_radius,
            ComponentKind::HunterVacuum(t) => t.vacuum_radius,
            ComponentKind::Pseudopodia(t) => t.reach,
            _ => 0.0,
        }
    }
}

/// Capability variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ComponentKind {
    Body(BodyDefinition),
    Essential,
    Generic,
    HunterContact(ContactTuning),
    HunterGrab(GrabTuning),
    HunterTentacle(TentacleTuning),
    HunterVacuum(VacuumTuning),
    Motility(MotilityTuning),
    Pseudopodia(PseudopodiaTuning),
}

/// Body plan with its slots for essentials and grouped components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyDefinition {
    pub plan: BodyPlan,
    pub radius: f32,
    /// Named attachment points for component visuals
    #[serde(default)]
    pub anchors: Vec<BodyAnchor>,
    /// Offsets where swallowed endobionts live
    #[serde(default)]
    pub internal_anchors: Vec<Vec2>,
    #[serde(default)]
    pub sensor: SensorSettings,
    /// Essential definitions that must all be placed before play
    #[serde(default)]
    pub essentials: Vec<ComponentId>,
    /// Mutually exclusive component choices, one slot per group
    #[serde(default)]
    pub groups: Vec<ComponentGroup>,
}

impl BodyDefinition {
    /// Index of the group offering `id`, if any
    pub fn group_of(&self, id: ComponentId) -> Option<usize> {
        self.groups.iter().position(|g| g.options.contains(&id))
    }

    pub fn anchors_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = (usize, &'a BodyAnchor)> + 'a {
        self.anchors
            .iter()
            .enumerate()
            .filter(move |(_, anchor)| anchor.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BodyPlan {
    SingleCell(SingleCellTuning),
    Magnoliophyta,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SingleCellTuning {
    /// Velocity gained per unit of overlap when pushed off another organism
    pub separation: f32,
    /// Fraction of speed kept when bouncing off a solid
    pub bounce: f32,
}

impl Default for SingleCellTuning {
    fn default() -> Self {
        Self {
            separation: 4.0,
            bounce: 0.8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyAnchor {
    pub name: String,
    pub offset: Vec2,
}

/// Named set of interchangeable components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentGroup {
    pub name: String,
    pub options: Vec<ComponentId>,
}

impl ComponentGroup {
    pub fn default_option(&self) -> ComponentId {
        self.options.first().copied().unwrap_or(ComponentId::INVALID)
    }
}

/// Proximity sensing cadence and reach
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSettings {
    pub delay: f32,
    pub energy_check_radius: f32,
    pub organism_check_radius: f32,
    /// Tags reported in organism mode
    pub organism_tags: Vec<SpatialTag>,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            delay: 0.25,
            energy_check_radius: 0.0,
            organism_check_radius: 0.0,
            organism_tags: vec![SpatialTag::Organism],
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContactTuning {
    /// Full cone in degrees around forward; 360 accepts any direction
    pub contact_angle: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GrabTuning {
    pub grab_radius: f32,
    /// Seconds from grab to swallow
    pub grab_delay: f32,
    pub grab_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TentacleTuning {
    pub tentacle_count: usize,
    pub tentacle_radius: f32,
    /// Seconds to reach out, and to pull back in
    pub tract_delay: f32,
    pub absorb_range_min: f32,
    pub absorb_range_max: f32,
    /// Acceleration used to close in while absorbing
    pub pull_accel: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VacuumTuning {
    pub vacuum_radius: f32,
    pub vacuum_accel: f32,
    /// Full cone in degrees around forward
    pub vacuum_angle: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotilityTuning {
    pub forward_speed: f32,
    /// Degrees per second
    pub turn_speed: f32,
    /// Seconds between explore decisions
    pub change_delay: f32,
    /// Below this fraction of capacity the organism rests
    pub energy_min_scale: f32,
    /// Energy spent per second while moving
    pub energy_rate: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PseudopodiaTuning {
    pub reach: f32,
}
