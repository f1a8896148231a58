//! Organism component simulation.
//!
//! Templates pick components from a registry, compile into prefabs and
//! spawn pooled organisms whose component controls drive sensing,
//! movement, feeding and division inside a bounded field.

pub mod arena;
pub mod catalog;
pub mod control;
pub mod definition;
pub mod energy;
pub mod entity;
pub mod events;
pub mod field;
pub mod prefab;
pub mod record;
pub mod registry;
pub mod schedule;
pub mod sensor;
pub mod simulation;
pub mod spatial;
pub mod spawner;
pub mod template;
pub mod world;

pub use arena::EntityArena;
pub use control::{ComponentControl, ControlSet, ControlSignal};
pub use definition::{BodyDefinition, ComponentDefinition, ComponentKind};
pub use energy::{EnergySource, EnergySourceSet};
pub use entity::OrganismEntity;
pub use events::{ReleaseCause, SimEvent};
pub use field::OrganismField;
pub use prefab::{OrganismPrefab, PrefabCache};
pub use record::CompletionStats;
pub use registry::ComponentRegistry;
pub use sensor::{OrganismSensor, SensorMode};
pub use simulation::{Simulation, SimulationResult};
pub use spatial::{SpatialIndex, SpatialQuery, SpatialTag};
pub use spawner::{EnergySourceSpawner, OrganismEntitySpawner, OrganismTemplateSpawner};
pub use template::{OrganismTemplate, TemplateEvent};
pub use world::{EatOutcome, World};
