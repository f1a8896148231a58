//! Outbound notifications from the simulation core.

use cellsim_core::{EntityId, TemplateId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why an organism left the field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReleaseCause {
    Eaten,
    Starved,
    Expired,
    Culled,
    /// Removed by the host application (end of round, editor reset)
    Cleared,
}

impl fmt::Display for ReleaseCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReleaseCause::Eaten => "eaten",
            ReleaseCause::Starved => "starved",
            ReleaseCause::Expired => "expired",
            ReleaseCause::Culled => "culled",
            ReleaseCause::Cleared => "cleared",
        };
        f.write_str(name)
    }
}

/// Simulation events, drained once per physics tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    OrganismSpawned {
        entity: EntityId,
        template: TemplateId,
        /// Set when the organism came from a division
        parent: Option<EntityId>,
    },
    OrganismReleased {
        entity: EntityId,
        template: TemplateId,
        cause: ReleaseCause,
        /// Seconds the organism was alive
        age: f64,
    },
    EndobiontAttached {
        host: EntityId,
        guest: EntityId,
        anchor: usize,
    },
}
