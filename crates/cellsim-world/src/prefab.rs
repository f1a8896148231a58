//! One-time compilation of a template into a spawnable organism blueprint.
//!
//! Compiling resolves every definition, composes the aggregate stats, lays
//! out component visuals on the body's anchors and lets each definition
//! adjust the blueprint once. Pools clone entities from the result, so none
//! of this runs per spawn.

use crate::definition::{ComponentDefinition, ComponentKind, SensorSettings};
use crate::registry::ComponentRegistry;
use crate::template::OrganismTemplate;
use cellsim_core::{ComponentId, OrganismStats, Result, Vec2};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A simulation visual placed on the body
#[derive(Debug, Clone, PartialEq)]
pub struct VisualAttachment {
    pub component: ComponentId,
    pub visual: String,
    pub offset: Vec2,
}

/// Compiled organism shared by every entity of a signature
#[derive(Debug, Clone)]
pub struct OrganismPrefab {
    pub name: String,
    /// Body first, then grouped components, then essentials
    pub definitions: Vec<Arc<ComponentDefinition>>,
    /// Aggregate stats; entities copy this on every spawn
    pub stats: OrganismStats,
    pub radius: f32,
    pub sensor: SensorSettings,
    pub visuals: Vec<VisualAttachment>,
}

impl OrganismPrefab {
    /// Compile `template`. Components whose anchor does not exist on the body
    /// get no visual; that is an authoring gap, not an error.
    pub fn create(name: &str, template: &OrganismTemplate, registry: &ComponentRegistry) -> Result<Self> {
        let definitions = template.resolve(registry)?;
        let body_def = definitions[0].clone();
        let Some(body) = body_def.as_body() else {
            return Err(cellsim_core::Error::InvalidState(format!(
                "Template {} does not start with a body",
                template.id
            )));
        };

        let stats = OrganismStats::compose(definitions.iter().map(|def| &def.stats));

        let mut visuals = Vec::new();
        if let Some(visual) = &body_def.sim_visual {
            visuals.push(VisualAttachment {
                component: body_def.id,
                visual: visual.clone(),
                offset: Vec2::ZERO,
            });
        }
        for def in definitions.iter().skip(1) {
            let Some(visual) = &def.sim_visual else {
                continue;
            };
            let mut placed = 0;
            for (_, anchor) in body.anchors_named(&def.anchor) {
                visuals.push(VisualAttachment {
                    component: def.id,
                    visual: visual.clone(),
                    offset: anchor.offset,
                });
                placed += 1;
            }
            if placed == 0 {
                debug!(component = %def.id, anchor = %def.anchor, "No anchor for component visual");
            }
        }

        let mut prefab = Self {
            name: name.to_string(),
            radius: body.radius,
            sensor: body.sensor.clone(),
            definitions: Vec::new(),
            stats,
            visuals,
        };
        for def in &definitions {
            setup_template(def, &mut prefab);
        }
        prefab.definitions = definitions;
        Ok(prefab)
    }

    pub fn body(&self) -> &ComponentDefinition {
        &self.definitions[0]
    }
}

/// Per-definition adjustment of a freshly compiled prefab
fn setup_template(def: &ComponentDefinition, prefab: &mut OrganismPrefab) {
    match &def.kind {
        ComponentKind::HunterGrab(_)
        | ComponentKind::HunterTentacle(_)
        | ComponentKind::HunterVacuum(_)
        | ComponentKind::Pseudopodia(_) => {
            // Hunters must see at least as far as they reach
            let reach = def.reach() + prefab.radius;
            if prefab.sensor.organism_check_radius < reach {
                prefab.sensor.organism_check_radius = reach;
            }
        }
        ComponentKind::Motility(_) => {
            if prefab.sensor.energy_check_radius <= 0.0 {
                prefab.sensor.energy_check_radius = prefab.radius * 4.0;
            }
        }
        _ => {}
    }
}

/// Compiled prefabs keyed by template signature
#[derive(Debug, Default)]
pub struct PrefabCache {
    prefabs: HashMap<Vec<ComponentId>, Arc<OrganismPrefab>>,
}

impl PrefabCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.prefabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefabs.is_empty()
    }

    /// Compile on first use; later templates with the same signature share it
    pub fn get_or_create(
        &mut self,
        name: &str,
        template: &OrganismTemplate,
        registry: &ComponentRegistry,
    ) -> Result<Arc<OrganismPrefab>> {
        let signature = template.signature();
        if let Some(prefab) = self.prefabs.get(&signature) {
            return Ok(prefab.clone());
        }
        let prefab = Arc::new(OrganismPrefab::create(name, template, registry)?);
        self.prefabs.insert(signature, prefab.clone());
        Ok(prefab)
    }
}
