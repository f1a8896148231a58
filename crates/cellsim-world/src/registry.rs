//! Lookup table from component id to definition.

use crate::definition::{BodyDefinition, ComponentDefinition};
use cellsim_core::{ComponentId, Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Read-only registry of every component definition, built once at load.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    definitions: HashMap<ComponentId, Arc<ComponentDefinition>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and validate a registry from a list of definitions
    pub fn from_definitions(definitions: Vec<ComponentDefinition>) -> Result<Self> {
        let mut registry = Self::new();
        for def in definitions {
            registry.register(def)?;
        }
        registry.validate()?;
        Ok(registry)
    }

    /// Parse a JSON array of definitions
    pub fn from_json_str(json: &str) -> Result<Self> {
        let definitions: Vec<ComponentDefinition> = serde_json::from_str(json)?;
        Self::from_definitions(definitions)
    }

    pub fn register(&mut self, definition: ComponentDefinition) -> Result<()> {
        if !definition.id.is_valid() {
            return Err(Error::Validation(format!(
                "Definition '{}' uses the invalid id",
                definition.name()
            )));
        }
        if self.definitions.contains_key(&definition.id) {
            return Err(Error::AlreadyExists(format!(
                "Component id {}",
                definition.id
            )));
        }
        self.definitions.insert(definition.id, Arc::new(definition));
        Ok(())
    }

    /// Check group membership: every option exists, is not a body, and
    /// appears in at most one group across all bodies.
    pub fn validate(&self) -> Result<()> {
        let mut grouped = HashSet::new();
        for def in self.definitions.values() {
            let Some(body) = def.as_body() else {
                continue;
            };
            for essential in &body.essentials {
                if self.get(*essential).is_none() {
                    return Err(Error::Validation(format!(
                        "Body {} lists unknown essential {}",
                        def.id, essential
                    )));
                }
            }
            for group in &body.groups {
                for option in &group.options {
                    let Some(option_def) = self.get(*option) else {
                        return Err(Error::Validation(format!(
                            "Group '{}' of body {} lists unknown component {}",
                            group.name, def.id, option
                        )));
                    };
                    if option_def.is_body() {
                        return Err(Error::Validation(format!(
                            "Group '{}' of body {} lists body {}",
                            group.name, def.id, option
                        )));
                    }
                    if !grouped.insert(*option) {
                        return Err(Error::Validation(format!(
                            "Component {} belongs to more than one group",
                            option
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Look up a definition; the invalid id and unknown ids give `None`
    pub fn get(&self, id: ComponentId) -> Option<&Arc<ComponentDefinition>> {
        self.definitions.get(&id)
    }

    /// Look up a definition viewed as a body
    pub fn body(&self, id: ComponentId) -> Option<&BodyDefinition> {
        self.get(id).and_then(|def| def.as_body())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ComponentDefinition>> {
        self.definitions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::*;
    use cellsim_core::OrganismStats;

    fn def(id: i32, kind: ComponentKind) -> ComponentDefinition {
        ComponentDefinition {
            id: ComponentId(id),
            info: DisplayInfo {
                name: format!("c{}", id),
                ..Default::default()
            },
            anchor: String::new(),
            edit_visual: None,
            sim_visual: None,
            stats: OrganismStats::default(),
            kind,
        }
    }

    fn body(id: i32, groups: Vec<Vec<i32>>) -> ComponentDefinition {
        def(
            id,
            ComponentKind::Body(BodyDefinition {
                plan: BodyPlan::Magnoliophyta,
                radius: 1.0,
                anchors: vec![],
                internal_anchors: vec![],
                sensor: SensorSettings::default(),
                essentials: vec![],
                groups: groups
                    .into_iter()
                    .enumerate()
                    .map(|(i, ids)| ComponentGroup {
                        name: format!("g{}", i),
                        options: ids.into_iter().map(ComponentId).collect(),
                    })
                    .collect(),
            }),
        )
    }

    #[test]
    fn test_register_and_lookup() {
        let registry =
            ComponentRegistry::from_definitions(vec![body(1, vec![vec![2]]), def(2, ComponentKind::Generic)])
                .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.body(ComponentId(1)).is_some());
        assert!(registry.body(ComponentId(2)).is_none());
        assert!(registry.get(ComponentId::INVALID).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = ComponentRegistry::from_definitions(vec![
            def(2, ComponentKind::Generic),
            def(2, ComponentKind::Essential),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
    }

    #[test]
    fn test_invalid_id_rejected() {
        let mut registry = ComponentRegistry::new();
        assert!(registry.register(def(-1, ComponentKind::Generic)).is_err());
    }

    #[test]
    fn test_component_in_two_groups_rejected() {
        let err = ComponentRegistry::from_definitions(vec![
            body(1, vec![vec![3]]),
            body(2, vec![vec![3]]),
            def(3, ComponentKind::Generic),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = ComponentRegistry::from_definitions(vec![body(1, vec![vec![42]])]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
