//! Player-authored organism templates.
//!
//! A template is the save-data form of an organism: slot 0 of
//! `component_ids` holds the body, slot `k + 1` holds the choice for the
//! body's `k`-th component group, and `essential_ids[k]` records whether
//! the body's `k`-th essential has been placed.

use crate::definition::ComponentDefinition;
use crate::registry::ComponentRegistry;
use cellsim_core::{ComponentId, Error, KeyValueStore, Result, TemplateId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Change notifications emitted by template setters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateEvent {
    BodyChanged { body: ComponentId },
    EssentialChanged { slot: usize, id: ComponentId },
    ComponentChanged { slot: usize, id: ComponentId },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganismTemplate {
    pub id: TemplateId,
    essential_ids: Vec<ComponentId>,
    component_ids: Vec<ComponentId>,
    #[serde(skip)]
    events: Vec<TemplateEvent>,
}

impl OrganismTemplate {
    /// Empty template with no body chosen
    pub fn new(id: TemplateId) -> Self {
        Self {
            id,
            essential_ids: Vec::new(),
            component_ids: vec![ComponentId::INVALID],
            events: Vec::new(),
        }
    }

    /// Template with `body` chosen and every group at its default
    pub fn with_body(id: TemplateId, registry: &ComponentRegistry, body: ComponentId) -> Result<Self> {
        let mut template = Self::new(id);
        template.set_body(registry, body)?;
        template.events.clear();
        Ok(template)
    }

    pub fn body_id(&self) -> ComponentId {
        self.component_ids[0]
    }

    pub fn component_ids(&self) -> &[ComponentId] {
        &self.component_ids
    }

    pub fn essential_ids(&self) -> &[ComponentId] {
        &self.essential_ids
    }

    /// Take the notifications emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<TemplateEvent> {
        std::mem::take(&mut self.events)
    }

    /// Choose a new body, carrying over every previous choice it still offers.
    ///
    /// Matching is by id, first match wins, and each old entry can be carried
    /// at most once. Groups with no carried choice start at their first option.
    pub fn set_body(&mut self, registry: &ComponentRegistry, body_id: ComponentId) -> Result<()> {
        if !body_id.is_valid() {
            self.component_ids = vec![ComponentId::INVALID];
            self.essential_ids.clear();
            self.events.push(TemplateEvent::BodyChanged { body: body_id });
            return Ok(());
        }

        let body = registry
            .body(body_id)
            .ok_or_else(|| Error::NotFound(format!("Body definition {}", body_id)))?;

        let mut old_essentials = self.essential_ids.clone();
        let essential_ids = body
            .essentials
            .iter()
            .map(|wanted| take_first(&mut old_essentials, |id| id == *wanted).unwrap_or(ComponentId::INVALID))
            .collect();

        let mut old_components: Vec<ComponentId> = self.component_ids.iter().skip(1).copied().collect();
        let mut component_ids = Vec::with_capacity(body.groups.len() + 1);
        component_ids.push(body_id);
        for group in &body.groups {
            let carried = take_first(&mut old_components, |id| group.options.contains(&id));
            component_ids.push(carried.unwrap_or_else(|| group.default_option()));
        }

        self.essential_ids = essential_ids;
        self.component_ids = component_ids;
        self.events.push(TemplateEvent::BodyChanged { body: body_id });
        Ok(())
    }

    /// Place (`id` = the body's essential) or clear (`INVALID`) an essential slot
    pub fn set_essential(&mut self, registry: &ComponentRegistry, slot: usize, id: ComponentId) -> Result<()> {
        let len = self.essential_ids.len();
        if slot >= len {
            return Err(Error::SlotOutOfRange { slot, len });
        }
        if id.is_valid() {
            let expected = registry
                .body(self.body_id())
                .and_then(|body| body.essentials.get(slot).copied());
            if expected != Some(id) {
                return Err(Error::Validation(format!(
                    "Component {} does not fill essential slot {}",
                    id, slot
                )));
            }
        }
        self.essential_ids[slot] = id;
        self.events.push(TemplateEvent::EssentialChanged { slot, id });
        Ok(())
    }

    /// Choose the component for group slot `slot` (1-based, slot 0 is the body)
    pub fn set_component(&mut self, registry: &ComponentRegistry, slot: usize, id: ComponentId) -> Result<()> {
        let len = self.component_ids.len();
        if slot == 0 || slot >= len {
            return Err(Error::SlotOutOfRange { slot, len });
        }
        if id.is_valid() {
            let member = registry
                .body(self.body_id())
                .and_then(|body| body.groups.get(slot - 1))
                .is_some_and(|group| group.options.contains(&id));
            if !member {
                return Err(Error::Validation(format!(
                    "Component {} is not an option of group slot {}",
                    id, slot
                )));
            }
        }
        self.component_ids[slot] = id;
        self.events.push(TemplateEvent::ComponentChanged { slot, id });
        Ok(())
    }

    /// A body is chosen and every essential has been placed
    pub fn is_playable(&self) -> bool {
        self.body_id().is_valid() && self.essential_ids.iter().all(|id| id.is_valid())
    }

    /// Definitions in entity order: body, chosen group components, placed
    /// essentials. Unknown ids are skipped.
    pub fn resolve(&self, registry: &ComponentRegistry) -> Result<Vec<Arc<ComponentDefinition>>> {
        let body = registry
            .get(self.body_id())
            .filter(|def| def.is_body())
            .ok_or_else(|| Error::InvalidState(format!("Template {} has no body", self.id)))?;

        let mut definitions = vec![body.clone()];
        for id in self.component_ids.iter().skip(1).chain(self.essential_ids.iter()) {
            if let Some(def) = registry.get(*id) {
                definitions.push(def.clone());
            }
        }
        Ok(definitions)
    }

    /// Identity of the organism this template builds, independent of its id
    pub fn signature(&self) -> Vec<ComponentId> {
        let mut signature = self.component_ids.clone();
        signature.extend(self.essential_ids.iter().copied());
        signature
    }

    pub fn save_to(&self, store: &mut dyn KeyValueStore, key: &str) {
        store.remove_all_by_prefix(&format!("{}.", key));
        store.set_int(&format!("{}.id", key), self.id.0);
        store.set_int(&format!("{}.essentialCount", key), self.essential_ids.len() as i32);
        for (i, id) in self.essential_ids.iter().enumerate() {
            store.set_int(&format!("{}.essential.{}", key, i), id.0);
        }
        store.set_int(&format!("{}.componentCount", key), self.component_ids.len() as i32);
        for (i, id) in self.component_ids.iter().enumerate() {
            store.set_int(&format!("{}.component.{}", key, i), id.0);
        }
    }

    /// Read a template saved under `key`; `None` when nothing was saved
    pub fn load_from(store: &dyn KeyValueStore, key: &str) -> Option<Self> {
        let count_key = format!("{}.componentCount", key);
        if !store.has_key(&count_key) {
            return None;
        }

        let invalid = ComponentId::INVALID.0;
        let component_count = store.get_int(&count_key, 0).max(1) as usize;
        let essential_count = store.get_int(&format!("{}.essentialCount", key), 0).max(0) as usize;

        let component_ids = (0..component_count)
            .map(|i| ComponentId(store.get_int(&format!("{}.component.{}", key, i), invalid)))
            .collect();
        let essential_ids = (0..essential_count)
            .map(|i| ComponentId(store.get_int(&format!("{}.essential.{}", key, i), invalid)))
            .collect();

        Some(Self {
            id: TemplateId(store.get_int(&format!("{}.id", key), 0)),
            essential_ids,
            component_ids,
            events: Vec::new(),
        })
    }
}

/// Remove and return the first entry matching `pred`, leaving an invalid hole
fn take_first(ids: &mut [ComponentId], pred: impl Fn(ComponentId) -> bool) -> Option<ComponentId> {
    let slot = ids.iter_mut().find(|id| id.is_valid() && pred(**id))?;
    Some(std::mem::replace(slot, ComponentId::INVALID))
}
