//! Per-entity runtime behavior generated from component definitions.
//!
//! Each definition in an entity produces exactly one [`ComponentControl`] at
//! pool warm-up. The entity keeps them in a [`ControlSet`] together with
//! precomputed dispatch lists, so the per-tick loops never ask a control
//! what it can do.

mod body;
mod contact;
mod grab;
mod hunter;
mod motility;
mod tentacle;
mod vacuum;

pub use body::{MagnoliophytaControl, SingleCellControl};
pub use contact::ContactControl;
pub use grab::{GrabControl, GrabSlot};
pub use hunter::StretchPool;
pub use motility::{ExploreState, MotilityControl, MotilityState};
pub use tentacle::{TentacleControl, TentaclePhase, TentacleSlot};
pub use vacuum::VacuumControl;

use crate::definition::{BodyPlan, ComponentDefinition, ComponentKind};
use crate::entity::OrganismEntity;
use crate::sensor::SensorMode;
use crate::world::World;
use cellsim_core::EntityId;
use std::sync::Arc;

/// Message from one control to a sibling on the same entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Suspend (true) or resume (false) independent movement
    HoldMovement(bool),
}

/// Which hooks a control wants
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub spawn: bool,
    pub despawn: bool,
    pub update: bool,
    pub sensor: bool,
}

/// Control indices per hook, in definition order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dispatch {
    pub spawn: Vec<usize>,
    pub despawn: Vec<usize>,
    pub update: Vec<usize>,
    pub sensor: Vec<usize>,
}

/// Named sibling handles resolved once at assembly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlHandles {
    pub body: Option<usize>,
    pub motility: Option<usize>,
}

/// What a hook sees: its owner's id and the whole world
pub struct ControlContext<'w> {
    pub owner: EntityId,
    pub world: &'w mut World,
    /// Seconds covered by this firing
    pub dt: f32,
    signals: Vec<ControlSignal>,
}

impl<'w> ControlContext<'w> {
    pub fn new(owner: EntityId, world: &'w mut World, dt: f32) -> Self {
        Self {
            owner,
            world,
            dt,
            signals: Vec::new(),
        }
    }

    /// The owning entity, also while it is being released
    pub fn owner(&self) -> Option<&OrganismEntity> {
        self.world
            .entities
            .slot(self.owner.index)
            .filter(|entity| entity.id() == self.owner)
    }

    pub fn owner_mut(&mut self) -> Option<&mut OrganismEntity> {
        self.world.entities.get_any_mut(self.owner)
    }

    pub fn signal(&mut self, signal: ControlSignal) {
        self.signals.push(signal);
    }
}

#[derive(Debug, Clone)]
pub enum ComponentControl {
    /// Essentials and generic parts: stats only
    Passive,
    SingleCell(SingleCellControl),
    Magnoliophyta(MagnoliophytaControl),
    Motility(MotilityControl),
    Contact(ContactControl),
    Grab(GrabControl),
    Tentacle(TentacleControl),
    Vacuum(VacuumControl),
}

impl ComponentControl {
    /// Factory pairing each definition variant with its control
    pub fn generate(def: &ComponentDefinition) -> Self {
        match &def.kind {
            ComponentKind::Body(body) => match &body.plan {
                BodyPlan::SingleCell(tuning) => {
                    ComponentControl::SingleCell(SingleCellControl::new(*tuning, body.internal_anchors.clone()))
                }
                BodyPlan::Magnoliophyta => ComponentControl::Magnoliophyta(MagnoliophytaControl::default()),
            },
            // Pseudopodia only contribute stats and spatial reach
            ComponentKind::Essential | ComponentKind::Generic | ComponentKind::Pseudopodia(_) => {
                ComponentControl::Passive
            }
            ComponentKind::HunterContact(t) => ComponentControl::Contact(ContactControl::new(*t)),
            ComponentKind::HunterGrab(t) => ComponentControl::Grab(GrabControl::new(*t)),
            ComponentKind::HunterTentacle(t) => ComponentControl::Tentacle(TentacleControl::new(*t)),
            ComponentKind::HunterVacuum(t) => ComponentControl::Vacuum(VacuumControl::new(*t)),
            ComponentKind::Motility(t) => ComponentControl::Motility(MotilityControl::new(*t)),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        let (spawn, despawn, update, sensor) = match self {
            ComponentControl::Passive => (false, false, false, false),
            ComponentControl::SingleCell(_) => (true, true, true, false),
            ComponentControl::Magnoliophyta(_) => (true, false, false, false),
            ComponentControl::Motility(_) => (true, false, true, false),
            ComponentControl::Contact(_) => (false, false, true, false),
            ComponentControl::Grab(_) => (false, true, true, true),
            ComponentControl::Tentacle(_) => (true, true, true, true),
            ComponentControl::Vacuum(_) => (false, false, true, false),
        };
        Capabilities {
            spawn,
            despawn,
            update,
            sensor,
        }
    }

    pub fn on_spawn(&mut self, ctx: &mut ControlContext<'_>) {
        match self {
            ComponentControl::SingleCell(c) => c.on_spawn(ctx),
            ComponentControl::Magnoliophyta(c) => c.on_spawn(),
            ComponentControl::Motility(c) => c.on_spawn(ctx),
            ComponentControl::Tentacle(c) => c.on_spawn(),
            _ => {}
        }
    }

    pub fn on_despawn(&mut self, ctx: &mut ControlContext<'_>) {
        match self {
            ComponentControl::SingleCell(c) => c.on_despawn(ctx),
            ComponentControl::Grab(c) => c.on_despawn(ctx),
            ComponentControl::Tentacle(c) => c.on_despawn(ctx),
            _ => {}
        }
    }

    pub fn update(&mut self, ctx: &mut ControlContext<'_>) {
        match self {
            ComponentControl::SingleCell(c) => c.update(ctx),
            ComponentControl::Motility(c) => c.update(ctx),
            ComponentControl::Contact(c) => c.update(ctx),
            ComponentControl::Grab(c) => c.update(ctx),
            ComponentControl::Tentacle(c) => c.update(ctx),
            ComponentControl::Vacuum(c) => c.update(ctx),
            _ => {}
        }
    }

    pub fn on_sensor_refresh(&mut self, mode: SensorMode, ctx: &mut ControlContext<'_>) {
        if mode != SensorMode::Organism {
            return;
        }
        match self {
            ComponentControl::Grab(c) => c.on_sensor_refresh(ctx),
            ComponentControl::Tentacle(c) => c.on_sensor_refresh(ctx),
            _ => {}
        }
    }

    pub fn receive(&mut self, signal: ControlSignal) {
        if let ComponentControl::Motility(c) = self {
            c.receive(signal);
        }
    }
}

/// Controls of one entity plus their dispatch tables
#[derive(Debug, Clone, Default)]
pub struct ControlSet {
    controls: Vec<ComponentControl>,
    dispatch: Dispatch,
    handles: ControlHandles,
}

impl ControlSet {
    /// Generate one control per definition and classify them by hook
    pub fn generate(definitions: &[Arc<ComponentDefinition>]) -> Self {
        let controls: Vec<ComponentControl> = definitions.iter().map(|def| ComponentControl::generate(def)).collect();

        let mut dispatch = Dispatch::default();
        let mut handles = ControlHandles::default();
        for (i, control) in controls.iter().enumerate() {
            let caps = control.capabilities();
            if caps.spawn {
                dispatch.spawn.push(i);
            }
            if caps.despawn {
                dispatch.despawn.push(i);
            }
            if caps.update {
                dispatch.update.push(i);
            }
            if caps.sensor {
                dispatch.sensor.push(i);
            }
            match control {
                ComponentControl::SingleCell(_) | ComponentControl::Magnoliophyta(_) => {
                    handles.body.get_or_insert(i);
                }
                ComponentControl::Motility(_) => {
                    handles.motility.get_or_insert(i);
                }
                _ => {}
            }
        }

        Self {
            controls,
            dispatch,
            handles,
        }
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ComponentControl> {
        self.controls.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentControl> + '_ {
        self.controls.iter()
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn handles(&self) -> ControlHandles {
        self.handles
    }

    pub fn motility(&self) -> Option<&MotilityControl> {
        match self.controls.get(self.handles.motility?)? {
            ComponentControl::Motility(c) => Some(c),
            _ => None,
        }
    }

    pub fn grab(&self) -> Option<&GrabControl> {
        self.controls.iter().find_map(|c| match c {
            ComponentControl::Grab(grab) => Some(grab),
            _ => None,
        })
    }

    pub fn tentacle(&self) -> Option<&TentacleControl> {
        self.controls.iter().find_map(|c| match c {
            ComponentControl::Tentacle(tentacle) => Some(tentacle),
            _ => None,
        })
    }

    pub(crate) fn run_spawn(&mut self, ctx: &mut ControlContext<'_>) {
        for k in 0..self.dispatch.spawn.len() {
            let i = self.dispatch.spawn[k];
            self.controls[i].on_spawn(ctx);
            self.deliver(ctx);
        }
    }

    pub(crate) fn run_despawn(&mut self, ctx: &mut ControlContext<'_>) {
        for k in 0..self.dispatch.despawn.len() {
            let i = self.dispatch.despawn[k];
            self.controls[i].on_despawn(ctx);
            self.deliver(ctx);
        }
    }

    pub(crate) fn run_update(&mut self, ctx: &mut ControlContext<'_>) {
        for k in 0..self.dispatch.update.len() {
            let i = self.dispatch.update[k];
            self.controls[i].update(ctx);
            self.deliver(ctx);
        }
    }

    pub(crate) fn run_sensor(&mut self, mode: SensorMode, ctx: &mut ControlContext<'_>) {
        for k in 0..self.dispatch.sensor.len() {
            let i = self.dispatch.sensor[k];
            self.controls[i].on_sensor_refresh(mode, ctx);
            self.deliver(ctx);
        }
    }

    fn deliver(&mut self, ctx: &mut ControlContext<'_>) {
        for signal in ctx.signals.drain(..) {
            match signal {
                ControlSignal::HoldMovement(_) => {
                    if let Some(control) = self.handles.motility.and_then(|i| self.controls.get_mut(i)) {
                        control.receive(signal);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    #[test]
    fn test_generate_pairs_one_control_per_definition() {
        let registry = catalog::default_registry().unwrap();
        let template = catalog::hunter_template(&registry).unwrap();
        let defs = template.resolve(&registry).unwrap();
        let set = ControlSet::generate(&defs);

        assert_eq!(set.len(), defs.len());
        assert!(matches!(set.get(0), Some(ComponentControl::SingleCell(_))));
        assert_eq!(set.handles().body, Some(0));
        assert!(set.motility().is_some());
    }

    #[test]
    fn test_dispatch_is_in_definition_order() {
        let registry = catalog::default_registry().unwrap();
        let template = catalog::hunter_template(&registry).unwrap();
        let defs = template.resolve(&registry).unwrap();
        let set = ControlSet::generate(&defs);

        let dispatch = set.dispatch();
        assert_eq!(dispatch.update.first(), Some(&0));
        assert!(dispatch.update.windows(2).all(|w| w[0] < w[1]));
        for &i in &dispatch.sensor {
            assert!(set.get(i).unwrap().capabilities().sensor);
        }
        let passive = set
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, ComponentControl::Passive))
            .map(|(i, _)| i);
        for i in passive {
            assert!(!dispatch.update.contains(&i));
        }
    }

    #[test]
    fn test_pseudopodia_are_passive() {
        let registry = catalog::default_registry().unwrap();
        let def = registry.get(catalog::PSEUDOPODIA).unwrap();
        let control = ComponentControl::generate(def);
        assert!(matches!(control, ComponentControl::Passive));
        assert_eq!(control.capabilities(), Capabilities::default());
    }

    #[test]
    fn test_plant_has_no_motility() {
        let registry = catalog::default_registry().unwrap();
        let template = catalog::plant_template(&registry).unwrap();
        let set = ControlSet::generate(&template.resolve(&registry).unwrap());
        assert!(matches!(set.get(0), Some(ComponentControl::Magnoliophyta(_))));
        assert!(set.motility().is_none());
        assert!(set.dispatch().update.is_empty());
    }
}
