//! Seizes sensed prey with a limited number of arms and swallows it after a
//! delay.

use super::hunter::{gap, is_prey, StretchPool};
use super::ControlContext;
use crate::definition::GrabTuning;
use cellsim_core::EntityId;
use tracing::debug;

/// One arm holding a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabSlot {
    pub target: EntityId,
    /// Seconds since the grab; drives the stretch-then-retract display
    pub elapsed: f32,
}

#[derive(Debug, Clone)]
pub struct GrabControl {
    tuning: GrabTuning,
    slots: StretchPool<GrabSlot>,
}

impl GrabControl {
    pub fn new(tuning: GrabTuning) -> Self {
        Self {
            slots: StretchPool::new(tuning.grab_count),
            tuning,
        }
    }

    pub fn slots(&self) -> &StretchPool<GrabSlot> {
        &self.slots
    }

    /// Claim at most one newly sensed target per refresh
    pub fn on_sensor_refresh(&mut self, ctx: &mut ControlContext<'_>) {
        if !self.slots.has_free() {
            return;
        }
        let Some(owner) = ctx.world.entities.get(ctx.owner) else {
            return;
        };

        let candidate = owner.sensor.organisms().iter().copied().find(|id| {
            ctx.world.entities.get(*id).is_some_and(|target| {
                !target.physics_locked
                    && is_prey(owner, target)
                    && gap(owner, target) <= self.tuning.grab_radius
            })
        });
        let Some(target) = candidate else {
            return;
        };

        if self.slots.claim(GrabSlot { target, elapsed: 0.0 }).is_ok() {
            if let Some(entity) = ctx.world.entities.get_mut(target) {
                entity.physics_locked = true;
                entity.velocity.clear();
            }
            debug!(hunter = %ctx.owner, target = %target, event = "organism_grab", "Grabbed prey");
        }
    }

    pub fn update(&mut self, ctx: &mut ControlContext<'_>) {
        let active: Vec<usize> = self.slots.iter().map(|(i, _)| i).collect();
        for i in active {
            let Some(slot) = self.slots.get_mut(i) else {
                continue;
            };
            slot.elapsed += ctx.dt;
            let (target, elapsed) = (slot.target, slot.elapsed);

            if !ctx.world.entities.is_alive(target) {
                self.slots.release(i);
                continue;
            }
            // Swallow only once the hold has lasted longer than the delay
            if elapsed > self.tuning.grab_delay {
                if let Some(entity) = ctx.world.entities.get_mut(target) {
                    entity.physics_locked = false;
                }
                ctx.world.eat(ctx.owner, target);
                self.slots.release(i);
            }
        }

        // Anything weaker already touching us is swallowed on the spot
        let Some(owner) = ctx.owner() else {
            return;
        };
        let contacts = owner.contacts.clone();
        for target in contacts {
            let Some(owner) = ctx.world.entities.get(ctx.owner) else {
                return;
            };
            let weaker = ctx.world.entities.get(target).is_some_and(|prey| {
                owner.template() != prey.template() && !prey.is_attached() && prey.stats.danger < owner.stats.danger
            });
            if weaker {
                ctx.world.eat(ctx.owner, target);
            }
        }
    }

    /// Let go of everything still held
    pub fn on_despawn(&mut self, ctx: &mut ControlContext<'_>) {
        for slot in self.slots.drain() {
            if let Some(entity) = ctx.world.entities.get_mut(slot.target) {
                entity.physics_locked = false;
            }
        }
    }
}
