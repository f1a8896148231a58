//! Suction feeding: pulls edible organisms in front of the mouth closer and
//! swallows those that touch it.

use super::hunter::{in_cone, is_prey};
use super::ControlContext;
use crate::definition::VacuumTuning;
use cellsim_core::Vec2;

/// Share of the suction felt by the hunter itself
const SELF_PULL: f32 = 0.25;

#[derive(Debug, Clone)]
pub struct VacuumControl {
    tuning: VacuumTuning,
}

impl VacuumControl {
    pub fn new(tuning: VacuumTuning) -> Self {
        Self { tuning }
    }

    pub fn update(&mut self, ctx: &mut ControlContext<'_>) {
        self.swallow(ctx);
        self.pull(ctx);
    }

    fn swallow(&self, ctx: &mut ControlContext<'_>) {
        let Some(owner) = ctx.owner() else {
            return;
        };
        let contacts = owner.contacts.clone();
        for target in contacts {
            let Some(owner) = ctx.world.entities.get(ctx.owner) else {
                return;
            };
            let edible = ctx.world.entities.get(target).is_some_and(|prey| {
                is_prey(owner, prey) && in_cone(owner.forward, prey.position - owner.position, self.tuning.vacuum_angle)
            });
            if edible {
                ctx.world.eat(ctx.owner, target);
            }
        }
    }

    fn pull(&self, ctx: &mut ControlContext<'_>) {
        let dt = ctx.dt;
        let Some(owner) = ctx.world.entities.get(ctx.owner) else {
            return;
        };
        let (center, forward) = (owner.position, owner.forward);

        let mut targets = Vec::new();
        for id in owner.sensor.organisms() {
            let Some(prey) = ctx.world.entities.get(*id) else {
                continue;
            };
            let offset = prey.position - center;
            if offset.length() > self.tuning.vacuum_radius
                || !in_cone(forward, offset, self.tuning.vacuum_angle)
                || !is_prey(owner, prey)
            {
                continue;
            }
            targets.push((*id, offset));
        }
        if targets.is_empty() {
            return;
        }

        let mut aggregate = Vec2::ZERO;
        for (id, offset) in targets {
            let dir = offset.normalize_or_zero();
            aggregate += dir;
            if let Some(prey) = ctx.world.entities.get_mut(id) {
                if !prey.physics_locked {
                    let scale = prey.stats.velocity_receive_scale;
                    prey.velocity.add(-dir * (self.tuning.vacuum_accel * scale * dt));
                }
            }
        }

        if let Some(owner) = ctx.owner_mut() {
            let nudge = aggregate.normalize_or_zero() * (self.tuning.vacuum_accel * SELF_PULL * dt);
            owner.velocity.add(nudge);
        }
    }
}
