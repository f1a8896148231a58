//! Eats whatever edible organism it bumps into head-first.

use super::hunter::{in_cone, is_prey};
use super::ControlContext;
use crate::definition::ContactTuning;

#[derive(Debug, Clone)]
pub struct ContactControl {
    tuning: ContactTuning,
}

impl ContactControl {
    pub fn new(tuning: ContactTuning) -> Self {
        Self { tuning }
    }

    pub fn update(&mut self, ctx: &mut ControlContext<'_>) {
        let Some(owner) = ctx.owner() else {
            return;
        };
        let contacts = owner.contacts.clone();

        for target in contacts {
            let Some(owner) = ctx.world.entities.get(ctx.owner) else {
                return;
            };
            let Some(prey) = ctx.world.entities.get(target) else {
                continue;
            };
            if !is_prey(owner, prey) {
                continue;
            }
            if !in_cone(owner.forward, prey.position - owner.position, self.tuning.contact_angle) {
                continue;
            }
            ctx.world.eat(ctx.owner, target);
        }
    }
}
