//! Tentacles that reach out to sensed prey and siphon its energy.
//!
//! Each tentacle runs `Tract -> Absorb -> Retract`. While any tentacle is
//! out, the owner's motility is told to hold still.

use super::hunter::{is_prey, StretchPool};
use super::{ControlContext, ControlSignal};
use crate::definition::TentacleTuning;
use cellsim_core::EntityId;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TentaclePhase {
    Tract,
    Absorb,
    Retract,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TentacleSlot {
    pub target: EntityId,
    pub phase: TentaclePhase,
    /// Seconds spent in the current phase
    pub elapsed: f32,
    /// Visual stretch, 0 retracted and 1 fully extended
    pub extent: f32,
}

#[derive(Debug, Clone)]
pub struct TentacleControl {
    tuning: TentacleTuning,
    slots: StretchPool<TentacleSlot>,
    holding: bool,
}

impl TentacleControl {
    pub fn new(tuning: TentacleTuning) -> Self {
        Self {
            slots: StretchPool::new(tuning.tentacle_count),
            tuning,
            holding: false,
        }
    }

    pub fn slots(&self) -> &StretchPool<TentacleSlot> {
        &self.slots
    }

    pub fn is_holding(&self) -> bool {
        self.holding
    }

    pub fn on_spawn(&mut self) {
        self.slots.drain();
        self.holding = false;
    }

    pub fn on_sensor_refresh(&mut self, ctx: &mut ControlContext<'_>) {
        if !self.slots.has_free() {
            return;
        }
        let Some(owner) = ctx.world.entities.get(ctx.owner) else {
            return;
        };

        let taken: Vec<EntityId> = self.slots.iter().map(|(_, slot)| slot.target).collect();
        let candidate = owner.sensor.organisms().iter().copied().find(|id| {
            !taken.contains(id)
                && ctx.world.entities.get(*id).is_some_and(|target| {
                    is_prey(owner, target) && owner.position.distance(target.position) <= self.tuning.tentacle_radius
                })
        });
        let Some(target) = candidate else {
            return;
        };

        let slot = TentacleSlot {
            target,
            phase: TentaclePhase::Tract,
            elapsed: 0.0,
            extent: 0.0,
        };
        if self.slots.claim(slot).is_ok() {
            debug!(hunter = %ctx.owner, target = %target, event = "organism_tentacle", "Tentacle reaching out");
            self.sync_hold(ctx);
        }
    }

    pub fn update(&mut self, ctx: &mut ControlContext<'_>) {
        let dt = ctx.dt;
        let active: Vec<usize> = self.slots.iter().map(|(i, _)| i).collect();
        for i in active {
            let Some(mut slot) = self.slots.get(i).copied() else {
                continue;
            };
            slot.elapsed += dt;
            let done = match slot.phase {
                TentaclePhase::Tract => {
                    self.tract(&mut slot, ctx);
                    false
                }
                TentaclePhase::Absorb => {
                    self.absorb(&mut slot, ctx);
                    false
                }
                TentaclePhase::Retract => {
                    slot.extent = self.progress(slot.elapsed, 1.0);
                    slot.elapsed >= self.tuning.tract_delay
                }
            };
            if done {
                self.slots.release(i);
            } else if let Some(stored) = self.slots.get_mut(i) {
                *stored = slot;
            }
        }
        self.sync_hold(ctx);
    }

    pub fn on_despawn(&mut self, ctx: &mut ControlContext<'_>) {
        self.slots.drain();
        self.sync_hold(ctx);
    }

    /// Fraction of the tract delay still remaining (`from` = 1) or already
    /// covered (`from` = 0)
    fn progress(&self, elapsed: f32, from: f32) -> f32 {
        let t = if self.tuning.tract_delay > 0.0 {
            (elapsed / self.tuning.tract_delay).min(1.0)
        } else {
            1.0
        };
        (from - t).abs()
    }

    fn tract(&self, slot: &mut TentacleSlot, ctx: &mut ControlContext<'_>) {
        let (Some(owner), Some(target)) = (ctx.world.entities.get(ctx.owner), ctx.world.entities.get(slot.target)) else {
            retract(slot);
            return;
        };
        slot.extent = self.progress(slot.elapsed, 0.0);
        let collapsed = owner.position.distance(target.position) <= owner.radius() + target.radius();
        if slot.extent >= 1.0 || collapsed {
            slot.phase = TentaclePhase::Absorb;
            slot.elapsed = 0.0;
            slot.extent = 1.0;
        }
    }

    fn absorb(&self, slot: &mut TentacleSlot, ctx: &mut ControlContext<'_>) {
        let now = ctx.world.time();
        let dt = ctx.dt;
        let Some((owner, target)) = ctx.world.entities.pair_mut(ctx.owner, slot.target) else {
            retract(slot);
            return;
        };
        if target.stats.is_life_expired(now) || target.stats.energy() <= 0.0 {
            retract(slot);
            return;
        }

        let offset = target.position - owner.position;
        let distance = offset.length();
        if distance > self.tuning.absorb_range_max {
            retract(slot);
            return;
        }
        if distance > self.tuning.absorb_range_min {
            owner.velocity.add(offset.normalize_or_zero() * (self.tuning.pull_accel * dt));
        }

        let amount = (owner.stats.energy_consume_rate * dt).min(target.stats.energy());
        if amount > 0.0 && !target.stats.is_energy_locked() && !owner.stats.is_energy_locked() {
            target.stats.add_energy(-amount);
            owner.stats.add_energy(amount);
        }
    }

    fn sync_hold(&mut self, ctx: &mut ControlContext<'_>) {
        let holding = self.slots.active_count() > 0;
        if holding != self.holding {
            self.holding = holding;
            ctx.signal(ControlSignal::HoldMovement(holding));
        }
    }
}

fn retract(slot: &mut TentacleSlot) {
    slot.phase = TentaclePhase::Retract;
    slot.elapsed = 0.0;
}
