//! Body plan controls.

use super::ControlContext;
use crate::definition::SingleCellTuning;
use cellsim_core::{StatFlags, Vec2};
use tracing::debug;

/// Single cell: keeps apart from neighbours, bounces off the field edge and
/// hosts endobionts on its internal anchors.
#[derive(Debug, Clone)]
pub struct SingleCellControl {
    tuning: SingleCellTuning,
    internal_anchors: Vec<Vec2>,
}

impl SingleCellControl {
    pub fn new(tuning: SingleCellTuning, internal_anchors: Vec<Vec2>) -> Self {
        Self {
            tuning,
            internal_anchors,
        }
    }

    pub fn on_spawn(&mut self, ctx: &mut ControlContext<'_>) {
        let offsets = self.internal_anchors.clone();
        if let Some(owner) = ctx.owner_mut() {
            owner.internal.enable(offsets);
        }
    }

    /// Guests of a dying host go back to the field where the host was
    pub fn on_despawn(&mut self, ctx: &mut ControlContext<'_>) {
        let Some(owner) = ctx.owner_mut() else {
            return;
        };
        let position = owner.position;
        let guests = owner.internal.take_guests();
        for guest in guests {
            if let Some(entity) = ctx.world.entities.get_mut(guest) {
                entity.attached_to = None;
                entity.physics_locked = false;
                entity.position = position;
                debug!(guest = %guest, event = "endobiont_detach", "Endobiont freed");
            }
        }
    }

    pub fn update(&mut self, ctx: &mut ControlContext<'_>) {
        if ctx.owner().is_some_and(|owner| owner.is_attached()) {
            return;
        }
        self.separate(ctx);
        self.bounce(ctx);
        self.poison_contacts(ctx);
    }

    fn separate(&self, ctx: &mut ControlContext<'_>) {
        let Some(owner) = ctx.owner() else {
            return;
        };
        if owner.stats.has_flag(StatFlags::STICKY) || owner.physics_locked {
            return;
        }

        let mut push = Vec2::ZERO;
        for id in &owner.contacts {
            let Some(other) = ctx.world.entities.get(*id) else {
                continue;
            };
            let offset = owner.position - other.position;
            let overlap = owner.radius() + other.radius() - offset.length();
            if overlap > 0.0 {
                let away = match offset.normalize_or_zero() {
                    dir if dir == Vec2::ZERO => owner.forward,
                    dir => dir,
                };
                push += away * overlap;
            }
        }

        let dt = ctx.dt;
        let separation = self.tuning.separation;
        if let Some(owner) = ctx.owner_mut() {
            owner.velocity.add(push * (separation * dt));
        }
    }

    fn bounce(&self, ctx: &mut ControlContext<'_>) {
        let bounds = ctx.world.bounds;
        let Some(owner) = ctx.owner_mut() else {
            return;
        };
        let sticky = owner.stats.has_flag(StatFlags::STICKY_SOLID);
        let keep = if sticky { 0.0 } else { self.tuning.bounce };
        let (r, p) = (owner.radius(), owner.position);
        let mut v = owner.velocity.get();

        if (p.x - r <= bounds.min.x && v.x < 0.0) || (p.x + r >= bounds.max.x && v.x > 0.0) {
            v.x = -v.x * keep;
        }
        if (p.y - r <= bounds.min.y && v.y < 0.0) || (p.y + r >= bounds.max.y && v.y > 0.0) {
            v.y = -v.y * keep;
        }
        if v != owner.velocity.get() {
            owner.velocity.set(v);
        }
    }

    /// A kamikaze cell poisons the first foreign, non-immune organism it
    /// touches and dies at its next check.
    fn poison_contacts(&self, ctx: &mut ControlContext<'_>) {
        let Some(owner) = ctx.owner() else {
            return;
        };
        if !owner.stats.has_flag(StatFlags::TOXIC_KAMIKAZI) || owner.stats.toxic <= 0.0 {
            return;
        }
        let toxic = owner.stats.toxic;
        let template = owner.template();
        let victim = owner.contacts.iter().copied().find(|id| {
            ctx.world.entities.get(*id).is_some_and(|other| {
                other.template() != template
                    && !other.is_attached()
                    && !other.stats.has_flag(StatFlags::TOXIC_IMMUNITY)
            })
        });
        let Some(victim) = victim else {
            return;
        };

        if let Some(entity) = ctx.world.entities.get_mut(victim) {
            entity.stats.add_energy(-toxic);
        }
        if let Some(owner) = ctx.owner_mut() {
            owner.stats.expire();
        }
        debug!(entity = %ctx.owner, victim = %victim, event = "organism_kamikaze", "Poisoned contact");
    }
}

/// Rooted plant body. Tracks its intake; growth is not simulated yet.
#[derive(Debug, Clone, Default)]
pub struct MagnoliophytaControl {
    pub nutrients: f32,
    pub water: f32,
    pub light: f32,
}

impl MagnoliophytaControl {
    pub fn on_spawn(&mut self) {
        self.nutrients = 0.0;
        self.water = 0.0;
        self.light = 0.0;
    }
}
