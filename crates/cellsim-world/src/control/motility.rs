//! Self-propelled movement.
//!
//! The state machine, re-evaluated every behavior firing:
//!
//! - `Held` while a sibling (tentacles) asks the organism to stay put.
//! - `Rest` while energy is below `energy_min_scale` of capacity.
//! - `Retreat` from the nearest sensed organism that could eat us.
//! - `Seek` the nearest sensed prey, or failing that the nearest sensed food.
//! - `Explore` otherwise: every `change_delay` seconds pick `Forward` or
//!   `Turn`, and switch to `TurnAway` when heading into the field edge.
//!
//! Every moving state thrusts along `forward` and pays `energy_rate` per
//! second.

use super::hunter::is_prey;
use super::{ControlContext, ControlSignal};
use crate::definition::MotilityTuning;
use cellsim_core::{rotate_degrees, Vec2};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExploreState {
    Forward,
    Turn,
    TurnAway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotilityState {
    Rest,
    Explore(ExploreState),
    Seek,
    Retreat,
    Held,
}

impl MotilityState {
    pub fn is_moving(&self) -> bool {
        matches!(
            self,
            MotilityState::Explore(_) | MotilityState::Seek | MotilityState::Retreat
        )
    }
}

#[derive(Debug, Clone)]
pub struct MotilityControl {
    tuning: MotilityTuning,
    state: MotilityState,
    change_timer: f32,
    /// +1 counter-clockwise, -1 clockwise
    turn_sign: f32,
    held: bool,
}

impl MotilityControl {
    pub fn new(tuning: MotilityTuning) -> Self {
        Self {
            tuning,
            state: MotilityState::Rest,
            change_timer: 0.0,
            turn_sign: 1.0,
            held: false,
        }
    }

    pub fn state(&self) -> MotilityState {
        self.state
    }

    pub fn is_moving(&self) -> bool {
        self.state.is_moving()
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    pub fn receive(&mut self, signal: ControlSignal) {
        match signal {
            ControlSignal::HoldMovement(hold) => self.held = hold,
        }
    }

    pub fn on_spawn(&mut self, ctx: &mut ControlContext<'_>) {
        self.held = false;
        self.change_timer = 0.0;
        self.turn_sign = if ctx.world.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        self.state = MotilityState::Explore(ExploreState::Forward);
    }

    pub fn update(&mut self, ctx: &mut ControlContext<'_>) {
        let Some(owner) = ctx.owner() else {
            return;
        };
        if owner.is_attached() {
            self.state = MotilityState::Rest;
            return;
        }
        if self.held {
            self.state = MotilityState::Held;
            return;
        }
        if owner.stats.energy_ratio() < self.tuning.energy_min_scale {
            self.state = MotilityState::Rest;
            return;
        }

        let (position, forward) = (owner.position, owner.forward);
        let desired = if let Some(threat) = self.nearest_threat(ctx) {
            self.state = MotilityState::Retreat;
            Some(position - threat)
        } else if let Some(goal) = self.nearest_goal(ctx) {
            self.state = MotilityState::Seek;
            Some(goal - position)
        } else {
            self.explore(ctx, position, forward)
        };

        let dt = ctx.dt;
        let max_turn = self.tuning.turn_speed * self.max_turn_scale(ctx) * dt;
        let heading = match (self.state, desired) {
            (MotilityState::Explore(ExploreState::Turn), _) => rotate_degrees(forward, self.turn_sign * max_turn),
            (_, Some(desired)) => steer(forward, desired, max_turn),
            _ => forward,
        };

        let Some(owner) = ctx.owner_mut() else {
            return;
        };
        owner.forward = heading;
        let thrust = owner.stats.forward_accel * self.tuning.forward_speed * dt;
        let limit = owner.stats.speed_limit;
        let v = (owner.velocity.get() + heading * thrust).clamp_length_max(limit);
        owner.velocity.set(v);
        owner.stats.add_energy(-self.tuning.energy_rate * dt);
    }

    fn max_turn_scale(&self, ctx: &ControlContext<'_>) -> f32 {
        ctx.owner().map_or(0.0, |owner| owner.stats.turn_accel)
    }

    fn nearest_threat(&self, ctx: &ControlContext<'_>) -> Option<Vec2> {
        let owner = ctx.owner()?;
        owner
            .sensor
            .organisms()
            .iter()
            .filter_map(|id| ctx.world.entities.get(*id))
            .filter(|other| !other.is_attached() && other.stats.can_eat(&owner.stats))
            .map(|other| other.position)
            .min_by(|a, b| a.distance(owner.position).total_cmp(&b.distance(owner.position)))
    }

    fn nearest_goal(&self, ctx: &ControlContext<'_>) -> Option<Vec2> {
        let owner = ctx.owner()?;
        let by_distance = |a: &Vec2, b: &Vec2| a.distance(owner.position).total_cmp(&b.distance(owner.position));

        let prey = owner
            .sensor
            .organisms()
            .iter()
            .filter_map(|id| ctx.world.entities.get(*id))
            .filter(|other| is_prey(owner, other))
            .map(|other| other.position)
            .min_by(by_distance);
        if prey.is_some() {
            return prey;
        }

        owner
            .sensor
            .energy()
            .iter()
            .filter_map(|id| ctx.world.sources.get(*id))
            .filter(|source| owner.stats.energy_match(source.kind, source.ignore_match))
            .map(|source| source.position)
            .min_by(by_distance)
    }

    fn explore(&mut self, ctx: &mut ControlContext<'_>, position: Vec2, forward: Vec2) -> Option<Vec2> {
        let bounds = ctx.world.bounds;
        let radius = ctx.owner().map_or(0.0, |owner| owner.radius());
        let margin = radius * 3.0;
        let ahead = position + forward * margin;
        let clamped = bounds.clamp(ahead, radius);
        if clamped != ahead {
            self.state = MotilityState::Explore(ExploreState::TurnAway);
            return Some(bounds.center() - position);
        }

        self.change_timer += ctx.dt;
        let deciding = !matches!(self.state, MotilityState::Explore(ExploreState::Forward | ExploreState::Turn));
        if deciding || self.change_timer >= self.tuning.change_delay {
            self.change_timer = 0.0;
            let rng = &mut ctx.world.rng;
            self.state = if rng.gen_bool(0.5) {
                MotilityState::Explore(ExploreState::Forward)
            } else {
                self.turn_sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
                MotilityState::Explore(ExploreState::Turn)
            };
        }
        None
    }
}

/// Rotate `forward` toward `desired` by at most `max_degrees`
fn steer(forward: Vec2, desired: Vec2, max_degrees: f32) -> Vec2 {
    if desired == Vec2::ZERO {
        return forward;
    }
    let limit = max_degrees.max(0.0);
    let signed = forward.perp_dot(desired).atan2(forward.dot(desired)).to_degrees();
    rotate_degrees(forward, signed.clamp(-limit, limit)).normalize_or_zero()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellsim_core::angle_degrees;

    #[test]
    fn test_moving_states() {
        assert!(MotilityState::Explore(ExploreState::Forward).is_moving());
        assert!(MotilityState::Explore(ExploreState::Turn).is_moving());
        assert!(MotilityState::Explore(ExploreState::TurnAway).is_moving());
        assert!(MotilityState::Seek.is_moving());
        assert!(MotilityState::Retreat.is_moving());
        assert!(!MotilityState::Rest.is_moving());
        assert!(!MotilityState::Held.is_moving());
    }

    #[test]
    fn test_steer_is_rate_limited() {
        let forward = Vec2::new(1.0, 0.0);
        let turned = steer(forward, Vec2::new(0.0, 1.0), 30.0);
        assert!((angle_degrees(forward, turned) - 30.0).abs() < 1e-3);
        assert!(turned.y > 0.0);

        let clockwise = steer(forward, Vec2::new(0.0, -1.0), 30.0);
        assert!(clockwise.y < 0.0);

        let snapped = steer(forward, Vec2::new(1.0, 0.1), 90.0);
        assert!(angle_degrees(snapped, Vec2::new(1.0, 0.1)) < 1e-2);
    }

    #[test]
    fn test_steer_onto_heading_keeps_it() {
        let forward = Vec2::new(1.0, 0.1).normalize();
        let kept = steer(forward, Vec2::new(2.0, 0.2), 45.0);
        assert!((kept - forward).length() < 1e-6);
        assert_eq!(steer(forward, Vec2::ZERO, 45.0), forward);
    }

    #[test]
    fn test_hold_signal() {
        let mut control = MotilityControl::new(MotilityTuning {
            forward_speed: 1.0,
            turn_speed: 90.0,
            change_delay: 1.0,
            energy_min_scale: 0.1,
            energy_rate: 1.0,
        });
        control.receive(ControlSignal::HoldMovement(true));
        assert!(control.is_held());
        control.receive(ControlSignal::HoldMovement(false));
        assert!(!control.is_held());
    }
}
