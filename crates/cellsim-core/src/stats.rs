//! Per-organism numeric state and the energy economy.

use crate::{EnergyKind, HazardKind, StatFlags};
use serde::{Deserialize, Serialize};

/// Numeric state of one organism.
///
/// The authored part (mass, acceleration, capacities, flags...) is what
/// component definitions contribute; the runtime part (energy, pending
/// consumption, lock, spawn time) is reset on every spawn and never
/// serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganismStats {
    pub mass: f32,
    pub forward_accel: f32,
    pub turn_accel: f32,
    pub speed_limit: f32,
    /// Scale applied to externally imposed velocity (currents, pulls)
    pub velocity_receive_scale: f32,
    pub energy_capacity: f32,
    /// Energy per second moved from the pending pool into live energy
    pub energy_consume_rate: f32,
    /// Seconds of life, 0 for unbounded
    pub lifespan: f32,
    pub hazard_resistances: Vec<HazardKind>,
    pub energy_sources: Vec<EnergyKind>,
    pub flags: StatFlags,
    pub danger: f32,
    pub toxic: f32,
    /// Smallest prey mass worth hunting
    pub seek_mass_min: f32,
    /// Fraction of capacity handed to a child on division
    pub energy_share: f32,

    #[serde(skip)]
    energy: f32,
    #[serde(skip)]
    energy_prev: f32,
    #[serde(skip)]
    energy_consume: f32,
    #[serde(skip)]
    energy_locked: bool,
    #[serde(skip)]
    spawn_time: f64,
    #[serde(skip)]
    forced_expiry: bool,
}

/// Authored numbers a component definition contributes.
///
/// Convert with `OrganismStats::from` to get a stat block with fresh runtime
/// state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatBlock {
    pub mass: f32,
    pub forward_accel: f32,
    pub turn_accel: f32,
    pub speed_limit: f32,
    pub velocity_receive_scale: f32,
    pub energy_capacity: f32,
    pub energy_consume_rate: f32,
    pub lifespan: f32,
    pub hazard_resistances: Vec<HazardKind>,
    pub energy_sources: Vec<EnergyKind>,
    pub flags: StatFlags,
    pub danger: f32,
    pub toxic: f32,
    pub seek_mass_min: f32,
    pub energy_share: f32,
}

impl From<StatBlock> for OrganismStats {
    fn from(block: StatBlock) -> Self {
        Self {
            mass: block.mass,
            forward_accel: block.forward_accel,
            turn_accel: block.turn_accel,
            speed_limit: block.speed_limit,
            velocity_receive_scale: block.velocity_receive_scale,
            energy_capacity: block.energy_capacity,
            energy_consume_rate: block.energy_consume_rate,
            lifespan: block.lifespan,
            hazard_resistances: block.hazard_resistances,
            energy_sources: block.energy_sources,
            flags: block.flags,
            danger: block.danger,
            toxic: block.toxic,
            seek_mass_min: block.seek_mass_min,
            energy_share: block.energy_share,
            ..Self::default()
        }
    }
}

impl OrganismStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare for a fresh life: half-full energy, nothing pending, unlocked.
    pub fn reset(&mut self, now: f64) {
        self.energy = self.energy_initial();
        self.energy_prev = self.energy;
        self.energy_consume = 0.0;
        self.energy_locked = false;
        self.forced_expiry = false;
        self.spawn_time = now;
    }

    pub fn energy_initial(&self) -> f32 {
        self.energy_capacity * 0.5
    }

    pub fn energy(&self) -> f32 {
        self.energy
    }

    /// Set live energy, clamped into `[0, energy_capacity]`.
    ///
    /// Silently ignored while energy is locked.
    pub fn set_energy(&mut self, value: f32) {
        if self.energy_locked {
            return;
        }
        self.energy = value.clamp(0.0, self.energy_capacity.max(0.0));
    }

    pub fn add_energy(&mut self, delta: f32) {
        self.set_energy(self.energy + delta);
    }

    /// Energy change since the last [`OrganismStats::energy_update`]
    pub fn energy_delta(&self) -> f32 {
        self.energy - self.energy_prev
    }

    pub fn energy_ratio(&self) -> f32 {
        if self.energy_capacity > 0.0 {
            self.energy / self.energy_capacity
        } else {
            0.0
        }
    }

    pub fn is_energy_full(&self) -> bool {
        self.energy >= self.energy_capacity
    }

    pub fn energy_consume(&self) -> f32 {
        self.energy_consume
    }

    /// Queue eaten energy for gradual absorption
    pub fn add_energy_consume(&mut self, amount: f32) {
        if amount > 0.0 {
            self.energy_consume += amount;
        }
    }

    pub fn is_energy_locked(&self) -> bool {
        self.energy_locked
    }

    pub fn lock_energy(&mut self) {
        self.energy_locked = true;
    }

    pub fn unlock_energy(&mut self) {
        self.energy_locked = false;
    }

    pub fn spawn_time(&self) -> f64 {
        self.spawn_time
    }

    /// Force the organism's life to end at the next check
    pub fn expire(&mut self) {
        self.forced_expiry = true;
    }

    pub fn is_life_expired(&self, now: f64) -> bool {
        self.forced_expiry || (self.lifespan > 0.0 && now - self.spawn_time >= self.lifespan as f64)
    }

    /// Absorb part of the pending consumption into live energy.
    ///
    /// At most `energy_consume_rate * dt` moves per call, so food eaten is
    /// digested over time rather than instantly.
    pub fn energy_update(&mut self, dt: f32) {
        self.energy_prev = self.energy;

        if self.energy_locked || self.is_energy_full() || self.energy_consume <= 0.0 {
            return;
        }

        let amount = (self.energy_consume_rate * dt).min(self.energy_consume);
        if amount <= 0.0 {
            return;
        }
        self.energy_consume -= amount;
        self.set_energy(self.energy + amount);
    }

    /// Strict predator/prey ordering; ties never allow eating.
    pub fn can_eat(&self, other: &OrganismStats) -> bool {
        self.danger > other.danger && self.mass > other.mass && other.mass >= self.seek_mass_min
    }

    pub fn hazard_match(&self, hazard: HazardKind) -> bool {
        self.hazard_resistances.contains(&hazard)
    }

    /// Whether a source of `kind` is food. `ignore_match` sources feed anyone.
    pub fn energy_match(&self, kind: EnergyKind, ignore_match: bool) -> bool {
        ignore_match || self.energy_sources.contains(&kind)
    }

    pub fn has_flag(&self, flag: StatFlags) -> bool {
        self.flags.contains(flag)
    }

    /// Replace every field with a copy of `other`
    pub fn copy_from(&mut self, other: &OrganismStats) {
        self.clone_from(other);
    }

    /// Accumulate a component's contribution on top of this stat block.
    pub fn append(&mut self, other: &OrganismStats) {
        self.mass += other.mass;
        self.forward_accel += other.forward_accel;
        self.turn_accel += other.turn_accel;
        self.speed_limit += other.speed_limit;
        self.velocity_receive_scale += other.velocity_receive_scale;
        self.energy_capacity += other.energy_capacity;
        self.energy_consume_rate += other.energy_consume_rate;
        self.lifespan += other.lifespan;
        self.danger += other.danger;
        self.toxic += other.toxic;
        self.seek_mass_min += other.seek_mass_min;
        self.energy_share += other.energy_share;
        self.flags.insert(other.flags);

        for hazard in &other.hazard_resistances {
            if !self.hazard_resistances.contains(hazard) {
                self.hazard_resistances.push(*hazard);
            }
        }
        for source in &other.energy_sources {
            if !self.energy_sources.contains(source) {
                self.energy_sources.push(*source);
            }
        }
    }

    /// Aggregate a body block followed by each attached component's block
    pub fn compose<'a>(parts: impl IntoIterator<Item = &'a OrganismStats>) -> OrganismStats {
        let mut stats = OrganismStats::default();
        let mut first = true;
        for part in parts {
            if first {
                stats.copy_from(part);
                first = false;
            } else {
                stats.append(part);
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn creature(mass: f32, danger: f32) -> OrganismStats {
        OrganismStats {
            mass,
            danger,
            energy_capacity: 100.0,
            energy_consume_rate: 10.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_reset_sets_half_capacity() {
        let mut stats = creature(1.0, 1.0);
        stats.add_energy_consume(40.0);
        stats.lock_energy();
        stats.expire();

        stats.reset(12.0);

        assert_eq!(stats.energy(), 50.0);
        assert_eq!(stats.energy_consume(), 0.0);
        assert!(!stats.is_energy_locked());
        assert!(!stats.is_life_expired(12.0));
        assert_eq!(stats.spawn_time(), 12.0);
    }

    #[test]
    fn test_energy_update_is_gradual() {
        let mut stats = creature(1.0, 1.0);
        stats.reset(0.0);
        stats.add_energy_consume(25.0);

        stats.energy_update(1.0);
        assert_eq!(stats.energy(), 60.0);
        assert_eq!(stats.energy_consume(), 15.0);
        assert_eq!(stats.energy_delta(), 10.0);

        stats.energy_update(2.0);
        assert_eq!(stats.energy(), 75.0);
        assert_eq!(stats.energy_consume(), 0.0);
    }

    #[test]
    fn test_energy_update_skips_when_locked_or_full() {
        let mut stats = creature(1.0, 1.0);
        stats.reset(0.0);
        stats.add_energy_consume(25.0);
        stats.lock_energy();
        stats.energy_update(1.0);
        assert_eq!(stats.energy(), 50.0);
        assert_eq!(stats.energy_consume(), 25.0);

        stats.unlock_energy();
        stats.set_energy(100.0);
        stats.energy_update(1.0);
        assert_eq!(stats.energy(), 100.0);
        assert_eq!(stats.energy_consume(), 25.0);
    }

    #[test]
    fn test_set_energy_while_locked_is_noop() {
        let mut stats = creature(1.0, 1.0);
        stats.reset(0.0);
        stats.lock_energy();
        stats.set_energy(5.0);
        assert_eq!(stats.energy(), 50.0);
    }

    #[test]
    fn test_set_energy_clamps() {
        let mut stats = creature(1.0, 1.0);
        stats.reset(0.0);
        stats.set_energy(500.0);
        assert_eq!(stats.energy(), 100.0);
        stats.add_energy(-1000.0);
        assert_eq!(stats.energy(), 0.0);
    }

    #[test]
    fn test_can_eat_is_strict() {
        let big = creature(2.0, 2.0);
        let small = creature(1.0, 1.0);
        assert!(big.can_eat(&small));
        assert!(!small.can_eat(&big));

        let twin = creature(2.0, 2.0);
        assert!(!big.can_eat(&twin));

        let mut picky = creature(5.0, 5.0);
        picky.seek_mass_min = 1.5;
        assert!(!picky.can_eat(&small));
        assert!(picky.can_eat(&big));
    }

    #[test]
    fn test_lifespan_expiry() {
        let mut stats = creature(1.0, 1.0);
        stats.lifespan = 10.0;
        stats.reset(5.0);
        assert!(!stats.is_life_expired(14.9));
        assert!(stats.is_life_expired(15.0));

        stats.lifespan = 0.0;
        assert!(!stats.is_life_expired(1000.0));
        stats.expire();
        assert!(stats.is_life_expired(5.0));
    }

    #[test]
    fn test_energy_match() {
        let mut stats = creature(1.0, 1.0);
        stats.energy_sources = vec![EnergyKind(1)];
        assert!(stats.energy_match(EnergyKind(1), false));
        assert!(!stats.energy_match(EnergyKind(2), false));
        assert!(stats.energy_match(EnergyKind(2), true));
    }

    #[test]
    fn test_hazard_match() {
        let mut stats = creature(1.0, 1.0);
        stats.hazard_resistances = vec![HazardKind(3)];
        assert!(stats.hazard_match(HazardKind(3)));
        assert!(!stats.hazard_match(HazardKind(4)));
    }

    #[test]
    fn test_compose_copies_then_appends() {
        let body = OrganismStats {
            mass: 1.0,
            energy_capacity: 100.0,
            energy_sources: vec![EnergyKind(1)],
            flags: StatFlags::STICKY,
            ..Default::default()
        };
        let limb = OrganismStats {
            mass: 0.5,
            danger: 2.0,
            energy_sources: vec![EnergyKind(1), EnergyKind(2)],
            flags: StatFlags::TOXIC_IMMUNITY,
            ..Default::default()
        };

        let stats = OrganismStats::compose([&body, &limb]);
        assert_eq!(stats.mass, 1.5);
        assert_eq!(stats.danger, 2.0);
        assert_eq!(stats.energy_capacity, 100.0);
        assert_eq!(stats.energy_sources, vec![EnergyKind(1), EnergyKind(2)]);
        assert!(stats.has_flag(StatFlags::STICKY));
        assert!(stats.has_flag(StatFlags::TOXIC_IMMUNITY));
    }

    #[test]
    fn test_from_stat_block_keeps_authored_fields() {
        let stats = OrganismStats::from(StatBlock {
            mass: 2.0,
            energy_capacity: 40.0,
            energy_sources: vec![EnergyKind(3)],
            flags: StatFlags::STICKY,
            energy_share: 0.25,
            ..Default::default()
        });
        assert_eq!(stats.mass, 2.0);
        assert_eq!(stats.energy_capacity, 40.0);
        assert_eq!(stats.energy_sources, vec![EnergyKind(3)]);
        assert!(stats.has_flag(StatFlags::STICKY));
        assert_eq!(stats.energy_share, 0.25);
        assert_eq!(stats.energy(), 0.0);
        assert!(!stats.is_energy_locked());

        let mut live = stats.clone();
        live.reset(1.0);
        assert_eq!(live.energy(), 20.0);
        assert_eq!(live.spawn_time(), 1.0);
    }

    proptest! {
        #[test]
        fn prop_can_eat_never_mutual(
            m1 in 0.0f32..10.0, d1 in 0.0f32..10.0,
            m2 in 0.0f32..10.0, d2 in 0.0f32..10.0,
        ) {
            let a = creature(m1, d1);
            let b = creature(m2, d2);
            prop_assert!(!(a.can_eat(&b) && b.can_eat(&a)));
        }

        #[test]
        fn prop_energy_stays_in_range(
            ops in proptest::collection::vec((-200.0f32..200.0, 0.0f32..100.0, 0.0f32..2.0), 1..40)
        ) {
            let mut stats = creature(1.0, 1.0);
            stats.reset(0.0);
            for (delta, food, dt) in ops {
                stats.add_energy(delta);
                stats.add_energy_consume(food);
                stats.energy_update(dt);
                prop_assert!(stats.energy() >= 0.0);
                prop_assert!(stats.energy() <= stats.energy_capacity);
                prop_assert!(stats.energy_consume() >= 0.0);
            }
        }
    }
}
