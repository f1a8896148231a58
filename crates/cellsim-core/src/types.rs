//! Core type definitions for the simulation.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use glam::Vec2;

/// Identifier of an organism component definition.
///
/// Ids live in a single namespace shared by every definition variant and are
/// assigned once at authoring time. [`ComponentId::INVALID`] is the reserved
/// "nothing selected" sentinel and is never assigned to a definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentId(pub i32);

impl ComponentId {
    pub const INVALID: ComponentId = ComponentId(-1);

    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl Default for ComponentId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "invalid")
        }
    }
}

/// Identifier of a player-authored organism template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(pub i32);

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Generational handle to a pooled organism entity.
///
/// A slot is reused after release, bumping its generation, so handles cached
/// by sensors or hunters go stale instead of aliasing a newer organism.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub index: u32,
    pub generation: u32,
}

impl EntityId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}v{}", self.index, self.generation)
    }
}

/// Generational handle to a pooled energy source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnergySourceId {
    pub index: u32,
    pub generation: u32,
}

impl EnergySourceId {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Kind of energy an organism can feed on (light, sugar, detritus, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnergyKind(pub u32);

/// Kind of environmental hazard an organism may resist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HazardKind(pub u32);

/// Behavior flags carried by organism stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StatFlags(pub u8);

impl StatFlags {
    pub const NONE: StatFlags = StatFlags(0);
    /// Keeps touching organisms instead of separating from them
    pub const STICKY: StatFlags = StatFlags(1 << 0);
    /// Stops on solids instead of bouncing off them
    pub const STICKY_SOLID: StatFlags = StatFlags(1 << 1);
    pub const DIVIDE_LOCKED: StatFlags = StatFlags(1 << 2);
    /// Survives being eaten by living inside the predator
    pub const ENDOBIOTIC: StatFlags = StatFlags(1 << 3);
    pub const TOXIC_IMMUNITY: StatFlags = StatFlags(1 << 4);
    /// Spends itself poisoning whatever it touches
    pub const TOXIC_KAMIKAZI: StatFlags = StatFlags(1 << 5);

    pub fn contains(&self, other: StatFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: StatFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: StatFlags) {
        self.0 &= !other.0;
    }

    pub fn union(self, other: StatFlags) -> StatFlags {
        StatFlags(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for StatFlags {
    type Output = StatFlags;

    fn bitor(self, rhs: StatFlags) -> StatFlags {
        self.union(rhs)
    }
}

/// Axis-aligned rectangle bounding the field; its edges are solid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bounds {
    /// Rectangle of the given size centered on the origin
    pub fn centered(width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(-width * 0.5, -height * 0.5),
            max: Vec2::new(width * 0.5, height * 0.5),
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    /// Clamp a circle of `radius` to lie inside
    pub fn clamp(&self, point: Vec2, radius: f32) -> Vec2 {
        let lo = self.min + Vec2::new(radius, radius);
        let hi = self.max - Vec2::new(radius, radius);
        Vec2::new(
            point.x.clamp(lo.x.min(hi.x), hi.x.max(lo.x)),
            point.y.clamp(lo.y.min(hi.y), hi.y.max(lo.y)),
        )
    }
}

/// Unit vector pointing `degrees` counter-clockwise from +x
pub fn heading(degrees: f32) -> Vec2 {
    Vec2::from_angle(degrees.to_radians())
}

/// Rotate `v` counter-clockwise by `degrees`
pub fn rotate_degrees(v: Vec2, degrees: f32) -> Vec2 {
    heading(degrees).rotate(v)
}

/// Unsigned angle from `a` to `b` in degrees, 0 when either is zero.
///
/// Uses `atan2(perp_dot, dot)` so parallel vectors come out exactly 0.
pub fn angle_degrees(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b).atan2(a.dot(b)).abs().to_degrees()
}
