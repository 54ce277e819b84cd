//! Typed, generational handles.
//!
//! A [`Handle`] names one slot of one [`SlotPool`](crate::pool::SlotPool): the
//! pool's [`Category`], the slot index, and the generation the slot had when
//! the handle was issued. The generation is bumped every time the slot is
//! despawned, so a handle held across a despawn/respawn cycle stops validating
//! instead of silently addressing the new occupant.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// The kind of entity a pool stores. Every pool owns exactly one category and
/// rejects handles issued for any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Never issued by a pool. Useful as a placeholder for "no entity".
    Invalid,
    Player,
    Enemy,
    LightCrystal,
    Boss,
    Projectile,
    Pickup,
}

impl Category {
    /// Every category a pool can be created for, in declaration order.
    pub const ALL: [Category; 7] = [
        Category::Invalid,
        Category::Player,
        Category::Enemy,
        Category::LightCrystal,
        Category::Boss,
        Category::Projectile,
        Category::Pickup,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Invalid => "invalid",
            Category::Player => "player",
            Category::Enemy => "enemy",
            Category::LightCrystal => "light_crystal",
            Category::Boss => "boss",
            Category::Projectile => "projectile",
            Category::Pickup => "pickup",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// A stable, validatable reference to a pool slot.
///
/// Equality is structural over all three fields. Ordering is by category,
/// then index, then generation, which gives maps keyed by handles a
/// deterministic iteration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    category: Category,
    index: u32,
    generation: u32,
}

impl Handle {
    /// Construct a handle from its parts.
    #[inline]
    pub fn new(category: Category, index: u32, generation: u32) -> Self {
        Self {
            category,
            index,
            generation,
        }
    }

    /// A handle that no pool will ever validate.
    #[inline]
    pub fn invalid() -> Self {
        Self::new(Category::Invalid, u32::MAX, u32::MAX)
    }

    #[inline]
    pub fn category(self) -> Category {
        self.category
    }

    /// Slot index inside the owning pool.
    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot at the time the handle was issued.
    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Handle({}#{}v{})",
            self.category, self.index, self.generation
        )
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}v{}", self.category, self.index, self.generation)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
