//!
//! Action-mask algebra.
//! Defines the bit flags for actions and the helpers used to derive and test
//! per-role gates from the policy table.

use crate::types::Action;

/// A 32-bit set of actions.
///
/// - Bits 0-4: core actions (LIST, RETRIEVE, CREATE, UPDATE, DELETE).
/// - Bits 5-31: reserved, always zero in masks produced by this crate.
pub type ActionMask = u32;

/// Core action bit flags.
pub mod core {
    use super::ActionMask;

    /// Enumerate the accessible objects of a kind.
    pub const LIST: ActionMask = 1 << 0;
    /// Observe one object.
    pub const RETRIEVE: ActionMask = 1 << 1;
    /// Create a new object.
    pub const CREATE: ActionMask = 1 << 2;
    /// Mutate one object. Implies `RETRIEVE`.
    pub const UPDATE: ActionMask = 1 << 3;
    /// Remove one object. Implies `RETRIEVE`.
    pub const DELETE: ActionMask = 1 << 4;

    pub const ALL: ActionMask = LIST | RETRIEVE | CREATE | UPDATE | DELETE;
}

/// Bit for a single action.
#[inline]
pub fn bit(action: Action) -> ActionMask {
    match action {
        Action::List => core::LIST,
        Action::Retrieve => core::RETRIEVE,
        Action::Create => core::CREATE,
        Action::Update => core::UPDATE,
        Action::Delete => core::DELETE,
    }
}

/// Canonicalizes a mask by adding implied actions.
///
/// Anyone allowed to update or delete an object must be able to see it.
#[inline]
pub fn canonicalise(mask: ActionMask) -> ActionMask {
    let mut m = mask;
    if m & (core::UPDATE | core::DELETE) != 0 {
        m |= core::RETRIEVE;
    }
    m
}

/// Checks if `have` covers every action in `need` once implications are applied.
#[inline]
pub fn sufficient(have: ActionMask, need: ActionMask) -> bool {
    (canonicalise(have) & need) == need
}

/// Checks a single action against a mask.
#[inline]
pub fn permits(have: ActionMask, action: Action) -> bool {
    sufficient(have, bit(action))
}

/// Decodes a mask back into actions, in `Action::ALL` order. Reserved bits are dropped.
pub fn actions(mask: ActionMask) -> Vec<Action> {
    Action::ALL
        .into_iter()
        .filter(|action| mask & bit(*action) != 0)
        .collect()
}
