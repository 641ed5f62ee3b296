#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(deprecated)]

//!
//! Tracker-Core is the relationship-based authorization core of an institution
//! tracker.
//!
//! It decides, for every (principal, action, resource) triple, whether access is
//! allowed. Decisions follow multi-hop relationships (parent → child,
//! teacher → group → child) read through a narrow store interface, combined with
//! a static per-role policy table. Persistence, transport and request parsing
//! live outside this crate.

// Typed ids, role tags and the resource/action vocabulary.
pub mod types;

// Records: principals, relationship links, members, messages, day plans.
pub mod primitives;

// Re-export all core records for easier access at the crate root.
pub use primitives::*;

// Action-mask algebra used by the policy table.
pub mod rights;

// Error types.
pub mod error;

// Evaluator configuration.
pub mod config;

// Typed operations and create payloads.
pub mod domain;

// Read-only relationship store seam.
pub mod store;

// Role resolution, closures and the policy registry.
pub mod access;

// Permission evaluator.
pub mod kernel;

#[cfg(feature = "tracing-subscriber")]
pub mod telemetry;

pub use access::{AccessSet, PolicyRegistry, Resolution, Subject};
pub use config::{AuthzConfig, Concealment};
pub use error::{AuthzError, DenyReason, StoreError};
pub use kernel::{Authorizer, Decision, Session};
pub use store::RelationshipStore;
