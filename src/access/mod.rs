//! Access-control building blocks: role resolution, relationship closures and
//! the static policy table. The evaluator in `kernel` composes them.

pub mod graph;
pub mod policy;
pub mod role;

pub use graph::{AccessSet, RelationshipGraph};
pub use policy::{editable_child_fields, Grant, PolicyRegistry, PolicyRow};
pub use role::{IntegrityCode, IntegrityFailure, Profile, Resolution, RoleResolver, Subject};
// Also expose the rights algebra under a shorter path.
pub use crate::rights;
