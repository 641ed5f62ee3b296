//! Request-level vocabulary: typed operations and create payloads.
//!
//! Handlers describe what they are about to do as an `Operation` instead of a
//! loose (action name, kind) pair, so each variant carries exactly the target
//! and payload its checks need.

pub mod operation;
pub mod payload;

pub use operation::*;
pub use payload::*;
