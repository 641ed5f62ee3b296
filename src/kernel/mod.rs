pub mod core;

// Re-export the primary types so `crate::kernel::*` paths stay short.
pub use self::core::{Authorizer, Decision, Session};
