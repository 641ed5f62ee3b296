//!
//! Defines error types for the authorization core.

use crate::types::{PrincipalId, Role};

/// Failures of the relationship store seam.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or timed out.
    #[error("Relationship store unavailable: {0}")]
    Unavailable(String),
    /// The store returned data that cannot be interpreted.
    #[error("Relationship store returned corrupt data: {0}")]
    Corrupt(String),
}

/// Why a request was denied.
///
/// Every variant maps to a stable reason code so operators can tell a
/// legitimate denial from inconsistent role data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Phase 1: the role may not attempt this action on this kind at all.
    NotPermitted,
    /// Phase 2: the object exists but is outside the principal's closure.
    OutOfScope,
    /// The targeted object does not exist in the store.
    ObjectMissing,
    /// An object-targeting action was requested without an object id, or with an id of another kind.
    MissingObject,
    /// The principal's role tag has no matching profile record.
    IntegrityFailure,
    /// The update touches fields the role may not edit.
    FieldNotEditable,
}

impl DenyReason {
    pub fn code(self) -> &'static str {
        match self {
            DenyReason::NotPermitted => "not_permitted",
            DenyReason::OutOfScope => "out_of_scope",
            DenyReason::ObjectMissing => "object_missing",
            DenyReason::MissingObject => "missing_object",
            DenyReason::IntegrityFailure => "integrity_failure",
            DenyReason::FieldNotEditable => "field_not_editable",
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors surfaced by the authorization core to request handlers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// No principal was presented.
    #[error("Authentication required")]
    Unauthenticated,
    /// The gate or scope check failed.
    #[error("Forbidden: {0}")]
    Forbidden(DenyReason),
    /// The object is absent, or its existence is being concealed.
    #[error("Not found")]
    NotFound,
    /// A role tag without a matching profile. Internal: request handlers
    /// normally see this as `Forbidden(IntegrityFailure)`.
    #[error("Role `{role}` of principal {principal} has no matching profile ({code})")]
    DataIntegrity {
        principal: PrincipalId,
        role: Role,
        code: &'static str,
    },
    /// A create payload failed a binding check.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
    /// A create payload collides with an existing record.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AuthzError {
    /// Whether handlers should treat this as an access denial.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            AuthzError::Unauthenticated
                | AuthzError::Forbidden(_)
                | AuthzError::NotFound
                | AuthzError::DataIntegrity { .. }
        )
    }
}
