//! Role resolution.
//!
//! Turns an authenticated `Principal` into a `Subject`: the effective role, the
//! staff flag after account rules, and the role-specific profile id the
//! relationship graph starts from. A role tag that has no matching profile is
//! reported as an `IntegrityFailure` instead of silently resolving to nothing.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::error::AuthzError;
use crate::primitives::Principal;
use crate::store::{RelationshipStore, StoreResult};
use crate::types::{ParentId, PrincipalId, ProfileId, Role, TeacherId};

/// Relationship anchor of a resolved subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Superuser or admin tag. Bypasses closures.
    Admin,
    Teacher(TeacherId),
    Parent(ParentId),
    /// Manager or unset tag: no relationship profile, empty closures.
    Detached,
}

/// A principal after role resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subject {
    pub principal: PrincipalId,
    pub role: Role,
    pub is_staff: bool,
    pub profile: Profile,
}

impl Subject {
    pub fn is_admin(&self) -> bool {
        self.profile == Profile::Admin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrityCode {
    /// The role tag names a profile kind that has no record.
    MissingProfile,
    /// The store returned a profile of another kind than the tag names.
    ProfileKindMismatch,
}

impl IntegrityCode {
    pub fn as_str(self) -> &'static str {
        match self {
            IntegrityCode::MissingProfile => "missing_profile",
            IntegrityCode::ProfileKindMismatch => "profile_kind_mismatch",
        }
    }
}

impl fmt::Display for IntegrityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inconsistent role data for one principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntegrityFailure {
    pub principal: PrincipalId,
    pub role: Role,
    pub code: IntegrityCode,
}

impl From<IntegrityFailure> for AuthzError {
    fn from(failure: IntegrityFailure) -> Self {
        AuthzError::DataIntegrity {
            principal: failure.principal,
            role: failure.role,
            code: failure.code.as_str(),
        }
    }
}

/// Outcome of resolving a principal.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved(Subject),
    IntegrityFailure(IntegrityFailure),
    /// The principal id is not known to the store.
    Unauthenticated,
}

impl Resolution {
    pub fn subject(&self) -> Option<&Subject> {
        match self {
            Resolution::Resolved(subject) => Some(subject),
            _ => None,
        }
    }
}

/// Maps principals to subjects through the store.
#[derive(Debug)]
pub struct RoleResolver<S: RelationshipStore> {
    store: Arc<S>,
}

impl<S: RelationshipStore> Clone for RoleResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RelationshipStore> RoleResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Resolves an already authenticated principal.
    pub fn resolve(&self, principal: &Principal) -> StoreResult<Resolution> {
        let is_staff = principal.effective_staff();
        if principal.is_admin() {
            return Ok(Resolution::Resolved(Subject {
                principal: principal.id,
                role: Role::Admin,
                is_staff,
                profile: Profile::Admin,
            }));
        }

        if !principal.role.has_profile() {
            return Ok(Resolution::Resolved(Subject {
                principal: principal.id,
                role: principal.role,
                is_staff,
                profile: Profile::Detached,
            }));
        }

        let found = self.store.profile_for_principal(principal.id, principal.role)?;
        let profile = match (principal.role, found) {
            (Role::Teacher, Some(ProfileId::Teacher(id))) => Ok(Profile::Teacher(id)),
            (Role::Parent, Some(ProfileId::Parent(id))) => Ok(Profile::Parent(id)),
            (_, None) => Err(IntegrityCode::MissingProfile),
            (_, Some(_)) => Err(IntegrityCode::ProfileKindMismatch),
        };

        match profile {
            Ok(profile) => Ok(Resolution::Resolved(Subject {
                principal: principal.id,
                role: principal.role,
                is_staff,
                profile,
            })),
            Err(code) => {
                warn!(
                    principal = %principal.id,
                    role = %principal.role,
                    code = %code,
                    "role tag has no matching profile"
                );
                Ok(Resolution::IntegrityFailure(IntegrityFailure {
                    principal: principal.id,
                    role: principal.role,
                    code,
                }))
            }
        }
    }

    /// Loads the principal first. Unknown ids are `Unauthenticated`.
    pub fn resolve_id(&self, id: PrincipalId) -> StoreResult<Resolution> {
        match self.store.principal(id)? {
            Some(principal) => self.resolve(&principal),
            None => Ok(Resolution::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn superuser_resolves_to_admin_without_profile_lookup() {
        let mut store = MemoryStore::new();
        let mut principal = Principal::new(PrincipalId::new_v4(), Role::Parent);
        principal.is_superuser = true;
        store.add_principal(principal.clone());
        let store = Arc::new(store);

        let resolution = RoleResolver::new(Arc::clone(&store)).resolve(&principal).unwrap();
        let subject = resolution.subject().copied().unwrap();
        assert!(subject.is_admin());
        assert_eq!(subject.role, Role::Admin);
        assert_eq!(store.round_trips(), 0);
    }

    #[test]
    fn teacher_tag_without_profile_is_an_integrity_failure() {
        let mut store = MemoryStore::new();
        let principal = Principal::new(PrincipalId::new_v4(), Role::Teacher);
        store.add_principal(principal.clone());

        let resolution = RoleResolver::new(Arc::new(store)).resolve(&principal).unwrap();
        assert_eq!(
            resolution,
            Resolution::IntegrityFailure(IntegrityFailure {
                principal: principal.id,
                role: Role::Teacher,
                code: IntegrityCode::MissingProfile,
            })
        );
    }

    #[test]
    fn parent_resolves_to_its_profile() {
        let mut store = MemoryStore::new();
        let (principal, parent) = store.enroll_parent();
        let resolver = RoleResolver::new(Arc::new(store));

        let resolution = resolver.resolve_id(principal.id).unwrap();
        let subject = resolution.subject().copied().unwrap();
        assert_eq!(subject.profile, Profile::Parent(parent));
        assert!(!subject.is_staff);
    }

    #[test]
    fn manager_is_detached() {
        let mut store = MemoryStore::new();
        let mut principal = Principal::new(PrincipalId::new_v4(), Role::Manager);
        principal.is_staff = true;
        store.add_principal(principal.clone());

        let resolution = RoleResolver::new(Arc::new(store)).resolve(&principal).unwrap();
        let subject = resolution.subject().copied().unwrap();
        assert_eq!(subject.profile, Profile::Detached);
        assert!(subject.is_staff);
    }

    #[test]
    fn unknown_principal_is_unauthenticated() {
        let resolver = RoleResolver::new(Arc::new(MemoryStore::new()));
        assert_eq!(
            resolver.resolve_id(PrincipalId::new_v4()).unwrap(),
            Resolution::Unauthenticated
        );
    }
}
