//! Shared identifier and tag types.
//!
//! Records themselves (principals, children, messages, ...) live in
//! `primitives.rs`. This module holds the small `Copy` vocabulary that every
//! other module passes around: typed ids, the role tag, the assignment type and
//! the resource/action enums the policy table is keyed on.

use std::fmt;

use uuid::Uuid;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generates a fresh random id.
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

id_type!(
    /// Authenticated identity (the account row).
    PrincipalId
);
id_type!(
    /// Parent profile attached to a principal.
    ParentId
);
id_type!(
    /// Teacher profile attached to a principal.
    TeacherId
);
id_type!(GroupId);
id_type!(ChildId);
id_type!(MessageId);
id_type!(DayPlanId);

/// Coarse role tag stored on a principal.
///
/// This is the single canonical role field; older records that carried the tag
/// under `user_type` or `user_role` deserialize into it through the aliases on
/// `Principal::role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Teacher,
    Parent,
    Manager,
    #[default]
    Unset,
}

impl Role {
    /// Stable lowercase tag, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Teacher => "teacher",
            Role::Parent => "parent",
            Role::Manager => "manager",
            Role::Unset => "unset",
        }
    }

    /// Whether this role is backed by a role-specific profile record.
    pub fn has_profile(self) -> bool {
        matches!(self, Role::Teacher | Role::Parent)
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "parent" => Ok(Role::Parent),
            "manager" => Ok(Role::Manager),
            "unset" => Ok(Role::Unset),
            other => Err(format!("Invalid role tag: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a teacher is attached to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignedType {
    #[default]
    Primary,
    Support,
}

/// Role-specific profile id returned by the store for a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ProfileId {
    Teacher(TeacherId),
    Parent(ParentId),
}

/// Resource kinds the policy table is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Child,
    Group,
    Message,
    DayPlan,
    /// Institution-wide rosters. Coarse and non-relational: gated on staff
    /// status only.
    Institution,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Child,
        ResourceKind::Group,
        ResourceKind::Message,
        ResourceKind::DayPlan,
        ResourceKind::Institution,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Child => "child",
            ResourceKind::Group => "group",
            ResourceKind::Message => "message",
            ResourceKind::DayPlan => "day_plan",
            ResourceKind::Institution => "institution",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions a principal may attempt on a resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::List,
        Action::Retrieve,
        Action::Create,
        Action::Update,
        Action::Delete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Retrieve => "retrieve",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }

    /// Actions that address one existing object and therefore need a scope check.
    pub fn targets_object(self) -> bool {
        matches!(self, Action::Retrieve | Action::Update | Action::Delete)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed reference to one object, used as the optional target of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ObjectId {
    Child(ChildId),
    Group(GroupId),
    Message(MessageId),
    DayPlan(DayPlanId),
}

impl ObjectId {
    pub fn kind(self) -> ResourceKind {
        match self {
            ObjectId::Child(_) => ResourceKind::Child,
            ObjectId::Group(_) => ResourceKind::Group,
            ObjectId::Message(_) => ResourceKind::Message,
            ObjectId::DayPlan(_) => ResourceKind::DayPlan,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectId::Child(id) => write!(f, "child:{}", id),
            ObjectId::Group(id) => write!(f, "group:{}", id),
            ObjectId::Message(id) => write!(f, "message:{}", id),
            ObjectId::DayPlan(id) => write!(f, "day_plan:{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_tags_round_trip_through_str() {
        for role in [Role::Admin, Role::Teacher, Role::Parent, Role::Manager, Role::Unset] {
            assert_eq!(Role::try_from(role.as_str()), Ok(role));
        }
        assert!(Role::try_from("superuser").is_err());
    }

    #[test]
    fn role_serializes_as_snake_case_tag() {
        let json = serde_json::to_string(&Role::Teacher).unwrap();
        assert_eq!(json, "\"teacher\"");
        let role: Role = serde_json::from_str("\"manager\"").unwrap();
        assert_eq!(role, Role::Manager);
    }

    #[test]
    fn only_teacher_and_parent_carry_profiles() {
        assert!(Role::Teacher.has_profile());
        assert!(Role::Parent.has_profile());
        assert!(!Role::Admin.has_profile());
        assert!(!Role::Manager.has_profile());
        assert!(!Role::Unset.has_profile());
    }

    #[test]
    fn object_id_reports_its_kind() {
        let child = ObjectId::Child(ChildId::new_v4());
        assert_eq!(child.kind(), ResourceKind::Child);
        let msg = ObjectId::Message(MessageId::new_v4());
        assert_eq!(msg.kind(), ResourceKind::Message);
        assert!(msg.to_string().starts_with("message:"));
    }

    #[test]
    fn ids_serialize_transparently() {
        let raw = Uuid::new_v4();
        let id = ChildId(raw);
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", raw));
    }
}
