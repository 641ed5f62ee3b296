use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::types::{
    AssignedType, ChildId, DayPlanId, GroupId, MessageId, ParentId, PrincipalId, Role, TeacherId,
};

// --- Principals -------------------------------------------------------------

/// An authenticated identity as handed over by the request layer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    #[serde(alias = "user_type", alias = "user_role", default)]
    pub role: Role,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub is_staff: bool,
}

impl Principal {
    pub fn new(id: PrincipalId, role: Role) -> Self {
        Self {
            id,
            role,
            is_superuser: false,
            is_staff: false,
        }
    }

    /// Superusers are admins whatever their stored tag says.
    pub fn is_admin(&self) -> bool {
        self.is_superuser || self.role == Role::Admin
    }

    /// Staff status after the account rules are applied: superusers and
    /// teachers are always staff, parents never are, everyone else keeps the
    /// stored flag.
    pub fn effective_staff(&self) -> bool {
        if self.is_superuser || self.role == Role::Teacher {
            return true;
        }
        if self.role == Role::Parent {
            return false;
        }
        self.is_staff
    }
}

// --- Relationship links -----------------------------------------------------

/// Many-to-many link between a parent profile and a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ParentLink {
    pub parent: ParentId,
    pub child: ChildId,
}

/// A teacher's attachment to one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct GroupAssignment {
    pub teacher: TeacherId,
    pub group: GroupId,
    #[serde(default)]
    pub assigned_type: AssignedType,
}

// --- Members ----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Child {
    pub id: ChildId,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    pub group: GroupId,
    #[serde(default)]
    pub parents: BTreeSet<ParentId>,
}

impl Child {
    /// Whole years completed on `today`. Zero for dates before the birth date.
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        let mut years = today.year() - self.birth_date.year();
        if (today.month(), today.day()) < (self.birth_date.month(), self.birth_date.day()) {
            years -= 1;
        }
        years.max(0) as u32
    }

    /// A child is complete once at least one parent is linked. Onboarding may
    /// create the child first and link parents afterwards.
    pub fn is_complete(&self) -> bool {
        !self.parents.is_empty()
    }
}

// --- Messages ---------------------------------------------------------------

/// A message about one child. Immutable once stored; only deletion removes it.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender: PrincipalId,
    pub child: ChildId,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

// --- Day plans --------------------------------------------------------------

/// Quick status about meals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealStatus {
    Full,
    Half,
    Little,
    #[default]
    NotSpecified,
    ImportantNote,
}

/// Quick status for a child's behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BehaviourStatus {
    GreatDay,
    OkDay,
    MightBeBetter,
    TalkNeeded,
    #[default]
    NotSpecified,
}

/// Daily log for one child on one calendar day. At most one per (child, day).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DayPlanRecord {
    pub id: DayPlanId,
    pub child: ChildId,
    pub day: NaiveDate,
    #[serde(default)]
    pub meals_at_school: MealStatus,
    #[serde(default)]
    pub behaviour: BehaviourStatus,
    #[serde(default)]
    pub summary: Option<String>,
}
