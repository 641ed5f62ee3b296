use std::ops::BitOr;

use chrono::NaiveDate;

use crate::primitives::{BehaviourStatus, MealStatus};
use crate::types::{ChildId, PrincipalId};

/// Set of child record fields touched by an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChildFields(u8);

impl ChildFields {
    pub const NONE: Self = Self(0);
    pub const FIRST_NAME: Self = Self(1 << 0);
    pub const LAST_NAME: Self = Self(1 << 1);
    pub const BIRTH_DATE: Self = Self(1 << 2);
    pub const GROUP: Self = Self(1 << 3);
    pub const PARENTS: Self = Self(1 << 4);
    pub const ALL: Self = Self(0b1_1111);

    pub fn bits(self) -> u8 {
        self.0
    }

    /// Builds a field set from raw bits, dropping unknown ones.
    pub fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Whether every field in `other` is also in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Fields set in `self` but not in `allowed`.
    pub fn outside(self, allowed: Self) -> Self {
        Self(self.0 & !allowed.0)
    }

    /// Looks a field up by its record name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "first_name" => Some(Self::FIRST_NAME),
            "last_name" => Some(Self::LAST_NAME),
            "birth_date" => Some(Self::BIRTH_DATE),
            "group" => Some(Self::GROUP),
            "parents" => Some(Self::PARENTS),
            _ => None,
        }
    }
}

impl BitOr for ChildFields {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Untrusted message create payload as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MessageDraft {
    /// Client-declared sender. Never trusted.
    #[serde(default)]
    pub sender: Option<PrincipalId>,
    pub child: ChildId,
    pub text: String,
}

/// A message payload that passed binding and may be persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NewMessage {
    pub sender: PrincipalId,
    pub child: ChildId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DayPlanDraft {
    pub child: ChildId,
    pub day: NaiveDate,
    #[serde(default)]
    pub meals_at_school: MealStatus,
    #[serde(default)]
    pub behaviour: BehaviourStatus,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct NewDayPlan {
    pub child: ChildId,
    pub day: NaiveDate,
    pub meals_at_school: MealStatus,
    pub behaviour: BehaviourStatus,
    pub summary: Option<String>,
}

impl From<DayPlanDraft> for NewDayPlan {
    fn from(draft: DayPlanDraft) -> Self {
        Self {
            child: draft.child,
            day: draft.day,
            meals_at_school: draft.meals_at_school,
            behaviour: draft.behaviour,
            summary: draft.summary,
        }
    }
}
