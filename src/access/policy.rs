//! Static policy registry.
//!
//! One row per (resource kind, action). Each cell says how far a role reaches:
//! not at all, only through its relationship closure, or everywhere. Admins are
//! not in the table; they bypass it.
//!
//! The `staff` column applies to any staff-flagged principal and is only used
//! for coarse, non-relational rows (institution rosters).

use crate::domain::ChildFields;
use crate::rights::{self, ActionMask};
use crate::types::{Action, ResourceKind, Role};

/// Reach granted by one policy cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grant {
    Denied,
    /// Allowed for objects inside the principal's relationship closure.
    Scoped,
    /// Allowed for every object of the kind.
    Unrestricted,
}

impl Grant {
    pub fn is_denied(self) -> bool {
        self == Grant::Denied
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyRow {
    pub kind: ResourceKind,
    pub action: Action,
    pub teacher: Grant,
    pub parent: Grant,
    pub staff: Grant,
}

const fn row(kind: ResourceKind, action: Action, teacher: Grant, parent: Grant, staff: Grant) -> PolicyRow {
    PolicyRow {
        kind,
        action,
        teacher,
        parent,
        staff,
    }
}

use Action::{Create, Delete, List, Retrieve, Update};
use Grant::{Denied as D, Scoped as S, Unrestricted as U};
use ResourceKind::{Child, DayPlan, Group, Institution, Message};

#[rustfmt::skip]
const CANONICAL_ROWS: [PolicyRow; 21] = [
    //   kind         action    teacher parent staff
    row(Child,       List,     S,      S,     D),
    row(Child,       Retrieve, S,      S,     D),
    row(Child,       Create,   D,      D,     D),
    row(Child,       Update,   S,      S,     D),
    row(Child,       Delete,   D,      D,     D),
    row(Group,       List,     S,      S,     D),
    row(Group,       Retrieve, S,      S,     D),
    row(Group,       Create,   D,      D,     D),
    row(Group,       Update,   D,      D,     D),
    row(Group,       Delete,   D,      D,     D),
    row(Message,     List,     S,      S,     D),
    row(Message,     Retrieve, S,      S,     D),
    row(Message,     Create,   D,      S,     D),
    row(Message,     Update,   D,      D,     D),
    row(Message,     Delete,   S,      S,     D),
    row(DayPlan,     List,     S,      S,     D),
    row(DayPlan,     Retrieve, S,      S,     D),
    row(DayPlan,     Create,   S,      D,     D),
    row(DayPlan,     Update,   S,      D,     D),
    row(DayPlan,     Delete,   D,      D,     D),
    row(Institution, List,     D,      D,     U),
];

static CANONICAL: PolicyRegistry = PolicyRegistry {
    rows: &CANONICAL_ROWS,
};

/// Read-only lookup table over policy rows.
#[derive(Debug, Clone, Copy)]
pub struct PolicyRegistry {
    rows: &'static [PolicyRow],
}

impl PolicyRegistry {
    /// The registry every `Authorizer` uses unless told otherwise.
    pub fn canonical() -> &'static PolicyRegistry {
        &CANONICAL
    }

    /// Builds a registry over another table. Rejects tables that fail `validate`.
    pub fn from_rows(rows: &'static [PolicyRow]) -> Result<Self, String> {
        let registry = Self { rows };
        registry.validate()?;
        Ok(registry)
    }

    pub fn rows(&self) -> &'static [PolicyRow] {
        self.rows
    }

    pub fn row(&self, kind: ResourceKind, action: Action) -> Option<&'static PolicyRow> {
        self.rows
            .iter()
            .find(|row| row.kind == kind && row.action == action)
    }

    /// Reach of a non-admin principal. The wider of the role cell and, for
    /// staff, the staff cell. Rows missing from the table deny.
    pub fn grant(&self, role: Role, is_staff: bool, kind: ResourceKind, action: Action) -> Grant {
        let Some(row) = self.row(kind, action) else {
            return Grant::Denied;
        };
        let by_role = match role {
            Role::Teacher => row.teacher,
            Role::Parent => row.parent,
            Role::Admin | Role::Manager | Role::Unset => Grant::Denied,
        };
        let by_staff = if is_staff { row.staff } else { Grant::Denied };
        by_role.max(by_staff)
    }

    /// Actions a non-admin principal may attempt on `kind`, as a mask.
    pub fn mask(&self, role: Role, is_staff: bool, kind: ResourceKind) -> ActionMask {
        Action::ALL
            .into_iter()
            .filter(|action| !self.grant(role, is_staff, kind, *action).is_denied())
            .fold(0, |mask, action| mask | rights::bit(action))
    }

    /// Checks that every (kind, action) pair has exactly one row and that each
    /// role's masks are closed under the action implications.
    pub fn validate(&self) -> Result<(), String> {
        for kind in ResourceKind::ALL {
            for action in Action::ALL {
                let count = self
                    .rows
                    .iter()
                    .filter(|row| row.kind == kind && row.action == action)
                    .count();
                if count != 1 {
                    return Err(format!("{kind}/{action} has {count} rows, expected 1"));
                }
            }
        }
        for kind in ResourceKind::ALL {
            for (role, is_staff) in [(Role::Teacher, true), (Role::Parent, false), (Role::Manager, true)] {
                let mask = self.mask(role, is_staff, kind);
                if rights::canonicalise(mask) != mask {
                    return Err(format!(
                        "{role} on {kind} grants {:?} without their implied actions",
                        rights::actions(mask)
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Child fields a role may change through an update. Teachers edit the whole
/// record of a child in their groups, parents only the personal details.
pub fn editable_child_fields(role: Role) -> ChildFields {
    match role {
        Role::Admin => ChildFields::ALL,
        Role::Teacher => ChildFields::ALL,
        Role::Parent => ChildFields::FIRST_NAME | ChildFields::LAST_NAME | ChildFields::BIRTH_DATE,
        Role::Manager | Role::Unset => ChildFields::NONE,
    }
}
