use crate::domain::ChildFields;
use crate::types::{Action, ChildId, DayPlanId, GroupId, MessageId, ObjectId, ResourceKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOp {
    List,
    Retrieve(ChildId),
    /// Onboarding a new child.
    Create,
    Update(ChildId, ChildFields),
    Delete(ChildId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOp {
    List,
    Retrieve(GroupId),
    Create,
    Update(GroupId),
    Delete(GroupId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOp {
    List,
    Retrieve(MessageId),
    /// Writing a message about the given child.
    Create(ChildId),
    Update(MessageId),
    Delete(MessageId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPlanOp {
    List,
    Retrieve(DayPlanId),
    /// Logging a day for the given child.
    Create(ChildId),
    Update(DayPlanId),
    Delete(DayPlanId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstitutionOp {
    /// Teachers, parents and children of every group.
    ListMembers,
    /// Every child in the institution.
    ListChildren,
}

/// One thing a request handler wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Child(ChildOp),
    Group(GroupOp),
    Message(MessageOp),
    DayPlan(DayPlanOp),
    Institution(InstitutionOp),
}

impl Operation {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Operation::Child(_) => ResourceKind::Child,
            Operation::Group(_) => ResourceKind::Group,
            Operation::Message(_) => ResourceKind::Message,
            Operation::DayPlan(_) => ResourceKind::DayPlan,
            Operation::Institution(_) => ResourceKind::Institution,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Operation::Child(op) => match op {
                ChildOp::List => Action::List,
                ChildOp::Retrieve(_) => Action::Retrieve,
                ChildOp::Create => Action::Create,
                ChildOp::Update(..) => Action::Update,
                ChildOp::Delete(_) => Action::Delete,
            },
            Operation::Group(op) => match op {
                GroupOp::List => Action::List,
                GroupOp::Retrieve(_) => Action::Retrieve,
                GroupOp::Create => Action::Create,
                GroupOp::Update(_) => Action::Update,
                GroupOp::Delete(_) => Action::Delete,
            },
            Operation::Message(op) => match op {
                MessageOp::List => Action::List,
                MessageOp::Retrieve(_) => Action::Retrieve,
                MessageOp::Create(_) => Action::Create,
                MessageOp::Update(_) => Action::Update,
                MessageOp::Delete(_) => Action::Delete,
            },
            Operation::DayPlan(op) => match op {
                DayPlanOp::List => Action::List,
                DayPlanOp::Retrieve(_) => Action::Retrieve,
                DayPlanOp::Create(_) => Action::Create,
                DayPlanOp::Update(_) => Action::Update,
                DayPlanOp::Delete(_) => Action::Delete,
            },
            Operation::Institution(_) => Action::List,
        }
    }

    /// The existing object the operation addresses, if any.
    pub fn target(&self) -> Option<ObjectId> {
        match *self {
            Operation::Child(ChildOp::Retrieve(id))
            | Operation::Child(ChildOp::Update(id, _))
            | Operation::Child(ChildOp::Delete(id)) => Some(ObjectId::Child(id)),
            Operation::Group(GroupOp::Retrieve(id))
            | Operation::Group(GroupOp::Update(id))
            | Operation::Group(GroupOp::Delete(id)) => Some(ObjectId::Group(id)),
            Operation::Message(MessageOp::Retrieve(id))
            | Operation::Message(MessageOp::Update(id))
            | Operation::Message(MessageOp::Delete(id)) => Some(ObjectId::Message(id)),
            Operation::DayPlan(DayPlanOp::Retrieve(id))
            | Operation::DayPlan(DayPlanOp::Update(id))
            | Operation::DayPlan(DayPlanOp::Delete(id)) => Some(ObjectId::DayPlan(id)),
            _ => None,
        }
    }

    /// The child a create operation attaches its new record to.
    pub fn create_for_child(&self) -> Option<ChildId> {
        match *self {
            Operation::Message(MessageOp::Create(child))
            | Operation::DayPlan(DayPlanOp::Create(child)) => Some(child),
            _ => None,
        }
    }

    /// Fields touched by a child update.
    pub fn child_fields(&self) -> Option<ChildFields> {
        match *self {
            Operation::Child(ChildOp::Update(_, fields)) => Some(fields),
            _ => None,
        }
    }
}
