//! Relationship store abstraction.
//!
//! A `RelationshipStore` is the read-only window the authorization core has
//! onto persisted link data. The core never writes through it. Implementations
//! must be safe for concurrent reads; every call is synchronous and is expected
//! to return in bounded time.
//!
//! The batch calls (`groups_of_children`, `children_of_groups`,
//! `messages_about_children`, `day_plans_about_children`) exist so a closure
//! costs a fixed number of round trips however many groups or children it
//! spans. Implementations should answer them with one query each.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::error::StoreError;
use crate::primitives::Principal;
use crate::types::{
    AssignedType, ChildId, DayPlanId, GroupId, MessageId, ParentId, PrincipalId, ProfileId, Role,
    TeacherId,
};

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Read interface consumed by the role resolver and the relationship graph.
pub trait RelationshipStore: Send + Sync {
    /// Loads a principal. `None` when the id is unknown.
    fn principal(&self, id: PrincipalId) -> StoreResult<Option<Principal>>;

    /// Profile record matching `role` for this principal, if one exists.
    fn profile_for_principal(
        &self,
        principal: PrincipalId,
        role: Role,
    ) -> StoreResult<Option<ProfileId>>;

    fn children_of_parent(&self, parent: ParentId) -> StoreResult<BTreeSet<ChildId>>;

    fn group_exists(&self, group: GroupId) -> StoreResult<bool>;

    fn group_of_child(&self, child: ChildId) -> StoreResult<Option<GroupId>>;

    /// Batch form of `group_of_child`. Unknown children are skipped.
    fn groups_of_children(&self, children: &BTreeSet<ChildId>) -> StoreResult<BTreeSet<GroupId>>;

    fn group_assignments_of_teacher(
        &self,
        teacher: TeacherId,
    ) -> StoreResult<BTreeSet<(GroupId, AssignedType)>>;

    fn children_of_group(&self, group: GroupId) -> StoreResult<BTreeSet<ChildId>>;

    /// Batch form of `children_of_group`.
    fn children_of_groups(&self, groups: &BTreeSet<GroupId>) -> StoreResult<BTreeSet<ChildId>>;

    /// The child a message is about. `None` when the message does not exist.
    fn child_of_message(&self, message: MessageId) -> StoreResult<Option<ChildId>>;

    fn messages_about_children(
        &self,
        children: &BTreeSet<ChildId>,
    ) -> StoreResult<BTreeSet<MessageId>>;

    /// Every message sent by `sender`, whatever child it is about.
    fn messages_from(&self, sender: PrincipalId) -> StoreResult<BTreeSet<MessageId>>;

    /// The child a day plan belongs to. `None` when the plan does not exist.
    fn child_of_day_plan(&self, plan: DayPlanId) -> StoreResult<Option<ChildId>>;

    fn day_plans_about_children(
        &self,
        children: &BTreeSet<ChildId>,
    ) -> StoreResult<BTreeSet<DayPlanId>>;

    /// The existing plan for (child, day), if any.
    fn day_plan_for(&self, child: ChildId, day: NaiveDate) -> StoreResult<Option<DayPlanId>>;
}
