//! In-memory relationship store.
//!
//! Backs unit tests, property tests, benches and fuzz targets. Every trait call
//! counts as one round trip so tests can assert the closure cost bound.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::{NaiveDate, Utc};

use super::{RelationshipStore, StoreResult};
use crate::error::StoreError;
use crate::primitives::{Child, DayPlanRecord, Group, GroupAssignment, Message, ParentLink, Principal};
use crate::types::{
    AssignedType, ChildId, DayPlanId, GroupId, MessageId, ParentId, PrincipalId, ProfileId, Role,
    TeacherId,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    principals: BTreeMap<PrincipalId, Principal>,
    teacher_profiles: BTreeMap<PrincipalId, TeacherId>,
    parent_profiles: BTreeMap<PrincipalId, ParentId>,
    groups: BTreeMap<GroupId, Group>,
    children: BTreeMap<ChildId, Child>,
    parent_links: BTreeSet<ParentLink>,
    assignments: BTreeSet<GroupAssignment>,
    messages: BTreeMap<MessageId, Message>,
    day_plans: BTreeMap<DayPlanId, DayPlanRecord>,
    round_trips: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Seeding -----------------------------------------------------------

    pub fn add_principal(&mut self, principal: Principal) -> PrincipalId {
        let id = principal.id;
        self.principals.insert(id, principal);
        id
    }

    /// Inserts a teacher principal together with its profile.
    pub fn enroll_teacher(&mut self) -> (Principal, TeacherId) {
        let principal = Principal::new(PrincipalId::new_v4(), Role::Teacher);
        self.add_principal(principal.clone());
        let teacher = self.add_teacher_profile(principal.id);
        (principal, teacher)
    }

    /// Inserts a parent principal together with its profile.
    pub fn enroll_parent(&mut self) -> (Principal, ParentId) {
        let principal = Principal::new(PrincipalId::new_v4(), Role::Parent);
        self.add_principal(principal.clone());
        let parent = self.add_parent_profile(principal.id);
        (principal, parent)
    }

    pub fn add_teacher_profile(&mut self, principal: PrincipalId) -> TeacherId {
        *self
            .teacher_profiles
            .entry(principal)
            .or_insert_with(TeacherId::new_v4)
    }

    pub fn add_parent_profile(&mut self, principal: PrincipalId) -> ParentId {
        *self
            .parent_profiles
            .entry(principal)
            .or_insert_with(ParentId::new_v4)
    }

    pub fn add_group(&mut self, name: &str) -> GroupId {
        let id = GroupId::new_v4();
        self.groups.insert(
            id,
            Group {
                id,
                name: name.to_string(),
            },
        );
        id
    }

    /// Inserts a child with no parents yet, as onboarding does.
    pub fn add_child(&mut self, first_name: &str, group: GroupId) -> ChildId {
        let id = ChildId::new_v4();
        let birth_date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default();
        self.children.insert(
            id,
            Child {
                id,
                first_name: first_name.to_string(),
                last_name: String::new(),
                birth_date,
                group,
                parents: BTreeSet::new(),
            },
        );
        id
    }

    pub fn link_parent(&mut self, parent: ParentId, child: ChildId) {
        self.parent_links.insert(ParentLink { parent, child });
        if let Some(record) = self.children.get_mut(&child) {
            record.parents.insert(parent);
        }
    }

    pub fn unlink_parent(&mut self, parent: ParentId, child: ChildId) {
        self.parent_links.remove(&ParentLink { parent, child });
        if let Some(record) = self.children.get_mut(&child) {
            record.parents.remove(&parent);
        }
    }

    /// Moves a child to another group, as a group change on update does.
    pub fn move_child(&mut self, child: ChildId, group: GroupId) {
        if let Some(record) = self.children.get_mut(&child) {
            record.group = group;
        }
    }

    pub fn assign_teacher(&mut self, teacher: TeacherId, group: GroupId, assigned_type: AssignedType) {
        self.assignments.insert(GroupAssignment {
            teacher,
            group,
            assigned_type,
        });
    }

    pub fn insert_message(&mut self, sender: PrincipalId, child: ChildId, text: &str) -> MessageId {
        let id = MessageId::new_v4();
        self.messages.insert(
            id,
            Message {
                id,
                sender,
                child,
                text: text.to_string(),
                timestamp: Utc::now(),
            },
        );
        id
    }

    pub fn insert_day_plan(&mut self, child: ChildId, day: NaiveDate) -> DayPlanId {
        let id = DayPlanId::new_v4();
        self.day_plans.insert(
            id,
            DayPlanRecord {
                id,
                child,
                day,
                meals_at_school: Default::default(),
                behaviour: Default::default(),
                summary: None,
            },
        );
        id
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(&id)
    }

    pub fn child(&self, id: ChildId) -> Option<&Child> {
        self.children.get(&id)
    }

    // --- Instrumentation ---------------------------------------------------

    /// Number of trait calls served since construction or the last reset.
    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::Relaxed)
    }

    pub fn reset_round_trips(&self) {
        self.round_trips.store(0, Ordering::Relaxed);
    }

    /// Makes every subsequent trait call fail with `StoreError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    fn round_trip(&self) -> StoreResult<()> {
        self.round_trips.fetch_add(1, Ordering::Relaxed);
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

impl RelationshipStore for MemoryStore {
    fn principal(&self, id: PrincipalId) -> StoreResult<Option<Principal>> {
        self.round_trip()?;
        Ok(self.principals.get(&id).cloned())
    }

    fn profile_for_principal(
        &self,
        principal: PrincipalId,
        role: Role,
    ) -> StoreResult<Option<ProfileId>> {
        self.round_trip()?;
        Ok(match role {
            Role::Teacher => self.teacher_profiles.get(&principal).copied().map(ProfileId::Teacher),
            Role::Parent => self.parent_profiles.get(&principal).copied().map(ProfileId::Parent),
            Role::Admin | Role::Manager | Role::Unset => None,
        })
    }

    fn children_of_parent(&self, parent: ParentId) -> StoreResult<BTreeSet<ChildId>> {
        self.round_trip()?;
        Ok(self
            .parent_links
            .iter()
            .filter(|link| link.parent == parent)
            .map(|link| link.child)
            .collect())
    }

    fn group_exists(&self, group: GroupId) -> StoreResult<bool> {
        self.round_trip()?;
        Ok(self.groups.contains_key(&group))
    }

    fn group_of_child(&self, child: ChildId) -> StoreResult<Option<GroupId>> {
        self.round_trip()?;
        Ok(self.children.get(&child).map(|c| c.group))
    }

    fn groups_of_children(&self, children: &BTreeSet<ChildId>) -> StoreResult<BTreeSet<GroupId>> {
        self.round_trip()?;
        Ok(children
            .iter()
            .filter_map(|id| self.children.get(id))
            .map(|c| c.group)
            .collect())
    }

    fn group_assignments_of_teacher(
        &self,
        teacher: TeacherId,
    ) -> StoreResult<BTreeSet<(GroupId, AssignedType)>> {
        self.round_trip()?;
        Ok(self
            .assignments
            .iter()
            .filter(|a| a.teacher == teacher)
            .map(|a| (a.group, a.assigned_type))
            .collect())
    }

    fn children_of_group(&self, group: GroupId) -> StoreResult<BTreeSet<ChildId>> {
        self.round_trip()?;
        Ok(self
            .children
            .values()
            .filter(|c| c.group == group)
            .map(|c| c.id)
            .collect())
    }

    fn children_of_groups(&self, groups: &BTreeSet<GroupId>) -> StoreResult<BTreeSet<ChildId>> {
        self.round_trip()?;
        Ok(self
            .children
            .values()
            .filter(|c| groups.contains(&c.group))
            .map(|c| c.id)
            .collect())
    }

    fn child_of_message(&self, message: MessageId) -> StoreResult<Option<ChildId>> {
        self.round_trip()?;
        Ok(self.messages.get(&message).map(|m| m.child))
    }

    fn messages_about_children(
        &self,
        children: &BTreeSet<ChildId>,
    ) -> StoreResult<BTreeSet<MessageId>> {
        self.round_trip()?;
        Ok(self
            .messages
            .values()
            .filter(|m| children.contains(&m.child))
            .map(|m| m.id)
            .collect())
    }

    fn messages_from(&self, sender: PrincipalId) -> StoreResult<BTreeSet<MessageId>> {
        self.round_trip()?;
        Ok(self
            .messages
            .values()
            .filter(|m| m.sender == sender)
            .map(|m| m.id)
            .collect())
    }

    fn child_of_day_plan(&self, plan: DayPlanId) -> StoreResult<Option<ChildId>> {
        self.round_trip()?;
        Ok(self.day_plans.get(&plan).map(|p| p.child))
    }

    fn day_plans_about_children(
        &self,
        children: &BTreeSet<ChildId>,
    ) -> StoreResult<BTreeSet<DayPlanId>> {
        self.round_trip()?;
        Ok(self
            .day_plans
            .values()
            .filter(|p| children.contains(&p.child))
            .map(|p| p.id)
            .collect())
    }

    fn day_plan_for(&self, child: ChildId, day: NaiveDate) -> StoreResult<Option<DayPlanId>> {
        self.round_trip()?;
        Ok(self
            .day_plans
            .values()
            .find(|p| p.child == child && p.day == day)
            .map(|p| p.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_links_are_reflected_on_the_child_record() {
        let mut store = MemoryStore::new();
        let (_, parent) = store.enroll_parent();
        let group = store.add_group("Ants");
        let child = store.add_child("Ola", group);
        assert!(!store.child(child).unwrap().is_complete());

        store.link_parent(parent, child);
        assert!(store.child(child).unwrap().is_complete());
        assert_eq!(store.children_of_parent(parent).unwrap(), BTreeSet::from([child]));

        store.unlink_parent(parent, child);
        assert!(store.children_of_parent(parent).unwrap().is_empty());
    }

    #[test]
    fn every_call_counts_one_round_trip() {
        let mut store = MemoryStore::new();
        let group = store.add_group("Bees");
        let _ = store.children_of_group(group).unwrap();
        let _ = store.children_of_groups(&BTreeSet::from([group])).unwrap();
        assert_eq!(store.round_trips(), 2);
        store.reset_round_trips();
        assert_eq!(store.round_trips(), 0);
    }

    #[test]
    fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert!(matches!(
            store.principal(PrincipalId::new_v4()),
            Err(StoreError::Unavailable(_))
        ));
    }

    #[test]
    fn messages_are_found_by_sender() {
        let mut store = MemoryStore::new();
        let group = store.add_group("Cats");
        let child = store.add_child("Ida", group);
        let (alice, _) = store.enroll_parent();
        let (bob, _) = store.enroll_parent();
        let from_alice = store.insert_message(alice.id, child, "running late");
        store.insert_message(bob.id, child, "all good");

        assert_eq!(store.messages_from(alice.id).unwrap(), BTreeSet::from([from_alice]));
        assert_eq!(store.message(from_alice).map(|m| m.sender), Some(alice.id));
        assert!(store.messages_from(PrincipalId::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn moved_child_changes_group() {
        let mut store = MemoryStore::new();
        let ants = store.add_group("Ants");
        let bees = store.add_group("Bees");
        let child = store.add_child("Ola", ants);
        store.move_child(child, bees);
        assert_eq!(store.group_of_child(child).unwrap(), Some(bees));
        assert!(store.children_of_group(ants).unwrap().is_empty());
    }

    #[test]
    fn profile_lookup_respects_role() {
        let mut store = MemoryStore::new();
        let (teacher, teacher_id) = store.enroll_teacher();
        assert_eq!(
            store.profile_for_principal(teacher.id, Role::Teacher).unwrap(),
            Some(ProfileId::Teacher(teacher_id))
        );
        assert_eq!(store.profile_for_principal(teacher.id, Role::Parent).unwrap(), None);
    }
}
