//! Relationship closures.
//!
//! For a resolved subject, computes the set of ids it reaches through its
//! relationship hops:
//!
//! * parent → children (links) → groups / messages / day plans of those children
//! * teacher → groups (assignments) → children of those groups → their messages
//!   and day plans
//!
//! Admins reach everything (`AccessSet::All`, never materialised). Detached
//! subjects reach nothing. Every closure costs a fixed number of store round
//! trips: one for the first hop and one per batch hop after it.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::access::role::{Profile, Subject};
use crate::store::{RelationshipStore, StoreResult};
use crate::types::{ChildId, DayPlanId, GroupId, MessageId, ObjectId, ResourceKind};

/// Ids a subject may reach for one resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessSet<T: Ord> {
    /// Every object of the kind.
    All,
    Only(BTreeSet<T>),
}

impl<T: Ord> Default for AccessSet<T> {
    fn default() -> Self {
        AccessSet::Only(BTreeSet::new())
    }
}

impl<T: Ord> AccessSet<T> {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: &T) -> bool {
        match self {
            AccessSet::All => true,
            AccessSet::Only(ids) => ids.contains(id),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, AccessSet::All)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            AccessSet::All => false,
            AccessSet::Only(ids) => ids.is_empty(),
        }
    }

    /// Number of ids. `None` for the wildcard.
    pub fn len(&self) -> Option<usize> {
        match self {
            AccessSet::All => None,
            AccessSet::Only(ids) => Some(ids.len()),
        }
    }

    /// Keeps the candidates this set grants.
    pub fn intersect<I>(&self, candidates: I) -> BTreeSet<T>
    where
        I: IntoIterator<Item = T>,
    {
        candidates.into_iter().filter(|id| self.contains(id)).collect()
    }

    pub fn map<U: Ord, F: FnMut(T) -> U>(self, f: F) -> AccessSet<U> {
        match self {
            AccessSet::All => AccessSet::All,
            AccessSet::Only(ids) => AccessSet::Only(ids.into_iter().map(f).collect()),
        }
    }
}

impl<T: Ord> From<BTreeSet<T>> for AccessSet<T> {
    fn from(ids: BTreeSet<T>) -> Self {
        AccessSet::Only(ids)
    }
}

/// Computes closures over a relationship store.
#[derive(Debug)]
pub struct RelationshipGraph<S: RelationshipStore> {
    store: Arc<S>,
}

impl<S: RelationshipStore> Clone for RelationshipGraph<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RelationshipStore> RelationshipGraph<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Children reachable by the subject. One round trip for parents, two for
    /// teachers.
    pub fn children(&self, subject: &Subject) -> StoreResult<AccessSet<ChildId>> {
        let set = match subject.profile {
            Profile::Admin => AccessSet::All,
            Profile::Parent(parent) => AccessSet::Only(self.store.children_of_parent(parent)?),
            Profile::Teacher(_) => self.children_reachable(&self.groups(subject)?)?,
            Profile::Detached => AccessSet::empty(),
        };
        debug!(principal = %subject.principal, size = ?set.len(), "child closure");
        Ok(set)
    }

    /// Groups reachable by the subject. Parents reach the groups of their
    /// children.
    pub fn groups(&self, subject: &Subject) -> StoreResult<AccessSet<GroupId>> {
        let set = match subject.profile {
            Profile::Admin => AccessSet::All,
            Profile::Teacher(teacher) => AccessSet::Only(
                self.store
                    .group_assignments_of_teacher(teacher)?
                    .into_iter()
                    .map(|(group, _)| group)
                    .collect(),
            ),
            Profile::Parent(parent) => {
                let children = self.store.children_of_parent(parent)?;
                self.groups_reachable(&children.into())?
            }
            Profile::Detached => AccessSet::empty(),
        };
        debug!(principal = %subject.principal, size = ?set.len(), "group closure");
        Ok(set)
    }

    pub fn messages(&self, subject: &Subject) -> StoreResult<AccessSet<MessageId>> {
        let children = self.children(subject)?;
        self.messages_reachable(&children)
    }

    pub fn day_plans(&self, subject: &Subject) -> StoreResult<AccessSet<DayPlanId>> {
        let children = self.children(subject)?;
        self.day_plans_reachable(&children)
    }

    /// Children of an already computed group closure. One round trip.
    pub fn children_reachable(&self, groups: &AccessSet<GroupId>) -> StoreResult<AccessSet<ChildId>> {
        Ok(match groups {
            AccessSet::All => AccessSet::All,
            AccessSet::Only(ids) => self.children_of_groups(ids)?.into(),
        })
    }

    /// Groups of an already computed child closure. One round trip.
    pub fn groups_reachable(&self, children: &AccessSet<ChildId>) -> StoreResult<AccessSet<GroupId>> {
        Ok(match children {
            AccessSet::All => AccessSet::All,
            AccessSet::Only(ids) => self.groups_of_children(ids)?.into(),
        })
    }

    /// Messages about an already computed child closure. One round trip.
    pub fn messages_reachable(
        &self,
        children: &AccessSet<ChildId>,
    ) -> StoreResult<AccessSet<MessageId>> {
        Ok(match children {
            AccessSet::All => AccessSet::All,
            AccessSet::Only(ids) if ids.is_empty() => AccessSet::empty(),
            AccessSet::Only(ids) => AccessSet::Only(self.store.messages_about_children(ids)?),
        })
    }

    /// Day plans about an already computed child closure. One round trip.
    pub fn day_plans_reachable(
        &self,
        children: &AccessSet<ChildId>,
    ) -> StoreResult<AccessSet<DayPlanId>> {
        Ok(match children {
            AccessSet::All => AccessSet::All,
            AccessSet::Only(ids) if ids.is_empty() => AccessSet::empty(),
            AccessSet::Only(ids) => AccessSet::Only(self.store.day_plans_about_children(ids)?),
        })
    }

    /// Closure for any kind as typed object ids. Institution rosters are not
    /// relational: admins and staff reach all of them.
    pub fn closure(&self, subject: &Subject, kind: ResourceKind) -> StoreResult<AccessSet<ObjectId>> {
        Ok(match kind {
            ResourceKind::Child => self.children(subject)?.map(ObjectId::Child),
            ResourceKind::Group => self.groups(subject)?.map(ObjectId::Group),
            ResourceKind::Message => self.messages(subject)?.map(ObjectId::Message),
            ResourceKind::DayPlan => self.day_plans(subject)?.map(ObjectId::DayPlan),
            ResourceKind::Institution if subject.is_admin() || subject.is_staff => AccessSet::All,
            ResourceKind::Institution => AccessSet::empty(),
        })
    }

    fn children_of_groups(&self, groups: &BTreeSet<GroupId>) -> StoreResult<BTreeSet<ChildId>> {
        if groups.is_empty() {
            return Ok(BTreeSet::new());
        }
        self.store.children_of_groups(groups)
    }

    fn groups_of_children(&self, children: &BTreeSet<ChildId>) -> StoreResult<BTreeSet<GroupId>> {
        if children.is_empty() {
            return Ok(BTreeSet::new());
        }
        self.store.groups_of_children(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::role::{Resolution, RoleResolver};
    use crate::primitives::Principal;
    use crate::store::MemoryStore;
    use crate::types::AssignedType;

    fn subject_of(store: &Arc<MemoryStore>, principal: &Principal) -> Subject {
        match RoleResolver::new(Arc::clone(store)).resolve(principal).unwrap() {
            Resolution::Resolved(subject) => subject,
            other => panic!("unexpected resolution {other:?}"),
        }
    }

    #[test]
    fn parent_closure_spans_groups_without_duplicates() {
        let mut store = MemoryStore::new();
        let (principal, parent) = store.enroll_parent();
        let g1 = store.add_group("Ants");
        let g2 = store.add_group("Bees");
        let c1 = store.add_child("Ola", g1);
        let c2 = store.add_child("Kai", g2);
        store.link_parent(parent, c1);
        store.link_parent(parent, c2);
        let store = Arc::new(store);
        let graph = RelationshipGraph::new(Arc::clone(&store));
        let subject = subject_of(&store, &principal);

        assert_eq!(graph.children(&subject).unwrap(), AccessSet::Only(BTreeSet::from([c1, c2])));
        assert_eq!(graph.groups(&subject).unwrap(), AccessSet::Only(BTreeSet::from([g1, g2])));
    }

    #[test]
    fn teacher_message_closure_costs_three_round_trips() {
        let mut store = MemoryStore::new();
        let (principal, teacher) = store.enroll_teacher();
        let (sender, _) = store.enroll_parent();
        let mut expected = BTreeSet::new();
        for name in ["Ants", "Bees", "Cats", "Dogs"] {
            let group = store.add_group(name);
            store.assign_teacher(teacher, group, AssignedType::Support);
            let child = store.add_child(name, group);
            expected.insert(store.insert_message(sender.id, child, "hello"));
        }
        let other = store.add_group("Elks");
        let stranger = store.add_child("Liv", other);
        store.insert_message(sender.id, stranger, "elsewhere");
        let store = Arc::new(store);
        let graph = RelationshipGraph::new(Arc::clone(&store));
        let subject = subject_of(&store, &principal);

        store.reset_round_trips();
        assert_eq!(graph.messages(&subject).unwrap(), AccessSet::Only(expected));
        assert_eq!(store.round_trips(), 3);
    }

    #[test]
    fn empty_hops_skip_the_store() {
        let mut store = MemoryStore::new();
        let (principal, _) = store.enroll_teacher();
        let store = Arc::new(store);
        let graph = RelationshipGraph::new(Arc::clone(&store));
        let subject = subject_of(&store, &principal);

        store.reset_round_trips();
        assert!(graph.day_plans(&subject).unwrap().is_empty());
        assert_eq!(store.round_trips(), 1);
    }

    #[test]
    fn admin_closure_is_the_wildcard() {
        let mut store = MemoryStore::new();
        let mut principal = Principal::new(crate::types::PrincipalId::new_v4(), crate::types::Role::Admin);
        principal.is_staff = true;
        store.add_principal(principal.clone());
        let store = Arc::new(store);
        let graph = RelationshipGraph::new(Arc::clone(&store));
        let subject = subject_of(&store, &principal);

        for kind in ResourceKind::ALL {
            assert!(graph.closure(&subject, kind).unwrap().is_all(), "{kind}");
        }
        assert_eq!(store.round_trips(), 0);
    }

    #[test]
    fn reachable_hops_reuse_a_computed_closure() {
        let mut store = MemoryStore::new();
        let g1 = store.add_group("Ants");
        let g2 = store.add_group("Bees");
        let c1 = store.add_child("Ola", g1);
        let c2 = store.add_child("Kai", g2);
        let store = Arc::new(store);
        let graph = RelationshipGraph::new(Arc::clone(&store));

        let children = graph.children_reachable(&AccessSet::Only(BTreeSet::from([g1]))).unwrap();
        assert_eq!(children, AccessSet::Only(BTreeSet::from([c1])));
        let groups = graph.groups_reachable(&AccessSet::Only(BTreeSet::from([c1, c2]))).unwrap();
        assert_eq!(groups, AccessSet::Only(BTreeSet::from([g1, g2])));
        assert_eq!(store.round_trips(), 2);

        assert!(graph.groups_reachable(&AccessSet::All).unwrap().is_all());
        assert!(graph.children_reachable(&AccessSet::empty()).unwrap().is_empty());
        assert_eq!(store.round_trips(), 2);
    }

    #[test]
    fn access_set_intersect_filters_candidates() {
        let a = ChildId::new_v4();
        let b = ChildId::new_v4();
        let set = AccessSet::Only(BTreeSet::from([a]));
        assert_eq!(set.intersect([a, b]), BTreeSet::from([a]));
        assert_eq!(AccessSet::<ChildId>::All.intersect([a, b]).len(), 2);
        assert_eq!(AccessSet::<ChildId>::All.len(), None);
    }
}
