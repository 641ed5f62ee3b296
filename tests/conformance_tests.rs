use std::collections::BTreeSet;
use std::sync::Arc;

use tracker_core::access::AccessSet;
use tracker_core::domain::{ChildFields, MessageDraft};
use tracker_core::error::DenyReason;
use tracker_core::kernel::{Authorizer, Decision};
use tracker_core::primitives::Principal;
use tracker_core::store::MemoryStore;
use tracker_core::types::{
    Action, AssignedType, ChildId, GroupId, MessageId, ObjectId, PrincipalId, ResourceKind, Role,
};

// --- Scenario: P1↔C1 (G1), P2↔C2 (G2), T1 assigned to G1 ---

struct School {
    store: MemoryStore,
    g1: GroupId,
    c1: ChildId,
    c2: ChildId,
    p1: Principal,
    t1: Principal,
    msg_of_c1: MessageId,
    msg_of_c2: MessageId,
}

fn school() -> School {
    let mut store = MemoryStore::new();
    let g1 = store.add_group("G1");
    let g2 = store.add_group("G2");
    let c1 = store.add_child("C1", g1);
    let c2 = store.add_child("C2", g2);
    let (p1, parent1) = store.enroll_parent();
    let (p2, parent2) = store.enroll_parent();
    store.link_parent(parent1, c1);
    store.link_parent(parent2, c2);
    let (t1, teacher1) = store.enroll_teacher();
    store.assign_teacher(teacher1, g1, AssignedType::Primary);
    let msg_of_c1 = store.insert_message(p1.id, c1, "C1 needs a nap");
    let msg_of_c2 = store.insert_message(p2.id, c2, "C2 has a dentist visit");
    School {
        store,
        g1,
        c1,
        c2,
        p1,
        t1,
        msg_of_c1,
        msg_of_c2,
    }
}

#[test]
fn teacher_lists_only_messages_of_own_group() {
    let school = school();
    let authz = Authorizer::new(Arc::new(school.store));

    let messages = authz
        .filter_accessible(&school.t1, ResourceKind::Message)
        .unwrap();
    assert_eq!(
        messages,
        AccessSet::Only(BTreeSet::from([ObjectId::Message(school.msg_of_c1)]))
    );

    let decision = authz
        .authorize(
            &school.t1,
            Action::Retrieve,
            ResourceKind::Message,
            Some(ObjectId::Message(school.msg_of_c2)),
        )
        .unwrap();
    assert!(!decision.is_allowed());
}

#[test]
fn teacher_reaches_own_group_and_its_children() {
    let school = school();
    let authz = Authorizer::new(Arc::new(school.store));
    let session = authz.session(&school.t1).unwrap();

    assert_eq!(
        session.accessible_groups().unwrap(),
        AccessSet::Only(BTreeSet::from([school.g1]))
    );
    assert_eq!(
        session.accessible_children().unwrap(),
        AccessSet::Only(BTreeSet::from([school.c1]))
    );
    assert_eq!(
        session
            .authorize(Action::Retrieve, ResourceKind::Child, Some(ObjectId::Child(school.c2)))
            .unwrap(),
        Decision::Deny(DenyReason::OutOfScope)
    );
}

#[test]
fn parent_message_is_bound_to_the_parent() {
    let school = school();
    let authz = Authorizer::new(Arc::new(school.store));
    let session = authz.session(&school.p1).unwrap();

    let bound = session
        .bind_message(MessageDraft {
            sender: Some(PrincipalId::new_v4()),
            child: school.c1,
            text: "hi".into(),
        })
        .unwrap();
    assert_eq!(bound.sender, school.p1.id);
    assert_eq!(bound.child, school.c1);
}

// --- Scenario: child onboarded before any parent is linked ---

#[test]
fn parentless_child_is_invisible_until_linked() {
    let mut store = MemoryStore::new();
    let group = store.add_group("Owls");
    let (principal, parent) = store.enroll_parent();
    let (other, _) = store.enroll_parent();
    let orphan = store.add_child("Nova", group);
    let store = Arc::new(store);
    let authz = Authorizer::new(Arc::clone(&store));

    for p in [&principal, &other] {
        let children = authz.filter_accessible(p, ResourceKind::Child).unwrap();
        assert!(!children.contains(&ObjectId::Child(orphan)));
    }

    drop(authz);
    let mut store = Arc::try_unwrap(store).unwrap();
    store.link_parent(parent, orphan);
    let authz = Authorizer::new(Arc::new(store));
    let children = authz.filter_accessible(&principal, ResourceKind::Child).unwrap();
    assert_eq!(children, AccessSet::Only(BTreeSet::from([ObjectId::Child(orphan)])));
}

// --- Scenario: parent with children in several groups ---

#[test]
fn parent_children_listed_once_across_groups() {
    let mut store = MemoryStore::new();
    let (principal, parent) = store.enroll_parent();
    let mut expected = BTreeSet::new();
    for name in ["Ants", "Bees", "Cats"] {
        let group = store.add_group(name);
        for sibling in 0..2 {
            let child = store.add_child(&format!("{name}-{sibling}"), group);
            store.link_parent(parent, child);
            expected.insert(child);
        }
    }
    let authz = Authorizer::new(Arc::new(store));
    let session = authz.session(&principal).unwrap();
    assert_eq!(session.accessible_children().unwrap(), AccessSet::Only(expected));
    assert_eq!(session.accessible_groups().unwrap().len(), Some(3));
}

// --- Scenario: admin and staff ---

#[test]
fn admin_is_allowed_on_unknown_objects() {
    let mut store = MemoryStore::new();
    let mut admin = Principal::new(PrincipalId::new_v4(), Role::Admin);
    admin.is_staff = true;
    store.add_principal(admin.clone());
    let authz = Authorizer::new(Arc::new(store));

    let decision = authz
        .authorize(
            &admin,
            Action::Delete,
            ResourceKind::Child,
            Some(ObjectId::Child(ChildId::new_v4())),
        )
        .unwrap();
    assert_eq!(decision, Decision::Allow);
}

#[test]
fn staff_teacher_without_assignment_is_denied() {
    let mut store = MemoryStore::new();
    let group = store.add_group("Foxes");
    let child = store.add_child("Ida", group);
    let (teacher, _) = store.enroll_teacher();
    let authz = Authorizer::new(Arc::new(store));
    let session = authz.session(&teacher).unwrap();

    assert_eq!(
        session
            .authorize(Action::Retrieve, ResourceKind::Child, Some(ObjectId::Child(child)))
            .unwrap(),
        Decision::Deny(DenyReason::OutOfScope)
    );
    assert_eq!(
        session.authorize_child_update(child, ChildFields::FIRST_NAME).unwrap(),
        Decision::Deny(DenyReason::OutOfScope)
    );
}

#[test]
fn integrity_failures_are_denied_by_code() {
    let mut store = MemoryStore::new();
    let teacher = Principal::new(PrincipalId::new_v4(), Role::Teacher);
    store.add_principal(teacher.clone());
    let authz = Authorizer::new(Arc::new(store));

    let decision = authz
        .authorize(&teacher, Action::List, ResourceKind::Group, None)
        .unwrap();
    assert_eq!(decision.reason().map(|r| r.code()), Some("integrity_failure"));
}
