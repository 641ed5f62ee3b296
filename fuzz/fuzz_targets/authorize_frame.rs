#![no_main]

// Harness: authorize_frame
// Strategy: build a small random school from the frame, then replay random
// requests against it. Decisions must never panic, admins are always
// allowed, and a scoped allow on a child implies the child is in the
// subject's listed closure.

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tracker_core::domain::{ChildFields, ChildOp, DayPlanDraft, MessageDraft, Operation};
use tracker_core::kernel::{Authorizer, Decision};
use tracker_core::primitives::Principal;
use tracker_core::store::MemoryStore;
use tracker_core::types::{
    Action, AssignedType, ChildId, DayPlanId, GroupId, MessageId, ObjectId, PrincipalId,
    ResourceKind, Role,
};

#[derive(Arbitrary, Debug)]
struct Request {
    who: u8,
    action: u8,
    kind: u8,
    target: u8,
    fields: u8,
}

#[derive(Arbitrary, Debug)]
struct Frame {
    /// (group index, parent link bits) per child.
    children: Vec<(u8, u8)>,
    /// Group bits per teacher.
    assignments: [u8; 2],
    requests: Vec<Request>,
}

const GROUPS: usize = 3;

fuzz_target!(|frame: Frame| {
    let mut store = MemoryStore::new();
    let groups: Vec<GroupId> = (0..GROUPS).map(|i| store.add_group(&format!("g{i}"))).collect();
    let parents: Vec<_> = (0..3).map(|_| store.enroll_parent()).collect();
    let teachers: Vec<_> = (0..2).map(|_| store.enroll_teacher()).collect();

    let mut children: Vec<ChildId> = Vec::new();
    for (i, (group, links)) in frame.children.iter().take(16).enumerate() {
        let child = store.add_child(&format!("c{i}"), groups[*group as usize % GROUPS]);
        for (p, (_, parent)) in parents.iter().enumerate() {
            if links & (1 << p) != 0 {
                store.link_parent(*parent, child);
            }
        }
        children.push(child);
    }
    for (t, (_, teacher)) in teachers.iter().enumerate() {
        for (g, group) in groups.iter().enumerate() {
            if frame.assignments[t] & (1 << g) != 0 {
                store.assign_teacher(*teacher, *group, AssignedType::Primary);
            }
        }
    }
    let mut messages: Vec<MessageId> = Vec::new();
    let mut plans: Vec<DayPlanId> = Vec::new();
    let today = chrono::NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
    for (i, child) in children.iter().enumerate() {
        messages.push(store.insert_message(parents[i % 3].0.id, *child, "note"));
        plans.push(store.insert_day_plan(*child, today));
    }

    let mut admin = Principal::new(PrincipalId::new_v4(), Role::Admin);
    admin.is_staff = true;
    let orphan = Principal::new(PrincipalId::new_v4(), Role::Parent);
    let mut principals: Vec<Principal> = parents.iter().map(|(p, _)| p.clone()).collect();
    principals.extend(teachers.iter().map(|(p, _)| p.clone()));
    principals.push(admin);
    principals.push(orphan);

    let authz = Authorizer::new(Arc::new(store));

    for request in frame.requests.iter().take(32) {
        let principal = &principals[request.who as usize % principals.len()];
        let Ok(session) = authz.session(principal) else {
            continue;
        };
        let action = Action::ALL[request.action as usize % Action::ALL.len()];
        let kind = ResourceKind::ALL[request.kind as usize % ResourceKind::ALL.len()];
        let pick = request.target as usize;
        let target = match kind {
            ResourceKind::Child if !children.is_empty() => {
                Some(ObjectId::Child(children[pick % children.len()]))
            }
            ResourceKind::Group => Some(ObjectId::Group(groups[pick % GROUPS])),
            ResourceKind::Message if !messages.is_empty() => {
                Some(ObjectId::Message(messages[pick % messages.len()]))
            }
            ResourceKind::DayPlan if !plans.is_empty() => {
                Some(ObjectId::DayPlan(plans[pick % plans.len()]))
            }
            _ => None,
        };

        let decision = session.authorize(action, kind, target).unwrap();
        let is_admin = session.subject().map(|s| s.is_admin()).unwrap_or(false);
        if is_admin {
            assert_eq!(decision, Decision::Allow);
        }

        if let (Decision::Allow, Some(ObjectId::Child(child))) = (decision, target) {
            if action.targets_object() && !is_admin {
                let listed = session.accessible_children().unwrap();
                assert!(listed.contains(&child));
            }
        }

        if let Some(ObjectId::Child(child)) = target {
            let fields = ChildFields::from_bits_truncate(request.fields);
            let _ = session.authorize_operation(&Operation::Child(ChildOp::Update(child, fields)));
            let bound = session.bind_message(MessageDraft {
                sender: Some(PrincipalId::new_v4()),
                child,
                text: "x".repeat(request.fields as usize),
            });
            if let Ok(message) = bound {
                assert_eq!(message.sender, principal.id);
            }
            let _ = session.bind_day_plan(
                DayPlanDraft {
                    child,
                    day: today,
                    meals_at_school: Default::default(),
                    behaviour: Default::default(),
                    summary: None,
                },
                today,
            );
        }
    }
});
