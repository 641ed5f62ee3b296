use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tracker_core::kernel::Authorizer;
use tracker_core::primitives::Principal;
use tracker_core::store::MemoryStore;
use tracker_core::types::{AssignedType, ResourceKind};

/// A teacher assigned to `groups` groups of 20 children, each child with one
/// message.
fn school(groups: usize) -> (Arc<MemoryStore>, Principal) {
    let mut store = MemoryStore::new();
    let (teacher, profile) = store.enroll_teacher();
    let (parent, _) = store.enroll_parent();
    for g in 0..groups {
        let group = store.add_group(&format!("g{g}"));
        store.assign_teacher(profile, group, AssignedType::Primary);
        for c in 0..20 {
            let child = store.add_child(&format!("c{g}-{c}"), group);
            store.insert_message(parent.id, child, "bench");
        }
    }
    (Arc::new(store), teacher)
}

fn closure_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("teacher_message_closure");
    for groups in [1usize, 8, 32] {
        let (store, teacher) = school(groups);
        let authz = Authorizer::new(store);
        group.bench_with_input(BenchmarkId::from_parameter(groups), &groups, |b, _| {
            b.iter(|| {
                let session = authz.session(&teacher).unwrap();
                session.filter_accessible(ResourceKind::Message).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, closure_benchmarks);
criterion_main!(benches);
