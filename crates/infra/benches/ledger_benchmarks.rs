use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use pitstock_core::PartId;
use pitstock_infra::services::{LedgerService, PartService};
use pitstock_infra::store::InMemoryInventoryStore;
use pitstock_inventory::{PartCategory, PartDraft, ThresholdApprovalPolicy};

type BenchParts = PartService<Arc<InMemoryInventoryStore>, ThresholdApprovalPolicy>;
type BenchLedger = LedgerService<Arc<InMemoryInventoryStore>, ThresholdApprovalPolicy>;

fn setup() -> (BenchParts, BenchLedger) {
    let store = Arc::new(InMemoryInventoryStore::new());
    let ledger = LedgerService::new(store.clone(), ThresholdApprovalPolicy::default());
    let parts = PartService::new(store, ledger.clone());
    (parts, ledger)
}

fn seeded_part(parts: &BenchParts, n: usize) -> PartId {
    let mut draft = PartDraft::new(
        format!("BENCH-{n:05}"),
        "Bench part",
        PartCategory::Structural,
        "pieces",
    );
    draft.quantity_on_hand = 1_000_000;
    parts.create_part(draft).unwrap().id
}

/// One full mutation round trip: sufficiency check, part write, ledger entry.
fn bench_mutation_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("mutation_cycle");
    group.throughput(Throughput::Elements(1));

    group.bench_function("restock_then_use", |b| {
        let (parts, _) = setup();
        let part_id = seeded_part(&parts, 0);
        b.iter(|| {
            parts
                .restock(black_box(part_id), 10, Some(250), None, None)
                .unwrap();
            parts
                .use_parts(black_box(part_id), 10, None, None, None)
                .unwrap();
        });
    });

    group.finish();
}

/// Scanning a grown ledger for one part's history.
fn bench_history_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("history_scan");

    for entries in [100usize, 1_000] {
        let (parts, ledger) = setup();
        let part_id = seeded_part(&parts, entries);
        for _ in 0..entries {
            parts.use_parts(part_id, 1, None, None, None).unwrap();
        }

        group.throughput(Throughput::Elements(entries as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(entries),
            &entries,
            |b, &entries| {
                b.iter(|| {
                    let history = ledger.transactions_for_part(black_box(part_id));
                    assert_eq!(history.len(), entries + 1);
                    black_box(history)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_mutation_cycle, bench_history_scan);
criterion_main!(benches);
