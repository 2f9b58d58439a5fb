use criterion::{Criterion, criterion_group, criterion_main};
use fdft_runtime::{EvidenceLedger, TestLogEntry, assert_close_slice};

fn bench_ledger_record(c: &mut Criterion) {
    c.bench_function("ledger_record_1k_into_64", |b| {
        b.iter(|| {
            let mut ledger = EvidenceLedger::new(64);
            for i in 0..1_000u64 {
                ledger.record(i);
            }
            ledger.len()
        });
    });
}

fn bench_ledger_jsonl(c: &mut Criterion) {
    let mut ledger = EvidenceLedger::new(256);
    for i in 0..256u64 {
        ledger.record(TestLogEntry::new(format!("bench-{i}"), "fdft_runtime::bench", "entry"));
    }
    c.bench_function("ledger_serialize_jsonl_256", |b| {
        b.iter(|| ledger.serialize_jsonl());
    });
}

fn bench_assert_close_slice(c: &mut Criterion) {
    let lhs = (0..4096).map(|i| i as f64 * 0.5).collect::<Vec<_>>();
    let rhs = lhs.clone();
    c.bench_function("assert_close_slice_4096", |b| {
        b.iter(|| assert_close_slice(&lhs, &rhs, 1e-12, 1e-12));
    });
}

criterion_group!(
    benches,
    bench_ledger_record,
    bench_ledger_jsonl,
    bench_assert_close_slice
);
criterion_main!(benches);
