use common::ids::{ContainerId, Permissions, TransactionId};
use common::storage_trait::StorageTrait;
use common::testutil::int_vec_to_tuple;
use common::DataType;
use common::TableSchema;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use heapstore::storage_manager::StorageManager;

fn schema() -> TableSchema {
    TableSchema::from_vecs(vec!["a", "b"], vec![DataType::Int, DataType::Int])
}

/// Fills `sm`'s container `cid` with `n` two-int-field tuples and returns
/// the transaction they were inserted under (so callers can scan with it).
fn fill(sm: &StorageManager, cid: ContainerId, n: i32) -> TransactionId {
    let tid = TransactionId::new();
    for i in 0..n {
        sm.insert_tuple(tid, cid, int_vec_to_tuple(vec![i, i * 2])).unwrap();
    }
    tid
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_insert");
    for size in [100, 1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let sm = StorageManager::new_test_sm();
                let cid = 1;
                sm.register_container(cid, schema()).unwrap();
                fill(&sm, cid, size);
            });
        });
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap_scan");
    for size in [100, 1_000, 10_000].iter() {
        let sm = StorageManager::new_test_sm();
        let cid = 1;
        sm.register_container(cid, schema()).unwrap();
        let tid = fill(&sm, cid, *size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let it = sm.get_iterator(tid, cid, Permissions::ReadOnly);
                it.count()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_scan);
criterion_main!(benches);
