use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use synctrie_core::{SyncId, HASH_LENGTH};
use synctrie_store::MemoryStore;
use synctrie_trie::{MerkleTrie, TrieConfig};

fn ids(count: u64) -> Vec<SyncId> {
    (0..count)
        .map(|n| {
            let digest = blake3::hash(&n.to_be_bytes());
            SyncId::new(1665182332 + n, &digest.as_bytes()[..HASH_LENGTH]).unwrap()
        })
        .collect()
}

fn bench_insert(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let batch = ids(1_000);

    c.bench_function("insert_1000_memory", |b| {
        b.to_async(&rt).iter_batched(
            || MerkleTrie::new(MemoryStore::new(), TrieConfig::default()),
            |trie| {
                let batch = &batch;
                async move {
                    for id in batch {
                        trie.insert(id).await.unwrap();
                    }
                }
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("snapshot_after_1000", |b| {
        let trie = rt.block_on(async {
            let trie = MerkleTrie::new(MemoryStore::new(), TrieConfig::default());
            for id in &batch {
                trie.insert(id).await.unwrap();
            }
            trie
        });
        b.to_async(&rt)
            .iter(|| async { trie.get_snapshot(b"1665182").await.unwrap() })
    });
}

criterion_group!(benches, bench_insert);
criterion_main!(benches);
