//! Property tests over random identifier sets and mutation sequences.

use std::collections::BTreeSet;
use std::future::Future;

use proptest::prelude::*;
use synctrie::TrieConfig;
use synctrie_testkit::generators::{sync_id_set, trie_ops, TrieOp};
use synctrie_testkit::{memory_trie, populated_trie};

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_insertion_order_is_irrelevant(
        (ids, shuffled) in sync_id_set(40).prop_flat_map(|ids| (Just(ids.clone()), Just(ids).prop_shuffle()))
    ) {
        block_on(async {
            let (a, store_a) = memory_trie(TrieConfig::default());
            let (b, store_b) = memory_trie(TrieConfig::default());
            for id in &ids {
                a.insert(id).await.unwrap();
            }
            for id in &shuffled {
                b.insert(id).await.unwrap();
            }

            assert_eq!(a.root_hash().await, b.root_hash().await);
            assert_eq!(store_a.dump().unwrap(), store_b.dump().unwrap());
        });
    }

    #[test]
    fn prop_delete_undoes_insert(base in sync_id_set(30), extra in sync_id_set(10)) {
        block_on(async {
            let (trie, store) = memory_trie(TrieConfig::default());
            for id in &base {
                trie.insert(id).await.unwrap();
            }
            let root = trie.root_hash().await;
            let records = store.dump().unwrap();

            let added: Vec<_> = extra.iter().filter(|id| !base.contains(id)).collect();
            for id in &added {
                assert!(trie.insert(id).await.unwrap());
            }
            for id in added.iter().rev() {
                assert!(trie.delete(id).await.unwrap());
            }

            assert_eq!(trie.root_hash().await, root);
            assert_eq!(store.dump().unwrap(), records);
        });
    }

    #[test]
    fn prop_random_ops_match_model(ops in trie_ops(60)) {
        block_on(async {
            let config = TrieConfig::default().with_unload_threshold(Some(5));
            let (trie, _store) = memory_trie(config);
            let mut model = BTreeSet::new();

            for op in &ops {
                match op {
                    TrieOp::Insert(id) => {
                        assert_eq!(trie.insert(id).await.unwrap(), model.insert(*id));
                    }
                    TrieOp::Delete(id) => {
                        assert_eq!(trie.delete(id).await.unwrap(), model.remove(id));
                    }
                }
            }

            let expected: Vec<_> = model.iter().copied().collect();
            assert_eq!(trie.get_all_values(b"").await.unwrap(), expected);
            assert_eq!(trie.item_count().await, model.len() as u64);
            assert_eq!(trie.verify_integrity().await.unwrap().leaves, model.len());

            trie.unload_children(b"").await;
            for op in &ops {
                assert_eq!(trie.exists(op.id()).await.unwrap(), model.contains(op.id()));
            }

            let rebuilt = populated_trie(&expected, TrieConfig::default()).await;
            assert_eq!(trie.root_hash().await, rebuilt.root_hash().await);
        });
    }
}
