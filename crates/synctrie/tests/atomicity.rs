//! A failed commit leaves the trie exactly as it was.

use std::sync::Arc;

use synctrie::store::MemoryStore;
use synctrie::{Error, MerkleTrie, TrieConfig};
use synctrie_testkit::{sequential_ids, sync_id_at, FlakyStore};

type FlakyTrie = MerkleTrie<Arc<FlakyStore<MemoryStore>>>;

async fn flaky_trie(count: u32) -> (FlakyTrie, Arc<FlakyStore<MemoryStore>>) {
    let store = Arc::new(FlakyStore::new(MemoryStore::new()));
    let trie = MerkleTrie::open(Arc::clone(&store), TrieConfig::default())
        .await
        .unwrap();
    for id in sequential_ids(1665182300, count) {
        trie.insert(&id).await.unwrap();
    }
    (trie, store)
}

#[tokio::test]
async fn test_failed_insert_rolls_back() {
    let (trie, store) = flaky_trie(20).await;
    let root = trie.root_hash().await;
    let records = store.inner().dump().unwrap();

    store.set_failing(true);
    let new_id = sync_id_at(1665182399, 7);
    let err = trie.insert(&new_id).await.unwrap_err();
    assert!(Error::from(err).is_storage());

    assert_eq!(trie.root_hash().await, root);
    assert_eq!(trie.item_count().await, 20);
    assert_eq!(store.inner().dump().unwrap(), records);
    assert!(!trie.exists(&new_id).await.unwrap());
}

#[tokio::test]
async fn test_failed_delete_rolls_back() {
    let (trie, store) = flaky_trie(20).await;
    let ids = sequential_ids(1665182300, 20);
    let root = trie.root_hash().await;
    let records = store.inner().dump().unwrap();

    store.set_failing(true);
    assert!(trie.delete(&ids[3]).await.is_err());

    assert_eq!(trie.root_hash().await, root);
    assert_eq!(trie.item_count().await, 20);
    assert_eq!(store.inner().dump().unwrap(), records);
    assert!(trie.exists(&ids[3]).await.unwrap());
}

#[tokio::test]
async fn test_trie_recovers_after_failures() {
    let (trie, store) = flaky_trie(10).await;
    let before = store.commits();

    store.set_failing(true);
    for n in 0..5 {
        assert!(trie.insert(&sync_id_at(1665182350, n)).await.is_err());
    }
    store.set_failing(false);
    assert_eq!(store.commits(), before);

    for n in 0..5 {
        assert!(trie.insert(&sync_id_at(1665182350, n)).await.unwrap());
    }
    assert_eq!(trie.item_count().await, 15);
    assert_eq!(trie.verify_integrity().await.unwrap().leaves, 15);

    let snapshot = trie.get_snapshot(b"1665182350").await.unwrap();
    assert_eq!(snapshot.prefix, b"1665182350");
    assert_eq!(snapshot.item_count, 5);
}

#[tokio::test]
async fn test_idempotent_noops_do_not_commit() {
    let (trie, store) = flaky_trie(5).await;
    let ids = sequential_ids(1665182300, 5);

    store.set_failing(true);
    assert!(!trie.insert(&ids[0]).await.unwrap());
    assert!(!trie.delete(&sync_id_at(1665182390, 1)).await.unwrap());
}
