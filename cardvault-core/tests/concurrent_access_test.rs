//! Concurrent access through one shared record store
//!
//! The server hands the same `Arc<dyn RecordStore>` to every request; these
//! tests hammer it from many tasks at once.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::collections::HashSet;
use std::sync::Arc;

use tempfile::TempDir;

use cardvault_core::adapters::LocalStore;
use cardvault_core::{CardPatch, CardQuery, Error, ExpiryPolicy, NewCard, NewUser, RecordStore};

/// Number of concurrent tasks for stress tests
const TASK_COUNT: usize = 8;

/// Number of iterations per task
const ITERATIONS_PER_TASK: usize = 5;

fn create_store(temp_dir: &TempDir) -> Arc<dyn RecordStore> {
    let db_path = temp_dir.path().join("test_concurrent.duckdb");
    Arc::new(LocalStore::open(&db_path, ExpiryPolicy::default()).unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_card_creation() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_store(&temp_dir);

    let mut handles = Vec::new();
    for task_id in 0..TASK_COUNT {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for i in 0..ITERATIONS_PER_TASK {
                let holder = format!("Holder {} {}", task_id, i);
                let card = store
                    .create_card(NewCard::new("4111111111111111", holder, "12/28", "123"))
                    .await
                    .unwrap();
                ids.push(card.card.id);
            }
            ids
        }));
    }

    let mut created = HashSet::new();
    for handle in handles {
        created.extend(handle.await.unwrap());
    }
    assert_eq!(created.len(), TASK_COUNT * ITERATIONS_PER_TASK);

    let listed = store.list_cards(&CardQuery::default()).await.unwrap();
    assert_eq!(listed.len(), created.len());
    assert!(listed.iter().all(|c| created.contains(&c.card.id)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_during_writes() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_store(&temp_dir);

    let owner = store
        .create_user(NewUser::new("owner@example.com", None))
        .await
        .unwrap();
    let card = store
        .create_card(NewCard::new("4111111111111111", "Ana", "12/28", "123").owned_by(&owner.user.id))
        .await
        .unwrap();
    let card_id = card.card.id.clone();

    let writer = {
        let store = Arc::clone(&store);
        let card_id = card_id.clone();
        tokio::spawn(async move {
            for i in 0..ITERATIONS_PER_TASK * 4 {
                let patch = CardPatch {
                    cvv: Some(format!("{:03}", i)),
                    ..CardPatch::default()
                };
                store.update_card(&card_id, patch).await.unwrap();
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..TASK_COUNT {
        let store = Arc::clone(&store);
        let card_id = card_id.clone();
        let owner_id = owner.user.id.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..ITERATIONS_PER_TASK {
                let card = store.get_card(&card_id, true).await.unwrap();
                assert_eq!(card.card.user_id.as_deref(), Some(owner_id.as_str()));
                let user = store.get_user(&owner_id, true).await.unwrap();
                assert_eq!(user.credit_cards.map(|c| c.len()), Some(1));
            }
        }));
    }

    writer.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }

    let card = store.get_card(&card_id, false).await.unwrap();
    assert_eq!(card.card.cvv, format!("{:03}", ITERATIONS_PER_TASK * 4 - 1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_same_email() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_store(&temp_dir);

    let barrier = Arc::new(tokio::sync::Barrier::new(TASK_COUNT));
    let handles: Vec<_> = (0..TASK_COUNT)
        .map(|i| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                store
                    .create_user(NewUser::new("same@example.com", Some(format!("User {}", i))))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(Error::Conflict(message)) => {
                assert_eq!(message, "User with this email already exists")
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(store.list_users(false).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_user_deletes() {
    let temp_dir = TempDir::new().unwrap();
    let store = create_store(&temp_dir);

    let mut user_ids = Vec::new();
    for i in 0..TASK_COUNT {
        let user = store
            .create_user(NewUser::new(format!("user{}@example.com", i), None))
            .await
            .unwrap();
        for _ in 0..2 {
            store
                .create_card(
                    NewCard::new("4111111111111111", "Holder", "12/28", "123")
                        .owned_by(&user.user.id),
                )
                .await
                .unwrap();
        }
        user_ids.push(user.user.id);
    }

    let handles: Vec<_> = user_ids
        .into_iter()
        .map(|id| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.delete_user(&id).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(store.list_users(false).await.unwrap().is_empty());
    assert!(store.list_cards(&CardQuery::default()).await.unwrap().is_empty());
}
