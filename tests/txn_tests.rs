//! Tests for transaction reuse and isolation
//!
//! These tests verify:
//! - Nested calls on one chain share a single transaction
//! - Inner failure rolls back the whole outer transaction
//! - Read-only chains cannot be escalated to writable
//! - Readers never see uncommitted writes
//! - Concurrent writers serialize without losing updates

use std::ops::ControlFlow;

use tempfile::TempDir;
use treekv::{Config, Store, TreeError};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_store() -> (TempDir, Store) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .db_path(temp_dir.path().join("store.redb"))
        .build();
    let store = Store::open(config).unwrap();
    (temp_dir, store)
}

// =============================================================================
// Reuse Tests
// =============================================================================

#[test]
fn test_nested_updates_commit_together() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["batch"]);

    node.tx_update(|n| {
        assert!(n.in_transaction());
        n.set("a", &1u8)?;
        n.node(["inner"]).set("b", &2u8)?;
        n.node(["inner"]).tx_update(|inner| inner.set("c", &3u8))?;

        // Nothing is visible outside the chain before the commit.
        assert!(!store.node(["batch"]).exists("a"));
        assert!(!store.node(["batch", "inner"]).exists("b"));
        Ok(())
    })
    .unwrap();

    assert_eq!(node.get::<u8>("a").unwrap(), 1);
    assert_eq!(node.node(["inner"]).get::<u8>("b").unwrap(), 2);
    assert_eq!(node.node(["inner"]).get::<u8>("c").unwrap(), 3);
}

#[test]
fn test_reads_inside_update_see_own_writes() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["rw"]);

    node.tx_update(|n| {
        n.set("counter", &1u32)?;
        let current: u32 = n.get("counter")?;
        n.set("counter", &(current + 1))?;
        assert!(n.exists("counter"));
        assert_eq!(n.length("")?, 1);
        Ok(())
    })
    .unwrap();

    assert_eq!(node.get::<u32>("counter").unwrap(), 2);
}

#[test]
fn test_inner_failure_rolls_back_outer() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["atomic"]);
    node.set("before", &0u8).unwrap();

    let result: treekv::Result<()> = node.tx_update(|n| {
        n.set("a", &1u8)?;
        n.delete("before")?;
        n.node(["inner"]).tx_update(|inner| {
            inner.set("b", &2u8)?;
            Err(TreeError::Config("boom".to_string()))
        })
    });

    assert!(matches!(result, Err(TreeError::Config(_))));
    assert!(!node.exists("a"));
    assert!(node.exists("before"));
    assert!(!store.node(["atomic", "inner"]).exists(""));
}

#[test]
fn test_store_usable_after_rollback() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["n"]);

    let _ = node.tx_update(|n| -> treekv::Result<()> {
        n.set("x", &1u8)?;
        Err(TreeError::KeyNotFound)
    });

    // A leaked writer would block this forever.
    node.set("y", &2u8).unwrap();
    assert_eq!(node.get::<u8>("y").unwrap(), 2);
    assert!(!node.exists("x"));
}

#[test]
fn test_update_returns_closure_value() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["n"]);
    node.set("k", &41u32).unwrap();

    let value = node
        .tx_update(|n| {
            let v: u32 = n.get("k")?;
            n.set("k", &(v + 1))?;
            Ok(v + 1)
        })
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(node.get::<u32>("k").unwrap(), 42);
}

// =============================================================================
// Nested Iteration Tests
// =============================================================================

#[test]
fn test_delete_during_each_in_update() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["queue"]);
    for i in 0..6u32 {
        node.set(&format!("{:02}", i), &i).unwrap();
    }

    let mut visits = 0;
    node.tx_update(|n| {
        n.each("", |key, value: &u32, total| {
            assert_eq!(total, 6);
            visits += 1;
            if value % 2 == 0 {
                n.delete(key)?;
            }
            // Deletes stay inside the walk's transaction until it commits.
            assert_eq!(store.node(["queue"]).length("")?, 6);
            Ok(ControlFlow::Continue(()))
        })?;
        assert_eq!(n.length("")?, 3);
        Ok(())
    })
    .unwrap();

    assert_eq!(visits, 6);
    assert_eq!(node.length("").unwrap(), 3);
    assert!(!node.exists("00"));
    assert_eq!(node.get::<u32>("01").unwrap(), 1);
}

#[test]
fn test_reads_and_writes_during_each_key_in_update() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["scores"]);
    node.set("alice", &3u32).unwrap();
    node.set("bob", &7u32).unwrap();
    node.node(["archive"]).set("carol", &1u32).unwrap();

    node.tx_update(|n| {
        n.each_key("", |key, _| {
            if key == "archive" {
                return Ok(ControlFlow::Continue(()));
            }
            let score: u32 = n.get(key)?;
            if score > 5 {
                n.node(["archive"]).set(key, &score)?;
                n.delete(key)?;
            }
            Ok(ControlFlow::Continue(()))
        })
    })
    .unwrap();

    assert_eq!(node.get::<u32>("alice").unwrap(), 3);
    assert!(!node.exists("bob"));
    assert_eq!(node.node(["archive"]).get::<u32>("bob").unwrap(), 7);
    assert_eq!(node.node(["archive"]).length("").unwrap(), 2);
}

#[test]
fn test_failure_during_each_rolls_back_nested_writes() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["queue"]);
    for i in 0..4u32 {
        node.set(&format!("{:02}", i), &i).unwrap();
    }

    let result = node.tx_update(|n| {
        n.each("", |key, value: &u32, _| {
            n.delete(key)?;
            if *value == 2 {
                return Err(TreeError::Config("stop".to_string()));
            }
            Ok(ControlFlow::Continue(()))
        })
    });

    assert!(matches!(result, Err(TreeError::Config(_))));
    assert_eq!(node.length("").unwrap(), 4);
}

#[test]
fn test_write_during_each_in_view_is_rejected() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["queue"]);
    node.set("a", &1u32).unwrap();

    let result = node.tx_view(|n| {
        n.each("", |key, _: &u32, _| {
            n.delete(key)?;
            Ok(ControlFlow::Continue(()))
        })
    });

    assert!(matches!(result, Err(TreeError::TransactionNotWritable)));
    assert!(node.exists("a"));
}

// =============================================================================
// Read-Only Tests
// =============================================================================

#[test]
fn test_update_inside_view_is_rejected() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["ro"]);

    let result = node.tx_view(|n| n.set("key", &1u8));
    assert!(matches!(result, Err(TreeError::TransactionNotWritable)));

    let result = node.tx_view(|n| n.node(["child"]).drop());
    assert!(matches!(result, Err(TreeError::TransactionNotWritable)));

    assert!(!node.exists(""));
}

#[test]
fn test_view_composes_reads() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["view"]);
    node.set("a", &1u8).unwrap();
    node.node(["sub"]).set("b", &2u8).unwrap();

    let (a, b, keys) = node
        .tx_view(|n| {
            let a: u8 = n.get("a")?;
            let b: u8 = n.node(["sub"]).get("b")?;
            let mut keys = Vec::new();
            n.each_key("", |k, _| {
                keys.push(k.to_string());
                Ok(ControlFlow::Continue(()))
            })?;
            Ok((a, b, keys))
        })
        .unwrap();

    assert_eq!((a, b), (1, 2));
    assert_eq!(keys, vec!["a".to_string(), "sub".to_string()]);
}

#[test]
fn test_view_snapshot_ignores_later_commits() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["snap"]);
    node.set("k", &1u8).unwrap();

    node.tx_view(|n| {
        // Writes from another chain commit while this reader is open.
        store.node(["snap"]).set("k", &2u8)?;
        assert_eq!(n.get::<u8>("k")?, 1);
        Ok(())
    })
    .unwrap();

    assert_eq!(node.get::<u8>("k").unwrap(), 2);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_writers() {
    let (_temp, store) = setup_temp_store();
    let threads = 4;
    let per_thread = 25;

    crossbeam::scope(|s| {
        for t in 0..threads {
            let store = &store;
            s.spawn(move |_| {
                let node = store.node(["shared"]);
                for i in 0..per_thread {
                    node.set(&format!("{}-{:03}", t, i), &(t * 1000 + i)).unwrap();
                }
            });
        }
    })
    .unwrap();

    let node = store.node(["shared"]);
    assert_eq!(node.length("").unwrap(), threads * per_thread);
    assert_eq!(node.get::<usize>("2-007").unwrap(), 2007);
}

#[test]
fn test_concurrent_set_if_none_single_winner() {
    let (_temp, store) = setup_temp_store();

    crossbeam::scope(|s| {
        for t in 0..8u32 {
            let store = &store;
            s.spawn(move |_| {
                store.node(["race"]).set_if_none("winner", &t).unwrap();
            });
        }
    })
    .unwrap();

    let node = store.node(["race"]);
    let winner: u32 = node.get("winner").unwrap();
    assert!(winner < 8);
    assert_eq!(node.length("").unwrap(), 1);
}

#[test]
fn test_readers_run_alongside_writer() {
    let (_temp, store) = setup_temp_store();
    let node = store.node(["mixed"]);
    for i in 0..10u32 {
        node.set(&format!("{:02}", i), &i).unwrap();
    }

    crossbeam::scope(|s| {
        let store = &store;
        s.spawn(move |_| {
            for i in 10..40u32 {
                store.node(["mixed"]).set(&format!("{:02}", i), &i).unwrap();
            }
        });
        for _ in 0..4 {
            s.spawn(move |_| {
                for _ in 0..20 {
                    let len = store.node(["mixed"]).length("").unwrap();
                    assert!((10..=40).contains(&len));
                }
            });
        }
    })
    .unwrap();

    assert_eq!(node.length("").unwrap(), 40);
}
