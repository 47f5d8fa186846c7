//! End-to-end KV engine tests: TTL behavior, recovery, snapshotting,
//! janitor eviction and cache-aside upstream population.

use hearth_core::Item;
use hearth_engine::{KvConfig, KvStore};
use serde_json::json;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn open_at(dir: &std::path::Path) -> KvStore {
    KvStore::open(KvConfig::at(dir)).unwrap()
}

#[test]
fn set_then_get_returns_value() {
    let dir = tempdir().unwrap();
    let store = open_at(dir.path());

    store.set("a", json!(1), 10);
    store.set("b", json!({"nested": [true, null]}), 0);

    assert_eq!(store.get("a").unwrap().value, json!(1));
    assert_eq!(store.get("b").unwrap().value, json!({"nested": [true, null]}));
    assert!(store.get("absent").is_none());
}

#[test]
fn last_writer_wins_on_same_key() {
    let dir = tempdir().unwrap();
    let store = open_at(dir.path());

    for i in 0..50 {
        store.set("k", json!(i), 60);
    }
    assert_eq!(store.get("k").unwrap().value, json!(49));
}

#[test]
fn expired_entries_are_not_served() {
    let dir = tempdir().unwrap();
    let store = open_at(dir.path());

    store.set("short", json!("gone soon"), 1);
    store.set("forever", json!("stays"), 0);

    assert!(store.get("short").is_some());
    std::thread::sleep(Duration::from_millis(1_300));

    assert!(store.get("short").is_none());
    assert_eq!(store.get("forever").unwrap().value, json!("stays"));
}

#[test]
fn zero_ttl_means_effectively_forever() {
    let dir = tempdir().unwrap();
    let store = open_at(dir.path());

    store.set("eternal", json!("x"), 0);
    let item = store.get("eternal").unwrap();
    // Century-scale expiration, comfortably past any test run
    assert!(item.expires_at > hearth_core::now_nanos() + 1_000_000_000);
}

#[test]
fn wal_alone_recovers_acknowledged_writes() {
    let dir = tempdir().unwrap();

    {
        let store = open_at(dir.path());
        store.set("k", json!({"n": 7}), 60);
        // Dropped without close: no snapshot, only the WAL survives
    }
    assert!(!dir.path().join("kv.json").exists());

    let store = open_at(dir.path());
    assert_eq!(store.get("k").unwrap().value, json!({"n": 7}));
}

#[test]
fn snapshot_plus_wal_recover_together() {
    let dir = tempdir().unwrap();

    {
        let store = open_at(dir.path());
        store.set("snapped", json!(1), 600);
        store.create_snapshot().unwrap();
        store.set("journaled", json!(2), 600);
    }

    let store = open_at(dir.path());
    assert_eq!(store.get("snapped").unwrap().value, json!(1));
    assert_eq!(store.get("journaled").unwrap().value, json!(2));
}

#[test]
fn close_writes_final_snapshot() {
    let dir = tempdir().unwrap();

    let store = open_at(dir.path());
    store.set("k", json!("v"), 600);
    store.close().unwrap();

    assert!(dir.path().join("kv.json").exists());
    // WAL was truncated during the final snapshot
    assert_eq!(
        std::fs::metadata(dir.path().join("kv.json.wal")).unwrap().len(),
        0
    );

    let store = open_at(dir.path());
    assert_eq!(store.get("k").unwrap().value, json!("v"));
}

#[test]
fn close_is_idempotent() {
    let dir = tempdir().unwrap();
    let store = Arc::new(open_at(dir.path()));
    store.start();

    store.close().unwrap();
    store.close().unwrap();
}

#[test]
fn wal_contains_only_writes_after_snapshot_gate() {
    let dir = tempdir().unwrap();
    let store = open_at(dir.path());

    store.set("before1", json!(1), 600);
    store.set("before2", json!(2), 600);
    store.create_snapshot().unwrap();

    assert_eq!(
        std::fs::metadata(dir.path().join("kv.json.wal")).unwrap().len(),
        0
    );

    store.set("after", json!(3), 600);
    let wal = std::fs::read_to_string(dir.path().join("kv.json.wal")).unwrap();
    assert!(wal.contains("after"));
    assert!(!wal.contains("before1"));
    assert!(!wal.contains("before2"));
}

#[test]
fn back_to_back_snapshots_decode_equal() {
    let dir = tempdir().unwrap();
    let store = open_at(dir.path());

    for i in 0..25 {
        store.set(&format!("k{i}"), json!(i), 600);
    }

    store.create_snapshot().unwrap();
    let first: HashMap<String, Item> =
        serde_json::from_slice(&std::fs::read(dir.path().join("kv.json")).unwrap()).unwrap();

    store.create_snapshot().unwrap();
    let second: HashMap<String, Item> =
        serde_json::from_slice(&std::fs::read(dir.path().join("kv.json")).unwrap()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 25);
}

#[test]
fn snapshot_excludes_expired_entries() {
    let dir = tempdir().unwrap();
    let store = open_at(dir.path());

    store.set("dead", json!(1), 1);
    store.set("live", json!(2), 600);
    std::thread::sleep(Duration::from_millis(1_300));

    store.create_snapshot().unwrap();
    let snap: HashMap<String, Item> =
        serde_json::from_slice(&std::fs::read(dir.path().join("kv.json")).unwrap()).unwrap();
    assert!(snap.contains_key("live"));
    assert!(!snap.contains_key("dead"));
}

#[test]
fn janitor_drains_expired_keys() {
    let dir = tempdir().unwrap();
    let store = open_at(dir.path());

    for i in 0..1_000 {
        store.set(&format!("k{i}"), json!(i), 1);
    }
    std::thread::sleep(Duration::from_millis(1_500));

    // Run passes until one finds nothing expired in its samples
    while store.run_janitor_pass() > 0 {}

    assert_eq!(store.entry_count(), 0);
    for i in 0..1_000 {
        assert!(store.get(&format!("k{i}")).is_none());
    }
}

#[test]
fn expired_survivors_do_not_resurrect_on_restart() {
    let dir = tempdir().unwrap();

    {
        let store = open_at(dir.path());
        store.set("ephemeral", json!(1), 1);
    }
    std::thread::sleep(Duration::from_millis(1_300));

    // WAL replay filters entries whose expiration already passed
    let store = open_at(dir.path());
    assert_eq!(store.entry_count(), 0);
}

#[test]
fn corrupt_wal_tail_keeps_earlier_records_on_startup() {
    let dir = tempdir().unwrap();

    {
        let store = open_at(dir.path());
        store.set("a", json!(1), 600);
        store.set("b", json!(2), 600);
    }
    // Crash mid-append: garbage at the journal tail
    {
        let mut wal = std::fs::OpenOptions::new()
            .append(true)
            .open(dir.path().join("kv.json.wal"))
            .unwrap();
        wal.write_all(b"{\"op\":\"set\",\"k\":\"torn").unwrap();
    }

    let store = open_at(dir.path());
    assert_eq!(store.get("a").unwrap().value, json!(1));
    assert_eq!(store.get("b").unwrap().value, json!(2));
    assert!(store.get("torn").is_none());
}

#[test]
fn unreadable_snapshot_means_empty_base_state() {
    let dir = tempdir().unwrap();
    std::fs::create_dir_all(dir.path()).unwrap();
    std::fs::write(dir.path().join("kv.json"), "not json at all").unwrap();

    let store = open_at(dir.path());
    assert_eq!(store.entry_count(), 0);

    // The store still works, and the next snapshot replaces the bad file
    store.set("fresh", json!(1), 600);
    store.create_snapshot().unwrap();

    let store = open_at(dir.path());
    assert_eq!(store.get("fresh").unwrap().value, json!(1));
}

// ----------------------------------------------------------------------
// Upstream cache-aside
// ----------------------------------------------------------------------

/// Serve a fixed JSON body for every request, `hits` times, then stop.
fn spawn_origin(body: &'static str, hits: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    std::thread::spawn(move || {
        for _ in 0..hits {
            let Ok((mut socket, _)) = listener.accept() else {
                return;
            };
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes());
        }
    });

    format!("http://{addr}")
}

#[test]
fn miss_populates_from_upstream_and_caches() {
    let dir = tempdir().unwrap();
    let origin = spawn_origin("42", 1);

    let store = KvStore::open(KvConfig {
        upstream_url: origin,
        ..KvConfig::at(dir.path())
    })
    .unwrap();

    // First read fetches and caches
    assert_eq!(store.get("missing").unwrap().value, json!(42));
    // Origin is gone now; the cached copy still serves
    assert_eq!(store.get("missing").unwrap().value, json!(42));
}

#[test]
fn upstream_failure_is_a_plain_miss() {
    let dir = tempdir().unwrap();

    // Nothing listens on this port; fetch fails fast with refused
    let store = KvStore::open(KvConfig {
        upstream_url: "http://127.0.0.1:9".into(),
        ..KvConfig::at(dir.path())
    })
    .unwrap();

    assert!(store.get("nope").is_none());
    // No negative caching: the entry is still absent locally
    assert_eq!(store.entry_count(), 0);
}

#[test]
fn local_hit_skips_upstream() {
    let dir = tempdir().unwrap();
    // Zero permitted hits: any request would panic the acceptor thread
    let origin = spawn_origin("99", 0);

    let store = KvStore::open(KvConfig {
        upstream_url: origin,
        ..KvConfig::at(dir.path())
    })
    .unwrap();

    store.set("present", json!("local"), 60);
    assert_eq!(store.get("present").unwrap().value, json!("local"));
}
