//! Crash-safe snapshot load and write
//!
//! A snapshot is a single JSON object mapping key to stored item at a
//! consistency point. Writes follow the write-fsync-rename pattern: the
//! file lands at `path + ".tmp"`, is synced, then renamed over `path`, so
//! a reader observes either the old snapshot or the new one in full.

use hearth_core::{Error, Item, Result};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Load the snapshot at `path`, handing each live entry to `apply_live`.
///
/// An entry is live when its expiration is zero (legacy snapshots stored
/// no expiry) or strictly in the future at `now`. A missing file is an
/// empty base state, not an error; an unreadable file is corruption.
/// Returns the number of entries applied.
pub fn load<F>(path: &Path, now: i64, mut apply_live: F) -> Result<usize>
where
    F: FnMut(String, Item),
{
    let file = match File::open(path) {
        Ok(f) => f,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(err) => return Err(err.into()),
    };

    let entries: HashMap<String, Item> = serde_json::from_reader(BufReader::new(file))
        .map_err(|err| Error::Corruption(format!("snapshot unreadable: {err}")))?;

    let mut applied = 0usize;
    for (key, item) in entries {
        if item.expires_at == 0 || item.expires_at > now {
            apply_live(key, item);
            applied += 1;
        }
    }
    debug!(applied, path = %path.display(), "snapshot loaded");
    Ok(applied)
}

/// Write `entries` as a new snapshot at `path`.
///
/// The data goes to `path + ".tmp"` first, is fsynced, and is renamed
/// over `path` only once fully on disk. On any failure the previous
/// snapshot (if any) remains authoritative.
pub fn write(path: &Path, entries: &HashMap<String, Item>) -> Result<()> {
    let tmp_path = tmp_path_for(path);

    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, entries)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    drop(writer);

    std::fs::rename(&tmp_path, path)?;
    debug!(entries = entries.len(), path = %path.display(), "snapshot written");
    Ok(())
}

fn tmp_path_for(path: &Path) -> std::path::PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    std::path::PathBuf::from(os)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn item(n: i64, expires_at: i64) -> Item {
        Item::new(json!(n), expires_at)
    }

    #[test]
    fn write_then_load_is_identity_on_live_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");

        let mut entries = HashMap::new();
        entries.insert("a".to_string(), item(1, 1_000));
        entries.insert("b".to_string(), item(2, 2_000));
        write(&path, &entries).unwrap();

        let mut loaded = HashMap::new();
        let applied = load(&path, 500, |k, v| {
            loaded.insert(k, v);
        })
        .unwrap();
        assert_eq!(applied, 2);
        assert_eq!(loaded, entries);
    }

    #[test]
    fn load_missing_file_is_empty_base_state() {
        let dir = tempdir().unwrap();
        let applied = load(&dir.path().join("kv.json"), 0, |_, _| {
            panic!("nothing to apply")
        })
        .unwrap();
        assert_eq!(applied, 0);
    }

    #[test]
    fn load_skips_expired_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");

        let mut entries = HashMap::new();
        entries.insert("dead".to_string(), item(1, 100));
        entries.insert("live".to_string(), item(2, 9_000));
        write(&path, &entries).unwrap();

        let mut keys = Vec::new();
        load(&path, 5_000, |k, _| keys.push(k)).unwrap();
        assert_eq!(keys, vec!["live"]);
    }

    #[test]
    fn load_keeps_legacy_zero_expiry_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");

        std::fs::write(&path, r#"{"old":{"value":"v","expires_at":0}}"#).unwrap();

        let mut loaded = Vec::new();
        load(&path, 5_000, |k, i| loaded.push((k, i.expires_at))).unwrap();
        assert_eq!(loaded, vec![("old".to_string(), 0)]);
    }

    #[test]
    fn unreadable_snapshot_is_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");
        std::fs::write(&path, "{\"trunc").unwrap();

        let err = load(&path, 0, |_, _| {}).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn write_replaces_previous_snapshot_atomically() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.json");

        let mut first = HashMap::new();
        first.insert("gen".to_string(), item(1, 1_000));
        write(&path, &first).unwrap();

        let mut second = HashMap::new();
        second.insert("gen".to_string(), item(2, 1_000));
        write(&path, &second).unwrap();

        // No .tmp residue, and the visible file decodes to the new map
        assert!(!tmp_path_for(&path).exists());
        let mut loaded = HashMap::new();
        load(&path, 0, |k, v| {
            loaded.insert(k, v);
        })
        .unwrap();
        assert_eq!(loaded, second);
    }

    #[test]
    fn snapshots_of_equal_state_decode_equal() {
        let dir = tempdir().unwrap();
        let path_a = dir.path().join("a.json");
        let path_b = dir.path().join("b.json");

        let mut entries = HashMap::new();
        for i in 0..50 {
            entries.insert(format!("k{i}"), item(i, 10_000 + i));
        }
        write(&path_a, &entries).unwrap();
        write(&path_b, &entries).unwrap();

        let decode = |p: &Path| -> HashMap<String, Item> {
            serde_json::from_reader(File::open(p).unwrap()).unwrap()
        };
        assert_eq!(decode(&path_a), decode(&path_b));
    }
}
