//! File-backed session history store.
//!
//! Each session owns one JSON record (`<dir>/<session>.json`) holding the
//! ordered turn sequence. Reads rebuild the history from disk every time;
//! nothing is cached across calls, so `load` always reflects the latest
//! durable state. Writes go through a temp file + rename, and every
//! operation on one session runs under that session's async mutex.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, warn};

use ragline_core::{Error, Result, Turn};

/// Longest session id stored under its own name; longer ids are hashed.
const MAX_PLAIN_ID_LEN: usize = 64;

/// Durable, per-session ordered log of conversation turns.
pub struct SessionStore {
    dir: PathBuf,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SessionStore {
    /// Open or create the store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| Error::Storage(e.to_string()))?;
        info!("SessionStore initialized: dir={}", dir.display());
        Ok(Self {
            dir,
            locks: DashMap::new(),
        })
    }

    /// All turns for the session, in insertion order.
    ///
    /// A missing record is created empty as a side effect. I/O and parse
    /// failures degrade to an empty history (logged, never fatal): the
    /// pipeline answers without context rather than crashing the turn.
    pub async fn load(&self, session_id: &str) -> Vec<Turn> {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;
        let path = self.record_path(session_id);

        match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<Turn>>(&bytes) {
                Ok(turns) => turns,
                Err(e) => {
                    warn!(
                        "Malformed session record {}, treating as empty: {}",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // First access: create the empty durable record.
                if let Err(e) = write_atomic(&path, &[]).await {
                    warn!(
                        "Failed to create session record {}: {}",
                        path.display(),
                        e
                    );
                }
                Vec::new()
            }
            Err(e) => {
                warn!(
                    "Failed to read session record {}, treating as empty: {}",
                    path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Durably append `turns` after all existing ones, preserving order.
    ///
    /// Unlike `load`, a failed write surfaces to the caller: silently
    /// dropping it would leave the model believing a turn was recorded
    /// when it was not.
    pub async fn append(&self, session_id: &str, turns: Vec<Turn>) -> Result<()> {
        if turns.is_empty() {
            return Ok(());
        }

        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;
        let path = self.record_path(session_id);

        let mut existing = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<Turn>>(&bytes) {
                Ok(turns) => turns,
                Err(e) => {
                    warn!(
                        "Malformed session record {}, starting fresh: {}",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(Error::Storage(e.to_string())),
        };

        existing.extend(turns);
        write_atomic(&path, &existing)
            .await
            .map_err(|e| Error::Storage(e.to_string()))
    }

    /// Remove all turns for the session. Clearing a session with no record
    /// succeeds silently.
    pub async fn clear(&self, session_id: &str) -> Result<()> {
        let lock = self.lock_for(session_id);
        let _guard = lock.lock().await;
        let path = self.record_path(session_id);

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(e.to_string())),
        }
    }

    /// Per-session mutex. Unrelated sessions never contend.
    fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Record file for a session id. Identifiers are opaque strings, so
    /// anything that is not filesystem-safe maps to its SHA-256 name.
    fn record_path(&self, session_id: &str) -> PathBuf {
        let safe = !session_id.is_empty()
            && session_id.len() <= MAX_PLAIN_ID_LEN
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if safe {
            self.dir.join(format!("{}.json", session_id))
        } else {
            let digest = Sha256::digest(session_id.as_bytes());
            self.dir.join(format!("{}.json", hex::encode(digest)))
        }
    }
}

/// Write the full record through a temp file so a crashed write never
/// leaves a half-serialized record behind.
async fn write_atomic(path: &Path, turns: &[Turn]) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(turns)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &json).await?;
    fs::rename(&tmp, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_core::TurnRole;

    fn test_store() -> (SessionStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open(dir.path()).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_load_missing_creates_empty_record() {
        let (store, dir) = test_store();

        let turns = store.load("s1").await;
        assert!(turns.is_empty());

        // The durable record now exists.
        assert!(dir.path().join("s1.json").exists());
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let (store, _dir) = test_store();

        for i in 0..3 {
            store
                .append(
                    "s1",
                    vec![
                        Turn::human(format!("q{}", i)),
                        Turn::assistant(format!("a{}", i)),
                    ],
                )
                .await
                .unwrap();
        }

        let turns = store.load("s1").await;
        assert_eq!(turns.len(), 6);
        for (i, pair) in turns.chunks(2).enumerate() {
            assert_eq!(pair[0].role, TurnRole::Human);
            assert_eq!(pair[0].content, format!("q{}", i));
            assert_eq!(pair[1].role, TurnRole::Assistant);
            assert_eq!(pair[1].content, format!("a{}", i));
        }
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let (store, _dir) = test_store();
        store
            .append("s1", vec![Turn::human("q"), Turn::assistant("a")])
            .await
            .unwrap();

        let first = store.load("s1").await;
        let second = store.load("s1").await;
        assert_eq!(first.len(), second.len());
        assert_eq!(first[0].content, second[0].content);
        assert_eq!(first[1].content, second[1].content);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (store, _dir) = test_store();
        store
            .append("s1", vec![Turn::human("q"), Turn::assistant("a")])
            .await
            .unwrap();

        store.clear("s1").await.unwrap();
        assert!(store.load("s1").await.is_empty());

        // Clearing a session with no record succeeds silently.
        store.clear("s1").await.unwrap();
        store.clear("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let (store, _dir) = test_store();
        store
            .append("a", vec![Turn::human("qa"), Turn::assistant("aa")])
            .await
            .unwrap();
        store
            .append("b", vec![Turn::human("qb"), Turn::assistant("ab")])
            .await
            .unwrap();

        store.clear("a").await.unwrap();
        assert!(store.load("a").await.is_empty());
        assert_eq!(store.load("b").await.len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_never_interleave() {
        let (store, _dir) = test_store();
        let store = Arc::new(store);

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(
                        "shared",
                        vec![
                            Turn::human(format!("q{}", i)),
                            Turn::assistant(format!("a{}", i)),
                        ],
                    )
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        // Final record length equals the sum of appended turns, and each
        // question still sits directly before its answer.
        let turns = store.load("shared").await;
        assert_eq!(turns.len(), 16);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, TurnRole::Human);
            assert_eq!(pair[1].role, TurnRole::Assistant);
            assert_eq!(pair[0].content[1..], pair[1].content[1..]);
        }
    }

    #[tokio::test]
    async fn test_corrupt_record_degrades_to_empty() {
        let (store, dir) = test_store();
        std::fs::write(dir.path().join("s1.json"), b"{not json").unwrap();

        assert!(store.load("s1").await.is_empty());

        // A subsequent append starts a fresh record.
        store
            .append("s1", vec![Turn::human("q"), Turn::assistant("a")])
            .await
            .unwrap();
        assert_eq!(store.load("s1").await.len(), 2);
    }

    #[tokio::test]
    async fn test_unsafe_session_ids_stay_inside_dir() {
        let (store, dir) = test_store();
        let id = "../escape/../../etc";

        store
            .append(id, vec![Turn::human("q"), Turn::assistant("a")])
            .await
            .unwrap();
        assert_eq!(store.load(id).await.len(), 2);

        // The record landed in the store directory under a hashed name.
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with(".json"));
        assert_eq!(entries[0].len(), 64 + ".json".len());
    }
}
