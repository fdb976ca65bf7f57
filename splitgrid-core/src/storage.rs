//! # Persisted state for Splitgrid
//!
//! All sessions share one key-value document. The keys this crate reads or
//! writes keep the names used by the host extension:
//!
//! - `splitUrls`: index-aligned pane addresses
//! - `splitTabStates`: one layout snapshot per live session, keyed by id
//! - `pendingLayoutState`: a one-shot snapshot for the next session to start
//! - `resetRequest`: `{sessionId, token}` asking one session to reset ratios
//! - `lastSession`: the snapshot of the most recently ended session, which
//!   [`LastSession::relaunch`] turns back into a launch
//!
//! Keys owned by other collaborators (settings, saved layouts) are carried
//! through untouched. Values written by other sessions or tools are kept as
//! raw JSON and only parsed on demand, so one corrupt entry cannot make the
//! whole document unreadable.

use crate::layout::{LaunchParams, SessionMode, MAX_PANES};
use crate::navigation::BLANK_ADDRESS;
use crate::snapshot::Snapshot;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A request for one session to reset its ratios to uniform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetRequest {
    pub session_id: String,
    pub token: i64,
}

impl ResetRequest {
    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let session_id = object
            .get("sessionId")
            .or_else(|| object.get("tabId"))
            .and_then(id_string)?;
        let token = object.get("token").and_then(|t| {
            t.as_i64().or_else(|| t.as_f64().map(|f| f as i64))
        })?;
        Some(Self { session_id, token })
    }

    fn to_value(&self) -> Value {
        serde_json::json!({ "sessionId": self.session_id, "token": self.token })
    }
}

/// Session ids may be stored as strings or as numeric tab ids.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Snapshot of an ended session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastSession {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    /// UTC milliseconds
    pub closed_at: i64,
}

/// Everything needed to launch a new session from an ended one.
#[derive(Debug, Clone, PartialEq)]
pub struct Relaunch {
    pub params: LaunchParams,
    pub urls: Vec<String>,
    /// Staged as `pendingLayoutState` when the ended session had a grid
    pub pending: Option<Snapshot>,
}

impl LastSession {
    /// Plan a relaunch of this session.
    ///
    /// Returns `None` when the session had no address worth opening. The
    /// pane count is the larger of the stored count and the number of
    /// addresses, and `dual` survives only for exactly two panes.
    ///
    /// Without a stored grid, blank addresses are dropped. With one, the
    /// addresses stay index aligned with the panes (blanks become empty
    /// entries) so the restored layout shows each page in its old pane.
    pub fn relaunch(&self) -> Option<Relaunch> {
        let is_blank = |u: &String| u.is_empty() || u.as_str() == BLANK_ADDRESS;
        let addresses: Vec<String> = self
            .snapshot
            .urls
            .iter()
            .filter(|u| !is_blank(u))
            .take(MAX_PANES)
            .cloned()
            .collect();
        if addresses.is_empty() {
            return None;
        }
        let urls = match self.snapshot.grid {
            Some(_) => self
                .snapshot
                .urls
                .iter()
                .take(MAX_PANES)
                .map(|u| if is_blank(u) { String::new() } else { u.clone() })
                .collect(),
            None => addresses.clone(),
        };

        let saved = self
            .snapshot
            .count
            .and_then(|c| usize::try_from(c).ok())
            .unwrap_or(urls.len());
        let count = saved.max(addresses.len()).clamp(1, MAX_PANES);
        let mode = match self.snapshot.mode.as_deref() {
            Some("dual") if count == 2 => SessionMode::Dual,
            _ => SessionMode::Quad,
        };
        let count = (count != mode.default_count()).then_some(count);
        let params = LaunchParams::new(mode, count);

        let pending = self.snapshot.grid.as_ref().map(|_| Snapshot {
            mode: Some(mode.as_str().to_string()),
            count: Some(params.requested_count() as i64),
            urls: Vec::new(),
            ..self.snapshot.clone()
        });

        Some(Relaunch {
            params,
            urls,
            pending,
        })
    }
}

/// `splitUrls` written by anyone: non-string entries become empty and a
/// value that is not a list reads as no addresses.
fn lenient_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = match Value::deserialize(deserializer)? {
        Value::Array(values) => values,
        _ => Vec::new(),
    };
    Ok(values
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            _ => String::new(),
        })
        .collect())
}

/// `splitTabStates` that is not an object reads as no stored sessions.
fn lenient_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map.into_iter().collect(),
        _ => BTreeMap::new(),
    })
}

/// The shared persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredState {
    #[serde(default, deserialize_with = "lenient_strings")]
    split_urls: Vec<String>,
    #[serde(default, deserialize_with = "lenient_map")]
    split_tab_states: BTreeMap<String, Value>,
    #[serde(default)]
    pending_layout_state: Option<Value>,
    #[serde(default)]
    reset_request: Option<Value>,
    #[serde(default)]
    last_session: Option<Value>,
    /// Keys owned by other collaborators
    #[serde(flatten)]
    other: Map<String, Value>,
}

impl StoredState {
    pub fn split_urls(&self) -> &[String] {
        &self.split_urls
    }

    pub fn set_split_urls(&mut self, urls: Vec<String>) {
        self.split_urls = urls;
    }

    /// Set one pane's address, padding the list with empty entries.
    pub fn set_split_url(&mut self, index: usize, url: &str) {
        if self.split_urls.len() <= index {
            self.split_urls.resize(index + 1, String::new());
        }
        self.split_urls[index] = url.to_string();
    }

    /// Raw snapshot stored for a session.
    pub fn tab_state(&self, session_id: &str) -> Option<&Value> {
        self.split_tab_states.get(session_id)
    }

    pub fn set_tab_state(&mut self, session_id: &str, snapshot: &Snapshot) -> Result<()> {
        self.split_tab_states
            .insert(session_id.to_string(), snapshot.to_value()?);
        Ok(())
    }

    pub fn remove_tab_state(&mut self, session_id: &str) -> Option<Value> {
        self.split_tab_states.remove(session_id)
    }

    /// Ids of every session with a stored snapshot.
    pub fn session_ids(&self) -> impl Iterator<Item = &str> {
        self.split_tab_states.keys().map(String::as_str)
    }

    pub fn pending_layout_state(&self) -> Option<&Value> {
        self.pending_layout_state.as_ref().filter(|v| !v.is_null())
    }

    pub fn set_pending_layout_state(&mut self, value: Option<Value>) {
        self.pending_layout_state = value;
    }

    /// Remove and return the one-shot pending snapshot.
    pub fn take_pending_layout_state(&mut self) -> Option<Value> {
        self.pending_layout_state.take().filter(|v| !v.is_null())
    }

    /// The current reset request, if one is stored and well formed.
    pub fn reset_request(&self) -> Option<ResetRequest> {
        self.reset_request.as_ref().and_then(ResetRequest::from_value)
    }

    pub fn set_reset_request(&mut self, request: &ResetRequest) {
        self.reset_request = Some(request.to_value());
    }

    /// The most recently ended session, if stored and well formed.
    pub fn last_session(&self) -> Option<LastSession> {
        self.last_session
            .clone()
            .and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn set_last_session(&mut self, last: &LastSession) -> Result<()> {
        self.last_session = Some(serde_json::to_value(last)?);
        Ok(())
    }

    /// Stage a launch: the new session picks up these addresses and its
    /// pending snapshot when it starts.
    pub fn stage_launch(&mut self, launch: &Relaunch) -> Result<()> {
        self.split_urls = launch.urls.clone();
        self.pending_layout_state = match &launch.pending {
            Some(snapshot) => Some(snapshot.to_value()?),
            None => None,
        };
        Ok(())
    }

    /// A key owned by another collaborator.
    pub fn other(&self, key: &str) -> Option<&Value> {
        self.other.get(key)
    }
}

/// Backing storage for the shared document.
pub trait StateStore {
    /// Read the whole document. A store with nothing saved yields the default.
    fn load(&self) -> Result<StoredState>;

    /// Replace the whole document.
    fn save(&mut self, state: &StoredState) -> Result<()>;

    /// Read, modify and write back.
    fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut StoredState) -> Result<()>,
        Self: Sized,
    {
        let mut state = self.load()?;
        f(&mut state)?;
        self.save(&state)
    }
}

/// In-memory store, used for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: StoredState,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: StoredState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &StoredState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StoredState {
        &mut self.state
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<StoredState> {
        Ok(self.state.clone())
    }

    fn save(&mut self, state: &StoredState) -> Result<()> {
        self.state = state.clone();
        Ok(())
    }
}

/// JSON file store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStore {
    fn load(&self) -> Result<StoredState> {
        if !self.path.exists() {
            return Ok(StoredState::default());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::storage(format!("Failed to read state file: {}", e)))?;
        // Saves replace the file whole, so an empty file was truncated by
        // someone else. Reading it as empty would wipe every other key on
        // the next write.
        if content.trim().is_empty() {
            return Err(Error::storage(format!(
                "State file {} is empty",
                self.path.display()
            )));
        }

        serde_json::from_str(&content)
            .map_err(|e| Error::storage(format!("Failed to parse state file: {}", e)))
    }

    fn save(&mut self, state: &StoredState) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::storage(format!("Failed to create state directory: {}", e)))?;

        // Write a sibling temp file and rename it over the target so readers
        // see either the old document or the new one, never a partial file.
        let mut file = NamedTempFile::new_in(dir)
            .map_err(|e| Error::storage(format!("Failed to create temp state file: {}", e)))?;
        {
            let mut writer = BufWriter::new(file.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, state)
                .map_err(|e| Error::storage(format!("Failed to serialize state: {}", e)))?;
            writer
                .flush()
                .map_err(|e| Error::storage(format!("Failed to write state file: {}", e)))?;
        }
        file.as_file()
            .sync_all()
            .map_err(|e| Error::storage(format!("Failed to write state file: {}", e)))?;
        file.persist(&self.path)
            .map_err(|e| Error::storage(format!("Failed to replace state file: {}", e.error)))?;

        tracing::debug!(path = %self.path.display(), "saved shared state");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_foreign_keys_survive_round_trip() {
        let state: StoredState = serde_json::from_value(json!({
            "darkMode": false,
            "savedLayouts": [{ "id": "layout_1" }],
            "splitUrls": ["https://a.com", null, "https://c.com"]
        }))
        .unwrap();
        assert_eq!(state.split_urls(), &["https://a.com", "", "https://c.com"]);

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["darkMode"], json!(false));
        assert_eq!(value["savedLayouts"][0]["id"], json!("layout_1"));
    }

    #[test]
    fn test_reset_request_accepts_tab_id() {
        let state: StoredState = serde_json::from_value(json!({
            "resetRequest": { "tabId": 42, "token": 1700000000000u64 }
        }))
        .unwrap();
        assert_eq!(
            state.reset_request(),
            Some(ResetRequest {
                session_id: "42".to_string(),
                token: 1_700_000_000_000
            })
        );
    }

    #[test]
    fn test_corrupt_entries_do_not_poison_document() {
        let state: StoredState = serde_json::from_value(json!({
            "resetRequest": "garbage",
            "lastSession": 17,
            "splitTabStates": { "a": "not a snapshot" }
        }))
        .unwrap();
        assert_eq!(state.reset_request(), None);
        assert_eq!(state.last_session(), None);
        assert!(state.tab_state("a").is_some());
    }

    #[test]
    fn test_pending_state_is_one_shot() {
        let mut state = StoredState::default();
        state.set_pending_layout_state(Some(json!({ "mode": "quad" })));
        assert!(state.take_pending_layout_state().is_some());
        assert!(state.take_pending_layout_state().is_none());

        state.set_pending_layout_state(Some(Value::Null));
        assert!(state.take_pending_layout_state().is_none());
    }

    #[test]
    fn test_set_split_url_pads() {
        let mut state = StoredState::default();
        state.set_split_url(2, "https://c.com");
        assert_eq!(state.split_urls(), &["", "", "https://c.com"]);
    }

    fn last_session(value: serde_json::Value) -> LastSession {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_relaunch_drops_blank_addresses() {
        let last = last_session(json!({
            "mode": "quad",
            "count": 3,
            "urls": ["https://a.com", "about:blank", "", "https://d.com"],
            "closedAt": 1
        }));
        let launch = last.relaunch().unwrap();
        assert_eq!(launch.urls, vec!["https://a.com", "https://d.com"]);
        assert_eq!(launch.params, LaunchParams::new(SessionMode::Quad, Some(3)));
        assert!(launch.pending.is_none());
    }

    #[test]
    fn test_relaunch_keeps_dual_and_grid() {
        let last = last_session(json!({
            "mode": "dual",
            "count": 2,
            "activePaneIndices": [0, 1],
            "grid": { "cols": 2, "rows": 1, "colRatios": [0.7, 0.3], "rowRatios": [1.0] },
            "urls": ["https://a.com", "https://b.com"],
            "closedAt": 1
        }));
        let launch = last.relaunch().unwrap();
        assert_eq!(launch.params.to_query(), "mode=dual");
        let pending = launch.pending.unwrap();
        assert_eq!(pending.count, Some(2));
        assert_eq!(pending.grid.unwrap().col_ratios, vec![0.7, 0.3]);

        let empty = last_session(json!({ "urls": ["about:blank"], "closedAt": 1 }));
        assert!(empty.relaunch().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("state").join("state.json"));
        assert_eq!(store.load().unwrap(), StoredState::default());

        store
            .update(|state| {
                state.set_split_url(0, "https://a.com");
                state.set_reset_request(&ResetRequest {
                    session_id: "s1".to_string(),
                    token: 5,
                });
                Ok(())
            })
            .unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.split_urls(), &["https://a.com"]);
        assert_eq!(loaded.reset_request().unwrap().token, 5);
    }

    #[test]
    fn test_non_map_tab_states_read_as_empty() {
        let state: StoredState = serde_json::from_value(json!({
            "splitTabStates": [],
            "splitUrls": "https://a.com",
            "darkMode": true
        }))
        .unwrap();
        assert_eq!(state.session_ids().count(), 0);
        assert!(state.split_urls().is_empty());
        assert_eq!(state.other("darkMode"), Some(&json!(true)));
    }

    #[test]
    fn test_file_store_refuses_truncated_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "").unwrap();
        let mut store = FileStore::new(&path);
        assert_eq!(store.load().unwrap_err().category(), "Storage");

        let result = store.update(|state| {
            state.set_split_url(0, "https://a.com");
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_concurrent_readers_never_see_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state: StoredState = serde_json::from_value(json!({ "darkMode": true })).unwrap();
        for i in 0..400 {
            state.split_tab_states.insert(
                format!("session-{}", i),
                json!({ "mode": "quad", "count": 4, "urls": ["https://a.com"] }),
            );
        }
        let mut writer = FileStore::new(&path);
        writer.save(&state).unwrap();

        let reader = FileStore::new(&path);
        let handle = std::thread::spawn(move || {
            for _ in 0..200 {
                writer.save(&state).unwrap();
            }
        });
        for _ in 0..500 {
            let loaded = reader.load().unwrap();
            assert_eq!(loaded.session_ids().count(), 400);
            assert_eq!(loaded.other("darkMode"), Some(&json!(true)));
        }
        handle.join().unwrap();
    }

    #[test]
    fn test_file_store_reports_corrupt_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = FileStore::new(&path).load().unwrap_err();
        assert_eq!(err.category(), "Storage");
    }
}
