use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::VERSION;
use crate::error::PlannerError;
use crate::planner::types::{Faction, Planning};

// Storage keys, kept identical to the original web client's localStorage keys
// so exported data stays recognizable.
pub const PLANNINGS_KEY: &str = "edenPlannings";
pub const FAVORITES_KEY: &str = "edenFavorites";
pub const START_DATE_KEY: &str = "edenStartDate";
pub const FACTION_KEY: &str = "userFaction";
pub const SETTINGS_KEY: &str = "edenSettings";

/// Plain string key-value storage. The session state treats writes as
/// best-effort: a failed flush is logged and in-memory state stays
/// authoritative.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PlannerError>;
    fn remove(&mut self, key: &str) -> Result<(), PlannerError>;
}

/// In-memory store for tests and one-shot CLI runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PlannerError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PlannerError> {
        self.values.remove(key);
        Ok(())
    }
}

/// One file per key under a data directory.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStore { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PlannerError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PlannerError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Everything a share link carries. Serialized as base64-encoded JSON with
/// the original client's field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedState {
    pub plannings: BTreeMap<usize, Vec<Planning>>,
    pub eden_start_date: Option<NaiveDate>,
    pub user_faction: Faction,
    pub timestamp: i64,
    pub version: String,
}

pub fn encode_share(state: &SharedState) -> Result<String, PlannerError> {
    let json = serde_json::to_string(state)?;
    Ok(BASE64.encode(json))
}

/// Decodes a share link payload. A version mismatch is warned about but the
/// data is still returned; any decode or parse failure yields `None` and no
/// partial application happens.
pub fn decode_share(encoded: &str) -> Option<SharedState> {
    let bytes = BASE64.decode(encoded.trim()).ok()?;
    let state: SharedState = serde_json::from_slice(&bytes).ok()?;
    if state.version != VERSION {
        log::warn!("share link has version {} (expected {})", state.version, VERSION);
    }
    Some(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::types::Priority;

    fn sample_state() -> SharedState {
        let planning = Planning {
            guild: "Alpha".to_string(),
            guild_faction: Faction::South,
            date: NaiveDate::from_ymd_opt(2025, 6, 3).unwrap(),
            time: "02:00".to_string(),
            banner: Some("Lead".to_string()),
            priority: Priority::High,
            notes: None,
        };
        let mut plannings = BTreeMap::new();
        plannings.insert(4, vec![planning]);
        SharedState {
            plannings,
            eden_start_date: NaiveDate::from_ymd_opt(2025, 6, 1),
            user_faction: Faction::South,
            timestamp: 1_700_000_000,
            version: VERSION.to_string(),
        }
    }

    #[test]
    fn share_round_trip() {
        let state = sample_state();
        let encoded = encode_share(&state).unwrap();
        let decoded = decode_share(&encoded).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn version_mismatch_still_applies() {
        let mut state = sample_state();
        state.version = "1.0".to_string();
        let encoded = encode_share(&state).unwrap();
        let decoded = decode_share(&encoded).unwrap();
        assert_eq!(decoded.version, "1.0");
    }

    #[test]
    fn garbage_decodes_to_none() {
        assert!(decode_share("not-base64!!!").is_none());
        assert!(decode_share(&BASE64.encode("not json")).is_none());
    }

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryStore::new();
        store.set(PLANNINGS_KEY, "{}").unwrap();
        assert_eq!(store.get(PLANNINGS_KEY), Some("{}".to_string()));
        store.remove(PLANNINGS_KEY).unwrap();
        assert_eq!(store.get(PLANNINGS_KEY), None);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = std::env::temp_dir().join(format!(
            "eden-planner-test-{}",
            std::process::id()
        ));
        let mut store = FileStore::new(&dir);
        store.set(SETTINGS_KEY, r#"{"items_per_page":20}"#).unwrap();
        assert_eq!(store.get(SETTINGS_KEY), Some(r#"{"items_per_page":20}"#.to_string()));
        store.remove(SETTINGS_KEY).unwrap();
        assert_eq!(store.get(SETTINGS_KEY), None);
        // Removing a missing key is not an error
        store.remove(SETTINGS_KEY).unwrap();
        let _ = fs::remove_dir_all(&dir);
    }
}
