use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Faction a guild fights for. Structure records keep their looser catalog
/// string (which also contains "Neutral" and named zones); guild plannings
/// are always one of these two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    North,
    South,
}

impl Faction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Faction::North => "North",
            Faction::South => "South",
        }
    }

    /// Loose match against catalog faction strings ("North", "north zone", ...)
    pub fn from_loose(value: &str) -> Option<Faction> {
        let lower = value.to_lowercase();
        if lower.contains("north") {
            Some(Faction::North)
        } else if lower.contains("south") {
            Some(Faction::South)
        } else {
            None
        }
    }
}

impl Default for Faction {
    fn default() -> Self {
        Faction::North
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// A guild's scheduled claim on a structure: who takes it, when, and how
/// important it is. One structure can accumulate claims from several guilds;
/// that is exactly what the conflict detector looks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Planning {
    pub guild: String,
    #[serde(default)]
    pub guild_faction: Faction,
    pub date: NaiveDate,
    #[serde(default = "default_time")]
    pub time: String,
    #[serde(default)]
    pub banner: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub notes: Option<String>,
}

fn default_time() -> String {
    "00:00".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryAction {
    Add,
    Edit,
    Remove,
}

/// One recorded planning mutation. `previous`/`new` capture the claim being
/// replaced or removed so undo/redo can restore either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub index: usize,
    pub previous: Option<Planning>,
    pub new: Option<Planning>,
    pub timestamp: i64,
}

/// Derived state of a structure at a point in time. Planning status takes
/// precedence over day-based availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureStatus {
    Locked,
    Available,
    Occupation,
    Planned,
    Conflict,
}

impl StructureStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StructureStatus::Locked => "locked",
            StructureStatus::Available => "available",
            StructureStatus::Occupation => "occupation",
            StructureStatus::Planned => "planned",
            StructureStatus::Conflict => "conflict",
        }
    }
}

/// User-marked favorite. Structure indices and guild names live in the same
/// set, serialized as a mixed JSON array of numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Favorite {
    Structure(usize),
    Guild(String),
}

/// User preferences. Every field has a default so partially-saved settings
/// from older versions merge cleanly on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_cache_minutes")]
    pub cache_duration_minutes: u32,
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,
    #[serde(default = "default_true")]
    pub notify_occupation: bool,
    #[serde(default = "default_true")]
    pub notify_conflict: bool,
    #[serde(default = "default_true")]
    pub notify_structure: bool,
    /// Stub: accepted and persisted but performs no networking.
    #[serde(default)]
    pub realtime_sync: bool,
    #[serde(default)]
    pub sync_server: String,
}

fn default_cache_minutes() -> u32 {
    crate::config::DEFAULT_CACHE_MINUTES
}

fn default_items_per_page() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            cache_duration_minutes: default_cache_minutes(),
            items_per_page: default_items_per_page(),
            notify_occupation: true,
            notify_conflict: true,
            notify_structure: true,
            realtime_sync: false,
            sync_server: String::new(),
        }
    }
}
