use chrono::Weekday;

/// Map edge length; structure coordinates are bounded by this on both axes.
pub const MAP_SIZE: u32 = 1600;

/// Weekdays on which structures can actually be captured (Sun/Tue/Thu).
pub const OCCUPATION_WEEKDAYS: [Weekday; 3] = [Weekday::Sun, Weekday::Tue, Weekday::Thu];

/// The event runs for six weeks of seven days.
pub const EVENT_WEEKS: u32 = 6;
pub const DAYS_PER_WEEK: u32 = 7;

/// Undo history keeps at most this many entries; the oldest are dropped.
pub const HISTORY_LIMIT: usize = 50;

/// Default coalescing window for debounced work, in milliseconds.
pub const DEBOUNCE_DELAY_MS: u64 = 300;

/// State format version carried in share links and exports.
pub const VERSION: &str = "2.0";

/// Default catalog cache lifetime in minutes.
pub const DEFAULT_CACHE_MINUTES: u32 = 5;

/// Chaos production bonus granted by a non-lobby structure type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureBonus {
    pub base: u32,
    pub percent: f64,
}

/// Per-structure-type chaos production bonuses. Lookup is by substring match
/// in table order, so more specific names must come before generic ones.
pub const STRUCTURE_BONUSES: &[(&str, StructureBonus)] = &[
    ("Stronghold", StructureBonus { base: 20, percent: 0.5 }),
    ("Small Town Lv1", StructureBonus { base: 20, percent: 0.5 }),
    ("Small Town Lv2", StructureBonus { base: 40, percent: 1.0 }),
    ("Large Town Lv4", StructureBonus { base: 100, percent: 2.0 }),
    ("Capitol Lv5", StructureBonus { base: 200, percent: 5.0 }),
    ("Capitol Lv6", StructureBonus { base: 200, percent: 5.0 }),
    ("Capitol Lv7", StructureBonus { base: 200, percent: 5.0 }),
    ("World Center Lv.8", StructureBonus { base: 400, percent: 8.0 }),
    ("Check Point Lv1", StructureBonus { base: 0, percent: 0.0 }),
    ("Check Point Lv2", StructureBonus { base: 0, percent: 0.0 }),
    ("Check Point Lv3", StructureBonus { base: 0, percent: 0.0 }),
];

/// Stat bonus granted by a lobby structure: a [min, max] range within a
/// named bonus category. Distinct lobby types in the same category stack;
/// a duplicate of the same type counts once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LobbyBonus {
    pub category: &'static str,
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
}

pub const LOBBY_BONUSES: &[(&str, LobbyBonus)] = &[
    ("King Cnut", LobbyBonus { category: "Frontline Workshop", min: 2.0, max: 20.0, unit: "%" }),
    ("Rozen Blade", LobbyBonus { category: "Frontline Workshop", min: 2.0, max: 20.0, unit: "%" }),
    ("Jeanne d'Arc", LobbyBonus { category: "Frontline Workshop", min: 2.0, max: 20.0, unit: "%" }),
    ("Clovis I", LobbyBonus { category: "Troop Might", min: 5.0, max: 50.0, unit: "%" }),
    ("John I", LobbyBonus { category: "Troop Might", min: 5.0, max: 50.0, unit: "%" }),
    ("Lionheart", LobbyBonus { category: "Troop Resistance", min: 5.0, max: 50.0, unit: "%" }),
    ("Gnaeus Pompey", LobbyBonus { category: "Troop Resistance", min: 5.0, max: 50.0, unit: "%" }),
    ("Louis IX", LobbyBonus { category: "Healing Speed", min: 5.0, max: 50.0, unit: "%" }),
    ("Peace Bringer", LobbyBonus { category: "Damage", min: 0.5, max: 5.0, unit: "%" }),
];

/// One label per event week, indexed by week number starting at 1.
pub const WEEK_DESCRIPTIONS: [&str; EVENT_WEEKS as usize] = [
    "Eden Opens - Initial Zones",
    "Territory Expansion Phase",
    "E/W Sectors Open - Lv4+ Focus",
    "Central Sectors - Lv7 Capitol",
    "Lv6 Gates - Temple Race",
    "Final Battle - World Center",
];
