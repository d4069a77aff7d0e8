use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::{StructureBonus, LOBBY_BONUSES, STRUCTURE_BONUSES};

/// True when a structure type grants a lobby stat bonus instead of points.
/// Matches any configured lobby name or the generic "Lobby" label.
pub fn is_lobby(occupation: &str) -> bool {
    occupation.contains("Lobby") || lobby_name(occupation).is_some()
}

/// Resolves an occupation string to its configured lobby type, if any.
pub fn lobby_name(occupation: &str) -> Option<&'static str> {
    LOBBY_BONUSES
        .iter()
        .find(|(name, _)| occupation.contains(name))
        .map(|(name, _)| *name)
}

/// Chaos production bonus for a non-lobby structure type. Substring match in
/// table order.
pub fn structure_bonus(occupation: &str) -> Option<StructureBonus> {
    STRUCTURE_BONUSES
        .iter()
        .find(|(key, _)| occupation.contains(key))
        .map(|(_, bonus)| *bonus)
}

/// Aggregate [min, max] bonus for one category, summed over the distinct
/// lobby types a guild holds in that category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBonus {
    pub min_total: f64,
    pub max_total: f64,
    pub unit: String,
    pub lobbies: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LobbyBonusSummary {
    pub by_category: BTreeMap<String, CategoryBonus>,
    pub duplicate_warnings: Vec<String>,
}

/// Stacks a guild's claimed lobbies into per-category bonus ranges.
///
/// Within a category each distinct lobby type contributes its [min, max]
/// once; claiming the same type again adds nothing and records a duplicate
/// warning the first time it repeats.
pub fn calculate_lobby_bonuses(occupations: &[String]) -> LobbyBonusSummary {
    let mut summary = LobbyBonusSummary::default();
    let mut seen_count: BTreeMap<&str, u32> = BTreeMap::new();

    for occupation in occupations {
        let Some(name) = lobby_name(occupation) else {
            continue; // Generic lobby with no configured bonus
        };
        let Some((_, bonus)) = LOBBY_BONUSES.iter().find(|(key, _)| *key == name) else {
            continue;
        };

        let count = seen_count.entry(name).or_insert(0);
        *count += 1;

        let entry = summary
            .by_category
            .entry(bonus.category.to_string())
            .or_insert_with(|| CategoryBonus {
                min_total: 0.0,
                max_total: 0.0,
                unit: bonus.unit.to_string(),
                lobbies: Vec::new(),
            });

        if *count > 1 {
            if *count == 2 {
                summary
                    .duplicate_warnings
                    .push(format!("{} is duplicated (only counts once)", name));
            }
            continue;
        }

        entry.min_total += bonus.min;
        entry.max_total += bonus.max;
        entry.lobbies.push(name.to_string());
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lobby_detection() {
        assert!(is_lobby("King Cnut Lobby"));
        assert!(is_lobby("Louis IX"));
        assert!(is_lobby("Unknown Lobby"));
        assert!(!is_lobby("Stronghold"));
    }

    #[test]
    fn structure_bonus_lookup_by_substring() {
        let bonus = structure_bonus("Small Town Lv2 (East)").unwrap();
        assert_eq!(bonus.base, 40);
        assert_eq!(bonus.percent, 1.0);
        assert!(structure_bonus("Temple").is_none());
    }

    #[test]
    fn distinct_types_stack_within_a_category() {
        let lobbies = vec!["Clovis I".to_string(), "John I".to_string()];
        let summary = calculate_lobby_bonuses(&lobbies);
        let might = summary.by_category.get("Troop Might").unwrap();
        assert_eq!(might.min_total, 10.0);
        assert_eq!(might.max_total, 100.0);
        assert_eq!(might.lobbies.len(), 2);
        assert!(summary.duplicate_warnings.is_empty());
    }

    // The same lobby type claimed twice counts once plus one warning
    #[test]
    fn duplicate_lobby_counts_once_with_warning() {
        let lobbies = vec![
            "Louis IX Lobby".to_string(),
            "Louis IX Lobby".to_string(),
            "Louis IX Lobby".to_string(),
        ];
        let summary = calculate_lobby_bonuses(&lobbies);
        let healing = summary.by_category.get("Healing Speed").unwrap();
        assert_eq!(healing.min_total, 5.0);
        assert_eq!(healing.max_total, 50.0);
        assert_eq!(summary.duplicate_warnings.len(), 1);
        assert!(summary.duplicate_warnings[0].contains("Louis IX"));
    }

    #[test]
    fn unconfigured_lobbies_are_ignored() {
        let lobbies = vec!["Mystery Lobby".to_string()];
        let summary = calculate_lobby_bonuses(&lobbies);
        assert!(summary.by_category.is_empty());
        assert!(summary.duplicate_warnings.is_empty());
    }
}
