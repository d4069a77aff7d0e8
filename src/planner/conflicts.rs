use std::collections::BTreeMap;

use crate::planner::types::Planning;

/// Computes the set of structure indices claimed by more than one guild.
///
/// Guild names are collected in claim order and deliberately NOT deduplicated:
/// a guild that submits the same structure twice registers as a conflict with
/// itself, matching the behavior planners already rely on to spot double
/// submissions. Recomputed in full on every call; the catalog is hundreds of
/// structures, not millions.
pub fn detect_conflicts(
    plannings: &BTreeMap<usize, Vec<Planning>>,
) -> BTreeMap<usize, Vec<String>> {
    let mut conflicts: BTreeMap<usize, Vec<String>> = BTreeMap::new();

    for (&index, claims) in plannings {
        let guilds: Vec<String> = claims.iter().map(|p| p.guild.clone()).collect();
        if guilds.len() >= 2 {
            conflicts.insert(index, guilds);
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::types::{Faction, Planning, Priority};
    use chrono::NaiveDate;

    fn planning(guild: &str) -> Planning {
        Planning {
            guild: guild.to_string(),
            guild_faction: Faction::North,
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            time: "00:00".to_string(),
            banner: None,
            priority: Priority::Medium,
            notes: None,
        }
    }

    #[test]
    fn single_claims_are_not_conflicts() {
        let mut plannings = BTreeMap::new();
        plannings.insert(0, vec![planning("Alpha")]);
        plannings.insert(5, vec![planning("Beta")]);
        assert!(detect_conflicts(&plannings).is_empty());
    }

    #[test]
    fn two_guilds_conflict_in_claim_order() {
        let mut plannings = BTreeMap::new();
        plannings.insert(3, vec![planning("Alpha"), planning("Beta")]);
        let conflicts = detect_conflicts(&plannings);
        assert_eq!(conflicts.get(&3).unwrap(), &vec!["Alpha".to_string(), "Beta".to_string()]);
    }

    // Pins the non-deduplicated behavior: a guild resubmitting the same
    // structure conflicts with itself.
    #[test]
    fn same_guild_twice_counts_as_conflict() {
        let mut plannings = BTreeMap::new();
        plannings.insert(7, vec![planning("Alpha"), planning("Alpha")]);
        let conflicts = detect_conflicts(&plannings);
        assert_eq!(conflicts.get(&7).unwrap(), &vec!["Alpha".to_string(), "Alpha".to_string()]);
    }

    #[test]
    fn idempotent_without_mutation() {
        let mut plannings = BTreeMap::new();
        plannings.insert(1, vec![planning("Alpha"), planning("Beta")]);
        plannings.insert(2, vec![planning("Gamma")]);
        assert_eq!(detect_conflicts(&plannings), detect_conflicts(&plannings));
    }
}
