use chrono::NaiveDate;

use crate::planner::status::{is_occupation_weekday, nearest_occupation_day};
use crate::planner::types::Planning;

/// Advisory validation: returns human-readable problems instead of failing.
/// Callers may skip this entirely; the store does not enforce it.
pub fn validate_planning(planning: &Planning) -> Vec<String> {
    let mut errors = Vec::new();

    if planning.guild.trim().is_empty() {
        errors.push("Guild name is required".to_string());
    }

    if !is_occupation_weekday(planning.date) {
        errors.push("Planning date must be Sunday, Tuesday, or Thursday".to_string());
    }

    if planning.time.trim().is_empty() {
        errors.push("Planning time is required".to_string());
    }

    errors
}

/// Auto-corrects a planning whose date is not a permitted occupation weekday.
/// Returns the adjusted date when a correction was made so the caller can
/// warn the user instead of rejecting the submission.
pub fn normalize_date(planning: &mut Planning) -> Option<NaiveDate> {
    if is_occupation_weekday(planning.date) {
        return None;
    }
    planning.date = nearest_occupation_day(planning.date);
    Some(planning.date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::types::{Faction, Priority};

    fn planning(guild: &str, date: NaiveDate) -> Planning {
        Planning {
            guild: guild.to_string(),
            guild_faction: Faction::South,
            date,
            time: "00:00".to_string(),
            banner: None,
            priority: Priority::High,
            notes: None,
        }
    }

    #[test]
    fn valid_planning_has_no_errors() {
        let p = planning("Alpha", NaiveDate::from_ymd_opt(2025, 6, 3).unwrap());
        assert!(validate_planning(&p).is_empty());
    }

    #[test]
    fn reports_each_problem() {
        let mut p = planning("", NaiveDate::from_ymd_opt(2025, 6, 4).unwrap());
        p.time = " ".to_string();
        let errors = validate_planning(&p);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("Guild name"));
        assert!(errors[1].contains("Sunday, Tuesday, or Thursday"));
    }

    #[test]
    fn normalize_adjusts_off_days_only() {
        // Wednesday snaps back to Tuesday
        let mut p = planning("Alpha", NaiveDate::from_ymd_opt(2025, 6, 4).unwrap());
        let adjusted = normalize_date(&mut p);
        assert_eq!(adjusted, Some(NaiveDate::from_ymd_opt(2025, 6, 3).unwrap()));
        assert_eq!(p.date, NaiveDate::from_ymd_opt(2025, 6, 3).unwrap());

        // Already on Tuesday: untouched
        assert_eq!(normalize_date(&mut p), None);
    }
}
