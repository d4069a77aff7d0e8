use chrono::{Datelike, Duration, NaiveDate};

use crate::config::{DAYS_PER_WEEK, OCCUPATION_WEEKDAYS};
use crate::planner::types::StructureStatus;

/// True when the date falls on one of the three permitted occupation weekdays.
pub fn is_occupation_weekday(date: NaiveDate) -> bool {
    OCCUPATION_WEEKDAYS.contains(&date.weekday())
}

/// Snaps a date to the closest occupation weekday, measured by weekday-number
/// distance (Sunday = 0). Ties resolve toward the earlier weekday, so a
/// Monday becomes the preceding Sunday and a Wednesday the preceding Tuesday.
pub fn nearest_occupation_day(date: NaiveDate) -> NaiveDate {
    let day_of_week = date.weekday().num_days_from_sunday() as i64;
    let mut nearest = OCCUPATION_WEEKDAYS[0].num_days_from_sunday() as i64;
    for weekday in &OCCUPATION_WEEKDAYS[1..] {
        let candidate = weekday.num_days_from_sunday() as i64;
        if (candidate - day_of_week).abs() < (nearest - day_of_week).abs() {
            nearest = candidate;
        }
    }
    date + Duration::days(nearest - day_of_week)
}

/// First occupation weekday on or after `today`.
pub fn next_occupation_day(today: NaiveDate) -> NaiveDate {
    let mut date = today;
    for _ in 0..7 {
        if is_occupation_weekday(date) {
            return date;
        }
        date += Duration::days(1);
    }
    date
}

/// In-event day number: the start date itself is day 1.
pub fn current_event_day(start: NaiveDate, today: NaiveDate) -> i64 {
    (today - start).num_days() + 1
}

/// Event week a given opening day falls in (day 1-7 = week 1, ...).
pub fn week_of_day(day: u32) -> u32 {
    day.div_ceil(DAYS_PER_WEEK)
}

/// Derives a structure's status for a given day. Evaluated freshly on every
/// query; planning status takes precedence over day-based availability.
pub fn structure_status(
    opening_day: u32,
    planned: bool,
    conflicted: bool,
    start: Option<NaiveDate>,
    today: NaiveDate,
) -> StructureStatus {
    let Some(start) = start else {
        return StructureStatus::Locked;
    };

    if planned {
        if conflicted {
            return StructureStatus::Conflict;
        }
        return StructureStatus::Planned;
    }

    let current_day = current_event_day(start, today);
    if current_day >= opening_day as i64 {
        if is_occupation_weekday(today) {
            return StructureStatus::Occupation;
        }
        return StructureStatus::Available;
    }

    StructureStatus::Locked
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn occupation_weekdays_are_sun_tue_thu() {
        // 2025-06-01 is a Sunday
        assert!(is_occupation_weekday(date(2025, 6, 1)));
        assert!(is_occupation_weekday(date(2025, 6, 3)));
        assert!(is_occupation_weekday(date(2025, 6, 5)));
        assert!(!is_occupation_weekday(date(2025, 6, 2)));
        assert!(!is_occupation_weekday(date(2025, 6, 6)));
    }

    #[test]
    fn nearest_day_snaps_by_weekday_distance() {
        // Monday -> previous Sunday, Wednesday -> previous Tuesday
        assert_eq!(nearest_occupation_day(date(2025, 6, 2)), date(2025, 6, 1));
        assert_eq!(nearest_occupation_day(date(2025, 6, 4)), date(2025, 6, 3));
        // Friday and Saturday -> Thursday of the same week
        assert_eq!(nearest_occupation_day(date(2025, 6, 6)), date(2025, 6, 5));
        assert_eq!(nearest_occupation_day(date(2025, 6, 7)), date(2025, 6, 5));
        // Already valid dates stay put
        assert_eq!(nearest_occupation_day(date(2025, 6, 5)), date(2025, 6, 5));
    }

    #[test]
    fn next_occupation_day_rolls_forward() {
        assert_eq!(next_occupation_day(date(2025, 6, 6)).weekday(), Weekday::Sun);
        assert_eq!(next_occupation_day(date(2025, 6, 2)).weekday(), Weekday::Tue);
        assert_eq!(next_occupation_day(date(2025, 6, 1)), date(2025, 6, 1));
    }

    #[test]
    fn event_day_counts_from_one() {
        assert_eq!(current_event_day(date(2025, 6, 1), date(2025, 6, 1)), 1);
        assert_eq!(current_event_day(date(2025, 6, 1), date(2025, 6, 3)), 3);
        // Before the start the event has not begun
        assert_eq!(current_event_day(date(2025, 6, 1), date(2025, 5, 31)), 0);
    }

    #[test]
    fn week_bucketing() {
        assert_eq!(week_of_day(1), 1);
        assert_eq!(week_of_day(7), 1);
        assert_eq!(week_of_day(8), 2);
        assert_eq!(week_of_day(42), 6);
    }

    #[test]
    fn no_start_date_means_locked() {
        let status = structure_status(1, false, false, None, date(2025, 6, 1));
        assert_eq!(status, StructureStatus::Locked);
    }

    // Opened 3 days into the event, today is an occupation day
    #[test]
    fn open_structure_on_occupation_day_reports_occupation() {
        // Start 2025-06-01 (Sun); today 2025-06-03 (Tue) is event day 3
        let status = structure_status(3, false, false, Some(date(2025, 6, 1)), date(2025, 6, 3));
        assert_eq!(status, StructureStatus::Occupation);
    }

    #[test]
    fn open_structure_on_off_day_is_available() {
        // 2025-06-04 is a Wednesday
        let status = structure_status(3, false, false, Some(date(2025, 6, 1)), date(2025, 6, 4));
        assert_eq!(status, StructureStatus::Available);
    }

    #[test]
    fn unopened_structure_is_locked() {
        let status = structure_status(10, false, false, Some(date(2025, 6, 1)), date(2025, 6, 3));
        assert_eq!(status, StructureStatus::Locked);
    }

    #[test]
    fn planning_takes_precedence_over_day_logic() {
        let start = Some(date(2025, 6, 1));
        assert_eq!(
            structure_status(40, true, false, start, date(2025, 6, 3)),
            StructureStatus::Planned
        );
        assert_eq!(
            structure_status(40, true, true, start, date(2025, 6, 3)),
            StructureStatus::Conflict
        );
    }
}
