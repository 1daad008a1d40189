//! Calendar period helpers for streaks and quest generation
//!
//! - Day buckets: "YYYY-MM-DD" (UTC)
//! - Week starts: Monday 00:00 UTC (ISO weeks)
//! - Quest period bounds for Daily / Weekly / Special generation

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};

use crate::domain::{QuestType, StreakUnit};

/// Compute the day bucket string ("YYYY-MM-DD") for an instant.
pub fn day_bucket(at: DateTime<Utc>) -> String {
    format!("{:04}-{:02}-{:02}", at.year(), at.month(), at.day())
}

/// Midnight UTC of the given instant's day.
pub fn start_of_day(at: DateTime<Utc>) -> DateTime<Utc> {
    let date = at.date_naive();
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Monday 00:00 UTC of the given instant's ISO week.
pub fn start_of_week(at: DateTime<Utc>) -> DateTime<Utc> {
    let days_from_monday = at.weekday().num_days_from_monday() as i64;
    start_of_day(at) - Duration::days(days_from_monday)
}

/// Number of whole calendar units between `last` and `now`.
///
/// Returns `None` for progress-based units (items, transactions), which
/// have no calendar cadence.
pub fn units_between(unit: StreakUnit, last: DateTime<Utc>, now: DateTime<Utc>) -> Option<i64> {
    match unit {
        StreakUnit::Days => Some((now.date_naive() - last.date_naive()).num_days()),
        StreakUnit::Weeks => Some((start_of_week(now) - start_of_week(last)).num_days() / 7),
        StreakUnit::Items | StreakUnit::Transactions => None,
    }
}

/// Start and end of the period a newly generated quest covers.
///
/// Daily quests run until the next midnight, weekly quests until the next
/// Monday, special quests for `special_days` from `now`.
pub fn quest_period(
    quest_type: QuestType,
    now: DateTime<Utc>,
    special_days: i64,
) -> (DateTime<Utc>, DateTime<Utc>) {
    match quest_type {
        QuestType::Daily => {
            let start = start_of_day(now);
            (start, start + Duration::days(1))
        }
        QuestType::Weekly => {
            let start = start_of_week(now);
            (start, start + Duration::days(7))
        }
        QuestType::Special => (now, now + Duration::days(special_days.max(1))),
    }
}

/// Ordinal used to rotate template selection between periods.
pub fn period_ordinal(quest_type: QuestType, now: DateTime<Utc>) -> u64 {
    let days = now.date_naive().num_days_from_ce().max(0) as u64;
    match quest_type {
        QuestType::Daily | QuestType::Special => days,
        QuestType::Weekly => days / 7,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn test_day_bucket() {
        assert_eq!(day_bucket(at(2023, 12, 28, 12)), "2023-12-28");
        assert_eq!(day_bucket(at(2024, 1, 5, 0)), "2024-01-05");
    }

    #[test]
    fn test_week_starts_on_monday() {
        // 2024-03-07 is a Thursday
        let thursday = at(2024, 3, 7, 15);
        assert_eq!(start_of_week(thursday), at(2024, 3, 4, 0));
        // Monday maps to itself
        assert_eq!(start_of_week(at(2024, 3, 4, 23)), at(2024, 3, 4, 0));
    }

    #[test]
    fn test_units_between_days_ignores_time_of_day() {
        let late = at(2024, 3, 1, 23);
        let early_next = at(2024, 3, 2, 1);
        assert_eq!(units_between(StreakUnit::Days, late, early_next), Some(1));
        assert_eq!(units_between(StreakUnit::Days, late, late), Some(0));
    }

    #[test]
    fn test_units_between_weeks() {
        let sunday = at(2024, 3, 10, 12);
        let monday = at(2024, 3, 11, 8);
        assert_eq!(units_between(StreakUnit::Weeks, sunday, monday), Some(1));
        assert_eq!(
            units_between(StreakUnit::Weeks, at(2024, 3, 4, 0), sunday),
            Some(0)
        );
        assert_eq!(units_between(StreakUnit::Items, sunday, monday), None);
    }

    #[test]
    fn test_quest_period_bounds() {
        let now = at(2024, 3, 7, 15);
        let (start, end) = quest_period(QuestType::Daily, now, 14);
        assert_eq!((start, end), (at(2024, 3, 7, 0), at(2024, 3, 8, 0)));

        let (start, end) = quest_period(QuestType::Weekly, now, 14);
        assert_eq!((start, end), (at(2024, 3, 4, 0), at(2024, 3, 11, 0)));

        let (start, end) = quest_period(QuestType::Special, now, 14);
        assert_eq!(end - start, Duration::days(14));
    }
}
