use chrono::{DateTime, Utc};

use crate::models::ActivityState;

/// Applies one qualifying activity (lesson completion, quiz or assignment
/// submission, login) to a student's activity state.
///
/// Day granularity is the UTC calendar date. Gap-aware rule: a second activity
/// on the same day changes nothing, activity on the day after the last one
/// extends the streak, and any longer gap (or a first-ever activity) restarts
/// it at 1.
///
/// Returns `None` when the student was already active today and there is
/// nothing to persist. The caller owns persistence.
pub fn apply_activity_streak(state: &ActivityState, now: DateTime<Utc>) -> Option<ActivityState> {
    let today = now.date_naive();
    let last_active = state.last_active_date.map(|instant| instant.date_naive());

    match last_active {
        Some(day) if day == today => None,
        Some(day) if (today - day).num_days() == 1 => Some(ActivityState {
            learning_streak: state.learning_streak + 1,
            last_active_date: Some(now),
        }),
        _ => Some(ActivityState {
            learning_streak: 1,
            last_active_date: Some(now),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn state(streak: i32, last_active: Option<DateTime<Utc>>) -> ActivityState {
        ActivityState {
            learning_streak: streak,
            last_active_date: last_active,
        }
    }

    fn noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn first_activity_starts_streak_at_one() {
        let now = noon(2026, 3, 10);
        let updated = apply_activity_streak(&state(0, None), now).unwrap();
        assert_eq!(updated.learning_streak, 1);
        assert_eq!(updated.last_active_date, Some(now));
    }

    #[test]
    fn same_day_activity_is_a_no_op() {
        let morning = Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2026, 3, 10, 21, 30, 0).unwrap();

        let first = apply_activity_streak(&state(0, None), morning).unwrap();
        assert_eq!(apply_activity_streak(&first, evening), None);
    }

    #[test]
    fn next_day_activity_extends_streak() {
        let yesterday = noon(2026, 3, 9);
        let now = noon(2026, 3, 10);

        let updated = apply_activity_streak(&state(6, Some(yesterday)), now).unwrap();
        assert_eq!(updated.learning_streak, 7);
        assert_eq!(updated.last_active_date, Some(now));
    }

    #[test]
    fn day_boundary_counts_as_next_day() {
        let late = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2026, 3, 10, 0, 1, 0).unwrap();

        let updated = apply_activity_streak(&state(2, Some(late)), early).unwrap();
        assert_eq!(updated.learning_streak, 3);
    }

    #[test]
    fn gap_resets_streak_to_one() {
        let now = noon(2026, 3, 10);
        let two_days_ago = now - Duration::days(2);

        let updated = apply_activity_streak(&state(12, Some(two_days_ago)), now).unwrap();
        assert_eq!(updated.learning_streak, 1);
    }

    #[test]
    fn long_gap_also_resets() {
        let now = noon(2026, 3, 10);
        let last_month = now - Duration::days(30);

        let updated = apply_activity_streak(&state(40, Some(last_month)), now).unwrap();
        assert_eq!(updated.learning_streak, 1);
    }
}
