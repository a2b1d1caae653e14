use std::num::NonZeroU32;

use chrono::{Days, NaiveDate};

use super::KeptSet;

/// Date suffix appended to daily index names.
const INDEX_DATE_FORMAT: &str = "%Y.%m.%d";

/// Names of the daily indices to keep: `today` and the `retain_days - 1`
/// calendar days before it.
pub fn compute_kept_set(prefix: &str, retain_days: NonZeroU32, today: NaiveDate) -> KeptSet {
    (0..u64::from(retain_days.get()))
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .map(|day| index_name(prefix, day))
        .collect()
}

fn index_name(prefix: &str, day: NaiveDate) -> String {
    format!("{prefix}-{}", day.format(INDEX_DATE_FORMAT))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn names(set: &KeptSet) -> Vec<&str> {
        set.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_single_day_keeps_only_today() {
        let kept = compute_kept_set("logs", days(1), date(2024, 6, 15));
        assert_eq!(names(&kept), vec!["logs-2024.06.15"]);
    }

    #[test]
    fn test_crosses_year_boundary() {
        let kept = compute_kept_set("logs", days(3), date(2024, 1, 1));
        assert_eq!(
            names(&kept),
            vec!["logs-2023.12.30", "logs-2023.12.31", "logs-2024.01.01"]
        );
    }

    #[rstest]
    #[case::month_boundary(date(2024, 3, 1), 2, &["idx-2024.02.29", "idx-2024.03.01"])]
    #[case::non_leap_february(date(2023, 3, 1), 2, &["idx-2023.02.28", "idx-2023.03.01"])]
    #[case::thirty_day_month(date(2024, 5, 1), 2, &["idx-2024.04.30", "idx-2024.05.01"])]
    #[case::pads_single_digits(date(2024, 9, 9), 1, &["idx-2024.09.09"])]
    fn test_calendar_boundaries(
        #[case] today: NaiveDate,
        #[case] retain: u32,
        #[case] expected: &[&str],
    ) {
        let kept = compute_kept_set("idx", days(retain), today);
        assert_eq!(names(&kept), expected);
    }

    #[test]
    fn test_size_and_today_for_many_windows() {
        let start = date(2023, 12, 25);
        for offset in 0..20 {
            let today = start.checked_add_days(Days::new(offset)).unwrap();
            for retain in 1..=400 {
                let kept = compute_kept_set("app", days(retain), today);
                assert_eq!(kept.len(), retain as usize, "{today} keep {retain}");
                assert!(kept.contains(&index_name("app", today)));
            }
        }
    }

    #[test]
    fn test_no_future_dates_and_no_gaps() {
        let today = date(2024, 1, 2);
        let kept = compute_kept_set("app", days(10), today);
        for offset in 0..10 {
            let day = today.checked_sub_days(Days::new(offset)).unwrap();
            assert!(kept.contains(&index_name("app", day)));
        }
        let tomorrow = today.succ_opt().unwrap();
        assert!(!kept.contains(&index_name("app", tomorrow)));
    }

    #[test]
    fn test_prefix_with_dashes() {
        let kept = compute_kept_set("filebeat-7.17.0", days(1), date(2024, 1, 2));
        assert!(kept.contains("filebeat-7.17.0-2024.01.02"));
    }
}
