use std::collections::BTreeSet;

use super::{DeletionSet, KeptSet};

/// Live indices not covered by the kept set, by exact name.
pub fn diff(live: &BTreeSet<String>, kept: &KeptSet) -> DeletionSet {
    live.iter()
        .filter(|name| !kept.contains(name))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use chrono::NaiveDate;

    use super::*;
    use crate::retention::compute_kept_set;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn kept(names: &[&str]) -> KeptSet {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_live_yields_empty() {
        assert!(diff(&BTreeSet::new(), &kept(&["logs-2024.01.01"])).is_empty());
    }

    #[test]
    fn test_live_subset_of_kept_yields_empty() {
        let live = set(&["logs-2024.01.01"]);
        let kept = kept(&["logs-2024.01.01", "logs-2023.12.31"]);
        assert!(diff(&live, &kept).is_empty());
    }

    #[test]
    fn test_scenario_two_day_window() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let kept = compute_kept_set("app", NonZeroU32::new(2).unwrap(), today);
        let live = set(&["app-2024.01.01", "app-2024.01.02", "app-2023.12.20"]);

        let deletion = diff(&live, &kept);
        assert_eq!(deletion.to_vec(), vec!["app-2023.12.20"]);
    }

    #[test]
    fn test_unexpected_names_are_ordinary_members() {
        let live = set(&["app-current", "app-2024.01.02", "app-backup-old"]);
        let kept = kept(&["app-2024.01.02"]);
        let deletion = diff(&live, &kept);
        assert_eq!(deletion.to_vec(), vec!["app-backup-old", "app-current"]);
    }

    #[test]
    fn test_never_intersects_kept_and_never_invents() {
        let live = set(&["a-1", "a-2", "a-3", "b-1"]);
        let kept = kept(&["a-2", "b-1", "c-9"]);
        let deletion = diff(&live, &kept);

        for name in deletion.iter() {
            assert!(!kept.contains(name));
            assert!(live.contains(name));
        }
        assert_eq!(deletion.len(), 2);
    }
}
