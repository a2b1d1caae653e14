//! Index retention configuration.
//!
//! Each `clean_indices` entry names a time-partitioned index prefix and the
//! number of daily indices to keep.
//!
//! # Example
//!
//! ```toml
//! check_interval = 86400
//! dry_run = false
//! timezone = "utc"
//!
//! [[clean_indices]]
//! index = "logs"
//! time_series = 7
//!
//! [[clean_indices]]
//! index = "audit"
//! time_series = 365
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single retention entry as written in the configuration file.
///
/// Converted into a validated [`crate::retention::RetentionRule`] at load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanIndexEntry {
    /// Index name prefix. Daily indices are named `<index>-YYYY.MM.DD`.
    pub index: String,

    /// Number of daily indices to keep, including today's.
    pub time_series: u32,
}

/// Which clock decides the current day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBasis {
    /// The host's local time zone.
    #[default]
    Local,
    /// Coordinated Universal Time, matching ingest pipelines that name
    /// indices by UTC date.
    Utc,
}

impl DateBasis {
    /// The current calendar day on this clock.
    pub fn today(&self) -> NaiveDate {
        match self {
            DateBasis::Local => chrono::Local::now().date_naive(),
            DateBasis::Utc => chrono::Utc::now().date_naive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry() {
        let entry: CleanIndexEntry = toml::from_str(
            r#"
            index = "logs"
            time_series = 14
        "#,
        )
        .unwrap();
        assert_eq!(entry.index, "logs");
        assert_eq!(entry.time_series, 14);
    }

    #[test]
    fn test_entry_requires_both_fields() {
        let result: Result<CleanIndexEntry, _> = toml::from_str(r#"index = "logs""#);
        assert!(result.is_err());
    }

    #[test]
    fn test_date_basis_parse() {
        #[derive(Deserialize)]
        struct Wrapper {
            timezone: DateBasis,
        }

        let w: Wrapper = toml::from_str(r#"timezone = "utc""#).unwrap();
        assert_eq!(w.timezone, DateBasis::Utc);
        let w: Wrapper = toml::from_str(r#"timezone = "local""#).unwrap();
        assert_eq!(w.timezone, DateBasis::Local);
        assert!(toml::from_str::<Wrapper>(r#"timezone = "mars""#).is_err());
    }

    #[test]
    fn test_utc_today_matches_chrono() {
        let before = chrono::Utc::now().date_naive();
        let today = DateBasis::Utc.today();
        let after = chrono::Utc::now().date_naive();
        assert!(today == before || today == after);
    }
}
