use std::collections::BTreeSet;

use crate::error::DatasetError;
use crate::record::ActivityRecord;

/// Sorted unique days of the dataset. ISO dates sort chronologically as
/// plain strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayIndex {
    days: Vec<String>,
}

impl DayIndex {
    pub fn from_records(records: &[ActivityRecord]) -> Result<Self, DatasetError> {
        Self::from_days(records.iter().map(|r| r.day.as_str()))
    }

    pub fn from_days<'a>(days: impl IntoIterator<Item = &'a str>) -> Result<Self, DatasetError> {
        let unique: BTreeSet<&str> = days.into_iter().collect();
        if unique.is_empty() {
            return Err(DatasetError::EmptyIndex);
        }
        Ok(Self {
            days: unique.into_iter().map(str::to_owned).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn days(&self) -> &[String] {
        &self.days
    }

    /// Any pointer is valid; lookup wraps modulo the day count.
    pub fn day_at(&self, pointer: u64) -> &str {
        let slot = (pointer % self.days.len() as u64) as usize;
        &self.days[slot]
    }

    pub fn position(&self, day: &str) -> Option<usize> {
        self.days
            .binary_search_by(|candidate| candidate.as_str().cmp(day))
            .ok()
    }

    pub fn contains(&self, day: &str) -> bool {
        self.position(day).is_some()
    }

    /// Date-strip labels (`MM-DD`), one per day in index order.
    pub fn labels(&self) -> Vec<String> {
        self.days.iter().map(|day| date_label(day).to_owned()).collect()
    }
}

/// `2021-01-05` → `01-05`. Days without a year prefix are returned as-is.
pub fn date_label(day: &str) -> &str {
    day.get(5..).filter(|_| day.len() == 10).unwrap_or(day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn days_are_sorted_and_unique() {
        let index = DayIndex::from_days([
            "2021-01-07",
            "2021-01-05",
            "2021-01-06",
            "2021-01-05",
            "2020-12-31",
        ])
        .expect("non-empty");

        assert_eq!(
            index.days(),
            &["2020-12-31", "2021-01-05", "2021-01-06", "2021-01-07"]
        );
        assert!(index.days().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn day_at_wraps_modulo_length() {
        let index = DayIndex::from_days(["2021-01-05", "2021-01-06", "2021-01-07"])
            .expect("non-empty");
        let len = index.len() as u64;
        for pointer in 0..len {
            for k in [1u64, 2, 17, 1_000_000] {
                assert_eq!(index.day_at(pointer), index.day_at(pointer + k * len));
            }
        }
        assert_eq!(index.day_at(3), "2021-01-05");
        assert_eq!(index.day_at(u64::MAX), index.day_at(u64::MAX % len));
    }

    #[test]
    fn empty_index_is_rejected() {
        assert_eq!(DayIndex::from_days([]).unwrap_err(), DatasetError::EmptyIndex);
        assert_eq!(
            DayIndex::from_records(&[]).unwrap_err(),
            DatasetError::EmptyIndex
        );
    }

    #[test]
    fn position_finds_indexed_days() {
        let index = DayIndex::from_days(["2021-01-06", "2021-01-05"]).expect("non-empty");
        assert_eq!(index.position("2021-01-05"), Some(0));
        assert_eq!(index.position("2021-01-06"), Some(1));
        assert!(!index.contains("2021-01-07"));
    }

    #[test]
    fn labels_drop_year_prefix() {
        let index = DayIndex::from_days(["2021-01-06", "2021-01-05"]).expect("non-empty");
        assert_eq!(index.labels(), vec!["01-05", "01-06"]);
        assert_eq!(date_label("week-1"), "week-1");
    }
}
