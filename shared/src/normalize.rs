use serde::{Deserialize, Serialize};

use crate::colors::color_scale;
use crate::error::DatasetError;
use crate::record::ActivityRecord;

pub const RATIO_FLOOR: f64 = 0.1;
pub const RATIO_CEILING: f64 = 1.0;
pub const DEFAULT_QUANTILE: f64 = 0.98;

/// How the session-wide denominator is picked from the activity distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "q", rename_all = "snake_case")]
pub enum DenominatorStrategy {
    Quantile(f64),
    Max,
}

impl Default for DenominatorStrategy {
    fn default() -> Self {
        DenominatorStrategy::Quantile(DEFAULT_QUANTILE)
    }
}

/// Linear-interpolated quantile of an ascending slice.
///
/// `q` is clamped to `[0, 1]`; returns `None` for an empty slice.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let h = q * (n - 1) as f64;
    let lower = h.floor() as usize;
    let upper = (lower + 1).min(n - 1);
    let frac = h - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Single normalization scale computed once for the whole session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    denominator: f64,
}

impl Normalizer {
    pub fn new(denominator: f64) -> Self {
        Self { denominator }
    }

    pub fn from_records(
        records: &[ActivityRecord],
        strategy: DenominatorStrategy,
    ) -> Result<Self, DatasetError> {
        let mut values: Vec<f64> = records.iter().map(|r| r.activity).collect();
        values.sort_by(f64::total_cmp);

        let denominator = match strategy {
            DenominatorStrategy::Quantile(q) => quantile(&values, q),
            DenominatorStrategy::Max => values.last().copied(),
        }
        .ok_or(DatasetError::EmptyDataset)?;

        Ok(Self { denominator })
    }

    pub fn denominator(&self) -> f64 {
        self.denominator
    }

    /// `activity / denominator` clamped to `[0.1, 1.0]`. With a zero
    /// denominator any positive activity saturates and idle cells sit at the
    /// floor.
    pub fn ratio(&self, activity: f64) -> f64 {
        if self.denominator <= 0.0 {
            return if activity > 0.0 {
                RATIO_CEILING
            } else {
                RATIO_FLOOR
            };
        }
        let raw = activity / self.denominator;
        if raw.is_nan() {
            return RATIO_FLOOR;
        }
        raw.clamp(RATIO_FLOOR, RATIO_CEILING)
    }

    pub fn color(&self, ratio: f64) -> String {
        color_scale(ratio)
    }
}
