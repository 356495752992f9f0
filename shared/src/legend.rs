use serde::{Deserialize, Serialize};

use crate::colors::color_scale;

pub const LEGEND_STEPS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub ratio: f64,
    pub color: String,
    pub label: String,
}

/// Swatches at ratio 0.0, 0.1, ..., 1.0 labelled with the activity value they
/// stand for.
pub fn build_legend(denominator: f64) -> Vec<LegendEntry> {
    (0..=LEGEND_STEPS)
        .map(|step| {
            let ratio = f64::from(step) / f64::from(LEGEND_STEPS);
            LegendEntry {
                ratio,
                color: color_scale(ratio),
                label: format!("{:.2}", ratio * denominator),
            }
        })
        .collect()
}
