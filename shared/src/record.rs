use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DatasetError;

/// One untyped row of the input table, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRow {
    pub bounds: String,
    pub day: String,
    pub sum_activity_index_quadkey: String,
    #[serde(default)]
    pub xlat: String,
    #[serde(default)]
    pub xlon: String,
}

/// A parsed tile: bounds as `[west, south, east, north]`, the calendar day and
/// its activity sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub bounds: [f64; 4],
    pub day: String,
    pub activity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

/// What to do with a row that fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RowPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseOutcome {
    pub records: Vec<ActivityRecord>,
    pub skipped: usize,
}

/// Read header-keyed CSV rows. Column order is irrelevant and unknown
/// columns are ignored.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<RawRow>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize::<RawRow>() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn parse_row(row_number: usize, raw: &RawRow) -> Result<ActivityRecord, DatasetError> {
    let bounds = parse_bounds(&raw.bounds).ok_or_else(|| DatasetError::MalformedBounds {
        row: row_number,
        value: raw.bounds.clone(),
    })?;

    let activity = raw
        .sum_activity_index_quadkey
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value >= 0.0)
        .ok_or_else(|| DatasetError::InvalidActivity {
            row: row_number,
            value: raw.sum_activity_index_quadkey.clone(),
        })?;

    Ok(ActivityRecord {
        bounds,
        day: date_part(&raw.day).to_string(),
        activity,
        lat: parse_coordinate(&raw.xlat),
        lon: parse_coordinate(&raw.xlon),
    })
}

/// Parse every row in order. Duplicate (bounds, day) pairs are kept.
pub fn parse_rows(rows: &[RawRow], policy: RowPolicy) -> Result<ParseOutcome, DatasetError> {
    let mut outcome = ParseOutcome {
        records: Vec::with_capacity(rows.len()),
        skipped: 0,
    };

    for (index, raw) in rows.iter().enumerate() {
        match parse_row(index + 1, raw) {
            Ok(record) => outcome.records.push(record),
            Err(e) if policy == RowPolicy::Skip => {
                warn!(error = %e, "skipping unparseable row");
                outcome.skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(outcome)
}

/// `"w, s, e, n"` → `[w, s, e, n]`. Pieces are comma separated with optional
/// whitespace; the box must be non-degenerate.
fn parse_bounds(raw: &str) -> Option<[f64; 4]> {
    let mut values = [0.0; 4];
    let mut count = 0usize;
    for piece in raw.split(',') {
        if count == 4 {
            return None;
        }
        let value = piece.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
        values[count] = value;
        count += 1;
    }
    if count != 4 {
        return None;
    }

    let [west, south, east, north] = values;
    (west < east && south < north).then_some(values)
}

fn date_part(day: &str) -> &str {
    day.split_once('T').map_or(day, |(date, _)| date)
}

fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
