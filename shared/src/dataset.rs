use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::info;

use crate::day_index::DayIndex;
use crate::error::DatasetError;
use crate::feature::{BoundingBox, FeatureCollection, ScaleProperties, ScaledFeature};
use crate::legend::{LegendEntry, build_legend};
use crate::normalize::{DenominatorStrategy, Normalizer};
use crate::record::{ActivityRecord, RawRow, RowPolicy, parse_rows, read_csv};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DatasetOptions {
    pub denominator: DenominatorStrategy,
    pub row_policy: RowPolicy,
}

/// Everything derived from the input table, built once per session and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Vec<ActivityRecord>,
    normalizer: Normalizer,
    features: FeatureCollection<ScaleProperties>,
    day_index: DayIndex,
    legend: Vec<LegendEntry>,
    bounds: Option<BoundingBox>,
    skipped_rows: usize,
    fingerprint: u32,
}

impl Dataset {
    pub fn load(path: &Path, options: DatasetOptions) -> Result<Self, DatasetError> {
        let file = File::open(path).map_err(|e| DatasetError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_reader(BufReader::new(file), options)
    }

    pub fn from_reader<R: Read>(reader: R, options: DatasetOptions) -> Result<Self, DatasetError> {
        let rows = read_csv(reader)?;
        Self::from_rows(&rows, options)
    }

    pub fn from_rows(rows: &[RawRow], options: DatasetOptions) -> Result<Self, DatasetError> {
        let outcome = parse_rows(rows, options.row_policy)?;
        let mut dataset = Self::from_records(outcome.records, options.denominator)?;
        dataset.skipped_rows = outcome.skipped;
        Ok(dataset)
    }

    pub fn from_records(
        records: Vec<ActivityRecord>,
        strategy: DenominatorStrategy,
    ) -> Result<Self, DatasetError> {
        let normalizer = Normalizer::from_records(&records, strategy)?;
        let day_index = DayIndex::from_records(&records)?;
        let features = FeatureCollection::new(
            records
                .iter()
                .map(|record| ScaledFeature::build(record, &normalizer))
                .collect(),
        );
        let bounds = features.envelope();
        let legend = build_legend(normalizer.denominator());
        let fingerprint = fingerprint(&records);

        info!(
            records = records.len(),
            days = day_index.len(),
            denominator = normalizer.denominator(),
            "dataset built"
        );

        Ok(Self {
            records,
            normalizer,
            features,
            day_index,
            legend,
            bounds,
            skipped_rows: 0,
            fingerprint,
        })
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn denominator(&self) -> f64 {
        self.normalizer.denominator()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn features(&self) -> &FeatureCollection<ScaleProperties> {
        &self.features
    }

    pub fn day_index(&self) -> &DayIndex {
        &self.day_index
    }

    pub fn legend(&self) -> &[LegendEntry] {
        &self.legend
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    /// CRC32 over record content; stable for identical input.
    pub fn fingerprint(&self) -> u32 {
        self.fingerprint
    }

    /// Features for an indexed day, `None` for days outside the index.
    pub fn features_for(&self, day: &str) -> Option<FeatureCollection<ScaleProperties>> {
        self.day_index
            .contains(day)
            .then(|| self.features.filter_date(day))
    }
}

fn fingerprint(records: &[ActivityRecord]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    for record in records {
        for value in record.bounds {
            hasher.update(&value.to_bits().to_le_bytes());
        }
        hasher.update(record.day.as_bytes());
        hasher.update(&record.activity.to_bits().to_le_bytes());
    }
    hasher.finalize()
}
