use serde::{Deserialize, Serialize};

use crate::normalize::Normalizer;
use crate::record::ActivityRecord;

pub type Position = [f64; 2];

/// GeoJSON polygon with a single closed exterior ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Polygon")]
pub struct Polygon {
    pub coordinates: Vec<Vec<Position>>,
}

impl Polygon {
    /// Ring order: west-south, east-south, east-north, west-north, west-south.
    pub fn from_bounds([west, south, east, north]: [f64; 4]) -> Self {
        Self {
            coordinates: vec![vec![
                [west, south],
                [east, south],
                [east, north],
                [west, north],
                [west, south],
            ]],
        }
    }

    pub fn from_ring(ring: Vec<Position>) -> Self {
        Self {
            coordinates: vec![ring],
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.coordinates.iter().flatten()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// `[[west, south], [east, north]]`, the shape map viewports take.
    pub fn corners(&self) -> [Position; 2] {
        [[self.west, self.south], [self.east, self.north]]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleProperties {
    pub date: String,
    pub ratio: f64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct Feature<P> {
    pub properties: P,
    pub geometry: Polygon,
}

pub type ScaledFeature = Feature<ScaleProperties>;

impl ScaledFeature {
    pub fn build(record: &ActivityRecord, normalizer: &Normalizer) -> Self {
        let ratio = normalizer.ratio(record.activity);
        Self {
            properties: ScaleProperties {
                date: record.day.clone(),
                ratio,
                color: normalizer.color(ratio),
            },
            geometry: Polygon::from_bounds(record.bounds),
        }
    }

    pub fn date(&self) -> &str {
        &self.properties.date
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection<P> {
    pub features: Vec<Feature<P>>,
}

impl<P> FeatureCollection<P> {
    pub fn new(features: Vec<Feature<P>>) -> Self {
        Self { features }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Smallest box containing every ring coordinate.
    pub fn envelope(&self) -> Option<BoundingBox> {
        let mut positions = self.features.iter().flat_map(|f| f.geometry.positions());
        let first = positions.next()?;
        let init = BoundingBox {
            west: first[0],
            south: first[1],
            east: first[0],
            north: first[1],
        };
        Some(positions.fold(init, |bbox, [x, y]| BoundingBox {
            west: bbox.west.min(*x),
            south: bbox.south.min(*y),
            east: bbox.east.max(*x),
            north: bbox.north.max(*y),
        }))
    }
}

impl FeatureCollection<ScaleProperties> {
    /// Transient subset whose `date` equals `day` exactly.
    pub fn filter_date(&self, day: &str) -> Self {
        Self {
            features: self
                .features
                .iter()
                .filter(|feature| feature.date() == day)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bounds: [f64; 4], day: &str, activity: f64) -> ActivityRecord {
        ActivityRecord {
            bounds,
            day: day.to_string(),
            activity,
            lat: None,
            lon: None,
        }
    }

    #[test]
    fn polygon_ring_is_closed_and_counter_clockwise() {
        let polygon = Polygon::from_bounds([1.0, 2.0, 3.0, 4.0]);
        let ring = &polygon.coordinates[0];
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.first(), ring.last());
        assert_eq!(
            ring.as_slice(),
            &[[1.0, 2.0], [3.0, 2.0], [3.0, 4.0], [1.0, 4.0], [1.0, 2.0]]
        );
    }

    #[test]
    fn built_feature_keeps_record_day() {
        let normalizer = Normalizer::new(100.0);
        let rec = record([0.0, 0.0, 1.0, 1.0], "2021-01-07", 40.0);
        let feature = ScaledFeature::build(&rec, &normalizer);
        assert_eq!(feature.date(), rec.day);
        assert_eq!(feature.properties.ratio, 0.4);
        assert_eq!(feature.properties.color, normalizer.color(0.4));
    }

    #[test]
    fn serializes_as_geojson() {
        let normalizer = Normalizer::new(10.0);
        let collection = FeatureCollection::new(vec![ScaledFeature::build(
            &record([0.0, 0.0, 1.0, 1.0], "2021-01-05", 10.0),
            &normalizer,
        )]);
        let value = serde_json::to_value(&collection).expect("serialize");

        assert_eq!(value["type"], "FeatureCollection");
        let feature = &value["features"][0];
        assert_eq!(feature["type"], "Feature");
        assert_eq!(feature["geometry"]["type"], "Polygon");
        assert_eq!(feature["geometry"]["coordinates"][0][2][0], 1.0);
        assert_eq!(feature["properties"]["date"], "2021-01-05");
        assert_eq!(feature["properties"]["ratio"], 1.0);
        assert_eq!(feature["properties"]["color"], "#fde725");

        let back: FeatureCollection<ScaleProperties> =
            serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, collection);
    }

    #[test]
    fn filter_by_day_partitions_collection() {
        let normalizer = Normalizer::new(10.0);
        let days = ["2021-01-05", "2021-01-06", "2021-01-05", "2021-01-07"];
        let collection = FeatureCollection::new(
            days.iter()
                .enumerate()
                .map(|(i, day)| {
                    let offset = i as f64;
                    ScaledFeature::build(
                        &record([offset, 0.0, offset + 1.0, 1.0], day, offset),
                        &normalizer,
                    )
                })
                .collect(),
        );

        let mut unique: Vec<&str> = days.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let mut total = 0;
        for day in &unique {
            let subset = collection.filter_date(day);
            assert!(subset.features.iter().all(|f| f.date() == *day));
            total += subset.len();
        }
        assert_eq!(total, collection.len());
        assert_eq!(collection.filter_date("2021-01-05").len(), 2);
        assert!(collection.filter_date("2021-01-08").is_empty());
    }

    #[test]
    fn envelope_spans_all_features() {
        let normalizer = Normalizer::new(10.0);
        let collection = FeatureCollection::new(vec![
            ScaledFeature::build(&record([-77.1, 38.8, -77.0, 38.9], "d", 1.0), &normalizer),
            ScaledFeature::build(&record([-77.3, 38.7, -77.2, 38.75], "d", 1.0), &normalizer),
        ]);
        let bbox = collection.envelope().expect("non-empty");
        assert_eq!(bbox.corners(), [[-77.3, 38.7], [-77.0, 38.9]]);

        let empty: FeatureCollection<ScaleProperties> = FeatureCollection::new(Vec::new());
        assert_eq!(empty.envelope(), None);
    }
}
