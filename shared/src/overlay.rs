use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::feature::{Feature, FeatureCollection, Polygon, Position};

const EARTH_RADIUS_M: f64 = 6_371_008.8;
pub const CIRCLE_STEPS: usize = 64;
pub const DEFAULT_CALLOUT_RADIUS_M: f64 = 750.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Callout {
    pub title: String,
    /// `[lon, lat]`
    pub center: Position,
    pub radius_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalloutProperties {
    pub title: String,
}

pub fn default_callouts() -> Vec<Callout> {
    vec![
        Callout {
            title: "Save America Rally".to_string(),
            center: [-77.0365458726883, 38.891863716028645],
            radius_m: DEFAULT_CALLOUT_RADIUS_M,
        },
        Callout {
            title: "US Capitol".to_string(),
            center: [-77.01251864433289, 38.889788561664936],
            radius_m: DEFAULT_CALLOUT_RADIUS_M,
        },
    ]
}

/// Closed ring approximating a circle on the sphere. Accurate to well under a
/// meter at city scale, which is all the callouts need.
pub fn circle_ring([lon, lat]: Position, radius_m: f64, steps: usize) -> Vec<Position> {
    let steps = steps.max(3);
    let angular = (radius_m / EARTH_RADIUS_M).to_degrees();
    let lon_scale = lat.to_radians().cos().max(f64::EPSILON);

    let mut ring: Vec<Position> = (0..steps)
        .map(|i| {
            let theta = std::f64::consts::TAU * i as f64 / steps as f64;
            [
                lon + angular * theta.sin() / lon_scale,
                lat + angular * theta.cos(),
            ]
        })
        .collect();
    ring.push(ring[0]);
    ring
}

pub fn callout_collection(callouts: &[Callout]) -> FeatureCollection<CalloutProperties> {
    FeatureCollection::new(
        callouts
            .iter()
            .map(|callout| Feature {
                properties: CalloutProperties {
                    title: callout.title.clone(),
                },
                geometry: Polygon::from_ring(circle_ring(
                    callout.center,
                    callout.radius_m,
                    CIRCLE_STEPS,
                )),
            })
            .collect(),
    )
}

/// Days on which the overlay layers are shown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlightDays(BTreeSet<String>);

impl HighlightDays {
    pub fn new<I, S>(days: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(days.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, day: &str) -> bool {
        self.0.contains(day)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn distance_m(a: Position, b: Position) -> f64 {
        let (lat1, lat2) = (a[1].to_radians(), b[1].to_radians());
        let dlat = lat2 - lat1;
        let dlon = (b[0] - a[0]).to_radians();
        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * h.sqrt().asin()
    }

    #[test]
    fn circle_ring_is_closed_with_expected_point_count() {
        let ring = circle_ring([-77.0, 38.9], 750.0, 16);
        assert_eq!(ring.len(), 17);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn circle_ring_points_sit_near_radius() {
        let center = [-77.01251864433289, 38.889788561664936];
        for point in circle_ring(center, 750.0, CIRCLE_STEPS) {
            let d = distance_m(center, point);
            assert!((d - 750.0).abs() < 2.0, "point {point:?} is {d} m away");
        }
    }

    #[test]
    fn callout_collection_carries_titles() {
        let collection = callout_collection(&default_callouts());
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.features[0].properties.title, "Save America Rally");
        assert_eq!(collection.features[1].properties.title, "US Capitol");

        let value = serde_json::to_value(&collection).expect("serialize");
        assert_eq!(value["features"][1]["properties"]["title"], "US Capitol");
    }

    #[test]
    fn highlight_days_membership() {
        let days = HighlightDays::new(["2021-01-06", "2021-01-05"]);
        assert!(days.contains("2021-01-05"));
        assert!(!days.contains("2021-01-08"));
        assert_eq!(days.iter().collect::<Vec<_>>(), vec!["2021-01-05", "2021-01-06"]);
    }
}
