pub mod colors;
pub mod dataset;
pub mod day_index;
pub mod error;
pub mod events;
pub mod feature;
pub mod legend;
pub mod normalize;
pub mod overlay;
pub mod playback;
pub mod record;
pub mod sink;

pub use dataset::{Dataset, DatasetOptions};
pub use day_index::DayIndex;
pub use error::{DatasetError, PlaybackError};
pub use events::*;
pub use feature::{BoundingBox, FeatureCollection, ScaleProperties, ScaledFeature};
pub use normalize::{DenominatorStrategy, Normalizer};
pub use playback::{Frame, PlaybackController, PlaybackState, Transition};
pub use record::{ActivityRecord, RawRow, RowPolicy};
pub use sink::MapSink;
