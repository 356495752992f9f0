use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::Dataset;
use crate::day_index::{DayIndex, date_label};
use crate::error::PlaybackError;
use crate::feature::{FeatureCollection, ScaleProperties};
use crate::overlay::HighlightDays;
use crate::sink::{MapSink, OVERLAY_LAYERS, RESULT_SOURCE};

/// `day_pointer` only ever grows; lookups take it modulo the day count, so a
/// long session never needs to reset it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub paused: bool,
    pub day_pointer: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateMarker {
    pub day: String,
    pub label: String,
    pub live: bool,
}

/// The row of date labels shown above the map; at most one is live.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateStrip {
    markers: Vec<DateMarker>,
}

impl DateStrip {
    pub fn from_index(index: &DayIndex) -> Self {
        Self {
            markers: index
                .days()
                .iter()
                .map(|day| DateMarker {
                    day: day.clone(),
                    label: date_label(day).to_owned(),
                    live: false,
                })
                .collect(),
        }
    }

    /// Marks the marker for `day` live and clears the rest. Labels may repeat
    /// across years, so markers are matched on the full day.
    pub fn mark_live(&mut self, day: &str) {
        for marker in &mut self.markers {
            marker.live = marker.day == day;
        }
    }

    pub fn live(&self) -> Option<&DateMarker> {
        self.markers.iter().find(|marker| marker.live)
    }

    pub fn markers(&self) -> &[DateMarker] {
        &self.markers
    }
}

/// What one tick put on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub day: String,
    pub label: String,
    pub day_pointer: u64,
    pub overlay_visible: bool,
    pub features: FeatureCollection<ScaleProperties>,
    pub emitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Paused,
    Resumed(Frame),
}

/// Pausable day-by-day playback over a dataset.
///
/// The controller never sleeps; whoever owns it calls [`tick`](Self::tick)
/// once per interval and reacts to the [`Transition`] from
/// [`toggle_pause`](Self::toggle_pause).
pub struct PlaybackController<S> {
    dataset: Arc<Dataset>,
    highlight: HighlightDays,
    sink: S,
    state: PlaybackState,
    strip: DateStrip,
}

impl<S: MapSink> PlaybackController<S> {
    pub fn new(dataset: Arc<Dataset>, highlight: HighlightDays, sink: S) -> Self {
        let strip = DateStrip::from_index(dataset.day_index());
        Self {
            dataset,
            highlight,
            sink,
            state: PlaybackState::default(),
            strip,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn date_strip(&self) -> &DateStrip {
        &self.strip
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    /// Fit the viewport and show the first day. The sink must be ready.
    pub fn start(&mut self) -> Result<Frame, PlaybackError> {
        if !self.sink.is_ready() {
            return Err(PlaybackError::SinkNotReady);
        }
        if let Some(bbox) = self.dataset.bounds() {
            self.sink.fit_bounds(bbox);
        }
        self.advance()
    }

    /// Show the current day and move the pointer on. Does nothing while paused.
    pub fn tick(&mut self) -> Result<Option<Frame>, PlaybackError> {
        if self.state.paused {
            return Ok(None);
        }
        self.advance().map(Some)
    }

    /// Pausing freezes the pointer. Resuming shows the next day immediately.
    pub fn toggle_pause(&mut self) -> Result<Transition, PlaybackError> {
        if !self.state.paused {
            self.state.paused = true;
            debug!(day_pointer = self.state.day_pointer, "playback paused");
            return Ok(Transition::Paused);
        }

        self.state.paused = false;
        debug!(day_pointer = self.state.day_pointer, "playback resumed");
        self.advance().map(Transition::Resumed)
    }

    fn advance(&mut self) -> Result<Frame, PlaybackError> {
        let pointer = self.state.day_pointer;
        let day = self.dataset.day_index().day_at(pointer).to_owned();
        let features = self.dataset.features().filter_date(&day);

        // The data push goes last: a rejected overlay update leaves the
        // previous day on screen, matching the unmoved pointer and strip.
        let overlay_visible = self.highlight.contains(&day);
        for layer in OVERLAY_LAYERS {
            self.sink.set_layer_visibility(layer, overlay_visible)?;
        }

        self.sink.set_data(RESULT_SOURCE, features.clone())?;
        self.strip.mark_live(&day);

        debug!(
            day = %day,
            day_pointer = pointer,
            features = features.len(),
            overlay_visible,
            "frame pushed"
        );

        self.state.day_pointer += 1;
        Ok(Frame {
            label: date_label(&day).to_owned(),
            day,
            day_pointer: pointer,
            overlay_visible,
            features,
            emitted_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetOptions;
    use crate::sink::{RESULT_SOURCE, RecordingSink};

    const SAMPLE: &str = "\
bounds,day,sum_activity_index_quadkey,xlat,xlon
\"0,0,1,1\",2021-01-05T00:00,50,,
\"1,1,2,2\",2021-01-06T00:00,100,,
";

    fn dataset() -> Arc<Dataset> {
        Arc::new(
            Dataset::from_reader(SAMPLE.as_bytes(), DatasetOptions::default())
                .expect("sample builds"),
        )
    }

    fn controller() -> PlaybackController<RecordingSink> {
        PlaybackController::new(
            dataset(),
            HighlightDays::new(["2021-01-06"]),
            RecordingSink::ready(),
        )
    }

    fn displayed_days(sink: &RecordingSink) -> Vec<String> {
        sink.source(RESULT_SOURCE)
            .map(|fc| fc.features.iter().map(|f| f.date().to_owned()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn ticks_walk_days_and_wrap() {
        let mut playback = controller();
        let first = playback.start().expect("start");
        assert_eq!(first.day, "2021-01-05");
        assert_eq!(displayed_days(playback.sink()), vec!["2021-01-05"]);
        assert_eq!(
            playback.sink().source(RESULT_SOURCE).unwrap().features[0].geometry.coordinates[0][0],
            [0.0, 0.0]
        );

        let second = playback.tick().expect("tick").expect("running");
        assert_eq!(second.day, "2021-01-06");
        assert_eq!(second.day_pointer, 1);
        assert_eq!(displayed_days(playback.sink()), vec!["2021-01-06"]);

        let third = playback.tick().expect("tick").expect("running");
        assert_eq!(third.day, "2021-01-05");
        assert_eq!(third.day_pointer, 2);
        assert_eq!(playback.state().day_pointer, 3);
    }

    #[test]
    fn start_fits_viewport_to_dataset() {
        let mut playback = controller();
        playback.start().expect("start");
        assert_eq!(
            playback.sink().viewport.map(|b| b.corners()),
            Some([[0.0, 0.0], [2.0, 2.0]])
        );
    }

    #[test]
    fn overlay_and_date_strip_follow_current_day() {
        let mut playback = controller();

        let frame = playback.start().expect("start");
        assert!(!frame.overlay_visible);
        for layer in OVERLAY_LAYERS {
            assert!(!playback.sink().is_visible(layer));
        }
        assert_eq!(
            playback.date_strip().live().map(|m| m.label.as_str()),
            Some("01-05")
        );

        let frame = playback.tick().expect("tick").expect("running");
        assert!(frame.overlay_visible);
        assert_eq!(frame.label, "01-06");
        for layer in OVERLAY_LAYERS {
            assert!(playback.sink().is_visible(layer));
        }
        let live: Vec<_> = playback
            .date_strip()
            .markers()
            .iter()
            .filter(|m| m.live)
            .map(|m| m.day.as_str())
            .collect();
        assert_eq!(live, vec!["2021-01-06"]);
    }

    #[test]
    fn pause_freezes_pointer_and_display() {
        let mut playback = controller();
        playback.start().expect("start");

        assert_eq!(playback.toggle_pause().expect("pause"), Transition::Paused);
        let pushes = playback.sink().pushes;
        for _ in 0..5 {
            assert_eq!(playback.tick().expect("tick"), None);
        }
        assert_eq!(playback.state().day_pointer, 1);
        assert_eq!(playback.sink().pushes, pushes);
        assert_eq!(displayed_days(playback.sink()), vec!["2021-01-05"]);
    }

    #[test]
    fn resume_advances_exactly_one_day() {
        let mut playback = controller();
        playback.start().expect("start");
        playback.toggle_pause().expect("pause");

        let Transition::Resumed(frame) = playback.toggle_pause().expect("resume") else {
            panic!("expected resume");
        };
        assert_eq!(frame.day, "2021-01-06");
        assert!(!playback.is_paused());
        assert_eq!(playback.state().day_pointer, 2);
    }

    #[test]
    fn start_requires_ready_sink() {
        let mut playback = PlaybackController::new(
            dataset(),
            HighlightDays::default(),
            RecordingSink::default(),
        );
        assert_eq!(playback.start().unwrap_err(), PlaybackError::SinkNotReady);
        assert_eq!(playback.state().day_pointer, 0);
    }

    #[test]
    fn sink_rejection_fails_tick_without_advancing() {
        let mut playback = controller();
        playback.start().expect("start");
        playback.sink_mut().reject_with = Some("style not loaded".to_string());

        let err = playback.tick().unwrap_err();
        assert_eq!(
            err,
            PlaybackError::SinkRejected {
                target: RESULT_SOURCE.to_string(),
                reason: "style not loaded".to_string(),
            }
        );
        assert_eq!(playback.state().day_pointer, 1);
    }

    #[test]
    fn rejected_overlay_update_keeps_previous_day_on_screen() {
        let mut playback = controller();
        playback.start().expect("start");
        playback.sink_mut().reject_layers_with = Some("layer missing".to_string());

        let err = playback.tick().unwrap_err();
        assert!(matches!(err, PlaybackError::SinkRejected { .. }));
        assert_eq!(playback.state().day_pointer, 1);
        assert_eq!(displayed_days(playback.sink()), vec!["2021-01-05"]);
        assert_eq!(
            playback.date_strip().live().map(|m| m.day.as_str()),
            Some("2021-01-05")
        );
    }

    #[test]
    fn live_marker_tracks_full_day_across_years() {
        let data = Arc::new(
            Dataset::from_reader(
                "\
bounds,day,sum_activity_index_quadkey,xlat,xlon
\"0,0,1,1\",2020-01-05,5,,
\"0,0,1,1\",2021-01-05,7,,
"
                .as_bytes(),
                DatasetOptions::default(),
            )
            .expect("builds"),
        );
        let mut playback =
            PlaybackController::new(data, HighlightDays::default(), RecordingSink::ready());

        playback.start().expect("start");
        let frame = playback.tick().expect("tick").expect("running");
        assert_eq!(frame.day, "2021-01-05");

        let live: Vec<_> = playback
            .date_strip()
            .markers()
            .iter()
            .filter(|m| m.live)
            .map(|m| m.day.as_str())
            .collect();
        assert_eq!(live, vec!["2021-01-05"]);
        assert_eq!(
            playback.date_strip().live().map(|m| m.day.as_str()),
            Some("2021-01-05")
        );
    }

    #[test]
    fn per_day_frames_partition_all_features() {
        let data = Arc::new(
            Dataset::from_reader(
                "\
bounds,day,sum_activity_index_quadkey,xlat,xlon
\"0,0,1,1\",2021-01-06T00:00,5,,
\"0,0,1,1\",2021-01-05T00:00,7,,
\"0,0,1,1\",2021-01-06T00:00,9,,
\"2,2,3,3\",2021-01-07,1,,
"
                .as_bytes(),
                DatasetOptions::default(),
            )
            .expect("builds"),
        );
        let mut playback =
            PlaybackController::new(Arc::clone(&data), HighlightDays::default(), RecordingSink::ready());

        let mut seen = 0;
        let mut frame = playback.start().expect("start");
        for _ in 0..data.day_index().len() {
            assert!(frame.features.features.iter().all(|f| f.date() == frame.day));
            seen += frame.features.len();
            frame = playback.tick().expect("tick").expect("running");
        }
        assert_eq!(seen, data.features().len());
    }
}
