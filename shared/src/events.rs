use serde::{Deserialize, Serialize};

use crate::legend::LegendEntry;
use crate::playback::{DateMarker, Frame};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlaybackEvent {
    Frame {
        #[serde(default)]
        seq: u64,
        frame: Frame,
    },
    Playback {
        #[serde(default)]
        seq: u64,
        paused: bool,
        day_pointer: u64,
        timestamp: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStatus {
    pub paused: bool,
    pub day_pointer: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_day: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayList {
    pub count: usize,
    pub days: Vec<DateMarker>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegendPayload {
    pub denominator: f64,
    pub entries: Vec<LegendEntry>,
}
