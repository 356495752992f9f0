use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use serde::Serialize;
use timelapse_shared::overlay::{callout_collection, default_callouts};
use timelapse_shared::playback::DateStrip;
use timelapse_shared::sink::layer_descriptors;
use timelapse_shared::{BoundingBox, Dataset, DayList, Frame, LegendPayload, PlaybackStatus};
use tokio::sync::{RwLock, broadcast, mpsc, oneshot, watch};

use crate::config::{CONTROL_CHANNEL_CAPACITY, sse_broadcast_buffer};

/// Pre-serialized SSE event, serialized once by the driver and shared by all
/// subscribers.
#[derive(Debug, Clone)]
pub enum PreSerializedEvent {
    Frame { seq: u64, json: Arc<Bytes> },
    Playback { seq: u64, json: Arc<Bytes> },
}

/// What the map currently shows, as served by `/api/frame`.
#[derive(Debug, Clone, Serialize)]
pub struct FrameView {
    pub frame: Frame,
    pub layers: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewport: Option<BoundingBox>,
}

#[derive(Debug, Clone)]
pub struct LiveFrame {
    pub seq: u64,
    pub status: PlaybackStatus,
    pub view: Option<FrameView>,
    pub view_json: Arc<Bytes>,
    /// Last frame as an SSE `frame` event, replayed to new subscribers.
    pub event_json: Arc<Bytes>,
}

impl Default for LiveFrame {
    fn default() -> Self {
        Self {
            seq: 0,
            status: PlaybackStatus {
                paused: false,
                day_pointer: 0,
                current_day: None,
            },
            view: None,
            view_json: Arc::new(Bytes::new()),
            event_json: Arc::new(Bytes::new()),
        }
    }
}

pub type CommandReply = oneshot::Sender<Result<PlaybackStatus, String>>;

#[derive(Debug)]
pub enum PlaybackCommand {
    TogglePause { reply: CommandReply },
    Status { reply: CommandReply },
}

/// Payloads derived from the dataset alone; serialized once at startup.
#[derive(Debug, Clone)]
pub struct StaticPayloads {
    pub etag_suffix: String,
    pub days_json: Arc<Bytes>,
    pub legend_json: Arc<Bytes>,
    pub overlay_json: Arc<Bytes>,
    pub layers_json: Arc<Bytes>,
}

impl StaticPayloads {
    fn build(dataset: &Dataset) -> Result<Self, serde_json::Error> {
        let days = DayList {
            count: dataset.day_index().len(),
            days: DateStrip::from_index(dataset.day_index()).markers().to_vec(),
        };
        let legend = LegendPayload {
            denominator: dataset.denominator(),
            entries: dataset.legend().to_vec(),
        };
        let to_bytes = |bytes: Vec<u8>| Arc::new(Bytes::from(bytes));

        Ok(Self {
            etag_suffix: format!("{:08x}", dataset.fingerprint()),
            days_json: to_bytes(serde_json::to_vec(&days)?),
            legend_json: to_bytes(serde_json::to_vec(&legend)?),
            overlay_json: to_bytes(serde_json::to_vec(&callout_collection(
                &default_callouts(),
            ))?),
            layers_json: to_bytes(serde_json::to_vec(&layer_descriptors())?),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub payloads: Arc<StaticPayloads>,
    pub live_frame: Arc<RwLock<LiveFrame>>,
    pub next_seq: Arc<AtomicU64>,
    pub event_tx: broadcast::Sender<PreSerializedEvent>,
    pub control_tx: mpsc::Sender<PlaybackCommand>,
    /// Flipped to `true` once clients can reach the sink; the driver waits on it.
    pub sink_ready: watch::Sender<bool>,
    pub observability: Arc<ObservabilityCounters>,
}

#[derive(Debug, Default)]
pub struct ObservabilityCounters {
    ticks_total: AtomicU64,
    sink_failures_total: AtomicU64,
    pauses_total: AtomicU64,
    resumes_total: AtomicU64,
    frame_requests_total: AtomicU64,
}

#[derive(Debug, Clone, Copy)]
pub struct ObservabilitySnapshot {
    pub ticks_total: u64,
    pub sink_failures_total: u64,
    pub pauses_total: u64,
    pub resumes_total: u64,
    pub frame_requests_total: u64,
}

impl ObservabilityCounters {
    pub fn snapshot(&self) -> ObservabilitySnapshot {
        ObservabilitySnapshot {
            ticks_total: self.ticks_total.load(Ordering::Relaxed),
            sink_failures_total: self.sink_failures_total.load(Ordering::Relaxed),
            pauses_total: self.pauses_total.load(Ordering::Relaxed),
            resumes_total: self.resumes_total.load(Ordering::Relaxed),
            frame_requests_total: self.frame_requests_total.load(Ordering::Relaxed),
        }
    }

    pub fn record_tick(&self) {
        self.ticks_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sink_failure(&self) {
        self.sink_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pause(&self) {
        self.pauses_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resume(&self) {
        self.resumes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_request(&self) {
        self.frame_requests_total.fetch_add(1, Ordering::Relaxed);
    }
}

impl AppState {
    /// The returned receiver belongs to the playback driver.
    pub fn new(
        dataset: Arc<Dataset>,
    ) -> Result<(Self, mpsc::Receiver<PlaybackCommand>), serde_json::Error> {
        let payloads = StaticPayloads::build(&dataset)?;
        let (event_tx, _) = broadcast::channel(sse_broadcast_buffer());
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_CAPACITY);
        let (sink_ready, _) = watch::channel(false);

        let state = Self {
            dataset,
            payloads: Arc::new(payloads),
            live_frame: Arc::new(RwLock::new(LiveFrame::default())),
            next_seq: Arc::new(AtomicU64::new(0)),
            event_tx,
            control_tx,
            sink_ready,
            observability: Arc::new(ObservabilityCounters::default()),
        };
        Ok((state, control_rx))
    }

    pub fn mark_sink_ready(&self) {
        self.sink_ready.send_replace(true);
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}
