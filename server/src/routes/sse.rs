use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use bytes::Bytes;
use futures::stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

use crate::config::SSE_KEEPALIVE_SECS;
use crate::state::{AppState, PreSerializedEvent};

/// Streams the current frame on connect, then every frame and playback
/// transition the driver publishes.
pub async fn playback_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        // Subscribe before reading the snapshot so no frame falls in between.
        let rx = state.event_tx.subscribe();

        let (seq, data) = current_frame(&state).await;
        if let Some(event) = frame_event(seq, &data) {
            yield Ok(event);
        }

        let mut stream = BroadcastStream::new(rx);
        while let Some(result) = stream.next().await {
            match result {
                Ok(event) => {
                    let (event_type, seq, data) = match event {
                        PreSerializedEvent::Frame { seq, json } => ("frame", seq, json),
                        PreSerializedEvent::Playback { seq, json } => ("playback", seq, json),
                    };
                    let Some(payload) = event_payload(&data) else {
                        warn!(seq, event = event_type, "event payload is not valid utf-8; dropping SSE event");
                        continue;
                    };
                    yield Ok(
                        Event::default()
                            .id(seq.to_string())
                            .event(event_type)
                            .data(payload),
                    );
                }
                Err(tokio_stream::wrappers::errors::BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(
                        skipped_events = skipped,
                        "SSE client lagged behind broadcast buffer; replaying current frame"
                    );
                    let (seq, data) = current_frame(&state).await;
                    if let Some(event) = frame_event(seq, &data) {
                        yield Ok(event);
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEPALIVE_SECS))
            .text("keep-alive"),
    )
}

async fn current_frame(state: &AppState) -> (u64, std::sync::Arc<Bytes>) {
    let live = state.live_frame.read().await;
    (live.seq, live.event_json.clone())
}

fn frame_event(seq: u64, data: &Bytes) -> Option<Event> {
    if data.is_empty() {
        return None;
    }
    let Some(payload) = event_payload(data) else {
        warn!(seq, "frame payload is not valid utf-8; skipping SSE frame");
        return None;
    };
    Some(
        Event::default()
            .id(seq.to_string())
            .event("frame")
            .data(payload),
    )
}

fn event_payload(bytes: &Bytes) -> Option<&str> {
    std::str::from_utf8(bytes).ok()
}
