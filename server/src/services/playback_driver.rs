use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use timelapse_shared::overlay::HighlightDays;
use timelapse_shared::{
    Frame, PlaybackController, PlaybackError, PlaybackEvent, PlaybackStatus, Transition,
};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::sink::BroadcastSink;
use crate::state::{AppState, FrameView, PlaybackCommand, PreSerializedEvent};

type Controller = PlaybackController<BroadcastSink>;

/// Owns the playback controller for the whole session.
///
/// Exactly one timer is pending while running and none while paused: pausing
/// disarms the timer rather than letting a stale tick fire later.
pub async fn run(
    state: AppState,
    mut commands: mpsc::Receiver<PlaybackCommand>,
    highlight: HighlightDays,
    interval: Duration,
) {
    let mut ready = state.sink_ready.subscribe();
    if ready.wait_for(|is_ready| *is_ready).await.is_err() {
        warn!("sink readiness channel closed before the sink became ready; playback not started");
        return;
    }

    let mut controller =
        PlaybackController::new(Arc::clone(&state.dataset), highlight, BroadcastSink::new(ready));

    match controller.start() {
        Ok(frame) => publish_frame(&state, &controller, frame).await,
        Err(e) => {
            fail(&state, &e);
            return;
        }
    }
    info!(
        interval_ms = interval.as_millis() as u64,
        days = state.dataset.day_index().len(),
        "playback started"
    );

    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);
    let mut armed = true;

    loop {
        tokio::select! {
            () = &mut sleep, if armed => {
                match controller.tick() {
                    Ok(Some(frame)) => {
                        publish_frame(&state, &controller, frame).await;
                        sleep.as_mut().reset(Instant::now() + interval);
                    }
                    Ok(None) => armed = false,
                    Err(e) => {
                        fail(&state, &e);
                        return;
                    }
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    info!("playback control channel closed; stopping playback");
                    return;
                };
                match command {
                    PlaybackCommand::Status { reply } => {
                        let _ = reply.send(Ok(status_of(&controller)));
                    }
                    PlaybackCommand::TogglePause { reply } => match controller.toggle_pause() {
                        Ok(Transition::Paused) => {
                            armed = false;
                            state.observability.record_pause();
                            publish_status(&state, &controller).await;
                            let _ = reply.send(Ok(status_of(&controller)));
                        }
                        Ok(Transition::Resumed(frame)) => {
                            state.observability.record_resume();
                            publish_frame(&state, &controller, frame).await;
                            publish_status(&state, &controller).await;
                            sleep.as_mut().reset(Instant::now() + interval);
                            armed = true;
                            let _ = reply.send(Ok(status_of(&controller)));
                        }
                        Err(e) => {
                            let _ = reply.send(Err(e.to_string()));
                            fail(&state, &e);
                            return;
                        }
                    },
                }
            }
        }
    }
}

fn fail(state: &AppState, err: &PlaybackError) {
    state.observability.record_sink_failure();
    error!(error = %err, "playback stopped");
}

fn status_of(controller: &Controller) -> PlaybackStatus {
    let playback = controller.state();
    PlaybackStatus {
        paused: playback.paused,
        day_pointer: playback.day_pointer,
        current_day: controller
            .date_strip()
            .live()
            .map(|marker| marker.day.clone()),
    }
}

async fn publish_frame(state: &AppState, controller: &Controller, frame: Frame) {
    state.observability.record_tick();
    let seq = state.next_seq();
    debug!(
        seq,
        day = %frame.day,
        features = controller.sink().feature_count(),
        overlay = frame.overlay_visible,
        "frame pushed to map sink"
    );

    let view = FrameView {
        frame,
        layers: controller.sink().layers().clone(),
        viewport: controller.sink().viewport(),
    };
    let view_json = match serde_json::to_vec(&view) {
        Ok(json) => Arc::new(Bytes::from(json)),
        Err(e) => {
            warn!(error = %e, "failed to serialize frame view");
            return;
        }
    };
    let event = PlaybackEvent::Frame {
        seq,
        frame: view.frame.clone(),
    };
    let event_json = match serde_json::to_vec(&event) {
        Ok(json) => Arc::new(Bytes::from(json)),
        Err(e) => {
            warn!(error = %e, "failed to serialize frame event");
            return;
        }
    };

    {
        let mut live = state.live_frame.write().await;
        live.seq = seq;
        live.status = status_of(controller);
        live.view = Some(view);
        live.view_json = view_json;
        live.event_json = Arc::clone(&event_json);
    }

    // No subscribers is not an error.
    let _ = state.event_tx.send(PreSerializedEvent::Frame {
        seq,
        json: event_json,
    });
}

async fn publish_status(state: &AppState, controller: &Controller) {
    let status = status_of(controller);
    let seq = state.next_seq();
    let event = PlaybackEvent::Playback {
        seq,
        paused: status.paused,
        day_pointer: status.day_pointer,
        timestamp: Utc::now().to_rfc3339(),
    };

    state.live_frame.write().await.status = status;

    match serde_json::to_vec(&event) {
        Ok(json) => {
            let _ = state.event_tx.send(PreSerializedEvent::Playback {
                seq,
                json: Arc::new(Bytes::from(json)),
            });
        }
        Err(e) => warn!(error = %e, "failed to serialize playback event"),
    }
}
