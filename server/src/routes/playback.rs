use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use timelapse_shared::PlaybackStatus;
use tokio::sync::oneshot;
use tracing::warn;

use crate::config::COMMAND_TIMEOUT_SECS;
use crate::state::{AppState, CommandReply, PlaybackCommand};

pub async fn toggle(State(state): State<AppState>) -> Result<Json<PlaybackStatus>, StatusCode> {
    send_command(&state, |reply| PlaybackCommand::TogglePause { reply }).await
}

pub async fn status(State(state): State<AppState>) -> Result<Json<PlaybackStatus>, StatusCode> {
    send_command(&state, |reply| PlaybackCommand::Status { reply }).await
}

/// Round-trip a command through the driver. A missing driver means playback
/// has stopped for this session; a slow one means it has not started yet.
async fn send_command(
    state: &AppState,
    command: impl FnOnce(CommandReply) -> PlaybackCommand,
) -> Result<Json<PlaybackStatus>, StatusCode> {
    let (reply, rx) = oneshot::channel();
    state
        .control_tx
        .send(command(reply))
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    match tokio::time::timeout(Duration::from_secs(COMMAND_TIMEOUT_SECS), rx).await {
        Ok(Ok(Ok(status))) => Ok(Json(status)),
        Ok(Ok(Err(e))) => {
            warn!(error = %e, "playback command failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Ok(Err(_)) | Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}
