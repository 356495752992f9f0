use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::state::{AppState, ObservabilitySnapshot};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";
const STATIC_CACHE_CONTROL: &str = "public, max-age=3600";
const MAX_DAY_LEN: usize = 32;

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = state.live_frame.read().await.status.clone();
    let observability = state.observability.snapshot();
    let dataset = &state.dataset;
    Json(serde_json::json!({
        "status": "ok",
        "records": dataset.records().len(),
        "skipped_rows": dataset.skipped_rows(),
        "days": dataset.day_index().len(),
        "features": dataset.features().len(),
        "denominator": dataset.denominator(),
        "sink_ready": *state.sink_ready.borrow(),
        "playback": status,
        "observability": {
            "ticks_total": observability.ticks_total,
            "sink_failures_total": observability.sink_failures_total,
            "pauses_total": observability.pauses_total,
            "resumes_total": observability.resumes_total,
            "frame_requests_total": observability.frame_requests_total,
        }
    }))
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.live_frame.read().await.status.clone();
    let body = render_prometheus_metrics(
        state.dataset.day_index().len(),
        status.paused,
        status.day_pointer,
        state.event_tx.receiver_count(),
        state.observability.snapshot(),
    );

    (
        [
            (header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-store"),
        ],
        body,
    )
}

fn render_prometheus_metrics(
    day_count: usize,
    paused: bool,
    day_pointer: u64,
    subscribers: usize,
    observability: ObservabilitySnapshot,
) -> String {
    let mut body = String::new();
    let mut metric = |name: &str, kind: &str, help: &str, value: u64| {
        let _ = writeln!(body, "# HELP timelapse_{name} {help}");
        let _ = writeln!(body, "# TYPE timelapse_{name} {kind}");
        let _ = writeln!(body, "timelapse_{name} {value}");
    };

    metric(
        "days",
        "gauge",
        "Number of distinct days in the dataset.",
        day_count as u64,
    );
    metric(
        "paused",
        "gauge",
        "Whether playback is paused (1 or 0).",
        u64::from(paused),
    );
    metric(
        "day_pointer",
        "gauge",
        "Playback tick counter; the shown day is this modulo the day count.",
        day_pointer,
    );
    metric(
        "sse_subscribers",
        "gauge",
        "Connected event-stream clients.",
        subscribers as u64,
    );
    metric(
        "ticks_total",
        "counter",
        "Frames pushed to the map sink.",
        observability.ticks_total,
    );
    metric(
        "sink_failures_total",
        "counter",
        "Frames the map sink rejected.",
        observability.sink_failures_total,
    );
    metric(
        "pauses_total",
        "counter",
        "Pause transitions.",
        observability.pauses_total,
    );
    metric(
        "resumes_total",
        "counter",
        "Resume transitions.",
        observability.resumes_total,
    );
    metric(
        "frame_requests_total",
        "counter",
        "Total /api/frame requests.",
        observability.frame_requests_total,
    );

    body
}

pub async fn get_days(State(state): State<AppState>, headers: HeaderMap) -> Response {
    static_payload(&state, &headers, "days", &state.payloads.days_json)
}

pub async fn get_legend(State(state): State<AppState>, headers: HeaderMap) -> Response {
    static_payload(&state, &headers, "legend", &state.payloads.legend_json)
}

pub async fn get_overlay(State(state): State<AppState>, headers: HeaderMap) -> Response {
    static_payload(&state, &headers, "overlay", &state.payloads.overlay_json)
}

pub async fn get_layers(State(state): State<AppState>, headers: HeaderMap) -> Response {
    static_payload(&state, &headers, "layers", &state.payloads.layers_json)
}

pub async fn get_day_features(
    State(state): State<AppState>,
    Path(day): Path<String>,
) -> Result<Response, StatusCode> {
    if day.is_empty() || day.len() > MAX_DAY_LEN {
        return Err(StatusCode::BAD_REQUEST);
    }
    let features = state
        .dataset
        .features_for(&day)
        .ok_or(StatusCode::NOT_FOUND)?;
    let json = serde_json::to_vec(&features).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(json_bytes_response(
        Bytes::from(json),
        STATIC_CACHE_CONTROL,
        None,
    ))
}

pub async fn get_frame(State(state): State<AppState>) -> Result<Response, StatusCode> {
    state.observability.record_frame_request();
    let json = {
        let live = state.live_frame.read().await;
        if live.view.is_none() {
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
        Arc::clone(&live.view_json)
    };
    Ok(json_bytes_response((*json).clone(), "no-store", None))
}

fn static_payload(state: &AppState, headers: &HeaderMap, name: &str, json: &Arc<Bytes>) -> Response {
    let etag = format!("\"{name}-{}\"", state.payloads.etag_suffix);
    if if_none_match_matches(headers, &etag) {
        return not_modified_response(STATIC_CACHE_CONTROL, Some(etag.as_str()));
    }
    json_bytes_response((**json).clone(), STATIC_CACHE_CONTROL, Some(etag.as_str()))
}

fn json_bytes_response(body: Bytes, cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}
