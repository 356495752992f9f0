use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PlaybackError;
use crate::feature::{BoundingBox, FeatureCollection, ScaleProperties};

pub const RESULT_SOURCE: &str = "resultSource";
pub const RESULT_LAYER: &str = "resultLayer";
pub const OVERLAY_SOURCE: &str = "redCircles";
pub const OVERLAY_LAYERS: [&str; 2] = ["redCircles", "redCirclesLabel"];
pub const RESULT_FILL_OPACITY: f64 = 0.8;

/// Rendering surface the playback controller drives.
///
/// Data pushes replace the whole source; nothing is merged.
pub trait MapSink {
    fn is_ready(&self) -> bool;

    fn set_data(
        &mut self,
        source: &str,
        data: FeatureCollection<ScaleProperties>,
    ) -> Result<(), PlaybackError>;

    fn set_layer_visibility(&mut self, layer: &str, visible: bool) -> Result<(), PlaybackError>;

    fn fit_bounds(&mut self, bbox: BoundingBox);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Fill,
    Line,
    Symbol,
}

/// Source/layer pair the map has to create before the first push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    pub id: String,
    pub kind: LayerKind,
    pub source: String,
    /// Feature property that carries the paint value, when data driven.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    pub toggled_by_day: bool,
}

pub fn layer_descriptors() -> Vec<LayerDescriptor> {
    vec![
        LayerDescriptor {
            id: RESULT_LAYER.to_string(),
            kind: LayerKind::Fill,
            source: RESULT_SOURCE.to_string(),
            property: Some("color".to_string()),
            opacity: Some(RESULT_FILL_OPACITY),
            toggled_by_day: false,
        },
        LayerDescriptor {
            id: OVERLAY_LAYERS[0].to_string(),
            kind: LayerKind::Line,
            source: OVERLAY_SOURCE.to_string(),
            property: None,
            opacity: Some(1.0),
            toggled_by_day: true,
        },
        LayerDescriptor {
            id: OVERLAY_LAYERS[1].to_string(),
            kind: LayerKind::Symbol,
            source: OVERLAY_SOURCE.to_string(),
            property: Some("title".to_string()),
            opacity: None,
            toggled_by_day: true,
        },
    ]
}

/// In-memory sink that keeps the last state it was given.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub ready: bool,
    pub sources: HashMap<String, FeatureCollection<ScaleProperties>>,
    pub visibility: HashMap<String, bool>,
    pub viewport: Option<BoundingBox>,
    pub pushes: usize,
    /// Reject every `set_data` call with this reason.
    pub reject_with: Option<String>,
    /// Reject every `set_layer_visibility` call with this reason.
    pub reject_layers_with: Option<String>,
}

impl RecordingSink {
    pub fn ready() -> Self {
        Self {
            ready: true,
            ..Self::default()
        }
    }

    pub fn source(&self, name: &str) -> Option<&FeatureCollection<ScaleProperties>> {
        self.sources.get(name)
    }

    pub fn is_visible(&self, layer: &str) -> bool {
        self.visibility.get(layer).copied().unwrap_or(false)
    }
}

impl MapSink for RecordingSink {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set_data(
        &mut self,
        source: &str,
        data: FeatureCollection<ScaleProperties>,
    ) -> Result<(), PlaybackError> {
        if !self.ready {
            return Err(PlaybackError::SinkNotReady);
        }
        if let Some(reason) = &self.reject_with {
            return Err(PlaybackError::SinkRejected {
                target: source.to_string(),
                reason: reason.clone(),
            });
        }
        self.sources.insert(source.to_string(), data);
        self.pushes += 1;
        Ok(())
    }

    fn set_layer_visibility(&mut self, layer: &str, visible: bool) -> Result<(), PlaybackError> {
        if !self.ready {
            return Err(PlaybackError::SinkNotReady);
        }
        if let Some(reason) = &self.reject_layers_with {
            return Err(PlaybackError::SinkRejected {
                target: layer.to_string(),
                reason: reason.clone(),
            });
        }
        self.visibility.insert(layer.to_string(), visible);
        Ok(())
    }

    fn fit_bounds(&mut self, bbox: BoundingBox) {
        self.viewport = Some(bbox);
    }
}
