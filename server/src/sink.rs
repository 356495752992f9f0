use std::collections::BTreeMap;

use timelapse_shared::sink::{OVERLAY_LAYERS, RESULT_LAYER, RESULT_SOURCE};
use timelapse_shared::{BoundingBox, FeatureCollection, MapSink, PlaybackError, ScaleProperties};
use tokio::sync::watch;

/// Server-side stand-in for the browser map: validates source and layer
/// names, tracks visibility and viewport, and only accepts pushes once the
/// HTTP surface is up.
#[derive(Debug)]
pub struct BroadcastSink {
    ready: watch::Receiver<bool>,
    data: Option<FeatureCollection<ScaleProperties>>,
    layers: BTreeMap<String, bool>,
    viewport: Option<BoundingBox>,
}

impl BroadcastSink {
    pub fn new(ready: watch::Receiver<bool>) -> Self {
        let layers = std::iter::once(RESULT_LAYER)
            .chain(OVERLAY_LAYERS)
            .map(|layer| (layer.to_string(), layer == RESULT_LAYER))
            .collect();
        Self {
            ready,
            data: None,
            layers,
            viewport: None,
        }
    }

    pub fn layers(&self) -> &BTreeMap<String, bool> {
        &self.layers
    }

    pub fn viewport(&self) -> Option<BoundingBox> {
        self.viewport
    }

    pub fn feature_count(&self) -> usize {
        self.data.as_ref().map_or(0, FeatureCollection::len)
    }
}

impl MapSink for BroadcastSink {
    fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    fn set_data(
        &mut self,
        source: &str,
        data: FeatureCollection<ScaleProperties>,
    ) -> Result<(), PlaybackError> {
        if !self.is_ready() {
            return Err(PlaybackError::SinkNotReady);
        }
        if source != RESULT_SOURCE {
            return Err(PlaybackError::SinkRejected {
                target: source.to_string(),
                reason: "unknown source".to_string(),
            });
        }
        self.data = Some(data);
        Ok(())
    }

    fn set_layer_visibility(&mut self, layer: &str, visible: bool) -> Result<(), PlaybackError> {
        if !self.is_ready() {
            return Err(PlaybackError::SinkNotReady);
        }
        let Some(slot) = self.layers.get_mut(layer) else {
            return Err(PlaybackError::SinkRejected {
                target: layer.to_string(),
                reason: "unknown layer".to_string(),
            });
        };
        *slot = visible;
        Ok(())
    }

    fn fit_bounds(&mut self, bbox: BoundingBox) {
        self.viewport = Some(bbox);
    }
}
