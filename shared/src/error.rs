use thiserror::Error;

/// Failures while turning raw rows into the session dataset.
///
/// Row numbers are 1-based data rows (the header is not counted).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DatasetError {
    #[error("row {row}: malformed bounds {value:?} (expected \"west, south, east, north\")")]
    MalformedBounds { row: usize, value: String },

    #[error("row {row}: invalid activity value {value:?}")]
    InvalidActivity { row: usize, value: String },

    #[error("dataset contains no records")]
    EmptyDataset,

    #[error("day index cannot be built from zero records")]
    EmptyIndex,

    #[error("csv error at line {line}: {message}")]
    Csv { line: u64, message: String },

    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
}

impl From<csv::Error> for DatasetError {
    fn from(err: csv::Error) -> Self {
        let line = err.position().map(|pos| pos.line()).unwrap_or(0);
        DatasetError::Csv {
            line,
            message: err.to_string(),
        }
    }
}

/// Failures while pushing a frame to the map sink.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("map sink is not ready")]
    SinkNotReady,

    #[error("map sink rejected update for {target}: {reason}")]
    SinkRejected { target: String, reason: String },
}
