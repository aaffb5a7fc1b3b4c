//! Error types for the plate reading pipeline.
//!
//! Only malformed external input ends up here. A crop with no valid reading
//! is `None` and a plate outside every vehicle carries the `-1` sentinel;
//! neither is an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Malformed bounding box: {0:?}")]
    MalformedBBox(String),

    #[error("Row {row}: missing or invalid field `{field}`")]
    MissingField { row: usize, field: &'static str },

    #[error("Frame {frame} arrived after frame {previous}")]
    FrameOutOfOrder { frame: u64, previous: u64 },

    #[error("Frame {0} is missing from the video")]
    MissingFrame(u64),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[cfg(feature = "vision")]
    #[error("OpenCV error: {0}")]
    OpenCv(#[from] opencv::Error),

    #[cfg(feature = "vision")]
    #[error("Tesseract error: {0}")]
    Tesseract(String),
}

pub type Result<T> = std::result::Result<T, Error>;
