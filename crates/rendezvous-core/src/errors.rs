//! Error types shared across the workspace.

use thiserror::Error;

/// Why an inbound client frame could not be used.
///
/// Never reported to the client; the frame is simply dropped.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The text was not valid JSON.
    #[error("invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),
    /// Valid JSON, but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,
}
