//! Fatal error kinds surfaced by the reader.

use crate::sample::SampleField;
use std::path::PathBuf;
use thiserror::Error;

/// The error kinds callers can tell apart with `downcast_ref::<DatasetError>()`.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("frame decode failed for video '{vid_id}' frame {frame_number}: {reason}")]
    FrameDecode {
        vid_id: String,
        frame_number: usize,
        reason: String,
    },
    #[error("dataset configuration unavailable at '{}': {reason}", path.display())]
    ConfigUnavailable { path: PathBuf, reason: String },
    #[error(
        "inconsistent sample shape in field '{field}' of sample {sample}: expect {expected:?}, but get {found:?}"
    )]
    InconsistentShape {
        field: SampleField,
        sample: usize,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("malformed annotation for clip '{clip}': {reason}")]
    MalformedClip { clip: String, reason: String },
}
