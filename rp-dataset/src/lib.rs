//! Sample indexing and on-demand rendering for the robot-push trajectory corpus.
//!
//! The crate turns a trajectory annotation store and a frame-image store into a flat,
//! reproducible enumeration of training samples, and renders each requested sample into
//! aligned image, feature-map and mask arrays.
//!
//! Construction is split into two phases. [RpReader](reader::RpReader) holds the pure
//! index state and is cheap to clone across worker replicas.
//! [ActiveReader](reader::ActiveReader) is obtained per worker by
//! [RpReader::activate](reader::RpReader::activate) and exclusively owns a frame-store
//! handle.

mod common;

pub mod affinity;
pub mod annotation;
pub mod border;
pub mod codec;
pub mod collate;
pub mod config;
pub mod error;
pub mod featmap;
pub mod index;
pub mod profiling;
pub mod reader;
pub mod sample;
pub mod sampler;
pub mod store;
pub mod trajectory;

pub use annotation::ClipAnnotation;
pub use collate::{Batch, Collator};
pub use config::{DatasetPaths, ReaderInit, StoreBackend};
pub use error::DatasetError;
pub use index::{IndexEntry, SampleIndex, SamplingMode};
pub use reader::{ActiveReader, RpReader};
pub use sample::{Sample, SampleField};

/// Target frame height in pixels.
pub const TARGET_HEIGHT: usize = 192;

/// Target frame width in pixels.
pub const TARGET_WIDTH: usize = 240;

/// Default border-mask threshold on the `[0, 1]` intensity scale.
pub const DEFAULT_MASK_THRESHOLD: f64 = 10.0 / 255.0;
