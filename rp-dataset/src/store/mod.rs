//! Keyed store interfaces and their backends.
//!
//! The annotation store is read once during index construction. The frame store is read
//! on every sample access, through a handle that each worker replica opens for itself from
//! a shareable [FrameSource].

mod directory;
#[cfg(feature = "hdf5")]
mod hdf5;
mod memory;

pub use self::directory::*;
#[cfg(feature = "hdf5")]
pub use self::hdf5::*;
pub use self::memory::*;

use crate::{annotation::ClipAnnotation, common::*};

/// A keyed container with one entry per clip.
pub trait AnnotationStore {
    /// The clip names in the store-native iteration order.
    fn clip_names(&self) -> Result<Vec<String>>;

    /// Load the annotation of a clip.
    fn load_clip(&self, name: &str) -> Result<ClipAnnotation>;
}

/// An opened frame-store handle. It is owned by exactly one worker.
pub trait FrameStore
where
    Self: Send,
{
    /// Read the encoded image bytes stored at `key`.
    fn read(&self, key: &str) -> Result<Vec<u8>>;
}

/// The location of a frame store, from which each worker opens its own handle.
pub trait FrameSource
where
    Self: Debug + Send + Sync,
{
    fn open(&self) -> Result<Box<dyn FrameStore>>;
}

/// The frame-store key of a frame, `{vid_id}/{frame_number}.jpg`.
pub fn frame_key(vid_id: &str, frame_number: usize) -> String {
    format!("{}/{}.jpg", vid_id, frame_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_key_format() {
        assert_eq!(frame_key("v1", 101), "v1/101.jpg");
    }
}
