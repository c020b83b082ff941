use super::*;
use crate::common::*;

/// In-memory annotation store preserving insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryAnnotationStore {
    clips: IndexMap<String, ClipAnnotation>,
}

impl MemoryAnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a clip. A clip with the same name is replaced in place.
    pub fn insert(&mut self, clip: ClipAnnotation) {
        self.clips.insert(clip.name.clone(), clip);
    }
}

impl FromIterator<ClipAnnotation> for MemoryAnnotationStore {
    fn from_iter<I: IntoIterator<Item = ClipAnnotation>>(iter: I) -> Self {
        let mut store = Self::new();
        iter.into_iter().for_each(|clip| store.insert(clip));
        store
    }
}

impl AnnotationStore for MemoryAnnotationStore {
    fn clip_names(&self) -> Result<Vec<String>> {
        Ok(self.clips.keys().cloned().collect())
    }

    fn load_clip(&self, name: &str) -> Result<ClipAnnotation> {
        self.clips
            .get(name)
            .cloned()
            .ok_or_else(|| format_err!("clip '{}' not found", name))
    }
}

/// In-memory frame store. Clones share the same frames.
#[derive(Debug, Clone, Default)]
pub struct MemoryFrameStore {
    frames: Arc<HashMap<String, Vec<u8>>>,
}

impl MemoryFrameStore {
    pub fn new(frames: HashMap<String, Vec<u8>>) -> Self {
        Self {
            frames: Arc::new(frames),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameStore for MemoryFrameStore {
    fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.frames
            .get(key)
            .cloned()
            .ok_or_else(|| format_err!("frame '{}' not found", key))
    }
}

impl FrameSource for MemoryFrameStore {
    fn open(&self) -> Result<Box<dyn FrameStore>> {
        Ok(Box::new(self.clone()))
    }
}
