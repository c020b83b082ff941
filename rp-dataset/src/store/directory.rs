use super::*;
use crate::common::*;

/// Annotation store backed by one JSON document.
///
/// The document holds an ordered `clips` array. The array order is the store-native order.
///
/// ```json
/// { "clips": [ { "name": "clip-0", "TrajLen": 5, "StartFrame": 100, "TrajCount": 1,
///                "VidId": "v1", "Trajs": [[[10.0, 20.0], [11.0, 21.0], ...]] } ] }
/// ```
#[derive(Debug, Clone)]
pub struct DirAnnotationStore {
    path: PathBuf,
    clips: IndexMap<String, ClipRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnnotationDocument {
    clips: Vec<ClipRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClipRecord {
    name: String,
    #[serde(rename = "TrajLen")]
    traj_len: usize,
    #[serde(rename = "StartFrame")]
    start_frame: usize,
    #[serde(rename = "TrajCount")]
    traj_count: usize,
    #[serde(rename = "VidId")]
    vid_id: String,
    #[serde(rename = "Trajs")]
    trajs: Vec<Vec<[f32; 2]>>,
}

impl DirAnnotationStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read annotation file '{}'", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("failed to parse annotation file '{}'", path.display()))
            .map(|store| Self {
                path: path.to_owned(),
                ..store
            })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let AnnotationDocument { clips: records } = serde_json::from_str(text)?;
        let mut clips = IndexMap::with_capacity(records.len());

        for record in records {
            let name = record.name.clone();
            ensure!(
                clips.insert(name.clone(), record).is_none(),
                "duplicated clip name '{}'",
                name
            );
        }

        Ok(Self {
            path: PathBuf::new(),
            clips,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AnnotationStore for DirAnnotationStore {
    fn clip_names(&self) -> Result<Vec<String>> {
        Ok(self.clips.keys().cloned().collect())
    }

    fn load_clip(&self, name: &str) -> Result<ClipAnnotation> {
        let ClipRecord {
            ref name,
            traj_len,
            start_frame,
            traj_count,
            ref vid_id,
            ref trajs,
        } = *self
            .clips
            .get(name)
            .ok_or_else(|| format_err!("clip '{}' not found", name))?;

        let num_points: usize = trajs.iter().map(|traj| traj.len()).sum();
        ensure!(
            trajs.len() == traj_count && num_points == traj_count * traj_len,
            "clip '{}' expects {} trajectories of {} points, but get {} trajectories of {} points in total",
            name,
            traj_count,
            traj_len,
            trajs.len(),
            num_points
        );

        let values: Vec<f32> = trajs
            .iter()
            .flat_map(|traj| traj.iter().flat_map(|point| point.iter().copied()))
            .collect();
        let trajs = Array3::from_shape_vec([traj_count, traj_len, 2], values)?;

        ClipAnnotation::new(name, traj_len, start_frame, traj_count, trajs, vid_id)
    }
}

/// Frame store backed by a directory tree `{root}/{prefix}/{vid_id}/{frame}.jpg`.
#[derive(Debug, Clone)]
pub struct DirFrameStore {
    dir: PathBuf,
}

impl DirFrameStore {
    pub fn new(root: impl AsRef<Path>, prefix: impl AsRef<Path>) -> Self {
        Self {
            dir: root.as_ref().join(prefix),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FrameStore for DirFrameStore {
    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.dir.join(key);
        fs::read(&path).with_context(|| format!("failed to read frame '{}'", path.display()))
    }
}

impl FrameSource for DirFrameStore {
    fn open(&self) -> Result<Box<dyn FrameStore>> {
        ensure!(
            self.dir.is_dir(),
            "frame directory '{}' does not exist",
            self.dir.display()
        );
        Ok(Box::new(self.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "clips": [
            { "name": "b", "TrajLen": 2, "StartFrame": 7, "TrajCount": 1, "VidId": "v2",
              "Trajs": [[[1.0, 2.0], [3.0, 4.0]]] },
            { "name": "a", "TrajLen": 1, "StartFrame": 0, "TrajCount": 2, "VidId": "v1",
              "Trajs": [[[5.0, 6.0]], [[7.0, 8.0]]] }
        ]
    }"#;

    #[test]
    fn json_store_keeps_document_order() {
        let store = DirAnnotationStore::from_json(DOCUMENT).unwrap();
        assert_eq!(store.clip_names().unwrap(), vec!["b", "a"]);

        let clip = store.load_clip("b").unwrap();
        assert_eq!(clip.vid_id, "v2");
        assert_eq!(clip.start_frame, 7);
        assert_eq!(clip.trajs[[0, 1, 0]], 3.0);
        assert_eq!(clip.trajs[[0, 1, 1]], 4.0);

        let clip = store.load_clip("a").unwrap();
        assert_eq!(clip.trajs.shape(), &[2, 1, 2]);
        assert_eq!(clip.trajs[[1, 0, 1]], 8.0);
    }

    #[test]
    fn json_store_rejects_ragged_trajectories() {
        let text = r#"{ "clips": [ { "name": "a", "TrajLen": 2, "StartFrame": 0, "TrajCount": 1,
            "VidId": "v1", "Trajs": [[[1.0, 2.0]]] } ] }"#;
        let store = DirAnnotationStore::from_json(text).unwrap();
        assert!(store.load_clip("a").is_err());
    }

    #[test]
    fn json_store_rejects_duplicated_names() {
        let text = r#"{ "clips": [
            { "name": "a", "TrajLen": 1, "StartFrame": 0, "TrajCount": 1, "VidId": "v1", "Trajs": [[[1.0, 2.0]]] },
            { "name": "a", "TrajLen": 1, "StartFrame": 0, "TrajCount": 1, "VidId": "v1", "Trajs": [[[1.0, 2.0]]] }
        ] }"#;
        assert!(DirAnnotationStore::from_json(text).is_err());
    }
}
