use super::*;
use crate::common::*;
use ndarray::Ix3;
use ::hdf5::{
    types::{VarLenAscii, VarLenUnicode},
    Dataset, File, Group,
};

/// The group holding one dataset per clip.
pub const HDF5_CLIP_GROUP: &str = "RPTraj/by_clip";

/// Annotation store backed by an HDF5 file with one dataset per clip under
/// `/RPTraj/by_clip`. Scalar attributes `TrajLen`, `StartFrame`, `TrajCount` and `VidId`
/// live on each dataset.
#[derive(Debug)]
pub struct Hdf5AnnotationStore {
    _file: File,
    group: Group,
}

impl Hdf5AnnotationStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open trajectory store '{}'", path.display()))?;
        let group = file
            .group(HDF5_CLIP_GROUP)
            .with_context(|| format!("missing group '{}' in '{}'", HDF5_CLIP_GROUP, path.display()))?;
        Ok(Self { _file: file, group })
    }
}

impl AnnotationStore for Hdf5AnnotationStore {
    fn clip_names(&self) -> Result<Vec<String>> {
        Ok(self.group.member_names()?)
    }

    fn load_clip(&self, name: &str) -> Result<ClipAnnotation> {
        let dataset = self
            .group
            .dataset(name)
            .with_context(|| format!("clip '{}' not found", name))?;

        let traj_len = read_usize_attr(&dataset, "TrajLen")?;
        let start_frame = read_usize_attr(&dataset, "StartFrame")?;
        let traj_count = read_usize_attr(&dataset, "TrajCount")?;
        let vid_id = read_string_attr(&dataset, "VidId")?;
        let trajs: Array3<f32> = dataset
            .read::<f32, Ix3>()
            .with_context(|| format!("failed to read trajectories of clip '{}'", name))?;

        ClipAnnotation::new(name, traj_len, start_frame, traj_count, trajs, vid_id)
    }
}

fn read_usize_attr(dataset: &Dataset, name: &str) -> Result<usize> {
    let value: i64 = dataset
        .attr(name)
        .and_then(|attr| attr.read_scalar())
        .with_context(|| format!("failed to read attribute '{}'", name))?;
    ensure!(value >= 0, "attribute '{}' must be non-negative", name);
    Ok(value as usize)
}

fn read_string_attr(dataset: &Dataset, name: &str) -> Result<String> {
    let attr = dataset
        .attr(name)
        .with_context(|| format!("failed to read attribute '{}'", name))?;

    if let Ok(value) = attr.read_scalar::<VarLenUnicode>() {
        return Ok(value.as_str().to_owned());
    }
    if let Ok(value) = attr.read_scalar::<VarLenAscii>() {
        return Ok(value.as_str().to_owned());
    }
    let value: i64 = attr
        .read_scalar()
        .with_context(|| format!("attribute '{}' is neither a string nor an integer", name))?;
    Ok(value.to_string())
}

/// Location of an HDF5 frame store. Each [open](FrameSource::open) call opens a fresh file
/// handle.
#[derive(Debug, Clone)]
pub struct Hdf5FrameSource {
    path: PathBuf,
    prefix: String,
}

impl Hdf5FrameSource {
    pub fn new(path: impl AsRef<Path>, prefix: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            prefix: prefix.into(),
        }
    }
}

impl FrameSource for Hdf5FrameSource {
    fn open(&self) -> Result<Box<dyn FrameStore>> {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open frame store '{}'", self.path.display()))?;
        let group = file.group(&self.prefix).with_context(|| {
            format!(
                "missing group '{}' in '{}'",
                self.prefix,
                self.path.display()
            )
        })?;
        Ok(Box::new(Hdf5FrameStore { _file: file, group }))
    }
}

/// An opened HDF5 frame-store handle.
#[derive(Debug)]
pub struct Hdf5FrameStore {
    _file: File,
    group: Group,
}

impl FrameStore for Hdf5FrameStore {
    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let bytes = self
            .group
            .dataset(key)
            .and_then(|dataset| dataset.read_raw::<u8>())
            .with_context(|| format!("failed to read frame '{}'", key))?;
        Ok(bytes)
    }
}
