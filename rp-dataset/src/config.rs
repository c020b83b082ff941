//! Dataset location and reader configuration.

use crate::{
    common::*,
    error::DatasetError,
    store::{AnnotationStore, DirAnnotationStore, DirFrameStore, FrameSource},
    DEFAULT_MASK_THRESHOLD,
};

/// The frame-store group prefix of the training split.
pub const TRAIN_FRAME_PREFIX: &str = "push/push_train";

/// The frame-store group prefix of the test split.
pub const TEST_FRAME_PREFIX: &str = "push/push_testnovel";

/// The storage format of the four dataset stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// A JSON annotation document and a directory tree of JPEG files.
    Directory,
    /// HDF5 files, requiring the `hdf5` feature.
    Hdf5,
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::Directory
    }
}

/// The locations of the trajectory and frame stores of both splits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetPaths {
    #[serde(default)]
    pub backend: StoreBackend,
    pub robot_push_traj_h5_train: PathBuf,
    pub robot_push_jpgs_h5_train: PathBuf,
    pub robot_push_traj_h5_test: PathBuf,
    pub robot_push_jpgs_h5_test: PathBuf,
}

/// The store locations of one split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPaths {
    pub backend: StoreBackend,
    pub traj_path: PathBuf,
    pub frames_path: PathBuf,
    pub frames_prefix: &'static str,
}

impl DatasetPaths {
    /// Load the configuration file. Relative store paths are resolved against the
    /// directory of the configuration file.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let unavailable = |reason: String| DatasetError::ConfigUnavailable {
            path: path.to_owned(),
            reason,
        };

        let text = fs::read_to_string(path).map_err(|err| unavailable(err.to_string()))?;
        let paths: Self = json5::from_str(&text).map_err(|err| unavailable(err.to_string()))?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(paths.resolve(base_dir))
    }

    fn resolve(self, base_dir: &Path) -> Self {
        let resolve = |path: PathBuf| {
            if path.is_relative() {
                base_dir.join(path)
            } else {
                path
            }
        };

        Self {
            backend: self.backend,
            robot_push_traj_h5_train: resolve(self.robot_push_traj_h5_train),
            robot_push_jpgs_h5_train: resolve(self.robot_push_jpgs_h5_train),
            robot_push_traj_h5_test: resolve(self.robot_push_traj_h5_test),
            robot_push_jpgs_h5_test: resolve(self.robot_push_jpgs_h5_test),
        }
    }

    /// Pick the store locations of the test split or the training split.
    pub fn select(&self, is_test: bool) -> SplitPaths {
        if is_test {
            SplitPaths {
                backend: self.backend,
                traj_path: self.robot_push_traj_h5_test.clone(),
                frames_path: self.robot_push_jpgs_h5_test.clone(),
                frames_prefix: TEST_FRAME_PREFIX,
            }
        } else {
            SplitPaths {
                backend: self.backend,
                traj_path: self.robot_push_traj_h5_train.clone(),
                frames_path: self.robot_push_jpgs_h5_train.clone(),
                frames_prefix: TRAIN_FRAME_PREFIX,
            }
        }
    }
}

impl SplitPaths {
    pub fn open_annotation_store(&self) -> Result<Box<dyn AnnotationStore>> {
        match self.backend {
            StoreBackend::Directory => Ok(Box::new(DirAnnotationStore::open(&self.traj_path)?)),
            #[cfg(feature = "hdf5")]
            StoreBackend::Hdf5 => Ok(Box::new(crate::store::Hdf5AnnotationStore::open(
                &self.traj_path,
            )?)),
            #[cfg(not(feature = "hdf5"))]
            StoreBackend::Hdf5 => bail!("'hdf5' feature must be enabled to open HDF5 stores"),
        }
    }

    pub fn frame_source(&self) -> Result<Arc<dyn FrameSource>> {
        match self.backend {
            StoreBackend::Directory => Ok(Arc::new(DirFrameStore::new(
                &self.frames_path,
                self.frames_prefix,
            ))),
            #[cfg(feature = "hdf5")]
            StoreBackend::Hdf5 => Ok(Arc::new(crate::store::Hdf5FrameSource::new(
                &self.frames_path,
                self.frames_prefix,
            ))),
            #[cfg(not(feature = "hdf5"))]
            StoreBackend::Hdf5 => bail!("'hdf5' feature must be enabled to open HDF5 stores"),
        }
    }
}

/// Reader construction options.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReaderInit {
    /// Read the test split.
    pub is_test: bool,
    /// The largest frame gap in pair sampling, and the window length in sequence sampling.
    pub max_interval: usize,
    /// The lower bound of the number of sampled trajectories.
    pub min_ntraj: usize,
    /// The upper bound of the number of sampled trajectories.
    pub max_ntraj: usize,
    /// Sample whole windows instead of frame pairs. It implies `is_test`.
    pub is_eval: bool,
    /// The border-mask intensity threshold.
    pub mask_threshold: R64,
}

impl Default for ReaderInit {
    fn default() -> Self {
        Self {
            is_test: false,
            max_interval: 10,
            min_ntraj: 2,
            max_ntraj: 6,
            is_eval: false,
            mask_threshold: r64(DEFAULT_MASK_THRESHOLD),
        }
    }
}

impl ReaderInit {
    /// Whether the test split is read.
    pub fn reads_test_split(&self) -> bool {
        self.is_test || self.is_eval
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let Self {
            max_interval,
            min_ntraj,
            max_ntraj,
            is_eval,
            mask_threshold,
            ..
        } = *self;

        ensure!(max_interval >= 1, "max_interval must be positive");
        ensure!(
            !is_eval || max_interval >= 2,
            "max_interval must be at least 2 in evaluation mode"
        );
        ensure!(min_ntraj >= 1, "min_ntraj must be positive");
        ensure!(
            min_ntraj <= max_ntraj,
            "min_ntraj must not exceed max_ntraj"
        );
        ensure!(
            (0.0..=1.0).contains(&mask_threshold.raw()),
            "mask_threshold must be within [0, 1]"
        );
        Ok(())
    }
}
