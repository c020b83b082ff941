//! The two-phase dataset reader.

use crate::{
    affinity,
    codec::{FrameCodec, FrameLoader, FramePreprocessor, ImageCodec},
    collate::Collator,
    common::*,
    config::{DatasetPaths, ReaderInit},
    featmap::{FeatureMapRenderer, MotionSplatRenderer},
    index::{SampleIndex, SamplingMode},
    sample::Sample,
    sampler::{PairSampler, SamplerContext, SequenceSampler},
    store::{AnnotationStore, FrameSource, FrameStore},
    trajectory::TrajectorySubsampler,
    TARGET_HEIGHT, TARGET_WIDTH,
};

impl ReaderInit {
    /// Build a reader over the split selected by `is_test` and `is_eval`.
    pub fn build(self, paths: &DatasetPaths) -> Result<RpReader> {
        let split = paths.select(self.reads_test_split());
        info!(
            "loading trajectories from '{}', frames from '{}' ({})",
            split.traj_path.display(),
            split.frames_path.display(),
            split.frames_prefix
        );

        let annotations = split.open_annotation_store()?;
        let frames = split.frame_source()?;
        self.build_with_stores(&*annotations, frames)
    }

    /// Build a reader over already opened stores with the default codec and renderer.
    pub fn build_with_stores(
        self,
        annotations: &dyn AnnotationStore,
        frames: Arc<dyn FrameSource>,
    ) -> Result<RpReader> {
        self.build_with_components(
            annotations,
            frames,
            Arc::new(ImageCodec),
            Arc::new(MotionSplatRenderer::default()),
        )
    }

    pub fn build_with_components(
        self,
        annotations: &dyn AnnotationStore,
        frames: Arc<dyn FrameSource>,
        codec: Arc<dyn FrameCodec>,
        renderer: Arc<dyn FeatureMapRenderer>,
    ) -> Result<RpReader> {
        self.validate()?;

        let mode = if self.is_eval {
            SamplingMode::Sequence
        } else {
            SamplingMode::Pair
        };
        let index = SampleIndex::build(annotations, self.max_interval, mode)?;

        let split_name = if self.is_eval {
            "EVAL"
        } else if self.is_test {
            "Test"
        } else {
            "Train"
        };
        info!(
            "{} reader: max interval {}, {} clips, {} samples, {} LUT entries",
            split_name,
            self.max_interval,
            index.clips().len(),
            index.len(),
            index.interval_lut().len()
        );

        let context = SamplerContext {
            loader: FrameLoader::new(
                codec,
                FramePreprocessor::new(TARGET_HEIGHT, TARGET_WIDTH)?,
            ),
            renderer,
            subsampler: TrajectorySubsampler::new(self.min_ntraj, self.max_ntraj)?,
            mask_threshold: self.mask_threshold.raw() as f32,
        };

        Ok(RpReader {
            init: self,
            index: Arc::new(index),
            frames,
            context: Arc::new(context),
        })
    }
}

/// The unactivated reader. It holds no store handle and can be cloned into every worker.
#[derive(Debug, Clone)]
pub struct RpReader {
    init: ReaderInit,
    index: Arc<SampleIndex>,
    frames: Arc<dyn FrameSource>,
    context: Arc<SamplerContext>,
}

impl RpReader {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn mode(&self) -> SamplingMode {
        self.index.mode()
    }

    pub fn init(&self) -> &ReaderInit {
        &self.init
    }

    pub fn index(&self) -> &SampleIndex {
        &self.index
    }

    /// The collation that matches the sample layout of this reader.
    pub fn collator(&self) -> Collator {
        match self.mode() {
            SamplingMode::Pair => Collator::Stack,
            SamplingMode::Sequence => Collator::Concat,
        }
    }

    /// Open a frame-store handle for a worker, seeding its random source from entropy.
    pub fn activate(&self, worker_id: usize) -> Result<ActiveReader> {
        self.activate_with_rng(worker_id, StdRng::from_entropy())
    }

    /// Open a frame-store handle for a worker with a reproducible random source.
    pub fn activate_seeded(&self, worker_id: usize, seed: u64) -> Result<ActiveReader> {
        self.activate_with_rng(worker_id, StdRng::seed_from_u64(seed))
    }

    fn activate_with_rng(&self, worker_id: usize, rng: StdRng) -> Result<ActiveReader> {
        let store = self
            .frames
            .open()
            .with_context(|| format!("worker {} failed to open the frame store", worker_id))?;

        match affinity::cpu_affinity() {
            Ok(cpus) => debug!(
                "worker {} opened the frame store, CPU affinity {:?}",
                worker_id, cpus
            ),
            Err(err) => debug!(
                "worker {} opened the frame store, CPU affinity unknown: {:#}",
                worker_id, err
            ),
        }

        let sampler = match self.mode() {
            SamplingMode::Pair => Sampler::Pair(PairSampler::new(self.context.clone())),
            SamplingMode::Sequence => {
                Sampler::Sequence(SequenceSampler::new(self.context.clone()))
            }
        };

        Ok(ActiveReader {
            worker_id,
            index: self.index.clone(),
            sampler,
            store,
            rng,
        })
    }
}

#[derive(Debug, Clone)]
enum Sampler {
    Pair(PairSampler),
    Sequence(SequenceSampler),
}

/// A reader bound to one worker. It exclusively owns its frame-store handle, which is
/// released when the reader is dropped.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ActiveReader {
    worker_id: usize,
    #[derivative(Debug = "ignore")]
    index: Arc<SampleIndex>,
    sampler: Sampler,
    #[derivative(Debug = "ignore")]
    store: Box<dyn FrameStore>,
    #[derivative(Debug = "ignore")]
    rng: StdRng,
}

impl ActiveReader {
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Render the sample at `index` with the worker's own random source.
    pub fn get(&mut self, index: usize) -> Result<Sample> {
        let Self {
            index: sample_index,
            sampler,
            store,
            rng,
            ..
        } = self;
        Self::render(sampler, sample_index, index, &**store, rng)
    }

    /// Render the sample at `index` with a caller-provided random source.
    pub fn get_with_rng<R>(&self, index: usize, rng: &mut R) -> Result<Sample>
    where
        R: Rng + ?Sized,
    {
        Self::render(&self.sampler, &self.index, index, &*self.store, rng)
    }

    fn render<R>(
        sampler: &Sampler,
        sample_index: &SampleIndex,
        index: usize,
        store: &dyn FrameStore,
        rng: &mut R,
    ) -> Result<Sample>
    where
        R: Rng + ?Sized,
    {
        ensure!(
            index < sample_index.len(),
            "index {} is out of range for {} samples",
            index,
            sample_index.len()
        );

        match sampler {
            Sampler::Pair(sampler) => sampler.sample(sample_index, index, store, rng),
            Sampler::Sequence(sampler) => sampler.sample(sample_index, index, store, rng),
        }
    }
}

impl Drop for ActiveReader {
    fn drop(&mut self) {
        debug!("worker {} released the frame store", self.worker_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{annotation::ClipAnnotation, store::MemoryAnnotationStore};

    #[derive(Debug)]
    struct EmptyFrames;

    impl FrameSource for EmptyFrames {
        fn open(&self) -> Result<Box<dyn FrameStore>> {
            bail!("no frames")
        }
    }

    fn annotations() -> MemoryAnnotationStore {
        (0..2)
            .map(|clip| {
                ClipAnnotation::new(
                    format!("clip{}", clip),
                    6,
                    0,
                    2,
                    Array3::zeros([2, 6, 2]),
                    format!("v{}", clip),
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn mode_and_collator_follow_eval_flag() {
        let train = ReaderInit {
            max_interval: 3,
            ..Default::default()
        }
        .build_with_stores(&annotations(), Arc::new(EmptyFrames))
        .unwrap();
        assert_eq!(train.mode(), SamplingMode::Pair);
        assert_eq!(train.collator(), Collator::Stack);
        // 5 + 4 + 3 per clip
        assert_eq!(train.len(), 24);

        let eval = ReaderInit {
            max_interval: 3,
            is_eval: true,
            ..Default::default()
        }
        .build_with_stores(&annotations(), Arc::new(EmptyFrames))
        .unwrap();
        assert_eq!(eval.mode(), SamplingMode::Sequence);
        assert_eq!(eval.collator(), Collator::Concat);
        assert_eq!(eval.len(), 2);
    }

    #[test]
    fn invalid_init_is_rejected() {
        let result = ReaderInit {
            max_interval: 0,
            ..Default::default()
        }
        .build_with_stores(&annotations(), Arc::new(EmptyFrames));
        assert!(result.is_err());
    }

    #[test]
    fn activation_propagates_open_failure() {
        let reader = ReaderInit::default()
            .build_with_stores(&annotations(), Arc::new(EmptyFrames))
            .unwrap();
        assert!(reader.activate(0).is_err());
    }
}
