//! Per-index sample rendering.
//!
//! Both samplers share the [SamplerContext] machinery and differ in how they read the
//! interval. [PairSampler] treats it as the frame gap between two frames.
//! [SequenceSampler] treats `max_interval` as the number of frames in a window.

mod pair;
mod sequence;

pub use pair::*;
pub use sequence::*;

use crate::{
    codec::FrameLoader,
    common::*,
    featmap::{FeatureMapRenderer, FEATMAP_CHANNELS},
    trajectory::TrajectorySubsampler,
};

/// The decoding, subsampling and rendering machinery shared by the samplers.
#[derive(Debug, Clone)]
pub struct SamplerContext {
    pub loader: FrameLoader,
    pub renderer: Arc<dyn FeatureMapRenderer>,
    pub subsampler: TrajectorySubsampler,
    pub mask_threshold: f32,
}

impl SamplerContext {
    /// Render `[n, 2, 2]` trajectory endpoints onto a fresh `[6, H, W]` canvas.
    fn featmap(&self, trajs: ArrayView3<f32>) -> Array3<f32> {
        let preprocessor = self.loader.preprocessor();
        let mut canvas = Array3::zeros([
            FEATMAP_CHANNELS,
            preprocessor.height,
            preprocessor.width,
        ]);
        self.renderer.render(trajs, &mut canvas);
        canvas
    }

    /// Concatenate a `[3, H, W]` frame and a `[6, H, W]` feature map into `[9, H, W]`.
    fn warp_input(frame: &Array3<f32>, featmap: &Array3<f32>) -> Result<Array3<f32>> {
        Ok(ndarray::concatenate(
            Axis(0),
            &[frame.view(), featmap.view()],
        )?)
    }
}
