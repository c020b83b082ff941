use super::SamplerContext;
use crate::{
    border::border_mask,
    common::*,
    index::SampleIndex,
    profiling::Timing,
    sample::Sample,
    store::FrameStore,
};

/// Renders an evaluation clip into a stack of `max_interval - 1` samples.
///
/// A window of `max_interval` consecutive frames is placed at a random offset. Step `k`
/// pairs the window's first frame with frame `k`.
#[derive(Debug, Clone)]
pub struct SequenceSampler {
    context: Arc<SamplerContext>,
}

impl SequenceSampler {
    pub fn new(context: Arc<SamplerContext>) -> Self {
        Self { context }
    }

    pub fn sample<R>(
        &self,
        index: &SampleIndex,
        position: usize,
        store: &dyn FrameStore,
        rng: &mut R,
    ) -> Result<Sample>
    where
        R: Rng + ?Sized,
    {
        let context = &*self.context;
        let window = index.max_interval();
        let mut timing = Timing::new("sequence_sampler");

        let clip_index = index
            .clip_index(position)
            .ok_or_else(|| format_err!("invalid index {}", position))?;
        let clip = index
            .clip(clip_index)
            .ok_or_else(|| format_err!("invalid clip index {}", clip_index))?;
        ensure!(
            window >= 2 && clip.traj_len >= window,
            "clip '{}' of {} frames cannot hold a {}-frame window",
            clip.name,
            clip.traj_len,
            window
        );

        let offset = rng.gen_range(0..=(clip.traj_len - window));
        let times: Vec<_> = (offset..(offset + window)).collect();
        let trajs = context.subsampler.sample(clip.trajs.view(), &times, rng);
        timing.add_event("subsample");

        let frames: Vec<_> = times
            .iter()
            .map(|&time| {
                context
                    .loader
                    .load(store, &clip.vid_id, clip.frame_number(time), &mut timing)
            })
            .try_collect()?;
        let masks: Vec<_> = frames
            .iter()
            .map(|frame| border_mask(frame.view(), context.mask_threshold))
            .collect();
        timing.add_event("mask");

        let warp_inputs: Vec<_> = (1..window)
            .map(|step| {
                let trajs = trajs.select(Axis(1), &[0, step]);
                let featmap = context.featmap(trajs.view());
                SamplerContext::warp_input(&frames[0], &featmap)
            })
            .try_collect()?;
        timing.add_event("render");

        let first = frames[0].view();
        let img_input = ndarray::stack(Axis(0), &vec![first; window - 1])?;
        let warp_input = stack_views(&warp_inputs)?;
        let img_gt = stack_views(&frames[1..])?;
        let mask = stack_views(&masks[1..])?;
        timing.add_event("stack");

        timing.report();

        Ok(Sample {
            img_input: img_input.into_dyn(),
            warp_input: warp_input.into_dyn(),
            img_gt: img_gt.into_dyn(),
            mask: mask.into_dyn(),
        })
    }
}

fn stack_views(arrays: &[Array3<f32>]) -> Result<Array4<f32>> {
    let views: Vec<_> = arrays.iter().map(|array| array.view()).collect();
    Ok(ndarray::stack(Axis(0), &views)?)
}
