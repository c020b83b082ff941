use super::SamplerContext;
use crate::{
    border::border_mask,
    common::*,
    index::{IndexEntry, SampleIndex},
    profiling::Timing,
    sample::Sample,
    store::FrameStore,
};

/// Renders a training entry into an anchor frame, a ground-truth frame `interval` frames
/// later, the feature map between them and the ground-truth border mask.
#[derive(Debug, Clone)]
pub struct PairSampler {
    context: Arc<SamplerContext>,
}

impl PairSampler {
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
        let mut timing = Timing::new("pair_sampler");

        let IndexEntry {
            clip_index,
            offset,
            interval,
        } = index
            .entry(position)
            .ok_or_else(|| format_err!("invalid index {}", position))?;
        let clip = index
            .clip(clip_index)
            .ok_or_else(|| format_err!("invalid clip index {}", clip_index))?;

        let trajs = context
            .subsampler
            .sample(clip.trajs.view(), &[offset, offset + interval], rng);
        timing.add_event("subsample");

        let first = context.loader.load(
            store,
            &clip.vid_id,
            clip.frame_number(offset),
            &mut timing,
        )?;
        let second = context.loader.load(
            store,
            &clip.vid_id,
            clip.frame_number(offset + interval),
            &mut timing,
        )?;

        let mask = border_mask(second.view(), context.mask_threshold);
        timing.add_event("mask");

        let featmap = context.featmap(trajs.view());
        let warp_input = SamplerContext::warp_input(&first, &featmap)?;
        timing.add_event("render");

        timing.report();

        Ok(Sample {
            img_input: first.into_dyn(),
            warp_input: warp_input.into_dyn(),
            img_gt: second.into_dyn(),
            mask: mask.into_dyn(),
        })
    }
}
