//! Frame decoding and conversion to the channel-first layout.

use crate::{
    common::*,
    error::DatasetError,
    profiling::Timing,
    store::{frame_key, FrameStore},
};

/// Decodes encoded image bytes into an interleaved `[H, W, 3]` array in BGR order, the
/// native order of the frame store.
pub trait FrameCodec
where
    Self: Debug + Send + Sync,
{
    fn decode(&self, bytes: &[u8]) -> Result<Array3<u8>>;
}

/// The codec backed by the `image` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl FrameCodec for ImageCodec {
    fn decode(&self, bytes: &[u8]) -> Result<Array3<u8>> {
        let image = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = image.dimensions();
        let rgb = Array3::from_shape_vec([height as usize, width as usize, 3], image.into_raw())?;
        Ok(rgb.slice(s![.., .., ..;-1]).to_owned())
    }
}

/// Normalizes, resizes and transposes decoded frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramePreprocessor {
    pub height: usize,
    pub width: usize,
}

impl FramePreprocessor {
    pub fn new(height: usize, width: usize) -> Result<Self> {
        ensure!(height > 0, "height must be positive");
        ensure!(width > 0, "width must be positive");
        Ok(Self { height, width })
    }

    /// Convert an interleaved BGR `[h, w, 3]` frame into a `[3, H, W]` RGB frame in `[0, 1]`.
    ///
    /// Output channel `c` is input channel `2 - c`. The frame is resized with area
    /// weighting, each output pixel averaging the source pixels it covers in proportion to
    /// the covered area.
    pub fn process(&self, raw: ArrayView3<u8>) -> Result<Array3<f32>> {
        let Self { height, width } = *self;
        let (src_h, src_w, channels) = raw.dim();
        ensure!(
            channels == 3,
            "expect 3 interleaved channels, but get {}",
            channels
        );
        ensure!(src_h > 0 && src_w > 0, "the decoded frame is empty");

        let frame = raw.mapv(|value| value as f32 / 255.0);
        let row_weights = area_weights(src_h, height);
        let col_weights = area_weights(src_w, width);
        let mut output = Array3::zeros([3, height, width]);

        for src_c in 0..3 {
            let plane = frame.index_axis(Axis(2), src_c);

            let mut rows = Array2::<f32>::zeros([height, src_w]);
            row_weights.iter().enumerate().for_each(|(dst_h, weights)| {
                let mut row = rows.row_mut(dst_h);
                weights
                    .iter()
                    .for_each(|&(index, weight)| row.scaled_add(weight, &plane.row(index)));
            });

            let mut out_plane = output.index_axis_mut(Axis(0), 2 - src_c);
            col_weights.iter().enumerate().for_each(|(dst_w, weights)| {
                let mut col = out_plane.column_mut(dst_w);
                weights
                    .iter()
                    .for_each(|&(index, weight)| col.scaled_add(weight, &rows.column(index)));
            });
        }

        Ok(output)
    }
}

/// For each destination position, the covered source positions and their area weights.
fn area_weights(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src_len as f64 / dst_len as f64;

    (0..dst_len)
        .map(|dst| {
            let start = dst as f64 * scale;
            let end = start + scale;
            let first = start.floor() as usize;
            let last = cmp::min(end.ceil() as usize, src_len);

            (first..last)
                .filter_map(|src| {
                    let overlap = end.min(src as f64 + 1.0) - start.max(src as f64);
                    (overlap > 1e-9).then(|| (src, (overlap / scale) as f32))
                })
                .collect()
        })
        .collect()
}

/// Reads, decodes and preprocesses frames addressed by video id and frame number.
#[derive(Debug, Clone)]
pub struct FrameLoader {
    codec: Arc<dyn FrameCodec>,
    preprocessor: FramePreprocessor,
}

impl FrameLoader {
    pub fn new(codec: Arc<dyn FrameCodec>, preprocessor: FramePreprocessor) -> Self {
        Self {
            codec,
            preprocessor,
        }
    }

    pub fn preprocessor(&self) -> &FramePreprocessor {
        &self.preprocessor
    }

    /// Load one frame as a `[3, H, W]` RGB array.
    ///
    /// Missing or undecodable bytes are reported as [DatasetError::FrameDecode].
    pub fn load(
        &self,
        store: &dyn FrameStore,
        vid_id: &str,
        frame_number: usize,
        timing: &mut Timing,
    ) -> Result<Array3<f32>> {
        let decode_failed = |err: Error| DatasetError::FrameDecode {
            vid_id: vid_id.to_owned(),
            frame_number,
            reason: format!("{:#}", err),
        };

        let key = frame_key(vid_id, frame_number);
        let bytes = store.read(&key).map_err(&decode_failed)?;
        timing.add_event("read");

        let raw = self.codec.decode(&bytes).map_err(&decode_failed)?;
        timing.add_event("decode");

        let frame = self.preprocessor.process(raw.view()).map_err(&decode_failed)?;
        timing.add_event("resize");

        Ok(frame)
    }
}
