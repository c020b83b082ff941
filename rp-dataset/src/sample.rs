use crate::common::*;

/// The four fields every sampler emits, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleField {
    ImgInput,
    WarpInput,
    ImgGt,
    Mask,
}

impl SampleField {
    pub const ALL: [SampleField; 4] = [
        SampleField::ImgInput,
        SampleField::WarpInput,
        SampleField::ImgGt,
        SampleField::Mask,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::ImgInput => "img_input",
            Self::WarpInput => "warp_input",
            Self::ImgGt => "img_gt",
            Self::Mask => "mask",
        }
    }
}

impl fmt::Display for SampleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One rendered sample.
///
/// A pair sample has shapes `[3, H, W]`, `[9, H, W]`, `[3, H, W]` and `[1, H, W]`.
/// A sequence sample carries an extra leading axis of length `max_interval - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub img_input: ArrayD<f32>,
    pub warp_input: ArrayD<f32>,
    pub img_gt: ArrayD<f32>,
    pub mask: ArrayD<f32>,
}

impl Sample {
    pub fn field(&self, field: SampleField) -> &ArrayD<f32> {
        match field {
            SampleField::ImgInput => &self.img_input,
            SampleField::WarpInput => &self.warp_input,
            SampleField::ImgGt => &self.img_gt,
            SampleField::Mask => &self.mask,
        }
    }

    pub fn into_tuple(self) -> (ArrayD<f32>, ArrayD<f32>, ArrayD<f32>, ArrayD<f32>) {
        let Self {
            img_input,
            warp_input,
            img_gt,
            mask,
        } = self;
        (img_input, warp_input, img_gt, mask)
    }
}
