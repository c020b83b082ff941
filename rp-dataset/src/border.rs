//! Border detection over letterboxed frames.

use crate::common::*;

/// The valid region of a frame as half-open row and column ranges.
///
/// The ranges always satisfy `start <= end`. An empty range means no pixel is valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BorderBox {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl BorderBox {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.cols.len()
    }

    pub fn area(&self) -> usize {
        self.height() * self.width()
    }

    pub fn is_empty(&self) -> bool {
        self.area() == 0
    }
}

/// Locate the content box of a `[C, H, W]` frame.
///
/// Rows and columns are averaged over the other two axes. Each edge is scanned inward to
/// the first position whose mean intensity exceeds `threshold`, then the box is shrunk by
/// one pixel on every side. An edge that never exceeds the threshold stops at the opposite
/// end, which leaves an empty box.
pub fn find_border(frame: ArrayView3<f32>, threshold: f32) -> BorderBox {
    let (channels, height, width) = frame.dim();

    if channels == 0 || height == 0 || width == 0 {
        return BorderBox {
            rows: 0..0,
            cols: 0..0,
        };
    }

    let intensity = frame.sum_axis(Axis(0)) / channels as f32;
    let row_profile = intensity.sum_axis(Axis(1)) / width as f32;
    let col_profile = intensity.sum_axis(Axis(0)) / height as f32;

    BorderBox {
        rows: scan_profile(row_profile.view(), threshold),
        cols: scan_profile(col_profile.view(), threshold),
    }
}

/// Build the `[1, H, W]` mask that is one inside the content box and zero elsewhere.
pub fn border_mask(frame: ArrayView3<f32>, threshold: f32) -> Array3<f32> {
    let (_, height, width) = frame.dim();
    let BorderBox { rows, cols } = find_border(frame, threshold);

    let mut mask = Array3::zeros([1, height, width]);
    mask.slice_mut(s![.., rows, cols]).fill(1.0);
    mask
}

fn scan_profile(profile: ndarray::ArrayView1<f32>, threshold: f32) -> Range<usize> {
    let len = profile.len();
    let last = len - 1;

    let lower = (0..len)
        .find(|&index| profile[index] > threshold)
        .unwrap_or(last);
    let upper = (0..len)
        .rev()
        .find(|&index| profile[index] > threshold)
        .unwrap_or(0);

    // erode by one pixel
    let lower = cmp::min(lower + 1, last);
    let upper = upper.saturating_sub(1);

    lower..cmp::max(upper + 1, lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letterboxed(height: usize, width: usize, bars: (usize, usize), value: f32) -> Array3<f32> {
        let (top, left) = bars;
        let mut frame = Array3::zeros([3, height, width]);
        frame
            .slice_mut(s![.., top..(height - top), left..(width - left)])
            .fill(value);
        frame
    }

    #[test]
    fn bright_frame_is_eroded_by_one() {
        let frame = Array3::from_elem([3, 6, 8], 1.0);
        let bbox = find_border(frame.view(), 10.0 / 255.0);
        assert_eq!(bbox.rows, 1..5);
        assert_eq!(bbox.cols, 1..7);

        let mask = border_mask(frame.view(), 10.0 / 255.0);
        assert_eq!(mask.shape(), &[1, 6, 8]);
        assert_eq!(mask.sum() as usize, 4 * 6);
        assert_eq!(mask[[0, 0, 0]], 0.0);
        assert_eq!(mask[[0, 1, 1]], 1.0);
        assert_eq!(mask[[0, 5, 7]], 0.0);
    }

    #[test]
    fn dark_frame_degenerates_without_panic() {
        let frame = Array3::zeros([3, 6, 8]);
        let bbox = find_border(frame.view(), 10.0 / 255.0);
        assert!(bbox.rows.start <= bbox.rows.end);
        assert!(bbox.cols.start <= bbox.cols.end);
        assert!(bbox.is_empty());

        let mask = border_mask(frame.view(), 10.0 / 255.0);
        assert_eq!(mask.sum(), 0.0);
    }

    #[test]
    fn letterbox_bars_are_excluded() {
        let frame = letterboxed(20, 30, (3, 5), 0.8);
        let bbox = find_border(frame.view(), 10.0 / 255.0);
        assert_eq!(bbox.rows, 4..16);
        assert_eq!(bbox.cols, 6..24);
    }

    #[test]
    fn single_pixel_frame() {
        let frame = Array3::from_elem([3, 1, 1], 1.0);
        let bbox = find_border(frame.view(), 10.0 / 255.0);
        assert_eq!(bbox.area(), 1);

        let frame = Array3::zeros([3, 1, 1]);
        let bbox = find_border(frame.view(), 10.0 / 255.0);
        assert!(bbox.rows.start <= bbox.rows.end);
    }

    #[test]
    fn empty_frame() {
        let frame = Array3::<f32>::zeros([3, 0, 4]);
        let mask = border_mask(frame.view(), 0.5);
        assert_eq!(mask.shape(), &[1, 0, 4]);
    }

    #[test]
    fn area_is_monotonic_in_threshold() {
        let (height, width) = (12, 16);
        let frame = Array3::from_shape_fn([3, height, width], |(c, h, w)| {
            let dh = cmp::min(h, height - 1 - h) as f32;
            let dw = cmp::min(w, width - 1 - w) as f32;
            (dh * dw + c as f32) / 50.0
        });

        let areas: Vec<_> = (0..=40)
            .map(|step| {
                let threshold = step as f32 / 40.0;
                find_border(frame.view(), threshold).area()
            })
            .collect();

        areas
            .iter()
            .tuple_windows()
            .for_each(|(prev, next)| assert!(next <= prev, "{:?}", areas));
    }
}
