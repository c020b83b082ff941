//! Trajectory-to-feature-map rendering.

use crate::common::*;

/// The number of feature-map channels.
pub const FEATMAP_CHANNELS: usize = 6;

/// Renders trajectory motion onto a `[6, H, W]` canvas.
///
/// `trajs` has shape `[n, 2, 2]`, holding the `(x, y)` start and end point of each
/// trajectory in canvas pixel coordinates. The canvas is zero-initialized by the caller.
pub trait FeatureMapRenderer
where
    Self: Debug + Send + Sync,
{
    fn render(&self, trajs: ArrayView3<f32>, canvas: &mut Array3<f32>);
}

/// Stamps a disk at both endpoints of every trajectory.
///
/// Channels 0 to 2 are drawn around the start point: presence, `dx / W` and `dy / H`.
/// Channels 3 to 5 carry the same values around the end point. Points outside the canvas
/// are clipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSplatRenderer {
    pub radius: f32,
}

impl Default for MotionSplatRenderer {
    fn default() -> Self {
        Self { radius: 2.0 }
    }
}

impl MotionSplatRenderer {
    fn stamp(
        &self,
        canvas: &mut Array3<f32>,
        channels: Range<usize>,
        center: [f32; 2],
        values: [f32; 3],
    ) {
        let (_, height, width) = canvas.dim();
        let [cx, cy] = center;
        let radius = self.radius.max(0.0);

        if !cx.is_finite() || !cy.is_finite() {
            return;
        }

        let rows = clip_span(cy, radius, height);
        let cols = clip_span(cx, radius, width);

        for h in rows {
            for w in cols.clone() {
                let dy = h as f32 - cy;
                let dx = w as f32 - cx;
                if dx * dx + dy * dy > radius * radius + 0.25 {
                    continue;
                }
                izip!(channels.clone(), values).for_each(|(channel, value)| {
                    canvas[[channel, h, w]] = value;
                });
            }
        }
    }
}

impl FeatureMapRenderer for MotionSplatRenderer {
    fn render(&self, trajs: ArrayView3<f32>, canvas: &mut Array3<f32>) {
        let (_, height, width) = canvas.dim();
        debug_assert_eq!(canvas.len_of(Axis(0)), FEATMAP_CHANNELS);
        debug_assert_eq!(&trajs.shape()[1..], &[2, 2]);

        trajs.outer_iter().for_each(|traj| {
            let start = [traj[[0, 0]], traj[[0, 1]]];
            let end = [traj[[1, 0]], traj[[1, 1]]];
            let dx = finite_or_zero((end[0] - start[0]) / width as f32);
            let dy = finite_or_zero((end[1] - start[1]) / height as f32);

            self.stamp(canvas, 0..3, start, [1.0, dx, dy]);
            self.stamp(canvas, 3..6, end, [1.0, dx, dy]);
        });
    }
}

fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// The pixel indices within `radius` of `center`, clipped to `0..len`.
fn clip_span(center: f32, radius: f32, len: usize) -> Range<usize> {
    let lower = (center - radius).floor().max(0.0);
    let upper = (center + radius).ceil() + 1.0;
    let upper = upper.min(len as f32).max(0.0);
    let lower = lower.min(upper);
    (lower as usize)..(upper as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_endpoints() {
        let renderer = MotionSplatRenderer { radius: 1.0 };
        let trajs = Array3::from_shape_vec([1, 2, 2], vec![4.0, 5.0, 8.0, 3.0]).unwrap();
        let mut canvas = Array3::zeros([FEATMAP_CHANNELS, 10, 12]);
        renderer.render(trajs.view(), &mut canvas);

        // start point at (x=4, y=5)
        assert_eq!(canvas[[0, 5, 4]], 1.0);
        assert_eq!(canvas[[1, 5, 4]], 4.0 / 12.0);
        assert_eq!(canvas[[2, 5, 4]], -2.0 / 10.0);
        assert_eq!(canvas[[3, 5, 4]], 0.0);

        // end point at (x=8, y=3)
        assert_eq!(canvas[[3, 3, 8]], 1.0);
        assert_eq!(canvas[[4, 3, 8]], 4.0 / 12.0);
        assert_eq!(canvas[[0, 3, 8]], 0.0);
    }

    #[test]
    fn out_of_canvas_points_are_clipped() {
        let renderer = MotionSplatRenderer::default();
        let trajs = Array3::from_shape_vec(
            [2, 2, 2],
            vec![-50.0, -50.0, 500.0, 500.0, 0.0, 0.0, f32::NAN, 1.0],
        )
        .unwrap();
        let mut canvas = Array3::zeros([FEATMAP_CHANNELS, 8, 8]);
        renderer.render(trajs.view(), &mut canvas);

        assert_eq!(canvas.slice(s![0, 4.., 4..]).sum(), 0.0);
        assert_eq!(canvas[[0, 0, 0]], 1.0);
    }

    #[test]
    fn no_trajectories_leave_canvas_blank() {
        let renderer = MotionSplatRenderer::default();
        let trajs = Array3::zeros([0, 2, 2]);
        let mut canvas = Array3::zeros([FEATMAP_CHANNELS, 4, 4]);
        renderer.render(trajs.view(), &mut canvas);
        assert_eq!(canvas.sum(), 0.0);
    }
}
