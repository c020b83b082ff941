use crate::common::*;
use rand::seq::index;

/// Draws a random subset of trajectories and keeps selected time steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrajectorySubsampler {
    min_ntraj: usize,
    max_ntraj: usize,
}

impl TrajectorySubsampler {
    pub fn new(min_ntraj: usize, max_ntraj: usize) -> Result<Self> {
        ensure!(
            min_ntraj <= max_ntraj,
            "min_ntraj must not exceed max_ntraj"
        );
        Ok(Self {
            min_ntraj,
            max_ntraj,
        })
    }

    /// The number of trajectories to draw out of `traj_count`.
    ///
    /// A count is drawn uniformly from `min_ntraj..=max_ntraj` and capped at `traj_count`.
    pub fn draw_count<R>(&self, traj_count: usize, rng: &mut R) -> usize
    where
        R: Rng + ?Sized,
    {
        cmp::min(traj_count, rng.gen_range(self.min_ntraj..=self.max_ntraj))
    }

    /// Sample trajectories of a `[N, T, 2]` array and slice them at `times`.
    ///
    /// The outcome has shape `[n, times.len(), 2]`, where the `n` rows are distinct
    /// trajectories drawn without replacement.
    pub fn sample<R>(&self, trajs: ArrayView3<f32>, times: &[usize], rng: &mut R) -> Array3<f32>
    where
        R: Rng + ?Sized,
    {
        let traj_count = trajs.len_of(Axis(0));
        let count = self.draw_count(traj_count, rng);
        let chosen = index::sample(rng, traj_count, count).into_vec();

        trajs.select(Axis(0), &chosen).select(Axis(1), times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn trajs(traj_count: usize, traj_len: usize) -> Array3<f32> {
        Array3::from_shape_fn([traj_count, traj_len, 2], |(n, t, xy)| {
            (n * 1000 + t * 10 + xy) as f32
        })
    }

    #[test]
    fn count_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let subsampler = TrajectorySubsampler::new(2, 6).unwrap();

        for traj_count in 0..10 {
            for _ in 0..100 {
                let count = subsampler.draw_count(traj_count, &mut rng);
                assert!(cmp::min(2, traj_count) <= count);
                assert!(count <= cmp::min(6, traj_count));
            }
        }
    }

    #[test]
    fn sampled_trajectories_are_distinct() {
        let mut rng = StdRng::seed_from_u64(11);
        let subsampler = TrajectorySubsampler::new(2, 6).unwrap();
        let trajs = trajs(4, 5);

        for _ in 0..100 {
            let sampled = subsampler.sample(trajs.view(), &[1, 3], &mut rng);
            let count = sampled.len_of(Axis(0));
            assert!((2..=4).contains(&count));
            assert_eq!(sampled.shape(), &[count, 2, 2]);

            let ids: HashSet<_> = (0..count)
                .map(|n| {
                    // time step 1 of trajectory k has x = k * 1000 + 10
                    assert_eq!(sampled[[n, 0, 0]] as usize % 1000, 10);
                    assert_eq!(sampled[[n, 1, 0]] as usize % 1000, 30);
                    sampled[[n, 0, 0]] as usize / 1000
                })
                .collect();
            assert_eq!(ids.len(), count);
        }
    }

    #[test]
    fn no_trajectories() {
        let mut rng = StdRng::seed_from_u64(3);
        let subsampler = TrajectorySubsampler::new(2, 6).unwrap();
        let sampled = subsampler.sample(trajs(0, 5).view(), &[0, 1], &mut rng);
        assert_eq!(sampled.shape(), &[0, 2, 2]);
    }
}
