use crate::{common::*, error::DatasetError};

/// The trajectory annotation of one clip.
///
/// `trajs` has shape `[traj_count, traj_len, 2]`, each point being `(x, y)` in target-frame
/// pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipAnnotation {
    pub name: String,
    pub traj_len: usize,
    pub start_frame: usize,
    pub traj_count: usize,
    pub trajs: Array3<f32>,
    pub vid_id: String,
}

impl ClipAnnotation {
    /// Build a clip record, checking the array shape against the scalar attributes.
    pub fn new(
        name: impl Into<String>,
        traj_len: usize,
        start_frame: usize,
        traj_count: usize,
        trajs: Array3<f32>,
        vid_id: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let expect = [traj_count, traj_len, 2];

        if trajs.shape() != expect {
            return Err(DatasetError::MalformedClip {
                clip: name,
                reason: format!(
                    "trajectory array shape {:?} does not match [TrajCount, TrajLen, 2] = {:?}",
                    trajs.shape(),
                    expect
                ),
            }
            .into());
        }

        Ok(Self {
            name,
            traj_len,
            start_frame,
            traj_count,
            trajs,
            vid_id: vid_id.into(),
        })
    }

    /// The absolute frame number of the frame at `offset` within the clip.
    pub fn frame_number(&self, offset: usize) -> usize {
        self.start_frame + offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_shape_check() {
        let trajs = Array3::zeros([3, 5, 2]);
        let clip = ClipAnnotation::new("c0", 5, 100, 3, trajs, "v1").unwrap();
        assert_eq!(clip.frame_number(3), 103);

        let trajs = Array3::zeros([3, 4, 2]);
        let err = ClipAnnotation::new("c1", 5, 100, 3, trajs, "v1").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::MalformedClip { .. })
        ));
    }
}
