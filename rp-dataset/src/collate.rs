//! Batch collation.

use crate::{
    common::*,
    error::DatasetError,
    sample::{Sample, SampleField},
};

/// How samples are merged into a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collator {
    /// Stack along a new leading batch axis. Every sample must have the same shape.
    Stack,
    /// Concatenate along the existing leading axis. Only trailing dimensions must match.
    Concat,
}

/// A collated batch, field by field.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub img_input: ArrayD<f32>,
    pub warp_input: ArrayD<f32>,
    pub img_gt: ArrayD<f32>,
    pub mask: ArrayD<f32>,
}

impl Batch {
    pub fn field(&self, field: SampleField) -> &ArrayD<f32> {
        match field {
            SampleField::ImgInput => &self.img_input,
            SampleField::WarpInput => &self.warp_input,
            SampleField::ImgGt => &self.img_gt,
            SampleField::Mask => &self.mask,
        }
    }

    /// The number of leading rows of the batch.
    pub fn len(&self) -> usize {
        self.img_input.shape().first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Collator {
    /// Merge samples produced by the same sampler into one batch.
    pub fn collate(&self, samples: Vec<Sample>) -> Result<Batch> {
        ensure!(!samples.is_empty(), "cannot collate an empty sample list");

        SampleField::ALL
            .iter()
            .try_for_each(|&field| self.check_shapes(&samples, field))?;

        let (img_input, warp_input, img_gt, mask) = samples
            .into_iter()
            .map(|sample| sample.into_tuple())
            .unzip_n_vec();

        Ok(Batch {
            img_input: self.merge(&img_input)?,
            warp_input: self.merge(&warp_input)?,
            img_gt: self.merge(&img_gt)?,
            mask: self.merge(&mask)?,
        })
    }

    fn check_shapes(&self, samples: &[Sample], field: SampleField) -> Result<()> {
        let expected = samples[0].field(field).shape();

        samples
            .iter()
            .enumerate()
            .skip(1)
            .try_for_each(|(index, sample)| {
                let found = sample.field(field).shape();
                let compatible = match self {
                    Self::Stack => found == expected,
                    Self::Concat => {
                        !found.is_empty()
                            && found.len() == expected.len()
                            && found[1..] == expected[1..]
                    }
                };

                if compatible {
                    Ok(())
                } else {
                    Err(DatasetError::InconsistentShape {
                        field,
                        sample: index,
                        expected: expected.to_vec(),
                        found: found.to_vec(),
                    })
                }
            })?;

        if *self == Self::Concat && expected.is_empty() {
            return Err(DatasetError::InconsistentShape {
                field,
                sample: 0,
                expected: vec![1],
                found: vec![],
            }
            .into());
        }

        Ok(())
    }

    fn merge(&self, arrays: &[ArrayD<f32>]) -> Result<ArrayD<f32>> {
        let views: Vec<_> = arrays.iter().map(|array| array.view()).collect();
        let merged = match self {
            Self::Stack => ndarray::stack(Axis(0), &views)?,
            Self::Concat => ndarray::concatenate(Axis(0), &views)?,
        };
        Ok(merged)
    }

    /// Collate and convert the batch into `tch` tensors.
    #[cfg(feature = "tch")]
    pub fn collate_tensors(&self, samples: Vec<Sample>) -> Result<TensorBatch> {
        self.collate(samples)?.to_tensors()
    }
}

/// A collated batch converted into `tch` tensors.
#[cfg(feature = "tch")]
#[derive(Debug)]
pub struct TensorBatch {
    pub img_input: tch::Tensor,
    pub warp_input: tch::Tensor,
    pub img_gt: tch::Tensor,
    pub mask: tch::Tensor,
}

#[cfg(feature = "tch")]
impl Batch {
    pub fn to_tensors(&self) -> Result<TensorBatch> {
        fn to_tensor(array: &ArrayD<f32>) -> Result<tch::Tensor> {
            let array = array.as_standard_layout();
            let shape: Vec<i64> = array.shape().iter().map(|&dim| dim as i64).collect();
            let data = array
                .as_slice()
                .ok_or_else(|| format_err!("the array is not contiguous"))?;
            Ok(tch::Tensor::of_slice(data).view(shape.as_slice()))
        }

        Ok(TensorBatch {
            img_input: to_tensor(&self.img_input)?,
            warp_input: to_tensor(&self.warp_input)?,
            img_gt: to_tensor(&self.img_gt)?,
            mask: to_tensor(&self.mask)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    fn sample(leading: &[usize]) -> Sample {
        let shape = |channels: usize| {
            let mut shape = leading.to_vec();
            shape.extend([channels, 4, 5]);
            ArrayD::zeros(IxDyn(&shape))
        };
        Sample {
            img_input: shape(3),
            warp_input: shape(9),
            img_gt: shape(3),
            mask: shape(1),
        }
    }

    #[test]
    fn stack_adds_batch_axis() {
        let batch = Collator::Stack
            .collate(vec![sample(&[]), sample(&[]), sample(&[])])
            .unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.img_input.shape(), &[3, 3, 4, 5]);
        assert_eq!(batch.warp_input.shape(), &[3, 9, 4, 5]);
        assert_eq!(batch.img_gt.shape(), &[3, 3, 4, 5]);
        assert_eq!(batch.mask.shape(), &[3, 1, 4, 5]);
    }

    #[test]
    fn concat_sums_leading_lengths() {
        let batch = Collator::Concat
            .collate(vec![sample(&[2]), sample(&[5]), sample(&[1])])
            .unwrap();
        assert_eq!(batch.len(), 8);
        assert_eq!(batch.warp_input.shape(), &[8, 9, 4, 5]);
        assert_eq!(batch.mask.shape(), &[8, 1, 4, 5]);
    }

    #[test]
    fn stack_rejects_mismatched_shapes() {
        let mut odd = sample(&[]);
        odd.mask = ArrayD::zeros(IxDyn(&[1, 4, 6]));

        let err = Collator::Stack
            .collate(vec![sample(&[]), odd])
            .unwrap_err();
        match err.downcast_ref::<DatasetError>() {
            Some(DatasetError::InconsistentShape { field, sample, .. }) => {
                assert_eq!(*field, SampleField::Mask);
                assert_eq!(*sample, 1);
            }
            _ => panic!("unexpected error {:?}", err),
        }
        assert!(format!("{}", err).contains("mask"));
    }

    #[test]
    fn stack_rejects_different_leading_lengths() {
        let err = Collator::Stack
            .collate(vec![sample(&[2]), sample(&[3])])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::InconsistentShape {
                field: SampleField::ImgInput,
                ..
            })
        ));
    }

    #[test]
    fn concat_rejects_mismatched_trailing_dims() {
        let mut odd = sample(&[2]);
        odd.warp_input = ArrayD::zeros(IxDyn(&[2, 8, 4, 5]));

        let err = Collator::Concat
            .collate(vec![sample(&[3]), odd])
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DatasetError>(),
            Some(DatasetError::InconsistentShape {
                field: SampleField::WarpInput,
                ..
            })
        ));
    }

    #[test]
    fn empty_sample_list() {
        assert!(Collator::Stack.collate(vec![]).is_err());
    }
}
