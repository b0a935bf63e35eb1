// Dense row-major f32 tensors exchanged with the inference collaborator

use crate::core::errors::{PreconditionError, PreconditionResult};
use ndarray::{ArrayD, IxDyn};

/// Owned n-dimensional tensor, always kept in standard (row-major) layout
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    array: ArrayD<f32>,
}

/// Raw detector output, shape `[batch, channels, candidates]`
pub type DetectionTensor = Tensor;

impl Tensor {
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>) -> PreconditionResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(PreconditionError::DataLength {
                shape: shape.to_vec(),
                expected,
                actual: data.len(),
            });
        }

        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|_| {
            PreconditionError::DataLength {
                shape: shape.to_vec(),
                expected,
                actual: expected,
            }
        })?;
        Ok(Self { array })
    }

    pub fn from_array(array: ArrayD<f32>) -> Self {
        Self {
            array: array.as_standard_layout().into_owned(),
        }
    }

    pub fn dims(&self) -> &[usize] {
        self.array.shape()
    }

    /// Flat row-major view of the values
    pub fn data(&self) -> &[f32] {
        // Construction and permute both keep standard layout
        self.array.as_slice().unwrap_or(&[])
    }

    pub fn view(&self) -> ndarray::ArrayViewD<'_, f32> {
        self.array.view()
    }

    /// Reorder axes. `None` reverses all axes, so a 2D tensor is transposed.
    pub fn permute(&self, order: Option<&[usize]>) -> PreconditionResult<Tensor> {
        let rank = self.array.ndim();
        let order: Vec<usize> = match order {
            Some(order) => order.to_vec(),
            None => (0..rank).rev().collect(),
        };

        let mut seen = vec![false; rank];
        let valid = order.len() == rank
            && order.iter().all(|&axis| {
                axis < rank && !std::mem::replace(&mut seen[axis], true)
            });
        if !valid {
            return Err(PreconditionError::InvalidPermutation { order, rank });
        }

        let permuted = self.array.view().permuted_axes(IxDyn(&order));
        Ok(Tensor {
            array: permuted.as_standard_layout().into_owned(),
        })
    }
}
