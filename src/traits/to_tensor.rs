use burn::{
    prelude::*,
    tensor::{backend::Backend, BasicOps, Element, TensorData},
};

use crate::error::{PpoError, Result};

/// A trait for converting host data to tensors
///
/// Implemented for flat `Vec<E>` / `&[E]` (1D) and for [`Rows`], a row-major
/// view of a flat slice (2D, one row per state/action).
pub trait ToTensor<B: Backend, const D: usize, K: BasicOps<B>> {
    fn to_tensor(self, device: &B::Device) -> Tensor<B, D, K>;
}

/// Row-major view over a flat slice: `data.len() / width` rows of `width` columns
#[derive(Clone, Copy, Debug)]
pub struct Rows<'a, E> {
    data: &'a [E],
    width: usize,
}

impl<'a, E> Rows<'a, E> {
    pub fn new(data: &'a [E], width: usize) -> Self {
        debug_assert!(width > 0 && data.len() % width == 0);
        Self { data, width }
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.width
    }
}

impl<B, E, K> ToTensor<B, 1, K> for Vec<E>
where
    B: Backend,
    E: Element,
    K: BasicOps<B>,
{
    #[inline]
    fn to_tensor(self, device: &<B as Backend>::Device) -> Tensor<B, 1, K> {
        let len = self.len();
        Tensor::from_data(TensorData::new(self, [len]), device)
    }
}

impl<B, E, K> ToTensor<B, 1, K> for &[E]
where
    B: Backend,
    E: Element,
    K: BasicOps<B>,
{
    #[inline]
    fn to_tensor(self, device: &<B as Backend>::Device) -> Tensor<B, 1, K> {
        self.to_vec().to_tensor(device)
    }
}

impl<B, E, K> ToTensor<B, 2, K> for Rows<'_, E>
where
    B: Backend,
    E: Element,
    K: BasicOps<B>,
{
    #[inline]
    fn to_tensor(self, device: &B::Device) -> Tensor<B, 2, K> {
        let data = TensorData::new(self.data.to_vec(), [self.rows(), self.width]);
        Tensor::<B, 2, K>::from_data(data, device)
    }
}

/// Read a float tensor back into a flat host vector (row-major)
pub fn to_vec_f32<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|err| PpoError::TensorData(format!("{err:?}")))
}
