//! Activation functions over the numeric view

use ndarray::{Axis, NdFloat};

use crate::tensor::{Element, Tensor, TensorError};

impl<T: Element + NdFloat> Tensor<T> {
    /// Softmax along the last axis, in place.
    ///
    /// Each lane is shifted by its maximum before exponentiation.
    pub fn softmax_in_place(&mut self) {
        let mut view = self.view_mut();
        let axis = Axis(view.ndim() - 1);
        for mut lane in view.lanes_mut(axis) {
            let max = lane.fold(T::neg_infinity(), |acc, &x| acc.max(x));
            lane.mapv_inplace(|x| (x - max).exp());
            let sum = lane.sum();
            lane.mapv_inplace(|x| x / sum);
        }
    }

    /// Softmax along the last axis into a new tensor with the same pinning
    pub fn softmax(&self) -> Result<Tensor<T>, TensorError> {
        let mut out = self.try_clone()?;
        out.softmax_in_place();
        Ok(out)
    }

    /// Logistic sigmoid of every element, in place
    pub fn sigmoid_in_place(&mut self) {
        self.view_mut()
            .mapv_inplace(|x| T::one() / (T::one() + (-x).exp()));
    }
}
