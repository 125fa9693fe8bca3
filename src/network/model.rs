use std::ops::{Deref, DerefMut};

use crate::error::Result;
use crate::math::matrix::Matrix;

/// A tunable parameter paired with its accumulated gradient.
pub struct ParamMut<'a> {
    pub value: &'a mut Matrix,
    pub grad: &'a Matrix,
}

/// Maps a `[batch, features]` input to `[batch, classes]` scores and
/// exposes its parameters for optimisation.
pub trait Model {
    /// Forward pass. Records what `backward` needs only while gradient
    /// tracking is enabled.
    fn forward(&mut self, input: &Matrix) -> Result<Matrix>;

    /// Reverse pass from ∂L/∂scores of the last tracked forward. Gradients
    /// are added to whatever is already accumulated.
    fn backward(&mut self, grad_output: &Matrix) -> Result<()>;

    fn zero_grad(&mut self);

    /// Parameter values in a stable order.
    fn parameters(&self) -> Vec<&Matrix>;

    /// Parameters with gradients, in the same order as `parameters`.
    fn parameters_mut(&mut self) -> Vec<ParamMut<'_>>;

    fn grad_enabled(&self) -> bool;

    /// Switches gradient tracking and returns the previous setting.
    fn set_grad_enabled(&mut self, enabled: bool) -> bool;

    /// Width of the score rows produced by `forward`.
    fn num_classes(&self) -> usize;
}

/// Scope with gradient tracking suppressed.
///
/// Tracking is switched off on construction and the previous mode restored
/// when the guard drops, whichever way the scope is left.
pub struct NoGrad<'a, M: Model + ?Sized> {
    model: &'a mut M,
    previous: bool,
}

impl<'a, M: Model + ?Sized> NoGrad<'a, M> {
    pub fn new(model: &'a mut M) -> Self {
        let previous = model.set_grad_enabled(false);
        NoGrad { model, previous }
    }
}

impl<M: Model + ?Sized> Deref for NoGrad<'_, M> {
    type Target = M;

    fn deref(&self) -> &M {
        &*self.model
    }
}

impl<M: Model + ?Sized> DerefMut for NoGrad<'_, M> {
    fn deref_mut(&mut self) -> &mut M {
        &mut *self.model
    }
}

impl<M: Model + ?Sized> Drop for NoGrad<'_, M> {
    fn drop(&mut self) {
        self.model.set_grad_enabled(self.previous);
    }
}

/// Copies every parameter value, e.g. to compare before and after a step.
pub fn snapshot<M: Model + ?Sized>(model: &M) -> Vec<Matrix> {
    model.parameters().into_iter().cloned().collect()
}
