use crate::error::Result;
use crate::network::model::{Model, ParamMut};

/// Updates parameters in place from their accumulated gradients.
pub trait Optimizer {
    /// Applies one update to `params`, which must come in the model's
    /// stable parameter order. Fails without touching any parameter when a
    /// gradient's shape differs from its value's.
    fn step(&mut self, params: &mut [ParamMut<'_>]) -> Result<()>;

    /// Clears gradients accumulated by earlier backward passes.
    fn zero_grad<M: Model + ?Sized>(&self, model: &mut M)
    where
        Self: Sized,
    {
        model.zero_grad();
    }

    fn learning_rate(&self) -> f64;
}
