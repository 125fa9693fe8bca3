use crate::data::dataset::Dataset;
use crate::data::loader::DataLoader;
use crate::data::sample::Batch;
use crate::error::Result;
use crate::loss::loss_fn::Loss;
use crate::network::model::{Model, NoGrad};
use crate::optim::optimizer::Optimizer;

/// One optimisation step on a batch; returns the batch loss.
///
/// Gradients are cleared after the loss is computed and before
/// backpropagation, because the model accumulates them across backward
/// passes.
pub fn train_step<M, L, O>(model: &mut M, loss: &L, optimizer: &mut O, batch: &Batch) -> Result<f64>
where
    M: Model + ?Sized,
    L: Loss + ?Sized,
    O: Optimizer,
{
    let scores = model.forward(&batch.inputs)?;
    let out = loss.compute(&scores, &batch.labels)?;
    optimizer.zero_grad(model);
    model.backward(&out.grad)?;
    optimizer.step(&mut model.parameters_mut())?;
    Ok(out.value)
}

/// Loss and correct-prediction count for one batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalOutcome {
    pub loss: f64,
    pub correct: usize,
    pub samples: usize,
}

/// Scores a batch with gradient tracking suppressed. A prediction is correct
/// when the highest score (first index on ties) is at the label.
pub fn eval_step<M, L>(model: &mut M, loss: &L, batch: &Batch) -> Result<EvalOutcome>
where
    M: Model + ?Sized,
    L: Loss + ?Sized,
{
    let mut model = NoGrad::new(model);
    let scores = model.forward(&batch.inputs)?;
    let out = loss.compute(&scores, &batch.labels)?;
    let correct = batch.labels.iter()
        .enumerate()
        .filter(|&(r, &label)| scores.argmax_row(r) == label)
        .count();
    Ok(EvalOutcome { loss: out.value, correct, samples: batch.len() })
}

/// Result of a full validation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalSummary {
    /// Sum of batch losses divided by the number of batches.
    pub avg_loss: f64,
    /// `100 * correct / samples`.
    pub accuracy_pct: f64,
    pub correct: usize,
    pub samples: usize,
    pub batches: usize,
}

/// Runs `eval_step` over every batch of `loader` in its order. An empty
/// loader yields zero loss and zero accuracy.
pub fn evaluate<M, L, D>(model: &mut M, loss: &L, loader: &mut DataLoader<D>) -> Result<EvalSummary>
where
    M: Model + ?Sized,
    L: Loss + ?Sized,
    D: Dataset,
{
    let mut total_loss = 0.0;
    let mut correct = 0;
    let mut samples = 0;
    let mut batches = 0;

    for batch in loader.iter() {
        let outcome = eval_step(model, loss, &batch?)?;
        total_loss += outcome.loss;
        correct += outcome.correct;
        samples += outcome.samples;
        batches += 1;
    }

    Ok(EvalSummary {
        avg_loss: if batches > 0 { total_loss / batches as f64 } else { 0.0 },
        accuracy_pct: if samples > 0 { 100.0 * correct as f64 / samples as f64 } else { 0.0 },
        correct,
        samples,
        batches,
    })
}
