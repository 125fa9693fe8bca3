/// Trains a small classifier on generated data.
///
/// Three classes of 4×4 grayscale "images": a bright top half, a bright left
/// half, or a bright diagonal, each with a little noise.
///
/// Architecture: 16 → 12 (ReLU) → 3 (Identity)
/// Loss:         CrossEntropyLoss
/// Optimizer:    SGD, lr = 0.1, weight decay = 1e-4, momentum = 0.9
/// Batch size:   8
/// Epochs:       40
///
/// Run with:
///   RUST_LOG=info cargo run --example synthetic
use epoch_trainer::{
    ActivationFunction, CrossEntropyLoss, DataLoader, EpochTrainer, InMemoryDataset, LayerSpec,
    Network, NetworkSpec, Sgd, TrainConfig,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const SIDE: usize = 4;

fn pattern(class: usize, row: usize, col: usize) -> bool {
    match class {
        0 => row < SIDE / 2,
        1 => col < SIDE / 2,
        _ => row == col,
    }
}

fn generate(n: usize, rng: &mut StdRng) -> InMemoryDataset {
    let mut inputs = Vec::with_capacity(n);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let class = i % 3;
        let image = (0..SIDE * SIDE)
            .map(|p| {
                let on = pattern(class, p / SIDE, p % SIDE);
                let base = if on { 0.9 } else { 0.1 };
                base + rng.gen_range(-0.1..0.1)
            })
            .collect();
        inputs.push(image);
        labels.push(class);
    }
    InMemoryDataset::new(inputs, labels).expect("generated inputs and labels have equal length")
}

fn main() -> epoch_trainer::Result<()> {
    env_logger::init();
    let mut rng = StdRng::seed_from_u64(7);

    let mut train = DataLoader::new(generate(300, &mut rng), 8)?.shuffled(Some(1));
    let mut val = DataLoader::new(generate(60, &mut rng), 8)?;

    let spec = NetworkSpec {
        name: "synthetic".into(),
        layers: vec![
            LayerSpec { size: 12, input_size: SIDE * SIDE, activation: ActivationFunction::ReLU },
            LayerSpec { size: 3, input_size: 12, activation: ActivationFunction::Identity },
        ],
        metadata: None,
    };
    let mut network = Network::from_spec(&spec, Some(42))?;
    let optimizer = Sgd::new(0.1).with_weight_decay(1e-4).with_momentum(0.9);

    let mut trainer = EpochTrainer::new(&mut network, CrossEntropyLoss, optimizer, TrainConfig::new(40))?;
    let report = trainer.run(&mut train, &mut val)?;

    for m in report.history.epochs().iter().step_by(5) {
        println!(
            "epoch {:>3}: train {:.4}  val {:.4}  acc {:>6.2}%",
            m.epoch, m.train_loss, m.val_loss, m.val_accuracy
        );
    }
    println!("best validation accuracy: {:.2}%", report.best_score.value());
    Ok(())
}
