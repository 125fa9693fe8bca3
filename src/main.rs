use std::env;

use anyhow::{bail, Context};
use log::info;

use epoch_trainer::{DataLoader, Dataset, EpochTrainer, Network, RunConfig};

const USAGE: &str = "usage: epoch-trainer <run-config.json>";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let (Some(config_path), None) = (args.next(), args.next()) else {
        bail!(USAGE);
    };

    let config = RunConfig::load_json(&config_path)
        .with_context(|| format!("cannot read run config '{config_path}'"))?;
    config.validate().context("invalid run config")?;

    let train_set = config.train_dataset()
        .with_context(|| format!("cannot open training images at {}", config.data.train_dir.display()))?;
    let val_set = config.val_dataset()
        .with_context(|| format!("cannot open validation images at {}", config.data.val_dir.display()))?;
    if train_set.classes() != val_set.classes() {
        bail!(
            "training classes {:?} differ from validation classes {:?}",
            train_set.classes(),
            val_set.classes()
        );
    }
    info!(
        "{} training and {} validation images in {} classes",
        train_set.len(),
        val_set.len(),
        train_set.classes().len()
    );

    if config.network.num_classes() != train_set.classes().len() {
        bail!(
            "network has {} outputs but the dataset has {} classes",
            config.network.num_classes(),
            train_set.classes().len()
        );
    }

    let mut network = Network::from_spec(&config.network, config.train.seed)?;
    network.metadata.input_shape = Some(config.data.image);
    network.metadata.output_labels = Some(train_set.classes().to_vec());
    if network.metadata.description.is_none() {
        network.metadata.description = Some(config.name.clone());
    }

    let mut train_loader = DataLoader::new(train_set, config.train.batch_size)?
        .shuffled(config.train.seed)
        .drop_last(config.train.drop_last);
    let mut val_loader = DataLoader::new(val_set, config.train.batch_size)?;

    let optimizer = config.optimizer.build()?;
    let mut trainer = EpochTrainer::new(
        &mut network,
        config.loss.build(),
        optimizer,
        config.train_config(),
    )?;
    let report = trainer
        .run(&mut train_loader, &mut val_loader)
        .context("training failed")?;

    if let Some(path) = &config.output.report_path {
        report.save_json(&path.to_string_lossy())
            .with_context(|| format!("cannot write report to {}", path.display()))?;
        info!("report written to {}", path.display());
    }
    if let Some(path) = &config.output.model_path {
        network.save_json(&path.to_string_lossy())
            .with_context(|| format!("cannot write model to {}", path.display()))?;
        info!("model written to {}", path.display());
    }

    println!("best validation accuracy: {:.2}%", report.best_score.value());
    Ok(())
}
