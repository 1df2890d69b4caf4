use std::fs;
use std::path::Path;

use burn::backend::Autodiff;
use burn::module::Module;
use burn_ndarray::NdArray;
use facegan::cli::TrainArgs;
use facegan::config::AppConfig;
use facegan::error::{GanError, Result};
use facegan::gan::sampling::{save_grid, tensor_grid};
use facegan::gan::training::{
    adam_trainer, load_record, CheckpointCallback, Checkpointer, EpochCallback, HistoryWriter,
    SampleGrid,
};
use facegan::gan::{BatchLoader, DiscriminatorConfig, GeneratorConfig, ImageFolder};
use tracing::{info, warn};

type InferenceBackend = NdArray<f32>;
type TrainBackend = Autodiff<InferenceBackend>;

fn validated(config: AppConfig) -> Result<AppConfig> {
    config.validate().map_err(GanError::InvalidConfig)?;
    Ok(config)
}

pub fn run_train(mut config: AppConfig, args: &TrainArgs) -> Result<()> {
    args.apply(&mut config);
    let config = validated(config)?;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Facegan Training                               ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Data:           {}", config.data.dir.display());
    println!("║  Output:         {}", config.output.dir.display());
    println!("║  Epochs:         {:>6}", config.training.epochs);
    println!("║  Batch Size:     {:>6}", config.data.batch_size);
    println!("║  Learning Rate:  {:>10.6}", config.training.learning_rate);
    println!("║  Latent Dim:     {:>6}", config.model.latent_dim);
    match config.data.max_batches_per_epoch {
        Some(max) => println!("║  Batches/Epoch:  {:>6}", max),
        None => println!("║  Batches/Epoch:    full"),
    }
    println!("╚══════════════════════════════════════════════════════════════╝");

    let folder = ImageFolder::open(&config.data.dir)?;
    info!("Found {} images in {:?}", folder.len(), folder.root());
    if folder.len() < config.data.batch_size {
        warn!(
            "Only {} images for batch size {}; no full batch can be formed",
            folder.len(),
            config.data.batch_size
        );
    }
    let mut loader = BatchLoader::new(folder, &config.data);

    fs::create_dir_all(&config.output.dir)?;

    let device = Default::default();
    let mut trainer = adam_trainer::<TrainBackend>(&config, &device);

    let mut callbacks: Vec<Box<dyn EpochCallback<TrainBackend>>> = vec![
        Box::new(SampleGrid::new(
            &config.output.dir,
            config.output.grid_size,
            config.output.num_samples,
        )),
        Box::new(HistoryWriter::new(config.output.dir.join("history.json"))),
    ];
    if config.output.checkpoints {
        let checkpointer = Checkpointer::new(
            config.output.dir.join("checkpoints"),
            config.output.keep_checkpoints,
        )?;
        callbacks.push(Box::new(CheckpointCallback::new(checkpointer)));
    }

    let history = trainer.fit(&mut loader, config.training.epochs, &mut callbacks)?;

    println!("\n╔══════════════════════════════════════════════════════════════╗");
    println!("║               Training Complete                              ║");
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Epochs:         {:>6}", history.epochs.len());
    println!("║  Steps:          {:>6}", trainer.steps());
    if let Some(last) = history.last() {
        println!("║  Final d_loss:   {:>10.4}", last.d_loss);
        println!("║  Final g_loss:   {:>10.4}", last.g_loss);
    }
    println!("║  Samples:        {}", config.output.dir.display());
    println!("╚══════════════════════════════════════════════════════════════╝");

    Ok(())
}

pub fn run_sample(config: AppConfig, checkpoint: &Path, output: &Path, grid: Option<usize>) -> Result<()> {
    let config = validated(config)?;
    let grid = grid.unwrap_or(config.output.grid_size);
    let count = config.output.num_samples.max(grid * grid);

    let device = Default::default();
    let generator = GeneratorConfig::from(&config).init::<InferenceBackend>(&device);
    let generator = load_record(checkpoint, generator, &device)?;

    let images = generator.sample(count, &device);
    let canvas = tensor_grid(images, grid)?;
    save_grid(output, &canvas)?;

    println!("Wrote {}x{} sample grid to {}", grid, grid, output.display());
    Ok(())
}

pub fn run_inspect(config: AppConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&config)?);

    if let Err(problems) = config.validate() {
        println!("\nConfiguration problems:");
        for problem in &problems {
            println!("  - {}", problem);
        }
        return Err(GanError::InvalidConfig(problems));
    }

    let device = Default::default();
    let generator = GeneratorConfig::from(&config).init::<InferenceBackend>(&device);
    let discriminator = DiscriminatorConfig::from(&config).init::<InferenceBackend>(&device);
    println!("\nGenerator:      {:>12} parameters", generator.num_params());
    println!("Discriminator:  {:>12} parameters", discriminator.num_params());

    match ImageFolder::open(&config.data.dir) {
        Ok(folder) => {
            let loader = BatchLoader::new(folder, &config.data);
            println!(
                "Dataset:        {:>12} images in {}",
                loader.folder().len(),
                config.data.dir.display()
            );
            println!("Batches/epoch:  {:>12}", loader.batches_per_epoch());
        }
        Err(e) => println!("Dataset:        unavailable ({})", e),
    }

    Ok(())
}
