//! RLPM Command Line Interface
//!
//! A command-line interface for training and evaluating sparse linear
//! classifiers on LibSVM format data.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use rlpm::api::{quick, TrainedModel, LPM};
use rlpm::core::{Regularizer, Result, TrainingState, TrainingStats};
use rlpm::LibSVMDataset;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "rlpm")]
#[command(about = "Sparse linear classifier trained by an L1 sub-gradient method")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "RLPM Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model and print its non-zero weights
    Train(TrainArgs),
    /// Train on one file and evaluate on another
    Evaluate(EvaluateArgs),
    /// Quick operations
    Quick(QuickArgs),
}

#[derive(Args, Clone, Debug)]
struct TrainingOptions {
    /// Trade-off parameter C
    #[arg(short = 'C', long, default_value = "1.0")]
    c: f64,

    /// Convergence tolerance
    #[arg(short, long, default_value = "0.00001")]
    epsilon: f64,

    /// Train a bias term
    #[arg(long)]
    bias: bool,

    /// Weight penalty
    #[arg(long, default_value = "l1")]
    regularizer: CliRegularizer,

    /// Initial capacity of the boundary sub-problem
    #[arg(long, default_value = "42")]
    qpsize: usize,

    /// Boundary size above which optimality is only checked after stagnation
    #[arg(long, default_value = "2000")]
    qpsize_max: usize,

    /// Stop after this many iterations
    #[arg(short, long)]
    max_iterations: Option<usize>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliRegularizer {
    /// L1 norm, sparse weights (default)
    #[value(name = "l1")]
    L1,
    /// Squared L2 norm
    #[value(name = "l2")]
    L2,
}

impl From<CliRegularizer> for Regularizer {
    fn from(cli_regularizer: CliRegularizer) -> Self {
        match cli_regularizer {
            CliRegularizer::L1 => Regularizer::L1,
            CliRegularizer::L2 => Regularizer::L2,
        }
    }
}

impl TrainingOptions {
    fn builder(&self) -> LPM {
        let lpm = LPM::new()
            .with_c(self.c)
            .with_epsilon(self.epsilon)
            .with_bias(self.bias)
            .with_regularizer(self.regularizer.into())
            .with_qpsize(self.qpsize, self.qpsize_max);

        match self.max_iterations {
            Some(max) => lpm.with_max_iterations(max),
            None => lpm,
        }
    }
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (LibSVM format)
    #[arg(long)]
    data: PathBuf,

    #[command(flatten)]
    options: TrainingOptions,

    /// Write the training statistics as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Training data file
    #[arg(long)]
    train: PathBuf,

    /// Test data file
    #[arg(long)]
    test: PathBuf,

    #[command(flatten)]
    options: TrainingOptions,

    /// Show detailed metrics
    #[arg(long)]
    detailed: bool,
}

#[derive(Args)]
struct QuickArgs {
    #[command(subcommand)]
    operation: QuickOperation,
}

#[derive(Subcommand)]
enum QuickOperation {
    /// Holdout validation on a single dataset
    Cv {
        /// Data file
        data: PathBuf,
        /// Training ratio (0.0-1.0)
        #[arg(short, long, default_value = "0.8")]
        ratio: f64,
        /// Trade-off parameter C
        #[arg(short = 'C', long, default_value = "1.0")]
        c: f64,
    },
}

/// Contents of the `--report` file
#[derive(Serialize)]
struct TrainingReport<'a> {
    data: &'a PathBuf,
    state: TrainingState,
    num_features: usize,
    nonzero_weights: usize,
    stats: &'a TrainingStats,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Quick(args) => quick_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    info!("Data file: {:?}", args.data);
    info!(
        "Parameters: C={}, epsilon={}, bias={}, regularizer={:?}",
        args.options.c, args.options.epsilon, args.options.bias, args.options.regularizer
    );

    let dataset = LibSVMDataset::from_file(&args.data)?;
    info!(
        "Loaded {} examples with {} features",
        dataset.len(),
        dataset.dim()
    );

    let model = args.options.builder().train_dataset(&dataset)?;
    if model.info().state == TrainingState::Cancelled {
        info!("Training stopped before convergence");
    }

    let accuracy = model.evaluate(&dataset, &dataset);
    info!("Training accuracy: {:.2}%", accuracy * 100.0);

    print_model(&model);

    if let Some(path) = &args.report {
        let info = model.info();
        let report = TrainingReport {
            data: &args.data,
            state: info.state,
            num_features: info.num_features,
            nonzero_weights: info.nonzero_weights,
            stats: model.stats(),
        };
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, &report)?;
        writeln!(writer)?;
        writer.flush()?;
        info!("Report saved to: {path:?}");
    }

    Ok(())
}

/// Bias line followed by `index weight` for every non-zero weight, 1-based
fn print_model(model: &TrainedModel) {
    let info = model.info();
    println!(
        "# {:?} after {} iterations, objective {:.6}, {} of {} weights non-zero",
        info.state, info.iterations, info.objective, info.nonzero_weights, info.num_features
    );
    println!("bias {:.6}", info.bias);
    for (j, w) in model.inner().nonzero_weights() {
        println!("{} {:.6}", j + 1, w);
    }
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    info!("Training on {:?}, testing on {:?}", args.train, args.test);

    let train = LibSVMDataset::from_file(&args.train)?;
    let test = LibSVMDataset::from_file(&args.test)?;
    let model = args.options.builder().train_dataset(&train)?;
    let metrics = model.evaluate_detailed(&test, &test);
    let info = model.info();

    println!("=== Model Evaluation ===");
    println!("State: {:?}", info.state);
    println!("Iterations: {}", info.iterations);
    println!("Objective: {:.6}", info.objective);
    println!(
        "Non-zero weights: {} of {}",
        info.nonzero_weights, info.num_features
    );
    println!("Bias: {:.6}", info.bias);

    println!("\nTest Results:");
    println!("  Accuracy: {:.2}%", metrics.accuracy() * 100.0);

    if args.detailed {
        println!("\nDetailed Metrics:");
        println!("  True Positives:  {}", metrics.true_positives);
        println!("  True Negatives:  {}", metrics.true_negatives);
        println!("  False Positives: {}", metrics.false_positives);
        println!("  False Negatives: {}", metrics.false_negatives);
        println!("  Precision:       {:.4}", metrics.precision());
        println!("  Recall:          {:.4}", metrics.recall());
        println!("  F1 Score:        {:.4}", metrics.f1_score());
    }

    Ok(())
}

fn quick_command(args: QuickArgs) -> Result<()> {
    match args.operation {
        QuickOperation::Cv { data, ratio, c } => {
            info!("Holdout validation on {data:?} with ratio {ratio}");

            let dataset = LibSVMDataset::from_file(&data)?;
            let accuracy = quick::holdout_validation(&dataset, ratio, c)?;

            println!("=== Holdout Validation Results ===");
            println!("Data file: {data:?}");
            println!("Train/test ratio: {ratio:.1}/{:.1}", 1.0 - ratio);
            println!("C parameter: {c}");
            println!("Holdout accuracy: {:.2}%", accuracy * 100.0);

            Ok(())
        }
    }
}
