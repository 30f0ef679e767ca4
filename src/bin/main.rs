//! RSMO Command Line Interface
//!
//! A command-line interface for training, evaluating, and using SMO models
//! with LibSVM and CSV data formats.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info, warn};
use rsmo::api::{TrainedModel, SMO};
use rsmo::core::{Result, SMOConfig, SVMError};
use rsmo::persistence::SerializableModel;
use rsmo::{CSVReader, Dataset, Instances, LibSVMReader};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "rsmo")]
#[command(about = "Support vector classification trained with SMO")]
#[command(version = env!("CARGO_PKG_VERSION"))]
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
    /// Train a new model
    Train(TrainArgs),
    /// Make predictions using a trained model
    Predict(PredictArgs),
    /// Evaluate a model on labelled test data
    Evaluate(EvaluateArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum Format {
    /// Pick by file extension
    Auto,
    Libsvm,
    Csv,
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file (LibSVM or CSV format)
    #[arg(long)]
    data: PathBuf,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Data format
    #[arg(short, long, value_enum, default_value = "auto")]
    format: Format,

    /// Complexity constant C
    #[arg(short = 'C', long, default_value = "1.0")]
    c: f64,

    /// Polynomial kernel exponent (1.0 trains a linear machine)
    #[arg(short = 'E', long, default_value = "1.0")]
    exponent: f64,

    /// Use lower-order terms, i.e. (<x,y> + 1)^E
    #[arg(short = 'L', long)]
    lower_order: bool,

    /// Rescale the dot product by the number of attributes
    #[arg(long)]
    rescale: bool,

    /// Do not normalize attributes to [0, 1]
    #[arg(long)]
    no_normalize: bool,

    /// Kernel cache buckets (0 caches the full kernel matrix)
    #[arg(long, default_value = "1000003")]
    cache_size: usize,

    /// Tolerance for KKT violations
    #[arg(long, default_value = "0.001")]
    tol: f64,

    /// Round-off epsilon
    #[arg(long, default_value = "1e-12")]
    eps: f64,

    /// Abort once a class pair spent this many kernel evaluations
    #[arg(long)]
    max_kernel_evaluations: Option<u64>,

    /// Train class pairs in parallel
    #[arg(long)]
    parallel: bool,

    /// Print the trained machines
    #[arg(long)]
    print_model: bool,
}

impl TrainArgs {
    fn config(&self) -> SMOConfig {
        SMOConfig {
            c: self.c,
            exponent: self.exponent,
            normalize: !self.no_normalize,
            rescale: self.rescale,
            lower_order: self.lower_order,
            cache_size: self.cache_size,
            tol: self.tol,
            eps: self.eps,
            max_kernel_evaluations: self.max_kernel_evaluations,
            parallel: self.parallel,
        }
    }
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file
    #[arg(long)]
    data: PathBuf,

    /// Output predictions file (optional, prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Data format
    #[arg(short, long, value_enum, default_value = "auto")]
    format: Format,

    /// Show the share of pairwise votes won
    #[arg(long)]
    confidence: bool,

    /// Show the raw output of every pairwise machine
    #[arg(long)]
    decision_values: bool,
}

#[derive(Args)]
struct EvaluateArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Test data file
    #[arg(long)]
    data: PathBuf,

    /// Data format
    #[arg(short, long, value_enum, default_value = "auto")]
    format: Format,

    /// Show per-class metrics and the confusion matrix
    #[arg(long)]
    detailed: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,

    /// Print the trained machines
    #[arg(long)]
    machines: bool,
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
        Commands::Predict(args) => predict_command(args),
        Commands::Evaluate(args) => evaluate_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn train_command(args: TrainArgs) -> Result<()> {
    let config = args.config();
    // Reject bad options before reading any data
    let smo = SMO::with_config(config)?;

    info!("Training SMO model...");
    info!("Data file: {:?}", args.data);
    info!(
        "Parameters: C={}, exponent={}, lower_order={}, rescale={}, normalize={}, cache_size={}",
        args.c, args.exponent, args.lower_order, args.rescale, !args.no_normalize, args.cache_size
    );

    let dataset = match resolve_format(args.format, &args.data) {
        Format::Csv => CSVReader::from_file(&args.data)?,
        _ => LibSVMReader::from_file(&args.data)?,
    };
    info!(
        "Loaded {} instances with {} attributes and {} classes",
        dataset.len(),
        dataset.header().num_attributes(),
        dataset.header().num_classes()
    );

    let model = smo.train(&dataset)?;
    info!("Training completed successfully");

    let info = model.info();
    info!("Pairwise machines: {}", info.num_machines);
    info!("Support vectors: {}", info.n_support_vectors);

    let metrics = model.evaluate(&dataset)?;
    info!("Training accuracy: {:.2}%", metrics.accuracy() * 100.0);

    if args.print_model {
        println!("{model}");
    }

    let serializable = SerializableModel::from_trained_model(model);
    serializable.save_to_file(&args.output)?;
    info!("Model saved to: {:?}", args.output);

    Ok(())
}

fn load_model(path: &Path) -> Result<SerializableModel> {
    info!("Loading model from: {path:?}");
    SerializableModel::load_from_file(path)
}

fn load_data(model: &TrainedModel, format: Format, path: &Path) -> Result<Instances> {
    info!("Loading data from: {path:?}");
    match resolve_format(format, path) {
        Format::Csv => model.load_csv(path),
        _ => model.load_libsvm(path),
    }
}

fn predict_command(args: PredictArgs) -> Result<()> {
    let serializable = load_model(&args.model)?;
    let model = serializable.into_trained_model();
    let dataset = load_data(&model, args.format, &args.data)?;

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(SVMError::IoError)?)),
        None => Box::new(io::stdout().lock()),
    };

    writeln!(writer, "# Predictions for {} instances", dataset.len())?;
    writeln!(
        writer,
        "# Format: instance_index predicted_class{}{}",
        if args.confidence { " confidence" } else { "" },
        if args.decision_values { " decision_values" } else { "" }
    )?;

    for (i, prediction) in model.predict_dataset(&dataset).into_iter().enumerate() {
        let instance = dataset.instance(i);
        write!(writer, "{} {}", i, model.header().class_name(prediction.class))?;
        if args.confidence {
            write!(writer, " {:.6}", prediction.confidence())?;
        }
        if args.decision_values {
            for (_, value) in model.decision_values(instance) {
                write!(writer, " {value:.6}")?;
            }
        }
        writeln!(writer)?;
    }
    writer.flush()?;

    if let Some(path) = &args.output {
        info!("Predictions saved to: {path:?}");
    }
    Ok(())
}

fn evaluate_command(args: EvaluateArgs) -> Result<()> {
    let serializable = load_model(&args.model)?;
    let dataset = load_data(&serializable.model, args.format, &args.data)?;
    let metrics = serializable.model.evaluate(&dataset)?;

    println!("=== Model Evaluation ===");
    serializable.print_summary();

    println!("\nTest Results:");
    println!("  Accuracy: {:.2}%", metrics.accuracy() * 100.0);

    if args.detailed {
        println!("\nDetailed Metrics:");
        print!("{metrics}");
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    let serializable = load_model(&args.model)?;
    serializable.print_summary();

    if args.machines {
        println!();
        println!("{}", serializable.model);
    }
    Ok(())
}

/// Replace `Auto` by the format implied by the file extension
fn resolve_format(format: Format, path: &Path) -> Format {
    if format != Format::Auto {
        return format;
    }
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => Format::Csv,
        Some("libsvm") | Some("svm") => Format::Libsvm,
        Some(_) => {
            warn!("Unknown file extension, assuming LibSVM format");
            Format::Libsvm
        }
        None => {
            warn!("No file extension, assuming LibSVM format");
            Format::Libsvm
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        let detect = |name: &str| resolve_format(Format::Auto, &PathBuf::from(name));
        assert_eq!(detect("test.csv"), Format::Csv);
        assert_eq!(detect("test.libsvm"), Format::Libsvm);
        assert_eq!(detect("test.svm"), Format::Libsvm);
        assert_eq!(detect("test"), Format::Libsvm);
        assert_eq!(resolve_format(Format::Csv, &PathBuf::from("test.svm")), Format::Csv);
    }

    #[test]
    fn test_train_args_map_onto_config() {
        let cli = Cli::parse_from([
            "rsmo", "train", "--data", "d.svm", "-o", "m.json", "-C", "2.5", "-E", "2", "-L",
            "--no-normalize", "--cache-size", "0",
        ]);
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        let config = args.config();
        assert_eq!(config.c, 2.5);
        assert_eq!(config.exponent, 2.0);
        assert!(config.lower_order);
        assert!(!config.normalize);
        assert_eq!(config.cache_size, 0);
        assert_eq!(config.tol, SMOConfig::default().tol);
    }

    #[test]
    fn test_unknown_option_rejected() {
        assert!(Cli::try_parse_from(["rsmo", "train", "--data", "d", "-o", "m", "--gamma", "1"]).is_err());
    }
}
