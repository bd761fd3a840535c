//! CLI tool annotating grid points of protein-ligand complexes with
//! pharmacophore features predicted by an ONNX model.

#![allow(clippy::print_stdout)] // CLI tool needs stdout
#![allow(clippy::print_stderr)] // CLI tool needs stderr

use clap::Parser;
use pharmnn_onnx::{
    Error, ExecutionProviderInfo, GridSource, InferencePipeline, NpyGridSource, OnnxModel,
    PipelineConfig, Result, available_execution_providers, find_ort_library, init_runtime,
    test_listing_for,
};
use std::path::PathBuf;
use std::time::Instant;

/// Providers accepted by `--provider`, in listing order.
const ALL_EXECUTION_PROVIDERS: &[ExecutionProviderInfo] = &[
    ExecutionProviderInfo::Cpu,
    ExecutionProviderInfo::Cuda,
    ExecutionProviderInfo::TensorRt,
    ExecutionProviderInfo::CoreMl,
    ExecutionProviderInfo::Rocm,
];

/// Predict pharmacophore features on precomputed grids of the train and test splits.
#[derive(Parser, Debug)]
#[command(name = "pharmnn-infer")]
#[command(about = "Annotate pharmacophore grid points with an ONNX model")]
struct Args {
    /// Complex listing of the training split
    #[arg(long, required_unless_present = "list_providers")]
    train_data: Option<PathBuf>,

    /// Complex listing of the test split [default: train listing with 'train' replaced by 'test']
    #[arg(long)]
    test_data: Option<PathBuf>,

    /// Root directory of the grid data, also the root of DX output [default: .]
    #[arg(long)]
    top_dir: Option<PathBuf>,

    /// Samples per model call [default: 256]
    #[arg(long)]
    batch_size: Option<usize>,

    /// Lattice spacing of the grid centers in angstroms [default: 0.5]
    #[arg(long)]
    resolution: Option<f32>,

    /// Write one DX file per complex and label
    #[arg(long, overrides_with = "no_create_dx")]
    create_dx: bool,

    /// Do not write DX files, even if the config file enables them
    #[arg(long, overrides_with = "create_dx")]
    no_create_dx: bool,

    /// Write thresholded 0/1 values to DX files
    #[arg(long, overrides_with = "no_round_pred")]
    round_pred: bool,

    /// Write raw probabilities to DX files, even if the config file rounds them
    #[arg(long, overrides_with = "round_pred")]
    no_round_pred: bool,

    /// Path to ONNX model file
    #[arg(short, long, required_unless_present = "list_providers")]
    model: Option<PathBuf>,

    /// Base path of the prediction files (<output>_train.txt, <output>_test.txt)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Prefix of DX file names
    #[arg(long)]
    prefix_dx: Option<String>,

    /// Label vocabulary file (text, CSV or JSON) [default: pharmacophore categories]
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// JSON configuration file; command line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Execution provider to use (cpu, cuda, tensorrt, coreml, rocm)
    #[arg(long, default_value = "cpu")]
    provider: String,

    /// List available execution providers and exit
    #[arg(long)]
    list_providers: bool,
}

/// Parse execution provider from CLI argument.
fn parse_provider(s: &str) -> Result<ExecutionProviderInfo> {
    ALL_EXECUTION_PROVIDERS
        .iter()
        .find(|p| p.as_str().eq_ignore_ascii_case(s))
        .copied()
        .ok_or_else(|| {
            let names: Vec<&str> = ALL_EXECUTION_PROVIDERS.iter().map(|p| p.as_str()).collect();
            Error::Config {
                reason: format!("unknown provider '{s}'. Valid providers: {}", names.join(", ")),
            }
        })
}

const fn provider_description(provider: ExecutionProviderInfo) -> &'static str {
    match provider {
        ExecutionProviderInfo::Cpu => "Always available",
        ExecutionProviderInfo::Cuda => "NVIDIA GPU acceleration",
        ExecutionProviderInfo::TensorRt => "NVIDIA GPU with optimization",
        ExecutionProviderInfo::CoreMl => "Apple Neural Engine acceleration (macOS)",
        ExecutionProviderInfo::Rocm => "AMD GPU acceleration",
    }
}

fn list_providers() -> Result<()> {
    init_runtime()?;

    match find_ort_library() {
        Some(path) => println!("ONNX Runtime library: {}", path.display()),
        None => println!("ONNX Runtime library: <using system library paths>"),
    }
    println!();

    let available = available_execution_providers();
    println!("Available execution providers:");
    for &provider in ALL_EXECUTION_PROVIDERS {
        let (symbol, suffix) = if available.contains(&provider) {
            ("✓", "")
        } else {
            ("✗", " (not available)")
        };
        println!(
            "  {symbol} {} - {}{suffix}",
            provider.as_str(),
            provider_description(provider)
        );
    }

    Ok(())
}

/// Value of a `--flag`/`--no-flag` pair; `None` when neither was given.
const fn switch(on: bool, off: bool) -> Option<bool> {
    if on {
        Some(true)
    } else if off {
        Some(false)
    } else {
        None
    }
}

/// Merge the optional config file with command line overrides.
fn build_config(args: &Args) -> Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(batch_size) = args.batch_size {
        config = config.with_batch_size(batch_size);
    }
    if let Some(resolution) = args.resolution {
        config = config.with_resolution(resolution);
    }
    if let Some(create_dx) = switch(args.create_dx, args.no_create_dx) {
        config = config.with_volume_output(create_dx);
    }
    if let Some(round_pred) = switch(args.round_pred, args.no_round_pred) {
        config = config.with_rounded_volume_values(round_pred);
    }
    if let Some(prefix) = &args.prefix_dx {
        config = config.with_volume_filename_prefix(prefix.clone());
    }
    if let Some(labels) = &args.labels {
        config = config.with_label_file(labels);
    }
    if let Some(output) = &args.output {
        config = config.with_output_base_path(output);
    }
    if let Some(top_dir) = &args.top_dir {
        config = config.with_volume_root(top_dir);
    }

    config.validate()?;
    Ok(config)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(e) = run_with_args(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run_with_args(args: &Args) -> Result<()> {
    if args.list_providers {
        return list_providers();
    }

    init_runtime()?;

    let requested_provider = parse_provider(&args.provider)?;
    let available = available_execution_providers();
    if !available.contains(&requested_provider) {
        let names: Vec<&str> = available.iter().map(|p| p.as_str()).collect();
        return Err(Error::Config {
            reason: format!(
                "{} provider not available\nAvailable providers: {}",
                requested_provider.as_str(),
                names.join(", ")
            ),
        });
    }

    let train_listing = args.train_data.as_ref().ok_or_else(|| Error::Config {
        reason: "--train-data is required".to_string(),
    })?;
    let model_path = args.model.as_ref().ok_or(Error::ModelPathRequired)?;
    let test_listing = args
        .test_data
        .clone()
        .unwrap_or_else(|| test_listing_for(train_listing));

    let config = build_config(args)?;
    let vocabulary = config.vocabulary()?;

    let builder = OnnxModel::builder().model_path(model_path);
    let builder = match requested_provider {
        ExecutionProviderInfo::Cpu => builder,
        ExecutionProviderInfo::Cuda => builder.with_cuda(),
        ExecutionProviderInfo::TensorRt => builder.with_tensorrt(),
        ExecutionProviderInfo::CoreMl => builder.with_coreml(),
        ExecutionProviderInfo::Rocm => builder.with_rocm(),
    };
    let model = builder.build()?;

    let data_root = config.volume_root.clone();
    let train = NpyGridSource::open(train_listing, &data_root)?;
    let test = NpyGridSource::open(&test_listing, &data_root)?;
    log::info!(
        "{} train and {} test complexes",
        train.complexes().len(),
        test.complexes().len()
    );

    let start = Instant::now();
    let mut pipeline = InferencePipeline::new(model, vocabulary, config)?;
    let (train_summary, test_summary) = pipeline.run(&train, &test)?;

    println!(
        "{} train and {} test points predicted in {:.1}s",
        train_summary.samples,
        test_summary.samples,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const BASE: [&str; 5] = ["pharmnn-infer", "--train-data", "data_train.txt", "-m", "m.onnx"];

    fn parse(extra: &[&str]) -> Args {
        Args::try_parse_from(BASE.iter().chain(extra)).unwrap()
    }

    fn config_file(json: &str) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), json).unwrap();
        file
    }

    #[test]
    fn test_unset_switches_keep_config_file() {
        let file = config_file(r#"{"create_volume_output": true, "round_volume_values": true}"#);
        let config = build_config(&parse(&["--config", file.path().to_str().unwrap()])).unwrap();
        assert!(config.create_volume_output);
        assert!(config.round_volume_values);
    }

    #[test]
    fn test_negated_switches_override_config_file() {
        let file = config_file(r#"{"create_volume_output": true, "round_volume_values": true}"#);
        let path = file.path().to_str().unwrap();
        let config =
            build_config(&parse(&["--config", path, "--no-create-dx", "--no-round-pred"])).unwrap();
        assert!(!config.create_volume_output);
        assert!(!config.round_volume_values);
    }

    #[test]
    fn test_last_switch_wins() {
        let args = parse(&["--create-dx", "--no-create-dx", "--no-round-pred", "--round-pred"]);
        let config = build_config(&args).unwrap();
        assert!(!config.create_volume_output);
        assert!(config.round_volume_values);
    }

    #[test]
    fn test_positive_switches_enable_defaults() {
        let config = build_config(&parse(&["--create-dx", "--round-pred"])).unwrap();
        assert!(config.create_volume_output);
        assert!(config.round_volume_values);
    }
}
