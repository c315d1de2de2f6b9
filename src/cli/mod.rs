//! HAR command-line interface
//!
//! Pipeline steps from raw dataset to running service: preprocess, train,
//! export, verify, demo and serve.

use clap::{Parser, Subcommand};
use colored::*;
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::activity::Activity;
use crate::export::{load_artifact, ExportConfig, Exporter};
use crate::inference::{InferenceConfig, InferenceEngine};
use crate::model::{HarNetwork, ModelConfig};
use crate::preprocessing::{to_sequences, PreprocessingConfig, Preprocessor, ProcessedData};
use crate::training::{evaluate, TrainedModel, Trainer, TrainingConfig};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
    let _ = std::io::stdout().flush();
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "har")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Human activity recognition: preprocess, train, export and serve a GRU classifier")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize the raw dataset and persist the processed arrays
    Preprocess {
        /// Root of the raw dataset (contains train/ and test/)
        #[arg(short, long, default_value = "data/raw/UCI HAR Dataset")]
        raw_dir: PathBuf,

        /// Output directory for the processed arrays
        #[arg(short, long, default_value = "data/processed")]
        output: PathBuf,
    },

    /// Train the GRU classifier on processed data
    Train {
        /// Directory written by `preprocess`
        #[arg(short, long, default_value = "data/processed")]
        data: PathBuf,

        /// Checkpoint file to write
        #[arg(short, long, default_value = "models/har_gru_model.bin")]
        output: PathBuf,

        #[arg(long, default_value = "20")]
        epochs: usize,

        #[arg(long, default_value = "32")]
        batch_size: usize,

        #[arg(long, default_value = "0.2")]
        validation_split: f64,

        #[arg(long, default_value = "0.001")]
        learning_rate: f32,

        /// Two GRU layers (64 → 32) instead of one
        #[arg(long)]
        stacked: bool,

        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Export a checkpoint to the serving directory and quantized file
    Export {
        /// Trained checkpoint
        #[arg(short, long, default_value = "models/har_gru_model.bin")]
        model: PathBuf,

        /// Output directory for the artifacts
        #[arg(short, long, default_value = "models")]
        output: PathBuf,

        /// Skip the int8 artifact
        #[arg(long)]
        no_quantize: bool,
    },

    /// Load an artifact and run a zero-input inference
    Verify {
        /// Serving directory or quantized file
        #[arg(short, long, default_value = "models/har_gru_savedmodel")]
        model: PathBuf,
    },

    /// Predict random test samples and report accuracy
    Demo {
        /// Serving directory or quantized file
        #[arg(short, long, default_value = "models/har_gru_savedmodel")]
        model: PathBuf,

        /// Directory written by `preprocess`
        #[arg(short, long, default_value = "data/processed")]
        data: PathBuf,

        /// Number of random test samples to show
        #[arg(short, long, default_value = "100")]
        samples: usize,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Start the inference server
    Serve {
        /// Server port
        #[arg(short, long, env = "API_PORT", default_value = "8000")]
        port: u16,

        /// Server host
        #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Serving directory or quantized file
        #[arg(short, long, env = "MODEL_PATH", default_value = "models/har_gru_savedmodel")]
        model: PathBuf,
    },
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_preprocess(raw_dir: &Path, output: &Path) -> anyhow::Result<()> {
    section("Preprocess");

    let config = PreprocessingConfig::new()
        .with_raw_dir(raw_dir)
        .with_processed_dir(output);

    step_run(&format!("Normalizing {}", raw_dir.display()));
    let start = Instant::now();
    let mut preprocessor = Preprocessor::new(config);
    let data = preprocessor.run()?;
    step_done(&format!("{:?}", start.elapsed()));

    println!();
    println!("  {:<12} {:?}", muted("X_train"), data.x_train.dim());
    println!("  {:<12} {:?}", muted("X_test"), data.x_test.dim());
    println!("  {:<12} {}", muted("y_train"), data.y_train.len());
    println!("  {:<12} {}", muted("y_test"), data.y_test.len());
    println!();
    step_ok(&format!("Saved to {}", output.display()));
    println!();
    Ok(())
}

pub struct TrainArgs {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    pub learning_rate: f32,
    pub stacked: bool,
    pub seed: u64,
}

pub fn cmd_train(data_dir: &Path, output: &Path, args: TrainArgs) -> anyhow::Result<()> {
    section("Train");

    step_run("Loading processed data");
    let data = ProcessedData::load(data_dir)?;
    let x_train = to_sequences(&data.x_train);
    let x_test = to_sequences(&data.x_test);
    step_done(&format!("train {:?} · test {:?}", x_train.dim(), x_test.dim()));

    let base = if args.stacked { ModelConfig::stacked() } else { ModelConfig::new() };
    let model_config = base
        .with_input(x_train.dim().1, x_train.dim().2)
        .with_seed(args.seed);
    let training = TrainingConfig::new()
        .with_epochs(args.epochs)
        .with_batch_size(args.batch_size)
        .with_validation_split(args.validation_split)
        .with_learning_rate(args.learning_rate)
        .with_random_state(args.seed);

    let mut trainer = Trainer::new(model_config, training.clone())?;
    print_summary(trainer.network());

    let start = Instant::now();
    let history = trainer.fit(&x_train, &data.y_train)?.clone();
    step_ok(&format!("Trained {} epochs in {:.1?}", history.len(), start.elapsed()));

    step_run("Evaluating on test split");
    let eval = trainer.evaluate(&x_test, &data.y_test)?;
    step_done(&format!("{} samples", eval.n_samples));

    let checkpoint = TrainedModel::new(trainer.into_network(), training, history).with_test_evaluation(eval);
    checkpoint.save(output)?;

    println!();
    println!("  {:<16} {}", muted("Test accuracy"), format!("{:.4}", eval.accuracy).white().bold());
    println!("  {:<16} {}", muted("Test loss"), format!("{:.4}", eval.loss).white());
    println!();
    step_ok(&format!("Saved to {}", output.display()));
    println!();
    Ok(())
}

fn print_summary(network: &HarNetwork) {
    println!();
    println!("  {:<12} {:<16} {:>10}", muted("Layer"), muted("Output"), muted("Params"));
    println!("  {}", dim(&"─".repeat(40)));
    for row in network.summary() {
        println!("  {:<12} {:<16} {:>10}", row.name, row.output_shape, row.params);
    }
    println!("  {}", dim(&"─".repeat(40)));
    println!("  {:<29} {:>10}", muted("Total"), network.n_params());
    println!();
}

pub fn cmd_export(model: &Path, output: &Path, quantize: bool) -> anyhow::Result<()> {
    section("Export");

    step_run(&format!("Loading {}", model.display()));
    let checkpoint = TrainedModel::load(model)?;
    step_done(&format!("{} params", checkpoint.network.n_params()));

    step_run("Writing artifacts");
    let exporter = Exporter::new(ExportConfig::new(output).with_quantize(quantize));
    let report = exporter.export(&checkpoint)?;
    step_done("");

    step_ok(&format!("Serving directory {}", report.serving_dir.display()));
    if let (Some(path), Some(bytes)) = (&report.quantized, report.quantized_bytes) {
        step_ok(&format!(
            "Quantized artifact {} ({:.1} KB weights, {:.1}x smaller)",
            path.display(),
            bytes as f64 / 1024.0,
            (report.n_params * 4) as f64 / bytes.max(1) as f64
        ));
    }
    println!();
    Ok(())
}

pub fn cmd_verify(model: &Path) -> anyhow::Result<()> {
    section("Verify");

    step_run(&format!("Loading {}", model.display()));
    let artifact = load_artifact(model)?;
    step_done(&format!("{:?} weights", artifact.metadata.weight_format));

    println!();
    println!("  {:<12} {}", muted("Signature"), artifact.signature.name);
    for t in &artifact.signature.inputs {
        println!("  {:<12} {} {:?}", muted("  input"), t.name, t.shape);
    }
    for t in &artifact.signature.outputs {
        println!("  {:<12} {} {:?}", muted("  output"), t.name, t.shape);
    }
    println!();

    let engine = InferenceEngine::from_artifact(artifact, InferenceConfig::default())?;
    let prediction = engine.predict(&vec![0.0; engine.n_features()])?;
    println!("  {}", muted("Zero-input output"));
    for (activity, p) in prediction.probabilities.iter() {
        println!("  {:<20} {:.6}", activity.name(), p);
    }
    println!();
    step_ok("Artifact verified");
    println!();
    Ok(())
}

pub fn cmd_demo(model: &Path, data_dir: &Path, samples: usize, seed: Option<u64>) -> anyhow::Result<()> {
    section("Demo");

    step_run("Loading model and test data");
    let engine = InferenceEngine::load(model, InferenceConfig::default())?;
    let data = ProcessedData::load(data_dir)?;
    step_done(&format!("{} test samples", data.y_test.len()));

    let n_test = data.y_test.len();
    let amount = samples.min(n_test);
    let mut rng = match seed {
        Some(s) => Xoshiro256PlusPlus::seed_from_u64(s),
        None => Xoshiro256PlusPlus::from_entropy(),
    };
    let picked = sample(&mut rng, n_test, amount).into_vec();

    section("Random sample results");
    let mut correct = 0;
    for &i in &picked {
        let features: Vec<f32> = data.x_test.row(i).to_vec();
        let prediction = engine.predict(&features)?;
        let actual = Activity::from_index(data.y_test[i] as usize)?;
        let mark = if prediction.label == actual {
            correct += 1;
            ok("✓")
        } else {
            "✗".red()
        };
        println!(
            "  {} {:<6} {:<20} {} {}",
            mark,
            i,
            prediction.label.name(),
            muted("actual"),
            actual.name()
        );
    }

    println!();
    println!(
        "  {:<20} {}/{} = {}",
        muted("Mini accuracy"),
        correct,
        amount,
        format!("{:.1}%", 100.0 * correct as f64 / amount.max(1) as f64).white().bold()
    );

    step_run("Evaluating full test split");
    let eval = evaluate(engine.network(), &to_sequences(&data.x_test), &data.y_test, 256)?;
    step_done("");
    println!("  {:<20} {}", muted("Full test accuracy"), format!("{:.4}", eval.accuracy).white().bold());
    println!();
    Ok(())
}

// ─── Serve ─────────────────────────────────────────────────────────────────────

pub async fn cmd_serve(host: &str, port: u16, model: &Path) -> anyhow::Result<()> {
    use crate::server::{run_server, ServerConfig};

    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "HAR inference server".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("Model  ", &model.display().to_string()));
    line_box(&kv("Predict", &format!("POST http://{}:{}/predict", host, port)));
    line_box(&kv("Notify ", &format!("POST http://{}:{}/notify", host, port)));
    line_box(&kv("Health ", &format!("GET  http://{}:{}/health", host, port)));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box_center(&format!("{}", dim("ctrl+c to stop")));
    line_box_empty();
    line_box_bottom();
    println!();

    let config = ServerConfig::default()
        .with_address(host, port)
        .with_model_path(model);

    run_server(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_train_defaults() {
        let cli = Cli::try_parse_from(["har", "train"]).unwrap();
        match cli.command {
            Commands::Train { epochs, batch_size, stacked, .. } => {
                assert_eq!(epochs, 20);
                assert_eq!(batch_size, 32);
                assert!(!stacked);
            }
            _ => panic!("expected train"),
        }
    }

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", "hi".red());
        assert_eq!(strip_ansi(&colored), "hi");
    }
}
