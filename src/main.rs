//! har - Main Entry Point
//!
//! Preprocess, train, export, verify, demo and serve the activity classifier.

use clap::Parser;
use har_gru::cli::{
    cmd_demo, cmd_export, cmd_preprocess, cmd_serve, cmd_train, cmd_verify, Cli, Commands, TrainArgs,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "har=info,har_gru=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Preprocess { raw_dir, output } => {
            cmd_preprocess(&raw_dir, &output)?;
        }
        Commands::Train { data, output, epochs, batch_size, validation_split, learning_rate, stacked, seed } => {
            let args = TrainArgs { epochs, batch_size, validation_split, learning_rate, stacked, seed };
            cmd_train(&data, &output, args)?;
        }
        Commands::Export { model, output, no_quantize } => {
            cmd_export(&model, &output, !no_quantize)?;
        }
        Commands::Verify { model } => {
            cmd_verify(&model)?;
        }
        Commands::Demo { model, data, samples, seed } => {
            cmd_demo(&model, &data, samples, seed)?;
        }
        Commands::Serve { port, host, model } => {
            cmd_serve(&host, port, &model).await?;
        }
    }

    Ok(())
}
