use anyhow::{anyhow, Result};
use clap::{Arg, Command};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use clipscribe::{Config, Pipeline, WhisperTranscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("clipscribe")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Turns recorded videos into subtitled, web-optimized clips")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("FILE_OR_DIR")
                .help("Video file, or directory of videos to process")
                .required(true),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Root directory for generated files")
                .default_value("./output_files"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a clipscribe.toml config file"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .value_name("MODEL")
                .help("Correction model identifier (overrides config)"),
        )
        .arg(
            Arg::new("chunk-delay")
                .long("chunk-delay")
                .value_name("SECS")
                .help("Delay between correction chunks in seconds (overrides config)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    tracing_subscriber::fmt()
        .with_env_filter(if verbose {
            "clipscribe=debug,info"
        } else {
            "clipscribe=info,warn"
        })
        .init();

    let input = PathBuf::from(matches.get_one::<String>("input").expect("required"));
    let output_dir = PathBuf::from(matches.get_one::<String>("output-dir").expect("defaulted"));

    // Load configuration
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(Path::new(path))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };
    config.output.base_dir = output_dir;

    if let Some(model) = matches.get_one::<String>("model") {
        config.llm.model = model.clone();
    }
    if let Some(delay) = matches.get_one::<String>("chunk-delay") {
        config.correction.inter_chunk_delay_secs = delay
            .parse()
            .map_err(|_| anyhow!("invalid --chunk-delay value: {}", delay))?;
    }

    info!("🚀 clipscribe starting...");
    info!("📁 Input: {}", input.display());
    info!("📂 Output: {}", config.output.base_dir.display());

    if !input.exists() {
        return Err(anyhow!("input not found: {}", input.display()));
    }

    if config.stages.transcribe && !WhisperTranscriber::is_available().await {
        warn!("whisper command not found on PATH; the transcription stage will fail");
    }

    tokio::fs::create_dir_all(&config.output.base_dir).await?;

    // Building the pipeline resolves correction credentials, so a missing
    // API key stops the process before any media work starts.
    let pipeline = Pipeline::new(config)?;

    if input.is_dir() {
        let summary = pipeline.run_batch(&input).await?;
        info!(
            "🎉 Batch completed in {:.1}s",
            summary.total_time.as_secs_f64()
        );
        info!("✅ Successful: {}", summary.successful);
        info!("❌ Failed: {}", summary.failed);
        if summary.total > 0 {
            info!(
                "📊 Success rate: {:.1}%",
                summary.successful as f64 / summary.total as f64 * 100.0
            );
        }
        Ok(())
    } else {
        let outcome = pipeline.run_file(&input).await;
        match outcome.error {
            Some(err) => Err(anyhow!("{}: {}", input.display(), err)),
            None => {
                info!(
                    "🎉 Completed {} stage(s) in {:.1}s",
                    outcome.stages_completed.len(),
                    outcome.elapsed.as_secs_f64()
                );
                if outcome.chunks_failed > 0 {
                    warn!(
                        "⚠️ {} correction chunk(s) were replaced by placeholders",
                        outcome.chunks_failed
                    );
                }
                Ok(())
            }
        }
    }
}
