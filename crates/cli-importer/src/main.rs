use anyhow::{Context, Result};
use clap::Parser;
use importer::{ImportConfig, ImportHooks, Importer};
use log::info;
use std::path::PathBuf;

/// Batch clip importer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Folder the capture device writes clips into (overrides config)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Folder imported clips are exported to (overrides config)
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Path to configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logger - use RUST_LOG env var or default to info level
    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp_secs().init();

    let mut cfg = ImportConfig::load_config(args.config.as_deref())
        .context("Failed to load configuration")?;
    if let Some(input) = args.input {
        cfg.input_dir = input;
    }
    if let Some(export) = args.export {
        cfg.export_dir = export;
    }

    info!("Clip import starting");
    info!("  Input folder: {}", cfg.input_dir.display());
    info!("  Export folder: {}", cfg.export_dir.display());
    info!("  Clip extension: .{}", cfg.clip_extension);

    let hooks = ImportHooks::new(
        |done, total| println!("[{}/{}]", done, total),
        |line| println!("{}", line),
    );

    let report = Importer::new(cfg, hooks).run().await?;

    println!(
        "Done: {} imported, {} skipped, {} failed ({} examined)",
        report.imported,
        report.skipped,
        report.failed.len(),
        report.total
    );

    if !report.failed.is_empty() {
        for path in &report.failed {
            eprintln!("failed: {}", path.display());
        }
        std::process::exit(1);
    }

    Ok(())
}
