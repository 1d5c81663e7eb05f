//! CLI entry point for rust_hessio
//!
//! - `export`: read one or more inputs and write the run, telescope, pixel and MC shower
//!   tables
//! - `events`: print the triggered events of one input (raw sums or calibrated
//!   amplitudes)
//! - `summary`: print one `@;` summary line (or JSON object) per input
//!
//! Settings come from `config/hessio.toml` and `RUST_HESSIO_*` variables; command-line
//! flags override both. Ctrl-C stops reading at the next record boundary and still
//! flushes the export.
//!
//! # Usage
//!
//! ```bash
//! rust_hessio export run103.sim run104.sim --output-dir tables --array-layout 3HB1
//! rust_hessio events run103.sim --level 1 --max-pixels 5
//! rust_hessio summary - --json < run103.sim
//! ```

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rust_hessio::config::{HessioConfig, DEFAULT_CONFIG_PATH};
use rust_hessio::cursor::PullCursor;
use rust_hessio::dump::{DumpLevel, EventDump};
use rust_hessio::export::SinkRegistry;
use rust_hessio::ingest::{BatchIngest, StopFlag};
use rust_hessio::layout::{apply_layout, LayoutCatalog};
use rust_hessio::logging;
use rust_hessio::summary::SUMMARY_LEGEND;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "rust_hessio")]
#[command(about = "Ingest simulated telescope-array runs", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct Selection {
    /// Skip remaining data after so many triggered events
    #[arg(long)]
    max_events: Option<u64>,

    /// Array layout to extract
    #[arg(long)]
    array_layout: Option<String>,

    /// Layout reference table (TOML)
    #[arg(long)]
    layouts: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Export run, telescope, pixel and MC shower tables
    Export {
        /// Input files, `-` for standard input
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Sink format (csv, memory)
        #[arg(long)]
        format: Option<String>,

        #[command(flatten)]
        selection: Selection,
    },

    /// Print triggered events of one input
    Events {
        input: PathBuf,

        /// 0 = raw ADC sums, 1 = calibrated amplitudes
        #[arg(long)]
        level: Option<u8>,

        /// Pixels printed per telescope
        #[arg(long)]
        max_pixels: Option<usize>,

        #[command(flatten)]
        selection: Selection,
    },

    /// Print one run summary per input
    Summary {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// JSON lines instead of `@;` lines
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        selection: Selection,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = HessioConfig::load_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.application.log_level = level;
    }
    apply_overrides(&mut config, &cli.command)?;
    config.validate()?;
    logging::init_from_config(&config)?;

    let stop = StopFlag::new();
    let signal_stop = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop signal received; finishing the current record");
            signal_stop.raise();
        }
    });

    let command = cli.command;
    tokio::task::spawn_blocking(move || match command {
        Commands::Export { inputs, .. } => export(&config, &inputs, stop),
        Commands::Events { input, .. } => events(&config, &input, stop),
        Commands::Summary { inputs, json, .. } => summary(&config, &inputs, json, stop),
    })
    .await?
}

fn apply_overrides(config: &mut HessioConfig, command: &Commands) -> Result<()> {
    let selection = match command {
        Commands::Export {
            output_dir,
            format,
            selection,
            ..
        } => {
            config.export.enabled = true;
            if let Some(dir) = output_dir {
                config.export.output_dir = dir.clone();
            }
            if let Some(format) = format {
                config.export.format = format.clone();
            }
            selection
        }
        Commands::Events {
            level,
            max_pixels,
            selection,
            ..
        } => {
            config.export.enabled = false;
            if let Some(level) = level {
                config.ingest.dump_level = DumpLevel::try_from(*level)?;
            }
            if let Some(max) = max_pixels {
                config.ingest.max_print_pixels = *max;
            }
            selection
        }
        Commands::Summary { selection, .. } => {
            config.export.enabled = false;
            selection
        }
    };
    if selection.max_events.is_some() {
        config.ingest.max_events = selection.max_events;
    }
    if selection.array_layout.is_some() {
        config.layout.name = selection.array_layout.clone();
    }
    if selection.layouts.is_some() {
        config.layout.catalog = selection.layouts.clone();
    }
    Ok(())
}

fn load_layouts(config: &HessioConfig) -> Result<Option<LayoutCatalog>> {
    let Some(path) = config.layout.catalog.as_ref() else {
        return Ok(None);
    };
    let catalog = LayoutCatalog::from_file(path)
        .with_context(|| format!("loading layouts from {}", path.display()))?;
    Ok(Some(catalog))
}

fn batch(config: &HessioConfig, stop: StopFlag) -> Result<BatchIngest> {
    let mut ingest = BatchIngest::new(config.ingest_options()).with_stop_flag(stop);
    if let Some(catalog) = load_layouts(config)? {
        ingest = ingest.with_layouts(Box::new(catalog));
    }
    Ok(ingest)
}

fn export(config: &HessioConfig, inputs: &[PathBuf], stop: StopFlag) -> Result<()> {
    let sink = SinkRegistry::new()
        .create(&config.export.format, &config.export.output_dir)
        .context("creating export sink")?;
    let mut ingest = batch(config, stop)?.with_exporter(sink);

    let result = ingest.run_paths(inputs).cloned();
    // Flush whatever was written, also after a fatal stream error.
    let stats = ingest.finish();
    let totals = result?;

    info!(
        events = totals.events,
        mc_events = totals.mc_events,
        "Total number of events processed"
    );
    if let Some(stats) = stats.filter(|s| s.failures > 0) {
        warn!(failures = stats.failures, "Some rows could not be exported");
    }
    Ok(())
}

fn events(config: &HessioConfig, input: &Path, stop: StopFlag) -> Result<()> {
    let dump = EventDump::new(config.ingest.dump_level, config.ingest.max_print_pixels);
    let layouts = load_layouts(config)?;
    let max_events = config.ingest_options().max_events;

    let mut cursor = PullCursor::with_stop_flag(stop);
    cursor.open(input)?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut layout_generation = None;
    while let Some(event) = cursor.advance()? {
        if let (Some(name), Some(table)) = (config.layout.name.as_deref(), layouts.as_ref()) {
            if layout_generation != Some(event.generation) {
                apply_layout(cursor.aggregate_mut(), name, table);
                layout_generation = Some(event.generation);
            }
        }
        if let Some(run) = cursor.aggregate().run() {
            dump.write_event(&mut out, run)?;
        }
        if max_events.is_some_and(|max| cursor.events() >= max) {
            info!(events = cursor.events(), "Event limit reached");
            cursor.close()?;
            break;
        }
    }
    out.flush()?;
    info!(events = cursor.events(), "Total number of events processed");
    Ok(())
}

fn summary(config: &HessioConfig, inputs: &[PathBuf], json: bool, stop: StopFlag) -> Result<()> {
    let mut ingest = batch(config, stop)?;
    ingest.run_paths(inputs)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if !json {
        writeln!(out, "{SUMMARY_LEGEND}")?;
    }
    for summary in ingest.summaries() {
        if json {
            writeln!(out, "{}", serde_json::to_string(summary)?)?;
        } else {
            writeln!(out, "{summary}")?;
        }
    }
    Ok(())
}
