//! Batch ingestion of one or more inputs with optional table export.
//!
//! [`BatchIngest`] drives a [`Demultiplexer`] over each source in turn and reacts to its
//! dispatches: new runs open export tables, the first triggered event of a run applies
//! the array layout and writes the telescope and pixel tables, MC showers are appended
//! with a sequence number that keeps counting across inputs.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::aggregate::Aggregate;
use crate::demux::{DemuxStats, Demultiplexer, Dispatch};
use crate::error::AppResult;
use crate::export::{ExportSink, ExportStats, TableExporter};
use crate::layout::{apply_layout, passes_layout_trigger, LayoutTable};
use crate::records::EventKind;
use crate::stream::{FramedReader, RecordSource};
use crate::summary::RunSummary;

/// Cooperative cancellation flag shared between a signal handler and the reading loop.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// Stop reading once this many triggered events were processed, counted over all
    /// inputs.
    pub max_events: Option<u64>,
    /// Array layout applied at the first event of every run.
    pub layout: Option<String>,
}

/// Counters for one input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileTotals {
    pub records: u64,
    /// Triggered events read.
    pub events: u64,
    /// Triggered events with enough telescopes left in the layout.
    pub triggered: u64,
    pub mc_events: u64,
    /// Reading ended early on the event limit or a stop request.
    pub stopped: bool,
}

/// Counters over every input processed so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestTotals {
    pub files: u64,
    pub records: u64,
    pub events: u64,
    pub mc_events: u64,
}

/// Batch reader over a sequence of inputs.
pub struct BatchIngest {
    demux: Demultiplexer,
    exporter: Option<TableExporter<Box<dyn ExportSink>>>,
    layouts: Option<Box<dyn LayoutTable>>,
    options: IngestOptions,
    stop: StopFlag,
    totals: IngestTotals,
    headers_pending: bool,
    summaries: Vec<RunSummary>,
}

impl BatchIngest {
    pub fn new(options: IngestOptions) -> Self {
        Self {
            demux: Demultiplexer::new(),
            exporter: None,
            layouts: None,
            options,
            stop: StopFlag::new(),
            totals: IngestTotals::default(),
            headers_pending: false,
            summaries: Vec::new(),
        }
    }

    pub fn with_exporter(mut self, sink: Box<dyn ExportSink>) -> Self {
        self.exporter = Some(TableExporter::new(sink));
        self
    }

    pub fn with_layouts(mut self, layouts: Box<dyn LayoutTable>) -> Self {
        self.layouts = Some(layouts);
        self
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn totals(&self) -> &IngestTotals {
        &self.totals
    }

    pub fn aggregate(&self) -> &Aggregate {
        self.demux.aggregate()
    }

    pub fn demux_stats(&self) -> &DemuxStats {
        self.demux.stats()
    }

    pub fn export_stats(&self) -> Option<&ExportStats> {
        self.exporter.as_ref().map(TableExporter::stats)
    }

    /// One summary per input that left a run open.
    pub fn summaries(&self) -> &[RunSummary] {
        &self.summaries
    }

    fn event_limit_reached(&self) -> bool {
        self.options
            .max_events
            .is_some_and(|max| max > 0 && self.totals.events >= max)
    }

    /// Processes every input in order; `-` reads standard input. Stops early on a raised
    /// stop flag or the event limit.
    pub fn run_paths<P: AsRef<Path>>(&mut self, paths: &[P]) -> AppResult<&IngestTotals> {
        for path in paths {
            if self.stop.is_raised() || self.event_limit_reached() {
                break;
            }
            self.process_path(path)?;
        }
        info!(
            files = self.totals.files,
            events = self.totals.events,
            mc_events = self.totals.mc_events,
            "Ingestion finished"
        );
        Ok(&self.totals)
    }

    pub fn process_path(&mut self, path: impl AsRef<Path>) -> AppResult<FileTotals> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let mut reader = FramedReader::open(&path).map_err(|e| {
            error!(path = %path.display(), error = %e, "Cannot open input file");
            e
        })?;
        info!(path = %path.display(), "Input file has been opened");
        self.process_source(&mut reader)
    }

    /// Reads `source` to its end and closes it. A fatal error closes the source before
    /// it is returned.
    pub fn process_source<S: RecordSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> AppResult<FileTotals> {
        let mut file = FileTotals::default();
        let outcome = self.drain(source, &mut file);
        let closed = source.close();
        outcome?;
        closed?;

        self.totals.files += 1;
        if let Some(run) = self.demux.aggregate().run() {
            self.summaries
                .push(RunSummary::from_run(run, file.mc_events, file.triggered));
        }
        info!(
            records = file.records,
            events = file.events,
            triggered = file.triggered,
            mc_events = file.mc_events,
            total_events = self.totals.events,
            total_mc_events = self.totals.mc_events,
            "Input processed"
        );
        Ok(file)
    }

    fn drain<S: RecordSource + ?Sized>(
        &mut self,
        source: &mut S,
        file: &mut FileTotals,
    ) -> AppResult<()> {
        loop {
            if self.stop.is_raised() {
                info!("Stop requested; closing input");
                file.stopped = true;
                return Ok(());
            }
            if self.event_limit_reached() {
                info!(max_events = ?self.options.max_events, "Event limit reached; skipping the rest of the input");
                file.stopped = true;
                return Ok(());
            }
            let Some(dispatch) = self.demux.pump(source)? else {
                return Ok(());
            };
            file.records += 1;
            self.totals.records += 1;
            self.react(dispatch, file);
        }
    }

    fn react(&mut self, dispatch: Dispatch, file: &mut FileTotals) {
        match dispatch {
            Dispatch::RunOpened { run } => {
                self.headers_pending = true;
                debug!(run, "Run opened");
                if let (Some(exporter), Some(state)) =
                    (self.exporter.as_mut(), self.demux.aggregate().run())
                {
                    exporter.on_run_opened(state);
                }
            }
            Dispatch::EventUpdated(EventKind::Triggered) => {
                self.totals.events += 1;
                file.events += 1;
                if self.headers_pending {
                    self.headers_pending = false;
                    self.first_event_of_run();
                }
                if self.demux.aggregate().run().is_some_and(passes_layout_trigger) {
                    file.triggered += 1;
                }
            }
            Dispatch::ShowerUpdated => {
                self.totals.mc_events += 1;
                file.mc_events += 1;
                if let (Some(exporter), Some(state)) =
                    (self.exporter.as_mut(), self.demux.aggregate().run())
                {
                    exporter.on_shower_updated(state, self.totals.mc_events);
                }
            }
            _ => {}
        }
    }

    fn first_event_of_run(&mut self) {
        if let Some(name) = self.options.layout.as_deref() {
            match self.layouts.as_deref() {
                Some(table) => {
                    apply_layout(self.demux.aggregate_mut(), name, table);
                }
                None => warn!(layout = name, "No layout table loaded; layout not applied"),
            }
        }
        if let (Some(exporter), Some(state)) =
            (self.exporter.as_mut(), self.demux.aggregate().run())
        {
            exporter.on_telescope_configured(state);
        }
    }

    /// Flushes the export, if any, and returns its counters.
    pub fn finish(&mut self) -> Option<ExportStats> {
        self.exporter.as_mut().map(TableExporter::finish)
    }
}
