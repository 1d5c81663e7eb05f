//! Table export.
//!
//! [`TableExporter`] turns run-state snapshots into rows of four tables:
//!
//! | Table | Rows |
//! |---|---|
//! | `HEADER_RUN` | one per run, shared by all runs |
//! | `HEADER_TEL_<run>` | one per telescope, written at the run's first event |
//! | `HEADER_CAM_<run>` | one per pixel of every telescope, written with the telescope rows |
//! | `MC_SHOWER_<run>` | one per simulated shower |
//!
//! Export is best effort: sink failures are logged and counted in [`ExportStats`] and
//! never interrupt ingestion.

#[cfg(feature = "storage_csv")]
pub mod csv_sink;
pub mod schema;
pub mod sink;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{RunState, TelescopeSlot};
use crate::error::AppResult;
use crate::records::McShower;

#[cfg(feature = "storage_csv")]
pub use csv_sink::CsvSink;
pub use schema::{Column, ColumnKind};
pub use sink::{CellValue, ExportSink, MemorySink, MemoryTable, SinkRegistry, TableHandle};

use schema::{
    mc_shower_table, pixel_table, telescope_table, MC_SHOWER_COLUMNS, PIXEL_COLUMNS,
    RUN_HEADER_COLUMNS, RUN_HEADER_TABLE, TELESCOPE_COLUMNS,
};

/// Rows written and failures absorbed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    pub run_rows: u64,
    pub telescope_rows: u64,
    pub pixel_rows: u64,
    pub shower_rows: u64,
    /// Sink operations that failed.
    pub failures: u64,
}

#[derive(Debug)]
struct RunTables {
    run: i32,
    generation: u64,
    telescopes: Option<TableHandle>,
    pixels: Option<TableHandle>,
    showers: Option<TableHandle>,
    headers_written: bool,
}

/// Writes run-state content into an [`ExportSink`].
pub struct TableExporter<S: ExportSink> {
    sink: S,
    run_table: Option<TableHandle>,
    current: Option<RunTables>,
    stats: ExportStats,
}

fn open_table<S: ExportSink + ?Sized>(
    sink: &mut S,
    name: &str,
    columns: &[Column],
) -> AppResult<TableHandle> {
    match sink.locate_table(name)? {
        Some(handle) => Ok(handle),
        None => sink.create_table(name, columns),
    }
}

impl<S: ExportSink> TableExporter<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            run_table: None,
            current: None,
            stats: ExportStats::default(),
        }
    }

    pub fn stats(&self) -> &ExportStats {
        &self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn absorb<T>(&mut self, what: &str, result: AppResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.stats.failures += 1;
                warn!(operation = what, error = %err, "Export operation failed; continuing");
                None
            }
        }
    }

    /// Locates or creates the run's tables and appends its run-header row.
    pub fn on_run_opened(&mut self, run: &RunState) {
        let run_number = run.run_number();
        if self.run_table.is_none() {
            let table = open_table(&mut self.sink, RUN_HEADER_TABLE, &RUN_HEADER_COLUMNS);
            self.run_table = self.absorb("open run-header table", table);
        }

        let telescopes = open_table(&mut self.sink, &telescope_table(run_number), &TELESCOPE_COLUMNS);
        let telescopes = self.absorb("open telescope table", telescopes);
        let pixels = open_table(&mut self.sink, &pixel_table(run_number), &PIXEL_COLUMNS);
        let pixels = self.absorb("open pixel table", pixels);
        let showers = open_table(&mut self.sink, &mc_shower_table(run_number), &MC_SHOWER_COLUMNS);
        let showers = self.absorb("open MC shower table", showers);
        self.current = Some(RunTables {
            run: run_number,
            generation: run.generation,
            telescopes,
            pixels,
            showers,
            headers_written: false,
        });

        if let Some(table) = self.run_table {
            let appended = self.sink.append_row(table, &run_header_row(run));
            if self.absorb("append run-header row", appended).is_some() {
                self.stats.run_rows += 1;
            }
        }
        debug!(run = run_number, "Export tables ready");
    }

    fn current_for(&mut self, run: &RunState) -> Option<&mut RunTables> {
        self.current
            .as_mut()
            .filter(|t| t.run == run.run_number() && t.generation == run.generation)
    }

    /// Writes telescope and pixel rows. Only the first call per run writes anything.
    pub fn on_telescope_configured(&mut self, run: &RunState) {
        let Some(tables) = self.current_for(run) else {
            warn!(run = run.run_number(), "Telescope export for a run without tables; skipped");
            return;
        };
        if tables.headers_written {
            return;
        }
        tables.headers_written = true;
        let (tel_table, pix_table) = (tables.telescopes, tables.pixels);

        for tel in &run.telescopes {
            if let Some(table) = tel_table {
                let appended = self.sink.append_row(table, &telescope_row(tel));
                if self.absorb("append telescope row", appended).is_some() {
                    self.stats.telescope_rows += 1;
                }
            }
            if let Some(table) = pix_table {
                for pixel in 0..tel.num_pixels() {
                    let appended = self.sink.append_row(table, &pixel_row(tel, pixel));
                    if self.absorb("append pixel row", appended).is_some() {
                        self.stats.pixel_rows += 1;
                    }
                }
            }
        }
        info!(
            run = run.run_number(),
            telescopes = run.ntel(),
            "Wrote telescope and pixel headers"
        );
    }

    /// Appends the run's current MC shower as row `seq`.
    pub fn on_shower_updated(&mut self, run: &RunState, seq: u64) {
        let Some(shower) = run.mc_shower.as_ref() else {
            return;
        };
        let Some(table) = self.current_for(run).and_then(|t| t.showers) else {
            return;
        };
        let appended = self.sink.append_row(table, &shower_row(shower, seq));
        if self.absorb("append MC shower row", appended).is_some() {
            self.stats.shower_rows += 1;
        }
    }

    /// Flushes the sink and returns the final counters.
    pub fn finish(&mut self) -> ExportStats {
        let flushed = self.sink.flush();
        self.absorb("flush", flushed);
        info!(
            runs = self.stats.run_rows,
            telescopes = self.stats.telescope_rows,
            pixels = self.stats.pixel_rows,
            showers = self.stats.shower_rows,
            failures = self.stats.failures,
            "Export finished"
        );
        self.stats.clone()
    }
}

fn start_time(seconds: i64) -> String {
    chrono::DateTime::from_timestamp(seconds, 0)
        .map_or_else(|| seconds.to_string(), |t| t.to_rfc3339())
}

fn run_header_row(run: &RunState) -> Vec<CellValue> {
    let h = &run.header;
    vec![
        h.run.into(),
        start_time(h.time).into(),
        h.run_type.into(),
        h.tracking_mode.into(),
        h.direction[0].into(),
        h.direction[1].into(),
        h.offset_fov[0].into(),
        h.offset_fov[1].into(),
        h.reverse_flag.into(),
        h.conv_depth.into(),
        h.conv_ref_pos[0].into(),
        h.conv_ref_pos[1].into(),
        h.ntel().into(),
        h.min_tel_trig.into(),
        h.duration.into(),
        h.target.as_str().into(),
        h.observer.as_str().into(),
    ]
}

fn telescope_row(tel: &TelescopeSlot) -> Vec<CellValue> {
    let camera = tel.camera_settings.as_ref();
    vec![
        tel.tel_id.into(),
        tel.position[0].into(),
        tel.position[1].into(),
        tel.position[2].into(),
        camera.map_or(0.0, |c| c.flen).into(),
        camera.map_or(0.0, |c| c.mirror_area).into(),
        tel.exported_num_mirrors().into(),
        tel.num_pixels().into(),
        camera.map_or(0.0, |c| c.cam_rot).into(),
        tel.camera_organisation
            .as_ref()
            .map_or(0, |o| o.num_gains)
            .into(),
        tel.pixel_settings.as_ref().map_or(0, |p| p.sum_bins).into(),
    ]
}

fn pixel_row(tel: &TelescopeSlot, pixel: usize) -> Vec<CellValue> {
    let value = |column: Option<&Vec<f64>>| column.and_then(|v| v.get(pixel)).copied().unwrap_or(0.0);
    let camera = tel.camera_settings.as_ref();
    let drawer = tel
        .camera_organisation
        .as_ref()
        .and_then(|o| o.drawer.get(pixel).copied())
        .unwrap_or(-1);
    vec![
        tel.tel_id.into(),
        pixel.into(),
        value(camera.map(|c| &c.xpix)).into(),
        value(camera.map(|c| &c.ypix)).into(),
        value(camera.map(|c| &c.area)).into(),
        value(camera.map(|c| &c.size)).into(),
        drawer.into(),
    ]
}

fn shower_row(shower: &McShower, seq: u64) -> Vec<CellValue> {
    vec![
        seq.into(),
        shower.shower_num.into(),
        shower.primary_id.into(),
        shower.energy.into(),
        shower.azimuth.into(),
        shower.altitude.into(),
        shower.depth_start.into(),
        shower.h_first_int.into(),
        shower.xmax.into(),
        shower.hmax.into(),
        shower.emax.into(),
        shower.cmax.into(),
    ]
}
