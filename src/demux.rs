//! Block demultiplexer.
//!
//! Takes one raw record at a time, decides what kind it is, decodes it and stores the
//! result in the right place of the run-state [`Aggregate`]. Every record yields exactly
//! one [`Dispatch`]; conditions that make the rest of the stream meaningless are returned
//! as errors instead.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::aggregate::Aggregate;
use crate::decode::decode;
use crate::error::{AppResult, HessioError};
use crate::records::{
    requires_run_header, EventKind, RecordCategory, RecordKind, TypedRecord,
};
use crate::stream::{RawRecord, RecordSource};

/// Why a record did not change the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Run-scoped record (type code given) seen while no run was open.
    BeforeRunHeader(u32),
    /// Type code of no known record kind.
    Unrecognized(u32),
    /// Recognized kind whose content is not kept.
    Deferred(RecordKind),
    /// Payload could not be decoded.
    DecodeFailed(RecordKind),
    /// Photon statistics without a run that has telescopes.
    NoTelescopes,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::BeforeRunHeader(code) => {
                write!(f, "type {code} before any run header")
            }
            IgnoreReason::Unrecognized(code) => write!(f, "unrecognized type {code}"),
            IgnoreReason::Deferred(kind) => write!(f, "{kind} not kept"),
            IgnoreReason::DecodeFailed(kind) => write!(f, "{kind} could not be decoded"),
            IgnoreReason::NoTelescopes => f.write_str("no run with telescopes"),
        }
    }
}

/// Effect of one record on the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A run header opened run `run`.
    RunOpened { run: i32 },
    /// A run-scoped block other than the run header was stored.
    RunUpdated(RecordKind),
    /// A configuration block was stored for the telescope at `position`.
    TelescopeConfigured { position: usize, block: RecordKind },
    /// The current event was replaced.
    EventUpdated(EventKind),
    ShowerUpdated,
    McEventUpdated,
    Ignored(IgnoreReason),
}

/// Per-outcome record counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemuxStats {
    pub records: u64,
    pub runs: u64,
    pub triggered_events: u64,
    pub calibration_events: u64,
    pub showers: u64,
    pub ignored: u64,
    /// Telescope entries inside events that named telescopes outside the run.
    pub skipped_telescopes: u64,
}

/// Routes records into an [`Aggregate`] it owns.
#[derive(Debug, Default)]
pub struct Demultiplexer {
    aggregate: Aggregate,
    warned_types: HashSet<u32>,
    stats: DemuxStats,
}

impl Demultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aggregate(&self) -> &Aggregate {
        &self.aggregate
    }

    pub fn aggregate_mut(&mut self) -> &mut Aggregate {
        &mut self.aggregate
    }

    pub fn stats(&self) -> &DemuxStats {
        &self.stats
    }

    /// Releases the live run, if any. Warning suppression for unrecognized types is kept.
    pub fn release_run(&mut self) -> bool {
        self.aggregate.close_run()
    }

    /// Pulls the next record from `source` and dispatches it. `Ok(None)` at end of stream.
    pub fn pump<S: RecordSource + ?Sized>(&mut self, source: &mut S) -> AppResult<Option<Dispatch>> {
        match source.next_record()? {
            Some(record) => self.dispatch(record).map(Some),
            None => Ok(None),
        }
    }

    /// Applies one record to the aggregate.
    pub fn dispatch(&mut self, record: RawRecord) -> AppResult<Dispatch> {
        self.stats.records += 1;
        let outcome = self.route(record)?;
        match outcome {
            Dispatch::RunOpened { .. } => self.stats.runs += 1,
            Dispatch::EventUpdated(EventKind::Triggered) => self.stats.triggered_events += 1,
            Dispatch::EventUpdated(EventKind::Calibration) => self.stats.calibration_events += 1,
            Dispatch::ShowerUpdated => self.stats.showers += 1,
            Dispatch::Ignored(_) => self.stats.ignored += 1,
            _ => {}
        }
        Ok(outcome)
    }

    fn route(&mut self, record: RawRecord) -> AppResult<Dispatch> {
        let RawRecord {
            type_code,
            ident,
            payload,
        } = record;

        if requires_run_header(type_code) && !self.aggregate.is_open() {
            warn!(type_code, "Data block of type {type_code} precedes the run header; skipped");
            return Ok(Dispatch::Ignored(IgnoreReason::BeforeRunHeader(type_code)));
        }

        let kind = match RecordKind::try_from(type_code) {
            Ok(kind) => kind,
            Err(code) => {
                if self.warned_types.insert(code) {
                    warn!(type_code = code, "Ignoring data block type {code}");
                }
                return Ok(Dispatch::Ignored(IgnoreReason::Unrecognized(code)));
            }
        };

        match kind.category() {
            RecordCategory::Deferred => {
                trace!(%kind, "Skipping block");
                return Ok(Dispatch::Ignored(IgnoreReason::Deferred(kind)));
            }
            RecordCategory::TelescopeConfig => return self.configure_telescope(kind, ident, &payload),
            RecordCategory::RunScope | RecordCategory::Event => {}
        }

        if kind == RecordKind::McTelArray && self.aggregate.run().map_or(true, |r| r.ntel() == 0) {
            trace!("Photon statistics without a run; skipped");
            return Ok(Dispatch::Ignored(IgnoreReason::NoTelescopes));
        }

        let typed = match decode(kind, &payload) {
            Ok(typed) => typed,
            Err(source) if kind == RecordKind::RunHeader => {
                return Err(HessioError::Decode { kind, source });
            }
            Err(err) => {
                warn!(%kind, ident, error = %err, "Failed to decode block; skipped");
                return Ok(Dispatch::Ignored(IgnoreReason::DecodeFailed(kind)));
            }
        };

        if let TypedRecord::RunHeader(header) = typed {
            let run = self.aggregate.open_run(header)?;
            return Ok(Dispatch::RunOpened {
                run: run.run_number(),
            });
        }

        let Some(run) = self.aggregate.run_mut() else {
            warn!(%kind, "Block outside of any run; skipped");
            return Ok(Dispatch::Ignored(IgnoreReason::BeforeRunHeader(type_code)));
        };

        let dispatch = match typed {
            TypedRecord::McRunHeader(h) => {
                run.mc_run_header = Some(h);
                Dispatch::RunUpdated(kind)
            }
            TypedRecord::RunStatistics(s) => {
                run.run_stat = Some(s);
                Dispatch::RunUpdated(kind)
            }
            TypedRecord::McRunStatistics(s) => {
                run.mc_run_stat = Some(s);
                Dispatch::RunUpdated(kind)
            }
            TypedRecord::Event(event) => {
                let skipped =
                    run.current_event
                        .load(&run.index, ident, EventKind::Triggered, event);
                self.note_skipped(kind, ident, &skipped);
                Dispatch::EventUpdated(EventKind::Triggered)
            }
            TypedRecord::CalibrationEvent(cal) => {
                let skipped =
                    run.current_event
                        .load(&run.index, ident, EventKind::Calibration, cal.event);
                run.current_event.calibration_type = Some(cal.calibration_type);
                self.note_skipped(kind, ident, &skipped);
                Dispatch::EventUpdated(EventKind::Calibration)
            }
            TypedRecord::McShower(shower) => {
                run.mc_shower = Some(shower);
                Dispatch::ShowerUpdated
            }
            TypedRecord::McEvent(event) => {
                run.mc_event.event = Some(event);
                Dispatch::McEventUpdated
            }
            TypedRecord::McPeSum(sum) => {
                if sum.num_pe.len() > run.ntel() {
                    warn!(
                        entries = sum.num_pe.len(),
                        ntel = run.ntel(),
                        "Photo-electron sums list more telescopes than the run"
                    );
                }
                run.mc_event.pe_sum = Some(sum);
                Dispatch::McEventUpdated
            }
            TypedRecord::McTelArray(array) => {
                let skipped = run.mc_event.store_photons(&run.index, array);
                self.note_skipped(kind, ident, &skipped);
                Dispatch::McEventUpdated
            }
            TypedRecord::Skipped(kind) => Dispatch::Ignored(IgnoreReason::Deferred(kind)),
            TypedRecord::RunHeader(_) | TypedRecord::Telescope(_) => {
                unreachable!("handled before the run lookup")
            }
        };
        Ok(dispatch)
    }

    fn configure_telescope(
        &mut self,
        kind: RecordKind,
        ident: i32,
        payload: &[u8],
    ) -> AppResult<Dispatch> {
        let Some(run) = self.aggregate.run_mut() else {
            return Ok(Dispatch::Ignored(IgnoreReason::BeforeRunHeader(kind.code())));
        };
        let tel_id = kind.telescope_id(ident).unwrap_or(ident);
        let position = run
            .index
            .position(tel_id)
            .ok_or(HessioError::UnknownTelescope { kind, tel_id })?;

        let block = match decode(kind, payload) {
            Ok(TypedRecord::Telescope(block)) => block,
            Ok(other) => {
                warn!(%kind, tel_id, ?other, "Unexpected block content; skipped");
                return Ok(Dispatch::Ignored(IgnoreReason::DecodeFailed(kind)));
            }
            Err(err) => {
                warn!(%kind, tel_id, error = %err, "Failed to decode block; skipped");
                return Ok(Dispatch::Ignored(IgnoreReason::DecodeFailed(kind)));
            }
        };
        let block_kind = block.kind();
        if let Some(slot) = run.telescopes.get_mut(position) {
            slot.store(block);
        }
        debug!(kind = %block_kind, tel_id, position, "Stored telescope configuration");
        Ok(Dispatch::TelescopeConfigured {
            position,
            block: block_kind,
        })
    }

    fn note_skipped(&mut self, kind: RecordKind, ident: i32, skipped: &[i32]) {
        for tel_id in skipped {
            warn!(%kind, event = ident, tel_id, "Telescope {tel_id} is not part of the run; skipped");
        }
        self.stats.skipped_telescopes += skipped.len() as u64;
    }
}
