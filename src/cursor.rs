//! Pull cursor: one triggered event at a time.
//!
//! The cursor owns a demultiplexer and a bound record source. [`PullCursor::advance`]
//! feeds records to the demultiplexer until a triggered event has been loaded; all other
//! records still update the run state on the way. Once the stream ends or fails, the
//! cursor stays at its end.

use std::path::Path;

use tracing::{debug, error, info};

use crate::accessor::Accessor;
use crate::aggregate::Aggregate;
use crate::demux::{DemuxStats, Demultiplexer, Dispatch};
use crate::error::AppResult;
use crate::ingest::StopFlag;
use crate::records::EventKind;
use crate::stream::{FramedReader, RecordSource};

/// Identifies the event the cursor stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHandle {
    /// Event identifier from the record header.
    pub event_id: i32,
    pub run: i32,
    /// Generation of the run the event belongs to.
    pub generation: u64,
}

/// Stateful reader yielding triggered events.
pub struct PullCursor {
    demux: Demultiplexer,
    source: Option<Box<dyn RecordSource>>,
    stop: StopFlag,
    terminated: bool,
    events: u64,
}

impl Default for PullCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl PullCursor {
    pub fn new() -> Self {
        Self::with_stop_flag(StopFlag::new())
    }

    /// Cursor that gives up as soon as `stop` is raised.
    pub fn with_stop_flag(stop: StopFlag) -> Self {
        Self {
            demux: Demultiplexer::new(),
            source: None,
            stop,
            terminated: false,
            events: 0,
        }
    }

    /// Binds a new source. A previously bound source is closed and the run it produced
    /// is released first.
    pub fn bind<S: RecordSource + 'static>(&mut self, source: S) -> AppResult<()> {
        let closed = self.close();
        if self.demux.release_run() {
            debug!("Released previous run on rebind");
        }
        self.source = Some(Box::new(source));
        self.terminated = false;
        self.events = 0;
        closed
    }

    /// Binds a framed file; `-` reads standard input.
    pub fn open(&mut self, path: impl AsRef<Path>) -> AppResult<()> {
        let path = path.as_ref();
        let reader = FramedReader::open(path)?;
        info!(path = %path.display(), "Input file has been opened");
        self.bind(reader)
    }

    /// Advances to the next triggered event. `Ok(None)` once the stream is exhausted,
    /// stopped, or after an earlier error.
    pub fn advance(&mut self) -> AppResult<Option<EventHandle>> {
        if self.terminated {
            return Ok(None);
        }
        loop {
            if self.stop.is_raised() {
                info!("Stop requested; closing input");
                self.finish()?;
                return Ok(None);
            }
            let Some(source) = self.source.as_mut() else {
                return Ok(None);
            };
            match self.demux.pump(source) {
                Ok(Some(Dispatch::EventUpdated(EventKind::Triggered))) => {
                    self.events += 1;
                    return Ok(self.handle());
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!(events = self.events, "End of input");
                    self.finish()?;
                    return Ok(None);
                }
                Err(err) => {
                    error!(error = %err, "Input terminated by error");
                    if let Err(close_err) = self.finish() {
                        error!(error = %close_err, "Failed to close input");
                    }
                    return Err(err);
                }
            }
        }
    }

    fn finish(&mut self) -> AppResult<()> {
        self.terminated = true;
        self.close()
    }

    fn handle(&self) -> Option<EventHandle> {
        let run = self.demux.aggregate().run()?;
        Some(EventHandle {
            event_id: run.current_event.event_id,
            run: run.run_number(),
            generation: run.generation,
        })
    }

    /// Releases the source. The run state stays readable. Idempotent.
    pub fn close(&mut self) -> AppResult<()> {
        match self.source.take() {
            Some(mut source) => source.close(),
            None => Ok(()),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Triggered events delivered since the last bind.
    pub fn events(&self) -> u64 {
        self.events
    }

    pub fn accessor(&self) -> Accessor<'_> {
        Accessor::new(self.demux.aggregate())
    }

    pub fn aggregate(&self) -> &Aggregate {
        self.demux.aggregate()
    }

    /// Mutable run state, for marking telescopes in or out of an array layout.
    pub fn aggregate_mut(&mut self) -> &mut Aggregate {
        self.demux.aggregate_mut()
    }

    pub fn stats(&self) -> &DemuxStats {
        self.demux.stats()
    }
}
