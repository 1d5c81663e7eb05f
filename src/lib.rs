//! # rust_hessio
//!
//! Ingestion of simulated telescope-array runs. A run arrives as a stream of typed
//! records (run header, per-telescope camera configuration, events, Monte-Carlo truth);
//! this crate assembles them into an in-memory run state and serves two consumers:
//! a batch exporter writing relational tables and a pull cursor that hands out one
//! triggered event at a time.
//!
//! ## Crate Structure
//!
//! - **`stream`**: record framing, the `RecordSource` trait, file and in-memory sources.
//! - **`records`**: record kinds and the decoded block types.
//! - **`decode`**: payload decoding and shape validation per record kind.
//! - **`telescope_index`**: telescope identifier to position lookup.
//! - **`aggregate`**: the run-state aggregate and its open/close lifecycle.
//! - **`demux`**: the block demultiplexer routing records into the aggregate.
//! - **`calibrate`**: raw ADC sums to calibrated photo-electron amplitudes.
//! - **`layout`**: array-layout selection by mirror-area class and identifier lists.
//! - **`cursor`** and **`accessor`**: event-at-a-time reading and the query surface.
//! - **`export`**: table schemas, sinks (CSV, memory) and the table exporter.
//! - **`ingest`**: multi-file batch ingestion with event limit and cancellation.
//! - **`summary`**, **`dump`**: run summaries and the per-event text dump.
//! - **`config`**, **`logging`**, **`error`**: the ambient application stack.
//!
//! ## Example
//! ```
//! use rust_hessio::cursor::PullCursor;
//! use rust_hessio::records::{RecordKind, RunHeader, TriggeredEvent};
//! use rust_hessio::stream::{MemorySource, RawRecord};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let header = RunHeader { run: 7, tel_id: vec![1, 2], ..Default::default() };
//! let records = vec![
//!     RawRecord::encode(RecordKind::RunHeader, 7, &header)?,
//!     RawRecord::encode(RecordKind::Event, 1, &TriggeredEvent::default())?,
//! ];
//!
//! let mut cursor = PullCursor::new();
//! cursor.bind(MemorySource::new(records))?;
//! while let Some(event) = cursor.advance()? {
//!     assert_eq!(event.run, 7);
//!     assert_eq!(cursor.accessor().num_telescopes(), Ok(2));
//! }
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod aggregate;
pub mod calibrate;
pub mod config;
pub mod cursor;
pub mod decode;
pub mod demux;
pub mod dump;
pub mod error;
pub mod export;
pub mod ingest;
pub mod layout;
pub mod logging;
pub mod records;
pub mod stream;
pub mod summary;
pub mod telescope_index;

pub use error::{AppResult, HessioError};
