//! Text dump of the current event.
//!
//! Level 0 prints raw ADC sums, one line per pixel and gain:
//! `RDLR <event> <tel_id> <pixel> <gain> <sum>`. Level 1 prints calibrated amplitudes:
//! `RDLR <event> <tel_id> <pixel> <pe>`. Only telescopes with raw data for the event are
//! printed, and events left below the trigger threshold by the array layout are skipped.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::aggregate::RunState;
use crate::calibrate::run_amplitude;
use crate::error::{AppResult, HessioError};
use crate::layout::passes_layout_trigger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DumpLevel {
    /// Raw ADC sums per gain.
    #[default]
    RawSums,
    /// Calibrated peak amplitudes in photo-electrons.
    Calibrated,
}

impl TryFrom<u8> for DumpLevel {
    type Error = HessioError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(DumpLevel::RawSums),
            1 => Ok(DumpLevel::Calibrated),
            other => Err(HessioError::Configuration(format!(
                "dump level {other} is not supported; use 0 or 1"
            ))),
        }
    }
}

/// Writes events at a fixed level with at most `max_pixels` pixels per telescope.
#[derive(Debug, Clone, Copy)]
pub struct EventDump {
    pub level: DumpLevel,
    pub max_pixels: usize,
}

impl EventDump {
    pub fn new(level: DumpLevel, max_pixels: usize) -> Self {
        Self { level, max_pixels }
    }

    /// Writes the current event of `run`. Returns the number of lines written, zero when
    /// the event was skipped.
    pub fn write_event<W: Write + ?Sized>(&self, out: &mut W, run: &RunState) -> AppResult<usize> {
        if !passes_layout_trigger(run) {
            return Ok(0);
        }
        let event_id = run.current_event.event_id;
        let mut lines = 0;
        for (pos, slot) in run.current_event.slots.iter().enumerate() {
            let Some(raw) = slot.known_raw() else {
                continue;
            };
            let tel_id = run.index.id_at(pos).unwrap_or_default();
            for pixel in 0..raw.num_pixels.min(self.max_pixels) {
                match self.level {
                    DumpLevel::RawSums => {
                        for gain in 0..raw.num_gains() {
                            let sum = raw.sum(gain, pixel).unwrap_or_default();
                            writeln!(out, "RDLR {event_id} {tel_id} {pixel} {gain} {sum}")?;
                            lines += 1;
                        }
                    }
                    DumpLevel::Calibrated => {
                        let pe = run_amplitude(run, pos, pixel);
                        writeln!(out, "RDLR {event_id} {tel_id} {pixel} {pe:.3}")?;
                        lines += 1;
                    }
                }
            }
        }
        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregate;
    use crate::records::{AdcData, CentralEvent, EventKind, RunHeader, TelEvent, TriggeredEvent};

    fn aggregate(min_tel_trig: i32) -> Aggregate {
        let mut agg = Aggregate::new();
        let run = agg
            .open_run(RunHeader {
                run: 1,
                tel_id: vec![5, 6],
                min_tel_trig,
                ..Default::default()
            })
            .unwrap();
        let raw = AdcData {
            num_pixels: 3,
            num_samples: 0,
            significant: vec![true; 3],
            adc_known: vec![vec![true; 3]],
            adc_sum: vec![vec![10, 20, 30]],
            adc_sample: vec![],
        };
        let event = TriggeredEvent {
            central: CentralEvent {
                teltrg_list: vec![6],
                ..Default::default()
            },
            tel_events: vec![TelEvent {
                tel_id: 6,
                raw: Some(raw),
                ..Default::default()
            }],
        };
        let index = run.index.clone();
        run.current_event.load(&index, 42, EventKind::Triggered, event);
        agg
    }

    #[test]
    fn raw_sum_dump_respects_pixel_limit() {
        let agg = aggregate(1);
        let mut out = Vec::new();
        let lines = EventDump::new(DumpLevel::RawSums, 2)
            .write_event(&mut out, agg.run().unwrap())
            .unwrap();
        assert_eq!(lines, 2);
        assert_eq!(String::from_utf8(out).unwrap(), "RDLR 42 6 0 0 10\nRDLR 42 6 1 0 20\n");
    }

    #[test]
    fn calibrated_dump_prints_three_decimals() {
        let agg = aggregate(1);
        let mut out = Vec::new();
        EventDump::new(DumpLevel::Calibrated, 1)
            .write_event(&mut out, agg.run().unwrap())
            .unwrap();
        // Without camera settings no pixel is configured.
        assert_eq!(String::from_utf8(out).unwrap(), "RDLR 42 6 0 0.000\n");
    }

    #[test]
    fn event_below_trigger_threshold_is_skipped() {
        let agg = aggregate(2);
        let mut out = Vec::new();
        let lines = EventDump::new(DumpLevel::RawSums, 10)
            .write_event(&mut out, agg.run().unwrap())
            .unwrap();
        assert_eq!(lines, 0);
        assert!(out.is_empty());
        assert!(DumpLevel::try_from(3).is_err());
    }
}
