//! Run-state aggregate: everything known about the run currently being read.
//!
//! The [`Aggregate`] owns at most one [`RunState`]. A run header opens a run, which first
//! releases the previous one; nothing of run *k* is reachable once run *k+1* is open.
//! Per-telescope data lives in slots indexed by telescope position, the order of the
//! identifiers in the run header.

use tracing::debug;

use crate::error::{AppResult, HessioError};
use crate::records::{
    AdcData, CameraOrganisation, CameraSettings, CameraSoftSettings, CentralEvent, EventKind,
    ImageParameters, LaserCalibration, McEvent, McPeSum, McRunHeader, McRunStatistics, McShower,
    McTelArray, McTelPhotons, PixelDisabled, PixelSettings, PixelTiming, PointingCorrection,
    RunHeader, RunStatistics, TelescopeBlock, TelescopeMonitor, TrackingSetup, TriggeredEvent,
    MAX_TELESCOPES,
};
use crate::telescope_index::TelescopeIndex;

/// Image-parameter sets kept per telescope and event.
pub const MAX_IMAGE_SETS: usize = 2;

/// Whether a telescope belongs to the selected sub-array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Inclusion {
    #[default]
    Included,
    Excluded,
}

/// Configuration of one telescope. Blocks are `None` until their record arrives.
#[derive(Debug, Clone, Default)]
pub struct TelescopeSlot {
    pub tel_id: i32,
    /// Ground position [m].
    pub position: [f64; 3],
    pub inclusion: Inclusion,
    pub camera_settings: Option<CameraSettings>,
    pub camera_organisation: Option<CameraOrganisation>,
    pub pixel_settings: Option<PixelSettings>,
    pub pixel_disabled: Option<PixelDisabled>,
    pub camera_soft_settings: Option<CameraSoftSettings>,
    pub pointing_correction: Option<PointingCorrection>,
    pub tracking_setup: Option<TrackingSetup>,
    pub monitor: Option<TelescopeMonitor>,
    pub laser_calibration: Option<LaserCalibration>,
}

impl TelescopeSlot {
    /// Stores a configuration block, replacing any earlier block of the same kind.
    pub fn store(&mut self, block: TelescopeBlock) {
        match block {
            TelescopeBlock::CameraSettings(b) => self.camera_settings = Some(b),
            TelescopeBlock::CameraOrganisation(b) => self.camera_organisation = Some(b),
            TelescopeBlock::PixelSettings(b) => self.pixel_settings = Some(b),
            TelescopeBlock::PixelDisabled(b) => self.pixel_disabled = Some(b),
            TelescopeBlock::CameraSoftSettings(b) => self.camera_soft_settings = Some(b),
            TelescopeBlock::PointingCorrection(b) => self.pointing_correction = Some(b),
            TelescopeBlock::TrackingSetup(b) => self.tracking_setup = Some(b),
            TelescopeBlock::TelescopeMonitor(b) => self.monitor = Some(b),
            TelescopeBlock::LaserCalibration(b) => self.laser_calibration = Some(b),
        }
    }

    /// Configured pixel count, 0 without camera settings.
    pub fn num_pixels(&self) -> usize {
        self.camera_settings
            .as_ref()
            .map_or(0, CameraSettings::num_pixels)
    }

    pub fn mirror_area(&self) -> Option<f64> {
        self.camera_settings.as_ref().map(|c| c.mirror_area)
    }

    /// Mirror count as exported: the decoded count, or -1 once the layout excluded the
    /// telescope or without camera settings.
    pub fn exported_num_mirrors(&self) -> i32 {
        match (self.inclusion, &self.camera_settings) {
            (Inclusion::Included, Some(settings)) => settings.num_mirrors,
            _ => -1,
        }
    }

    pub fn is_included(&self) -> bool {
        self.inclusion == Inclusion::Included
    }
}

/// One telescope's share of the current event.
#[derive(Debug, Clone, Default)]
pub struct TelEventSlot {
    /// Raw data for this telescope belongs to the current event.
    pub known: bool,
    pub raw: Option<AdcData>,
    pub timing: Option<PixelTiming>,
    pub images: Vec<ImageParameters>,
}

impl TelEventSlot {
    fn clear(&mut self) {
        self.known = false;
        self.raw = None;
        self.timing = None;
        self.images.clear();
    }

    /// Raw data, only when it belongs to the current event.
    pub fn known_raw(&self) -> Option<&AdcData> {
        if self.known {
            self.raw.as_ref()
        } else {
            None
        }
    }
}

/// The last event decoded.
#[derive(Debug, Clone, Default)]
pub struct CurrentEvent {
    /// Event identifier from the record header.
    pub event_id: i32,
    /// `None` until the first event of the run.
    pub kind: Option<EventKind>,
    pub calibration_type: Option<i32>,
    pub central: CentralEvent,
    /// Indexed by telescope position.
    pub slots: Vec<TelEventSlot>,
    /// Identifiers of telescopes with raw data, in arrival order.
    pub teldata: Vec<i32>,
}

impl CurrentEvent {
    /// Replaces the event content. Telescopes outside the run are skipped and returned.
    pub fn load(
        &mut self,
        index: &TelescopeIndex,
        event_id: i32,
        kind: EventKind,
        event: TriggeredEvent,
    ) -> Vec<i32> {
        for slot in &mut self.slots {
            slot.clear();
        }
        self.teldata.clear();
        self.event_id = event_id;
        self.kind = Some(kind);
        self.calibration_type = None;
        self.central = event.central;

        let mut skipped = Vec::new();
        for tel in event.tel_events {
            let Some(slot) = index.position(tel.tel_id).and_then(|pos| self.slots.get_mut(pos))
            else {
                skipped.push(tel.tel_id);
                continue;
            };
            slot.known = tel.raw.is_some();
            slot.raw = tel.raw;
            slot.timing = tel.timing;
            slot.images = tel.images;
            slot.images.truncate(MAX_IMAGE_SETS);
            if slot.known {
                self.teldata.push(tel.tel_id);
            }
        }
        skipped
    }

    pub fn is_triggered(&self) -> bool {
        self.kind == Some(EventKind::Triggered)
    }
}

/// Monte-Carlo event truth.
#[derive(Debug, Clone, Default)]
pub struct McEventState {
    pub event: Option<McEvent>,
    /// Photon statistics, indexed by telescope position.
    pub photons: Vec<Option<McTelPhotons>>,
    pub pe_sum: Option<McPeSum>,
}

impl McEventState {
    /// Stores per-telescope photon statistics. Telescopes outside the run are returned.
    pub fn store_photons(&mut self, index: &TelescopeIndex, array: McTelArray) -> Vec<i32> {
        for entry in &mut self.photons {
            *entry = None;
        }
        let mut skipped = Vec::new();
        for tel in array.telescopes {
            match index.position(tel.tel_id).and_then(|pos| self.photons.get_mut(pos)) {
                Some(entry) => *entry = Some(tel),
                None => skipped.push(tel.tel_id),
            }
        }
        skipped
    }
}

/// Everything owned by one open run.
#[derive(Debug, Clone)]
pub struct RunState {
    pub header: RunHeader,
    pub index: TelescopeIndex,
    pub mc_run_header: Option<McRunHeader>,
    pub run_stat: Option<RunStatistics>,
    pub mc_run_stat: Option<McRunStatistics>,
    /// Indexed by telescope position.
    pub telescopes: Vec<TelescopeSlot>,
    pub current_event: CurrentEvent,
    pub mc_shower: Option<McShower>,
    pub mc_event: McEventState,
    /// Value of the aggregate's generation counter when this run was opened.
    pub generation: u64,
}

impl RunState {
    pub fn run_number(&self) -> i32 {
        self.header.run
    }

    pub fn ntel(&self) -> usize {
        self.telescopes.len()
    }

    pub fn telescope(&self, pos: usize) -> Option<&TelescopeSlot> {
        self.telescopes.get(pos)
    }

    /// Slot of telescope `tel_id`.
    pub fn telescope_by_id(&self, tel_id: i32) -> Option<&TelescopeSlot> {
        self.index.position(tel_id).and_then(|pos| self.telescopes.get(pos))
    }

    /// Current-event slot of telescope `pos`.
    pub fn event_slot(&self, pos: usize) -> Option<&TelEventSlot> {
        self.current_event.slots.get(pos)
    }
}

/// Owner of the run state. Created empty; a run exists only between a run header and the
/// next run header, rebind or drop.
#[derive(Debug, Default)]
pub struct Aggregate {
    run: Option<RunState>,
    generation: u64,
}

fn reserved<T: Default>(len: usize, what: &'static str, run: i32) -> AppResult<Vec<T>> {
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(len)
        .map_err(|_| HessioError::Allocation { what, run })?;
    slots.resize_with(len, T::default);
    Ok(slots)
}

impl Aggregate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a run from its header, releasing any live run first.
    pub fn open_run(&mut self, header: RunHeader) -> AppResult<&mut RunState> {
        let ntel = header.ntel();
        if ntel == 0 || ntel > MAX_TELESCOPES {
            return Err(HessioError::InvalidRunHeader(format!(
                "run {} lists {ntel} telescopes (expected 1..={MAX_TELESCOPES})",
                header.run
            )));
        }
        self.close_run();

        let run = header.run;
        let mut telescopes: Vec<TelescopeSlot> = reserved(ntel, "telescope configuration", run)?;
        for (pos, slot) in telescopes.iter_mut().enumerate() {
            slot.tel_id = header.tel_id[pos];
            slot.position = header.telescope_position(pos);
        }
        let slots = reserved(ntel, "event data", run)?;
        let photons = reserved(ntel, "MC photon statistics", run)?;

        self.generation += 1;
        debug!(run, ntel, generation = self.generation, "Opened run");
        let state = RunState {
            index: TelescopeIndex::new(&header.tel_id),
            header,
            mc_run_header: None,
            run_stat: None,
            mc_run_stat: None,
            telescopes,
            current_event: CurrentEvent {
                slots,
                ..Default::default()
            },
            mc_shower: None,
            mc_event: McEventState {
                photons,
                ..Default::default()
            },
            generation: self.generation,
        };
        Ok(self.run.insert(state))
    }

    /// Releases the live run. Returns `false` when no run was open.
    pub fn close_run(&mut self) -> bool {
        match self.run.take() {
            Some(state) => {
                debug!(run = state.header.run, "Released run");
                true
            }
            None => false,
        }
    }

    pub fn run(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    pub fn run_mut(&mut self) -> Option<&mut RunState> {
        self.run.as_mut()
    }

    pub fn is_open(&self) -> bool {
        self.run.is_some()
    }

    /// Number of runs opened over the aggregate's lifetime.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::TelEvent;

    fn header(run: i32, ids: &[i32]) -> RunHeader {
        RunHeader {
            run,
            tel_id: ids.to_vec(),
            tel_pos: ids.iter().map(|id| [*id as f64, 0.0, 0.0]).collect(),
            ..Default::default()
        }
    }

    fn raw(num_pixels: usize) -> AdcData {
        AdcData {
            num_pixels,
            significant: vec![true; num_pixels],
            adc_known: vec![vec![true; num_pixels]],
            adc_sum: vec![vec![100; num_pixels]],
            ..Default::default()
        }
    }

    #[test]
    fn open_run_assigns_positions() {
        let mut agg = Aggregate::new();
        let run = agg.open_run(header(7, &[3, 1, 8])).unwrap();
        assert_eq!(run.ntel(), 3);
        assert_eq!(run.telescopes[2].tel_id, 8);
        assert_eq!(run.telescopes[2].position, [8.0, 0.0, 0.0]);
        assert_eq!(run.current_event.slots.len(), 3);
        assert!(run.current_event.slots.iter().all(|s| !s.known));
        assert_eq!(run.telescope_by_id(1).map(|t| t.tel_id), Some(1));
    }

    #[test]
    fn second_run_header_releases_first_run() {
        let mut agg = Aggregate::new();
        let run = agg.open_run(header(1, &[1, 2])).unwrap();
        run.telescopes[0].store(TelescopeBlock::CameraSettings(CameraSettings {
            num_mirrors: 5,
            ..Default::default()
        }));
        run.mc_shower = Some(McShower::default());

        let run = agg.open_run(header(2, &[1, 2, 3])).unwrap();
        assert_eq!(run.run_number(), 2);
        assert!(run.telescopes.iter().all(|t| t.camera_settings.is_none()));
        assert!(run.mc_shower.is_none());
        assert_eq!(run.generation, 2);
        assert_eq!(agg.generation(), 2);
    }

    #[test]
    fn close_run_is_idempotent() {
        let mut agg = Aggregate::new();
        assert!(!agg.close_run());
        agg.open_run(header(1, &[1])).unwrap();
        assert!(agg.close_run());
        assert!(!agg.close_run());
        assert!(agg.run().is_none());
    }

    #[test]
    fn empty_telescope_list_is_rejected() {
        let mut agg = Aggregate::new();
        let err = agg.open_run(header(4, &[])).unwrap_err();
        assert!(matches!(err, HessioError::InvalidRunHeader(_)));
        assert!(!agg.is_open());
    }

    #[test]
    fn loading_event_resets_known_flags() {
        let mut agg = Aggregate::new();
        let run = agg.open_run(header(1, &[10, 20])).unwrap();
        let first = TriggeredEvent {
            tel_events: vec![
                TelEvent {
                    tel_id: 10,
                    raw: Some(raw(4)),
                    ..Default::default()
                },
                TelEvent {
                    tel_id: 20,
                    raw: Some(raw(4)),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        run.current_event
            .load(&run.index, 1, EventKind::Triggered, first);
        assert_eq!(run.current_event.teldata, vec![10, 20]);

        let second = TriggeredEvent {
            tel_events: vec![
                TelEvent {
                    tel_id: 20,
                    raw: Some(raw(4)),
                    ..Default::default()
                },
                TelEvent {
                    tel_id: 77,
                    raw: Some(raw(4)),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let skipped = run
            .current_event
            .load(&run.index, 2, EventKind::Triggered, second);
        assert_eq!(skipped, vec![77]);
        assert!(!run.current_event.slots[0].known);
        assert!(run.current_event.slots[0].known_raw().is_none());
        assert!(run.current_event.slots[1].known);
        assert_eq!(run.current_event.teldata, vec![20]);
    }

    #[test]
    fn excluded_or_unconfigured_telescope_exports_sentinel_mirrors() {
        let mut slot = TelescopeSlot::default();
        assert_eq!(slot.exported_num_mirrors(), -1);
        slot.store(TelescopeBlock::CameraSettings(CameraSettings {
            num_mirrors: 198,
            ..Default::default()
        }));
        assert_eq!(slot.exported_num_mirrors(), 198);
        slot.inclusion = Inclusion::Excluded;
        assert_eq!(slot.exported_num_mirrors(), -1);
        assert_eq!(slot.camera_settings.as_ref().map(|c| c.num_mirrors), Some(198));
    }
}
