//! Read-only queries against the run state.
//!
//! Every query returns `Result<_, AccessError>`. Callers that need the flat integer
//! protocol (0 or a count on success, -1 for "no run or no data", -2 for a telescope that
//! is not part of the run) use [`AccessError::code`] or the [`Sentinel`] trait.

use thiserror::Error;

use crate::aggregate::{Aggregate, RunState, TelEventSlot, TelescopeSlot};
use crate::calibrate::telescope_amplitudes;
use crate::records::{AdcData, PixelTiming, MAX_GAINS};

/// Code for "no run" or "no data".
pub const NO_DATA: i32 = -1;

/// Code for a telescope identifier that is not part of the run.
pub const TEL_INDEX_NOT_VALID: i32 = -2;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("no run is loaded")]
    NoRun,

    #[error("no data")]
    NoData,

    #[error("telescope {0} is not part of the run")]
    UnknownTelescope(i32),
}

impl AccessError {
    /// Integer code of the flat protocol.
    pub const fn code(self) -> i32 {
        match self {
            AccessError::NoRun | AccessError::NoData => NO_DATA,
            AccessError::UnknownTelescope(_) => TEL_INDEX_NOT_VALID,
        }
    }
}

/// Collapses an accessor result into a plain value: the error code for integers, `NaN`
/// for floats.
pub trait Sentinel {
    type Value;

    fn or_sentinel(self) -> Self::Value;
}

impl Sentinel for Result<i32, AccessError> {
    type Value = i32;

    fn or_sentinel(self) -> i32 {
        self.unwrap_or_else(AccessError::code)
    }
}

impl Sentinel for Result<usize, AccessError> {
    type Value = i64;

    fn or_sentinel(self) -> i64 {
        match self {
            Ok(n) => i64::try_from(n).unwrap_or(i64::MAX),
            Err(e) => i64::from(e.code()),
        }
    }
}

impl Sentinel for Result<f64, AccessError> {
    type Value = f64;

    fn or_sentinel(self) -> f64 {
        self.unwrap_or(f64::NAN)
    }
}

impl Sentinel for Result<f32, AccessError> {
    type Value = f32;

    fn or_sentinel(self) -> f32 {
        self.unwrap_or(f32::NAN)
    }
}

type AccessResult<T> = Result<T, AccessError>;

/// Borrowed view of the run state answering accessor queries.
#[derive(Debug, Clone, Copy)]
pub struct Accessor<'a> {
    run: Option<&'a RunState>,
}

impl<'a> Accessor<'a> {
    pub fn new(aggregate: &'a Aggregate) -> Self {
        Self {
            run: aggregate.run(),
        }
    }

    fn run(&self) -> AccessResult<&'a RunState> {
        self.run.ok_or(AccessError::NoRun)
    }

    fn telescope(&self, tel_id: i32) -> AccessResult<(&'a TelescopeSlot, &'a TelEventSlot)> {
        let run = self.run()?;
        let pos = run
            .index
            .position(tel_id)
            .ok_or(AccessError::UnknownTelescope(tel_id))?;
        match (run.telescope(pos), run.event_slot(pos)) {
            (Some(tel), Some(slot)) => Ok((tel, slot)),
            _ => Err(AccessError::UnknownTelescope(tel_id)),
        }
    }

    fn raw(&self, tel_id: i32) -> AccessResult<&'a AdcData> {
        let (_, slot) = self.telescope(tel_id)?;
        slot.known_raw().ok_or(AccessError::NoData)
    }

    fn timing(&self, tel_id: i32) -> AccessResult<&'a PixelTiming> {
        let (_, slot) = self.telescope(tel_id)?;
        slot.timing.as_ref().ok_or(AccessError::NoData)
    }

    pub fn run_number(&self) -> AccessResult<i32> {
        Ok(self.run()?.run_number())
    }

    /// Number of telescopes in the run.
    pub fn num_telescopes(&self) -> AccessResult<usize> {
        Ok(self.run()?.ntel())
    }

    /// Position of `tel_id` in the run's telescope list.
    pub fn telescope_index(&self, tel_id: i32) -> AccessResult<usize> {
        self.run()?
            .index
            .position(tel_id)
            .ok_or(AccessError::UnknownTelescope(tel_id))
    }

    /// Number of telescopes with raw data in the current event.
    pub fn num_teldata(&self) -> AccessResult<usize> {
        Ok(self.run()?.current_event.teldata.len())
    }

    /// Identifiers of the telescopes with raw data in the current event.
    pub fn teldata_list(&self) -> AccessResult<Vec<i32>> {
        Ok(self.run()?.current_event.teldata.clone())
    }

    pub fn global_event_count(&self) -> AccessResult<i32> {
        Ok(self.run()?.current_event.central.glob_count)
    }

    /// Identifier of the current event.
    pub fn event_id(&self) -> AccessResult<i32> {
        let run = self.run()?;
        match run.current_event.kind {
            Some(_) => Ok(run.current_event.event_id),
            None => Err(AccessError::NoData),
        }
    }

    /// Configured pixel count of the camera.
    pub fn num_pixels(&self, tel_id: i32) -> AccessResult<usize> {
        let (tel, _) = self.telescope(tel_id)?;
        tel.camera_settings
            .as_ref()
            .map(|c| c.num_pixels())
            .ok_or(AccessError::NoData)
    }

    pub fn mirror_area(&self, tel_id: i32) -> AccessResult<f64> {
        let (tel, _) = self.telescope(tel_id)?;
        tel.mirror_area().ok_or(AccessError::NoData)
    }

    pub fn optical_focal_length(&self, tel_id: i32) -> AccessResult<f64> {
        let (tel, _) = self.telescope(tel_id)?;
        tel.camera_settings
            .as_ref()
            .map(|c| c.flen)
            .ok_or(AccessError::NoData)
    }

    /// Ground position of the telescope [m].
    pub fn telescope_position(&self, tel_id: i32) -> AccessResult<[f64; 3]> {
        let (tel, _) = self.telescope(tel_id)?;
        Ok(tel.position)
    }

    /// Time slices per pixel in the current event's raw data.
    pub fn num_samples(&self, tel_id: i32) -> AccessResult<usize> {
        Ok(self.raw(tel_id)?.num_samples)
    }

    /// Gain channels in the current event's raw data.
    pub fn num_gains(&self, tel_id: i32) -> AccessResult<usize> {
        Ok(self.raw(tel_id)?.num_gains())
    }

    /// Kinds of timing values per pixel.
    pub fn num_types(&self, tel_id: i32) -> AccessResult<usize> {
        Ok(self.timing(tel_id)?.num_types())
    }

    /// Pixel x and y positions in the camera [m].
    pub fn pixel_position(&self, tel_id: i32) -> AccessResult<(Vec<f64>, Vec<f64>)> {
        let (tel, _) = self.telescope(tel_id)?;
        let camera = tel.camera_settings.as_ref().ok_or(AccessError::NoData)?;
        Ok((camera.xpix.clone(), camera.ypix.clone()))
    }

    /// Pedestals and calibration factors for both gains, indexed `[gain][pixel]`.
    ///
    /// Missing monitoring or calibration entries read as zero.
    pub fn calibration_data(&self, tel_id: i32) -> AccessResult<(Vec<Vec<f64>>, Vec<Vec<f64>>)> {
        let (tel, _) = self.telescope(tel_id)?;
        let n = tel.num_pixels();
        let mut pedestal = vec![vec![0.0; n]; MAX_GAINS];
        let mut calib = vec![vec![0.0; n]; MAX_GAINS];
        for gain in 0..MAX_GAINS {
            for pix in 0..n {
                if let Some(monitor) = &tel.monitor {
                    pedestal[gain][pix] = monitor.pedestal(gain, pix);
                }
                if let Some(laser) = &tel.laser_calibration {
                    calib[gain][pix] = laser.factor(gain, pix);
                }
            }
        }
        Ok((pedestal, calib))
    }

    /// Raw ADC sums of every pixel in one gain channel.
    pub fn adc_sum(&self, tel_id: i32, gain: usize) -> AccessResult<Vec<u32>> {
        self.raw(tel_id)?
            .adc_sum
            .get(gain)
            .cloned()
            .ok_or(AccessError::NoData)
    }

    /// Raw ADC samples of one gain channel, one row per significant pixel in pixel order.
    pub fn adc_samples(&self, tel_id: i32, gain: usize) -> AccessResult<Vec<Vec<u16>>> {
        let raw = self.raw(tel_id)?;
        if gain >= raw.num_gains() || raw.num_samples == 0 {
            return Err(AccessError::NoData);
        }
        Ok((0..raw.num_pixels)
            .filter(|pix| raw.is_significant(*pix))
            .filter_map(|pix| raw.samples(gain, pix).map(<[u16]>::to_vec))
            .collect())
    }

    /// Timing values indexed `[pixel][type]`.
    pub fn pixel_timing_timval(&self, tel_id: i32) -> AccessResult<Vec<Vec<f32>>> {
        Ok(self.timing(tel_id)?.timval.clone())
    }

    pub fn pixel_timing_threshold(&self, tel_id: i32) -> AccessResult<i32> {
        Ok(self.timing(tel_id)?.threshold)
    }

    /// Camera-wide peak position [time slices].
    pub fn pixel_timing_peak_global(&self, tel_id: i32) -> AccessResult<f32> {
        Ok(self.timing(tel_id)?.peak_global)
    }

    /// Calibrated peak photo-electron amplitude of every configured pixel.
    pub fn calibrated_amplitudes(&self, tel_id: i32) -> AccessResult<Vec<f64>> {
        let run = self.run()?;
        let pos = self.telescope_index(tel_id)?;
        self.raw(tel_id)?;
        Ok(telescope_amplitudes(run, pos))
    }

    pub fn mc_shower_energy(&self) -> AccessResult<f64> {
        self.mc_shower(|s| s.energy)
    }

    pub fn mc_shower_altitude(&self) -> AccessResult<f64> {
        self.mc_shower(|s| s.altitude)
    }

    pub fn mc_shower_azimuth(&self) -> AccessResult<f64> {
        self.mc_shower(|s| s.azimuth)
    }

    pub fn mc_shower_h_first_int(&self) -> AccessResult<f64> {
        self.mc_shower(|s| s.h_first_int)
    }

    pub fn mc_shower_xmax(&self) -> AccessResult<f64> {
        self.mc_shower(|s| s.xmax)
    }

    pub fn mc_shower_primary_id(&self) -> AccessResult<i32> {
        let run = self.run()?;
        run.mc_shower
            .as_ref()
            .map(|s| s.primary_id)
            .ok_or(AccessError::NoData)
    }

    /// Shower core position of the current MC event [m].
    pub fn mc_event_core(&self) -> AccessResult<(f64, f64)> {
        let run = self.run()?;
        run.mc_event
            .event
            .as_ref()
            .map(|e| (e.xcore, e.ycore))
            .ok_or(AccessError::NoData)
    }

    /// Simulated photo-electrons of one telescope in the current MC event.
    pub fn mc_event_photoelectrons(&self, tel_id: i32) -> AccessResult<f64> {
        let run = self.run()?;
        let pos = self.telescope_index(tel_id)?;
        if let Some(Some(photons)) = run.mc_event.photons.get(pos) {
            return Ok(photons.photoelectrons);
        }
        run.mc_event
            .pe_sum
            .as_ref()
            .and_then(|sum| sum.num_pe.get(pos))
            .map(|pe| f64::from(*pe))
            .ok_or(AccessError::NoData)
    }

    fn mc_shower(&self, field: impl Fn(&crate::records::McShower) -> f64) -> AccessResult<f64> {
        let run = self.run()?;
        run.mc_shower.as_ref().map(field).ok_or(AccessError::NoData)
    }
}
