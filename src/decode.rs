//! Per-kind payload decoders.
//!
//! Payloads are `bincode`-encoded serde structures. Decoding a payload also checks the
//! shape constraints the rest of the pipeline relies on (telescope count, per-gain table
//! sizes), so a record that decodes successfully can be stored without further checks.

use std::collections::HashSet;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DecodeError;
use crate::records::{
    CalibrationEvent, CameraSettings, RecordCategory, RecordKind, RunHeader, TelescopeBlock,
    TriggeredEvent, TypedRecord, MAX_PIXELS, MAX_TELESCOPES,
};

/// Encodes a payload structure.
pub fn encode_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, DecodeError> {
    Ok(bincode::serialize(value)?)
}

fn payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, DecodeError> {
    Ok(bincode::deserialize(bytes)?)
}

/// Decodes the payload of a record of `kind`.
///
/// Kinds whose content is not kept decode to [`TypedRecord::Skipped`] without touching the
/// payload.
pub fn decode(kind: RecordKind, bytes: &[u8]) -> Result<TypedRecord, DecodeError> {
    if kind.category() == RecordCategory::Deferred {
        return Ok(TypedRecord::Skipped(kind));
    }
    let record = match kind {
        RecordKind::RunHeader => {
            let header: RunHeader = payload(bytes)?;
            validate_run_header(&header)?;
            TypedRecord::RunHeader(header)
        }
        RecordKind::McRunHeader => TypedRecord::McRunHeader(payload(bytes)?),
        RecordKind::RunStatistics => TypedRecord::RunStatistics(payload(bytes)?),
        RecordKind::McRunStatistics => TypedRecord::McRunStatistics(payload(bytes)?),
        RecordKind::CameraSettings => {
            let settings: CameraSettings = payload(bytes)?;
            validate_camera(&settings)?;
            TypedRecord::Telescope(TelescopeBlock::CameraSettings(settings))
        }
        RecordKind::CameraOrganisation => {
            TypedRecord::Telescope(TelescopeBlock::CameraOrganisation(payload(bytes)?))
        }
        RecordKind::PixelSettings => {
            TypedRecord::Telescope(TelescopeBlock::PixelSettings(payload(bytes)?))
        }
        RecordKind::PixelDisabled => {
            TypedRecord::Telescope(TelescopeBlock::PixelDisabled(payload(bytes)?))
        }
        RecordKind::CameraSoftSettings => {
            TypedRecord::Telescope(TelescopeBlock::CameraSoftSettings(payload(bytes)?))
        }
        RecordKind::PointingCorrection => {
            TypedRecord::Telescope(TelescopeBlock::PointingCorrection(payload(bytes)?))
        }
        RecordKind::TrackingSettings => {
            TypedRecord::Telescope(TelescopeBlock::TrackingSetup(payload(bytes)?))
        }
        RecordKind::TelescopeMonitor => {
            TypedRecord::Telescope(TelescopeBlock::TelescopeMonitor(payload(bytes)?))
        }
        RecordKind::LaserCalibration => {
            TypedRecord::Telescope(TelescopeBlock::LaserCalibration(payload(bytes)?))
        }
        RecordKind::Event => {
            let event: TriggeredEvent = payload(bytes)?;
            validate_event(&event)?;
            TypedRecord::Event(event)
        }
        RecordKind::CalibrationEvent => {
            let event: CalibrationEvent = payload(bytes)?;
            validate_event(&event.event)?;
            TypedRecord::CalibrationEvent(event)
        }
        RecordKind::McShower => TypedRecord::McShower(payload(bytes)?),
        RecordKind::McEvent => TypedRecord::McEvent(payload(bytes)?),
        RecordKind::McPeSum => TypedRecord::McPeSum(payload(bytes)?),
        RecordKind::McTelArray => TypedRecord::McTelArray(payload(bytes)?),
        RecordKind::McPhotons
        | RecordKind::CorsikaRunHeader
        | RecordKind::CorsikaEventHeader
        | RecordKind::CorsikaEventEnd
        | RecordKind::CorsikaRunEnd
        | RecordKind::McInputConfig
        | RecordKind::History
        | RecordKind::Histograms => TypedRecord::Skipped(kind),
    };
    Ok(record)
}

fn validate_run_header(header: &RunHeader) -> Result<(), DecodeError> {
    let ntel = header.ntel();
    if ntel == 0 || ntel > MAX_TELESCOPES {
        return Err(DecodeError::Invalid(format!(
            "{ntel} telescopes (expected 1..={MAX_TELESCOPES})"
        )));
    }
    if !header.tel_pos.is_empty() && header.tel_pos.len() != ntel {
        return Err(DecodeError::Invalid(format!(
            "{} telescope positions for {ntel} telescopes",
            header.tel_pos.len()
        )));
    }
    let mut seen = HashSet::with_capacity(ntel);
    if let Some(dup) = header.tel_id.iter().find(|id| !seen.insert(**id)) {
        return Err(DecodeError::Invalid(format!("duplicate telescope id {dup}")));
    }
    Ok(())
}

fn validate_camera(settings: &CameraSettings) -> Result<(), DecodeError> {
    let n = settings.num_pixels();
    if n > MAX_PIXELS {
        return Err(DecodeError::Invalid(format!(
            "{n} pixels exceeds limit of {MAX_PIXELS}"
        )));
    }
    if settings.ypix.len() != n || settings.area.len() != n || settings.size.len() != n {
        return Err(DecodeError::Invalid(format!(
            "pixel tables disagree on pixel count {n}"
        )));
    }
    Ok(())
}

fn validate_event(event: &TriggeredEvent) -> Result<(), DecodeError> {
    for tel in &event.tel_events {
        if let Some(raw) = &tel.raw {
            if raw.num_pixels > MAX_PIXELS {
                return Err(DecodeError::Invalid(format!(
                    "telescope {}: {} pixels exceeds limit of {MAX_PIXELS}",
                    tel.tel_id, raw.num_pixels
                )));
            }
            raw.validate()
                .map_err(|msg| DecodeError::Invalid(format!("telescope {}: {msg}", tel.tel_id)))?;
        }
    }
    Ok(())
}
