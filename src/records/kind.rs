//! Record type codes and their classification.

use std::fmt;

/// Type code of the run header block. Codes in `(RUN_HEADER_CODE, RUN_HEADER_CODE + 200)`
/// belong to a run and are rejected while no run header has been seen.
pub const RUN_HEADER_CODE: u32 = 2000;

/// Width of the run-scoped type-code band above [`RUN_HEADER_CODE`].
pub const RUN_SCOPED_BAND: u32 = 200;

/// Returns `true` if a record with this type code can only be interpreted inside a run.
pub fn requires_run_header(type_code: u32) -> bool {
    type_code > RUN_HEADER_CODE && type_code < RUN_HEADER_CODE + RUN_SCOPED_BAND
}

/// How the demultiplexer routes a record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordCategory {
    /// Updates run-scoped fields of the aggregate.
    RunScope,
    /// Addressed to one telescope through the identifier in the record header.
    TelescopeConfig,
    /// Event, shower or Monte-Carlo truth data.
    Event,
    /// Recognized but carries nothing the aggregate keeps.
    Deferred,
}

/// Every record kind the stream may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    RunHeader,
    McRunHeader,
    CameraSettings,
    CameraOrganisation,
    PixelSettings,
    PixelDisabled,
    CameraSoftSettings,
    PointingCorrection,
    TrackingSettings,
    Event,
    McShower,
    McEvent,
    TelescopeMonitor,
    LaserCalibration,
    RunStatistics,
    McRunStatistics,
    McPeSum,
    CalibrationEvent,
    McTelArray,
    McPhotons,
    CorsikaRunHeader,
    CorsikaEventHeader,
    CorsikaEventEnd,
    CorsikaRunEnd,
    McInputConfig,
    History,
    Histograms,
}

impl RecordKind {
    /// Wire type code of this kind.
    pub const fn code(self) -> u32 {
        match self {
            RecordKind::RunHeader => 2000,
            RecordKind::McRunHeader => 2001,
            RecordKind::CameraSettings => 2002,
            RecordKind::CameraOrganisation => 2003,
            RecordKind::PixelSettings => 2004,
            RecordKind::PixelDisabled => 2005,
            RecordKind::CameraSoftSettings => 2006,
            RecordKind::PointingCorrection => 2007,
            RecordKind::TrackingSettings => 2008,
            RecordKind::Event => 2010,
            RecordKind::McShower => 2020,
            RecordKind::McEvent => 2021,
            RecordKind::TelescopeMonitor => 2022,
            RecordKind::LaserCalibration => 2023,
            RecordKind::RunStatistics => 2024,
            RecordKind::McRunStatistics => 2025,
            RecordKind::McPeSum => 2026,
            RecordKind::CalibrationEvent => 2028,
            RecordKind::CorsikaRunHeader => 1200,
            RecordKind::CorsikaEventHeader => 1202,
            RecordKind::McTelArray => 1204,
            RecordKind::McPhotons => 1205,
            RecordKind::CorsikaEventEnd => 1209,
            RecordKind::CorsikaRunEnd => 1210,
            RecordKind::McInputConfig => 1212,
            RecordKind::History => 70,
            RecordKind::Histograms => 100,
        }
    }

    /// Routing category used by the demultiplexer.
    pub const fn category(self) -> RecordCategory {
        match self {
            RecordKind::RunHeader
            | RecordKind::McRunHeader
            | RecordKind::RunStatistics
            | RecordKind::McRunStatistics => RecordCategory::RunScope,
            RecordKind::CameraSettings
            | RecordKind::CameraOrganisation
            | RecordKind::PixelSettings
            | RecordKind::PixelDisabled
            | RecordKind::CameraSoftSettings
            | RecordKind::PointingCorrection
            | RecordKind::TrackingSettings
            | RecordKind::TelescopeMonitor
            | RecordKind::LaserCalibration => RecordCategory::TelescopeConfig,
            RecordKind::Event
            | RecordKind::CalibrationEvent
            | RecordKind::McShower
            | RecordKind::McEvent
            | RecordKind::McPeSum
            | RecordKind::McTelArray => RecordCategory::Event,
            RecordKind::McPhotons
            | RecordKind::CorsikaRunHeader
            | RecordKind::CorsikaEventHeader
            | RecordKind::CorsikaEventEnd
            | RecordKind::CorsikaRunEnd
            | RecordKind::McInputConfig
            | RecordKind::History
            | RecordKind::Histograms => RecordCategory::Deferred,
        }
    }

    /// Telescope identifier carried in the record header's `ident` field, for
    /// per-telescope configuration kinds.
    ///
    /// Monitoring blocks pack the identifier with other bits:
    /// low byte plus bits 24..30 shifted down to 8..14.
    pub const fn telescope_id(self, ident: i32) -> Option<i32> {
        match self.category() {
            RecordCategory::TelescopeConfig => match self {
                RecordKind::TelescopeMonitor => {
                    Some((ident & 0xff) | ((ident & 0x3f00_0000) >> 16))
                }
                _ => Some(ident),
            },
            _ => None,
        }
    }
}

impl TryFrom<u32> for RecordKind {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        let kind = match code {
            2000 => RecordKind::RunHeader,
            2001 => RecordKind::McRunHeader,
            2002 => RecordKind::CameraSettings,
            2003 => RecordKind::CameraOrganisation,
            2004 => RecordKind::PixelSettings,
            2005 => RecordKind::PixelDisabled,
            2006 => RecordKind::CameraSoftSettings,
            2007 => RecordKind::PointingCorrection,
            2008 => RecordKind::TrackingSettings,
            2010 => RecordKind::Event,
            2020 => RecordKind::McShower,
            2021 => RecordKind::McEvent,
            2022 => RecordKind::TelescopeMonitor,
            2023 => RecordKind::LaserCalibration,
            2024 => RecordKind::RunStatistics,
            2025 => RecordKind::McRunStatistics,
            2026 => RecordKind::McPeSum,
            2028 => RecordKind::CalibrationEvent,
            1200 => RecordKind::CorsikaRunHeader,
            1202 => RecordKind::CorsikaEventHeader,
            1204 => RecordKind::McTelArray,
            1205 => RecordKind::McPhotons,
            1209 => RecordKind::CorsikaEventEnd,
            1210 => RecordKind::CorsikaRunEnd,
            1212 => RecordKind::McInputConfig,
            70 => RecordKind::History,
            100 => RecordKind::Histograms,
            other => return Err(other),
        };
        Ok(kind)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecordKind::RunHeader => "Run header",
            RecordKind::McRunHeader => "MC run header",
            RecordKind::CameraSettings => "Camera settings",
            RecordKind::CameraOrganisation => "Camera organisation",
            RecordKind::PixelSettings => "Pixel settings",
            RecordKind::PixelDisabled => "Pixel disable block",
            RecordKind::CameraSoftSettings => "Camera software settings",
            RecordKind::PointingCorrection => "Pointing correction",
            RecordKind::TrackingSettings => "Tracking settings",
            RecordKind::Event => "Event",
            RecordKind::McShower => "MC shower",
            RecordKind::McEvent => "MC event",
            RecordKind::TelescopeMonitor => "Telescope monitor block",
            RecordKind::LaserCalibration => "Laser/LED calibration",
            RecordKind::RunStatistics => "Run statistics",
            RecordKind::McRunStatistics => "MC run statistics",
            RecordKind::McPeSum => "MC photo-electron sum",
            RecordKind::CalibrationEvent => "Calibration event",
            RecordKind::McTelArray => "MC telescope array",
            RecordKind::McPhotons => "MC photon bunches",
            RecordKind::CorsikaRunHeader => "CORSIKA run header",
            RecordKind::CorsikaEventHeader => "CORSIKA event header",
            RecordKind::CorsikaEventEnd => "CORSIKA event end",
            RecordKind::CorsikaRunEnd => "CORSIKA run end",
            RecordKind::McInputConfig => "MC input configuration",
            RecordKind::History => "History",
            RecordKind::Histograms => "Histograms",
        };
        f.write_str(name)
    }
}
