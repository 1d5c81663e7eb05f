//! Typed record structures and the record-kind catalog.
//!
//! Every block the demultiplexer can store has a serde-derived structure here. The
//! [`TypedRecord`] enum is the output of [`crate::decode::decode`] and is matched
//! exhaustively by the demultiplexer.

pub mod camera;
pub mod event;
pub mod kind;
pub mod mc;
pub mod run;

pub use camera::{
    CameraOrganisation, CameraSettings, CameraSoftSettings, LaserCalibration, PixelDisabled,
    PixelSettings, PointingCorrection, TelescopeMonitor, TrackingSetup, HI_GAIN, LO_GAIN,
    MAX_GAINS, MAX_PIXELS,
};
pub use event::{
    AdcData, CalibrationEvent, CentralEvent, EventKind, ImageParameters, PixelTiming, TelEvent,
    TriggeredEvent,
};
pub use kind::{requires_run_header, RecordCategory, RecordKind, RUN_HEADER_CODE};
pub use mc::{McEvent, McPeSum, McShower, McTelArray, McTelPhotons};
pub use run::{McRunHeader, McRunStatistics, RunHeader, RunStatistics, MAX_TELESCOPES};

/// A decoded record payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedRecord {
    RunHeader(RunHeader),
    McRunHeader(McRunHeader),
    RunStatistics(RunStatistics),
    McRunStatistics(McRunStatistics),
    Telescope(TelescopeBlock),
    Event(TriggeredEvent),
    CalibrationEvent(CalibrationEvent),
    McShower(McShower),
    McEvent(McEvent),
    McPeSum(McPeSum),
    McTelArray(McTelArray),
    /// Recognized kind whose payload is not kept.
    Skipped(RecordKind),
}

/// A per-telescope configuration block.
#[derive(Debug, Clone, PartialEq)]
pub enum TelescopeBlock {
    CameraSettings(CameraSettings),
    CameraOrganisation(CameraOrganisation),
    PixelSettings(PixelSettings),
    PixelDisabled(PixelDisabled),
    CameraSoftSettings(CameraSoftSettings),
    PointingCorrection(PointingCorrection),
    TrackingSetup(TrackingSetup),
    TelescopeMonitor(TelescopeMonitor),
    LaserCalibration(LaserCalibration),
}

impl TelescopeBlock {
    /// Record kind the block was decoded from.
    pub fn kind(&self) -> RecordKind {
        match self {
            TelescopeBlock::CameraSettings(_) => RecordKind::CameraSettings,
            TelescopeBlock::CameraOrganisation(_) => RecordKind::CameraOrganisation,
            TelescopeBlock::PixelSettings(_) => RecordKind::PixelSettings,
            TelescopeBlock::PixelDisabled(_) => RecordKind::PixelDisabled,
            TelescopeBlock::CameraSoftSettings(_) => RecordKind::CameraSoftSettings,
            TelescopeBlock::PointingCorrection(_) => RecordKind::PointingCorrection,
            TelescopeBlock::TrackingSetup(_) => RecordKind::TrackingSettings,
            TelescopeBlock::TelescopeMonitor(_) => RecordKind::TelescopeMonitor,
            TelescopeBlock::LaserCalibration(_) => RecordKind::LaserCalibration,
        }
    }
}
