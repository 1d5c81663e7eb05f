//! Run lifecycle through the demultiplexer: opening, replacing and rejecting runs.

mod common;

use common::RunBuilder;
use rust_hessio::accessor::{Accessor, AccessError};
use rust_hessio::demux::{Demultiplexer, Dispatch, IgnoreReason};
use rust_hessio::records::{CameraSettings, EventKind, RecordKind};
use rust_hessio::stream::RawRecord;
use rust_hessio::HessioError;
use tracing_test::traced_test;

fn drain(demux: &mut Demultiplexer, records: Vec<RawRecord>) -> Vec<Dispatch> {
    records
        .into_iter()
        .map(|r| demux.dispatch(r).unwrap())
        .collect()
}

#[test]
fn one_dispatch_per_record() {
    let mut demux = Demultiplexer::new();
    let records = RunBuilder::new(7, &[1, 2])
        .camera(1, 4, 100.0)
        .mc_run_header()
        .shower(1, 0.5)
        .event(10, &[1], 4, 50)
        .build();
    let dispatches = drain(&mut demux, records);

    assert_eq!(dispatches[0], Dispatch::RunOpened { run: 7 });
    assert_eq!(
        dispatches[1],
        Dispatch::TelescopeConfigured {
            position: 0,
            block: RecordKind::CameraSettings
        }
    );
    assert!(dispatches.contains(&Dispatch::RunUpdated(RecordKind::McRunHeader)));
    assert!(dispatches.contains(&Dispatch::ShowerUpdated));
    assert!(dispatches.contains(&Dispatch::McEventUpdated));
    assert_eq!(
        dispatches.last(),
        Some(&Dispatch::EventUpdated(EventKind::Triggered))
    );
    assert_eq!(demux.stats().records, dispatches.len() as u64);
    assert_eq!(demux.stats().triggered_events, 1);
}

#[test]
fn new_run_header_releases_previous_run() {
    let mut demux = Demultiplexer::new();
    drain(
        &mut demux,
        RunBuilder::new(1, &[1, 2, 3])
            .camera(2, 8, 400.0)
            .event(1, &[2], 8, 10)
            .build(),
    );
    let first_generation = demux.aggregate().generation();
    drain(&mut demux, RunBuilder::new(2, &[5]).build());

    let run = demux.aggregate().run().unwrap();
    assert_eq!(run.run_number(), 2);
    assert_eq!(run.ntel(), 1);
    assert!(run.telescopes[0].camera_settings.is_none());
    assert!(run.current_event.slots.iter().all(|s| !s.known));
    assert!(demux.aggregate().generation() > first_generation);

    let accessor = Accessor::new(demux.aggregate());
    assert_eq!(accessor.num_pixels(2), Err(AccessError::UnknownTelescope(2)));
}

#[test]
#[traced_test]
fn event_before_run_header_is_skipped() {
    let mut demux = Demultiplexer::new();
    let early = RunBuilder::new(1, &[1]).event(3, &[1], 2, 5).build().pop().unwrap();
    let dispatch = demux.dispatch(early).unwrap();

    assert_eq!(
        dispatch,
        Dispatch::Ignored(IgnoreReason::BeforeRunHeader(RecordKind::Event.code()))
    );
    assert!(!demux.aggregate().is_open());
    assert!(logs_contain("precedes the run header"));
}

#[test]
fn configuration_for_unknown_telescope_is_fatal() {
    let mut demux = Demultiplexer::new();
    drain(&mut demux, RunBuilder::new(1, &[1, 2]).build());
    let record =
        RawRecord::encode(RecordKind::CameraSettings, 99, &CameraSettings::default()).unwrap();

    let err = demux.dispatch(record).unwrap_err();
    assert!(matches!(
        err,
        HessioError::UnknownTelescope {
            kind: RecordKind::CameraSettings,
            tel_id: 99
        }
    ));
    assert!(demux.aggregate().is_open());
}

#[test]
fn undecodable_run_header_is_fatal() {
    let mut demux = Demultiplexer::new();
    let record = RawRecord::new(RecordKind::RunHeader.code(), 1, vec![1u8, 2, 3]);
    let err = demux.dispatch(record).unwrap_err();
    assert!(matches!(err, HessioError::Decode { kind: RecordKind::RunHeader, .. }));
    assert!(!demux.aggregate().is_open());
}

#[test]
#[traced_test]
fn unrecognized_type_warns_once() {
    let mut demux = Demultiplexer::new();
    drain(&mut demux, RunBuilder::new(1, &[1]).build());
    for _ in 0..3 {
        let dispatch = demux.dispatch(RawRecord::new(4242, 0, vec![0u8; 4])).unwrap();
        assert_eq!(dispatch, Dispatch::Ignored(IgnoreReason::Unrecognized(4242)));
    }
    logs_assert(|lines: &[&str]| {
        match lines
            .iter()
            .filter(|l| l.contains("Ignoring data block type 4242"))
            .count()
        {
            1 => Ok(()),
            n => Err(format!("expected one warning, saw {n}")),
        }
    });
}

#[test]
#[traced_test]
fn event_telescope_outside_run_is_skipped() {
    let mut demux = Demultiplexer::new();
    let records = RunBuilder::new(1, &[1, 2]).event(5, &[2, 77], 3, 9).build();
    let dispatches = drain(&mut demux, records);

    assert_eq!(
        dispatches.last(),
        Some(&Dispatch::EventUpdated(EventKind::Triggered))
    );
    assert_eq!(demux.stats().skipped_telescopes, 1);
    let accessor = Accessor::new(demux.aggregate());
    assert_eq!(accessor.teldata_list(), Ok(vec![2]));
    assert!(logs_contain("Telescope 77 is not part of the run"));
}

#[test]
fn calibrated_amplitude_through_accessor() {
    let mut demux = Demultiplexer::new();
    let records = RunBuilder::new(3, &[4])
        .camera(4, 2, 100.0)
        .calibration(4, 2, 100.0, 0.5)
        .event(1, &[4], 2, 300)
        .build();
    drain(&mut demux, records);

    let amplitudes = Accessor::new(demux.aggregate())
        .calibrated_amplitudes(4)
        .unwrap();
    assert_eq!(amplitudes.len(), 2);
    // (300 - 100) * 0.5 * 0.92
    assert!((amplitudes[0] - 92.0).abs() < 1e-9);
}
