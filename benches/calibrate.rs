//! Criterion benchmarks for the per-event hot paths: record dispatch and pixel
//! calibration.
//!
//! Run with: cargo bench --bench calibrate

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_hessio::calibrate::telescope_amplitudes;
use rust_hessio::demux::Demultiplexer;
use rust_hessio::records::{
    AdcData, CameraOrganisation, CameraSettings, CentralEvent, LaserCalibration, RecordKind,
    RunHeader, TelEvent, TelescopeMonitor, TriggeredEvent,
};
use rust_hessio::stream::RawRecord;

fn adc(pixels: usize) -> AdcData {
    AdcData {
        num_pixels: pixels,
        num_samples: 0,
        significant: vec![true; pixels],
        adc_known: vec![vec![true; pixels]; 2],
        adc_sum: vec![(0..pixels as u32).map(|p| 200 + p % 4000).collect(); 2],
        adc_sample: Vec::new(),
    }
}

fn configured_run(pixels: usize) -> (Vec<RawRecord>, RawRecord) {
    let header = RunHeader {
        run: 1,
        tel_id: vec![1],
        tel_pos: vec![[0.0; 3]],
        min_tel_trig: 1,
        ..Default::default()
    };
    let camera = CameraSettings {
        num_mirrors: 198,
        mirror_area: 400.0,
        xpix: vec![0.0; pixels],
        ypix: vec![0.0; pixels],
        area: vec![0.0025; pixels],
        size: vec![0.05; pixels],
        ..Default::default()
    };
    let organisation = CameraOrganisation {
        num_gains: 2,
        drawer: vec![0; pixels],
        ..Default::default()
    };
    let monitor = TelescopeMonitor {
        pedestal: vec![vec![300.0; pixels]; 2],
        noise: vec![vec![1.0; pixels]; 2],
        ..Default::default()
    };
    let laser = LaserCalibration {
        calib: vec![vec![0.05; pixels], vec![0.8; pixels]],
        ..Default::default()
    };
    let event = TriggeredEvent {
        central: CentralEvent {
            teltrg_list: vec![1],
            teldata_list: vec![1],
            ..Default::default()
        },
        tel_events: vec![TelEvent {
            tel_id: 1,
            raw: Some(adc(pixels)),
            ..Default::default()
        }],
    };

    let setup = vec![
        RawRecord::encode(RecordKind::RunHeader, 1, &header).unwrap(),
        RawRecord::encode(RecordKind::CameraSettings, 1, &camera).unwrap(),
        RawRecord::encode(RecordKind::CameraOrganisation, 1, &organisation).unwrap(),
        RawRecord::encode(RecordKind::TelescopeMonitor, 1, &monitor).unwrap(),
        RawRecord::encode(RecordKind::LaserCalibration, 1, &laser).unwrap(),
    ];
    let event = RawRecord::encode(RecordKind::Event, 1, &event).unwrap();
    (setup, event)
}

fn demux(pixels: usize) -> (Demultiplexer, RawRecord) {
    let (setup, event) = configured_run(pixels);
    let mut demux = Demultiplexer::new();
    for record in setup {
        demux.dispatch(record).unwrap();
    }
    (demux, event)
}

/// Calibrating every pixel of one camera, for camera sizes from a small SST to an LST.
fn calibrate_camera(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibrate_camera");
    for pixels in [1296, 1855, 2048, 11328] {
        let (mut demux, event) = demux(pixels);
        demux.dispatch(event).unwrap();
        let run = demux.aggregate().run().unwrap();

        group.throughput(Throughput::Elements(pixels as u64));
        group.bench_with_input(BenchmarkId::new("pixels", pixels), &pixels, |b, _| {
            b.iter(|| black_box(telescope_amplitudes(black_box(run), 0)));
        });
    }
    group.finish();
}

/// Decoding and storing one triggered event into a configured run.
fn dispatch_event(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_event");
    for pixels in [1855, 11328] {
        let (mut demux, event) = demux(pixels);
        group.throughput(Throughput::Bytes(event.payload.len() as u64));
        group.bench_with_input(BenchmarkId::new("pixels", pixels), &pixels, |b, _| {
            b.iter(|| demux.dispatch(black_box(event.clone())).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, calibrate_camera, dispatch_event);
criterion_main!(benches);
