use boxpanel::{
    hardware::dht::{decode_frame, pulses_to_frame},
    hardware::MjpegSplitter,
    panel::streamer::frame_part,
    Panel,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;

/// Pulse train for one DHT22 frame: preamble, 80 data pulses and a trailer.
fn pulse_train(frame: [u8; 5]) -> Vec<Duration> {
    let mut pulses = vec![Duration::from_micros(80); 3];
    for byte in frame {
        for bit in (0..8).rev() {
            pulses.push(Duration::from_micros(50));
            let high = if byte >> bit & 1 == 1 { 70 } else { 26 };
            pulses.push(Duration::from_micros(high));
        }
    }
    pulses.push(Duration::from_micros(50));
    pulses
}

/// Synthetic JPEG of roughly `size` bytes.
fn jpeg(size: usize) -> Vec<u8> {
    let mut data = vec![0xff, 0xd8];
    data.extend(std::iter::repeat(0x42).take(size.saturating_sub(4)));
    data.extend([0xff, 0xd9]);
    data
}

/// Benchmark DHT22 pulse decoding
fn bench_sensor_decoding(c: &mut Criterion) {
    let frame = [0x02, 0x8c, 0x01, 0x5f, 0xee];
    let pulses = pulse_train(frame);

    c.bench_function("dht22_pulses_to_frame", |b| {
        b.iter(|| pulses_to_frame(&pulses).expect("Should decode pulses"))
    });

    c.bench_function("dht22_decode_frame", |b| {
        b.iter(|| decode_frame(frame).expect("Should decode frame"))
    });
}

/// Benchmark splitting an MJPEG byte stream into frames
fn bench_mjpeg_splitting(c: &mut Criterion) {
    for size in [16 * 1024, 64 * 1024, 256 * 1024].iter() {
        let mut stream = Vec::new();
        for _ in 0..4 {
            stream.extend(jpeg(*size));
        }

        c.bench_with_input(BenchmarkId::new("mjpeg_split", size), &stream, |b, stream| {
            b.iter(|| {
                let mut splitter = MjpegSplitter::new();
                let mut frames = 0;
                for chunk in stream.chunks(4096) {
                    splitter.push(chunk);
                    while splitter.next_frame().is_some() {
                        frames += 1;
                    }
                }
                frames
            })
        });
    }
}

/// Benchmark multipart part framing
fn bench_frame_part(c: &mut Criterion) {
    let frame = jpeg(64 * 1024);

    c.bench_function("multipart_frame_part", |b| b.iter(|| frame_part(&frame)));
}

/// Benchmark a full read on simulated hardware
fn bench_simulated_read(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("Should create tokio runtime");
    let panel = Panel::simulated().expect("Should build simulated panel");

    c.bench_function("simulated_sensor_read", |b| {
        b.to_async(&rt)
            .iter(|| async { panel.read_sensor().await.expect("Should read sensor") })
    });
}

criterion_group!(
    benches,
    bench_sensor_decoding,
    bench_mjpeg_splitting,
    bench_frame_part,
    bench_simulated_read
);
criterion_main!(benches);
