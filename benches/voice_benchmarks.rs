//! Performance benchmarks for the vocero audio pipeline
//!
//! Run with: cargo bench
//! Or for specific benchmarks: cargo bench -- <filter>

use std::f32::consts::PI;
use std::sync::Arc;
use std::time::Duration;

use base64::prelude::*;
use criterion::{
    BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};
use parking_lot::Mutex;

use vocero::core::audio::pcm::{StreamResampler, decode_pcm16, downmix_mono, encode_pcm16};
use vocero::core::audio::{OutputSink, PlaybackScheduler, SourceId, VolumeMeter};
use vocero::core::channel::gemini::{ClientMessage, ServerMessage};

/// Generate a sine test block
fn sine_block(samples: usize, sample_rate: f32) -> Vec<f32> {
    let angular = 2.0 * PI * 440.0 / sample_rate;
    (0..samples)
        .map(|i| (angular * i as f32).sin() * 0.5)
        .collect()
}

/// Sink that discards audio and reports each source finished immediately,
/// so the scheduler's active set stays small across iterations.
#[derive(Default)]
struct ImmediateSink {
    last: Mutex<Option<SourceId>>,
}

impl OutputSink for ImmediateSink {
    fn clock(&self) -> f64 {
        0.0
    }

    fn schedule(&self, id: SourceId, samples: Vec<f32>, _start_at: f64) {
        black_box(samples.len());
        *self.last.lock() = Some(id);
    }

    fn stop(&self, _id: SourceId) {}

    fn drain_finished(&self) -> Vec<SourceId> {
        self.last.lock().take().into_iter().collect()
    }

    fn shutdown(&self) {}
}

/// Sink that discards audio and never finishes anything.
#[derive(Default)]
struct DiscardSink;

impl OutputSink for DiscardSink {
    fn clock(&self) -> f64 {
        0.0
    }

    fn schedule(&self, _id: SourceId, samples: Vec<f32>, _start_at: f64) {
        black_box(samples.len());
    }

    fn stop(&self, _id: SourceId) {}

    fn drain_finished(&self) -> Vec<SourceId> {
        Vec::new()
    }

    fn shutdown(&self) {}
}

/// Benchmark PCM16 encode/decode at pipeline block sizes
fn bench_pcm_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("pcm_conversion");
    group.measurement_time(Duration::from_secs(5));

    // 20ms frame, one capture block, one second of capture audio
    for samples in [320usize, 4096, 16000] {
        let block = sine_block(samples, 16_000.0);
        group.throughput(Throughput::Bytes((samples * 2) as u64));
        group.bench_with_input(BenchmarkId::new("encode", samples), &block, |b, block| {
            b.iter(|| encode_pcm16(black_box(block)));
        });
    }

    // one decoded playback chunk, one second of playback audio
    for samples in [2400usize, 24000] {
        let bytes = encode_pcm16(&sine_block(samples, 24_000.0)).to_vec();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("decode", bytes.len()),
            &bytes,
            |b, bytes| {
                b.iter(|| decode_pcm16(black_box(bytes)));
            },
        );
    }

    group.finish();
}

/// Benchmark the volume meter over one capture block
fn bench_volume_meter(c: &mut Criterion) {
    let mut group = c.benchmark_group("volume_meter");
    group.measurement_time(Duration::from_secs(5));

    let meter = VolumeMeter::default();
    let voice = sine_block(4096, 16_000.0);
    let silence = vec![0.0f32; 4096];

    group.throughput(Throughput::Elements(4096));
    group.bench_function("level_voice_block", |b| {
        b.iter(|| meter.level(black_box(&voice)));
    });
    group.bench_function("level_silent_block", |b| {
        b.iter(|| meter.level(black_box(&silence)));
    });

    group.finish();
}

/// Benchmark the per-callback device work: downmix and resample
fn bench_device_callback_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("device_callback_path");
    group.measurement_time(Duration::from_secs(5));

    // 10ms of interleaved stereo at a common device rate
    let mono = sine_block(480, 48_000.0);
    let interleaved: Vec<f32> = mono.iter().flat_map(|&s| [s, s]).collect();

    group.bench_function("downmix_stereo_10ms", |b| {
        b.iter(|| downmix_mono(black_box(&interleaved), 2));
    });

    group.bench_function("resample_48k_to_16k_10ms", |b| {
        let mut resampler = StreamResampler::new(48_000, 16_000);
        let mut out = Vec::with_capacity(512);
        b.iter(|| {
            out.clear();
            resampler.push(black_box(&mono), &mut out);
            black_box(out.len())
        });
    });

    group.finish();
}

/// Benchmark wire message building and parsing
fn bench_wire_messages(c: &mut Criterion) {
    let mut group = c.benchmark_group("wire_messages");
    group.measurement_time(Duration::from_secs(5));

    // One capture block as it goes onto the socket
    let pcm = encode_pcm16(&sine_block(4096, 16_000.0));
    group.throughput(Throughput::Bytes(pcm.len() as u64));
    group.bench_function("encode_audio_chunk_json", |b| {
        b.iter(|| serde_json::to_string(&ClientMessage::audio_chunk(black_box(&pcm))).unwrap());
    });

    // One model audio chunk as it comes off the socket
    let payload = BASE64_STANDARD.encode(encode_pcm16(&sine_block(2400, 24_000.0)));
    let audio_json = format!(
        r#"{{"serverContent":{{"modelTurn":{{"parts":[{{"inlineData":{{"mimeType":"audio/pcm;rate=24000","data":"{payload}"}}}}]}}}}}}"#
    );
    group.throughput(Throughput::Bytes(audio_json.len() as u64));
    group.bench_with_input(
        BenchmarkId::new("parse_server_audio", audio_json.len()),
        &audio_json,
        |b, msg| {
            b.iter(|| {
                let parsed: ServerMessage = serde_json::from_str(black_box(msg)).unwrap();
                parsed.decode_audio().unwrap().unwrap()
            });
        },
    );

    let control = r#"{"serverContent":{"interrupted":true,"turnComplete":true}}"#;
    group.bench_function("parse_server_control", |b| {
        b.iter(|| {
            let parsed: ServerMessage = serde_json::from_str(black_box(control)).unwrap();
            (parsed.is_interrupted(), parsed.is_turn_complete())
        });
    });

    group.finish();
}

/// Benchmark playback scheduling operations
fn bench_playback_scheduling(c: &mut Criterion) {
    let mut group = c.benchmark_group("playback_scheduling");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("enqueue_100ms_chunk", |b| {
        let scheduler = PlaybackScheduler::new(Arc::new(ImmediateSink::default()));
        let chunk = sine_block(2400, 24_000.0);
        b.iter(|| scheduler.enqueue(black_box(chunk.clone())));
    });

    group.bench_function("interrupt_ten_sources", |b| {
        b.iter_batched(
            || {
                let scheduler = PlaybackScheduler::new(Arc::new(DiscardSink));
                for _ in 0..10 {
                    scheduler.enqueue(vec![0.2f32; 2400]);
                }
                scheduler
            },
            |scheduler| scheduler.interrupt(),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_pcm_conversion,
    bench_volume_meter,
    bench_device_callback_path,
    bench_wire_messages,
    bench_playback_scheduling,
);
criterion_main!(benches);
