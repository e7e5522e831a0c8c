//! Criterion benchmarks for the console mappers and the readiness scan.
//!
//! Every console message during loading goes through `decode`, a store apply,
//! and a full readiness rescan, so these three together bound loading
//! throughput.
//!
//! Run with:
//! ```bash
//! cargo bench --package mixer-core --bench mapping_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mixer_core::{
    AuxConfig, ConsoleFamily, Mapper, MixerConfig, MixerUpdate, ValueStore, WireMessage,
    WireValue,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn make_config(aux_count: u32, channel_count: u32) -> MixerConfig {
    MixerConfig {
        aux: (1..=aux_count)
            .map(|n| AuxConfig {
                channel: n,
                send: Some(69 + n),
                stereo: n % 2 == 1,
                colour: "6, 106, 166".to_string(),
                label: None,
            })
            .collect(),
        channels: (1..=channel_count).collect(),
        ignore_channels: Vec::new(),
    }
}

fn sd_level() -> WireMessage {
    WireMessage::new(
        "/sd/Input_Channels/12/Aux_Send/3/send_level",
        vec![WireValue::Float(0.42)],
    )
}

fn s_level() -> WireMessage {
    WireMessage::new("/channel/12/send/72/level", vec![WireValue::Float(-12.0)])
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_decode(c: &mut Criterion) {
    let cfg = make_config(9, 48);
    let aux_channels = cfg.aux_channels();
    let mut group = c.benchmark_group("decode");

    for (family, wire) in [(ConsoleFamily::Sd, sd_level()), (ConsoleFamily::S, s_level())] {
        let mapper = Mapper::new(family, &cfg.aux).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(family), &wire, |b, wire| {
            b.iter(|| mapper.decode(black_box(wire), black_box(&aux_channels)));
        });
    }
    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let cfg = make_config(9, 48);
    let update = MixerUpdate::Pan {
        aux: 3,
        channel: 12,
        pan: -0.25,
    };
    let mut group = c.benchmark_group("encode");

    for family in [ConsoleFamily::Sd, ConsoleFamily::S] {
        let mapper = Mapper::new(family, &cfg.aux).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(family), &update, |b, update| {
            b.iter(|| mapper.encode(black_box(update)));
        });
    }
    group.finish();
}

fn bench_readiness_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("readiness_scan");

    for channels in [16_u32, 48, 96] {
        let store = ValueStore::new(&make_config(9, channels));
        group.bench_with_input(BenchmarkId::from_parameter(channels), &store, |b, store| {
            b.iter(|| black_box(store).is_ready());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_decode, bench_encode, bench_readiness_scan);
criterion_main!(benches);
