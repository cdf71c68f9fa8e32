use accessory_core::hal::mock::MockPulseChannel;
use accessory_core::{ChannelSlot, LineId, PulseTrain, PulseTrainTransmitter, MAX_PULSES};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::num::NonZeroU8;

fn full_train() -> PulseTrain {
    let mut train = PulseTrain::new();
    while train.remaining() >= 2 {
        let _ = train.add(350, 1050);
    }
    train
}

fn bench_fill(c: &mut Criterion) {
    c.bench_function("fill_1022_entries", |b| {
        b.iter(|| {
            let mut train = PulseTrain::new();
            for _ in 0..MAX_PULSES / 2 {
                let _ = train.add(black_box(350), black_box(1050));
            }
            train
        })
    });
}

fn bench_encode(c: &mut Criterion) {
    let train = full_train();
    c.bench_function("encode_full_image", |b| {
        b.iter(|| black_box(&train).words().fold(0u32, |acc, w| acc ^ w))
    });
}

fn bench_transmit(c: &mut Criterion) {
    let slot = ChannelSlot::new();
    let mut tx =
        PulseTrainTransmitter::new(&slot, MockPulseChannel::new(&slot), LineId(2)).unwrap();
    tx.load(full_train());
    c.bench_function("transmit_full_image_x4", |b| {
        b.iter(|| tx.start(black_box(4), NonZeroU8::MIN))
    });
}

criterion_group!(benches, bench_fill, bench_encode, bench_transmit);
criterion_main!(benches);
