//! Parameterised boundary tests for pulse trains and gesture timing

use accessory_core::hal::mock::MockPulseChannel;
use accessory_core::{
    ChannelSlot, GestureTiming, PulseError, PulseTrain, PulseTrainTransmitter, LineId, MAX_PULSES,
};
use embedded_hal::digital::PinState;
use rstest::rstest;
use std::num::NonZeroU8;

#[rstest]
#[case(0, false)]
#[case(1, true)]
#[case(1000, true)]
#[case(32767, true)]
#[case(32768, false)]
#[case(u16::MAX, false)]
fn phase_duration_bounds(#[case] ticks: u16, #[case] accepted: bool) {
    let mut train = PulseTrain::new();
    let result = train.phase(ticks, PinState::High);
    if accepted {
        assert_eq!(result, Ok(()));
        assert_eq!(train.len(), 1);
    } else {
        assert_eq!(result, Err(PulseError::InvalidDuration { ticks }));
        assert!(train.is_empty());
    }
}

#[rstest]
#[case(0, 1)]
#[case(1, 1)]
#[case(2, 2)]
#[case(3, 2)]
#[case(MAX_PULSES - 1, 512)]
#[case(MAX_PULSES, 512)]
fn image_always_holds_terminator(#[case] len: usize, #[case] words: usize) {
    let mut train = PulseTrain::new();
    for _ in 0..len {
        train.phase(9, PinState::Low).unwrap();
    }
    assert_eq!(train.word_count(), words);

    let image: Vec<u32> = train.words().collect();
    assert_eq!(image.len(), words);
    let terminator = if len % 2 == 0 {
        image[len / 2] & 0xFFFF
    } else {
        image[len / 2] >> 16
    };
    assert_eq!(terminator, 0);
}

#[rstest]
#[case(0, 0)]
#[case(1, 2)]
#[case(MAX_PULSES / 2, MAX_PULSES - 1)]
fn add_fills_in_pairs(#[case] pairs: usize, #[case] len: usize) {
    let mut train = PulseTrain::new();
    for _ in 0..pairs {
        train.add(10, 20).unwrap();
    }
    assert_eq!(train.len(), len);
}

#[rstest]
#[case(100, 200, Ok(()), 2)]
#[case(100, 0, Err(PulseError::InvalidDuration { ticks: 0 }), 1)]
#[case(0, 200, Err(PulseError::InvalidDuration { ticks: 0 }), 1)]
#[case(40000, 0, Err(PulseError::InvalidDuration { ticks: 40000 }), 0)]
fn add_reports_first_rejected_phase(
    #[case] on: u16,
    #[case] off: u16,
    #[case] expected: Result<(), PulseError>,
    #[case] len: usize,
) {
    let mut train = PulseTrain::new();
    assert_eq!(train.add(on, off), expected);
    assert_eq!(train.len(), len);
}

#[test]
fn add_into_last_slot_keeps_high_phase() {
    let mut train = PulseTrain::new();
    for _ in 0..MAX_PULSES - 1 {
        train.phase(9, PinState::Low).unwrap();
    }
    assert_eq!(train.add(10, 20), Err(PulseError::BufferFull));
    assert_eq!(train.len(), MAX_PULSES);
    assert_eq!(train.pulses()[MAX_PULSES - 1].level(), PinState::High);
}

#[rstest]
#[case(0, 0, 0)]
#[case(1, 1, 1)]
#[case(3, 3, 3)]
#[case(255, 255, 255)]
fn repeat_count_sets_traversals(
    #[case] repeats: u8,
    #[case] completions: u32,
    #[case] restarts: u32,
) {
    let slot = ChannelSlot::new();
    let mut tx =
        PulseTrainTransmitter::new(&slot, MockPulseChannel::new(&slot), LineId(18)).unwrap();
    tx.add(500, 500).unwrap();

    tx.start(repeats, NonZeroU8::new(80).unwrap()).unwrap();
    assert_eq!(tx.channel().completions(), completions);
    assert_eq!(tx.channel().restarts(), restarts);
    assert_eq!(slot.repeats_remaining(), 0);
}

#[rstest]
#[case(GestureTiming::default(), false, false)]
#[case(GestureTiming::new(5, 250, 2000), false, true)]
#[case(GestureTiming::new(5, 0, 2000), false, false)]
#[case(GestureTiming::long_only(2000), true, false)]
#[case(GestureTiming::new(3000, 250, 2000), true, false)]
fn timing_presets(
    #[case] timing: GestureTiming,
    #[case] long_only: bool,
    #[case] doubles: bool,
) {
    assert_eq!(timing.is_long_only(), long_only);
    assert_eq!(timing.doubles_enabled(), doubles);
}
