//! Completion handling with the channel running on its own thread
//!
//! A "hardware" thread plays each traversal and runs the completion handler,
//! the way the end-of-transmission interrupt does on the device, while the
//! transmitter blocks in `start()` on a tokio blocking task.

use std::num::NonZeroU8;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use accessory_core::{
    end_of_transmission, ChannelSlot, HalError, LineId, PulseChannel, PulseError,
    PulseTrainTransmitter,
};
use tokio_test::assert_ok;

const TICK: NonZeroU8 = NonZeroU8::MIN;
const LINE: LineId = LineId(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Enable,
    Restart,
    ClearInterrupt,
    Disable,
}

struct Shared {
    events: Mutex<Vec<Event>>,
    words: Mutex<Vec<u32>>,
    trigger: Mutex<Sender<()>>,
}

/// Channel whose traversals are played by a background thread
#[derive(Clone)]
struct ThreadedChannel {
    shared: Arc<Shared>,
}

impl ThreadedChannel {
    fn new() -> (Self, Receiver<()>) {
        let (tx, rx) = mpsc::channel();
        let shared = Shared {
            events: Mutex::new(Vec::new()),
            words: Mutex::new(Vec::new()),
            trigger: Mutex::new(tx),
        };
        (
            Self {
                shared: Arc::new(shared),
            },
            rx,
        )
    }

    fn record(&self, event: Event) {
        self.shared.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<Event> {
        self.shared.events.lock().unwrap().clone()
    }

    fn words(&self) -> Vec<u32> {
        self.shared.words.lock().unwrap().clone()
    }
}

impl PulseChannel for ThreadedChannel {
    fn configure(&mut self) -> Result<(), HalError> {
        Ok(())
    }

    fn attach(&mut self, _line: LineId) -> Result<(), HalError> {
        Ok(())
    }

    fn write_word(&mut self, index: usize, word: u32) {
        let mut words = self.shared.words.lock().unwrap();
        if words.len() <= index {
            words.resize(index + 1, 0);
        }
        words[index] = word;
    }

    fn set_tick_unit(&mut self, _tick_unit: NonZeroU8) {}

    fn enable_output(&mut self, _line: LineId) {
        self.record(Event::Enable);
    }

    fn disable_output(&mut self, _line: LineId) {
        self.record(Event::Disable);
    }

    fn restart(&mut self) {
        self.record(Event::Restart);
        self.shared.trigger.lock().unwrap().send(()).unwrap();
    }

    fn clear_end_interrupt(&mut self) {
        self.record(Event::ClearInterrupt);
    }

    fn idle(&mut self) {
        thread::yield_now();
    }
}

/// Play one traversal per restart until no restart arrives for a while
fn spawn_hardware(
    slot: &'static ChannelSlot,
    mut channel: ThreadedChannel,
    rx: Receiver<()>,
    traversal: Duration,
) -> thread::JoinHandle<u32> {
    thread::spawn(move || {
        let mut traversals = 0;
        loop {
            match rx.recv_timeout(Duration::from_millis(500)) {
                Ok(()) => {
                    thread::sleep(traversal);
                    traversals += 1;
                    end_of_transmission(slot, &mut channel);
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return traversals
                }
            }
        }
    })
}

fn leak_slot() -> &'static ChannelSlot {
    Box::leak(Box::new(ChannelSlot::new()))
}

#[tokio::test]
async fn start_blocks_until_last_traversal() {
    let slot = leak_slot();
    let (channel, rx) = ThreadedChannel::new();
    let hardware = spawn_hardware(slot, channel.clone(), rx, Duration::from_millis(2));

    let mut tx = PulseTrainTransmitter::new(slot, channel.clone(), LINE).unwrap();
    tx.add(100, 200).unwrap();
    tx.add(300, 400).unwrap();

    let handle = tokio::task::spawn_blocking(move || tx.start(3, TICK));
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("transmission timed out")
        .expect("blocking task panicked");
    assert_ok!(result);

    assert_eq!(
        channel.events(),
        vec![
            Event::Enable,
            Event::Restart,
            Event::ClearInterrupt,
            Event::Restart,
            Event::ClearInterrupt,
            Event::Restart,
            Event::ClearInterrupt,
            Event::Disable,
        ]
    );
    assert_eq!(
        channel.words(),
        vec![
            (100 | 0x8000) | (200 << 16),
            (300 | 0x8000) | (400 << 16),
            0
        ]
    );
    assert_eq!(slot.repeats_remaining(), 0);
    assert!(!slot.is_active());
    assert_eq!(hardware.join().unwrap(), 3);
}

#[tokio::test]
async fn second_transmitter_is_rejected_while_busy() {
    let slot = leak_slot();
    let (channel, rx) = ThreadedChannel::new();
    let hardware = spawn_hardware(slot, channel.clone(), rx, Duration::from_millis(20));

    let mut first = PulseTrainTransmitter::new(slot, channel.clone(), LINE).unwrap();
    first.add(50, 50).unwrap();
    let mut second = PulseTrainTransmitter::new(slot, channel.clone(), LineId(5)).unwrap();
    second.add(60, 60).unwrap();

    let handle = tokio::task::spawn_blocking(move || first.start(5, TICK));

    tokio::time::timeout(Duration::from_secs(5), async {
        while !slot.is_active() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("first transmission never started");

    assert_eq!(second.start(1, TICK), Err(PulseError::ChannelBusy));

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("transmission timed out")
        .expect("blocking task panicked");
    assert_ok!(result);
    assert_eq!(hardware.join().unwrap(), 5);

    // Channel is free again once the first transmission is over
    assert!(!slot.is_active());
}

#[test]
fn spurious_completion_does_not_restart() {
    let slot = ChannelSlot::new();
    let (mut channel, rx) = ThreadedChannel::new();

    end_of_transmission(&slot, &mut channel);
    assert_eq!(slot.repeats_remaining(), 0);
    assert_eq!(channel.events(), vec![Event::ClearInterrupt]);
    assert!(rx.try_recv().is_err());
}
