//! Repeat transmission of a pulse train over a shared hardware channel
//!
//! The channel is a process-wide resource described by a [`ChannelSlot`],
//! normally a `static`. The slot records whether the peripheral has been
//! configured, which transmitter currently owns it, and how many waveform
//! traversals remain. The last field is the only state shared with the
//! end-of-transmission interrupt, which runs [`end_of_transmission`].

use core::num::NonZeroU8;

use embedded_hal::digital::PinState;
use portable_atomic::{AtomicBool, AtomicU32, Ordering};

use crate::hal::{HalError, PulseChannel};
use crate::pulse::PulseTrain;
use crate::types::{LineId, PulseError};

/// Singleton state of one hardware pulse channel
pub struct ChannelSlot {
    configured: AtomicBool,
    active: AtomicBool,
    repeats: AtomicU32,
}

impl ChannelSlot {
    pub const fn new() -> Self {
        Self {
            configured: AtomicBool::new(false),
            active: AtomicBool::new(false),
            repeats: AtomicU32::new(0),
        }
    }

    /// True once the peripheral has been configured
    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    /// True while a transmitter owns the channel
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Traversals left in the current transmission
    pub fn repeats_remaining(&self) -> u32 {
        self.repeats.load(Ordering::Acquire)
    }

    /// Take exclusive ownership of the channel until the guard drops
    pub fn claim(&self) -> Result<ActiveGuard<'_>, PulseError> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ActiveGuard { slot: self })
            .map_err(|_| PulseError::ChannelBusy)
    }

    /// Configure the peripheral if nobody has yet
    ///
    /// Returns `Ok(true)` when this call performed the configuration.
    fn configure_once<C: PulseChannel>(&self, channel: &mut C) -> Result<bool, HalError> {
        if self
            .configured
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }
        if let Err(err) = channel.configure() {
            self.configured.store(false, Ordering::Release);
            return Err(err);
        }
        Ok(true)
    }

    fn arm(&self, repeats: u32) {
        self.repeats.store(repeats, Ordering::Release);
    }

    /// Count one finished traversal
    ///
    /// Returns true if another traversal must be started.
    pub fn complete_traversal(&self) -> bool {
        match self
            .repeats
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => previous > 1,
            Err(_) => false,
        }
    }
}

impl Default for ChannelSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Ownership of a [`ChannelSlot`]; released on drop
pub struct ActiveGuard<'a> {
    slot: &'a ChannelSlot,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.slot.active.store(false, Ordering::Release);
    }
}

/// Body of the end-of-transmission interrupt
///
/// The interrupt is acknowledged before the channel is restarted; a restart
/// issued with the interrupt still pending is lost.
pub fn end_of_transmission<C: PulseChannel + ?Sized>(slot: &ChannelSlot, channel: &mut C) {
    channel.clear_end_interrupt();
    if slot.complete_traversal() {
        channel.restart();
    }
    #[cfg(feature = "defmt")]
    defmt::trace!("Traversal complete, {} remaining", slot.repeats_remaining());
}

/// Drives a pulse train onto one output line through a shared channel
pub struct PulseTrainTransmitter<'a, C> {
    slot: &'a ChannelSlot,
    channel: C,
    line: LineId,
    train: PulseTrain,
}

impl<'a, C> PulseTrainTransmitter<'a, C>
where
    C: PulseChannel,
{
    /// Bind a transmitter to `line`
    ///
    /// The first transmitter created on `slot` configures the peripheral.
    /// The line's output stays disabled until [`start`](Self::start).
    pub fn new(slot: &'a ChannelSlot, mut channel: C, line: LineId) -> Result<Self, PulseError> {
        if slot.configure_once(&mut channel)? {
            #[cfg(feature = "defmt")]
            defmt::info!("Pulse channel configured");
        }
        channel.attach(line)?;

        Ok(Self {
            slot,
            channel,
            line,
            train: PulseTrain::new(),
        })
    }

    pub fn line(&self) -> LineId {
        self.line
    }

    pub fn train(&self) -> &PulseTrain {
        &self.train
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Queued entries
    pub fn len(&self) -> usize {
        self.train.len()
    }

    pub fn is_empty(&self) -> bool {
        self.train.is_empty()
    }

    /// Drop all queued entries
    pub fn clear(&mut self) {
        self.train.clear();
    }

    /// Queue a HIGH phase of `on_ticks` then a LOW phase of `off_ticks`
    pub fn add(&mut self, on_ticks: u16, off_ticks: u16) -> Result<(), PulseError> {
        self.train.add(on_ticks, off_ticks)
    }

    /// Queue one phase
    pub fn phase(&mut self, ticks: u16, level: PinState) -> Result<(), PulseError> {
        self.train.phase(ticks, level)
    }

    /// Replace the queued waveform
    pub fn load(&mut self, train: PulseTrain) {
        self.train = train;
    }

    /// Transmit the queued waveform `repeat_count` times, one tick = `tick_unit` µs
    ///
    /// Blocks until the last traversal completes, then disables output on the
    /// line. The end-of-transmission interrupt restarts each traversal.
    pub fn start(&mut self, repeat_count: u8, tick_unit: NonZeroU8) -> Result<(), PulseError> {
        if repeat_count == 0 {
            return Ok(());
        }
        let _guard = self.slot.claim()?;

        for (index, word) in self.train.words().enumerate() {
            self.channel.write_word(index, word);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Transmitting {} entries x{} on line {}",
            self.train.len(),
            repeat_count,
            self.line.number()
        );

        self.channel.enable_output(self.line);
        self.slot.arm(repeat_count as u32);
        self.channel.set_tick_unit(tick_unit);
        self.channel.restart();

        while self.slot.repeats_remaining() != 0 {
            self.channel.idle();
        }

        self.channel.disable_output(self.line);
        Ok(())
    }
}
