//! Bounded pulse-train buffer and channel memory encoding
//!
//! A pulse train is an ordered list of timed HIGH/LOW phases. The channel
//! consumes it as packed 16-bit entries, two per 32-bit word of channel
//! memory:
//!
//! ```text
//!  31 | 30 ........ 16 | 15 | 14 ......... 0
//! lvl | ticks (odd)    | lvl| ticks (even)
//! ```
//!
//! The channel has no length register; it stops when it reads an entry with
//! zero ticks, so the image always carries one zero entry after the last
//! pulse. That terminator exists only in the encoded image.

use embedded_hal::digital::PinState;
use heapless::Vec;

use crate::types::PulseError;

/// 32-bit words of channel memory (eight 64-word blocks)
pub const CHANNEL_WORDS: usize = 512;

/// Maximum queued pulses; the last memory slot is reserved for the terminator
pub const MAX_PULSES: usize = CHANNEL_WORDS * 2 - 1;

/// Longest representable phase in ticks (15-bit duration field)
pub const MAX_TICKS: u16 = 0x7FFF;

const LEVEL_BIT: u16 = 1 << 15;

/// One timed phase of the waveform
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pulse {
    ticks: u16,
    level: PinState,
}

impl Pulse {
    /// Validate and build a phase
    pub fn new(ticks: u16, level: PinState) -> Result<Self, PulseError> {
        if ticks == 0 || ticks > MAX_TICKS {
            return Err(PulseError::InvalidDuration { ticks });
        }
        Ok(Self { ticks, level })
    }

    pub const fn ticks(&self) -> u16 {
        self.ticks
    }

    pub const fn level(&self) -> PinState {
        self.level
    }

    /// Packed 16-bit channel entry
    pub const fn encode(&self) -> u16 {
        match self.level {
            PinState::High => self.ticks | LEVEL_BIT,
            PinState::Low => self.ticks,
        }
    }

    /// Inverse of [`Pulse::encode`]; `None` for the zero terminator
    pub fn decode(entry: u16) -> Option<Self> {
        let ticks = entry & MAX_TICKS;
        if ticks == 0 {
            return None;
        }
        let level = if entry & LEVEL_BIT != 0 {
            PinState::High
        } else {
            PinState::Low
        };
        Some(Self { ticks, level })
    }
}

/// Append-only waveform of at most [`MAX_PULSES`] phases
#[derive(Clone, Debug, Default)]
pub struct PulseTrain {
    pulses: Vec<Pulse, MAX_PULSES>,
}

impl PulseTrain {
    pub const fn new() -> Self {
        Self { pulses: Vec::new() }
    }

    /// Drop all queued phases
    pub fn clear(&mut self) {
        self.pulses.clear();
    }

    /// Append a HIGH phase of `on_ticks` followed by a LOW phase of `off_ticks`
    ///
    /// Each phase is queued independently; a rejected phase does not stop the
    /// other. Returns the first error.
    pub fn add(&mut self, on_ticks: u16, off_ticks: u16) -> Result<(), PulseError> {
        let on = self.phase(on_ticks, PinState::High);
        let off = self.phase(off_ticks, PinState::Low);
        on.and(off)
    }

    /// Append a single phase
    pub fn phase(&mut self, ticks: u16, level: PinState) -> Result<(), PulseError> {
        if self.is_full() {
            return Err(Self::report(PulseError::BufferFull));
        }
        let pulse = Pulse::new(ticks, level).map_err(Self::report)?;
        self.pulses
            .push(pulse)
            .map_err(|_| Self::report(PulseError::BufferFull))
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.pulses.len() == MAX_PULSES
    }

    /// Free entries left
    pub fn remaining(&self) -> usize {
        MAX_PULSES - self.pulses.len()
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    /// Total waveform length in ticks for one traversal
    pub fn total_ticks(&self) -> u32 {
        self.pulses.iter().map(|p| p.ticks() as u32).sum()
    }

    /// Number of channel words the encoded image occupies, terminator included
    pub fn word_count(&self) -> usize {
        self.pulses.len() / 2 + 1
    }

    /// Packed channel memory image, ending with the word that holds the terminator
    pub fn words(&self) -> impl Iterator<Item = u32> + '_ {
        let entry = move |index: usize| -> u32 {
            self.pulses.get(index).map_or(0, |p| p.encode() as u32)
        };
        (0..self.word_count()).map(move |word| entry(word * 2) | (entry(word * 2 + 1) << 16))
    }

    fn report(err: PulseError) -> PulseError {
        #[cfg(feature = "defmt")]
        match err {
            PulseError::BufferFull => {
                defmt::warn!("Can't add more than {} entries to pulse train", MAX_PULSES)
            }
            PulseError::InvalidDuration { ticks } => defmt::warn!(
                "Pulse duration {} is out of allowable range: 1-{}",
                ticks,
                MAX_TICKS
            ),
            _ => {}
        }
        err
    }
}
