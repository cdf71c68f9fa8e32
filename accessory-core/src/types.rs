//! Core data types for gesture detection and pulse transmission

use crate::hal::{HalError, Instant};

/// Identifier of a physical input or output line (GPIO number)
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineId(pub u8);

impl LineId {
    /// Raw line number
    pub const fn number(&self) -> u8 {
        self.0
    }

    /// Single-bit mask of this line within a 32-bit port register
    pub const fn mask(&self) -> u32 {
        1 << (self.0 & 31)
    }
}

/// Classified button gesture
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PressType {
    /// Press held past the single threshold and released, no second press
    Single,
    /// Two qualifying presses inside the double-press window
    Double,
    /// Press held continuously past the long threshold
    Long,
}

impl PressType {
    /// Numeric code of this gesture (0 = Single, 1 = Double, 2 = Long)
    pub const fn code(&self) -> u8 {
        match self {
            PressType::Single => 0,
            PressType::Double => 1,
            PressType::Long => 2,
        }
    }
}

/// Gesture FSM states
///
/// Deadlines are absolute instants computed when the state is entered.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum GestureState {
    /// No press in progress, no pending double-press window
    Idle,
    /// First press held, single threshold not yet reported through `primed()`
    Pressed { single_at: Instant, long_at: Instant },
    /// First press held past the single threshold and already reported as primed
    Primed { long_at: Instant },
    /// Long press fired, still held; fires again at `next_long_at`
    LongHeld { next_long_at: Instant },
    /// First press completed, waiting for a second press until `expires_at`
    DoubleWindow { expires_at: Instant },
    /// Second press started inside the window, not yet held long enough
    SecondPress { single_at: Instant, expires_at: Instant },
    /// Double press fired, waiting for release
    DoubleHeld,
}

impl GestureState {
    /// Returns true while the line is known to be held
    pub const fn is_held(&self) -> bool {
        match self {
            GestureState::Pressed { .. }
            | GestureState::Primed { .. }
            | GestureState::LongHeld { .. }
            | GestureState::SecondPress { .. }
            | GestureState::DoubleHeld => true,
            GestureState::Idle | GestureState::DoubleWindow { .. } => false,
        }
    }

    /// Returns true while a completed first press waits for a possible second press
    pub const fn is_double_candidate(&self) -> bool {
        matches!(
            self,
            GestureState::DoubleWindow { .. } | GestureState::SecondPress { .. }
        )
    }
}

/// Gesture timing thresholds, all in milliseconds
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GestureTiming {
    /// Minimum hold for a press to count
    pub single_ms: u16,
    /// Maximum gap after release in which a second press makes a double (0 disables doubles)
    pub double_ms: u16,
    /// Hold time for a long press, repeated while held
    pub long_ms: u16,
}

impl Default for GestureTiming {
    fn default() -> Self {
        Self {
            single_ms: 5,
            double_ms: 0,
            long_ms: 2000,
        }
    }
}

impl GestureTiming {
    pub const fn new(single_ms: u16, double_ms: u16, long_ms: u16) -> Self {
        Self {
            single_ms,
            double_ms,
            long_ms,
        }
    }

    /// Thresholds under which only long presses can fire
    pub const fn long_only(long_ms: u16) -> Self {
        Self {
            single_ms: long_ms,
            double_ms: 0,
            long_ms,
        }
    }

    /// Returns true if single and double classification is unreachable
    pub const fn is_long_only(&self) -> bool {
        self.single_ms >= self.long_ms
    }

    /// Returns true if double presses can occur
    pub const fn doubles_enabled(&self) -> bool {
        self.double_ms > 0 && !self.is_long_only()
    }
}

/// Pulse encoding and transmission errors
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PulseError {
    /// Waveform buffer already holds the maximum number of entries
    BufferFull,
    /// Duration outside 1..=32767 ticks
    InvalidDuration { ticks: u16 },
    /// Another transmitter currently owns the channel
    ChannelBusy,
    /// Channel hardware failure
    Hal(HalError),
}

impl From<HalError> for PulseError {
    fn from(err: HalError) -> Self {
        PulseError::Hal(err)
    }
}

#[cfg(feature = "std")]
impl core::fmt::Display for PulseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PulseError::BufferFull => write!(
                f,
                "Can't add more than {} entries to pulse train",
                crate::pulse::MAX_PULSES
            ),
            PulseError::InvalidDuration { ticks } => write!(
                f,
                "Pulse duration {} is out of allowable range: 1-{}",
                ticks,
                crate::pulse::MAX_TICKS
            ),
            PulseError::ChannelBusy => write!(f, "Pulse channel is busy"),
            PulseError::Hal(err) => write!(f, "Pulse channel failure: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PulseError {}
