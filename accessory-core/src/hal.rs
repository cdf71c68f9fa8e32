//! Hardware Abstraction Layer for gesture input and pulse output

// Re-export time types based on feature
#[cfg(feature = "embassy-time")]
pub use embassy_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
pub use self::mock_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
mod mock_time {
    /// Millisecond instant used when building without embassy-time
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Instant(u64);

    impl Instant {
        pub const fn from_millis(ms: u64) -> Self {
            Self(ms)
        }

        pub fn duration_since(&self, other: Instant) -> Duration {
            Duration::from_millis(self.0.saturating_sub(other.0))
        }

        pub const fn as_millis(&self) -> u64 {
            self.0
        }
    }

    /// Millisecond duration used when building without embassy-time
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Duration(u64);

    impl Duration {
        pub const fn from_millis(ms: u64) -> Self {
            Self(ms)
        }

        pub const fn as_millis(&self) -> u64 {
            self.0
        }
    }

    impl core::ops::Add<Duration> for Instant {
        type Output = Instant;

        fn add(self, rhs: Duration) -> Instant {
            Instant(self.0 + rhs.0)
        }
    }

    impl core::ops::Mul<u32> for Duration {
        type Output = Duration;

        fn mul(self, rhs: u32) -> Duration {
            Duration(self.0 * rhs as u64)
        }
    }
}

use core::num::NonZeroU8;

use embedded_hal::digital::InputPin;

use crate::types::LineId;

/// Error types for HAL operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// GPIO operation failed
    GpioError,
    /// Timing operation failed
    TimingError,
    /// Interrupt configuration failed
    InterruptError,
    /// Hardware not initialized
    NotInitialized,
    /// Invalid configuration
    InvalidConfig,
}

#[cfg(feature = "std")]
impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::GpioError => write!(f, "GPIO operation failed"),
            HalError::TimingError => write!(f, "Timing operation failed"),
            HalError::InterruptError => write!(f, "Interrupt configuration failed"),
            HalError::NotInitialized => write!(f, "Hardware not initialized"),
            HalError::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Monotonic millisecond time source
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Clock backed by the embassy time driver
#[cfg(feature = "embassy-time")]
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

#[cfg(feature = "embassy-time")]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Reports whether an input line is currently active (pressed / touched)
///
/// Any `FnMut(LineId) -> bool` closure is a probe, which is how custom
/// trigger conditions are supplied.
pub trait LineProbe {
    fn is_active(&mut self, line: LineId) -> bool;
}

impl<F> LineProbe for F
where
    F: FnMut(LineId) -> bool,
{
    fn is_active(&mut self, line: LineId) -> bool {
        self(line)
    }
}

/// Electrical level that counts as "active"
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Pulled up, grounded when pressed
    ActiveLow,
    /// Pulled down, driven high when pressed
    ActiveHigh,
}

/// Probe over any embedded-hal input pin
pub struct PinProbe<P> {
    pin: P,
    polarity: Polarity,
}

impl<P> PinProbe<P>
where
    P: InputPin,
{
    pub fn new(pin: P, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }

    /// Active when the pin reads low
    pub fn active_low(pin: P) -> Self {
        Self::new(pin, Polarity::ActiveLow)
    }

    /// Active when the pin reads high
    pub fn active_high(pin: P) -> Self {
        Self::new(pin, Polarity::ActiveHigh)
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Release the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> LineProbe for PinProbe<P>
where
    P: InputPin,
{
    fn is_active(&mut self, _line: LineId) -> bool {
        // A pin that cannot be read is treated as released
        match self.polarity {
            Polarity::ActiveLow => self.pin.is_low().unwrap_or(false),
            Polarity::ActiveHigh => self.pin.is_high().unwrap_or(false),
        }
    }
}

/// Capacitive touch sensor peripheral
pub trait TouchSensor {
    /// Raw touch reading for `line`
    fn read(&mut self, line: LineId) -> u32;

    /// Set measurement and sleep durations in sensor clock cycles
    fn set_cycles(&mut self, measure: u16, sleep: u16);
}

/// Hardware pulse channel with a fixed block of waveform memory
///
/// The channel free-runs through its memory image until it reads a
/// zero-duration entry, then raises its end-of-transmission interrupt.
pub trait PulseChannel {
    /// One-time peripheral setup: clock enable, memory access, end interrupt, carrier off
    fn configure(&mut self) -> Result<(), HalError>;

    /// Route channel output to `line`, leaving the line's output disabled
    fn attach(&mut self, line: LineId) -> Result<(), HalError>;

    /// Store one 32-bit word (two packed entries) of channel memory
    fn write_word(&mut self, index: usize, word: u32);

    /// One tick = 1 µs * `tick_unit`
    fn set_tick_unit(&mut self, tick_unit: NonZeroU8);

    /// Enable output driving on `line`
    fn enable_output(&mut self, line: LineId);

    /// Disable output driving on `line`
    fn disable_output(&mut self, line: LineId);

    /// Reset the read address to slot 0 and begin a traversal
    fn restart(&mut self);

    /// Acknowledge the end-of-transmission interrupt
    fn clear_end_interrupt(&mut self);

    /// Called repeatedly while a transmission is awaited
    fn idle(&mut self) {
        core::hint::spin_loop();
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use crate::pulse::CHANNEL_WORDS;
    use crate::transmitter::{end_of_transmission, ChannelSlot};
    use core::cell::Cell;

    /// Manually advanced clock
    #[derive(Default)]
    pub struct ManualClock {
        now_ms: Cell<u64>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn at(ms: u64) -> Self {
            let clock = Self::new();
            clock.set(ms);
            clock
        }

        pub fn set(&self, ms: u64) {
            self.now_ms.set(ms);
        }

        pub fn advance(&self, ms: u64) {
            self.now_ms.set(self.now_ms.get() + ms);
        }

        pub fn millis(&self) -> u64 {
            self.now_ms.get()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            Instant::from_millis(self.now_ms.get())
        }
    }

    /// Bank of up to 32 input lines whose active state is set by the test
    #[derive(Default)]
    pub struct MockLines {
        active: Cell<u32>,
        reads: Cell<u32>,
    }

    impl MockLines {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set(&self, line: LineId, active: bool) {
            let bits = self.active.get();
            if active {
                self.active.set(bits | line.mask());
            } else {
                self.active.set(bits & !line.mask());
            }
        }

        pub fn press(&self, line: LineId) {
            self.set(line, true);
        }

        pub fn release(&self, line: LineId) {
            self.set(line, false);
        }

        pub fn is_active(&self, line: LineId) -> bool {
            self.reads.set(self.reads.get() + 1);
            self.active.get() & line.mask() != 0
        }

        /// Number of probe reads so far
        pub fn reads(&self) -> u32 {
            self.reads.get()
        }

        /// Probe closure reading this bank
        pub fn probe(&self) -> impl FnMut(LineId) -> bool + '_ {
            move |line| self.is_active(line)
        }
    }

    /// Touch sensor returning a value shared with the test
    pub struct MockTouchSensor<'a> {
        value: &'a Cell<u32>,
        cycles: Option<(u16, u16)>,
        reads: u32,
    }

    impl<'a> MockTouchSensor<'a> {
        pub fn new(value: &'a Cell<u32>) -> Self {
            Self {
                value,
                cycles: None,
                reads: 0,
            }
        }

        pub fn cycles(&self) -> Option<(u16, u16)> {
            self.cycles
        }

        pub fn reads(&self) -> u32 {
            self.reads
        }
    }

    impl TouchSensor for MockTouchSensor<'_> {
        fn read(&mut self, _line: LineId) -> u32 {
            self.reads += 1;
            self.value.get()
        }

        fn set_cycles(&mut self, measure: u16, sleep: u16) {
            self.cycles = Some((measure, sleep));
        }
    }

    /// Pulse channel that completes a traversal each time it is idled
    ///
    /// `idle()` plays the role of the hardware: a pending traversal finishes
    /// and the completion handler runs synchronously.
    pub struct MockPulseChannel<'a> {
        slot: &'a ChannelSlot,
        memory: [u32; CHANNEL_WORDS],
        fail_configure: bool,
        configure_calls: u32,
        attached: Option<LineId>,
        output_enabled: bool,
        enable_calls: u32,
        disable_calls: u32,
        tick_unit: Option<NonZeroU8>,
        running: bool,
        restarts: u32,
        completions: u32,
        interrupts_cleared: u32,
    }

    impl<'a> MockPulseChannel<'a> {
        pub fn new(slot: &'a ChannelSlot) -> Self {
            Self {
                slot,
                memory: [0xFFFF_FFFF; CHANNEL_WORDS],
                fail_configure: false,
                configure_calls: 0,
                attached: None,
                output_enabled: false,
                enable_calls: 0,
                disable_calls: 0,
                tick_unit: None,
                running: false,
                restarts: 0,
                completions: 0,
                interrupts_cleared: 0,
            }
        }

        /// Channel whose one-time configuration fails
        pub fn failing(slot: &'a ChannelSlot) -> Self {
            let mut channel = Self::new(slot);
            channel.fail_configure = true;
            channel
        }

        pub fn memory(&self) -> &[u32; CHANNEL_WORDS] {
            &self.memory
        }

        pub fn configure_calls(&self) -> u32 {
            self.configure_calls
        }

        pub fn attached(&self) -> Option<LineId> {
            self.attached
        }

        pub fn output_enabled(&self) -> bool {
            self.output_enabled
        }

        pub fn enable_calls(&self) -> u32 {
            self.enable_calls
        }

        pub fn disable_calls(&self) -> u32 {
            self.disable_calls
        }

        pub fn tick_unit(&self) -> Option<NonZeroU8> {
            self.tick_unit
        }

        pub fn is_running(&self) -> bool {
            self.running
        }

        pub fn restarts(&self) -> u32 {
            self.restarts
        }

        /// Number of times the completion handler ran
        pub fn completions(&self) -> u32 {
            self.completions
        }

        pub fn interrupts_cleared(&self) -> u32 {
            self.interrupts_cleared
        }
    }

    impl PulseChannel for MockPulseChannel<'_> {
        fn configure(&mut self) -> Result<(), HalError> {
            self.configure_calls += 1;
            if self.fail_configure {
                Err(HalError::NotInitialized)
            } else {
                Ok(())
            }
        }

        fn attach(&mut self, line: LineId) -> Result<(), HalError> {
            self.attached = Some(line);
            self.output_enabled = false;
            Ok(())
        }

        fn write_word(&mut self, index: usize, word: u32) {
            self.memory[index] = word;
        }

        fn set_tick_unit(&mut self, tick_unit: NonZeroU8) {
            self.tick_unit = Some(tick_unit);
        }

        fn enable_output(&mut self, _line: LineId) {
            self.enable_calls += 1;
            self.output_enabled = true;
        }

        fn disable_output(&mut self, _line: LineId) {
            self.disable_calls += 1;
            self.output_enabled = false;
        }

        fn restart(&mut self) {
            self.restarts += 1;
            self.running = true;
        }

        fn clear_end_interrupt(&mut self) {
            self.interrupts_cleared += 1;
        }

        fn idle(&mut self) {
            if self.running {
                self.running = false;
                self.completions += 1;
                let slot = self.slot;
                end_of_transmission(slot, self);
            }
        }
    }
}
