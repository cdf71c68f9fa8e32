//! Polled gesture detection for a single button line
//!
//! [`GestureButton`] classifies the raw active/inactive samples of one line
//! into Single, Double and Long presses. It has no timer of its own: the
//! host loop calls [`GestureButton::triggered`] (or [`GestureButton::poll`])
//! as often as it can, and every transition is decided from the current
//! probe sample and the clock.
//!
//! Trigger rules:
//! - A press held continuously fires Long every `long_ms` until released.
//! - A press held at least `single_ms` and released before `long_ms` is a
//!   completed press. With `double_ms == 0` it fires Single at once;
//!   otherwise a window of `double_ms` opens. A second press starting inside
//!   the window and held `single_ms` fires Double. If the window closes
//!   first, Single fires at its expiry.
//! - The long deadline is checked before anything else, so with
//!   `single_ms >= long_ms` only Long can fire.
//! - After a trigger nothing fires again until the press/release cycle that
//!   produced it is over (except the Long repeats above).

use crate::hal::{Clock, Duration, Instant, LineProbe};
use crate::types::{GestureState, GestureTiming, LineId, PressType};

/// Gesture classifier for one input line
pub struct GestureButton<P, C> {
    probe: P,
    clock: C,
    line: LineId,
    state: GestureState,
    last: Option<PressType>,
}

impl<P, C> GestureButton<P, C>
where
    P: LineProbe,
    C: Clock,
{
    /// Create a button on `line`; the returned button is already reset
    pub fn new(line: LineId, probe: P, clock: C) -> Self {
        Self {
            probe,
            clock,
            line,
            state: GestureState::Idle,
            last: None,
        }
    }

    /// Clear all timing state; call before entering a polling loop
    pub fn reset(&mut self) {
        self.state = GestureState::Idle;
        self.last = None;
    }

    pub fn line(&self) -> LineId {
        self.line
    }

    /// Current FSM state
    pub fn state(&self) -> GestureState {
        self.state
    }

    /// Classification of the most recent trigger, `None` if nothing fired since reset
    pub fn press_type(&self) -> Option<PressType> {
        self.last
    }

    /// Returns true exactly once when a gesture completes
    ///
    /// The thresholds may change from call to call; deadlines already running
    /// keep the values they were started with.
    pub fn triggered(&mut self, single_ms: u16, double_ms: u16, long_ms: u16) -> bool {
        self.poll(&GestureTiming::new(single_ms, double_ms, long_ms))
            .is_some()
    }

    /// Sample the line once and return the gesture completed by this sample
    pub fn poll(&mut self, timing: &GestureTiming) -> Option<PressType> {
        let now = self.clock.now();
        let active = self.probe.is_active(self.line);

        let fired = match self.state {
            GestureState::Idle => self.handle_idle(active, now, timing),
            GestureState::Pressed { long_at, .. } | GestureState::Primed { long_at } => {
                self.handle_first_press(active, now, long_at, timing)
            }
            GestureState::LongHeld { next_long_at } => {
                self.handle_long_held(active, now, next_long_at, timing)
            }
            GestureState::DoubleWindow { expires_at } => {
                self.handle_double_window(active, now, expires_at, timing)
            }
            GestureState::SecondPress {
                single_at,
                expires_at,
            } => self.handle_second_press(active, now, single_at, expires_at),
            GestureState::DoubleHeld => {
                if !active {
                    self.state = GestureState::Idle;
                }
                None
            }
        };

        if let Some(press) = fired {
            self.last = Some(press);
            #[cfg(feature = "defmt")]
            defmt::debug!("Line {} triggered {:?}", self.line.number(), press);
        }
        fired
    }

    /// Returns true once while the first press is held past the single threshold
    pub fn primed(&mut self) -> bool {
        match self.state {
            GestureState::Pressed { single_at, long_at } if self.clock.now() >= single_at => {
                self.state = GestureState::Primed { long_at };
                true
            }
            _ => false,
        }
    }

    /// Busy-wait until the line is released
    pub fn wait(&mut self) {
        while self.probe.is_active(self.line) {
            core::hint::spin_loop();
        }
    }

    fn handle_idle(&mut self, active: bool, now: Instant, timing: &GestureTiming) -> Option<PressType> {
        if active {
            self.state = GestureState::Pressed {
                single_at: now + millis(timing.single_ms),
                long_at: now + millis(timing.long_ms),
            };
        }
        None
    }

    fn handle_first_press(
        &mut self,
        active: bool,
        now: Instant,
        long_at: Instant,
        timing: &GestureTiming,
    ) -> Option<PressType> {
        if now >= long_at {
            self.state = if active {
                GestureState::LongHeld {
                    next_long_at: long_at + millis(timing.long_ms),
                }
            } else {
                GestureState::Idle
            };
            return Some(PressType::Long);
        }

        if active {
            return None;
        }

        let qualified = match self.state {
            GestureState::Pressed { single_at, .. } => now >= single_at,
            _ => true,
        };
        if !qualified {
            self.state = GestureState::Idle;
            return None;
        }

        if timing.double_ms == 0 {
            self.state = GestureState::Idle;
            Some(PressType::Single)
        } else {
            self.state = GestureState::DoubleWindow {
                expires_at: now + millis(timing.double_ms),
            };
            None
        }
    }

    fn handle_long_held(
        &mut self,
        active: bool,
        now: Instant,
        next_long_at: Instant,
        timing: &GestureTiming,
    ) -> Option<PressType> {
        if !active {
            self.state = GestureState::Idle;
            return None;
        }
        if now >= next_long_at {
            self.state = GestureState::LongHeld {
                next_long_at: next_long_at + millis(timing.long_ms),
            };
            return Some(PressType::Long);
        }
        None
    }

    fn handle_double_window(
        &mut self,
        active: bool,
        now: Instant,
        expires_at: Instant,
        timing: &GestureTiming,
    ) -> Option<PressType> {
        if now >= expires_at {
            self.state = GestureState::Idle;
            return Some(PressType::Single);
        }
        if active {
            self.state = GestureState::SecondPress {
                single_at: now + millis(timing.single_ms),
                expires_at,
            };
        }
        None
    }

    fn handle_second_press(
        &mut self,
        active: bool,
        now: Instant,
        single_at: Instant,
        expires_at: Instant,
    ) -> Option<PressType> {
        if !active {
            // Too short to count; the window keeps running
            self.state = GestureState::DoubleWindow { expires_at };
            return None;
        }
        if now >= single_at {
            self.state = GestureState::DoubleHeld;
            return Some(PressType::Double);
        }
        None
    }
}

fn millis(ms: u16) -> Duration {
    Duration::from_millis(ms as u64)
}
