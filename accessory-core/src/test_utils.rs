//! Test utilities for gesture and transmitter behaviour

#[cfg(all(feature = "test-utils", feature = "std"))]
pub mod press_simulator {
    //! Scripted button presses replayed against a virtual clock

    use crate::button::GestureButton;
    use crate::hal::mock::{ManualClock, MockLines};
    use crate::types::{GestureTiming, LineId, PressType};
    use heapless::{String, Vec};

    /// Line driven by the simulator
    pub const SIM_LINE: LineId = LineId(0);

    /// Line level change at an absolute time
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PressEvent {
        pub at_ms: u64,
        pub active: bool,
    }

    /// Sequence of press/release edges
    #[derive(Debug, Clone)]
    pub struct PressPattern {
        pub events: Vec<PressEvent, 32>,
        pub description: String<32>,
    }

    impl PressPattern {
        pub fn new(description: &str) -> Self {
            let mut name = String::new();
            for c in description.chars() {
                if name.push(c).is_err() {
                    break;
                }
            }
            Self {
                events: Vec::new(),
                description: name,
            }
        }

        /// One press held for `hold_ms`
        pub fn single(hold_ms: u64) -> Self {
            Self::new("Single").press(0, hold_ms)
        }

        /// Two presses of `hold_ms` separated by `gap_ms`
        pub fn double(hold_ms: u64, gap_ms: u64) -> Self {
            Self::new("Double")
                .press(0, hold_ms)
                .press(hold_ms + gap_ms, hold_ms)
        }

        /// Continuous hold of `hold_ms`
        pub fn hold(hold_ms: u64) -> Self {
            Self::new("Hold").press(0, hold_ms)
        }

        /// Append a press starting at `start_ms` lasting `hold_ms`
        pub fn press(mut self, start_ms: u64, hold_ms: u64) -> Self {
            let edges = [
                PressEvent { at_ms: start_ms, active: true },
                PressEvent { at_ms: start_ms + hold_ms, active: false },
            ];
            for edge in edges {
                if self.events.push(edge).is_err() {
                    panic!("press pattern '{}' exceeds 32 edges", self.description);
                }
            }
            self
        }

        /// Line level at `t_ms`
        pub fn is_active_at(&self, t_ms: u64) -> bool {
            self.events
                .iter()
                .take_while(|e| e.at_ms <= t_ms)
                .last()
                .map_or(false, |e| e.active)
        }

        /// Time of the last edge
        pub fn end_ms(&self) -> u64 {
            self.events.iter().map(|e| e.at_ms).max().unwrap_or(0)
        }
    }

    /// Something the button reported
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Observed {
        Trigger(PressType),
        Primed,
    }

    /// Report with the virtual time it happened at
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Observation {
        pub at_ms: u64,
        pub observed: Observed,
    }

    /// Replay `pattern`, polling every `poll_ms` until `tail_ms` after its last edge
    pub fn run_pattern(
        pattern: &PressPattern,
        timing: &GestureTiming,
        poll_ms: u64,
        tail_ms: u64,
    ) -> std::vec::Vec<Observation> {
        let clock = ManualClock::new();
        let lines = MockLines::new();
        let mut button = GestureButton::new(SIM_LINE, lines.probe(), &clock);
        button.reset();

        let mut observations = std::vec::Vec::new();
        let end = pattern.end_ms() + tail_ms;
        let mut t = 0;
        while t <= end {
            clock.set(t);
            lines.set(SIM_LINE, pattern.is_active_at(t));

            if let Some(press) = button.poll(timing) {
                observations.push(Observation {
                    at_ms: t,
                    observed: Observed::Trigger(press),
                });
            }
            if button.primed() {
                observations.push(Observation {
                    at_ms: t,
                    observed: Observed::Primed,
                });
            }
            t += poll_ms.max(1);
        }
        observations
    }

    /// Only the triggers of a run, in order
    pub fn triggers(observations: &[Observation]) -> std::vec::Vec<PressType> {
        observations
            .iter()
            .filter_map(|o| match o.observed {
                Observed::Trigger(press) => Some(press),
                Observed::Primed => None,
            })
            .collect()
    }
}
