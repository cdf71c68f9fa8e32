//! Capacitive touch probe with a process-wide threshold
//!
//! All touch buttons share one threshold. It is either set explicitly with
//! [`set_touch_threshold`] or calibrated by the first [`TouchProbe`] created
//! while it is still unset.

use portable_atomic::{AtomicU32, Ordering};

use crate::hal::{LineProbe, TouchSensor};
use crate::types::LineId;

/// Readings averaged during calibration
pub const CALIBRATION_SAMPLES: u32 = 20;

static TOUCH_THRESHOLD: AtomicU32 = AtomicU32::new(0);

/// Set the reading beyond which touch lines count as active
pub fn set_touch_threshold(threshold: u32) {
    TOUCH_THRESHOLD.store(threshold, Ordering::Release);
}

/// Current threshold; 0 when not yet set or calibrated
pub fn touch_threshold() -> u32 {
    TOUCH_THRESHOLD.load(Ordering::Acquire)
}

/// Direction in which a touch moves the sensor reading
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchSense {
    /// Reading drops when touched (charge-time sensors)
    Below,
    /// Reading rises when touched (count-based sensors)
    Above,
}

impl TouchSense {
    fn is_touched(&self, reading: u32, threshold: u32) -> bool {
        match self {
            TouchSense::Below => reading < threshold,
            TouchSense::Above => reading > threshold,
        }
    }

    fn scale_baseline(&self, baseline: u32) -> u32 {
        match self {
            TouchSense::Below => baseline / 2,
            TouchSense::Above => baseline.saturating_mul(2),
        }
    }
}

/// Probe that reports a line active while its touch reading crosses the threshold
pub struct TouchProbe<S> {
    sensor: S,
    sense: TouchSense,
}

impl<S> TouchProbe<S>
where
    S: TouchSensor,
{
    /// Wrap `sensor`, calibrating the shared threshold from `line` if it is unset
    ///
    /// The line must be untouched while the first probe is created.
    pub fn new(mut sensor: S, line: LineId, sense: TouchSense) -> Self {
        if touch_threshold() == 0 {
            let sum: u64 = (0..CALIBRATION_SAMPLES)
                .map(|_| sensor.read(line) as u64)
                .sum();
            let baseline = (sum / CALIBRATION_SAMPLES as u64) as u32;
            let threshold = sense.scale_baseline(baseline);
            // A concurrent calibration may have won
            let _ = TOUCH_THRESHOLD.compare_exchange(
                0,
                threshold,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            #[cfg(feature = "defmt")]
            defmt::info!("Touch threshold calibrated to {}", touch_threshold());
        }
        Self { sensor, sense }
    }

    /// Set measurement and sleep durations of the touch peripheral
    ///
    /// The peripheral is shared, so this affects every touch line.
    pub fn set_cycles(&mut self, measure: u16, sleep: u16) {
        self.sensor.set_cycles(measure, sleep);
    }

    pub fn sense(&self) -> TouchSense {
        self.sense
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }
}

impl<S> LineProbe for TouchProbe<S>
where
    S: TouchSensor,
{
    fn is_active(&mut self, line: LineId) -> bool {
        let reading = self.sensor.read(line);
        self.sense.is_touched(reading, touch_threshold())
    }
}
