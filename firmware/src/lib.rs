#![no_std]

//! Firmware library: board bindings, stored pulse codes and the control task

pub use embassy_executor::Spawner;
pub use embassy_time::Duration;
pub use static_cell::StaticCell;

pub use accessory_core::*;

// Re-export hardware implementations
pub use crate::ch32v203_hardware::*;
pub use crate::codes::*;
pub use crate::tasks::*;

/// Pulse codes sent for each gesture
pub mod codes {
    use core::num::NonZeroU8;

    use accessory_core::{PressType, PulseChannel, PulseError, PulseTrainTransmitter};

    /// One tick per microsecond
    pub const TICK_1US: NonZeroU8 = NonZeroU8::MIN;

    /// A stored waveform as (high, low) tick pairs
    #[derive(Copy, Clone, Debug)]
    pub struct PulseCode {
        pub pairs: &'static [(u16, u16)],
        pub repeats: u8,
        pub tick_unit: NonZeroU8,
    }

    // 24-bit fixed-code remote frames: 1 = (1050, 350), 0 = (350, 1050), sync (350, 10850)
    const fn frame(bits: u32) -> [(u16, u16); 25] {
        let mut pairs = [(0u16, 0u16); 25];
        let mut i = 0;
        while i < 24 {
            pairs[i] = if bits & (1 << (23 - i)) != 0 {
                (1050, 350)
            } else {
                (350, 1050)
            };
            i += 1;
        }
        pairs[24] = (350, 10850);
        pairs
    }

    static TOGGLE: [(u16, u16); 25] = frame(0x5A_0F01);
    static SCENE: [(u16, u16); 25] = frame(0x5A_0F02);
    static ALL_OFF: [(u16, u16); 25] = frame(0x5A_0F00);

    pub const SINGLE_CODE: PulseCode = PulseCode {
        pairs: &TOGGLE,
        repeats: 4,
        tick_unit: TICK_1US,
    };

    pub const DOUBLE_CODE: PulseCode = PulseCode {
        pairs: &SCENE,
        repeats: 4,
        tick_unit: TICK_1US,
    };

    pub const LONG_CODE: PulseCode = PulseCode {
        pairs: &ALL_OFF,
        repeats: 8,
        tick_unit: TICK_1US,
    };

    /// Code assigned to a gesture
    pub fn code_for(press: PressType) -> &'static PulseCode {
        match press {
            PressType::Single => &SINGLE_CODE,
            PressType::Double => &DOUBLE_CODE,
            PressType::Long => &LONG_CODE,
        }
    }

    /// Replace the transmitter's waveform with `code` and send it
    pub fn send_code<C: PulseChannel>(
        tx: &mut PulseTrainTransmitter<'_, C>,
        code: &PulseCode,
    ) -> Result<(), PulseError> {
        tx.clear();
        for &(on, off) in code.pairs {
            tx.add(on, off)?;
        }
        tx.start(code.repeats, code.tick_unit)
    }
}

// Embassy tasks module
pub mod tasks {
    use embassy_time::{Duration, Timer};

    use accessory_core::{
        GestureButton, GestureTiming, PinProbe, PressType, PulseTrainTransmitter, SystemClock,
    };

    use crate::ch32v203_hardware::{ButtonPin, TimerPulseChannel};
    use crate::codes::{code_for, send_code};

    pub type Button = GestureButton<PinProbe<ButtonPin>, SystemClock>;
    pub type Transmitter = PulseTrainTransmitter<'static, TimerPulseChannel>;

    /// Button sampling period
    pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

    /// Thresholds used by the control task
    pub const HOST_TIMING: GestureTiming = GestureTiming::new(5, 250, 2000);

    /// Poll the button and transmit the code of each gesture
    #[embassy_executor::task]
    pub async fn control_task(mut button: Button, tx: &'static mut Transmitter) {
        #[cfg(feature = "defmt")]
        defmt::info!("Control task started");
        button.reset();

        loop {
            Timer::after(POLL_INTERVAL).await;

            let Some(press) = button.poll(&HOST_TIMING) else {
                continue;
            };

            #[cfg(feature = "defmt")]
            defmt::info!("Gesture {:?}", press);

            if let Err(_err) = send_code(tx, code_for(press)) {
                #[cfg(feature = "defmt")]
                defmt::warn!("Transmission failed: {:?}", _err);
            }

            if press == PressType::Long {
                button.wait();
            }
        }
    }
}

// CH32V203 hardware module
pub mod ch32v203_hardware;

// Time driver for embassy
pub mod time_driver;
