#![no_std]
#![no_main]

#[cfg(feature = "defmt")]
use defmt_rtt as _;

// RISC-V runtime
use riscv_rt as _;

// Panic handler
use panic_halt as _;

use embassy_executor::Spawner;
use embassy_time::Duration;
use static_cell::StaticCell;

use accessory_firmware::*;

// Static resources
static TRANSMITTER: StaticCell<Transmitter> = StaticCell::new();

/// Main firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    #[cfg(feature = "defmt")]
    defmt::info!("Accessory firmware starting...");

    time_driver::init();
    // SysTick and TIM2 are unmasked in the PFIC; let them through
    unsafe { riscv::interrupt::enable() };

    let button = GestureButton::new(
        pins::BUTTON_LINE,
        PinProbe::active_low(ButtonPin::init(pins::BUTTON_PIN)),
        SystemClock,
    );

    match PulseTrainTransmitter::new(&TX_SLOT, TimerPulseChannel::new(), pins::PULSE_LINE) {
        Ok(tx) => {
            let tx = TRANSMITTER.init(tx);
            spawner.must_spawn(control_task(button, tx));
            #[cfg(feature = "defmt")]
            defmt::info!("Accessory firmware ready");
        }
        Err(_err) => {
            #[cfg(feature = "defmt")]
            defmt::error!("Pulse channel unavailable: {:?}", _err);
        }
    }

    // Main supervision loop
    loop {
        embassy_time::Timer::after(Duration::from_secs(1)).await;
        #[cfg(feature = "defmt")]
        defmt::trace!("Heartbeat");
    }
}
