//! CH32V203 Hardware Implementation
//!
//! 64KB Flash / 20KB RAM. The button is polled straight from the GPIO input
//! register; pulse trains are played by TIM2, whose update interrupt steps
//! through a RAM image of the channel memory.

use core::cell::RefCell;
use core::convert::Infallible;
use core::num::NonZeroU8;

use accessory_core::pulse::{Pulse, CHANNEL_WORDS};
use accessory_core::transmitter::{end_of_transmission, ChannelSlot};
use accessory_core::{HalError, LineId, PulseChannel};
use embassy_sync::blocking_mutex::CriticalSectionMutex;
use embedded_hal::digital::{ErrorType, InputPin, PinState};

/// The one pulse channel of this board
pub static TX_SLOT: ChannelSlot = ChannelSlot::new();

static ENGINE: CriticalSectionMutex<RefCell<PulseEngine>> =
    CriticalSectionMutex::new(RefCell::new(PulseEngine::new()));

/// Memory-mapped register access
mod regs {
    pub const RCC_APB2PCENR: usize = 0x4002_1018;
    pub const RCC_APB1PCENR: usize = 0x4002_101C;
    pub const IOPAEN: u32 = 1 << 2;
    pub const TIM2EN: u32 = 1 << 0;

    pub const GPIOA_CFGLR: usize = 0x4001_0800;
    pub const GPIOA_INDR: usize = 0x4001_0808;
    pub const GPIOA_OUTDR: usize = 0x4001_080C;
    pub const GPIOA_BSHR: usize = 0x4001_0810;

    pub const TIM2_CTLR1: usize = 0x4000_0000;
    pub const TIM2_DMAINTENR: usize = 0x4000_000C;
    pub const TIM2_INTFR: usize = 0x4000_0010;
    pub const TIM2_PSC: usize = 0x4000_0028;
    pub const TIM2_ATRLR: usize = 0x4000_002C;
    pub const CEN: u32 = 1 << 0;
    pub const URS: u32 = 1 << 2;
    pub const UIE: u32 = 1 << 0;
    pub const UIF: u32 = 1 << 0;

    /// 4-bit CFGLR mode nibbles
    pub const MODE_INPUT_FLOATING: u32 = 0b0100;
    pub const MODE_INPUT_PULL: u32 = 0b1000;
    pub const MODE_OUTPUT_PP_50MHZ: u32 = 0b0011;

    pub fn read(addr: usize) -> u32 {
        unsafe { core::ptr::read_volatile(addr as *const u32) }
    }

    pub fn write(addr: usize, value: u32) {
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) }
    }

    pub fn modify(addr: usize, f: impl FnOnce(u32) -> u32) {
        write(addr, f(read(addr)));
    }

    /// Set the CFGLR nibble of PA0..PA7
    pub fn set_pin_mode(pin: u8, mode: u32) {
        let shift = (pin as u32 & 0x7) * 4;
        modify(GPIOA_CFGLR, |v| (v & !(0xF << shift)) | (mode << shift));
    }
}

/// Programmable fast interrupt controller (PFIC)
pub mod pfic {
    const PFIC_IENR: usize = 0xE000_E100;

    /// Interrupt numbers as reported in `mcause`
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum Irq {
        SysTick = 12,
        Tim2 = 44,
    }

    impl Irq {
        /// Interrupt behind an `mcause` exception code, if handled here
        pub const fn from_code(code: usize) -> Option<Irq> {
            match code {
                12 => Some(Irq::SysTick),
                44 => Some(Irq::Tim2),
                _ => None,
            }
        }

        pub const fn number(self) -> usize {
            self as usize
        }
    }

    /// Unmask `irq` in the PFIC
    pub fn enable(irq: Irq) {
        let n = irq.number();
        let reg = PFIC_IENR + (n / 32) * 4;
        // Write-one-to-set register
        super::regs::write(reg, 1 << (n % 32));
    }
}

/// Timer input clock; TIM2 runs from the doubled APB1 clock
pub const TIMER_CLOCK_HZ: u32 = 72_000_000;

/// Button input pin, active-low with the internal pull-up
pub struct ButtonPin {
    pin: u8,
}

impl ButtonPin {
    /// Configure `pin` of port A as a pulled-up input
    pub fn init(pin: u8) -> Self {
        regs::modify(regs::RCC_APB2PCENR, |v| v | regs::IOPAEN);
        regs::set_pin_mode(pin, regs::MODE_INPUT_PULL);
        // OUTDR selects pull-up in input-pull mode
        regs::modify(regs::GPIOA_OUTDR, |v| v | (1 << pin));
        Self { pin }
    }
}

impl ErrorType for ButtonPin {
    type Error = Infallible;
}

impl InputPin for ButtonPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(regs::read(regs::GPIOA_INDR) & (1 << self.pin) != 0)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

/// Playback state shared between the transmitter and the TIM2 interrupt
struct PulseEngine {
    memory: [u32; CHANNEL_WORDS],
    index: usize,
    running: bool,
    end_pending: bool,
    output: Option<LineId>,
}

impl PulseEngine {
    const fn new() -> Self {
        Self {
            memory: [0; CHANNEL_WORDS],
            index: 0,
            running: false,
            end_pending: false,
            output: None,
        }
    }

    fn entry(&self, index: usize) -> u16 {
        match self.memory.get(index / 2) {
            Some(word) if index % 2 == 0 => *word as u16,
            Some(word) => (*word >> 16) as u16,
            None => 0,
        }
    }

    fn drive(&self, level: PinState) {
        if let Some(line) = self.output {
            let bit = match level {
                PinState::High => line.mask(),
                PinState::Low => line.mask() << 16,
            };
            regs::write(regs::GPIOA_BSHR, bit);
        }
    }

    /// Handle one timer update; returns true when a traversal has ended
    fn on_update(&mut self) -> bool {
        if !self.running {
            return self.end_pending;
        }
        let entry = self.entry(self.index);
        self.index += 1;
        match Pulse::decode(entry) {
            Some(pulse) => {
                self.drive(pulse.level());
                regs::write(regs::TIM2_ATRLR, pulse.ticks() as u32 - 1);
                false
            }
            None => {
                self.running = false;
                self.end_pending = true;
                self.drive(PinState::Low);
                regs::modify(regs::TIM2_CTLR1, |v| v & !regs::CEN);
                true
            }
        }
    }
}

/// Handle to the TIM2 pulse engine
///
/// The handle carries no state of its own, so the interrupt handler can
/// create one to run the completion handler.
#[derive(Default)]
pub struct TimerPulseChannel;

impl TimerPulseChannel {
    pub const fn new() -> Self {
        Self
    }

    fn with_engine<R>(f: impl FnOnce(&mut PulseEngine) -> R) -> R {
        ENGINE.lock(|engine| f(&mut engine.borrow_mut()))
    }
}

impl PulseChannel for TimerPulseChannel {
    fn configure(&mut self) -> Result<(), HalError> {
        regs::modify(regs::RCC_APB2PCENR, |v| v | regs::IOPAEN);
        regs::modify(regs::RCC_APB1PCENR, |v| v | regs::TIM2EN);
        if regs::read(regs::RCC_APB1PCENR) & regs::TIM2EN == 0 {
            return Err(HalError::NotInitialized);
        }

        regs::write(regs::TIM2_CTLR1, regs::URS);
        regs::write(regs::TIM2_PSC, TIMER_CLOCK_HZ / 1_000_000 - 1);
        regs::write(regs::TIM2_INTFR, 0);
        regs::write(regs::TIM2_DMAINTENR, regs::UIE);
        pfic::enable(pfic::Irq::Tim2);

        #[cfg(feature = "defmt")]
        defmt::info!("TIM2 pulse engine configured");
        Ok(())
    }

    fn attach(&mut self, line: LineId) -> Result<(), HalError> {
        if line.number() > 7 {
            return Err(HalError::InvalidConfig);
        }
        regs::write(regs::GPIOA_BSHR, line.mask() << 16);
        regs::set_pin_mode(line.number(), regs::MODE_INPUT_FLOATING);
        Ok(())
    }

    fn write_word(&mut self, index: usize, word: u32) {
        Self::with_engine(|engine| {
            if let Some(slot) = engine.memory.get_mut(index) {
                *slot = word;
            }
        });
    }

    fn set_tick_unit(&mut self, tick_unit: NonZeroU8) {
        let ticks_per_unit = TIMER_CLOCK_HZ / 1_000_000 * tick_unit.get() as u32;
        regs::write(regs::TIM2_PSC, ticks_per_unit - 1);
    }

    fn enable_output(&mut self, line: LineId) {
        Self::with_engine(|engine| engine.output = Some(line));
        regs::set_pin_mode(line.number(), regs::MODE_OUTPUT_PP_50MHZ);
    }

    fn disable_output(&mut self, line: LineId) {
        Self::with_engine(|engine| {
            if engine.output == Some(line) {
                engine.output = None;
            }
        });
        regs::set_pin_mode(line.number(), regs::MODE_INPUT_FLOATING);
    }

    fn restart(&mut self) {
        Self::with_engine(|engine| {
            engine.index = 0;
            engine.running = true;
        });
        // One tick of lead-in; the first update loads entry 0
        regs::write(regs::TIM2_ATRLR, 1);
        regs::modify(regs::TIM2_CTLR1, |v| v | regs::CEN);
    }

    fn clear_end_interrupt(&mut self) {
        Self::with_engine(|engine| engine.end_pending = false);
    }

    fn idle(&mut self) {
        unsafe { riscv::asm::wfi() };
    }
}

/// TIM2 update interrupt
pub fn handle_timer_interrupt() {
    regs::modify(regs::TIM2_INTFR, |v| v & !regs::UIF);
    let ended = TimerPulseChannel::with_engine(|engine| engine.on_update());
    if ended {
        end_of_transmission(&TX_SLOT, &mut TimerPulseChannel);
    }
}

/// Interrupt entry for every PFIC interrupt
///
/// riscv-rt runs in direct trap mode and only tables the twelve standard
/// core interrupts; everything else, including SysTick and TIM2, arrives
/// here with the PFIC number in `mcause`.
#[no_mangle]
pub extern "C" fn DefaultHandler() {
    let cause = riscv::register::mcause::read();
    if !cause.is_interrupt() {
        return;
    }
    match pfic::Irq::from_code(cause.code()) {
        Some(pfic::Irq::SysTick) => crate::time_driver::handle_systick_interrupt(),
        Some(pfic::Irq::Tim2) => handle_timer_interrupt(),
        None => {}
    }
}

/// CH32V203 pin configuration constants
pub mod pins {
    use accessory_core::LineId;

    /// Gesture button input pin
    pub const BUTTON_PIN: u8 = 0; // PA0

    /// Line id the button is classified under
    pub const BUTTON_LINE: LineId = LineId(BUTTON_PIN);

    /// Pulse-train output line
    pub const PULSE_LINE: LineId = LineId(2); // PA2
}

/// CH32V203 memory layout information
pub mod memory {
    /// Available RAM
    pub const RAM_SIZE: u32 = 20 * 1024; // 20KB

    /// Recommended Embassy task arena size
    pub const TASK_ARENA_SIZE: u32 = 8 * 1024; // 8KB

    /// RAM image of the pulse channel memory
    pub const CHANNEL_IMAGE_SIZE: u32 = accessory_core::pulse::CHANNEL_WORDS as u32 * 4;
}
