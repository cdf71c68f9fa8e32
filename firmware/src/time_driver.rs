//! Embassy time driver on the CH32V203 SysTick counter
//!
//! SysTick interrupts at the embassy tick rate (32.768 kHz); each interrupt
//! advances the tick count and fires the single alarm when it falls due.

use core::cell::Cell;

use critical_section::Mutex;
use embassy_time_driver::{AlarmHandle, Driver};
use portable_atomic::{AtomicBool, AtomicU64, Ordering};

use crate::ch32v203_hardware::pfic::{self, Irq};

const STK_CTLR: usize = 0xE000_F000;
const STK_SR: usize = 0xE000_F004;
const STK_CMPLR: usize = 0xE000_F010;
const STK_CMPHR: usize = 0xE000_F014;

/// Core clock feeding SysTick
pub const HCLK_HZ: u32 = 72_000_000;

struct Alarm {
    timestamp: Cell<u64>,
    callback: Cell<Option<fn(*mut ())>>,
    ctx: Cell<usize>,
}

/// Tick counter with one alarm
pub struct SysTickDriver {
    ticks: AtomicU64,
    allocated: AtomicBool,
    alarm: Mutex<Alarm>,
}

impl SysTickDriver {
    const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            allocated: AtomicBool::new(false),
            alarm: Mutex::new(Alarm {
                timestamp: Cell::new(u64::MAX),
                callback: Cell::new(None),
                ctx: Cell::new(0),
            }),
        }
    }

    /// Advance one tick (called from the SysTick interrupt)
    fn tick(&self) {
        let now = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        let due = critical_section::with(|cs| {
            let alarm = self.alarm.borrow(cs);
            if alarm.timestamp.get() > now {
                return None;
            }
            alarm.timestamp.set(u64::MAX);
            alarm.callback.get().map(|f| (f, alarm.ctx.get()))
        });
        if let Some((callback, ctx)) = due {
            callback(ctx as *mut ());
        }
    }
}

impl Driver for SysTickDriver {
    fn now(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    unsafe fn allocate_alarm(&self) -> Option<AlarmHandle> {
        if self.allocated.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(AlarmHandle::new(0))
        }
    }

    fn set_alarm_callback(&self, _alarm: AlarmHandle, callback: fn(*mut ()), ctx: *mut ()) {
        critical_section::with(|cs| {
            let alarm = self.alarm.borrow(cs);
            alarm.callback.set(Some(callback));
            alarm.ctx.set(ctx as usize);
        });
    }

    fn set_alarm(&self, _alarm: AlarmHandle, timestamp: u64) -> bool {
        critical_section::with(|cs| {
            let alarm = self.alarm.borrow(cs);
            if timestamp <= self.now() {
                alarm.timestamp.set(u64::MAX);
                false
            } else {
                alarm.timestamp.set(timestamp);
                true
            }
        })
    }
}

embassy_time_driver::time_driver_impl!(static DRIVER: SysTickDriver = SysTickDriver::new());

/// Start SysTick at the embassy tick rate with its interrupt enabled
pub fn init() {
    let reload = HCLK_HZ / embassy_time_driver::TICK_HZ as u32 - 1;
    unsafe {
        core::ptr::write_volatile(STK_CTLR as *mut u32, 0);
        core::ptr::write_volatile(STK_CMPLR as *mut u32, reload);
        core::ptr::write_volatile(STK_CMPHR as *mut u32, 0);
        core::ptr::write_volatile(STK_SR as *mut u32, 0);
        // STE | STIE | STCLK (HCLK) | STRE (auto-reload)
        core::ptr::write_volatile(STK_CTLR as *mut u32, 0b1111);
    }
    pfic::enable(Irq::SysTick);
}

/// SysTick interrupt, dispatched from `DefaultHandler`
pub fn handle_systick_interrupt() {
    unsafe { core::ptr::write_volatile(STK_SR as *mut u32, 0) };
    DRIVER.tick();
}

// Critical section implementation for single-core RISC-V
critical_section::set_impl!(RiscvCriticalSection);

struct RiscvCriticalSection;

unsafe impl critical_section::Impl for RiscvCriticalSection {
    unsafe fn acquire() -> u8 {
        let mut mstatus: usize;
        core::arch::asm!("csrrci {}, mstatus, 8", out(reg) mstatus);
        (mstatus & 8) as u8
    }

    unsafe fn release(was_active: u8) {
        if was_active != 0 {
            core::arch::asm!("csrsi mstatus, 8");
        }
    }
}
