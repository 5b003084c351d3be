//! The four hardware timers, in the scheduled-overflow model.
//!
//! Rather than decrementing a counter once per CPU cycle, a running timer
//! computes *when* it will next overflow and asks the [`Scheduler`] to call
//! back then. The counter value exposed to the CPU (`TMxCNT_L` reads) is
//! reconstructed on demand from `reload` and the cycles elapsed since the
//! timer was last (re)started, rather than tracked incrementally. Cascade
//! timers are the exception: they only advance on an overflow of the
//! preceding timer, so they carry their own counter directly.

use serde::{Deserialize, Serialize};

use crate::bitwise::Bits;
use crate::cpu::hardware::interrupt_control::{IrqSource, SystemControl};
use crate::scheduler::{EventKind, Scheduler};

const DIVIDERS: [u64; 4] = [1, 64, 256, 1024];

const OVERFLOW_EVENTS: [EventKind; 4] = [
    EventKind::Timer0Overflow,
    EventKind::Timer1Overflow,
    EventKind::Timer2Overflow,
    EventKind::Timer3Overflow,
];

const IRQ_SOURCES: [IrqSource; 4] = [
    IrqSource::Timer0,
    IrqSource::Timer1,
    IrqSource::Timer2,
    IrqSource::Timer3,
];

#[derive(Default, Serialize, Deserialize)]
struct Timer {
    reload: u16,
    control: u16,
    /// Scheduler cycle at which this timer was last (re)started, used to
    /// reconstruct the counter value for free-running (non-cascade) timers.
    started_at: u64,
    /// Counter used directly by cascade-mode timers, which tick on the
    /// previous channel's overflow instead of on elapsed cycles.
    cascade_counter: u16,
}

impl Timer {
    const fn divider(&self) -> u64 {
        DIVIDERS[(self.control & 0b11) as usize]
    }

    const fn is_cascade(&self) -> bool {
        self.control & 0x0004 != 0
    }

    const fn irq_enabled(&self) -> bool {
        self.control & 0x0040 != 0
    }

    const fn is_running(&self) -> bool {
        self.control & 0x0080 != 0
    }
}

#[derive(Default, Serialize, Deserialize)]
pub struct Timers {
    timers: [Timer; 4],
}

impl Timers {
    /// Reconstructs the live counter value for timer `idx`.
    #[must_use]
    pub fn read_l(&self, idx: usize, scheduler: &Scheduler) -> u16 {
        let timer = &self.timers[idx];
        if !timer.is_running() {
            return timer.reload;
        }
        if timer.is_cascade() {
            return timer.cascade_counter;
        }
        let elapsed = scheduler.now().saturating_sub(timer.started_at);
        timer.reload.wrapping_add((elapsed / timer.divider()) as u16)
    }

    #[must_use]
    pub const fn read_h(&self, idx: usize) -> u16 {
        self.timers[idx].control
    }

    /// `TMxCNT_L` always writes the reload latch; it only affects the live
    /// counter the next time the timer (re)starts or overflows.
    pub fn write_l(&mut self, idx: usize, value: u16) {
        self.timers[idx].reload = value;
    }

    pub fn write_h(&mut self, idx: usize, value: u16, scheduler: &mut Scheduler) {
        let was_running = self.timers[idx].is_running();
        self.timers[idx].control = value & 0x00C7;
        let now_running = self.timers[idx].is_running();

        if !was_running && now_running {
            self.timers[idx].cascade_counter = self.timers[idx].reload;
            self.timers[idx].started_at = scheduler.now();
            if !self.timers[idx].is_cascade() {
                self.schedule_next_overflow(idx, scheduler, 0);
            }
        } else if was_running && !now_running {
            scheduler.unschedule(OVERFLOW_EVENTS[idx]);
        }
    }

    fn schedule_next_overflow(&self, idx: usize, scheduler: &mut Scheduler, extra_cycles: u64) {
        let timer = &self.timers[idx];
        let cycles_to_overflow =
            u64::from(0x1_0000 - u32::from(timer.reload)) * timer.divider();
        let cycles_ahead = cycles_to_overflow.saturating_sub(extra_cycles).max(1);
        scheduler.schedule(OVERFLOW_EVENTS[idx], cycles_ahead);
    }

    /// Handles timer `idx` overflowing: reloads it, reschedules the next
    /// overflow (preserving phase via `extra_cycles`), raises its IRQ if
    /// enabled, and cascades into timer `idx + 1` if that channel is running
    /// in cascade mode. Returns `true` if this is timer 0 or 1, the two that
    /// feed the DMA sound FIFOs, so the caller can trigger a refill.
    pub fn handle_overflow(
        &mut self,
        idx: usize,
        extra_cycles: u64,
        scheduler: &mut Scheduler,
        system: &mut SystemControl,
    ) -> bool {
        self.timers[idx].started_at = scheduler.now().saturating_sub(extra_cycles);
        if !self.timers[idx].is_cascade() {
            self.schedule_next_overflow(idx, scheduler, extra_cycles);
        }
        if self.timers[idx].irq_enabled() {
            system.request_interrupt(IRQ_SOURCES[idx], scheduler);
        }
        if idx < 3 && self.timers[idx + 1].is_running() && self.timers[idx + 1].is_cascade() {
            self.cascade_tick(idx + 1, scheduler, system);
        }
        idx < 2
    }

    fn cascade_tick(&mut self, idx: usize, scheduler: &mut Scheduler, system: &mut SystemControl) {
        let (next, overflowed) = self.timers[idx].cascade_counter.overflowing_add(1);
        self.timers[idx].cascade_counter = if overflowed {
            self.timers[idx].reload
        } else {
            next
        };
        if overflowed {
            if self.timers[idx].irq_enabled() {
                system.request_interrupt(IRQ_SOURCES[idx], scheduler);
            }
            if idx < 3 && self.timers[idx + 1].is_running() && self.timers[idx + 1].is_cascade() {
                self.cascade_tick(idx + 1, scheduler, system);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn starting_timer_schedules_overflow_at_divider_scaled_distance() {
        let mut timers = Timers::default();
        let mut scheduler = Scheduler::new();
        timers.write_l(0, 0xFFF0);
        timers.write_h(0, 0x0080, &mut scheduler);
        assert_eq!(scheduler.cycles_until(EventKind::Timer0Overflow), Some(16));
    }

    #[test]
    fn counter_reconstructs_from_elapsed_cycles() {
        let mut timers = Timers::default();
        let mut scheduler = Scheduler::new();
        timers.write_l(0, 0xFFF0);
        timers.write_h(0, 0x0080, &mut scheduler);
        scheduler.step(10);
        assert_eq!(timers.read_l(0, &scheduler), 0xFFFA);
    }

    #[test]
    fn overflow_requests_interrupt_when_enabled() {
        let mut timers = Timers::default();
        let mut scheduler = Scheduler::new();
        let mut system = SystemControl::default();
        system.interrupt_enable = 0x0008; // Timer0
        system.interrupt_master_enable = 1;
        timers.write_l(0, 0xFFFF);
        timers.write_h(0, 0x00C0, &mut scheduler); // start + irq enable
        timers.handle_overflow(0, 0, &mut scheduler, &mut system);
        assert!(system.irq_pending());
    }

    #[test]
    fn cascade_timer_ticks_on_previous_overflow() {
        let mut timers = Timers::default();
        let mut scheduler = Scheduler::new();
        let mut system = SystemControl::default();
        timers.write_l(1, 0);
        timers.write_h(1, 0x0084, &mut scheduler); // cascade + start
        timers.handle_overflow(0, 0, &mut scheduler, &mut system);
        assert_eq!(timers.read_l(1, &scheduler), 1);
    }

    #[test]
    fn timer_0_and_1_report_dma_sound_eligibility() {
        let mut timers = Timers::default();
        let mut scheduler = Scheduler::new();
        let mut system = SystemControl::default();
        timers.write_h(0, 0x0080, &mut scheduler);
        timers.write_h(2, 0x0080, &mut scheduler);
        assert!(timers.handle_overflow(0, 0, &mut scheduler, &mut system));
        assert!(!timers.handle_overflow(2, 0, &mut scheduler, &mut system));
    }
}
