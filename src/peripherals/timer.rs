//! Four-channel system timer with compare and overflow events.
//!
//! The effective per-cycle increment multiplier follows the documented
//! `00=1x, 01=4x, 10=16x, 11=64x` divisor table. A discrepancy was
//! found between that table and the literal reference formula
//! (`(code*4)` with a zero-clamp, i.e. 1x/4x/8x/12x); this crate
//! implements the documented table, recorded as an open question in
//! DESIGN.md.

use crate::bus::Peripheral;
use crate::interrupt::{InterruptHandle, TIMER_IRQ_CHANNEL};
use byteorder::{ByteOrder, LittleEndian};

pub const TIMER_MEMORY_START: u32 = 0x9000_0080;
pub const TIMER_CHANNEL_COUNT: usize = 4;
const REGISTER_COUNT: usize = 10;
pub const TIMER_MEMORY_LEN: u32 = 4 * REGISTER_COUNT as u32;

const CONTROL: usize = 0;
const STATUS: usize = 1;
const COUNTER0: usize = 2;
const COMPARE0: usize = 6;

const MULTIPLIER_TABLE: [u32; 4] = [1, 4, 16, 64];

pub struct SystemTimer {
    registers: [u32; REGISTER_COUNT],
}

impl Default for SystemTimer {
    fn default() -> SystemTimer {
        SystemTimer::new()
    }
}

impl SystemTimer {
    pub fn new() -> SystemTimer {
        SystemTimer {
            registers: [0; REGISTER_COUNT],
        }
    }

    fn control(&self) -> u32 {
        self.registers[CONTROL]
    }

    fn enabled(&self, channel: usize) -> bool {
        self.control() & (1 << channel) != 0
    }

    fn multiplier(&self, channel: usize) -> u32 {
        let code = (self.control() >> (4 + 2 * channel)) & 0b11;
        MULTIPLIER_TABLE[code as usize]
    }

    fn irq_on_compare(&self, channel: usize) -> bool {
        self.control() & (1 << (12 + channel)) != 0
    }

    fn irq_on_overflow(&self, channel: usize) -> bool {
        self.control() & (1 << (16 + channel)) != 0
    }

    fn reset_on_compare(&self, channel: usize) -> bool {
        self.control() & (1 << (20 + channel)) != 0
    }

    fn counter(&self, channel: usize) -> u32 {
        self.registers[COUNTER0 + channel]
    }

    fn compare(&self, channel: usize) -> u32 {
        self.registers[COMPARE0 + channel]
    }

    fn advance_channel(&mut self, channel: usize, cycles: u32, interrupts: &InterruptHandle) {
        if !self.enabled(channel) {
            return;
        }
        let increment = cycles as u64 * self.multiplier(channel) as u64;
        let counter = self.counter(channel) as u64;
        let compare = self.compare(channel) as u64;
        let mut new_counter = counter + increment;

        if compare > 0 && counter < compare && new_counter >= compare {
            self.registers[STATUS] |= 1 << channel;
            if self.irq_on_compare(channel) {
                interrupts.borrow_mut().signal(TIMER_IRQ_CHANNEL);
            }
            if self.reset_on_compare(channel) {
                new_counter -= compare;
            }
        }

        if new_counter > u32::MAX as u64 {
            self.registers[STATUS] |= 1 << (4 + channel);
            if self.irq_on_overflow(channel) {
                interrupts.borrow_mut().signal(TIMER_IRQ_CHANNEL);
            }
        }

        self.registers[COUNTER0 + channel] = new_counter as u32;
    }

    fn reg_index_for(addr: u32) -> usize {
        ((addr - TIMER_MEMORY_START) / 4) as usize
    }
}

impl Peripheral for SystemTimer {
    fn clock(&mut self, cycles: u32, interrupts: &InterruptHandle) {
        for channel in 0..TIMER_CHANNEL_COUNT {
            self.advance_channel(channel, cycles, interrupts);
        }
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        if buf.len() != 4 {
            return;
        }
        let idx = SystemTimer::reg_index_for(addr);
        LittleEndian::write_u32(buf, self.registers[idx]);
    }

    fn write(&mut self, addr: u32, buf: &[u8], _interrupts: &InterruptHandle) {
        if buf.len() != 4 {
            return;
        }
        let idx = SystemTimer::reg_index_for(addr);
        if (COUNTER0..COUNTER0 + TIMER_CHANNEL_COUNT).contains(&idx) {
            return;
        }
        let value = LittleEndian::read_u32(buf);
        self.registers[idx] = value;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn compare_crossing_resets_counter_to_remainder() {
        let mut timer = SystemTimer::new();
        timer.registers[CONTROL] = 1 | (1 << 12) | (1 << 20); // enable ch0, irq+reset on compare, x1
        timer.registers[COMPARE0] = 100;
        let handle = crate::interrupt::new_handle();
        timer.clock(120, &handle);
        assert_eq!(timer.counter(0), 20);
        assert!(timer.registers[STATUS] & 1 != 0);
        assert!(handle.borrow().is_pending(TIMER_IRQ_CHANNEL));
    }

    #[test]
    fn disabled_channel_does_not_advance() {
        let mut timer = SystemTimer::new();
        let handle = crate::interrupt::new_handle();
        timer.clock(1000, &handle);
        assert_eq!(timer.counter(0), 0);
    }
}
