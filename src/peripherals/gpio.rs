//! 64-pin GPIO bank, two 32-pin banks of memory-mapped registers.

use crate::bus::Peripheral;
use crate::interrupt::{InterruptHandle, GPIO_IRQ_CHANNEL};
use byteorder::{ByteOrder, LittleEndian};

pub const GPIO_MEMORY_START: u32 = 0x9000_0000;
pub const GPIO_PIN_COUNT: usize = 64;
const REGISTER_COUNT: usize = 16;
pub const GPIO_MEMORY_LEN: u32 = 4 * REGISTER_COUNT as u32;

const MODE0: usize = 0;
const LEVEL0: usize = 4;
const SET0: usize = 6;
const CLEAR0: usize = 8;
const DETECT0: usize = 10;
const RISING0: usize = 12;
const FALLING0: usize = 14;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PinMode {
    Input,
    Output,
    Alt,
}

impl PinMode {
    fn from_bits(bits: u32) -> PinMode {
        match bits & 0b11 {
            0b00 => PinMode::Input,
            0b01 => PinMode::Output,
            _ => PinMode::Alt,
        }
    }
}

pub struct Gpio {
    registers: [u32; REGISTER_COUNT],
}

impl Default for Gpio {
    fn default() -> Gpio {
        Gpio::new()
    }
}

impl Gpio {
    pub fn new() -> Gpio {
        Gpio {
            registers: [0; REGISTER_COUNT],
        }
    }

    pub fn pin_count(&self) -> usize {
        GPIO_PIN_COUNT
    }

    pub fn get_mode(&self, pin: usize) -> PinMode {
        let reg = MODE0 + pin / 16;
        let shift = (pin % 16) * 2;
        PinMode::from_bits(self.registers[reg] >> shift)
    }

    /// Sets the 2-bit mode field for `pin`, clearing it first (unlike
    /// the source, which complements the field instead of masking it).
    pub fn set_pin_mode(&mut self, pin: usize, mode: PinMode) {
        let reg = MODE0 + pin / 16;
        let shift = (pin % 16) * 2;
        let bits = match mode {
            PinMode::Input => 0b00,
            PinMode::Output => 0b01,
            PinMode::Alt => 0b10,
        };
        self.registers[reg] &= !(0b11 << shift);
        self.registers[reg] |= bits << shift;
    }

    pub fn get_state(&self, pin: usize) -> bool {
        bit(self.registers[LEVEL0 + pin / 32], pin % 32)
    }

    fn set_level(&mut self, pin: usize, level: bool) {
        set_bit(&mut self.registers[LEVEL0 + pin / 32], pin % 32, level);
    }

    fn rising_enabled(&self, pin: usize) -> bool {
        bit(self.registers[RISING0 + pin / 32], pin % 32)
    }

    fn falling_enabled(&self, pin: usize) -> bool {
        bit(self.registers[FALLING0 + pin / 32], pin % 32)
    }

    fn set_detect(&mut self, pin: usize) {
        set_bit(&mut self.registers[DETECT0 + pin / 32], pin % 32, true);
    }

    /// Shell-facing: report a new external level for `pin`. Only
    /// meaningful when the pin is configured as `Input`; updates the
    /// Level register and, on an enabled rising edge, the Detect bit
    /// and IRQ channel 2.
    pub fn set_state(&mut self, pin: usize, level: bool, interrupts: &InterruptHandle) {
        if self.get_mode(pin) != PinMode::Input {
            return;
        }
        let previous = self.get_state(pin);
        self.set_level(pin, level);
        if !previous && level && self.rising_enabled(pin) {
            self.set_detect(pin);
            interrupts.borrow_mut().signal(GPIO_IRQ_CHANNEL);
        } else if previous && !level && self.falling_enabled(pin) {
            self.set_detect(pin);
        }
    }

    fn drive_outputs(&mut self, bank: usize, mask: u32, level: bool) {
        for bit_idx in 0..32 {
            if mask & (1 << bit_idx) == 0 {
                continue;
            }
            let pin = bank * 32 + bit_idx;
            if self.get_mode(pin) == PinMode::Output {
                self.set_level(pin, level);
            }
        }
    }

    fn reg_index_for(addr: u32) -> usize {
        ((addr - GPIO_MEMORY_START) / 4) as usize
    }
}

fn bit(word: u32, idx: usize) -> bool {
    word & (1 << idx) != 0
}

fn set_bit(word: &mut u32, idx: usize, value: bool) {
    if value {
        *word |= 1 << idx;
    } else {
        *word &= !(1 << idx);
    }
}

impl Peripheral for Gpio {
    fn clock(&mut self, _cycles: u32, _interrupts: &InterruptHandle) {}

    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        if buf.len() != 4 {
            return;
        }
        let idx = Gpio::reg_index_for(addr);
        if (SET0..SET0 + 2).contains(&idx) || (CLEAR0..CLEAR0 + 2).contains(&idx) {
            return;
        }
        LittleEndian::write_u32(buf, self.registers[idx]);
    }

    fn write(&mut self, addr: u32, buf: &[u8], interrupts: &InterruptHandle) {
        if buf.len() != 4 {
            return;
        }
        let idx = Gpio::reg_index_for(addr);
        let value = LittleEndian::read_u32(buf);
        if (LEVEL0..LEVEL0 + 2).contains(&idx) {
            return;
        }
        if (SET0..SET0 + 2).contains(&idx) {
            self.drive_outputs(idx - SET0, value, true);
            return;
        }
        if (CLEAR0..CLEAR0 + 2).contains(&idx) {
            self.drive_outputs(idx - CLEAR0, value, false);
            return;
        }
        let _ = interrupts;
        self.registers[idx] = value;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_0_drives_only_output_pins() {
        let mut gpio = Gpio::new();
        gpio.set_pin_mode(0, PinMode::Output);
        gpio.set_pin_mode(7, PinMode::Output);
        let handle = crate::interrupt::new_handle();
        gpio.write(GPIO_MEMORY_START + 4 * SET0 as u32, &0x81u32.to_le_bytes(), &handle);
        assert!(gpio.get_state(0));
        assert!(gpio.get_state(7));
    }

    #[test]
    fn set_0_leaves_input_pin_unchanged() {
        let mut gpio = Gpio::new();
        gpio.set_pin_mode(0, PinMode::Input);
        gpio.set_pin_mode(7, PinMode::Output);
        let handle = crate::interrupt::new_handle();
        gpio.write(GPIO_MEMORY_START + 4 * SET0 as u32, &0x81u32.to_le_bytes(), &handle);
        assert!(!gpio.get_state(0));
        assert!(gpio.get_state(7));
    }

    #[test]
    fn rising_edge_on_enabled_input_signals_irq() {
        let mut gpio = Gpio::new();
        gpio.set_pin_mode(3, PinMode::Input);
        set_bit(&mut gpio.registers[RISING0], 3, true);
        let handle = crate::interrupt::new_handle();
        gpio.set_state(3, true, &handle);
        assert!(handle.borrow().is_pending(GPIO_IRQ_CHANNEL));
        assert!(bit(gpio.registers[DETECT0], 3));
    }
}
