//! FIFO-backed MiniUART: one character moves each direction per 64
//! accumulated clock cycles, independent of how large a single
//! `clock()` call's cycle count is — the remainder persists across
//! calls.

use crate::bus::Peripheral;
use crate::interrupt::{InterruptHandle, UART_IRQ_CHANNEL};
use byteorder::{ByteOrder, LittleEndian};
use std::collections::VecDeque;
use std::sync::Mutex;

pub const UART_MEMORY_START: u32 = 0x9000_00C0;
const REGISTER_COUNT: usize = 4;
pub const UART_MEMORY_LEN: u32 = 4 * REGISTER_COUNT as u32;

pub const FIFO_CAPACITY: usize = 16;
pub const CYCLES_PER_CHARACTER: u32 = 64;

const CONTROL: usize = 0;
const STATUS: usize = 1;
const DATA: usize = 2;
const BAUD_RATE: usize = 3;

const CTRL_ENABLE: u32 = 1 << 0;
const CTRL_RX_ENABLE: u32 = 1 << 1;
const CTRL_TX_ENABLE: u32 = 1 << 2;
const CTRL_RX_IRQ_ENABLE: u32 = 1 << 3;
const CTRL_TX_EMPTY_IRQ_ENABLE: u32 = 1 << 4;

const STATUS_RX_DATA_READY: u32 = 1 << 0;
const STATUS_TX_FIFO_EMPTY: u32 = 1 << 1;
const STATUS_RX_FIFO_OVERRUN: u32 = 1 << 2;
const STATUS_TX_FIFO_OVERRUN: u32 = 1 << 3;
const STATUS_TX_FIFO_FULL: u32 = 1 << 4;

#[derive(Default)]
struct Fifos {
    tx_fifo: VecDeque<u8>,
    rx_fifo: VecDeque<u8>,
    sent_characters: VecDeque<u8>,
    received_characters: VecDeque<u8>,
    cycles_accumulated: u32,
}

pub struct MiniUart {
    control: u32,
    status: u32,
    baud_rate: u32,
    fifos: Mutex<Fifos>,
}

impl Default for MiniUart {
    fn default() -> MiniUart {
        MiniUart::new()
    }
}

impl MiniUart {
    pub fn new() -> MiniUart {
        MiniUart {
            control: 0,
            status: STATUS_TX_FIFO_EMPTY,
            baud_rate: 0,
            fifos: Mutex::new(Fifos::default()),
        }
    }

    fn enabled(&self) -> bool {
        self.control & CTRL_ENABLE != 0
    }

    fn rx_enabled(&self) -> bool {
        self.enabled() && self.control & CTRL_RX_ENABLE != 0
    }

    fn tx_enabled(&self) -> bool {
        self.enabled() && self.control & CTRL_TX_ENABLE != 0
    }

    /// External (shell) side: a character arrives on the line, queued
    /// for the device to pull into its RX FIFO at the next tick.
    pub fn put_char(&self, c: u8) {
        if !self.rx_enabled() {
            return;
        }
        self.fifos.lock().unwrap().received_characters.push_back(c);
    }

    /// External (shell) side: pops a character the device has already
    /// moved out of its TX FIFO onto the line.
    pub fn get_char(&self) -> Option<u8> {
        if !self.tx_enabled() {
            return None;
        }
        self.fifos.lock().unwrap().sent_characters.pop_front()
    }

    fn reg_index_for(addr: u32) -> usize {
        ((addr - UART_MEMORY_START) / 4) as usize
    }
}

impl Peripheral for MiniUart {
    fn clock(&mut self, cycles: u32, interrupts: &InterruptHandle) {
        if !self.enabled() {
            return;
        }
        let mut fifos = self.fifos.lock().unwrap();
        fifos.cycles_accumulated += cycles;
        while fifos.cycles_accumulated >= CYCLES_PER_CHARACTER {
            fifos.cycles_accumulated -= CYCLES_PER_CHARACTER;

            if self.control & CTRL_TX_ENABLE != 0 {
                if let Some(c) = fifos.tx_fifo.pop_front() {
                    fifos.sent_characters.push_back(c);
                    self.status &= !(STATUS_TX_FIFO_OVERRUN | STATUS_TX_FIFO_FULL);
                    if fifos.tx_fifo.is_empty() {
                        self.status |= STATUS_TX_FIFO_EMPTY;
                        if self.control & CTRL_TX_EMPTY_IRQ_ENABLE != 0 {
                            interrupts.borrow_mut().signal(UART_IRQ_CHANNEL);
                        }
                    }
                }
            }

            if self.control & CTRL_RX_ENABLE != 0 {
                if let Some(c) = fifos.received_characters.pop_front() {
                    if fifos.rx_fifo.len() >= FIFO_CAPACITY {
                        self.status |= STATUS_RX_FIFO_OVERRUN;
                    } else {
                        let was_empty = fifos.rx_fifo.is_empty();
                        fifos.rx_fifo.push_back(c);
                        self.status |= STATUS_RX_DATA_READY;
                        if was_empty && self.control & CTRL_RX_IRQ_ENABLE != 0 {
                            interrupts.borrow_mut().signal(UART_IRQ_CHANNEL);
                        }
                    }
                }
            }
        }
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) {
        if buf.len() != 4 {
            return;
        }
        let idx = MiniUart::reg_index_for(addr);
        let value = match idx {
            CONTROL => self.control,
            STATUS => self.status,
            BAUD_RATE => self.baud_rate,
            DATA => {
                let mut fifos = self.fifos.lock().unwrap();
                let popped = fifos.rx_fifo.pop_front().unwrap_or(0);
                if fifos.rx_fifo.is_empty() {
                    self.status &= !STATUS_RX_DATA_READY;
                }
                popped as u32
            }
            _ => return,
        };
        LittleEndian::write_u32(buf, value);
    }

    fn write(&mut self, addr: u32, buf: &[u8], _interrupts: &InterruptHandle) {
        if buf.len() != 4 {
            return;
        }
        let idx = MiniUart::reg_index_for(addr);
        let value = LittleEndian::read_u32(buf);
        match idx {
            CONTROL => self.control = value,
            BAUD_RATE => self.baud_rate = value,
            STATUS => self.status &= !value,
            DATA => {
                let mut fifos = self.fifos.lock().unwrap();
                if fifos.tx_fifo.len() >= FIFO_CAPACITY {
                    self.status |= STATUS_TX_FIFO_FULL | STATUS_TX_FIFO_OVERRUN;
                } else {
                    fifos.tx_fifo.push_back(value as u8);
                    self.status &= !STATUS_TX_FIFO_EMPTY;
                    if fifos.tx_fifo.len() >= FIFO_CAPACITY {
                        self.status |= STATUS_TX_FIFO_FULL;
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn echo_scenario() {
        let mut uart = MiniUart::new();
        uart.control = CTRL_ENABLE | CTRL_RX_ENABLE | CTRL_TX_ENABLE;
        uart.put_char(b'A');
        uart.put_char(b'B');
        let handle = crate::interrupt::new_handle();
        uart.clock(64, &handle);
        uart.clock(64, &handle);

        let mut buf = [0u8; 4];
        uart.read(UART_MEMORY_START + 4 * DATA as u32, &mut buf);
        assert_eq!(buf[0], 0x41);
        uart.read(UART_MEMORY_START + 4 * DATA as u32, &mut buf);
        assert_eq!(buf[0], 0x42);
        uart.read(UART_MEMORY_START + 4 * DATA as u32, &mut buf);
        assert_eq!(buf[0], 0);
        assert_eq!(uart.status & STATUS_RX_DATA_READY, 0);
    }
}
