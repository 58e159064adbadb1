//! ISA codec, memory bus, interrupt controller, CPU core and peripherals
//! for the SArch32 teaching architecture.
//!
//! This crate is the execution half of the toolchain: it decodes and
//! executes SArch32 machine words against a modeled memory bus, interrupt
//! controller, and memory-mapped peripherals (display, GPIO, system timer,
//! MiniUART). The assembler/linker pipeline that produces SArch32 object
//! files lives in the sibling [`sasm`](../sasm/index.html) crate; the
//! object-file container format lives in
//! [`sobjfile`](../sobjfile/index.html).

pub mod bus;
pub mod config;
pub mod constants;
pub mod cpu;
pub mod error;
pub mod interrupt;
pub mod isa;
pub mod operand;
pub mod peripherals;
pub mod register;

pub use bus::{BusFault, MemoryBus, MountError, Peripheral};
pub use config::{DisplayKind, MachineConfig, MachineKind, MemorySize};
pub use cpu::{Cpu, Exception, Unrecoverable};
pub use error::{CodecError, ErrorCategory};
pub use interrupt::{InterruptController, InterruptHandle};
pub use isa::{Instruction, InstructionKind, Opcode, OperandShape};
pub use operand::Operand;
pub use register::{ApsRequest, Condition, Flags, Mode, RegisterId};

use std::cell::RefCell;
use std::rc::Rc;

/// A fully wired machine: CPU, bus, and interrupt controller sharing a
/// lifetime, with the four standard peripherals mounted at their fixed
/// addresses. This is the entry point the assembler's tests, the
/// scenario tests in `tests/`, and (eventually) the out-of-scope
/// graphical shell all drive.
pub struct Machine {
    pub cpu: Cpu,
    pub bus: MemoryBus,
    pub interrupts: InterruptHandle,
    pub display: Rc<RefCell<peripherals::Display>>,
    pub gpio: Rc<RefCell<peripherals::Gpio>>,
    pub timer: Rc<RefCell<peripherals::SystemTimer>>,
    pub uart: Rc<RefCell<peripherals::MiniUart>>,
}

impl Machine {
    /// Builds a machine with `memory_size` bytes of main memory and the
    /// four standard peripherals mounted at their fixed addresses, then
    /// performs a cold reset.
    pub fn new(memory_size: u32) -> Machine {
        let mut bus = MemoryBus::new(memory_size);
        let interrupts = interrupt::new_handle();

        let display = Rc::new(RefCell::new(peripherals::Display::new()));
        let gpio = Rc::new(RefCell::new(peripherals::Gpio::new()));
        let timer = Rc::new(RefCell::new(peripherals::SystemTimer::new()));
        let uart = Rc::new(RefCell::new(peripherals::MiniUart::new()));

        bus.mount(
            peripherals::display::DISPLAY_MEMORY_START,
            peripherals::display::DISPLAY_MEMORY_LEN,
            display.clone(),
        )
        .expect("display mapping does not overlap");
        bus.mount(
            peripherals::gpio::GPIO_MEMORY_START,
            peripherals::gpio::GPIO_MEMORY_LEN,
            gpio.clone(),
        )
        .expect("gpio mapping does not overlap");
        bus.mount(
            peripherals::timer::TIMER_MEMORY_START,
            peripherals::timer::TIMER_MEMORY_LEN,
            timer.clone(),
        )
        .expect("timer mapping does not overlap");
        bus.mount(
            peripherals::uart::UART_MEMORY_START,
            peripherals::uart::UART_MEMORY_LEN,
            uart.clone(),
        )
        .expect("uart mapping does not overlap");

        let mut cpu = Cpu::new();
        cpu.reset(&mut bus, &interrupts, true);

        Machine {
            cpu,
            bus,
            interrupts,
            display,
            gpio,
            timer,
            uart,
        }
    }

    /// Loads bytes at an absolute address, e.g. a linked object-file
    /// section's bytes at its relocation base.
    pub fn load(&mut self, addr: u32, data: &[u8]) -> Result<(), BusFault> {
        self.bus.load(addr, data)
    }

    /// Loader: copies every section of a linked object file into main
    /// memory at its relocation base address.
    pub fn load_object(&mut self, object: &sobjfile::ObjectFile) -> Result<(), BusFault> {
        for section in &object.sections {
            self.load(section.start_addr, &section.data)?;
        }
        Ok(())
    }

    /// One CPU step followed by a clocked advance of every mounted
    /// peripheral, matching §5's ordering guarantee (memory effects of
    /// the instruction complete before peripherals are clocked).
    pub fn step(&mut self, cycles: u32, handle_irqs: bool) -> Result<(), Unrecoverable> {
        self.cpu.step(&mut self.bus, &self.interrupts, handle_irqs)?;
        self.bus.clock(cycles, &self.interrupts);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn assemble_words(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    fn load_at_reset(machine: &mut Machine, words: &[u32]) {
        machine
            .load(constants::RESET_VECTOR, &assemble_words(words))
            .unwrap();
    }

    #[test]
    fn sum_one_to_ten_scenario() {
        let mut machine = Machine::new(1 << 20);
        // loop: at word index 2 (address 0x1008); the branch at word
        // index 5 (address 0x1014) targets it relatively: after fetch
        // PC is 0x1018, so the offset is 0x1008 - 0x1018 = -0x10.
        let program: Vec<u32> = [
            "movi r0, #0",
            "movi r1, #1",
            "add r0, r1",
            "addi r1, #1",
            "cmpi r1, #11",
            "bir.ne #-0x10",
            "svc #0",
        ]
        .iter()
        .map(|s| Instruction::parse(s).unwrap().encode().unwrap())
        .collect();
        let svc_addr = constants::RESET_VECTOR + 4 * (program.len() as u32 - 1);
        load_at_reset(&mut machine, &program);

        for _ in 0..200 {
            if machine.cpu.last_exception().is_some() {
                break;
            }
            machine.step(8, false).unwrap();
        }

        assert_eq!(machine.cpu.reg(RegisterId::R0), 55);
        assert_eq!(machine.cpu.reg(RegisterId::R1), 11);
        assert_eq!(
            machine.cpu.last_exception(),
            Some(Exception::SupervisorCall(0))
        );
        assert_eq!(machine.cpu.reg(RegisterId::RA), svc_addr + 4);
    }

    #[test]
    fn load_object_places_every_section() {
        let mut machine = Machine::new(1 << 20);
        let object = sobjfile::ObjectFile::new(vec![
            sobjfile::Section::new("text", constants::RESET_VECTOR, vec![1, 2, 3, 4]),
            sobjfile::Section::new("data", 0x4000, vec![5, 6]),
        ]);
        machine.load_object(&object).unwrap();

        let mut buf = [0u8; 4];
        machine.bus.read(constants::RESET_VECTOR, &mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        let mut buf = [0u8; 2];
        machine.bus.read(0x4000, &mut buf).unwrap();
        assert_eq!(buf, [5, 6]);
    }

    #[test]
    fn memory_round_trip_scenario() {
        let mut machine = Machine::new(1 << 20);
        let program: Vec<u32> = ["si r0, #0x100", "li r1, #0x100"]
            .iter()
            .map(|s| Instruction::parse(s).unwrap().encode().unwrap())
            .collect();
        load_at_reset(&mut machine, &program);
        machine.cpu.set_reg(RegisterId::R0, 0xDEAD_BEEF);

        machine.step(8, false).unwrap();
        machine.step(8, false).unwrap();

        assert_eq!(machine.cpu.reg(RegisterId::R1), 0xDEAD_BEEF);
        let mut bytes = [0u8; 4];
        machine.bus.read(0x100, &mut bytes).unwrap();
        assert_eq!(bytes, [0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn stack_scenario() {
        let mut machine = Machine::new(1 << 20);
        let program: Vec<u32> = [
            "movi sp, #0x10000",
            "movi r0, #7",
            "push r0",
            "movi r0, #0",
            "pop r0",
        ]
        .iter()
        .map(|s| Instruction::parse(s).unwrap().encode().unwrap())
        .collect();
        load_at_reset(&mut machine, &program);

        for _ in 0..5 {
            machine.step(8, false).unwrap();
        }

        assert_eq!(machine.cpu.reg(RegisterId::R0), 7);
        assert_eq!(machine.cpu.reg(RegisterId::SP), 0x10000);
    }

    #[test]
    fn gpio_irq_scenario() {
        let mut machine = Machine::new(1 << 20);
        machine
            .gpio
            .borrow_mut()
            .set_pin_mode(3, peripherals::gpio::PinMode::Input);
        // Enable rising-edge detection for pin 3 through the memory-mapped register.
        let rising_addr = peripherals::gpio::GPIO_MEMORY_START + 4 * 12;
        machine
            .bus
            .write(rising_addr, &8u32.to_le_bytes(), &machine.interrupts)
            .unwrap();

        let pc_before = machine.cpu.pc();
        machine
            .gpio
            .borrow_mut()
            .set_state(3, true, &machine.interrupts);
        assert!(machine
            .interrupts
            .borrow()
            .is_pending(interrupt::GPIO_IRQ_CHANNEL));

        machine
            .bus
            .load(constants::IVT_BASE + 4 * 4, &0xBEEF_0000u32.to_le_bytes())
            .unwrap();
        machine.step(8, true).unwrap();

        assert_eq!(machine.cpu.pc(), 0xBEEF_0000);
        assert_eq!(machine.cpu.reg(RegisterId::RA), pc_before);
    }

    #[test]
    fn timer_compare_scenario() {
        let mut machine = Machine::new(1 << 20);
        {
            let mut timer = machine.timer.borrow_mut();
            let control = 1 | (1 << 12) | (1 << 20); // enable ch0, irq+reset on compare, x1
            timer.write(
                peripherals::timer::TIMER_MEMORY_START,
                &control.to_le_bytes(),
                &machine.interrupts,
            );
            timer.write(
                peripherals::timer::TIMER_MEMORY_START + 4 * 6,
                &100u32.to_le_bytes(),
                &machine.interrupts,
            );
        }
        machine.bus.clock(120, &machine.interrupts);

        let mut status = [0u8; 4];
        machine
            .timer
            .borrow_mut()
            .read(peripherals::timer::TIMER_MEMORY_START + 4, &mut status);
        assert_eq!(u32::from_le_bytes(status) & 1, 1);
        assert!(machine
            .interrupts
            .borrow()
            .is_pending(interrupt::TIMER_IRQ_CHANNEL));

        let mut counter = [0u8; 4];
        machine
            .timer
            .borrow_mut()
            .read(peripherals::timer::TIMER_MEMORY_START + 4 * 2, &mut counter);
        assert_eq!(u32::from_le_bytes(counter), 20);
    }

    #[test]
    fn uart_echo_scenario() {
        let mut machine = Machine::new(1 << 20);
        {
            let mut uart = machine.uart.borrow_mut();
            let control = 1 | (1 << 1) | (1 << 2); // enable, rx, tx
            uart.write(
                peripherals::uart::UART_MEMORY_START,
                &control.to_le_bytes(),
                &machine.interrupts,
            );
        }
        machine.uart.borrow().put_char(b'A');
        machine.uart.borrow().put_char(b'B');
        machine.bus.clock(64, &machine.interrupts);
        machine.bus.clock(64, &machine.interrupts);

        let mut buf = [0u8; 4];
        let data_addr = peripherals::uart::UART_MEMORY_START + 4 * 2;
        machine.bus.read(data_addr, &mut buf).unwrap();
        assert_eq!(buf[0], 0x41);
        machine.bus.read(data_addr, &mut buf).unwrap();
        assert_eq!(buf[0], 0x42);
        machine.bus.read(data_addr, &mut buf).unwrap();
        assert_eq!(buf[0], 0);
    }
}
