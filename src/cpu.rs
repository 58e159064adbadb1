//! Fetch/decode/execute loop, flags, and exception dispatch.

use crate::bus::MemoryBus;
use crate::constants::{IVT_BASE, RESET_VECTOR, WORD_BYTES};
use crate::interrupt::InterruptHandle;
use crate::isa::{Instruction, InstructionKind, Opcode};
use crate::operand::Operand;
use crate::register::{ApsRequest, Flags, Mode, RegisterId};

/// The six conditions the step loop can dispatch through the IVT.
/// Never implements `std::error::Error` — these are control-flow
/// values consumed entirely inside `Cpu::step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exception {
    Reset,
    Abort(u32),
    Undefined,
    Unaligned,
    Irq,
    SupervisorCall(u32),
}

impl Exception {
    fn ivt_index(self) -> u32 {
        match self {
            Exception::Reset => 0,
            Exception::Abort(_) => 1,
            Exception::Undefined => 2,
            Exception::Unaligned => 3,
            Exception::Irq => 4,
            Exception::SupervisorCall(_) => 5,
        }
    }
}

/// A fault raised while dispatching an exception itself (e.g. the IVT
/// entry is unreadable). The step loop has no further recovery option.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unrecoverable;

const GPR_COUNT: usize = 16;

pub struct Cpu {
    registers: [u32; GPR_COUNT],
    mode: Mode,
    /// Set whenever a step dispatches an exception; cleared at the
    /// start of the next step. Lets callers (tests, the shell) inspect
    /// what the previous step did without threading a return value
    /// through every call site.
    last_exception: Option<Exception>,
}

impl Default for Cpu {
    fn default() -> Cpu {
        Cpu::new()
    }
}

impl Cpu {
    pub fn new() -> Cpu {
        let mut registers = [0xFFFF_FFFFu32; GPR_COUNT];
        registers[RegisterId::PC.index()] = 0;
        registers[RegisterId::FLG.index()] = 0;
        Cpu {
            registers,
            mode: Mode::System,
            last_exception: None,
        }
    }

    pub fn reg(&self, r: RegisterId) -> u32 {
        self.registers[r.index()]
    }

    pub fn set_reg(&mut self, r: RegisterId, value: u32) {
        self.registers[r.index()] = value;
    }

    pub fn pc(&self) -> u32 {
        self.reg(RegisterId::PC)
    }

    pub fn set_pc(&mut self, value: u32) {
        self.set_reg(RegisterId::PC, value);
    }

    pub fn flags(&self) -> Flags {
        Flags::from_bits(self.reg(RegisterId::FLG))
    }

    pub fn set_flags(&mut self, flags: Flags) {
        self.set_reg(RegisterId::FLG, flags.to_bits());
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn last_exception(&self) -> Option<Exception> {
        self.last_exception
    }

    /// `cold` additionally zeroes main memory; GPRs are never reset
    /// here (only at construction) and peripheral memory is untouched
    /// either way.
    pub fn reset(&mut self, bus: &mut MemoryBus, interrupts: &InterruptHandle, cold: bool) {
        self.set_pc(RESET_VECTOR);
        self.set_flags(Flags::default());
        self.mode = Mode::System;
        interrupts.borrow_mut().clear_all();
        if cold {
            bus.clear_main_memory();
        }
        self.last_exception = None;
    }

    pub fn step(
        &mut self,
        bus: &mut MemoryBus,
        interrupts: &InterruptHandle,
        handle_irqs: bool,
    ) -> Result<(), Unrecoverable> {
        self.last_exception = None;

        if handle_irqs && interrupts.borrow().has_pending() {
            return self.dispatch(Exception::Irq, bus);
        }

        let pc = self.pc();
        if pc % WORD_BYTES != 0 {
            return self.dispatch(Exception::Unaligned, bus);
        }

        let mut word_bytes = [0u8; 4];
        if bus.read(pc, &mut word_bytes).is_err() {
            return self.dispatch(Exception::Abort(pc), bus);
        }
        self.set_pc(pc + WORD_BYTES);

        let word = u32::from_le_bytes(word_bytes);
        let instr = match Instruction::decode(word) {
            Ok(instr) => instr,
            Err(err) => {
                log::debug!("undefined instruction at {:#x}: {}", pc, err);
                return self.dispatch(Exception::Undefined, bus);
            }
        };

        if !instr.condition.holds(self.flags()) {
            return Ok(());
        }

        self.execute(&instr, bus, interrupts)
    }

    fn dispatch(&mut self, exception: Exception, bus: &mut MemoryBus) -> Result<(), Unrecoverable> {
        log::trace!("dispatching {:?}", exception);
        self.set_reg(RegisterId::RA, self.pc());
        let mut entry_bytes = [0u8; 4];
        let entry_addr = IVT_BASE + 4 * exception.ivt_index();
        if bus.read(entry_addr, &mut entry_bytes).is_err() {
            log::warn!("IVT entry at {:#x} is unreadable; unrecoverable", entry_addr);
            return Err(Unrecoverable);
        }
        self.set_pc(u32::from_le_bytes(entry_bytes));
        self.last_exception = Some(exception);
        Ok(())
    }

    fn operand_value(&self, op: &Operand) -> u32 {
        match op {
            Operand::Register(r) => self.reg(*r),
            Operand::Immediate(v) => *v as u32,
            Operand::Symbol(_) => unreachable!("symbols are resolved before execution"),
        }
    }

    fn execute(
        &mut self,
        instr: &Instruction,
        bus: &mut MemoryBus,
        interrupts: &InterruptHandle,
    ) -> Result<(), Unrecoverable> {
        match &instr.kind {
            InstructionKind::Nop => Ok(()),
            InstructionKind::TwoOperand { dst, src } => {
                self.execute_two_operand(instr.opcode, *dst, src, bus, interrupts)
            }
            InstructionKind::Branch { relative, target } => {
                let value = self.operand_value(target);
                let new_pc = if *relative {
                    self.pc().wrapping_add(value)
                } else {
                    value
                };
                self.set_pc(new_pc);
                Ok(())
            }
            InstructionKind::RegisterOnly { reg } => {
                match instr.opcode {
                    Opcode::Push => {
                        let addr = self.reg(RegisterId::SP).wrapping_sub(WORD_BYTES);
                        let value = self.reg(*reg);
                        if bus.write(addr, &value.to_le_bytes(), interrupts).is_err() {
                            return self.dispatch(Exception::Abort(addr), bus);
                        }
                        self.set_reg(RegisterId::SP, addr);
                    }
                    Opcode::Pop => {
                        let addr = self.reg(RegisterId::SP);
                        let mut buf = [0u8; 4];
                        if bus.read(addr, &mut buf).is_err() {
                            return self.dispatch(Exception::Abort(addr), bus);
                        }
                        self.set_reg(*reg, u32::from_le_bytes(buf));
                        self.set_reg(RegisterId::SP, addr.wrapping_add(WORD_BYTES));
                    }
                    _ => {}
                }
                Ok(())
            }
            InstructionKind::ImmediateOnly24 { value } => {
                let v = self.operand_value(value);
                match instr.opcode {
                    Opcode::Svc => self.dispatch(Exception::SupervisorCall(v), bus),
                    // No execution semantics are specified for `fw`; it
                    // consumes its operand and otherwise behaves as a nop.
                    Opcode::Fw => Ok(()),
                    _ => Ok(()),
                }
            }
            InstructionKind::Aps { dst, code } => {
                let request = ApsRequest::from_code(self.operand_value(code));
                match request {
                    ApsRequest::None | ApsRequest::Unknown(_) => Ok(()),
                    ApsRequest::GetMode => {
                        self.set_reg(*dst, self.mode as u32);
                        Ok(())
                    }
                    ApsRequest::SetMode => {
                        if self.mode == Mode::User {
                            return self.dispatch(Exception::Undefined, bus);
                        }
                        self.mode = Mode::from_bit(self.reg(*dst));
                        Ok(())
                    }
                }
            }
        }
    }

    fn execute_two_operand(
        &mut self,
        opcode: Opcode,
        dst: RegisterId,
        src: &Operand,
        bus: &mut MemoryBus,
        interrupts: &InterruptHandle,
    ) -> Result<(), Unrecoverable> {
        let src_value = self.operand_value(src);
        match opcode {
            Opcode::Mov | Opcode::Movi => {
                self.set_reg(dst, src_value);
            }
            Opcode::Add | Opcode::Addi => {
                let result = self.reg(dst).wrapping_add(src_value);
                self.set_reg(dst, result);
            }
            Opcode::Sub | Opcode::Subi => {
                let result = self.reg(dst).wrapping_sub(src_value);
                self.set_reg(dst, result);
            }
            Opcode::Mul | Opcode::Muli => {
                let result = self.reg(dst).wrapping_mul(src_value);
                self.set_reg(dst, result);
            }
            Opcode::Div | Opcode::Divi => {
                if src_value == 0 {
                    return self.dispatch(Exception::Abort(self.pc()), bus);
                }
                let result = (self.reg(dst) as i32).wrapping_div(src_value as i32) as u32;
                self.set_reg(dst, result);
            }
            Opcode::And | Opcode::Andi => {
                let result = self.reg(dst) & src_value;
                self.set_reg(dst, result);
            }
            Opcode::Or | Opcode::Ori => {
                let result = self.reg(dst) | src_value;
                self.set_reg(dst, result);
            }
            Opcode::Sll | Opcode::Slli => {
                let result = self.reg(dst) << (src_value & 31);
                self.set_reg(dst, result);
            }
            Opcode::Srl | Opcode::Srli => {
                let result = self.reg(dst) >> (src_value & 31);
                self.set_reg(dst, result);
            }
            Opcode::Lw | Opcode::Li => {
                let mut buf = [0u8; 4];
                if bus.read(src_value, &mut buf).is_err() {
                    return self.dispatch(Exception::Abort(src_value), bus);
                }
                self.set_reg(dst, u32::from_le_bytes(buf));
            }
            Opcode::Sw | Opcode::Si => {
                let value = self.reg(dst);
                if bus.write(src_value, &value.to_le_bytes(), interrupts).is_err() {
                    return self.dispatch(Exception::Abort(src_value), bus);
                }
            }
            Opcode::Cmpr | Opcode::Cmpi => {
                let r1 = self.reg(dst) as i32;
                let r2 = src_value as i32;
                let result = r1.wrapping_sub(r2);
                let flags = Flags {
                    zero: result == 0,
                    negative: result < 0,
                    overflow: r1 > r2 && result > r1,
                    carry: self.flags().carry,
                };
                self.set_flags(flags);
            }
            _ => unreachable!("not a two-operand opcode"),
        }
        Ok(())
    }
}
