//! Instruction word encoding/decoding and the single-line mnemonic
//! syntax shared by the standalone codec tests and the assembler.

use crate::constants::*;
use crate::error::CodecError;
use crate::operand::Operand;
use crate::register::{Condition, RegisterId};
use std::fmt;

/// One of the 32 opcodes occupying bits 0-4 of the tag byte. Variants
/// are ordered to match their numeric encoding exactly; `Opcode as u8`
/// and `index()` always agree.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Opcode {
    Nop = 0,
    Mov = 1,
    Movi = 2,
    Add = 3,
    Addi = 4,
    Sub = 5,
    Subi = 6,
    Mul = 7,
    Muli = 8,
    Div = 9,
    Divi = 10,
    And = 11,
    Andi = 12,
    Or = 13,
    Ori = 14,
    Sll = 15,
    Slli = 16,
    Srl = 17,
    Srli = 18,
    Lw = 19,
    Li = 20,
    Sw = 21,
    Si = 22,
    Cmpr = 23,
    Cmpi = 24,
    Br = 25,
    Bi = 26,
    Push = 27,
    Pop = 28,
    Fw = 29,
    Svc = 30,
    Aps = 31,
}

/// The operand shape a given opcode's text form and codec both dispatch
/// on. Mirrors the table in §4.1a of the architecture notes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OperandShape {
    /// `dst=Register, src=Register` (the non-`i` half of a pair).
    TwoRegister,
    /// `dst=Register, src=Immediate|Symbol` (the `i` half of a pair).
    TwoImmediate,
    /// `target=Register` branch (`br`).
    BranchRegister,
    /// `target=Immediate|Symbol` branch (`bi`).
    BranchImmediate,
    /// `reg=Register` only (`push`/`pop`).
    RegisterOnly,
    /// `value=Immediate|Symbol`, 24-bit (`fw`/`svc`).
    ImmediateOnly24,
    /// `dst=Register, code=Immediate` (`aps`).
    Aps,
    /// No operands (`nop`).
    None,
}

impl Opcode {
    pub const ALL: [Opcode; 32] = [
        Opcode::Nop,
        Opcode::Mov,
        Opcode::Movi,
        Opcode::Add,
        Opcode::Addi,
        Opcode::Sub,
        Opcode::Subi,
        Opcode::Mul,
        Opcode::Muli,
        Opcode::Div,
        Opcode::Divi,
        Opcode::And,
        Opcode::Andi,
        Opcode::Or,
        Opcode::Ori,
        Opcode::Sll,
        Opcode::Slli,
        Opcode::Srl,
        Opcode::Srli,
        Opcode::Lw,
        Opcode::Li,
        Opcode::Sw,
        Opcode::Si,
        Opcode::Cmpr,
        Opcode::Cmpi,
        Opcode::Br,
        Opcode::Bi,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Fw,
        Opcode::Svc,
        Opcode::Aps,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: u8) -> Option<Opcode> {
        Opcode::ALL.get(index as usize).copied()
    }

    pub fn shape(self) -> OperandShape {
        match self {
            Opcode::Nop => OperandShape::None,
            Opcode::Mov
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::And
            | Opcode::Or
            | Opcode::Sll
            | Opcode::Srl
            | Opcode::Lw
            | Opcode::Sw
            | Opcode::Cmpr => OperandShape::TwoRegister,
            Opcode::Movi
            | Opcode::Addi
            | Opcode::Subi
            | Opcode::Muli
            | Opcode::Divi
            | Opcode::Andi
            | Opcode::Ori
            | Opcode::Slli
            | Opcode::Srli
            | Opcode::Li
            | Opcode::Si
            | Opcode::Cmpi => OperandShape::TwoImmediate,
            Opcode::Br => OperandShape::BranchRegister,
            Opcode::Bi => OperandShape::BranchImmediate,
            Opcode::Push | Opcode::Pop => OperandShape::RegisterOnly,
            Opcode::Fw | Opcode::Svc => OperandShape::ImmediateOnly24,
            Opcode::Aps => OperandShape::Aps,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Nop => "nop",
            Opcode::Mov => "mov",
            Opcode::Movi => "movi",
            Opcode::Add => "add",
            Opcode::Addi => "addi",
            Opcode::Sub => "sub",
            Opcode::Subi => "subi",
            Opcode::Mul => "mul",
            Opcode::Muli => "muli",
            Opcode::Div => "div",
            Opcode::Divi => "divi",
            Opcode::And => "and",
            Opcode::Andi => "andi",
            Opcode::Or => "or",
            Opcode::Ori => "ori",
            Opcode::Sll => "sll",
            Opcode::Slli => "slli",
            Opcode::Srl => "srl",
            Opcode::Srli => "srli",
            Opcode::Lw => "lw",
            Opcode::Li => "li",
            Opcode::Sw => "sw",
            Opcode::Si => "si",
            Opcode::Cmpr => "cmpr",
            Opcode::Cmpi => "cmpi",
            Opcode::Br => "br",
            Opcode::Bi => "bi",
            Opcode::Push => "push",
            Opcode::Pop => "pop",
            Opcode::Fw => "fw",
            Opcode::Svc => "svc",
            Opcode::Aps => "aps",
        }
    }

    /// Matches a lower-cased mnemonic, `br`/`bi` also accepting the
    /// `r`-suffixed relative spelling (`brr`/`bir`); the caller gets the
    /// `relative` bit back via `relative_suffix`.
    pub fn from_mnemonic(s: &str) -> Option<Opcode> {
        Opcode::ALL.into_iter().find(|op| op.mnemonic() == s)
    }
}

/// The condition-gated, opcode-specific payload of an instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum InstructionKind {
    Nop,
    TwoOperand { dst: RegisterId, src: Operand },
    Branch { relative: bool, target: Operand },
    RegisterOnly { reg: RegisterId },
    ImmediateOnly24 { value: Operand },
    Aps { dst: RegisterId, code: Operand },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub condition: Condition,
    pub kind: InstructionKind,
}

impl Instruction {
    pub fn nop() -> Instruction {
        Instruction {
            opcode: Opcode::Nop,
            condition: Condition::Always,
            kind: InstructionKind::Nop,
        }
    }

    /// True while any operand still carries an unresolved `Symbol`.
    pub fn requested_symbol(&self) -> Option<&str> {
        match &self.kind {
            InstructionKind::TwoOperand { src, .. } => src.as_symbol(),
            InstructionKind::Branch { target, .. } => target.as_symbol(),
            InstructionKind::ImmediateOnly24 { value } => value.as_symbol(),
            InstructionKind::Aps { code, .. } => code.as_symbol(),
            InstructionKind::Nop | InstructionKind::RegisterOnly { .. } => None,
        }
    }

    /// Rewrites the pending symbolic operand (if any) to the given
    /// resolved address, turning it into an `Immediate`.
    pub fn resolve_symbol(&mut self, address: u32) {
        let resolved = Operand::Immediate(address as i32);
        match &mut self.kind {
            InstructionKind::TwoOperand { src, .. } if src.is_symbol() => *src = resolved,
            InstructionKind::Branch { target, .. } if target.is_symbol() => *target = resolved,
            InstructionKind::ImmediateOnly24 { value } if value.is_symbol() => *value = resolved,
            InstructionKind::Aps { code, .. } if code.is_symbol() => *code = resolved,
            _ => {}
        }
    }

    pub fn encode(&self) -> Result<u32, CodecError> {
        let tag = self.opcode.index() as u32 | ((self.condition.to_bits() as u32) << 5);
        match &self.kind {
            InstructionKind::Nop => Ok(tag),
            InstructionKind::TwoOperand { dst, src } => {
                let reg1 = (dst.index() as u32) << 4;
                match src {
                    Operand::Register(r2) => {
                        let regpair = reg1 | r2.index() as u32;
                        Ok(tag | (regpair << 8))
                    }
                    Operand::Immediate(v) => {
                        let imm = encode_immediate16(*v)?;
                        let regpair = reg1;
                        Ok(tag | (regpair << 8) | ((imm as u32) << 16))
                    }
                    Operand::Symbol(s) => Err(CodecError::generator(format!(
                        "unresolved symbol `{}` cannot be encoded",
                        s
                    ))),
                }
            }
            InstructionKind::Branch { relative, target } => {
                if *relative {
                    let imm = match target {
                        Operand::Immediate(v) => encode_immediate16(*v)?,
                        Operand::Symbol(s) => {
                            return Err(CodecError::generator(format!(
                                "unresolved symbol `{}` cannot be encoded",
                                s
                            )))
                        }
                        Operand::Register(_) => {
                            return Err(CodecError::generator(
                                "relative branch target must be an immediate or symbol",
                            ))
                        }
                    };
                    let regpair = RELATIVE_FLAG_BYTE as u32;
                    Ok(tag | (regpair << 8) | ((imm as u32) << 16))
                } else {
                    match (self.opcode, target) {
                        (Opcode::Br, Operand::Register(r)) => {
                            let regpair = (r.index() as u32) << 4;
                            Ok(tag | (regpair << 8))
                        }
                        (Opcode::Bi, Operand::Immediate(v)) => {
                            let imm = encode_immediate16(*v)?;
                            Ok(tag | ((imm as u32) << 16))
                        }
                        (Opcode::Bi, Operand::Symbol(s)) => Err(CodecError::generator(format!(
                            "unresolved symbol `{}` cannot be encoded",
                            s
                        ))),
                        _ => Err(CodecError::generator(
                            "branch target operand does not match opcode form",
                        )),
                    }
                }
            }
            InstructionKind::RegisterOnly { reg } => {
                let regpair = (reg.index() as u32) << 4;
                Ok(tag | (regpair << 8))
            }
            InstructionKind::ImmediateOnly24 { value } => {
                let v = match value {
                    Operand::Immediate(v) => *v,
                    Operand::Symbol(s) => {
                        return Err(CodecError::generator(format!(
                            "unresolved symbol `{}` cannot be encoded",
                            s
                        )))
                    }
                    Operand::Register(_) => {
                        return Err(CodecError::generator(
                            "fw/svc take an immediate or symbol, not a register",
                        ))
                    }
                };
                let imm = encode_immediate24(v)?;
                Ok(tag | ((imm as u32 & 0x00FF_FFFF) << 8))
            }
            InstructionKind::Aps { dst, code } => {
                let reg1 = (dst.index() as u32) << 4;
                let v = match code {
                    Operand::Immediate(v) => *v,
                    Operand::Symbol(s) => {
                        return Err(CodecError::generator(format!(
                            "unresolved symbol `{}` cannot be encoded",
                            s
                        )))
                    }
                    Operand::Register(_) => {
                        return Err(CodecError::generator("aps request code must be an immediate"))
                    }
                };
                let imm = encode_immediate16(v)?;
                Ok(tag | (reg1 << 8) | ((imm as u32) << 16))
            }
        }
    }

    pub fn decode(word: u32) -> Result<Instruction, CodecError> {
        let opcode_idx = ((word & OPCODE_MASK) >> OPCODE_OFFSET) as u8;
        let opcode = Opcode::from_index(opcode_idx)
            .ok_or_else(|| CodecError::parser(format!("unknown opcode index {}", opcode_idx)))?;
        let condition = Condition::from_bits(((word & CONDITION_MASK) >> CONDITION_OFFSET) as u8);
        let regpair_byte = ((word >> 8) & 0xFF) as u8;
        let reg1 = (regpair_byte >> 4) & 0xF;
        let reg2 = regpair_byte & 0xF;
        let imm16 = decode_immediate16(word);

        let kind = match opcode.shape() {
            OperandShape::None => InstructionKind::Nop,
            OperandShape::TwoRegister => InstructionKind::TwoOperand {
                dst: reg_from_nibble(reg1)?,
                src: Operand::Register(reg_from_nibble(reg2)?),
            },
            OperandShape::TwoImmediate => InstructionKind::TwoOperand {
                dst: reg_from_nibble(reg1)?,
                src: Operand::Immediate(imm16),
            },
            OperandShape::BranchRegister => {
                if regpair_byte == RELATIVE_FLAG_BYTE {
                    InstructionKind::Branch {
                        relative: true,
                        target: Operand::Immediate(imm16),
                    }
                } else {
                    InstructionKind::Branch {
                        relative: false,
                        target: Operand::Register(reg_from_nibble(reg1)?),
                    }
                }
            }
            OperandShape::BranchImmediate => {
                if regpair_byte == RELATIVE_FLAG_BYTE {
                    InstructionKind::Branch {
                        relative: true,
                        target: Operand::Immediate(imm16),
                    }
                } else {
                    InstructionKind::Branch {
                        relative: false,
                        target: Operand::Immediate(imm16),
                    }
                }
            }
            OperandShape::RegisterOnly => InstructionKind::RegisterOnly {
                reg: reg_from_nibble(reg1)?,
            },
            OperandShape::ImmediateOnly24 => InstructionKind::ImmediateOnly24 {
                value: Operand::Immediate(decode_immediate24(word)),
            },
            OperandShape::Aps => InstructionKind::Aps {
                dst: reg_from_nibble(reg1)?,
                code: Operand::Immediate(imm16),
            },
        };

        Ok(Instruction {
            opcode,
            condition,
            kind,
        })
    }

    /// Parses a single-line mnemonic, e.g. `addi.ne r0, #5` or
    /// `bir $loop`. Whitespace around the comma is ignored.
    pub fn parse(line: &str) -> Result<Instruction, CodecError> {
        let text = line.trim();
        let (head, rest) = match text.find(char::is_whitespace) {
            Some(i) => (&text[..i], text[i..].trim_start()),
            None => (text, ""),
        };
        let mut head_parts = head.splitn(2, '.');
        let mnemonic_raw = head_parts.next().unwrap().to_lowercase();
        let cond_suffix = head_parts.next();

        let condition = match cond_suffix {
            Some(suffix) => Condition::from_suffix(suffix)
                .ok_or_else(|| CodecError::parser(format!("unknown condition suffix `{}`", suffix)))?,
            None => Condition::Always,
        };

        let (mnemonic, relative) = strip_relative_suffix(&mnemonic_raw);
        let opcode = Opcode::from_mnemonic(mnemonic)
            .ok_or_else(|| CodecError::parser(format!("unknown mnemonic `{}`", mnemonic_raw)))?;

        if relative && !matches!(opcode, Opcode::Br | Opcode::Bi) {
            return Err(CodecError::parser(format!(
                "`{}` has no relative form",
                mnemonic_raw
            )));
        }

        let kind = match opcode.shape() {
            OperandShape::None => {
                if !rest.is_empty() {
                    return Err(CodecError::parser(format!("`{}` takes no operands", mnemonic)));
                }
                InstructionKind::Nop
            }
            OperandShape::TwoRegister | OperandShape::TwoImmediate | OperandShape::Aps => {
                let (dst_str, src_str) = split_two(rest)?;
                let dst = parse_register(dst_str)?;
                let src = parse_operand(src_str)?;
                if opcode.shape() == OperandShape::Aps {
                    InstructionKind::Aps { dst, code: src }
                } else {
                    InstructionKind::TwoOperand { dst, src }
                }
            }
            OperandShape::BranchRegister => InstructionKind::Branch {
                relative,
                target: Operand::Register(parse_register(rest)?),
            },
            OperandShape::BranchImmediate => InstructionKind::Branch {
                relative,
                target: parse_immediate_or_symbol(rest)?,
            },
            OperandShape::RegisterOnly => InstructionKind::RegisterOnly {
                reg: parse_register(rest)?,
            },
            OperandShape::ImmediateOnly24 => InstructionKind::ImmediateOnly24 {
                value: parse_immediate_or_symbol(rest)?,
            },
        };

        Ok(Instruction {
            opcode,
            condition,
            kind,
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mnemonic = self.opcode.mnemonic();
        let relative = matches!(
            self.kind,
            InstructionKind::Branch { relative: true, .. }
        );
        let mnemonic = if relative {
            format!("{}r", mnemonic)
        } else {
            mnemonic.to_string()
        };
        let suffix = if self.condition == Condition::Always {
            String::new()
        } else {
            format!(".{}", self.condition.suffix())
        };
        write!(f, "{}{}", mnemonic, suffix)?;
        match &self.kind {
            InstructionKind::Nop => Ok(()),
            InstructionKind::TwoOperand { dst, src } => {
                write!(f, " {}, {}", print_register(*dst), print_operand(src))
            }
            InstructionKind::Branch { target, .. } => write!(f, " {}", print_operand(target)),
            InstructionKind::RegisterOnly { reg } => write!(f, " {}", print_register(*reg)),
            InstructionKind::ImmediateOnly24 { value } => write!(f, " {}", print_operand(value)),
            InstructionKind::Aps { dst, code } => {
                write!(f, " {}, {}", print_register(*dst), print_operand(code))
            }
        }
    }
}

fn reg_from_nibble(nibble: u8) -> Result<RegisterId, CodecError> {
    RegisterId::from_index(nibble as u32)
        .ok_or_else(|| CodecError::parser(format!("invalid register index {}", nibble)))
}

fn strip_relative_suffix(mnemonic: &str) -> (&str, bool) {
    if (mnemonic == "brr" || mnemonic == "bir") && mnemonic.ends_with('r') {
        (&mnemonic[..mnemonic.len() - 1], true)
    } else {
        (mnemonic, false)
    }
}

fn split_two(rest: &str) -> Result<(&str, &str), CodecError> {
    let idx = rest
        .find(',')
        .ok_or_else(|| CodecError::parser("expected `dst, src` operand pair"))?;
    Ok((rest[..idx].trim(), rest[idx + 1..].trim()))
}

fn parse_register(s: &str) -> Result<RegisterId, CodecError> {
    let s = s.trim();
    match s.to_lowercase().as_str() {
        "r0" => Ok(RegisterId::R0),
        "r1" => Ok(RegisterId::R1),
        "r2" => Ok(RegisterId::R2),
        "r3" => Ok(RegisterId::R3),
        "r4" => Ok(RegisterId::R4),
        "r5" => Ok(RegisterId::R5),
        "r6" => Ok(RegisterId::R6),
        "r7" => Ok(RegisterId::R7),
        "r8" => Ok(RegisterId::R8),
        "r9" => Ok(RegisterId::R9),
        "r10" => Ok(RegisterId::R10),
        "r11" => Ok(RegisterId::R11),
        "sp" => Ok(RegisterId::SP),
        "ra" => Ok(RegisterId::RA),
        "flg" => Ok(RegisterId::FLG),
        "pc" => Ok(RegisterId::PC),
        other => Err(CodecError::parser(format!("`{}` is not a register", other))),
    }
}

fn print_register(reg: RegisterId) -> &'static str {
    match reg {
        RegisterId::R0 => "r0",
        RegisterId::R1 => "r1",
        RegisterId::R2 => "r2",
        RegisterId::R3 => "r3",
        RegisterId::R4 => "r4",
        RegisterId::R5 => "r5",
        RegisterId::R6 => "r6",
        RegisterId::R7 => "r7",
        RegisterId::R8 => "r8",
        RegisterId::R9 => "r9",
        RegisterId::R10 => "r10",
        RegisterId::R11 => "r11",
        RegisterId::SP => "sp",
        RegisterId::RA => "ra",
        RegisterId::FLG => "flg",
        RegisterId::PC => "pc",
    }
}

/// Parses `#123`, `#0x7B`, `#-5` or `$symbol`. Symbols must be at least
/// two characters (the `$` plus one more), matching `Try_Parse_Symbolic`.
pub fn parse_operand(s: &str) -> Result<Operand, CodecError> {
    let s = s.trim();
    if s.starts_with('$') {
        parse_symbol(s)
    } else if s.starts_with('#') {
        parse_immediate(s).map(Operand::Immediate)
    } else {
        parse_register(s).map(Operand::Register)
    }
}

fn parse_immediate_or_symbol(s: &str) -> Result<Operand, CodecError> {
    let s = s.trim();
    if s.starts_with('$') {
        parse_symbol(s)
    } else {
        parse_immediate(s).map(Operand::Immediate)
    }
}

fn parse_symbol(s: &str) -> Result<Operand, CodecError> {
    if s.len() < 2 {
        return Err(CodecError::parser("symbol name must have at least one character after `$`"));
    }
    Ok(Operand::Symbol(s[1..].to_string()))
}

fn parse_immediate(s: &str) -> Result<i32, CodecError> {
    if !s.starts_with('#') {
        return Err(CodecError::parser(format!("`{}` is not an immediate", s)));
    }
    let body = &s[1..];
    let (negative, body) = if let Some(stripped) = body.strip_prefix('-') {
        (true, stripped)
    } else {
        (false, body)
    };
    let magnitude = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        body.parse::<i64>()
    }
    .map_err(|_| CodecError::parser(format!("`{}` is not a valid immediate", s)))?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).map_err(|_| CodecError::generator(format!("immediate `{}` out of range", s)))
}

fn print_operand(op: &Operand) -> String {
    match op {
        Operand::Register(r) => print_register(*r).to_string(),
        Operand::Immediate(v) => format_immediate(*v),
        Operand::Symbol(s) => format!("${}", s),
    }
}

/// Renders an immediate the way `formatNum`/`hexaFmt` do: absolute-value
/// hex with a leading `-` for negatives.
pub fn format_immediate(v: i32) -> String {
    if v < 0 {
        format!("#-0x{:X}", v.unsigned_abs())
    } else {
        format!("#0x{:X}", v)
    }
}

fn encode_immediate16(v: i32) -> Result<i16, CodecError> {
    if v < IMMEDIATE16_MIN || v > IMMEDIATE16_MAX {
        return Err(CodecError::generator(format!(
            "immediate {} out of 16-bit range [{}, {}]",
            v, IMMEDIATE16_MIN, IMMEDIATE16_MAX
        )));
    }
    Ok(v as i16)
}

fn decode_immediate16(word: u32) -> i32 {
    (((word & IMMEDIATE16_MASK) >> IMMEDIATE16_OFFSET) as u16) as i16 as i32
}

fn encode_immediate24(v: i32) -> Result<i32, CodecError> {
    if v < IMMEDIATE24_MIN || v > IMMEDIATE24_MAX {
        return Err(CodecError::generator(format!(
            "immediate {} out of 24-bit range [{}, {}]",
            v, IMMEDIATE24_MIN, IMMEDIATE24_MAX
        )));
    }
    Ok(v)
}

fn decode_immediate24(word: u32) -> i32 {
    (word as i32) >> 8
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::register::RegisterId;

    #[test]
    fn round_trips_two_register_form() {
        let instr = Instruction {
            opcode: Opcode::Add,
            condition: Condition::Equal,
            kind: InstructionKind::TwoOperand {
                dst: RegisterId::R0,
                src: Operand::Register(RegisterId::R1),
            },
        };
        let word = instr.encode().unwrap();
        assert_eq!(Instruction::decode(word).unwrap(), instr);
        assert_eq!(Instruction::parse(&instr.to_string()).unwrap(), instr);
    }

    #[test]
    fn round_trips_immediate_form_at_boundary() {
        let instr = Instruction {
            opcode: Opcode::Addi,
            condition: Condition::Always,
            kind: InstructionKind::TwoOperand {
                dst: RegisterId::R3,
                src: Operand::Immediate(32767),
            },
        };
        let word = instr.encode().unwrap();
        assert_eq!(Instruction::decode(word).unwrap(), instr);
    }

    #[test]
    fn immediate16_one_past_boundary_is_rejected() {
        let instr = Instruction {
            opcode: Opcode::Addi,
            condition: Condition::Always,
            kind: InstructionKind::TwoOperand {
                dst: RegisterId::R3,
                src: Operand::Immediate(32768),
            },
        };
        assert!(instr.encode().is_err());
    }

    #[test]
    fn immediate24_round_trips_fw() {
        let instr = Instruction {
            opcode: Opcode::Fw,
            condition: Condition::Always,
            kind: InstructionKind::ImmediateOnly24 {
                value: Operand::Immediate(-8388608),
            },
        };
        let word = instr.encode().unwrap();
        assert_eq!(Instruction::decode(word).unwrap(), instr);
    }

    #[test]
    fn relative_branch_sets_flag_byte() {
        let instr = Instruction {
            opcode: Opcode::Bi,
            condition: Condition::NotEqual,
            kind: InstructionKind::Branch {
                relative: true,
                target: Operand::Immediate(-16),
            },
        };
        let word = instr.encode().unwrap();
        assert_eq!(((word >> 8) & 0xFF) as u8, RELATIVE_FLAG_BYTE);
        assert_eq!(Instruction::decode(word).unwrap(), instr);
        assert_eq!(Instruction::parse("bir.ne $loop").is_ok(), false);
        assert_eq!(Instruction::parse("bir.ne #-16").unwrap(), instr);
    }

    #[test]
    fn branch_register_form_parses() {
        let instr = Instruction::parse("br r5").unwrap();
        assert_eq!(
            instr.kind,
            InstructionKind::Branch {
                relative: false,
                target: Operand::Register(RegisterId::R5),
            }
        );
    }

    #[test]
    fn decoded_condition_0b111_is_always_but_unparsable() {
        assert_eq!(Condition::from_bits(0b111), Condition::Unspecified);
        assert!(Condition::from_suffix("xx").is_none());
    }

    #[test]
    fn bare_dollar_symbol_is_rejected() {
        assert!(parse_operand("$").is_err());
    }

    #[test]
    fn nop_round_trips() {
        let instr = Instruction::nop();
        let word = instr.encode().unwrap();
        assert_eq!(word, 0);
        assert_eq!(Instruction::decode(word).unwrap(), instr);
        assert_eq!(Instruction::parse("nop").unwrap(), instr);
    }
}
