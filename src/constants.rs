//! Bit-layout constants for the 32-bit SArch32 instruction word.
//!
//! Byte 0 (least-significant) is the tag byte: opcode in bits 0-4,
//! condition in bits 5-7. Byte 1 is the register-pair byte: high
//! nibble is the first register index, low nibble the second. Bytes
//! 2-3 hold a 16-bit signed immediate for immediate-form opcodes; for
//! `fw`/`svc` bytes 1-3 together hold a 24-bit signed immediate.

pub const REGISTER_COUNT: usize = 16;

pub const WORD_BYTES: u32 = 4;

pub const OPCODE_MASK: u32 = 0x0000_001F;
pub const OPCODE_OFFSET: u32 = 0;

pub const CONDITION_MASK: u32 = 0x0000_00E0;
pub const CONDITION_OFFSET: u32 = 5;

pub const REG1_MASK: u32 = 0x0000_F000;
pub const REG1_OFFSET: u32 = 12;

pub const REG2_MASK: u32 = 0x0000_0F00;
pub const REG2_OFFSET: u32 = 8;

pub const IMMEDIATE16_MASK: u32 = 0xFFFF_0000;
pub const IMMEDIATE16_OFFSET: u32 = 16;

pub const IMMEDIATE16_MIN: i32 = i16::MIN as i32;
pub const IMMEDIATE16_MAX: i32 = i16::MAX as i32;

pub const IMMEDIATE24_MIN: i32 = -0x0080_0000;
pub const IMMEDIATE24_MAX: i32 = 0x007F_FFFF;

/// Byte 1 value signalling a relative branch/jump (`br`/`bi` only).
pub const RELATIVE_FLAG_BYTE: u8 = 0xFF;

/// Address at which code execution begins after reset.
pub const RESET_VECTOR: u32 = 0x0000_1000;

/// Base address of the interrupt vector table; six 4-byte entries follow.
pub const IVT_BASE: u32 = 0x0000_0000;

pub const DEFAULT_MEMORY_SIZE: u32 = 2 * 1024 * 1024;

/// Mean assumed cycles-per-instruction, used only to drive the
/// simulated clock source offered to peripherals; not part of any
/// timing guarantee.
pub const DEFAULT_MEAN_CPI: u32 = 8;
