use num_derive::{FromPrimitive, ToPrimitive};
use util::{EnumFromStr, InteropGetName};
use util_derive::{EnumFromStr, InteropGetName};

/// One of the sixteen 32-bit registers addressable by a 4-bit index in
/// the register-pair byte of an instruction word.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, ToPrimitive, FromPrimitive, InteropGetName, EnumFromStr)]
pub enum RegisterId {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    /// Stack pointer. Grows downward: `push` decrements before storing.
    SP,
    /// Return address, latched by exception dispatch and `jl`-style calls.
    RA,
    /// Condition flags register; see [`Flags`].
    FLG,
    /// Program counter; holds the address of the next instruction to fetch.
    PC,
}

impl RegisterId {
    pub fn index(self) -> usize {
        use num_traits::ToPrimitive;
        self.to_usize().unwrap()
    }

    pub fn from_index(index: u32) -> Option<RegisterId> {
        use num_traits::FromPrimitive;
        RegisterId::from_u32(index)
    }
}

/// Condition flags, packed into the `FLG` register. Only `cmp`/`cmpi`
/// produce `N`, `Z`, `V`; `C` exists in the register layout but is not
/// written by any opcode this crate implements.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Flags {
    pub negative: bool,
    pub zero: bool,
    pub overflow: bool,
    pub carry: bool,
}

impl Flags {
    pub const NEGATIVE_BIT: u32 = 1 << 0;
    pub const ZERO_BIT: u32 = 1 << 1;
    pub const OVERFLOW_BIT: u32 = 1 << 2;
    pub const CARRY_BIT: u32 = 1 << 3;

    pub fn from_bits(bits: u32) -> Flags {
        Flags {
            negative: bits & Self::NEGATIVE_BIT != 0,
            zero: bits & Self::ZERO_BIT != 0,
            overflow: bits & Self::OVERFLOW_BIT != 0,
            carry: bits & Self::CARRY_BIT != 0,
        }
    }

    pub fn to_bits(self) -> u32 {
        (self.negative as u32) << 0
            | (self.zero as u32) << 1
            | (self.overflow as u32) << 2
            | (self.carry as u32) << 3
    }
}

/// Three-bit predicate carried alongside every opcode, evaluated
/// against [`Flags`] before an instruction's side effects apply.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Condition {
    Always,
    Equal,
    NotEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    /// Decodes identically to `Always`; the text parser never produces
    /// this value (see the open question recorded in DESIGN.md).
    Unspecified,
}

impl Condition {
    pub fn to_bits(self) -> u8 {
        match self {
            Condition::Always => 0,
            Condition::Equal => 1,
            Condition::NotEqual => 2,
            Condition::Greater => 3,
            Condition::GreaterEqual => 4,
            Condition::Less => 5,
            Condition::LessEqual => 6,
            Condition::Unspecified => 7,
        }
    }

    pub fn from_bits(bits: u8) -> Condition {
        match bits & 0b111 {
            0 => Condition::Always,
            1 => Condition::Equal,
            2 => Condition::NotEqual,
            3 => Condition::Greater,
            4 => Condition::GreaterEqual,
            5 => Condition::Less,
            6 => Condition::LessEqual,
            _ => Condition::Unspecified,
        }
    }

    /// Parses the `.cond` mnemonic suffix. `al` maps to `Always`;
    /// `Unspecified` has no textual form and is rejected here.
    pub fn from_suffix(s: &str) -> Option<Condition> {
        match s.to_lowercase().as_str() {
            "al" => Some(Condition::Always),
            "eq" => Some(Condition::Equal),
            "ne" => Some(Condition::NotEqual),
            "gt" => Some(Condition::Greater),
            "ge" => Some(Condition::GreaterEqual),
            "lt" => Some(Condition::Less),
            "le" => Some(Condition::LessEqual),
            _ => None,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Condition::Always => "al",
            Condition::Equal => "eq",
            Condition::NotEqual => "ne",
            Condition::Greater => "gt",
            Condition::GreaterEqual => "ge",
            Condition::Less => "lt",
            Condition::LessEqual => "le",
            Condition::Unspecified => "al",
        }
    }

    /// Evaluates this condition against the current flags.
    pub fn holds(self, flags: Flags) -> bool {
        match self {
            Condition::Always | Condition::Unspecified => true,
            Condition::Equal => flags.zero,
            Condition::NotEqual => !flags.zero,
            Condition::Greater => !flags.zero && flags.negative == flags.overflow,
            Condition::GreaterEqual => flags.negative == flags.overflow,
            Condition::Less => flags.negative != flags.overflow,
            Condition::LessEqual => flags.zero || flags.negative != flags.overflow,
        }
    }
}

/// Processor-state register namespace, separate from the GPRs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    System = 0,
    User = 1,
}

impl Mode {
    pub fn from_bit(bit: u32) -> Mode {
        if bit & 1 != 0 {
            Mode::User
        } else {
            Mode::System
        }
    }

    pub fn to_bit(self) -> u32 {
        self as u32
    }
}

/// Request code carried by the `aps` opcode's immediate operand.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ApsRequest {
    None,
    GetMode,
    SetMode,
    /// Any other code: silently ignored per §4.3.
    Unknown(u32),
}

impl ApsRequest {
    pub fn from_code(code: u32) -> ApsRequest {
        match code {
            0 => ApsRequest::None,
            1 => ApsRequest::GetMode,
            2 => ApsRequest::SetMode,
            other => ApsRequest::Unknown(other),
        }
    }
}
