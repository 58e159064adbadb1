use std::fmt;

/// Assembly/link-time tooling errors. Distinct from
/// [`sarch32::CodecError`], which only covers a single instruction's
/// text/binary form; these cover whole-program concerns that only make
/// sense once every input file and the linker script have been read.
#[derive(Debug)]
pub enum AssembleError {
    /// An input section has no matching `section NAME(ADDR)` entry in
    /// the linker script.
    MissingSection { section: String },
    /// A fixup's symbol was never bound by a `$label:` anywhere in the
    /// assembled program.
    UndefinedSymbol { symbol: String },
    /// The instruction codec rejected a fully-resolved instruction
    /// (e.g. a resolved address didn't fit the operand's immediate
    /// width) during final emission.
    Codec(sarch32::CodecError),
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AssembleError::MissingSection { section } => {
                write!(f, "link error: section `{}` has no linker script entry", section)
            }
            AssembleError::UndefinedSymbol { symbol } => {
                write!(f, "link error: undefined symbol `{}`", symbol)
            }
            AssembleError::Codec(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AssembleError {}

impl From<sarch32::CodecError> for AssembleError {
    fn from(err: sarch32::CodecError) -> AssembleError {
        AssembleError::Codec(err)
    }
}

pub type Result<T> = std::result::Result<T, AssembleError>;
