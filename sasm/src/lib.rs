//! Two-pass assembler/linker for the [sarch32](../sarch32/index.html)
//! instruction set.
//!
//! A program is assembled from one or more input files plus a linker
//! script. Pass one walks each input file line by line, dispatching
//! each line to the first directive parser that matches it (`.section`,
//! `$label:`, `db`/`dw`/`asciz`, or — failing all of those — a machine
//! instruction via [`sarch32::Instruction::parse`]), accumulating a
//! section/label/fixup table in a [`BuildContext`]. Pass two resolves
//! every fixup against the label table and the linker script's section
//! addresses, then emits a linked [`sobjfile::ObjectFile`].
//!
//! ```text
//! .section text
//! movi r0, #0
//! movi r1, #1
//! $loop:
//! add r0, r1
//! addi r1, #1
//! cmpi r1, #11
//! bir.ne $loop
//! svc #0
//! ```
//!
//! A malformed line is logged and skipped (it contributes no bytes);
//! an undefined symbol or a section with no linker-script entry is
//! fatal and aborts emission.

mod context;
mod linker_script;

pub mod error;

#[cfg(test)]
mod test;

pub use context::{BuildContext, Fixup, Item, Section};
pub use error::{AssembleError, Result};
pub use linker_script::{parse as parse_linker_script, SectionAddresses};

/// Assembles and links one or more named source files against a
/// linker script, returning the emitted object file.
///
/// `sources` pairs a diagnostic name (used only in log messages, e.g.
/// a file path) with that file's contents; passing more than one
/// models multiple translation units sharing one whole-program symbol
/// table, exactly as `-i` is repeatable on the CLI (§6).
pub fn assemble<'a, I>(sources: I, linker_script: &str) -> Result<sobjfile::ObjectFile>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut ctx = BuildContext::new();
    for (file, contents) in sources {
        for (line_no, raw_line) in contents.lines().enumerate() {
            ctx.process_line(file, line_no + 1, raw_line);
        }
    }
    let addresses = parse_linker_script(linker_script);
    ctx.resolve_and_emit(&addresses)
}

/// Convenience wrapper over [`assemble`] for the common single-file
/// case.
pub fn assemble_str(source: &str, linker_script: &str) -> Result<sobjfile::ObjectFile> {
    assemble(Some(("<input>", source)), linker_script)
}
