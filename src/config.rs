//! Emulator startup configuration — interface stub (§6a).
//!
//! The graphical shell (out of scope) starts a machine from a text file
//! of `key=value` lines with `;` comments:
//!
//! ```text
//! machine = default | sarch32_001
//! memory = <N>[k|K|m|M|g|G]    ; bytes, optional binary-prefix suffix
//! image = PATH                 ; object file loaded at each section's base address
//! display = default | d1_monochromatic
//! gpio = <implementation tag>
//! timer = <implementation tag>
//! uart = <implementation tag>
//! ```
//!
//! [`MachineConfig`] only mirrors this key set as typed fields; no
//! `key=value` parser is implemented here, since the shell that would
//! read the file is out of scope for this crate.

use std::path::PathBuf;

/// The `machine` key: which peripheral/memory layout to build.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MachineKind {
    Default,
    Sarch32_001,
}

/// The `display` key: which framebuffer implementation to mount.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DisplayKind {
    Default,
    D1Monochromatic,
}

/// A `memory = <N>[k|K|m|M|g|G]` value, already resolved to bytes. The
/// suffix arithmetic (`k`/`K` = 2^10, `m`/`M` = 2^20, `g`/`G` = 2^30) is
/// documented here but not implemented; the shell performs the string-
/// to-byte-count conversion before constructing this value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MemorySize(pub u32);

/// Typed mirror of the emulator config file's key set. Construction is
/// left to the (out-of-scope) shell; this struct exists so its parser
/// has a documented destination type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MachineConfig {
    pub machine: MachineKind,
    pub memory: MemorySize,
    pub image: PathBuf,
    pub display: DisplayKind,
    /// Implementation tag; the config grammar does not enumerate a
    /// fixed set of values for `gpio`/`timer`/`uart`.
    pub gpio: String,
    pub timer: String,
    pub uart: String,
}
