//! The object-file container the assembler emits and the loader reads:
//! a sequence of named, relocatable sections, each carrying its own
//! base address and raw byte payload.
//!
//! ```text
//! u32 sectionCount
//! repeat sectionCount:
//!   u32 nameLen
//!   bytes[nameLen] name           ; no NUL
//!   u32 startAddr
//!   u32 size
//!   bytes[size] data
//! ```
//!
//! All integers are little-endian. Unlike the reference workspace's
//! `vexfile` crate (which returns a bare `std::io::Result` around two
//! fixed blobs), this format is a list of named sections, so a
//! dedicated error type distinguishes a filesystem failure from a
//! corrupt/truncated section header.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::prelude::*;
use std::io::{BufReader, BufWriter};
use std::path::Path;

#[cfg(test)]
mod test;

/// One named, relocatable section: a base address plus its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub start_addr: u32,
    pub data: Vec<u8>,
}

impl Section {
    pub fn new(name: impl Into<String>, start_addr: u32, data: Vec<u8>) -> Section {
        Section {
            name: name.into(),
            start_addr,
            data,
        }
    }

    pub fn size(&self) -> u32 {
        self.data.len() as u32
    }
}

/// A complete object file: an ordered list of sections.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectFile {
    pub sections: Vec<Section>,
}

impl ObjectFile {
    pub fn new(sections: Vec<Section>) -> ObjectFile {
        ObjectFile { sections }
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ObjectFileError {
    #[error("I/O error reading/writing object file: {0}")]
    Io(#[from] std::io::Error),
    #[error("section name of length {len} at index {index} is not valid UTF-8")]
    InvalidSectionName { index: usize, len: u32 },
    #[error("section `{name}` declares size {declared} but the file ends before that many bytes follow")]
    TruncatedSection { name: String, declared: u32 },
}

pub type Result<T> = std::result::Result<T, ObjectFileError>;

pub fn read<R: Read>(reader: &mut R) -> Result<ObjectFile> {
    let section_count = reader.read_u32::<LittleEndian>()?;
    let mut sections = Vec::with_capacity(section_count as usize);

    for index in 0..section_count as usize {
        let name_len = reader.read_u32::<LittleEndian>()?;
        let mut name_bytes = vec![0u8; name_len as usize];
        reader.read_exact(&mut name_bytes)?;
        let name = String::from_utf8(name_bytes).map_err(|_| ObjectFileError::InvalidSectionName {
            index,
            len: name_len,
        })?;

        let start_addr = reader.read_u32::<LittleEndian>()?;
        let size = reader.read_u32::<LittleEndian>()?;
        let mut data = vec![0u8; size as usize];
        reader.read_exact(&mut data).map_err(|err| {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                ObjectFileError::TruncatedSection {
                    name: name.clone(),
                    declared: size,
                }
            } else {
                ObjectFileError::Io(err)
            }
        })?;

        sections.push(Section {
            name,
            start_addr,
            data,
        });
    }

    Ok(ObjectFile { sections })
}

pub fn write<W: Write>(writer: &mut W, object: &ObjectFile) -> Result<()> {
    writer.write_u32::<LittleEndian>(object.sections.len() as u32)?;
    for section in &object.sections {
        let name_bytes = section.name.as_bytes();
        writer.write_u32::<LittleEndian>(name_bytes.len() as u32)?;
        writer.write_all(name_bytes)?;
        writer.write_u32::<LittleEndian>(section.start_addr)?;
        writer.write_u32::<LittleEndian>(section.size())?;
        writer.write_all(&section.data)?;
    }
    Ok(())
}

pub trait ReadObjectExt: Read + Sized {
    fn read_object(&mut self) -> Result<ObjectFile> {
        read(self)
    }
}

impl<R: Read + Sized> ReadObjectExt for R {}

pub trait WriteObjectExt: Write + Sized {
    fn write_object(&mut self, object: &ObjectFile) -> Result<()> {
        write(self, object)
    }
}

impl<W: Write + Sized> WriteObjectExt for W {}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<ObjectFile> {
    BufReader::new(File::open(path)?).read_object()
}

pub fn write_file<P: AsRef<Path>>(path: P, object: &ObjectFile) -> Result<()> {
    BufWriter::new(File::create(path)?).write_object(object)
}
