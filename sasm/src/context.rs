//! Per-build state for the two-pass assembler: the section list, the
//! label table, and the pending fixup list. An instance is created
//! fresh for each call to [`crate::assemble`]; nothing here is kept
//! alive beyond that call, per the "no process-wide singletons"
//! design note.

use crate::linker_script::SectionAddresses;
use crate::AssembleError;
use sarch32::isa::parse_operand;
use sarch32::{Instruction, Operand};
use std::collections::HashMap;

const DEFAULT_SECTION: &str = "data";

/// One assembled unit occupying a fixed number of bytes in its
/// section: either a machine instruction (always 4 bytes on emission)
/// or a data directive's raw payload.
#[derive(Debug, Clone)]
pub enum Item {
    Instruction(Instruction),
    Data(Vec<u8>),
}

impl Item {
    pub fn len(&self) -> u32 {
        match self {
            Item::Instruction(_) => 4,
            Item::Data(bytes) => bytes.len() as u32,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub items: Vec<Item>,
    offset: u32,
}

impl Section {
    fn new(name: &str) -> Section {
        Section {
            name: name.to_string(),
            items: Vec::new(),
            offset: 0,
        }
    }
}

/// A recorded location still carrying a symbolic reference: which
/// section and item it lives in, and how it should be patched once
/// the symbol resolves to an absolute address.
#[derive(Debug, Clone)]
pub struct Fixup {
    pub symbol: String,
    pub section: String,
    pub item_index: usize,
    /// `None` for a machine instruction (patched through
    /// `Instruction::resolve_symbol`); `Some(width)` for a data
    /// directive, where `width` is the number of low bytes of the
    /// little-endian address to store (1 for `db`, 4 for `dw`).
    pub width: Option<u8>,
}

pub struct BuildContext {
    pub sections: Vec<Section>,
    pub labels: HashMap<String, (String, u32)>,
    pub fixups: Vec<Fixup>,
    current_section: String,
}

impl BuildContext {
    pub fn new() -> BuildContext {
        BuildContext {
            sections: Vec::new(),
            labels: HashMap::new(),
            fixups: Vec::new(),
            current_section: DEFAULT_SECTION.to_string(),
        }
    }

    fn section_index(&mut self, name: &str) -> usize {
        if let Some(i) = self.sections.iter().position(|s| s.name == name) {
            return i;
        }
        self.sections.push(Section::new(name));
        self.sections.len() - 1
    }

    pub fn switch_section(&mut self, name: &str) {
        self.current_section = name.to_string();
    }

    fn bind_label(&mut self, symbol: &str) {
        let idx = self.section_index(&self.current_section.clone());
        let offset = self.sections[idx].offset;
        if self.labels.contains_key(symbol) {
            log::warn!("label `${}` redefined", symbol);
        }
        self.labels
            .insert(symbol.to_string(), (self.current_section.clone(), offset));
    }

    fn push_item(&mut self, item: Item, symbol: Option<(String, Option<u8>)>) {
        let idx = self.section_index(&self.current_section.clone());
        let item_index = self.sections[idx].items.len();
        if let Some((symbol, width)) = symbol {
            self.fixups.push(Fixup {
                symbol,
                section: self.current_section.clone(),
                item_index,
                width,
            });
        }
        self.sections[idx].offset += item.len();
        self.sections[idx].items.push(item);
    }

    /// Processes one source line. Syntactically invalid lines are
    /// logged and skipped; they contribute no bytes to their section,
    /// per the assembler's resiliency policy.
    pub fn process_line(&mut self, file: &str, line_no: usize, raw: &str) {
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            return;
        }

        if let Some(name) = line.strip_prefix(".section") {
            let name = name.trim();
            if name.is_empty() {
                log::warn!("{}:{}: `.section` with no name", file, line_no);
                return;
            }
            self.switch_section(name);
            return;
        }

        if let Some(label) = parse_label(line) {
            self.bind_label(label);
            return;
        }

        if let Some(expr) = line.strip_prefix("db") {
            if let Some(expr) = expr.strip_prefix(char::is_whitespace) {
                self.process_db(file, line_no, expr.trim());
                return;
            }
        }

        if let Some(expr) = line.strip_prefix("dw") {
            if let Some(expr) = expr.strip_prefix(char::is_whitespace) {
                self.process_dw(file, line_no, expr.trim());
                return;
            }
        }

        if let Some(text) = line.strip_prefix("asciz") {
            if let Some(text) = text.strip_prefix(char::is_whitespace) {
                self.process_asciz(file, line_no, text.trim());
                return;
            }
        }

        match Instruction::parse(line) {
            Ok(instr) => {
                let symbol = instr
                    .requested_symbol()
                    .map(|s| (s.to_string(), None));
                self.push_item(Item::Instruction(instr), symbol);
            }
            Err(err) => log::warn!("{}:{}: {}", file, line_no, err),
        }
    }

    fn process_db(&mut self, file: &str, line_no: usize, expr: &str) {
        match parse_operand(expr) {
            Ok(Operand::Immediate(v)) => {
                if !(-128..=127).contains(&v) {
                    log::warn!("{}:{}: `db` value {} out of range [-128,127]", file, line_no, v);
                    return;
                }
                self.push_item(Item::Data(vec![v as i8 as u8]), None);
            }
            Ok(Operand::Symbol(s)) => self.push_item(Item::Data(vec![0]), Some((s, Some(1)))),
            Ok(Operand::Register(_)) => {
                log::warn!("{}:{}: `db` operand must be an immediate or symbol", file, line_no)
            }
            Err(err) => log::warn!("{}:{}: {}", file, line_no, err),
        }
    }

    fn process_dw(&mut self, file: &str, line_no: usize, expr: &str) {
        match parse_operand(expr) {
            Ok(Operand::Immediate(v)) => {
                self.push_item(Item::Data(v.to_le_bytes().to_vec()), None)
            }
            Ok(Operand::Symbol(s)) => {
                self.push_item(Item::Data(vec![0, 0, 0, 0]), Some((s, Some(4))))
            }
            Ok(Operand::Register(_)) => {
                log::warn!("{}:{}: `dw` operand must be an immediate or symbol", file, line_no)
            }
            Err(err) => log::warn!("{}:{}: {}", file, line_no, err),
        }
    }

    fn process_asciz(&mut self, file: &str, line_no: usize, text: &str) {
        match parse_quoted_string(text) {
            Some(contents) => {
                let mut bytes = contents.as_bytes().to_vec();
                bytes.push(0);
                self.push_item(Item::Data(bytes), None);
            }
            None => log::warn!(
                "{}:{}: `asciz` expects a single-quoted string with no internal quote",
                file,
                line_no
            ),
        }
    }

    /// Consumes the context, checking that every referenced section has
    /// a linker-script entry, resolving every fixup, and emitting the
    /// linked object file.
    pub fn resolve_and_emit(
        mut self,
        addresses: &SectionAddresses,
    ) -> Result<sobjfile::ObjectFile, AssembleError> {
        for section in &self.sections {
            if !addresses.contains_key(&section.name) {
                return Err(AssembleError::MissingSection {
                    section: section.name.clone(),
                });
            }
        }

        for fixup in self.fixups.clone() {
            let (label_section, label_offset) = self
                .labels
                .get(&fixup.symbol)
                .cloned()
                .ok_or_else(|| AssembleError::UndefinedSymbol {
                    symbol: fixup.symbol.clone(),
                })?;
            let base = addresses
                .get(&label_section)
                .copied()
                .ok_or_else(|| AssembleError::MissingSection {
                    section: label_section.clone(),
                })?;
            let address = base.wrapping_add(label_offset);

            let section_idx = self
                .sections
                .iter()
                .position(|s| s.name == fixup.section)
                .expect("fixup section always exists");
            let use_base = addresses[&fixup.section];
            let use_offset: u32 = self.sections[section_idx].items[..fixup.item_index]
                .iter()
                .map(Item::len)
                .sum();
            let use_addr = use_base.wrapping_add(use_offset);

            let item = &mut self.sections[section_idx].items[fixup.item_index];
            match (item, fixup.width) {
                (Item::Instruction(instr), None) => {
                    // A relative branch's operand is an offset from the
                    // instruction after the branch, not an absolute
                    // address; everything else stores the address as-is.
                    let value = match &instr.kind {
                        sarch32::InstructionKind::Branch { relative: true, .. } => {
                            address.wrapping_sub(use_addr.wrapping_add(4))
                        }
                        _ => address,
                    };
                    instr.resolve_symbol(value);
                }
                (Item::Data(bytes), Some(width)) => {
                    let le = address.to_le_bytes();
                    bytes[..width as usize].copy_from_slice(&le[..width as usize]);
                }
                _ => unreachable!("fixup kind always matches its item"),
            }
        }

        let mut out_sections = Vec::with_capacity(self.sections.len());
        for section in &self.sections {
            let base = addresses[&section.name];
            let mut data = Vec::new();
            for item in &section.items {
                match item {
                    Item::Instruction(instr) => {
                        data.extend_from_slice(&instr.encode()?.to_le_bytes())
                    }
                    Item::Data(bytes) => data.extend_from_slice(bytes),
                }
            }
            out_sections.push(sobjfile::Section::new(section.name.clone(), base, data));
        }

        Ok(sobjfile::ObjectFile::new(out_sections))
    }
}

impl Default for BuildContext {
    fn default() -> BuildContext {
        BuildContext::new()
    }
}

/// Strips a trailing `; comment`, respecting single-quoted `asciz`
/// text so a `;` inside a string literal doesn't truncate the line.
fn strip_comment(line: &str) -> &str {
    let mut in_string = false;
    for (i, c) in line.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            ';' if !in_string => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Matches a whole line of the form `$identifier:`.
fn parse_label(line: &str) -> Option<&str> {
    let body = line.strip_prefix('$')?;
    let name = body.strip_suffix(':')?;
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some(name)
}

/// Parses a `'single quoted, no internal quote'` string literal.
fn parse_quoted_string(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('\'')?.strip_suffix('\'')?;
    if inner.contains('\'') {
        return None;
    }
    Some(inner)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_trailing_comment_but_not_inside_string() {
        assert_eq!(strip_comment("dw #1 ; a comment"), "dw #1 ");
        assert_eq!(strip_comment("asciz 'a;b'"), "asciz 'a;b'");
    }

    #[test]
    fn label_must_span_the_whole_line() {
        assert_eq!(parse_label("$loop:"), Some("loop"));
        assert_eq!(parse_label("$loop: add r0, r1"), None);
        assert_eq!(parse_label("$:"), None);
    }

    #[test]
    fn quoted_string_rejects_internal_quotes() {
        assert_eq!(parse_quoted_string("'hello'"), Some("hello"));
        assert_eq!(parse_quoted_string("'it''s'"), None);
    }
}
