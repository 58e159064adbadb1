//! A tiny hand-rolled tokenizer for the linker-script grammar: lines of
//! the form `section NAME(ADDR)`. No regex dependency is pulled in for
//! a three-token grammar; this mirrors the original assembler's own
//! line-by-line matching approach.

use std::collections::HashMap;

/// Maps section name to its relocation base address.
pub type SectionAddresses = HashMap<String, u32>;

/// Parses a linker-script file, silently skipping any line that is not
/// a `section NAME(ADDR)` definition (blank lines, comments, anything
/// malformed).
pub fn parse(text: &str) -> SectionAddresses {
    let mut addresses = SectionAddresses::new();
    for line in text.lines() {
        if let Some((name, addr)) = parse_line(line) {
            addresses.insert(name, addr);
        }
    }
    addresses
}

fn parse_line(line: &str) -> Option<(String, u32)> {
    let line = line.trim();
    let rest = line.strip_prefix("section")?;
    let rest = rest.strip_prefix(char::is_whitespace)?.trim_start();

    let open = rest.find('(')?;
    let name = rest[..open].trim();
    if name.is_empty() {
        return None;
    }

    let after_open = &rest[open + 1..];
    let close = after_open.find(')')?;
    let addr_str = after_open[..close].trim();
    let addr = parse_addr(addr_str)?;

    Some((name.to_string(), addr))
}

fn parse_addr(s: &str) -> Option<u32> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else {
        s.parse::<u32>().ok()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_decimal_and_hex_addresses() {
        let script = "section text(0x1000)\nsection data(8192)\n";
        let addresses = parse(script);
        assert_eq!(addresses.get("text"), Some(&0x1000));
        assert_eq!(addresses.get("data"), Some(&8192));
    }

    #[test]
    fn skips_unrecognized_lines() {
        let script = "; a comment\n\nsection text(0x1000)\nnot a section line\n";
        let addresses = parse(script);
        assert_eq!(addresses.len(), 1);
        assert!(addresses.contains_key("text"));
    }

    #[test]
    fn tolerates_extra_whitespace() {
        let script = "  section   text  ( 0x2000 )  \n";
        let addresses = parse(script);
        assert_eq!(addresses.get("text"), Some(&0x2000));
    }
}
