//! Symbol table and pass-1 address assignment.
//!
//! This module implements the first pass of assembly: walking source lines
//! with a location counter, recording each label at the address of the line
//! that defines it. Pass 2 replays the same counter rules, which is what lets
//! an instruction refer to a label defined further down.

use indexmap::IndexMap;
use thiserror::Error;

use crate::numeric::{Bits, NumericError};
use crate::parser::{parse_statement, ParseError, ParseErrorKind, StatementKind};
use crate::source::SourceLine;

/// A label with its assigned address and definition line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    /// The address assigned to this label.
    pub address: Bits,
    /// Source line number where the label was defined.
    pub defined_at: usize,
}

/// Label names mapped to their definitions, in definition order.
pub type SymbolTable = IndexMap<String, Symbol>;

/// Running address of the next word-occupying line.
///
/// Starts at zero, advances by one per occupying line, and is repositioned by
/// `org`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationCounter(u32);

impl LocationCounter {
    /// Creates a counter at address zero.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Moves the counter to `target`.
    pub fn set(&mut self, target: u32) {
        self.0 = target;
    }

    /// Advances past one word.
    pub fn advance(&mut self) {
        self.0 = self.0.saturating_add(1);
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Returns the current address.
    ///
    /// # Errors
    ///
    /// Returns `NumericError::WidthOverflow` once the counter has run past
    /// the end of memory.
    pub fn address(self) -> Result<Bits, NumericError> {
        Bits::address(self.0)
    }
}

/// Error during symbol table construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct SymbolError {
    /// Kind of error.
    pub kind: SymbolErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
}

/// Classification of symbol errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolErrorKind {
    /// Line could not be parsed.
    #[error(transparent)]
    Parse(ParseErrorKind),
    /// Duplicate label definition.
    #[error("duplicate label '{name}' (first defined at line {first_definition})")]
    DuplicateLabel {
        /// The label name.
        name: String,
        /// Line of the first definition.
        first_definition: usize,
    },
    /// Label defined past the end of the address space.
    #[error("label '{name}' lies outside the address space: {source}")]
    AddressOverflow {
        /// The label name.
        name: String,
        /// The width error.
        source: NumericError,
    },
}

impl From<ParseError> for SymbolError {
    fn from(e: ParseError) -> Self {
        Self {
            kind: SymbolErrorKind::Parse(e.kind),
            line: e.line,
        }
    }
}

/// Performs pass 1 over the source lines.
///
/// Labels are recorded at the current counter value. `org` moves the counter
/// without occupying a word, and `end` stops the pass; nothing after it is
/// examined.
///
/// # Errors
///
/// Returns a `SymbolError` if:
/// - A line fails to parse (`Parse`)
/// - A label is defined twice (`DuplicateLabel`)
/// - A label lands outside the address space (`AddressOverflow`)
pub fn resolve_symbols(lines: &[SourceLine]) -> Result<SymbolTable, SymbolError> {
    let mut symbols = SymbolTable::new();
    let mut counter = LocationCounter::new();

    for line in lines {
        let statement = parse_statement(line)?;

        match statement.kind {
            StatementKind::Blank => continue,
            StatementKind::Org(target) => {
                counter.set(target);
                continue;
            }
            StatementKind::End => break,
            StatementKind::LabelOnly | StatementKind::Instruction { .. } => {}
        }

        if let Some(name) = statement.label {
            define(&mut symbols, name, counter, line.number)?;
        }
        counter.advance();
    }

    tracing::debug!("LOCATION     | LABEL");
    for (name, symbol) in &symbols {
        tracing::debug!("{} | {name}", symbol.address);
    }

    Ok(symbols)
}

fn define(
    symbols: &mut SymbolTable,
    name: &str,
    counter: LocationCounter,
    line: usize,
) -> Result<(), SymbolError> {
    if let Some(existing) = symbols.get(name) {
        return Err(SymbolError {
            kind: SymbolErrorKind::DuplicateLabel {
                name: name.to_string(),
                first_definition: existing.defined_at,
            },
            line,
        });
    }

    let address = counter.address().map_err(|source| SymbolError {
        kind: SymbolErrorKind::AddressOverflow {
            name: name.to_string(),
            source,
        },
        line,
    })?;

    symbols.insert(
        name.to_string(),
        Symbol {
            address,
            defined_at: line,
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::extract_source;
    use proptest::prelude::*;

    fn resolve(source: &str) -> Result<SymbolTable, SymbolError> {
        resolve_symbols(&extract_source(source))
    }

    fn address_of(symbols: &SymbolTable, name: &str) -> String {
        symbols[name].address.to_string()
    }

    #[test]
    fn empty_source() {
        let symbols = resolve("").unwrap();
        assert!(symbols.is_empty());
    }

    #[test]
    fn label_at_counter() {
        let symbols = resolve("org 0\ncla\nlda x\nhlt\nx, dec 5\nend\n").unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(address_of(&symbols, "x"), "000000000011");
        assert_eq!(symbols["x"].defined_at, 5);
    }

    #[test]
    fn org_repositions_counter() {
        let symbols = resolve("org 100\na, cla\nb, hlt\norg 200\nc, dec 1\n").unwrap();
        assert_eq!(symbols["a"].address.value(), 0x100);
        assert_eq!(symbols["b"].address.value(), 0x101);
        assert_eq!(symbols["c"].address.value(), 0x200);
    }

    #[test]
    fn org_line_does_not_advance() {
        let symbols = resolve("cla\norg 1\nx, hlt\n").unwrap();
        assert_eq!(symbols["x"].address.value(), 1);
    }

    #[test]
    fn end_stops_the_pass() {
        let symbols = resolve("a, cla\nend\nb, hlt\n").unwrap();
        assert!(symbols.contains_key("a"));
        assert!(!symbols.contains_key("b"));
    }

    #[test]
    fn end_hides_malformed_lines() {
        let symbols = resolve("a, cla\nend\norg\n, nonsense\n").unwrap();
        assert_eq!(symbols.len(), 1);
    }

    #[test]
    fn label_only_line_occupies_word() {
        let symbols = resolve("a,\nb, cla\n").unwrap();
        assert_eq!(symbols["a"].address.value(), 0);
        assert_eq!(symbols["b"].address.value(), 1);
    }

    #[test]
    fn comment_lines_do_not_advance() {
        let symbols = resolve("cla\n/ note\n\nx, hlt\n").unwrap();
        assert_eq!(symbols["x"].address.value(), 1);
        assert_eq!(symbols["x"].defined_at, 4);
    }

    #[test]
    fn keeps_definition_order() {
        let symbols = resolve("org 10\nz, cla\na, cla\nm, cla\n").unwrap();
        let names: Vec<&str> = symbols.keys().map(String::as_str).collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn duplicate_label_error() {
        let err = resolve("start, cla\nhlt\nstart, hlt\n").unwrap_err();
        assert_eq!(
            err,
            SymbolError {
                kind: SymbolErrorKind::DuplicateLabel {
                    name: "start".into(),
                    first_definition: 1,
                },
                line: 3,
            }
        );
    }

    #[test]
    fn label_past_end_of_memory() {
        let err = resolve("org fff\ncla\nx, hlt\n").unwrap_err();
        assert!(matches!(
            err.kind,
            SymbolErrorKind::AddressOverflow { ref name, .. } if name == "x"
        ));
        assert_eq!(err.line, 3);
    }

    #[test]
    fn parse_error_propagates() {
        let err = resolve("cla\norg\n").unwrap_err();
        assert_eq!(err.kind, SymbolErrorKind::Parse(ParseErrorKind::MissingOrigin));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn location_counter_steps() {
        let mut counter = LocationCounter::new();
        counter.advance();
        counter.advance();
        assert_eq!(counter.value(), 2);
        counter.set(0xFFF);
        assert_eq!(counter.address().unwrap().value(), 0xFFF);
        counter.advance();
        assert!(counter.address().is_err());
    }

    proptest! {
        #[test]
        fn addresses_increase_by_one_per_line(origin in 0u32..0x800, count in 1usize..64) {
            let mut source = format!("org {origin:x}\n");
            for i in 0..count {
                source.push_str(&format!("l{i}, cla\n"));
            }
            let symbols = resolve(&source).unwrap();
            for (i, symbol) in symbols.values().enumerate() {
                prop_assert_eq!(symbol.address.value(), origin + u32::try_from(i).unwrap());
            }
        }
    }
}
