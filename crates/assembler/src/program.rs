//! Assembled output: address-to-word mapping and its text form.

use std::collections::BTreeMap;
use std::fmt;

use crate::numeric::Bits;

/// One emitted word and the line that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramEntry {
    /// The instruction or data word.
    pub word: Bits,
    /// Source line number.
    pub line: usize,
}

/// Mapping from address to instruction word, iterated in ascending address
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledProgram {
    entries: BTreeMap<Bits, ProgramEntry>,
}

impl AssembledProgram {
    /// Creates an empty program.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Places `word` at `address`.
    ///
    /// # Errors
    ///
    /// Returns the entry already at `address` if it is occupied; the program
    /// is left unchanged.
    pub fn place(&mut self, address: Bits, word: Bits, line: usize) -> Result<(), ProgramEntry> {
        if let Some(existing) = self.entries.get(&address) {
            return Err(*existing);
        }
        self.entries.insert(address, ProgramEntry { word, line });
        Ok(())
    }

    /// Returns the word at `address`.
    #[must_use]
    pub fn get(&self, address: Bits) -> Option<Bits> {
        self.entries.get(&address).map(|e| e.word)
    }

    /// Number of emitted words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(address, word)` pairs in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = (Bits, Bits)> + '_ {
        self.entries.iter().map(|(address, e)| (*address, e.word))
    }

    /// Iterates entries with their source lines in ascending address order.
    pub fn entries(&self) -> impl Iterator<Item = (Bits, &ProgramEntry)> + '_ {
        self.entries.iter().map(|(address, e)| (*address, e))
    }

    /// Renders the text output format: `<address>\t<word>` per line.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Compares the rendered program against expected text line by line.
    ///
    /// Returns an empty list when they match.
    #[must_use]
    pub fn compare(&self, expected: &str) -> Vec<Mismatch> {
        let rendered = self.render();
        let mut actual_lines = rendered.lines();
        let mut expected_lines = expected.lines();
        let mut mismatches = Vec::new();
        let mut line = 0;

        loop {
            line += 1;
            let (expected, actual) = match (expected_lines.next(), actual_lines.next()) {
                (None, None) => break,
                (e, a) => (e.map(str::trim_end), a),
            };
            if expected != actual {
                mismatches.push(Mismatch {
                    line,
                    expected: expected.map(String::from),
                    actual: actual.map(String::from),
                });
            }
        }

        mismatches
    }
}

impl fmt::Display for AssembledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (address, word) in self.iter() {
            writeln!(f, "{address}\t{word}")?;
        }
        Ok(())
    }
}

/// A line where the rendered program differs from the expected text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// 1-indexed line in the rendered output.
    pub line: usize,
    /// Expected text, if the expected file has this line.
    pub expected: Option<String>,
    /// Rendered text, if the program has this line.
    pub actual: Option<String>,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: expected {}, got {}",
            self.line,
            self.expected.as_deref().unwrap_or("<nothing>"),
            self.actual.as_deref().unwrap_or("<nothing>")
        )
    }
}
