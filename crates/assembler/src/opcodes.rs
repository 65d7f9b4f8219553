//! Opcode tables for the three instruction categories.
//!
//! Each table maps a lowercase mnemonic to its opcode bit-string. Tables are
//! loaded from a two-column text format (`mnemonic code` per line). Codes are
//! kept as written; a code of the wrong shape surfaces as an encoding error
//! when an instruction using it is rendered.

use std::fmt;
use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use thiserror::Error;

use crate::numeric::{OPCODE_BITS, WORD_BITS};

/// Instruction category a table describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Memory-reference instructions: a short opcode plus an address operand.
    MemoryReference,
    /// Register-reference instructions: a full word, no operand.
    RegisterReference,
    /// Input/output instructions: a full word, no operand.
    InputOutput,
}

impl Category {
    /// Width in bits of a code in this category.
    #[must_use]
    pub const fn code_bits(self) -> u8 {
        match self {
            Self::MemoryReference => OPCODE_BITS,
            Self::RegisterReference | Self::InputOutput => WORD_BITS,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MemoryReference => write!(f, "memory-reference"),
            Self::RegisterReference => write!(f, "register-reference"),
            Self::InputOutput => write!(f, "input/output"),
        }
    }
}

/// Error loading an opcode table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// The table file could not be read.
    #[error("cannot read {category} table `{path}`: {message}")]
    Io {
        /// Table category.
        category: Category,
        /// Path that failed.
        path: String,
        /// Underlying I/O error message.
        message: String,
    },
    /// A line did not split into exactly two columns.
    #[error("{category} table line {line}: expected `mnemonic code`, found {columns} column(s)")]
    MalformedEntry {
        /// Table category.
        category: Category,
        /// 1-indexed line number.
        line: usize,
        /// Number of columns found.
        columns: usize,
    },
    /// A mnemonic was defined twice in the same table.
    #[error(
        "{category} table line {line}: duplicate mnemonic `{mnemonic}` (first defined at line {first_definition})"
    )]
    DuplicateMnemonic {
        /// Table category.
        category: Category,
        /// 1-indexed line of the second definition.
        line: usize,
        /// The repeated mnemonic.
        mnemonic: String,
        /// Line of the first definition.
        first_definition: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OpcodeEntry {
    code: String,
    defined_at: usize,
}

/// Immutable mnemonic-to-code mapping for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeTable {
    category: Category,
    entries: IndexMap<String, OpcodeEntry>,
}

impl OpcodeTable {
    /// Builds a table from `(mnemonic, code)` pairs.
    ///
    /// Pair positions stand in for line numbers in errors.
    ///
    /// # Errors
    ///
    /// Returns `TableError::DuplicateMnemonic` if a mnemonic repeats.
    pub fn from_pairs<I, M, C>(category: Category, pairs: I) -> Result<Self, TableError>
    where
        I: IntoIterator<Item = (M, C)>,
        M: Into<String>,
        C: Into<String>,
    {
        let mut table = Self {
            category,
            entries: IndexMap::new(),
        };
        for (idx, (mnemonic, code)) in pairs.into_iter().enumerate() {
            table.define(mnemonic.into(), code.into(), idx + 1)?;
        }
        Ok(table)
    }

    /// Parses the two-column text format.
    ///
    /// Text is lowercased and blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns `TableError::MalformedEntry` for a line without exactly two
    /// columns and `TableError::DuplicateMnemonic` for a repeated mnemonic.
    pub fn parse(text: &str, category: Category) -> Result<Self, TableError> {
        let mut table = Self {
            category,
            entries: IndexMap::new(),
        };

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let lowered = raw.to_lowercase();
            let columns: Vec<&str> = lowered.split_whitespace().collect();
            match columns.as_slice() {
                [] => {}
                [mnemonic, code] => {
                    table.define((*mnemonic).to_string(), (*code).to_string(), line)?;
                }
                other => {
                    return Err(TableError::MalformedEntry {
                        category,
                        line,
                        columns: other.len(),
                    })
                }
            }
        }

        tracing::trace!("loaded {} {category} opcodes", table.len());
        Ok(table)
    }

    /// Reads and parses a table file.
    ///
    /// # Errors
    ///
    /// Returns `TableError::Io` if the file cannot be read, or any error from
    /// [`OpcodeTable::parse`].
    pub fn load(path: &Path, category: Category) -> Result<Self, TableError> {
        let text = fs::read_to_string(path).map_err(|e| TableError::Io {
            category,
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text, category)
    }

    fn define(&mut self, mnemonic: String, code: String, line: usize) -> Result<(), TableError> {
        if let Some(existing) = self.entries.get(&mnemonic) {
            return Err(TableError::DuplicateMnemonic {
                category: self.category,
                line,
                mnemonic,
                first_definition: existing.defined_at,
            });
        }
        self.entries.insert(
            mnemonic,
            OpcodeEntry {
                code,
                defined_at: line,
            },
        );
        Ok(())
    }

    /// Looks up the code for a mnemonic.
    #[must_use]
    pub fn lookup(&self, mnemonic: &str) -> Option<&str> {
        self.entries.get(mnemonic).map(|e| e.code.as_str())
    }

    /// Returns the table's category.
    #[must_use]
    pub const fn category(&self) -> Category {
        self.category
    }

    /// Number of mnemonics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table defines no mnemonics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(mnemonic, code)` pairs in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(m, e)| (m.as_str(), e.code.as_str()))
    }
}

/// The three loaded tables an assembly run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpcodeTables {
    /// Memory-reference table.
    pub memory_reference: OpcodeTable,
    /// Register-reference table.
    pub register_reference: OpcodeTable,
    /// Input/output table.
    pub input_output: OpcodeTable,
}

impl OpcodeTables {
    /// Loads all three tables from files.
    ///
    /// # Errors
    ///
    /// Returns the first `TableError` encountered.
    pub fn load(mri: &Path, rri: &Path, ioi: &Path) -> Result<Self, TableError> {
        Ok(Self {
            memory_reference: OpcodeTable::load(mri, Category::MemoryReference)?,
            register_reference: OpcodeTable::load(rri, Category::RegisterReference)?,
            input_output: OpcodeTable::load(ioi, Category::InputOutput)?,
        })
    }
}
