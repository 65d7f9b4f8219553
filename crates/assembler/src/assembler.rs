//! Top-level assembler pipeline.
//!
//! This module wires the phases together:
//!
//! 1. **Source**: tokenization and comment removal (`source::read_source`)
//! 2. **Pass 1**: symbol table construction (`symbols::resolve_symbols`)
//! 3. **Pass 2**: classification and encoding (`encoder::encode_program`)
//!
//! The main entry point is [`assemble`], which takes loaded lines and the
//! three opcode tables and returns the finished program. Assembly succeeds or
//! fails as a whole; no partial program is ever returned.

use std::path::Path;

use thiserror::Error;

use crate::encoder::{encode_program, EncodeError, InstructionSet};
use crate::opcodes::{OpcodeTable, OpcodeTables, TableError};
use crate::program::AssembledProgram;
use crate::source::{read_source, SourceError, SourceLine};
use crate::symbols::{resolve_symbols, SymbolError, SymbolTable};

/// Assembly error from any phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    /// Reading the source file failed.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// Loading an opcode table failed.
    #[error(transparent)]
    Table(#[from] TableError),
    /// Pass 1 failed.
    #[error("line {}: {}", .0.line, .0.kind)]
    Symbol(#[from] SymbolError),
    /// Pass 2 failed.
    #[error("line {}: {}", .0.line, .0.kind)]
    Encode(#[from] EncodeError),
}

impl AssembleError {
    /// Source line of the failure, if it is tied to one.
    #[must_use]
    pub const fn line(&self) -> Option<usize> {
        match self {
            Self::Symbol(e) => Some(e.line),
            Self::Encode(e) => Some(e.line),
            Self::Source(_) | Self::Table(_) => None,
        }
    }
}

/// Result of a full assembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Labels resolved by pass 1.
    pub symbols: SymbolTable,
    /// Words emitted by pass 2.
    pub program: AssembledProgram,
}

/// Assembles loaded lines against the three opcode tables.
///
/// # Errors
///
/// Returns `AssembleError` if pass 1 or pass 2 fails.
pub fn assemble(
    lines: &[SourceLine],
    mri: &OpcodeTable,
    rri: &OpcodeTable,
    ioi: &OpcodeTable,
) -> Result<AssembledProgram, AssembleError> {
    run(lines, InstructionSet::new(mri, rri, ioi)).map(|assembly| assembly.program)
}

/// Assembles loaded lines and keeps the symbol table alongside the program.
///
/// # Errors
///
/// Returns `AssembleError` if pass 1 or pass 2 fails.
pub fn assemble_lines(
    lines: &[SourceLine],
    tables: &OpcodeTables,
) -> Result<Assembly, AssembleError> {
    run(lines, InstructionSet::from(tables))
}

/// Reads a `.asm`/`.S` file and assembles it.
///
/// # Errors
///
/// Returns `AssembleError` if the file cannot be read or either pass fails.
pub fn assemble_file(path: &Path, tables: &OpcodeTables) -> Result<Assembly, AssembleError> {
    let lines = read_source(path)?;
    assemble_lines(&lines, tables)
}

fn run(lines: &[SourceLine], instructions: InstructionSet<'_>) -> Result<Assembly, AssembleError> {
    tracing::trace!("starting pass 1 over {} lines", lines.len());
    let symbols = resolve_symbols(lines)?;

    tracing::trace!("starting pass 2 with {} symbols", symbols.len());
    let program = encode_program(lines, &symbols, instructions)?;

    Ok(Assembly { symbols, program })
}
