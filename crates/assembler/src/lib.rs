//! Two-pass assembler for the basic single-accumulator computer.

use clap as _;
use tracing_subscriber as _;

/// Top-level two-pass assembler pipeline.
pub mod assembler;
/// Instruction classification and encoding (pass 2).
pub mod encoder;
/// Fixed-width binary rendering of addresses and words.
pub mod numeric;
/// Opcode tables for the three instruction categories.
pub mod opcodes;
/// Statement parsing for labels and directives.
pub mod parser;
/// Assembled program model and text output.
pub mod program;
/// Source loading, tokenization, and comment stripping.
pub mod source;
/// Symbol table and pass-1 address assignment.
pub mod symbols;

pub use assembler::{assemble, assemble_file, assemble_lines, AssembleError, Assembly};
pub use opcodes::{Category, OpcodeTable, OpcodeTables};
pub use program::AssembledProgram;
pub use source::SourceLine;
