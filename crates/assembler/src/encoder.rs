//! Instruction classification and encoding (Pass 2).
//!
//! Each instruction body is classified once against the opcode tables and the
//! literal pseudo-operations, in a fixed priority: memory-reference,
//! register-reference, input/output, `hex`, `dec`. The first match wins.
//! Classification is total; a body matching nothing is an error rather than
//! an empty word.

use thiserror::Error;

use crate::numeric::{self, Bits, NumericError, Radix, WORD_BITS};
use crate::opcodes::{Category, OpcodeTable, OpcodeTables};
use crate::parser::{parse_statement, ParseError, ParseErrorKind, StatementKind};
use crate::program::AssembledProgram;
use crate::source::SourceLine;
use crate::symbols::{LocationCounter, SymbolTable};

/// Addressing-mode bit for memory-reference words. Only direct addressing
/// is supported.
const DIRECT: char = '0';

/// Borrowed view of the three opcode tables.
#[derive(Debug, Clone, Copy)]
pub struct InstructionSet<'a> {
    /// Memory-reference table.
    pub memory_reference: &'a OpcodeTable,
    /// Register-reference table.
    pub register_reference: &'a OpcodeTable,
    /// Input/output table.
    pub input_output: &'a OpcodeTable,
}

impl<'a> InstructionSet<'a> {
    /// Groups three tables.
    #[must_use]
    pub const fn new(
        memory_reference: &'a OpcodeTable,
        register_reference: &'a OpcodeTable,
        input_output: &'a OpcodeTable,
    ) -> Self {
        Self {
            memory_reference,
            register_reference,
            input_output,
        }
    }

    /// Classifies an instruction body.
    #[must_use]
    pub fn classify<'s>(&self, mnemonic: &'s str, operands: &'s [String]) -> Classified<'s>
    where
        'a: 's,
    {
        let operand = operands.first().map(String::as_str);

        if let Some(opcode) = self.memory_reference.lookup(mnemonic) {
            Classified::MemoryReference {
                mnemonic,
                opcode,
                operand,
            }
        } else if let Some(code) = self.register_reference.lookup(mnemonic) {
            Classified::Direct {
                category: Category::RegisterReference,
                mnemonic,
                code,
            }
        } else if let Some(code) = self.input_output.lookup(mnemonic) {
            Classified::Direct {
                category: Category::InputOutput,
                mnemonic,
                code,
            }
        } else if let Ok(radix) = mnemonic.parse::<Radix>() {
            Classified::Literal { radix, operand }
        } else {
            Classified::Unclassified { mnemonic }
        }
    }
}

impl<'a> From<&'a OpcodeTables> for InstructionSet<'a> {
    fn from(tables: &'a OpcodeTables) -> Self {
        Self::new(
            &tables.memory_reference,
            &tables.register_reference,
            &tables.input_output,
        )
    }
}

/// Result of classifying one instruction body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classified<'a> {
    /// Opcode plus an address operand.
    MemoryReference {
        /// The mnemonic.
        mnemonic: &'a str,
        /// Opcode field from the table.
        opcode: &'a str,
        /// Label operand, if present.
        operand: Option<&'a str>,
    },
    /// Register-reference or input/output: the table code is the word.
    Direct {
        /// Which table matched.
        category: Category,
        /// The mnemonic.
        mnemonic: &'a str,
        /// Full instruction word from the table.
        code: &'a str,
    },
    /// `hex`/`dec` literal data.
    Literal {
        /// Base of the operand.
        radix: Radix,
        /// The literal text, if present.
        operand: Option<&'a str>,
    },
    /// Nothing matched.
    Unclassified {
        /// The unknown mnemonic.
        mnemonic: &'a str,
    },
}

/// Error during encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct EncodeError {
    /// Kind of error.
    pub kind: EncodeErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
}

/// Classification of encoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeErrorKind {
    /// Line could not be parsed.
    #[error(transparent)]
    Parse(ParseErrorKind),
    /// Memory-reference operand names no label.
    #[error("undefined symbol: {0}")]
    UndefinedSymbol(String),
    /// Mnemonic is in no table and is not a pseudo-operation.
    #[error("undefined mnemonic: {0}")]
    UndefinedMnemonic(String),
    /// Instruction needs an operand that is missing.
    #[error("`{0}` requires an operand")]
    MissingOperand(String),
    /// A label line carries no instruction to encode.
    #[error("label '{0}' has no instruction")]
    MissingInstruction(String),
    /// `hex`/`dec` operand is malformed or too wide.
    #[error("invalid literal: {0}")]
    Literal(#[source] NumericError),
    /// Table code does not render to a full word.
    #[error("{category} code `{code}` for `{mnemonic}` is not a {bits}-bit binary string")]
    MalformedOpcode {
        /// Table category.
        category: Category,
        /// The mnemonic.
        mnemonic: String,
        /// The code as written in the table.
        code: String,
        /// Expected code width.
        bits: u8,
    },
    /// Location counter ran past the end of memory.
    #[error("instruction lies outside the address space: {0}")]
    AddressOverflow(#[source] NumericError),
    /// Two lines were placed at the same address.
    #[error("address {address} already holds the word from line {first_line}")]
    AddressConflict {
        /// The contested address.
        address: Bits,
        /// Line that placed the first word.
        first_line: usize,
    },
}

impl From<ParseError> for EncodeError {
    fn from(e: ParseError) -> Self {
        Self {
            kind: EncodeErrorKind::Parse(e.kind),
            line: e.line,
        }
    }
}

/// Encodes one classified instruction to a word.
///
/// # Errors
///
/// Returns `EncodeErrorKind` for an undefined symbol or mnemonic, a missing
/// operand, a malformed literal, or a table code of the wrong shape.
pub fn encode_instruction(
    classified: Classified<'_>,
    symbols: &SymbolTable,
) -> Result<Bits, EncodeErrorKind> {
    match classified {
        Classified::MemoryReference {
            mnemonic,
            opcode,
            operand,
        } => {
            let label = operand.ok_or_else(|| EncodeErrorKind::MissingOperand(mnemonic.into()))?;
            let symbol = symbols
                .get(label)
                .ok_or_else(|| EncodeErrorKind::UndefinedSymbol(label.into()))?;
            let word = format!("{DIRECT}{opcode}{}", symbol.address);
            Bits::parse_binary(&word, WORD_BITS)
                .map_err(|_| malformed_opcode(Category::MemoryReference, mnemonic, opcode))
        }
        Classified::Direct {
            category,
            mnemonic,
            code,
        } => Bits::parse_binary(code, WORD_BITS)
            .map_err(|_| malformed_opcode(category, mnemonic, code)),
        Classified::Literal { radix, operand } => {
            let text =
                operand.ok_or_else(|| EncodeErrorKind::MissingOperand(radix.pseudo_op().into()))?;
            numeric::encode(text, WORD_BITS, radix).map_err(EncodeErrorKind::Literal)
        }
        Classified::Unclassified { mnemonic } => {
            Err(EncodeErrorKind::UndefinedMnemonic(mnemonic.into()))
        }
    }
}

fn malformed_opcode(category: Category, mnemonic: &str, code: &str) -> EncodeErrorKind {
    EncodeErrorKind::MalformedOpcode {
        category,
        mnemonic: mnemonic.into(),
        code: code.into(),
        bits: category.code_bits(),
    }
}

/// Performs pass 2 over the source lines.
///
/// Replays the pass-1 counter rules and emits one word per occupying line up
/// to `end`.
///
/// # Errors
///
/// Returns the first `EncodeError`; no partial program is produced.
pub fn encode_program(
    lines: &[SourceLine],
    symbols: &SymbolTable,
    instructions: InstructionSet<'_>,
) -> Result<AssembledProgram, EncodeError> {
    let mut program = AssembledProgram::new();
    let mut counter = LocationCounter::new();

    for line in lines {
        let statement = parse_statement(line)?;
        let err = |kind| EncodeError {
            kind,
            line: line.number,
        };

        let classified = match statement.kind {
            StatementKind::Blank => continue,
            StatementKind::Org(target) => {
                counter.set(target);
                continue;
            }
            StatementKind::End => break,
            StatementKind::LabelOnly => {
                let label = statement.label.unwrap_or_default();
                return Err(err(EncodeErrorKind::MissingInstruction(label.into())));
            }
            StatementKind::Instruction { mnemonic, operands } => {
                instructions.classify(mnemonic, operands)
            }
        };
        tracing::trace!("line {}: {classified:?}", line.number);

        let word = encode_instruction(classified, symbols).map_err(err)?;
        let address = counter
            .address()
            .map_err(|e| err(EncodeErrorKind::AddressOverflow(e)))?;
        program.place(address, word, line.number).map_err(|existing| {
            err(EncodeErrorKind::AddressConflict {
                address,
                first_line: existing.line,
            })
        })?;
        counter.advance();
    }

    tracing::debug!("ADDRESS      | INSTRUCTION");
    for (address, word) in program.iter() {
        tracing::debug!("{address} | {word}");
    }

    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::extract_source;
    use crate::symbols::resolve_symbols;
    use proptest::prelude::*;
    use rstest::rstest;

    fn tables() -> OpcodeTables {
        OpcodeTables {
            memory_reference: OpcodeTable::parse(
                "and 000\nadd 001\nlda 010\nsta 011\nbun 100\n",
                Category::MemoryReference,
            )
            .unwrap(),
            register_reference: OpcodeTable::parse(
                "cla 0111100000000000\ncma 0111001000000000\nhlt 0111000000000001\n",
                Category::RegisterReference,
            )
            .unwrap(),
            input_output: OpcodeTable::parse(
                "inp 1111100000000000\nout 1111010000000000\n",
                Category::InputOutput,
            )
            .unwrap(),
        }
    }

    fn assemble(source: &str) -> Result<AssembledProgram, EncodeError> {
        let lines = extract_source(source);
        let symbols = resolve_symbols(&lines).unwrap();
        let tables = tables();
        encode_program(&lines, &symbols, InstructionSet::from(&tables))
    }

    fn words(program: &AssembledProgram) -> Vec<String> {
        program.iter().map(|(_, w)| w.to_string()).collect()
    }

    #[rstest]
    #[case("lda", "MemoryReference")]
    #[case("cla", "RegisterReference")]
    #[case("inp", "InputOutput")]
    #[case("hex", "Literal")]
    #[case("dec", "Literal")]
    #[case("xyz", "Unclassified")]
    fn classification(#[case] mnemonic: &str, #[case] expected: &str) {
        let tables = tables();
        let set = InstructionSet::from(&tables);
        let operands = ["x".to_string()];
        let kind = match set.classify(mnemonic, &operands) {
            Classified::MemoryReference { .. } => "MemoryReference",
            Classified::Direct {
                category: Category::RegisterReference,
                ..
            } => "RegisterReference",
            Classified::Direct { .. } => "InputOutput",
            Classified::Literal { .. } => "Literal",
            Classified::Unclassified { .. } => "Unclassified",
        };
        assert_eq!(kind, expected);
    }

    #[test]
    fn memory_reference_wins_over_other_tables() {
        let mri = OpcodeTable::parse("cla 111\n", Category::MemoryReference).unwrap();
        let rri =
            OpcodeTable::parse("cla 0111100000000000\n", Category::RegisterReference).unwrap();
        let ioi = OpcodeTable::parse("cla 1111100000000000\n", Category::InputOutput).unwrap();
        let set = InstructionSet::new(&mri, &rri, &ioi);
        assert!(matches!(
            set.classify("cla", &[]),
            Classified::MemoryReference { opcode: "111", .. }
        ));
    }

    #[test]
    fn memory_reference_word_layout() {
        let program = assemble("lda x\nx, dec 5\n").unwrap();
        assert_eq!(words(&program), ["0010000000000001", "0000000000000101"]);
    }

    #[test]
    fn forward_reference_resolves() {
        let program = assemble("bun later\ncla\ncla\nlater, hlt\n").unwrap();
        assert_eq!(words(&program)[0], "0100000000000011");
    }

    #[test]
    fn register_reference_ignores_operand() {
        let program = assemble("cla whatever\n").unwrap();
        assert_eq!(words(&program), ["0111100000000000"]);
    }

    #[test]
    fn labeled_register_and_io_lines() {
        let program = assemble("a, cma\nb, out\nc, lda a\n").unwrap();
        assert_eq!(
            words(&program),
            ["0111001000000000", "1111010000000000", "0010000000000000"]
        );
    }

    #[test]
    fn literal_pseudo_ops() {
        let program = assemble("a, hex ffe9\nb, dec 65535\nc, dec 0\n").unwrap();
        assert_eq!(
            words(&program),
            ["1111111111101001", "1111111111111111", "0000000000000000"]
        );
    }

    #[test]
    fn org_and_end() {
        let program = assemble("org 10\ncla\nend\nhlt\n").unwrap();
        assert_eq!(program.len(), 1);
        let (address, _) = program.iter().next().unwrap();
        assert_eq!(address.to_string(), "000000010000");
    }

    #[test]
    fn end_skips_unknown_lines() {
        let program = assemble("cla\nend\nbogus op\n").unwrap();
        assert_eq!(program.len(), 1);
    }

    #[rstest]
    #[case("lda nowhere\n", EncodeErrorKind::UndefinedSymbol("nowhere".into()))]
    #[case("cla\nfoo bar\n", EncodeErrorKind::UndefinedMnemonic("foo".into()))]
    #[case("lda\n", EncodeErrorKind::MissingOperand("lda".into()))]
    #[case("x, hex\n", EncodeErrorKind::MissingOperand("hex".into()))]
    #[case("x,\n", EncodeErrorKind::MissingInstruction("x".into()))]
    fn encoding_errors(#[case] source: &str, #[case] expected: EncodeErrorKind) {
        assert_eq!(assemble(source).unwrap_err().kind, expected);
    }

    #[test]
    fn literal_errors() {
        let err = assemble("cla\nx, dec 65536\n").unwrap_err();
        assert!(matches!(
            err.kind,
            EncodeErrorKind::Literal(NumericError::WidthOverflow { value: 65536, .. })
        ));
        assert_eq!(err.line, 2);

        let err = assemble("x, hex 12g\n").unwrap_err();
        assert!(matches!(
            err.kind,
            EncodeErrorKind::Literal(NumericError::MalformedLiteral { .. })
        ));
    }

    #[test]
    fn malformed_table_code_surfaces_on_use() {
        let mri = OpcodeTable::parse("lda 10\n", Category::MemoryReference).unwrap();
        let rri = OpcodeTable::parse("cla 01111\n", Category::RegisterReference).unwrap();
        let ioi = OpcodeTable::parse("", Category::InputOutput).unwrap();
        let lines = extract_source("x, cla\nlda x\n");
        let symbols = resolve_symbols(&lines).unwrap();

        let err = encode_program(&lines, &symbols, InstructionSet::new(&mri, &rri, &ioi))
            .unwrap_err();
        assert_eq!(
            err.kind,
            EncodeErrorKind::MalformedOpcode {
                category: Category::RegisterReference,
                mnemonic: "cla".into(),
                code: "01111".into(),
                bits: 16,
            }
        );

        let lines = extract_source("lda x\nx, dec 1\n");
        let symbols = resolve_symbols(&lines).unwrap();
        let err = encode_program(&lines, &symbols, InstructionSet::new(&mri, &rri, &ioi))
            .unwrap_err();
        assert!(matches!(
            err.kind,
            EncodeErrorKind::MalformedOpcode { bits: 3, .. }
        ));
    }

    #[test]
    fn address_conflict() {
        let err = assemble("org 5\ncla\norg 5\nhlt\n").unwrap_err();
        assert_eq!(
            err.kind,
            EncodeErrorKind::AddressConflict {
                address: Bits::address(5).unwrap(),
                first_line: 2,
            }
        );
        assert_eq!(err.line, 4);
    }

    #[test]
    fn org_backwards_into_free_space() {
        let program = assemble("org 10\ncla\norg 0\nhlt\n").unwrap();
        let addresses: Vec<u32> = program.iter().map(|(a, _)| a.value()).collect();
        assert_eq!(addresses, [0, 0x10]);
    }

    #[test]
    fn instruction_past_end_of_memory() {
        let err = assemble("org fff\ncla\ncla\n").unwrap_err();
        assert!(matches!(err.kind, EncodeErrorKind::AddressOverflow(_)));
        assert_eq!(err.line, 3);
    }

    proptest! {
        #[test]
        fn one_entry_per_instruction_line(
            body in prop::collection::vec(
                prop::sample::select(vec!["cla", "cma", "hlt", "out", "inp", "dec 7", "hex a", "lda top"]),
                1..48,
            ),
            origin in 0u32..0x400,
        ) {
            let mut source = format!("org {origin:x}\ntop, cla\n/ body\n\n");
            for text in &body {
                source.push_str(text);
                source.push('\n');
            }
            let program = assemble(&source).unwrap();
            prop_assert_eq!(program.len(), body.len() + 1);
            let addresses: Vec<u32> = program.iter().map(|(a, _)| a.value()).collect();
            let expected: Vec<u32> = (origin..).take(body.len() + 1).collect();
            prop_assert_eq!(addresses, expected);
        }
    }
}
