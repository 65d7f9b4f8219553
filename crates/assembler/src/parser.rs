//! Structural parsing of tokenized source lines.
//!
//! Every line is split once into an optional label and a statement kind.
//! Both passes walk the same statements, so the location counter follows
//! identical rules in each.

use thiserror::Error;

use crate::numeric::{encode, NumericError, Radix, ADDRESS_BITS};
use crate::source::{SourceLine, LABEL_SUFFIX};

/// Directive that repositions the location counter.
pub const ORG: &str = "org";
/// Directive that terminates assembly.
pub const END: &str = "end";

/// Statement kind after any leading label is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind<'a> {
    /// No tokens at all.
    Blank,
    /// A label with nothing after it.
    LabelOnly,
    /// `org <hex>`: move the location counter.
    Org(u32),
    /// `end`: stop processing.
    End,
    /// Anything that occupies one word.
    Instruction {
        /// First token after the label.
        mnemonic: &'a str,
        /// Remaining tokens.
        operands: &'a [String],
    },
}

/// One parsed source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement<'a> {
    /// Label name without its trailing comma.
    pub label: Option<&'a str>,
    /// What the rest of the line is.
    pub kind: StatementKind<'a>,
}

impl Statement<'_> {
    /// Returns true if this statement occupies an address.
    #[must_use]
    pub const fn occupies_word(&self) -> bool {
        matches!(
            self.kind,
            StatementKind::LabelOnly | StatementKind::Instruction { .. }
        )
    }
}

/// Parse error with source line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    /// Kind of parse error.
    pub kind: ParseErrorKind,
    /// Source line where the error occurred.
    pub line: usize,
}

/// Classification of parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// A label token with nothing before the comma.
    #[error("empty label name")]
    EmptyLabel,
    /// A label attached to `org` or `end`.
    #[error("label `{label}` cannot be attached to `{directive}`")]
    LabeledDirective {
        /// The label.
        label: String,
        /// The directive.
        directive: String,
    },
    /// `org` without a target.
    #[error("`org` requires a hexadecimal address")]
    MissingOrigin,
    /// `org` target is malformed or outside the address space.
    #[error("invalid `org` target: {0}")]
    Origin(#[source] NumericError),
}

/// Parses one tokenized line.
///
/// # Errors
///
/// Returns `ParseError` for an empty label, a labeled directive, or a
/// missing or invalid `org` target.
pub fn parse_statement(line: &SourceLine) -> Result<Statement<'_>, ParseError> {
    let err = |kind| ParseError {
        kind,
        line: line.number,
    };

    let (label, body) = match line.tokens.split_first() {
        Some((first, rest)) => match first.strip_suffix(LABEL_SUFFIX) {
            Some("") => return Err(err(ParseErrorKind::EmptyLabel)),
            Some(name) => (Some(name), rest),
            None => (None, line.tokens.as_slice()),
        },
        None => (None, line.tokens.as_slice()),
    };

    let kind = match body.split_first() {
        None if label.is_some() => StatementKind::LabelOnly,
        None => StatementKind::Blank,
        Some((mnemonic, operands)) => match (mnemonic.as_str(), label) {
            (directive @ (ORG | END), Some(label)) => {
                return Err(err(ParseErrorKind::LabeledDirective {
                    label: label.to_string(),
                    directive: directive.to_string(),
                }));
            }
            (ORG, None) => {
                let target = operands
                    .first()
                    .ok_or_else(|| err(ParseErrorKind::MissingOrigin))?;
                let target = encode(target, ADDRESS_BITS, Radix::Hexadecimal)
                    .map_err(|e| err(ParseErrorKind::Origin(e)))?;
                StatementKind::Org(target.value())
            }
            (END, None) => StatementKind::End,
            (mnemonic, _) => StatementKind::Instruction { mnemonic, operands },
        },
    };

    Ok(Statement { label, kind })
}
