//! Source ingestion and line tokenization.
//!
//! Raw text is lowercased and split on whitespace. A token starting with `/`
//! begins a comment that runs to the end of the line. Lines left with no
//! tokens are dropped here, so neither pass sees them and they never advance
//! the location counter. Kept lines carry their original line numbers for
//! error reporting.

use std::fs;
use std::path::Path;

use thiserror::Error;

/// Token prefix that starts a line comment.
pub const COMMENT_MARKER: char = '/';
/// Suffix that marks a leading token as a label definition.
pub const LABEL_SUFFIX: char = ',';
/// Accepted source file extensions.
pub const SOURCE_EXTENSIONS: [&str; 2] = ["asm", "S"];

/// A tokenized, comment-stripped source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Lowercase tokens, comment removed.
    pub tokens: Vec<String>,
    /// 1-indexed line number in the original text.
    pub number: usize,
}

impl SourceLine {
    /// Tokenizes one line of raw text.
    #[must_use]
    pub fn tokenize(text: &str, number: usize) -> Self {
        let mut tokens: Vec<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();
        if let Some(pos) = tokens.iter().position(|t| t.starts_with(COMMENT_MARKER)) {
            tokens.truncate(pos);
        }
        Self { tokens, number }
    }

    /// Returns the token at `index`.
    #[must_use]
    pub fn token(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    /// Returns true if nothing remains after comment removal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Error reading a source file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The path does not end in `.asm` or `.S`.
    #[error("`{path}` does not end with .asm or .S")]
    UnsupportedExtension {
        /// The rejected path.
        path: String,
    },
    /// The file could not be read.
    #[error("cannot read `{path}`: {message}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error message.
        message: String,
    },
}

/// Tokenizes source text, dropping lines that are empty after comment removal.
#[must_use]
pub fn extract_source(content: &str) -> Vec<SourceLine> {
    content
        .lines()
        .enumerate()
        .map(|(idx, text)| SourceLine::tokenize(text, idx + 1))
        .filter(|line| !line.is_empty())
        .collect()
}

/// Reads and tokenizes an assembly source file.
///
/// # Errors
///
/// Returns `SourceError::UnsupportedExtension` before touching the file if
/// the extension is not `.asm` or `.S`, and `SourceError::Io` if reading fails.
pub fn read_source(path: &Path) -> Result<Vec<SourceLine>, SourceError> {
    if !is_source_file(path) {
        return Err(SourceError::UnsupportedExtension {
            path: path.display().to_string(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let lines = extract_source(&content);
    tracing::trace!("read {} source lines from {}", lines.len(), path.display());
    Ok(lines)
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}
