//! Fixed-width binary rendering of addresses, opcodes, and machine words.
//!
//! Every value the assembler emits is an unsigned integer paired with an
//! explicit bit width. Values that do not fit their width are rejected at
//! construction time rather than truncated when rendered.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Width of a memory address in bits.
pub const ADDRESS_BITS: u8 = 12;
/// Width of an instruction or data word in bits.
pub const WORD_BITS: u8 = 16;
/// Width of a memory-reference opcode field in bits.
pub const OPCODE_BITS: u8 = 3;
/// Number of addressable words.
pub const MEMORY_WORDS: u32 = 1 << ADDRESS_BITS;

/// Number base accepted for literals and directive operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Radix {
    /// Base 10 (`dec`).
    Decimal,
    /// Base 16 (`hex`).
    Hexadecimal,
}

impl Radix {
    /// Returns the numeric base.
    #[must_use]
    pub const fn base(self) -> u32 {
        match self {
            Self::Decimal => 10,
            Self::Hexadecimal => 16,
        }
    }

    /// Returns the pseudo-operation name that selects this base.
    #[must_use]
    pub const fn pseudo_op(self) -> &'static str {
        match self {
            Self::Decimal => "dec",
            Self::Hexadecimal => "hex",
        }
    }
}

impl fmt::Display for Radix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decimal => write!(f, "decimal"),
            Self::Hexadecimal => write!(f, "hexadecimal"),
        }
    }
}

impl FromStr for Radix {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dec" => Ok(Self::Decimal),
            "hex" => Ok(Self::Hexadecimal),
            other => Err(NumericError::UnsupportedRadix(other.to_string())),
        }
    }
}

/// Error parsing or rendering a fixed-width value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumericError {
    /// Only `dec` and `hex` are supported.
    #[error("unsupported number base `{0}` (expected `dec` or `hex`)")]
    UnsupportedRadix(String),
    /// Text is not a valid number in the requested base.
    #[error("malformed {radix} literal `{text}`")]
    MalformedLiteral {
        /// The offending text.
        text: String,
        /// The base it was parsed in.
        radix: Radix,
    },
    /// Value needs more bits than the field provides.
    #[error("value {value} does not fit in {width} bits (limit {limit})")]
    WidthOverflow {
        /// The computed value.
        value: u64,
        /// The field width in bits.
        width: u8,
        /// Largest value the field can hold.
        limit: u64,
    },
    /// Text is not a zero-padded binary string of the expected width.
    #[error("`{text}` is not a {width}-bit binary string")]
    MalformedBinary {
        /// The offending text.
        text: String,
        /// The expected width in bits.
        width: u8,
    },
}

/// Largest value representable in `width` bits.
#[must_use]
pub const fn max_for_width(width: u8) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// An unsigned value with an explicit bit width.
///
/// Renders as a binary string zero-padded on the left to exactly `width`
/// characters. Ordering compares the value first, so a map keyed by
/// same-width addresses iterates in ascending address order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bits {
    value: u32,
    width: u8,
}

impl Bits {
    /// Creates a value of the given width (1 to 32 bits).
    ///
    /// # Errors
    ///
    /// Returns `NumericError::WidthOverflow` if `value` needs more than
    /// `width` bits.
    pub fn new(value: u64, width: u8) -> Result<Self, NumericError> {
        let fits = u32::try_from(value)
            .ok()
            .filter(|v| width >= 32 || v >> u32::from(width) == 0);

        fits.map(|value| Self { value, width })
            .ok_or_else(|| NumericError::WidthOverflow {
                value,
                width,
                limit: max_for_width(width),
            })
    }

    /// Creates an address from a location counter value.
    ///
    /// # Errors
    ///
    /// Returns `NumericError::WidthOverflow` if the counter is outside the
    /// address space.
    pub fn address(counter: u32) -> Result<Self, NumericError> {
        Self::new(u64::from(counter), ADDRESS_BITS)
    }

    /// Parses a binary string that must be exactly `width` digits long.
    ///
    /// # Errors
    ///
    /// Returns `NumericError::MalformedBinary` on a length mismatch or a digit
    /// other than `0`/`1`.
    pub fn parse_binary(text: &str, width: u8) -> Result<Self, NumericError> {
        let malformed = || NumericError::MalformedBinary {
            text: text.to_string(),
            width,
        };

        if text.len() != usize::from(width) || !text.bytes().all(|b| b == b'0' || b == b'1') {
            return Err(malformed());
        }

        let value = u64::from_str_radix(text, 2).map_err(|_| malformed())?;
        Self::new(value, width).map_err(|_| malformed())
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.value
    }

    /// Returns the width in bits.
    #[must_use]
    pub const fn width(self) -> u8 {
        self.width
    }
}

impl fmt::Display for Bits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$b}", self.value, width = usize::from(self.width))
    }
}

/// Parses `text` as an unsigned number in `radix`.
///
/// # Errors
///
/// Returns `NumericError::MalformedLiteral` if the text is empty, signed, or
/// contains digits outside the base.
pub fn parse_literal(text: &str, radix: Radix) -> Result<u64, NumericError> {
    let malformed = || NumericError::MalformedLiteral {
        text: text.to_string(),
        radix,
    };

    if text.starts_with(['+', '-']) {
        return Err(malformed());
    }

    u64::from_str_radix(text, radix.base()).map_err(|_| malformed())
}

/// Parses `text` in `radix` and renders it as a `width`-bit value.
///
/// # Errors
///
/// Returns `NumericError` if the text is malformed or the value overflows
/// `width`.
pub fn encode(text: &str, width: u8, radix: Radix) -> Result<Bits, NumericError> {
    Bits::new(parse_literal(text, radix)?, width)
}

/// Renders the value of `bits` as text in `radix`; the inverse of [`encode`].
#[must_use]
pub fn decode(bits: Bits, radix: Radix) -> String {
    match radix {
        Radix::Decimal => bits.value().to_string(),
        Radix::Hexadecimal => format!("{:x}", bits.value()),
    }
}
