//! GTIN (Global Trade Item Number) parsing and GS1 check-digit validation.
//!
//! Accepts the four GS1 lengths (GTIN-8, GTIN-12, GTIN-13, GTIN-14). Any
//! non-digit characters in the raw input are ignored, so `400-6381 333931`
//! and `4006381333931` are the same code.
//!
//! The check digit uses the standard GS1 weighting: starting from the digit
//! immediately left of the check digit and moving left, weights alternate
//! 3, 1, 3, 1, ... The check digit is `(10 - sum mod 10) mod 10`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lengths accepted by [`validate`].
pub const VALID_LENGTHS: [usize; 4] = [8, 12, 13, 14];

/// The GTIN family member, decided by digit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GtinKind {
    #[serde(rename = "GTIN-8")]
    Gtin8,
    #[serde(rename = "GTIN-12")]
    Gtin12,
    #[serde(rename = "GTIN-13")]
    Gtin13,
    #[serde(rename = "GTIN-14")]
    Gtin14,
}

impl GtinKind {
    /// Kind for a digit count, or `None` for lengths outside the GS1 set.
    #[must_use]
    pub const fn from_len(len: usize) -> Option<Self> {
        match len {
            8 => Some(Self::Gtin8),
            12 => Some(Self::Gtin12),
            13 => Some(Self::Gtin13),
            14 => Some(Self::Gtin14),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gtin8 => "GTIN-8",
            Self::Gtin12 => "GTIN-12",
            Self::Gtin13 => "GTIN-13",
            Self::Gtin14 => "GTIN-14",
        }
    }

    /// Number of digits for this kind.
    #[must_use]
    pub const fn len(self) -> usize {
        match self {
            Self::Gtin8 => 8,
            Self::Gtin12 => 12,
            Self::Gtin13 => 13,
            Self::Gtin14 => 14,
        }
    }
}

impl fmt::Display for GtinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a raw string is not a valid GTIN.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GtinError {
    #[error("GTIN must contain digits")]
    EmptyInput,

    #[error("GTIN length must be 8, 12, 13 or 14 digits, got {actual}")]
    InvalidLength { actual: usize },

    #[error("check digit mismatch: expected {expected}, got {actual}")]
    CheckDigitMismatch { expected: u8, actual: u8 },
}

impl GtinError {
    /// Stable error code used in [`GtinReport`].
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "EmptyInput",
            Self::InvalidLength { .. } => "InvalidLength",
            Self::CheckDigitMismatch { .. } => "CheckDigitMismatch",
        }
    }
}

/// A validated GTIN in canonical (digits only) form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Gtin {
    digits: String,
    kind: GtinKind,
}

impl Gtin {
    /// Canonical digit string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.digits
    }

    #[must_use]
    pub const fn kind(&self) -> GtinKind {
        self.kind
    }

    /// Grouped display form, see [`format`].
    #[must_use]
    pub fn display(&self) -> String {
        format(&self.digits)
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.digits
    }
}

impl fmt::Display for Gtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

/// Serializable validation outcome for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GtinReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<GtinKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_display: Option<String>,
}

impl From<Result<Gtin, GtinError>> for GtinReport {
    fn from(result: Result<Gtin, GtinError>) -> Self {
        match result {
            Ok(gtin) => Self {
                valid: true,
                error_code: None,
                error_message: None,
                kind: Some(gtin.kind()),
                canonical_display: Some(gtin.display()),
            },
            Err(err) => Self {
                valid: false,
                error_code: Some(err.code().to_string()),
                error_message: Some(err.to_string()),
                kind: None,
                canonical_display: None,
            },
        }
    }
}

/// Keep only ASCII digits.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Compute the GS1 check digit for a payload (all digits except the check digit).
///
/// Non-digit bytes in `payload` are ignored.
#[must_use]
pub fn check_digit(payload: &str) -> u8 {
    let sum: u32 = payload
        .bytes()
        .filter(u8::is_ascii_digit)
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 0 { digit * 3 } else { digit }
        })
        .sum();

    u8::try_from((10 - sum % 10) % 10).unwrap_or_default()
}

/// Parse and validate a raw GTIN.
///
/// # Errors
///
/// - [`GtinError::EmptyInput`] when `raw` holds no digits.
/// - [`GtinError::InvalidLength`] when the digit count is not 8, 12, 13 or 14.
/// - [`GtinError::CheckDigitMismatch`] when the declared check digit is wrong.
pub fn validate(raw: &str) -> Result<Gtin, GtinError> {
    let digits = normalize(raw);
    if digits.is_empty() {
        return Err(GtinError::EmptyInput);
    }

    let kind = GtinKind::from_len(digits.len()).ok_or(GtinError::InvalidLength {
        actual: digits.len(),
    })?;

    let (payload, declared) = digits.split_at(digits.len() - 1);
    let actual = declared.bytes().next().map_or(0, |b| b - b'0');
    let expected = check_digit(payload);
    if expected != actual {
        return Err(GtinError::CheckDigitMismatch { expected, actual });
    }

    Ok(Gtin { digits, kind })
}

/// Validate and summarize in the presentation shape.
#[must_use]
pub fn report(raw: &str) -> GtinReport {
    GtinReport::from(validate(raw))
}

/// Group digits for display: 8 → 4+4, 12 → 1+5+5+1, 13 → 1+6+6, 14 → 1+1+6+6.
///
/// Pure display transform. Non-digits are dropped first; any other length
/// comes back as the bare digit string. Never fails, and is idempotent.
#[must_use]
pub fn format(raw: &str) -> String {
    let digits = normalize(raw);
    let groups: &[usize] = match digits.len() {
        8 => &[4, 4],
        12 => &[1, 5, 5, 1],
        13 => &[1, 6, 6],
        14 => &[1, 1, 6, 6],
        _ => return digits,
    };

    let mut out = String::with_capacity(digits.len() + groups.len());
    let mut rest = digits.as_str();
    for width in groups {
        let (group, tail) = rest.split_at(*width);
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(group);
        rest = tail;
    }
    out
}
