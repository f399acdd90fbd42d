use std::borrow::Cow;
use std::fmt;
use std::num::ParseFloatError;
use std::str::FromStr;

/// A numeric topology field that remembers how it was written.
///
/// Topology files are compared and rewritten column by column. Re-printing a parsed `f64`
/// would silently change charges like `-0.117800` into `-0.1178`, so every number keeps the
/// token it was read from and is written back verbatim. Equality compares values, which
/// lets `1.0` and `1.000000` be treated as the same parameter.
#[derive(Debug, Clone)]
pub struct Number {
    value: f64,
    text: String,
}

impl Number {
    /// Creates a number from a value and the text it should be written as.
    pub fn new(value: f64, text: impl Into<String>) -> Self {
        Self {
            value,
            text: text.into(),
        }
    }

    /// A zero written as `0`.
    pub fn zero() -> Self {
        Self::new(0.0, "0")
    }

    /// A zero charge in the fixed six-decimal style of the `[ atoms ]` section.
    pub fn zero_charge() -> Self {
        Self::new(0.0, "0.000000")
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0.0
    }

    pub fn is_integral(&self) -> bool {
        self.value.is_finite() && self.value.fract() == 0.0
    }

    /// The text with integral values collapsed to integers (`180.00` becomes `180`).
    ///
    /// Dihedral rows are written this way so that multiplicities and phases stay readable
    /// whether they were parsed as `3` or `3.0`.
    pub fn compact(&self) -> Cow<'_, str> {
        if self.is_integral() && self.value.abs() < 1e15 {
            Cow::Owned(format!("{}", self.value as i64))
        } else {
            Cow::Borrowed(&self.text)
        }
    }

    /// Formats the value with a fixed number of decimals, ignoring the source text.
    pub fn fixed(&self, decimals: usize) -> String {
        format!("{:.*}", decimals, self.value)
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl FromStr for Number {
    type Err = ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = trimmed.parse::<f64>()?;
        Ok(Self::new(value, trimmed))
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Self::new(value, value.to_string())
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.text)
    }
}
