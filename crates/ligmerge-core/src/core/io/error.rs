use std::fmt;
use std::io;
use thiserror::Error;

/// The ways a text file can be malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatErrorKind {
    #[error("Invalid integer for {field} (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Invalid number for {field} (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("[ {section} ] record has {found} fields, expected {expected}")]
    FieldCount {
        section: &'static str,
        expected: &'static str,
        found: usize,
    },
    #[error("Data line outside of any section")]
    RecordOutsideSection,
    #[error("Atom index {found} is out of sequence (expected {expected})")]
    NonSequentialIndex { expected: usize, found: usize },
    #[error("[ {section} ] record references atom {index}, which does not exist")]
    UnknownAtom { section: &'static str, index: usize },
    #[error("Declared {what} count is {declared} but {parsed} were parsed")]
    CountMismatch {
        what: &'static str,
        declared: usize,
        parsed: usize,
    },
    #[error("Missing required section: {0}")]
    MissingSection(&'static str),
    #[error("Line is too short for a coordinate record")]
    LineTooShort,
    #[error("Molecule header mismatch: expected '{expected}', found '{found}'")]
    HeaderMismatch { expected: String, found: String },
    #[error("Atom {index} already carries state B columns; merge inputs must be single-state")]
    AlreadyDualState { index: usize },
    #[error("Unexpected file extension (expected '.{expected}')")]
    UnexpectedExtension { expected: &'static str },
}

/// A malformed-input error, optionally pinned to a 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    pub line: Option<usize>,
    pub kind: FormatErrorKind,
}

impl FormatError {
    pub fn at(line: usize, kind: FormatErrorKind) -> Self {
        Self {
            line: Some(line),
            kind,
        }
    }
}

impl From<FormatErrorKind> for FormatError {
    fn from(kind: FormatErrorKind) -> Self {
        Self { line: None, kind }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Line {line}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for FormatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Failure to read a text file: either it could not be read or it is malformed.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Format(#[from] FormatError),
}

impl From<FormatErrorKind> for ReadError {
    fn from(kind: FormatErrorKind) -> Self {
        ReadError::Format(kind.into())
    }
}
