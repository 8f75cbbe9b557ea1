use std::fmt;

use thiserror::Error;

/// Core error type for tabfile operations
#[derive(Error, Debug)]
pub enum TabfileError {
    /// IO errors from file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input was rejected before anything was encoded
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A value cannot be represented by its column's declared type
    #[error("Unsupported value in column '{column}' at row {row}: expected {expected}, found {found}")]
    UnsupportedValue {
        column: String,
        row: usize,
        expected: String,
        found: String,
    },

    /// The file does not start with the expected magic bytes
    #[error("Bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 8], found: Vec<u8> },

    /// A declared offset or length points past the end of the file
    #[error("Truncated file: {0}")]
    TruncatedFile(String),

    /// A column block or the footer could not be decoded
    #[error("Corrupt block in {location}: {reason}")]
    CorruptBlock { location: String, reason: String },

    /// Invalid argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Internal errors that shouldn't happen
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Pre-write checks on the shape of a host table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("only tables can be written, got {found}")]
    NotATable { found: String },

    #[error("unsupported row index {property}: {detail}; reset the index to make it a column")]
    UnsupportedIndex {
        property: IndexProperty,
        detail: String,
    },

    #[error("column names must be strings, inferred {inferred}")]
    InvalidColumnNames { inferred: String },

    #[error("duplicate column names: {}", names.join(", "))]
    DuplicateColumnNames { names: Vec<String> },
}

/// Which property of a row index disqualifies it from being the default one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexProperty {
    Type,
    Ordering,
    Name,
}

impl fmt::Display for IndexProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndexProperty::Type => "type",
            IndexProperty::Ordering => "ordering",
            IndexProperty::Name => "name",
        })
    }
}

/// Fieldless discriminant of [`TabfileError`] for callers that branch on kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    NotATable,
    UnsupportedIndex,
    InvalidColumnNames,
    DuplicateColumnNames,
    UnsupportedValue,
    BadMagic,
    TruncatedFile,
    CorruptBlock,
    InvalidArgument,
    Internal,
}

/// Result type alias for tabfile operations
pub type Result<T> = std::result::Result<T, TabfileError>;

impl TabfileError {
    /// Create a new unsupported value error
    pub fn unsupported_value<C, E, F>(column: C, row: usize, expected: E, found: F) -> Self
    where
        C: Into<String>,
        E: Into<String>,
        F: Into<String>,
    {
        TabfileError::UnsupportedValue {
            column: column.into(),
            row,
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create a new truncated file error
    pub fn truncated<S: Into<String>>(msg: S) -> Self {
        TabfileError::TruncatedFile(msg.into())
    }

    /// Create a new corrupt block error
    pub fn corrupt<L: Into<String>, R: Into<String>>(location: L, reason: R) -> Self {
        TabfileError::CorruptBlock {
            location: location.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid argument error
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        TabfileError::InvalidArgument(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        TabfileError::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TabfileError::Io(_) => ErrorKind::Io,
            TabfileError::Validation(v) => match v {
                ValidationError::NotATable { .. } => ErrorKind::NotATable,
                ValidationError::UnsupportedIndex { .. } => ErrorKind::UnsupportedIndex,
                ValidationError::InvalidColumnNames { .. } => ErrorKind::InvalidColumnNames,
                ValidationError::DuplicateColumnNames { .. } => ErrorKind::DuplicateColumnNames,
            },
            TabfileError::UnsupportedValue { .. } => ErrorKind::UnsupportedValue,
            TabfileError::BadMagic { .. } => ErrorKind::BadMagic,
            TabfileError::TruncatedFile(_) => ErrorKind::TruncatedFile,
            TabfileError::CorruptBlock { .. } => ErrorKind::CorruptBlock,
            TabfileError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            TabfileError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Extension trait to add context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, ctx: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T>;
}

impl<T> ErrorContext<T> for std::result::Result<T, std::io::Error> {
    fn context<S: Into<String>>(self, ctx: S) -> Result<T> {
        self.map_err(|e| {
            TabfileError::Io(std::io::Error::new(e.kind(), format!("{}: {}", ctx.into(), e)))
        })
    }

    fn with_context<S: Into<String>, F: FnOnce() -> S>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            TabfileError::Io(std::io::Error::new(e.kind(), format!("{}: {}", f().into(), e)))
        })
    }
}
