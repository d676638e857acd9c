use std::fmt;

/// The cross-cutting error taxonomy shared by every crate in this workspace.
/// Every fallible operation ultimately resolves to one of these kinds,
/// regardless of which crate raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or contradictory configuration.
    Config,
    /// Missing or unreadable file, archive extraction failure, HTTP non-2xx.
    Io,
    /// Malformed input: short row, bad JSON, type coercion failure, missing
    /// required property.
    Parse,
    /// A graph operation required a table (`nodes`/`edges`) that isn't present.
    Schema,
    /// `lookup` failed under an `error` on-map-failure policy.
    Mapping,
    /// A writer received fields outside its declared contract, or a
    /// transform declared both entry points.
    Contract,
    /// A merge configured with `validation_errors_halt` produced errors.
    Validation,
    /// A remote resource could not be fetched.
    Network,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Config => "CONFIG",
            ErrorKind::Io => "IO",
            ErrorKind::Parse => "PARSE",
            ErrorKind::Schema => "SCHEMA",
            ErrorKind::Mapping => "MAPPING",
            ErrorKind::Contract => "CONTRACT",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Network => "NETWORK",
        };
        f.write_str(s)
    }
}

/// The top-level error type returned by every public entry point in this
/// workspace. Carries a human message, the error kind, the last row seen
/// (when the failure happened while iterating a source), and an optional
/// underlying cause.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub last_row: Option<u64>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            last_row: None,
            source: None,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema, message)
    }

    pub fn mapping(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Mapping, message)
    }

    pub fn contract(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Contract, message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    /// Attaches the last row number seen before this error occurred.
    pub fn at_row(mut self, row: u64) -> Self {
        self.last_row = Some(row);
        self
    }

    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::io(err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::parse(err.to_string()).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = Error::parse("short row").at_row(7);
        assert_eq!(err.to_string(), "PARSE: short row");
        assert_eq!(err.last_row, Some(7));
    }
}
