//! Error taxonomy for swctl
//!
//! Every core action returns [`Error`]. The kinds mirror how callers react:
//! `AlreadyExists` and `NotFound` are the only ones recovered locally (on
//! idempotent creates and deletes), everything else is surfaced to the CLI
//! with a short message.

/// Result alias used throughout the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by swctl actions
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("kubernetes cluster is not reachable: {0}")]
    Unreachable(String),

    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: String, name: String },

    #[error("conflict updating {kind} '{name}': {message}")]
    Conflict {
        kind: String,
        name: String,
        message: String,
    },

    #[error("timed out {0}")]
    Timeout(String),

    #[error("{0}")]
    BadInput(String),

    #[error("chart '{chart}' is not installable: {reason}")]
    ChartIncompatible { chart: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn already_exists(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::AlreadyExists {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Error::BadInput(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Re-label a `NotFound` with a more specific kind, leaving other kinds untouched
    pub fn with_kind(self, kind: &str) -> Self {
        match self {
            Error::NotFound { name, .. } => Error::not_found(kind, name),
            Error::AlreadyExists { name, .. } => Error::already_exists(kind, name),
            Error::Conflict { name, message, .. } => Error::Conflict {
                kind: kind.to_string(),
                name,
                message,
            },
            other => other,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Other(err.into())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Other(err.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Other(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("sitewhere instance", "sitewhere");
        assert_eq!(err.to_string(), "sitewhere instance 'sitewhere' not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_with_kind_relabels() {
        let err = Error::not_found("instances", "demo").with_kind("sitewhere instance");
        assert_eq!(err.to_string(), "sitewhere instance 'demo' not found");

        let err = Error::Timeout("waiting".into()).with_kind("x");
        assert!(matches!(err, Error::Timeout(_)));
    }
}
