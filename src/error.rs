//! Error types for the httpreverse crate.

use std::fmt;

use thiserror::Error;

/// Why a callable reference could not be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CallableErrorKind {
    /// The reference is not of the form `module:name`.
    BadFormat,
    /// No module with that path is registered.
    ModuleNotFound,
    /// The module exists but does not export the name.
    NameNotFound,
    /// The name resolves to a generator where a parser was expected, or vice versa.
    KindMismatch,
}

impl fmt::Display for CallableErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::BadFormat => "bad format (expected module:name)",
            Self::ModuleNotFound => "module not found",
            Self::NameNotFound => "name not found",
            Self::KindMismatch => "wrong callable kind",
        };
        f.write_str(text)
    }
}

/// Errors that abort resolution of a single operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("operation not found: {name}")]
    OperationNotFound { name: String },

    #[error("template not found: {name}")]
    TemplateNotFound { name: String },

    #[error("context not found: {name}")]
    ContextNotFound { name: String },

    #[error("parameter {0} not found in given context")]
    MissingContextParameter(String),

    #[error("unsupported marshal type: {0}")]
    UnsupportedMarshalType(String),

    #[error("no marshal type for structured {field} (set a typed value or defaults.{setting})")]
    MissingDefaultMarshalType {
        field: String,
        setting: &'static str,
    },

    #[error("XML document must have exactly one root element")]
    XmlRoot,

    #[error("failed to marshal {field}: {message}")]
    Marshal { field: String, message: String },

    #[error("operation {operation} is missing request.{field}")]
    MissingField {
        operation: String,
        field: &'static str,
    },

    #[error("cannot resolve callable {reference}: {kind}")]
    CallableReference {
        kind: CallableErrorKind,
        reference: String,
    },

    #[error("invalid API spec document")]
    InvalidStore(#[source] serde_json::Error),

    #[error("request generator {reference} failed")]
    Generator {
        reference: String,
        #[source]
        source: ParseError,
    },
}

impl ResolveError {
    pub(crate) fn callable(kind: CallableErrorKind, reference: &str) -> Self {
        Self::CallableReference {
            kind,
            reference: reference.to_string(),
        }
    }
}

/// Errors raised by bound response parsers and request generators.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("invalid JSON")]
    Json(#[source] serde_json::Error),

    #[error("invalid XML: {0}")]
    Xml(String),
}

/// Errors that can occur while sending a resolved operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("unsupported HTTP method: {method}")]
    UnsupportedMethod { method: String },

    #[error("HTTP request failed")]
    RequestFailed(#[source] reqwest::Error),

    #[error("failed to read response body")]
    ResponseRead(#[source] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpError {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse response")]
    Parse(#[source] ParseError),
}
