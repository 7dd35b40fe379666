use std::error::Error as StdError;
use std::fmt;
use std::fmt::{Display, Formatter};

/// Broad classification of an [`Error`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid arguments, incompatible objects or incomplete operators.
    Configuration,
    /// No backend matches a resource, or no backend in a delegation chain implements an operation.
    Resolution,
    /// A failure while executing a kernel.
    Execution,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "configuration error"),
            ErrorKind::Resolution => write!(f, "resolution error"),
            ErrorKind::Execution => write!(f, "execution error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    object: Option<String>,
}

pub type Result<R> = std::result::Result<R, Error>;

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            object: None,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolution, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Execution, message)
    }

    /// Attaches a description of the object that raised the error.
    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.object {
            Some(object) => write!(f, "{} in {}: {}", self.kind, object, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl StdError for Error {}

impl From<eyre::Report> for Error {
    fn from(report: eyre::Report) -> Self {
        Error::execution(format!("{:#}", report))
    }
}
