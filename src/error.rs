use thiserror::Error;

/// Reasons an input path is turned away before any detection runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Expecting for image path!")]
    EmptyPath,

    #[error("This is not an image! ({0} has no extension)")]
    MissingExtension(String),

    #[error("This is not an image! (unsupported extension '{0}')")]
    UnsupportedExtension(String),
}

/// Failures while reading or running a Haar cascade.
#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("failed to read cascade file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed cascade XML: {0}")]
    Xml(String),

    #[error("missing <{element}> in {context}")]
    MissingElement { element: &'static str, context: &'static str },

    #[error("invalid number '{value}' in <{element}>")]
    InvalidNumber { element: &'static str, value: String },

    #[error("unsupported cascade: {0}")]
    Unsupported(String),

    #[error("inconsistent cascade: {0}")]
    Invalid(String),

    #[error("invalid detection parameters: {0}")]
    InvalidParams(String),
}

impl CascadeError {
    pub(crate) fn missing(element: &'static str, context: &'static str) -> Self {
        Self::MissingElement { element, context }
    }
}
