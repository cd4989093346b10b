use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    /// The request never got a response.
    Network(String),
    /// The server answered with a non-success status.
    Status(u16),
    Decode(String),
    Io(String),
}

impl fmt::Display for LabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelError::Network(msg) => write!(f, "label service unreachable: {msg}"),
            LabelError::Status(code) => write!(f, "label service returned HTTP {code}"),
            LabelError::Decode(msg) => write!(f, "invalid label data: {msg}"),
            LabelError::Io(msg) => write!(f, "label store io error: {msg}"),
        }
    }
}

impl std::error::Error for LabelError {}

impl From<std::io::Error> for LabelError {
    fn from(err: std::io::Error) -> Self {
        LabelError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for LabelError {
    fn from(err: serde_json::Error) -> Self {
        LabelError::Decode(err.to_string())
    }
}

impl From<reqwest::Error> for LabelError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LabelError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            LabelError::Status(status.as_u16())
        } else {
            LabelError::Network(err.to_string())
        }
    }
}
