use std::fmt;
use std::io;
use isahc::{ error::ErrorKind, http::StatusCode };

/// Result of a single GET attempt. Attempt failures are data, never errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Timeout,
    ConnectionError,
    Other(String), // short diagnostic, e.g. "HTTP 503"
}

/// Tally bucket an [`Outcome`] is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Success,
    Timeout,
    ConnectionError,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Success,
        Category::Timeout,
        Category::ConnectionError,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Success => "200 OK",
            Category::Timeout => "Timeouts",
            Category::ConnectionError => "Conn Errors",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Outcome {
    /// Classify a response that arrived in full.
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::OK {
            Outcome::Success
        } else {
            Outcome::Other(format!("HTTP {}", status.as_u16()))
        }
    }

    /// Classify a failure reported by the client before a response was available.
    pub fn from_error(err: &isahc::Error) -> Self {
        match err.kind() {
            ErrorKind::Timeout => Outcome::Timeout,
            // ProtocolViolation covers a peer that closes without sending a response
            ErrorKind::ConnectionFailed
            | ErrorKind::NameResolution
            | ErrorKind::Io
            | ErrorKind::ProtocolViolation => Outcome::ConnectionError,
            _ => Outcome::Other(err.to_string()),
        }
    }

    /// Classify a failure while reading the response body.
    pub fn from_body_error(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::TimedOut => Outcome::Timeout,
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Outcome::ConnectionError,
            _ => Outcome::Other(format!("body read failed: {}", err)),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Outcome::Success => Category::Success,
            Outcome::Timeout => Category::Timeout,
            Outcome::ConnectionError => Category::ConnectionError,
            Outcome::Other(_) => Category::Other,
        }
    }
}
