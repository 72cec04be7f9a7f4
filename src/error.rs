//! Error kinds propagated by the core pipeline.

/// Result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised by the core pipeline.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Returns the kind of error that occurred.
    #[must_use]
    pub const fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self { kind }
    }
}

impl From<meshlink_crypto::CryptoError> for Error {
    fn from(e: meshlink_crypto::CryptoError) -> Self {
        Self {
            kind: ErrorKind::CryptoFailure(e),
        }
    }
}

/// The distinct failure categories a caller may need to branch on.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    /// A crypto operation was attempted before `set_keys`.
    #[error("mesh security context is not initialized")]
    NotInitialized,
    /// A required field was missing, unparseable, or out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The addressed unicast is not in the fixture directory.
    #[error("unknown fixture 0x{0:04x}")]
    UnknownTarget(u16),
    /// No proxy connection currently reaches the fixture.
    #[error("link not ready for fixture 0x{0:04x}")]
    LinkUnready(u16),
    /// An AES-CCM/CMAC primitive failed.
    #[error("crypto failure: {0}")]
    CryptoFailure(#[from] meshlink_crypto::CryptoError),
    /// No free effect slot or timer slot was available.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),
}
