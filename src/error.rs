use rand::rand_core;
use thiserror::Error;

use crate::Mode;

/// aesmode Result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`], used by callers that only care about the class of failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required parameter is missing, unknown, or conflicting, or a declared length was not honoured.
    Configuration,
    /// A parameter has the wrong type.
    Validation,
    /// A value lies outside its documented bounds.
    Range,
    /// The block backend refused to start.
    Backend,
    /// Tag verification (or the OpenPGP IV check) failed.
    Authentication,
    /// The cipher instance has already been closed.
    UseAfterClose,
    /// The operation is not allowed in the current state or direction.
    State,
    /// The OS random number generator failed.
    Rng,
}

/// aesmode Error type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A required parameter (the key, an IV, a nonce) was not supplied.
    #[error("missing required parameter '{name}'")]
    MissingParameter { name: &'static str },

    /// Parameters were supplied that the selected mode does not recognise.
    #[error("unknown parameters for {mode} mode: {names}")]
    UnknownParameters { mode: Mode, names: String },

    /// Two parameters were supplied that cannot be used together.
    #[error("conflicting parameters: {context}")]
    ConflictingParameters { context: &'static str },

    /// The mode identifier exists but cannot be instantiated.
    #[error("{mode} mode is not supported")]
    UnsupportedMode { mode: Mode },

    /// A declared length (CCM `msg_len` / `assoc_len`) did not match the data actually processed.
    #[error("{name} declared as {declared} bytes but {processed} bytes were processed")]
    LengthMismatch {
        name: &'static str,
        declared: usize,
        processed: usize,
    },

    /// A length must be declared up front for the requested usage pattern.
    #[error("{context}")]
    UndeclaredLength { context: &'static str },

    /// A parameter was given a value of the wrong type.
    #[error("parameter '{name}' must be {expected}")]
    InvalidType {
        name: &'static str,
        expected: &'static str,
    },

    /// Attempted to instantiate a cipher with a key whose length is not permitted for the mode.
    #[error("invalid key length: {len} bytes (expected one of {expected:?})")]
    InvalidKeyLength {
        len: usize,
        expected: &'static [usize],
    },

    /// A parameter value lies outside its permitted range.
    #[error("parameter '{name}' = {value} is out of range ({constraint})")]
    OutOfRange {
        name: &'static str,
        value: i128,
        constraint: &'static str,
    },

    /// Input data did not satisfy the length requirements of the mode.
    #[error("invalid data length: {len} bytes ({context})")]
    InvalidLength { len: usize, context: &'static str },

    /// The counter space of a CTR-based mode is exhausted; continuing would reuse keystream.
    #[error("counter exhausted: continuing would repeat keystream")]
    CounterOverflow,

    /// The backend failed to start; `code` is the backend's native status code.
    #[error("error {code:#X} while instantiating the AES cipher")]
    Backend { code: u32 },

    /// Computed authentication tag did not match input tag. Ciphertext, associated data, or
    /// the tag itself has been modified, or the wrong key/nonce was used.
    #[error("authentication failed (MAC check failed)")]
    AuthFailed,

    /// The cipher has been closed (explicitly, by finalization, or after an earlier error).
    #[error("cipher instance is closed")]
    UseAfterClose,

    /// The operation is not permitted in the current state of the cipher.
    #[error("invalid operation: {context}")]
    InvalidState { context: &'static str },

    /// OS RNG failed while generating a key, IV, or nonce.
    #[error("OS RNG failed")]
    Rng(#[from] rand_core::OsError),
}

impl Error {
    /// Returns the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MissingParameter { .. }
            | Error::UnknownParameters { .. }
            | Error::ConflictingParameters { .. }
            | Error::UnsupportedMode { .. }
            | Error::LengthMismatch { .. }
            | Error::UndeclaredLength { .. } => ErrorKind::Configuration,
            Error::InvalidType { .. } => ErrorKind::Validation,
            Error::InvalidKeyLength { .. }
            | Error::OutOfRange { .. }
            | Error::InvalidLength { .. }
            | Error::CounterOverflow => ErrorKind::Range,
            Error::Backend { .. } => ErrorKind::Backend,
            Error::AuthFailed => ErrorKind::Authentication,
            Error::UseAfterClose => ErrorKind::UseAfterClose,
            Error::InvalidState { .. } => ErrorKind::State,
            Error::Rng(_) => ErrorKind::Rng,
        }
    }
}
