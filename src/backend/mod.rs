//! Block-transform backends and the selector that chooses between them.
//!
//! Both backends expose the same start/stop contract: [`Backend::start`] expands a key into an
//! opaque [`BlockTransform`] handle (or fails with a native status code), and [`Backend::stop`]
//! releases that handle. Handles produced by either backend are bit-for-bit interchangeable.

mod accelerated;
mod portable;

use std::fmt;
use std::sync::Arc;

use log::debug;

pub use accelerated::Accelerated;
pub use portable::Portable;

/// Native status codes returned by [`Backend::start`].
pub mod status {
    /// A required input was missing.
    pub const ERR_NULL: u32 = 1;
    /// The key length is not supported by the block transform.
    pub const ERR_KEY_SIZE: u32 = 6;
    /// The backend cannot run on this target.
    pub const ERR_UNKNOWN: u32 = 32;
}

/// Which implementation a backend is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// Hardware AES instructions.
    Accelerated,
    /// Table-based software AES.
    Portable,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Accelerated => "accelerated",
            BackendKind::Portable => "portable",
        })
    }
}

/// A keyed AES block transform: the opaque handle produced by [`Backend::start`].
pub trait BlockTransform: Send + Sync {
    /// Encrypt one 16-byte block in place.
    fn encrypt_block(&self, block: &mut [u8; 16]);

    /// Decrypt one 16-byte block in place.
    fn decrypt_block(&self, block: &mut [u8; 16]);
}

/// A source of [`BlockTransform`] handles.
pub trait Backend: Send + Sync {
    /// Which implementation this is.
    fn kind(&self) -> BackendKind;

    /// Expand `key` into a block transform. On failure returns the native status code
    /// (see [`status`]).
    fn start(&self, key: &[u8]) -> Result<Box<dyn BlockTransform>, u32>;

    /// Release a handle obtained from [`start`](Backend::start). Called exactly once per handle.
    fn stop(&self, handle: Box<dyn BlockTransform>) {
        drop(handle);
    }
}

/// Choose a backend.
///
/// Returns the accelerated backend when `prefer_accelerated` is set, the CPU supports it, and it
/// loads successfully; otherwise the portable backend. Passing `false` can only restrict the
/// choice, never force acceleration onto a machine without it.
pub fn select(prefer_accelerated: bool) -> Arc<dyn Backend> {
    if prefer_accelerated {
        if let Some(accel) = Accelerated::load() {
            debug!("selected accelerated AES backend");
            return Arc::new(accel);
        }
    }
    debug!("selected portable AES backend (accelerated requested: {prefer_accelerated})");
    Arc::new(Portable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect;

    #[test]
    fn override_forces_portable() {
        assert_eq!(select(false).kind(), BackendKind::Portable);
    }

    #[test]
    fn preferred_backend_follows_detection() {
        let kind = select(true).kind();
        if Accelerated::load().is_some() {
            assert_eq!(kind, BackendKind::Accelerated);
        } else {
            assert_eq!(kind, BackendKind::Portable);
        }
        if !detect::aes_acceleration() {
            assert_eq!(kind, BackendKind::Portable);
        }
    }
}
