//! Scoped ownership of backend handles.
//!
//! A [`KeyHandle`] pairs a started [`BlockTransform`] with the backend that must stop it. The
//! handle is stopped exactly once: on [`KeyHandle::release`], or on drop if it was never
//! released. Once released, every block operation fails with [`Error::UseAfterClose`].

use std::sync::Arc;

use log::trace;

use crate::backend::{Backend, BlockTransform};
use crate::error::{Error, Result};

pub(crate) struct KeyHandle {
    backend: Arc<dyn Backend>,
    transform: Option<Box<dyn BlockTransform>>,
}

impl KeyHandle {
    /// Start the backend on `key`. The key has already been validated.
    pub(crate) fn acquire(backend: &Arc<dyn Backend>, key: &[u8]) -> Result<Self> {
        let transform = backend
            .start(key)
            .map_err(|code| Error::Backend { code })?;
        trace!("started {} backend handle", backend.kind());
        Ok(Self {
            backend: Arc::clone(backend),
            transform: Some(transform),
        })
    }

    /// The live transform, shareable across threads for bulk work.
    pub(crate) fn transform(&self) -> Result<&dyn BlockTransform> {
        self.transform.as_deref().ok_or(Error::UseAfterClose)
    }

    pub(crate) fn encrypt(&self, block: &mut [u8; 16]) -> Result<()> {
        self.transform()?.encrypt_block(block);
        Ok(())
    }

    pub(crate) fn decrypt(&self, block: &mut [u8; 16]) -> Result<()> {
        self.transform()?.decrypt_block(block);
        Ok(())
    }

    /// Encrypt a copy of `block` and return it.
    pub(crate) fn encrypted(&self, block: &[u8; 16]) -> Result<[u8; 16]> {
        let mut out = *block;
        self.encrypt(&mut out)?;
        Ok(out)
    }

    /// Stop the backend handle. Safe to call more than once; only the first call stops.
    pub(crate) fn release(&mut self) {
        if let Some(transform) = self.transform.take() {
            self.backend.stop(transform);
            trace!("stopped {} backend handle", self.backend.kind());
        }
    }
}

impl Drop for KeyHandle {
    fn drop(&mut self) {
        self.release();
    }
}
