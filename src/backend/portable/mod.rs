//! Portable, table-based AES. Works on every target and is the fallback whenever the
//! accelerated backend is unavailable.

pub(crate) mod constants;
mod decryption;
mod encryption;
pub(crate) mod key_schedule;
mod util;

use zeroize::Zeroize;

use super::{Backend, BackendKind, BlockTransform, status};

pub(crate) use key_schedule::expand_key;

/// The portable software backend.
#[derive(Copy, Clone, Debug, Default)]
pub struct Portable;

/// Expanded AES round keys. Zeroized when the handle is stopped.
struct PortableKey {
    round_keys: Vec<[u8; 16]>,
}

impl Drop for PortableKey {
    fn drop(&mut self) {
        for rk in &mut self.round_keys {
            rk.zeroize();
        }
    }
}

impl BlockTransform for PortableKey {
    fn encrypt_block(&self, block: &mut [u8; 16]) {
        encryption::encrypt_block(block, &self.round_keys);
    }

    fn decrypt_block(&self, block: &mut [u8; 16]) {
        decryption::decrypt_block(block, &self.round_keys);
    }
}

impl Backend for Portable {
    fn kind(&self) -> BackendKind {
        BackendKind::Portable
    }

    fn start(&self, key: &[u8]) -> Result<Box<dyn BlockTransform>, u32> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(status::ERR_KEY_SIZE);
        }
        Ok(Box::new(PortableKey {
            round_keys: expand_key(key),
        }))
    }
}
