//! Hardware-accelerated AES using x86-64 AES-NI.
//!
//! An [`Accelerated`] value can only be obtained through [`Accelerated::load`], which succeeds
//! only when the CPU reports AES support and a FIPS-197 known-answer self test passes. On every
//! other target `load` returns `None` and callers fall back to the portable backend.

use std::sync::OnceLock;

use super::{Backend, BackendKind, BlockTransform, status};
use crate::detect;

/// The AES-NI backend. Only constructible through [`Accelerated::load`].
#[derive(Copy, Clone, Debug)]
pub struct Accelerated {
    _private: (),
}

static SELF_TEST: OnceLock<bool> = OnceLock::new();

impl Accelerated {
    /// Load the accelerated backend, or `None` if it is unusable on this machine.
    ///
    /// Never fails loudly: an unsupported CPU, a disabled probe, or a failed self test all
    /// yield `None`.
    pub fn load() -> Option<Self> {
        if !detect::aes_acceleration() {
            return None;
        }
        if *SELF_TEST.get_or_init(self_test) {
            Some(Self { _private: () })
        } else {
            None
        }
    }
}

impl Backend for Accelerated {
    fn kind(&self) -> BackendKind {
        BackendKind::Accelerated
    }

    #[cfg(target_arch = "x86_64")]
    fn start(&self, key: &[u8]) -> Result<Box<dyn BlockTransform>, u32> {
        if !matches!(key.len(), 16 | 24 | 32) {
            return Err(status::ERR_KEY_SIZE);
        }
        // SAFETY: `Accelerated` only exists after `load` confirmed AES-NI support.
        Ok(Box::new(unsafe { ni::NiKey::new(key) }))
    }

    #[cfg(not(target_arch = "x86_64"))]
    fn start(&self, _key: &[u8]) -> Result<Box<dyn BlockTransform>, u32> {
        Err(status::ERR_UNKNOWN)
    }
}

#[cfg(target_arch = "x86_64")]
fn self_test() -> bool {
    // FIPS-197 Appendix B
    const KEY: [u8; 16] = [
        0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, 0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f,
        0x3c,
    ];
    const PT: [u8; 16] = [
        0x32, 0x43, 0xf6, 0xa8, 0x88, 0x5a, 0x30, 0x8d, 0x31, 0x31, 0x98, 0xa2, 0xe0, 0x37, 0x07,
        0x34,
    ];
    const CT: [u8; 16] = [
        0x39, 0x25, 0x84, 0x1d, 0x02, 0xdc, 0x09, 0xfb, 0xdc, 0x11, 0x85, 0x97, 0x19, 0x6a, 0x0b,
        0x32,
    ];

    // SAFETY: only reached after the detector reported AES-NI support.
    let key = unsafe { ni::NiKey::new(&KEY) };
    let mut block = PT;
    key.encrypt_block(&mut block);
    let enc_ok = block == CT;
    key.decrypt_block(&mut block);
    let dec_ok = block == PT;

    if !(enc_ok && dec_ok) {
        log::warn!("AES-NI self test failed, falling back to portable AES");
    }
    enc_ok && dec_ok
}

#[cfg(not(target_arch = "x86_64"))]
fn self_test() -> bool {
    false
}

#[cfg(target_arch = "x86_64")]
mod ni {
    use core::arch::x86_64::*;

    use zeroize::Zeroize;

    use crate::backend::BlockTransform;
    use crate::backend::portable::expand_key;

    /// Encryption round keys plus the equivalent-inverse-cipher decryption keys.
    pub(super) struct NiKey {
        enc_keys: Vec<[u8; 16]>,
        dec_keys: Vec<[u8; 16]>,
    }

    impl NiKey {
        /// # Safety
        /// The CPU must support AES-NI.
        pub(super) unsafe fn new(key: &[u8]) -> Self {
            let enc_keys = expand_key(key);
            let dec_keys = unsafe { prepare_dec_keys(&enc_keys) };
            Self { enc_keys, dec_keys }
        }
    }

    impl Drop for NiKey {
        fn drop(&mut self) {
            for k in self.enc_keys.iter_mut().chain(self.dec_keys.iter_mut()) {
                k.zeroize();
            }
        }
    }

    impl BlockTransform for NiKey {
        fn encrypt_block(&self, block: &mut [u8; 16]) {
            // SAFETY: NiKey is only built once AES-NI support has been confirmed.
            unsafe { encrypt_ni(block, &self.enc_keys) }
        }

        fn decrypt_block(&self, block: &mut [u8; 16]) {
            // SAFETY: as above.
            unsafe { decrypt_ni(block, &self.dec_keys) }
        }
    }

    #[inline(always)]
    unsafe fn load(block: &[u8; 16]) -> __m128i {
        unsafe { _mm_loadu_si128(block.as_ptr().cast()) }
    }

    /// dec[0] = enc[Nr], dec[i] = InvMixColumns(enc[Nr - i]), dec[Nr] = enc[0].
    #[target_feature(enable = "aes")]
    unsafe fn prepare_dec_keys(enc_keys: &[[u8; 16]]) -> Vec<[u8; 16]> {
        let rounds = enc_keys.len() - 1;
        let mut dec = vec![[0u8; 16]; rounds + 1];
        dec[0] = enc_keys[rounds];
        for i in 1..rounds {
            unsafe {
                let dk = _mm_aesimc_si128(load(&enc_keys[rounds - i]));
                _mm_storeu_si128(dec[i].as_mut_ptr().cast(), dk);
            }
        }
        dec[rounds] = enc_keys[0];
        dec
    }

    #[target_feature(enable = "aes")]
    unsafe fn encrypt_ni(block: &mut [u8; 16], keys: &[[u8; 16]]) {
        let rounds = keys.len() - 1;
        unsafe {
            let mut state = _mm_xor_si128(load(block), load(&keys[0]));
            for k in &keys[1..rounds] {
                state = _mm_aesenc_si128(state, load(k));
            }
            state = _mm_aesenclast_si128(state, load(&keys[rounds]));
            _mm_storeu_si128(block.as_mut_ptr().cast(), state);
        }
    }

    #[target_feature(enable = "aes")]
    unsafe fn decrypt_ni(block: &mut [u8; 16], keys: &[[u8; 16]]) {
        let rounds = keys.len() - 1;
        unsafe {
            let mut state = _mm_xor_si128(load(block), load(&keys[0]));
            for k in &keys[1..rounds] {
                state = _mm_aesdec_si128(state, load(k));
            }
            state = _mm_aesdeclast_si128(state, load(&keys[rounds]));
            _mm_storeu_si128(block.as_mut_ptr().cast(), state);
        }
    }
}
