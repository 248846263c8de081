use crate::counter::Counter;
use crate::error::{Error, Result};
use crate::modes::ctr::CtrStream;
use crate::modes::util::{Ghash, xor_chunks};
use crate::resource::KeyHandle;

/// Longest message GCM can encrypt under one nonce: 2^32 - 2 blocks.
const MAX_MESSAGE_LEN: u64 = ((1 << 32) - 2) * 16;

/*
https://csrc.nist.rip/groups/ST/toolkit/BCM/documents/proposedmodes/gcm/gcm-spec.pdf

H = block of 0s encrypted with key
start with accumulator s = 0
for each 16-byte block b:
    s = (s ^ b) * H (GF128 multiplication)

where blocks are:
    - all AAD blocks (padded)
    - all ciphertext blocks (padded)
    - one block comprised aad.len || ct.len

final tag = s ^ encrypt_block(J0, key)

where J0 is:
    - IV || 1u32 for a 12-byte IV
    - GHASH(IV padded || 0^64 || len(IV)) otherwise
and the payload is encrypted from inc32(J0) onwards
*/
/// Galois/counter mode.
pub(crate) struct Gcm {
    key: KeyHandle,
    nonce: Vec<u8>,
    ghash: Ghash,
    stream: CtrStream,
    j0_enc: [u8; 16],
    aad_len: u64,
    ct_len: u64,
    processing: bool,
    mac_len: usize,
}

impl Gcm {
    pub(crate) fn new(key: KeyHandle, nonce: Vec<u8>, mac_len: usize) -> Result<Self> {
        // generate H by encrypting block of 0s
        let h = key.encrypted(&[0u8; 16])?;

        let j0 = if nonce.len() == 12 {
            let mut j0 = [0u8; 16];
            j0[..12].copy_from_slice(&nonce);
            j0[15] = 1;
            j0
        } else {
            let mut ghash = Ghash::new(h);
            ghash.update(&nonce);
            ghash.finish(0, nonce.len() as u64)
        };
        let j0_enc = key.encrypted(&j0)?;

        // inc32: only the low 32 bits count, and they wrap
        let ctr_start = u32::from_be_bytes([j0[12], j0[13], j0[14], j0[15]]).wrapping_add(1);
        let stream = CtrStream::new(
            Counter::new(32)
                .prefix(&j0[..12])
                .initial_value(u128::from(ctr_start))
                .allow_wraparound(true),
        );

        Ok(Self {
            key,
            nonce,
            ghash: Ghash::new(h),
            stream,
            j0_enc,
            aad_len: 0,
            ct_len: 0,
            processing: false,
            mac_len,
        })
    }

    pub(crate) fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub(crate) fn update(&mut self, aad: &[u8]) -> Result<()> {
        self.ghash.update(aad);
        self.aad_len += aad.len() as u64;
        Ok(())
    }

    /// Close the AAD section and account for `len` more payload bytes.
    fn begin(&mut self, len: usize) -> Result<()> {
        if !self.processing {
            self.ghash.pad();
            self.processing = true;
        }
        let total = self.ct_len + len as u64;
        if total > MAX_MESSAGE_LEN {
            return Err(Error::CounterOverflow);
        }
        self.ct_len = total;
        Ok(())
    }

    pub(crate) fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.begin(plaintext.len())?;
        let ciphertext = self.stream.apply(&self.key, plaintext)?;
        self.ghash.update(&ciphertext);
        Ok(ciphertext)
    }

    pub(crate) fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.begin(ciphertext.len())?;
        self.ghash.update(ciphertext);
        self.stream.apply(&self.key, ciphertext)
    }

    pub(crate) fn tag(&mut self) -> Result<Vec<u8>> {
        if !self.processing {
            self.ghash.pad();
        }
        let s = self.ghash.clone().finish(self.aad_len, self.ct_len);
        // tag = E(K, J0) ^ S
        let tag = xor_chunks(&s, &self.j0_enc);
        Ok(tag[..self.mac_len].to_vec())
    }
}
