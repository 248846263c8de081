use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::resource::KeyHandle;

pub(crate) const PARALLEL_THRESHOLD: usize = 4 * 1024; // process blocks in parallel above 4 KiB
const GHASH_R: u128 = 0xE100_0000_0000_0000_0000_0000_0000_0000; // reduction constant for GHASH
const CMAC_RB: u128 = 0x87; // reduction constant for CMAC subkey doubling

/// Copy a 16-byte parameter into a block.
pub(crate) fn to_block(bytes: &[u8], name: &'static str) -> Result<[u8; 16]> {
    bytes.try_into().map_err(|_| Error::OutOfRange {
        name,
        value: bytes.len() as i128,
        constraint: "must be 16 bytes long",
    })
}

#[inline(always)]
pub(crate) fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

#[inline(always)]
pub(crate) fn xor_chunks(y: &[u8; 16], chunk: &[u8]) -> [u8; 16] {
    let mut out = *y;
    xor_in_place(&mut out, chunk);
    out
}

/// Apply `op` to every 16-byte block of `data` (whose length must be a multiple of 16),
/// in parallel once the input exceeds [`PARALLEL_THRESHOLD`].
pub(crate) fn map_blocks<F>(data: &mut [u8], op: F)
where
    F: Fn(&mut [u8; 16]) + Send + Sync,
{
    let apply = |chunk: &mut [u8]| {
        let mut block = [0u8; 16];
        block.copy_from_slice(chunk);
        op(&mut block);
        chunk.copy_from_slice(&block);
    };
    if data.len() > PARALLEL_THRESHOLD {
        data.par_chunks_exact_mut(16).for_each(apply);
    } else {
        data.chunks_exact_mut(16).for_each(apply);
    }
}

/// Reject input that is not a whole number of blocks.
pub(crate) fn check_aligned(data: &[u8], context: &'static str) -> Result<()> {
    if data.len() % 16 != 0 {
        return Err(Error::InvalidLength {
            len: data.len(),
            context,
        });
    }
    Ok(())
}

/// GF(2^128) multiply in the GHASH bit order. Constant time in both operands.
pub(crate) fn gf_mul(tag: [u8; 16], h: [u8; 16]) -> [u8; 16] {
    let x = u128::from_be_bytes(tag);
    let mut v = u128::from_be_bytes(h);
    let mut z: u128 = 0;

    // Process x bits from MSB -> LSB
    for i in 0..128 {
        let bit = (x >> (127 - i)) & 1;
        // If bit == 1, z ^= v (branchless)
        z ^= v & (0u128.wrapping_sub(bit));

        // v = v >> 1; if LSB was 1, v ^= R
        let lsb = v & 1;
        v >>= 1;
        v ^= GHASH_R & (0u128.wrapping_sub(lsb));
    }

    z.to_be_bytes()
}

/// Multiply by x in GF(2^128) with the CMAC polynomial (RFC 4493 subkey doubling).
pub(crate) fn dbl(block: &[u8; 16]) -> [u8; 16] {
    let v = u128::from_be_bytes(*block);
    let carry = v >> 127;
    ((v << 1) ^ (CMAC_RB & 0u128.wrapping_sub(carry))).to_be_bytes()
}

/// Collects arbitrary-length input into whole blocks.
#[derive(Clone, Default)]
pub(crate) struct BlockBuf {
    buf: [u8; 16],
    len: usize,
}

impl BlockBuf {
    /// Feed `data`, calling `f` on each completed block. With `hold_last`, a full block is kept
    /// back until more data arrives, so the final block is always still buffered.
    pub(crate) fn feed(
        &mut self,
        mut data: &[u8],
        hold_last: bool,
        mut f: impl FnMut(&[u8; 16]) -> Result<()>,
    ) -> Result<()> {
        while !data.is_empty() {
            if self.len == 16 {
                f(&self.buf)?;
                self.len = 0;
            }
            let take = (16 - self.len).min(data.len());
            self.buf[self.len..self.len + take].copy_from_slice(&data[..take]);
            self.len += take;
            data = &data[take..];
        }
        if !hold_last && self.len == 16 {
            f(&self.buf)?;
            self.len = 0;
        }
        Ok(())
    }

    pub(crate) fn pending(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Hand the pending partial block (zero padded) to `f`, if there is one.
    pub(crate) fn flush_padded(
        &mut self,
        f: impl FnOnce(&[u8; 16]) -> Result<()>,
    ) -> Result<()> {
        if self.len == 0 {
            return Ok(());
        }
        let mut block = [0u8; 16];
        block[..self.len].copy_from_slice(self.pending());
        self.len = 0;
        f(&block)
    }
}

/// Streaming GHASH: `s = (s ^ block) * H` over zero-padded AAD, then ciphertext.
#[derive(Clone)]
pub(crate) struct Ghash {
    h: [u8; 16],
    acc: [u8; 16],
    buf: BlockBuf,
}

impl Ghash {
    pub(crate) fn new(h: [u8; 16]) -> Self {
        Self {
            h,
            acc: [0u8; 16],
            buf: BlockBuf::default(),
        }
    }

    pub(crate) fn update(&mut self, data: &[u8]) {
        let (h, acc) = (self.h, &mut self.acc);
        // the closure never fails
        let _ = self.buf.feed(data, false, |block| {
            *acc = gf_mul(xor_chunks(acc, block), h);
            Ok(())
        });
    }

    /// Close the current section (AAD or ciphertext) by zero-padding to a block boundary.
    pub(crate) fn pad(&mut self) {
        let (h, acc) = (self.h, &mut self.acc);
        let _ = self.buf.flush_padded(|block| {
            *acc = gf_mul(xor_chunks(acc, block), h);
            Ok(())
        });
    }

    /// Pad, then absorb the `len(A) || len(C)` block (lengths in bytes, encoded in bits).
    pub(crate) fn finish(mut self, aad_len: u64, ct_len: u64) -> [u8; 16] {
        self.pad();
        let mut len = [0u8; 16];
        len[..8].copy_from_slice(&(aad_len * 8).to_be_bytes());
        len[8..].copy_from_slice(&(ct_len * 8).to_be_bytes());
        self.update(&len);
        self.acc
    }
}

/// Streaming CMAC (OMAC1, RFC 4493) under a [`KeyHandle`].
#[derive(Clone)]
pub(crate) struct Cmac {
    k1: [u8; 16],
    k2: [u8; 16],
    state: [u8; 16],
    buf: BlockBuf,
}

impl Cmac {
    /// Derive the subkeys `K1 = dbl(E(0))`, `K2 = dbl(K1)`.
    pub(crate) fn new(key: &KeyHandle) -> Result<Self> {
        let l = key.encrypted(&[0u8; 16])?;
        let k1 = dbl(&l);
        let k2 = dbl(&k1);
        Ok(Self {
            k1,
            k2,
            state: [0u8; 16],
            buf: BlockBuf::default(),
        })
    }

    /// A fresh MAC sharing these subkeys.
    pub(crate) fn fresh(&self) -> Self {
        Self {
            state: [0u8; 16],
            buf: BlockBuf::default(),
            ..self.clone()
        }
    }

    pub(crate) fn update(&mut self, key: &KeyHandle, data: &[u8]) -> Result<()> {
        let state = &mut self.state;
        self.buf.feed(data, true, |block| {
            xor_in_place(state, block);
            key.encrypt(state)
        })
    }

    /// The tag over everything fed so far. Does not consume the MAC.
    pub(crate) fn finalize(&self, key: &KeyHandle) -> Result<[u8; 16]> {
        let pending = self.buf.pending();
        let mut last = [0u8; 16];
        last[..pending.len()].copy_from_slice(pending);
        if pending.len() == 16 {
            xor_in_place(&mut last, &self.k1);
        } else {
            last[pending.len()] = 0x80;
            xor_in_place(&mut last, &self.k2);
        }
        let mut state = self.state;
        xor_in_place(&mut state, &last);
        key.encrypt(&mut state)?;
        Ok(state)
    }

    /// One-shot CMAC of `data`.
    pub(crate) fn mac(&self, key: &KeyHandle, data: &[u8]) -> Result<[u8; 16]> {
        let mut mac = self.fresh();
        mac.update(key, data)?;
        mac.finalize(key)
    }
}

/// Streaming CBC-MAC with zero padding, as used by CCM.
#[derive(Clone, Default)]
pub(crate) struct CbcMac {
    state: [u8; 16],
    buf: BlockBuf,
}

impl CbcMac {
    pub(crate) fn update(&mut self, key: &KeyHandle, data: &[u8]) -> Result<()> {
        let state = &mut self.state;
        self.buf.feed(data, false, |block| {
            xor_in_place(state, block);
            key.encrypt(state)
        })
    }

    /// Zero-pad any partial block and absorb it.
    pub(crate) fn pad(&mut self, key: &KeyHandle) -> Result<()> {
        let state = &mut self.state;
        self.buf.flush_padded(|block| {
            xor_in_place(state, block);
            key.encrypt(state)
        })
    }

    pub(crate) fn state(&self) -> [u8; 16] {
        self.state
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::Arc;

    use crate::backend::{Backend, Portable};
    use crate::resource::KeyHandle;

    pub fn hex_to_bytes(s: &str) -> Vec<u8> {
        let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        assert!(s.len() % 2 == 0, "hex string must have even length");
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    pub fn hex_to_arr_16(hex: &str) -> [u8; 16] {
        let v = hex_to_bytes(hex);
        assert_eq!(v.len(), 16);
        let mut out = [0u8; 16];
        out.copy_from_slice(&v);
        out
    }

    /// A portable-backend key handle for mode-level tests.
    pub fn portable_key(key: &[u8]) -> KeyHandle {
        let backend: Arc<dyn Backend> = Arc::new(Portable);
        KeyHandle::acquire(&backend, key).unwrap()
    }

    // all test vectors from
    // https://nvlpubs.nist.gov/nistpubs/Legacy/SP/nistspecialpublication800-38a.pdf
    pub const PLAINTEXT: [u8; 64] = [
        0x6b, 0xc1, 0xbe, 0xe2, 0x2e, 0x40, 0x9f, 0x96, //
        0xe9, 0x3d, 0x7e, 0x11, 0x73, 0x93, 0x17, 0x2a, //
        0xae, 0x2d, 0x8a, 0x57, 0x1e, 0x03, 0xac, 0x9c, //
        0x9e, 0xb7, 0x6f, 0xac, 0x45, 0xaf, 0x8e, 0x51, //
        0x30, 0xc8, 0x1c, 0x46, 0xa3, 0x5c, 0xe4, 0x11, //
        0xe5, 0xfb, 0xc1, 0x19, 0x1a, 0x0a, 0x52, 0xef, //
        0xf6, 0x9f, 0x24, 0x45, 0xdf, 0x4f, 0x9b, 0x17, //
        0xad, 0x2b, 0x41, 0x7b, 0xe6, 0x6c, 0x37, 0x10, //
    ];

    pub const KEY_128: [u8; 16] = [
        0x2b, 0x7e, 0x15, 0x16, 0x28, 0xae, 0xd2, 0xa6, //
        0xab, 0xf7, 0x15, 0x88, 0x09, 0xcf, 0x4f, 0x3c, //
    ];

    pub const KEY_192: [u8; 24] = [
        0x8e, 0x73, 0xb0, 0xf7, 0xda, 0x0e, 0x64, 0x52, //
        0xc8, 0x10, 0xf3, 0x2b, 0x80, 0x90, 0x79, 0xe5, //
        0x62, 0xf8, 0xea, 0xd2, 0x52, 0x2c, 0x6b, 0x7b, //
    ];

    pub const KEY_256: [u8; 32] = [
        0x60, 0x3d, 0xeb, 0x10, 0x15, 0xca, 0x71, 0xbe, //
        0x2b, 0x73, 0xae, 0xf0, 0x85, 0x7d, 0x77, 0x81, //
        0x1f, 0x35, 0x2c, 0x07, 0x3b, 0x61, 0x08, 0xd7, //
        0x2d, 0x98, 0x10, 0xa3, 0x09, 0x14, 0xdf, 0xf4, //
    ];

    /// IV shared by the CBC, CFB and OFB examples.
    pub const IV: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, //
        0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e, 0x0f, //
    ];

    /// Initial counter block of the CTR examples.
    pub const CTR_BLOCK: [u8; 16] = [
        0xf0, 0xf1, 0xf2, 0xf3, 0xf4, 0xf5, 0xf6, 0xf7, //
        0xf8, 0xf9, 0xfa, 0xfb, 0xfc, 0xfd, 0xfe, 0xff, //
    ];
}
