//! Synthetic initialization vector (RFC 5297).
//!
//! The key is split in two: the first half keys S2V (a CMAC-based PRF over a vector of
//! strings), the second half keys CTR. Each `update` call contributes one associated-data
//! component; the nonce, if any, is the last component. The S2V output over those components
//! and the plaintext is both the tag and the CTR starting block, so the whole plaintext must be
//! seen before any ciphertext can be produced.

use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::counter::Counter;
use crate::error::{Error, Result};
use crate::modes::ctr::CtrStream;
use crate::modes::util::{Cmac, dbl, to_block, xor_in_place};
use crate::resource::KeyHandle;

/// S2V accepts at most 127 strings, the last being the plaintext.
const MAX_COMPONENTS: usize = 126;

pub(crate) struct Siv {
    mac_key: KeyHandle,
    ctr_key: KeyHandle,
    cmac: Cmac,
    nonce: Option<Vec<u8>>,
    d: [u8; 16],
    components: usize,
    tag: Option<[u8; 16]>,
}

impl Siv {
    pub(crate) fn new(mac_key: KeyHandle, ctr_key: KeyHandle, nonce: Option<Vec<u8>>) -> Result<Self> {
        let cmac = Cmac::new(&mac_key)?;
        let d = cmac.mac(&mac_key, &[0u8; 16])?;
        Ok(Self {
            mac_key,
            ctr_key,
            cmac,
            nonce,
            d,
            components: 0,
            tag: None,
        })
    }

    pub(crate) fn nonce(&self) -> Option<&[u8]> {
        self.nonce.as_deref()
    }

    /// Absorb one associated-data component.
    pub(crate) fn update(&mut self, component: &[u8]) -> Result<()> {
        if self.components == MAX_COMPONENTS {
            return Err(Error::OutOfRange {
                name: "associated data components",
                value: (self.components + 1) as i128,
                constraint: "at most 126, counting the nonce",
            });
        }
        let mac = self.cmac.mac(&self.mac_key, component)?;
        self.d = dbl(&self.d);
        xor_in_place(&mut self.d, &mac);
        self.components += 1;
        Ok(())
    }

    fn s2v(&mut self, plaintext: &[u8]) -> Result<[u8; 16]> {
        if let Some(nonce) = self.nonce.clone() {
            self.update(&nonce)?;
        }
        let last = if plaintext.len() >= 16 {
            let mut t = plaintext.to_vec();
            let tail = t.len() - 16;
            xor_in_place(&mut t[tail..], &self.d);
            t
        } else {
            let mut t = dbl(&self.d);
            let mut padded = [0u8; 16];
            padded[..plaintext.len()].copy_from_slice(plaintext);
            padded[plaintext.len()] = 0x80;
            xor_in_place(&mut t, &padded);
            t.to_vec()
        };
        self.cmac.mac(&self.mac_key, &last)
    }

    /// CTR under the second key, starting from the tag with bits 63 and 31 cleared.
    fn keystream(&self, v: &[u8; 16], input: &[u8]) -> Result<Vec<u8>> {
        let mut q = *v;
        q[8] &= 0x7f;
        q[12] &= 0x7f;
        let counter = Counter::new(128)
            .initial_value(u128::from_be_bytes(q))
            .allow_wraparound(true);
        CtrStream::new(counter).apply(&self.ctr_key, input)
    }

    pub(crate) fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        if self.tag.is_some() {
            return Err(Error::InvalidState {
                context: "SIV encrypt() can only be called once",
            });
        }
        let v = self.s2v(plaintext)?;
        let ciphertext = self.keystream(&v, plaintext)?;
        self.tag = Some(v);
        Ok(ciphertext)
    }

    /// The tag. Without a prior `encrypt` call, the message is taken to be empty.
    pub(crate) fn tag(&mut self) -> Result<Vec<u8>> {
        let v = match self.tag {
            Some(v) => v,
            None => {
                self.encrypt(&[])?;
                self.tag.ok_or(Error::InvalidState {
                    context: "SIV tag unavailable",
                })?
            }
        };
        Ok(v.to_vec())
    }

    pub(crate) fn decrypt_and_verify(&mut self, ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>> {
        let v = to_block(tag, "tag").map_err(|_| Error::AuthFailed)?;
        let mut plaintext = self.keystream(&v, ciphertext)?;
        let expected = self.s2v(&plaintext)?;
        if !bool::from(expected.ct_eq(&v)) {
            plaintext.zeroize();
            return Err(Error::AuthFailed);
        }
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::util::test_util::{hex_to_bytes, portable_key};

    fn siv(key: &str, nonce: Option<Vec<u8>>) -> Result<Siv> {
        let key = hex_to_bytes(key);
        let (mac_key, ctr_key) = key.split_at(key.len() / 2);
        Siv::new(portable_key(mac_key), portable_key(ctr_key), nonce)
    }

    const A1_KEY: &str = "fffefdfcfbfaf9f8f7f6f5f4f3f2f1f0f0f1f2f3f4f5f6f7f8f9fafbfcfdfeff";
    const A1_AD: &str = "101112131415161718191a1b1c1d1e1f2021222324252627";
    const A1_PT: &str = "112233445566778899aabbccddee";

    // RFC 5297 A.1, deterministic authenticated encryption
    #[test]
    fn rfc5297_deterministic() -> Result<()> {
        let mut enc = siv(A1_KEY, None)?;
        enc.update(&hex_to_bytes(A1_AD))?;
        let ct = enc.encrypt(&hex_to_bytes(A1_PT))?;
        assert_eq!(ct, hex_to_bytes("40c02b9690c4dc04daef7f6afe5c"));
        assert_eq!(enc.tag()?, hex_to_bytes("85632d07c6e8f37f950acd320a2ecc93"));

        let mut dec = siv(A1_KEY, None)?;
        dec.update(&hex_to_bytes(A1_AD))?;
        let pt = dec.decrypt_and_verify(&ct, &hex_to_bytes("85632d07c6e8f37f950acd320a2ecc93"))?;
        assert_eq!(pt, hex_to_bytes(A1_PT));
        Ok(())
    }

    // RFC 5297 A.2, nonce-based authenticated encryption
    #[test]
    fn rfc5297_nonce_based() -> Result<()> {
        let key = "7f7e7d7c7b7a79787776757473727170404142434445464748494a4b4c4d4e4f";
        let nonce = hex_to_bytes("09f911029d74e35bd84156c5635688c0");
        let mut enc = siv(key, Some(nonce))?;
        enc.update(&hex_to_bytes(
            "00112233445566778899aabbccddeeffdeaddadadeaddadaffeeddccbbaa99887766554433221100",
        ))?;
        enc.update(&hex_to_bytes("102030405060708090a0"))?;
        let ct = enc.encrypt(&hex_to_bytes(
            "7468697320697320736f6d6520706c61696e7465787420746f20656e6372797074207573696e67205349562d414553",
        ))?;
        assert_eq!(enc.tag()?, hex_to_bytes("7bdb6e3b432667eb06f4d14bff2fbd0f"));
        assert_eq!(
            ct,
            hex_to_bytes(
                "cb900f2fddbe404326601965c889bf17dba77ceb094fa663b7a3f748ba8af829ea64ad544a272e9c485b62a3fd5c0d"
            )
        );
        Ok(())
    }

    #[test]
    fn encrypt_only_once() -> Result<()> {
        let mut enc = siv(A1_KEY, None)?;
        enc.encrypt(b"one")?;
        assert!(matches!(enc.encrypt(b"two"), Err(Error::InvalidState { .. })));
        Ok(())
    }

    #[test]
    fn tampering_is_detected() -> Result<()> {
        let mut enc = siv(A1_KEY, None)?;
        enc.update(&hex_to_bytes(A1_AD))?;
        let mut ct = enc.encrypt(&hex_to_bytes(A1_PT))?;
        let tag = enc.tag()?;
        ct[3] ^= 0x10;

        let mut dec = siv(A1_KEY, None)?;
        dec.update(&hex_to_bytes(A1_AD))?;
        assert!(matches!(dec.decrypt_and_verify(&ct, &tag), Err(Error::AuthFailed)));

        let mut short = siv(A1_KEY, None)?;
        assert!(matches!(short.decrypt_and_verify(&ct, &tag[..8]), Err(Error::AuthFailed)));
        Ok(())
    }

    #[test]
    fn component_limit() -> Result<()> {
        let mut enc = siv(A1_KEY, None)?;
        for _ in 0..MAX_COMPONENTS {
            enc.update(b"x")?;
        }
        assert!(enc.update(b"x").is_err());
        Ok(())
    }
}
