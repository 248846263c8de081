use crate::Direction;
use crate::error::Result;
use crate::resource::KeyHandle;

/// Cipher feedback register, shared by CFB and OpenPGP.
///
/// Each segment of `segment` bytes is XORed with the leading bytes of `E(register)`, and the
/// register then shifts left by one segment, taking in the ciphertext. Partial segments are
/// carried across calls, so data of any length can be streamed.
pub(crate) struct CfbState {
    register: [u8; 16],
    keystream: [u8; 16],
    feedback: [u8; 16],
    segment: usize,
    used: usize,
}

impl CfbState {
    /// `segment` is in bytes (1 to 16).
    pub(crate) fn new(iv: [u8; 16], segment: usize) -> Self {
        Self {
            register: iv,
            keystream: [0u8; 16],
            feedback: [0u8; 16],
            segment,
            // forces a fresh keystream block on first use
            used: segment,
        }
    }

    pub(crate) fn process(
        &mut self,
        key: &KeyHandle,
        input: &[u8],
        direction: Direction,
    ) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(input.len());
        for &byte in input {
            if self.used == self.segment {
                self.keystream = key.encrypted(&self.register)?;
                self.used = 0;
            }
            let mixed = byte ^ self.keystream[self.used];
            self.feedback[self.used] = match direction {
                Direction::Encrypt => mixed,
                Direction::Decrypt => byte,
            };
            out.push(mixed);
            self.used += 1;

            if self.used == self.segment {
                let s = self.segment;
                self.register.copy_within(s.., 0);
                self.register[16 - s..].copy_from_slice(&self.feedback[..s]);
            }
        }
        Ok(out)
    }
}

/// Cipher feedback mode with a configurable segment size.
pub(crate) struct Cfb {
    key: KeyHandle,
    state: CfbState,
}

impl Cfb {
    /// `segment_bits` has already been checked to be a multiple of 8 in `8..=128`.
    pub(crate) fn new(key: KeyHandle, iv: [u8; 16], segment_bits: usize) -> Self {
        Self {
            key,
            state: CfbState::new(iv, segment_bits / 8),
        }
    }

    pub(crate) fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.state.process(&self.key, plaintext, Direction::Encrypt)
    }

    pub(crate) fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.state.process(&self.key, ciphertext, Direction::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::util::test_util::{IV, KEY_128, KEY_192, PLAINTEXT, hex_to_bytes, portable_key};

    #[test]
    fn aes_cfb128_128() -> Result<()> {
        let expected = hex_to_bytes(
            "3b3fd92eb72dad20333449f8e83cfb4a\
             c8a64537a0b3a93fcde3cdad9f1ce58b\
             26751f67a3cbb140b1808cf187a4f4df\
             c04b05357c5d1c0eeac4c66f9ff7f2e6",
        );
        let mut enc = Cfb::new(portable_key(&KEY_128), IV, 128);
        assert_eq!(enc.encrypt(&PLAINTEXT)?, expected);

        let mut dec = Cfb::new(portable_key(&KEY_128), IV, 128);
        assert_eq!(dec.decrypt(&expected)?, PLAINTEXT);
        Ok(())
    }

    #[test]
    fn aes_cfb8_128() -> Result<()> {
        let expected = hex_to_bytes("3b79424c9c0dd436bace9e0ed4586a4f32b9");
        let mut enc = Cfb::new(portable_key(&KEY_128), IV, 8);
        assert_eq!(enc.encrypt(&PLAINTEXT[..18])?, expected);

        let mut dec = Cfb::new(portable_key(&KEY_128), IV, 8);
        assert_eq!(dec.decrypt(&expected)?, &PLAINTEXT[..18]);
        Ok(())
    }

    #[test]
    fn aes_cfb128_192_streamed_unaligned() -> Result<()> {
        let expected = hex_to_bytes(
            "cdc80d6fddf18cab34c25909c99a4174\
             67ce7f7f81173621961a2b70171d3d7a\
             2e1e8a1dd59b88b1c8e60fed1efac4c9\
             c05f9f9ca9834fa042ae8fba584b09ff",
        );
        let mut enc = Cfb::new(portable_key(&KEY_192), IV, 128);
        let mut ct = Vec::new();
        for chunk in PLAINTEXT.chunks(7) {
            ct.extend(enc.encrypt(chunk)?);
        }
        assert_eq!(ct, expected);
        Ok(())
    }

    #[test]
    fn odd_segment_sizes_round_trip() -> Result<()> {
        for bits in [16, 24, 64, 120] {
            let mut enc = Cfb::new(portable_key(&KEY_128), IV, bits);
            let ct = enc.encrypt(&PLAINTEXT[..37])?;
            let mut dec = Cfb::new(portable_key(&KEY_128), IV, bits);
            let mut pt = dec.decrypt(&ct[..5])?;
            pt.extend(dec.decrypt(&ct[5..])?);
            assert_eq!(pt, &PLAINTEXT[..37], "segment {bits}");
        }
        Ok(())
    }
}
