use crate::error::Result;
use crate::modes::util::{check_aligned, xor_in_place};
use crate::resource::KeyHandle;

/// Cipher-block chaining. The chaining value carries across calls, so a message may be split
/// at any block boundary.
pub(crate) struct Cbc {
    key: KeyHandle,
    chain: [u8; 16],
}

impl Cbc {
    pub(crate) fn new(key: KeyHandle, iv: [u8; 16]) -> Self {
        Self { key, chain: iv }
    }

    pub(crate) fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        check_aligned(plaintext, "CBC data must be a multiple of 16 bytes")?;
        let mut out = Vec::with_capacity(plaintext.len());
        for block in plaintext.chunks_exact(16) {
            xor_in_place(&mut self.chain, block);
            self.key.encrypt(&mut self.chain)?;
            out.extend_from_slice(&self.chain);
        }
        Ok(out)
    }

    pub(crate) fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        check_aligned(ciphertext, "CBC data must be a multiple of 16 bytes")?;
        let mut out = Vec::with_capacity(ciphertext.len());
        for block in ciphertext.chunks_exact(16) {
            let mut plain = [0u8; 16];
            plain.copy_from_slice(block);
            self.key.decrypt(&mut plain)?;
            xor_in_place(&mut plain, &self.chain);
            self.chain.copy_from_slice(block);
            out.extend_from_slice(&plain);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::util::test_util::{IV, KEY_128, KEY_256, PLAINTEXT, hex_to_bytes, portable_key};

    #[test]
    fn aes_cbc_128() -> Result<()> {
        let expected = hex_to_bytes(
            "7649abac8119b246cee98e9b12e9197d\
             5086cb9b507219ee95db113a917678b2\
             73bed6b8e3c1743b7116e69e22229516\
             3ff1caa1681fac09120eca307586e1a7",
        );
        let mut enc = Cbc::new(portable_key(&KEY_128), IV);
        assert_eq!(enc.encrypt(&PLAINTEXT)?, expected);

        let mut dec = Cbc::new(portable_key(&KEY_128), IV);
        assert_eq!(dec.decrypt(&expected)?, PLAINTEXT);
        Ok(())
    }

    #[test]
    fn aes_cbc_256_split_across_calls() -> Result<()> {
        let expected = hex_to_bytes(
            "f58c4c04d6e5f1ba779eabfb5f7bfbd6\
             9cfc4e967edb808d679f777bc6702c7d\
             39f23369a9d9bacfa530e26304231461\
             b2eb05e2c39be9fcda6c19078c6a9d1b",
        );
        let mut enc = Cbc::new(portable_key(&KEY_256), IV);
        let mut ct = enc.encrypt(&PLAINTEXT[..16])?;
        ct.extend(enc.encrypt(&PLAINTEXT[16..])?);
        assert_eq!(ct, expected);

        let mut dec = Cbc::new(portable_key(&KEY_256), IV);
        let mut pt = dec.decrypt(&expected[..48])?;
        pt.extend(dec.decrypt(&expected[48..])?);
        assert_eq!(pt, PLAINTEXT);
        Ok(())
    }

    #[test]
    fn rejects_partial_block() {
        let mut cbc = Cbc::new(portable_key(&KEY_128), IV);
        assert!(cbc.encrypt(b"Attack at dawn").is_err());
    }
}
