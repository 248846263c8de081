use crate::error::Result;
use crate::modes::util::{check_aligned, map_blocks};
use crate::resource::KeyHandle;

/// Electronic codebook. Every block is transformed independently, so equal plaintext blocks
/// give equal ciphertext blocks. Input must be block aligned; see [`crate::padding`].
pub(crate) struct Ecb {
    key: KeyHandle,
}

impl Ecb {
    pub(crate) fn new(key: KeyHandle) -> Self {
        Self { key }
    }

    pub(crate) fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        check_aligned(plaintext, "ECB data must be a multiple of 16 bytes")?;
        let transform = self.key.transform()?;
        let mut out = plaintext.to_vec();
        map_blocks(&mut out, |block| transform.encrypt_block(block));
        Ok(out)
    }

    pub(crate) fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        check_aligned(ciphertext, "ECB data must be a multiple of 16 bytes")?;
        let transform = self.key.transform()?;
        let mut out = ciphertext.to_vec();
        map_blocks(&mut out, |block| transform.decrypt_block(block));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::util::test_util::{
        KEY_128, KEY_192, KEY_256, PLAINTEXT, hex_to_bytes, portable_key,
    };

    #[test]
    fn aes_ecb_128() -> Result<()> {
        let expected = hex_to_bytes(
            "3ad77bb40d7a3660a89ecaf32466ef97\
             f5d3d58503b9699de785895a96fdbaaf\
             43b1cd7f598ece23881b00e3ed030688\
             7b0c785e27e8ad3f8223207104725dd4",
        );
        let mut ecb = Ecb::new(portable_key(&KEY_128));
        assert_eq!(ecb.encrypt(&PLAINTEXT)?, expected);
        assert_eq!(ecb.decrypt(&expected)?, PLAINTEXT);
        Ok(())
    }

    #[test]
    fn aes_ecb_192() -> Result<()> {
        let expected = hex_to_bytes(
            "bd334f1d6e45f25ff712a214571fa5cc\
             974104846d0ad3ad7734ecb3ecee4eef\
             ef7afd2270e2e60adce0ba2face6444e\
             9a4b41ba738d6c72fb16691603c18e0e",
        );
        let mut ecb = Ecb::new(portable_key(&KEY_192));
        assert_eq!(ecb.encrypt(&PLAINTEXT)?, expected);
        Ok(())
    }

    #[test]
    fn aes_ecb_256() -> Result<()> {
        let expected = hex_to_bytes(
            "f3eed1bdb5d2a03c064b5a7e3db181f8\
             591ccb10d410ed26dc5ba74a31362870\
             b6ed21b99ca6f4f9f153e7b1beafed1d\
             23304b7a39f9f3ff067d8d8f9e24ecc7",
        );
        let mut ecb = Ecb::new(portable_key(&KEY_256));
        assert_eq!(ecb.encrypt(&PLAINTEXT)?, expected);
        assert_eq!(ecb.decrypt(&expected)?, PLAINTEXT);
        Ok(())
    }

    #[test]
    fn parallel_path_matches_serial() -> Result<()> {
        // 8 KiB crosses the parallel threshold
        let data: Vec<u8> = (0..8192u32).map(|i| (i * 7) as u8).collect();
        let mut ecb = Ecb::new(portable_key(&KEY_128));
        let bulk = ecb.encrypt(&data)?;
        let mut serial = Vec::new();
        for chunk in data.chunks(16) {
            serial.extend(ecb.encrypt(chunk)?);
        }
        assert_eq!(bulk, serial);
        Ok(())
    }

    #[test]
    fn rejects_partial_block() {
        let mut ecb = Ecb::new(portable_key(&KEY_128));
        assert!(ecb.encrypt(&[0u8; 15]).is_err());
        assert!(ecb.decrypt(&[0u8; 33]).is_err());
    }
}
