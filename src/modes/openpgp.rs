use crate::Direction;
use crate::error::{Error, Result};
use crate::modes::cfb::CfbState;
use crate::modes::util::to_block;
use crate::resource::KeyHandle;

/// OpenPGP CFB variant (RFC 4880 section 13.9).
///
/// The IV is sent encrypted: `E_cfb(0, iv || iv[14..16])`, 18 bytes. An encrypting instance
/// prefixes its first output with that block; a decrypting instance receives it as its `iv`
/// and checks the repeated bytes. The body then continues as 128-bit CFB from the last 16
/// bytes of the encrypted IV.
pub(crate) struct OpenPgp {
    key: KeyHandle,
    body: CfbState,
    iv: [u8; 16],
    pending_prefix: Option<Vec<u8>>,
}

impl OpenPgp {
    /// `iv` is 16 bytes for encryption, or the 18-byte encrypted IV for decryption.
    ///
    /// Fails with [`Error::AuthFailed`] if a received encrypted IV does not decrypt to the
    /// expected repeated-bytes pattern.
    pub(crate) fn new(key: KeyHandle, iv: &[u8], direction: Direction) -> Result<Self> {
        let mut iv_stream = CfbState::new([0u8; 16], 16);
        let (plain_iv, encrypted_iv) = match direction {
            Direction::Encrypt => {
                let iv = to_block(iv, "iv")?;
                let mut prefix = iv.to_vec();
                prefix.extend_from_slice(&iv[14..]);
                let encrypted = iv_stream.process(&key, &prefix, Direction::Encrypt)?;
                (iv, encrypted)
            }
            Direction::Decrypt => {
                if iv.len() != 18 {
                    return Err(Error::OutOfRange {
                        name: "iv",
                        value: iv.len() as i128,
                        constraint: "must be 18 bytes long (the encrypted IV)",
                    });
                }
                let plain = iv_stream.process(&key, iv, Direction::Decrypt)?;
                if plain[16..18] != plain[14..16] {
                    return Err(Error::AuthFailed);
                }
                (to_block(&plain[..16], "iv")?, iv.to_vec())
            }
        };

        let body = CfbState::new(to_block(&encrypted_iv[2..18], "iv")?, 16);
        Ok(Self {
            key,
            body,
            iv: plain_iv,
            pending_prefix: match direction {
                Direction::Encrypt => Some(encrypted_iv),
                Direction::Decrypt => None,
            },
        })
    }

    pub(crate) fn iv(&self) -> &[u8; 16] {
        &self.iv
    }

    pub(crate) fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let body = self.body.process(&self.key, plaintext, Direction::Encrypt)?;
        Ok(match self.pending_prefix.take() {
            Some(mut out) => {
                out.extend(body);
                out
            }
            None => body,
        })
    }

    pub(crate) fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.body.process(&self.key, ciphertext, Direction::Decrypt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::util::test_util::{KEY_128, PLAINTEXT, portable_key};

    const IV: [u8; 16] = *b"0123456789abcdef";

    #[test]
    fn prefix_then_body() -> Result<()> {
        let mut enc = OpenPgp::new(portable_key(&KEY_128), &IV, Direction::Encrypt)?;
        let first = enc.encrypt(&PLAINTEXT[..20])?;
        let second = enc.encrypt(&PLAINTEXT[20..])?;
        assert_eq!(first.len(), 18 + 20);
        assert_eq!(second.len(), 44);

        let mut dec = OpenPgp::new(portable_key(&KEY_128), &first[..18], Direction::Decrypt)?;
        assert_eq!(dec.iv(), &IV);
        let mut pt = dec.decrypt(&first[18..])?;
        pt.extend(dec.decrypt(&second)?);
        assert_eq!(pt, PLAINTEXT);
        Ok(())
    }

    #[test]
    fn encrypted_iv_layout() -> Result<()> {
        // the prefix is plain CFB-128 under a zero IV of iv || iv[14..16]
        let mut enc = OpenPgp::new(portable_key(&KEY_128), &IV, Direction::Encrypt)?;
        let prefix = enc.encrypt(&[])?;

        let mut reference = CfbState::new([0u8; 16], 16);
        let key = portable_key(&KEY_128);
        let expected = reference.process(&key, b"0123456789abcdefef", Direction::Encrypt)?;
        assert_eq!(prefix, expected);
        Ok(())
    }

    #[test]
    fn corrupted_iv_is_rejected() -> Result<()> {
        let mut enc = OpenPgp::new(portable_key(&KEY_128), &IV, Direction::Encrypt)?;
        let mut eiv = enc.encrypt(&[])?;
        eiv[17] ^= 0x01;
        let err = OpenPgp::new(portable_key(&KEY_128), &eiv, Direction::Decrypt).err();
        assert!(matches!(err, Some(Error::AuthFailed)));
        Ok(())
    }
}
