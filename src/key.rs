//! Key length rules ([`KeySpec`]) and random key/byte generation.

use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::{Error, Result};

/// The set of key lengths a mode accepts.
///
/// Every mode uses the standard AES lengths except SIV, whose key is two AES keys joined
/// together (one for S2V, one for CTR).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeySpec {
    /// 16, 24, or 32 bytes.
    Standard,
    /// 32, 48, or 64 bytes.
    Siv,
}

impl KeySpec {
    /// Permitted key lengths in bytes.
    pub fn lengths(self) -> &'static [usize] {
        match self {
            KeySpec::Standard => &[16, 24, 32],
            KeySpec::Siv => &[32, 48, 64],
        }
    }

    /// Whether a key of `len` bytes is permitted.
    pub fn allows(self, len: usize) -> bool {
        self.lengths().contains(&len)
    }

    /// Rejects keys whose length is outside the permitted set.
    pub fn validate(self, key: &[u8]) -> Result<()> {
        if !self.allows(key.len()) {
            return Err(Error::InvalidKeyLength {
                len: key.len(),
                expected: self.lengths(),
            });
        }
        Ok(())
    }
}

/// Fill a new buffer of `len` bytes from the OS RNG. Returns Error if OsRng fails.
pub fn random_bytes(len: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; len];
    OsRng.try_fill_bytes(&mut out)?;
    Ok(out)
}

/// Generate a random key of `len` bytes, which must be permitted by `spec`.
///
/// ## Examples
/// ```
/// # fn main() -> aesmode::Result<()> {
/// use aesmode::KeySpec;
///
/// let aes_256 = aesmode::random_key(KeySpec::Standard, 32)?;
/// assert_eq!(aes_256.len(), 32);
///
/// // SIV keys are twice as long.
/// let siv = aesmode::random_key(KeySpec::Siv, 64)?;
/// assert_eq!(siv.len(), 64);
///
/// assert!(aesmode::random_key(KeySpec::Standard, 20).is_err());
/// # Ok(())
/// # }
/// ```
pub fn random_key(spec: KeySpec, len: usize) -> Result<Vec<u8>> {
    if !spec.allows(len) {
        return Err(Error::InvalidKeyLength {
            len,
            expected: spec.lengths(),
        });
    }
    random_bytes(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn standard_lengths() {
        for len in 0..80 {
            let key = vec![0u8; len];
            let ok = matches!(len, 16 | 24 | 32);
            assert_eq!(KeySpec::Standard.validate(&key).is_ok(), ok, "len {len}");
        }
    }

    #[test]
    fn siv_lengths() {
        for len in 0..80 {
            let key = vec![0u8; len];
            let ok = matches!(len, 32 | 48 | 64);
            assert_eq!(KeySpec::Siv.validate(&key).is_ok(), ok, "len {len}");
        }
    }

    #[test]
    fn rejection_is_a_range_error() {
        let err = KeySpec::Standard.validate(&[0u8; 15]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
        assert!(matches!(err, Error::InvalidKeyLength { len: 15, .. }));
    }

    #[test]
    fn random_keys_differ() -> Result<()> {
        let a = random_key(KeySpec::Standard, 16)?;
        let b = random_key(KeySpec::Standard, 16)?;
        assert_ne!(a, b);
        Ok(())
    }
}
