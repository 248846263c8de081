//! AES modes of operation over interchangeable block backends.
//!
//! A [`Cipher`] is built from a key, a [`Mode`], a [`Direction`], and a set of mode-specific
//! [`Options`]. Construction validates everything before any backend state is allocated, picks
//! the AES-NI backend when the CPU supports it (falling back to a portable implementation
//! otherwise), and returns an engine exposing the same `update` / `encrypt` / `decrypt` /
//! `digest` / `verify` / `close` contract for every mode.
//!
//! ```
//! # fn main() -> aesmode::Result<()> {
//! use aesmode::{Direction, Mode, Options};
//!
//! let key = b"Sixteen byte key";
//! let nonce = aesmode::random_bytes(11)?;
//!
//! let mut sender = aesmode::new(key, Mode::Ccm, Direction::Encrypt,
//!     Options::new().with("nonce", &nonce))?;
//! sender.update(b"To your eyes only")?;
//! let ciphertext = sender.encrypt(b"Attack at dawn")?;
//! let tag = sender.digest()?;
//!
//! let mut receiver = aesmode::new(key, Mode::Ccm, Direction::Decrypt,
//!     Options::new().with("nonce", &nonce))?;
//! receiver.update(b"To your eyes only")?;
//! let plaintext = receiver.decrypt(&ciphertext)?;
//! receiver.verify(&tag)?;
//! assert_eq!(plaintext, b"Attack at dawn");
//! # Ok(())
//! # }
//! ```
//!
//! Nonces and IVs are the caller's to transmit, and a nonce must never be reused with the same
//! key for two different messages. The library cannot detect such reuse.

use std::fmt;

pub mod backend;
mod cipher;
mod counter;
pub mod detect;
mod error;
mod key;
mod modes;
mod options;
pub mod padding;
mod params;
mod resource;

pub use cipher::{Cipher, State, from_options, new};
pub use counter::Counter;
pub use error::{Error, ErrorKind, Result};
pub use key::{KeySpec, random_bytes, random_key};
pub use options::{Options, Value};
pub use params::{CcmConfig, CtrConfig, ModeConfig};

/// Size of an AES data block, in bytes.
pub const BLOCK_SIZE: usize = 16;

/// Permitted AES key sizes, in bytes.
pub const KEY_SIZE: [usize; 3] = [16, 24, 32];

/// Mode of operation. The discriminants are stable identifiers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Mode {
    /// Electronic codebook.
    Ecb = 1,
    /// Cipher-block chaining.
    Cbc = 2,
    /// Cipher feedback.
    Cfb = 3,
    /// Legacy PGP mode. Reserved identifier; cannot be instantiated.
    Pgp = 4,
    /// Output feedback.
    Ofb = 5,
    /// Counter mode.
    Ctr = 6,
    /// OpenPGP CFB variant (RFC 4880).
    OpenPgp = 7,
    /// Counter with CBC-MAC (NIST SP 800-38C).
    Ccm = 8,
    /// EAX.
    Eax = 9,
    /// Synthetic initialization vector (RFC 5297).
    Siv = 10,
    /// Galois/counter mode (NIST SP 800-38D).
    Gcm = 11,
}

impl Mode {
    /// Whether the mode authenticates data (supports `update`, `digest`, `verify`).
    pub fn is_aead(self) -> bool {
        matches!(self, Mode::Ccm | Mode::Eax | Mode::Siv | Mode::Gcm)
    }

    /// Permitted key lengths for this mode.
    pub fn key_spec(self) -> KeySpec {
        match self {
            Mode::Siv => KeySpec::Siv,
            _ => KeySpec::Standard,
        }
    }
}

impl TryFrom<u8> for Mode {
    type Error = u8;

    fn try_from(id: u8) -> std::result::Result<Self, u8> {
        Ok(match id {
            1 => Mode::Ecb,
            2 => Mode::Cbc,
            3 => Mode::Cfb,
            4 => Mode::Pgp,
            5 => Mode::Ofb,
            6 => Mode::Ctr,
            7 => Mode::OpenPgp,
            8 => Mode::Ccm,
            9 => Mode::Eax,
            10 => Mode::Siv,
            11 => Mode::Gcm,
            other => return Err(other),
        })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Ecb => "ECB",
            Mode::Cbc => "CBC",
            Mode::Cfb => "CFB",
            Mode::Pgp => "PGP",
            Mode::Ofb => "OFB",
            Mode::Ctr => "CTR",
            Mode::OpenPgp => "OpenPGP",
            Mode::Ccm => "CCM",
            Mode::Eax => "EAX",
            Mode::Siv => "SIV",
            Mode::Gcm => "GCM",
        };
        f.write_str(name)
    }
}

/// Direction of a cipher instance, fixed at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_ids_are_stable() {
        let ids = [
            (Mode::Ecb, 1),
            (Mode::Cbc, 2),
            (Mode::Cfb, 3),
            (Mode::Pgp, 4),
            (Mode::Ofb, 5),
            (Mode::Ctr, 6),
            (Mode::OpenPgp, 7),
            (Mode::Ccm, 8),
            (Mode::Eax, 9),
            (Mode::Siv, 10),
            (Mode::Gcm, 11),
        ];
        for (mode, id) in ids {
            assert_eq!(mode as u8, id);
            assert_eq!(Mode::try_from(id), Ok(mode));
        }
        assert_eq!(Mode::try_from(0), Err(0));
        assert_eq!(Mode::try_from(12), Err(12));
    }

    #[test]
    fn public_constants() {
        assert_eq!(BLOCK_SIZE, 16);
        assert_eq!(KEY_SIZE, [16, 24, 32]);
    }
}
