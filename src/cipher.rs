use std::fmt;
use std::sync::Arc;

use log::{debug, trace};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

use crate::backend::{self, Backend, BackendKind};
use crate::error::{Error, Result};
use crate::modes::Engine;
use crate::options::Options;
use crate::params::{self, ModeConfig};
use crate::{BLOCK_SIZE, Direction, Mode};

/// Lifecycle of a [`Cipher`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// Constructed; nothing processed yet.
    Created,
    /// Associated data has been supplied (authenticated modes only).
    Updating,
    /// At least one `encrypt`/`decrypt` call has been made.
    Processing,
    /// Finalized or closed. The backend handle has been released.
    Closed,
}

/// A configured cipher instance: one mode, one direction, one key.
///
/// Every mode shares the same contract:
/// - `update` feeds associated data (authenticated modes, before any payload),
/// - `encrypt` or `decrypt`, depending on the [`Direction`] chosen at construction, may be
///   called repeatedly to stream data,
/// - `digest` (encryption) or `verify` (decryption) finalizes an authenticated mode and closes
///   the instance,
/// - `close` releases the backend handle.
///
/// Any error returned by an operation also closes the instance, so the backend handle is never
/// left allocated behind a failed call. Dropping a `Cipher` releases it as well.
///
/// A `Cipher` is not meant to be shared between threads without external locking.
pub struct Cipher {
    mode: Mode,
    direction: Direction,
    backend: BackendKind,
    state: State,
    engine: Option<Engine>,
    iv: Option<Vec<u8>>,
    nonce: Option<Vec<u8>>,
}

/// Construct a cipher from a key, a mode, a direction, and mode-specific options.
///
/// `options` must not contain `"key"`.
///
/// ## Examples
/// ```
/// # fn main() -> aesmode::Result<()> {
/// use aesmode::{Direction, Mode, Options};
///
/// let key = b"Sixteen byte key";
/// let iv = aesmode::random_bytes(16)?;
///
/// let mut enc = aesmode::new(key, Mode::Cfb, Direction::Encrypt, Options::new().with("iv", &iv))?;
/// let ciphertext = enc.encrypt(b"Attack at dawn")?;
/// assert_eq!(ciphertext.len(), 14);
///
/// let mut dec = aesmode::new(key, Mode::Cfb, Direction::Decrypt, Options::new().with("iv", &iv))?;
/// assert_eq!(dec.decrypt(&ciphertext)?, b"Attack at dawn");
/// # Ok(())
/// # }
/// ```
pub fn new(key: &[u8], mode: Mode, direction: Direction, mut options: Options) -> Result<Cipher> {
    if options.contains("key") {
        return Err(Error::ConflictingParameters {
            context: "key given both as an argument and as an option",
        });
    }
    options.set("key", key);
    from_options(mode, direction, options)
}

/// Construct a cipher where the key is itself an option (`"key"`).
///
/// Checks run in order: `use_aesni`, the key's presence and type, the key length, the mode
/// options, and the option ranges. The backend is only started once all of them pass.
pub fn from_options(mode: Mode, direction: Direction, mut options: Options) -> Result<Cipher> {
    let use_aesni = options.take_bool("use_aesni")?.unwrap_or(true);
    let key = Zeroizing::new(
        options
            .take_bytes("key")?
            .ok_or(Error::MissingParameter { name: "key" })?,
    );
    mode.key_spec().validate(&key)?;

    let config = params::dispatch(mode, options)?;
    config.validate(direction)?;
    Cipher::start(&key, config, direction, backend::select(use_aesni))
}

impl Cipher {
    /// Construct from a typed [`ModeConfig`] on an explicit backend.
    pub fn with_backend(
        key: &[u8],
        config: ModeConfig,
        direction: Direction,
        backend: Arc<dyn Backend>,
    ) -> Result<Self> {
        config.mode().key_spec().validate(key)?;
        config.validate(direction)?;
        Self::start(key, config, direction, backend)
    }

    fn start(
        key: &[u8],
        config: ModeConfig,
        direction: Direction,
        backend: Arc<dyn Backend>,
    ) -> Result<Self> {
        let mode = config.mode();
        let iv = match &config {
            ModeConfig::Cbc { iv } | ModeConfig::Cfb { iv, .. } | ModeConfig::Ofb { iv } => {
                Some(iv.clone())
            }
            _ => None,
        };
        let ctr_nonce = match &config {
            ModeConfig::Ctr(ctr) => ctr.nonce().map(<[u8]>::to_vec),
            _ => None,
        };

        let engine = Engine::start(config, direction, key, &backend)?;
        let iv = iv.or_else(|| engine.iv().map(<[u8]>::to_vec));
        let nonce = ctr_nonce.or_else(|| engine.nonce().map(<[u8]>::to_vec));
        debug!(
            "constructed {mode} cipher for {direction:?} on {} backend",
            backend.kind()
        );
        Ok(Self {
            mode,
            direction,
            backend: backend.kind(),
            state: State::Created,
            engine: Some(engine),
            iv,
            nonce,
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Which backend the instance was started on.
    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// The IV for CBC, CFB, OFB, and OpenPGP (the plaintext IV, also when decrypting).
    pub fn iv(&self) -> Option<&[u8]> {
        self.iv.as_deref()
    }

    /// The nonce for CTR (the fixed counter prefix), CCM, EAX, GCM, and SIV.
    pub fn nonce(&self) -> Option<&[u8]> {
        self.nonce.as_deref()
    }

    pub fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Authenticate `aad` without encrypting it. Authenticated modes only, before any
    /// `encrypt`/`decrypt` call. For SIV each call is a separate component.
    pub fn update(&mut self, aad: &[u8]) -> Result<()> {
        self.run(|cipher| {
            if !cipher.mode.is_aead() {
                return Err(Error::InvalidState {
                    context: "update() is only available for authenticated modes",
                });
            }
            if cipher.state == State::Processing {
                return Err(Error::InvalidState {
                    context: "update() cannot follow encrypt() or decrypt()",
                });
            }
            trace!("{} update: {} bytes", cipher.mode, aad.len());
            cipher.engine()?.update(aad)?;
            cipher.state = State::Updating;
            Ok(())
        })
    }

    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.run(|cipher| {
            cipher.expect_direction(Direction::Encrypt)?;
            trace!("{} encrypt: {} bytes", cipher.mode, plaintext.len());
            let ciphertext = cipher.engine()?.encrypt(plaintext)?;
            cipher.state = State::Processing;
            Ok(ciphertext)
        })
    }

    /// Not available for SIV, which needs the tag first: use
    /// [`decrypt_and_verify`](Cipher::decrypt_and_verify).
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.run(|cipher| {
            cipher.expect_direction(Direction::Decrypt)?;
            trace!("{} decrypt: {} bytes", cipher.mode, ciphertext.len());
            let plaintext = cipher.engine()?.decrypt(ciphertext)?;
            cipher.state = State::Processing;
            Ok(plaintext)
        })
    }

    /// Finish encryption and return the tag. Closes the instance.
    pub fn digest(&mut self) -> Result<Vec<u8>> {
        let tag = self.run(|cipher| {
            cipher.expect_aead()?;
            cipher.expect_direction(Direction::Encrypt)?;
            cipher.engine()?.tag()
        })?;
        self.shutdown();
        Ok(tag)
    }

    /// Finish decryption and check `tag` in constant time. Closes the instance.
    ///
    /// Fails with [`Error::AuthFailed`] if the tag does not match, in which case any plaintext
    /// already returned must be discarded.
    pub fn verify(&mut self, tag: &[u8]) -> Result<()> {
        self.run(|cipher| {
            cipher.expect_aead()?;
            cipher.expect_direction(Direction::Decrypt)?;
            if cipher.mode == Mode::Siv {
                return Err(Error::InvalidState {
                    context: "SIV verification happens in decrypt_and_verify()",
                });
            }
            let expected = cipher.engine()?.tag()?;
            if !bool::from(expected.as_slice().ct_eq(tag)) {
                return Err(Error::AuthFailed);
            }
            Ok(())
        })?;
        self.shutdown();
        Ok(())
    }

    /// `encrypt` followed by `digest`.
    pub fn encrypt_and_digest(&mut self, plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
        let ciphertext = self.encrypt(plaintext)?;
        let tag = self.digest()?;
        Ok((ciphertext, tag))
    }

    /// `decrypt` followed by `verify`; the plaintext is only returned if the tag matches.
    pub fn decrypt_and_verify(&mut self, ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>> {
        if self.mode == Mode::Siv {
            let plaintext = self.run(|cipher| {
                cipher.expect_direction(Direction::Decrypt)?;
                trace!("{} decrypt: {} bytes", cipher.mode, ciphertext.len());
                cipher
                    .engine()?
                    .siv_open(ciphertext, tag)
                    .unwrap_or(Err(Error::InvalidState {
                        context: "engine does not match SIV mode",
                    }))
            })?;
            self.shutdown();
            return Ok(plaintext);
        }

        let mut plaintext = self.decrypt(ciphertext)?;
        if let Err(err) = self.verify(tag) {
            plaintext.zeroize();
            return Err(err);
        }
        Ok(plaintext)
    }

    /// Release the backend handle. Fails if the instance is already closed.
    pub fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::UseAfterClose);
        }
        self.shutdown();
        Ok(())
    }

    /// Run an operation on an open instance, closing it if the operation fails.
    fn run<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.is_closed() {
            return Err(Error::UseAfterClose);
        }
        let result = op(self);
        if let Err(err) = &result {
            debug!("{} cipher failed ({err}), closing", self.mode);
            self.shutdown();
        }
        result
    }

    fn engine(&mut self) -> Result<&mut Engine> {
        self.engine.as_mut().ok_or(Error::UseAfterClose)
    }

    fn expect_direction(&self, direction: Direction) -> Result<()> {
        if self.direction != direction {
            return Err(Error::InvalidState {
                context: match direction {
                    Direction::Encrypt => "encryption on a cipher created for decryption",
                    Direction::Decrypt => "decryption on a cipher created for encryption",
                },
            });
        }
        Ok(())
    }

    fn expect_aead(&self) -> Result<()> {
        if !self.mode.is_aead() {
            return Err(Error::InvalidState {
                context: "only authenticated modes can be finalized with a tag",
            });
        }
        Ok(())
    }

    /// Drop the engine, which releases every handle it owns.
    fn shutdown(&mut self) {
        if self.engine.take().is_some() {
            debug!("closed {} cipher, backend handle released", self.mode);
        }
        self.state = State::Closed;
    }
}

impl fmt::Debug for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cipher")
            .field("mode", &self.mode)
            .field("direction", &self.direction)
            .field("backend", &self.backend)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
