//! Mode engines. Each engine owns the [`KeyHandle`](crate::resource::KeyHandle)(s) it was
//! started with, so dropping an engine releases its backend state.

mod cbc;
mod ccm;
mod cfb;
mod ctr;
mod eax;
mod ecb;
mod gcm;
mod ofb;
mod openpgp;
mod siv;
pub(crate) mod util;

use std::sync::Arc;

use crate::Direction;
use crate::backend::Backend;
use crate::error::{Error, Result};
use crate::params::ModeConfig;
use crate::resource::KeyHandle;

use cbc::Cbc;
use ccm::Ccm;
use cfb::Cfb;
use ctr::Ctr;
use eax::Eax;
use ecb::Ecb;
use gcm::Gcm;
use ofb::Ofb;
use openpgp::OpenPgp;
use siv::Siv;
use util::to_block;

pub(crate) enum Engine {
    Ecb(Ecb),
    Cbc(Cbc),
    Cfb(Cfb),
    Ofb(Ofb),
    Ctr(Ctr),
    OpenPgp(OpenPgp),
    Ccm(Ccm),
    Eax(Eax),
    Gcm(Gcm),
    Siv(Siv),
}

impl Engine {
    /// Start the backend for a validated config. If anything fails after a handle was
    /// acquired, the handle is dropped (and so released) before the error is returned.
    pub(crate) fn start(
        config: ModeConfig,
        direction: Direction,
        key: &[u8],
        backend: &Arc<dyn Backend>,
    ) -> Result<Self> {
        let acquire = || KeyHandle::acquire(backend, key);
        Ok(match config {
            ModeConfig::Ecb => Engine::Ecb(Ecb::new(acquire()?)),
            ModeConfig::Cbc { iv } => {
                let iv = to_block(&iv, "iv")?;
                Engine::Cbc(Cbc::new(acquire()?, iv))
            }
            ModeConfig::Cfb { iv, segment_size } => {
                let iv = to_block(&iv, "iv")?;
                Engine::Cfb(Cfb::new(acquire()?, iv, segment_size))
            }
            ModeConfig::Ofb { iv } => {
                let iv = to_block(&iv, "iv")?;
                Engine::Ofb(Ofb::new(acquire()?, iv))
            }
            ModeConfig::Ctr(ctr) => Engine::Ctr(Ctr::new(acquire()?, ctr.into_counter())),
            ModeConfig::OpenPgp { iv } => Engine::OpenPgp(OpenPgp::new(acquire()?, &iv, direction)?),
            ModeConfig::Ccm(ccm) => Engine::Ccm(Ccm::new(acquire()?, ccm)?),
            ModeConfig::Eax { nonce, mac_len } => Engine::Eax(Eax::new(acquire()?, nonce, mac_len)?),
            ModeConfig::Gcm { nonce, mac_len } => Engine::Gcm(Gcm::new(acquire()?, nonce, mac_len)?),
            ModeConfig::Siv { nonce } => {
                let (mac_key, ctr_key) = key.split_at(key.len() / 2);
                let mac_key = KeyHandle::acquire(backend, mac_key)?;
                let ctr_key = KeyHandle::acquire(backend, ctr_key)?;
                Engine::Siv(Siv::new(mac_key, ctr_key, nonce)?)
            }
        })
    }

    /// The plaintext IV, for modes where the engine derives it (OpenPGP decryption recovers it
    /// from the encrypted IV).
    pub(crate) fn iv(&self) -> Option<&[u8]> {
        match self {
            Engine::OpenPgp(pgp) => Some(pgp.iv().as_slice()),
            _ => None,
        }
    }

    pub(crate) fn nonce(&self) -> Option<&[u8]> {
        match self {
            Engine::Ccm(ccm) => Some(ccm.nonce()),
            Engine::Eax(eax) => Some(eax.nonce()),
            Engine::Gcm(gcm) => Some(gcm.nonce()),
            Engine::Siv(siv) => siv.nonce(),
            _ => None,
        }
    }

    pub(crate) fn update(&mut self, aad: &[u8]) -> Result<()> {
        match self {
            Engine::Ccm(ccm) => ccm.update(aad),
            Engine::Eax(eax) => eax.update(aad),
            Engine::Gcm(gcm) => gcm.update(aad),
            Engine::Siv(siv) => siv.update(aad),
            _ => Err(Error::InvalidState {
                context: "update() is only available for authenticated modes",
            }),
        }
    }

    pub(crate) fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match self {
            Engine::Ecb(ecb) => ecb.encrypt(plaintext),
            Engine::Cbc(cbc) => cbc.encrypt(plaintext),
            Engine::Cfb(cfb) => cfb.encrypt(plaintext),
            Engine::Ofb(ofb) => ofb.apply(plaintext),
            Engine::Ctr(ctr) => ctr.apply(plaintext),
            Engine::OpenPgp(pgp) => pgp.encrypt(plaintext),
            Engine::Ccm(ccm) => ccm.encrypt(plaintext),
            Engine::Eax(eax) => eax.encrypt(plaintext),
            Engine::Gcm(gcm) => gcm.encrypt(plaintext),
            Engine::Siv(siv) => siv.encrypt(plaintext),
        }
    }

    pub(crate) fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        match self {
            Engine::Ecb(ecb) => ecb.decrypt(ciphertext),
            Engine::Cbc(cbc) => cbc.decrypt(ciphertext),
            Engine::Cfb(cfb) => cfb.decrypt(ciphertext),
            Engine::Ofb(ofb) => ofb.apply(ciphertext),
            Engine::Ctr(ctr) => ctr.apply(ciphertext),
            Engine::OpenPgp(pgp) => pgp.decrypt(ciphertext),
            Engine::Ccm(ccm) => ccm.decrypt(ciphertext),
            Engine::Eax(eax) => eax.decrypt(ciphertext),
            Engine::Gcm(gcm) => gcm.decrypt(ciphertext),
            Engine::Siv(_) => Err(Error::InvalidState {
                context: "SIV decryption needs the tag up front; use decrypt_and_verify()",
            }),
        }
    }

    /// Compute the authentication tag over everything processed so far.
    pub(crate) fn tag(&mut self) -> Result<Vec<u8>> {
        match self {
            Engine::Ccm(ccm) => ccm.tag(),
            Engine::Eax(eax) => eax.tag(),
            Engine::Gcm(gcm) => gcm.tag(),
            Engine::Siv(siv) => siv.tag(),
            _ => Err(Error::InvalidState {
                context: "only authenticated modes produce a tag",
            }),
        }
    }

    /// SIV has to check the tag while decrypting; every other mode decrypts first.
    pub(crate) fn siv_open(&mut self, ciphertext: &[u8], tag: &[u8]) -> Option<Result<Vec<u8>>> {
        match self {
            Engine::Siv(siv) => Some(siv.decrypt_and_verify(ciphertext, tag)),
            _ => None,
        }
    }
}
