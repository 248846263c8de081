//! Per-mode configuration and the dispatcher that builds it from an [`Options`] bag.
//!
//! [`dispatch`] handles presence, type and defaults, and rejects names the mode does not
//! recognise. [`ModeConfig::validate`] then checks every value against its documented range.
//! Both run before any backend state exists.

use log::debug;

use crate::counter::Counter;
use crate::error::{Error, Result};
use crate::key::random_bytes;
use crate::options::{Options, Value};
use crate::{BLOCK_SIZE, Direction, Mode};

/// Tag length used by the AEAD modes when `mac_len` is not given.
pub(crate) const DEFAULT_MAC_LEN: usize = 16;

/// CFB segment size in bits when `segment_size` is absent or zero.
pub(crate) const DEFAULT_SEGMENT_SIZE: usize = 8;

/// Length of the random nonce generated for CTR mode when none is given.
const DEFAULT_CTR_NONCE_LEN: usize = BLOCK_SIZE / 2;

/// Validated configuration for exactly one mode.
#[derive(Debug)]
pub enum ModeConfig {
    Ecb,
    Cbc { iv: Vec<u8> },
    /// `segment_size` is in bits.
    Cfb { iv: Vec<u8>, segment_size: usize },
    Ofb { iv: Vec<u8> },
    Ctr(CtrConfig),
    /// 16 bytes when encrypting; the 18-byte encrypted IV when decrypting.
    OpenPgp { iv: Vec<u8> },
    Ccm(CcmConfig),
    Eax { nonce: Vec<u8>, mac_len: usize },
    Gcm { nonce: Vec<u8>, mac_len: usize },
    /// The nonce, if any, is authenticated as the last associated-data component.
    Siv { nonce: Option<Vec<u8>> },
}

/// How CTR mode produces its counter blocks.
#[derive(Debug)]
pub enum CtrConfig {
    /// `nonce || counter`, where the counter field fills the rest of the block (big-endian).
    Nonce { nonce: Vec<u8>, initial_value: u128 },
    /// An explicit counter.
    Counter(Counter),
}

impl CtrConfig {
    pub(crate) fn into_counter(self) -> Counter {
        match self {
            CtrConfig::Nonce {
                nonce,
                initial_value,
            } => Counter::new(8 * BLOCK_SIZE.saturating_sub(nonce.len()))
                .prefix(&nonce)
                .initial_value(initial_value),
            CtrConfig::Counter(counter) => counter,
        }
    }

    pub(crate) fn nonce(&self) -> Option<&[u8]> {
        match self {
            CtrConfig::Nonce { nonce, .. } => Some(nonce),
            CtrConfig::Counter(counter) => counter.nonce(),
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            CtrConfig::Nonce {
                nonce,
                initial_value,
            } => {
                if nonce.len() >= BLOCK_SIZE {
                    return Err(Error::OutOfRange {
                        name: "nonce",
                        value: nonce.len() as i128,
                        constraint: "CTR nonce must be shorter than 16 bytes",
                    });
                }
                Counter::new(8 * (BLOCK_SIZE - nonce.len()))
                    .prefix(nonce)
                    .initial_value(*initial_value)
                    .validate()
            }
            CtrConfig::Counter(counter) => counter.validate(),
        }
    }
}

/// CCM parameters. Declaring `msg_len` allows the message to be split across several calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CcmConfig {
    pub nonce: Vec<u8>,
    pub mac_len: usize,
    pub msg_len: Option<usize>,
    pub assoc_len: Option<usize>,
}

impl CcmConfig {
    /// Width in bytes of the CCM length/counter field.
    pub(crate) fn q(&self) -> usize {
        15usize.saturating_sub(self.nonce.len())
    }
}

impl ModeConfig {
    pub fn mode(&self) -> Mode {
        match self {
            ModeConfig::Ecb => Mode::Ecb,
            ModeConfig::Cbc { .. } => Mode::Cbc,
            ModeConfig::Cfb { .. } => Mode::Cfb,
            ModeConfig::Ofb { .. } => Mode::Ofb,
            ModeConfig::Ctr(_) => Mode::Ctr,
            ModeConfig::OpenPgp { .. } => Mode::OpenPgp,
            ModeConfig::Ccm(_) => Mode::Ccm,
            ModeConfig::Eax { .. } => Mode::Eax,
            ModeConfig::Gcm { .. } => Mode::Gcm,
            ModeConfig::Siv { .. } => Mode::Siv,
        }
    }

    /// Range-check every field. OpenPGP needs the direction to know the IV length.
    pub fn validate(&self, direction: Direction) -> Result<()> {
        match self {
            ModeConfig::Ecb => Ok(()),
            ModeConfig::Cbc { iv } | ModeConfig::Ofb { iv } => expect_len("iv", iv, BLOCK_SIZE),
            ModeConfig::Cfb { iv, segment_size } => {
                expect_len("iv", iv, BLOCK_SIZE)?;
                if *segment_size == 0 || segment_size % 8 != 0 || *segment_size > 8 * BLOCK_SIZE {
                    return Err(Error::OutOfRange {
                        name: "segment_size",
                        value: *segment_size as i128,
                        constraint: "must be a multiple of 8 between 8 and 128",
                    });
                }
                Ok(())
            }
            ModeConfig::OpenPgp { iv } => match direction {
                Direction::Encrypt => expect_len("iv", iv, BLOCK_SIZE),
                Direction::Decrypt => expect_len("iv", iv, BLOCK_SIZE + 2),
            },
            ModeConfig::Ctr(ctr) => ctr.validate(),
            ModeConfig::Ccm(ccm) => {
                if !(7..=13).contains(&ccm.nonce.len()) {
                    return Err(Error::OutOfRange {
                        name: "nonce",
                        value: ccm.nonce.len() as i128,
                        constraint: "CCM nonce must be 7 to 13 bytes",
                    });
                }
                if ccm.mac_len % 2 != 0 || !(4..=16).contains(&ccm.mac_len) {
                    return Err(Error::OutOfRange {
                        name: "mac_len",
                        value: ccm.mac_len as i128,
                        constraint: "must be even and between 4 and 16",
                    });
                }
                if let Some(msg_len) = ccm.msg_len {
                    let q = ccm.q();
                    if q < 8 && (msg_len as u64) >> (8 * q) != 0 {
                        return Err(Error::OutOfRange {
                            name: "msg_len",
                            value: msg_len as i128,
                            constraint: "does not fit the length field left by the nonce",
                        });
                    }
                }
                Ok(())
            }
            ModeConfig::Eax { nonce, mac_len } | ModeConfig::Gcm { nonce, mac_len } => {
                if nonce.is_empty() {
                    return Err(Error::OutOfRange {
                        name: "nonce",
                        value: 0,
                        constraint: "must not be empty",
                    });
                }
                if !(4..=16).contains(mac_len) {
                    return Err(Error::OutOfRange {
                        name: "mac_len",
                        value: *mac_len as i128,
                        constraint: "must be between 4 and 16",
                    });
                }
                Ok(())
            }
            ModeConfig::Siv { nonce } => match nonce {
                Some(n) if n.is_empty() => Err(Error::OutOfRange {
                    name: "nonce",
                    value: 0,
                    constraint: "must not be empty when provided",
                }),
                _ => Ok(()),
            },
        }
    }
}

fn expect_len(name: &'static str, value: &[u8], len: usize) -> Result<()> {
    if value.len() != len {
        return Err(Error::OutOfRange {
            name,
            value: value.len() as i128,
            constraint: match len {
                16 => "must be 16 bytes long",
                _ => "must be 18 bytes long (the encrypted IV)",
            },
        });
    }
    Ok(())
}

fn required<T>(value: Option<T>, name: &'static str) -> Result<T> {
    value.ok_or(Error::MissingParameter { name })
}

/// `iv` and its alias `IV`.
fn take_iv(options: &mut Options) -> Result<Option<Vec<u8>>> {
    match (options.take_bytes("iv")?, options.take_bytes("IV")?) {
        (Some(_), Some(_)) => Err(Error::ConflictingParameters {
            context: "'iv' and 'IV' are the same option; supply only one",
        }),
        (lower, upper) => Ok(lower.or(upper)),
    }
}

fn take_ctr(options: &mut Options) -> Result<CtrConfig> {
    let counter = options.take_counter("counter")?;
    let nonce = options.take_bytes("nonce")?;
    let initial_value = options.take_raw("initial_value");

    if let Some(counter) = counter {
        if nonce.is_some() || initial_value.is_some() {
            return Err(Error::ConflictingParameters {
                context: "'counter' cannot be combined with 'nonce' or 'initial_value'",
            });
        }
        return Ok(CtrConfig::Counter(counter));
    }

    let nonce = match nonce {
        Some(nonce) => nonce,
        None => random_bytes(DEFAULT_CTR_NONCE_LEN)?,
    };
    let initial_value = match initial_value {
        None => 0,
        Some(Value::Int(i)) => u128::try_from(i).map_err(|_| Error::OutOfRange {
            name: "initial_value",
            value: i128::from(i),
            constraint: "must not be negative",
        })?,
        Some(Value::Bytes(b)) => {
            if b.len() != BLOCK_SIZE.saturating_sub(nonce.len()) {
                return Err(Error::OutOfRange {
                    name: "initial_value",
                    value: b.len() as i128,
                    constraint: "byte form must be exactly as long as the counter field",
                });
            }
            b.iter().fold(0u128, |acc, &byte| (acc << 8) | u128::from(byte))
        }
        Some(_) => {
            return Err(Error::InvalidType {
                name: "initial_value",
                expected: "an integer or bytes",
            });
        }
    };
    Ok(CtrConfig::Nonce {
        nonce,
        initial_value,
    })
}

/// Build the configuration for `mode` from `options`, consuming them.
///
/// Fails with a configuration error for a missing required option or any option the mode does
/// not recognise, and with a validation error for an option of the wrong type.
pub(crate) fn dispatch(mode: Mode, mut options: Options) -> Result<ModeConfig> {
    let config = match mode {
        Mode::Ecb => ModeConfig::Ecb,
        Mode::Cbc => ModeConfig::Cbc {
            iv: required(take_iv(&mut options)?, "iv")?,
        },
        Mode::Cfb => ModeConfig::Cfb {
            iv: required(take_iv(&mut options)?, "iv")?,
            segment_size: options
                .take_usize("segment_size")?
                .filter(|&bits| bits != 0)
                .unwrap_or(DEFAULT_SEGMENT_SIZE),
        },
        Mode::Ofb => ModeConfig::Ofb {
            iv: required(take_iv(&mut options)?, "iv")?,
        },
        Mode::Ctr => ModeConfig::Ctr(take_ctr(&mut options)?),
        Mode::OpenPgp => ModeConfig::OpenPgp {
            iv: required(take_iv(&mut options)?, "iv")?,
        },
        Mode::Ccm => ModeConfig::Ccm(CcmConfig {
            nonce: required(options.take_bytes("nonce")?, "nonce")?,
            mac_len: options.take_usize("mac_len")?.unwrap_or(DEFAULT_MAC_LEN),
            msg_len: options.take_usize("msg_len")?,
            assoc_len: options.take_usize("assoc_len")?,
        }),
        Mode::Eax => ModeConfig::Eax {
            nonce: required(options.take_bytes("nonce")?, "nonce")?,
            mac_len: options.take_usize("mac_len")?.unwrap_or(DEFAULT_MAC_LEN),
        },
        Mode::Gcm => ModeConfig::Gcm {
            nonce: required(options.take_bytes("nonce")?, "nonce")?,
            mac_len: options.take_usize("mac_len")?.unwrap_or(DEFAULT_MAC_LEN),
        },
        Mode::Siv => ModeConfig::Siv {
            nonce: options.take_bytes("nonce")?,
        },
        Mode::Pgp => return Err(Error::UnsupportedMode { mode }),
    };
    options.finish(mode)?;
    debug!("dispatched {mode} options");
    Ok(config)
}
