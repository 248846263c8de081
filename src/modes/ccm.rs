//! Counter with CBC-MAC (NIST SP 800-38C).
//!
//! The CBC-MAC starts with a block `B0` that encodes the tag length, whether associated data
//! is present, and the message length. The MAC therefore cannot begin until the message
//! length is known: associated data is buffered until the first `encrypt`/`decrypt` call (or
//! `digest`/`verify`), and without a declared `msg_len` the whole message has to be passed
//! in that single call.

use zeroize::Zeroize;

use crate::counter::Counter;
use crate::error::{Error, Result};
use crate::modes::ctr::CtrStream;
use crate::modes::util::{CbcMac, xor_in_place};
use crate::params::CcmConfig;
use crate::resource::KeyHandle;

pub(crate) struct Ccm {
    key: KeyHandle,
    config: CcmConfig,
    aad: Vec<u8>,
    mac: Option<CbcMac>,
    stream: CtrStream,
    s0: [u8; 16],
    processed: usize,
}

impl Ccm {
    /// The config has already been validated, so the nonce is 7 to 13 bytes.
    pub(crate) fn new(key: KeyHandle, config: CcmConfig) -> Result<Self> {
        let q = config.q();
        // A_i = flags(q - 1) || nonce || i
        let mut prefix = Vec::with_capacity(16 - q);
        prefix.push((q - 1) as u8);
        prefix.extend_from_slice(&config.nonce);

        let mut a0 = [0u8; 16];
        a0[..prefix.len()].copy_from_slice(&prefix);
        let s0 = key.encrypted(&a0)?;

        let stream = CtrStream::new(Counter::new(8 * q).prefix(&prefix).initial_value(1));
        Ok(Self {
            key,
            config,
            aad: Vec::new(),
            mac: None,
            stream,
            s0,
            processed: 0,
        })
    }

    pub(crate) fn nonce(&self) -> &[u8] {
        &self.config.nonce
    }

    pub(crate) fn update(&mut self, aad: &[u8]) -> Result<()> {
        if let Some(declared) = self.config.assoc_len {
            if self.aad.len() + aad.len() > declared {
                return Err(Error::LengthMismatch {
                    name: "assoc_len",
                    declared,
                    processed: self.aad.len() + aad.len(),
                });
            }
        }
        self.aad.extend_from_slice(aad);
        Ok(())
    }

    /// Absorb `B0` and the buffered associated data.
    fn start_mac(&mut self, msg_len: usize) -> Result<()> {
        if let Some(declared) = self.config.assoc_len {
            if declared != self.aad.len() {
                return Err(Error::LengthMismatch {
                    name: "assoc_len",
                    declared,
                    processed: self.aad.len(),
                });
            }
        }
        let q = self.config.q();
        if q < 8 && (msg_len as u64) >> (8 * q) != 0 {
            return Err(Error::InvalidLength {
                len: msg_len,
                context: "message too long for the CCM nonce length",
            });
        }

        let mut b0 = [0u8; 16];
        b0[0] = (u8::from(!self.aad.is_empty()) << 6)
            | ((((self.config.mac_len - 2) / 2) as u8) << 3)
            | (q - 1) as u8;
        b0[1..1 + self.config.nonce.len()].copy_from_slice(&self.config.nonce);
        b0[16 - q..].copy_from_slice(&(msg_len as u64).to_be_bytes()[8 - q..]);

        let mut mac = CbcMac::default();
        mac.update(&self.key, &b0)?;
        if !self.aad.is_empty() {
            mac.update(&self.key, &encode_aad_len(self.aad.len()))?;
            mac.update(&self.key, &self.aad)?;
            mac.pad(&self.key)?;
        }
        self.aad.zeroize();
        self.mac = Some(mac);
        Ok(())
    }

    /// Start the MAC if needed and enforce the declared (or implied) message length.
    fn begin(&mut self, len: usize) -> Result<()> {
        if self.mac.is_none() {
            self.start_mac(self.config.msg_len.unwrap_or(len))?;
        } else if self.config.msg_len.is_none() {
            return Err(Error::UndeclaredLength {
                context: "CCM without msg_len accepts a single encrypt/decrypt call",
            });
        }
        if let Some(declared) = self.config.msg_len {
            if self.processed + len > declared {
                return Err(Error::LengthMismatch {
                    name: "msg_len",
                    declared,
                    processed: self.processed + len,
                });
            }
        }
        self.processed += len;
        Ok(())
    }

    pub(crate) fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.begin(plaintext.len())?;
        let key = &self.key;
        if let Some(mac) = self.mac.as_mut() {
            mac.update(key, plaintext)?;
        }
        self.stream.apply(&self.key, plaintext)
    }

    pub(crate) fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.begin(ciphertext.len())?;
        let plaintext = self.stream.apply(&self.key, ciphertext)?;
        let key = &self.key;
        if let Some(mac) = self.mac.as_mut() {
            mac.update(key, &plaintext)?;
        }
        Ok(plaintext)
    }

    /// The tag, truncated to `mac_len`. Fails if a declared length was not honoured.
    pub(crate) fn tag(&mut self) -> Result<Vec<u8>> {
        if self.mac.is_none() {
            self.start_mac(self.config.msg_len.unwrap_or(0))?;
        }
        if let Some(declared) = self.config.msg_len {
            if declared != self.processed {
                return Err(Error::LengthMismatch {
                    name: "msg_len",
                    declared,
                    processed: self.processed,
                });
            }
        }
        let key = &self.key;
        let mac = self.mac.as_mut().ok_or(Error::InvalidState {
            context: "CCM MAC not started",
        })?;
        mac.pad(key)?;
        let mut tag = mac.state();
        xor_in_place(&mut tag, &self.s0);
        Ok(tag[..self.config.mac_len].to_vec())
    }
}

/// Length prefix for the associated data (SP 800-38C A.2.2).
fn encode_aad_len(len: usize) -> Vec<u8> {
    let len = len as u64;
    if len < 0xFF00 {
        (len as u16).to_be_bytes().to_vec()
    } else if len <= u64::from(u32::MAX) {
        let mut out = vec![0xFF, 0xFE];
        out.extend_from_slice(&(len as u32).to_be_bytes());
        out
    } else {
        let mut out = vec![0xFF, 0xFF];
        out.extend_from_slice(&len.to_be_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::util::test_util::{hex_to_bytes, portable_key};

    const KEY: [u8; 16] = [
        0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, //
        0x48, 0x49, 0x4a, 0x4b, 0x4c, 0x4d, 0x4e, 0x4f, //
    ];

    fn config(nonce_len: usize, mac_len: usize, msg_len: Option<usize>) -> CcmConfig {
        CcmConfig {
            nonce: (0x10..0x10 + nonce_len as u8).collect(),
            mac_len,
            msg_len,
            assoc_len: None,
        }
    }

    // SP 800-38C Appendix C examples 1 to 3
    #[test]
    fn sp800_38c_examples() -> Result<()> {
        let cases = [
            (7, 8, 4, 4, "7162015b", "4dac255d"),
            (
                8,
                16,
                16,
                6,
                "d2a1f0e051ea5f62081a7792073d593d",
                "1fc64fbfaccd",
            ),
            (
                12,
                20,
                24,
                8,
                "e3b201a9f5b71a7a9b1ceaeccd97e70b6176aad9a4428aa5",
                "484392fbc1b09951",
            ),
        ];
        for (nonce_len, aad_len, pt_len, mac_len, ct, tag) in cases {
            let aad: Vec<u8> = (0..aad_len as u8).collect();
            let pt: Vec<u8> = (0x20..0x20 + pt_len as u8).collect();

            let mut enc = Ccm::new(portable_key(&KEY), config(nonce_len, mac_len, None))?;
            enc.update(&aad)?;
            assert_eq!(enc.encrypt(&pt)?, hex_to_bytes(ct));
            assert_eq!(enc.tag()?, hex_to_bytes(tag));

            let mut dec = Ccm::new(portable_key(&KEY), config(nonce_len, mac_len, None))?;
            dec.update(&aad)?;
            assert_eq!(dec.decrypt(&hex_to_bytes(ct))?, pt);
            assert_eq!(dec.tag()?, hex_to_bytes(tag));
        }
        Ok(())
    }

    #[test]
    fn declared_msg_len_allows_streaming() -> Result<()> {
        let aad: Vec<u8> = (0..20).collect();
        let pt: Vec<u8> = (0x20..0x38).collect();

        let mut enc = Ccm::new(portable_key(&KEY), config(12, 8, Some(24)))?;
        enc.update(&aad[..7])?;
        enc.update(&aad[7..])?;
        let mut ct = enc.encrypt(&pt[..5])?;
        ct.extend(enc.encrypt(&pt[5..])?);
        assert_eq!(
            ct,
            hex_to_bytes("e3b201a9f5b71a7a9b1ceaeccd97e70b6176aad9a4428aa5")
        );
        assert_eq!(enc.tag()?, hex_to_bytes("484392fbc1b09951"));
        Ok(())
    }

    #[test]
    fn second_call_needs_msg_len() -> Result<()> {
        let mut enc = Ccm::new(portable_key(&KEY), config(11, 16, None))?;
        enc.encrypt(b"first")?;
        assert!(matches!(
            enc.encrypt(b"second"),
            Err(Error::UndeclaredLength { .. })
        ));
        Ok(())
    }

    #[test]
    fn declared_lengths_must_match() -> Result<()> {
        let mut short = Ccm::new(portable_key(&KEY), config(11, 16, Some(10)))?;
        short.encrypt(b"12345")?;
        assert!(matches!(
            short.tag(),
            Err(Error::LengthMismatch { name: "msg_len", .. })
        ));

        let mut long = Ccm::new(portable_key(&KEY), config(11, 16, Some(4)))?;
        assert!(matches!(
            long.encrypt(b"12345"),
            Err(Error::LengthMismatch { name: "msg_len", .. })
        ));

        let mut aad = Ccm::new(
            portable_key(&KEY),
            CcmConfig {
                assoc_len: Some(3),
                ..config(11, 16, None)
            },
        )?;
        aad.update(b"ab")?;
        assert!(matches!(
            aad.encrypt(b"x"),
            Err(Error::LengthMismatch { name: "assoc_len", .. })
        ));
        Ok(())
    }

    #[test]
    fn aad_length_encoding() {
        assert_eq!(encode_aad_len(8), vec![0x00, 0x08]);
        assert_eq!(encode_aad_len(0xFEFF), vec![0xFE, 0xFF]);
        assert_eq!(encode_aad_len(0xFF00), vec![0xFF, 0xFE, 0x00, 0x00, 0xFF, 0x00]);
    }
}
