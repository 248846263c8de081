use crate::counter::Counter;
use crate::error::Result;
use crate::modes::ctr::CtrStream;
use crate::modes::util::{Cmac, xor_in_place};
use crate::resource::KeyHandle;

/// EAX (Bellare, Rogaway, Wagner).
///
/// Three tweaked CMACs, `OMAC_t(x) = CMAC(t as a block || x)`: the nonce MAC (t = 0) seeds a
/// full-width CTR keystream, the header MAC (t = 1) covers associated data, and the
/// ciphertext MAC (t = 2) covers the ciphertext. The tag is the XOR of all three.
pub(crate) struct Eax {
    key: KeyHandle,
    nonce: Vec<u8>,
    nonce_mac: [u8; 16],
    header: Cmac,
    body: Cmac,
    stream: CtrStream,
    mac_len: usize,
}

fn tweaked(base: &Cmac, key: &KeyHandle, tweak: u8) -> Result<Cmac> {
    let mut mac = base.fresh();
    let mut block = [0u8; 16];
    block[15] = tweak;
    mac.update(key, &block)?;
    Ok(mac)
}

impl Eax {
    pub(crate) fn new(key: KeyHandle, nonce: Vec<u8>, mac_len: usize) -> Result<Self> {
        let base = Cmac::new(&key)?;
        let mut nonce_omac = tweaked(&base, &key, 0)?;
        nonce_omac.update(&key, &nonce)?;
        let nonce_mac = nonce_omac.finalize(&key)?;

        let header = tweaked(&base, &key, 1)?;
        let body = tweaked(&base, &key, 2)?;
        let stream = CtrStream::new(
            Counter::new(128)
                .initial_value(u128::from_be_bytes(nonce_mac))
                .allow_wraparound(true),
        );
        Ok(Self {
            key,
            nonce,
            nonce_mac,
            header,
            body,
            stream,
            mac_len,
        })
    }

    pub(crate) fn nonce(&self) -> &[u8] {
        &self.nonce
    }

    pub(crate) fn update(&mut self, aad: &[u8]) -> Result<()> {
        self.header.update(&self.key, aad)
    }

    pub(crate) fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let ciphertext = self.stream.apply(&self.key, plaintext)?;
        self.body.update(&self.key, &ciphertext)?;
        Ok(ciphertext)
    }

    pub(crate) fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.body.update(&self.key, ciphertext)?;
        self.stream.apply(&self.key, ciphertext)
    }

    pub(crate) fn tag(&mut self) -> Result<Vec<u8>> {
        let mut tag = self.nonce_mac;
        xor_in_place(&mut tag, &self.header.finalize(&self.key)?);
        xor_in_place(&mut tag, &self.body.finalize(&self.key)?);
        Ok(tag[..self.mac_len].to_vec())
    }
}
