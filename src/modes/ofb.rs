use crate::error::Result;
use crate::modes::util::xor_in_place;
use crate::resource::KeyHandle;

/// Output feedback: the keystream is `E(iv), E(E(iv)), ...`, independent of the data.
pub(crate) struct Ofb {
    key: KeyHandle,
    keystream: [u8; 16],
    used: usize,
}

impl Ofb {
    pub(crate) fn new(key: KeyHandle, iv: [u8; 16]) -> Self {
        Self {
            key,
            keystream: iv,
            used: 16,
        }
    }

    /// Encryption and decryption are the same operation.
    pub(crate) fn apply(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = input.to_vec();
        let mut pos = 0;
        while pos < out.len() {
            if self.used == 16 {
                self.key.encrypt(&mut self.keystream)?;
                self.used = 0;
            }
            let take = (16 - self.used).min(out.len() - pos);
            xor_in_place(
                &mut out[pos..pos + take],
                &self.keystream[self.used..self.used + take],
            );
            self.used += take;
            pos += take;
        }
        Ok(out)
    }
}
