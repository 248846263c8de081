use crate::counter::{Counter, CounterBlocks};
use crate::error::Result;
use crate::modes::util::{map_blocks, xor_in_place};
use crate::resource::KeyHandle;

/// Keystream generator over a counter. Used directly by CTR mode and internally by the
/// counter-based AEAD modes (CCM, EAX, GCM, SIV).
///
/// Counter blocks are drawn sequentially (so overflow is detected in order), then encrypted
/// together; inputs above 4 KiB are encrypted in parallel. Leftover keystream from a partial
/// block is kept for the next call.
pub(crate) struct CtrStream {
    counter: CounterBlocks,
    keystream: [u8; 16],
    used: usize,
}

impl CtrStream {
    /// `counter` must already have been validated.
    pub(crate) fn new(counter: Counter) -> Self {
        Self {
            counter: counter.into_blocks(),
            keystream: [0u8; 16],
            used: 16,
        }
    }

    /// XOR `input` with the next `input.len()` bytes of keystream.
    pub(crate) fn apply(&mut self, key: &KeyHandle, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = input.to_vec();

        // drain keystream left over from the previous call
        let lead = (16 - self.used).min(out.len());
        xor_in_place(&mut out[..lead], &self.keystream[self.used..self.used + lead]);
        self.used += lead;

        let rest = &mut out[lead..];
        if rest.is_empty() {
            return Ok(out);
        }

        let num_blocks = rest.len().div_ceil(16);
        let mut keystream = self.counter.take(num_blocks)?;
        let transform = key.transform()?;
        map_blocks(&mut keystream, |block| transform.encrypt_block(block));
        xor_in_place(rest, &keystream);

        let last = (num_blocks - 1) * 16;
        self.keystream.copy_from_slice(&keystream[last..]);
        self.used = rest.len() - last;
        Ok(out)
    }
}

/// Counter mode.
pub(crate) struct Ctr {
    key: KeyHandle,
    stream: CtrStream,
}

impl Ctr {
    pub(crate) fn new(key: KeyHandle, counter: Counter) -> Self {
        Self {
            key,
            stream: CtrStream::new(counter),
        }
    }

    /// CTR is symmetric: encryption and decryption are the same operation.
    pub(crate) fn apply(&mut self, input: &[u8]) -> Result<Vec<u8>> {
        self.stream.apply(&self.key, input)
    }
}
