//! Counter blocks for CTR mode.
//!
//! A [`Counter`] describes how CTR mode builds each 16-byte input block. The structured form
//! lays out `prefix || counter || suffix`, where the counter field is `bits / 8` bytes, big- or
//! little-endian, and starts at an initial value. It refuses to hand out a block equal to the
//! first one again (the counter field has wrapped all the way round) unless wraparound was
//! explicitly allowed.
//!
//! [`Counter::custom`] accepts an arbitrary block generator instead. Custom counters are not
//! checked: if the generator repeats a block, the keystream repeats with it.

use std::fmt;

use crate::error::{Error, Result};

/// Source of CTR input blocks. See the [module docs](self).
pub struct Counter {
    kind: Kind,
}

enum Kind {
    Structured(Layout),
    Custom(Box<dyn FnMut() -> [u8; 16] + Send>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    prefix: Vec<u8>,
    suffix: Vec<u8>,
    bits: usize,
    initial_value: u128,
    little_endian: bool,
    allow_wraparound: bool,
}

impl Counter {
    /// A structured counter with a `bits`-wide counter field, no prefix or suffix, starting at 1,
    /// big-endian, with wraparound disallowed.
    ///
    /// ## Examples
    /// ```
    /// use aesmode::Counter;
    ///
    /// // 8-byte nonce followed by a 64-bit counter starting at zero
    /// let counter = Counter::new(64)
    ///     .prefix(b"\x00\x11\x22\x33\x44\x55\x66\x77")
    ///     .initial_value(0);
    /// ```
    pub fn new(bits: usize) -> Self {
        Self {
            kind: Kind::Structured(Layout {
                prefix: Vec::new(),
                suffix: Vec::new(),
                bits,
                initial_value: 1,
                little_endian: false,
                allow_wraparound: false,
            }),
        }
    }

    /// A counter driven by a caller-supplied generator. Each call must return the next 16-byte
    /// counter block. Uniqueness is entirely the caller's responsibility.
    pub fn custom<F>(generator: F) -> Self
    where
        F: FnMut() -> [u8; 16] + Send + 'static,
    {
        Self {
            kind: Kind::Custom(Box::new(generator)),
        }
    }

    /// Fixed bytes placed before the counter field. No effect on custom counters.
    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        if let Kind::Structured(layout) = &mut self.kind {
            layout.prefix = prefix.to_vec();
        }
        self
    }

    /// Fixed bytes placed after the counter field. No effect on custom counters.
    pub fn suffix(mut self, suffix: &[u8]) -> Self {
        if let Kind::Structured(layout) = &mut self.kind {
            layout.suffix = suffix.to_vec();
        }
        self
    }

    /// Value of the counter field in the first block. No effect on custom counters.
    pub fn initial_value(mut self, value: u128) -> Self {
        if let Kind::Structured(layout) = &mut self.kind {
            layout.initial_value = value;
        }
        self
    }

    /// Encode the counter field little-endian. No effect on custom counters.
    pub fn little_endian(mut self, little_endian: bool) -> Self {
        if let Kind::Structured(layout) = &mut self.kind {
            layout.little_endian = little_endian;
        }
        self
    }

    /// Permit the counter field to wrap past its initial value. No effect on custom counters.
    pub fn allow_wraparound(mut self, allow: bool) -> Self {
        if let Kind::Structured(layout) = &mut self.kind {
            layout.allow_wraparound = allow;
        }
        self
    }

    /// Whether this counter uses a caller-supplied generator.
    pub fn is_custom(&self) -> bool {
        matches!(self.kind, Kind::Custom(_))
    }

    /// The fixed prefix of a structured counter (the CTR nonce).
    pub(crate) fn nonce(&self) -> Option<&[u8]> {
        match &self.kind {
            Kind::Structured(layout) => Some(&layout.prefix),
            Kind::Custom(_) => None,
        }
    }

    /// Check that the layout describes exactly one 16-byte block and that the initial value
    /// fits in the counter field.
    pub(crate) fn validate(&self) -> Result<()> {
        let Kind::Structured(layout) = &self.kind else {
            return Ok(());
        };
        if layout.bits == 0 || layout.bits % 8 != 0 || layout.bits > 128 {
            return Err(Error::OutOfRange {
                name: "counter bits",
                value: layout.bits as i128,
                constraint: "must be a non-zero multiple of 8, at most 128",
            });
        }
        let total = layout.prefix.len() + layout.bits / 8 + layout.suffix.len();
        if total != 16 {
            return Err(Error::OutOfRange {
                name: "counter block size",
                value: total as i128,
                constraint: "prefix, counter and suffix must total 16 bytes",
            });
        }
        if layout.initial_value & !mask(layout.bits) != 0 {
            return Err(Error::OutOfRange {
                name: "initial_value",
                value: i128::try_from(layout.initial_value).unwrap_or(i128::MAX),
                constraint: "must fit in the counter field",
            });
        }
        Ok(())
    }

    /// Turn the description into a live block generator. The counter must have been validated.
    pub(crate) fn into_blocks(self) -> CounterBlocks {
        match self.kind {
            Kind::Structured(layout) => CounterBlocks::Structured {
                next: layout.initial_value,
                mask: mask(layout.bits),
                exhausted: false,
                layout,
            },
            Kind::Custom(generator) => CounterBlocks::Custom(generator),
        }
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Structured(layout) => f
                .debug_struct("Counter")
                .field("prefix", &layout.prefix)
                .field("suffix", &layout.suffix)
                .field("bits", &layout.bits)
                .field("initial_value", &layout.initial_value)
                .field("little_endian", &layout.little_endian)
                .field("allow_wraparound", &layout.allow_wraparound)
                .finish(),
            Kind::Custom(_) => f.write_str("Counter(custom)"),
        }
    }
}

fn mask(bits: usize) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/// A running counter, consumed one block at a time.
pub(crate) enum CounterBlocks {
    Structured {
        layout: Layout,
        next: u128,
        mask: u128,
        exhausted: bool,
    },
    Custom(Box<dyn FnMut() -> [u8; 16] + Send>),
}

impl CounterBlocks {
    /// The next counter block, or [`Error::CounterOverflow`] once the counter field has come
    /// back round to its initial value.
    pub(crate) fn next_block(&mut self) -> Result<[u8; 16]> {
        match self {
            CounterBlocks::Custom(generator) => Ok(generator()),
            CounterBlocks::Structured {
                layout,
                next,
                mask,
                exhausted,
            } => {
                if *exhausted {
                    return Err(Error::CounterOverflow);
                }
                let width = layout.bits / 8;
                let field = if layout.little_endian {
                    next.to_le_bytes()[..width].to_vec()
                } else {
                    next.to_be_bytes()[16 - width..].to_vec()
                };

                let mut block = [0u8; 16];
                let (head, tail) = block.split_at_mut(layout.prefix.len());
                head.copy_from_slice(&layout.prefix);
                tail[..width].copy_from_slice(&field);
                tail[width..].copy_from_slice(&layout.suffix);

                *next = next.wrapping_add(1) & *mask;
                if *next == layout.initial_value && !layout.allow_wraparound {
                    *exhausted = true;
                }
                Ok(block)
            }
        }
    }

    /// The next `n` blocks, concatenated.
    pub(crate) fn take(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n * 16);
        for _ in 0..n {
            out.extend_from_slice(&self.next_block()?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_layout() -> Result<()> {
        let counter = Counter::new(32)
            .prefix(&[0xAA; 10])
            .suffix(&[0xBB; 2])
            .initial_value(0x0102_0304);
        counter.validate()?;
        let mut blocks = counter.into_blocks();

        let first = blocks.next_block()?;
        assert_eq!(&first[..10], &[0xAA; 10]);
        assert_eq!(&first[10..14], &[1, 2, 3, 4]);
        assert_eq!(&first[14..], &[0xBB; 2]);

        let second = blocks.next_block()?;
        assert_eq!(&second[10..14], &[1, 2, 3, 5]);
        Ok(())
    }

    #[test]
    fn little_endian_field() -> Result<()> {
        let mut blocks = Counter::new(128)
            .initial_value(0x0100)
            .little_endian(true)
            .into_blocks();
        let block = blocks.next_block()?;
        assert_eq!(block[0], 0x00);
        assert_eq!(block[1], 0x01);
        assert_eq!(&block[2..], &[0u8; 14]);
        Ok(())
    }

    #[test]
    fn wrap_is_detected() -> Result<()> {
        // 8-bit counter: 256 distinct blocks, then overflow
        let mut blocks = Counter::new(8).prefix(&[0u8; 15]).initial_value(7).into_blocks();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..256 {
            assert!(seen.insert(blocks.next_block()?));
        }
        assert!(matches!(blocks.next_block(), Err(Error::CounterOverflow)));
        Ok(())
    }

    #[test]
    fn wrap_allowed_repeats() -> Result<()> {
        let mut blocks = Counter::new(8)
            .prefix(&[0u8; 15])
            .initial_value(0)
            .allow_wraparound(true)
            .into_blocks();
        let first = blocks.next_block()?;
        let rest = blocks.take(255)?;
        assert_ne!(&rest[..16], &first);
        assert_eq!(blocks.next_block()?, first);
        Ok(())
    }

    #[test]
    fn layout_must_fill_a_block() {
        assert!(Counter::new(64).prefix(&[0u8; 4]).validate().is_err());
        assert!(Counter::new(12).prefix(&[0u8; 14]).validate().is_err());
        assert!(Counter::new(0).prefix(&[0u8; 16]).validate().is_err());
        assert!(Counter::new(64).prefix(&[0u8; 8]).initial_value(0).validate().is_ok());
    }

    #[test]
    fn initial_value_must_fit() {
        let counter = Counter::new(8).prefix(&[0u8; 15]).initial_value(256);
        assert!(matches!(
            counter.validate(),
            Err(Error::OutOfRange {
                name: "initial_value",
                ..
            })
        ));
    }

    #[test]
    fn custom_counter_is_unchecked() -> Result<()> {
        let mut blocks = Counter::custom(|| [9u8; 16]).into_blocks();
        assert_eq!(blocks.next_block()?, [9u8; 16]);
        assert_eq!(blocks.next_block()?, [9u8; 16]);
        Ok(())
    }
}
