//! Generic named options accepted by [`from_options`](crate::from_options).
//!
//! Options are collected into an [`Options`] bag and handed to the dispatcher, which removes
//! every name it recognises for the selected mode and type-checks the value. Anything left over
//! is rejected, so a misspelt or misplaced option never goes unnoticed.

use std::collections::BTreeMap;
use std::fmt;

use crate::Mode;
use crate::counter::Counter;
use crate::error::{Error, Result};

/// A single option value.
pub enum Value {
    Bytes(Vec<u8>),
    Int(i64),
    Bool(bool),
    Counter(Counter),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Bytes(_) => "bytes",
            Value::Int(_) => "an integer",
            Value::Bool(_) => "a boolean",
            Value::Counter(_) => "a counter",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // byte values are usually key material, so only their length is shown
            Value::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Counter(c) => c.fmt(f),
        }
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&Vec<u8>> for Value {
    fn from(b: &Vec<u8>) -> Self {
        Value::Bytes(b.clone())
    }
}

impl<const N: usize> From<[u8; N]> for Value {
    fn from(b: [u8; N]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for Value {
    fn from(b: &[u8; N]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Counter> for Value {
    fn from(c: Counter) -> Self {
        Value::Counter(c)
    }
}

/// A bag of named option values.
///
/// ## Examples
/// ```
/// use aesmode::{Options, Value};
///
/// let options = Options::new()
///     .with("nonce", b"twelve bytes")
///     .with("mac_len", 12);
/// assert!(options.contains("nonce"));
/// assert_eq!(options.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct Options {
    entries: BTreeMap<String, Value>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Options::set).
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Insert or replace an option, returning the previous value if there was one.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(name.to_owned(), value.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn take_bytes(&mut self, name: &'static str) -> Result<Option<Vec<u8>>> {
        match self.entries.remove(name) {
            None => Ok(None),
            Some(Value::Bytes(b)) => Ok(Some(b)),
            Some(other) => Err(mismatch(name, "bytes", &other)),
        }
    }

    pub(crate) fn take_int(&mut self, name: &'static str) -> Result<Option<i64>> {
        match self.entries.remove(name) {
            None => Ok(None),
            Some(Value::Int(i)) => Ok(Some(i)),
            Some(other) => Err(mismatch(name, "an integer", &other)),
        }
    }

    /// An integer option that must not be negative.
    pub(crate) fn take_usize(&mut self, name: &'static str) -> Result<Option<usize>> {
        self.take_int(name)?
            .map(|i| {
                usize::try_from(i).map_err(|_| Error::OutOfRange {
                    name,
                    value: i128::from(i),
                    constraint: "must not be negative",
                })
            })
            .transpose()
    }

    pub(crate) fn take_bool(&mut self, name: &'static str) -> Result<Option<bool>> {
        match self.entries.remove(name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(other) => Err(mismatch(name, "a boolean", &other)),
        }
    }

    pub(crate) fn take_counter(&mut self, name: &'static str) -> Result<Option<Counter>> {
        match self.entries.remove(name) {
            None => Ok(None),
            Some(Value::Counter(c)) => Ok(Some(c)),
            Some(other) => Err(mismatch(name, "a counter", &other)),
        }
    }

    /// Remove an option without type-checking it, for options accepting more than one form.
    pub(crate) fn take_raw(&mut self, name: &'static str) -> Option<Value> {
        self.entries.remove(name)
    }

    /// Fail if any option was not consumed by the dispatcher.
    pub(crate) fn finish(self, mode: Mode) -> Result<()> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let names = self.entries.into_keys().collect::<Vec<_>>().join(", ");
        Err(Error::UnknownParameters { mode, names })
    }
}

fn mismatch(name: &'static str, expected: &'static str, got: &Value) -> Error {
    log::debug!(
        "option '{name}' rejected: expected {expected}, got {}",
        got.type_name()
    );
    Error::InvalidType { name, expected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn typed_takes() -> Result<()> {
        let mut options = Options::new()
            .with("iv", [7u8; 16])
            .with("segment_size", 64)
            .with("use_aesni", false);

        assert_eq!(options.take_bytes("iv")?, Some(vec![7u8; 16]));
        assert_eq!(options.take_usize("segment_size")?, Some(64));
        assert_eq!(options.take_bool("use_aesni")?, Some(false));
        assert_eq!(options.take_bytes("nonce")?, None);
        assert!(options.is_empty());
        Ok(())
    }

    #[test]
    fn wrong_type_is_a_validation_error() {
        let mut options = Options::new().with("nonce", 12);
        let err = options.take_bytes("nonce").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn negative_is_a_range_error() {
        let mut options = Options::new().with("mac_len", -4);
        let err = options.take_usize("mac_len").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Range);
    }

    #[test]
    fn leftovers_are_rejected() {
        let options = Options::new().with("nonce", b"abc").with("tag", b"x");
        match options.finish(Mode::Ecb) {
            Err(Error::UnknownParameters { mode, names }) => {
                assert_eq!(mode, Mode::Ecb);
                assert_eq!(names, "nonce, tag");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn debug_hides_bytes() {
        let options = Options::new().with("key", b"Sixteen byte key");
        let shown = format!("{options:?}");
        assert!(!shown.contains("Sixteen"), "{shown}");
        assert!(shown.contains("16 bytes"), "{shown}");
    }
}
