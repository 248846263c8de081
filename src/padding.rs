//! Block padding for ECB and CBC, which only accept whole blocks.

use crate::error::{Error, Result};

/// Padding scheme.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PaddingStyle {
    /// Every padding byte holds the padding length (RFC 5652).
    #[default]
    Pkcs7,
    /// `0x80` followed by zeros (ISO/IEC 7816-4).
    Iso7816,
    /// Zeros followed by the padding length (ANSI X9.23).
    X923,
}

/// Pad `data` to a multiple of `block_size`. A full block is added when `data` is already
/// aligned.
///
/// ## Examples
/// ```
/// use aesmode::padding::{PaddingStyle, pad, unpad};
///
/// let padded = pad(b"YELLOW SUBMARINE!", 16, PaddingStyle::Pkcs7).unwrap();
/// assert_eq!(padded.len(), 32);
/// assert_eq!(unpad(&padded, 16, PaddingStyle::Pkcs7).unwrap(), b"YELLOW SUBMARINE!");
/// ```
pub fn pad(data: &[u8], block_size: usize, style: PaddingStyle) -> Result<Vec<u8>> {
    check_block_size(block_size)?;
    let pad_len = block_size - data.len() % block_size;

    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    match style {
        PaddingStyle::Pkcs7 => out.resize(data.len() + pad_len, pad_len as u8),
        PaddingStyle::Iso7816 => {
            out.push(0x80);
            out.resize(data.len() + pad_len, 0);
        }
        PaddingStyle::X923 => {
            out.resize(data.len() + pad_len - 1, 0);
            out.push(pad_len as u8);
        }
    }
    Ok(out)
}

/// Remove and validate padding added by [`pad`].
pub fn unpad(data: &[u8], block_size: usize, style: PaddingStyle) -> Result<Vec<u8>> {
    check_block_size(block_size)?;
    let incorrect = || Error::InvalidLength {
        len: data.len(),
        context: "padding is incorrect",
    };
    if data.is_empty() || data.len() % block_size != 0 {
        return Err(incorrect());
    }

    let start = match style {
        PaddingStyle::Pkcs7 | PaddingStyle::X923 => {
            let pad = data[data.len() - 1] as usize;
            if pad == 0 || pad > block_size {
                return Err(incorrect());
            }
            let start = data.len() - pad;
            let filler = &data[start..data.len() - 1];
            let valid = match style {
                PaddingStyle::Pkcs7 => filler.iter().all(|&b| b as usize == pad),
                _ => filler.iter().all(|&b| b == 0),
            };
            if !valid {
                return Err(incorrect());
            }
            start
        }
        PaddingStyle::Iso7816 => {
            let tail = &data[data.len() - block_size..];
            let marker = tail.iter().rposition(|&b| b != 0).ok_or_else(incorrect)?;
            if tail[marker] != 0x80 {
                return Err(incorrect());
            }
            data.len() - block_size + marker
        }
    };
    Ok(data[..start].to_vec())
}

fn check_block_size(block_size: usize) -> Result<()> {
    if block_size == 0 || block_size > 255 {
        return Err(Error::OutOfRange {
            name: "block_size",
            value: block_size as i128,
            constraint: "must be between 1 and 255",
        });
    }
    Ok(())
}
