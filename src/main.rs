mod args;

use args::{Cli, Commands, CommonArgs};
use clap::Parser;

use std::fs;
use std::time::Instant;

use aesmode::padding::{PaddingStyle, pad, unpad};
use aesmode::{BLOCK_SIZE, Cipher, Direction, Mode, Options};
use thiserror::Error;

/// OpenPGP output starts with the encrypted IV: one block plus two check bytes.
const OPENPGP_PREFIX_LEN: usize = BLOCK_SIZE + 2;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("--aad is only valid with an authenticated mode (ccm, eax, gcm, siv)")]
    AadInvalidMode,

    #[error("--tag is required to decrypt with {0}")]
    MissingTag(Mode),

    #[error("input is too short to hold the OpenPGP encrypted IV")]
    TruncatedInput,

    #[error("invalid hex: {0}")]
    InvalidHex(#[from] std::num::ParseIntError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Aes(#[from] aesmode::Error),
}

fn main() {
    env_logger::init();
    if let Err(e) = aes_cli() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn aes_cli() -> Result<(), CliError> {
    let args = Cli::parse();

    match args.command {
        Commands::Encrypt(enc) => {
            let common = enc.common;
            let mode = Mode::from(common.mode);

            let plaintext = fs::read(&common.input)?;

            // read or generate key
            let key = if enc.gen_key {
                let rand_key = aesmode::random_key(mode.key_spec(), enc.key_size.bytes())?;
                fs::write(&common.key, &rand_key)?;
                rand_key
            } else {
                fs::read(&common.key)?
            };

            let options = build_options(&common, mode, Direction::Encrypt)?;
            let mut cipher = aesmode::new(&key, mode, Direction::Encrypt, options)?;
            feed_aad(&mut cipher, &common)?;

            let start = Instant::now();

            let data = if needs_padding(mode) {
                pad(&plaintext, BLOCK_SIZE, PaddingStyle::Pkcs7)?
            } else {
                plaintext
            };
            let ciphertext = cipher.encrypt(&data)?;
            let tag = if mode.is_aead() {
                Some(cipher.digest()?)
            } else {
                cipher.close()?;
                None
            };

            let duration = start.elapsed();

            fs::write(&common.output, &ciphertext)?;
            if let Some(iv) = cipher.iv() {
                println!("IV = {}", to_hex(iv));
            }
            if let Some(nonce) = cipher.nonce() {
                println!("Nonce = {}", to_hex(nonce));
            }
            if let Some(tag) = tag {
                println!("Tag = {}", to_hex(&tag));
            }
            println!(
                "Encrypted {} bytes in {} ms ({} backend)",
                data.len(),
                duration.as_millis(),
                cipher.backend()
            );
            Ok(())
        }
        Commands::Decrypt(dec) => {
            let common = dec.common;
            let mode = Mode::from(common.mode);

            let mut ciphertext = fs::read(&common.input)?;
            let key = fs::read(&common.key)?;

            let mut options = build_options(&common, mode, Direction::Decrypt)?;
            // without --iv, OpenPGP reads the encrypted IV from the front of the input
            if mode == Mode::OpenPgp && common.iv.is_none() {
                if ciphertext.len() < OPENPGP_PREFIX_LEN {
                    return Err(CliError::TruncatedInput);
                }
                let body = ciphertext.split_off(OPENPGP_PREFIX_LEN);
                options.set("iv", ciphertext);
                ciphertext = body;
            }

            let mut cipher = aesmode::new(&key, mode, Direction::Decrypt, options)?;
            feed_aad(&mut cipher, &common)?;

            let start = Instant::now();

            let mut plaintext = if mode.is_aead() {
                let tag = dec.tag.as_deref().ok_or(CliError::MissingTag(mode))?;
                cipher.decrypt_and_verify(&ciphertext, &parse_hex(tag)?)?
            } else {
                let plaintext = cipher.decrypt(&ciphertext)?;
                cipher.close()?;
                plaintext
            };
            if needs_padding(mode) {
                plaintext = unpad(&plaintext, BLOCK_SIZE, PaddingStyle::Pkcs7)?;
            }

            let duration = start.elapsed();

            fs::write(&common.output, &plaintext)?;
            println!(
                "Decrypted {} bytes in {} ms ({} backend)",
                plaintext.len(),
                duration.as_millis(),
                cipher.backend()
            );
            Ok(())
        }
    }
}

/// Mode options from the command line, generating a fresh IV or nonce when encrypting
/// without one.
fn build_options(common: &CommonArgs, mode: Mode, direction: Direction) -> Result<Options, CliError> {
    let mut options = Options::new().with("use_aesni", !common.portable);

    if let Some(iv) = &common.iv {
        options.set("iv", parse_hex(iv)?);
    } else if direction == Direction::Encrypt
        && matches!(mode, Mode::Cbc | Mode::Cfb | Mode::Ofb | Mode::OpenPgp)
    {
        options.set("iv", aesmode::random_bytes(BLOCK_SIZE)?);
    }

    if let Some(nonce) = &common.nonce {
        options.set("nonce", parse_hex(nonce)?);
    } else if direction == Direction::Encrypt {
        let len = match mode {
            Mode::Ccm => Some(11),
            Mode::Gcm => Some(12),
            Mode::Eax => Some(16),
            _ => None,
        };
        if let Some(len) = len {
            options.set("nonce", aesmode::random_bytes(len)?);
        }
    }
    Ok(options)
}

fn feed_aad(cipher: &mut Cipher, common: &CommonArgs) -> Result<(), CliError> {
    if let Some(aad) = &common.aad {
        if !cipher.mode().is_aead() {
            return Err(CliError::AadInvalidMode);
        }
        cipher.update(&parse_hex(aad)?)?;
    }
    Ok(())
}

fn needs_padding(mode: Mode) -> bool {
    matches!(mode, Mode::Ecb | Mode::Cbc)
}

fn parse_hex(s: &str) -> Result<Vec<u8>, std::num::ParseIntError> {
    let mut hex: String = s.chars().filter(|c| !c.is_whitespace()).collect();

    if hex.len() % 2 == 1 {
        hex.insert(0, '0');
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16))
        .collect::<Result<Vec<u8>, _>>()
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
