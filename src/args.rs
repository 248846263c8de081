use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, author, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encrypt input to output, printing the IV/nonce and tag
    Encrypt(EncryptArgs),

    /// Decrypt input to output
    Decrypt(DecryptArgs),
}

#[derive(Args, Debug)]
#[command(arg_required_else_help = true)]
pub struct CommonArgs {
    /// Mode of operation.
    #[arg(short = 'm', long = "mode", value_enum, default_value_t = Mode::Gcm)]
    pub mode: Mode,

    /// Input file path.
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output file path.
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,

    /// Key file path.
    #[arg(short = 'k', long = "key")]
    pub key: PathBuf,

    /// IV as a hex string (CBC, CFB, OFB, OpenPGP). Generated when encrypting without one.
    #[arg(long = "iv", value_name = "HEX")]
    pub iv: Option<String>,

    /// Nonce as a hex string (CTR, CCM, EAX, GCM, SIV). Generated when encrypting without one.
    #[arg(long = "nonce", value_name = "HEX")]
    pub nonce: Option<String>,

    /// Associated data as a hex string (authenticated modes only)
    #[arg(long = "aad", value_name = "HEX")]
    pub aad: Option<String>,

    /// Use the portable backend even if AES-NI is available
    #[arg(long = "portable")]
    pub portable: bool,
}

#[derive(Args, Debug)]
#[command(arg_required_else_help = true)]
pub struct EncryptArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Generate a random key (written to path specified by key)
    #[arg(long = "gen-key")]
    pub gen_key: bool,

    /// Only valid with --gen-key. SIV takes 256, 384, or 512.
    #[arg(
        long = "key-size",
        value_enum,
        default_value_t = KeySize::Bits256,
        requires = "gen_key"
    )]
    pub key_size: KeySize,
}

#[derive(Args, Debug)]
#[command(arg_required_else_help = true)]
pub struct DecryptArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Authentication tag as a hex string (authenticated modes only)
    #[arg(long = "tag", value_name = "HEX")]
    pub tag: Option<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum, Eq, PartialEq)]
pub enum KeySize {
    #[value(name = "128")]
    Bits128,
    #[value(name = "192")]
    Bits192,
    #[value(name = "256")]
    Bits256,
    #[value(name = "384")]
    Bits384,
    #[value(name = "512")]
    Bits512,
}

impl KeySize {
    pub fn bytes(self) -> usize {
        match self {
            KeySize::Bits128 => 16,
            KeySize::Bits192 => 24,
            KeySize::Bits256 => 32,
            KeySize::Bits384 => 48,
            KeySize::Bits512 => 64,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum, Eq, PartialEq)]
pub enum Mode {
    Ecb,
    Cbc,
    Cfb,
    Ofb,
    Ctr,
    #[value(name = "openpgp")]
    OpenPgp,
    Ccm,
    Eax,
    Gcm,
    Siv,
}

impl From<Mode> for aesmode::Mode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Ecb => aesmode::Mode::Ecb,
            Mode::Cbc => aesmode::Mode::Cbc,
            Mode::Cfb => aesmode::Mode::Cfb,
            Mode::Ofb => aesmode::Mode::Ofb,
            Mode::Ctr => aesmode::Mode::Ctr,
            Mode::OpenPgp => aesmode::Mode::OpenPgp,
            Mode::Ccm => aesmode::Mode::Ccm,
            Mode::Eax => aesmode::Mode::Eax,
            Mode::Gcm => aesmode::Mode::Gcm,
            Mode::Siv => aesmode::Mode::Siv,
        }
    }
}
