//! # Key and Message Commands
//!
//! Offline operations: generate a wallet key, print the binding message,
//! sign it, and recover a signer. None of these touch the network.
//!
//! Secret keys are read from `--key`, `DIDLINK_WALLET_KEY` or `--key-file`
//! and held in zeroizing buffers.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use didlink_core::{Did, Identity, WalletAddress};
use didlink_crypto::{build_message, recover_signer, WalletKeyPair};
use zeroize::Zeroizing;

/// Where to load a wallet secret from.
#[derive(Args, Debug, Clone, Default)]
pub struct KeyArgs {
    /// Hex secret key (0x optional).
    #[arg(long, env = "DIDLINK_WALLET_KEY", hide_env_values = true, conflicts_with = "key_file")]
    pub key: Option<String>,

    /// File holding the hex secret key.
    #[arg(long)]
    pub key_file: Option<PathBuf>,
}

impl KeyArgs {
    /// Whether any key source was given.
    pub fn is_present(&self) -> bool {
        self.key.is_some() || self.key_file.is_some()
    }

    pub fn load(&self) -> Result<WalletKeyPair> {
        match (&self.key, &self.key_file) {
            (Some(hex), _) => WalletKeyPair::from_hex(hex).context("invalid --key"),
            (None, Some(path)) => load_key_file(path),
            (None, None) => bail!("a wallet key is required (--key, DIDLINK_WALLET_KEY or --key-file)"),
        }
    }
}

/// Read a hex secret key from `path`.
pub fn load_key_file(path: &Path) -> Result<WalletKeyPair> {
    let contents = Zeroizing::new(
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read key file {}", path.display()))?,
    );
    WalletKeyPair::from_hex(contents.trim())
        .with_context(|| format!("invalid key in {}", path.display()))
}

/// Write a new secret key to `path`. Refuses to overwrite.
pub fn write_key_file(path: &Path, key: &WalletKeyPair) -> Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("failed to create key file {}", path.display()))?;
    writeln!(file, "{}", key.secret_hex().as_str())
        .with_context(|| format!("failed to write key file {}", path.display()))?;
    Ok(())
}

// ── keygen ───────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Write the secret key to this file instead of printing it.
    #[arg(long)]
    pub out: Option<PathBuf>,
}

pub fn run_keygen(args: &KeygenArgs) -> Result<u8> {
    let key = WalletKeyPair::generate();
    match &args.out {
        Some(path) => {
            write_key_file(path, &key)?;
            tracing::info!(address = %key.address(), path = %path.display(), "wallet key written");
            println!("{}", key.address());
        }
        None => {
            println!("address: {}", key.address());
            println!("secret:  {}", key.secret_hex().as_str());
        }
    }
    Ok(0)
}

// ── message ──────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct MessageArgs {
    /// Identity subject.
    #[arg(long, env = "DIDLINK_DID")]
    pub did: Did,

    /// Wallet address, any accepted casing.
    #[arg(long)]
    pub address: WalletAddress,
}

pub fn run_message(args: &MessageArgs) -> Result<u8> {
    let message = build_message(&Identity::new(args.did.clone()), &args.address);
    println!("{message}");
    Ok(0)
}

// ── sign ─────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Identity subject.
    #[arg(long, env = "DIDLINK_DID")]
    pub did: Did,

    #[command(flatten)]
    pub key: KeyArgs,
}

/// Signature over the binding message for the key's own address.
pub fn sign_binding(did: &Did, key: &WalletKeyPair) -> Result<String> {
    let message = build_message(&Identity::new(did.clone()), &key.address());
    let signature = key
        .sign_message(&message)
        .context("failed to sign binding message")?;
    Ok(signature.to_hex())
}

pub fn run_sign(args: &SignArgs) -> Result<u8> {
    let key = args.key.load()?;
    let signature = sign_binding(&args.did, &key)?;
    println!("address:   {}", key.address());
    println!("signature: {signature}");
    Ok(0)
}

// ── recover ──────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct RecoverArgs {
    /// Identity subject.
    #[arg(long, env = "DIDLINK_DID")]
    pub did: Did,

    /// Address the signature claims.
    #[arg(long)]
    pub address: WalletAddress,

    /// Hex signature.
    #[arg(long)]
    pub signature: String,
}

/// Exit code when the signature recovers to another address.
pub const EXIT_NOT_AUTHENTIC: u8 = 2;

pub fn run_recover(args: &RecoverArgs) -> Result<u8> {
    let message = build_message(&Identity::new(args.did.clone()), &args.address);
    let signer = recover_signer(&message, &args.signature).context("cannot recover signer")?;
    println!("signer: {signer}");
    if signer == args.address {
        println!("authentic: yes");
        Ok(0)
    } else {
        println!("authentic: no (claimed {})", args.address);
        Ok(EXIT_NOT_AUTHENTIC)
    }
}
