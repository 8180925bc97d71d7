//! # Passkey Wallet Commands
//!
//! `didlink passkey register` records the passkey-derived wallet for an
//! identity; `didlink passkey show` prints it.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use didlink_core::{Did, Identity, RecordLocator, WalletAddress};
use didlink_store::{PasskeyWalletRegistry, XrpcPasskeyRegistry};

use crate::repo::RepoArgs;

#[derive(Args, Debug)]
pub struct PasskeyArgs {
    #[command(subcommand)]
    pub command: PasskeyCommand,
}

#[derive(Subcommand, Debug)]
pub enum PasskeyCommand {
    /// Record the passkey wallet address for an identity.
    Register {
        /// Identity subject.
        #[arg(long, env = "DIDLINK_DID")]
        did: Did,

        /// Passkey-derived wallet address.
        #[arg(long)]
        address: WalletAddress,

        #[command(flatten)]
        repo: RepoArgs,
    },

    /// Print the registered passkey wallet, if any.
    Show {
        /// Identity subject.
        #[arg(long, env = "DIDLINK_DID")]
        did: Did,

        #[command(flatten)]
        repo: RepoArgs,
    },
}

pub async fn register(
    repo: &RepoArgs,
    did: &Did,
    address: &WalletAddress,
) -> Result<RecordLocator> {
    let registry = XrpcPasskeyRegistry::new(repo.client()?);
    registry
        .register(&Identity::new(did.clone()), address)
        .await
        .context("failed to register passkey wallet")
}

pub async fn show(repo: &RepoArgs, did: &Did) -> Result<Option<WalletAddress>> {
    let registry = XrpcPasskeyRegistry::new(repo.client()?);
    registry
        .lookup(&Identity::new(did.clone()))
        .await
        .context("failed to look up passkey wallet")
}

pub fn run_passkey(args: &PasskeyArgs) -> Result<u8> {
    let runtime = crate::runtime()?;
    match &args.command {
        PasskeyCommand::Register { did, address, repo } => {
            let locator = runtime.block_on(register(repo, did, address))?;
            println!("{locator}");
            Ok(0)
        }
        PasskeyCommand::Show { did, repo } => match runtime.block_on(show(repo, did))? {
            Some(address) => {
                println!("{address}");
                Ok(0)
            }
            None => {
                println!("No passkey wallet registered.");
                Ok(1)
            }
        },
    }
}
