//! # didlink CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use didlink_cli::keys::{
    run_keygen, run_message, run_recover, run_sign, KeygenArgs, MessageArgs, RecoverArgs,
    SignArgs,
};
use didlink_cli::passkey::{run_passkey, PasskeyArgs};
use didlink_cli::repo::{run_link, run_status, LinkArgs, StatusArgs};

/// Link a DID to a wallet with a self-signed attestation.
#[derive(Parser, Debug)]
#[command(name = "didlink", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a secp256k1 wallet key.
    Keygen(KeygenArgs),

    /// Print the binding message for a DID and wallet address.
    Message(MessageArgs),

    /// Sign the binding message with a local key.
    Sign(SignArgs),

    /// Recover the signer of a binding signature.
    Recover(RecoverArgs),

    /// Write an attestation and verify it by reading it back.
    Link(LinkArgs),

    /// Fetch, verify and reconcile the current attestation.
    Status(StatusArgs),

    /// Passkey wallet record (register, show).
    Passkey(PasskeyArgs),
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    tracing::debug!("didlink CLI starting");

    let result = match &cli.command {
        Commands::Keygen(args) => run_keygen(args),
        Commands::Message(args) => run_message(args),
        Commands::Sign(args) => run_sign(args),
        Commands::Recover(args) => run_recover(args),
        Commands::Link(args) => run_link(args),
        Commands::Status(args) => run_status(args),
        Commands::Passkey(args) => run_passkey(args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
