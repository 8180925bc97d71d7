//! # Repository Commands
//!
//! `link` and `status` drive an [`AttestationEngine`] against the user's
//! AT Protocol repository and print the resulting status as JSON.
//!
//! Connection settings come from `DIDLINK_*` environment variables, with
//! `--pds-url` / `--access-token` taking precedence.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use didlink_core::{Did, Identity, WalletAddress, WalletChannel};
use didlink_engine::{
    AttestationEngine, EngineConfig, EngineSnapshot, LocalKeySigner, PasskeyWalletSource,
    StaticWalletSource, StatusView, VerificationResult, WalletSigner,
};
use didlink_store::{RepoConfig, XrpcAttestationStore, XrpcClient, XrpcPasskeyRegistry};
use serde::Serialize;
use url::Url;

use crate::keys::KeyArgs;

/// Repository connection settings.
#[derive(Args, Debug, Clone)]
pub struct RepoArgs {
    /// Base URL of the personal data server.
    #[arg(long, env = "DIDLINK_PDS_URL", default_value = RepoConfig::DEFAULT_PDS_URL)]
    pub pds_url: String,

    /// Session access token.
    #[arg(long, env = "DIDLINK_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "DIDLINK_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,

    /// Retries for transient failures.
    #[arg(long, env = "DIDLINK_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Overall bound on each repository call, retries included [default: 30].
    #[arg(long, env = "DIDLINK_STORE_TIMEOUT_SECS")]
    pub store_timeout_secs: Option<u64>,
}

impl RepoArgs {
    pub fn to_config(&self) -> Result<RepoConfig> {
        let pds_url = Url::parse(&self.pds_url)
            .with_context(|| format!("invalid --pds-url {}", self.pds_url))?;
        let token = self
            .access_token
            .as_deref()
            .context("an access token is required (--access-token or DIDLINK_ACCESS_TOKEN)")?;
        let config = RepoConfig::new(pds_url, token)?;
        Ok(RepoConfig {
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
            ..config
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        match self.store_timeout_secs {
            Some(secs) => EngineConfig {
                store_timeout: Some(Duration::from_secs(secs)),
            },
            None => EngineConfig::default(),
        }
    }

    pub fn client(&self) -> Result<XrpcClient> {
        XrpcClient::new(&self.to_config()?).context("failed to build repository client")
    }
}

/// What `link` and `status` print.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub did: Did,
    pub view: StatusView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<VerificationResult>,
}

impl StatusReport {
    fn from_snapshot(did: Did, snapshot: EngineSnapshot) -> Self {
        Self {
            did,
            view: snapshot.view(),
            locator: snapshot.record.map(|r| r.locator.to_string()),
            result: snapshot.result,
        }
    }
}

fn build_engine(
    repo: &RepoArgs,
    wallets: &[WalletAddress],
    passkey: bool,
) -> Result<AttestationEngine<XrpcAttestationStore>> {
    let client = repo.client()?;
    let connected = Arc::new(StaticWalletSource::new("cli", WalletChannel::Connected));
    connected.set(wallets.iter().copied());

    let mut engine = AttestationEngine::new(XrpcAttestationStore::new(client.clone()))
        .with_config(repo.engine_config())
        .with_source(connected);
    if passkey {
        let registry = Arc::new(XrpcPasskeyRegistry::new(client));
        engine = engine.with_source(Arc::new(PasskeyWalletSource::new(registry)));
    }
    Ok(engine)
}

fn print_report(report: &StatusReport) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(report).context("failed to encode status")?
    );
    Ok(())
}

// ── status ───────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Identity subject.
    #[arg(long, env = "DIDLINK_DID")]
    pub did: Did,

    /// Wallets currently controlled (repeatable).
    #[arg(long = "wallet")]
    pub wallets: Vec<WalletAddress>,

    /// Skip the passkey wallet lookup.
    #[arg(long)]
    pub no_passkey: bool,

    #[command(flatten)]
    pub repo: RepoArgs,
}

pub async fn status(args: &StatusArgs) -> Result<StatusReport> {
    let engine = build_engine(&args.repo, &args.wallets, !args.no_passkey)?;
    engine
        .start_session(Identity::new(args.did.clone()))
        .await
        .context("failed to load attestation")?;
    Ok(StatusReport::from_snapshot(args.did.clone(), engine.snapshot()))
}

pub fn run_status(args: &StatusArgs) -> Result<u8> {
    let report = crate::runtime()?.block_on(status(args))?;
    print_report(&report)?;
    Ok(0)
}

// ── link ─────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Identity subject.
    #[arg(long, env = "DIDLINK_DID")]
    pub did: Did,

    /// Address to link when supplying a signature made elsewhere.
    #[arg(long, requires = "signature")]
    pub address: Option<WalletAddress>,

    /// Signature over the binding message for `--address`.
    #[arg(long, requires = "address")]
    pub signature: Option<String>,

    /// Sign with a local key instead.
    #[command(flatten)]
    pub key: KeyArgs,

    #[command(flatten)]
    pub repo: RepoArgs,
}

pub async fn link(args: &LinkArgs) -> Result<StatusReport> {
    let identity = Identity::new(args.did.clone());
    match (&args.address, &args.signature) {
        (Some(address), Some(signature)) => {
            let engine = build_engine(&args.repo, &[*address], false)?;
            engine
                .start_session(identity)
                .await
                .context("failed to load attestation")?;
            engine
                .link(*address, signature)
                .await
                .context("failed to link wallet")?;
            Ok(StatusReport::from_snapshot(args.did.clone(), engine.snapshot()))
        }
        _ => {
            let signer = LocalKeySigner::new(args.key.load()?);
            let engine = build_engine(&args.repo, &[signer.address()], false)?;
            engine
                .start_session(identity)
                .await
                .context("failed to load attestation")?;
            engine
                .link_with_signer(&signer)
                .await
                .context("failed to link wallet")?;
            Ok(StatusReport::from_snapshot(args.did.clone(), engine.snapshot()))
        }
    }
}

pub fn run_link(args: &LinkArgs) -> Result<u8> {
    let report = crate::runtime()?.block_on(link(args))?;
    print_report(&report)?;
    Ok(if report.view.flags.record_verified { 0 } else { 2 })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_args(token: Option<&str>) -> RepoArgs {
        RepoArgs {
            pds_url: "http://127.0.0.1:9000".into(),
            access_token: token.map(str::to_string),
            timeout_secs: 7,
            max_retries: 1,
            store_timeout_secs: Some(20),
        }
    }

    #[test]
    fn config_applies_overrides() {
        let config = repo_args(Some("tok")).to_config().unwrap();
        assert_eq!(config.pds_url.as_str(), "http://127.0.0.1:9000/");
        assert_eq!(config.timeout_secs, 7);
        assert_eq!(config.max_retries, 1);
        assert_eq!(
            repo_args(Some("tok")).engine_config().store_timeout,
            Some(Duration::from_secs(20))
        );
    }

    #[test]
    fn store_timeout_defaults_when_unset() {
        let mut args = repo_args(Some("tok"));
        args.store_timeout_secs = None;
        assert_eq!(
            args.engine_config().store_timeout,
            Some(EngineConfig::DEFAULT_STORE_TIMEOUT)
        );
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = repo_args(None).to_config().unwrap_err();
        assert!(err.to_string().contains("access token"));
    }

    #[test]
    fn bad_url_is_an_error() {
        let mut args = repo_args(Some("tok"));
        args.pds_url = "not a url".into();
        assert!(args.to_config().is_err());
    }
}
