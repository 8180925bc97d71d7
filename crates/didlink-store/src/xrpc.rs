//! Typed client for the AT Protocol repository XRPC methods.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/xrpc/com.atproto.repo.getRecord?repo&collection&rkey` | Read one record |
//! | POST   | `/xrpc/com.atproto.repo.putRecord` | Create or replace one record |
//!
//! ## Status Classification
//!
//! | Response | Error |
//! |----------|-------|
//! | 404, or 400 `RecordNotFound` | `NotFound` |
//! | 401, 403, or 400 `AuthRequired` / `ExpiredToken` / `InvalidToken` | `Unauthorized` |
//! | 429, 5xx, connection failure | `Transport { retryable: true }` |
//! | anything else | `Transport { retryable: false }` |

use std::time::Duration;

use didlink_core::{Did, RecordLocator};
use reqwest::StatusCode;

use crate::config::{ConfigError, RepoConfig};
use crate::error::StoreError;
use crate::retry::{is_transient_status, retry_send, RetryPolicy};
use crate::types::{GetRecordResponse, PutRecordRequest, PutRecordResponse, XrpcErrorBody};

const GET_RECORD: &str = "com.atproto.repo.getRecord";
const PUT_RECORD: &str = "com.atproto.repo.putRecord";

const AUTH_ERRORS: &[&str] = &["AuthRequired", "ExpiredToken", "InvalidToken"];

/// A fetched record with a validated locator.
#[derive(Debug, Clone)]
pub struct FetchedRecord {
    pub locator: RecordLocator,
    pub cid: Option<String>,
    pub value: serde_json::Value,
}

/// Client for one PDS, authenticated with one session token.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct XrpcClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl XrpcClient {
    /// Create a client from configuration.
    pub fn new(config: &RepoConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                let mut bearer = reqwest::header::HeaderValue::from_str(&format!(
                    "Bearer {}",
                    config.access_token.as_str()
                ))
                .map_err(|_| StoreError::Config(ConfigError::MissingToken))?;
                bearer.set_sensitive(true);
                headers.insert(reqwest::header::AUTHORIZATION, bearer);
                headers
            })
            .build()
            .map_err(|e| StoreError::Transport {
                endpoint: "client_init".into(),
                reason: e.to_string(),
                retryable: false,
            })?;

        Ok(Self {
            http,
            base_url: config.pds_url.as_str().trim_end_matches('/').to_string(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: Duration::from_millis(config.retry_base_delay_ms),
            },
        })
    }

    fn method_url(&self, nsid: &str) -> String {
        format!("{}/xrpc/{nsid}", self.base_url)
    }

    /// Read the record at `repo/collection/rkey`.
    ///
    /// Calls `GET {pds}/xrpc/com.atproto.repo.getRecord`.
    pub async fn get_record(
        &self,
        repo: &Did,
        collection: &str,
        rkey: &str,
    ) -> Result<FetchedRecord, StoreError> {
        let endpoint = format!("GET {GET_RECORD}");
        let url = self.method_url(GET_RECORD);
        let query = [("repo", repo.as_str()), ("collection", collection), ("rkey", rkey)];

        tracing::debug!(did = %repo, collection, rkey, "fetching record");
        let resp = retry_send(self.retry, &endpoint, || {
            self.http.get(&url).query(&query).send()
        })
        .await
        .map_err(|e| transport(&endpoint, &e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_failure(&endpoint, status, &body, collection, rkey));
        }

        let body: GetRecordResponse = resp.json().await.map_err(|e| StoreError::Transport {
            endpoint: endpoint.clone(),
            reason: format!("invalid response body: {e}"),
            retryable: false,
        })?;

        let locator =
            RecordLocator::parse(&body.uri).map_err(|e| StoreError::MalformedRecord {
                locator: body.uri.clone(),
                reason: e.to_string(),
            })?;
        if locator.authority() != repo.as_str()
            || locator.collection() != collection
            || locator.rkey() != rkey
        {
            return Err(StoreError::MalformedRecord {
                locator: body.uri,
                reason: format!("expected {repo}/{collection}/{rkey}"),
            });
        }

        Ok(FetchedRecord {
            locator,
            cid: body.cid,
            value: body.value,
        })
    }

    /// Create or replace the record at `repo/collection/rkey`.
    ///
    /// Calls `POST {pds}/xrpc/com.atproto.repo.putRecord` with
    /// `validate: false`. Returns the locator the server assigned.
    pub async fn put_record(
        &self,
        repo: &Did,
        collection: &str,
        rkey: &str,
        record: serde_json::Value,
    ) -> Result<RecordLocator, StoreError> {
        let endpoint = format!("POST {PUT_RECORD}");
        let url = self.method_url(PUT_RECORD);
        let req = PutRecordRequest {
            repo: repo.as_str(),
            collection,
            rkey,
            record,
            validate: false,
        };

        tracing::debug!(did = %repo, collection, rkey, "writing record");
        let resp = retry_send(self.retry, &endpoint, || {
            self.http.post(&url).json(&req).send()
        })
        .await
        .map_err(|e| transport(&endpoint, &e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_failure(&endpoint, status, &body, collection, rkey));
        }

        let body: PutRecordResponse = resp.json().await.map_err(|e| StoreError::Transport {
            endpoint: endpoint.clone(),
            reason: format!("invalid response body: {e}"),
            retryable: false,
        })?;

        RecordLocator::parse(&body.uri).map_err(|e| StoreError::Transport {
            endpoint,
            reason: format!("server returned invalid uri: {e}"),
            retryable: false,
        })
    }
}

fn transport(endpoint: &str, e: &reqwest::Error) -> StoreError {
    StoreError::Transport {
        endpoint: endpoint.to_string(),
        reason: e.to_string(),
        retryable: true,
    }
}

/// Map a non-2xx XRPC response to a store error.
pub(crate) fn classify_failure(
    endpoint: &str,
    status: StatusCode,
    body: &str,
    collection: &str,
    rkey: &str,
) -> StoreError {
    let parsed: XrpcErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed.error.as_deref();
    let detail = parsed
        .message
        .clone()
        .or_else(|| parsed.error.clone())
        .unwrap_or_else(|| body.chars().take(200).collect());

    let not_found = || StoreError::NotFound {
        collection: collection.to_string(),
        rkey: rkey.to_string(),
    };

    match status {
        StatusCode::NOT_FOUND => not_found(),
        StatusCode::BAD_REQUEST if code == Some("RecordNotFound") => not_found(),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => StoreError::Unauthorized {
            reason: format!("HTTP {}: {detail}", status.as_u16()),
        },
        StatusCode::BAD_REQUEST if code.is_some_and(|c| AUTH_ERRORS.contains(&c)) => {
            StoreError::Unauthorized {
                reason: format!("HTTP 400: {detail}"),
            }
        }
        s => StoreError::Transport {
            endpoint: endpoint.to_string(),
            reason: format!("HTTP {}: {detail}", s.as_u16()),
            retryable: is_transient_status(s),
        },
    }
}
