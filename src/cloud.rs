//! Client for the Couchbase Capella management API.
//!
//! Only read-only cluster metadata is fetched, to pre-populate defaults in
//! the scaffolding UI. Requests are signed with HMAC-SHA256 and never retried.

use crate::config::CapellaConfig;
use crate::error::{InitializerError, Result};
use base64::Engine;
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use std::fmt::Display;
use std::time::Duration;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signing timestamp.
pub const TIMESTAMP_HEADER: &str = "Couchbase-Timestamp";

/// Everything `URLEncoder` leaves alone: alphanumerics and `-_.*`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'*');

/// A cluster as listed by the management API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    /// Deployment environment, e.g. `hosted`
    pub environment: String,
    /// Cluster id
    pub id: String,
    /// Display name
    pub name: String,
    /// Owning project
    pub project_id: String,
}

/// Percent-encode a path or query component; spaces become `%20`.
pub fn url_encode(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// Replace each `{}` in `template` with the URL-encoded next argument.
///
/// `format_path("/foo/{}/bar/{}", &[&"hello world", &"a/b"])` gives
/// `/foo/hello%20world/bar/a%2Fb`. The number of arguments must match the
/// number of placeholders.
pub fn format_path(template: &str, args: &[&dyn Display]) -> Result<String> {
    let pieces: Vec<&str> = template.split("{}").collect();
    let placeholders = pieces.len() - 1;
    if placeholders != args.len() {
        return Err(InitializerError::PathTemplate {
            template: template.to_string(),
            reason: format!(
                "{} placeholders but {} arguments",
                placeholders,
                args.len()
            ),
        });
    }

    let mut result = String::from(pieces[0]);
    for (arg, piece) in args.iter().zip(&pieces[1..]) {
        result.push_str(&url_encode(&arg.to_string()));
        result.push_str(piece);
    }
    Ok(result)
}

/// Base64 HMAC-SHA256 of `METHOD\nENDPOINT\nTIMESTAMP` under `secret_key`.
///
/// `endpoint` is the raw path, followed by `?` and the raw query if any.
pub fn signature(secret_key: &[u8], method: &str, endpoint: &str, timestamp: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret_key).expect("HMAC can take key of any size");
    mac.update(format!("{}\n{}\n{}", method, endpoint, timestamp).as_bytes());
    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Signed client for the management API.
#[derive(Clone)]
pub struct CapellaClient {
    base_url: String,
    access_key: String,
    secret_key: Vec<u8>,
    http: reqwest::Client,
}

impl std::fmt::Debug for CapellaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapellaClient")
            .field("base_url", &self.base_url)
            .field("access_key", &self.access_key)
            .finish_non_exhaustive()
    }
}

impl CapellaClient {
    /// Default API location.
    pub const DEFAULT_BASE_URL: &'static str = "https://cloudapi.cloud.couchbase.com";

    /// Create a client; `timeout` bounds each request.
    pub fn new(
        base_url: &str,
        access_key: impl Into<String>,
        secret_key: impl AsRef<[u8]>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(CapellaClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.into(),
            secret_key: secret_key.as_ref().to_vec(),
            http,
        })
    }

    /// Build a client from configuration, or `None` when no credentials are set.
    pub fn from_config(config: &CapellaConfig) -> Result<Option<Self>> {
        match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => Ok(Some(CapellaClient::new(
                &config.base_url,
                access_key.as_str(),
                secret_key.as_bytes(),
                Duration::from_secs(config.timeout_secs),
            )?)),
            _ => Ok(None),
        }
    }

    /// Send a signed request to `endpoint` and return its body.
    ///
    /// Bodies that are not JSON come back as a JSON string. Any non-success
    /// status is an error.
    pub async fn send(&self, method: Method, endpoint: &str) -> Result<Value> {
        let url = Url::parse(&format!("{}{}", self.base_url, endpoint)).map_err(|e| {
            InitializerError::PathTemplate {
                template: endpoint.to_string(),
                reason: e.to_string(),
            }
        })?;

        let signed_endpoint = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let signature = signature(&self.secret_key, method.as_str(), &signed_endpoint, &timestamp);

        debug!(method = %method, endpoint = %signed_endpoint, "sending cloud API request");
        let response = self
            .http
            .request(method, url)
            .header(
                AUTHORIZATION,
                format!("Bearer {}:{}", self.access_key, signature),
            )
            .header(TIMESTAMP_HEADER, &timestamp)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(InitializerError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    /// One page of the clusters visible to the configured key.
    pub async fn clusters(&self, page: u32, per_page: u32) -> Result<Vec<Cluster>> {
        let endpoint = format_path("/v3/clusters?page={}&perPage={}", &[&page, &per_page])?;
        let json = self.send(Method::GET, &endpoint).await?;

        match json.pointer("/data/items") {
            Some(items) => Ok(serde_json::from_value(items.clone())?),
            None => Ok(Vec::new()),
        }
    }

    /// SRV connection endpoint of a cluster.
    pub async fn connection_string(&self, cluster_id: &str) -> Result<String> {
        let endpoint = format_path("/v3/clusters/{}", &[&cluster_id])?;
        let json = self.send(Method::GET, &endpoint).await?;

        json.get("endpointsSrv")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                InitializerError::NotFound(format!("connection string of cluster {}", cluster_id))
            })
    }
}
