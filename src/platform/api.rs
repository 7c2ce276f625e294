// HTTP client for the Sakura Cloud API
//
// Thin wrapper over reqwest that knows the URL layout of the zone, system
// and webaccel APIs, authenticates every request and applies the
// requests-per-second limit shared by all collectors.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, trace};

use super::common::deserialize_id;
use super::{ClientError, ClientResult};

/// Root of every zone-scoped API URL
pub const DEFAULT_API_ROOT_URL: &str = "https://secure.sakura.ad.jp/cloud/zone";

/// Zone used for global resources (SIM, ProxyLB, ESME, billing, webaccel)
pub const GLOBAL_ZONE: &str = "is1a";

/// Options for building a `SakuraCloudClient`
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub token: String,
    pub secret: String,
    pub zones: Vec<String>,
    pub api_root_url: String,
    pub maintenance_feed_url: String,
    pub rate_limit: u32,
    pub timeout: Duration,
}

/// Error body returned by the API on non-2xx responses
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiErrorBody {
    error_code: Option<String>,
    error_msg: Option<String>,
}

/// Sakura Cloud API client
///
/// Cloning shares the HTTP connection pool and the rate limiter.
#[derive(Clone)]
pub struct SakuraCloudClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    options: ClientOptions,
    limiter: DefaultDirectRateLimiter,
}

impl SakuraCloudClient {
    /// Creates a new client
    ///
    /// # Returns
    /// * `Err(ClientError::InvalidConfig)` - Rate limit is zero
    /// * `Err(ClientError::Http)` - The HTTP client could not be built (TLS setup)
    pub fn new(options: ClientOptions) -> ClientResult<Self> {
        let rate = NonZeroU32::new(options.rate_limit).ok_or_else(|| {
            ClientError::InvalidConfig("rate limit must be greater than zero".to_string())
        })?;

        let http = Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("sakuracloud-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(SakuraCloudClient {
            inner: Arc::new(Inner {
                http,
                limiter: RateLimiter::direct(Quota::per_second(rate)),
                options,
            }),
        })
    }

    /// Zones that zone-partitioned resources are listed from
    pub fn zones(&self) -> &[String] {
        &self.inner.options.zones
    }

    pub(crate) fn maintenance_feed_url(&self) -> &str {
        &self.inner.options.maintenance_feed_url
    }

    /// URL of a zone-scoped IaaS API path
    pub(crate) fn cloud_url(&self, zone: &str, path: &str) -> String {
        format!(
            "{}/{}/api/cloud/1.1/{}",
            self.inner.options.api_root_url.trim_end_matches('/'),
            zone,
            path.trim_start_matches('/')
        )
    }

    /// URL of a system API path (billing, coupons)
    pub(crate) fn system_url(&self, path: &str) -> String {
        format!(
            "{}/{}/api/system/1.0/{}",
            self.inner.options.api_root_url.trim_end_matches('/'),
            GLOBAL_ZONE,
            path.trim_start_matches('/')
        )
    }

    /// URL of a web accelerator API path
    pub(crate) fn webaccel_url(&self, path: &str) -> String {
        format!(
            "{}/{}/api/webaccel/1.0/{}",
            self.inner.options.api_root_url.trim_end_matches('/'),
            GLOBAL_ZONE,
            path.trim_start_matches('/')
        )
    }

    /// Performs an authenticated GET and decodes the JSON body
    ///
    /// # Arguments
    /// * `url` - Full URL built with one of the `*_url` helpers
    /// * `query` - Optional JSON query document, sent URL-encoded as the raw query string
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: Option<&serde_json::Value>,
    ) -> ClientResult<T> {
        let url = match query {
            Some(query) => format!("{}?{}", url, urlencoding::encode(&query.to_string())),
            None => url.to_string(),
        };

        self.inner.limiter.until_ready().await;
        trace!("GET {}", url);

        let response = self
            .inner
            .http
            .get(&url)
            .basic_auth(&self.inner.options.token, Some(&self.inner.options.secret))
            .send()
            .await?;

        Self::decode(url, response).await
    }

    /// Performs an unauthenticated GET against a public URL
    pub(crate) async fn get_public_json<T: DeserializeOwned>(&self, url: &str) -> ClientResult<T> {
        trace!("GET {}", url);
        let response = self.inner.http.get(url).send().await?;
        Self::decode(url.to_string(), response).await
    }

    async fn decode<T: DeserializeOwned>(url: String, response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let parsed: ApiErrorBody = serde_json::from_slice(&body).unwrap_or_default();
            let message = match (parsed.error_code, parsed.error_msg) {
                (Some(code), Some(msg)) => format!("{}: {}", code, msg),
                (None, Some(msg)) => msg,
                (Some(code), None) => code,
                (None, None) => String::from_utf8_lossy(&body).trim().to_string(),
            };
            debug!("API error from {}: {} {}", url, status, message);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice(&body).map_err(|source| ClientError::Decode { url, source })
    }

    /// Lists a zone-partitioned resource in every configured zone
    ///
    /// Each zone's response is turned into items tagged with that zone. A
    /// failure in any zone fails the whole listing.
    pub(crate) async fn find_in_zones<R: ZonedList>(
        &self,
        path: &str,
        query: Option<&serde_json::Value>,
    ) -> ClientResult<Vec<R::Item>> {
        let mut all = Vec::new();
        for zone in self.zones() {
            let response: R = self.get_json(&self.cloud_url(zone, path), query).await?;
            let items = response.into_items(zone);
            debug!("Found {} item(s) at {} in zone {}", items.len(), path, zone);
            all.extend(items);
        }
        Ok(all)
    }
}

/// `GET auth-status` response, reduced to the account
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AuthStatus {
    #[serde(rename = "Account")]
    account: Option<AccountRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AccountRef {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    id: String,
}

impl SakuraCloudClient {
    /// ID of the account the credentials belong to
    ///
    /// Billing and coupons are addressed by account rather than by zone.
    pub(crate) async fn account_id(&self) -> ClientResult<String> {
        let status: AuthStatus = self
            .get_json(&self.cloud_url(GLOBAL_ZONE, "auth-status"), None)
            .await?;
        match status.account {
            Some(account) if !account.id.is_empty() => Ok(account.id),
            _ => Err(ClientError::InvalidResponse(
                "auth-status carries no account ID".to_string(),
            )),
        }
    }
}

/// List response of a zone-partitioned resource
pub(crate) trait ZonedList: DeserializeOwned {
    type Item;

    fn into_items(self, zone: &str) -> Vec<Self::Item>;
}
