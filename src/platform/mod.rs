// Platform module - typed access to the Sakura Cloud API
//
// Each resource kind gets its own capability trait (`find` plus the
// per-metric fetches its collector needs). `SakuraCloudClient` implements
// all of them over HTTP; tests implement them with in-memory fakes.

use async_trait::async_trait;
use thiserror::Error;

pub mod api;
pub mod appliance;
pub mod common;
pub(crate) mod listing;
pub mod monitor;
pub mod newsfeed;

pub mod auto_backup;
pub mod bill;
pub mod coupon;
pub mod database;
pub mod esme;
pub mod internet;
pub mod load_balancer;
pub mod mobile_gateway;
pub mod nfs;
pub mod proxylb;
pub mod server;
pub mod sim;
pub mod vpc_router;
pub mod webaccel;
pub mod zone;

pub use api::{ClientOptions, SakuraCloudClient};
pub use newsfeed::FeedItem;

/// Errors returned by resource clients
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Lookup of published maintenance notices
///
/// Every resource kind that runs on a physical host shares this capability;
/// the URL comes from the resource itself.
#[async_trait]
pub trait MaintenanceClient: Send + Sync {
    /// Returns the feed item whose URL matches `info_url`, if it is published
    async fn maintenance_info(&self, info_url: &str) -> ClientResult<Option<FeedItem>>;
}
