// ESME (SMS gateway)

use async_trait::async_trait;
use serde::Deserialize;

use super::api::{SakuraCloudClient, GLOBAL_ZONE};
use super::common::{nullable, ServiceItem};
use super::listing::ZoneScoped;
use super::ClientResult;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Esme {
    #[serde(flatten)]
    pub item: ServiceItem,
}

impl ZoneScoped for Esme {
    fn set_zone(&mut self, zone: &str) {
        self.item.zone = zone.to_string();
    }
}

/// One message sent through the gateway
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EsmeLog {
    #[serde(deserialize_with = "nullable")]
    pub message_id: String,
    /// "Accepted", "Delivered", "Failed", ...
    #[serde(deserialize_with = "nullable")]
    pub status: String,
    #[serde(deserialize_with = "nullable")]
    pub destination: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct EsmeLogs {
    #[serde(rename = "Logs", deserialize_with = "nullable")]
    logs: Vec<EsmeLog>,
}

#[derive(Deserialize)]
struct EsmeLogsResponse {
    #[serde(rename = "ESME", default)]
    esme: Option<EsmeLogs>,
}

#[async_trait]
pub trait EsmeClient: Send + Sync {
    async fn find(&self) -> ClientResult<Vec<Esme>>;

    async fn logs(&self, esme_id: &str) -> ClientResult<Vec<EsmeLog>>;
}

#[async_trait]
impl EsmeClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<Esme>> {
        self.find_global_items("esme").await
    }

    async fn logs(&self, esme_id: &str) -> ClientResult<Vec<EsmeLog>> {
        let url = self.cloud_url(GLOBAL_ZONE, &format!("commonserviceitem/{}/esme/logs", esme_id));
        let response: EsmeLogsResponse = self.get_json(&url, None).await?;
        Ok(response.esme.map(|esme| esme.logs).unwrap_or_default())
    }
}
