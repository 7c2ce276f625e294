// Zones

use async_trait::async_trait;
use serde::Deserialize;

use super::api::{SakuraCloudClient, GLOBAL_ZONE};
use super::common::{deserialize_id, nullable};
use super::ClientResult;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Zone {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub region: Region,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Region {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Deserialize)]
struct ZoneList {
    #[serde(rename = "Zones", default)]
    zones: Option<Vec<Zone>>,
}

#[async_trait]
pub trait ZoneClient: Send + Sync {
    async fn find(&self) -> ClientResult<Vec<Zone>>;
}

#[async_trait]
impl ZoneClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<Zone>> {
        let list: ZoneList = self
            .get_json(&self.cloud_url(GLOBAL_ZONE, "zone"), None)
            .await?;
        Ok(list.zones.unwrap_or_default())
    }
}
