// Internet (switch + router)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::api::{SakuraCloudClient, ZonedList};
use super::common::{deserialize_id, deserialize_number, nullable};
use super::monitor::RouterValue;
use super::ClientResult;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Internet {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "deserialize_number")]
    pub band_width_mbps: f64,
    #[serde(deserialize_with = "nullable")]
    pub switch: InternetSwitch,
    #[serde(skip)]
    pub zone: String,
}

/// Switch created alongside the router
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct InternetSwitch {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
}

#[derive(Deserialize)]
struct InternetList {
    #[serde(rename = "Internet", default)]
    internet: Option<Vec<Internet>>,
}

impl ZonedList for InternetList {
    type Item = Internet;

    fn into_items(self, zone: &str) -> Vec<Internet> {
        self.internet
            .unwrap_or_default()
            .into_iter()
            .map(|mut internet| {
                internet.zone = zone.to_string();
                internet
            })
            .collect()
    }
}

#[async_trait]
pub trait InternetClient: Send + Sync {
    async fn find(&self) -> ClientResult<Vec<Internet>>;

    async fn monitor(
        &self,
        zone: &str,
        internet_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<RouterValue>>;
}

#[async_trait]
impl InternetClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<Internet>> {
        self.find_in_zones::<InternetList>("internet", None).await
    }

    async fn monitor(
        &self,
        zone: &str,
        internet_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<RouterValue>> {
        let response = SakuraCloudClient::monitor(
            self,
            zone,
            &format!("internet/{}/monitor", internet_id),
            end,
        )
        .await?;
        Ok(RouterValue::from_response(&response))
    }
}
