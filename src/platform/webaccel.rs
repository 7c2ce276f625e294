// Web accelerator (CDN)
//
// Sites and their usage live on the webaccel API. Usage is reported once a
// month for every site of the account, so both lists are fetched whole and
// joined by site ID.

use async_trait::async_trait;
use serde::Deserialize;

use super::api::SakuraCloudClient;
use super::common::{deserialize_id, deserialize_number, nullable};
use super::ClientResult;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Site {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    /// "own_domain" or "subdomain"
    #[serde(deserialize_with = "nullable")]
    pub domain_type: String,
    #[serde(deserialize_with = "nullable")]
    pub domain: String,
    #[serde(deserialize_with = "nullable")]
    pub subdomain: String,
    #[serde(rename = "ASCIIDomain", deserialize_with = "nullable")]
    pub ascii_domain: String,
    #[serde(deserialize_with = "nullable")]
    pub origin: String,
    #[serde(deserialize_with = "nullable")]
    pub status: String,
}

/// One site's usage in the current month
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MonthlyUsage {
    #[serde(rename = "SiteID", deserialize_with = "deserialize_id")]
    pub site_id: String,
    #[serde(deserialize_with = "deserialize_number")]
    pub access_count: f64,
    #[serde(deserialize_with = "deserialize_number")]
    pub bytes_sent: f64,
    #[serde(deserialize_with = "deserialize_number")]
    pub cache_miss_bytes_sent: f64,
    #[serde(deserialize_with = "deserialize_number")]
    pub cache_hit_ratio: f64,
    #[serde(deserialize_with = "deserialize_number")]
    pub bytes_cache_hit_ratio: f64,
    /// In JPY
    #[serde(deserialize_with = "deserialize_number")]
    pub price: f64,
}

#[derive(Deserialize)]
struct SiteList {
    #[serde(rename = "Sites", default)]
    sites: Option<Vec<Site>>,
}

#[derive(Deserialize)]
struct MonthlyUsageList {
    #[serde(rename = "MonthlyUsages", default)]
    usages: Option<Vec<MonthlyUsage>>,
}

#[async_trait]
pub trait WebAccelClient: Send + Sync {
    async fn find(&self) -> ClientResult<Vec<Site>>;

    async fn monthly_usage(&self) -> ClientResult<Vec<MonthlyUsage>>;
}

#[async_trait]
impl WebAccelClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<Site>> {
        let list: SiteList = self.get_json(&self.webaccel_url("site"), None).await?;
        Ok(list.sites.unwrap_or_default())
    }

    async fn monthly_usage(&self) -> ClientResult<Vec<MonthlyUsage>> {
        let list: MonthlyUsageList = self
            .get_json(&self.webaccel_url("monthlyusage"), None)
            .await?;
        Ok(list.usages.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_sites_and_usage() {
        let sites: SiteList = serde_json::from_str(
            r#"{"Total": 1, "Sites": [{"ID": "1", "Name": "site", "DomainType": "subdomain",
                "Subdomain": "site.user.webaccel.jp", "ASCIIDomain": "", "Status": "enabled"}]}"#,
        )
        .unwrap();
        assert_eq!(sites.sites.unwrap()[0].domain_type, "subdomain");

        let usage: MonthlyUsageList = serde_json::from_str(
            r#"{"Year": 2020, "Month": 1, "MonthlyUsages": [{"SiteID": 1, "AccessCount": 100,
                "BytesSent": "2048", "CacheMissBytesSent": 1024, "CacheHitRatio": 0.5,
                "BytesCacheHitRatio": 0.5, "Price": 10}]}"#,
        )
        .unwrap();
        let usage = &usage.usages.unwrap()[0];
        assert_eq!(usage.site_id, "1");
        assert_eq!(usage.bytes_sent, 2048.0);
        assert_eq!(usage.price, 10.0);
    }
}
