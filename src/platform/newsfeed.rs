// Maintenance news feed
//
// Hosts scheduled for maintenance carry an info URL. The details (title,
// window) live in a public JSON feed, one item per notice, keyed by URL.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

use super::api::SakuraCloudClient;
use super::common::nullable;
use super::{ClientResult, MaintenanceClient};

/// Published maintenance and failure feed
pub const DEFAULT_MAINTENANCE_FEED_URL: &str = "https://cloud.sakura.ad.jp/mainte_failure.json";

/// One maintenance notice
///
/// Dates arrive as strings holding unix seconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedItem {
    #[serde(rename = "date", deserialize_with = "nullable")]
    pub str_date: String,
    #[serde(rename = "desc", deserialize_with = "nullable")]
    pub description: String,
    #[serde(rename = "event_start", deserialize_with = "nullable")]
    pub str_event_start: String,
    #[serde(rename = "event_end", deserialize_with = "nullable")]
    pub str_event_end: String,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub url: String,
}

fn parse_unix(value: &str) -> Option<DateTime<Utc>> {
    let seconds: i64 = value.trim().parse().ok()?;
    Utc.timestamp_opt(seconds, 0).single()
}

impl FeedItem {
    pub fn date(&self) -> Option<DateTime<Utc>> {
        parse_unix(&self.str_date)
    }

    pub fn event_start(&self) -> Option<DateTime<Utc>> {
        parse_unix(&self.str_event_start)
    }

    pub fn event_end(&self) -> Option<DateTime<Utc>> {
        parse_unix(&self.str_event_end)
    }
}

#[async_trait]
impl MaintenanceClient for SakuraCloudClient {
    async fn maintenance_info(&self, info_url: &str) -> ClientResult<Option<FeedItem>> {
        let items: Vec<FeedItem> = self.get_public_json(self.maintenance_feed_url()).await?;
        debug!("Maintenance feed has {} item(s)", items.len());
        Ok(items.into_iter().find(|item| item.url == info_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_item_dates() {
        let items: Vec<FeedItem> = serde_json::from_str(
            r#"[{"date": "946652400", "desc": "desc", "event_start": "946652400",
                 "event_end": "949244400", "title": "title", "url": "https://example.com/1"},
                {"date": null, "title": "other", "url": "https://example.com/2"}]"#,
        )
        .unwrap();

        assert_eq!(items[0].event_start().unwrap().timestamp(), 946652400);
        assert_eq!(items[0].event_end().unwrap().timestamp(), 949244400);
        assert_eq!(items[0].date().unwrap().timestamp(), 946652400);
        assert!(items[1].date().is_none());
        assert!(items[1].event_start().is_none());
    }
}
