// Generic list envelopes
//
// Appliances and common service items share one list endpoint each and are
// told apart by a class filter in the query document.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::api::{SakuraCloudClient, ZonedList, GLOBAL_ZONE};
use super::ClientResult;

/// Item that remembers the zone it was listed in
pub(crate) trait ZoneScoped {
    fn set_zone(&mut self, zone: &str);
}

fn tag_zone<T: ZoneScoped>(items: Option<Vec<T>>, zone: &str) -> Vec<T> {
    items
        .unwrap_or_default()
        .into_iter()
        .map(|mut item| {
            item.set_zone(zone);
            item
        })
        .collect()
}

/// `GET appliance` response
#[derive(Deserialize)]
pub(crate) struct ApplianceList<T> {
    #[serde(rename = "Appliances")]
    appliances: Option<Vec<T>>,
}

impl<T: ZoneScoped + DeserializeOwned> ZonedList for ApplianceList<T> {
    type Item = T;

    fn into_items(self, zone: &str) -> Vec<T> {
        tag_zone(self.appliances, zone)
    }
}

/// `GET commonserviceitem` response
#[derive(Deserialize)]
pub(crate) struct CommonServiceItemList<T> {
    #[serde(rename = "CommonServiceItems")]
    items: Option<Vec<T>>,
}

impl<T: ZoneScoped + DeserializeOwned> ZonedList for CommonServiceItemList<T> {
    type Item = T;

    fn into_items(self, zone: &str) -> Vec<T> {
        tag_zone(self.items, zone)
    }
}

/// Query selecting appliances of one class (`database`, `loadbalancer`, ...)
pub(crate) fn appliance_query(class: &str) -> serde_json::Value {
    json!({ "Filter": { "Class": class } })
}

/// Query selecting common service items of one provider class
pub(crate) fn common_service_query(class: &str) -> serde_json::Value {
    json!({ "Filter": { "Provider.Class": class } })
}

impl SakuraCloudClient {
    /// Lists a global common service item class (SIM, ProxyLB, ESME)
    pub(crate) async fn find_global_items<T>(&self, class: &str) -> ClientResult<Vec<T>>
    where
        T: ZoneScoped + DeserializeOwned,
    {
        let list: CommonServiceItemList<T> = self
            .get_json(
                &self.cloud_url(GLOBAL_ZONE, "commonserviceitem"),
                Some(&common_service_query(class)),
            )
            .await?;
        Ok(list.into_items(GLOBAL_ZONE))
    }

    /// Lists a zone-scoped common service item class in every configured zone
    pub(crate) async fn find_zoned_items<T>(&self, class: &str) -> ClientResult<Vec<T>>
    where
        T: ZoneScoped + DeserializeOwned,
    {
        self.find_in_zones::<CommonServiceItemList<T>>(
            "commonserviceitem",
            Some(&common_service_query(class)),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Item {
        #[serde(rename = "ID")]
        id: String,
        #[serde(skip)]
        zone: String,
    }

    impl ZoneScoped for Item {
        fn set_zone(&mut self, zone: &str) {
            self.zone = zone.to_string();
        }
    }

    #[test]
    fn test_lists_tag_zone() {
        let list: ApplianceList<Item> =
            serde_json::from_str(r#"{"Total": 1, "Appliances": [{"ID": "1"}]}"#).unwrap();
        let items = list.into_items("tk1a");
        assert_eq!(items[0].id, "1");
        assert_eq!(items[0].zone, "tk1a");

        let list: CommonServiceItemList<Item> =
            serde_json::from_str(r#"{"CommonServiceItems": null}"#).unwrap();
        assert!(list.into_items("is1a").is_empty());
    }

    #[test]
    fn test_missing_list_key_is_empty() {
        let list: ApplianceList<Item> = serde_json::from_str(r#"{"Total": 0}"#).unwrap();
        assert!(list.into_items("is1a").is_empty());

        let list: CommonServiceItemList<Item> = serde_json::from_str("{}").unwrap();
        assert!(list.into_items("is1a").is_empty());
    }

    #[test]
    fn test_class_queries() {
        assert_eq!(appliance_query("nfs")["Filter"]["Class"], "nfs");
        assert_eq!(common_service_query("sim")["Filter"]["Provider.Class"], "sim");
    }
}
