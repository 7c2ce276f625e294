// Zone collector

use std::sync::Arc;

use async_trait::async_trait;
use prometheus::core::Desc;

use super::{new_desc, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::platform::zone::ZoneClient;

pub struct ZoneCollector {
    client: Arc<dyn ZoneClient>,

    zone_info: Arc<Desc>,
}

impl ZoneCollector {
    pub fn new(errors: &ErrorCounter, client: Arc<dyn ZoneClient>) -> Result<Self, prometheus::Error> {
        errors.init_collector("zone");

        Ok(ZoneCollector {
            client,
            zone_info: new_desc(
                "zone_info",
                "A metric with a constant '1' value labeled by zone information",
                &["id", "name", "description", "region_id", "region_name"],
            )?,
        })
    }
}

#[async_trait]
impl Collector for ZoneCollector {
    fn name(&self) -> &'static str {
        "zone"
    }

    fn describe(&self) -> Vec<&Desc> {
        vec![&self.zone_info]
    }

    async fn collect(&self, ctx: &CollectContext) {
        let zones = ctx
            .fetch("can't list zones", self.client.find())
            .await
            .unwrap_or_default();

        for zone in zones {
            ctx.emit(
                &self.zone_info,
                1.0,
                vec![
                    zone.id,
                    zone.name,
                    zone.description,
                    zone.region.id,
                    zone.region.name,
                ],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{api_error, single, TestFixture};
    use crate::platform::zone::{Region, Zone};
    use crate::platform::ClientResult;

    struct FakeZoneClient {
        fails: bool,
    }

    #[async_trait]
    impl ZoneClient for FakeZoneClient {
        async fn find(&self) -> ClientResult<Vec<Zone>> {
            if self.fails {
                return Err(api_error());
            }
            Ok(vec![Zone {
                id: "31001".to_string(),
                name: "is1a".to_string(),
                description: "Ishikari 1".to_string(),
                region: Region {
                    id: "310".to_string(),
                    name: "Ishikari".to_string(),
                },
            }])
        }
    }

    #[tokio::test]
    async fn test_zone_info() {
        let fixture = TestFixture::new();
        let collector =
            ZoneCollector::new(&fixture.errors, Arc::new(FakeZoneClient { fails: false })).unwrap();

        let samples = fixture.collect(&collector).await;

        let info = single(&samples, "sakuracloud_zone_info");
        assert_eq!(info.label("name"), Some("is1a"));
        assert_eq!(info.label("region_name"), Some("Ishikari"));
        assert_eq!(fixture.errors.get("zone"), 0);
    }

    #[tokio::test]
    async fn test_find_failure() {
        let fixture = TestFixture::new();
        let collector =
            ZoneCollector::new(&fixture.errors, Arc::new(FakeZoneClient { fails: true })).unwrap();

        assert!(fixture.collect(&collector).await.is_empty());
        assert_eq!(fixture.errors.get("zone"), 1);
    }
}
