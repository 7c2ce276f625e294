// NFS collector

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use prometheus::core::Desc;

use super::appliance::{appliance_labels, NicAddress, NicDescs, APPLIANCE_LABELS};
use super::maintenance::MaintenanceDescs;
use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::{bool_to_f64, flatten_string_slice, kib_to_gb, nfs_plan_label};
use crate::platform::nfs::{Nfs, NfsClient};

pub struct NfsCollector {
    client: Arc<dyn NfsClient>,

    up: Arc<Desc>,
    nfs_info: Arc<Desc>,
    free_disk_size: Arc<Desc>,
    nics: NicDescs,
    maintenance: MaintenanceDescs,
}

impl NfsCollector {
    pub fn new(errors: &ErrorCounter, client: Arc<dyn NfsClient>) -> Result<Self, prometheus::Error> {
        errors.init_collector("nfs");

        Ok(NfsCollector {
            client,
            up: new_desc(
                "nfs_up",
                "If 1 the nfs is up and running, 0 otherwise",
                APPLIANCE_LABELS,
            )?,
            nfs_info: new_desc(
                "nfs_info",
                "A metric with a constant '1' value labeled by nfs information",
                &with_labels(APPLIANCE_LABELS, &["plan", "host", "tags", "description"]),
            )?,
            free_disk_size: new_desc(
                "nfs_free_disk_size",
                "NFS's Free Disk Size(unit: GB)",
                APPLIANCE_LABELS,
            )?,
            nics: NicDescs::new("nfs", "")?,
            maintenance: MaintenanceDescs::new("nfs", "nfs", APPLIANCE_LABELS)?,
        })
    }

    async fn collect_nfs(&self, ctx: &CollectContext, nfs: &Nfs) {
        let appliance = &nfs.appliance;
        let labels = appliance_labels(appliance);
        let is_up = appliance.is_up();

        ctx.emit(&self.up, bool_to_f64(is_up), labels.clone());

        let mut info_labels = labels.clone();
        info_labels.extend([
            nfs_plan_label(&appliance.plan.id),
            appliance.instance.host_name(),
            flatten_string_slice(&appliance.tags),
            appliance.description.clone(),
        ]);
        ctx.emit(&self.nfs_info, 1.0, info_labels);

        if let Some(nic) = appliance.interfaces.first() {
            self.nics
                .emit_info(ctx, appliance, 0, nic, NicAddress::from_remark(appliance, 0));
        }

        let maintenance = self.maintenance.collect(
            ctx,
            self.client.as_ref(),
            &labels,
            &appliance.id,
            appliance.instance.maintenance_info_url(),
        );

        if is_up {
            futures_util::join!(
                maintenance,
                self.collect_free_disk_size(ctx, nfs),
                self.collect_nic(ctx, nfs),
            );
        } else {
            maintenance.await;
        }
    }

    async fn collect_free_disk_size(&self, ctx: &CollectContext, nfs: &Nfs) {
        let appliance = &nfs.appliance;
        let value = ctx
            .fetch_optional(
                format!("can't get nfs's free disk size: ID={}", appliance.id),
                self.client
                    .monitor_free_disk_size(&appliance.zone, &appliance.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            ctx.emit_at(
                &self.free_disk_size,
                kib_to_gb(value.free_disk_size),
                appliance_labels(appliance),
                value.time,
            );
        }
    }

    async fn collect_nic(&self, ctx: &CollectContext, nfs: &Nfs) {
        let appliance = &nfs.appliance;
        let value = ctx
            .fetch_optional(
                format!("can't get nfs's receive/send bytes: ID={}", appliance.id),
                self.client.monitor_nic(&appliance.zone, &appliance.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            self.nics.emit_traffic(ctx, appliance, 0, &value);
        }
    }
}

#[async_trait]
impl Collector for NfsCollector {
    fn name(&self) -> &'static str {
        "nfs"
    }

    fn describe(&self) -> Vec<&Desc> {
        let mut descs: Vec<&Desc> = vec![&self.up, &self.nfs_info, &self.free_disk_size];
        descs.extend(self.nics.descs());
        descs.extend(self.maintenance.descs());
        descs
    }

    async fn collect(&self, ctx: &CollectContext) {
        let all = ctx
            .fetch("can't list nfs", self.client.find())
            .await
            .unwrap_or_default();

        join_all(all.iter().map(|nfs| self.collect_nfs(ctx, nfs))).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{api_error, fixed_now, render, samples_named, single, TestFixture};
    use crate::platform::appliance::Appliance;
    use crate::platform::common::{HostInfo, IdRef, Instance, Interface};
    use crate::platform::monitor::{FreeDiskSizeValue, InterfaceValue};
    use crate::platform::{ClientResult, FeedItem, MaintenanceClient};
    use chrono::{DateTime, Utc};

    #[derive(Default)]
    struct FakeNfsClient {
        all: Vec<Nfs>,
        find_fails: bool,
        feed: Option<FeedItem>,
    }

    #[async_trait]
    impl MaintenanceClient for FakeNfsClient {
        async fn maintenance_info(&self, _info_url: &str) -> ClientResult<Option<FeedItem>> {
            Ok(self.feed.clone())
        }
    }

    #[async_trait]
    impl NfsClient for FakeNfsClient {
        async fn find(&self) -> ClientResult<Vec<Nfs>> {
            if self.find_fails {
                return Err(api_error());
            }
            Ok(self.all.clone())
        }

        async fn monitor_free_disk_size(
            &self,
            _zone: &str,
            _id: &str,
            _end: DateTime<Utc>,
        ) -> ClientResult<Option<FreeDiskSizeValue>> {
            Ok(Some(FreeDiskSizeValue {
                time: fixed_now(),
                free_disk_size: 1024.0 * 1024.0 * 3.0,
            }))
        }

        async fn monitor_nic(
            &self,
            _zone: &str,
            _id: &str,
            _end: DateTime<Utc>,
        ) -> ClientResult<Option<InterfaceValue>> {
            Ok(None)
        }
    }

    fn nfs(status: &str, info_url: &str) -> Nfs {
        Nfs {
            appliance: Appliance {
                id: "101".to_string(),
                name: "nfs".to_string(),
                zone: "tk1a".to_string(),
                availability: "available".to_string(),
                plan: IdRef {
                    id: "2".to_string(),
                },
                instance: Instance {
                    status: status.to_string(),
                    host: Some(HostInfo {
                        name: "host".to_string(),
                        info_url: info_url.to_string(),
                    }),
                },
                interfaces: vec![Interface::default()],
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_find_failure_and_empty() {
        let fixture = TestFixture::new();
        let failing = NfsCollector::new(
            &fixture.errors,
            Arc::new(FakeNfsClient {
                find_fails: true,
                ..Default::default()
            }),
        )
        .unwrap();
        assert!(fixture.collect(&failing).await.is_empty());
        assert_eq!(fixture.errors.get("nfs"), 1);

        let empty = NfsCollector::new(&fixture.errors, Arc::new(FakeNfsClient::default())).unwrap();
        assert!(fixture.collect(&empty).await.is_empty());
        assert_eq!(fixture.errors.get("nfs"), 1);
    }

    #[tokio::test]
    async fn test_up_nfs() {
        let fixture = TestFixture::new();
        let client = FakeNfsClient {
            all: vec![nfs("up", "")],
            ..Default::default()
        };
        let collector = NfsCollector::new(&fixture.errors, Arc::new(client)).unwrap();

        let samples = fixture.collect(&collector).await;

        let info = single(&samples, "sakuracloud_nfs_info");
        assert_eq!(info.label("plan"), Some("ssd"));
        assert_eq!(info.label("host"), Some("host"));
        assert_eq!(single(&samples, "sakuracloud_nfs_free_disk_size").value(), 3.0);
        // an empty monitor response is not an error
        assert!(samples_named(&samples, "sakuracloud_nfs_receive").is_empty());
        assert_eq!(fixture.errors.get("nfs"), 0);
        assert_eq!(
            single(&samples, "sakuracloud_nfs_maintenance_scheduled").value(),
            0.0
        );
    }

    #[tokio::test]
    async fn test_down_nfs_still_reports_maintenance() {
        let fixture = TestFixture::new();
        let client = FakeNfsClient {
            all: vec![nfs("down", "https://maintenance.example.com/")],
            feed: Some(FeedItem {
                str_event_start: "946652400".to_string(),
                str_event_end: "949244400".to_string(),
                url: "https://maintenance.example.com/".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let collector = NfsCollector::new(&fixture.errors, Arc::new(client)).unwrap();

        let first = fixture.collect(&collector).await;

        assert_eq!(single(&first, "sakuracloud_nfs_up").value(), 0.0);
        assert!(samples_named(&first, "sakuracloud_nfs_free_disk_size").is_empty());
        assert_eq!(
            single(&first, "sakuracloud_nfs_maintenance_scheduled").value(),
            1.0
        );
        assert_eq!(
            single(&first, "sakuracloud_nfs_maintenance_start").value(),
            946652400.0
        );

        let second = fixture.collect(&collector).await;
        assert_eq!(render(&first), render(&second));
    }
}
