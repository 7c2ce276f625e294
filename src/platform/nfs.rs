// NFS appliances

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::api::SakuraCloudClient;
use super::appliance::{appliance_zone_scoped, Appliance};
use super::monitor::{FreeDiskSizeValue, InterfaceValue};
use super::{ClientResult, MaintenanceClient};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Nfs {
    #[serde(flatten)]
    pub appliance: Appliance,
}

appliance_zone_scoped!(Nfs);

#[async_trait]
pub trait NfsClient: MaintenanceClient {
    async fn find(&self) -> ClientResult<Vec<Nfs>>;

    async fn monitor_free_disk_size(
        &self,
        zone: &str,
        nfs_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<FreeDiskSizeValue>>;

    async fn monitor_nic(
        &self,
        zone: &str,
        nfs_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>>;
}

#[async_trait]
impl NfsClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<Nfs>> {
        self.find_appliances("nfs").await
    }

    async fn monitor_free_disk_size(
        &self,
        zone: &str,
        nfs_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<FreeDiskSizeValue>> {
        let response = self
            .monitor(zone, &format!("appliance/{}/nfs/monitor", nfs_id), end)
            .await?;
        Ok(FreeDiskSizeValue::from_response(&response))
    }

    async fn monitor_nic(
        &self,
        zone: &str,
        nfs_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>> {
        self.monitor_appliance_nic(zone, nfs_id, 0, end).await
    }
}
