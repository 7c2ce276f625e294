// Servers
//
// Listing is per zone; CPU, disk and NIC activity come from the
// per-resource monitor endpoints.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::api::{SakuraCloudClient, ZonedList};
use super::common::{deserialize_id, nullable, IdRef, Instance, Interface};
use super::monitor::{CpuTimeValue, DiskValue, InterfaceValue};
use super::{ClientResult, MaintenanceClient};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Server {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub availability: String,
    #[serde(deserialize_with = "nullable")]
    pub server_plan: ServerPlan,
    #[serde(deserialize_with = "nullable")]
    pub instance: Instance,
    #[serde(deserialize_with = "nullable")]
    pub disks: Vec<ServerDisk>,
    #[serde(deserialize_with = "nullable")]
    pub interfaces: Vec<Interface>,
    /// Zone the server was listed in
    #[serde(skip)]
    pub zone: String,
}

impl Server {
    pub fn is_available(&self) -> bool {
        self.availability == "available"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServerPlan {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(rename = "CPU", deserialize_with = "nullable")]
    pub cpu: u32,
    #[serde(rename = "MemoryMB", deserialize_with = "nullable")]
    pub memory_mb: u64,
    /// "standard" or "dedicatedcpu"
    #[serde(deserialize_with = "nullable")]
    pub commitment: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServerDisk {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub tags: Vec<String>,
    /// "virtio" or "ide"
    #[serde(deserialize_with = "nullable")]
    pub connection: String,
    #[serde(rename = "SizeMB", deserialize_with = "nullable")]
    pub size_mb: u64,
    #[serde(deserialize_with = "nullable")]
    pub plan: IdRef,
}

#[derive(Deserialize)]
struct ServerList {
    #[serde(rename = "Servers", default, deserialize_with = "nullable")]
    servers: Vec<Server>,
}

impl ZonedList for ServerList {
    type Item = Server;

    fn into_items(self, zone: &str) -> Vec<Server> {
        self.servers
            .into_iter()
            .map(|server| Server {
                zone: zone.to_string(),
                ..server
            })
            .collect()
    }
}

#[async_trait]
pub trait ServerClient: MaintenanceClient {
    async fn find(&self) -> ClientResult<Vec<Server>>;

    async fn monitor_cpu(
        &self,
        zone: &str,
        server_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<CpuTimeValue>>;

    async fn monitor_disk(
        &self,
        zone: &str,
        disk_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<DiskValue>>;

    async fn monitor_nic(
        &self,
        zone: &str,
        interface_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>>;
}

#[async_trait]
impl ServerClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<Server>> {
        self.find_in_zones::<ServerList>("server", None).await
    }

    async fn monitor_cpu(
        &self,
        zone: &str,
        server_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<CpuTimeValue>> {
        let response = self
            .monitor(zone, &format!("server/{}/monitor", server_id), end)
            .await?;
        Ok(CpuTimeValue::from_response(&response))
    }

    async fn monitor_disk(
        &self,
        zone: &str,
        disk_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<DiskValue>> {
        let response = self
            .monitor(zone, &format!("disk/{}/monitor", disk_id), end)
            .await?;
        Ok(DiskValue::from_response(&response))
    }

    async fn monitor_nic(
        &self,
        zone: &str,
        interface_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>> {
        let response = self
            .monitor(zone, &format!("interface/{}/monitor", interface_id), end)
            .await?;
        Ok(InterfaceValue::from_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_server_list() {
        let list: ServerList = serde_json::from_str(
            r#"{"Total": 1, "Servers": [{
                "ID": "113200000001", "Name": "server", "Description": null,
                "Tags": ["tag1"], "Availability": "available",
                "ServerPlan": {"ID": 100001001, "CPU": 2, "MemoryMB": 4096, "Commitment": "standard"},
                "Instance": {"Status": "up", "Host": {"Name": "sac-is1a-sv001", "InfoURL": null}},
                "Disks": [{"ID": "113200000002", "Name": "disk", "Connection": "virtio",
                           "SizeMB": 20480, "Plan": {"ID": 4}}],
                "Interfaces": [{"ID": "113200000003", "IPAddress": "192.0.2.11", "Switch": null}]
            }]}"#,
        )
        .unwrap();

        let servers = list.into_items("is1a");
        assert_eq!(servers.len(), 1);
        let server = &servers[0];
        assert_eq!(server.zone, "is1a");
        assert_eq!(server.description, "");
        assert!(server.is_available());
        assert!(server.instance.is_up());
        assert_eq!(server.instance.host_name(), "sac-is1a-sv001");
        assert_eq!(server.instance.maintenance_info_url(), "");
        assert_eq!(server.server_plan.memory_mb, 4096);
        assert_eq!(server.disks[0].plan.id, "4");
        assert_eq!(server.interfaces[0].upstream_type(), "none");
    }
}
