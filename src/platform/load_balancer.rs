// Load balancer appliances

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::api::SakuraCloudClient;
use super::appliance::{appliance_zone_scoped, Appliance};
use super::common::{deserialize_flag, deserialize_number, nullable};
use super::monitor::InterfaceValue;
use super::{ClientResult, MaintenanceClient};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoadBalancer {
    #[serde(flatten)]
    pub appliance: Appliance,
    #[serde(rename = "Settings", deserialize_with = "nullable")]
    pub settings: LoadBalancerSettings,
}

appliance_zone_scoped!(LoadBalancer);

impl LoadBalancer {
    pub fn virtual_ip_addresses(&self) -> &[VirtualIpAddress] {
        &self.settings.load_balancer
    }

    /// Two servers behind one VRRP group
    pub fn is_ha(&self) -> bool {
        self.appliance.remark.servers.len() > 1
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoadBalancerSettings {
    #[serde(rename = "LoadBalancer", deserialize_with = "nullable")]
    pub load_balancer: Vec<VirtualIpAddress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VirtualIpAddress {
    #[serde(rename = "VirtualIPAddress", deserialize_with = "nullable")]
    pub virtual_ip_address: String,
    #[serde(deserialize_with = "deserialize_number")]
    pub port: f64,
    #[serde(deserialize_with = "deserialize_number")]
    pub delay_loop: f64,
    #[serde(deserialize_with = "nullable")]
    pub sorry_server: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub servers: Vec<LoadBalancerServer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LoadBalancerServer {
    #[serde(rename = "IPAddress", deserialize_with = "nullable")]
    pub ip_address: String,
    #[serde(deserialize_with = "deserialize_number")]
    pub port: f64,
    #[serde(deserialize_with = "deserialize_flag")]
    pub enabled: bool,
    #[serde(deserialize_with = "nullable")]
    pub health_check: HealthCheck,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HealthCheck {
    /// "http", "https", "tcp" or "ping"
    #[serde(deserialize_with = "nullable")]
    pub protocol: String,
    #[serde(deserialize_with = "nullable")]
    pub path: String,
    #[serde(deserialize_with = "nullable")]
    pub status: String,
}

/// Live status of one virtual IP
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VipStatus {
    #[serde(rename = "VirtualIPAddress", deserialize_with = "nullable")]
    pub virtual_ip_address: String,
    #[serde(rename = "CPS", deserialize_with = "deserialize_number")]
    pub cps: f64,
    #[serde(deserialize_with = "nullable")]
    pub servers: Vec<ServerStatus>,
}

/// Live status of one real server behind a virtual IP
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServerStatus {
    #[serde(rename = "IPAddress", deserialize_with = "nullable")]
    pub ip_address: String,
    #[serde(deserialize_with = "deserialize_number")]
    pub port: f64,
    /// "UP" or "DOWN"
    #[serde(deserialize_with = "nullable")]
    pub status: String,
    #[serde(deserialize_with = "deserialize_number")]
    pub active_conn: f64,
    #[serde(rename = "CPS", deserialize_with = "deserialize_number")]
    pub cps: f64,
}

impl ServerStatus {
    pub fn is_up(&self) -> bool {
        self.status.eq_ignore_ascii_case("up")
    }
}

#[derive(Deserialize)]
struct LoadBalancerStatusResponse {
    #[serde(rename = "LoadBalancer", default)]
    load_balancer: Option<Vec<VipStatus>>,
}

#[async_trait]
pub trait LoadBalancerClient: MaintenanceClient {
    async fn find(&self) -> ClientResult<Vec<LoadBalancer>>;

    async fn status(&self, zone: &str, load_balancer_id: &str) -> ClientResult<Vec<VipStatus>>;

    async fn monitor_nic(
        &self,
        zone: &str,
        load_balancer_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>>;
}

#[async_trait]
impl LoadBalancerClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<LoadBalancer>> {
        self.find_appliances("loadbalancer").await
    }

    async fn status(&self, zone: &str, load_balancer_id: &str) -> ClientResult<Vec<VipStatus>> {
        let response: LoadBalancerStatusResponse =
            self.appliance_status(zone, load_balancer_id).await?;
        Ok(response.load_balancer.unwrap_or_default())
    }

    async fn monitor_nic(
        &self,
        zone: &str,
        load_balancer_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>> {
        self.monitor_appliance_nic(zone, load_balancer_id, 0, end)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_load_balancer() {
        let lb: LoadBalancer = serde_json::from_str(
            r#"{"ID": "1", "Plan": {"ID": 2},
                "Remark": {"Servers": [{"IPAddress": "192.0.2.11"}, {"IPAddress": "192.0.2.12"}],
                           "VRRP": {"VRID": 10}},
                "Settings": {"LoadBalancer": [{
                    "VirtualIPAddress": "192.0.2.101", "Port": "80", "DelayLoop": "10",
                    "SorryServer": "192.0.2.200",
                    "Servers": [{"IPAddress": "192.0.2.201", "Port": "80", "Enabled": "True",
                                 "HealthCheck": {"Protocol": "http", "Path": "/", "Status": "200"}}]
                }]}}"#,
        )
        .unwrap();

        assert!(lb.is_ha());
        assert_eq!(lb.appliance.remark.vrrp.vrid, 10);
        let vip = &lb.virtual_ip_addresses()[0];
        assert_eq!(vip.port, 80.0);
        assert_eq!(vip.delay_loop, 10.0);
        assert!(vip.servers[0].enabled);
        assert_eq!(vip.servers[0].health_check.protocol, "http");
    }

    #[test]
    fn test_decode_status() {
        let response: LoadBalancerStatusResponse = serde_json::from_str(
            r#"{"LoadBalancer": [{"VirtualIPAddress": "192.0.2.101", "Port": "80", "CPS": "5",
                "Servers": [{"IPAddress": "192.0.2.201", "Port": "80", "Status": "UP",
                             "ActiveConn": "3", "CPS": "2"}]}]}"#,
        )
        .unwrap();

        let status = response.load_balancer.unwrap();
        assert_eq!(status[0].cps, 5.0);
        assert!(status[0].servers[0].is_up());
        assert_eq!(status[0].servers[0].active_conn, 3.0);
    }
}
