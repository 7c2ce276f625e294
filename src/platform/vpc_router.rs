// VPC router appliances

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::api::SakuraCloudClient;
use super::appliance::{appliance_zone_scoped, Appliance};
use super::common::{deserialize_flag, deserialize_number, nullable};
use super::monitor::{CpuTimeValue, InterfaceValue};
use super::{ClientResult, MaintenanceClient};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VpcRouter {
    #[serde(flatten)]
    pub appliance: Appliance,
    #[serde(rename = "Settings", deserialize_with = "nullable")]
    pub settings: VpcRouterSettings,
}

appliance_zone_scoped!(VpcRouter);

impl VpcRouter {
    pub fn router(&self) -> &RouterSetting {
        &self.settings.router
    }

    /// Address settings of the NIC at `index`, if configured
    pub fn interface_setting(&self, index: usize) -> Option<&RouterInterfaceSetting> {
        self.settings
            .router
            .interfaces
            .iter()
            .flatten()
            .find(|setting| setting.index() == index)
    }

    /// Standard plan routers have a single address per NIC
    pub fn is_ha(&self) -> bool {
        self.appliance.plan.id != "1"
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VpcRouterSettings {
    #[serde(rename = "Router", deserialize_with = "nullable")]
    pub router: RouterSetting,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RouterSetting {
    #[serde(deserialize_with = "nullable")]
    pub internet_connection: EnabledFlag,
    /// Indexed by NIC; unconfigured NICs are null
    #[serde(deserialize_with = "nullable")]
    pub interfaces: Vec<Option<RouterInterfaceSetting>>,
    #[serde(rename = "VRID", deserialize_with = "nullable")]
    pub vrid: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EnabledFlag {
    #[serde(deserialize_with = "deserialize_flag")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RouterInterfaceSetting {
    #[serde(rename = "IPAddress", deserialize_with = "nullable")]
    pub ip_address: Vec<String>,
    #[serde(rename = "VirtualIPAddress", deserialize_with = "nullable")]
    pub virtual_ip_address: String,
    #[serde(deserialize_with = "nullable")]
    pub network_mask_len: u32,
    #[serde(deserialize_with = "deserialize_number")]
    pub index: f64,
}

impl RouterInterfaceSetting {
    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn ip_address(&self, position: usize) -> String {
        self.ip_address.get(position).cloned().unwrap_or_default()
    }
}

/// Live router status
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VpcRouterStatus {
    #[serde(deserialize_with = "deserialize_number")]
    pub session_count: f64,
    #[serde(rename = "DHCPServerLeases", deserialize_with = "nullable")]
    pub dhcp_server_leases: Vec<DhcpLease>,
    #[serde(rename = "L2TPIPsecServerSessions", deserialize_with = "nullable")]
    pub l2tp_ipsec_server_sessions: Vec<VpnSession>,
    #[serde(rename = "PPTPServerSessions", deserialize_with = "nullable")]
    pub pptp_server_sessions: Vec<VpnSession>,
    #[serde(rename = "SiteToSiteIPsecVPNPeers", deserialize_with = "nullable")]
    pub site_to_site_ipsec_vpn_peers: Vec<SiteToSitePeer>,
    #[serde(deserialize_with = "nullable")]
    pub session_analysis: SessionAnalysis,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DhcpLease {
    #[serde(rename = "IPAddress", deserialize_with = "nullable")]
    pub ip_address: String,
    #[serde(rename = "MACAddress", deserialize_with = "nullable")]
    pub mac_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VpnSession {
    #[serde(deserialize_with = "nullable")]
    pub user: String,
    #[serde(rename = "IPAddress", deserialize_with = "nullable")]
    pub ip_address: String,
    #[serde(deserialize_with = "deserialize_number")]
    pub time_sec: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SiteToSitePeer {
    /// "UP" or "DOWN"
    #[serde(deserialize_with = "nullable")]
    pub status: String,
    #[serde(deserialize_with = "nullable")]
    pub peer: String,
}

impl SiteToSitePeer {
    pub fn is_up(&self) -> bool {
        self.status.eq_ignore_ascii_case("up")
    }
}

/// Top talkers grouped four ways
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SessionAnalysis {
    #[serde(deserialize_with = "nullable")]
    pub source_and_destination: Vec<SessionAnalysisValue>,
    #[serde(deserialize_with = "nullable")]
    pub destination_address: Vec<SessionAnalysisValue>,
    #[serde(deserialize_with = "nullable")]
    pub destination_port: Vec<SessionAnalysisValue>,
    #[serde(deserialize_with = "nullable")]
    pub source_address: Vec<SessionAnalysisValue>,
}

impl SessionAnalysis {
    /// Groups paired with the label value naming them
    pub fn groups(&self) -> [(&'static str, &[SessionAnalysisValue]); 4] {
        [
            ("SourceAndDestination", self.source_and_destination.as_slice()),
            ("DestinationAddress", self.destination_address.as_slice()),
            ("DestinationPort", self.destination_port.as_slice()),
            ("SourceAddress", self.source_address.as_slice()),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SessionAnalysisValue {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "deserialize_number")]
    pub count: f64,
}

#[derive(Deserialize)]
struct VpcRouterStatusResponse {
    #[serde(rename = "Router", default)]
    router: Option<VpcRouterStatus>,
}

#[async_trait]
pub trait VpcRouterClient: MaintenanceClient {
    async fn find(&self) -> ClientResult<Vec<VpcRouter>>;

    async fn status(&self, zone: &str, router_id: &str) -> ClientResult<Option<VpcRouterStatus>>;

    async fn monitor_nic(
        &self,
        zone: &str,
        router_id: &str,
        index: usize,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>>;

    async fn monitor_cpu(
        &self,
        zone: &str,
        router_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<CpuTimeValue>>;
}

#[async_trait]
impl VpcRouterClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<VpcRouter>> {
        self.find_appliances("vpcrouter").await
    }

    async fn status(&self, zone: &str, router_id: &str) -> ClientResult<Option<VpcRouterStatus>> {
        let response: VpcRouterStatusResponse = self.appliance_status(zone, router_id).await?;
        Ok(response.router)
    }

    async fn monitor_nic(
        &self,
        zone: &str,
        router_id: &str,
        index: usize,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>> {
        self.monitor_appliance_nic(zone, router_id, index, end).await
    }

    async fn monitor_cpu(
        &self,
        zone: &str,
        router_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<CpuTimeValue>> {
        self.monitor_appliance_cpu(zone, router_id, end).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_vpc_router() {
        let router: VpcRouter = serde_json::from_str(
            r#"{"ID": "1", "Plan": {"ID": 2},
                "Settings": {"Router": {
                    "InternetConnection": {"Enabled": "True"},
                    "VRID": 1,
                    "Interfaces": [
                        {"IPAddress": ["192.0.2.11", "192.0.2.12"], "VirtualIPAddress": "192.0.2.10",
                         "NetworkMaskLen": 24, "Index": 0},
                        null,
                        {"IPAddress": ["10.0.0.2", "10.0.0.3"], "NetworkMaskLen": 24, "Index": 2}
                    ]}}}"#,
        )
        .unwrap();

        assert!(router.is_ha());
        assert!(router.router().internet_connection.enabled);
        assert_eq!(router.interface_setting(0).unwrap().virtual_ip_address, "192.0.2.10");
        assert!(router.interface_setting(1).is_none());
        assert_eq!(router.interface_setting(2).unwrap().ip_address(1), "10.0.0.3");
    }

    #[test]
    fn test_decode_status() {
        let response: VpcRouterStatusResponse = serde_json::from_str(
            r#"{"Router": {"SessionCount": 12,
                "DHCPServerLeases": [{"IPAddress": "192.168.0.11", "MACAddress": "00:00:5e:00:53:01"}],
                "L2TPIPsecServerSessions": null,
                "PPTPServerSessions": [{"User": "user", "IPAddress": "192.168.1.11", "TimeSec": 10}],
                "SiteToSiteIPsecVPNPeers": [{"Status": "UP", "Peer": "198.51.100.1"}],
                "SessionAnalysis": {"SourceAddress": [{"Name": "192.168.0.11", "Count": 4}]}}}"#,
        )
        .unwrap();

        let status = response.router.unwrap();
        assert_eq!(status.session_count, 12.0);
        assert_eq!(status.dhcp_server_leases.len(), 1);
        assert!(status.l2tp_ipsec_server_sessions.is_empty());
        assert!(status.site_to_site_ipsec_vpn_peers[0].is_up());
        assert_eq!(status.session_analysis.source_address[0].count, 4.0);
    }
}
