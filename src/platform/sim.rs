// SIMs
//
// SIMs are global common service items. Session state and the carriers a
// SIM may roam onto come from dedicated sub-resources.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::api::{SakuraCloudClient, GLOBAL_ZONE};
use super::common::{deserialize_flag, deserialize_number, nullable, ServiceItem};
use super::listing::ZoneScoped;
use super::monitor::LinkValue;
use super::ClientResult;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Sim {
    #[serde(flatten)]
    pub item: ServiceItem,
    #[serde(rename = "Status", deserialize_with = "nullable")]
    pub status: SimStatusRef,
}

impl ZoneScoped for Sim {
    fn set_zone(&mut self, zone: &str) {
        self.item.zone = zone.to_string();
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimStatusRef {
    #[serde(rename = "ICCID", deserialize_with = "nullable")]
    pub iccid: String,
}

/// Live SIM state
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimInfo {
    #[serde(deserialize_with = "nullable")]
    pub iccid: String,
    #[serde(deserialize_with = "nullable")]
    pub ip: String,
    /// "UP" or "DOWN"
    #[serde(deserialize_with = "nullable")]
    pub session_status: String,
    #[serde(deserialize_with = "deserialize_flag")]
    pub imei_lock: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub registered: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub activated: bool,
    pub traffic_bytes_of_current_month: Option<SimTraffic>,
}

impl SimInfo {
    pub fn is_session_up(&self) -> bool {
        self.session_status.eq_ignore_ascii_case("up")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimTraffic {
    #[serde(deserialize_with = "deserialize_number")]
    pub uplink_bytes: f64,
    #[serde(deserialize_with = "deserialize_number")]
    pub downlink_bytes: f64,
}

/// Whether a SIM may attach to one carrier
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NetworkOperatorConfig {
    #[serde(deserialize_with = "deserialize_flag")]
    pub allow: bool,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
}

#[derive(Deserialize)]
struct SimStatusResponse {
    #[serde(default)]
    sim: Option<SimInfo>,
}

#[derive(Deserialize)]
struct NetworkOperatorConfigResponse {
    #[serde(default)]
    network_operator_config: Option<Vec<NetworkOperatorConfig>>,
}

#[async_trait]
pub trait SimClient: Send + Sync {
    async fn find(&self) -> ClientResult<Vec<Sim>>;

    async fn status(&self, sim_id: &str) -> ClientResult<Option<SimInfo>>;

    async fn network_operator_config(
        &self,
        sim_id: &str,
    ) -> ClientResult<Vec<NetworkOperatorConfig>>;

    async fn monitor_sim(&self, sim_id: &str, end: DateTime<Utc>)
        -> ClientResult<Option<LinkValue>>;
}

#[async_trait]
impl SimClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<Sim>> {
        self.find_global_items("sim").await
    }

    async fn status(&self, sim_id: &str) -> ClientResult<Option<SimInfo>> {
        let url = self.cloud_url(GLOBAL_ZONE, &format!("commonserviceitem/{}/sim/status", sim_id));
        let response: SimStatusResponse = self.get_json(&url, None).await?;
        Ok(response.sim)
    }

    async fn network_operator_config(
        &self,
        sim_id: &str,
    ) -> ClientResult<Vec<NetworkOperatorConfig>> {
        let url = self.cloud_url(
            GLOBAL_ZONE,
            &format!("commonserviceitem/{}/sim/network_operator_config", sim_id),
        );
        let response: NetworkOperatorConfigResponse = self.get_json(&url, None).await?;
        Ok(response.network_operator_config.unwrap_or_default())
    }

    async fn monitor_sim(
        &self,
        sim_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<LinkValue>> {
        let response = self
            .monitor(
                GLOBAL_ZONE,
                &format!("commonserviceitem/{}/sim/metrics/monitor", sim_id),
                end,
            )
            .await?;
        Ok(LinkValue::from_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_sim_status() {
        let response: SimStatusResponse = serde_json::from_str(
            r#"{"sim": {"iccid": "8981000000000000001", "ip": "192.168.100.1",
                "session_status": "UP", "imei_lock": false, "registered": true,
                "activated": true,
                "traffic_bytes_of_current_month": {"uplink_bytes": 1000, "downlink_bytes": "2000"}}}"#,
        )
        .unwrap();

        let info = response.sim.unwrap();
        assert!(info.is_session_up());
        assert!(info.registered);
        assert!(!info.imei_lock);
        assert_eq!(info.traffic_bytes_of_current_month.unwrap().downlink_bytes, 2000.0);
    }

    #[test]
    fn test_decode_sim() {
        let sim: Sim = serde_json::from_str(
            r#"{"ID": 113200000001, "Name": "sim", "Tags": ["tag1"],
                "Status": {"ICCID": "8981000000000000001"}}"#,
        )
        .unwrap();
        assert_eq!(sim.item.id, "113200000001");
        assert_eq!(sim.status.iccid, "8981000000000000001");

        let configs: NetworkOperatorConfigResponse = serde_json::from_str(
            r#"{"network_operator_config": [{"allow": true, "name": "NTT DOCOMO"},
                                             {"allow": false, "name": "SoftBank"}]}"#,
        )
        .unwrap();
        assert_eq!(configs.network_operator_config.unwrap().len(), 2);
    }
}
