// Mobile gateway appliances

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
pub struct MobileGateway {
    #[serde(flatten)]
    pub appliance: Appliance,
    #[serde(rename = "Settings", deserialize_with = "nullable")]
    pub settings: MobileGatewaySettings,
}

appliance_zone_scoped!(MobileGateway);

impl MobileGateway {
    pub fn internet_connection(&self) -> bool {
        self.settings.mobile_gateway.internet_connection.enabled
    }

    pub fn inter_device_communication(&self) -> bool {
        self.settings.mobile_gateway.inter_device_communication.enabled
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MobileGatewaySettings {
    #[serde(rename = "MobileGateway", deserialize_with = "nullable")]
    pub mobile_gateway: MobileGatewaySetting,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MobileGatewaySetting {
    #[serde(deserialize_with = "nullable")]
    pub internet_connection: Toggle,
    #[serde(deserialize_with = "nullable")]
    pub inter_device_communication: Toggle,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Toggle {
    #[serde(deserialize_with = "deserialize_flag")]
    pub enabled: bool,
}

/// Traffic quota configuration; absent when no quota is set
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TrafficControl {
    #[serde(rename = "TrafficQuotaInMB", deserialize_with = "deserialize_number")]
    pub traffic_quota_in_mb: f64,
    #[serde(rename = "BandWidthLimitInKbps", deserialize_with = "deserialize_number")]
    pub band_width_limit_in_kbps: f64,
    #[serde(rename = "EMailConfig", deserialize_with = "nullable")]
    pub email_config: Toggle,
    #[serde(deserialize_with = "nullable")]
    pub slack_config: Toggle,
    #[serde(deserialize_with = "deserialize_flag")]
    pub auto_traffic_shaping: bool,
}

/// Traffic used in the current quota period
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TrafficStatus {
    #[serde(deserialize_with = "deserialize_number")]
    pub uplink_bytes: f64,
    #[serde(deserialize_with = "deserialize_number")]
    pub downlink_bytes: f64,
    #[serde(deserialize_with = "deserialize_flag")]
    pub traffic_shaping: bool,
}

#[derive(Deserialize)]
struct TrafficControlResponse {
    #[serde(rename = "TrafficMonitoring", default)]
    traffic_monitoring: Option<TrafficControl>,
}

#[derive(Deserialize)]
struct TrafficStatusResponse {
    #[serde(rename = "TrafficStatus", default)]
    traffic_status: Option<TrafficStatus>,
}

#[async_trait]
pub trait MobileGatewayClient: MaintenanceClient {
    async fn find(&self) -> ClientResult<Vec<MobileGateway>>;

    async fn traffic_control(
        &self,
        zone: &str,
        gateway_id: &str,
    ) -> ClientResult<Option<TrafficControl>>;

    async fn traffic_status(
        &self,
        zone: &str,
        gateway_id: &str,
    ) -> ClientResult<Option<TrafficStatus>>;

    async fn monitor_nic(
        &self,
        zone: &str,
        gateway_id: &str,
        index: usize,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>>;
}

#[async_trait]
impl MobileGatewayClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<MobileGateway>> {
        self.find_appliances("mobilegateway").await
    }

    async fn traffic_control(
        &self,
        zone: &str,
        gateway_id: &str,
    ) -> ClientResult<Option<TrafficControl>> {
        let url = self.cloud_url(
            zone,
            &format!("appliance/{}/mobilegateway/traffic_monitoring", gateway_id),
        );
        let response: TrafficControlResponse = self.get_json(&url, None).await?;
        Ok(response.traffic_monitoring)
    }

    async fn traffic_status(
        &self,
        zone: &str,
        gateway_id: &str,
    ) -> ClientResult<Option<TrafficStatus>> {
        let url = self.cloud_url(
            zone,
            &format!("appliance/{}/mobilegateway/traffic_status", gateway_id),
        );
        let response: TrafficStatusResponse = self.get_json(&url, None).await?;
        Ok(response.traffic_status)
    }

    async fn monitor_nic(
        &self,
        zone: &str,
        gateway_id: &str,
        index: usize,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>> {
        self.monitor_appliance_nic(zone, gateway_id, index, end)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_mobile_gateway() {
        let gateway: MobileGateway = serde_json::from_str(
            r#"{"ID": "1", "Settings": {"MobileGateway": {
                "InternetConnection": {"Enabled": "True"},
                "InterDeviceCommunication": {"Enabled": "False"}}}}"#,
        )
        .unwrap();

        assert!(gateway.internet_connection());
        assert!(!gateway.inter_device_communication());
    }

    #[test]
    fn test_decode_traffic() {
        let control: TrafficControlResponse = serde_json::from_str(
            r#"{"TrafficMonitoring": {"TrafficQuotaInMB": 1024, "BandWidthLimitInKbps": 64,
                "EMailConfig": {"Enabled": true}, "SlackConfig": null,
                "AutoTrafficShaping": true}}"#,
        )
        .unwrap();
        let control = control.traffic_monitoring.unwrap();
        assert_eq!(control.traffic_quota_in_mb, 1024.0);
        assert!(control.email_config.enabled);
        assert!(!control.slack_config.enabled);
        assert_eq!(control.slack_config, Toggle::default());
        assert_ne!(control.email_config, control.slack_config);

        let none: TrafficControlResponse =
            serde_json::from_str(r#"{"TrafficMonitoring": null}"#).unwrap();
        assert!(none.traffic_monitoring.is_none());

        let status: TrafficStatusResponse = serde_json::from_str(
            r#"{"TrafficStatus": {"UplinkBytes": "2048", "DownlinkBytes": "4096",
                "TrafficShaping": false}}"#,
        )
        .unwrap();
        let status = status.traffic_status.unwrap();
        assert_eq!(status.uplink_bytes, 2048.0);
        assert!(!status.traffic_shaping);
    }
}
