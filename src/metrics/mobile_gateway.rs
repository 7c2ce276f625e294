// Mobile gateway collector

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use prometheus::core::Desc;

use super::appliance::{appliance_labels, NicAddress, NicDescs, APPLIANCE_LABELS};
use super::maintenance::MaintenanceDescs;
use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::{bool_label, bool_to_f64, flatten_string_slice};
use crate::platform::mobile_gateway::{MobileGateway, MobileGatewayClient};

pub struct MobileGatewayCollector {
    client: Arc<dyn MobileGatewayClient>,

    up: Arc<Desc>,
    mobile_gateway_info: Arc<Desc>,
    traffic_control_info: Arc<Desc>,
    traffic_uplink: Arc<Desc>,
    traffic_downlink: Arc<Desc>,
    traffic_shaping: Arc<Desc>,
    nics: NicDescs,
    maintenance: MaintenanceDescs,
}

impl MobileGatewayCollector {
    pub fn new(
        errors: &ErrorCounter,
        client: Arc<dyn MobileGatewayClient>,
    ) -> Result<Self, prometheus::Error> {
        errors.init_collector("mobile_gateway");

        Ok(MobileGatewayCollector {
            client,
            up: new_desc(
                "mobile_gateway_up",
                "If 1 the mobile_gateway is up and running, 0 otherwise",
                APPLIANCE_LABELS,
            )?,
            mobile_gateway_info: new_desc(
                "mobile_gateway_info",
                "A metric with a constant '1' value labeled by mobile_gateway information",
                &with_labels(
                    APPLIANCE_LABELS,
                    &[
                        "internet_connection",
                        "inter_device_communication",
                        "tags",
                        "description",
                    ],
                ),
            )?,
            traffic_control_info: new_desc(
                "mobile_gateway_traffic_control_info",
                "A metric with a constant '1' value labeled by traffic-control information",
                &with_labels(
                    APPLIANCE_LABELS,
                    &[
                        "traffic_quota_in_mb",
                        "bandwidth_limit_in_kbps",
                        "enable_email",
                        "enable_slack",
                        "auto_traffic_shaping",
                    ],
                ),
            )?,
            traffic_uplink: new_desc(
                "mobile_gateway_traffic_uplink",
                "Current traffic for uplink(unit: Byte)",
                APPLIANCE_LABELS,
            )?,
            traffic_downlink: new_desc(
                "mobile_gateway_traffic_downlink",
                "Current traffic for downlink(unit: Byte)",
                APPLIANCE_LABELS,
            )?,
            traffic_shaping: new_desc(
                "mobile_gateway_traffic_shaping",
                "If 1 the traffic is shaped, 0 otherwise",
                APPLIANCE_LABELS,
            )?,
            nics: NicDescs::new("mobile_gateway", "")?,
            maintenance: MaintenanceDescs::new(
                "mobile_gateway",
                "mobile_gateway",
                APPLIANCE_LABELS,
            )?,
        })
    }

    async fn collect_gateway(&self, ctx: &CollectContext, gateway: &MobileGateway) {
        let appliance = &gateway.appliance;
        let labels = appliance_labels(appliance);
        let is_up = appliance.is_up();

        ctx.emit(&self.up, bool_to_f64(is_up), labels.clone());

        let mut info_labels = labels.clone();
        info_labels.extend([
            bool_label(gateway.internet_connection()),
            bool_label(gateway.inter_device_communication()),
            flatten_string_slice(&appliance.tags),
            appliance.description.clone(),
        ]);
        ctx.emit(&self.mobile_gateway_info, 1.0, info_labels);

        for (index, nic) in appliance.interfaces.iter().enumerate() {
            self.nics
                .emit_info(ctx, appliance, index, nic, NicAddress::from_interface(nic));
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
                self.collect_traffic_control(ctx, gateway),
                self.collect_traffic_status(ctx, gateway),
                join_all(
                    (0..appliance.interfaces.len()).map(|index| self.collect_nic(ctx, gateway, index))
                ),
            );
        } else {
            maintenance.await;
        }
    }

    async fn collect_traffic_control(&self, ctx: &CollectContext, gateway: &MobileGateway) {
        let appliance = &gateway.appliance;
        let control = ctx
            .fetch_optional(
                format!(
                    "can't get mobile_gateway's traffic control config: ID={}",
                    appliance.id
                ),
                self.client.traffic_control(&appliance.zone, &appliance.id),
            )
            .await;

        if let Some(control) = control {
            let mut labels = appliance_labels(appliance);
            labels.extend([
                control.traffic_quota_in_mb.to_string(),
                control.band_width_limit_in_kbps.to_string(),
                bool_label(control.email_config.enabled),
                bool_label(control.slack_config.enabled),
                bool_label(control.auto_traffic_shaping),
            ]);
            ctx.emit(&self.traffic_control_info, 1.0, labels);
        }
    }

    async fn collect_traffic_status(&self, ctx: &CollectContext, gateway: &MobileGateway) {
        let appliance = &gateway.appliance;
        let status = ctx
            .fetch_optional(
                format!("can't get mobile_gateway's traffic status: ID={}", appliance.id),
                self.client.traffic_status(&appliance.zone, &appliance.id),
            )
            .await;

        if let Some(status) = status {
            let labels = appliance_labels(appliance);
            ctx.emit(&self.traffic_uplink, status.uplink_bytes, labels.clone());
            ctx.emit(&self.traffic_downlink, status.downlink_bytes, labels.clone());
            ctx.emit(
                &self.traffic_shaping,
                bool_to_f64(status.traffic_shaping),
                labels,
            );
        }
    }

    async fn collect_nic(&self, ctx: &CollectContext, gateway: &MobileGateway, index: usize) {
        let appliance = &gateway.appliance;
        let value = ctx
            .fetch_optional(
                format!(
                    "can't get mobile_gateway's receive/send bytes: ID={}, NICIndex={}",
                    appliance.id, index
                ),
                self.client
                    .monitor_nic(&appliance.zone, &appliance.id, index, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            self.nics.emit_traffic(ctx, appliance, index, &value);
        }
    }
}

#[async_trait]
impl Collector for MobileGatewayCollector {
    fn name(&self) -> &'static str {
        "mobile_gateway"
    }

    fn describe(&self) -> Vec<&Desc> {
        let mut descs: Vec<&Desc> = vec![
            &self.up,
            &self.mobile_gateway_info,
            &self.traffic_control_info,
            &self.traffic_uplink,
            &self.traffic_downlink,
            &self.traffic_shaping,
        ];
        descs.extend(self.nics.descs());
        descs.extend(self.maintenance.descs());
        descs
    }

    async fn collect(&self, ctx: &CollectContext) {
        let gateways = ctx
            .fetch("can't list mobile gateways", self.client.find())
            .await
            .unwrap_or_default();

        join_all(
            gateways
                .iter()
                .map(|gateway| self.collect_gateway(ctx, gateway)),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{api_error, fixed_now, samples_named, single, TestFixture};
    use crate::platform::appliance::Appliance;
    use crate::platform::common::{Instance, Interface};
    use crate::platform::mobile_gateway::{TrafficControl, TrafficStatus};
    use crate::platform::monitor::InterfaceValue;
    use crate::platform::{ClientResult, FeedItem, MaintenanceClient};
    use chrono::{DateTime, Utc};

    #[derive(Default)]
    struct FakeMobileGatewayClient {
        find_fails: bool,
        gateways: Vec<MobileGateway>,
        traffic_control: Option<TrafficControl>,
    }

    #[async_trait]
    impl MaintenanceClient for FakeMobileGatewayClient {
        async fn maintenance_info(&self, _info_url: &str) -> ClientResult<Option<FeedItem>> {
            Ok(None)
        }
    }

    #[async_trait]
    impl MobileGatewayClient for FakeMobileGatewayClient {
        async fn find(&self) -> ClientResult<Vec<MobileGateway>> {
            if self.find_fails {
                return Err(api_error());
            }
            Ok(self.gateways.clone())
        }

        async fn traffic_control(
            &self,
            _zone: &str,
            _id: &str,
        ) -> ClientResult<Option<TrafficControl>> {
            Ok(self.traffic_control.clone())
        }

        async fn traffic_status(
            &self,
            _zone: &str,
            _id: &str,
        ) -> ClientResult<Option<TrafficStatus>> {
            Ok(Some(TrafficStatus {
                uplink_bytes: 2048.0,
                downlink_bytes: 4096.0,
                traffic_shaping: true,
            }))
        }

        async fn monitor_nic(
            &self,
            _zone: &str,
            _id: &str,
            _index: usize,
            _end: DateTime<Utc>,
        ) -> ClientResult<Option<InterfaceValue>> {
            Ok(Some(InterfaceValue {
                time: fixed_now(),
                receive: 1000.0,
                send: 500.0,
            }))
        }
    }

    fn gateway(status: &str) -> MobileGateway {
        MobileGateway {
            appliance: Appliance {
                id: "101".to_string(),
                name: "mgw".to_string(),
                zone: "is1a".to_string(),
                availability: "available".to_string(),
                instance: Instance {
                    status: status.to_string(),
                    host: None,
                },
                interfaces: vec![Interface::default(), Interface::default()],
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_up_gateway_without_traffic_control() {
        let fixture = TestFixture::new();
        let client = FakeMobileGatewayClient {
            gateways: vec![gateway("up")],
            traffic_control: None,
            ..Default::default()
        };
        let collector = MobileGatewayCollector::new(&fixture.errors, Arc::new(client)).unwrap();

        let samples = fixture.collect(&collector).await;

        assert_eq!(single(&samples, "sakuracloud_mobile_gateway_up").value(), 1.0);
        assert_eq!(samples_named(&samples, "sakuracloud_mobile_gateway_nic_info").len(), 2);
        let receive = samples_named(&samples, "sakuracloud_mobile_gateway_receive");
        assert_eq!(receive.len(), 2);
        assert!(receive.iter().all(|sample| sample.value() == 8.0));
        assert!(samples_named(&samples, "sakuracloud_mobile_gateway_traffic_control_info").is_empty());
        assert_eq!(
            single(&samples, "sakuracloud_mobile_gateway_traffic_uplink").value(),
            2048.0
        );
        assert_eq!(
            single(&samples, "sakuracloud_mobile_gateway_traffic_shaping").value(),
            1.0
        );
        assert_eq!(fixture.errors.get("mobile_gateway"), 0);
    }

    #[tokio::test]
    async fn test_traffic_control_info() {
        let fixture = TestFixture::new();
        let client = FakeMobileGatewayClient {
            gateways: vec![gateway("up")],
            traffic_control: Some(TrafficControl {
                traffic_quota_in_mb: 1024.0,
                band_width_limit_in_kbps: 64.0,
                auto_traffic_shaping: true,
                ..Default::default()
            }),
            ..Default::default()
        };
        let collector = MobileGatewayCollector::new(&fixture.errors, Arc::new(client)).unwrap();

        let samples = fixture.collect(&collector).await;

        let info = single(&samples, "sakuracloud_mobile_gateway_traffic_control_info");
        assert_eq!(info.label("traffic_quota_in_mb"), Some("1024"));
        assert_eq!(info.label("bandwidth_limit_in_kbps"), Some("64"));
        assert_eq!(info.label("enable_email"), Some("0"));
        assert_eq!(info.label("auto_traffic_shaping"), Some("1"));
    }

    #[tokio::test]
    async fn test_down_gateway() {
        let fixture = TestFixture::new();
        let client = FakeMobileGatewayClient {
            gateways: vec![gateway("down")],
            ..Default::default()
        };
        let collector = MobileGatewayCollector::new(&fixture.errors, Arc::new(client)).unwrap();

        let samples = fixture.collect(&collector).await;

        assert_eq!(single(&samples, "sakuracloud_mobile_gateway_up").value(), 0.0);
        assert!(samples_named(&samples, "sakuracloud_mobile_gateway_receive").is_empty());
        assert!(samples_named(&samples, "sakuracloud_mobile_gateway_traffic_uplink").is_empty());
    }

    #[tokio::test]
    async fn test_find_failure() {
        let fixture = TestFixture::new();
        let client = FakeMobileGatewayClient {
            find_fails: true,
            ..Default::default()
        };
        let collector = MobileGatewayCollector::new(&fixture.errors, Arc::new(client)).unwrap();

        let samples = fixture.collect(&collector).await;

        assert!(samples.is_empty());
        assert_eq!(fixture.errors.get("mobile_gateway"), 1);
        assert_eq!(fixture.warning_count(), 1);
        assert!(fixture.logs().contains("can't list mobile gateways"));
    }

    #[tokio::test]
    async fn test_no_mobile_gateways() {
        let fixture = TestFixture::new();
        let collector = MobileGatewayCollector::new(&fixture.errors, Arc::new(FakeMobileGatewayClient::default())).unwrap();

        let samples = fixture.collect(&collector).await;

        assert!(samples.is_empty());
        assert_eq!(fixture.errors.get("mobile_gateway"), 0);
        assert_eq!(fixture.warning_count(), 0);
    }
}
