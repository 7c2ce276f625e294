// VPC router collector

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use prometheus::core::Desc;

use super::appliance::{appliance_labels, APPLIANCE_LABELS};
use super::maintenance::MaintenanceDescs;
use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::{
    bool_label, bool_to_f64, bytes_to_kbps, flatten_string_slice, seconds_to_millis,
    vpc_router_plan_label,
};
use crate::platform::vpc_router::{VpcRouter, VpcRouterClient, VpcRouterStatus};

const NIC_LABELS: &[&str] = &[
    "id",
    "name",
    "zone",
    "nic_index",
    "vip",
    "ipaddress1",
    "ipaddress2",
    "nw_mask_len",
];

pub struct VpcRouterCollector {
    client: Arc<dyn VpcRouterClient>,

    up: Arc<Desc>,
    vpc_router_info: Arc<Desc>,
    session: Arc<Desc>,
    dhcp_lease: Arc<Desc>,
    l2tp_session: Arc<Desc>,
    pptp_session: Arc<Desc>,
    site_to_site_peer: Arc<Desc>,
    session_analysis: Arc<Desc>,
    receive: Arc<Desc>,
    send: Arc<Desc>,
    cpu_time: Arc<Desc>,
    maintenance: MaintenanceDescs,
}

impl VpcRouterCollector {
    pub fn new(
        errors: &ErrorCounter,
        client: Arc<dyn VpcRouterClient>,
    ) -> Result<Self, prometheus::Error> {
        errors.init_collector("vpc_router");

        Ok(VpcRouterCollector {
            client,
            up: new_desc(
                "vpc_router_up",
                "If 1 the vpc_router is up and running, 0 otherwise",
                APPLIANCE_LABELS,
            )?,
            vpc_router_info: new_desc(
                "vpc_router_info",
                "A metric with a constant '1' value labeled by vpc_router information",
                &with_labels(
                    APPLIANCE_LABELS,
                    &[
                        "plan",
                        "ha",
                        "vrid",
                        "vip",
                        "ipaddress1",
                        "ipaddress2",
                        "nw_mask_len",
                        "internet_connection",
                        "tags",
                        "description",
                    ],
                ),
            )?,
            session: new_desc(
                "vpc_router_session",
                "Current session count",
                APPLIANCE_LABELS,
            )?,
            dhcp_lease: new_desc(
                "vpc_router_dhcp_lease",
                "Current DHCPServer lease count",
                APPLIANCE_LABELS,
            )?,
            l2tp_session: new_desc(
                "vpc_router_l2tp_session",
                "Current L2TP-IPsec session count",
                APPLIANCE_LABELS,
            )?,
            pptp_session: new_desc(
                "vpc_router_pptp_session",
                "Current PPTP session count",
                APPLIANCE_LABELS,
            )?,
            site_to_site_peer: new_desc(
                "vpc_router_site_to_site_peer",
                "If 1 the vpc_router's site to site peer is up, 0 otherwise",
                &with_labels(APPLIANCE_LABELS, &["peer_index", "peer_address"]),
            )?,
            session_analysis: new_desc(
                "vpc_router_session_analysis",
                "Session statistics for VPC routers",
                &with_labels(APPLIANCE_LABELS, &["type", "label"]),
            )?,
            receive: new_desc(
                "vpc_router_receive",
                "VPC Router's receive bytes(unit: Kbps)",
                NIC_LABELS,
            )?,
            send: new_desc(
                "vpc_router_send",
                "VPC Router's send bytes(unit: Kbps)",
                NIC_LABELS,
            )?,
            cpu_time: new_desc(
                "vpc_router_cpu_time",
                "VPC Router's CPU time(unit: ms)",
                APPLIANCE_LABELS,
            )?,
            maintenance: MaintenanceDescs::new("vpc_router", "vpc_router", APPLIANCE_LABELS)?,
        })
    }

    /// vip, ipaddress1, ipaddress2 and nw_mask_len of the NIC at `index`
    fn nic_addresses(router: &VpcRouter, index: usize) -> [String; 4] {
        match router.interface_setting(index) {
            Some(setting) => [
                setting.virtual_ip_address.clone(),
                setting.ip_address(0),
                setting.ip_address(1),
                setting.network_mask_len.to_string(),
            ],
            None => Default::default(),
        }
    }

    fn nic_labels(router: &VpcRouter, index: usize) -> Vec<String> {
        let mut labels = appliance_labels(&router.appliance);
        labels.push(index.to_string());
        labels.extend(Self::nic_addresses(router, index));
        labels
    }

    async fn collect_router(&self, ctx: &CollectContext, router: &VpcRouter) {
        let appliance = &router.appliance;
        let labels = appliance_labels(appliance);
        let is_up = appliance.is_up();

        ctx.emit(&self.up, bool_to_f64(is_up), labels.clone());

        let mut info_labels = labels.clone();
        info_labels.extend([
            vpc_router_plan_label(&appliance.plan.id),
            bool_label(router.is_ha()),
            router.router().vrid.to_string(),
        ]);
        // the shared segment NIC is always index 0
        info_labels.extend(Self::nic_addresses(router, 0));
        info_labels.extend([
            bool_label(router.router().internet_connection.enabled),
            flatten_string_slice(&appliance.tags),
            appliance.description.clone(),
        ]);
        ctx.emit(&self.vpc_router_info, 1.0, info_labels);

        let maintenance = self.maintenance.collect(
            ctx,
            self.client.as_ref(),
            &labels,
            &appliance.id,
            appliance.instance.maintenance_info_url(),
        );

        if is_up {
            let connected = appliance
                .interfaces
                .iter()
                .enumerate()
                .filter(|(index, nic)| *index == 0 || nic.switch.is_some())
                .map(|(index, _)| index);

            futures_util::join!(
                maintenance,
                self.collect_status(ctx, router),
                self.collect_cpu_time(ctx, router),
                join_all(connected.map(|index| self.collect_nic(ctx, router, index))),
            );
        } else {
            maintenance.await;
        }
    }

    async fn collect_status(&self, ctx: &CollectContext, router: &VpcRouter) {
        let appliance = &router.appliance;
        let status = ctx
            .fetch_optional(
                format!("can't get vpc_router's status: ID={}", appliance.id),
                self.client.status(&appliance.zone, &appliance.id),
            )
            .await;

        if let Some(status) = status {
            self.emit_status(ctx, router, &status);
        }
    }

    fn emit_status(&self, ctx: &CollectContext, router: &VpcRouter, status: &VpcRouterStatus) {
        let labels = appliance_labels(&router.appliance);

        ctx.emit(&self.session, status.session_count, labels.clone());
        ctx.emit(
            &self.dhcp_lease,
            status.dhcp_server_leases.len() as f64,
            labels.clone(),
        );
        ctx.emit(
            &self.l2tp_session,
            status.l2tp_ipsec_server_sessions.len() as f64,
            labels.clone(),
        );
        ctx.emit(
            &self.pptp_session,
            status.pptp_server_sessions.len() as f64,
            labels.clone(),
        );

        for (index, peer) in status.site_to_site_ipsec_vpn_peers.iter().enumerate() {
            let mut peer_labels = labels.clone();
            peer_labels.extend([index.to_string(), peer.peer.clone()]);
            ctx.emit(&self.site_to_site_peer, bool_to_f64(peer.is_up()), peer_labels);
        }

        for (kind, values) in status.session_analysis.groups() {
            for value in values {
                let mut analysis_labels = labels.clone();
                analysis_labels.extend([kind.to_string(), value.name.clone()]);
                ctx.emit(&self.session_analysis, value.count, analysis_labels);
            }
        }
    }

    async fn collect_cpu_time(&self, ctx: &CollectContext, router: &VpcRouter) {
        let appliance = &router.appliance;
        let value = ctx
            .fetch_optional(
                format!("can't get vpc_router's cpu time: ID={}", appliance.id),
                self.client.monitor_cpu(&appliance.zone, &appliance.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            ctx.emit_at(
                &self.cpu_time,
                seconds_to_millis(value.cpu_time),
                appliance_labels(appliance),
                value.time,
            );
        }
    }

    async fn collect_nic(&self, ctx: &CollectContext, router: &VpcRouter, index: usize) {
        let appliance = &router.appliance;
        let value = ctx
            .fetch_optional(
                format!(
                    "can't get vpc_router's receive/send bytes: ID={}, NICIndex={}",
                    appliance.id, index
                ),
                self.client
                    .monitor_nic(&appliance.zone, &appliance.id, index, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            let labels = Self::nic_labels(router, index);
            ctx.emit_at(&self.receive, bytes_to_kbps(value.receive), labels.clone(), value.time);
            ctx.emit_at(&self.send, bytes_to_kbps(value.send), labels, value.time);
        }
    }
}

#[async_trait]
impl Collector for VpcRouterCollector {
    fn name(&self) -> &'static str {
        "vpc_router"
    }

    fn describe(&self) -> Vec<&Desc> {
        let mut descs: Vec<&Desc> = vec![
            &self.up,
            &self.vpc_router_info,
            &self.session,
            &self.dhcp_lease,
            &self.l2tp_session,
            &self.pptp_session,
            &self.site_to_site_peer,
            &self.session_analysis,
            &self.receive,
            &self.send,
            &self.cpu_time,
        ];
        descs.extend(self.maintenance.descs());
        descs
    }

    async fn collect(&self, ctx: &CollectContext) {
        let routers = ctx
            .fetch("can't list vpc routers", self.client.find())
            .await
            .unwrap_or_default();

        join_all(routers.iter().map(|router| self.collect_router(ctx, router))).await;
    }
}
