// Load balancer collector
//
// Besides the appliance gauges this exposes every virtual IP and real
// server from the settings, joined with the live status by address.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use prometheus::core::Desc;

use super::appliance::{appliance_labels, NicAddress, NicDescs, APPLIANCE_LABELS};
use super::maintenance::MaintenanceDescs;
use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::{bool_label, bool_to_f64, flatten_string_slice, load_balancer_plan_label};
use crate::platform::load_balancer::{LoadBalancer, LoadBalancerClient, VipStatus};

const VIP_LABELS: &[&str] = &["id", "name", "zone", "vip_index", "vip"];
const SERVER_LABELS: &[&str] = &[
    "id",
    "name",
    "zone",
    "vip_index",
    "vip",
    "server_index",
    "ipaddress",
];

pub struct LoadBalancerCollector {
    client: Arc<dyn LoadBalancerClient>,

    up: Arc<Desc>,
    load_balancer_info: Arc<Desc>,
    vip_info: Arc<Desc>,
    vip_cps: Arc<Desc>,
    server_info: Arc<Desc>,
    server_up: Arc<Desc>,
    server_connection: Arc<Desc>,
    server_cps: Arc<Desc>,
    nics: NicDescs,
    maintenance: MaintenanceDescs,
}

impl LoadBalancerCollector {
    pub fn new(
        errors: &ErrorCounter,
        client: Arc<dyn LoadBalancerClient>,
    ) -> Result<Self, prometheus::Error> {
        errors.init_collector("loadbalancer");

        Ok(LoadBalancerCollector {
            client,
            up: new_desc(
                "loadbalancer_up",
                "If 1 the loadbalancer is up and running, 0 otherwise",
                APPLIANCE_LABELS,
            )?,
            load_balancer_info: new_desc(
                "loadbalancer_info",
                "A metric with a constant '1' value labeled by loadbalancer information",
                &with_labels(
                    APPLIANCE_LABELS,
                    &[
                        "plan",
                        "ha",
                        "vrid",
                        "ipaddress1",
                        "ipaddress2",
                        "gateway",
                        "nw_mask_len",
                        "tags",
                        "description",
                    ],
                ),
            )?,
            vip_info: new_desc(
                "loadbalancer_vip_info",
                "A metric with a constant '1' value labeled by vip information",
                &with_labels(VIP_LABELS, &["port", "interval", "sorry_server", "description"]),
            )?,
            vip_cps: new_desc(
                "loadbalancer_vip_cps",
                "Connection count per second",
                VIP_LABELS,
            )?,
            server_info: new_desc(
                "loadbalancer_server_info",
                "A metric with a constant '1' value labeled by real-server information",
                &with_labels(
                    SERVER_LABELS,
                    &["port", "enabled", "monitor", "path", "response_code"],
                ),
            )?,
            server_up: new_desc(
                "loadbalancer_server_up",
                "If 1 the server is up and running, 0 otherwise",
                SERVER_LABELS,
            )?,
            server_connection: new_desc(
                "loadbalancer_server_connection",
                "Current connection count",
                SERVER_LABELS,
            )?,
            server_cps: new_desc(
                "loadbalancer_server_cps",
                "Connection count per second",
                SERVER_LABELS,
            )?,
            nics: NicDescs::new("loadbalancer", "")?,
            maintenance: MaintenanceDescs::new("loadbalancer", "loadbalancer", APPLIANCE_LABELS)?,
        })
    }

    fn vip_labels(lb: &LoadBalancer, vip_index: usize, vip: &str) -> Vec<String> {
        let mut labels = appliance_labels(&lb.appliance);
        labels.extend([vip_index.to_string(), vip.to_string()]);
        labels
    }

    fn server_labels(
        lb: &LoadBalancer,
        vip_index: usize,
        vip: &str,
        server_index: usize,
        ip_address: &str,
    ) -> Vec<String> {
        let mut labels = Self::vip_labels(lb, vip_index, vip);
        labels.extend([server_index.to_string(), ip_address.to_string()]);
        labels
    }

    fn emit_settings(&self, ctx: &CollectContext, lb: &LoadBalancer) {
        for (vip_index, vip) in lb.virtual_ip_addresses().iter().enumerate() {
            let mut vip_labels = Self::vip_labels(lb, vip_index, &vip.virtual_ip_address);
            vip_labels.extend([
                vip.port.to_string(),
                vip.delay_loop.to_string(),
                vip.sorry_server.clone(),
                vip.description.clone(),
            ]);
            ctx.emit(&self.vip_info, 1.0, vip_labels);

            for (server_index, server) in vip.servers.iter().enumerate() {
                let mut server_labels = Self::server_labels(
                    lb,
                    vip_index,
                    &vip.virtual_ip_address,
                    server_index,
                    &server.ip_address,
                );
                server_labels.extend([
                    server.port.to_string(),
                    bool_label(server.enabled),
                    server.health_check.protocol.clone(),
                    server.health_check.path.clone(),
                    server.health_check.status.clone(),
                ]);
                ctx.emit(&self.server_info, 1.0, server_labels);
            }
        }
    }

    async fn collect_load_balancer(&self, ctx: &CollectContext, lb: &LoadBalancer) {
        let appliance = &lb.appliance;
        let labels = appliance_labels(appliance);
        let is_up = appliance.is_up();

        ctx.emit(&self.up, bool_to_f64(is_up), labels.clone());

        let network = &appliance.remark.network;
        let mut info_labels = labels.clone();
        info_labels.extend([
            load_balancer_plan_label(&appliance.plan.id),
            bool_label(lb.is_ha()),
            appliance.remark.vrrp.vrid.to_string(),
            appliance.remark.server_ip(0),
            appliance.remark.server_ip(1),
            network.default_route.clone(),
            network.network_mask_len.to_string(),
            flatten_string_slice(&appliance.tags),
            appliance.description.clone(),
        ]);
        ctx.emit(&self.load_balancer_info, 1.0, info_labels);

        if let Some(nic) = appliance.interfaces.first() {
            self.nics
                .emit_info(ctx, appliance, 0, nic, NicAddress::from_remark(appliance, 0));
        }
        self.emit_settings(ctx, lb);

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
                self.collect_nic(ctx, lb),
                self.collect_status(ctx, lb),
            );
        } else {
            maintenance.await;
        }
    }

    async fn collect_nic(&self, ctx: &CollectContext, lb: &LoadBalancer) {
        let appliance = &lb.appliance;
        let value = ctx
            .fetch_optional(
                format!("can't get loadbalancer's receive/send bytes: ID={}", appliance.id),
                self.client.monitor_nic(&appliance.zone, &appliance.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            self.nics.emit_traffic(ctx, appliance, 0, &value);
        }
    }

    async fn collect_status(&self, ctx: &CollectContext, lb: &LoadBalancer) {
        let appliance = &lb.appliance;
        let statuses = ctx
            .fetch(
                format!("can't get loadbalancer's status: ID={}", appliance.id),
                self.client.status(&appliance.zone, &appliance.id),
            )
            .await;
        let Some(statuses) = statuses else {
            return;
        };

        for (vip_index, vip) in lb.virtual_ip_addresses().iter().enumerate() {
            let Some(status) = find_vip(&statuses, &vip.virtual_ip_address) else {
                continue;
            };
            ctx.emit(
                &self.vip_cps,
                status.cps,
                Self::vip_labels(lb, vip_index, &vip.virtual_ip_address),
            );

            for (server_index, server) in vip.servers.iter().enumerate() {
                let Some(server_status) = status
                    .servers
                    .iter()
                    .find(|s| s.ip_address == server.ip_address)
                else {
                    continue;
                };

                let labels = Self::server_labels(
                    lb,
                    vip_index,
                    &vip.virtual_ip_address,
                    server_index,
                    &server.ip_address,
                );
                ctx.emit(&self.server_up, bool_to_f64(server_status.is_up()), labels.clone());
                ctx.emit(&self.server_connection, server_status.active_conn, labels.clone());
                ctx.emit(&self.server_cps, server_status.cps, labels);
            }
        }
    }
}

fn find_vip<'a>(statuses: &'a [VipStatus], address: &str) -> Option<&'a VipStatus> {
    statuses
        .iter()
        .find(|status| status.virtual_ip_address == address)
}

#[async_trait]
impl Collector for LoadBalancerCollector {
    fn name(&self) -> &'static str {
        "loadbalancer"
    }

    fn describe(&self) -> Vec<&Desc> {
        let mut descs: Vec<&Desc> = vec![
            &self.up,
            &self.load_balancer_info,
            &self.vip_info,
            &self.vip_cps,
            &self.server_info,
            &self.server_up,
            &self.server_connection,
            &self.server_cps,
        ];
        descs.extend(self.nics.descs());
        descs.extend(self.maintenance.descs());
        descs
    }

    async fn collect(&self, ctx: &CollectContext) {
        let load_balancers = ctx
            .fetch("can't list loadbalancers", self.client.find())
            .await
            .unwrap_or_default();

        join_all(
            load_balancers
                .iter()
                .map(|lb| self.collect_load_balancer(ctx, lb)),
        )
        .await;
    }
}
