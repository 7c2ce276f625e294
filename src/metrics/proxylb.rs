// ProxyLB collector

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use prometheus::core::Desc;

use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::{bool_label, bool_to_f64, flatten_string_slice, proxylb_plan_label, unix_millis};
use crate::platform::proxylb::{ProxyLb, ProxyLbClient};

const PROXYLB_LABELS: &[&str] = &["id", "name"];

pub struct ProxyLbCollector {
    client: Arc<dyn ProxyLbClient>,

    up: Arc<Desc>,
    proxylb_info: Arc<Desc>,
    bind_port_info: Arc<Desc>,
    server_info: Arc<Desc>,
    cert_info: Arc<Desc>,
    cert_expire: Arc<Desc>,
    active_connections: Arc<Desc>,
    connection_per_sec: Arc<Desc>,
}

fn proxylb_labels(proxylb: &ProxyLb) -> Vec<String> {
    vec![proxylb.item.id.clone(), proxylb.item.name.clone()]
}

impl ProxyLbCollector {
    pub fn new(
        errors: &ErrorCounter,
        client: Arc<dyn ProxyLbClient>,
    ) -> Result<Self, prometheus::Error> {
        errors.init_collector("proxylb");

        Ok(ProxyLbCollector {
            client,
            up: new_desc(
                "proxylb_up",
                "If 1 the ProxyLB is available, 0 otherwise",
                PROXYLB_LABELS,
            )?,
            proxylb_info: new_desc(
                "proxylb_info",
                "A metric with a constant '1' value labeled by proxylb information",
                &with_labels(
                    PROXYLB_LABELS,
                    &[
                        "plan",
                        "vip",
                        "fqdn",
                        "proxy_networks",
                        "sticky_session",
                        "tags",
                        "description",
                    ],
                ),
            )?,
            bind_port_info: new_desc(
                "proxylb_bind_port_info",
                "A metric with a constant '1' value labeled by bind-port information",
                &with_labels(PROXYLB_LABELS, &["bind_port_index", "proxy_mode", "port"]),
            )?,
            server_info: new_desc(
                "proxylb_server_info",
                "A metric with a constant '1' value labeled by real-server information",
                &with_labels(PROXYLB_LABELS, &["server_index", "ipaddress", "port", "enabled"]),
            )?,
            cert_info: new_desc(
                "proxylb_cert_info",
                "A metric with a constant '1' value labeled by certificate information",
                &with_labels(PROXYLB_LABELS, &["cert_index", "common_name"]),
            )?,
            cert_expire: new_desc(
                "proxylb_cert_expire",
                "Certificate expiration date(unit: unixtime-millisecond)",
                &with_labels(PROXYLB_LABELS, &["cert_index"]),
            )?,
            active_connections: new_desc(
                "proxylb_active_connections",
                "Active connection count",
                PROXYLB_LABELS,
            )?,
            connection_per_sec: new_desc(
                "proxylb_connection_per_sec",
                "Connection count per second",
                PROXYLB_LABELS,
            )?,
        })
    }

    async fn collect_proxylb(&self, ctx: &CollectContext, proxylb: &ProxyLb) {
        let labels = proxylb_labels(proxylb);
        let is_up = proxylb.item.is_available();

        ctx.emit(&self.up, bool_to_f64(is_up), labels.clone());
        self.emit_info(ctx, proxylb);

        for (index, port) in proxylb.bind_ports().iter().enumerate() {
            let mut port_labels = labels.clone();
            port_labels.extend([
                index.to_string(),
                port.proxy_mode.clone(),
                port.port.to_string(),
            ]);
            ctx.emit(&self.bind_port_info, 1.0, port_labels);
        }

        for (index, server) in proxylb.servers().iter().enumerate() {
            let mut server_labels = labels.clone();
            server_labels.extend([
                index.to_string(),
                server.ip_address.clone(),
                server.port.to_string(),
                bool_label(server.enabled),
            ]);
            ctx.emit(&self.server_info, 1.0, server_labels);
        }

        if is_up {
            futures_util::join!(
                self.collect_certificates(ctx, proxylb),
                self.collect_connections(ctx, proxylb),
            );
        }
    }

    fn emit_info(&self, ctx: &CollectContext, proxylb: &ProxyLb) {
        let mut labels = proxylb_labels(proxylb);
        labels.extend([
            proxylb_plan_label(&proxylb.service_class),
            proxylb.status.virtual_ip_address.clone(),
            proxylb.status.fqdn.clone(),
            flatten_string_slice(&proxylb.status.proxy_networks),
            bool_label(proxylb.sticky_session()),
            flatten_string_slice(&proxylb.item.tags),
            proxylb.item.description.clone(),
        ]);
        ctx.emit(&self.proxylb_info, 1.0, labels);
    }

    async fn collect_certificates(&self, ctx: &CollectContext, proxylb: &ProxyLb) {
        let bundle = ctx
            .fetch_optional(
                format!("can't get certificate: proxyLB={}", proxylb.item.id),
                self.client.certificate(&proxylb.item.id),
            )
            .await;
        let Some(bundle) = bundle else {
            return;
        };

        for (index, cert) in bundle.all().into_iter().enumerate() {
            // A certificate without a name or a readable expiry is not reported
            let expires_at = match cert.expires_at() {
                Some(time) if !cert.certificate_common_name.is_empty() => time,
                _ => continue,
            };

            let mut labels = proxylb_labels(proxylb);
            labels.push(index.to_string());
            ctx.emit(&self.cert_expire, unix_millis(&expires_at), labels.clone());

            labels.push(cert.certificate_common_name.clone());
            ctx.emit(&self.cert_info, 1.0, labels);
        }
    }

    async fn collect_connections(&self, ctx: &CollectContext, proxylb: &ProxyLb) {
        let value = ctx
            .fetch_optional(
                format!("can't get proxyLB's connection metrics: ID={}", proxylb.item.id),
                self.client.monitor_connection(&proxylb.item.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            let labels = proxylb_labels(proxylb);
            ctx.emit_at(
                &self.active_connections,
                value.active_connections,
                labels.clone(),
                value.time,
            );
            ctx.emit_at(
                &self.connection_per_sec,
                value.connections_per_sec,
                labels,
                value.time,
            );
        }
    }
}

#[async_trait]
impl Collector for ProxyLbCollector {
    fn name(&self) -> &'static str {
        "proxylb"
    }

    fn describe(&self) -> Vec<&Desc> {
        vec![
            &self.up,
            &self.proxylb_info,
            &self.bind_port_info,
            &self.server_info,
            &self.cert_info,
            &self.cert_expire,
            &self.active_connections,
            &self.connection_per_sec,
        ]
    }

    async fn collect(&self, ctx: &CollectContext) {
        let all = ctx
            .fetch("can't list proxyLBs", self.client.find())
            .await
            .unwrap_or_default();

        join_all(all.iter().map(|proxylb| self.collect_proxylb(ctx, proxylb))).await;
    }
}
