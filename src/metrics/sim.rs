// SIM collector

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use prometheus::core::Desc;

use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::{bool_label, bool_to_f64, bps_to_kbps, flatten_string_slice};
use crate::platform::sim::{NetworkOperatorConfig, Sim, SimClient, SimInfo};

const SIM_LABELS: &[&str] = &["id", "name"];

pub struct SimCollector {
    client: Arc<dyn SimClient>,

    up: Arc<Desc>,
    sim_info: Arc<Desc>,
    current_month_traffic: Arc<Desc>,
    uplink: Arc<Desc>,
    downlink: Arc<Desc>,
}

fn sim_labels(sim: &Sim) -> Vec<String> {
    vec![sim.item.id.clone(), sim.item.name.clone()]
}

/// Carriers the SIM may attach to, flattened into one label
fn allowed_carriers(configs: &[NetworkOperatorConfig]) -> String {
    let names: Vec<String> = configs
        .iter()
        .filter(|config| config.allow)
        .map(|config| config.name.clone())
        .collect();
    flatten_string_slice(&names)
}

impl SimCollector {
    pub fn new(errors: &ErrorCounter, client: Arc<dyn SimClient>) -> Result<Self, prometheus::Error> {
        errors.init_collector("sim");

        Ok(SimCollector {
            client,
            up: new_desc(
                "sim_session_up",
                "If 1 the session is up and running, 0 otherwise",
                SIM_LABELS,
            )?,
            sim_info: new_desc(
                "sim_info",
                "A metric with a constant '1' value labeled by sim information",
                &with_labels(
                    SIM_LABELS,
                    &[
                        "iccid",
                        "imei_lock",
                        "registered",
                        "activated",
                        "ipaddress",
                        "carrier",
                        "tags",
                        "description",
                    ],
                ),
            )?,
            current_month_traffic: new_desc(
                "sim_current_month_traffic",
                "Current month traffic (unit: Byte)",
                SIM_LABELS,
            )?,
            uplink: new_desc("sim_uplink", "Uplink traffic (unit: Kbps)", SIM_LABELS)?,
            downlink: new_desc("sim_downlink", "Downlink traffic (unit: Kbps)", SIM_LABELS)?,
        })
    }

    async fn collect_sim(&self, ctx: &CollectContext, sim: &Sim) {
        let id = &sim.item.id;
        let (status, carriers) = futures_util::join!(
            ctx.fetch_optional(
                format!("can't get sim's status: ID={}", id),
                self.client.status(id),
            ),
            ctx.fetch(
                format!("can't get sim's network operator config: ID={}", id),
                self.client.network_operator_config(id),
            ),
        );

        // Without a status there is no session state to report
        let status = match status {
            Some(status) => status,
            None => return,
        };

        let labels = sim_labels(sim);
        let session_up = status.is_session_up();
        ctx.emit(&self.up, bool_to_f64(session_up), labels.clone());
        self.emit_info(ctx, sim, &status, carriers.as_deref().unwrap_or_default());

        if let Some(traffic) = &status.traffic_bytes_of_current_month {
            ctx.emit(
                &self.current_month_traffic,
                traffic.uplink_bytes + traffic.downlink_bytes,
                labels,
            );
        }

        if sim.item.is_available() && session_up {
            self.collect_traffic(ctx, sim).await;
        }
    }

    fn emit_info(
        &self,
        ctx: &CollectContext,
        sim: &Sim,
        status: &SimInfo,
        carriers: &[NetworkOperatorConfig],
    ) {
        let iccid = if status.iccid.is_empty() {
            sim.status.iccid.clone()
        } else {
            status.iccid.clone()
        };

        let mut labels = sim_labels(sim);
        labels.extend([
            iccid,
            bool_label(status.imei_lock),
            bool_label(status.registered),
            bool_label(status.activated),
            status.ip.clone(),
            allowed_carriers(carriers),
            flatten_string_slice(&sim.item.tags),
            sim.item.description.clone(),
        ]);
        ctx.emit(&self.sim_info, 1.0, labels);
    }

    async fn collect_traffic(&self, ctx: &CollectContext, sim: &Sim) {
        let value = ctx
            .fetch_optional(
                format!("can't get sim's metrics: ID={}", sim.item.id),
                self.client.monitor_sim(&sim.item.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            let labels = sim_labels(sim);
            ctx.emit_at(&self.uplink, bps_to_kbps(value.uplink_bps), labels.clone(), value.time);
            ctx.emit_at(&self.downlink, bps_to_kbps(value.downlink_bps), labels, value.time);
        }
    }
}

#[async_trait]
impl Collector for SimCollector {
    fn name(&self) -> &'static str {
        "sim"
    }

    fn describe(&self) -> Vec<&Desc> {
        vec![
            &self.up,
            &self.sim_info,
            &self.current_month_traffic,
            &self.uplink,
            &self.downlink,
        ]
    }

    async fn collect(&self, ctx: &CollectContext) {
        let sims = ctx
            .fetch("can't list sims", self.client.find())
            .await
            .unwrap_or_default();

        join_all(sims.iter().map(|sim| self.collect_sim(ctx, sim))).await;
    }
}
