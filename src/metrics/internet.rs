// Internet (switch + router) collector

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use prometheus::core::Desc;

use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::{bytes_to_kbps, flatten_string_slice};
use crate::platform::internet::{Internet, InternetClient};

const INTERNET_LABELS: &[&str] = &["id", "name", "zone"];

pub struct InternetCollector {
    client: Arc<dyn InternetClient>,

    internet_info: Arc<Desc>,
    inbound: Arc<Desc>,
    outbound: Arc<Desc>,
}

fn internet_labels(internet: &Internet) -> Vec<String> {
    vec![
        internet.id.clone(),
        internet.name.clone(),
        internet.zone.clone(),
    ]
}

impl InternetCollector {
    pub fn new(
        errors: &ErrorCounter,
        client: Arc<dyn InternetClient>,
    ) -> Result<Self, prometheus::Error> {
        errors.init_collector("internet");

        Ok(InternetCollector {
            client,
            internet_info: new_desc(
                "internet_info",
                "A metric with a constant '1' value labeled by internet information",
                &with_labels(
                    INTERNET_LABELS,
                    &["switch_id", "bandwidth", "tags", "description"],
                ),
            )?,
            inbound: new_desc(
                "internet_in",
                "NIC's receive bytes(unit: Kbps)",
                INTERNET_LABELS,
            )?,
            outbound: new_desc(
                "internet_out",
                "NIC's send bytes(unit: Kbps)",
                INTERNET_LABELS,
            )?,
        })
    }

    async fn collect_internet(&self, ctx: &CollectContext, internet: &Internet) {
        let labels = internet_labels(internet);

        let mut info_labels = labels.clone();
        info_labels.extend([
            internet.switch.id.clone(),
            internet.band_width_mbps.to_string(),
            flatten_string_slice(&internet.tags),
            internet.description.clone(),
        ]);
        ctx.emit(&self.internet_info, 1.0, info_labels);

        let value = ctx
            .fetch_optional(
                format!("can't get internet's traffic: ID={}", internet.id),
                self.client.monitor(&internet.zone, &internet.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            ctx.emit_at(&self.inbound, bytes_to_kbps(value.inbound), labels.clone(), value.time);
            ctx.emit_at(&self.outbound, bytes_to_kbps(value.outbound), labels, value.time);
        }
    }
}

#[async_trait]
impl Collector for InternetCollector {
    fn name(&self) -> &'static str {
        "internet"
    }

    fn describe(&self) -> Vec<&Desc> {
        vec![&self.internet_info, &self.inbound, &self.outbound]
    }

    async fn collect(&self, ctx: &CollectContext) {
        let all = ctx
            .fetch("can't list internets", self.client.find())
            .await
            .unwrap_or_default();

        join_all(all.iter().map(|internet| self.collect_internet(ctx, internet))).await;
    }
}
