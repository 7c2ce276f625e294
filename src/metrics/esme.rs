// ESME collector

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use prometheus::core::Desc;

use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::flatten_string_slice;
use crate::platform::esme::{Esme, EsmeClient, EsmeLog};

const ESME_LABELS: &[&str] = &["id", "name"];

pub struct EsmeCollector {
    client: Arc<dyn EsmeClient>,

    esme_info: Arc<Desc>,
    message_count: Arc<Desc>,
}

fn esme_labels(esme: &Esme) -> Vec<String> {
    vec![esme.item.id.clone(), esme.item.name.clone()]
}

/// Number of logged messages per delivery status
fn count_by_status(logs: &[EsmeLog]) -> BTreeMap<&str, usize> {
    let mut counts = BTreeMap::new();
    for log in logs {
        *counts.entry(log.status.as_str()).or_insert(0) += 1;
    }
    counts
}

impl EsmeCollector {
    pub fn new(errors: &ErrorCounter, client: Arc<dyn EsmeClient>) -> Result<Self, prometheus::Error> {
        errors.init_collector("esme");

        Ok(EsmeCollector {
            client,
            esme_info: new_desc(
                "esme_info",
                "A metric with a constant '1' value labeled by ESME information",
                &with_labels(ESME_LABELS, &["tags", "description"]),
            )?,
            message_count: new_desc(
                "esme_message_count",
                "A count of messages handled by ESME",
                &with_labels(ESME_LABELS, &["status"]),
            )?,
        })
    }

    async fn collect_esme(&self, ctx: &CollectContext, esme: &Esme) {
        let mut info_labels = esme_labels(esme);
        info_labels.extend([
            flatten_string_slice(&esme.item.tags),
            esme.item.description.clone(),
        ]);
        ctx.emit(&self.esme_info, 1.0, info_labels);

        let logs = ctx
            .fetch(
                format!("can't get ESME's logs: ID={}", esme.item.id),
                self.client.logs(&esme.item.id),
            )
            .await;

        if let Some(logs) = logs {
            for (status, count) in count_by_status(&logs) {
                let mut labels = esme_labels(esme);
                labels.push(status.to_string());
                ctx.emit(&self.message_count, count as f64, labels);
            }
        }
    }
}

#[async_trait]
impl Collector for EsmeCollector {
    fn name(&self) -> &'static str {
        "esme"
    }

    fn describe(&self) -> Vec<&Desc> {
        vec![&self.esme_info, &self.message_count]
    }

    async fn collect(&self, ctx: &CollectContext) {
        let all = ctx
            .fetch("can't list ESME", self.client.find())
            .await
            .unwrap_or_default();

        join_all(all.iter().map(|esme| self.collect_esme(ctx, esme))).await;
    }
}
