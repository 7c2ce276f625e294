// Web accelerator collector

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use prometheus::core::Desc;

use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::platform::webaccel::{MonthlyUsage, Site, WebAccelClient};

const SITE_LABELS: &[&str] = &["id", "name"];

pub struct WebAccelCollector {
    client: Arc<dyn WebAccelClient>,

    site_info: Arc<Desc>,
    access_count: Arc<Desc>,
    bytes_sent: Arc<Desc>,
    cache_miss_bytes_sent: Arc<Desc>,
    cache_hit_ratio: Arc<Desc>,
    bytes_cache_hit_ratio: Arc<Desc>,
    price: Arc<Desc>,
}

impl WebAccelCollector {
    pub fn new(
        errors: &ErrorCounter,
        client: Arc<dyn WebAccelClient>,
    ) -> Result<Self, prometheus::Error> {
        errors.init_collector("webaccel");

        Ok(WebAccelCollector {
            client,
            site_info: new_desc(
                "webaccel_site_info",
                "A metric with a constant '1' value labeled by site information",
                &with_labels(
                    SITE_LABELS,
                    &["domain_type", "domain", "subdomain", "ascii_domain", "origin", "status"],
                ),
            )?,
            access_count: new_desc(
                "webaccel_access_count",
                "Access count of the current month",
                SITE_LABELS,
            )?,
            bytes_sent: new_desc(
                "webaccel_bytes_sent",
                "Bytes sent in the current month",
                SITE_LABELS,
            )?,
            cache_miss_bytes_sent: new_desc(
                "webaccel_cache_miss_bytes_sent",
                "Bytes sent on cache miss in the current month",
                SITE_LABELS,
            )?,
            cache_hit_ratio: new_desc(
                "webaccel_cache_hit_ratio",
                "Cache hit ratio of the current month",
                SITE_LABELS,
            )?,
            bytes_cache_hit_ratio: new_desc(
                "webaccel_bytes_cache_hit_ratio",
                "Cache hit ratio by bytes of the current month",
                SITE_LABELS,
            )?,
            price: new_desc(
                "webaccel_price",
                "Price of the current month(unit: JPY)",
                SITE_LABELS,
            )?,
        })
    }

    fn emit_site(&self, ctx: &CollectContext, site: &Site, usage: Option<&MonthlyUsage>) {
        let labels = vec![site.id.clone(), site.name.clone()];

        let mut info_labels = labels.clone();
        info_labels.extend([
            site.domain_type.clone(),
            site.domain.clone(),
            site.subdomain.clone(),
            site.ascii_domain.clone(),
            site.origin.clone(),
            site.status.clone(),
        ]);
        ctx.emit(&self.site_info, 1.0, info_labels);

        // Sites without traffic this month are absent from the usage list
        let Some(usage) = usage else {
            return;
        };
        ctx.emit(&self.access_count, usage.access_count, labels.clone());
        ctx.emit(&self.bytes_sent, usage.bytes_sent, labels.clone());
        ctx.emit(&self.cache_miss_bytes_sent, usage.cache_miss_bytes_sent, labels.clone());
        ctx.emit(&self.cache_hit_ratio, usage.cache_hit_ratio, labels.clone());
        ctx.emit(&self.bytes_cache_hit_ratio, usage.bytes_cache_hit_ratio, labels.clone());
        ctx.emit(&self.price, usage.price, labels);
    }
}

#[async_trait]
impl Collector for WebAccelCollector {
    fn name(&self) -> &'static str {
        "webaccel"
    }

    fn describe(&self) -> Vec<&Desc> {
        vec![
            &self.site_info,
            &self.access_count,
            &self.bytes_sent,
            &self.cache_miss_bytes_sent,
            &self.cache_hit_ratio,
            &self.bytes_cache_hit_ratio,
            &self.price,
        ]
    }

    async fn collect(&self, ctx: &CollectContext) {
        let (sites, usages) = futures_util::join!(
            ctx.fetch("can't list webaccel sites", self.client.find()),
            ctx.fetch("can't get webaccel monthly usage", self.client.monthly_usage()),
        );

        let usages: HashMap<&str, &MonthlyUsage> = usages
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|usage| (usage.site_id.as_str(), usage))
            .collect();

        for site in sites.as_deref().unwrap_or_default() {
            self.emit_site(ctx, site, usages.get(site.id.as_str()).copied());
        }
    }
}
