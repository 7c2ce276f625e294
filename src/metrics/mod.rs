// Metrics module - the collector abstraction and its per-scrape context
//
// Every resource kind has one collector. A collector owns its static
// descriptors and, on each scrape, lists its resources and fans out the
// per-resource fetches, emitting gauges into the scrape's sink.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use prometheus::core::Desc;
use tokio::sync::Semaphore;
use tracing::{debug, error, warn};

use crate::config::{CollectorKind, ExporterConfig};
use crate::errors::ErrorCounter;
use crate::platform::{ClientResult, SakuraCloudClient};
use crate::sink::{MetricSink, Sample, SinkError};

pub mod appliance;
pub mod maintenance;

pub mod auto_backup;
pub mod bill;
pub mod coupon;
pub mod database;
pub mod esme;
pub mod internet;
pub mod load_balancer;
pub mod mobile_gateway;
pub mod nfs;
pub mod proxylb;
pub mod server;
pub mod sim;
pub mod vpc_router;
pub mod webaccel;
pub mod zone;

#[cfg(test)]
pub mod testing;

/// Prefix shared by every exported metric
pub const NAMESPACE: &str = "sakuracloud";

/// Core trait that all resource collectors implement.
///
/// The registry calls `describe` once at startup and `collect` once per
/// scrape, in parallel with the other collectors.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Label value of this collector in the error counter
    fn name(&self) -> &'static str;

    /// Every descriptor this collector can ever emit
    ///
    /// Stable across calls and independent of live data.
    fn describe(&self) -> Vec<&Desc>;

    /// Lists resources and emits their samples into `ctx`
    ///
    /// Never fails: API errors are counted and logged through `ctx` and
    /// the affected samples are simply missing.
    async fn collect(&self, ctx: &CollectContext);
}

/// Builds a gauge descriptor under the exporter namespace
///
/// # Example
/// ```
/// let up = new_desc("server_up", "If 1 the server is up and running, 0 otherwise", &["id", "name", "zone"])?;
/// ```
pub fn new_desc(name: &str, help: &str, labels: &[&str]) -> Result<Arc<Desc>, prometheus::Error> {
    let desc = Desc::new(
        format!("{}_{}", NAMESPACE, name),
        help.to_string(),
        labels.iter().map(|label| label.to_string()).collect(),
        HashMap::new(),
    )?;
    Ok(Arc::new(desc))
}

/// Concatenates a base label schema with extra label names
pub fn with_labels(base: &[&'static str], extra: &[&'static str]) -> Vec<&'static str> {
    base.iter().chain(extra).copied().collect()
}

/// Everything a collector needs during one scrape
///
/// Shared by all tasks the collector fans out: the sink and the error
/// counter accept concurrent use, and the limiter caps the number of
/// outbound API calls in flight across the whole scrape.
pub struct CollectContext {
    collector: &'static str,
    sink: MetricSink,
    errors: ErrorCounter,
    limiter: Arc<Semaphore>,
    now: DateTime<Utc>,
}

impl CollectContext {
    pub fn new(
        collector: &'static str,
        sink: MetricSink,
        errors: ErrorCounter,
        limiter: Arc<Semaphore>,
        now: DateTime<Utc>,
    ) -> Self {
        CollectContext {
            collector,
            sink,
            errors,
            limiter,
            now,
        }
    }

    /// Scrape time, used as the end of every monitor window
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Emits a sample without a timestamp
    pub fn emit(&self, desc: &Arc<Desc>, value: f64, labels: Vec<String>) {
        self.send(desc, value, labels, None);
    }

    /// Emits a sample stamped with the time of the data point it came from
    pub fn emit_at(&self, desc: &Arc<Desc>, value: f64, labels: Vec<String>, time: DateTime<Utc>) {
        self.send(desc, value, labels, Some(time));
    }

    fn send(
        &self,
        desc: &Arc<Desc>,
        value: f64,
        labels: Vec<String>,
        time: Option<DateTime<Utc>>,
    ) {
        let result = Sample::new(Arc::clone(desc), value, labels, time)
            .and_then(|sample| self.sink.send(sample));

        match result {
            Ok(()) => {}
            Err(SinkError::Closed) => {
                debug!("Scrape abandoned, dropping sample for {}", desc.fq_name);
            }
            Err(e) => {
                error!(collector = self.collector, "Dropping invalid sample: {}", e);
            }
        }
    }

    /// Runs one API call under the outbound limit
    ///
    /// On failure the collector's error counter is incremented once and a
    /// warning naming `operation` is logged.
    ///
    /// # Returns
    /// * `Some(value)` - The call succeeded
    /// * `None` - The call failed; the caller emits nothing for it
    pub async fn fetch<T, F>(&self, operation: impl Display, call: F) -> Option<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        // The semaphore is never closed; without a permit the call still runs.
        let permit = self.limiter.acquire().await.ok();
        let result = call.await;
        drop(permit);

        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.errors.inc(self.collector);
                warn!(collector = self.collector, "{}: {}", operation, e);
                None
            }
        }
    }

    /// Like `fetch`, for calls that may legitimately have nothing to report
    pub async fn fetch_optional<T, F>(&self, operation: impl Display, call: F) -> Option<T>
    where
        F: Future<Output = ClientResult<Option<T>>>,
    {
        self.fetch(operation, call).await.flatten()
    }
}

/// Helper function to create all enabled collectors.
///
/// Each collector registers its label in the error counter so it reports
/// 0 before any failure.
///
/// # Adding New Collectors
/// 1. Add the platform client trait and its `SakuraCloudClient` impl
/// 2. Add the collector module and a `CollectorKind` variant
/// 3. Add the instantiation here
pub fn create_all_collectors(
    config: &ExporterConfig,
    client: Arc<SakuraCloudClient>,
    errors: &ErrorCounter,
) -> Result<Vec<Arc<dyn Collector>>, prometheus::Error> {
    let mut collectors: Vec<Arc<dyn Collector>> = Vec::new();

    for kind in CollectorKind::ALL {
        if !config.collector_enabled(kind) {
            debug!("Collector '{}' disabled", kind.name());
            continue;
        }

        let collector: Arc<dyn Collector> = match kind {
            CollectorKind::AutoBackup => Arc::new(auto_backup::AutoBackupCollector::new(
                errors,
                client.clone(),
            )?),
            CollectorKind::Bill => Arc::new(bill::BillCollector::new(errors, client.clone())?),
            CollectorKind::Coupon => Arc::new(coupon::CouponCollector::new(errors, client.clone())?),
            CollectorKind::Database => Arc::new(database::DatabaseCollector::new(
                errors,
                client.clone(),
            )?),
            CollectorKind::Esme => Arc::new(esme::EsmeCollector::new(errors, client.clone())?),
            CollectorKind::Internet => Arc::new(internet::InternetCollector::new(
                errors,
                client.clone(),
            )?),
            CollectorKind::LoadBalancer => Arc::new(load_balancer::LoadBalancerCollector::new(
                errors,
                client.clone(),
            )?),
            CollectorKind::MobileGateway => Arc::new(
                mobile_gateway::MobileGatewayCollector::new(errors, client.clone())?,
            ),
            CollectorKind::Nfs => Arc::new(nfs::NfsCollector::new(errors, client.clone())?),
            CollectorKind::ProxyLb => Arc::new(proxylb::ProxyLbCollector::new(
                errors,
                client.clone(),
            )?),
            CollectorKind::Server => Arc::new(server::ServerCollector::new(errors, client.clone())?),
            CollectorKind::Sim => Arc::new(sim::SimCollector::new(errors, client.clone())?),
            CollectorKind::VpcRouter => Arc::new(vpc_router::VpcRouterCollector::new(
                errors,
                client.clone(),
            )?),
            CollectorKind::WebAccel => Arc::new(webaccel::WebAccelCollector::new(
                errors,
                client.clone(),
            )?),
            CollectorKind::Zone => Arc::new(zone::ZoneCollector::new(errors, client.clone())?),
        };
        collectors.push(collector);
    }

    Ok(collectors)
}
