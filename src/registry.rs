// Registry module - runs every collector once per scrape
//
// This module implements the scrape loop using Tokio tasks.
// Each collector runs in its own task against a shared sink; the registry
// waits for all of them, then merges their samples with the static
// metrics (error counter, process metrics).
//
// # Architecture
// - One spawned task per collector per scrape
// - Tasks run concurrently and independently
// - Outbound API calls are bounded by one semaphore shared across tasks
// - A panicking collector loses its own samples only

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Registry, TextEncoder};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

use crate::errors::ErrorCounter;
use crate::metrics::{CollectContext, Collector};
use crate::sink::{channel, into_metric_families};

/// Errors that can occur while building the registry or encoding a scrape
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Descriptor {name} is declared by more than one collector (second: {collector})")]
    DuplicateDescriptor {
        name: String,
        collector: &'static str,
    },

    #[error("Prometheus registry error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("Encoded metrics are not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// Owns the collectors and everything shared between scrapes
pub struct ExporterRegistry {
    /// Static metrics: the error counter and process metrics
    registry: Registry,

    collectors: Vec<Arc<dyn Collector>>,

    errors: ErrorCounter,

    /// Caps outbound API calls in flight across all collectors
    limiter: Arc<Semaphore>,
}

impl ExporterRegistry {
    /// Creates the registry
    ///
    /// # Arguments
    /// * `collectors` - Enabled collectors, built with the same `errors`
    /// * `errors` - Error counter shared with the collectors
    /// * `max_concurrency` - Outbound API calls allowed in flight per scrape
    ///
    /// # Returns
    /// * `Err(RegistryError::DuplicateDescriptor)` - Two collectors declare the same metric
    pub fn new(
        collectors: Vec<Arc<dyn Collector>>,
        errors: ErrorCounter,
        max_concurrency: usize,
    ) -> Result<Self, RegistryError> {
        let registry = Registry::new();
        errors.register(&registry)?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))?;

        let mut seen = HashSet::new();
        for collector in &collectors {
            for desc in collector.describe() {
                if !seen.insert(desc.fq_name.clone()) {
                    return Err(RegistryError::DuplicateDescriptor {
                        name: desc.fq_name.clone(),
                        collector: collector.name(),
                    });
                }
            }
        }

        info!(
            "Registered {} collector(s) with {} descriptor(s)",
            collectors.len(),
            seen.len()
        );

        Ok(ExporterRegistry {
            registry,
            collectors,
            errors,
            limiter: Arc::new(Semaphore::new(max_concurrency.max(1))),
        })
    }

    /// Runs one scrape of every collector
    ///
    /// # Returns
    /// Metric families sorted by name: the collected gauges followed by
    /// the error counter and process metrics as they stand after the scrape.
    pub async fn gather(&self) -> Vec<MetricFamily> {
        let (sink, receiver) = channel();
        let now = Utc::now();

        let mut handles = Vec::with_capacity(self.collectors.len());
        for collector in &self.collectors {
            let collector = Arc::clone(collector);
            let ctx = CollectContext::new(
                collector.name(),
                sink.clone(),
                self.errors.clone(),
                Arc::clone(&self.limiter),
                now,
            );

            let handle = tokio::spawn(async move {
                let started = std::time::Instant::now();
                collector.collect(&ctx).await;
                debug!(
                    "Collector '{}' finished in {:?}",
                    collector.name(),
                    started.elapsed()
                );
            });
            handles.push(handle);
        }

        // The receiver ends once every task has dropped its context
        drop(sink);
        let samples = receiver.collect_all().await;

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Collector task panicked: {}", e);
            }
        }

        let mut families = into_metric_families(samples);
        families.extend(self.registry.gather());
        families.sort_by(|a, b| a.get_name().cmp(b.get_name()));
        families
    }

    /// Runs one scrape and renders it in the Prometheus text format
    pub async fn encode_text(&self) -> Result<String, RegistryError> {
        let families = self.gather().await;

        let mut buffer = Vec::new();
        TextEncoder::new().encode(&families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
