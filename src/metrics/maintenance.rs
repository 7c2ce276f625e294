// Maintenance metrics shared by every host-backed resource kind

use std::sync::Arc;

use chrono::{DateTime, Utc};
use prometheus::core::Desc;

use super::{new_desc, with_labels, CollectContext};
use crate::labels::bool_to_f64;
use crate::platform::MaintenanceClient;

/// The four maintenance gauges of one resource kind
///
/// Labels are the resource kind's base labels; the info gauge adds the
/// notice's URL, title, description and window.
pub struct MaintenanceDescs {
    resource: &'static str,
    scheduled: Arc<Desc>,
    info: Arc<Desc>,
    start: Arc<Desc>,
    end: Arc<Desc>,
}

impl MaintenanceDescs {
    /// # Arguments
    /// * `subsystem` - Metric name part, e.g. `server` gives `sakuracloud_server_maintenance_*`
    /// * `resource` - Human-readable resource name used in log messages
    /// * `labels` - Base label schema of the resource kind
    pub fn new(
        subsystem: &str,
        resource: &'static str,
        labels: &[&'static str],
    ) -> Result<Self, prometheus::Error> {
        Ok(MaintenanceDescs {
            resource,
            scheduled: new_desc(
                &format!("{}_maintenance_scheduled", subsystem),
                &format!("If 1 the {} has scheduled maintenance info, 0 otherwise", resource),
                labels,
            )?,
            info: new_desc(
                &format!("{}_maintenance_info", subsystem),
                &format!("A metric with a constant '1' value labeled by {} maintenance information", resource),
                &with_labels(
                    labels,
                    &["info_url", "info_title", "description", "start_date", "end_date"],
                ),
            )?,
            start: new_desc(
                &format!("{}_maintenance_start", subsystem),
                "Scheduled maintenance start time in seconds since epoch (1970)",
                labels,
            )?,
            end: new_desc(
                &format!("{}_maintenance_end", subsystem),
                "Scheduled maintenance end time in seconds since epoch (1970)",
                labels,
            )?,
        })
    }

    pub fn descs(&self) -> Vec<&Desc> {
        vec![
            self.scheduled.as_ref(),
            self.info.as_ref(),
            self.start.as_ref(),
            self.end.as_ref(),
        ]
    }

    /// Emits the maintenance gauges of one resource
    ///
    /// The feed is only consulted when `info_url` is non-empty. A URL with
    /// no published notice yields just `scheduled = 1`.
    pub async fn collect<C>(
        &self,
        ctx: &CollectContext,
        client: &C,
        labels: &[String],
        resource_id: &str,
        info_url: &str,
    ) where
        C: MaintenanceClient + ?Sized,
    {
        let scheduled = !info_url.is_empty();
        ctx.emit(&self.scheduled, bool_to_f64(scheduled), labels.to_vec());
        if !scheduled {
            return;
        }

        let item = ctx
            .fetch_optional(
                format!("can't get {}'s maintenance info: ID={}", self.resource, resource_id),
                client.maintenance_info(info_url),
            )
            .await;
        let Some(item) = item else {
            return;
        };

        let start = item.event_start();
        let end = item.event_end();
        let as_label = |time: Option<DateTime<Utc>>| {
            time.map(|time| time.timestamp().to_string())
                .unwrap_or_default()
        };

        let mut info_labels = labels.to_vec();
        info_labels.extend([
            item.url.clone(),
            item.title.clone(),
            item.description.clone(),
            as_label(start),
            as_label(end),
        ]);
        ctx.emit(&self.info, 1.0, info_labels);

        if let Some(start) = start {
            ctx.emit(&self.start, start.timestamp() as f64, labels.to_vec());
        }
        if let Some(end) = end {
            ctx.emit(&self.end, end.timestamp() as f64, labels.to_vec());
        }
    }
}
