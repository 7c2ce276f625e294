// Sink module - collects gauge samples emitted during a scrape
//
// This module is responsible for:
// 1. Carrying samples from many concurrent collector tasks to the registry
// 2. Enforcing the descriptor label-count invariant on every sample
// 3. Converting the samples of one scrape into Prometheus metric families

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use prometheus::core::Desc;
use prometheus::proto::{Gauge, LabelPair, Metric, MetricFamily, MetricType};
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

/// Errors that can occur when a sample is built or sent
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("metric {name} declares {expected} label(s) but {actual} value(s) were given")]
    LabelMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("sample receiver for this scrape is gone")]
    Closed,
}

/// A single gauge observation
///
/// The label values are in the same order as the descriptor's variable
/// labels. Samples without a timestamp are exposed without one so the
/// scraper assigns its own scrape time.
#[derive(Debug, Clone)]
pub struct Sample {
    desc: Arc<Desc>,
    value: f64,
    label_values: Vec<String>,
    timestamp: Option<DateTime<Utc>>,
}

impl Sample {
    /// Builds a sample, checking the label count against the descriptor
    ///
    /// # Returns
    /// * `Ok(Sample)` - Label values match the declared schema
    /// * `Err(SinkError::LabelMismatch)` - Wrong number of label values
    pub fn new(
        desc: Arc<Desc>,
        value: f64,
        label_values: Vec<String>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Self, SinkError> {
        if desc.variable_labels.len() != label_values.len() {
            return Err(SinkError::LabelMismatch {
                name: desc.fq_name.clone(),
                expected: desc.variable_labels.len(),
                actual: label_values.len(),
            });
        }

        Ok(Sample {
            desc,
            value,
            label_values,
            timestamp,
        })
    }

    pub fn name(&self) -> &str {
        &self.desc.fq_name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Looks up a label value by its name
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .variable_labels
            .iter()
            .position(|label| label == name)
            .map(|index| self.label_values[index].as_str())
    }

    fn to_metric(&self) -> Metric {
        let mut pairs: Vec<LabelPair> = self
            .desc
            .variable_labels
            .iter()
            .zip(&self.label_values)
            .map(|(name, value)| {
                let mut pair = LabelPair::default();
                pair.set_name(name.clone());
                pair.set_value(value.clone());
                pair
            })
            .collect();
        pairs.sort_by(|a, b| a.get_name().cmp(b.get_name()));

        let mut gauge = Gauge::default();
        gauge.set_value(self.value);

        let mut metric = Metric::default();
        for pair in pairs {
            metric.mut_label().push(pair);
        }
        metric.set_gauge(gauge);
        if let Some(timestamp) = self.timestamp {
            metric.set_timestamp_ms(timestamp.timestamp_millis());
        }
        metric
    }
}

/// Sending half shared by every task of a scrape
///
/// Cloning is cheap; the channel is unbounded so emitting never waits.
#[derive(Clone)]
pub struct MetricSink {
    sender: UnboundedSender<Sample>,
}

/// Receiving half owned by the registry
pub struct SampleReceiver {
    receiver: UnboundedReceiver<Sample>,
}

/// Creates the sink/receiver pair for one scrape
pub fn channel() -> (MetricSink, SampleReceiver) {
    let (sender, receiver) = unbounded_channel();
    (MetricSink { sender }, SampleReceiver { receiver })
}

impl MetricSink {
    /// Sends a sample to the registry
    ///
    /// # Returns
    /// * `Err(SinkError::Closed)` - The scrape was abandoned and nobody reads anymore
    pub fn send(&self, sample: Sample) -> Result<(), SinkError> {
        self.sender.send(sample).map_err(|_| SinkError::Closed)
    }
}

impl SampleReceiver {
    /// Drains the channel until every sink clone has been dropped
    pub async fn collect_all(mut self) -> Vec<Sample> {
        let mut samples = Vec::new();
        while let Some(sample) = self.receiver.recv().await {
            samples.push(sample);
        }
        debug!("Received {} sample(s)", samples.len());
        samples
    }
}

/// Groups samples into metric families
///
/// Families are ordered by name and metrics by label values, so the same
/// set of samples always encodes to the same text regardless of the order
/// the concurrent tasks produced them in. A second sample with the same
/// name and label values is dropped.
pub fn into_metric_families(samples: Vec<Sample>) -> Vec<MetricFamily> {
    let mut grouped: BTreeMap<String, (String, BTreeMap<Vec<String>, Sample>)> = BTreeMap::new();

    for sample in samples {
        let (_, series) = grouped
            .entry(sample.desc.fq_name.clone())
            .or_insert_with(|| (sample.desc.help.clone(), BTreeMap::new()));

        if series.contains_key(&sample.label_values) {
            warn!(
                "Dropping duplicate sample for {} {:?}",
                sample.desc.fq_name, sample.label_values
            );
            continue;
        }
        series.insert(sample.label_values.clone(), sample);
    }

    grouped
        .into_iter()
        .map(|(name, (help, series))| {
            let mut family = MetricFamily::default();
            family.set_name(name);
            family.set_help(help);
            family.set_field_type(MetricType::GAUGE);
            for sample in series.values() {
                family.mut_metric().push(sample.to_metric());
            }
            family
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn desc(name: &str, labels: &[&str]) -> Arc<Desc> {
        Arc::new(
            Desc::new(
                name.to_string(),
                "help".to_string(),
                labels.iter().map(|l| l.to_string()).collect(),
                HashMap::new(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_label_count_is_enforced() {
        let d = desc("test_metric", &["id", "name"]);
        let err = Sample::new(d.clone(), 1.0, vec!["1".into()], None).unwrap_err();
        assert!(matches!(
            err,
            SinkError::LabelMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));

        let sample = Sample::new(d, 1.0, vec!["1".into(), "a".into()], None).unwrap();
        assert_eq!(sample.label("name"), Some("a"));
        assert_eq!(sample.label("zone"), None);
    }

    #[tokio::test]
    async fn test_receiver_drains_all_clones() {
        let (sink, receiver) = channel();
        let d = desc("test_metric", &["id"]);

        let other = sink.clone();
        sink.send(Sample::new(d.clone(), 1.0, vec!["1".into()], None).unwrap())
            .unwrap();
        other
            .send(Sample::new(d, 2.0, vec!["2".into()], None).unwrap())
            .unwrap();
        drop(sink);
        drop(other);

        let samples = receiver.collect_all().await;
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_families_are_sorted_and_deduplicated() {
        let up = desc("b_up", &["id"]);
        let info = desc("a_info", &["id", "name"]);
        let time = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();

        let samples = vec![
            Sample::new(up.clone(), 1.0, vec!["2".into()], None).unwrap(),
            Sample::new(up.clone(), 0.0, vec!["1".into()], Some(time)).unwrap(),
            Sample::new(up, 5.0, vec!["1".into()], None).unwrap(),
            Sample::new(info, 1.0, vec!["1".into(), "x".into()], None).unwrap(),
        ];

        let families = into_metric_families(samples);
        assert_eq!(families.len(), 2);
        assert_eq!(families[0].get_name(), "a_info");
        assert_eq!(families[1].get_name(), "b_up");

        let metrics = families[1].get_metric();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].get_label()[0].get_value(), "1");
        assert_eq!(metrics[0].get_gauge().get_value(), 0.0);
        assert_eq!(metrics[0].get_timestamp_ms(), time.timestamp_millis());
        assert_eq!(metrics[1].get_label()[0].get_value(), "2");
    }
}
