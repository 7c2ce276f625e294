// Exporter error counter
//
// Operators see upstream API failures only through this counter and the
// warning logs; the metrics endpoint itself never fails because of them.

use prometheus::{IntCounterVec, Opts, Registry};

/// Counter of failed API calls, labeled by collector name
///
/// Cloning shares the underlying counter, so every collector task
/// increments the same series.
#[derive(Clone)]
pub struct ErrorCounter {
    counter: IntCounterVec,
}

impl ErrorCounter {
    /// Creates the `sakuracloud_exporter_errors_total` counter
    pub fn new() -> Result<Self, prometheus::Error> {
        let counter = IntCounterVec::new(
            Opts::new(
                "sakuracloud_exporter_errors_total",
                "The total number of errors per collector",
            ),
            &["collector"],
        )?;
        Ok(ErrorCounter { counter })
    }

    /// Registers the counter in a Prometheus registry
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.counter.clone()))
    }

    /// Makes a collector's series visible with value 0 before any error
    pub fn init_collector(&self, collector: &str) {
        self.counter.with_label_values(&[collector]);
    }

    /// Records one failed call
    pub fn inc(&self, collector: &str) {
        self.counter.with_label_values(&[collector]).inc();
    }

    /// Current count for a collector
    pub fn get(&self, collector: &str) -> u64 {
        self.counter.with_label_values(&[collector]).get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialized_collector_reports_zero() {
        let errors = ErrorCounter::new().unwrap();
        let registry = Registry::new();
        errors.register(&registry).unwrap();
        errors.init_collector("server");

        let families = registry.gather();
        assert_eq!(families.len(), 1);
        let metric = &families[0].get_metric()[0];
        assert_eq!(metric.get_label()[0].get_value(), "server");
        assert_eq!(metric.get_counter().get_value(), 0.0);
    }

    #[test]
    fn test_clones_share_counts() {
        let errors = ErrorCounter::new().unwrap();
        let clone = errors.clone();
        errors.inc("zone");
        clone.inc("zone");
        assert_eq!(errors.get("zone"), 2);
        assert_eq!(errors.get("server"), 0);
    }
}
