// Test fixture shared by the collector tests
//
// Each test builds its own fixture: a fresh error counter, a captured log
// writer installed as the thread's default subscriber, and a fixed clock.

use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Semaphore;
use tracing::subscriber::DefaultGuard;

use super::{CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::platform::ClientError;
use crate::sink::{channel, Sample};

/// Scrape time used by every collector test
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
}

/// Error returned by failing fake clients
pub fn api_error() -> ClientError {
    ClientError::Api {
        status: 500,
        message: "fake error".to_string(),
    }
}

#[derive(Clone)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub struct TestFixture {
    pub errors: ErrorCounter,
    logs: CapturedLogs,
    limiter: Arc<Semaphore>,
    _guard: DefaultGuard,
}

impl TestFixture {
    pub fn new() -> Self {
        let logs = CapturedLogs(Arc::new(Mutex::new(Vec::new())));
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();

        TestFixture {
            errors: ErrorCounter::new().unwrap(),
            logs,
            limiter: Arc::new(Semaphore::new(4)),
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }

    /// A context whose samples are discarded
    pub fn context(&self, collector: &'static str) -> CollectContext {
        let (sink, _) = channel();
        CollectContext::new(
            collector,
            sink,
            self.errors.clone(),
            self.limiter.clone(),
            fixed_now(),
        )
    }

    /// Runs `emit` against a fresh context and returns what it emitted
    pub async fn run<F>(&self, collector: &'static str, emit: F) -> Vec<Sample>
    where
        F: FnOnce(&CollectContext),
    {
        let (sink, receiver) = channel();
        let ctx = CollectContext::new(
            collector,
            sink,
            self.errors.clone(),
            self.limiter.clone(),
            fixed_now(),
        );
        emit(&ctx);
        drop(ctx);
        receiver.collect_all().await
    }

    /// Runs one scrape of `collector`
    pub async fn collect(&self, collector: &dyn Collector) -> Vec<Sample> {
        let (sink, receiver) = channel();
        let ctx = CollectContext::new(
            collector.name(),
            sink,
            self.errors.clone(),
            self.limiter.clone(),
            fixed_now(),
        );
        collector.collect(&ctx).await;
        drop(ctx);
        receiver.collect_all().await
    }

    pub fn logs(&self) -> String {
        String::from_utf8_lossy(&self.logs.0.lock().unwrap()).to_string()
    }

    pub fn warning_count(&self) -> usize {
        self.logs()
            .lines()
            .filter(|line| line.contains(" WARN "))
            .count()
    }
}

/// All samples of one metric
pub fn samples_named<'a>(samples: &'a [Sample], name: &str) -> Vec<&'a Sample> {
    samples.iter().filter(|sample| sample.name() == name).collect()
}

/// The only sample of one metric; panics when there is not exactly one
pub fn single<'a>(samples: &'a [Sample], name: &str) -> &'a Sample {
    let found = samples_named(samples, name);
    assert_eq!(found.len(), 1, "expected exactly one sample of {}", name);
    found[0]
}

/// Sorted `name{labels} value` lines, for comparing whole scrapes
pub fn render(samples: &[Sample]) -> Vec<String> {
    let mut lines: Vec<String> = samples
        .iter()
        .map(|sample| {
            format!(
                "{}{:?} {} {:?}",
                sample.name(),
                sample.label_values(),
                sample.value(),
                sample.timestamp()
            )
        })
        .collect();
    lines.sort();
    lines
}
