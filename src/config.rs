// Configuration module - command line and environment settings
//
// This module is responsible for:
// 1. Parsing flags (with environment fallbacks for credentials)
// 2. Validating them before anything talks to the API
// 3. Deciding which collectors run
// 4. Building the API client options

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use tracing::info;

use crate::platform::api::DEFAULT_API_ROOT_URL;
use crate::platform::newsfeed::DEFAULT_MAINTENANCE_FEED_URL;
use crate::platform::ClientOptions;
use crate::server::HEALTH_PATH;

/// Errors that can occur during configuration validation
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingRequiredSetting(&'static str),

    #[error("Invalid setting {name}: {reason}")]
    InvalidSetting { name: &'static str, reason: String },
}

/// Exporter configuration
///
/// # Examples
/// ```bash
/// sakuracloud-exporter --token <token> --secret <secret>
/// SAKURACLOUD_ACCESS_TOKEN=... SAKURACLOUD_ACCESS_TOKEN_SECRET=... sakuracloud-exporter --zones is1a,tk1a
/// sakuracloud-exporter --no-collector.webaccel --no-collector.bill
/// ```
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sakuracloud-exporter",
    about = "Prometheus exporter for Sakura Cloud resources",
    version
)]
pub struct ExporterConfig {
    /// API access token
    #[arg(long, env = "SAKURACLOUD_ACCESS_TOKEN", default_value = "", hide_env_values = true)]
    pub token: String,

    /// API access token secret
    #[arg(
        long,
        env = "SAKURACLOUD_ACCESS_TOKEN_SECRET",
        default_value = "",
        hide_env_values = true
    )]
    pub secret: String,

    /// Zones to collect zone-partitioned resources from
    #[arg(long, env = "SAKURACLOUD_ZONES", value_delimiter = ',', default_value = "is1a,is1b,tk1a,tk1b")]
    pub zones: Vec<String>,

    /// Address to listen on for the metrics endpoint
    #[arg(long, default_value = "0.0.0.0:9542")]
    pub webaddr: SocketAddr,

    /// Path under which metrics are exposed
    #[arg(long, default_value = "/metrics")]
    pub webpath: String,

    /// Outbound API requests per second
    #[arg(long, env = "SAKURACLOUD_RATE_LIMIT", default_value_t = 5)]
    pub ratelimit: u32,

    /// Outbound API calls in flight per scrape (0 picks a value from the CPU count)
    #[arg(long = "max-concurrency", default_value_t = 0)]
    pub max_concurrency: usize,

    /// Per-request API timeout, in seconds
    #[arg(long = "api-timeout", default_value_t = 20)]
    pub api_timeout: u64,

    /// Root URL of the zone APIs
    #[arg(long = "api-root-url", env = "SAKURACLOUD_API_ROOT_URL", default_value = DEFAULT_API_ROOT_URL)]
    pub api_root_url: String,

    /// Public feed of maintenance notices
    #[arg(long = "maintenance-feed-url", default_value = DEFAULT_MAINTENANCE_FEED_URL)]
    pub maintenance_feed_url: String,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long)]
    pub debug: bool,

    #[arg(long = "no-collector.auto-backup")]
    pub no_collector_auto_backup: bool,

    #[arg(long = "no-collector.bill")]
    pub no_collector_bill: bool,

    #[arg(long = "no-collector.coupon")]
    pub no_collector_coupon: bool,

    #[arg(long = "no-collector.database")]
    pub no_collector_database: bool,

    #[arg(long = "no-collector.esme")]
    pub no_collector_esme: bool,

    #[arg(long = "no-collector.internet")]
    pub no_collector_internet: bool,

    #[arg(long = "no-collector.load-balancer")]
    pub no_collector_load_balancer: bool,

    #[arg(long = "no-collector.mobile-gateway")]
    pub no_collector_mobile_gateway: bool,

    #[arg(long = "no-collector.nfs")]
    pub no_collector_nfs: bool,

    #[arg(long = "no-collector.proxy-lb")]
    pub no_collector_proxylb: bool,

    #[arg(long = "no-collector.server")]
    pub no_collector_server: bool,

    #[arg(long = "no-collector.sim")]
    pub no_collector_sim: bool,

    #[arg(long = "no-collector.vpc-router")]
    pub no_collector_vpc_router: bool,

    #[arg(long = "no-collector.webaccel")]
    pub no_collector_webaccel: bool,

    #[arg(long = "no-collector.zone")]
    pub no_collector_zone: bool,
}

/// Resource kinds the exporter can collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectorKind {
    AutoBackup,
    Bill,
    Coupon,
    Database,
    Esme,
    Internet,
    LoadBalancer,
    MobileGateway,
    Nfs,
    ProxyLb,
    Server,
    Sim,
    VpcRouter,
    WebAccel,
    Zone,
}

impl CollectorKind {
    pub const ALL: [CollectorKind; 15] = [
        CollectorKind::AutoBackup,
        CollectorKind::Bill,
        CollectorKind::Coupon,
        CollectorKind::Database,
        CollectorKind::Esme,
        CollectorKind::Internet,
        CollectorKind::LoadBalancer,
        CollectorKind::MobileGateway,
        CollectorKind::Nfs,
        CollectorKind::ProxyLb,
        CollectorKind::Server,
        CollectorKind::Sim,
        CollectorKind::VpcRouter,
        CollectorKind::WebAccel,
        CollectorKind::Zone,
    ];

    /// Label of the collector in `sakuracloud_exporter_errors_total`
    pub fn name(self) -> &'static str {
        match self {
            CollectorKind::AutoBackup => "auto_backup",
            CollectorKind::Bill => "bill",
            CollectorKind::Coupon => "coupon",
            CollectorKind::Database => "database",
            CollectorKind::Esme => "esme",
            CollectorKind::Internet => "internet",
            CollectorKind::LoadBalancer => "loadbalancer",
            CollectorKind::MobileGateway => "mobile_gateway",
            CollectorKind::Nfs => "nfs",
            CollectorKind::ProxyLb => "proxylb",
            CollectorKind::Server => "server",
            CollectorKind::Sim => "sim",
            CollectorKind::VpcRouter => "vpc_router",
            CollectorKind::WebAccel => "webaccel",
            CollectorKind::Zone => "zone",
        }
    }
}

impl ExporterConfig {
    /// Whether the collector for `kind` should be created
    pub fn collector_enabled(&self, kind: CollectorKind) -> bool {
        let disabled = match kind {
            CollectorKind::AutoBackup => self.no_collector_auto_backup,
            CollectorKind::Bill => self.no_collector_bill,
            CollectorKind::Coupon => self.no_collector_coupon,
            CollectorKind::Database => self.no_collector_database,
            CollectorKind::Esme => self.no_collector_esme,
            CollectorKind::Internet => self.no_collector_internet,
            CollectorKind::LoadBalancer => self.no_collector_load_balancer,
            CollectorKind::MobileGateway => self.no_collector_mobile_gateway,
            CollectorKind::Nfs => self.no_collector_nfs,
            CollectorKind::ProxyLb => self.no_collector_proxylb,
            CollectorKind::Server => self.no_collector_server,
            CollectorKind::Sim => self.no_collector_sim,
            CollectorKind::VpcRouter => self.no_collector_vpc_router,
            CollectorKind::WebAccel => self.no_collector_webaccel,
            CollectorKind::Zone => self.no_collector_zone,
        };
        !disabled
    }

    /// Checks settings that clap can't
    ///
    /// # Returns
    /// * `Ok(())` - The exporter can start
    /// * `Err(ConfigError)` - The first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingRequiredSetting(
                "--token or SAKURACLOUD_ACCESS_TOKEN",
            ));
        }
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingRequiredSetting(
                "--secret or SAKURACLOUD_ACCESS_TOKEN_SECRET",
            ));
        }
        if self.zones.iter().all(|zone| zone.trim().is_empty()) {
            return Err(ConfigError::MissingRequiredSetting("--zones"));
        }
        if self.ratelimit == 0 {
            return Err(ConfigError::InvalidSetting {
                name: "--ratelimit",
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.webpath.starts_with('/') || self.webpath.len() < 2 {
            return Err(ConfigError::InvalidSetting {
                name: "--webpath",
                reason: format!("'{}' must start with '/' and name a path", self.webpath),
            });
        }
        if self.webpath == HEALTH_PATH {
            return Err(ConfigError::InvalidSetting {
                name: "--webpath",
                reason: format!("'{}' is reserved for the health check", HEALTH_PATH),
            });
        }
        Ok(())
    }

    /// Outbound calls allowed in flight during one scrape
    pub fn max_concurrency(&self) -> usize {
        if self.max_concurrency > 0 {
            self.max_concurrency
        } else {
            num_cpus::get() * 4
        }
    }

    /// Options for the API client
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            token: self.token.clone(),
            secret: self.secret.clone(),
            zones: self
                .zones
                .iter()
                .map(|zone| zone.trim().to_string())
                .filter(|zone| !zone.is_empty())
                .collect(),
            api_root_url: self.api_root_url.clone(),
            maintenance_feed_url: self.maintenance_feed_url.clone(),
            rate_limit: self.ratelimit,
            timeout: Duration::from_secs(self.api_timeout),
        }
    }

    /// Logs the effective configuration without secrets
    pub fn log_configuration(&self) {
        info!("Access token: {}", mask_secret(&self.token));
        info!("Access token secret: {}", mask_secret(&self.secret));
        info!("Zones: {}", self.zones.join(","));
        info!("Listening on {}{}", self.webaddr, self.webpath);
        info!(
            "Rate limit: {}/s, max concurrency: {}, API timeout: {}s",
            self.ratelimit,
            self.max_concurrency(),
            self.api_timeout
        );

        let disabled: Vec<&str> = CollectorKind::ALL
            .into_iter()
            .filter(|kind| !self.collector_enabled(*kind))
            .map(CollectorKind::name)
            .collect();
        if !disabled.is_empty() {
            info!("Disabled collectors: {}", disabled.join(","));
        }
    }
}

/// Masks a credential for logging
///
/// # Example
/// ```
/// assert_eq!(mask_secret("abcdefghijkl"), "abcd****");
/// assert_eq!(mask_secret("short"), "****");
/// ```
fn mask_secret(value: &str) -> String {
    if value.chars().count() > 8 {
        let head: String = value.chars().take(4).collect();
        format!("{}****", head)
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> ExporterConfig {
        let mut argv = vec!["sakuracloud-exporter", "--token", "token", "--secret", "secret"];
        argv.extend_from_slice(args);
        ExporterConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&[]);
        assert_eq!(config.zones, vec!["is1a", "is1b", "tk1a", "tk1b"]);
        assert_eq!(config.webaddr.port(), 9542);
        assert_eq!(config.webpath, "/metrics");
        assert!(config.max_concurrency() > 0);
        assert!(config.validate().is_ok());
        assert!(CollectorKind::ALL
            .into_iter()
            .all(|kind| config.collector_enabled(kind)));
    }

    #[test]
    fn test_disable_collectors() {
        let config = parse(&["--no-collector.server", "--no-collector.proxy-lb"]);
        assert!(!config.collector_enabled(CollectorKind::Server));
        assert!(!config.collector_enabled(CollectorKind::ProxyLb));
        assert!(config.collector_enabled(CollectorKind::Sim));
    }

    #[test]
    fn test_validation() {
        let mut config = parse(&["--zones", "tk1a", "--max-concurrency", "3"]);
        assert_eq!(config.client_options().zones, vec!["tk1a"]);
        assert_eq!(config.max_concurrency(), 3);

        config.webpath = "metrics".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSetting { name: "--webpath", .. })
        ));

        config.webpath = "/healthz".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSetting { name: "--webpath", .. })
        ));

        config.webpath = "/metrics".to_string();
        config.ratelimit = 0;
        assert!(config.validate().is_err());

        config.ratelimit = 5;
        config.secret = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequiredSetting(_))
        ));
    }

    #[test]
    fn test_collector_names_are_unique() {
        let mut names: Vec<&str> = CollectorKind::ALL.into_iter().map(CollectorKind::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CollectorKind::ALL.len());
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("abcdefghijkl"), "abcd****");
        assert_eq!(mask_secret("short"), "****");
    }
}
