// ProxyLB (enhanced load balancer)
//
// ProxyLBs are global common service items. The certificate bundle lives
// behind its own endpoint and is only fetched for running instances.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use super::api::{SakuraCloudClient, GLOBAL_ZONE};
use super::common::{deserialize_flag, deserialize_number, nullable, ServiceItem};
use super::listing::ZoneScoped;
use super::monitor::ConnectionValue;
use super::ClientResult;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyLb {
    #[serde(flatten)]
    pub item: ServiceItem,
    /// `cloud/proxylb/plain/{cps}`
    #[serde(rename = "ServiceClass", deserialize_with = "nullable")]
    pub service_class: String,
    #[serde(rename = "Settings", deserialize_with = "nullable")]
    pub settings: ProxyLbSettings,
    #[serde(rename = "Status", deserialize_with = "nullable")]
    pub status: ProxyLbStatus,
}

impl ZoneScoped for ProxyLb {
    fn set_zone(&mut self, zone: &str) {
        self.item.zone = zone.to_string();
    }
}

impl ProxyLb {
    pub fn bind_ports(&self) -> &[BindPort] {
        &self.settings.proxy_lb.bind_ports
    }

    pub fn servers(&self) -> &[ProxyLbServer] {
        &self.settings.proxy_lb.servers
    }

    pub fn sticky_session(&self) -> bool {
        self.settings.proxy_lb.sticky_session.enabled
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyLbSettings {
    #[serde(rename = "ProxyLB", deserialize_with = "nullable")]
    pub proxy_lb: ProxyLbSetting,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProxyLbSetting {
    #[serde(deserialize_with = "nullable")]
    pub bind_ports: Vec<BindPort>,
    #[serde(deserialize_with = "nullable")]
    pub servers: Vec<ProxyLbServer>,
    #[serde(deserialize_with = "nullable")]
    pub sticky_session: StickySession,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BindPort {
    /// "http", "https" or "tcp"
    #[serde(deserialize_with = "nullable")]
    pub proxy_mode: String,
    #[serde(deserialize_with = "deserialize_number")]
    pub port: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ProxyLbServer {
    #[serde(rename = "IPAddress", deserialize_with = "nullable")]
    pub ip_address: String,
    #[serde(deserialize_with = "deserialize_number")]
    pub port: f64,
    #[serde(deserialize_with = "deserialize_flag")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StickySession {
    #[serde(deserialize_with = "deserialize_flag")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProxyLbStatus {
    #[serde(rename = "FQDN", deserialize_with = "nullable")]
    pub fqdn: String,
    #[serde(rename = "VirtualIPAddress", deserialize_with = "nullable")]
    pub virtual_ip_address: String,
    /// Source networks the proxy connects to real servers from
    #[serde(rename = "ProxyNetworks", deserialize_with = "nullable")]
    pub proxy_networks: Vec<String>,
}

/// One certificate of a ProxyLB bundle
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Certificate {
    #[serde(deserialize_with = "nullable")]
    pub certificate_common_name: String,
    #[serde(deserialize_with = "nullable")]
    pub certificate_end_date: String,
}

impl Certificate {
    /// Expiry instant, if the API sent one in a recognised format
    ///
    /// Accepts RFC 3339 and the OpenSSL `notAfter` form
    /// (`Jan  2 15:04:05 2006 GMT`).
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let text = self.certificate_end_date.trim();
        if text.is_empty() {
            return None;
        }
        if let Ok(time) = DateTime::parse_from_rfc3339(text) {
            return Some(time.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(text, "%b %e %H:%M:%S %Y GMT")
            .ok()
            .map(|time| time.and_utc())
    }
}

/// Primary certificate followed by the SNI certificates
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CertificateBundle {
    pub primary_cert: Option<Certificate>,
    #[serde(deserialize_with = "nullable")]
    pub additional_certs: Vec<Certificate>,
}

impl CertificateBundle {
    pub fn all(&self) -> Vec<&Certificate> {
        self.primary_cert
            .iter()
            .chain(self.additional_certs.iter())
            .collect()
    }
}

#[derive(Deserialize)]
struct CertificateResponse {
    #[serde(rename = "ProxyLB", default)]
    proxy_lb: Option<CertificateBundle>,
}

#[async_trait]
pub trait ProxyLbClient: Send + Sync {
    async fn find(&self) -> ClientResult<Vec<ProxyLb>>;

    async fn certificate(&self, proxylb_id: &str) -> ClientResult<Option<CertificateBundle>>;

    async fn monitor_connection(
        &self,
        proxylb_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<ConnectionValue>>;
}

#[async_trait]
impl ProxyLbClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<ProxyLb>> {
        self.find_global_items("proxylb").await
    }

    async fn certificate(&self, proxylb_id: &str) -> ClientResult<Option<CertificateBundle>> {
        let url = self.cloud_url(
            GLOBAL_ZONE,
            &format!("commonserviceitem/{}/proxylb/sslcertificate", proxylb_id),
        );
        let response: CertificateResponse = self.get_json(&url, None).await?;
        Ok(response.proxy_lb)
    }

    async fn monitor_connection(
        &self,
        proxylb_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<ConnectionValue>> {
        let response = self
            .monitor(
                GLOBAL_ZONE,
                &format!("commonserviceitem/{}/activity/proxylb/monitor", proxylb_id),
                end,
            )
            .await?;
        Ok(ConnectionValue::from_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decode_proxylb() {
        let proxylb: ProxyLb = serde_json::from_str(
            r#"{
                "ID": "112900000001", "Name": "proxylb", "Availability": "available",
                "ServiceClass": "cloud/proxylb/plain/100",
                "Settings": {"ProxyLB": {
                    "BindPorts": [{"ProxyMode": "https", "Port": 443}],
                    "Servers": [{"IPAddress": "192.0.2.11", "Port": "80", "Enabled": true}],
                    "StickySession": {"Enabled": "True"}
                }},
                "Status": {"FQDN": "site-1.proxylb.example.jp", "VirtualIPAddress": "192.0.2.1",
                           "ProxyNetworks": ["192.0.2.0/28"]}
            }"#,
        )
        .unwrap();

        assert_eq!(proxylb.item.id, "112900000001");
        assert_eq!(proxylb.bind_ports()[0].port, 443.0);
        assert_eq!(proxylb.servers()[0].port, 80.0);
        assert!(proxylb.sticky_session());
        assert_eq!(proxylb.status.proxy_networks, vec!["192.0.2.0/28"]);
    }

    #[test]
    fn test_certificate_expiry_formats() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();

        let rfc3339 = Certificate {
            certificate_end_date: "2021-03-04T14:06:07+09:00".to_string(),
            ..Default::default()
        };
        assert_eq!(rfc3339.expires_at(), Some(expected));

        let openssl = Certificate {
            certificate_end_date: "Mar  4 05:06:07 2021 GMT".to_string(),
            ..Default::default()
        };
        assert_eq!(openssl.expires_at(), Some(expected));

        let garbage = Certificate {
            certificate_end_date: "someday".to_string(),
            ..Default::default()
        };
        assert_eq!(garbage.expires_at(), None);
    }

    #[test]
    fn test_bundle_order() {
        let response: CertificateResponse = serde_json::from_str(
            r#"{"ProxyLB": {
                "PrimaryCert": {"CertificateCommonName": "example.com"},
                "AdditionalCerts": [{"CertificateCommonName": "www.example.com"}]
            }}"#,
        )
        .unwrap();

        let bundle = response.proxy_lb.unwrap();
        let names: Vec<&str> = bundle
            .all()
            .iter()
            .map(|cert| cert.certificate_common_name.as_str())
            .collect();
        assert_eq!(names, vec!["example.com", "www.example.com"]);
    }
}
