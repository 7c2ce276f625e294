// Shared API model fragments
//
// Servers and appliances return the same nested shapes for instance
// status, NICs and switch subnets; they are modelled once here.

use serde::{Deserialize, Deserializer};

/// Accepts an ID encoded either as a JSON string or a JSON number
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(u64),
        Null(()),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
        RawId::Null(()) => String::new(),
    })
}

/// Accepts a boolean encoded as JSON bool or as the "True"/"False" strings
/// some appliance settings use
pub fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Text(String),
        Null(()),
    }

    Ok(match RawFlag::deserialize(deserializer)? {
        RawFlag::Bool(flag) => flag,
        RawFlag::Text(text) => text.eq_ignore_ascii_case("true"),
        RawFlag::Null(()) => false,
    })
}

/// Accepts a number that may arrive as a JSON string
pub fn deserialize_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawNumber {
        Number(f64),
        Text(String),
        Null(()),
    }

    match RawNumber::deserialize(deserializer)? {
        RawNumber::Number(number) => Ok(number),
        RawNumber::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
        RawNumber::Null(()) => Ok(0.0),
    }
}

/// Treats an explicit JSON null like a missing field
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reference to another resource by ID only
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IdRef {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
}

/// Fields every common service item (SIM, ProxyLB, ESME, auto-backup) carries
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ServiceItem {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub availability: String,
    #[serde(skip)]
    pub zone: String,
}

impl ServiceItem {
    pub fn is_available(&self) -> bool {
        self.availability == "available"
    }
}

/// Running state of a server or appliance
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Instance {
    /// "up", "cleaning", "down", ...
    #[serde(deserialize_with = "nullable")]
    pub status: String,
    pub host: Option<HostInfo>,
}

impl Instance {
    pub fn is_up(&self) -> bool {
        self.status == "up"
    }

    pub fn host_name(&self) -> String {
        self.host
            .as_ref()
            .map(|host| host.name.clone())
            .unwrap_or_default()
    }

    /// Maintenance info URL published for the physical host, if any
    pub fn maintenance_info_url(&self) -> &str {
        self.host
            .as_ref()
            .map(|host| host.info_url.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HostInfo {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(rename = "InfoURL", deserialize_with = "nullable")]
    pub info_url: String,
}

/// IPv4 subnet as attached to a switch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Subnet {
    #[serde(deserialize_with = "nullable")]
    pub network_address: String,
    #[serde(deserialize_with = "nullable")]
    pub network_mask_len: u32,
    #[serde(deserialize_with = "nullable")]
    pub default_route: String,
}

/// Switch a NIC is connected to
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SwitchRef {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    /// "shared" for the shared segment, "user" for customer switches
    #[serde(deserialize_with = "nullable")]
    pub scope: String,
    pub subnet: Option<Subnet>,
    pub user_subnet: Option<Subnet>,
}

/// Network interface of a server or appliance
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Interface {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(rename = "MACAddress", deserialize_with = "nullable")]
    pub mac_address: String,
    #[serde(rename = "IPAddress", deserialize_with = "nullable")]
    pub ip_address: String,
    #[serde(rename = "UserIPAddress", deserialize_with = "nullable")]
    pub user_ip_address: String,
    pub switch: Option<SwitchRef>,
}

impl Interface {
    /// "shared", "switch" or "none"
    pub fn upstream_type(&self) -> &'static str {
        match &self.switch {
            Some(switch) if switch.scope == "shared" => "shared",
            Some(_) => "switch",
            None => "none",
        }
    }

    pub fn upstream_id(&self) -> String {
        self.switch
            .as_ref()
            .map(|switch| switch.id.clone())
            .unwrap_or_default()
    }

    pub fn upstream_name(&self) -> String {
        self.switch
            .as_ref()
            .map(|switch| switch.name.clone())
            .unwrap_or_default()
    }

    /// Address assigned by the platform on the shared segment, or the
    /// user-assigned one on a switch
    pub fn effective_ip_address(&self) -> String {
        if self.upstream_type() == "shared" {
            self.ip_address.clone()
        } else {
            self.user_ip_address.clone()
        }
    }

    fn subnet(&self) -> Option<&Subnet> {
        let switch = self.switch.as_ref()?;
        if switch.scope == "shared" {
            switch.subnet.as_ref()
        } else {
            switch.user_subnet.as_ref().or(switch.subnet.as_ref())
        }
    }

    pub fn network_mask_len(&self) -> String {
        self.subnet()
            .map(|subnet| subnet.network_mask_len.to_string())
            .unwrap_or_default()
    }

    pub fn default_route(&self) -> String {
        self.subnet()
            .map(|subnet| subnet.default_route.clone())
            .unwrap_or_default()
    }
}

/// Network section of an appliance remark
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RemarkNetwork {
    #[serde(deserialize_with = "nullable")]
    pub network_mask_len: u32,
    #[serde(deserialize_with = "nullable")]
    pub default_route: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemarkServer {
    #[serde(rename = "IPAddress", deserialize_with = "nullable")]
    pub ip_address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemarkVrrp {
    #[serde(rename = "VRID", deserialize_with = "nullable")]
    pub vrid: u32,
}

/// Engine details of a database appliance
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RemarkDatabase {
    #[serde(deserialize_with = "nullable")]
    pub database_name: String,
    #[serde(deserialize_with = "nullable")]
    pub database_version: String,
    #[serde(deserialize_with = "nullable")]
    pub database_revision: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RemarkDbConf {
    #[serde(deserialize_with = "nullable")]
    pub common: RemarkDatabase,
}

/// Read-only remark block common to appliances
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Remark {
    #[serde(deserialize_with = "nullable")]
    pub network: RemarkNetwork,
    #[serde(deserialize_with = "nullable")]
    pub servers: Vec<RemarkServer>,
    #[serde(rename = "VRRP", deserialize_with = "nullable")]
    pub vrrp: RemarkVrrp,
    /// Only present on database appliances
    #[serde(rename = "DBConf", deserialize_with = "nullable")]
    pub db_conf: RemarkDbConf,
}

impl Remark {
    pub fn server_ip(&self, index: usize) -> String {
        self.servers
            .get(index)
            .map(|server| server.ip_address.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "deserialize_id")]
        id: String,
        #[serde(deserialize_with = "deserialize_flag")]
        flag: bool,
        #[serde(deserialize_with = "deserialize_number")]
        number: f64,
    }

    #[test]
    fn test_loose_scalars() {
        let probe: Probe =
            serde_json::from_str(r#"{"id": 113200000001, "flag": "True", "number": "12.5"}"#)
                .unwrap();
        assert_eq!(probe.id, "113200000001");
        assert!(probe.flag);
        assert_eq!(probe.number, 12.5);

        let probe: Probe =
            serde_json::from_str(r#"{"id": "abc", "flag": false, "number": 3}"#).unwrap();
        assert_eq!(probe.id, "abc");
        assert!(!probe.flag);
        assert_eq!(probe.number, 3.0);
    }

    #[test]
    fn test_interface_upstream() {
        let shared: Interface = serde_json::from_str(
            r#"{"ID": "1", "IPAddress": "192.0.2.11", "UserIPAddress": null,
                "Switch": {"ID": "2", "Name": "shared", "Scope": "shared",
                           "Subnet": {"NetworkMaskLen": 24, "DefaultRoute": "192.0.2.1"}}}"#,
        )
        .unwrap();
        assert_eq!(shared.upstream_type(), "shared");
        assert_eq!(shared.effective_ip_address(), "192.0.2.11");
        assert_eq!(shared.network_mask_len(), "24");
        assert_eq!(shared.default_route(), "192.0.2.1");

        let disconnected = Interface::default();
        assert_eq!(disconnected.upstream_type(), "none");
        assert_eq!(disconnected.network_mask_len(), "");
    }
}
