// Appliances
//
// Databases, load balancers, VPC routers, mobile gateways and NFS all share
// the appliance envelope below; each kind adds its own `Settings` block.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::api::SakuraCloudClient;
use super::common::{deserialize_id, nullable, IdRef, Instance, Interface, Remark};
use super::listing::{appliance_query, ApplianceList, ZoneScoped};
use super::monitor::{CpuTimeValue, InterfaceValue};
use super::ClientResult;

/// Fields every appliance carries
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Appliance {
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
    #[serde(deserialize_with = "nullable")]
    pub plan: IdRef,
    #[serde(deserialize_with = "nullable")]
    pub instance: Instance,
    #[serde(deserialize_with = "nullable")]
    pub interfaces: Vec<Interface>,
    #[serde(deserialize_with = "nullable")]
    pub remark: Remark,
    #[serde(skip)]
    pub zone: String,
}

impl Appliance {
    pub fn is_available(&self) -> bool {
        self.availability == "available"
    }

    /// Available and running, i.e. worth asking for activity
    pub fn is_up(&self) -> bool {
        self.is_available() && self.instance.is_up()
    }
}

/// Implements `ZoneScoped` for a kind wrapping `Appliance` in its `appliance` field
macro_rules! appliance_zone_scoped {
    ($kind:ty) => {
        impl $crate::platform::listing::ZoneScoped for $kind {
            fn set_zone(&mut self, zone: &str) {
                self.appliance.zone = zone.to_string();
            }
        }
    };
}
pub(crate) use appliance_zone_scoped;

impl SakuraCloudClient {
    /// Lists the appliances of one class in every configured zone
    pub(crate) async fn find_appliances<T>(&self, class: &str) -> ClientResult<Vec<T>>
    where
        T: ZoneScoped + serde::de::DeserializeOwned,
    {
        self.find_in_zones::<ApplianceList<T>>("appliance", Some(&appliance_query(class)))
            .await
    }

    pub(crate) async fn monitor_appliance_cpu(
        &self,
        zone: &str,
        appliance_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<CpuTimeValue>> {
        let response = self
            .monitor(zone, &format!("appliance/{}/cpu/monitor", appliance_id), end)
            .await?;
        Ok(CpuTimeValue::from_response(&response))
    }

    pub(crate) async fn monitor_appliance_nic(
        &self,
        zone: &str,
        appliance_id: &str,
        index: usize,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>> {
        let response = self
            .monitor(
                zone,
                &format!("appliance/{}/interface/{}/monitor", appliance_id, index),
                end,
            )
            .await?;
        Ok(InterfaceValue::from_response(&response))
    }

    /// Fetches `appliance/{id}/status` and unwraps the kind-specific body
    pub(crate) async fn appliance_status<T>(&self, zone: &str, appliance_id: &str) -> ClientResult<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.get_json(
            &self.cloud_url(zone, &format!("appliance/{}/status", appliance_id)),
            None,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_appliance() {
        let appliance: Appliance = serde_json::from_str(
            r#"{"ID": 113200000001, "Class": "nfs", "Name": "nfs", "Tags": null,
                "Availability": "available", "Plan": {"ID": 2},
                "Instance": {"Status": "up", "Host": {"Name": "host", "InfoURL": ""}},
                "Interfaces": [{"ID": "113200000002", "Switch": {"ID": "1", "Scope": "user"}}],
                "Remark": {"Network": {"NetworkMaskLen": 24, "DefaultRoute": "192.0.2.1"},
                           "Servers": [{"IPAddress": "192.0.2.11"}], "VRRP": null}}"#,
        )
        .unwrap();

        assert_eq!(appliance.id, "113200000001");
        assert!(appliance.tags.is_empty());
        assert!(appliance.is_up());
        assert_eq!(appliance.plan.id, "2");
        assert_eq!(appliance.remark.server_ip(0), "192.0.2.11");
        assert_eq!(appliance.remark.server_ip(1), "");
        assert_eq!(appliance.remark.vrrp.vrid, 0);
        assert_eq!(appliance.interfaces[0].upstream_type(), "switch");
    }
}
