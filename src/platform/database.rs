// Database appliances

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::api::SakuraCloudClient;
use super::appliance::{appliance_zone_scoped, Appliance};
use super::common::{deserialize_flag, nullable};
use super::monitor::{CpuTimeValue, DatabaseValue, DiskValue, InterfaceValue};
use super::{ClientResult, MaintenanceClient};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Database {
    #[serde(flatten)]
    pub appliance: Appliance,
    #[serde(rename = "Settings", deserialize_with = "nullable")]
    pub settings: DatabaseSettings,
}

appliance_zone_scoped!(Database);

impl Database {
    pub fn common(&self) -> &DatabaseCommonSetting {
        &self.settings.db_conf.common
    }

    /// "master" or "slave" for replicated databases, empty otherwise
    pub fn replication_role(&self) -> &'static str {
        match self
            .settings
            .db_conf
            .replication
            .as_ref()
            .map(|replication| replication.model.as_str())
        {
            Some("Master-Slave") => "master",
            Some("Async-Replica") => "slave",
            _ => "",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DatabaseSettings {
    #[serde(rename = "DBConf", deserialize_with = "nullable")]
    pub db_conf: DatabaseConf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DatabaseConf {
    #[serde(deserialize_with = "nullable")]
    pub common: DatabaseCommonSetting,
    pub replication: Option<DatabaseReplicationSetting>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DatabaseCommonSetting {
    #[serde(rename = "WebUI", deserialize_with = "deserialize_flag")]
    pub web_ui: bool,
    #[serde(deserialize_with = "nullable")]
    pub default_user: String,
    #[serde(deserialize_with = "nullable")]
    pub service_port: u16,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DatabaseReplicationSetting {
    /// "Master-Slave" or "Async-Replica"
    #[serde(deserialize_with = "nullable")]
    pub model: String,
}

#[async_trait]
pub trait DatabaseClient: MaintenanceClient {
    async fn find(&self) -> ClientResult<Vec<Database>>;

    async fn monitor_cpu(
        &self,
        zone: &str,
        database_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<CpuTimeValue>>;

    async fn monitor_disk(
        &self,
        zone: &str,
        database_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<DiskValue>>;

    async fn monitor_nic(
        &self,
        zone: &str,
        database_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>>;

    async fn monitor_database(
        &self,
        zone: &str,
        database_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<DatabaseValue>>;
}

#[async_trait]
impl DatabaseClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<Database>> {
        self.find_appliances("database").await
    }

    async fn monitor_cpu(
        &self,
        zone: &str,
        database_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<CpuTimeValue>> {
        self.monitor_appliance_cpu(zone, database_id, end).await
    }

    async fn monitor_disk(
        &self,
        zone: &str,
        database_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<DiskValue>> {
        let response = self
            .monitor(zone, &format!("appliance/{}/disk/0/monitor", database_id), end)
            .await?;
        Ok(DiskValue::from_response(&response))
    }

    async fn monitor_nic(
        &self,
        zone: &str,
        database_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<InterfaceValue>> {
        self.monitor_appliance_nic(zone, database_id, 0, end).await
    }

    async fn monitor_database(
        &self,
        zone: &str,
        database_id: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<Option<DatabaseValue>> {
        let response = self
            .monitor(zone, &format!("appliance/{}/database/monitor", database_id), end)
            .await?;
        Ok(DatabaseValue::from_response(&response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_database() {
        let database: Database = serde_json::from_str(
            r#"{"ID": "113200000001", "Class": "database", "Name": "db",
                "Availability": "available", "Plan": {"ID": 10},
                "Instance": {"Status": "up"},
                "Remark": {"DBConf": {"Common": {"DatabaseName": "MariaDB",
                           "DatabaseVersion": "10.4", "DatabaseRevision": "10.4.12"}}},
                "Settings": {"DBConf": {
                    "Common": {"WebUI": "True", "DefaultUser": "user", "ServicePort": 3306},
                    "Replication": {"Model": "Master-Slave"}}}}"#,
        )
        .unwrap();

        assert_eq!(database.appliance.id, "113200000001");
        assert_eq!(database.appliance.plan.id, "10");
        assert!(database.appliance.is_up());
        assert!(database.common().web_ui);
        assert_eq!(database.common().service_port, 3306);
        assert_eq!(database.replication_role(), "master");
        assert_eq!(database.appliance.remark.db_conf.common.database_name, "MariaDB");
    }

    #[test]
    fn test_database_without_replication() {
        let database: Database =
            serde_json::from_str(r#"{"ID": "1", "Settings": null}"#).unwrap();
        assert_eq!(database.replication_role(), "");
        assert!(!database.appliance.is_up());
    }
}
