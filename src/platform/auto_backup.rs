// Auto-backups
//
// An auto-backup is a zone-scoped common service item that snapshots one
// disk on a weekly schedule. The archives it produced carry an
// `autobackup-{id}` tag and are listed through the archive API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::api::SakuraCloudClient;
use super::common::{deserialize_id, deserialize_number, nullable, ServiceItem};
use super::listing::ZoneScoped;
use super::ClientResult;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AutoBackup {
    #[serde(flatten)]
    pub item: ServiceItem,
    #[serde(rename = "Settings", deserialize_with = "nullable")]
    pub settings: AutoBackupSettings,
    #[serde(rename = "Status", deserialize_with = "nullable")]
    pub status: AutoBackupStatus,
}

impl ZoneScoped for AutoBackup {
    fn set_zone(&mut self, zone: &str) {
        self.item.zone = zone.to_string();
    }
}

impl AutoBackup {
    /// Weekday names (`sun`, `mon`, ...) the backup runs on
    pub fn weekdays(&self) -> &[String] {
        &self.settings.autobackup.backup_span_weekdays
    }

    pub fn max_archives(&self) -> f64 {
        self.settings.autobackup.maximum_number_of_archives
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AutoBackupSettings {
    #[serde(rename = "Autobackup", deserialize_with = "nullable")]
    pub autobackup: AutoBackupSetting,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AutoBackupSetting {
    #[serde(deserialize_with = "nullable")]
    pub backup_span_weekdays: Vec<String>,
    #[serde(deserialize_with = "deserialize_number")]
    pub maximum_number_of_archives: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AutoBackupStatus {
    #[serde(rename = "DiskId", deserialize_with = "deserialize_id")]
    pub disk_id: String,
}

/// Archive produced by an auto-backup
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Archive {
    #[serde(rename = "ID", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub tags: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct ArchiveList {
    #[serde(rename = "Archives", default)]
    archives: Option<Vec<Archive>>,
}

/// Query selecting the archives tagged by one auto-backup
fn backup_archive_query(auto_backup_id: &str) -> serde_json::Value {
    json!({ "Filter": { "Tags.Name": [format!("autobackup-{}", auto_backup_id)] } })
}

#[async_trait]
pub trait AutoBackupClient: Send + Sync {
    async fn find(&self) -> ClientResult<Vec<AutoBackup>>;

    async fn list_backups(&self, zone: &str, auto_backup_id: &str) -> ClientResult<Vec<Archive>>;
}

#[async_trait]
impl AutoBackupClient for SakuraCloudClient {
    async fn find(&self) -> ClientResult<Vec<AutoBackup>> {
        self.find_zoned_items("autobackup").await
    }

    async fn list_backups(&self, zone: &str, auto_backup_id: &str) -> ClientResult<Vec<Archive>> {
        let list: ArchiveList = self
            .get_json(
                &self.cloud_url(zone, "archive"),
                Some(&backup_archive_query(auto_backup_id)),
            )
            .await?;
        Ok(list.archives.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decode_auto_backup() {
        let auto_backup: AutoBackup = serde_json::from_str(
            r#"{
                "ID": "112800000001", "Name": "backup", "Availability": "available",
                "Settings": {"Autobackup": {
                    "BackupSpanWeekdays": ["mon", "sun"], "MaximumNumberOfArchives": 3
                }},
                "Status": {"DiskId": 112700000001}
            }"#,
        )
        .unwrap();

        assert_eq!(auto_backup.item.id, "112800000001");
        assert_eq!(auto_backup.weekdays(), ["mon", "sun"]);
        assert_eq!(auto_backup.max_archives(), 3.0);
        assert_eq!(auto_backup.status.disk_id, "112700000001");
    }

    #[test]
    fn test_decode_archives() {
        let list: ArchiveList = serde_json::from_str(
            r#"{"Archives": [{"ID": "1", "Name": "a", "Tags": ["autobackup-1"],
                              "CreatedAt": "2020-01-01T09:00:00+09:00"}]}"#,
        )
        .unwrap();

        let archives = list.archives.unwrap();
        assert_eq!(
            archives[0].created_at,
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            backup_archive_query("1")["Filter"]["Tags.Name"][0],
            "autobackup-1"
        );
    }
}
