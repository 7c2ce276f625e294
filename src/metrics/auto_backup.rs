// Auto-backup collector

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use prometheus::core::Desc;

use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::{flatten_string_slice, flatten_weekdays, unix_millis};
use crate::platform::auto_backup::{Archive, AutoBackup, AutoBackupClient};

const AUTO_BACKUP_LABELS: &[&str] = &["id", "name", "zone"];

pub struct AutoBackupCollector {
    client: Arc<dyn AutoBackupClient>,

    auto_backup_info: Arc<Desc>,
    backup_count: Arc<Desc>,
    last_backup_time: Arc<Desc>,
    archive_info: Arc<Desc>,
}

fn auto_backup_labels(auto_backup: &AutoBackup) -> Vec<String> {
    vec![
        auto_backup.item.id.clone(),
        auto_backup.item.name.clone(),
        auto_backup.item.zone.clone(),
    ]
}

impl AutoBackupCollector {
    pub fn new(
        errors: &ErrorCounter,
        client: Arc<dyn AutoBackupClient>,
    ) -> Result<Self, prometheus::Error> {
        errors.init_collector("auto_backup");

        Ok(AutoBackupCollector {
            client,
            auto_backup_info: new_desc(
                "auto_backup_info",
                "A metric with a constant '1' value labeled by auto-backup information",
                &with_labels(
                    AUTO_BACKUP_LABELS,
                    &["disk_id", "max_backup_num", "weekdays", "tags", "description"],
                ),
            )?,
            backup_count: new_desc(
                "auto_backup_count",
                "A count of archives created by AutoBackup",
                AUTO_BACKUP_LABELS,
            )?,
            last_backup_time: new_desc(
                "auto_backup_last_time",
                "Last backup time(unit: unixtime-millisecond)",
                AUTO_BACKUP_LABELS,
            )?,
            archive_info: new_desc(
                "auto_backup_archive_info",
                "A metric with a constant '1' value labeled by backuped archive information",
                &with_labels(
                    AUTO_BACKUP_LABELS,
                    &["archive_id", "archive_name", "archive_tags", "archive_description"],
                ),
            )?,
        })
    }

    async fn collect_auto_backup(&self, ctx: &CollectContext, auto_backup: &AutoBackup) {
        let labels = auto_backup_labels(auto_backup);

        let mut info_labels = labels.clone();
        info_labels.extend([
            auto_backup.status.disk_id.clone(),
            auto_backup.max_archives().to_string(),
            flatten_weekdays(auto_backup.weekdays()),
            flatten_string_slice(&auto_backup.item.tags),
            auto_backup.item.description.clone(),
        ]);
        ctx.emit(&self.auto_backup_info, 1.0, info_labels);

        let archives = ctx
            .fetch(
                format!("can't list backed up archives: ID={}", auto_backup.item.id),
                self.client
                    .list_backups(&auto_backup.item.zone, &auto_backup.item.id),
            )
            .await;
        let Some(archives) = archives else {
            return;
        };

        ctx.emit(&self.backup_count, archives.len() as f64, labels.clone());

        if let Some(last) = archives.iter().filter_map(|archive| archive.created_at).max() {
            ctx.emit(&self.last_backup_time, unix_millis(&last), labels.clone());
        }

        for archive in &archives {
            self.emit_archive_info(ctx, &labels, archive);
        }
    }

    fn emit_archive_info(&self, ctx: &CollectContext, labels: &[String], archive: &Archive) {
        let mut archive_labels = labels.to_vec();
        archive_labels.extend([
            archive.id.clone(),
            archive.name.clone(),
            flatten_string_slice(&archive.tags),
            archive.description.clone(),
        ]);
        ctx.emit(&self.archive_info, 1.0, archive_labels);
    }
}

#[async_trait]
impl Collector for AutoBackupCollector {
    fn name(&self) -> &'static str {
        "auto_backup"
    }

    fn describe(&self) -> Vec<&Desc> {
        vec![
            &self.auto_backup_info,
            &self.backup_count,
            &self.last_backup_time,
            &self.archive_info,
        ]
    }

    async fn collect(&self, ctx: &CollectContext) {
        let all = ctx
            .fetch("can't list autoBackups", self.client.find())
            .await
            .unwrap_or_default();

        join_all(
            all.iter()
                .map(|auto_backup| self.collect_auto_backup(ctx, auto_backup)),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{api_error, samples_named, single, TestFixture};
    use crate::platform::auto_backup::{AutoBackupSetting, AutoBackupSettings, AutoBackupStatus};
    use crate::platform::common::ServiceItem;
    use crate::platform::ClientResult;
    use chrono::{TimeZone, Utc};

    #[derive(Default)]
    struct FakeAutoBackupClient {
        find_fails: bool,
        all: Vec<AutoBackup>,
        archives: Vec<Archive>,
        list_fails: bool,
    }

    #[async_trait]
    impl AutoBackupClient for FakeAutoBackupClient {
        async fn find(&self) -> ClientResult<Vec<AutoBackup>> {
            if self.find_fails {
                return Err(api_error());
            }
            Ok(self.all.clone())
        }

        async fn list_backups(&self, zone: &str, _auto_backup_id: &str) -> ClientResult<Vec<Archive>> {
            assert_eq!(zone, "tk1a");
            if self.list_fails {
                return Err(api_error());
            }
            Ok(self.archives.clone())
        }
    }

    fn auto_backup() -> AutoBackup {
        AutoBackup {
            item: ServiceItem {
                id: "112800000001".to_string(),
                name: "backup".to_string(),
                zone: "tk1a".to_string(),
                ..Default::default()
            },
            settings: AutoBackupSettings {
                autobackup: AutoBackupSetting {
                    backup_span_weekdays: vec!["wed".to_string(), "sun".to_string()],
                    maximum_number_of_archives: 3.0,
                },
            },
            status: AutoBackupStatus {
                disk_id: "112700000001".to_string(),
            },
        }
    }

    fn archive(id: &str, day: u32) -> Archive {
        Archive {
            id: id.to_string(),
            name: format!("archive-{}", id),
            tags: vec!["autobackup-112800000001".to_string()],
            created_at: Some(Utc.with_ymd_and_hms(2020, 1, day, 0, 0, 0).unwrap()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_backups() {
        let fixture = TestFixture::new();
        let client = FakeAutoBackupClient {
            all: vec![auto_backup()],
            archives: vec![archive("1", 1), archive("2", 2)],
            ..Default::default()
        };
        let collector = AutoBackupCollector::new(&fixture.errors, Arc::new(client)).unwrap();

        let samples = fixture.collect(&collector).await;

        let info = single(&samples, "sakuracloud_auto_backup_info");
        assert_eq!(info.label("weekdays"), Some(",sun,wed,"));
        assert_eq!(info.label("max_backup_num"), Some("3"));
        assert_eq!(info.label("disk_id"), Some("112700000001"));

        assert_eq!(single(&samples, "sakuracloud_auto_backup_count").value(), 2.0);
        assert_eq!(
            single(&samples, "sakuracloud_auto_backup_last_time").value(),
            1577923200000.0
        );
        let archives = samples_named(&samples, "sakuracloud_auto_backup_archive_info");
        assert_eq!(archives.len(), 2);
        assert_eq!(archives[0].label("archive_tags"), Some(",autobackup-112800000001,"));
    }

    #[tokio::test]
    async fn test_no_archives() {
        let fixture = TestFixture::new();
        let client = FakeAutoBackupClient {
            all: vec![auto_backup()],
            ..Default::default()
        };
        let collector = AutoBackupCollector::new(&fixture.errors, Arc::new(client)).unwrap();

        let samples = fixture.collect(&collector).await;

        assert_eq!(single(&samples, "sakuracloud_auto_backup_count").value(), 0.0);
        assert!(samples_named(&samples, "sakuracloud_auto_backup_last_time").is_empty());
    }

    #[tokio::test]
    async fn test_list_failure() {
        let fixture = TestFixture::new();
        let client = FakeAutoBackupClient {
            all: vec![auto_backup()],
            list_fails: true,
            ..Default::default()
        };
        let collector = AutoBackupCollector::new(&fixture.errors, Arc::new(client)).unwrap();

        let samples = fixture.collect(&collector).await;

        assert_eq!(samples.len(), 1);
        assert_eq!(fixture.errors.get("auto_backup"), 1);
        assert!(fixture.logs().contains("can't list backed up archives: ID=112800000001"));
    }

    #[tokio::test]
    async fn test_find_failure() {
        let fixture = TestFixture::new();
        let client = FakeAutoBackupClient {
            find_fails: true,
            ..Default::default()
        };
        let collector = AutoBackupCollector::new(&fixture.errors, Arc::new(client)).unwrap();

        let samples = fixture.collect(&collector).await;

        assert!(samples.is_empty());
        assert_eq!(fixture.errors.get("auto_backup"), 1);
        assert_eq!(fixture.warning_count(), 1);
        assert!(fixture.logs().contains("can't list autoBackups"));
    }

    #[tokio::test]
    async fn test_no_auto_backups() {
        let fixture = TestFixture::new();
        let collector = AutoBackupCollector::new(&fixture.errors, Arc::new(FakeAutoBackupClient::default())).unwrap();

        let samples = fixture.collect(&collector).await;

        assert!(samples.is_empty());
        assert_eq!(fixture.errors.get("auto_backup"), 0);
        assert_eq!(fixture.warning_count(), 0);
    }
}
