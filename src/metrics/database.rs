// Database collector

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use prometheus::core::Desc;

use super::appliance::{appliance_labels, NicAddress, NicDescs, APPLIANCE_LABELS};
use super::maintenance::MaintenanceDescs;
use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::{
    bool_label, bool_to_f64, bytes_to_kbytes, database_plan_label, flatten_string_slice,
    kib_to_gb, seconds_to_millis,
};
use crate::platform::database::{Database, DatabaseClient};

pub struct DatabaseCollector {
    client: Arc<dyn DatabaseClient>,

    up: Arc<Desc>,
    database_info: Arc<Desc>,
    cpu_time: Arc<Desc>,
    memory_size: Arc<Desc>,
    memory_used: Arc<Desc>,
    disk_system_size: Arc<Desc>,
    disk_system_used: Arc<Desc>,
    disk_backup_size: Arc<Desc>,
    disk_backup_used: Arc<Desc>,
    binlog_used: Arc<Desc>,
    replication_delay: Arc<Desc>,
    disk_read: Arc<Desc>,
    disk_write: Arc<Desc>,
    nics: NicDescs,
    maintenance: MaintenanceDescs,
}

impl DatabaseCollector {
    pub fn new(
        errors: &ErrorCounter,
        client: Arc<dyn DatabaseClient>,
    ) -> Result<Self, prometheus::Error> {
        errors.init_collector("database");

        let gb = |name: &str, help: &str| new_desc(name, help, APPLIANCE_LABELS);

        Ok(DatabaseCollector {
            client,
            up: new_desc(
                "database_up",
                "If 1 the database is up and running, 0 otherwise",
                APPLIANCE_LABELS,
            )?,
            database_info: new_desc(
                "database_info",
                "A metric with a constant '1' value labeled by database information",
                &with_labels(
                    APPLIANCE_LABELS,
                    &[
                        "plan",
                        "host",
                        "database_type",
                        "database_revision",
                        "database_version",
                        "web_ui",
                        "replication_enabled",
                        "replication_role",
                        "tags",
                        "description",
                    ],
                ),
            )?,
            cpu_time: new_desc(
                "database_cpu_time",
                "Database's CPU time(unit: ms)",
                APPLIANCE_LABELS,
            )?,
            memory_size: gb("database_memory_size", "Database's memory size(unit: GB)")?,
            memory_used: gb("database_memory_used", "Database's used memory size(unit: GB)")?,
            disk_system_size: gb(
                "database_disk_system_size",
                "Database's system disk size(unit: GB)",
            )?,
            disk_system_used: gb(
                "database_disk_system_used",
                "Database's used system disk size(unit: GB)",
            )?,
            disk_backup_size: gb(
                "database_disk_backup_size",
                "Database's backup disk size(unit: GB)",
            )?,
            disk_backup_used: gb(
                "database_disk_backup_used",
                "Database's used backup disk size(unit: GB)",
            )?,
            binlog_used: gb(
                "database_binlog_used",
                "Database's used binlog size(unit: GB)",
            )?,
            replication_delay: new_desc(
                "database_replication_delay",
                "Replication delay time(unit: second)",
                APPLIANCE_LABELS,
            )?,
            disk_read: new_desc(
                "database_disk_read",
                "Disk's read bytes(unit: KBps)",
                APPLIANCE_LABELS,
            )?,
            disk_write: new_desc(
                "database_disk_write",
                "Disk's write bytes(unit: KBps)",
                APPLIANCE_LABELS,
            )?,
            nics: NicDescs::new("database", "nic_")?,
            maintenance: MaintenanceDescs::new("database", "database", APPLIANCE_LABELS)?,
        })
    }

    async fn collect_database(&self, ctx: &CollectContext, database: &Database) {
        let appliance = &database.appliance;
        let labels = appliance_labels(appliance);
        let is_up = appliance.is_up();

        ctx.emit(&self.up, bool_to_f64(is_up), labels.clone());

        let engine = &appliance.remark.db_conf.common;
        let role = database.replication_role();
        let mut info_labels = labels.clone();
        info_labels.extend([
            database_plan_label(&appliance.plan.id),
            appliance.instance.host_name(),
            engine.database_name.clone(),
            engine.database_revision.clone(),
            engine.database_version.clone(),
            bool_label(database.common().web_ui),
            bool_label(!role.is_empty()),
            role.to_string(),
            flatten_string_slice(&appliance.tags),
            appliance.description.clone(),
        ]);
        ctx.emit(&self.database_info, 1.0, info_labels);

        if let Some(nic) = appliance.interfaces.first() {
            self.nics
                .emit_info(ctx, appliance, 0, nic, NicAddress::from_remark(appliance, 0));
        }

        let maintenance = self.maintenance.collect(
            ctx,
            self.client.as_ref(),
            &labels,
            &appliance.id,
            appliance.instance.maintenance_info_url(),
        );

        if is_up {
            futures_util::join!(
                maintenance,
                self.collect_cpu_time(ctx, database),
                self.collect_disk(ctx, database),
                self.collect_nic(ctx, database),
                self.collect_database_value(ctx, database),
            );
        } else {
            maintenance.await;
        }
    }

    async fn collect_cpu_time(&self, ctx: &CollectContext, database: &Database) {
        let appliance = &database.appliance;
        let value = ctx
            .fetch_optional(
                format!("can't get database's cpu time: ID={}", appliance.id),
                self.client.monitor_cpu(&appliance.zone, &appliance.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            ctx.emit_at(
                &self.cpu_time,
                seconds_to_millis(value.cpu_time),
                appliance_labels(appliance),
                value.time,
            );
        }
    }

    async fn collect_disk(&self, ctx: &CollectContext, database: &Database) {
        let appliance = &database.appliance;
        let value = ctx
            .fetch_optional(
                format!("can't get disk's read/write bytes: ID={}", appliance.id),
                self.client.monitor_disk(&appliance.zone, &appliance.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            let labels = appliance_labels(appliance);
            ctx.emit_at(&self.disk_read, bytes_to_kbytes(value.read), labels.clone(), value.time);
            ctx.emit_at(&self.disk_write, bytes_to_kbytes(value.write), labels, value.time);
        }
    }

    async fn collect_nic(&self, ctx: &CollectContext, database: &Database) {
        let appliance = &database.appliance;
        let value = ctx
            .fetch_optional(
                format!("can't get database's receive/send bytes: ID={}", appliance.id),
                self.client.monitor_nic(&appliance.zone, &appliance.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            self.nics.emit_traffic(ctx, appliance, 0, &value);
        }
    }

    async fn collect_database_value(&self, ctx: &CollectContext, database: &Database) {
        let appliance = &database.appliance;
        let value = ctx
            .fetch_optional(
                format!("can't get database's system info: ID={}", appliance.id),
                self.client.monitor_database(&appliance.zone, &appliance.id, ctx.now()),
            )
            .await;

        let Some(value) = value else {
            return;
        };

        let labels = appliance_labels(appliance);
        let sizes = [
            (&self.memory_size, value.total_memory_size),
            (&self.memory_used, value.used_memory_size),
            (&self.disk_system_size, value.total_disk1_size),
            (&self.disk_system_used, value.used_disk1_size),
            (&self.disk_backup_size, value.total_disk2_size),
            (&self.disk_backup_used, value.used_disk2_size),
        ];
        for (desc, kib) in sizes {
            ctx.emit_at(desc, kib_to_gb(kib), labels.clone(), value.time);
        }

        if let Some(binlog) = value.binlog_used_size_kib {
            ctx.emit_at(&self.binlog_used, kib_to_gb(binlog), labels.clone(), value.time);
        }
        if let Some(delay) = value.delay_time_sec {
            ctx.emit_at(&self.replication_delay, delay, labels, value.time);
        }
    }
}

#[async_trait]
impl Collector for DatabaseCollector {
    fn name(&self) -> &'static str {
        "database"
    }

    fn describe(&self) -> Vec<&Desc> {
        let mut descs: Vec<&Desc> = vec![
            &self.up,
            &self.database_info,
            &self.cpu_time,
            &self.memory_size,
            &self.memory_used,
            &self.disk_system_size,
            &self.disk_system_used,
            &self.disk_backup_size,
            &self.disk_backup_used,
            &self.binlog_used,
            &self.replication_delay,
            &self.disk_read,
            &self.disk_write,
        ];
        descs.extend(self.nics.descs());
        descs.extend(self.maintenance.descs());
        descs
    }

    async fn collect(&self, ctx: &CollectContext) {
        let databases = ctx
            .fetch("can't list databases", self.client.find())
            .await
            .unwrap_or_default();

        join_all(
            databases
                .iter()
                .map(|database| self.collect_database(ctx, database)),
        )
        .await;
    }
}
