// Server collector
//
// Exposes state, plan, disks and NICs of every server, plus CPU time and
// disk/NIC throughput for servers that are up.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use prometheus::core::Desc;

use super::maintenance::MaintenanceDescs;
use super::{new_desc, with_labels, CollectContext, Collector};
use crate::errors::ErrorCounter;
use crate::labels::{
    bool_to_f64, bytes_to_kbps, bytes_to_kbytes, disk_plan_label, flatten_string_slice, mb_to_gb,
    seconds_to_millis,
};
use crate::platform::common::Interface;
use crate::platform::server::{Server, ServerClient, ServerDisk};

const SERVER_LABELS: &[&str] = &["id", "name", "zone"];
const DISK_LABELS: &[&str] = &["id", "name", "zone", "disk_id", "disk_name", "index"];
const NIC_LABELS: &[&str] = &["id", "name", "zone", "interface_id", "index"];

/// Bandwidth of a NIC on the shared segment, in Mbps
const SHARED_SEGMENT_BANDWIDTH: f64 = 100.0;
/// Bandwidth of a NIC on a customer switch, in Mbps
const SWITCH_BANDWIDTH: f64 = 1000.0;

pub struct ServerCollector {
    client: Arc<dyn ServerClient>,

    up: Arc<Desc>,
    server_info: Arc<Desc>,
    cpus: Arc<Desc>,
    memories: Arc<Desc>,
    disk_info: Arc<Desc>,
    nic_info: Arc<Desc>,
    nic_bandwidth: Arc<Desc>,

    cpu_time: Arc<Desc>,
    disk_read: Arc<Desc>,
    disk_write: Arc<Desc>,
    nic_receive: Arc<Desc>,
    nic_send: Arc<Desc>,

    maintenance: MaintenanceDescs,
}

impl ServerCollector {
    pub fn new(
        errors: &ErrorCounter,
        client: Arc<dyn ServerClient>,
    ) -> Result<Self, prometheus::Error> {
        errors.init_collector("server");

        Ok(ServerCollector {
            client,
            up: new_desc(
                "server_up",
                "If 1 the server is up and running, 0 otherwise",
                SERVER_LABELS,
            )?,
            server_info: new_desc(
                "server_info",
                "A metric with a constant '1' value labeled by server information",
                &with_labels(
                    SERVER_LABELS,
                    &[
                        "cpus",
                        "disks",
                        "nics",
                        "memories",
                        "host",
                        "commitment",
                        "tags",
                        "description",
                    ],
                ),
            )?,
            cpus: new_desc("server_cpus", "Number of server's vCPU cores", SERVER_LABELS)?,
            memories: new_desc("server_memories", "Size of server's memories(unit: GB)", SERVER_LABELS)?,
            disk_info: new_desc(
                "server_disk_info",
                "A metric with a constant '1' value labeled by disk information",
                &with_labels(
                    DISK_LABELS,
                    &["plan", "interface", "size", "tags", "description"],
                ),
            )?,
            nic_info: new_desc(
                "server_nic_info",
                "A metric with a constant '1' value labeled by nic information",
                &with_labels(
                    NIC_LABELS,
                    &[
                        "upstream_type",
                        "upstream_id",
                        "upstream_name",
                        "ipaddress",
                        "nw_mask_len",
                        "gateway",
                    ],
                ),
            )?,
            nic_bandwidth: new_desc(
                "server_nic_bandwidth",
                "NIC's Bandwidth(unit: Mbps)",
                NIC_LABELS,
            )?,
            cpu_time: new_desc(
                "server_cpu_time",
                "Server's CPU time(unit: ms)",
                SERVER_LABELS,
            )?,
            disk_read: new_desc(
                "server_disk_read",
                "Disk's read bytes(unit: KBps)",
                DISK_LABELS,
            )?,
            disk_write: new_desc(
                "server_disk_write",
                "Disk's write bytes(unit: KBps)",
                DISK_LABELS,
            )?,
            nic_receive: new_desc(
                "server_nic_receive",
                "NIC's receive bytes(unit: Kbps)",
                NIC_LABELS,
            )?,
            nic_send: new_desc(
                "server_nic_send",
                "NIC's send bytes(unit: Kbps)",
                NIC_LABELS,
            )?,
            maintenance: MaintenanceDescs::new("server", "server", SERVER_LABELS)?,
        })
    }

    fn server_labels(server: &Server) -> Vec<String> {
        vec![server.id.clone(), server.name.clone(), server.zone.clone()]
    }

    fn disk_labels(server: &Server, index: usize, disk: &ServerDisk) -> Vec<String> {
        let mut labels = Self::server_labels(server);
        labels.extend([disk.id.clone(), disk.name.clone(), index.to_string()]);
        labels
    }

    fn nic_labels(server: &Server, index: usize, nic: &Interface) -> Vec<String> {
        let mut labels = Self::server_labels(server);
        labels.extend([nic.id.clone(), index.to_string()]);
        labels
    }

    fn nic_bandwidth(nic: &Interface) -> Option<f64> {
        match nic.upstream_type() {
            "shared" => Some(SHARED_SEGMENT_BANDWIDTH),
            "switch" => Some(SWITCH_BANDWIDTH),
            _ => None,
        }
    }

    async fn collect_server(&self, ctx: &CollectContext, server: &Server) {
        let labels = Self::server_labels(server);
        let is_up = server.instance.is_up();

        ctx.emit(&self.up, bool_to_f64(is_up), labels.clone());

        let mut info_labels = labels.clone();
        info_labels.extend([
            server.server_plan.cpu.to_string(),
            server.disks.len().to_string(),
            server.interfaces.len().to_string(),
            mb_to_gb(server.server_plan.memory_mb as f64).to_string(),
            server.instance.host_name(),
            server.server_plan.commitment.clone(),
            flatten_string_slice(&server.tags),
            server.description.clone(),
        ]);
        ctx.emit(&self.server_info, 1.0, info_labels);

        ctx.emit(&self.cpus, server.server_plan.cpu as f64, labels.clone());
        ctx.emit(
            &self.memories,
            mb_to_gb(server.server_plan.memory_mb as f64),
            labels.clone(),
        );

        for (index, disk) in server.disks.iter().enumerate() {
            let mut disk_labels = Self::disk_labels(server, index, disk);
            disk_labels.extend([
                disk_plan_label(&disk.plan.id),
                disk.connection.clone(),
                mb_to_gb(disk.size_mb as f64).to_string(),
                flatten_string_slice(&disk.tags),
                disk.description.clone(),
            ]);
            ctx.emit(&self.disk_info, 1.0, disk_labels);
        }

        for (index, nic) in server.interfaces.iter().enumerate() {
            let mut nic_labels = Self::nic_labels(server, index, nic);
            nic_labels.extend([
                nic.upstream_type().to_string(),
                nic.upstream_id(),
                nic.upstream_name(),
                nic.effective_ip_address(),
                nic.network_mask_len(),
                nic.default_route(),
            ]);
            ctx.emit(&self.nic_info, 1.0, nic_labels);

            if let Some(bandwidth) = Self::nic_bandwidth(nic) {
                ctx.emit(
                    &self.nic_bandwidth,
                    bandwidth,
                    Self::nic_labels(server, index, nic),
                );
            }
        }

        let maintenance = self.maintenance.collect(
            ctx,
            self.client.as_ref(),
            &labels,
            &server.id,
            server.instance.maintenance_info_url(),
        );

        if server.is_available() && is_up {
            futures_util::join!(
                maintenance,
                self.collect_cpu_time(ctx, server),
                join_all(
                    server
                        .disks
                        .iter()
                        .enumerate()
                        .map(|(index, disk)| self.collect_disk(ctx, server, index, disk))
                ),
                join_all(
                    server
                        .interfaces
                        .iter()
                        .enumerate()
                        .map(|(index, nic)| self.collect_nic(ctx, server, index, nic))
                ),
            );
        } else {
            maintenance.await;
        }
    }

    async fn collect_cpu_time(&self, ctx: &CollectContext, server: &Server) {
        let value = ctx
            .fetch_optional(
                format!("can't get server's CPU-TIME: ID={}", server.id),
                self.client.monitor_cpu(&server.zone, &server.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            ctx.emit_at(
                &self.cpu_time,
                seconds_to_millis(value.cpu_time),
                Self::server_labels(server),
                value.time,
            );
        }
    }

    async fn collect_disk(
        &self,
        ctx: &CollectContext,
        server: &Server,
        index: usize,
        disk: &ServerDisk,
    ) {
        let value = ctx
            .fetch_optional(
                format!(
                    "can't get disk's read/write bytes: ID={}, DiskID={}",
                    server.id, disk.id
                ),
                self.client.monitor_disk(&server.zone, &disk.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            let labels = Self::disk_labels(server, index, disk);
            ctx.emit_at(&self.disk_read, bytes_to_kbytes(value.read), labels.clone(), value.time);
            ctx.emit_at(&self.disk_write, bytes_to_kbytes(value.write), labels, value.time);
        }
    }

    async fn collect_nic(&self, ctx: &CollectContext, server: &Server, index: usize, nic: &Interface) {
        let value = ctx
            .fetch_optional(
                format!(
                    "can't get server's receive/send bytes: ID={}, NICIndex={}",
                    server.id, index
                ),
                self.client.monitor_nic(&server.zone, &nic.id, ctx.now()),
            )
            .await;

        if let Some(value) = value {
            let labels = Self::nic_labels(server, index, nic);
            ctx.emit_at(&self.nic_receive, bytes_to_kbps(value.receive), labels.clone(), value.time);
            ctx.emit_at(&self.nic_send, bytes_to_kbps(value.send), labels, value.time);
        }
    }
}

#[async_trait]
impl Collector for ServerCollector {
    fn name(&self) -> &'static str {
        "server"
    }

    fn describe(&self) -> Vec<&Desc> {
        let mut descs: Vec<&Desc> = vec![
            &self.up,
            &self.server_info,
            &self.cpus,
            &self.memories,
            &self.disk_info,
            &self.nic_info,
            &self.nic_bandwidth,
            &self.cpu_time,
            &self.disk_read,
            &self.disk_write,
            &self.nic_receive,
            &self.nic_send,
        ];
        descs.extend(self.maintenance.descs());
        descs
    }

    async fn collect(&self, ctx: &CollectContext) {
        let servers = ctx
            .fetch("can't list servers", self.client.find())
            .await
            .unwrap_or_default();

        join_all(servers.iter().map(|server| self.collect_server(ctx, server))).await;
    }
}
