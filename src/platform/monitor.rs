// Activity monitor responses
//
// Every `*/monitor` endpoint returns a map of timestamps to named values.
// Collectors only ever want the newest data point, and only when every
// value they need is present in it.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;

use super::api::SakuraCloudClient;
use super::ClientResult;

/// Raw `{"Data": {"<RFC3339>": {"<key>": value|null}}}` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorResponse {
    #[serde(rename = "Data", default)]
    pub data: BTreeMap<String, HashMap<String, Option<f64>>>,
}

impl MonitorResponse {
    /// Newest data point carrying a value for every key in `keys`
    ///
    /// # Returns
    /// The point's timestamp and the values in the order of `keys`, or
    /// `None` when no point is complete.
    pub fn latest(&self, keys: &[&str]) -> Option<(DateTime<Utc>, Vec<f64>)> {
        self.data
            .iter()
            .filter_map(|(time, values)| {
                let time = DateTime::parse_from_rfc3339(time).ok()?.with_timezone(&Utc);
                let picked: Option<Vec<f64>> =
                    keys.iter().map(|key| values.get(*key).copied().flatten()).collect();
                picked.map(|picked| (time, picked))
            })
            .max_by_key(|(time, _)| *time)
    }
}

/// Query document asking for the hour of data ending at `end`
pub fn monitor_query(end: DateTime<Utc>) -> serde_json::Value {
    json!({
        "Start": (end - Duration::hours(1)).to_rfc3339(),
        "End": end.to_rfc3339(),
    })
}

impl SakuraCloudClient {
    /// Fetches a zone-scoped monitor endpoint for the hour ending at `end`
    pub(crate) async fn monitor(
        &self,
        zone: &str,
        path: &str,
        end: DateTime<Utc>,
    ) -> ClientResult<MonitorResponse> {
        self.get_json(&self.cloud_url(zone, path), Some(&monitor_query(end)))
            .await
    }
}

/// CPU time consumed, in seconds
#[derive(Debug, Clone, PartialEq)]
pub struct CpuTimeValue {
    pub time: DateTime<Utc>,
    pub cpu_time: f64,
}

impl CpuTimeValue {
    pub fn from_response(response: &MonitorResponse) -> Option<Self> {
        let (time, values) = response.latest(&["CPU-TIME"])?;
        Some(CpuTimeValue {
            time,
            cpu_time: values[0],
        })
    }
}

/// Disk throughput, in bytes per second
#[derive(Debug, Clone, PartialEq)]
pub struct DiskValue {
    pub time: DateTime<Utc>,
    pub read: f64,
    pub write: f64,
}

impl DiskValue {
    pub fn from_response(response: &MonitorResponse) -> Option<Self> {
        let (time, values) = response.latest(&["Read", "Write"])?;
        Some(DiskValue {
            time,
            read: values[0],
            write: values[1],
        })
    }
}

/// NIC throughput, in bytes per second
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceValue {
    pub time: DateTime<Utc>,
    pub receive: f64,
    pub send: f64,
}

impl InterfaceValue {
    pub fn from_response(response: &MonitorResponse) -> Option<Self> {
        let (time, values) = response.latest(&["Receive", "Send"])?;
        Some(InterfaceValue {
            time,
            receive: values[0],
            send: values[1],
        })
    }
}

/// Internet router throughput, in bytes per second
#[derive(Debug, Clone, PartialEq)]
pub struct RouterValue {
    pub time: DateTime<Utc>,
    pub inbound: f64,
    pub outbound: f64,
}

impl RouterValue {
    pub fn from_response(response: &MonitorResponse) -> Option<Self> {
        let (time, values) = response.latest(&["In", "Out"])?;
        Some(RouterValue {
            time,
            inbound: values[0],
            outbound: values[1],
        })
    }
}

/// NFS free disk size, in KiB
#[derive(Debug, Clone, PartialEq)]
pub struct FreeDiskSizeValue {
    pub time: DateTime<Utc>,
    pub free_disk_size: f64,
}

impl FreeDiskSizeValue {
    pub fn from_response(response: &MonitorResponse) -> Option<Self> {
        let (time, values) = response.latest(&["FreeDiskSize"])?;
        Some(FreeDiskSizeValue {
            time,
            free_disk_size: values[0],
        })
    }
}

/// ProxyLB connection activity
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionValue {
    pub time: DateTime<Utc>,
    pub active_connections: f64,
    pub connections_per_sec: f64,
}

impl ConnectionValue {
    pub fn from_response(response: &MonitorResponse) -> Option<Self> {
        let (time, values) = response.latest(&["ActiveConnections", "ConnectionsPerSec"])?;
        Some(ConnectionValue {
            time,
            active_connections: values[0],
            connections_per_sec: values[1],
        })
    }
}

/// SIM traffic, in bits per second
#[derive(Debug, Clone, PartialEq)]
pub struct LinkValue {
    pub time: DateTime<Utc>,
    pub uplink_bps: f64,
    pub downlink_bps: f64,
}

impl LinkValue {
    pub fn from_response(response: &MonitorResponse) -> Option<Self> {
        let (time, values) = response.latest(&["UplinkBps", "DownlinkBps"])?;
        Some(LinkValue {
            time,
            uplink_bps: values[0],
            downlink_bps: values[1],
        })
    }
}

/// Database appliance resource usage; sizes in KiB
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseValue {
    pub time: DateTime<Utc>,
    pub total_memory_size: f64,
    pub used_memory_size: f64,
    pub total_disk1_size: f64,
    pub used_disk1_size: f64,
    pub total_disk2_size: f64,
    pub used_disk2_size: f64,
    pub binlog_used_size_kib: Option<f64>,
    pub delay_time_sec: Option<f64>,
}

impl DatabaseValue {
    pub fn from_response(response: &MonitorResponse) -> Option<Self> {
        let (time, values) = response.latest(&[
            "Total-Memory-Size",
            "Used-Memory-Size",
            "Total-Disk1-Size",
            "Used-Disk1-Size",
            "Total-Disk2-Size",
            "Used-Disk2-Size",
        ])?;

        // replication figures only exist on replicated databases
        let point = response
            .data
            .iter()
            .find(|(at, _)| {
                DateTime::parse_from_rfc3339(at)
                    .map(|at| at.with_timezone(&Utc) == time)
                    .unwrap_or(false)
            })
            .map(|(_, point)| point);
        let extra = |key: &str| point.and_then(|point| point.get(key).copied().flatten());

        Some(DatabaseValue {
            time,
            total_memory_size: values[0],
            used_memory_size: values[1],
            total_disk1_size: values[2],
            used_disk1_size: values[3],
            total_disk2_size: values[4],
            used_disk2_size: values[5],
            binlog_used_size_kib: extra("binlogUsedSizeKiB"),
            delay_time_sec: extra("delayTimeSec"),
        })
    }
}
