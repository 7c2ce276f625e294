// NIC gauges shared by the appliance collectors

use std::sync::Arc;

use prometheus::core::Desc;

use super::{new_desc, with_labels, CollectContext};
use crate::labels::bytes_to_kbps;
use crate::platform::appliance::Appliance;
use crate::platform::common::Interface;
use crate::platform::monitor::InterfaceValue;

pub const APPLIANCE_LABELS: &[&str] = &["id", "name", "zone"];
const NIC_LABELS: &[&str] = &["id", "name", "zone", "nic_index"];

pub fn appliance_labels(appliance: &Appliance) -> Vec<String> {
    vec![
        appliance.id.clone(),
        appliance.name.clone(),
        appliance.zone.clone(),
    ]
}

fn nic_labels(appliance: &Appliance, index: usize) -> Vec<String> {
    let mut labels = appliance_labels(appliance);
    labels.push(index.to_string());
    labels
}

/// Addressing of one appliance NIC as shown on `*_nic_info`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NicAddress {
    pub ip_address: String,
    pub network_mask_len: String,
    pub gateway: String,
}

impl NicAddress {
    /// Address configured in the appliance remark (single-address appliances)
    pub fn from_remark(appliance: &Appliance, index: usize) -> Self {
        let network = &appliance.remark.network;
        NicAddress {
            ip_address: appliance.remark.server_ip(index),
            network_mask_len: if network.network_mask_len > 0 {
                network.network_mask_len.to_string()
            } else {
                String::new()
            },
            gateway: network.default_route.clone(),
        }
    }

    /// Address as reported on the interface itself
    pub fn from_interface(nic: &Interface) -> Self {
        NicAddress {
            ip_address: nic.effective_ip_address(),
            network_mask_len: nic.network_mask_len(),
            gateway: nic.default_route(),
        }
    }
}

/// `*_nic_info` plus the receive/send traffic gauges of one appliance kind
pub struct NicDescs {
    info: Arc<Desc>,
    receive: Arc<Desc>,
    send: Arc<Desc>,
}

impl NicDescs {
    /// # Arguments
    /// * `subsystem` - Metric name prefix, e.g. `nfs`
    /// * `traffic_prefix` - Prefix of the traffic gauges: `nic_` gives `nfs_nic_receive`, `""` gives `nfs_receive`
    pub fn new(subsystem: &str, traffic_prefix: &str) -> Result<Self, prometheus::Error> {
        Ok(NicDescs {
            info: new_desc(
                &format!("{}_nic_info", subsystem),
                "A metric with a constant '1' value labeled by nic information",
                &with_labels(
                    NIC_LABELS,
                    &[
                        "interface_id",
                        "upstream_type",
                        "upstream_id",
                        "upstream_name",
                        "ipaddress",
                        "nw_mask_len",
                        "gateway",
                    ],
                ),
            )?,
            receive: new_desc(
                &format!("{}_{}receive", subsystem, traffic_prefix),
                "NIC's receive bytes(unit: Kbps)",
                NIC_LABELS,
            )?,
            send: new_desc(
                &format!("{}_{}send", subsystem, traffic_prefix),
                "NIC's send bytes(unit: Kbps)",
                NIC_LABELS,
            )?,
        })
    }

    pub fn descs(&self) -> Vec<&Desc> {
        vec![self.info.as_ref(), self.receive.as_ref(), self.send.as_ref()]
    }

    pub fn emit_info(
        &self,
        ctx: &CollectContext,
        appliance: &Appliance,
        index: usize,
        nic: &Interface,
        address: NicAddress,
    ) {
        let mut labels = nic_labels(appliance, index);
        labels.extend([
            nic.id.clone(),
            nic.upstream_type().to_string(),
            nic.upstream_id(),
            nic.upstream_name(),
            address.ip_address,
            address.network_mask_len,
            address.gateway,
        ]);
        ctx.emit(&self.info, 1.0, labels);
    }

    pub fn emit_traffic(
        &self,
        ctx: &CollectContext,
        appliance: &Appliance,
        index: usize,
        value: &InterfaceValue,
    ) {
        let labels = nic_labels(appliance, index);
        ctx.emit_at(&self.receive, bytes_to_kbps(value.receive), labels.clone(), value.time);
        ctx.emit_at(&self.send, bytes_to_kbps(value.send), labels, value.time);
    }
}
