// Label helpers - flattening, enum tables and unit conversions
//
// Every collector turns typed API values into flat string labels and
// plain f64 gauge values. The rules live here so that all resource kinds
// render the same field the same way.

use chrono::{DateTime, Utc};

/// Flattens a list of strings into a single label value
///
/// The result is sorted and wrapped in commas (`,a,b,`) so that both an
/// exact match and a `=~".*,a,.*"` query work in PromQL.
///
/// # Returns
/// Empty string for an empty list
///
/// # Example
/// ```
/// assert_eq!(flatten_string_slice(&["tag2".into(), "tag1".into()]), ",tag1,tag2,");
/// ```
pub fn flatten_string_slice(values: &[String]) -> String {
    if values.is_empty() {
        return String::new();
    }

    let mut sorted: Vec<&str> = values.iter().map(String::as_str).collect();
    sorted.sort_unstable();

    format!(",{},", sorted.join(","))
}

/// Renders a boolean gauge value
pub fn bool_to_f64(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Renders a boolean as the "0"/"1" string used by info labels
pub fn bool_label(value: bool) -> String {
    if value { "1" } else { "0" }.to_string()
}

/// Bytes per second to kilobits per second
pub fn bytes_to_kbps(value: f64) -> f64 {
    value * 8.0 / 1000.0
}

/// Bits per second to kilobits per second
pub fn bps_to_kbps(value: f64) -> f64 {
    value / 1000.0
}

/// Bytes per second to kilobytes per second
pub fn bytes_to_kbytes(value: f64) -> f64 {
    value / 1024.0
}

/// KiB to GB (sizes reported by appliance monitors)
pub fn kib_to_gb(value: f64) -> f64 {
    value / 1024.0 / 1024.0
}

/// MB to GB (plan sizes)
pub fn mb_to_gb(value: f64) -> f64 {
    value / 1024.0
}

/// Seconds to milliseconds
pub fn seconds_to_millis(value: f64) -> f64 {
    value * 1000.0
}

/// Timestamp as unix milliseconds
pub fn unix_millis(time: &DateTime<Utc>) -> f64 {
    time.timestamp_millis() as f64
}

/// Disk plan ID to its short name
pub fn disk_plan_label(plan_id: &str) -> String {
    match plan_id {
        "4" => "ssd",
        "2" => "hdd",
        _ => "",
    }
    .to_string()
}

/// Database plan ID to its short name
pub fn database_plan_label(plan_id: &str) -> String {
    match plan_id {
        "10" => "10g",
        "30" => "30g",
        "90" => "90g",
        "240" => "240g",
        "500" => "500g",
        "1000" => "1t",
        _ => "",
    }
    .to_string()
}

/// Load balancer plan ID to its short name
pub fn load_balancer_plan_label(plan_id: &str) -> String {
    match plan_id {
        "1" => "standard",
        "2" => "highspec",
        _ => "",
    }
    .to_string()
}

/// VPC router plan ID to its short name
pub fn vpc_router_plan_label(plan_id: &str) -> String {
    match plan_id {
        "1" => "standard",
        "2" => "premium",
        "3" => "highspec",
        "4" => "highspec4000",
        _ => "",
    }
    .to_string()
}

/// NFS plan ID to its disk medium
pub fn nfs_plan_label(plan_id: &str) -> String {
    match plan_id {
        "1" => "hdd",
        "2" => "ssd",
        _ => "",
    }
    .to_string()
}

/// ProxyLB service class (`cloud/proxylb/plain/100`) to its plan name
///
/// The plan is the trailing CPS figure; anything not shaped like a
/// ProxyLB service class maps to an empty label.
pub fn proxylb_plan_label(service_class: &str) -> String {
    match service_class.strip_prefix("cloud/proxylb/plain/") {
        Some(cps) if !cps.is_empty() && cps.chars().all(|c| c.is_ascii_digit()) => {
            cps.to_string()
        }
        _ => String::new(),
    }
}

/// Sort order of auto-backup weekdays, Sunday first
fn weekday_order(day: &str) -> Option<u8> {
    match day {
        "sun" => Some(0),
        "mon" => Some(1),
        "tue" => Some(2),
        "wed" => Some(3),
        "thu" => Some(4),
        "fri" => Some(5),
        "sat" => Some(6),
        _ => None,
    }
}

/// Flattens a weekday set into `,sun,mon,` form in calendar order
///
/// Unknown day names are dropped.
pub fn flatten_weekdays(days: &[String]) -> String {
    let mut known: Vec<(u8, &str)> = days
        .iter()
        .filter_map(|day| weekday_order(day).map(|order| (order, day.as_str())))
        .collect();
    if known.is_empty() {
        return String::new();
    }

    known.sort_unstable();
    known.dedup();

    let names: Vec<&str> = known.into_iter().map(|(_, name)| name).collect();
    format!(",{},", names.join(","))
}
