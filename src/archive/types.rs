use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

use crate::head::Head;

/// Decoded `GetArchiveData.cgi` response.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveResponse {
    #[serde(rename = "Body", default)]
    pub body: ArchiveBody,
    #[serde(rename = "Head", alias = "head")]
    pub head: Head,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveBody {
    /// Keyed by the device id the logger uses (e.g. `inverter/1`).
    #[serde(rename = "Data", default)]
    pub data: HashMap<String, ArchiveDeviceBlock>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveDeviceBlock {
    #[serde(rename = "DeviceType", default)]
    pub device_type: i64,
    #[serde(rename = "NodeType", default)]
    pub node_type: i64,
    #[serde(rename = "Start")]
    pub window_start: DateTime<Utc>,
    #[serde(rename = "End")]
    pub window_end: DateTime<Utc>,
    /// Keyed by API channel name. Channels outside the channel table are kept
    /// here but never read.
    #[serde(rename = "Data", default)]
    pub channels: HashMap<String, ArchiveChannel>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArchiveChannel {
    #[serde(rename = "Unit", default)]
    pub unit: String,
    #[serde(rename = "_comment", default)]
    pub comment: String,
    /// Offset in seconds from `window_start` (as text) to sample. `None` is a
    /// reported null and carries no sample.
    #[serde(rename = "Values", default)]
    pub samples: HashMap<String, Option<f64>>,
}
