use super::accumulator::TimeIndexedAccumulator;
use super::types::ArchiveDeviceBlock;
use crate::record::{OutputRecord, Tags, TAG_DEVICE_ID, TAG_DEVICE_TYPE, TAG_NODE_TYPE};

/// Tags shared by every record of one archive device.
pub fn device_tags(device_id: &str, block: &ArchiveDeviceBlock) -> Tags {
    let mut tags = Tags::new();
    tags.insert(TAG_DEVICE_ID.to_string(), device_id.to_string());
    tags.insert(TAG_DEVICE_TYPE.to_string(), block.device_type.to_string());
    tags.insert(TAG_NODE_TYPE.to_string(), block.node_type.to_string());
    tags
}

/// Emits one record per accumulated timestamp. Records come out in
/// timestamp order, but callers should not rely on it.
pub fn assemble_records(
    acc: TimeIndexedAccumulator,
    measurement: &str,
    tags: &Tags,
) -> Vec<OutputRecord> {
    let mut records = Vec::with_capacity(acc.len());
    for (timestamp, fields) in acc.into_entries() {
        if fields.is_empty() {
            continue;
        }
        records.push(OutputRecord::new(measurement, tags.clone(), fields, timestamp));
    }
    records
}
