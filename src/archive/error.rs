use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArchiveError {
    #[error("device {device_id}: channel {field} has non-integer offset {offset:?}")]
    MalformedOffset {
        device_id: String,
        field: String,
        offset: String,
    },
    #[error("device {device_id}: channel {field} offset {offset}s is outside the representable time range")]
    OffsetOutOfRange {
        device_id: String,
        field: String,
        offset: i64,
    },
}

