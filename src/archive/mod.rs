//! Archive reconstruction.
//!
//! `GetArchiveData.cgi` answers with one block per device, and inside each
//! block one sparse series per channel keyed by seconds from the window
//! start. Reconstruction folds every channel of a device into a
//! [`TimeIndexedAccumulator`] and emits one [`OutputRecord`] per distinct
//! timestamp, tagged with the device identity. Devices never share records.

mod accumulator;
mod assemble;
mod channels;
mod error;
mod types;


pub use accumulator::{ingest_channel, TimeIndexedAccumulator};
pub use assemble::{assemble_records, device_tags};
pub use channels::{ChannelSpec, ChannelTable, ChannelTableError, FRONIUS_CHANNELS};
pub use error::ArchiveError;
pub use types::{ArchiveBody, ArchiveChannel, ArchiveDeviceBlock, ArchiveResponse};

use crate::record::OutputRecord;

pub const MEASUREMENT_INVERTER_ARCHIVE: &str = "inverter_archive";
pub const MEASUREMENT_METER_ARCHIVE: &str = "meter_archive";
pub const MEASUREMENT_SYSTEM_ARCHIVE: &str = "system_archive";

/// What to do when a device's channel carries an offset that cannot be
/// turned into a timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum MalformedOffsetPolicy {
    /// Fail the whole response; no records from any device are returned.
    #[default]
    Abort,
    /// Drop the offending device and keep the others.
    SkipDevice,
}

/// Folds all table channels of one device into a fresh accumulator.
pub fn accumulate_device(
    device_id: &str,
    block: &ArchiveDeviceBlock,
    table: &ChannelTable,
) -> Result<TimeIndexedAccumulator, ArchiveError> {
    let mut acc = TimeIndexedAccumulator::new();
    for spec in table.iter() {
        let Some(channel) = block.channels.get(spec.api_key) else {
            continue;
        };
        ingest_channel(&mut acc, block.window_start, channel, spec.field, device_id)?;
    }
    Ok(acc)
}

/// Reconstructs records for every device in `response`.
pub fn reconstruct_archive(
    response: &ArchiveResponse,
    measurement: &str,
    table: &ChannelTable,
    policy: MalformedOffsetPolicy,
) -> Result<Vec<OutputRecord>, ArchiveError> {
    let mut records = Vec::new();

    for (device_id, block) in &response.body.data {
        let acc = match accumulate_device(device_id, block, table) {
            Ok(acc) => acc,
            Err(err) => match policy {
                MalformedOffsetPolicy::Abort => return Err(err),
                MalformedOffsetPolicy::SkipDevice => {
                    tracing::warn!(
                        measurement,
                        device_id = %device_id,
                        error = %err,
                        "skipping archive device"
                    );
                    continue;
                }
            },
        };

        let tags = device_tags(device_id, block);
        let device_records = assemble_records(acc, measurement, &tags);
        tracing::debug!(
            measurement,
            device_id = %device_id,
            window_start = %block.window_start,
            window_end = %block.window_end,
            records = device_records.len(),
            "reconstructed archive device"
        );
        records.extend(device_records);
    }

    Ok(records)
}
