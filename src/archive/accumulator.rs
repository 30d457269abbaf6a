use chrono::{DateTime, TimeDelta, Utc};
use std::collections::BTreeMap;

use super::error::ArchiveError;
use super::types::ArchiveChannel;
use crate::record::Fields;

/// Per-device merge buffer: reconstructed timestamp to the fields sampled at
/// that instant.
///
/// A timestamp is present only while at least one field is stored under it.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TimeIndexedAccumulator {
    entries: BTreeMap<DateTime<Utc>, Fields>,
}

impl TimeIndexedAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `field` at `timestamp`. A later write for the same
    /// pair replaces the earlier one.
    pub fn insert(&mut self, timestamp: DateTime<Utc>, field: &str, value: f64) {
        self.entries
            .entry(timestamp)
            .or_default()
            .insert(field.to_string(), value);
    }

    #[cfg(test)]
    pub(crate) fn get(&self, timestamp: &DateTime<Utc>) -> Option<&Fields> {
        self.entries.get(timestamp)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> impl Iterator<Item = (DateTime<Utc>, Fields)> {
        self.entries.into_iter()
    }
}

/// Folds every non-null sample of `channel` into `acc` under `field`.
///
/// Offsets are whole seconds relative to `window_start` and may be negative.
/// On a malformed offset the accumulator is left with whatever was folded
/// before the failure; the caller decides whether to keep it.
pub fn ingest_channel(
    acc: &mut TimeIndexedAccumulator,
    window_start: DateTime<Utc>,
    channel: &ArchiveChannel,
    field: &str,
    device_id: &str,
) -> Result<(), ArchiveError> {
    for (offset, value) in &channel.samples {
        let seconds = parse_offset(offset).ok_or_else(|| ArchiveError::MalformedOffset {
            device_id: device_id.to_string(),
            field: field.to_string(),
            offset: offset.clone(),
        })?;

        let Some(value) = value else {
            continue;
        };

        let timestamp = resolve_timestamp(window_start, seconds).ok_or_else(|| {
            ArchiveError::OffsetOutOfRange {
                device_id: device_id.to_string(),
                field: field.to_string(),
                offset: seconds,
            }
        })?;

        acc.insert(timestamp, field, *value);
    }

    Ok(())
}

fn parse_offset(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok()
}

pub(crate) fn resolve_timestamp(window_start: DateTime<Utc>, seconds: i64) -> Option<DateTime<Utc>> {
    let delta = TimeDelta::try_seconds(seconds)?;
    window_start.checked_add_signed(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn channel(samples: &[(&str, Option<f64>)]) -> ArchiveChannel {
        ArchiveChannel {
            samples: samples
                .iter()
                .map(|(offset, value)| (offset.to_string(), *value))
                .collect(),
            ..ArchiveChannel::default()
        }
    }

    #[test]
    fn negative_offsets_land_before_window_start() {
        let mut acc = TimeIndexedAccumulator::new();
        ingest_channel(&mut acc, start(), &channel(&[("-5", Some(1.0))]), "radiation", "1")
            .expect("ingest");

        let expected = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 55).unwrap();
        assert_eq!(acc.get(&expected).and_then(|f| f.get("radiation")), Some(&1.0));
    }

    #[test]
    fn null_samples_create_no_entries() {
        let mut acc = TimeIndexedAccumulator::new();
        ingest_channel(
            &mut acc,
            start(),
            &channel(&[("0", None), ("300", None)]),
            "radiation",
            "1",
        )
        .expect("ingest");
        assert!(acc.is_empty());
    }

    #[test]
    fn zero_is_a_sample() {
        let mut acc = TimeIndexedAccumulator::new();
        ingest_channel(&mut acc, start(), &channel(&[("0", Some(0.0))]), "radiation", "1")
            .expect("ingest");
        assert_eq!(acc.get(&start()).and_then(|f| f.get("radiation")), Some(&0.0));
    }

    #[test]
    fn malformed_offset_names_device_and_field() {
        let mut acc = TimeIndexedAccumulator::new();
        let err = ingest_channel(&mut acc, start(), &channel(&[("1.5", Some(1.0))]), "radiation", "7")
            .unwrap_err();
        assert_eq!(
            err,
            ArchiveError::MalformedOffset {
                device_id: "7".to_string(),
                field: "radiation".to_string(),
                offset: "1.5".to_string(),
            }
        );
    }

    #[test]
    fn malformed_offset_fails_even_when_value_is_null() {
        let mut acc = TimeIndexedAccumulator::new();
        let result = ingest_channel(&mut acc, start(), &channel(&[("abc", None)]), "radiation", "7");
        assert!(matches!(result, Err(ArchiveError::MalformedOffset { .. })));
    }

    #[test]
    fn offsets_resolving_to_the_same_instant_keep_one_value() {
        let mut acc = TimeIndexedAccumulator::new();
        ingest_channel(
            &mut acc,
            start(),
            &channel(&[("60", Some(1.0)), ("+60", Some(2.0))]),
            "radiation",
            "1",
        )
        .expect("ingest");

        assert_eq!(acc.len(), 1);
        let at = start() + TimeDelta::seconds(60);
        let fields = acc.get(&at).expect("entry at +60s");
        assert_eq!(fields.len(), 1);
        let value = fields["radiation"];
        assert!(value == 1.0 || value == 2.0);
    }

    #[test]
    fn repeated_offset_key_keeps_the_last_value() {
        let channel: ArchiveChannel =
            serde_json::from_str(r#"{"Unit":"W/m^2","Values":{"0":1.0,"0":2.0}}"#).expect("decode");
        assert_eq!(channel.samples.len(), 1);

        let mut acc = TimeIndexedAccumulator::new();
        ingest_channel(&mut acc, start(), &channel, "radiation", "1").expect("ingest");
        assert_eq!(acc.get(&start()).and_then(|f| f.get("radiation")), Some(&2.0));
    }

    #[test]
    fn overflowing_offset_is_reported() {
        let mut acc = TimeIndexedAccumulator::new();
        let offset = i64::MAX.to_string();
        let result = ingest_channel(
            &mut acc,
            start(),
            &channel(&[(offset.as_str(), Some(1.0))]),
            "radiation",
            "1",
        );
        assert!(matches!(result, Err(ArchiveError::OffsetOutOfRange { .. })));
    }
}
