use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;

pub const TAG_DEVICE_ID: &str = "device_id";
pub const TAG_DEVICE_TYPE: &str = "device_type";
pub const TAG_NODE_TYPE: &str = "node_type";
pub const TAG_DEVICE_CLASS: &str = "device_class";

pub type Tags = BTreeMap<String, String>;
pub type Fields = BTreeMap<String, f64>;

/// One published time-series point.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub measurement: String,
    pub tags: Tags,
    pub fields: Fields,
    pub timestamp: DateTime<Utc>,
}

impl OutputRecord {
    pub fn new(
        measurement: impl Into<String>,
        tags: Tags,
        fields: Fields,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            measurement: measurement.into(),
            tags,
            fields,
            timestamp,
        }
    }

    /// Renders the record as one line of line protocol with nanosecond
    /// precision, including the trailing newline. Records without fields
    /// (and fields that are not finite) cannot be represented and render as
    /// an empty string.
    pub fn to_line_protocol(&self) -> String {
        let fields: Vec<(&String, &f64)> = self
            .fields
            .iter()
            .filter(|(_, value)| value.is_finite())
            .collect();
        if fields.is_empty() {
            return String::new();
        }

        let mut line = String::with_capacity(64 + fields.len() * 24);
        escape_into(&mut line, &self.measurement, &[',', ' ']);
        for (key, value) in &self.tags {
            if key.is_empty() || value.is_empty() {
                continue;
            }
            line.push(',');
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            escape_into(&mut line, value, &[',', '=', ' ']);
        }

        line.push(' ');
        for (idx, (key, value)) in fields.into_iter().enumerate() {
            if idx > 0 {
                line.push(',');
            }
            escape_into(&mut line, key, &[',', '=', ' ']);
            let _ = write!(line, "={value}");
        }

        match self.timestamp.timestamp_nanos_opt() {
            Some(nanos) => {
                let _ = writeln!(line, " {nanos}");
            }
            None => line.push('\n'),
        }
        line
    }
}

fn escape_into(out: &mut String, value: &str, specials: &[char]) {
    for ch in value.chars() {
        if ch == '\\' || specials.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
}

/// Builds a field map from `(name, value)` pairs, dropping values the device
/// reported as null.
pub fn fields_from<'a>(values: impl IntoIterator<Item = (&'a str, Option<f64>)>) -> Fields {
    values
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name.to_string(), value)))
        .collect()
}

pub fn tags_from<'a>(values: impl IntoIterator<Item = (&'a str, &'a str)>) -> Tags {
    values
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}
