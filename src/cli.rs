use clap::Parser;

use crate::archive::MalformedOffsetPolicy;

/// Every flag falls back to its `FRONIUS_*` environment variable and then to
/// a built-in default; see `Config::resolve`.
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "fronius-poller",
    version,
    about = "Print Fronius Solar API readings as line protocol"
)]
pub struct Args {
    /// Data logger host, `host:port` or URL.
    #[arg(long)]
    pub host: Option<String>,
    /// Inverter device id; empty disables inverter collection.
    #[arg(long)]
    pub inverter: Option<String>,
    /// Meter device id; empty disables meter collection.
    #[arg(long)]
    pub meter: Option<String>,
    /// Collect system-wide data (power flow, system archive).
    #[arg(long)]
    pub system: Option<bool>,
    #[arg(long, default_value_t = false)]
    pub realtime: bool,
    #[arg(long, default_value_t = false)]
    pub archive: bool,
    /// Days of history to request from the archive.
    #[arg(long)]
    pub days: Option<u32>,
    #[arg(long)]
    pub request_timeout_secs: Option<u64>,
    #[arg(long, value_enum)]
    pub on_malformed_offset: Option<MalformedOffsetPolicy>,
}
