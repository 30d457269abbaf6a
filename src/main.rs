use anyhow::{Context, Result};
use chrono::{Days, Local, NaiveDate};
use clap::Parser;
use std::io::{self, BufWriter, Write};

use fronius_poller::cli::Args;
use fronius_poller::client::FroniusClient;
use fronius_poller::config::Config;
use fronius_poller::record::OutputRecord;

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,fronius_poller=info".into());
    // stdout carries line protocol; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

fn emit(out: &mut impl Write, records: &[OutputRecord]) -> Result<()> {
    for record in records {
        out.write_all(record.to_line_protocol().as_bytes())?;
    }
    out.flush()?;
    Ok(())
}

fn archive_window(days: u32) -> (NaiveDate, NaiveDate) {
    let end = Local::now().date_naive();
    let start = end
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    (start, end)
}

async fn run_realtime(client: &FroniusClient, config: &Config, out: &mut impl Write) -> Result<()> {
    if let Some(device_id) = config.inverter_id.as_deref() {
        let records = client
            .inverter_realtime(device_id)
            .await
            .with_context(|| format!("inverter {device_id} realtime"))?;
        emit(out, &records)?;
    }

    if let Some(device_id) = config.meter_id.as_deref() {
        let records = client
            .meter_realtime(device_id)
            .await
            .with_context(|| format!("meter {device_id} realtime"))?;
        emit(out, &records)?;
    }

    if config.system {
        let records = client
            .power_flow_realtime()
            .await
            .context("power flow realtime")?;
        emit(out, &records)?;
    }

    Ok(())
}

async fn run_archive(client: &FroniusClient, config: &Config, out: &mut impl Write) -> Result<()> {
    let (start, end) = archive_window(config.days);
    tracing::info!(%start, %end, "collecting archive data");

    if let Some(device_id) = config.inverter_id.as_deref() {
        let records = client
            .inverter_archive(device_id, start, end)
            .await
            .with_context(|| format!("inverter {device_id} archive"))?;
        tracing::info!(device_id, records = records.len(), "inverter archive reconstructed");
        emit(out, &records)?;

        let records = client
            .inverter_min_max(device_id)
            .await
            .with_context(|| format!("inverter {device_id} min/max"))?;
        emit(out, &records)?;
    }

    if let Some(device_id) = config.meter_id.as_deref() {
        let records = client
            .meter_archive(device_id, start, end)
            .await
            .with_context(|| format!("meter {device_id} archive"))?;
        tracing::info!(device_id, records = records.len(), "meter archive reconstructed");
        emit(out, &records)?;
    }

    if config.system {
        let records = client
            .system_archive(start, end)
            .await
            .context("system archive")?;
        tracing::info!(records = records.len(), "system archive reconstructed");
        emit(out, &records)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args)?;
    init_tracing()?;

    let client = FroniusClient::new(&config.host, config.request_timeout())?
        .with_malformed_offset_policy(config.malformed_offset_policy);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if config.realtime {
        run_realtime(&client, &config, &mut out).await?;
    }
    if config.archive {
        run_archive(&client, &config, &mut out).await?;
    }
    if !config.realtime && !config.archive {
        tracing::warn!("neither --realtime nor --archive requested; nothing to collect");
    }

    Ok(())
}
