use anyhow::{Context, Result};
use clap::ValueEnum;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::archive::MalformedOffsetPolicy;
use crate::cli::Args;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_INVERTER_ID: &str = "1";
const DEFAULT_METER_ID: &str = "0";
const DEFAULT_DAYS: u32 = 7;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub host: String,
    pub inverter_id: Option<String>,
    pub meter_id: Option<String>,
    pub system: bool,
    pub realtime: bool,
    pub archive: bool,
    pub days: u32,
    pub request_timeout_secs: u64,
    pub malformed_offset_policy: MalformedOffsetPolicy,
}

impl Config {
    pub fn load(args: Args) -> Result<Self> {
        dotenv().ok();
        Self::resolve(args, |key| env::var(key).ok())
    }

    /// Flag, then environment, then default. Blank environment values count
    /// as unset, except for device ids where blank disables the device.
    pub fn resolve(args: Args, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = args
            .host
            .or_else(|| env_optional(&env, "FRONIUS_HOST"))
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let inverter_id = device_id(
            args.inverter
                .or_else(|| env("FRONIUS_INVERTER"))
                .unwrap_or_else(|| DEFAULT_INVERTER_ID.to_string()),
        );
        let meter_id = device_id(
            args.meter
                .or_else(|| env("FRONIUS_METER"))
                .unwrap_or_else(|| DEFAULT_METER_ID.to_string()),
        );

        let system = match args.system {
            Some(value) => value,
            None => env_parsed(&env, "FRONIUS_SYSTEM", parse_bool)?.unwrap_or(true),
        };
        let realtime = args.realtime || env_parsed(&env, "FRONIUS_REALTIME", parse_bool)?.unwrap_or(false);
        let archive = args.archive || env_parsed(&env, "FRONIUS_ARCHIVE", parse_bool)?.unwrap_or(false);

        let days = match args.days {
            Some(value) => value,
            None => env_parsed(&env, "FRONIUS_DAYS", u32::from_str)?.unwrap_or(DEFAULT_DAYS),
        };
        let request_timeout_secs = match args.request_timeout_secs {
            Some(value) => value,
            None => env_parsed(&env, "FRONIUS_REQUEST_TIMEOUT_SECS", u64::from_str)?
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        };
        let malformed_offset_policy = match args.on_malformed_offset {
            Some(value) => value,
            None => env_parsed(&env, "FRONIUS_ON_MALFORMED_OFFSET", |raw| {
                <MalformedOffsetPolicy as ValueEnum>::from_str(raw, true)
            })?
            .unwrap_or_default(),
        };

        Ok(Self {
            host,
            inverter_id,
            meter_id,
            system,
            realtime,
            archive,
            days,
            request_timeout_secs,
            malformed_offset_policy,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn device_id(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn env_optional(env: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    env(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parsed<T, E>(
    env: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Result<T, E>,
) -> Result<Option<T>>
where
    E: std::fmt::Display,
{
    match env_optional(env, key) {
        Some(raw) => parse(&raw)
            .map(Some)
            .map_err(|err| anyhow::anyhow!("{err}"))
            .with_context(|| format!("invalid {key}={raw:?}")),
        None => Ok(None),
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_a_single_inverter_and_meter_site() {
        let config = Config::resolve(Args::default(), env_from(&[])).expect("config");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.inverter_id.as_deref(), Some("1"));
        assert_eq!(config.meter_id.as_deref(), Some("0"));
        assert!(config.system);
        assert!(!config.realtime);
        assert!(!config.archive);
        assert_eq!(config.days, 7);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.malformed_offset_policy, MalformedOffsetPolicy::Abort);
    }

    #[test]
    fn flags_win_over_environment() {
        let args = Args {
            host: Some("logger.lan".to_string()),
            days: Some(2),
            system: Some(false),
            ..Args::default()
        };
        let env = env_from(&[
            ("FRONIUS_HOST", "other.lan"),
            ("FRONIUS_DAYS", "30"),
            ("FRONIUS_SYSTEM", "true"),
            ("FRONIUS_ARCHIVE", "1"),
            ("FRONIUS_ON_MALFORMED_OFFSET", "skip-device"),
        ]);
        let config = Config::resolve(args, env).expect("config");
        assert_eq!(config.host, "logger.lan");
        assert_eq!(config.days, 2);
        assert!(!config.system);
        assert!(config.archive);
        assert_eq!(config.malformed_offset_policy, MalformedOffsetPolicy::SkipDevice);
    }

    #[test]
    fn empty_device_ids_disable_collection() {
        let args = Args {
            inverter: Some(String::new()),
            ..Args::default()
        };
        let config = Config::resolve(args, env_from(&[("FRONIUS_METER", " ")])).expect("config");
        assert_eq!(config.inverter_id, None);
        assert_eq!(config.meter_id, None);
    }

    #[test]
    fn invalid_environment_values_name_the_key() {
        let err = Config::resolve(Args::default(), env_from(&[("FRONIUS_DAYS", "week")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("FRONIUS_DAYS"));

        let err = Config::resolve(Args::default(), env_from(&[("FRONIUS_SYSTEM", "maybe")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("FRONIUS_SYSTEM"));
    }
}
