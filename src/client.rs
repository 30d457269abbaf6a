use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::archive::{
    reconstruct_archive, ArchiveError, ArchiveResponse, ChannelTable, MalformedOffsetPolicy,
    MEASUREMENT_INVERTER_ARCHIVE, MEASUREMENT_METER_ARCHIVE, MEASUREMENT_SYSTEM_ARCHIVE,
};
use crate::realtime::{
    inverter_min_max_records, inverter_realtime_records, meter_realtime_records,
    power_flow_records, InverterMinMaxResponse, InverterRealtimeResponse, MeterRealtimeResponse,
    PowerFlowResponse,
};
use crate::record::OutputRecord;

const PATH_ARCHIVE: &str = "/solar_api/v1/GetArchiveData.cgi";
const PATH_INVERTER_REALTIME: &str = "/solar_api/v1/GetInverterRealtimeData.cgi";
const PATH_METER_REALTIME: &str = "/solar_api/v1/GetMeterRealtimeData.cgi";
const PATH_POWER_FLOW: &str = "/solar_api/v1/GetPowerFlowRealtimeData.fcgi";
const ARCHIVE_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid device host {host:?}: {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Which archive series to query. The device class decides both the query
/// parameters and the measurement name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveScope {
    Inverter(String),
    Meter(String),
    System,
}

impl ArchiveScope {
    pub fn measurement(&self) -> &'static str {
        match self {
            Self::Inverter(_) => MEASUREMENT_INVERTER_ARCHIVE,
            Self::Meter(_) => MEASUREMENT_METER_ARCHIVE,
            Self::System => MEASUREMENT_SYSTEM_ARCHIVE,
        }
    }
}

/// Query parameters for `GetArchiveData.cgi`: the table's channels in table
/// order followed by the scope selection and the date window.
pub fn archive_query(
    scope: &ArchiveScope,
    start: NaiveDate,
    end: NaiveDate,
    table: &ChannelTable,
) -> Vec<(&'static str, String)> {
    let mut query: Vec<(&'static str, String)> = table
        .api_keys()
        .map(|key| ("Channel", key.to_string()))
        .collect();

    match scope {
        ArchiveScope::Inverter(device_id) | ArchiveScope::Meter(device_id) => {
            let class = if matches!(scope, ArchiveScope::Inverter(_)) {
                "Inverter"
            } else {
                "Meter"
            };
            query.push(("Scope", "Device".to_string()));
            query.push(("SeriesType", "Detail".to_string()));
            query.push(("HumanReadable", "False".to_string()));
            query.push(("DeviceClass", class.to_string()));
            query.push(("DeviceId", device_id.clone()));
        }
        ArchiveScope::System => {
            query.push(("Scope", "System".to_string()));
            query.push(("SeriesType", "Detail".to_string()));
            query.push(("HumanReadable", "False".to_string()));
        }
    }

    query.push(("StartDate", start.format(ARCHIVE_DATE_FORMAT).to_string()));
    query.push(("EndDate", end.format(ARCHIVE_DATE_FORMAT).to_string()));
    query
}

/// HTTP client for a Fronius data logger's Solar API v1.
#[derive(Clone)]
pub struct FroniusClient {
    http: Client,
    base: Url,
    channels: ChannelTable,
    malformed_offset_policy: MalformedOffsetPolicy,
}

impl FroniusClient {
    pub fn new(host: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                url: host.to_string(),
                source,
            })?;
        Self::with_http(http, host)
    }

    pub fn with_http(http: Client, host: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http,
            base: base_url(host)?,
            channels: ChannelTable::fronius(),
            malformed_offset_policy: MalformedOffsetPolicy::default(),
        })
    }

    pub fn with_malformed_offset_policy(mut self, policy: MalformedOffsetPolicy) -> Self {
        self.malformed_offset_policy = policy;
        self
    }

    pub fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        url.set_path(path);
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let mut url = self.endpoint(path);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        let url_text = url.to_string();
        tracing::debug!(url = %url_text, "requesting");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url_text.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url: url_text,
                status,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                url: url_text.clone(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(|source| ClientError::Decode {
            url: url_text,
            source,
        })
    }

    pub async fn read_archive(
        &self,
        scope: &ArchiveScope,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<ArchiveResponse, ClientError> {
        let query = archive_query(scope, start, end, &self.channels);
        let response: ArchiveResponse = self.get_json(PATH_ARCHIVE, &query).await?;
        response.head.log_status(PATH_ARCHIVE);
        Ok(response)
    }

    pub async fn archive(
        &self,
        scope: &ArchiveScope,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OutputRecord>, ClientError> {
        let response = self.read_archive(scope, start, end).await?;
        let records = reconstruct_archive(
            &response,
            scope.measurement(),
            &self.channels,
            self.malformed_offset_policy,
        )?;
        Ok(records)
    }

    pub async fn inverter_archive(
        &self,
        device_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OutputRecord>, ClientError> {
        self.archive(&ArchiveScope::Inverter(device_id.to_string()), start, end)
            .await
    }

    pub async fn meter_archive(
        &self,
        device_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OutputRecord>, ClientError> {
        self.archive(&ArchiveScope::Meter(device_id.to_string()), start, end)
            .await
    }

    pub async fn system_archive(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OutputRecord>, ClientError> {
        self.archive(&ArchiveScope::System, start, end).await
    }

    pub async fn inverter_realtime(&self, device_id: &str) -> Result<Vec<OutputRecord>, ClientError> {
        let query = device_query(device_id, Some("CommonInverterData"));
        let response: InverterRealtimeResponse =
            self.get_json(PATH_INVERTER_REALTIME, &query).await?;
        response.head.log_status(PATH_INVERTER_REALTIME);
        Ok(inverter_realtime_records(&response, device_id))
    }

    pub async fn inverter_min_max(&self, device_id: &str) -> Result<Vec<OutputRecord>, ClientError> {
        let query = device_query(device_id, Some("MinMaxInverterData"));
        let response: InverterMinMaxResponse =
            self.get_json(PATH_INVERTER_REALTIME, &query).await?;
        response.head.log_status(PATH_INVERTER_REALTIME);
        Ok(inverter_min_max_records(&response, device_id))
    }

    pub async fn meter_realtime(&self, device_id: &str) -> Result<Vec<OutputRecord>, ClientError> {
        let query = device_query(device_id, None);
        let response: MeterRealtimeResponse = self.get_json(PATH_METER_REALTIME, &query).await?;
        response.head.log_status(PATH_METER_REALTIME);
        Ok(meter_realtime_records(&response, device_id))
    }

    pub async fn power_flow_realtime(&self) -> Result<Vec<OutputRecord>, ClientError> {
        let response: PowerFlowResponse = self.get_json(PATH_POWER_FLOW, &[]).await?;
        response.head.log_status(PATH_POWER_FLOW);
        Ok(power_flow_records(&response))
    }
}

fn device_query(device_id: &str, collection: Option<&str>) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("Scope", "Device".to_string()),
        ("DeviceId", device_id.to_string()),
    ];
    if let Some(collection) = collection {
        query.push(("DataCollection", collection.to_string()));
    }
    query
}

/// Accepts `host`, `host:port` or a full `http://` URL.
fn base_url(host: &str) -> Result<Url, ClientError> {
    let trimmed = host.trim().trim_end_matches('/');
    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let url = Url::parse(&candidate).map_err(|source| ClientError::InvalidHost {
        host: host.to_string(),
        source,
    })?;
    if url.host_str().is_none() {
        return Err(ClientError::InvalidHost {
            host: host.to_string(),
            source: url::ParseError::EmptyHost,
        });
    }
    Ok(url)
}
