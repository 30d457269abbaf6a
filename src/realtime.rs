//! Realtime, min/max and power-flow endpoints. Each response is a single flat
//! object and maps straight onto records stamped with the response head time.

use serde::Deserialize;
use std::collections::HashMap;

use crate::head::Head;
use crate::record::{fields_from, tags_from, OutputRecord, TAG_DEVICE_CLASS, TAG_DEVICE_ID};

pub const MEASUREMENT_INVERTER: &str = "fronius_inverter";
pub const MEASUREMENT_INVERTER_MIN_MAX: &str = "fronius_inverter_minmax";
pub const MEASUREMENT_METER: &str = "fronius_meter";
pub const MEASUREMENT_POWER_FLOW: &str = "fronius_powerflow";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitValue {
    #[serde(rename = "Unit", default)]
    pub unit: String,
    #[serde(rename = "Value", default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// Offline devices answer with an empty `Body` and a non-zero status.
    #[serde(rename = "Body", default)]
    pub body: Body<T>,
    #[serde(rename = "Head", alias = "head")]
    pub head: Head,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Body<T> {
    #[serde(rename = "Data", default)]
    pub data: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceStatus {
    #[serde(rename = "ErrorCode", default)]
    pub error_code: i64,
    #[serde(rename = "LEDColor", default)]
    pub led_color: i64,
    #[serde(rename = "LEDState", default)]
    pub led_state: i64,
    #[serde(rename = "MgmtTimerRemainingTime", default)]
    pub mgmt_timer_remaining_time: i64,
    #[serde(rename = "StateToReset", default)]
    pub state_to_reset: bool,
    #[serde(rename = "StatusCode", default)]
    pub status_code: i64,
}

/// `DataCollection=CommonInverterData`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InverterRealtimeData {
    #[serde(rename = "DeviceStatus")]
    pub device_status: DeviceStatus,
    /// AC current, accumulated over all lines.
    #[serde(rename = "IAC")]
    pub current_ac: UnitValue,
    #[serde(rename = "IDC")]
    pub current_dc: UnitValue,
    #[serde(rename = "UAC")]
    pub voltage_ac: UnitValue,
    #[serde(rename = "UDC")]
    pub voltage_dc: UnitValue,
    /// Negative while the inverter consumes power.
    #[serde(rename = "PAC")]
    pub power_ac: UnitValue,
    #[serde(rename = "FAC")]
    pub frequency_ac: UnitValue,
    #[serde(rename = "DAY_ENERGY")]
    pub energy_day_ac: UnitValue,
    #[serde(rename = "YEAR_ENERGY")]
    pub energy_year_ac: UnitValue,
    #[serde(rename = "TOTAL_ENERGY")]
    pub energy_total_ac: UnitValue,
}

/// `DataCollection=MinMaxInverterData`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InverterMinMaxData {
    #[serde(rename = "DAY_PMAX")]
    pub power_day_max_ac: UnitValue,
    #[serde(rename = "DAY_UACMAX")]
    pub voltage_day_max_ac: UnitValue,
    #[serde(rename = "DAY_UACMIN")]
    pub voltage_day_min_ac: UnitValue,
    #[serde(rename = "DAY_UDCMAX")]
    pub voltage_day_max_dc: UnitValue,
    #[serde(rename = "YEAR_PMAX")]
    pub power_year_max_ac: UnitValue,
    #[serde(rename = "YEAR_UACMAX")]
    pub voltage_year_max_ac: UnitValue,
    #[serde(rename = "YEAR_UACMIN")]
    pub voltage_year_min_ac: UnitValue,
    #[serde(rename = "YEAR_UDCMAX")]
    pub voltage_year_max_dc: UnitValue,
    #[serde(rename = "TOTAL_PMAX")]
    pub power_total_max_ac: UnitValue,
    #[serde(rename = "TOTAL_UACMAX")]
    pub voltage_total_max_ac: UnitValue,
    #[serde(rename = "TOTAL_UACMIN")]
    pub voltage_total_min_ac: UnitValue,
    #[serde(rename = "TOTAL_UDCMAX")]
    pub voltage_total_max_dc: UnitValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeterDetails {
    #[serde(rename = "Manufacturer", default)]
    pub manufacturer: String,
    #[serde(rename = "Model", default)]
    pub model: String,
    #[serde(rename = "Serial", default)]
    pub serial: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MeterRealtimeData {
    #[serde(rename = "Details")]
    pub details: MeterDetails,
    /// 1 enabled, 0 disabled.
    #[serde(rename = "Enable")]
    pub enable: Option<i64>,
    #[serde(rename = "TimeStamp")]
    pub timestamp: Option<i64>,
    /// 1 when values are current, 0 when incomplete or outdated.
    #[serde(rename = "Visible")]
    pub visible: Option<i64>,
    /// 0 grid feed-in point, 1 load, 3 external generator, 256-511 subloads.
    #[serde(rename = "Meter_Location_Current")]
    pub meter_location_current: Option<f64>,

    #[serde(rename = "Current_AC_Phase_1")]
    pub current_ac_phase_1: Option<f64>,
    #[serde(rename = "Current_AC_Sum")]
    pub current_ac_sum: Option<f64>,

    #[serde(rename = "EnergyReal_WAC_Minus_Absolute")]
    pub energy_real_wac_minus_absolute: Option<f64>,
    #[serde(rename = "EnergyReal_WAC_Plus_Absolute")]
    pub energy_real_wac_plus_absolute: Option<f64>,

    #[serde(rename = "EnergyReal_WAC_Phase_1_Consumed")]
    pub energy_real_wac_phase_1_consumed: Option<f64>,
    #[serde(rename = "EnergyReal_WAC_Phase_1_Produced")]
    pub energy_real_wac_phase_1_produced: Option<f64>,
    #[serde(rename = "EnergyReal_WAC_Sum_Consumed")]
    pub energy_real_wac_sum_consumed: Option<f64>,
    #[serde(rename = "EnergyReal_WAC_Sum_Produced")]
    pub energy_real_wac_sum_produced: Option<f64>,

    #[serde(rename = "EnergyReactive_VArAC_Phase_1_Consumed")]
    pub energy_reactive_var_ac_phase_1_consumed: Option<f64>,
    #[serde(rename = "EnergyReactive_VArAC_Phase_1_Produced")]
    pub energy_reactive_var_ac_phase_1_produced: Option<f64>,
    #[serde(rename = "EnergyReactive_VArAC_Sum_Consumed")]
    pub energy_reactive_var_ac_sum_consumed: Option<f64>,
    #[serde(rename = "EnergyReactive_VArAC_Sum_Produced")]
    pub energy_reactive_var_ac_sum_produced: Option<f64>,

    #[serde(rename = "Frequency_Phase_Average")]
    pub frequency_phase_average: Option<f64>,
    #[serde(rename = "PowerApparent_S_Phase_1")]
    pub power_apparent_s_phase_1: Option<f64>,
    #[serde(rename = "PowerApparent_S_Sum")]
    pub power_apparent_s_sum: Option<f64>,
    #[serde(rename = "PowerFactor_Phase_1")]
    pub power_factor_phase_1: Option<f64>,
    #[serde(rename = "PowerFactor_Sum")]
    pub power_factor_sum: Option<f64>,
    #[serde(rename = "PowerReactive_Q_Phase_1")]
    pub power_reactive_q_phase_1: Option<f64>,
    #[serde(rename = "PowerReactive_Q_Sum")]
    pub power_reactive_q_sum: Option<f64>,
    #[serde(rename = "PowerReal_P_Phase_1")]
    pub power_real_p_phase_1: Option<f64>,
    #[serde(rename = "PowerReal_P_Sum")]
    pub power_real_p_sum: Option<f64>,
    #[serde(rename = "Voltage_AC_Phase_1")]
    pub voltage_ac_phase_1: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PowerFlowData {
    #[serde(rename = "Version", default)]
    pub version: String,
    #[serde(rename = "Inverters", default)]
    pub inverters: HashMap<String, PowerFlowInverter>,
    #[serde(rename = "Site", default)]
    pub site: PowerFlowSite,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PowerFlowInverter {
    #[serde(rename = "DT")]
    pub device_type: Option<i64>,
    /// Wh today.
    #[serde(rename = "E_Day")]
    pub energy_day: Option<f64>,
    #[serde(rename = "E_Year")]
    pub energy_year: Option<f64>,
    #[serde(rename = "E_Total")]
    pub energy_total: Option<f64>,
    /// W; positive while producing.
    #[serde(rename = "P")]
    pub power: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PowerFlowSite {
    #[serde(rename = "E_Day")]
    pub energy_day: Option<f64>,
    #[serde(rename = "E_Year")]
    pub energy_year: Option<f64>,
    #[serde(rename = "E_Total")]
    pub energy_total: Option<f64>,
    /// `load`, `grid` or `unknown`.
    #[serde(rename = "Meter_Location")]
    pub meter_location: Option<String>,
    /// `produce-only`, `meter`, `vague-meter`, `bidirectional` or `ac-coupled`.
    #[serde(rename = "Mode")]
    pub mode: Option<String>,
    /// Battery; positive while discharging.
    #[serde(rename = "P_Akku")]
    pub power_cumulative: Option<f64>,
    /// Positive when drawing from the grid.
    #[serde(rename = "P_Grid")]
    pub power_grid: Option<f64>,
    #[serde(rename = "P_Load")]
    pub power_load: Option<f64>,
    #[serde(rename = "P_PV")]
    pub power_consumption: Option<f64>,
    #[serde(rename = "rel_Autonomy")]
    pub relative_autonomy: Option<f64>,
    #[serde(rename = "rel_SelfConsumption")]
    pub relative_self_consumption: Option<f64>,
}

pub type InverterRealtimeResponse = Envelope<InverterRealtimeData>;
pub type InverterMinMaxResponse = Envelope<InverterMinMaxData>;
pub type MeterRealtimeResponse = Envelope<MeterRealtimeData>;
pub type PowerFlowResponse = Envelope<PowerFlowData>;

pub fn inverter_realtime_records(
    response: &InverterRealtimeResponse,
    device_id: &str,
) -> Vec<OutputRecord> {
    let data = &response.body.data;
    let fields = fields_from([
        ("current_ac", data.current_ac.value),
        ("current_dc", data.current_dc.value),
        ("voltage_ac", data.voltage_ac.value),
        ("voltage_dc", data.voltage_dc.value),
        ("power_ac", data.power_ac.value),
        ("frequency_ac", data.frequency_ac.value),
        ("energy_day_ac", data.energy_day_ac.value),
        ("energy_year_ac", data.energy_year_ac.value),
        ("energy_total_ac", data.energy_total_ac.value),
    ]);

    vec![OutputRecord::new(
        MEASUREMENT_INVERTER,
        tags_from([(TAG_DEVICE_ID, device_id)]),
        fields,
        response.head.timestamp,
    )]
}

pub fn inverter_min_max_records(
    response: &InverterMinMaxResponse,
    device_id: &str,
) -> Vec<OutputRecord> {
    let data = &response.body.data;
    let fields = fields_from([
        ("power_day_max_ac", data.power_day_max_ac.value),
        ("voltage_day_max_ac", data.voltage_day_max_ac.value),
        ("voltage_day_min_ac", data.voltage_day_min_ac.value),
        ("voltage_day_max_dc", data.voltage_day_max_dc.value),
        ("power_year_max_ac", data.power_year_max_ac.value),
        ("voltage_year_max_ac", data.voltage_year_max_ac.value),
        ("voltage_year_min_ac", data.voltage_year_min_ac.value),
        ("voltage_year_max_dc", data.voltage_year_max_dc.value),
        ("power_total_max_ac", data.power_total_max_ac.value),
        ("voltage_total_max_ac", data.voltage_total_max_ac.value),
        ("voltage_total_min_ac", data.voltage_total_min_ac.value),
        ("voltage_total_max_dc", data.voltage_total_max_dc.value),
    ]);

    vec![OutputRecord::new(
        MEASUREMENT_INVERTER_MIN_MAX,
        tags_from([(TAG_DEVICE_ID, device_id)]),
        fields,
        response.head.timestamp,
    )]
}

pub fn meter_realtime_records(response: &MeterRealtimeResponse, device_id: &str) -> Vec<OutputRecord> {
    let data = &response.body.data;
    let fields = fields_from([
        ("current_ac_phase_1", data.current_ac_phase_1),
        ("current_ac_sum", data.current_ac_sum),
        ("energy_real_watts_ac_minus_absolute", data.energy_real_wac_minus_absolute),
        ("energy_real_watts_ac_plus_absolute", data.energy_real_wac_plus_absolute),
        ("energy_real_watts_ac_phase_1_consumed", data.energy_real_wac_phase_1_consumed),
        ("energy_real_watts_ac_phase_1_produced", data.energy_real_wac_phase_1_produced),
        ("energy_real_watts_ac_sum_consumed", data.energy_real_wac_sum_consumed),
        ("energy_real_watts_ac_sum_produced", data.energy_real_wac_sum_produced),
        ("energy_reactive_var_ac_phase_1_consumed", data.energy_reactive_var_ac_phase_1_consumed),
        ("energy_reactive_var_ac_phase_1_produced", data.energy_reactive_var_ac_phase_1_produced),
        ("energy_reactive_var_ac_sum_consumed", data.energy_reactive_var_ac_sum_consumed),
        ("energy_reactive_var_ac_sum_produced", data.energy_reactive_var_ac_sum_produced),
        ("frequency_phase_average", data.frequency_phase_average),
        ("power_apparent_s_phase_1", data.power_apparent_s_phase_1),
        ("power_apparent_s_sum", data.power_apparent_s_sum),
        ("power_factor_phase_1", data.power_factor_phase_1),
        ("power_factor_sum", data.power_factor_sum),
        ("power_reactive_q_phase_1", data.power_reactive_q_phase_1),
        ("power_reactive_q_sum", data.power_reactive_q_sum),
        ("power_real_p_phase_1", data.power_real_p_phase_1),
        ("power_real_p_sum", data.power_real_p_sum),
        ("voltage_ac_phase_1", data.voltage_ac_phase_1),
    ]);

    vec![OutputRecord::new(
        MEASUREMENT_METER,
        tags_from([(TAG_DEVICE_ID, device_id)]),
        fields,
        response.head.timestamp,
    )]
}

pub fn power_flow_records(response: &PowerFlowResponse) -> Vec<OutputRecord> {
    let data = &response.body.data;
    let timestamp = response.head.timestamp;
    let mut records = Vec::with_capacity(data.inverters.len() + 1);

    for (device_id, inverter) in &data.inverters {
        records.push(OutputRecord::new(
            MEASUREMENT_POWER_FLOW,
            tags_from([(TAG_DEVICE_ID, device_id.as_str()), (TAG_DEVICE_CLASS, "inverter")]),
            fields_from([
                ("energy_day", inverter.energy_day),
                ("energy_year", inverter.energy_year),
                ("energy_total", inverter.energy_total),
                ("power", inverter.power),
            ]),
            timestamp,
        ));
    }

    let site = &data.site;
    records.push(OutputRecord::new(
        MEASUREMENT_POWER_FLOW,
        tags_from([(TAG_DEVICE_CLASS, "site")]),
        fields_from([
            ("energy_day", site.energy_day),
            ("energy_year", site.energy_year),
            ("energy_total", site.energy_total),
            ("power_cumulative", site.power_cumulative),
            ("power_grid", site.power_grid),
            ("power_load", site.power_load),
            ("power_consumption", site.power_consumption),
            ("relative_autonomy", site.relative_autonomy),
            ("relative_self_consumption", site.relative_self_consumption),
        ]),
        timestamp,
    ));

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn head() -> serde_json::Value {
        json!({
            "RequestArguments": { "Scope": "Device" },
            "Status": { "Code": 0, "Reason": "", "UserMessage": "" },
            "Timestamp": "2024-06-01T12:30:00+02:00"
        })
    }

    #[test]
    fn inverter_realtime_maps_values_and_drops_nulls() {
        let response: InverterRealtimeResponse = serde_json::from_value(json!({
            "Body": { "Data": {
                "DeviceStatus": { "StatusCode": 7, "ErrorCode": 0 },
                "IAC": { "Unit": "A", "Value": 6.62 },
                "IDC": { "Unit": "A", "Value": 4.1 },
                "UAC": { "Unit": "V", "Value": 231.4 },
                "UDC": { "Unit": "V", "Value": null },
                "PAC": { "Unit": "W", "Value": 1532 },
                "FAC": { "Unit": "Hz", "Value": 50.01 },
                "DAY_ENERGY": { "Unit": "Wh", "Value": 8123.5 },
                "YEAR_ENERGY": { "Unit": "Wh", "Value": 1234567 },
                "TOTAL_ENERGY": { "Unit": "Wh", "Value": 9876543 }
            }},
            "Head": head()
        }))
        .expect("decode");

        let records = inverter_realtime_records(&response, "1");
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.measurement, "fronius_inverter");
        assert_eq!(record.tags["device_id"], "1");
        assert_eq!(record.fields["power_ac"], 1532.0);
        assert_eq!(record.fields["energy_total_ac"], 9876543.0);
        assert!(!record.fields.contains_key("voltage_dc"));
        assert_eq!(record.fields.len(), 8);
        assert_eq!(
            record.timestamp,
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn empty_body_with_error_status_decodes_to_an_empty_record() {
        let response: InverterRealtimeResponse = serde_json::from_value(json!({
            "Body": {},
            "Head": {
                "RequestArguments": { "Scope": "Device" },
                "Status": { "Code": 8, "Reason": "Transfer timeout.", "UserMessage": "" },
                "Timestamp": "2024-06-01T23:10:00+02:00"
            }
        }))
        .expect("decode");

        assert_eq!(response.head.status.code, 8);
        let records = inverter_realtime_records(&response, "1");
        assert_eq!(records.len(), 1);
        assert!(records[0].fields.is_empty());
        assert_eq!(records[0].to_line_protocol(), "");
    }

    #[test]
    fn min_max_missing_entries_are_omitted() {
        let response: InverterMinMaxResponse = serde_json::from_value(json!({
            "Body": { "Data": {
                "DAY_PMAX": { "Unit": "W", "Value": 4100 },
                "TOTAL_UDCMAX": { "Unit": "V", "Value": 612.3 }
            }},
            "Head": head()
        }))
        .expect("decode");

        let records = inverter_min_max_records(&response, "1");
        assert_eq!(records[0].measurement, "fronius_inverter_minmax");
        assert_eq!(records[0].fields.len(), 2);
        assert_eq!(records[0].fields["voltage_total_max_dc"], 612.3);
    }

    #[test]
    fn meter_realtime_uses_watts_field_names() {
        let response: MeterRealtimeResponse = serde_json::from_value(json!({
            "Body": { "Data": {
                "Details": { "Manufacturer": "Fronius", "Model": "Smart Meter TS 65A-3", "Serial": "x" },
                "Enable": 1,
                "Visible": 1,
                "TimeStamp": 1717237800,
                "Meter_Location_Current": 0,
                "PowerReal_P_Sum": -812.4,
                "EnergyReal_WAC_Sum_Produced": 3456789,
                "Voltage_AC_Phase_1": 230.9
            }},
            "Head": head()
        }))
        .expect("decode");

        let records = meter_realtime_records(&response, "0");
        let record = &records[0];
        assert_eq!(record.measurement, "fronius_meter");
        assert_eq!(record.tags["device_id"], "0");
        assert_eq!(record.fields["power_real_p_sum"], -812.4);
        assert_eq!(record.fields["energy_real_watts_ac_sum_produced"], 3456789.0);
        assert_eq!(record.fields.len(), 3);
    }

    #[test]
    fn power_flow_emits_inverters_and_site() {
        let response: PowerFlowResponse = serde_json::from_value(json!({
            "Body": { "Data": {
                "Version": "12",
                "Inverters": {
                    "1": { "DT": 232, "E_Day": 8123, "E_Year": 1234567, "E_Total": 9876543, "P": 1532 }
                },
                "Site": {
                    "E_Day": 8123, "E_Year": 1234567, "E_Total": 9876543,
                    "Meter_Location": "grid", "Mode": "meter",
                    "P_Akku": null, "P_Grid": -812.4, "P_Load": -719.6, "P_PV": 1532,
                    "rel_Autonomy": 100, "rel_SelfConsumption": 47.0
                }
            }},
            "Head": head()
        }))
        .expect("decode");

        let records = power_flow_records(&response);
        assert_eq!(records.len(), 2);

        let inverter = records
            .iter()
            .find(|r| r.tags.get("device_class").map(String::as_str) == Some("inverter"))
            .expect("inverter record");
        assert_eq!(inverter.tags["device_id"], "1");
        assert_eq!(inverter.fields["power"], 1532.0);
        assert_eq!(inverter.fields.len(), 4);

        let site = records
            .iter()
            .find(|r| r.tags.get("device_class").map(String::as_str) == Some("site"))
            .expect("site record");
        assert!(!site.tags.contains_key("device_id"));
        assert!(!site.fields.contains_key("power_cumulative"));
        assert_eq!(site.fields["power_grid"], -812.4);
        assert_eq!(site.fields.len(), 8);
    }
}
