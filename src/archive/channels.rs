use std::collections::HashSet;

use thiserror::Error;

/// One archive channel: the key the data logger uses in requests and
/// responses, and the field name it is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    pub api_key: &'static str,
    pub field: &'static str,
}

const fn spec(api_key: &'static str, field: &'static str) -> ChannelSpec {
    ChannelSpec { api_key, field }
}

/// Channels requested from `GetArchiveData.cgi`, in request order.
pub const FRONIUS_CHANNELS: [ChannelSpec; 28] = [
    spec("TimeSpanInSec", "time_span"),
    spec("EnergyReal_WAC_Sum_Produced", "energy_real_wac_sum_produced"),
    spec("EnergyReal_WAC_Sum_Consumed", "energy_real_wac_sum_consumed"),
    spec("Current_DC_String_1", "current_dc_string_1"),
    spec("Current_DC_String_2", "current_dc_string_2"),
    spec("Voltage_DC_String_1", "voltage_dc_string_1"),
    spec("Voltage_DC_String_2", "voltage_dc_string_2"),
    spec("Temperature_Powerstage", "temperature_power_stage"),
    spec("Voltage_AC_Phase_1", "voltage_ac_phase_1"),
    spec("Voltage_AC_Phase_2", "voltage_ac_phase_2"),
    spec("Voltage_AC_Phase_3", "voltage_ac_phase_3"),
    spec("Current_AC_Phase_1", "current_ac_phase_1"),
    spec("Current_AC_Phase_2", "current_ac_phase_2"),
    spec("Current_AC_Phase_3", "current_ac_phase_3"),
    spec("PowerReal_PAC_Sum", "power_real_pac_sum"),
    spec("EnergyReal_WAC_Minus_Absolute", "energy_real_wac_minus_absolute"),
    spec("EnergyReal_WAC_Plus_Absolute", "energy_real_wac_plus_absolute"),
    spec("Meter_Location_Current", "meter_location_current"),
    spec("Temperature_Channel_1", "temperature_channel_1"),
    spec("Temperature_Channel_2", "temperature_channel_2"),
    spec("Digital_Channel_1", "digital_channel_1"),
    spec("Digital_Channel_2", "digital_channel_2"),
    spec("Radiation", "radiation"),
    spec(
        "Digital_PowerManagementRelay_Out_1",
        "digital_power_management_relay_out_1",
    ),
    spec(
        "Digital_PowerManagementRelay_Out_2",
        "digital_power_management_relay_out_2",
    ),
    spec(
        "Digital_PowerManagementRelay_Out_3",
        "digital_power_management_relay_out_3",
    ),
    spec(
        "Digital_PowerManagementRelay_Out_4",
        "digital_power_management_relay_out_4",
    ),
    spec("Hybrid_Operating_State", "hybrid_operating_state"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelTableError {
    #[error("channel table is empty")]
    Empty,
    #[error("channel table lists API key {0} more than once")]
    DuplicateApiKey(&'static str),
    #[error("channel table maps more than one API key to field {0}")]
    DuplicateField(&'static str),
}

/// Bijective mapping between archive API keys and published field names.
///
/// Reconstruction only looks at channels listed here; anything else the
/// device returns is ignored. Because field names are unique, channels can be
/// folded into an accumulator in any order.
#[derive(Debug, Clone)]
pub struct ChannelTable {
    specs: Vec<ChannelSpec>,
}

impl ChannelTable {
    pub fn try_new(specs: impl IntoIterator<Item = ChannelSpec>) -> Result<Self, ChannelTableError> {
        let specs: Vec<ChannelSpec> = specs.into_iter().collect();
        if specs.is_empty() {
            return Err(ChannelTableError::Empty);
        }

        let mut api_keys = HashSet::with_capacity(specs.len());
        let mut fields = HashSet::with_capacity(specs.len());
        for entry in &specs {
            if !api_keys.insert(entry.api_key) {
                return Err(ChannelTableError::DuplicateApiKey(entry.api_key));
            }
            if !fields.insert(entry.field) {
                return Err(ChannelTableError::DuplicateField(entry.field));
            }
        }

        Ok(Self { specs })
    }

    pub fn fronius() -> Self {
        Self {
            specs: FRONIUS_CHANNELS.to_vec(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelSpec> {
        self.specs.iter()
    }

    pub fn api_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.iter().map(|entry| entry.api_key)
    }

    #[cfg(test)]
    pub(crate) fn field_for(&self, api_key: &str) -> Option<&'static str> {
        self.specs
            .iter()
            .find(|entry| entry.api_key == api_key)
            .map(|entry| entry.field)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::fronius()
    }
}
