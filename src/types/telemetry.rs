//! Decoded telemetry from real-time report frames

use serde::{Deserialize, Serialize};

/// Alarm and LED state carried by the optional fifth report field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusFlags {
    pub vswr_alarm: bool,
    pub low_power_alarm: bool,
    pub high_power_alarm: bool,
    pub red_led: bool,
    pub yellow_led: bool,
}

impl StatusFlags {
    /// Number of `;` separated sub-fields in the status field.
    pub const FIELD_COUNT: usize = 5;

    /// Build flags from sub-fields in wire order.
    ///
    /// Returns `None` unless exactly [`Self::FIELD_COUNT`] sub-fields are
    /// given. A sub-field is false only when it reads `"0"`.
    pub fn from_fields<'a, I>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut bits = [false; Self::FIELD_COUNT];
        let mut count = 0usize;
        for field in fields {
            if count == Self::FIELD_COUNT {
                return None;
            }
            bits[count] = field.trim() != "0";
            count += 1;
        }
        if count != Self::FIELD_COUNT {
            return None;
        }

        let [vswr_alarm, low_power_alarm, high_power_alarm, red_led, yellow_led] = bits;
        Some(Self { vswr_alarm, low_power_alarm, high_power_alarm, red_led, yellow_led })
    }

    /// True when any alarm flag is raised.
    pub fn any_alarm(&self) -> bool {
        self.vswr_alarm || self.low_power_alarm || self.high_power_alarm
    }
}

/// One decoded real-time report.
///
/// Values are already clamped: powers are never negative and `vswr` is
/// never below 1. `vswr_valid` records whether the meter's raw VSWR
/// reading was at least 1 before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub vswr_valid: bool,
    pub forward_power: f64,
    pub reflected_power: f64,
    pub vswr: f64,
    pub status: Option<StatusFlags>,
}

impl TelemetryRecord {
    /// Build a record from raw meter readings, applying the clamping rules.
    pub fn from_readings(
        forward_power: f64,
        reflected_power: f64,
        vswr: f64,
        status: Option<StatusFlags>,
    ) -> Self {
        Self {
            vswr_valid: vswr >= 1.0,
            forward_power: non_negative(forward_power),
            reflected_power: non_negative(reflected_power),
            vswr: if vswr >= 1.0 { vswr } else { 1.0 },
            status,
        }
    }
}

// Written as a comparison so -0.0 also becomes +0.0 and never prints as "-0.0".
fn non_negative(value: f64) -> f64 {
    if value > 0.0 { value } else { 0.0 }
}
