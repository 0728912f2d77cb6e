use chrono::{Duration as ChronoDuration, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

type KWh = f64;
type Watt = f64;

pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings shared by every portal client.
#[derive(Debug, Clone)]
pub struct Api {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Contract selected right after each login
    pub contract: Option<String>,
    pub session_timeout: Duration,
    pub auto_renew_session: bool,
    pub request_timeout: Duration,
}

impl Api {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Api {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            contract: None,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            auto_renew_session: true,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contract {
    pub code: String,
    pub cups: Option<String>,
    pub address: String,
    pub status: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meter {
    pub serial: String,
    pub brand: String,
    pub kind: String,
    pub owner: String,
    pub installed: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractDetails {
    pub code: String,
    pub cups: String,
    pub customer: String,
    pub holder: String,
    pub address: String,
    pub tariff: String,
    /// Contracted power, in W
    pub max_power: Watt,
    pub self_consumption: bool,
    pub meters: Vec<Meter>,
}

/// Meter reading: `accumulate` is the meter counter (kWh for electricity, litres for water),
/// `instant` the current demand (W) or the consumption of the last hour (litres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Measure {
    pub accumulate: u64,
    pub instant: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodValue {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub value: f64,
}

impl PeriodValue {
    pub fn hourly(start: NaiveDateTime, value: f64) -> Self {
        PeriodValue {
            start,
            end: start + ChronoDuration::hours(1),
            value,
        }
    }

    pub fn within(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.start >= start && self.end <= end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsumptionForPeriod {
    #[serde(flatten)]
    pub period: PeriodValue,
    pub desglosed: BTreeMap<String, KWh>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoricalConsumption {
    pub periods: Vec<ConsumptionForPeriod>,
    pub total: f64,
    pub desglosed: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoricalGeneration {
    pub periods: Vec<PeriodValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandAtInstant {
    pub dt: NaiveDateTime,
    pub value: Watt,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoricalPowerDemand {
    pub demands: Vec<DemandAtInstant>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionLimits {
    pub total: Duration,
    pub warning: Duration,
    pub user_session: String,
}
