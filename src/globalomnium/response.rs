use crate::api::response::{as_f64, is_true};
use crate::model::{Contract, ConsumptionForPeriod, Measure, PeriodValue};
use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;

/* {"result": true, "error": "", "redirectURL": "/VirtualOffice/Secure/action_login"} */
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Login {
    #[serde(default)]
    pub result: Value,
    pub error: Option<String>,
}

impl Login {
    pub fn succeeded(&self) -> bool {
        is_true(&self.result)
    }
}

#[derive(Deserialize)]
pub struct Supply {
    #[serde(default)]
    pub referencia: String,
    #[serde(default)]
    pub direccion: String,
    #[serde(default)]
    pub poblacion: String,
    #[serde(default)]
    pub estado: String,
}

#[derive(Deserialize)]
pub struct GetSupplies {
    pub result: Option<Value>,
    pub data: Option<Vec<Supply>>,
}

impl GetSupplies {
    /// Only an explicit `"result": false` counts as failure.
    pub fn failed(&self) -> bool {
        matches!(&self.result, Some(result) if !is_true(result))
    }
}

impl From<Supply> for Contract {
    fn from(supply: Supply) -> Self {
        Contract {
            code: supply.referencia.trim().to_owned(),
            cups: None,
            address: crate::sanitize_address(&format!("{} {}", supply.direccion, supply.poblacion)),
            active: supply.estado.trim() == "Activo",
            status: supply.estado.trim().to_owned(),
        }
    }
}

#[derive(Deserialize)]
pub struct Row {
    #[serde(rename = "FechaString", default)]
    pub fecha_string: String,
    #[serde(rename = "Consumo", default)]
    pub consumo: Value,
    #[serde(rename = "Lectura", default)]
    pub lectura: Value,
}

#[derive(Deserialize)]
pub struct GetHourlyReadings {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub table: Vec<Row>,
}

/// Spanish formatted decimal: `1.160,684` -> `1160.684`
pub fn parse_decimal_comma(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().replace('.', "").replace(',', ".").parse().ok(),
        other => as_f64(other),
    }
}

impl Row {
    /// `FechaString` hides a sortable `yyyymmddHHMM` timestamp in front of the displayed date.
    pub fn start(&self) -> Option<NaiveDateTime> {
        self.fecha_string
            .split(|c: char| !c.is_ascii_digit())
            .find(|digits| digits.len() == 12)
            .and_then(|digits| NaiveDateTime::parse_from_str(digits, "%Y%m%d%H%M").ok())
    }

    /// Meter reading in litres; the portal reports m³ with three decimals.
    pub fn reading(&self) -> Option<u64> {
        parse_decimal_comma(&self.lectura)
            .filter(|m3| *m3 >= 0.0)
            .map(|m3| (m3 * 1000.0).round() as u64)
    }

    /// Consumption of the hour, in litres.
    pub fn consumption(&self) -> Option<f64> {
        parse_decimal_comma(&self.consumo)
    }
}

impl GetHourlyReadings {
    pub fn succeeded(&self) -> bool {
        is_true(&self.result)
    }

    /// Latest row carrying a valid reading
    pub fn measure(&self) -> Option<Measure> {
        self.table.iter().rev().find_map(|row| {
            let accumulate = row.reading()?;
            let instant = row.consumption().unwrap_or_else(|| {
                log::warn!("Invalid consumption {:?} in reading {:?}", row.consumo, row.fecha_string);
                0.0
            });
            Some(Measure {
                accumulate,
                instant,
            })
        })
    }

    pub fn periods(&self) -> Vec<ConsumptionForPeriod> {
        self.table
            .iter()
            .filter_map(|row| match (row.start(), row.consumption()) {
                (Some(start), Some(value)) => Some(ConsumptionForPeriod {
                    period: PeriodValue::hourly(start, value),
                    desglosed: Default::default(),
                }),
                _ => {
                    log::warn!("Skipping reading {:?}", row.fecha_string);
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::api::response::read_resource;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn decimal_comma() {
        assert_eq!(Some(160.684), parse_decimal_comma(&json!("160,684")));
        assert_eq!(Some(1160.684), parse_decimal_comma(&json!("1.160,684")));
        assert_eq!(Some(3.0), parse_decimal_comma(&json!(3)));
        assert_eq!(None, parse_decimal_comma(&json!(null)));
    }

    #[test]
    fn hourly_readings() {
        let output: GetHourlyReadings =
            serde_json::from_str(&read_resource("go-readings.json")).unwrap();
        assert!(output.succeeded());

        assert_eq!(
            Some(Measure {
                accumulate: 160697,
                instant: 12.0
            }),
            output.measure()
        );

        let periods = output.periods();
        assert_eq!(3, periods.len());
        assert_eq!(
            NaiveDate::from_ymd_opt(2023, 12, 22).unwrap().and_hms_opt(1, 0, 0).unwrap(),
            periods[1].period.start
        );
        assert_eq!(1.0, periods[1].period.value);
    }

    #[test]
    fn reading_without_consumption() {
        let output: GetHourlyReadings = serde_json::from_str(
            r#"{"result": true, "table": [
                {"FechaString": "202312220000", "Consumo": "-", "Lectura": "160,684"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(
            Some(Measure {
                accumulate: 160684,
                instant: 0.0
            }),
            output.measure()
        );
        assert!(output.periods().is_empty());
    }

    #[test]
    fn empty_table() {
        let output: GetHourlyReadings = serde_json::from_str(r#"{"result": true}"#).unwrap();
        assert_eq!(None, output.measure());
        assert!(output.periods().is_empty());
    }

    #[test]
    fn supplies() {
        let output: GetSupplies = serde_json::from_str(&read_resource("go-contracts.json")).unwrap();
        assert!(!output.failed());

        let contract = Contract::from(output.data.unwrap().remove(0));
        assert_eq!("00000000/000", contract.code);
        assert_eq!("C/aaaaa Bbbbbb Ccccc, 0, Abc, 132 València", contract.address);
        assert!(contract.active);
    }
}
