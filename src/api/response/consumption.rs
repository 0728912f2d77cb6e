use crate::error::Error;
use crate::model::{ConsumptionForPeriod, HistoricalConsumption, PeriodValue};
use chrono::{Duration, NaiveDate};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub fecha_desde: String,
    #[serde(default)]
    pub periodos: Vec<String>,
    #[serde(default)]
    pub total: Value,
    #[serde(default)]
    pub totales_periodos_tarifarios: Vec<Value>,
    #[serde(default)]
    pub valores: Vec<Value>,
    #[serde(default)]
    pub valores_periodos_tarifarios: Vec<Option<Vec<Value>>>,
}

/// The portal answers with a one element list.
#[derive(Deserialize)]
pub struct GetConsumptionPeriod(pub Vec<Data>);

fn by_period(names: &[String], values: &[Value]) -> BTreeMap<String, f64> {
    names
        .iter()
        .zip(values)
        .filter_map(|(name, value)| super::as_f64(value).map(|v| (name.to_owned(), v)))
        .collect()
}

impl TryFrom<GetConsumptionPeriod> for HistoricalConsumption {
    type Error = Error;

    fn try_from(response: GetConsumptionPeriod) -> Result<Self, Self::Error> {
        let data = response
            .0
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidData("empty consumption series".to_string()))?;

        let start = NaiveDate::parse_from_str(&data.fecha_desde, "%d-%m-%Y")
            .map_err(|e| Error::InvalidData(format!("fechaDesde {:?}: {}", data.fecha_desde, e)))?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::InvalidData(data.fecha_desde.clone()))?;

        let mut periods = Vec::with_capacity(data.valores.len());
        for (idx, value) in data.valores.iter().enumerate() {
            let value = match super::as_f64(value) {
                Some(v) => v,
                None => {
                    log::warn!("Skipping consumption hour {}: {}", idx, value);
                    continue;
                }
            };

            let desglosed = data
                .valores_periodos_tarifarios
                .get(idx)
                .and_then(Option::as_ref)
                .map(|values| by_period(&data.periodos, values))
                .unwrap_or_default();

            periods.push(ConsumptionForPeriod {
                period: PeriodValue::hourly(start + Duration::hours(idx as i64), value),
                desglosed,
            });
        }

        Ok(HistoricalConsumption {
            periods,
            total: super::as_f64(&data.total).unwrap_or(0.0),
            desglosed: by_period(&data.periodos, &data.totales_periodos_tarifarios),
        })
    }
}
