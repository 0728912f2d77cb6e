use crate::error::Error;
use crate::model::{HistoricalGeneration, PeriodValue};
use chrono::{Duration, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
pub struct Item {
    #[serde(default)]
    pub valor: Value,
}

#[derive(Deserialize)]
pub struct Series {
    pub data: Vec<Vec<Option<Item>>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetGenerationPeriod {
    pub fecha_periodo: String,
    pub y: Series,
}

impl TryFrom<GetGenerationPeriod> for HistoricalGeneration {
    type Error = Error;

    fn try_from(response: GetGenerationPeriod) -> Result<Self, Self::Error> {
        let base = NaiveDateTime::parse_from_str(&response.fecha_periodo, "%d-%m-%Y%H:%M:%S")
            .map_err(|e| {
                Error::InvalidData(format!("fechaPeriodo {:?}: {}", response.fecha_periodo, e))
            })?
            .date()
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::InvalidData(response.fecha_periodo.clone()))?;

        let items = response.y.data.into_iter().next().unwrap_or_default();
        let periods = items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, item)| {
                let value = item.and_then(|i| super::as_f64(&i.valor))?;
                Some(PeriodValue::hourly(base + Duration::hours(idx as i64), value))
            })
            .collect();

        Ok(HistoricalGeneration { periods })
    }
}
