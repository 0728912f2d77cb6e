use crate::error::Error;
use crate::model::{DemandAtInstant, HistoricalPowerDemand};
use chrono::NaiveDateTime;
use serde::Deserialize;

/* {"resultado": "correcto", "fecMin": "01-03-202100:00:00", "resultadoMensaje": "", "fecMax": "30-11-202523:00:00"} */
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPowerDemandLimits {
    #[serde(default)]
    pub resultado: String,
    #[serde(default)]
    pub fec_min: String,
    #[serde(default)]
    pub fec_max: String,
}

impl GetPowerDemandLimits {
    pub fn succeeded(&self) -> bool {
        self.resultado == "correcto"
    }
}

#[derive(Deserialize)]
pub struct Demand {
    pub name: String,
    pub y: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPowerDemandPeriod {
    pub pot_max_mens: Vec<Vec<Demand>>,
}

impl TryFrom<GetPowerDemandPeriod> for HistoricalPowerDemand {
    type Error = Error;

    fn try_from(response: GetPowerDemandPeriod) -> Result<Self, Self::Error> {
        let mut demands = response
            .pot_max_mens
            .into_iter()
            .flatten()
            .map(|demand| {
                NaiveDateTime::parse_from_str(&demand.name, "%d/%m/%Y %H:%M")
                    .map(|dt| DemandAtInstant { dt, value: demand.y })
                    .map_err(|e| Error::InvalidData(format!("{:?}: {}", demand.name, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        demands.sort_by_key(|d| d.dt);
        Ok(HistoricalPowerDemand { demands })
    }
}

#[cfg(test)]
mod test {
    use super::super::read_resource;
    use super::{GetPowerDemandLimits, GetPowerDemandPeriod};
    use crate::model::HistoricalPowerDemand;
    use chrono::NaiveDate;

    #[test]
    fn limits() {
        let output: GetPowerDemandLimits =
            serde_json::from_str(&read_resource("power-demand-limits.json")).unwrap();
        assert!(output.succeeded());
        assert_eq!("01-03-202100:00:00", output.fec_min);

        let error: GetPowerDemandLimits = serde_json::from_str(r#"{"resultado": "error"}"#).unwrap();
        assert!(!error.succeeded());
    }

    #[test]
    fn demands_are_flattened_and_sorted() {
        let response: GetPowerDemandPeriod =
            serde_json::from_str(&read_resource("power-demand.json")).unwrap();
        let output = HistoricalPowerDemand::try_from(response).unwrap();

        assert_eq!(5, output.demands.len());
        assert!(output.demands.windows(2).all(|w| w[0].dt <= w[1].dt));
        assert_eq!(
            NaiveDate::from_ymd_opt(2022, 4, 11).unwrap().and_hms_opt(9, 45, 0).unwrap(),
            output.demands[0].dt
        );
        assert_eq!(
            NaiveDate::from_ymd_opt(2022, 5, 28).unwrap().and_hms_opt(22, 15, 0).unwrap(),
            output.demands[2].dt
        );
        assert_eq!(2816.0, output.demands[2].value);
    }
}
