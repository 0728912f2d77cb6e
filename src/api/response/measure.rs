use crate::error::Error;
use crate::model::Measure;
use serde::Deserialize;
use serde_json::Value;

/*
 * {"valMagnitud": "158.64", "valInterruptor": "1", "valEstado": "09",
 *  "valLecturaContador": "43167", "codSolicitudTGT": "012345678901"}
 */
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetMeasure {
    #[serde(default)]
    pub val_magnitud: Value,
    #[serde(default)]
    pub val_lectura_contador: Value,
}

impl TryFrom<GetMeasure> for Measure {
    type Error = Error;

    fn try_from(response: GetMeasure) -> Result<Self, Self::Error> {
        match (
            super::as_u64(&response.val_lectura_contador),
            super::as_f64(&response.val_magnitud),
        ) {
            (Some(accumulate), Some(instant)) => Ok(Measure {
                accumulate,
                instant,
            }),
            _ => Err(Error::InvalidData(format!(
                "valLecturaContador={} valMagnitud={}",
                response.val_lectura_contador, response.val_magnitud
            ))),
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::read_resource;
    use super::GetMeasure;
    use crate::error::Error;
    use crate::model::Measure;

    #[test]
    fn measure() {
        let response: GetMeasure = serde_json::from_str(&read_resource("measure.json")).unwrap();
        let output = Measure::try_from(response).unwrap();
        assert_eq!(43167, output.accumulate);
        assert_eq!(158.64, output.instant);
    }

    #[test]
    fn numeric_fields() {
        let response: GetMeasure =
            serde_json::from_str(r#"{"valMagnitud": 230, "valLecturaContador": 4120}"#).unwrap();
        assert_eq!(
            Measure {
                accumulate: 4120,
                instant: 230.0
            },
            Measure::try_from(response).unwrap()
        );
    }

    #[test]
    fn missing_fields() {
        let response: GetMeasure = serde_json::from_str(r#"{"valMagnitud": "1.0"}"#).unwrap();
        assert!(matches!(
            Measure::try_from(response),
            Err(Error::InvalidData(_))
        ));
    }
}
