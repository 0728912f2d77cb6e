use crate::model::{ContractDetails, Meter};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contador {
    #[serde(default)]
    pub num_serie_equipo: Value,
    pub tip_marca: Option<String>,
    pub tip_aparato: Option<String>,
    pub propiedad_equipo: Option<String>,
    pub fec_instal_equipo: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetContractDetails {
    #[serde(default)]
    pub cod_contrato: Value,
    pub cups: Option<String>,
    pub cod_cliente: Option<String>,
    pub nom_titular: Option<String>,
    pub ape1_titular: Option<String>,
    pub ape2_titular: Option<String>,
    pub direccion: Option<String>,
    pub cod_tarifa_iblda: Option<String>,
    #[serde(default)]
    pub pot_maxima: Value,
    #[serde(default)]
    pub es_autoconsumidor: Value,
    pub list_contador: Option<Vec<Contador>>,
}

impl GetContractDetails {
    /// The portal answers with an empty document instead of an error status.
    pub fn code(&self) -> Option<String> {
        super::as_string(&self.cod_contrato).filter(|code| !code.is_empty() && code != "0")
    }
}

/* The portal sends `null` for blank fields */
fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_owned()
}

impl From<Contador> for Meter {
    fn from(contador: Contador) -> Self {
        Meter {
            serial: super::as_string(&contador.num_serie_equipo).unwrap_or_default(),
            brand: text(&contador.tip_marca),
            kind: text(&contador.tip_aparato),
            owner: text(&contador.propiedad_equipo),
            installed: contador.fec_instal_equipo,
        }
    }
}

impl From<GetContractDetails> for ContractDetails {
    fn from(details: GetContractDetails) -> Self {
        let holder = [
            text(&details.nom_titular),
            text(&details.ape1_titular),
            text(&details.ape2_titular),
        ]
        .iter()
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

        ContractDetails {
            code: details.code().unwrap_or_default(),
            cups: text(&details.cups),
            customer: text(&details.cod_cliente),
            holder: crate::sanitize_address(&holder),
            address: crate::sanitize_address(&text(&details.direccion)),
            tariff: text(&details.cod_tarifa_iblda),
            max_power: super::as_f64(&details.pot_maxima).unwrap_or(0.0),
            self_consumption: super::is_true(&details.es_autoconsumidor),
            meters: details
                .list_contador
                .unwrap_or_default()
                .into_iter()
                .map(Meter::from)
                .collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::super::read_resource;
    use super::GetContractDetails;
    use crate::model::ContractDetails;

    #[test]
    fn contract_details() {
        let response: GetContractDetails =
            serde_json::from_str(&read_resource("contract-details.json")).unwrap();
        assert_eq!(Some("123456789".to_string()), response.code());

        let output = ContractDetails::from(response);
        assert_eq!("ES0000000000000000XY", output.cups);
        assert_eq!("Maria Garcia Lopez", output.holder);
        assert_eq!("C/ Mayor, 12 , 3 46001-valencia - Valencia", output.address);
        assert_eq!(5750.0, output.max_power);
        assert_eq!(1, output.meters.len());
        assert_eq!("12345678", output.meters[0].serial);
        assert_eq!("ZIV", output.meters[0].brand);
    }

    #[test]
    fn null_fields() {
        let response: GetContractDetails = serde_json::from_str(
            r#"{
                "codContrato": 123456789.0,
                "cups": null,
                "codCliente": null,
                "nomTitular": "MARIA",
                "ape1Titular": null,
                "ape2Titular": null,
                "direccion": null,
                "codTarifaIblda": null,
                "potMaxima": null,
                "esAutoconsumidor": null,
                "listContador": [{"numSerieEquipo": 1, "tipMarca": null}]
            }"#,
        )
        .unwrap();

        let output = ContractDetails::from(response);
        assert_eq!("123456789", output.code);
        assert_eq!("", output.cups);
        assert_eq!("Maria", output.holder);
        assert!(!output.self_consumption);
        assert_eq!("", output.meters[0].brand);
    }

    #[test]
    fn empty_details() {
        let response: GetContractDetails = serde_json::from_str("{}").unwrap();
        assert!(response.code().is_none());
    }
}
