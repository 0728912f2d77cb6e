use crate::model::Contract;
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data {
    pub cod_contrato: Value,
    pub cups: Option<String>,
    #[serde(default)]
    pub direccion: String,
    #[serde(default)]
    pub est_contrato: String,
    pub estado_alta: Option<bool>,
}

#[derive(Deserialize)]
pub struct GetContracts {
    #[serde(default)]
    pub success: Value,
    pub contratos: Option<Vec<Data>>,
}

impl From<Data> for Contract {
    fn from(data: Data) -> Self {
        Contract {
            code: super::as_string(&data.cod_contrato).unwrap_or_default(),
            cups: data.cups.map(|c| c.trim().to_owned()),
            address: crate::sanitize_address(&data.direccion),
            active: data
                .estado_alta
                .unwrap_or_else(|| data.est_contrato.trim() == "Alta"),
            status: data.est_contrato.trim().to_owned(),
        }
    }
}
