use chrono::NaiveDateTime;

pub type Endpoint = str;

pub const BASE_URL: &str = "https://www.i-de.es/consumidores/rest";

pub const LOGIN: &Endpoint = "/loginNew/login";
pub const KEEP_SESSION: &Endpoint = "/loginNew/mantenerSesion/";
pub const CONTRACTS: &Endpoint = "/cto/listaCtos/";
pub const CONTRACT_DETAILS: &Endpoint = "/detalleCto/detalle/";
pub const CONTRACT_SELECTION: &Endpoint = "/cto/seleccion/";
pub const ICP_STATUS: &Endpoint = "/rearmeICP/consultarEstado";
pub const MEASURE: &Endpoint = "/escenarioNew/obtenerMedicionOnline/24";
pub const POWER_DEMAND_LIMITS: &Endpoint = "/consumoNew/obtenerLimitesFechasPotencia/";

pub fn contract_selection(code: &str) -> String {
    format!("{}{}", CONTRACT_SELECTION, code)
}

pub fn consumption_period(start: NaiveDateTime, end: NaiveDateTime) -> String {
    format!(
        "/consumoNew/obtenerDatosConsumoDH/{}/{}/horas/USU/",
        start.format("%d-%m-%Y"),
        end.format("%d-%m-%Y")
    )
}

pub fn generation_period(start: NaiveDateTime, end: NaiveDateTime) -> String {
    format!(
        "/consumoNew/obtenerDatosGeneracionPeriodo/fechaInicio/{}00:00:00/fechaFinal/{}00:00:00/",
        start.format("%d-%m-%Y"),
        end.format("%d-%m-%Y")
    )
}

/// `fec_min` and `fec_max` are passed through as returned by `POWER_DEMAND_LIMITS`
pub fn power_demand_period(fec_min: &str, fec_max: &str) -> String {
    format!(
        "/consumoNew/obtenerPotenciasMaximasRangoV2/{}/{}",
        fec_min, fec_max
    )
}
