use crate::api::endpoint::Endpoint;

pub const BASE_URL: &str = "https://www.globalomnium.com/VirtualOffice";

pub const LOGIN: &Endpoint = "/action_Login/";
pub const CONTRACTS: &Endpoint = "/Secure/action_getSuministros/";
pub const CONTRACT_SELECTION: &Endpoint = "/Secure/action_setSuministroActivo/";
/* Takes `start` and `end` query parameters, `%d/%m/%Y` */
pub const HOURLY_READINGS: &Endpoint = "/Secure/action_getDatosLecturaHorariaEntreFechas";
