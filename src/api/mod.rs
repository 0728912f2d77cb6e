//! Client for the i-DE (Iberdrola distribution) customer portal.
//!
//! The portal is the REST backend of the i-DE mobile app. Authentication is cookie based: a
//! successful `login` leaves a `JSESSIONID` in the client cookie store, which the portal expires
//! after a few minutes of inactivity. [`Client`] keeps track of the login time and, unless
//! disabled, logs in again before any query once the user session timeout has elapsed.

pub mod endpoint;
pub mod response;

use crate::error::Error;
use crate::model::{
    self, Contract, ContractDetails, HistoricalConsumption, HistoricalGeneration,
    HistoricalPowerDemand, Measure, SessionLimits,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Mutex;
use std::time::Instant;

use chrono::NaiveDateTime;
use response::consumption::GetConsumptionPeriod;
use response::contract_details::GetContractDetails;
use response::contracts::GetContracts;
use response::generation::GetGenerationPeriod;
use response::login::Login;
use response::measure::GetMeasure;
use response::power_demand::{GetPowerDemandLimits, GetPowerDemandPeriod};
use response::session::KeepSession;

const APP_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 11_4_1 like Mac OS X) \
                              AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15G77";

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    headers.insert("esVersionNueva", HeaderValue::from_static("1"));
    headers.insert("idioma", HeaderValue::from_static("es"));
    headers.insert("movilAPP", HeaderValue::from_static("si"));
    headers.insert("tipoAPP", HeaderValue::from_static("ios"));
    headers.insert(USER_AGENT, HeaderValue::from_static(APP_USER_AGENT));
    headers
}

/// Map transport level failures to Error. HTTP statuses are handled by `map_status`.
pub(crate) fn map_api_err(error: reqwest::Error) -> Error {
    Error::ApiError(error.to_string())
}

/// Map non-200 responses to Error
pub(crate) fn map_status(status: reqwest::StatusCode) -> Error {
    let reason = status.canonical_reason().unwrap_or("").to_string();
    match status {
        http::StatusCode::TOO_MANY_REQUESTS => Error::RateExceeded(reason),
        _ => Error::RequestFailed {
            status: status.as_u16(),
            reason,
        },
    }
}

pub(crate) fn parse<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|e| Error::InvalidData(format!("{}: {}", e, body)))
}

/// Login timestamp shared by the portal clients.
#[derive(Debug, Default)]
pub(crate) struct LoginState {
    timestamp: Mutex<Option<Instant>>,
}

impl LoginState {
    /// Updates `timestamp` to `now()`.
    pub(crate) fn touch(&self) {
        if let Ok(mut ts) = self.timestamp.lock() {
            *ts = Some(Instant::now());
        } else {
            log::trace!("Unable to lock login timestamp, session will be renewed")
        }
    }

    pub(crate) fn clear(&self) {
        if let Ok(mut ts) = self.timestamp.lock() {
            *ts = None;
        }
    }

    /// Checks whether less than `timeout` elapsed since last `touch()`
    pub(crate) fn is_fresh(&self, timeout: std::time::Duration) -> bool {
        self.timestamp
            .lock()
            .ok()
            .and_then(|ts| ts.map(|t| t.elapsed()))
            .map(|elapsed| elapsed < timeout)
            .unwrap_or(false)
    }
}

#[derive(Debug)]
pub struct Client {
    api: model::Api,
    http: reqwest::Client,
    login: LoginState,
    contract: Mutex<Option<String>>,
}

impl Client {
    pub fn new(api: model::Api) -> Result<Client, Error> {
        let http = reqwest::ClientBuilder::new()
            .cookie_store(true)
            .default_headers(default_headers())
            .timeout(api.request_timeout)
            .build()
            .map_err(|e| Error::InternalError(e.to_string()))?;

        Ok(Client {
            contract: Mutex::new(api.contract.clone()),
            api,
            http,
            login: LoginState::default(),
        })
    }

    /// Currently selected contract, if any
    pub fn contract(&self) -> Option<String> {
        self.contract.lock().ok().and_then(|c| c.clone())
    }

    pub fn is_logged(&self) -> bool {
        self.login.is_fresh(self.api.session_timeout)
    }

    async fn request_bytes(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Vec<u8>, Error> {
        let url = format!("{}{}", self.api.base_url, endpoint);
        log::debug!("{} {}", method, url);

        let request = match body {
            Some(body) => self.http.request(method, url).json(body),
            None => self.http.request(method, url),
        };

        let response = request.send().await.map_err(map_api_err)?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            if status == http::StatusCode::UNAUTHORIZED || status == http::StatusCode::FORBIDDEN {
                self.login.clear();
            }
            return Err(map_status(status));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Error::ApiError(format!("Error reading portal response: {}", e)))
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T, Error> {
        let bytes = self.request_bytes(method, endpoint, body).await?;
        let text = String::from_utf8_lossy(&bytes);
        log::trace!("endpoint: {}, response: {}", endpoint, text);
        parse(&text)
    }

    /// Same as `request_json` for endpoints answering in ISO-8859-1
    async fn request_latin1<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, Error> {
        let bytes = self.request_bytes(Method::GET, endpoint, None).await?;
        let text = response::decode_latin1(&bytes);
        log::trace!("endpoint: {}, response: {}", endpoint, text);
        parse(&text)
    }

    /// Log in unless the current user session is still valid.
    async fn ensure_session(&self) -> Result<(), Error> {
        if self.api.auto_renew_session && !self.is_logged() {
            self.login().await?;
        }
        Ok(())
    }

    pub async fn login(&self) -> Result<(), Error> {
        let payload = serde_json::json!([
            self.api.username,
            self.api.password,
            "",
            "Android 6.0",
            "Móvil",
            "Chrome 119.0.0.0",
            "0",
            "",
            "s",
            ""
        ]);

        let response: Login = self
            .request_json(Method::POST, endpoint::LOGIN, Some(&payload))
            .await?;
        if !response.succeeded() {
            return Err(Error::LoginError(
                response
                    .message
                    .unwrap_or_else(|| "(no error message received)".to_string()),
            ));
        }

        self.login.touch();
        log::info!("successful authentication as '{}'", self.api.username);

        if let Some(contract) = self.contract() {
            self.set_contract(&contract).await?;
        }

        Ok(())
    }

    /// Extend the user session, returning the limits reported by the portal.
    pub async fn renew_session(&self) -> Result<SessionLimits, Error> {
        self.ensure_session().await?;

        let response: KeepSession = self
            .request_json(Method::GET, endpoint::KEEP_SESSION, None)
            .await?;
        match response.limits() {
            Some(limits) => {
                self.login.touch();
                Ok(limits)
            }
            None => {
                self.login.clear();
                Err(Error::NotLoggedIn)
            }
        }
    }

    /// Whether the meter power switch (ICP) is reachable for instant readings.
    pub async fn is_icp_ready(&self) -> Result<bool, Error> {
        self.ensure_session().await?;

        let response: Value = self
            .request_json(Method::POST, endpoint::ICP_STATUS, None)
            .await?;
        Ok(response.get("icp").and_then(Value::as_str) == Some("trueConectado"))
    }

    pub async fn contracts(&self) -> Result<Vec<Contract>, Error> {
        self.ensure_session().await?;

        let value: Value = self
            .request_json(Method::GET, endpoint::CONTRACTS, None)
            .await?;
        let contracts: GetContracts = serde_json::from_value(value.clone())
            .map_err(|e| Error::InvalidData(format!("{}: {}", e, value)))?;

        if !response::is_true(&contracts.success) {
            return Err(Error::CommandError(value.to_string()));
        }

        contracts
            .contratos
            .map(|contracts| contracts.into_iter().map(Contract::from).collect())
            .ok_or_else(|| Error::InvalidData(value.to_string()))
    }

    pub async fn contract_details(&self) -> Result<ContractDetails, Error> {
        self.ensure_session().await?;

        let value: Value = self
            .request_json(Method::GET, endpoint::CONTRACT_DETAILS, None)
            .await?;
        let response: GetContractDetails = serde_json::from_value(value.clone())
            .map_err(|e| Error::InvalidData(format!("{}: {}", e, value)))?;

        match response.code() {
            Some(_) => Ok(ContractDetails::from(response)),
            None => Err(Error::InvalidData(value.to_string())),
        }
    }

    pub async fn select_contract(&self, code: &str) -> Result<(), Error> {
        self.ensure_session().await?;
        self.set_contract(code).await
    }

    /* Called from `login`, must not go through `ensure_session` */
    async fn set_contract(&self, code: &str) -> Result<(), Error> {
        let value: Value = self
            .request_json(Method::GET, &endpoint::contract_selection(code), None)
            .await?;
        if !value.get("success").map(response::is_true).unwrap_or(false) {
            return Err(Error::InvalidContract(code.to_string()));
        }

        if let Ok(mut contract) = self.contract.lock() {
            *contract = Some(code.to_string());
        }
        log::info!("contract '{}' selected", code);
        Ok(())
    }

    /// Instant reading. The portal queries the meter remotely, this may take up to a minute.
    pub async fn measure(&self) -> Result<Measure, Error> {
        self.ensure_session().await?;

        log::debug!("Requesting data to the ICP, may take up to a minute.");
        let response: GetMeasure = self
            .request_json(Method::GET, endpoint::MEASURE, None)
            .await?;
        let measure = Measure::try_from(response)?;

        log::info!("ICP measure reading successful");
        Ok(measure)
    }

    /// Hourly consumption, restricted to periods within `[start, end]`.
    pub async fn historical_consumption(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HistoricalConsumption, Error> {
        self.ensure_session().await?;

        let (start, end) = (start.min(end), start.max(end));
        let response: GetConsumptionPeriod = self
            .request_latin1(&endpoint::consumption_period(start, end))
            .await?;

        let mut consumption = HistoricalConsumption::try_from(response)?;
        consumption.periods.retain(|p| p.period.within(start, end));
        Ok(consumption)
    }

    pub async fn historical_generation(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HistoricalGeneration, Error> {
        self.ensure_session().await?;

        let (start, end) = (start.min(end), start.max(end));
        let response: GetGenerationPeriod = self
            .request_latin1(&endpoint::generation_period(start, end))
            .await?;
        HistoricalGeneration::try_from(response)
    }

    /// Maximum power demands over the whole range the portal keeps.
    pub async fn historical_power_demand(&self) -> Result<HistoricalPowerDemand, Error> {
        self.ensure_session().await?;

        let limits: GetPowerDemandLimits = self
            .request_json(Method::GET, endpoint::POWER_DEMAND_LIMITS, None)
            .await?;
        if !limits.succeeded() {
            return Err(Error::CommandError(format!(
                "power demand limits: resultado={:?}",
                limits.resultado
            )));
        }

        let response: GetPowerDemandPeriod = self
            .request_json(
                Method::GET,
                &endpoint::power_demand_period(&limits.fec_min, &limits.fec_max),
                None,
            )
            .await?;
        HistoricalPowerDemand::try_from(response)
    }
}
