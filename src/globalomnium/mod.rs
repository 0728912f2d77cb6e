//! Client for the Global Omnium (Aguas de Valencia) virtual office.
//!
//! Unlike i-DE the virtual office is a regular web application: requests are form encoded and
//! both instant and historical readings come from the same hourly readings table.

pub mod endpoint;
pub mod response;

use crate::api::{map_api_err, map_status, parse, LoginState};
use crate::error::Error;
use crate::model::{self, Contract, HistoricalConsumption, Measure};
use crate::provider::{Provider, ProviderId};
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDateTime};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::RequestBuilder;
use response::{GetHourlyReadings, GetSupplies, Login};
use serde::de::DeserializeOwned;
use std::sync::Mutex;

const DATE_FORMAT: &str = "%d/%m/%Y";

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("ideenergy/", env!("CARGO_PKG_VERSION"))),
    );
    headers
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

    pub fn contract(&self) -> Option<String> {
        self.contract.lock().ok().and_then(|c| c.clone())
    }

    pub fn is_logged(&self) -> bool {
        self.login.is_fresh(self.api.session_timeout)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.api.base_url, endpoint)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, Error> {
        let response = request.send().await.map_err(map_api_err)?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            if status == http::StatusCode::UNAUTHORIZED || status == http::StatusCode::FORBIDDEN {
                self.login.clear();
            }
            return Err(map_status(status));
        }

        let text = response
            .text()
            .await
            .map_err(|e| Error::ApiError(format!("Error reading portal response: {}", e)))?;
        log::trace!("response: {}", text);
        parse(&text)
    }

    async fn ensure_session(&self) -> Result<(), Error> {
        if self.api.auto_renew_session && !self.is_logged() {
            self.login().await?;
        }
        Ok(())
    }

    pub async fn login(&self) -> Result<(), Error> {
        let form = [
            ("login", self.api.username.as_str()),
            ("pass", self.api.password.as_str()),
            ("remember", "true"),
            ("suministro", ""),
        ];

        let response: Login = self
            .send(self.http.post(self.url(endpoint::LOGIN)).form(&form))
            .await?;
        if !response.succeeded() {
            return Err(Error::LoginError(
                response
                    .error
                    .filter(|e| !e.is_empty())
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

    pub async fn contracts(&self) -> Result<Vec<Contract>, Error> {
        self.ensure_session().await?;

        let timestamp = Local::now().timestamp_millis().to_string();
        let supplies: GetSupplies = self
            .send(
                self.http
                    .get(self.url(endpoint::CONTRACTS))
                    .query(&[("order", "asc"), ("_", timestamp.as_str())]),
            )
            .await?;
        if supplies.failed() {
            return Err(Error::CommandError("supplies listing".to_string()));
        }

        supplies
            .data
            .map(|data| data.into_iter().map(Contract::from).collect())
            .ok_or_else(|| Error::InvalidData("missing supplies list".to_string()))
    }

    pub async fn select_contract(&self, code: &str) -> Result<(), Error> {
        self.ensure_session().await?;
        self.set_contract(code).await
    }

    async fn set_contract(&self, code: &str) -> Result<(), Error> {
        let response: Login = self
            .send(
                self.http
                    .post(self.url(endpoint::CONTRACT_SELECTION))
                    .form(&[("suministro", code)]),
            )
            .await?;
        if !response.succeeded() {
            return Err(Error::InvalidContract(code.to_string()));
        }

        if let Ok(mut contract) = self.contract.lock() {
            *contract = Some(code.to_string());
        }
        log::info!("supply '{}' selected", code);
        Ok(())
    }

    async fn hourly_readings(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<GetHourlyReadings, Error> {
        self.ensure_session().await?;

        let start = start.format(DATE_FORMAT).to_string();
        let end = end.format(DATE_FORMAT).to_string();
        let readings: GetHourlyReadings = self
            .send(
                self.http
                    .get(self.url(endpoint::HOURLY_READINGS))
                    .query(&[("start", start.as_str()), ("end", end.as_str())]),
            )
            .await?;

        if !readings.succeeded() {
            return Err(Error::CommandError(format!(
                "hourly readings from {} to {}",
                start, end
            )));
        }
        Ok(readings)
    }

    /// Latest hourly reading between yesterday and today.
    pub async fn measure(&self) -> Result<Measure, Error> {
        let today = Local::now().naive_local();
        let readings = self
            .hourly_readings(today - Duration::days(1), today)
            .await?;

        let measure = readings
            .measure()
            .ok_or_else(|| Error::InvalidData("no meter reading available".to_string()))?;
        log::info!("meter reading successful");
        Ok(measure)
    }

    pub async fn historical_consumption(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HistoricalConsumption, Error> {
        let (start, end) = (start.min(end), start.max(end));
        let readings = self.hourly_readings(start, end).await?;

        let periods: Vec<_> = readings
            .periods()
            .into_iter()
            .filter(|p| p.period.within(start, end))
            .collect();

        Ok(HistoricalConsumption {
            total: periods.iter().map(|p| p.period.value).sum(),
            periods,
            desglosed: Default::default(),
        })
    }
}

#[async_trait]
impl Provider for Client {
    fn name(&self) -> &'static str {
        ProviderId::GlobalOmnium.as_str()
    }

    async fn login(&self) -> Result<(), Error> {
        Client::login(self).await
    }

    async fn contracts(&self) -> Result<Vec<Contract>, Error> {
        Client::contracts(self).await
    }

    async fn select_contract(&self, code: &str) -> Result<(), Error> {
        Client::select_contract(self, code).await
    }

    async fn measure(&self) -> Result<Measure, Error> {
        Client::measure(self).await
    }

    async fn historical_consumption(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HistoricalConsumption, Error> {
        Client::historical_consumption(self, start, end).await
    }
}

#[cfg(test)]
mod test {
    use super::{endpoint, Client};
    use crate::api::response::read_resource;
    use crate::error::Error;
    use crate::model::Api;
    use chrono::NaiveDate;
    use mockito::{Matcher, Server, ServerGuard};

    fn client(server: &ServerGuard) -> Client {
        Client::new(Api::new(server.url(), "user@example.com", "secret")).unwrap()
    }

    async fn mock_login(server: &mut ServerGuard) -> mockito::Mock {
        server
            .mock("POST", endpoint::LOGIN)
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("login".into(), "user@example.com".into()),
                Matcher::UrlEncoded("pass".into(), "secret".into()),
                Matcher::UrlEncoded("remember".into(), "true".into()),
            ]))
            .with_status(200)
            .with_header("set-cookie", "ASP.NET_SessionId=abcdef; Path=/")
            .with_body(read_resource("go-login-ok.json"))
            .create_async()
            .await
    }

    #[tokio::test]
    async fn login_ok() {
        let mut server = Server::new_async().await;
        let login = mock_login(&mut server).await;

        let client = client(&server);
        client.login().await.unwrap();
        assert!(client.is_logged());
        login.assert_async().await;
    }

    #[tokio::test]
    async fn login_rejected() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", endpoint::LOGIN)
            .with_status(200)
            .with_body(read_resource("go-login-failed.json"))
            .create_async()
            .await;

        match client(&server).login().await {
            Err(Error::LoginError(message)) => assert!(message.contains("incorrectos")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn contracts() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        server
            .mock("GET", endpoint::CONTRACTS)
            .match_query(Matcher::UrlEncoded("order".into(), "asc".into()))
            .with_status(200)
            .with_body(read_resource("go-contracts.json"))
            .create_async()
            .await;

        let contracts = client(&server).contracts().await.unwrap();
        assert_eq!(1, contracts.len());
        assert_eq!("00000000/000", contracts[0].code);
    }

    #[tokio::test]
    async fn select_contract() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        server
            .mock("POST", endpoint::CONTRACT_SELECTION)
            .match_body(Matcher::UrlEncoded("suministro".into(), "00000000/000".into()))
            .with_status(200)
            .with_body(r#"{"result": true}"#)
            .create_async()
            .await;

        let client = client(&server);
        client.select_contract("00000000/000").await.unwrap();
        assert_eq!(Some("00000000/000".to_string()), client.contract());
    }

    #[tokio::test]
    async fn contracts_not_successful() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        server
            .mock("GET", endpoint::CONTRACTS)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"result": false, "data": []}"#)
            .create_async()
            .await;

        assert!(matches!(
            client(&server).contracts().await,
            Err(Error::CommandError(_))
        ));
    }

    #[tokio::test]
    async fn invalid_contract() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        server
            .mock("POST", endpoint::CONTRACT_SELECTION)
            .with_status(200)
            .with_body(r#"{"result": false, "error": "suministro no válido"}"#)
            .create_async()
            .await;

        let client = client(&server);
        match client.select_contract("000").await {
            Err(Error::InvalidContract(code)) => assert_eq!("000", code),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(None, client.contract());
    }

    #[tokio::test]
    async fn readings_not_successful() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        server
            .mock("GET", endpoint::HOURLY_READINGS)
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"result": false, "table": []}"#)
            .create_async()
            .await;

        assert!(matches!(
            client(&server).measure().await,
            Err(Error::CommandError(_))
        ));
    }

    #[tokio::test]
    async fn measure() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        server
            .mock("GET", endpoint::HOURLY_READINGS)
            .match_query(Matcher::Any)
            .match_header("cookie", Matcher::Regex("ASP.NET_SessionId=abcdef".to_string()))
            .with_status(200)
            .with_body(read_resource("go-readings.json"))
            .create_async()
            .await;

        let measure = client(&server).measure().await.unwrap();
        assert_eq!(160697, measure.accumulate);
        assert_eq!(12.0, measure.instant);
    }

    #[tokio::test]
    async fn historical_consumption() {
        let mut server = Server::new_async().await;
        mock_login(&mut server).await;
        server
            .mock("GET", endpoint::HOURLY_READINGS)
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("start".into(), "22/12/2023".into()),
                Matcher::UrlEncoded("end".into(), "23/12/2023".into()),
            ]))
            .with_status(200)
            .with_body(read_resource("go-readings.json"))
            .create_async()
            .await;

        let day = NaiveDate::from_ymd_opt(2023, 12, 22).unwrap();
        let output = client(&server)
            .historical_consumption(
                day.and_hms_opt(0, 0, 0).unwrap(),
                day.succ_opt().unwrap().and_hms_opt(0, 0, 0).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(3, output.periods.len());
        assert_eq!(13.0, output.total);
    }
}
