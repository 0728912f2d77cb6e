use crate::error::Error;
use crate::model::{
    Api, Contract, ContractDetails, HistoricalConsumption, HistoricalGeneration,
    HistoricalPowerDemand, Measure, SessionLimits,
};
use crate::{api, globalomnium, mock};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Ide,
    GlobalOmnium,
    Mock,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Ide => "ide",
            ProviderId::GlobalOmnium => "globalomnium",
            ProviderId::Mock => "mock",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::Ide, ProviderId::GlobalOmnium, ProviderId::Mock]
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            ProviderId::Ide => api::endpoint::BASE_URL,
            ProviderId::GlobalOmnium => globalomnium::endpoint::BASE_URL,
            ProviderId::Mock => "",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "ide" | "i-de" => Ok(ProviderId::Ide),
            "globalomnium" => Ok(ProviderId::GlobalOmnium),
            "mock" => Ok(ProviderId::Mock),
            _ => Err(format!(
                "Unknown provider '{}'. Supported providers: ide, globalomnium, mock.",
                value
            )),
        }
    }
}

/// Query surface shared by the portal clients.
///
/// Every query logs in first when the client has no valid user session (and automatic renewal
/// is enabled). Operations a portal does not offer fail with [`Error::Unsupported`].
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn login(&self) -> Result<(), Error>;

    async fn contracts(&self) -> Result<Vec<Contract>, Error>;

    async fn select_contract(&self, code: &str) -> Result<(), Error>;

    async fn measure(&self) -> Result<Measure, Error>;

    async fn historical_consumption(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HistoricalConsumption, Error>;

    async fn contract_details(&self) -> Result<ContractDetails, Error> {
        Err(Error::unsupported("contract details", self.name()))
    }

    async fn is_icp_ready(&self) -> Result<bool, Error> {
        Err(Error::unsupported("ICP status", self.name()))
    }

    async fn renew_session(&self) -> Result<SessionLimits, Error> {
        Err(Error::unsupported("session renewal", self.name()))
    }

    async fn historical_generation(
        &self,
        _start: NaiveDateTime,
        _end: NaiveDateTime,
    ) -> Result<HistoricalGeneration, Error> {
        Err(Error::unsupported("historical generation", self.name()))
    }

    async fn historical_power_demand(&self) -> Result<HistoricalPowerDemand, Error> {
        Err(Error::unsupported("historical power demand", self.name()))
    }
}

#[async_trait]
impl Provider for api::Client {
    fn name(&self) -> &'static str {
        ProviderId::Ide.as_str()
    }

    async fn login(&self) -> Result<(), Error> {
        api::Client::login(self).await
    }

    async fn contracts(&self) -> Result<Vec<Contract>, Error> {
        api::Client::contracts(self).await
    }

    async fn select_contract(&self, code: &str) -> Result<(), Error> {
        api::Client::select_contract(self, code).await
    }

    async fn measure(&self) -> Result<Measure, Error> {
        api::Client::measure(self).await
    }

    async fn historical_consumption(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HistoricalConsumption, Error> {
        api::Client::historical_consumption(self, start, end).await
    }

    async fn contract_details(&self) -> Result<ContractDetails, Error> {
        api::Client::contract_details(self).await
    }

    async fn is_icp_ready(&self) -> Result<bool, Error> {
        api::Client::is_icp_ready(self).await
    }

    async fn renew_session(&self) -> Result<SessionLimits, Error> {
        api::Client::renew_session(self).await
    }

    async fn historical_generation(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HistoricalGeneration, Error> {
        api::Client::historical_generation(self, start, end).await
    }

    async fn historical_power_demand(&self) -> Result<HistoricalPowerDemand, Error> {
        api::Client::historical_power_demand(self).await
    }
}

/// Construct the client for `id`.
pub fn from_api(id: ProviderId, api: Api) -> Result<Box<dyn Provider>, Error> {
    let boxed: Box<dyn Provider> = match id {
        ProviderId::Ide => Box::new(api::Client::new(api)?),
        ProviderId::GlobalOmnium => Box::new(globalomnium::Client::new(api)?),
        ProviderId::Mock => Box::new(mock::MockClient::new(api)),
    };

    Ok(boxed)
}
