//! Provider returning canned data, for testing front-ends without portal credentials.

use crate::api::LoginState;
use crate::error::Error;
use crate::model::{
    self, ConsumptionForPeriod, Contract, ContractDetails, HistoricalConsumption, Measure, Meter,
    PeriodValue, SessionLimits,
};
use crate::provider::{Provider, ProviderId};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

const CONTRACT_CODE: &str = "123456789";
const CUPS: &str = "ES0021000000000000AA0F";
const USER_SESSION: &str = "12345678901X12";

#[derive(Debug)]
pub struct MockClient {
    api: model::Api,
    login: LoginState,
    contract: Mutex<Option<String>>,
}

impl MockClient {
    pub fn new(api: model::Api) -> MockClient {
        MockClient {
            contract: Mutex::new(api.contract.clone()),
            api,
            login: LoginState::default(),
        }
    }

    pub fn contract(&self) -> Option<String> {
        self.contract.lock().ok().and_then(|c| c.clone())
    }

    pub fn is_logged(&self) -> bool {
        self.login.is_fresh(self.api.session_timeout)
    }

    fn sample_contracts() -> Vec<Contract> {
        vec![
            Contract {
                code: CONTRACT_CODE.to_string(),
                cups: Some(CUPS.to_string()),
                address: "C/ Mayor, 1 46001-valencia".to_string(),
                status: "CONTRATADO".to_string(),
                active: true,
            },
            Contract {
                code: "987654321".to_string(),
                cups: None,
                address: "Avda. Del Puerto, 20 46021-valencia".to_string(),
                status: "BAJA".to_string(),
                active: false,
            },
        ]
    }

    /// Log in unless the current user session is still valid.
    async fn ensure_session(&self) -> Result<(), Error> {
        if self.api.auto_renew_session && !self.is_logged() {
            Provider::login(self).await?;
        }
        Ok(())
    }

    fn set_contract(&self, code: &str) -> Result<(), Error> {
        if !Self::sample_contracts().iter().any(|c| c.code == code) {
            return Err(Error::InvalidContract(code.to_string()));
        }
        if let Ok(mut contract) = self.contract.lock() {
            *contract = Some(code.to_string());
        }
        Ok(())
    }
}

/// Stable seed for the `[start, end)` range.
fn seed(start: NaiveDateTime, end: NaiveDateTime) -> u64 {
    let mut hasher = DefaultHasher::new();
    (start, end).hash(&mut hasher);
    hasher.finish()
}

#[async_trait]
impl Provider for MockClient {
    fn name(&self) -> &'static str {
        ProviderId::Mock.as_str()
    }

    async fn login(&self) -> Result<(), Error> {
        self.login.touch();
        log::info!("mock authentication as '{}'", self.api.username);
        if let Some(contract) = self.contract() {
            self.set_contract(&contract)?;
        }
        Ok(())
    }

    async fn contracts(&self) -> Result<Vec<Contract>, Error> {
        self.ensure_session().await?;
        Ok(Self::sample_contracts())
    }

    async fn select_contract(&self, code: &str) -> Result<(), Error> {
        self.ensure_session().await?;
        self.set_contract(code)
    }

    async fn measure(&self) -> Result<Measure, Error> {
        self.ensure_session().await?;
        let mut rng = rand::thread_rng();
        Ok(Measure {
            accumulate: rng.gen_range(0..5000),
            instant: rng.gen_range(0.0..500.0),
        })
    }

    async fn historical_consumption(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HistoricalConsumption, Error> {
        self.ensure_session().await?;
        let mut rng = StdRng::seed_from_u64(seed(start, end));

        let mut periods = Vec::new();
        let mut current = start;
        while current < end {
            periods.push(ConsumptionForPeriod {
                period: PeriodValue::hourly(current, rng.gen_range(0..1000) as f64),
                desglosed: Default::default(),
            });
            current += Duration::hours(1);
        }

        Ok(HistoricalConsumption {
            total: periods.iter().map(|p| p.period.value).sum(),
            periods,
            desglosed: Default::default(),
        })
    }

    async fn contract_details(&self) -> Result<ContractDetails, Error> {
        self.ensure_session().await?;
        let code = self
            .contract()
            .unwrap_or_else(|| CONTRACT_CODE.to_string());

        Ok(ContractDetails {
            code,
            cups: CUPS.to_string(),
            customer: "000000000".to_string(),
            holder: "Jane Doe".to_string(),
            address: "C/ Mayor, 1 46001-valencia".to_string(),
            tariff: "2.0TD".to_string(),
            max_power: 4600.0,
            self_consumption: false,
            meters: vec![Meter {
                serial: "000000000000".to_string(),
                brand: "ZIV".to_string(),
                kind: "Telegestionado".to_string(),
                owner: "i-DE".to_string(),
                installed: Some("2015-06-01".to_string()),
            }],
        })
    }

    async fn is_icp_ready(&self) -> Result<bool, Error> {
        self.ensure_session().await?;
        Ok(true)
    }

    async fn renew_session(&self) -> Result<SessionLimits, Error> {
        self.login.touch();
        Ok(SessionLimits {
            total: std::time::Duration::from_secs(900),
            warning: std::time::Duration::from_secs(15),
            user_session: USER_SESSION.to_string(),
        })
    }
}
