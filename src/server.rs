use crate::metrics;
use ideenergy::model::Measure;
use ideenergy::{Error, Provider};
use rocket::http::ContentType;
use rocket::State;
use std::sync::Mutex;
use std::time::Instant;

/// Structure containing state for API handlers.
pub struct StateData {
    provider: Box<dyn Provider>,
    contract: String,
    interval: u64,
    /// Timestamp of last successful metric collection via `metrics::collect()`
    timestamp: Mutex<Option<Instant>>,
    measure: Mutex<Option<Measure>>,
}

impl StateData {
    pub fn new(provider: Box<dyn Provider>, contract: String, interval: u64) -> Self {
        StateData {
            provider,
            contract,
            interval,
            timestamp: Mutex::new(None),
            measure: Mutex::new(None),
        }
    }

    /// Updates `timestamp` to `now()`.
    fn touch(&self) {
        if let Ok(mut ts) = self.timestamp.lock() {
            *ts = Some(Instant::now());
        } else {
            log::trace!("Unable to lock collection timestamp, will collect again")
        }
    }

    /// Whether a new measure is due: nothing collected yet, or more than `interval` seconds since
    /// the last `touch()`.
    fn interval_elapsed(&self) -> bool {
        self.timestamp
            .lock()
            .ok()
            .and_then(|ts| ts.map(|t| t.elapsed().as_secs()))
            .map(|elapsed| elapsed > self.interval)
            .unwrap_or(true)
    }

    fn last_measure(&self) -> Option<Measure> {
        self.measure.lock().ok().and_then(|m| *m)
    }

    /// Collect a new measure unless the interval has not elapsed yet.
    async fn refresh(&self) -> Result<Measure, Error> {
        if self.interval_elapsed() {
            let measure = metrics::collect(self.provider.as_ref(), &self.contract).await?;
            if let Ok(mut last) = self.measure.lock() {
                *last = Some(measure);
            }
            self.touch();
            return Ok(measure);
        }

        log::info!("interval time not yet elapsed since last run; returning cached result");
        self.last_measure()
            .ok_or_else(|| Error::InternalError("no cached measure".to_string()))
    }
}

#[get("/metrics")]
async fn metrics_route(state: &State<StateData>) -> Result<String, Error> {
    state.refresh().await?;
    metrics::read()
}

#[get("/measure")]
async fn measure_route(state: &State<StateData>) -> Result<(ContentType, String), Error> {
    let measure = state.refresh().await?;
    let body = serde_json::to_string(&measure).or(Err(Error::FormatError))?;
    Ok((ContentType::JSON, body))
}

pub async fn serve(state: StateData) -> anyhow::Result<()> {
    rocket::build()
        .manage(state)
        .mount("/", routes![metrics_route, measure_route])
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("server error: {}", e))?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::StateData;
    use ideenergy::model::Api;
    use ideenergy::{provider, ProviderId};

    fn state(interval: u64) -> StateData {
        let mock = provider::from_api(ProviderId::Mock, Api::new("", "", "")).unwrap();
        StateData::new(mock, "123456789".to_string(), interval)
    }

    #[test]
    fn interval_elapsed_without_collection() {
        assert!(state(300).interval_elapsed());
    }

    #[tokio::test]
    async fn cached_measure_within_interval() {
        let state = state(300);
        let first = state.refresh().await.unwrap();
        assert!(!state.interval_elapsed());

        let second = state.refresh().await.unwrap();
        assert_eq!(first, second);
    }
}
