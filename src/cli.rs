use crate::mqtt;
use crate::server::{self, StateData};
use crate::settings::Settings;
use anyhow::Context;
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use clap::{Parser, Subcommand};
use ideenergy::{provider, Error, Provider, ProviderId};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;

const RETRY_DELAY: std::time::Duration = std::time::Duration::from_millis(500);

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "ideenergy",
    version,
    about = "Query the i-DE and Global Omnium customer portals"
)]
pub struct Cli {
    #[arg(short, long)]
    username: Option<String>,

    #[arg(short, long)]
    password: Option<String>,

    /// JSON file with `username` and `password` keys.
    #[arg(long)]
    credentials: Option<PathBuf>,

    /// ide, globalomnium or mock.
    #[arg(long)]
    provider: Option<ProviderId>,

    /// Contract selected after login.
    #[arg(long)]
    contract: Option<String>,

    /// Attempts per request, with exponential back-off between them.
    #[arg(long, default_value_t = 1)]
    retries: u32,

    /// Override the portal URL.
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the contracts of the account.
    Contracts,
    /// Details of the selected contract.
    ContractDetails,
    /// Whether the ICP is ready to be read.
    IcpStatus,
    /// Read the meter.
    Measure,
    /// Extend the user session.
    RenewSession,
    /// Hourly consumption of the last days.
    Consumption {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Hourly generation of the last days.
    Generation {
        #[arg(long, default_value_t = 7)]
        days: i64,
    },
    /// Monthly power demand peaks.
    PowerDemand,
    /// Read the meter and publish it to an MQTT broker.
    Publish {
        #[arg(long)]
        host: String,
        #[arg(long, default_value_t = 1883)]
        port: u16,
        #[arg(long, default_value = "ideenergy")]
        topic: String,
    },
    /// Run the Prometheus exporter.
    Serve {
        /// Minimum seconds between two meter readings.
        #[arg(long)]
        interval: Option<u64>,
    },
}

/// Run `request_fn` up to `attempts` times, doubling the delay between attempts.
async fn with_retries<T, F, Fut>(attempts: u32, mut request_fn: F) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;
    let mut delay = RETRY_DELAY;

    loop {
        attempt += 1;
        match request_fn().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(e) => {
                log::warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                    attempt,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
        }
    }
}

async fn query<T, F, Fut>(attempts: u32, request_fn: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    with_retries(attempts, request_fn)
        .await
        .context("Request failed")
}

fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// `[today 00:00 - days, today 00:00]`
fn day_range(today: NaiveDate, days: i64) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let end = today.and_hms_opt(0, 0, 0)?;
    let start = end.checked_sub_signed(Duration::try_days(days)?)?;
    Some((start, end))
}

fn last_days(days: i64) -> anyhow::Result<(NaiveDateTime, NaiveDateTime)> {
    day_range(Local::now().date_naive(), days).context("invalid date range")
}

impl Cli {
    /// Flags given on the command line, as configuration keys.
    fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        if let Some(username) = &self.username {
            overrides.push(("username", username.clone()));
        }
        if let Some(password) = &self.password {
            overrides.push(("password", password.clone()));
        }
        if let Some(provider) = self.provider {
            overrides.push(("provider", provider.to_string()));
        }
        if let Some(contract) = &self.contract {
            overrides.push(("contract", contract.clone()));
        }
        if let Some(base_url) = &self.base_url {
            overrides.push(("base_url", base_url.clone()));
        }
        overrides
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let settings = Settings::load(self.credentials.as_deref(), &self.overrides())?;
        let boxed = provider::from_api(settings.provider()?, settings.api()?)?;
        let attempts = self.retries.max(1);

        if let Command::Serve { interval } = self.command {
            let state = StateData::new(
                boxed,
                settings.contract.clone().unwrap_or_default(),
                interval.unwrap_or(settings.interval),
            );
            return server::serve(state).await;
        }

        let provider: &dyn Provider = boxed.as_ref();
        query(attempts, || provider.login()).await?;

        match self.command {
            Command::Contracts => print(&query(attempts, || provider.contracts()).await?),
            Command::ContractDetails => {
                print(&query(attempts, || provider.contract_details()).await?)
            }
            Command::IcpStatus => print(&query(attempts, || provider.is_icp_ready()).await?),
            Command::Measure => print(&query(attempts, || provider.measure()).await?),
            Command::RenewSession => print(&query(attempts, || provider.renew_session()).await?),
            Command::Consumption { days } => {
                let (start, end) = last_days(days)?;
                print(&query(attempts, || provider.historical_consumption(start, end)).await?)
            }
            Command::Generation { days } => {
                let (start, end) = last_days(days)?;
                print(&query(attempts, || provider.historical_generation(start, end)).await?)
            }
            Command::PowerDemand => {
                print(&query(attempts, || provider.historical_power_demand()).await?)
            }
            Command::Publish { host, port, topic } => {
                let measure = query(attempts, || provider.measure()).await?;
                mqtt::publish(&host, port, &topic, &measure).await
            }
            Command::Serve { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{day_range, with_retries, Cli, Command};
    use chrono::NaiveDate;
    use clap::Parser;
    use ideenergy::{Error, ProviderId};

    #[test]
    fn parse_global_options() {
        let cli = Cli::try_parse_from([
            "ideenergy",
            "-u",
            "user@example.com",
            "-p",
            "secret",
            "--provider",
            "globalomnium",
            "consumption",
            "--days",
            "3",
        ])
        .unwrap();

        assert_eq!(Some(ProviderId::GlobalOmnium), cli.provider);
        assert_eq!(1, cli.retries);
        assert!(matches!(cli.command, Command::Consumption { days: 3 }));
        assert_eq!(
            vec![
                ("username", "user@example.com".to_string()),
                ("password", "secret".to_string()),
                ("provider", "globalomnium".to_string()),
            ],
            cli.overrides()
        );
    }

    #[test]
    fn parse_publish_defaults() {
        let cli = Cli::try_parse_from(["ideenergy", "publish", "--host", "broker"]).unwrap();
        match cli.command {
            Command::Publish { host, port, topic } => {
                assert_eq!("broker", host);
                assert_eq!(1883, port);
                assert_eq!("ideenergy", topic);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn unknown_provider_rejected() {
        assert!(Cli::try_parse_from(["ideenergy", "--provider", "endesa", "measure"]).is_err());
    }

    #[test]
    fn last_week() {
        let today = NaiveDate::from_ymd_opt(2022, 8, 21).unwrap();
        let (start, end) = day_range(today, 7).unwrap();
        assert_eq!(
            NaiveDate::from_ymd_opt(2022, 8, 14).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            start
        );
        assert_eq!(today.and_hms_opt(0, 0, 0).unwrap(), end);
    }

    #[test]
    fn out_of_range_days() {
        let today = NaiveDate::from_ymd_opt(2022, 8, 21).unwrap();
        assert_eq!(None, day_range(today, 100_000_000));
        assert_eq!(None, day_range(today, i64::MAX));
    }

    #[tokio::test]
    async fn retries_until_success() {
        let mut calls = 0;
        let output = with_retries(3, || {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt < 2 {
                    Err(Error::ApiError("timeout".to_string()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(2, output.unwrap());
    }

    #[tokio::test]
    async fn single_attempt() {
        let mut calls = 0;
        let output: Result<(), Error> = with_retries(1, || {
            calls += 1;
            async { Err(Error::NotLoggedIn) }
        })
        .await;

        assert!(matches!(output, Err(Error::NotLoggedIn)));
        assert_eq!(1, calls);
    }
}
