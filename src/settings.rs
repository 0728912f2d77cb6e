use anyhow::{bail, Context};
use config::{Config, Environment, File, FileFormat};
use ideenergy::model::{Api, DEFAULT_SESSION_TIMEOUT};
use ideenergy::ProviderId;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const ENV_PREFIX: &str = "I_DE_ENERGY";
const DEFAULT_INTERVAL: i64 = 300;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    provider: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub contract: Option<String>,
    pub base_url: Option<String>,
    /// Seconds
    pub session_timeout: u64,
    pub auto_renew_session: bool,
    /// Minimum seconds between two metric collections
    pub interval: u64,
}

impl Settings {
    /// Layer defaults, `I_DE_ENERGY_*` environment, the credentials file and `overrides` (in
    /// increasing precedence).
    pub fn load(credentials: Option<&Path>, overrides: &[(&str, String)]) -> anyhow::Result<Settings> {
        Self::load_with_prefix(ENV_PREFIX, credentials, overrides)
    }

    fn load_with_prefix(
        prefix: &str,
        credentials: Option<&Path>,
        overrides: &[(&str, String)],
    ) -> anyhow::Result<Settings> {
        let mut settings = Config::default();
        settings
            .set_default("provider", ProviderId::Ide.as_str())?
            .set_default("session_timeout", DEFAULT_SESSION_TIMEOUT.as_secs() as i64)?
            .set_default("auto_renew_session", true)?
            .set_default("interval", DEFAULT_INTERVAL)?;

        settings.merge(Environment::with_prefix(prefix))?;

        if let Some(path) = credentials {
            let name = path
                .to_str()
                .with_context(|| format!("invalid credentials path {:?}", path))?;
            settings
                .merge(File::new(name, FileFormat::Json))
                .with_context(|| format!("unable to read credentials from {}", name))?;
        }

        for (key, value) in overrides {
            settings.set(key, value.as_str())?;
        }

        settings.try_into().context("Configuration error")
    }

    pub fn provider(&self) -> anyhow::Result<ProviderId> {
        self.provider.parse().map_err(anyhow::Error::msg)
    }

    /// Connection settings for the selected provider.
    pub fn api(&self) -> anyhow::Result<Api> {
        let provider = self.provider()?;
        let (username, password) = match (&self.username, &self.password) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                (username.clone(), password.clone())
            }
            _ if provider == ProviderId::Mock => (String::new(), String::new()),
            _ => bail!("Missing username or password"),
        };

        let base_url = self
            .base_url
            .clone()
            .unwrap_or_else(|| provider.base_url().to_string());

        let mut api = Api::new(base_url, username, password);
        api.contract = self.contract.clone();
        api.session_timeout = Duration::from_secs(self.session_timeout);
        api.auto_renew_session = self.auto_renew_session;
        Ok(api)
    }
}
