use crate::model::SessionLimits;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/*
 * Logged in:     {"total": "900", "usSes": "12345678901X12", "aviso": "15"}
 * Not logged in: {"usSes": ""}
 */
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeepSession {
    #[serde(default)]
    pub total: Value,
    #[serde(default)]
    pub us_ses: String,
    #[serde(default)]
    pub aviso: Value,
}

impl KeepSession {
    /// `None` when the portal no longer recognizes the session
    pub fn limits(self) -> Option<SessionLimits> {
        if self.us_ses.trim().is_empty() {
            return None;
        }

        Some(SessionLimits {
            total: Duration::from_secs(super::as_u64(&self.total).unwrap_or(0)),
            warning: Duration::from_secs(super::as_u64(&self.aviso).unwrap_or(0)),
            user_session: self.us_ses,
        })
    }
}

#[cfg(test)]
mod test {
    use super::KeepSession;
    use std::time::Duration;

    #[test]
    fn active_session() {
        let output: KeepSession = serde_json::from_str(
            r#"{"total": "900", "usSes": "12345678901X12", "aviso": "15"}"#,
        )
        .unwrap();
        let limits = output.limits().unwrap();
        assert_eq!(Duration::from_secs(900), limits.total);
        assert_eq!(Duration::from_secs(15), limits.warning);
        assert_eq!("12345678901X12", limits.user_session);
    }

    #[test]
    fn expired_session() {
        let output: KeepSession = serde_json::from_str(r#"{"usSes": ""}"#).unwrap();
        assert!(output.limits().is_none());
    }
}
