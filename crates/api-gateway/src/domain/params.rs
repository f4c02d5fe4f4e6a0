//! Site parameters and general settings.
//!
//! The header banner ("closed today until 14:00") may carry a deadline after
//! which it disappears on its own. A background ticker clears expired
//! headers; reads hide them even before the ticker gets there.

use crate::domain::error::ServiceError;
use crate::ports::outbound::ParamsRepository;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Keys accepted by [`ParamsService::upsert_setting`].
pub const SETTING_KEYS: [&str; 2] = ["menu", "background"];

/// How often the runtime checks for an expired header.
pub const HEADER_EXPIRY_INTERVAL: Duration = Duration::from_secs(60);

/// Public site parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteParams {
    pub header_text: Option<String>,
    pub header_deadline: Option<DateTime<Utc>>,
}

impl SiteParams {
    fn header_expired(&self, now: DateTime<Utc>) -> bool {
        self.header_deadline.is_some_and(|deadline| deadline <= now)
    }
}

/// Body of `PUT /api/admin/params/header`. Blank text clears the header.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderInput {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct ParamsService {
    repo: Arc<dyn ParamsRepository>,
}

impl ParamsService {
    pub fn new(repo: Arc<dyn ParamsRepository>) -> Self {
        Self { repo }
    }

    /// Current parameters with an expired header already hidden.
    pub async fn get(&self) -> Result<SiteParams, ServiceError> {
        let params = self.repo.params().await?;
        if params.header_expired(Utc::now()) {
            return Ok(SiteParams::default());
        }
        Ok(params)
    }

    #[instrument(skip(self, input))]
    pub async fn set_header(&self, input: HeaderInput) -> Result<SiteParams, ServiceError> {
        let text = input
            .text
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());
        if let Some(deadline) = input.deadline {
            if text.is_none() {
                return Err(ServiceError::Validation(
                    "deadline given without header text".into(),
                ));
            }
            if deadline <= Utc::now() {
                return Err(ServiceError::Validation(format!(
                    "deadline {deadline} is in the past"
                )));
            }
        }

        let params = SiteParams {
            header_text: text,
            header_deadline: input.deadline,
        };
        self.repo.set_params(params.clone()).await?;
        info!(
            has_text = params.header_text.is_some(),
            deadline = ?params.header_deadline,
            "Header updated"
        );
        Ok(params)
    }

    /// Clear the header if its deadline is at or before `now`.
    pub async fn clear_expired_header(&self, now: DateTime<Utc>) -> Result<bool, ServiceError> {
        let cleared = self.repo.clear_header_before(now).await?;
        if cleared {
            info!("Header was reset on deadline");
        }
        Ok(cleared)
    }

    /// Clear expired headers every `every` until `shutdown` fires.
    pub async fn run_header_expiry(self, every: Duration, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.clear_expired_header(Utc::now()).await {
                        warn!(error = %e, "Header expiry check failed");
                    }
                }
            }
        }
        debug!("Header expiry stopped");
    }

    pub async fn get_setting(&self, key: &str) -> Result<serde_json::Value, ServiceError> {
        check_setting_key(key)?;
        self.repo
            .setting(key)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("setting {key}")))
    }

    #[instrument(skip(self, value))]
    pub async fn upsert_setting(
        &self,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), ServiceError> {
        check_setting_key(key)?;
        self.repo.set_setting(key.to_string(), value).await?;
        info!("Setting stored");
        Ok(())
    }
}

fn check_setting_key(key: &str) -> Result<(), ServiceError> {
    if SETTING_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "unknown setting {key:?}, expected one of {SETTING_KEYS:?}"
        )))
    }
}
