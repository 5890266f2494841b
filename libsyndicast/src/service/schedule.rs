//! Persistent daily schedule for the session refresh
//!
//! The next run time lives in the store, so whichever process drives the
//! ticks (the `synd-refresh` daemon, cron, a test) sees the same schedule,
//! and deactivation cancels it for all of them by deleting the marker.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ConfigError, Result, SyndicastError};
use crate::store::{keys, Store};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleState {
    NotScheduled,
    NotDue(DateTime<Utc>),
    Due,
}

pub struct RefreshSchedule {
    store: Arc<dyn Store>,
    interval: chrono::Duration,
}

impl RefreshSchedule {
    pub fn new(store: Arc<dyn Store>, interval: Duration) -> Result<Self> {
        let interval = chrono::Duration::from_std(interval).map_err(|e| {
            SyndicastError::InvalidInput(format!("refresh interval out of range: {}", e))
        })?;
        Ok(Self { store, interval })
    }

    pub async fn next_run(&self) -> Result<Option<DateTime<Utc>>> {
        let value = self.store.get_option(keys::REFRESH_NEXT_RUN).await?;
        Ok(value
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|ts| DateTime::from_timestamp(ts, 0)))
    }

    /// Schedule the first run at `now` unless a run is already scheduled
    pub async fn ensure_scheduled(&self, now: DateTime<Utc>) -> Result<bool> {
        if self.next_run().await?.is_some() {
            return Ok(false);
        }
        self.set_next_run(now).await?;
        Ok(true)
    }

    pub async fn cancel(&self) -> Result<()> {
        self.store.delete_option(keys::REFRESH_NEXT_RUN).await
    }

    pub async fn state(&self, now: DateTime<Utc>) -> Result<ScheduleState> {
        Ok(match self.next_run().await? {
            None => ScheduleState::NotScheduled,
            Some(next) if next > now => ScheduleState::NotDue(next),
            Some(_) => ScheduleState::Due,
        })
    }

    /// Move the next run one interval past `now`
    pub async fn advance(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let next = now
            .checked_add_signed(self.interval)
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "schedule.refresh_interval".to_string(),
                reason: format!("next run after {} is out of range", now),
            })?;
        self.set_next_run(next).await?;
        Ok(next)
    }

    async fn set_next_run(&self, at: DateTime<Utc>) -> Result<()> {
        self.store
            .set_option(keys::REFRESH_NEXT_RUN, &at.timestamp().to_string())
            .await
    }
}
