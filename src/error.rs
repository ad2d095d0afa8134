//! Error types for leadrota.
//!
//! Capacity exhaustion and empty partition keys are not errors; `assign`
//! reports those as `Ok(None)`. Only genuine failures land here.

use thiserror::Error;

use chrono::{DateTime, Utc};

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("lead {lead_id} is scheduled for {scheduled_for} and cannot be closed yet")]
    ScheduledAhead {
        lead_id: crate::model::LeadId,
        scheduled_for: DateTime<Utc>,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
