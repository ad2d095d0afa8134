//! Structured events emitted by the engine on every state transition.
//!
//! The surrounding CRUD layer owns activity feeds and notifications; the
//! engine itself performs neither. It records events instead, and the
//! outer layer consumes them to build its feed. Events are persisted in
//! the same transaction as the state change they describe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{EmployeeId, LeadId};

/// A structured event emitted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence number. Consumers can detect gaps.
    pub seq: u64,
    /// When this event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub kind: EventKind,
}

/// Why a lead could not be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    /// No eligible employee in the partition has spare capacity.
    NoCapacity,
    /// The lead carries no partition key; manual intervention required.
    NoPartition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    LeadCreated {
        id: LeadId,
        language: String,
        source: String,
    },
    LeadAssigned {
        lead_id: LeadId,
        employee_id: EmployeeId,
        language: String,
    },
    LeadLeftUnassigned {
        lead_id: LeadId,
        language: String,
        reason: UnassignedReason,
    },
    LeadClosed {
        lead_id: LeadId,
        employee_id: EmployeeId,
    },
    EmployeeAdded {
        id: EmployeeId,
        employee_code: String,
        language: String,
    },
    EmployeeLanguageChanged {
        id: EmployeeId,
        from: String,
        to: String,
    },
    EmployeeRemoved {
        id: EmployeeId,
        /// Ongoing leads returned to the unassigned pool by the cascade.
        orphaned_leads: Vec<LeadId>,
    },
    SweepCompleted {
        language: String,
        assigned: u32,
    },
    /// Forward-compat: an event recorded by a newer version of the
    /// schema that this build cannot parse.
    Unknown {
        raw: String,
    },
}
