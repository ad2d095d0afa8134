//! Core data model.
//!
//! An employee is a capacity participant: they belong to one language
//! partition and hold at most `threshold` open leads at a time. A lead is
//! the unit of work routed to exactly one employee. The partition cursor
//! remembers who received the last lead in each partition so ties among
//! equally-loaded employees rotate fairly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum simultaneously open leads per employee unless overridden.
pub const DEFAULT_THRESHOLD: usize = 3;

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Newtype for employee IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmployeeId(pub Uuid);

impl EmployeeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for EmployeeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Newtype for lead IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub Uuid);

impl LeadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Employee
// ---------------------------------------------------------------------------

/// A capacity participant in one language partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    /// Unique identifier.
    pub id: EmployeeId,

    /// Human-readable code (e.g. "EMP-0042"). Unique; the deterministic
    /// secondary tie-break key for candidate ordering.
    pub employee_code: String,

    pub first_name: String,
    pub last_name: String,
    pub email: String,

    /// Free-form office/region label. Not read by the engine.
    pub location: String,

    /// Partition key. Empty means unpartitioned: never eligible for
    /// automatic assignment.
    pub language: String,

    /// Leads currently open and owned by this employee. The length of
    /// this set is the employee's load.
    pub ongoing_lead_ids: Vec<LeadId>,

    /// Lifetime count of leads this employee has closed. Informational;
    /// the selection algorithm never reads it.
    pub closed_leads_count: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    /// Current number of open leads.
    pub fn load(&self) -> usize {
        self.ongoing_lead_ids.len()
    }

    /// Can this employee take one more lead under the given threshold?
    pub fn has_capacity(&self, threshold: usize) -> bool {
        !self.language.is_empty() && self.load() < threshold
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Lead
// ---------------------------------------------------------------------------

/// Lifecycle state of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// Open. Only ongoing leads without an owner are assignment candidates.
    Ongoing,
    /// Done. Terminal.
    Closed,
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LeadStatus::Ongoing => "ongoing",
            LeadStatus::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Sales temperature. Display/triage only; never read by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadTemperature {
    Hot,
    Warm,
    Cold,
}

impl std::fmt::Display for LeadTemperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LeadTemperature::Hot => "hot",
            LeadTemperature::Warm => "warm",
            LeadTemperature::Cold => "cold",
        };
        write!(f, "{s}")
    }
}

/// A unit of work tracked by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    /// Unique identifier.
    pub id: LeadId,

    pub name: String,
    pub email: String,

    /// Where the lead came from (campaign, referral, import batch).
    pub source: String,

    /// Original contact date as supplied by the source, kept verbatim.
    pub date: String,

    pub location: String,

    /// Partition key. Empty makes the lead permanently unassignable by
    /// the engine; it waits for manual intervention.
    pub language: String,

    pub temperature: LeadTemperature,
    pub status: LeadStatus,

    /// Owner, if assigned. Set together with `assigned_at`, cleared
    /// together when ownership is revoked.
    pub assigned_to: Option<EmployeeId>,
    pub assigned_at: Option<DateTime<Utc>>,

    /// Follow-up appointment. A lead scheduled in the future cannot be
    /// closed until the appointment has passed.
    pub schedule_date: Option<DateTime<Utc>>,

    pub closed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    /// Is this lead a candidate for automatic assignment?
    pub fn is_assignable(&self) -> bool {
        self.status == LeadStatus::Ongoing
            && self.assigned_to.is_none()
            && !self.language.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Partition cursor
// ---------------------------------------------------------------------------

/// The remembered last-assigned employee for one partition.
///
/// Created lazily on the first successful assignment into a partition,
/// updated on every one after that, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionCursor {
    pub language: String,
    pub last_employee_id: Option<EmployeeId>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Builder for onboarding an employee. The engine's public intake shape.
pub struct NewEmployee {
    pub(crate) employee_code: String,
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) email: String,
    pub(crate) location: String,
    pub(crate) language: String,
}

impl NewEmployee {
    pub fn new(employee_code: impl Into<String>) -> Self {
        Self {
            employee_code: employee_code.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            location: String::new(),
            language: String::new(),
        }
    }

    pub fn name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Language partitions are matched verbatim; leading/trailing
    /// whitespace is trimmed here so " hi " and "hi" are one partition.
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into().trim().to_string();
        self
    }
}

/// Builder for submitting a lead.
pub struct NewLead {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) source: String,
    pub(crate) date: String,
    pub(crate) location: String,
    pub(crate) language: String,
    pub(crate) temperature: LeadTemperature,
}

impl NewLead {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            source: String::new(),
            date: String::new(),
            location: String::new(),
            language: String::new(),
            temperature: LeadTemperature::Warm,
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into().trim().to_string();
        self
    }

    pub fn temperature(mut self, temperature: LeadTemperature) -> Self {
        self.temperature = temperature;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_language_is_never_assignable() {
        let lead = Lead {
            id: LeadId::new(),
            name: "A".into(),
            email: "a@example.com".into(),
            source: String::new(),
            date: String::new(),
            location: String::new(),
            language: String::new(),
            temperature: LeadTemperature::Warm,
            status: LeadStatus::Ongoing,
            assigned_to: None,
            assigned_at: None,
            schedule_date: None,
            closed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!lead.is_assignable());
    }

    #[test]
    fn builder_trims_language() {
        let new = NewLead::new("A", "a@example.com").language("  hi ");
        assert_eq!(new.language, "hi");
        let emp = NewEmployee::new("EMP-1").language(" en ");
        assert_eq!(emp.language, "en");
    }
}
