//! Core engine. The public API for routing leads to employees.
//!
//! The engine owns the storage, the per-partition lock table, and the
//! event stream. All assignment state transitions go through here.
//! External consumers (the CRUD/UI layer) interact via this module.
//!
//! The selection algorithm: among employees of the lead's language
//! partition with load below the capacity threshold, take the
//! least-loaded tier, order it by `(created_at, employee_code)`, and
//! rotate through it starting after the partition's cursor. The commit
//! (lead ownership, employee set, cursor) is one SQLite transaction.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::event::{Event, EventKind, UnassignedReason};
use crate::model::*;
use crate::storage::{Storage, TxContext};

/// Defensive bound on sweep iterations. The documented termination
/// conditions (backlog drained or capacity exhausted) are expected to
/// fire long before this.
pub const DEFAULT_SWEEP_CAP: u32 = 10_000;

/// Tunables for the engine.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Maximum simultaneously open leads per employee.
    pub threshold: usize,
    /// Upper bound on iterations of a single sweep.
    pub sweep_cap: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            sweep_cap: DEFAULT_SWEEP_CAP,
        }
    }
}

/// Outcome of a bulk lead import.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub created: u32,
    pub assigned: u32,
    /// Per-lead outcome in submission order.
    pub outcomes: Vec<(LeadId, Option<EmployeeId>)>,
}

/// The assignment engine. Owns all state and enforces all invariants.
pub struct Engine {
    storage: Mutex<Storage>,
    /// One lock per partition key, created lazily and never removed.
    /// Serializes decide+commit within a partition; partitions do not
    /// contend with each other.
    partitions: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with in-memory storage (for testing).
    pub fn in_memory() -> Result<Self> {
        Ok(Self::with_storage(Storage::in_memory()?, EngineConfig::default()))
    }

    /// Create an engine backed by a file.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::with_storage(Storage::open(path)?, EngineConfig::default()))
    }

    pub fn with_config(path: impl AsRef<std::path::Path>, config: EngineConfig) -> Result<Self> {
        Ok(Self::with_storage(Storage::open(path)?, config))
    }

    fn with_storage(storage: Storage, config: EngineConfig) -> Self {
        Self {
            storage: Mutex::new(storage),
            partitions: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn threshold(&self) -> usize {
        self.config.threshold
    }

    /// Lock guarding assignment in one partition.
    fn partition_lock(&self, language: &str) -> Arc<Mutex<()>> {
        let mut table = self.partitions.lock();
        table
            .entry(language.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // -----------------------------------------------------------------------
    // Assignment
    // -----------------------------------------------------------------------

    /// Assign a lead to the best eligible employee, if any.
    ///
    /// Returns `Ok(None)` when the lead is not currently assignable
    /// (already owned, closed, empty partition key) or when no employee
    /// in its partition has spare capacity. That is an expected outcome,
    /// not an error; the lead stays in the backlog for future sweeps.
    pub fn assign(&self, lead_id: LeadId) -> Result<Option<Employee>> {
        let snapshot = {
            let storage = self.storage.lock();
            storage.get_lead(lead_id)?
        };

        if snapshot.language.is_empty() {
            // Permanently unassignable without manual intervention.
            if snapshot.status == LeadStatus::Ongoing && snapshot.assigned_to.is_none() {
                let mut storage = self.storage.lock();
                storage.record_event(EventKind::LeadLeftUnassigned {
                    lead_id,
                    language: String::new(),
                    reason: UnassignedReason::NoPartition,
                })?;
            }
            return Ok(None);
        }
        let language = snapshot.language;

        let lock = self.partition_lock(&language);
        let _guard = lock.lock();

        let mut storage = self.storage.lock();
        storage.with_transaction(|ctx| {
            // Re-read under the lock; preconditions may have changed
            // between the language lookup and here.
            let lead = ctx.get_lead(lead_id)?;
            if !lead.is_assignable() {
                return Ok(None);
            }

            match assign_in_tx(ctx, &lead, self.config.threshold)? {
                Some(employee) => Ok(Some(employee)),
                None => {
                    ctx.record_event(EventKind::LeadLeftUnassigned {
                        lead_id,
                        language: lead.language.clone(),
                        reason: UnassignedReason::NoCapacity,
                    })?;
                    Ok(None)
                }
            }
        })
    }

    /// Drain the unassigned backlog of one partition until either the
    /// backlog or the partition's capacity is exhausted. Returns the
    /// number of leads assigned.
    ///
    /// Safe to replay: every iteration re-reads current state, so a
    /// second sweep with no intervening events is a no-op.
    pub fn sweep(&self, language: &str) -> Result<u32> {
        if language.is_empty() {
            return Ok(0);
        }

        let lock = self.partition_lock(language);
        let mut assigned = 0u32;

        for _ in 0..self.config.sweep_cap {
            // Lock is re-acquired per iteration so a concurrent direct
            // assign can interleave; fetch-oldest and commit still
            // happen together under it.
            let _guard = lock.lock();
            let mut storage = self.storage.lock();

            let progressed = storage.with_transaction(|ctx| {
                let Some(lead) = ctx.oldest_unassigned_lead(language)? else {
                    return Ok(false);
                };
                Ok(assign_in_tx(ctx, &lead, self.config.threshold)?.is_some())
            })?;

            if !progressed {
                if assigned > 0 {
                    storage.record_event(EventKind::SweepCompleted {
                        language: language.to_string(),
                        assigned,
                    })?;
                }
                return Ok(assigned);
            }
            assigned += 1;
        }

        warn!(language, assigned, "sweep hit iteration cap; stopping");
        let mut storage = self.storage.lock();
        storage.record_event(EventKind::SweepCompleted {
            language: language.to_string(),
            assigned,
        })?;
        Ok(assigned)
    }

    // -----------------------------------------------------------------------
    // Lead lifecycle
    // -----------------------------------------------------------------------

    /// Create a lead and immediately try to assign it.
    pub fn add_lead(&self, new: NewLead) -> Result<(Lead, Option<Employee>)> {
        let now = Utc::now();
        let lead = Lead {
            id: LeadId::new(),
            name: new.name,
            email: new.email,
            source: new.source,
            date: new.date,
            location: new.location,
            language: new.language,
            temperature: new.temperature,
            status: LeadStatus::Ongoing,
            assigned_to: None,
            assigned_at: None,
            schedule_date: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        };

        {
            let mut storage = self.storage.lock();
            storage.insert_lead(&lead)?;
            storage.record_event(EventKind::LeadCreated {
                id: lead.id,
                language: lead.language.clone(),
                source: lead.source.clone(),
            })?;
        }

        let chosen = self.assign(lead.id)?;
        let lead = self.lead(lead.id)?;
        Ok((lead, chosen))
    }

    /// Bulk intake (the CSV-import path). Leads are created and assigned
    /// sequentially in submission order so distribution stays stable.
    pub fn import_leads(&self, batch: Vec<NewLead>) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        for new in batch {
            let (lead, chosen) = self.add_lead(new)?;
            report.created += 1;
            if chosen.is_some() {
                report.assigned += 1;
            }
            report.outcomes.push((lead.id, chosen.map(|e| e.id)));
        }
        debug!(
            created = report.created,
            assigned = report.assigned,
            "lead import finished"
        );
        Ok(report)
    }

    /// Close a lead on behalf of its owning employee.
    ///
    /// Frees one unit of capacity and sweeps the owner's partition.
    /// Closing an already-closed lead is an idempotent no-op. A lead
    /// scheduled in the future refuses to close until the appointment
    /// has passed.
    pub fn close_lead(&self, lead_id: LeadId, employee_id: EmployeeId) -> Result<()> {
        let owner_language = {
            let mut storage = self.storage.lock();
            storage.with_transaction(|ctx| {
                let lead = ctx.get_lead(lead_id)?;
                if lead.assigned_to != Some(employee_id) {
                    return Err(Error::NotFound(lead_id.to_string()));
                }
                if lead.status == LeadStatus::Closed {
                    return Ok(None);
                }
                if let Some(when) = lead.schedule_date {
                    if Utc::now() < when {
                        return Err(Error::ScheduledAhead {
                            lead_id,
                            scheduled_for: when,
                        });
                    }
                }

                ctx.close_lead(lead_id)?;
                ctx.remove_ongoing_lead(employee_id, lead_id)?;
                ctx.increment_closed_count(employee_id)?;
                ctx.record_event(EventKind::LeadClosed {
                    lead_id,
                    employee_id,
                })?;

                Ok(Some(ctx.get_employee(employee_id)?.language))
            })?
        };

        // Capacity freed; unblock waiting leads in the owner's partition.
        if let Some(language) = owner_language {
            info!(lead = %lead_id, employee = %employee_id, "lead closed");
            if !language.is_empty() {
                self.sweep(&language)?;
            }
        }
        Ok(())
    }

    /// Set a lead's follow-up appointment (owner-scoped).
    pub fn schedule_lead(
        &self,
        lead_id: LeadId,
        employee_id: EmployeeId,
        when: DateTime<Utc>,
    ) -> Result<()> {
        let mut storage = self.storage.lock();
        let lead = storage.get_lead(lead_id)?;
        if lead.assigned_to != Some(employee_id) {
            return Err(Error::NotFound(lead_id.to_string()));
        }
        storage.set_schedule_date(lead_id, when)
    }

    /// Set a lead's sales temperature (owner-scoped).
    pub fn set_lead_temperature(
        &self,
        lead_id: LeadId,
        employee_id: EmployeeId,
        temperature: LeadTemperature,
    ) -> Result<()> {
        let mut storage = self.storage.lock();
        let lead = storage.get_lead(lead_id)?;
        if lead.assigned_to != Some(employee_id) {
            return Err(Error::NotFound(lead_id.to_string()));
        }
        storage.set_temperature(lead_id, temperature)
    }

    // -----------------------------------------------------------------------
    // Employee lifecycle
    // -----------------------------------------------------------------------

    /// Onboard an employee. New capacity may unblock the partition's
    /// backlog, so the partition is swept afterwards.
    pub fn add_employee(&self, new: NewEmployee) -> Result<Employee> {
        let now = Utc::now();
        let employee = Employee {
            id: EmployeeId::new(),
            employee_code: new.employee_code,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            location: new.location,
            language: new.language,
            ongoing_lead_ids: Vec::new(),
            closed_leads_count: 0,
            created_at: now,
            updated_at: now,
        };

        {
            let mut storage = self.storage.lock();
            storage.insert_employee(&employee)?;
            storage.record_event(EventKind::EmployeeAdded {
                id: employee.id,
                employee_code: employee.employee_code.clone(),
                language: employee.language.clone(),
            })?;
        }

        if !employee.language.is_empty() {
            self.sweep(&employee.language)?;
        }

        // Re-read: the sweep may already have routed leads to them.
        self.employee(employee.id)
    }

    /// Move an employee to a different partition.
    ///
    /// Their existing ongoing leads stay attached (an employee's open
    /// leads may therefore not match their current language; that is
    /// the recorded behavior, not a bug). Only the new partition gains
    /// capacity, so only the new partition is swept.
    pub fn set_employee_language(&self, id: EmployeeId, language: &str) -> Result<()> {
        let language = language.trim();
        let from = {
            let mut storage = self.storage.lock();
            let employee = storage.get_employee(id)?;
            if employee.language == language {
                return Ok(());
            }
            storage.set_employee_language(id, language)?;
            storage.record_event(EventKind::EmployeeLanguageChanged {
                id,
                from: employee.language.clone(),
                to: language.to_string(),
            })?;
            employee.language
        };

        debug!(employee = %id, %from, to = language, "employee moved partition");
        if !language.is_empty() {
            self.sweep(language)?;
        }
        Ok(())
    }

    /// Offboard an employee, returning their ongoing leads to the
    /// unassigned pool. Returns the orphaned lead ids.
    ///
    /// No sweep runs here: capacity shrank, it did not grow. The
    /// orphaned leads wait for the next capacity-freeing event in their
    /// partitions.
    pub fn remove_employee(&self, id: EmployeeId) -> Result<Vec<LeadId>> {
        let mut storage = self.storage.lock();
        storage.with_transaction(|ctx| {
            // Existence check before the cascade.
            ctx.get_employee(id)?;

            let owned = ctx.leads_assigned_to(id)?;
            let mut orphaned = Vec::with_capacity(owned.len());
            for lead in &owned {
                ctx.clear_assignment(lead.id)?;
                orphaned.push(lead.id);
            }

            // Closed leads still reference the employee for history; the
            // schema detaches them (ON DELETE SET NULL) on this delete.
            ctx.delete_employee(id)?;
            ctx.record_event(EventKind::EmployeeRemoved {
                id,
                orphaned_leads: orphaned.clone(),
            })?;
            Ok(orphaned)
        })
    }

    /// Bulk offboarding. Unknown ids are skipped. Returns how many
    /// employees were removed.
    pub fn remove_employees(&self, ids: &[EmployeeId]) -> Result<u32> {
        let mut removed = 0;
        for &id in ids {
            match self.remove_employee(id) {
                Ok(_) => removed += 1,
                Err(Error::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Read API
    // -----------------------------------------------------------------------

    /// Get an employee by ID.
    pub fn employee(&self, id: EmployeeId) -> Result<Employee> {
        self.storage.lock().get_employee(id)
    }

    /// Get a lead by ID.
    pub fn lead(&self, id: LeadId) -> Result<Lead> {
        self.storage.lock().get_lead(id)
    }

    /// All employees in canonical order.
    pub fn employees(&self) -> Result<Vec<Employee>> {
        self.storage.lock().list_employees()
    }

    /// Employees in a partition with spare capacity, in canonical order.
    pub fn eligible(&self, language: &str) -> Result<Vec<Employee>> {
        self.storage
            .lock()
            .eligible_employees(language, self.config.threshold)
    }

    /// Unassigned backlog of a partition, oldest first.
    pub fn unassigned_leads(&self, language: &str) -> Result<Vec<Lead>> {
        self.storage.lock().unassigned_leads(language)
    }

    /// Ongoing leads owned by an employee.
    pub fn leads_for(&self, employee_id: EmployeeId) -> Result<Vec<Lead>> {
        self.storage.lock().leads_assigned_to(employee_id)
    }

    /// The rotation cursor for a partition, if any assignment has
    /// happened there yet.
    pub fn cursor(&self, language: &str) -> Result<Option<PartitionCursor>> {
        self.storage.lock().get_cursor(language)
    }

    /// Events after a sequence number, for the activity/notification layer.
    pub fn events_since(&self, seq: u64) -> Result<Vec<Event>> {
        self.storage.lock().get_events_since(seq)
    }
}

/// One selection + commit for a lead already known to be assignable.
///
/// Runs entirely inside the caller's transaction and partition lock.
/// Returns the chosen employee, or `None` when nobody in the partition
/// has spare capacity.
fn assign_in_tx(ctx: &TxContext, lead: &Lead, threshold: usize) -> Result<Option<Employee>> {
    // Eligible set arrives in canonical (created_at, employee_code)
    // order, so the least-loaded pool below inherits it.
    let eligible = ctx.eligible_employees(&lead.language, threshold)?;
    if eligible.is_empty() {
        return Ok(None);
    }

    let min_load = eligible.iter().map(Employee::load).min().unwrap_or(0);
    let pool: Vec<&Employee> = eligible.iter().filter(|e| e.load() == min_load).collect();

    // Rotate: start after the cursor's position when the cursor's
    // employee is still in the pool, else fall back to the head.
    let cursor = ctx.get_cursor(&lead.language)?;
    let mut pick = 0;
    if let Some(last) = cursor.and_then(|c| c.last_employee_id) {
        if let Some(idx) = pool.iter().position(|e| e.id == last) {
            pick = (idx + 1) % pool.len();
        }
    }
    let chosen = pool[pick].id;

    // The three-entity commit: all or nothing within the transaction.
    ctx.mark_assigned(lead.id, chosen)?;
    ctx.add_ongoing_lead(chosen, lead.id)?;
    ctx.set_cursor(&lead.language, chosen)?;
    ctx.record_event(EventKind::LeadAssigned {
        lead_id: lead.id,
        employee_id: chosen,
        language: lead.language.clone(),
    })?;

    info!(lead = %lead.id, employee = %chosen, language = %lead.language, "lead assigned");
    ctx.get_employee(chosen).map(Some)
}
