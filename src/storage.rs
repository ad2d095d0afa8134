//! SQLite storage layer.
//!
//! Single source of truth for employees, leads, partition cursors, and
//! events. WAL mode for concurrent read access. All writes go through
//! the engine.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{Error, Result};
use crate::event::{Event, EventKind};
use crate::model::*;

/// Storage backend. Owns the SQLite connection.
pub struct Storage {
    conn: Connection,
}

/// Handle for performing storage operations within a transaction.
///
/// All methods delegate to the same SQL logic as `Storage`, but execute
/// against the transaction's connection. This ensures atomicity — either
/// all operations commit together or none do.
pub(crate) struct TxContext<'a> {
    tx: &'a Connection,
}

impl TxContext<'_> {
    pub fn get_employee(&self, id: EmployeeId) -> Result<Employee> {
        get_employee_on(self.tx, id)
    }

    pub fn get_lead(&self, id: LeadId) -> Result<Lead> {
        get_lead_on(self.tx, id)
    }

    /// Employees in a partition with spare capacity, in canonical order
    /// `(created_at asc, employee_code asc)`.
    pub fn eligible_employees(&self, language: &str, threshold: usize) -> Result<Vec<Employee>> {
        eligible_employees_on(self.tx, language, threshold)
    }

    pub fn oldest_unassigned_lead(&self, language: &str) -> Result<Option<Lead>> {
        oldest_unassigned_lead_on(self.tx, language)
    }

    pub fn mark_assigned(&self, lead_id: LeadId, employee_id: EmployeeId) -> Result<()> {
        mark_assigned_on(self.tx, lead_id, employee_id)
    }

    pub fn clear_assignment(&self, lead_id: LeadId) -> Result<()> {
        clear_assignment_on(self.tx, lead_id)
    }

    pub fn add_ongoing_lead(&self, employee_id: EmployeeId, lead_id: LeadId) -> Result<()> {
        add_ongoing_lead_on(self.tx, employee_id, lead_id)
    }

    pub fn remove_ongoing_lead(&self, employee_id: EmployeeId, lead_id: LeadId) -> Result<()> {
        remove_ongoing_lead_on(self.tx, employee_id, lead_id)
    }

    pub fn increment_closed_count(&self, employee_id: EmployeeId) -> Result<()> {
        increment_closed_count_on(self.tx, employee_id)
    }

    pub fn close_lead(&self, lead_id: LeadId) -> Result<()> {
        close_lead_on(self.tx, lead_id)
    }

    pub fn get_cursor(&self, language: &str) -> Result<Option<PartitionCursor>> {
        get_cursor_on(self.tx, language)
    }

    pub fn set_cursor(&self, language: &str, employee_id: EmployeeId) -> Result<()> {
        set_cursor_on(self.tx, language, employee_id)
    }

    pub fn leads_assigned_to(&self, employee_id: EmployeeId) -> Result<Vec<Lead>> {
        leads_assigned_to_on(self.tx, employee_id)
    }

    pub fn delete_employee(&self, id: EmployeeId) -> Result<()> {
        let n = self.tx.execute(
            "DELETE FROM employees WHERE id = ?1",
            params![id.0.to_string()],
        )?;
        if n == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn record_event(&self, kind: EventKind) -> Result<Event> {
        record_event_on(self.tx, kind)
    }
}

impl Storage {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let mut storage = Self { conn };
        storage.init()?;
        Ok(storage)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut storage = Self { conn };
        storage.init()?;
        Ok(storage)
    }

    fn init(&mut self) -> Result<()> {
        // WAL mode for concurrent readers
        self.conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        self.conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS employees (
                id                  TEXT PRIMARY KEY,
                employee_code       TEXT NOT NULL UNIQUE,
                first_name          TEXT NOT NULL DEFAULT '',
                last_name           TEXT NOT NULL DEFAULT '',
                email               TEXT NOT NULL DEFAULT '',
                location            TEXT NOT NULL DEFAULT '',
                language            TEXT NOT NULL DEFAULT '',
                ongoing_lead_ids    TEXT NOT NULL DEFAULT '[]',
                closed_leads_count  INTEGER NOT NULL DEFAULT 0,
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_employees_language ON employees(language)
                WHERE language != '';

            CREATE TABLE IF NOT EXISTS leads (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL DEFAULT '',
                source          TEXT NOT NULL DEFAULT '',
                date            TEXT NOT NULL DEFAULT '',
                location        TEXT NOT NULL DEFAULT '',
                language        TEXT NOT NULL DEFAULT '',
                temperature     TEXT NOT NULL DEFAULT 'warm',
                status          TEXT NOT NULL DEFAULT 'ongoing',
                assigned_to     TEXT REFERENCES employees(id) ON DELETE SET NULL,
                assigned_at     TEXT,
                schedule_date   TEXT,
                closed_at       TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_leads_language ON leads(language);
            CREATE INDEX IF NOT EXISTS idx_leads_assigned ON leads(assigned_to)
                WHERE assigned_to IS NOT NULL;
            CREATE INDEX IF NOT EXISTS idx_leads_backlog ON leads(language, created_at ASC)
                WHERE status = 'ongoing' AND assigned_to IS NULL;

            CREATE TABLE IF NOT EXISTS cursors (
                language            TEXT PRIMARY KEY,
                last_employee_id    TEXT,
                updated_at          TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS events (
                seq         INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp   TEXT NOT NULL,
                kind        TEXT NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Execute a closure within a SQLite transaction.
    ///
    /// The transaction commits if the closure returns Ok, rolls back on Err.
    pub(crate) fn with_transaction<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&TxContext) -> Result<T>,
    {
        let tx = self.conn.transaction()?;
        let ctx = TxContext { tx: &tx };
        let result = f(&ctx)?;
        tx.commit()?;
        Ok(result)
    }

    // -----------------------------------------------------------------------
    // Employees
    // -----------------------------------------------------------------------

    /// Insert a new employee.
    pub fn insert_employee(&mut self, employee: &Employee) -> Result<()> {
        self.conn.execute(
            "INSERT INTO employees (
                id, employee_code, first_name, last_name, email, location,
                language, ongoing_lead_ids, closed_leads_count,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                employee.id.0.to_string(),
                employee.employee_code,
                employee.first_name,
                employee.last_name,
                employee.email,
                employee.location,
                employee.language,
                ids_to_json(&employee.ongoing_lead_ids),
                employee.closed_leads_count as i64,
                employee.created_at.to_rfc3339(),
                employee.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get an employee by ID.
    pub fn get_employee(&self, id: EmployeeId) -> Result<Employee> {
        get_employee_on(&self.conn, id)
    }

    /// All employees, in canonical `(created_at, employee_code)` order.
    pub fn list_employees(&self) -> Result<Vec<Employee>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {EMPLOYEE_COLS} FROM employees ORDER BY created_at ASC, employee_code ASC"
        ))?;
        let rows = stmt
            .query_map([], |row| Ok(row_to_employee(row)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }

    /// Employees in a partition with spare capacity (read-only view).
    pub fn eligible_employees(&self, language: &str, threshold: usize) -> Result<Vec<Employee>> {
        eligible_employees_on(&self.conn, language, threshold)
    }

    /// Update an employee's partition key.
    pub fn set_employee_language(&mut self, id: EmployeeId, language: &str) -> Result<()> {
        let n = self.conn.execute(
            "UPDATE employees SET language = ?1, updated_at = ?2 WHERE id = ?3",
            params![language, Utc::now().to_rfc3339(), id.0.to_string()],
        )?;
        if n == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Leads
    // -----------------------------------------------------------------------

    /// Insert a new lead.
    pub fn insert_lead(&mut self, lead: &Lead) -> Result<()> {
        self.conn.execute(
            "INSERT INTO leads (
                id, name, email, source, date, location, language,
                temperature, status, assigned_to, assigned_at,
                schedule_date, closed_at, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                lead.id.0.to_string(),
                lead.name,
                lead.email,
                lead.source,
                lead.date,
                lead.location,
                lead.language,
                lead.temperature.to_string(),
                lead.status.to_string(),
                lead.assigned_to.map(|id| id.0.to_string()),
                lead.assigned_at.map(|t| t.to_rfc3339()),
                lead.schedule_date.map(|t| t.to_rfc3339()),
                lead.closed_at.map(|t| t.to_rfc3339()),
                lead.created_at.to_rfc3339(),
                lead.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Get a lead by ID.
    pub fn get_lead(&self, id: LeadId) -> Result<Lead> {
        get_lead_on(&self.conn, id)
    }

    /// Unassigned ongoing leads in a partition, oldest first.
    pub fn unassigned_leads(&self, language: &str) -> Result<Vec<Lead>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LEAD_COLS} FROM leads
             WHERE language = ?1 AND status = 'ongoing' AND assigned_to IS NULL
             ORDER BY created_at ASC"
        ))?;
        let rows = stmt
            .query_map(params![language], |row| Ok(row_to_lead(row)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().collect()
    }

    /// Ongoing leads currently owned by an employee.
    pub fn leads_assigned_to(&self, employee_id: EmployeeId) -> Result<Vec<Lead>> {
        leads_assigned_to_on(&self.conn, employee_id)
    }

    /// Set a lead's follow-up appointment.
    pub fn set_schedule_date(&mut self, id: LeadId, when: DateTime<Utc>) -> Result<()> {
        let n = self.conn.execute(
            "UPDATE leads SET schedule_date = ?1, updated_at = ?2 WHERE id = ?3",
            params![when.to_rfc3339(), Utc::now().to_rfc3339(), id.0.to_string()],
        )?;
        if n == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Set a lead's sales temperature.
    pub fn set_temperature(&mut self, id: LeadId, temperature: LeadTemperature) -> Result<()> {
        let n = self.conn.execute(
            "UPDATE leads SET temperature = ?1, updated_at = ?2 WHERE id = ?3",
            params![
                temperature.to_string(),
                Utc::now().to_rfc3339(),
                id.0.to_string()
            ],
        )?;
        if n == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cursors
    // -----------------------------------------------------------------------

    /// Get the rotation cursor for a partition, if one exists yet.
    pub fn get_cursor(&self, language: &str) -> Result<Option<PartitionCursor>> {
        get_cursor_on(&self.conn, language)
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    /// Record an event and return it with its sequence number.
    pub fn record_event(&mut self, kind: EventKind) -> Result<Event> {
        record_event_on(&self.conn, kind)
    }

    /// Get events since a sequence number.
    pub fn get_events_since(&self, since_seq: u64) -> Result<Vec<Event>> {
        let mut stmt = self
            .conn
            .prepare("SELECT seq, timestamp, kind FROM events WHERE seq > ?1 ORDER BY seq ASC")?;

        let events = stmt
            .query_map(params![since_seq as i64], |row| {
                let kind_str: String = row.get(2)?;
                Ok(Event {
                    seq: row.get::<_, i64>(0)? as u64,
                    timestamp: row
                        .get::<_, String>(1)?
                        .parse()
                        .unwrap_or_else(|_| Utc::now()),
                    kind: serde_json::from_str(&kind_str)
                        .unwrap_or(EventKind::Unknown { raw: kind_str }),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }
}

// ---------------------------------------------------------------------------
// Inner functions — accept &Connection so they work with both
// Connection (auto-commit) and Transaction (deref to Connection).
// ---------------------------------------------------------------------------

const EMPLOYEE_COLS: &str = "id, employee_code, first_name, last_name, email, location, \
     language, ongoing_lead_ids, closed_leads_count, created_at, updated_at";

const LEAD_COLS: &str = "id, name, email, source, date, location, language, temperature, \
     status, assigned_to, assigned_at, schedule_date, closed_at, created_at, updated_at";

fn get_employee_on(conn: &Connection, id: EmployeeId) -> Result<Employee> {
    conn.query_row(
        &format!("SELECT {EMPLOYEE_COLS} FROM employees WHERE id = ?1"),
        params![id.0.to_string()],
        |row| Ok(row_to_employee(row)),
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(id.to_string()))?
}

fn get_lead_on(conn: &Connection, id: LeadId) -> Result<Lead> {
    conn.query_row(
        &format!("SELECT {LEAD_COLS} FROM leads WHERE id = ?1"),
        params![id.0.to_string()],
        |row| Ok(row_to_lead(row)),
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(id.to_string()))?
}

fn eligible_employees_on(
    conn: &Connection,
    language: &str,
    threshold: usize,
) -> Result<Vec<Employee>> {
    if language.is_empty() {
        return Ok(Vec::new());
    }

    // Load lives inside the JSON column, so the capacity filter happens
    // here rather than in SQL. Partition membership narrows the scan.
    let mut stmt = conn.prepare(&format!(
        "SELECT {EMPLOYEE_COLS} FROM employees WHERE language = ?1
         ORDER BY created_at ASC, employee_code ASC"
    ))?;
    let rows = stmt
        .query_map(params![language], |row| Ok(row_to_employee(row)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut result = Vec::new();
    for employee in rows {
        let employee = employee?;
        if employee.load() < threshold {
            result.push(employee);
        }
    }
    Ok(result)
}

fn oldest_unassigned_lead_on(conn: &Connection, language: &str) -> Result<Option<Lead>> {
    let lead = conn
        .query_row(
            &format!(
                "SELECT {LEAD_COLS} FROM leads
                 WHERE language = ?1 AND status = 'ongoing' AND assigned_to IS NULL
                 ORDER BY created_at ASC LIMIT 1"
            ),
            params![language],
            |row| Ok(row_to_lead(row)),
        )
        .optional()?;
    lead.transpose()
}

fn mark_assigned_on(conn: &Connection, lead_id: LeadId, employee_id: EmployeeId) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let n = conn.execute(
        "UPDATE leads SET assigned_to = ?1, assigned_at = ?2, updated_at = ?2 WHERE id = ?3",
        params![employee_id.0.to_string(), now, lead_id.0.to_string()],
    )?;
    if n == 0 {
        return Err(Error::NotFound(lead_id.to_string()));
    }
    Ok(())
}

fn clear_assignment_on(conn: &Connection, lead_id: LeadId) -> Result<()> {
    let n = conn.execute(
        "UPDATE leads SET assigned_to = NULL, assigned_at = NULL, updated_at = ?1 WHERE id = ?2",
        params![Utc::now().to_rfc3339(), lead_id.0.to_string()],
    )?;
    if n == 0 {
        return Err(Error::NotFound(lead_id.to_string()));
    }
    Ok(())
}

fn close_lead_on(conn: &Connection, lead_id: LeadId) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    let n = conn.execute(
        "UPDATE leads SET status = 'closed', closed_at = ?1, updated_at = ?1 WHERE id = ?2",
        params![now, lead_id.0.to_string()],
    )?;
    if n == 0 {
        return Err(Error::NotFound(lead_id.to_string()));
    }
    Ok(())
}

fn add_ongoing_lead_on(conn: &Connection, employee_id: EmployeeId, lead_id: LeadId) -> Result<()> {
    let employee = get_employee_on(conn, employee_id)?;
    let mut ids = employee.ongoing_lead_ids;
    if !ids.contains(&lead_id) {
        ids.push(lead_id);
    }
    write_ongoing_on(conn, employee_id, &ids)
}

fn remove_ongoing_lead_on(
    conn: &Connection,
    employee_id: EmployeeId,
    lead_id: LeadId,
) -> Result<()> {
    let employee = get_employee_on(conn, employee_id)?;
    let mut ids = employee.ongoing_lead_ids;
    ids.retain(|id| *id != lead_id);
    write_ongoing_on(conn, employee_id, &ids)
}

fn write_ongoing_on(conn: &Connection, employee_id: EmployeeId, ids: &[LeadId]) -> Result<()> {
    conn.execute(
        "UPDATE employees SET ongoing_lead_ids = ?1, updated_at = ?2 WHERE id = ?3",
        params![
            ids_to_json(ids),
            Utc::now().to_rfc3339(),
            employee_id.0.to_string()
        ],
    )?;
    Ok(())
}

fn increment_closed_count_on(conn: &Connection, employee_id: EmployeeId) -> Result<()> {
    conn.execute(
        "UPDATE employees SET closed_leads_count = closed_leads_count + 1, updated_at = ?1
         WHERE id = ?2",
        params![Utc::now().to_rfc3339(), employee_id.0.to_string()],
    )?;
    Ok(())
}

fn get_cursor_on(conn: &Connection, language: &str) -> Result<Option<PartitionCursor>> {
    let row = conn
        .query_row(
            "SELECT language, last_employee_id, updated_at FROM cursors WHERE language = ?1",
            params![language],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((language, last, updated_at)) = row else {
        return Ok(None);
    };
    let last_employee_id = match last {
        Some(s) => Some(EmployeeId(parse_uuid(&s)?)),
        None => None,
    };
    Ok(Some(PartitionCursor {
        language,
        last_employee_id,
        updated_at: parse_datetime(&updated_at),
    }))
}

fn set_cursor_on(conn: &Connection, language: &str, employee_id: EmployeeId) -> Result<()> {
    conn.execute(
        "INSERT INTO cursors (language, last_employee_id, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(language) DO UPDATE SET last_employee_id = ?2, updated_at = ?3",
        params![
            language,
            employee_id.0.to_string(),
            Utc::now().to_rfc3339()
        ],
    )?;
    Ok(())
}

fn leads_assigned_to_on(conn: &Connection, employee_id: EmployeeId) -> Result<Vec<Lead>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LEAD_COLS} FROM leads
         WHERE assigned_to = ?1 AND status = 'ongoing'
         ORDER BY created_at ASC"
    ))?;
    let rows = stmt
        .query_map(params![employee_id.0.to_string()], |row| {
            Ok(row_to_lead(row))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    rows.into_iter().collect()
}

fn record_event_on(conn: &Connection, kind: EventKind) -> Result<Event> {
    let now = Utc::now();

    conn.execute(
        "INSERT INTO events (timestamp, kind) VALUES (?1, ?2)",
        params![
            now.to_rfc3339(),
            serde_json::to_string(&kind).unwrap_or_default(),
        ],
    )?;

    let seq = conn.last_insert_rowid();

    Ok(Event {
        seq: seq as u64,
        timestamp: now,
        kind,
    })
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn row_to_employee(row: &Row<'_>) -> Result<Employee> {
    Ok(Employee {
        id: EmployeeId(parse_uuid(&row.get::<_, String>(0)?)?),
        employee_code: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        location: row.get(5)?,
        language: row.get(6)?,
        ongoing_lead_ids: ids_from_json(&row.get::<_, String>(7)?)?,
        closed_leads_count: row.get::<_, i64>(8)? as u64,
        created_at: parse_datetime(&row.get::<_, String>(9)?),
        updated_at: parse_datetime(&row.get::<_, String>(10)?),
    })
}

fn row_to_lead(row: &Row<'_>) -> Result<Lead> {
    let assigned_to: Option<String> = row.get(9)?;
    Ok(Lead {
        id: LeadId(parse_uuid(&row.get::<_, String>(0)?)?),
        name: row.get(1)?,
        email: row.get(2)?,
        source: row.get(3)?,
        date: row.get(4)?,
        location: row.get(5)?,
        language: row.get(6)?,
        temperature: parse_temperature(&row.get::<_, String>(7)?)?,
        status: parse_status(&row.get::<_, String>(8)?)?,
        assigned_to: match assigned_to {
            Some(s) => Some(EmployeeId(parse_uuid(&s)?)),
            None => None,
        },
        assigned_at: row.get::<_, Option<String>>(10)?.map(|s| parse_datetime(&s)),
        schedule_date: row.get::<_, Option<String>>(11)?.map(|s| parse_datetime(&s)),
        closed_at: row.get::<_, Option<String>>(12)?.map(|s| parse_datetime(&s)),
        created_at: parse_datetime(&row.get::<_, String>(13)?),
        updated_at: parse_datetime(&row.get::<_, String>(14)?),
    })
}

fn parse_uuid(s: &str) -> Result<uuid::Uuid> {
    s.parse()
        .map_err(|e: uuid::Error| Error::Other(format!("malformed uuid {s:?}: {e}")))
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    s.parse().unwrap_or_else(|_| Utc::now())
}

fn parse_status(s: &str) -> Result<LeadStatus> {
    match s {
        "ongoing" => Ok(LeadStatus::Ongoing),
        "closed" => Ok(LeadStatus::Closed),
        other => Err(Error::Other(format!("unknown lead status {other:?}"))),
    }
}

fn parse_temperature(s: &str) -> Result<LeadTemperature> {
    match s {
        "hot" => Ok(LeadTemperature::Hot),
        "warm" => Ok(LeadTemperature::Warm),
        "cold" => Ok(LeadTemperature::Cold),
        other => Err(Error::Other(format!("unknown lead temperature {other:?}"))),
    }
}

fn ids_to_json(ids: &[LeadId]) -> String {
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}

fn ids_from_json(raw: &str) -> Result<Vec<LeadId>> {
    serde_json::from_str(raw)
        .map_err(|e| Error::Other(format!("malformed ongoing_lead_ids {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_cursor_id_is_an_error_not_a_reset() {
        let storage = Storage::in_memory().unwrap();
        storage
            .conn
            .execute(
                "INSERT INTO cursors (language, last_employee_id, updated_at)
                 VALUES ('hi', 'not-a-uuid', ?1)",
                params![Utc::now().to_rfc3339()],
            )
            .unwrap();

        match storage.get_cursor("hi") {
            Err(Error::Other(msg)) => assert!(msg.contains("not-a-uuid")),
            other => panic!("expected Other, got {other:?}"),
        }
    }
}
