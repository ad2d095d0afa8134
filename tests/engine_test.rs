//! Integration tests for the assignment engine.

use leadrota::engine::Engine;
use leadrota::error::Error;
use leadrota::event::EventKind;
use leadrota::model::*;

fn test_engine() -> Engine {
    Engine::in_memory().expect("failed to create in-memory engine")
}

fn employee(engine: &Engine, code: &str, language: &str) -> Employee {
    engine
        .add_employee(NewEmployee::new(code).language(language))
        .unwrap()
}

fn lead(engine: &Engine, name: &str, language: &str) -> (Lead, Option<Employee>) {
    engine
        .add_lead(NewLead::new(name, format!("{name}@example.com")).language(language))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Selection: least load, partition match, round robin
// ---------------------------------------------------------------------------

#[test]
fn assigns_to_least_loaded_employee() {
    let engine = test_engine();
    let e1 = employee(&engine, "EMP-A", "hi");

    // Load E1 up to 2 before E2 exists.
    lead(&engine, "l1", "hi");
    lead(&engine, "l2", "hi");
    assert_eq!(engine.employee(e1.id).unwrap().load(), 2);

    let e2 = employee(&engine, "EMP-B", "hi");

    let (l, chosen) = lead(&engine, "l3", "hi");
    let chosen = chosen.expect("capacity exists");
    assert_eq!(chosen.id, e2.id);
    assert_eq!(l.assigned_to, Some(e2.id));
    assert!(l.assigned_at.is_some());
    assert!(engine
        .employee(e2.id)
        .unwrap()
        .ongoing_lead_ids
        .contains(&l.id));

    // Cursor now remembers E2 for "hi".
    let cursor = engine.cursor("hi").unwrap().expect("cursor created");
    assert_eq!(cursor.last_employee_id, Some(e2.id));
}

#[test]
fn round_robin_rotates_within_least_loaded_tier_and_wraps() {
    let engine = test_engine();
    let a = employee(&engine, "EMP-A", "en");
    let b = employee(&engine, "EMP-B", "en");
    let c = employee(&engine, "EMP-C", "en");

    let order: Vec<EmployeeId> = (0..4)
        .map(|i| lead(&engine, &format!("l{i}"), "en").1.unwrap().id)
        .collect();

    // A first (no cursor), then B and C as the zero-load tier shrinks,
    // then wrap back to A once everyone is at load 1.
    assert_eq!(order, vec![a.id, b.id, c.id, a.id]);
}

#[test]
fn never_assigns_outside_the_partition() {
    let engine = test_engine();
    employee(&engine, "EMP-A", "en");

    let (l, chosen) = lead(&engine, "l1", "hi");
    assert!(chosen.is_none());
    assert!(l.assigned_to.is_none());
    assert_eq!(engine.unassigned_leads("hi").unwrap().len(), 1);
}

#[test]
fn empty_language_lead_is_permanently_unassignable() {
    let engine = test_engine();
    // Even an idle unpartitioned employee is not a candidate.
    employee(&engine, "EMP-A", "");

    let (l, chosen) = lead(&engine, "l1", "");
    assert!(chosen.is_none());
    assert!(l.assigned_to.is_none());
    assert!(engine.eligible("").unwrap().is_empty());
}

#[test]
fn capacity_bound_holds_under_bulk_import() {
    let engine = test_engine();
    let ids: Vec<EmployeeId> = ["EMP-A", "EMP-B", "EMP-C"]
        .iter()
        .map(|code| employee(&engine, code, "en").id)
        .collect();

    let batch: Vec<NewLead> = (0..12)
        .map(|i| NewLead::new(format!("l{i}"), format!("l{i}@example.com")).language("en"))
        .collect();
    let report = engine.import_leads(batch).unwrap();

    assert_eq!(report.created, 12);
    assert_eq!(report.assigned, 9); // 3 employees * threshold 3
    assert_eq!(engine.unassigned_leads("en").unwrap().len(), 3);

    for id in &ids {
        assert_eq!(engine.employee(*id).unwrap().load(), engine.threshold());
    }
}

#[test]
fn assigned_leads_have_exactly_one_owner() {
    let engine = test_engine();
    employee(&engine, "EMP-A", "en");
    employee(&engine, "EMP-B", "en");

    let batch: Vec<NewLead> = (0..5)
        .map(|i| NewLead::new(format!("l{i}"), format!("l{i}@example.com")).language("en"))
        .collect();
    engine.import_leads(batch).unwrap();

    let employees = engine.employees().unwrap();
    for lead in engine
        .employees()
        .unwrap()
        .iter()
        .flat_map(|e| engine.leads_for(e.id).unwrap())
    {
        let owners = employees
            .iter()
            .filter(|e| e.ongoing_lead_ids.contains(&lead.id))
            .count();
        assert_eq!(owners, 1, "lead {} has {} owners", lead.id, owners);
        assert!(lead.assigned_to.is_some());
    }
}

#[test]
fn assign_unknown_lead_is_not_found() {
    let engine = test_engine();
    match engine.assign(LeadId::new()) {
        Err(Error::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Sweeping
// ---------------------------------------------------------------------------

#[test]
fn hiring_into_an_empty_partition_drains_the_backlog() {
    let engine = test_engine();

    // Partition "mr" has nobody; leads pile up.
    let (l1, chosen) = lead(&engine, "l1", "mr");
    assert!(chosen.is_none());
    let (l2, _) = lead(&engine, "l2", "mr");

    // Hiring triggers the sweep; oldest first.
    let e = employee(&engine, "EMP-A", "mr");
    assert_eq!(e.load(), 2);
    assert_eq!(engine.lead(l1.id).unwrap().assigned_to, Some(e.id));
    assert_eq!(engine.lead(l2.id).unwrap().assigned_to, Some(e.id));
    assert!(engine.unassigned_leads("mr").unwrap().is_empty());
}

#[test]
fn sweep_is_idempotent() {
    let engine = test_engine();
    let e = employee(&engine, "EMP-A", "en");
    for i in 0..5 {
        lead(&engine, &format!("l{i}"), "en");
    }
    // Threshold reached, 2 left in backlog.
    assert_eq!(engine.employee(e.id).unwrap().load(), 3);
    assert_eq!(engine.unassigned_leads("en").unwrap().len(), 2);

    assert_eq!(engine.sweep("en").unwrap(), 0);
    assert_eq!(engine.sweep("en").unwrap(), 0);
    assert_eq!(engine.employee(e.id).unwrap().load(), 3);
    assert_eq!(engine.unassigned_leads("en").unwrap().len(), 2);
}

#[test]
fn sweep_of_empty_language_is_a_no_op() {
    let engine = test_engine();
    assert_eq!(engine.sweep("").unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Closing
// ---------------------------------------------------------------------------

#[test]
fn closing_frees_capacity_and_backfills() {
    let engine = test_engine();
    let e = employee(&engine, "EMP-A", "hi");
    let mut assigned = Vec::new();
    for i in 0..4 {
        let (l, chosen) = lead(&engine, &format!("l{i}"), "hi");
        if chosen.is_some() {
            assigned.push(l.id);
        }
    }
    assert_eq!(assigned.len(), 3);
    assert_eq!(engine.unassigned_leads("hi").unwrap().len(), 1);

    engine.close_lead(assigned[0], e.id).unwrap();

    // The freed slot went to the waiting lead.
    let after = engine.employee(e.id).unwrap();
    assert_eq!(after.load(), 3);
    assert_eq!(after.closed_leads_count, 1);
    assert!(engine.unassigned_leads("hi").unwrap().is_empty());

    let closed = engine.lead(assigned[0]).unwrap();
    assert_eq!(closed.status, LeadStatus::Closed);
    assert!(closed.closed_at.is_some());
}

#[test]
fn close_is_owner_scoped_and_idempotent() {
    let engine = test_engine();
    let owner = employee(&engine, "EMP-A", "en");
    let stranger = employee(&engine, "EMP-B", "fr");
    let (l, _) = lead(&engine, "l1", "en");

    match engine.close_lead(l.id, stranger.id) {
        Err(Error::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }

    engine.close_lead(l.id, owner.id).unwrap();
    engine.close_lead(l.id, owner.id).unwrap(); // second close is a no-op
    assert_eq!(engine.employee(owner.id).unwrap().closed_leads_count, 1);
}

#[test]
fn scheduled_lead_cannot_close_before_its_appointment() {
    let engine = test_engine();
    let e = employee(&engine, "EMP-A", "en");
    let (l, _) = lead(&engine, "l1", "en");

    let future = chrono::Utc::now() + chrono::Duration::hours(2);
    engine.schedule_lead(l.id, e.id, future).unwrap();
    match engine.close_lead(l.id, e.id) {
        Err(Error::ScheduledAhead { .. }) => {}
        other => panic!("expected ScheduledAhead, got {other:?}"),
    }

    let past = chrono::Utc::now() - chrono::Duration::hours(2);
    engine.schedule_lead(l.id, e.id, past).unwrap();
    engine.close_lead(l.id, e.id).unwrap();
}

// ---------------------------------------------------------------------------
// Employee lifecycle
// ---------------------------------------------------------------------------

#[test]
fn removing_an_employee_orphans_their_leads_without_sweeping() {
    let engine = test_engine();
    let e1 = employee(&engine, "EMP-A", "en");
    let (l1, _) = lead(&engine, "l1", "en");
    let (l2, _) = lead(&engine, "l2", "en");

    // A second employee with spare capacity, hired after the leads
    // were taken. If removal swept, they would pick the orphans up.
    let e2 = employee(&engine, "EMP-B", "en");

    let mut orphaned = engine.remove_employee(e1.id).unwrap();
    orphaned.sort_by_key(|id| id.0);
    let mut expected = vec![l1.id, l2.id];
    expected.sort_by_key(|id| id.0);
    assert_eq!(orphaned, expected);

    for id in [l1.id, l2.id] {
        let l = engine.lead(id).unwrap();
        assert!(l.assigned_to.is_none());
        assert!(l.assigned_at.is_none());
        assert_eq!(l.status, LeadStatus::Ongoing);
    }

    // No auto-sweep on delete; an explicit sweep re-homes them.
    assert_eq!(engine.unassigned_leads("en").unwrap().len(), 2);
    assert_eq!(engine.sweep("en").unwrap(), 2);
    assert_eq!(engine.employee(e2.id).unwrap().load(), 2);
}

#[test]
fn removing_an_employee_with_closed_history_succeeds() {
    let engine = test_engine();
    let e = employee(&engine, "EMP-A", "en");
    let (closed, _) = lead(&engine, "l-closed", "en");
    let (open, _) = lead(&engine, "l-open", "en");
    engine.close_lead(closed.id, e.id).unwrap();

    // The closed lead still references the employee for history; the
    // delete must detach it rather than be blocked by it.
    let orphaned = engine.remove_employee(e.id).unwrap();
    assert_eq!(orphaned, vec![open.id]);

    let open = engine.lead(open.id).unwrap();
    assert!(open.assigned_to.is_none());
    assert!(open.assigned_at.is_none());
    assert_eq!(open.status, LeadStatus::Ongoing);

    let closed = engine.lead(closed.id).unwrap();
    assert_eq!(closed.status, LeadStatus::Closed);
    assert!(closed.assigned_to.is_none());

    assert!(engine.employees().unwrap().is_empty());
}

#[test]
fn language_change_keeps_old_leads_and_sweeps_the_new_partition() {
    let engine = test_engine();
    let e = employee(&engine, "EMP-A", "en");
    let (old, _) = lead(&engine, "l-en", "en");
    let (waiting, chosen) = lead(&engine, "l-fr", "fr");
    assert!(chosen.is_none());

    engine.set_employee_language(e.id, "fr").unwrap();

    // Old lead stays attached even though the partition changed.
    let after = engine.employee(e.id).unwrap();
    assert_eq!(after.language, "fr");
    assert!(after.ongoing_lead_ids.contains(&old.id));

    // New capacity in "fr" picked up the waiting lead.
    assert_eq!(engine.lead(waiting.id).unwrap().assigned_to, Some(e.id));
}

#[test]
fn bulk_remove_skips_unknown_ids() {
    let engine = test_engine();
    let e1 = employee(&engine, "EMP-A", "en");
    let e2 = employee(&engine, "EMP-B", "en");

    let removed = engine
        .remove_employees(&[e1.id, EmployeeId::new(), e2.id])
        .unwrap();
    assert_eq!(removed, 2);
    assert!(engine.employees().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[test]
fn events_trace_the_assignment_flow() {
    let engine = test_engine();
    let e = employee(&engine, "EMP-A", "hi");
    let (l, _) = lead(&engine, "l1", "hi");
    engine.close_lead(l.id, e.id).unwrap();

    let events = engine.events_since(0).unwrap();
    let kinds: Vec<&EventKind> = events.iter().map(|ev| &ev.kind).collect();

    assert!(matches!(kinds[0], EventKind::EmployeeAdded { id, .. } if *id == e.id));
    assert!(kinds
        .iter()
        .any(|k| matches!(k, EventKind::LeadCreated { id, .. } if *id == l.id)));
    assert!(kinds.iter().any(|k| matches!(
        k,
        EventKind::LeadAssigned { lead_id, employee_id, .. }
            if *lead_id == l.id && *employee_id == e.id
    )));
    assert!(kinds
        .iter()
        .any(|k| matches!(k, EventKind::LeadClosed { lead_id, .. } if *lead_id == l.id)));

    // Sequence numbers are strictly increasing.
    for pair in events.windows(2) {
        assert!(pair[0].seq < pair[1].seq);
    }

    // Tail reads resume past what was already seen.
    let last = events.last().unwrap().seq;
    assert!(engine.events_since(last).unwrap().is_empty());
}

#[test]
fn no_capacity_is_reported_not_raised() {
    let engine = test_engine();
    let (l, chosen) = lead(&engine, "l1", "mr");
    assert!(chosen.is_none());

    let events = engine.events_since(0).unwrap();
    assert!(events.iter().any(|ev| matches!(
        &ev.kind,
        EventKind::LeadLeftUnassigned { lead_id, .. } if *lead_id == l.id
    )));
}
