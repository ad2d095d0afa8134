//! # leadrota
//!
//! Lead assignment core for a CRM, consumed in-process by the
//! surrounding CRUD layer.
//!
//! Decides which employee receives each new lead, keeps every
//! employee's open-lead count under a capacity threshold, and
//! re-balances the unassigned backlog whenever capacity is freed.
//! Candidates are matched within one language partition; ties among
//! equally-loaded employees rotate via a per-partition cursor.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod storage;
