//! `fairways-recon`: contact directory reconciliation engine.
//!
//! Maps intake form submissions onto the canonical directory, finds the
//! existing entry (parcel by address, then email, then name), and either
//! updates the changed cells or appends a new row with derived fields.
//! Storage and message transport sit behind the traits in [`store`].

pub mod address;
pub mod approval;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod fields;
pub mod formatting;
pub mod links;
pub mod mapping;
pub mod matcher;
pub mod model;
pub mod notify;
pub mod store;

pub use approval::{ApprovalRequest, Decision, Workflow};
pub use config::{ReconConfig, ReconOptions, Target};
pub use engine::Reconciler;
pub use error::{ReconError, StoreError};
pub use model::{IntakeRecord, ReconOutcome, ReconPlan, Record};
pub use notify::Notification;
pub use store::{DirectoryStore, IntakeStore, Notifier};
