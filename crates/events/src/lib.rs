//! # Audit Events
//!
//! This crate defines the business events the exchange under test reports to
//! the audit log service (signups, signins, orders, order errors, trades), and
//! the predicate filter the scenario engine uses to pick them apart.
//!
//! As a Layer 0 crate, it depends only on `core-types`. Events are read-only
//! here: nothing in the workspace ever writes to the audit log.

// Declare the modules that make up this crate.
pub mod error;
pub mod filter;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use filter::filter_events;
pub use messages::{
    AuditEvent, LogPayload, LogTag, OrderDeleteLog, OrderErrorLog, OrderLog, OrderTradeLog,
    RawEvent, SigninLog, SignupLog, TradeLog,
};
