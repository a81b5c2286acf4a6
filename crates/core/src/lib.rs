//! Domain core of the x121 admin console.
//!
//! Holds the data model, the session gate and its storage adapters, the
//! fetch-state machine, and the pure aggregation/filter engine. This crate
//! performs no network I/O; fetched payloads are passed in by the caller.

pub mod credentials;
pub mod dashboard;
pub mod error;
pub mod feedback;
pub mod fetch_state;
pub mod identity;
pub mod session;
pub mod types;
pub mod videos;
pub mod view;
