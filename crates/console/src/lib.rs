//! Async side of the admin console.
//!
//! Talks to the backend over HTTP, runs the fetch lifecycle for the gated
//! dashboard and feedback queries, and resolves the caller's owned videos.
//! Pure domain types live in `x121_console_core`.

pub mod api;
pub mod config;
pub mod console;
pub mod fetch;
pub mod list_resolver;
pub mod retry;
pub mod telemetry;

pub use console::AdminConsole;
