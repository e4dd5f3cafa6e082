//! Insurance operations portal.
//!
//! The application crate: REST surface, database services and the wiring
//! between them. Workflow rules live in `ib-workflow`, document ingestion
//! in `ib-ingest`, the NL-to-SQL agent in `ib-agentic` and the shared
//! vocabulary in `ib-portal-types`.

pub mod api;
pub mod config;
pub mod database;
pub mod error;

pub use config::PortalConfig;
pub use error::PortalError;
