//! Natural-language warehouse agent: question in, guarded SQL out.
//!
//! This crate has no database dependencies. It generates and validates
//! SQL; executing it against the warehouse stays in the portal
//! application, which owns the connection pool and row limits.

pub mod generator;
pub mod guard;
pub mod llm_client;
pub mod openai_client;

pub use generator::SqlGenerator;
pub use guard::{guard_sql, GuardError};
pub use llm_client::LlmClient;
pub use openai_client::OpenAiClient;
