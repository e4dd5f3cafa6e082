//! LLM client abstraction.
//!
//! One seam for every model backend so the SQL generator and tests can
//! swap providers without touching prompt logic.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a system + user prompt pair, get the raw completion text.
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Model identifier for logging.
    fn model_name(&self) -> &str;

    /// Provider name for logging.
    fn provider_name(&self) -> &str;
}
