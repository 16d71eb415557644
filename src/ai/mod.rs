pub mod client;
pub mod prompts;
pub mod types;

pub use client::OpenAiGateway;
pub use types::AiError;

use crate::errors::{AppError, AppResult};
use crate::models::Persona;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// The one capability the core consumes from the text-generation service:
/// submit a prompt plus a persona role label, get text or a typed failure.
/// No streaming, no automatic retry.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    async fn complete(&self, prompt: &str, role: &str) -> Result<String, AiError>;
}

/// Monotonic request token per persona call site. A completion is applied
/// only when no newer request for the same persona was issued while it was
/// in flight, so a slow response can never overwrite a newer one.
#[derive(Debug, Default)]
pub struct RequestTracker {
    latest: Mutex<HashMap<Persona, u64>>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, persona: Persona) -> AppResult<u64> {
        let mut latest = self.lock_latest()?;
        let token = latest.entry(persona).or_insert(0);
        *token += 1;
        Ok(*token)
    }

    pub fn is_current(&self, persona: Persona, token: u64) -> AppResult<bool> {
        let latest = self.lock_latest()?;
        Ok(latest.get(&persona).copied() == Some(token))
    }

    fn lock_latest(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<Persona, u64>>> {
        self.latest
            .lock()
            .map_err(|_| AppError::Internal("request tracker mutex poisoned".to_string()))
    }
}
