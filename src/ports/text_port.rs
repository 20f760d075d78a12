//! Text-generation capability port.

use async_trait::async_trait;

use crate::domain::error::AdvisorError;

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub system: String,
    pub user: String,
    /// Ask the backend to constrain its reply to a JSON document.
    pub json: bool,
}

impl TextRequest {
    pub fn text(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            json: false,
        }
    }

    pub fn json(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            json: true,
        }
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Raw reply text. Transport failures and timeouts are errors; the
    /// content itself is never validated here.
    async fn complete(&self, request: &TextRequest) -> Result<String, AdvisorError>;
}
