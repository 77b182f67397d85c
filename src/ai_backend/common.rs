use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

/// Trims whitespace at both ends, treating a byte-order mark as whitespace too.
pub fn trim_text(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Canned local reply after a short delay.
    Echo,
    /// Pipe the prompt through the assistant executable.
    Cli,
}

/// Per-call options forwarded to the assistant executable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InvocationOptions {
    /// Backend model name; `None` leaves the choice to the executable.
    pub model: Option<String>,
}

impl InvocationOptions {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("failed to start `{executable}`: {source}")]
    Spawn {
        executable: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error while talking to the assistant: {0}")]
    Io(#[from] std::io::Error),
    #[error("request cancelled")]
    Cancelled,
    #[error("no response within {0:?}")]
    TimedOut(Duration),
}

#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Produces the reply for `prompt`. Implementations stop early once `cancel` fires.
    async fn invoke(&self, prompt: String, cancel: CancellationToken) -> Result<String, BridgeError>;
}
