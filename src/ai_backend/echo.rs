use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::common::{AiBackend, BridgeError};
use crate::settings::ChatSettings;

/// Placeholder responder: repeats the prompt back after a fixed delay.
pub struct EchoBackend {
    delay: Duration,
    prefix: String,
}

impl EchoBackend {
    pub fn new(delay: Duration, prefix: impl Into<String>) -> Self {
        Self {
            delay,
            prefix: prefix.into(),
        }
    }

    pub fn from_settings(settings: &ChatSettings) -> Self {
        Self::new(settings.reply_delay(), settings.echo_prefix.clone())
    }
}

#[async_trait]
impl AiBackend for EchoBackend {
    async fn invoke(&self, prompt: String, cancel: CancellationToken) -> Result<String, BridgeError> {
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {
                debug!("echo reply ready after {:?}", self.delay);
                Ok(format!("{}{}", self.prefix, prompt))
            }
            _ = cancel.cancelled() => Err(BridgeError::Cancelled),
        }
    }
}
