use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::ai_backend::{AiBackend, BridgeError};

/// A finished reply, successful or not.
#[derive(Debug)]
pub struct Reply {
    pub prompt: String,
    pub outcome: Result<String, BridgeError>,
}

/// Pending replies, each running as its own task.
///
/// Every task gets a child of one root token, so [`ReplyScheduler::shutdown`]
/// (or dropping the scheduler) cancels everything still in flight.
pub struct ReplyScheduler {
    root: CancellationToken,
    tasks: JoinSet<Reply>,
}

impl ReplyScheduler {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
            tasks: JoinSet::new(),
        }
    }

    pub fn schedule(&mut self, backend: Arc<dyn AiBackend>, prompt: String) {
        let cancel = self.root.child_token();
        debug!("scheduling reply, {} already pending", self.tasks.len());
        self.tasks.spawn(async move {
            let outcome = backend.invoke(prompt.clone(), cancel).await;
            Reply { prompt, outcome }
        });
    }

    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Next reply in completion order, or `None` once nothing is pending.
    pub async fn next_reply(&mut self) -> Option<Reply> {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(reply) => return Some(reply),
                Err(e) if e.is_cancelled() => debug!("reply task aborted"),
                Err(e) => error!("reply task failed: {e}"),
            }
        }
        None
    }

    pub fn shutdown(&mut self) {
        if !self.root.is_cancelled() {
            debug!("cancelling {} pending replies", self.tasks.len());
        }
        self.root.cancel();
    }
}

impl Default for ReplyScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ReplyScheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
