use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, info, warn};

use super::input::InputField;
use super::message::{Message, Sender};
use super::scheduler::{Reply, ReplyScheduler};
use super::view::ChatView;
use crate::ai_backend::{AiBackend, BridgeError};

/// Interactive loop: reads submitted lines, appends them to the view and
/// appends each backend reply as it completes.
pub struct ChatSession<R, W: Write> {
    lines: Lines<R>,
    input: InputField,
    view: ChatView<W>,
    backend: Arc<dyn AiBackend>,
    scheduler: ReplyScheduler,
    spinner: Option<ProgressBar>,
    show_progress: bool,
}

impl<R, W> ChatSession<R, W>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    pub fn new(reader: R, view: ChatView<W>, backend: Arc<dyn AiBackend>) -> Self {
        Self {
            lines: reader.lines(),
            input: InputField::new(),
            view,
            backend,
            scheduler: ReplyScheduler::new(),
            spinner: None,
            show_progress: true,
        }
    }

    /// Show a spinner on stderr while replies are outstanding.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Runs until input is exhausted and every pending reply has been shown,
    /// or until `interrupt` resolves, which drops whatever is still pending.
    pub async fn run<F>(mut self, interrupt: F) -> Result<ChatView<W>>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(interrupt);
        let mut input_open = true;

        loop {
            if !input_open && self.scheduler.pending() == 0 {
                debug!("input closed and no replies pending");
                break;
            }

            tokio::select! {
                _ = &mut interrupt => {
                    info!("interrupted with {} replies pending", self.scheduler.pending());
                    self.scheduler.shutdown();
                    break;
                }
                line = self.lines.next_line(), if input_open => match line? {
                    Some(line) => self.submit(line),
                    None => input_open = false,
                },
                reply = self.scheduler.next_reply(), if self.scheduler.pending() > 0 => match reply {
                    Some(reply) => self.deliver(reply),
                    None => debug!("no reply tasks left to join"),
                },
            }
            self.update_spinner();
        }

        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
        Ok(self.view)
    }

    fn submit(&mut self, line: String) {
        self.input.set_value(line);
        let Some(text) = self.input.submit() else {
            return;
        };
        self.append(Message::new(Sender::User, text.clone()));
        self.scheduler.schedule(self.backend.clone(), text);
    }

    fn deliver(&mut self, reply: Reply) {
        match reply.outcome {
            Ok(text) => self.append(Message::new(Sender::Bot, text)),
            Err(BridgeError::Cancelled) => debug!("reply to {:?} cancelled", reply.prompt),
            Err(e) => {
                warn!("reply to {:?} failed: {e}", reply.prompt);
                self.append(Message::error(e.to_string()));
            }
        }
    }

    fn append(&mut self, message: Message) {
        let view = &mut self.view;
        match &self.spinner {
            Some(spinner) => spinner.suspend(|| view.append(message)),
            None => view.append(message),
        }
    }

    fn update_spinner(&mut self) {
        let pending = self.scheduler.pending();
        if pending == 0 {
            if let Some(spinner) = self.spinner.take() {
                spinner.finish_and_clear();
            }
            return;
        }
        if !self.show_progress {
            return;
        }
        let spinner = self.spinner.get_or_insert_with(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.enable_steady_tick(Duration::from_millis(100));
            spinner
        });
        spinner.set_message(format!("waiting for {pending} repl{}", if pending == 1 { "y" } else { "ies" }));
    }
}
