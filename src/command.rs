use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::LogLevel;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::ai_backend::{AiBackend, BackendKind, CliBackend, EchoBackend};
use crate::chat::{ChatSession, ChatView};
use crate::constants::DEFAULT_VERBOSITY;
use crate::settings::Settings;

#[derive(Debug)]
pub struct ConfigLogLevel {}

impl LogLevel for ConfigLogLevel {
    fn default() -> Option<clap_verbosity_flag::Level> {
        // read only: the config file is created by `Settings::new` in main
        let log_level = Settings::load(&Settings::config_path())
            .ok()
            .and_then(|settings| settings.verbosity)
            .unwrap_or_else(|| DEFAULT_VERBOSITY.to_string());
        match log_level.as_str() {
            "error" => Some(clap_verbosity_flag::Level::Error),
            "warn" => Some(clap_verbosity_flag::Level::Warn),
            "info" => Some(clap_verbosity_flag::Level::Info),
            "debug" => Some(clap_verbosity_flag::Level::Debug),
            "trace" => Some(clap_verbosity_flag::Level::Trace),
            "off" => None,
            _ => Some(clap_verbosity_flag::Level::Warn),
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct ChatArgs {
    /// Enable tracing (generates a trace-timestamp.json file).
    #[arg(long)]
    pub tracing: bool,

    /// Send one prompt, print the reply and exit.
    #[arg(long)]
    pub prompt: Option<String>,

    /// Where replies come from; overrides `backend` in the config file.
    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Model name passed to the assistant executable.
    #[arg(long)]
    pub model: Option<String>,

    /// Assistant executable to run.
    #[arg(long)]
    pub executable: Option<PathBuf>,

    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<ConfigLogLevel>,
}

pub struct ChatCli {
    settings: Settings,
    args: ChatArgs,
    start: Instant,
}

impl ChatCli {
    pub fn new(settings: Settings, args: ChatArgs, start: Option<Instant>) -> Self {
        Self {
            settings: merge_args(settings, &args),
            args,
            start: start.unwrap_or(Instant::now()),
        }
    }

    pub fn exec(self) -> Result<()> {
        let backend = self.backend();
        let runtime = tokio::runtime::Runtime::new()?;
        let result = runtime.block_on(async {
            match self.args.prompt.as_deref() {
                Some(prompt) => self.one_shot(backend, prompt).await,
                None => self.interactive(backend).await,
            }
        });
        // stdin reads run on a blocking thread that never returns on its own
        runtime.shutdown_background();
        result
    }

    fn backend(&self) -> Arc<dyn AiBackend> {
        info!("using {:?} backend", self.settings.backend);
        match self.settings.backend {
            BackendKind::Echo => Arc::new(EchoBackend::from_settings(&self.settings.chat)),
            BackendKind::Cli => Arc::new(CliBackend::from_settings(&self.settings.cli)),
        }
    }

    async fn one_shot(&self, backend: Arc<dyn AiBackend>, prompt: &str) -> Result<()> {
        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });

        let reply = backend
            .invoke(prompt.to_string(), cancel)
            .await
            .context("assistant request failed")?;
        println!("{reply}");
        info!("answered in {:?}", self.start.elapsed());
        Ok(())
    }

    async fn interactive(&self, backend: Arc<dyn AiBackend>) -> Result<()> {
        debug!("starting chat session after {:?}", self.start.elapsed());
        let reader = BufReader::new(tokio::io::stdin());
        let view = ChatView::new(std::io::stdout());
        let view = ChatSession::new(reader, view, backend)
            .run(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
        info!(
            "session ended with {} messages after {:?}",
            view.messages().len(),
            self.start.elapsed()
        );
        Ok(())
    }
}

/// Command-line flags take precedence over the config file and environment.
fn merge_args(mut settings: Settings, args: &ChatArgs) -> Settings {
    if let Some(backend) = args.backend {
        settings.backend = backend;
    }
    if let Some(model) = &args.model {
        settings.cli.model = Some(model.clone());
    }
    if let Some(executable) = &args.executable {
        settings.cli.executable = executable.clone();
    }
    settings
}
