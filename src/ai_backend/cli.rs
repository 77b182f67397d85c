use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::common::{trim_text, AiBackend, BridgeError, InvocationOptions};
use crate::constants::{MODEL_FLAG, PRINT_FLAG};
use crate::settings::CliSettings;

/// Argument list for one invocation: the print flag, plus the model pair when one is set.
pub fn build_args(options: &InvocationOptions) -> Vec<String> {
    let mut args = vec![PRINT_FLAG.to_string()];
    if let Some(model) = options.model.as_deref().filter(|m| !m.is_empty()) {
        args.push(MODEL_FLAG.to_string());
        args.push(model.to_string());
    }
    args
}

enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut(Duration),
}

/// Runs the assistant executable once per prompt and collects what it prints.
///
/// The prompt goes in on stdin, which is closed once written. Everything the
/// process writes to stdout is gathered until it exits and returned trimmed.
/// The exit status does not affect the result. Stderr is inherited, so the
/// assistant's diagnostics land on our own stderr untouched.
#[derive(Debug, Clone)]
pub struct CliBridge {
    executable: PathBuf,
    timeout: Option<Duration>,
}

impl CliBridge {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub async fn invoke(
        &self,
        prompt: &str,
        options: &InvocationOptions,
    ) -> Result<String, BridgeError> {
        self.invoke_with_cancel(prompt, options, CancellationToken::new())
            .await
    }

    pub async fn invoke_with_cancel(
        &self,
        prompt: &str,
        options: &InvocationOptions,
        cancel: CancellationToken,
    ) -> Result<String, BridgeError> {
        let args = build_args(options);
        debug!(executable = %self.executable.display(), ?args, "spawning assistant");

        let mut child = Command::new(&self.executable)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                executable: self.executable.display().to_string(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::new(ErrorKind::BrokenPipe, "child stdin unavailable"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::new(ErrorKind::BrokenPipe, "child stdout unavailable"))?;

        // Written from its own task so a large prompt can't stall against a full stdout pipe.
        let prompt = prompt.to_owned();
        let writer = tokio::spawn(async move {
            let written = stdin.write_all(prompt.as_bytes()).await;
            drop(stdin);
            written
        });

        let mut output = Vec::new();
        let exchange = async {
            stdout.read_to_end(&mut output).await?;
            child.wait().await
        };
        let deadline = async {
            match self.timeout {
                Some(timeout) => {
                    tokio::time::sleep(timeout).await;
                    timeout
                }
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            status = exchange => Outcome::Exited(status),
            _ = cancel.cancelled() => Outcome::Cancelled,
            timeout = deadline => Outcome::TimedOut(timeout),
        };

        let status = match outcome {
            Outcome::Exited(status) => status?,
            Outcome::Cancelled => {
                writer.abort();
                terminate(&mut child).await;
                return Err(BridgeError::Cancelled);
            }
            Outcome::TimedOut(timeout) => {
                writer.abort();
                terminate(&mut child).await;
                return Err(BridgeError::TimedOut(timeout));
            }
        };

        match writer.await {
            Ok(Ok(())) => {}
            // The assistant may exit without reading all of its input.
            Ok(Err(e)) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("assistant closed stdin early: {e}")
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(e) => return Err(std::io::Error::other(e).into()),
        }

        if !status.success() {
            warn!("{} exited with {status}", self.executable().display());
        }
        let response = trim_text(&String::from_utf8_lossy(&output)).to_string();
        info!("received {} bytes from assistant", response.len());
        Ok(response)
    }
}

async fn terminate(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!("failed to kill assistant process: {e}");
    }
}

/// [`AiBackend`] adapter that carries the options used for every chat turn.
pub struct CliBackend {
    bridge: CliBridge,
    options: InvocationOptions,
}

impl CliBackend {
    pub fn new(bridge: CliBridge, options: InvocationOptions) -> Self {
        Self { bridge, options }
    }

    pub fn from_settings(settings: &CliSettings) -> Self {
        let bridge = CliBridge::new(settings.executable.clone()).with_timeout(settings.timeout());
        let options = InvocationOptions {
            model: settings.model.clone(),
        };
        Self::new(bridge, options)
    }
}

#[async_trait]
impl AiBackend for CliBackend {
    async fn invoke(&self, prompt: String, cancel: CancellationToken) -> Result<String, BridgeError> {
        self.bridge
            .invoke_with_cancel(&prompt, &self.options, cancel)
            .await
    }
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use std::os::unix::fs::PermissionsExt;

    use tempfile::TempDir;

    use super::*;

    pub(crate) fn fake_cli(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("assistant");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn args_without_model() {
        assert_eq!(build_args(&InvocationOptions::default()), vec!["--print"]);
    }

    #[test]
    fn args_with_model() {
        assert_eq!(
            build_args(&InvocationOptions::with_model("m")),
            vec!["--print", "--model", "m"]
        );
    }

    #[test]
    fn empty_model_is_ignored() {
        assert_eq!(build_args(&InvocationOptions::with_model("")), vec!["--print"]);
    }

    #[tokio::test]
    async fn forwards_prompt_and_args() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_cli(&dir, r#"printf 'args:%s\n' "$*"; cat"#);

        let bridge = CliBridge::new(exe);
        let reply = bridge
            .invoke("hello\nworld", &InvocationOptions::with_model("m"))
            .await
            .unwrap();
        assert_eq!(reply, "args:--print --model m\nhello\nworld");

        let reply = bridge
            .invoke("hi", &InvocationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "args:--print\nhi");
    }

    #[tokio::test]
    async fn prompt_arrives_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        // wc only finishes once stdin is closed
        let exe = fake_cli(&dir, "wc -c");

        let prompt = "x".repeat(256 * 1024);
        let reply = CliBridge::new(exe)
            .invoke(&prompt, &InvocationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, prompt.len().to_string());
    }

    #[tokio::test]
    async fn empty_prompt_is_forwarded() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_cli(&dir, "cat");

        let reply = CliBridge::new(exe)
            .invoke("", &InvocationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "");
    }

    #[tokio::test]
    async fn output_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_cli(&dir, r#"printf '\n\n  answer text \t\n'"#);

        let reply = CliBridge::new(exe)
            .invoke("q", &InvocationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "answer text");
        assert_eq!(reply, reply.trim());
    }

    #[tokio::test]
    async fn byte_order_mark_is_trimmed_from_output() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_cli(&dir, r#"printf '\357\273\277answer\n'"#);

        let reply = CliBridge::new(exe)
            .invoke("q", &InvocationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "answer");
    }

    #[tokio::test]
    async fn nonzero_exit_still_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_cli(&dir, "printf ' partial '; exit 3");

        let reply = CliBridge::new(exe)
            .invoke("q", &InvocationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "partial");
    }

    #[tokio::test]
    async fn stderr_is_not_captured() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_cli(&dir, "echo 'diagnostic' >&2; echo ok");

        let reply = CliBridge::new(exe)
            .invoke("q", &InvocationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "ok");
    }

    #[tokio::test]
    async fn exiting_without_reading_stdin_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_cli(&dir, "echo done");

        let prompt = "y".repeat(1024 * 1024);
        let reply = CliBridge::new(exe)
            .invoke(&prompt, &InvocationOptions::default())
            .await
            .unwrap();
        assert_eq!(reply, "done");
    }

    #[tokio::test]
    async fn missing_executable_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CliBridge::new(dir.path().join("no-such-assistant"))
            .invoke("q", &InvocationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Spawn { .. }), "{err:?}");
        assert!(err.to_string().contains("no-such-assistant"));
    }

    #[tokio::test]
    async fn cancel_kills_the_process() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_cli(&dir, "exec sleep 30");

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = CliBridge::new(exe)
            .invoke_with_cancel("q", &InvocationOptions::default(), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn timeout_kills_the_process() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_cli(&dir, "exec sleep 30");

        let err = CliBridge::new(exe)
            .with_timeout(Some(Duration::from_millis(50)))
            .invoke("q", &InvocationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::TimedOut(_)));
    }

    #[tokio::test]
    async fn backend_uses_configured_model() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_cli(&dir, r#"printf '%s' "$*""#);

        let backend = CliBackend::from_settings(&CliSettings {
            executable: exe,
            model: Some("opus".to_string()),
            timeout_secs: None,
        });
        let reply = backend
            .invoke("q".to_string(), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply, "--print --model opus");
    }
}
