// constants file
pub const APP_NAME: &str = "cli-chat";
pub const ENV_PREFIX: &str = "CLI_CHAT";

pub const DEFAULT_EXECUTABLE: &str = "claude";
pub const PRINT_FLAG: &str = "--print";
pub const MODEL_FLAG: &str = "--model";

pub const DEFAULT_REPLY_DELAY_MS: u64 = 500;
pub const DEFAULT_ECHO_PREFIX: &str = "You said: ";
pub const DEFAULT_VERBOSITY: &str = "warn";

pub const DEFAULT_CONFIG_CONTENT: &str = r#"# cli-chat configuration
# Every key can also be set from the environment, e.g. CLI_CHAT_CLI__MODEL=sonnet

verbosity = "warn"

# "echo" answers locally with a canned reply, "cli" pipes prompts through the assistant executable.
backend = "echo"

[cli]
executable = "claude"
# model = "sonnet"
# timeout_secs = 300

[chat]
reply_delay_ms = 500
echo_prefix = "You said: "
"#;
