pub mod cli;
pub mod common;
pub mod echo;

pub use cli::{build_args, CliBackend, CliBridge};
pub use common::{trim_text, AiBackend, BackendKind, BridgeError, InvocationOptions};
pub use echo::EchoBackend;
