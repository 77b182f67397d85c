pub mod ai_backend;
pub mod chat;
pub mod command;
pub mod constants;
pub mod settings;

pub use command::{ChatArgs, ChatCli};
pub use settings::Settings;
