pub mod input;
pub mod message;
pub mod scheduler;
pub mod session;
pub mod view;

pub use input::InputField;
pub use message::{Message, MessageKind, Sender};
pub use scheduler::{Reply, ReplyScheduler};
pub use session::ChatSession;
pub use view::ChatView;
