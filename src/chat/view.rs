use std::io::Write;

use tracing::warn;

use super::message::{Message, MessageKind, Sender};

/// Append-only chat log rendered onto a writer.
///
/// Each entry is printed as a labelled block as soon as it is appended and the
/// writer is flushed, so the newest entry is always the last thing on screen.
pub struct ChatView<W: Write> {
    out: W,
    log: Vec<Message>,
}

impl<W: Write> ChatView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            log: Vec::new(),
        }
    }

    pub fn append_message(&mut self, sender: Sender, text: &str) {
        self.append(Message::new(sender, text));
    }

    pub fn append(&mut self, message: Message) {
        // A broken terminal shouldn't lose the entry from the log.
        if let Err(e) = self.render(&message) {
            warn!("failed to render {} message: {e}", message.sender);
        }
        self.log.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, message: &Message) -> std::io::Result<()> {
        let label = message.sender.label();
        let indent = " ".repeat(label.len() + 2);
        let text = match message.kind {
            MessageKind::Normal => message.text.clone(),
            MessageKind::Error => format!("error: {}", message.text),
        };

        let mut lines = text.lines();
        writeln!(self.out, "{label}> {}", lines.next().unwrap_or(""))?;
        for line in lines {
            writeln!(self.out, "{indent}{line}")?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(view: ChatView<Vec<u8>>) -> String {
        String::from_utf8(view.into_inner()).unwrap()
    }

    #[test]
    fn appends_in_call_order() {
        let mut view = ChatView::new(Vec::new());
        view.append_message(Sender::User, "a");
        view.append_message(Sender::Bot, "b");

        assert_eq!(
            view.messages(),
            &[Message::new(Sender::User, "a"), Message::new(Sender::Bot, "b")]
        );
        assert_eq!(rendered(view), "you> a\nbot> b\n");
    }

    #[test]
    fn multiline_text_is_indented() {
        let mut view = ChatView::new(Vec::new());
        view.append_message(Sender::Bot, "first\nsecond");
        assert_eq!(rendered(view), "bot> first\n     second\n");
    }

    #[test]
    fn empty_text_is_accepted() {
        let mut view = ChatView::new(Vec::new());
        view.append_message(Sender::User, "");
        assert_eq!(view.messages().len(), 1);
        assert_eq!(rendered(view), "you> \n");
    }

    #[test]
    fn error_messages_are_marked() {
        let mut view = ChatView::new(Vec::new());
        view.append(Message::error("failed to start `claude`"));
        assert_eq!(view.messages()[0].kind, MessageKind::Error);
        assert_eq!(rendered(view), "bot> error: failed to start `claude`\n");
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_still_records_message() {
        let mut view = ChatView::new(BrokenPipe);
        view.append_message(Sender::User, "kept");
        assert_eq!(view.messages(), &[Message::new(Sender::User, "kept")]);
    }
}
