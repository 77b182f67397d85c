use crate::ai_backend::trim_text;

/// The line the user is composing.
#[derive(Debug, Default)]
pub struct InputField {
    value: String,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Takes the trimmed text out of the field.
    ///
    /// Blank input yields `None` and leaves the field exactly as it was.
    pub fn submit(&mut self) -> Option<String> {
        let text = trim_text(&self.value);
        if text.is_empty() {
            return None;
        }
        let text = text.to_string();
        self.value.clear();
        Some(text)
    }
}
