use serde::Serialize;

/// Static announcement box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextBox {
    pub title: String,
    pub text: String,
}

impl TextBox {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
        }
    }
}
