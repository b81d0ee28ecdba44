//! Inline text editing buffer.

use crate::input::{Key, Modifiers};

/// Result of handling a key while editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEditResult {
    /// Key consumed, text or caret may have changed.
    Handled,
    /// User confirmed the edit.
    Commit,
    /// User abandoned the edit.
    Cancel,
    /// Key not relevant to editing.
    NotHandled,
}

/// Text being edited with a caret position (in chars).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditBuffer {
    text: String,
    cursor: usize,
}

impl EditBuffer {
    /// Start editing `text` with the caret at the end.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.chars().count();
        Self { text, cursor }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Caret position in chars.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map(|(i, _)| i)
            .unwrap_or(self.text.len())
    }

    /// Insert text at the caret.
    pub fn insert(&mut self, s: &str) {
        let at = self.byte_index(self.cursor);
        self.text.insert_str(at, s);
        self.cursor += s.chars().count();
    }

    /// Handle a key press. Enter confirms, Shift+Enter inserts a line break,
    /// Escape cancels.
    pub fn handle_key(&mut self, key: &Key, modifiers: Modifiers) -> TextEditResult {
        match key {
            Key::Character(s) => {
                if modifiers.ctrl || modifiers.meta {
                    return TextEditResult::NotHandled;
                }
                self.insert(s);
            }
            Key::Enter if modifiers.shift => self.insert("\n"),
            Key::Enter => return TextEditResult::Commit,
            Key::Escape => return TextEditResult::Cancel,
            Key::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_index(self.cursor);
                    self.text.remove(at);
                }
            }
            Key::Delete => {
                if self.cursor < self.text.chars().count() {
                    let at = self.byte_index(self.cursor);
                    self.text.remove(at);
                }
            }
            Key::Left => self.cursor = self.cursor.saturating_sub(1),
            Key::Right => self.cursor = (self.cursor + 1).min(self.text.chars().count()),
            Key::Home => self.cursor = 0,
            Key::End => self.cursor = self.text.chars().count(),
        }
        TextEditResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift() -> Modifiers {
        Modifiers {
            shift: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_typing_and_backspace() {
        let mut buf = EditBuffer::new("Hi");
        buf.handle_key(&Key::Character("!".into()), Modifiers::default());
        assert_eq!(buf.text(), "Hi!");
        buf.handle_key(&Key::Backspace, Modifiers::default());
        buf.handle_key(&Key::Backspace, Modifiers::default());
        assert_eq!(buf.text(), "H");
    }

    #[test]
    fn test_caret_movement_multibyte() {
        let mut buf = EditBuffer::new("héllo");
        buf.handle_key(&Key::Home, Modifiers::default());
        buf.handle_key(&Key::Right, Modifiers::default());
        buf.handle_key(&Key::Delete, Modifiers::default());
        assert_eq!(buf.text(), "hllo");
        buf.handle_key(&Key::Character("é".into()), Modifiers::default());
        assert_eq!(buf.text(), "héllo");
        assert_eq!(buf.cursor(), 2);
    }

    #[test]
    fn test_enter_variants() {
        let mut buf = EditBuffer::new("a");
        assert_eq!(buf.handle_key(&Key::Enter, shift()), TextEditResult::Handled);
        assert_eq!(buf.text(), "a\n");
        assert_eq!(buf.handle_key(&Key::Enter, Modifiers::default()), TextEditResult::Commit);
        assert_eq!(buf.handle_key(&Key::Escape, Modifiers::default()), TextEditResult::Cancel);
    }

    #[test]
    fn test_shortcuts_pass_through() {
        let mut buf = EditBuffer::new("a");
        let ctrl = Modifiers {
            ctrl: true,
            ..Default::default()
        };
        assert_eq!(
            buf.handle_key(&Key::Character("s".into()), ctrl),
            TextEditResult::NotHandled
        );
        assert_eq!(buf.text(), "a");
    }
}
