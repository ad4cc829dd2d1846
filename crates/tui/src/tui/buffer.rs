/// Single-line editable text with a byte cursor kept on char boundaries.
#[derive(Debug, Clone, Default)]
pub struct QueryBuffer {
    text: String,
    cursor: usize,
}

impl QueryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn set<T: Into<String>>(&mut self, value: T) {
        self.text = value.into();
        self.cursor = self.text.len();
    }

    pub fn insert_char(&mut self, ch: char) {
        if ch.is_control() {
            return;
        }
        self.text.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    pub fn backspace(&mut self) {
        if let Some((idx, _)) = self.text[..self.cursor].char_indices().next_back() {
            self.text.drain(idx..self.cursor);
            self.cursor = idx;
        }
    }

    pub fn delete_char(&mut self) {
        if let Some(ch) = self.text[self.cursor..].chars().next() {
            self.text.drain(self.cursor..self.cursor + ch.len_utf8());
        }
    }

    /// Remove the word before the cursor, like Ctrl+W in a shell.
    pub fn delete_word(&mut self) {
        let head = &self.text[..self.cursor];
        let trimmed = head.trim_end();
        let start = trimmed
            .char_indices()
            .rev()
            .find(|(_, ch)| ch.is_whitespace())
            .map(|(idx, ch)| idx + ch.len_utf8())
            .unwrap_or(0);
        self.text.drain(start..self.cursor);
        self.cursor = start;
    }

    pub fn move_left(&mut self) {
        if let Some((idx, _)) = self.text[..self.cursor].char_indices().next_back() {
            self.cursor = idx;
        }
    }

    pub fn move_right(&mut self) {
        if let Some(ch) = self.text[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.text.len();
    }

    /// Cursor position in characters, for placing the terminal cursor.
    pub fn cursor_column(&self) -> usize {
        self.text[..self.cursor].chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editing_respects_multibyte_characters() {
        let mut buffer = QueryBuffer::new();
        for ch in "Gəncə".chars() {
            buffer.insert_char(ch);
        }
        buffer.move_left();
        buffer.backspace();

        assert_eq!(buffer.as_str(), "Gənə");
        assert_eq!(buffer.cursor_column(), 3);
    }

    #[test]
    fn delete_word_removes_the_last_word_only() {
        let mut buffer = QueryBuffer::new();
        buffer.set("bakı xətai ");
        buffer.delete_word();
        assert_eq!(buffer.as_str(), "bakı ");

        buffer.move_home();
        buffer.delete_char();
        assert_eq!(buffer.as_str(), "akı ");
    }

    #[test]
    fn control_characters_are_ignored() {
        let mut buffer = QueryBuffer::new();
        buffer.insert_char('\t');
        buffer.insert_char('\n');
        assert!(buffer.is_empty());
    }
}
