use kira_common::span::Location;

/// Character-level source iterator for the Kira lexer.
///
/// Wraps a source string and provides character-by-character iteration
/// with full location tracking: byte offset, 1-based line, and 1-based
/// column. Columns count characters, offsets count bytes.
pub struct Cursor<'src> {
    source: &'src str,
    chars: std::str::Chars<'src>,
    loc: Location,
}

impl<'src> Cursor<'src> {
    /// Create a new cursor at the start of the source text.
    pub fn new(source: &'src str) -> Self {
        Self::with_start(source, Location::start())
    }

    /// Create a cursor whose locations begin at `start`.
    ///
    /// Used when lexing an embedded fragment (a string-interpolation
    /// expression) so its spans still point into the enclosing file.
    pub fn with_start(source: &'src str, start: Location) -> Self {
        Self {
            source,
            chars: source.chars(),
            loc: start,
        }
    }

    /// Look at the current character without consuming it.
    pub fn peek(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Look at the character after the current one without consuming anything.
    pub fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next()
    }

    /// Consume the current character and advance the location.
    ///
    /// Returns the consumed character, or `None` at end of input.
    pub fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.loc.offset += c.len_utf8() as u32;
        if c == '\n' {
            self.loc.line += 1;
            self.loc.column = 1;
        } else {
            self.loc.column += 1;
        }
        Some(c)
    }

    /// Current location in the source text.
    pub fn location(&self) -> Location {
        self.loc
    }

    /// Whether there are no more characters to consume.
    pub fn is_eof(&self) -> bool {
        self.peek().is_none()
    }

    /// Advance while the predicate holds for the current character.
    pub fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Consume the current character if it equals `expected`.
    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Extract a slice of the source text by absolute byte offsets.
    ///
    /// Offsets are relative to the file, as produced by [`Self::location`];
    /// the cursor subtracts its own starting offset.
    pub fn slice(&self, start: u32, end: u32) -> &'src str {
        let base = self.base_offset();
        &self.source[(start - base) as usize..(end - base) as usize]
    }

    fn base_offset(&self) -> u32 {
        self.loc.offset - (self.source.len() - self.chars.as_str().len()) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_tracks_lines_and_columns() {
        let mut cursor = Cursor::new("ab\ncd");
        assert_eq!(cursor.location(), Location::new(1, 1, 0));
        cursor.advance();
        cursor.advance();
        assert_eq!(cursor.location(), Location::new(1, 3, 2));
        cursor.advance(); // \n
        assert_eq!(cursor.location(), Location::new(2, 1, 3));
        cursor.advance();
        assert_eq!(cursor.location(), Location::new(2, 2, 4));
    }

    #[test]
    fn advance_tracks_multibyte_utf8() {
        // U+00E9 is 2 bytes in UTF-8 but one column.
        let mut cursor = Cursor::new("\u{00E9}a");
        cursor.advance();
        assert_eq!(cursor.location(), Location::new(1, 2, 2));
        cursor.advance();
        assert_eq!(cursor.location(), Location::new(1, 3, 3));
    }

    #[test]
    fn eat_while_and_eat() {
        let mut cursor = Cursor::new("aaab");
        cursor.eat_while(|c| c == 'a');
        assert_eq!(cursor.location().offset, 3);
        assert!(cursor.eat('b'));
        assert!(!cursor.eat('b'));
        assert!(cursor.is_eof());
    }

    #[test]
    fn slice_uses_absolute_offsets() {
        let mut cursor = Cursor::new("hello world");
        for _ in 0..5 {
            cursor.advance();
        }
        assert_eq!(cursor.slice(0, 5), "hello");
        assert_eq!(cursor.slice(6, 11), "world");
    }

    #[test]
    fn with_start_offsets_locations() {
        let mut cursor = Cursor::with_start("xy", Location::new(3, 7, 42));
        cursor.advance();
        assert_eq!(cursor.location(), Location::new(3, 8, 43));
        assert_eq!(cursor.slice(42, 44), "xy");
    }
}
