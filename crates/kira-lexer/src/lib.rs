// Kira lexer -- tokenizer for the Kira programming language.

mod cursor;

use cursor::Cursor;
use kira_common::diagnostic::Diagnostic;
use kira_common::span::{Location, Span};
use kira_common::token::{keyword_from_str, LitValue, NumSuffix, Token, TokenKind};

/// One part of an interpolated string literal.
///
/// `"a ${x} b"` splits into `Lit("a ")`, `Expr { source: "x", .. }`,
/// `Lit(" b")`. The parser re-lexes each `Expr` part with
/// [`Lexer::with_start`] so its spans stay file-relative.
#[derive(Debug, Clone, PartialEq)]
pub enum StringPart {
    Lit(String),
    Expr { source: String, start: Location },
}

/// The Kira lexer. Converts source text into a stream of tokens.
///
/// Wraps a [`Cursor`] for character-level iteration. Newlines are
/// significant (they terminate statements) and are emitted as tokens;
/// spaces and tabs are skipped. Errors never abort the lexer: each one
/// becomes an `Error` token plus a diagnostic, and lexing continues so
/// multiple problems surface per run.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            diagnostics: Vec::new(),
        }
    }

    /// Create a lexer for an embedded fragment starting at `start`.
    pub fn with_start(source: &'src str, start: Location) -> Self {
        Self {
            cursor: Cursor::with_start(source, start),
            diagnostics: Vec::new(),
        }
    }

    /// Convenience: tokenize an entire source string.
    ///
    /// The returned vector always ends with an `Eof` token.
    pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        Lexer::new(source).run()
    }

    /// Tokenize everything the lexer was constructed over.
    pub fn run(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn error(&mut self, code: &str, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }

    fn span_from(&self, start: Location) -> Span {
        Span::new(start, self.cursor.location())
    }

    fn text_from(&self, start: Location) -> String {
        self.cursor
            .slice(start.offset, self.cursor.location().offset)
            .to_string()
    }

    fn token_from(&self, kind: TokenKind, start: Location) -> Token {
        Token::new(kind, self.text_from(start), self.span_from(start))
    }

    /// Produce the next token, skipping whitespace and plain comments.
    fn next_token(&mut self) -> Token {
        loop {
            self.cursor.eat_while(|c| c == ' ' || c == '\t');

            let start = self.cursor.location();
            let Some(c) = self.cursor.peek() else {
                return Token::new(TokenKind::Eof, "", Span::point(start));
            };

            match c {
                '\n' => {
                    self.cursor.advance();
                    return self.token_from(TokenKind::Newline, start);
                }
                '\r' => {
                    self.cursor.advance();
                    // \r\n folds into a single Newline token.
                    self.cursor.eat('\n');
                    return self.token_from(TokenKind::Newline, start);
                }
                '/' if self.cursor.peek_next() == Some('/') => {
                    if let Some(doc) = self.lex_comment(start) {
                        return doc;
                    }
                    // Plain comment: skipped entirely, keep scanning.
                }
                '(' => return self.single(TokenKind::LParen, start),
                ')' => return self.single(TokenKind::RParen, start),
                '{' => return self.single(TokenKind::LBrace, start),
                '}' => return self.single(TokenKind::RBrace, start),
                '[' => return self.single(TokenKind::LBracket, start),
                ']' => return self.single(TokenKind::RBracket, start),
                ',' => return self.single(TokenKind::Comma, start),
                ';' => return self.single(TokenKind::Semicolon, start),
                ':' => return self.single(TokenKind::Colon, start),
                '+' => return self.single(TokenKind::Plus, start),
                '*' => return self.single(TokenKind::Star, start),
                '/' => return self.single(TokenKind::Slash, start),
                '%' => return self.single(TokenKind::Percent, start),
                '|' => return self.single(TokenKind::Pipe, start),
                '&' => return self.single(TokenKind::Amp, start),
                '@' => return self.single(TokenKind::At, start),
                '.' => return self.lex_dot(start),
                '=' => return self.lex_eq(start),
                '!' => return self.lex_bang(start),
                '<' => return self.lex_lt(start),
                '>' => return self.lex_gt(start),
                '-' => return self.lex_minus(start),
                '?' => return self.lex_question(start),
                '0'..='9' => return self.lex_number(start),
                '"' => return self.lex_string(start),
                '\'' => return self.lex_char(start),
                c if is_ident_start(c) => return self.lex_ident(start),
                _ => {
                    self.cursor.advance();
                    let span = self.span_from(start);
                    self.error("L0004", format!("stray character `{c}`"), span);
                    return self.token_from(TokenKind::Error, start);
                }
            }
        }
    }

    fn single(&mut self, kind: TokenKind, start: Location) -> Token {
        self.cursor.advance();
        self.token_from(kind, start)
    }

    // ── Multi-character operators ──────────────────────────────────────

    fn lex_dot(&mut self, start: Location) -> Token {
        self.cursor.advance(); // .
        if self.cursor.eat('.') {
            if self.cursor.eat('=') {
                self.token_from(TokenKind::DotDotEq, start)
            } else {
                self.token_from(TokenKind::DotDot, start)
            }
        } else {
            self.token_from(TokenKind::Dot, start)
        }
    }

    fn lex_eq(&mut self, start: Location) -> Token {
        self.cursor.advance(); // =
        if self.cursor.eat('=') {
            self.token_from(TokenKind::EqEq, start)
        } else if self.cursor.eat('>') {
            self.token_from(TokenKind::FatArrow, start)
        } else {
            self.token_from(TokenKind::Eq, start)
        }
    }

    fn lex_bang(&mut self, start: Location) -> Token {
        self.cursor.advance(); // !
        if self.cursor.eat('=') {
            self.token_from(TokenKind::NotEq, start)
        } else {
            self.token_from(TokenKind::Bang, start)
        }
    }

    fn lex_lt(&mut self, start: Location) -> Token {
        self.cursor.advance(); // <
        if self.cursor.eat('=') {
            self.token_from(TokenKind::LtEq, start)
        } else {
            self.token_from(TokenKind::Lt, start)
        }
    }

    fn lex_gt(&mut self, start: Location) -> Token {
        self.cursor.advance(); // >
        if self.cursor.eat('=') {
            self.token_from(TokenKind::GtEq, start)
        } else {
            self.token_from(TokenKind::Gt, start)
        }
    }

    fn lex_minus(&mut self, start: Location) -> Token {
        self.cursor.advance(); // -
        if self.cursor.eat('>') {
            self.token_from(TokenKind::Arrow, start)
        } else {
            self.token_from(TokenKind::Minus, start)
        }
    }

    fn lex_question(&mut self, start: Location) -> Token {
        self.cursor.advance(); // ?
        if self.cursor.eat('?') {
            self.token_from(TokenKind::QuestionQuestion, start)
        } else {
            self.token_from(TokenKind::Question, start)
        }
    }

    // ── Comments ───────────────────────────────────────────────────────

    /// Consume a `//` comment. Returns a token only for `///` doc comments.
    fn lex_comment(&mut self, start: Location) -> Option<Token> {
        self.cursor.advance(); // /
        self.cursor.advance(); // /
        let doc = self.cursor.eat('/');
        let content_start = self.cursor.location();
        self.cursor.eat_while(|c| c != '\n' && c != '\r');
        if doc {
            let content = self
                .cursor
                .slice(content_start.offset, self.cursor.location().offset)
                .trim_start()
                .to_string();
            let mut token = self.token_from(TokenKind::DocComment, start);
            token.value = Some(LitValue::Str(content));
            Some(token)
        } else {
            None
        }
    }

    // ── Identifiers and keywords ───────────────────────────────────────

    fn lex_ident(&mut self, start: Location) -> Token {
        self.cursor.eat_while(is_ident_continue);
        let text = self.text_from(start);
        let kind = keyword_from_str(&text).unwrap_or(TokenKind::Ident);
        Token::new(kind, text, self.span_from(start))
    }

    // ── Numeric literals ───────────────────────────────────────────────

    fn lex_number(&mut self, start: Location) -> Token {
        let radix = if self.cursor.peek() == Some('0') {
            match self.cursor.peek_next() {
                Some('x') | Some('X') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    16
                }
                Some('b') | Some('B') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    2
                }
                _ => 10,
            }
        } else {
            10
        };

        self.eat_digits(radix);

        let mut is_float = false;
        if radix == 10
            && self.cursor.peek() == Some('.')
            && self.cursor.peek_next().is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            self.cursor.advance(); // .
            self.eat_digits(10);
        }

        // Optional type suffix, scanned as identifier characters.
        let suffix_start = self.cursor.location();
        self.cursor.eat_while(is_ident_continue);
        let suffix_text = self
            .cursor
            .slice(suffix_start.offset, self.cursor.location().offset)
            .to_string();

        let span = self.span_from(start);
        let text = self.text_from(start);

        let suffix = if suffix_text.is_empty() {
            None
        } else {
            match NumSuffix::from_str(&suffix_text) {
                Some(s) => Some(s),
                None => {
                    self.error(
                        "L0003",
                        format!("invalid numeric literal suffix `{suffix_text}`"),
                        span,
                    );
                    return Token::new(TokenKind::Error, text, span);
                }
            }
        };

        let digits: String = text
            .strip_suffix(&suffix_text)
            .unwrap_or(&text)
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let digits = match radix {
            16 => digits.trim_start_matches("0x").trim_start_matches("0X"),
            2 => digits.trim_start_matches("0b").trim_start_matches("0B"),
            _ => digits.as_str(),
        };

        if is_float || suffix.is_some_and(|s| s.is_float()) {
            match digits.parse::<f64>() {
                Ok(value) => Token::with_value(
                    TokenKind::FloatLiteral,
                    text,
                    LitValue::Float { value, suffix },
                    span,
                ),
                Err(_) => {
                    self.error("L0003", format!("invalid float literal `{text}`"), span);
                    Token::new(TokenKind::Error, text, span)
                }
            }
        } else {
            match i128::from_str_radix(digits, radix) {
                Ok(value) => Token::with_value(
                    TokenKind::IntLiteral,
                    text,
                    LitValue::Int { value, suffix },
                    span,
                ),
                Err(_) => {
                    self.error("L0003", format!("invalid integer literal `{text}`"), span);
                    Token::new(TokenKind::Error, text, span)
                }
            }
        }
    }

    fn eat_digits(&mut self, radix: u32) {
        self.cursor
            .eat_while(|c| c.is_digit(radix) || c == '_');
    }

    // ── String and character literals ──────────────────────────────────

    fn lex_string(&mut self, start: Location) -> Token {
        self.cursor.advance(); // "
        let mut value = String::new();
        let mut interpolated = false;

        loop {
            let Some(c) = self.cursor.peek() else {
                let span = self.span_from(start);
                self.error("L0001", "unterminated string literal", span);
                return self.token_from(TokenKind::Error, start);
            };
            match c {
                '"' => {
                    self.cursor.advance();
                    break;
                }
                '\n' => {
                    let span = self.span_from(start);
                    self.error("L0001", "unterminated string literal", span);
                    return self.token_from(TokenKind::Error, start);
                }
                '\\' => {
                    let esc_start = self.cursor.location();
                    self.cursor.advance();
                    match self.lex_escape(esc_start) {
                        Some(decoded) => value.push(decoded),
                        None => return self.token_from(TokenKind::Error, start),
                    }
                }
                '$' if self.cursor.peek_next() == Some('{') => {
                    interpolated = true;
                    self.cursor.advance(); // $
                    self.cursor.advance(); // {
                    if !self.skip_interpolation(start) {
                        return self.token_from(TokenKind::Error, start);
                    }
                }
                _ => {
                    self.cursor.advance();
                    value.push(c);
                }
            }
        }

        let mut token = self.token_from(TokenKind::StringLiteral, start);
        if !interpolated {
            // Interpolated strings keep `value: None`; the parser splits
            // the raw text via `split_interpolation`.
            token.value = Some(LitValue::Str(value));
        }
        token
    }

    /// Skip over a `${...}` interpolation segment, balancing braces and
    /// passing over nested string literals. Returns false on EOF.
    fn skip_interpolation(&mut self, literal_start: Location) -> bool {
        let mut depth = 1u32;
        loop {
            let Some(c) = self.cursor.advance() else {
                let span = self.span_from(literal_start);
                self.error("L0001", "unterminated string interpolation", span);
                return false;
            };
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                '"' => {
                    // Nested string inside the interpolation expression.
                    loop {
                        match self.cursor.advance() {
                            Some('"') => break,
                            Some('\\') => {
                                self.cursor.advance();
                            }
                            Some(_) => {}
                            None => {
                                let span = self.span_from(literal_start);
                                self.error("L0001", "unterminated string interpolation", span);
                                return false;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Decode one escape sequence after its leading backslash was consumed.
    fn lex_escape(&mut self, esc_start: Location) -> Option<char> {
        let Some(c) = self.cursor.advance() else {
            let span = self.span_from(esc_start);
            self.error("L0002", "invalid escape sequence", span);
            return None;
        };
        match c {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            '\\' => Some('\\'),
            '\'' => Some('\''),
            '"' => Some('"'),
            '0' => Some('\0'),
            other => {
                let span = self.span_from(esc_start);
                self.error("L0002", format!("invalid escape sequence `\\{other}`"), span);
                None
            }
        }
    }

    fn lex_char(&mut self, start: Location) -> Token {
        self.cursor.advance(); // '
        let decoded = match self.cursor.peek() {
            None | Some('\n') => {
                let span = self.span_from(start);
                self.error("L0001", "unterminated character literal", span);
                return self.token_from(TokenKind::Error, start);
            }
            Some('\\') => {
                let esc_start = self.cursor.location();
                self.cursor.advance();
                match self.lex_escape(esc_start) {
                    Some(c) => c,
                    None => return self.token_from(TokenKind::Error, start),
                }
            }
            Some(c) => {
                self.cursor.advance();
                c
            }
        };
        if !self.cursor.eat('\'') {
            let span = self.span_from(start);
            self.error("L0001", "unterminated character literal", span);
            return self.token_from(TokenKind::Error, start);
        }
        let mut token = self.token_from(TokenKind::CharLiteral, start);
        token.value = Some(LitValue::Char(decoded));
        token
    }
}

/// Split the raw text of an interpolated string literal into parts.
///
/// `raw` is the full lexeme including quotes, `start` the location of the
/// opening quote. Literal parts come back unescaped; expression parts keep
/// their source text plus the location where it begins, ready for
/// [`Lexer::with_start`].
pub fn split_interpolation(raw: &str, start: Location) -> Vec<StringPart> {
    let mut parts = Vec::new();
    let mut lit = String::new();
    let mut cursor = Cursor::with_start(raw, start);
    cursor.advance(); // opening quote

    while let Some(c) = cursor.peek() {
        match c {
            '"' => break,
            '\\' => {
                cursor.advance();
                if let Some(esc) = cursor.advance() {
                    lit.push(match esc {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '0' => '\0',
                        other => other, // \\ \' \" decode to themselves
                    });
                }
            }
            '$' if cursor.peek_next() == Some('{') => {
                if !lit.is_empty() {
                    parts.push(StringPart::Lit(std::mem::take(&mut lit)));
                }
                cursor.advance(); // $
                cursor.advance(); // {
                let expr_start = cursor.location();
                let mut depth = 1u32;
                let mut source = String::new();
                while let Some(c) = cursor.advance() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    source.push(c);
                }
                parts.push(StringPart::Expr {
                    source,
                    start: expr_start,
                });
            }
            _ => {
                cursor.advance();
                lit.push(c);
            }
        }
    }
    if !lit.is_empty() {
        parts.push(StringPart::Lit(lit));
    }
    parts
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diagnostics) = Lexer::tokenize(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_keywords_and_idents() {
        assert_eq!(
            kinds("let x fn effect"),
            vec![
                TokenKind::Let,
                TokenKind::Ident,
                TokenKind::Fn,
                TokenKind::Effect,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_operators_longest_match() {
        assert_eq!(
            kinds("= == => ! != < <= .. ..= ? ??"),
            vec![
                TokenKind::Eq,
                TokenKind::EqEq,
                TokenKind::FatArrow,
                TokenKind::Bang,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::LtEq,
                TokenKind::DotDot,
                TokenKind::DotDotEq,
                TokenKind::Question,
                TokenKind::QuestionQuestion,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newlines_are_tokens() {
        assert_eq!(
            kinds("a\nb\r\nc"),
            vec![
                TokenKind::Ident,
                TokenKind::Newline,
                TokenKind::Ident,
                TokenKind::Newline,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn int_literal_with_suffix() {
        let (tokens, diagnostics) = Lexer::tokenize("42i64");
        assert!(diagnostics.is_empty());
        assert_eq!(
            tokens[0].value,
            Some(LitValue::Int {
                value: 42,
                suffix: Some(NumSuffix::I64),
            })
        );
    }

    #[test]
    fn hex_and_binary_literals() {
        let (tokens, _) = Lexer::tokenize("0xFF 0b1010 1_000_000");
        assert_eq!(
            tokens[0].value,
            Some(LitValue::Int { value: 255, suffix: None })
        );
        assert_eq!(
            tokens[1].value,
            Some(LitValue::Int { value: 10, suffix: None })
        );
        assert_eq!(
            tokens[2].value,
            Some(LitValue::Int { value: 1_000_000, suffix: None })
        );
    }

    #[test]
    fn float_literal_and_range_disambiguation() {
        let (tokens, _) = Lexer::tokenize("3.25 1..5");
        assert_eq!(
            tokens[0].value,
            Some(LitValue::Float { value: 3.25, suffix: None })
        );
        assert_eq!(tokens[1].kind, TokenKind::IntLiteral);
        assert_eq!(tokens[2].kind, TokenKind::DotDot);
        assert_eq!(tokens[3].kind, TokenKind::IntLiteral);
    }

    #[test]
    fn string_with_escapes() {
        let (tokens, diagnostics) = Lexer::tokenize(r#""a\nb\"c""#);
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].value, Some(LitValue::Str("a\nb\"c".into())));
    }

    #[test]
    fn interpolated_string_keeps_raw_text() {
        let (tokens, diagnostics) = Lexer::tokenize(r#""x = ${x + 1}!""#);
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].value, None);

        let parts = split_interpolation(&tokens[0].text, tokens[0].span.start);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], StringPart::Lit("x = ".into()));
        match &parts[1] {
            StringPart::Expr { source, start } => {
                assert_eq!(source, "x + 1");
                assert_eq!(start.offset, 7);
            }
            other => panic!("expected expr part, got {other:?}"),
        }
        assert_eq!(parts[2], StringPart::Lit("!".into()));
    }

    #[test]
    fn char_literals() {
        let (tokens, diagnostics) = Lexer::tokenize(r"'a' '\n'");
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].value, Some(LitValue::Char('a')));
        assert_eq!(tokens[1].value, Some(LitValue::Char('\n')));
    }

    #[test]
    fn doc_comments_preserved_plain_comments_skipped() {
        let (tokens, _) = Lexer::tokenize("// plain\n/// documented\nfn");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Newline,
                TokenKind::DocComment,
                TokenKind::Newline,
                TokenKind::Fn,
                TokenKind::Eof,
            ]
        );
        assert_eq!(tokens[1].value, Some(LitValue::Str("documented".into())));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let (tokens, diagnostics) = Lexer::tokenize("\"abc");
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "L0001");
    }

    #[test]
    fn invalid_escape_is_an_error() {
        let (_, diagnostics) = Lexer::tokenize(r#""a\qb""#);
        assert!(diagnostics.iter().any(|d| d.code == "L0002"));
    }

    #[test]
    fn stray_character_is_an_error() {
        let (tokens, diagnostics) = Lexer::tokenize("let # = 1");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Error));
        assert!(diagnostics.iter().any(|d| d.code == "L0004"));
    }

    #[test]
    fn locations_track_lines() {
        let (tokens, _) = Lexer::tokenize("let\n  x");
        assert_eq!(tokens[0].span.start.line, 1);
        let x = &tokens[2];
        assert_eq!(x.span.start.line, 2);
        assert_eq!(x.span.start.column, 3);
    }
}
