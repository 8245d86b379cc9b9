//! Recursive-descent parser for Kira.
//!
//! The parser consumes the token stream from `kira-lexer` and builds AST
//! nodes directly into a [`Program`]'s arena. Expression precedence is
//! handled with Pratt binding-power tables in `expressions`.
//!
//! # Newline significance
//!
//! Newlines terminate statements, so at the top level the parser sees them
//! as real tokens. Inside `(...)` and `[...]` they are insignificant and
//! `current()`/`nth()` skip them transparently. Between declarations,
//! between match arms, and after block-opening braces the grammar allows
//! blank lines; those spots call `skip_newlines()` explicitly.
//!
//! # Error recovery
//!
//! Every error produces a diagnostic with the offending span and the
//! expected/found token names, then the parser resynchronizes at the next
//! statement or declaration boundary. Parsing fails overall if any error
//! diagnostic was produced.

pub(crate) mod expressions;
pub(crate) mod items;
pub(crate) mod patterns;
pub(crate) mod statements;
pub(crate) mod types;

use kira_common::diagnostic::Diagnostic;
use kira_common::span::{Location, Span};
use kira_common::token::{Token, TokenKind};
use kira_lexer::Lexer;

use crate::ast::Program;

pub(crate) struct Parser {
    /// All tokens from the lexer (including Eof).
    tokens: Vec<Token>,
    /// Current position in the token stream.
    pos: usize,
    /// The program being built.
    pub(crate) program: Program,
    /// Collected diagnostics.
    pub(crate) diagnostics: Vec<Diagnostic>,
    /// Parenthesis nesting depth for newline significance.
    paren_depth: u32,
    /// Bracket nesting depth for newline significance.
    bracket_depth: u32,
    /// Whether `Name { .. }` record literals may appear at the current
    /// position. Disabled while parsing match subjects and loop headers,
    /// where `{` opens the body instead.
    pub(crate) struct_literals: bool,
    /// Doc comment text collected while skipping trivia, waiting for the
    /// next declaration to claim it.
    pending_doc: Option<String>,
}

/// A saved parser position for limited backtracking.
#[derive(Clone, Copy)]
pub(crate) struct Checkpoint {
    pos: usize,
    diagnostics: usize,
    paren_depth: u32,
    bracket_depth: u32,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            program: Program::default(),
            diagnostics: Vec::new(),
            paren_depth: 0,
            bracket_depth: 0,
            struct_literals: true,
            pending_doc: None,
        }
    }

    // ── Lookahead ──────────────────────────────────────────────────────

    /// Index of the Nth significant token at or after `from`.
    ///
    /// Doc comments are always insignificant for lookahead (they are
    /// captured separately when consumed); newlines are insignificant
    /// inside parentheses and brackets.
    fn sig_index(&self, from: usize, n: usize) -> usize {
        let mut idx = from;
        let mut remaining = n;
        while idx < self.tokens.len() {
            let kind = self.tokens[idx].kind;
            let skip = kind == TokenKind::DocComment
                || (kind == TokenKind::Newline
                    && (self.paren_depth > 0 || self.bracket_depth > 0));
            if skip {
                idx += 1;
                continue;
            }
            if remaining == 0 {
                return idx;
            }
            remaining -= 1;
            idx += 1;
        }
        self.tokens.len() - 1 // Eof
    }

    /// Kind of the current significant token.
    pub(crate) fn current(&self) -> TokenKind {
        self.nth(0)
    }

    /// Kind of the Nth significant token ahead. `nth(0)` == `current()`.
    pub(crate) fn nth(&self, n: usize) -> TokenKind {
        self.tokens[self.sig_index(self.pos, n)].kind
    }

    /// The current significant token.
    pub(crate) fn current_token(&self) -> &Token {
        &self.tokens[self.sig_index(self.pos, 0)]
    }

    /// Text of the current significant token.
    pub(crate) fn current_text(&self) -> &str {
        &self.current_token().text
    }

    /// Raw token index, for span bookkeeping helpers.
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    /// Raw token access by index.
    pub(crate) fn token_at(&self, idx: usize) -> &Token {
        &self.tokens[idx]
    }

    /// Span of the current significant token.
    pub(crate) fn current_span(&self) -> Span {
        self.current_token().span
    }

    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    // ── Consumption ────────────────────────────────────────────────────

    /// Consume the current significant token and return it.
    ///
    /// Doc comments skipped on the way are captured into `pending_doc`.
    pub(crate) fn advance(&mut self) -> Token {
        let idx = self.sig_index(self.pos, 0);
        for i in self.pos..idx {
            if self.tokens[i].kind == TokenKind::DocComment {
                if let Some(kira_common::token::LitValue::Str(text)) = &self.tokens[i].value {
                    match &mut self.pending_doc {
                        Some(doc) => {
                            doc.push('\n');
                            doc.push_str(text);
                        }
                        None => self.pending_doc = Some(text.clone()),
                    }
                }
            }
        }
        let token = self.tokens[idx].clone();
        match token.kind {
            TokenKind::LParen => self.paren_depth += 1,
            TokenKind::RParen => self.paren_depth = self.paren_depth.saturating_sub(1),
            TokenKind::LBracket => self.bracket_depth += 1,
            TokenKind::RBracket => self.bracket_depth = self.bracket_depth.saturating_sub(1),
            _ => {}
        }
        if token.kind != TokenKind::Eof {
            self.pos = idx + 1;
        } else {
            self.pos = idx;
        }
        token
    }

    /// Consume the current token if it matches `kind`.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of `kind` or report an error.
    pub(crate) fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.advance())
        } else {
            let found = self.current();
            let span = self.current_span();
            self.error(
                span,
                format!("expected {}, found {}", kind.describe(), found.describe()),
            );
            None
        }
    }

    /// Consume an identifier token and return its text.
    pub(crate) fn expect_ident(&mut self) -> Option<(String, Span)> {
        let token = self.expect(TokenKind::Ident)?;
        Some((token.text, token.span))
    }

    /// Skip statement separators (newlines and explicit semicolons) and
    /// any doc comments riding along with them.
    pub(crate) fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) || self.at(TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// Take the doc comment collected since the last declaration.
    pub(crate) fn take_doc(&mut self) -> Option<String> {
        self.pending_doc.take()
    }

    // ── Backtracking ───────────────────────────────────────────────────

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            diagnostics: self.diagnostics.len(),
            paren_depth: self.paren_depth,
            bracket_depth: self.bracket_depth,
        }
    }

    pub(crate) fn rewind(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.diagnostics.truncate(checkpoint.diagnostics);
        self.paren_depth = checkpoint.paren_depth;
        self.bracket_depth = checkpoint.bracket_depth;
    }

    // ── Errors and recovery ────────────────────────────────────────────

    pub(crate) fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error("P0001", message, span));
    }

    pub(crate) fn error_with_code(
        &mut self,
        code: &str,
        span: Span,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }

    /// Skip tokens until the next statement boundary: a newline at
    /// delimiter depth zero, a closing brace, or end of file.
    pub(crate) fn recover_to_stmt_boundary(&mut self) {
        loop {
            match self.current() {
                TokenKind::Newline | TokenKind::RBrace | TokenKind::Eof => break,
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Skip tokens until something that can start a declaration.
    pub(crate) fn recover_to_decl_boundary(&mut self) {
        loop {
            match self.current() {
                TokenKind::Eof
                | TokenKind::Fn
                | TokenKind::Effect
                | TokenKind::Type
                | TokenKind::Trait
                | TokenKind::Impl
                | TokenKind::Pub
                | TokenKind::Const
                | TokenKind::Let
                | TokenKind::Test
                | TokenKind::Import
                | TokenKind::Module => break,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Embedded fragments ─────────────────────────────────────────────

    /// Parse an expression from an embedded source fragment (a string
    /// interpolation segment), allocating into the same program arena.
    ///
    /// The fragment's tokens temporarily replace the parser's stream;
    /// locations stay file-relative thanks to `Lexer::with_start`.
    pub(crate) fn parse_embedded_expr(
        &mut self,
        source: &str,
        start: Location,
    ) -> Option<crate::ast::ExprId> {
        let (tokens, diagnostics) = Lexer::with_start(source, start).run();
        self.diagnostics.extend(diagnostics);

        let saved_tokens = std::mem::replace(&mut self.tokens, tokens);
        let saved_pos = std::mem::replace(&mut self.pos, 0);
        let saved_paren = std::mem::replace(&mut self.paren_depth, 0);
        let saved_bracket = std::mem::replace(&mut self.bracket_depth, 0);

        let expr = expressions::expr(self);
        if expr.is_some() && !self.at_eof() {
            let span = self.current_span();
            self.error(span, "unexpected trailing tokens in interpolation");
        }

        self.tokens = saved_tokens;
        self.pos = saved_pos;
        self.paren_depth = saved_paren;
        self.bracket_depth = saved_bracket;
        expr
    }
}
