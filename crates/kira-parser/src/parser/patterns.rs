//! Pattern parser for Kira.
//!
//! Patterns have their own precedence ladder: a primary pattern, an
//! optional `|` or-chain, and (where the context allows it) an optional
//! `: Type` annotation. Identifiers starting with an uppercase letter
//! parse as constructor patterns; `var name` introduces a mutable binding.

use kira_common::token::{LitValue, TokenKind};

use crate::ast::{PatId, PatLit, Pattern, PatternKind, RangeBound};

use super::{types, Parser};

/// Parse a pattern. `allow_typed` permits a trailing `: Type` annotation
/// (match arms); binding positions like `let` parse the type themselves.
pub(crate) fn parse_pattern(p: &mut Parser, allow_typed: bool) -> Option<PatId> {
    let first = or_operand(p)?;

    let pattern = if p.at(TokenKind::Pipe) {
        let mut alternatives = vec![first];
        while p.eat(TokenKind::Pipe) {
            alternatives.push(or_operand(p)?);
        }
        let span = p
            .program
            .pat(alternatives[0])
            .span
            .merge(p.program.pat(*alternatives.last().expect("non-empty")).span);
        p.program.arena.alloc_pat(Pattern {
            kind: PatternKind::Or(alternatives),
            span,
        })
    } else {
        first
    };

    if allow_typed && p.at(TokenKind::Colon) {
        p.advance();
        let ty = types::parse_type(p)?;
        let span = p
            .program
            .pat(pattern)
            .span
            .merge(p.program.type_expr(ty).span);
        return Some(p.program.arena.alloc_pat(Pattern {
            kind: PatternKind::Typed { pattern, ty },
            span,
        }));
    }

    Some(pattern)
}

/// One alternative of an or-pattern.
fn or_operand(p: &mut Parser) -> Option<PatId> {
    match p.current() {
        TokenKind::Ident if p.current_text() == "_" => {
            let token = p.advance();
            Some(p.program.arena.alloc_pat(Pattern {
                kind: PatternKind::Wildcard,
                span: token.span,
            }))
        }
        TokenKind::Var => {
            let var_token = p.advance();
            let (name, name_span) = p.expect_ident()?;
            Some(p.program.arena.alloc_pat(Pattern {
                kind: PatternKind::Ident {
                    name,
                    mutable: true,
                },
                span: var_token.span.merge(name_span),
            }))
        }
        TokenKind::Ident => ident_pattern(p),
        TokenKind::IntLiteral | TokenKind::Minus => int_or_range(p),
        TokenKind::CharLiteral => char_or_range(p),
        TokenKind::FloatLiteral => {
            let token = p.advance();
            let Some(LitValue::Float { value, .. }) = token.value else {
                unreachable!();
            };
            Some(p.program.arena.alloc_pat(Pattern {
                kind: PatternKind::Literal(PatLit::Float(value)),
                span: token.span,
            }))
        }
        TokenKind::StringLiteral => {
            let token = p.advance();
            match token.value {
                Some(LitValue::Str(value)) => Some(p.program.arena.alloc_pat(Pattern {
                    kind: PatternKind::Literal(PatLit::Str(value)),
                    span: token.span,
                })),
                _ => {
                    p.error(token.span, "interpolated strings are not valid patterns");
                    None
                }
            }
        }
        TokenKind::True | TokenKind::False => {
            let token = p.advance();
            Some(p.program.arena.alloc_pat(Pattern {
                kind: PatternKind::Literal(PatLit::Bool(token.kind == TokenKind::True)),
                span: token.span,
            }))
        }
        TokenKind::LParen => tuple_pattern(p),
        TokenKind::LBrace => record_pattern(p, None),
        TokenKind::DotDot => {
            let token = p.advance();
            Some(p.program.arena.alloc_pat(Pattern {
                kind: PatternKind::Rest,
                span: token.span,
            }))
        }
        other => {
            let span = p.current_span();
            p.error(span, format!("expected pattern, found {}", other.describe()));
            None
        }
    }
}

/// Identifier-led pattern: binding, constructor, or typed record match.
fn ident_pattern(p: &mut Parser) -> Option<PatId> {
    let token = p.advance();
    let name = token.text;
    let uppercase = name.chars().next().is_some_and(|c| c.is_ascii_uppercase());

    if !uppercase {
        return Some(p.program.arena.alloc_pat(Pattern {
            kind: PatternKind::Ident {
                name,
                mutable: false,
            },
            span: token.span,
        }));
    }

    // `Circle(r)` -- positional constructor arguments.
    if p.at(TokenKind::LParen) {
        p.advance();
        let mut args = Vec::new();
        while !p.at(TokenKind::RParen) {
            args.push(parse_pattern(p, false)?);
            if !p.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = p.expect(TokenKind::RParen)?;
        return Some(p.program.arena.alloc_pat(Pattern {
            kind: PatternKind::Constructor {
                name,
                args: Some(args),
            },
            span: token.span.merge(close.span),
        }));
    }

    // `Point { x: px, .. }` -- named fields of a record or record-payload
    // variant.
    if p.at(TokenKind::LBrace) {
        return record_pattern(p, Some((name, token.span)));
    }

    Some(p.program.arena.alloc_pat(Pattern {
        kind: PatternKind::Constructor { name, args: None },
        span: token.span,
    }))
}

/// Integer literal, negative integer, or integer range pattern.
fn int_or_range(p: &mut Parser) -> Option<PatId> {
    let negative = p.eat(TokenKind::Minus);
    let token = p.expect(TokenKind::IntLiteral)?;
    let Some(LitValue::Int { value, .. }) = token.value else {
        unreachable!();
    };
    let value = if negative { -value } else { value };

    if p.at(TokenKind::DotDot) || p.at(TokenKind::DotDotEq) {
        let inclusive = p.at(TokenKind::DotDotEq);
        p.advance();
        let end_negative = p.eat(TokenKind::Minus);
        let end_token = p.expect(TokenKind::IntLiteral)?;
        let Some(LitValue::Int { value: end, .. }) = end_token.value else {
            unreachable!();
        };
        let end = if end_negative { -end } else { end };
        return Some(p.program.arena.alloc_pat(Pattern {
            kind: PatternKind::Range {
                start: RangeBound::Int(value),
                end: RangeBound::Int(end),
                inclusive,
            },
            span: token.span.merge(end_token.span),
        }));
    }

    Some(p.program.arena.alloc_pat(Pattern {
        kind: PatternKind::Literal(PatLit::Int(value)),
        span: token.span,
    }))
}

/// Character literal or character range pattern.
fn char_or_range(p: &mut Parser) -> Option<PatId> {
    let token = p.advance();
    let Some(LitValue::Char(value)) = token.value else {
        unreachable!();
    };

    if p.at(TokenKind::DotDot) || p.at(TokenKind::DotDotEq) {
        let inclusive = p.at(TokenKind::DotDotEq);
        p.advance();
        let end_token = p.expect(TokenKind::CharLiteral)?;
        let Some(LitValue::Char(end)) = end_token.value else {
            unreachable!();
        };
        return Some(p.program.arena.alloc_pat(Pattern {
            kind: PatternKind::Range {
                start: RangeBound::Char(value),
                end: RangeBound::Char(end),
                inclusive,
            },
            span: token.span.merge(end_token.span),
        }));
    }

    Some(p.program.arena.alloc_pat(Pattern {
        kind: PatternKind::Literal(PatLit::Char(value)),
        span: token.span,
    }))
}

/// `(a, b, c)` tuple pattern. A single parenthesized pattern groups.
fn tuple_pattern(p: &mut Parser) -> Option<PatId> {
    let open = p.advance(); // (
    let first = parse_pattern(p, false)?;
    if p.eat(TokenKind::Comma) {
        let mut elements = vec![first];
        while !p.at(TokenKind::RParen) {
            elements.push(parse_pattern(p, false)?);
            if !p.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = p.expect(TokenKind::RParen)?;
        Some(p.program.arena.alloc_pat(Pattern {
            kind: PatternKind::Tuple(elements),
            span: open.span.merge(close.span),
        }))
    } else {
        p.expect(TokenKind::RParen)?;
        Some(first)
    }
}

/// `{ x: px, y: py }` or `Point { x: px, .. }` with optional rest marker.
fn record_pattern(p: &mut Parser, type_name: Option<(String, kira_common::span::Span)>) -> Option<PatId> {
    let open = p.advance(); // {
    p.skip_newlines();
    let mut fields = Vec::new();
    let mut rest = false;
    while !p.at(TokenKind::RBrace) {
        if p.at(TokenKind::DotDot) {
            p.advance();
            rest = true;
            p.skip_newlines();
            break;
        }
        let (name, _) = p.expect_ident()?;
        p.expect(TokenKind::Colon)?;
        let pat = parse_pattern(p, false)?;
        fields.push((name, pat));
        if !p.eat(TokenKind::Comma) {
            p.skip_newlines();
            break;
        }
        p.skip_newlines();
    }
    let close = p.expect(TokenKind::RBrace)?;
    let (type_name, start_span) = match type_name {
        Some((name, span)) => (Some(name), span),
        None => (None, open.span),
    };
    Some(p.program.arena.alloc_pat(Pattern {
        kind: PatternKind::Record {
            type_name,
            fields,
            rest,
        },
        span: start_span.merge(close.span),
    }))
}
