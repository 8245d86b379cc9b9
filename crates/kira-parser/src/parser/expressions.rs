//! Pratt expression parser for Kira.
//!
//! Implements operator precedence parsing with binding-power tables,
//! low to high: logical-or, logical-and, equality, comparison (including
//! `is` and `in`), range, additive, multiplicative, null-coalesce, unary,
//! postfix (field/index/tuple access, call, method call, try, cast).

use kira_common::token::{LitValue, TokenKind};
use kira_lexer::{split_interpolation, StringPart};

use crate::ast::{
    ArmBody, BinaryOp, Expr, ExprId, ExprKind, InterpPart, MatchArm, Param, TypeId, UnaryOp,
};

use super::{patterns, statements, types, Parser};

/// Returns (left_bp, right_bp) for infix operators. Left < right means
/// left-associative.
fn infix_binding_power(op: TokenKind) -> Option<(u8, u8)> {
    match op {
        TokenKind::Or => Some((1, 2)),
        TokenKind::And => Some((3, 4)),
        TokenKind::EqEq | TokenKind::NotEq => Some((5, 6)),
        TokenKind::Lt
        | TokenKind::LtEq
        | TokenKind::Gt
        | TokenKind::GtEq
        | TokenKind::Is
        | TokenKind::In => Some((7, 8)),
        TokenKind::DotDot | TokenKind::DotDotEq => Some((9, 10)),
        TokenKind::Plus | TokenKind::Minus => Some((11, 12)),
        TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some((13, 14)),
        TokenKind::QuestionQuestion => Some((15, 16)),
        _ => None,
    }
}

/// Returns ((), right_bp) for prefix operators.
fn prefix_binding_power(op: TokenKind) -> Option<((), u8)> {
    match op {
        TokenKind::Minus | TokenKind::Not => Some(((), 17)),
        _ => None,
    }
}

/// Postfix operations bind tighter than all prefix and infix operators.
const POSTFIX_BP: u8 = 19;

fn binary_op(kind: TokenKind) -> BinaryOp {
    match kind {
        TokenKind::Or => BinaryOp::Or,
        TokenKind::And => BinaryOp::And,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::Is => BinaryOp::Is,
        TokenKind::In => BinaryOp::In,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        _ => unreachable!("not a binary operator: {kind:?}"),
    }
}

/// Parse an expression at the lowest binding power.
pub(crate) fn expr(p: &mut Parser) -> Option<ExprId> {
    expr_bp(p, 0)
}

/// Parse an expression with record literals disabled, for positions where
/// a `{` opens a block instead (match subjects, loop headers).
pub(crate) fn expr_no_struct(p: &mut Parser) -> Option<ExprId> {
    let saved = p.struct_literals;
    p.struct_literals = false;
    let result = expr_bp(p, 0);
    p.struct_literals = saved;
    result
}

/// Core Pratt loop: parse a prefix/primary expression, then fold postfix
/// and infix operators while their binding power exceeds `min_bp`.
fn expr_bp(p: &mut Parser, min_bp: u8) -> Option<ExprId> {
    let mut lhs = prefix(p)?;

    loop {
        let current = p.current();

        // ── Postfix ────────────────────────────────────────────────────
        if POSTFIX_BP >= min_bp {
            match current {
                TokenKind::LParen => {
                    lhs = finish_call(p, lhs, Vec::new())?;
                    continue;
                }
                TokenKind::Dot => {
                    lhs = postfix_dot(p, lhs)?;
                    continue;
                }
                TokenKind::LBracket => {
                    // Either `expr[index]` or explicit generic arguments
                    // before a call: `first[i32](xs)`.
                    if let Some(generic_args) = try_generic_args_before_call(p) {
                        lhs = finish_call(p, lhs, generic_args)?;
                    } else {
                        let open = p.advance(); // [
                        let index = expr_bp(p, 0)?;
                        p.expect(TokenKind::RBracket)?;
                        let span = open.span.merge(p.program.expr(index).span);
                        let span = p.program.expr(lhs).span.merge(span);
                        lhs = p.program.arena.alloc_expr(Expr {
                            kind: ExprKind::Index { base: lhs, index },
                            span,
                        });
                    }
                    continue;
                }
                TokenKind::Question => {
                    let token = p.advance();
                    let span = p.program.expr(lhs).span.merge(token.span);
                    lhs = p.program.arena.alloc_expr(Expr {
                        kind: ExprKind::Try(lhs),
                        span,
                    });
                    continue;
                }
                TokenKind::As => {
                    p.advance();
                    let ty = types::parse_type(p)?;
                    let span = p
                        .program
                        .expr(lhs)
                        .span
                        .merge(p.program.type_expr(ty).span);
                    lhs = p.program.arena.alloc_expr(Expr {
                        kind: ExprKind::Cast { expr: lhs, ty },
                        span,
                    });
                    continue;
                }
                _ => {}
            }
        }

        // ── Infix ──────────────────────────────────────────────────────
        let Some((left_bp, right_bp)) = infix_binding_power(current) else {
            break;
        };
        if left_bp < min_bp {
            break;
        }

        if current == TokenKind::DotDot || current == TokenKind::DotDotEq {
            let inclusive = current == TokenKind::DotDotEq;
            let op_token = p.advance();
            let end = if starts_expr(p.current()) {
                Some(expr_bp(p, right_bp)?)
            } else {
                None
            };
            let end_span = end
                .map(|e| p.program.expr(e).span)
                .unwrap_or(op_token.span);
            let span = p.program.expr(lhs).span.merge(end_span);
            lhs = p.program.arena.alloc_expr(Expr {
                kind: ExprKind::Range {
                    start: Some(lhs),
                    end,
                    inclusive,
                },
                span,
            });
            continue;
        }

        if current == TokenKind::QuestionQuestion {
            p.advance();
            let default = expr_bp(p, right_bp)?;
            let span = p.program.expr(lhs).span.merge(p.program.expr(default).span);
            lhs = p.program.arena.alloc_expr(Expr {
                kind: ExprKind::Coalesce {
                    value: lhs,
                    default,
                },
                span,
            });
            continue;
        }

        let op = binary_op(current);
        p.advance();
        let rhs = expr_bp(p, right_bp)?;
        let span = p.program.expr(lhs).span.merge(p.program.expr(rhs).span);
        lhs = p.program.arena.alloc_expr(Expr {
            kind: ExprKind::Binary { op, lhs, rhs },
            span,
        });
    }

    Some(lhs)
}

/// Whether a token can begin an expression. Used to decide if an
/// open-ended range (`a..`) has an end operand.
fn starts_expr(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::IntLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StringLiteral
            | TokenKind::CharLiteral
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Ident
            | TokenKind::SelfKw
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::Minus
            | TokenKind::Not
            | TokenKind::Match
            | TokenKind::Fn
            | TokenKind::Effect
            | TokenKind::DotDot
            | TokenKind::DotDotEq
    )
}

/// Parse a prefix operator or a primary expression.
fn prefix(p: &mut Parser) -> Option<ExprId> {
    if let Some(((), right_bp)) = prefix_binding_power(p.current()) {
        let op_token = p.advance();
        let op = match op_token.kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not => UnaryOp::Not,
            _ => unreachable!(),
        };
        let operand = expr_bp(p, right_bp)?;
        let span = op_token.span.merge(p.program.expr(operand).span);
        return Some(p.program.arena.alloc_expr(Expr {
            kind: ExprKind::Unary { op, operand },
            span,
        }));
    }

    // Prefix ranges: `..b`, `..=b`.
    if p.at(TokenKind::DotDot) || p.at(TokenKind::DotDotEq) {
        let inclusive = p.at(TokenKind::DotDotEq);
        let op_token = p.advance();
        let end = if starts_expr(p.current()) {
            Some(expr_bp(p, 10)?)
        } else {
            None
        };
        let end_span = end.map(|e| p.program.expr(e).span).unwrap_or(op_token.span);
        let span = op_token.span.merge(end_span);
        return Some(p.program.arena.alloc_expr(Expr {
            kind: ExprKind::Range {
                start: None,
                end,
                inclusive,
            },
            span,
        }));
    }

    primary(p)
}

/// Parse a primary expression.
fn primary(p: &mut Parser) -> Option<ExprId> {
    match p.current() {
        TokenKind::IntLiteral => {
            let token = p.advance();
            let Some(LitValue::Int { value, suffix }) = token.value else {
                unreachable!("int literal token without value");
            };
            Some(p.program.arena.alloc_expr(Expr {
                kind: ExprKind::Int { value, suffix },
                span: token.span,
            }))
        }
        TokenKind::FloatLiteral => {
            let token = p.advance();
            let Some(LitValue::Float { value, suffix }) = token.value else {
                unreachable!("float literal token without value");
            };
            Some(p.program.arena.alloc_expr(Expr {
                kind: ExprKind::Float { value, suffix },
                span: token.span,
            }))
        }
        TokenKind::StringLiteral => {
            let token = p.advance();
            match token.value {
                Some(LitValue::Str(value)) => Some(p.program.arena.alloc_expr(Expr {
                    kind: ExprKind::Str(value),
                    span: token.span,
                })),
                _ => interpolated(p, &token.text, token.span),
            }
        }
        TokenKind::CharLiteral => {
            let token = p.advance();
            let Some(LitValue::Char(value)) = token.value else {
                unreachable!("char literal token without value");
            };
            Some(p.program.arena.alloc_expr(Expr {
                kind: ExprKind::Char(value),
                span: token.span,
            }))
        }
        TokenKind::True | TokenKind::False => {
            let token = p.advance();
            Some(p.program.arena.alloc_expr(Expr {
                kind: ExprKind::Bool(token.kind == TokenKind::True),
                span: token.span,
            }))
        }
        TokenKind::SelfKw => {
            let token = p.advance();
            Some(p.program.arena.alloc_expr(Expr {
                kind: ExprKind::SelfRef,
                span: token.span,
            }))
        }
        TokenKind::Ident => ident_led(p),
        TokenKind::Match => match_expr(p),
        TokenKind::Fn => closure(p, false),
        TokenKind::Effect if p.nth(1) == TokenKind::Fn => closure(p, true),
        TokenKind::LParen => paren_expr(p),
        TokenKind::LBracket => array_literal(p),
        TokenKind::LBrace if p.struct_literals && looks_like_record(p) => {
            record_literal(p, None)
        }
        _ => {
            let span = p.current_span();
            let found = p.current().describe();
            p.error(span, format!("expected expression, found {found}"));
            None
        }
    }
}

/// Parse an identifier-led expression: plain reference, variant
/// constructor call, record literal, or generic reference.
fn ident_led(p: &mut Parser) -> Option<ExprId> {
    let token = p.advance();
    let name = token.text;
    let uppercase = name.chars().next().is_some_and(|c| c.is_ascii_uppercase());

    // `Circle(1.0)` -- variant constructor with positional arguments.
    if uppercase && p.at(TokenKind::LParen) {
        let args = arg_list(p)?;
        let span = token.span.merge(p.prev_rparen_span());
        return Some(p.program.arena.alloc_expr(Expr {
            kind: ExprKind::Variant {
                name,
                args: Some(args),
            },
            span,
        }));
    }

    // `Point { x: 1, y: 2 }` -- record literal with a nominal type.
    if uppercase && p.struct_literals && p.at(TokenKind::LBrace) && looks_like_record(p) {
        let ty = p.program.arena.alloc_type(crate::ast::TypeExpr {
            kind: crate::ast::TypeKind::Named(name),
            span: token.span,
        });
        return record_literal(p, Some(ty));
    }

    // `first[i32](xs)` or `Pair[i32] { .. }` -- explicit generic arguments.
    if p.at(TokenKind::LBracket) {
        if let Some(generic_args) = try_generic_args(p) {
            if p.at(TokenKind::LParen) {
                let ident = p.program.arena.alloc_expr(Expr {
                    kind: ExprKind::Ident {
                        name,
                        generic_args: generic_args.clone(),
                    },
                    span: token.span,
                });
                return finish_call(p, ident, Vec::new());
            }
            if uppercase && p.struct_literals && p.at(TokenKind::LBrace) && looks_like_record(p)
            {
                let ty = p.program.arena.alloc_type(crate::ast::TypeExpr {
                    kind: crate::ast::TypeKind::Generic {
                        base: name,
                        args: generic_args,
                    },
                    span: token.span,
                });
                return record_literal(p, Some(ty));
            }
            return Some(p.program.arena.alloc_expr(Expr {
                kind: ExprKind::Ident { name, generic_args },
                span: token.span,
            }));
        }
    }

    Some(p.program.arena.alloc_expr(Expr {
        kind: ExprKind::Ident {
            name,
            generic_args: Vec::new(),
        },
        span: token.span,
    }))
}

/// After a `.`: tuple access, field access, or method call.
fn postfix_dot(p: &mut Parser, base: ExprId) -> Option<ExprId> {
    p.advance(); // .
    match p.current() {
        TokenKind::IntLiteral => {
            let token = p.advance();
            let Some(LitValue::Int { value, .. }) = token.value else {
                unreachable!();
            };
            let span = p.program.expr(base).span.merge(token.span);
            Some(p.program.arena.alloc_expr(Expr {
                kind: ExprKind::TupleField {
                    base,
                    index: value as u32,
                },
                span,
            }))
        }
        TokenKind::Ident => {
            let name_token = p.advance();
            let name = name_token.text;

            if p.at(TokenKind::LParen) {
                let args = arg_list(p)?;
                let span = p.program.expr(base).span.merge(p.prev_rparen_span());
                return Some(p.program.arena.alloc_expr(Expr {
                    kind: ExprKind::MethodCall {
                        receiver: base,
                        method: name,
                        generic_args: Vec::new(),
                        args,
                    },
                    span,
                }));
            }

            if p.at(TokenKind::LBracket) {
                if let Some(generic_args) = try_generic_args_before_call(p) {
                    let args = arg_list(p)?;
                    let span = p.program.expr(base).span.merge(p.prev_rparen_span());
                    return Some(p.program.arena.alloc_expr(Expr {
                        kind: ExprKind::MethodCall {
                            receiver: base,
                            method: name,
                            generic_args,
                            args,
                        },
                        span,
                    }));
                }
            }

            let span = p.program.expr(base).span.merge(name_token.span);
            Some(p.program.arena.alloc_expr(Expr {
                kind: ExprKind::Field { base, name },
                span,
            }))
        }
        other => {
            let span = p.current_span();
            p.error(
                span,
                format!("expected field name or tuple index, found {}", other.describe()),
            );
            None
        }
    }
}

/// Parse `(args)` and wrap `callee` in a call expression.
fn finish_call(p: &mut Parser, callee: ExprId, generic_args: Vec<TypeId>) -> Option<ExprId> {
    let args = arg_list(p)?;
    let span = p.program.expr(callee).span.merge(p.prev_rparen_span());
    Some(p.program.arena.alloc_expr(Expr {
        kind: ExprKind::Call {
            callee,
            generic_args,
            args,
        },
        span,
    }))
}

/// Parse a parenthesized argument list.
fn arg_list(p: &mut Parser) -> Option<Vec<ExprId>> {
    p.expect(TokenKind::LParen)?;
    let mut args = Vec::new();
    let saved = p.struct_literals;
    p.struct_literals = true;
    let result = (|| {
        if !p.at(TokenKind::RParen) {
            loop {
                args.push(expr(p)?);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
                if p.at(TokenKind::RParen) {
                    break; // trailing comma
                }
            }
        }
        p.expect(TokenKind::RParen)?;
        Some(args)
    })();
    p.struct_literals = saved;
    result
}

/// Try to parse `[T, U]` as explicit generic arguments followed by `(`.
/// Rewinds and returns `None` when the brackets are an index instead.
fn try_generic_args_before_call(p: &mut Parser) -> Option<Vec<TypeId>> {
    let checkpoint = p.checkpoint();
    match try_generic_args(p) {
        Some(args) if p.at(TokenKind::LParen) => Some(args),
        _ => {
            p.rewind(checkpoint);
            None
        }
    }
}

/// Try to parse `[T, U]` as generic arguments. Every argument must be
/// type-shaped (a primitive, an uppercase name, a tuple/array/function
/// type); a lowercase bare name means this is an index expression, and
/// the parser rewinds.
fn try_generic_args(p: &mut Parser) -> Option<Vec<TypeId>> {
    let checkpoint = p.checkpoint();
    if !p.eat(TokenKind::LBracket) {
        return None;
    }
    let mut args = Vec::new();
    loop {
        let Some(ty) = types::parse_type(p) else {
            p.rewind(checkpoint);
            return None;
        };
        if !types::is_type_shaped(&p.program, ty) {
            p.rewind(checkpoint);
            return None;
        }
        args.push(ty);
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    if !p.eat(TokenKind::RBracket) {
        p.rewind(checkpoint);
        return None;
    }
    Some(args)
}

/// `(e)` grouped, `(e,)` or `(a, b, ...)` tuple.
fn paren_expr(p: &mut Parser) -> Option<ExprId> {
    let open = p.advance(); // (
    let saved = p.struct_literals;
    p.struct_literals = true;

    let result = (|p: &mut Parser| {
        if p.at(TokenKind::RParen) {
            let close = p.advance();
            let span = open.span.merge(close.span);
            p.error(span, "empty parentheses are not an expression");
            return None;
        }
        let first = expr(p)?;
        if p.eat(TokenKind::Comma) {
            let mut elements = vec![first];
            while !p.at(TokenKind::RParen) {
                elements.push(expr(p)?);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            let close = p.expect(TokenKind::RParen)?;
            let span = open.span.merge(close.span);
            Some(p.program.arena.alloc_expr(Expr {
                kind: ExprKind::Tuple(elements),
                span,
            }))
        } else {
            let close = p.expect(TokenKind::RParen)?;
            let span = open.span.merge(close.span);
            Some(p.program.arena.alloc_expr(Expr {
                kind: ExprKind::Group(first),
                span,
            }))
        }
    })(p);

    p.struct_literals = saved;
    result
}

/// `[a, b, c]`
fn array_literal(p: &mut Parser) -> Option<ExprId> {
    let open = p.advance(); // [
    let mut elements = Vec::new();
    if !p.at(TokenKind::RBracket) {
        loop {
            elements.push(expr(p)?);
            if !p.eat(TokenKind::Comma) {
                break;
            }
            if p.at(TokenKind::RBracket) {
                break;
            }
        }
    }
    let close = p.expect(TokenKind::RBracket)?;
    let span = open.span.merge(close.span);
    Some(p.program.arena.alloc_expr(Expr {
        kind: ExprKind::Array(elements),
        span,
    }))
}

/// Whether the upcoming `{` opens a record literal rather than a block:
/// `{ }` is a block, `{ ident: ...` is a record.
fn looks_like_record(p: &mut Parser) -> bool {
    p.nth(1) == TokenKind::Ident && p.nth(2) == TokenKind::Colon
}

/// `{ field: expr, ... }` with an optional nominal type already parsed.
fn record_literal(p: &mut Parser, ty: Option<TypeId>) -> Option<ExprId> {
    let open = p.advance(); // {
    p.skip_newlines();
    let mut fields = Vec::new();
    while !p.at(TokenKind::RBrace) {
        let (name, _) = p.expect_ident()?;
        p.expect(TokenKind::Colon)?;
        let value = expr(p)?;
        fields.push((name, value));
        if !p.eat(TokenKind::Comma) {
            p.skip_newlines();
            break;
        }
        p.skip_newlines();
    }
    let close = p.expect(TokenKind::RBrace)?;
    let start_span = ty
        .map(|t| p.program.type_expr(t).span)
        .unwrap_or(open.span);
    let span = start_span.merge(close.span);
    Some(p.program.arena.alloc_expr(Expr {
        kind: ExprKind::Record { ty, fields },
        span,
    }))
}

/// Interpolated string literal: split into parts, re-lex each embedded
/// expression with file-relative locations.
fn interpolated(p: &mut Parser, raw: &str, span: kira_common::span::Span) -> Option<ExprId> {
    let parts = split_interpolation(raw, span.start);
    let mut ast_parts = Vec::with_capacity(parts.len());
    for part in parts {
        match part {
            StringPart::Lit(text) => ast_parts.push(InterpPart::Lit(text)),
            StringPart::Expr { source, start } => {
                let expr = p.parse_embedded_expr(&source, start)?;
                ast_parts.push(InterpPart::Expr(expr));
            }
        }
    }
    Some(p.program.arena.alloc_expr(Expr {
        kind: ExprKind::Interpolated(ast_parts),
        span,
    }))
}

/// `match subject { arms }` in expression position.
fn match_expr(p: &mut Parser) -> Option<ExprId> {
    let match_token = p.advance(); // match
    let subject = expr_no_struct(p)?;
    p.expect(TokenKind::LBrace)?;
    let arms = match_arms(p, false)?;
    let close = p.expect(TokenKind::RBrace)?;
    let span = match_token.span.merge(close.span);
    Some(p.program.arena.alloc_expr(Expr {
        kind: ExprKind::Match { subject, arms },
        span,
    }))
}

/// Parse the arm list of a match. `blocks_only` is set for match
/// statements, whose arm bodies must be blocks.
pub(crate) fn match_arms(p: &mut Parser, blocks_only: bool) -> Option<Vec<MatchArm>> {
    let mut arms = Vec::new();
    p.skip_newlines();
    while !p.at(TokenKind::RBrace) && !p.at_eof() {
        let pattern = patterns::parse_pattern(p, true)?;
        let guard = if p.eat(TokenKind::If) {
            Some(expr_no_struct(p)?)
        } else {
            None
        };
        p.expect(TokenKind::FatArrow)?;
        let pattern_span = p.program.pat(pattern).span;
        let (body, body_span) = if p.at(TokenKind::LBrace) {
            let (stmts, span) = statements::parse_block(p)?;
            (ArmBody::Block(stmts), span)
        } else if blocks_only {
            let span = p.current_span();
            p.error(span, "match statement arms require block bodies");
            return None;
        } else {
            let body = expr(p)?;
            let span = p.program.expr(body).span;
            (ArmBody::Expr(body), span)
        };
        arms.push(MatchArm {
            pattern,
            guard,
            body,
            span: pattern_span.merge(body_span),
        });
        // Arms are separated by newlines or commas.
        p.eat(TokenKind::Comma);
        p.skip_newlines();
    }
    if arms.is_empty() {
        let span = p.current_span();
        p.error(span, "match requires at least one arm");
        return None;
    }
    Some(arms)
}

/// Anonymous function: `fn(x: i32) -> i32 { ... }`.
fn closure(p: &mut Parser, effect: bool) -> Option<ExprId> {
    let first = p.advance(); // `fn`, or `effect` followed by `fn`
    if effect {
        p.expect(TokenKind::Fn)?;
    }
    p.expect(TokenKind::LParen)?;
    let mut params = Vec::new();
    while !p.at(TokenKind::RParen) {
        let (name, name_span) = p.expect_ident()?;
        p.expect(TokenKind::Colon)?;
        let ty = types::parse_type(p)?;
        let span = name_span.merge(p.program.type_expr(ty).span);
        params.push(Param { name, ty, span });
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(TokenKind::RParen)?;
    p.expect(TokenKind::Arrow)?;
    let ret = types::parse_type(p)?;
    let (body, body_span) = statements::parse_block(p)?;
    let span = first.span.merge(body_span);
    Some(p.program.arena.alloc_expr(Expr {
        kind: ExprKind::Closure {
            params,
            ret,
            effect,
            body,
        },
        span,
    }))
}

impl Parser {
    /// Span of the most recently consumed `)` -- used for call spans.
    fn prev_rparen_span(&self) -> kira_common::span::Span {
        let mut idx = self.pos();
        while idx > 0 {
            idx -= 1;
            if self.token_at(idx).kind == TokenKind::RParen {
                return self.token_at(idx).span;
            }
        }
        self.current_span()
    }
}
