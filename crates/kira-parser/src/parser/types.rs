//! Type-expression parser for Kira.

use kira_common::token::{LitValue, TokenKind};

use crate::ast::{PrimType, TypeExpr, TypeId, TypeKind};

use super::Parser;

/// Parse a type expression.
pub(crate) fn parse_type(p: &mut Parser) -> Option<TypeId> {
    match p.current() {
        TokenKind::Ident => named_type(p),
        TokenKind::SelfType => {
            let token = p.advance();
            Some(p.program.arena.alloc_type(TypeExpr {
                kind: TypeKind::SelfType,
                span: token.span,
            }))
        }
        TokenKind::Fn => function_type(p, false),
        TokenKind::Effect if p.nth(1) == TokenKind::Fn => function_type(p, true),
        TokenKind::LParen => tuple_type(p),
        TokenKind::LBracket => array_type(p),
        other => {
            let span = p.current_span();
            p.error(span, format!("expected type, found {}", other.describe()));
            None
        }
    }
}

/// A named type: primitive, `_`, bare name, generic application, or a
/// dotted path. `IO`, `Result`, and `Option` get their dedicated kinds.
fn named_type(p: &mut Parser) -> Option<TypeId> {
    let token = p.advance();
    let mut span = token.span;
    let name = token.text;

    if name == "_" {
        return Some(p.program.arena.alloc_type(TypeExpr {
            kind: TypeKind::Infer,
            span,
        }));
    }
    if let Some(prim) = PrimType::from_str(&name) {
        return Some(p.program.arena.alloc_type(TypeExpr {
            kind: TypeKind::Prim(prim),
            span,
        }));
    }

    // Dotted path: `geometry.Shape`.
    let mut segments = vec![name];
    while p.at(TokenKind::Dot) && p.nth(1) == TokenKind::Ident {
        p.advance(); // .
        let seg = p.advance();
        span = span.merge(seg.span);
        segments.push(seg.text);
    }

    // Generic arguments.
    let mut args = Vec::new();
    if p.at(TokenKind::LBracket) {
        p.advance();
        loop {
            args.push(parse_type(p)?);
            if !p.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = p.expect(TokenKind::RBracket)?;
        span = span.merge(close.span);
    }

    let kind = if segments.len() > 1 {
        TypeKind::Path { segments, args }
    } else {
        let base = segments.pop().expect("at least one segment");
        match (base.as_str(), args.len()) {
            ("IO", 1) => TypeKind::Io(args[0]),
            ("Option", 1) => TypeKind::OptionType(args[0]),
            ("Result", 2) => TypeKind::ResultType {
                ok: args[0],
                err: args[1],
            },
            (_, 0) => TypeKind::Named(base),
            _ => TypeKind::Generic { base, args },
        }
    };
    Some(p.program.arena.alloc_type(TypeExpr { kind, span }))
}

/// `fn(T, U) -> R` or `effect fn(T) -> R`.
fn function_type(p: &mut Parser, effect: bool) -> Option<TypeId> {
    let first = p.advance(); // `fn` or `effect`
    if effect {
        p.expect(TokenKind::Fn)?;
    }
    p.expect(TokenKind::LParen)?;
    let mut params = Vec::new();
    while !p.at(TokenKind::RParen) {
        params.push(parse_type(p)?);
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(TokenKind::RParen)?;
    p.expect(TokenKind::Arrow)?;
    let ret = parse_type(p)?;
    let span = first.span.merge(p.program.type_expr(ret).span);
    Some(p.program.arena.alloc_type(TypeExpr {
        kind: TypeKind::Function {
            params,
            ret,
            effect,
        },
        span,
    }))
}

/// `(T, U)` tuple type. A single parenthesized type is just that type.
fn tuple_type(p: &mut Parser) -> Option<TypeId> {
    let open = p.advance(); // (
    let first = parse_type(p)?;
    if p.eat(TokenKind::Comma) {
        let mut elements = vec![first];
        while !p.at(TokenKind::RParen) {
            elements.push(parse_type(p)?);
            if !p.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = p.expect(TokenKind::RParen)?;
        Some(p.program.arena.alloc_type(TypeExpr {
            kind: TypeKind::Tuple(elements),
            span: open.span.merge(close.span),
        }))
    } else {
        p.expect(TokenKind::RParen)?;
        Some(first)
    }
}

/// `[T]` or `[T; 4]`.
fn array_type(p: &mut Parser) -> Option<TypeId> {
    let open = p.advance(); // [
    let elem = parse_type(p)?;
    let size = if p.eat(TokenKind::Semicolon) {
        let token = p.expect(TokenKind::IntLiteral)?;
        match token.value {
            Some(LitValue::Int { value, .. }) if value >= 0 => Some(value as u64),
            _ => {
                p.error(token.span, "array size must be a non-negative integer");
                return None;
            }
        }
    } else {
        None
    };
    let close = p.expect(TokenKind::RBracket)?;
    Some(p.program.arena.alloc_type(TypeExpr {
        kind: TypeKind::Array { elem, size },
        span: open.span.merge(close.span),
    }))
}

/// Whether a parsed type could plausibly be an explicit generic argument.
///
/// Bare lowercase names are rejected: in `m[key]` the `key` is an index
/// expression, not a type. Uppercase names, primitives, and structured
/// types qualify.
pub(crate) fn is_type_shaped(program: &crate::ast::Program, id: TypeId) -> bool {
    match &program.type_expr(id).kind {
        TypeKind::Named(name) => name.chars().next().is_some_and(|c| c.is_ascii_uppercase()),
        TypeKind::Infer => false,
        _ => true,
    }
}
