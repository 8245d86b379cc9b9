//! Statement and block parser for Kira.

use kira_common::span::Span;
use kira_common::token::TokenKind;

use crate::ast::{ElseBranch, ExprKind, Stmt, StmtId, StmtKind};

use super::{expressions, patterns, types, Parser};

/// Parse a braced block. Returns the statements and the block's span.
pub(crate) fn parse_block(p: &mut Parser) -> Option<(Vec<StmtId>, Span)> {
    let open = p.expect(TokenKind::LBrace)?;
    let mut stmts = Vec::new();
    p.skip_newlines();
    while !p.at(TokenKind::RBrace) && !p.at_eof() {
        match parse_stmt(p) {
            Some(stmt) => stmts.push(stmt),
            None => p.recover_to_stmt_boundary(),
        }
        p.skip_newlines();
    }
    let close = p.expect(TokenKind::RBrace)?;
    Some((stmts, open.span.merge(close.span)))
}

/// Parse a single statement.
pub(crate) fn parse_stmt(p: &mut Parser) -> Option<StmtId> {
    match p.current() {
        TokenKind::Let => let_stmt(p, false),
        TokenKind::Var => var_stmt(p),
        TokenKind::If => if_stmt(p),
        TokenKind::For => for_stmt(p),
        TokenKind::While => while_stmt(p),
        TokenKind::Loop => loop_stmt(p),
        TokenKind::Match => match_stmt(p),
        TokenKind::Return => return_stmt(p),
        TokenKind::Break => break_stmt(p),
        TokenKind::LBrace => {
            let (stmts, span) = parse_block(p)?;
            Some(p.program.arena.alloc_stmt(Stmt {
                kind: StmtKind::Block(stmts),
                span,
            }))
        }
        _ => expr_or_assign_stmt(p),
    }
}

/// `let pattern: Type = init`, optionally `pub` at the top level.
pub(crate) fn let_stmt(p: &mut Parser, public: bool) -> Option<StmtId> {
    let let_token = p.expect(TokenKind::Let)?;
    let pattern = patterns::parse_pattern(p, false)?;
    p.expect(TokenKind::Colon)?;
    let ty = types::parse_type(p)?;
    p.expect(TokenKind::Eq)?;
    let init = expressions::expr(p)?;
    let span = let_token.span.merge(p.program.expr(init).span);
    Some(p.program.arena.alloc_stmt(Stmt {
        kind: StmtKind::Let {
            pattern,
            ty,
            init,
            public,
        },
        span,
    }))
}

/// `var name: Type = init` or `var name: Type`.
fn var_stmt(p: &mut Parser) -> Option<StmtId> {
    let var_token = p.advance(); // var
    let (name, name_span) = p.expect_ident()?;
    p.expect(TokenKind::Colon)?;
    let ty = types::parse_type(p)?;
    let (init, end_span) = if p.eat(TokenKind::Eq) {
        let init = expressions::expr(p)?;
        let span = p.program.expr(init).span;
        (Some(init), span)
    } else {
        (None, p.program.type_expr(ty).span)
    };
    let _ = name_span;
    Some(p.program.arena.alloc_stmt(Stmt {
        kind: StmtKind::Var { name, ty, init },
        span: var_token.span.merge(end_span),
    }))
}

/// `if cond { } else if ... { } else { }`
fn if_stmt(p: &mut Parser) -> Option<StmtId> {
    let if_token = p.advance(); // if
    let cond = expressions::expr_no_struct(p)?;
    let (then_branch, mut span) = parse_block(p)?;
    span = if_token.span.merge(span);

    let else_branch = if p.eat(TokenKind::Else) {
        if p.at(TokenKind::If) {
            let nested = if_stmt(p)?;
            span = span.merge(p.program.stmt(nested).span);
            Some(ElseBranch::If(nested))
        } else {
            let (stmts, else_span) = parse_block(p)?;
            span = span.merge(else_span);
            Some(ElseBranch::Block(stmts))
        }
    } else {
        None
    };

    Some(p.program.arena.alloc_stmt(Stmt {
        kind: StmtKind::If {
            cond,
            then_branch,
            else_branch,
        },
        span,
    }))
}

/// Optional `@name` loop label after `for`/`while`/`loop`.
fn loop_label(p: &mut Parser) -> Option<String> {
    if p.eat(TokenKind::At) {
        p.expect_ident().map(|(name, _)| name)
    } else {
        None
    }
}

/// `for pattern in iterable { ... }`
fn for_stmt(p: &mut Parser) -> Option<StmtId> {
    let for_token = p.advance(); // for
    let label = if p.at(TokenKind::At) { loop_label(p) } else { None };
    let pattern = patterns::parse_pattern(p, false)?;
    p.expect(TokenKind::In)?;
    let iterable = expressions::expr_no_struct(p)?;
    let (body, body_span) = parse_block(p)?;
    Some(p.program.arena.alloc_stmt(Stmt {
        kind: StmtKind::For {
            label,
            pattern,
            iterable,
            body,
        },
        span: for_token.span.merge(body_span),
    }))
}

/// `while cond { ... }`
fn while_stmt(p: &mut Parser) -> Option<StmtId> {
    let while_token = p.advance(); // while
    let label = if p.at(TokenKind::At) { loop_label(p) } else { None };
    let cond = expressions::expr_no_struct(p)?;
    let (body, body_span) = parse_block(p)?;
    Some(p.program.arena.alloc_stmt(Stmt {
        kind: StmtKind::While { label, cond, body },
        span: while_token.span.merge(body_span),
    }))
}

/// `loop { ... }`
fn loop_stmt(p: &mut Parser) -> Option<StmtId> {
    let loop_token = p.advance(); // loop
    let label = if p.at(TokenKind::At) { loop_label(p) } else { None };
    let (body, body_span) = parse_block(p)?;
    Some(p.program.arena.alloc_stmt(Stmt {
        kind: StmtKind::Loop { label, body },
        span: loop_token.span.merge(body_span),
    }))
}

/// `match subject { arms }` in statement position; arm bodies are blocks.
fn match_stmt(p: &mut Parser) -> Option<StmtId> {
    let match_token = p.advance(); // match
    let subject = expressions::expr_no_struct(p)?;
    p.expect(TokenKind::LBrace)?;
    let arms = expressions::match_arms(p, true)?;
    let close = p.expect(TokenKind::RBrace)?;
    Some(p.program.arena.alloc_stmt(Stmt {
        kind: StmtKind::Match { subject, arms },
        span: match_token.span.merge(close.span),
    }))
}

/// `return` with an optional value on the same line.
fn return_stmt(p: &mut Parser) -> Option<StmtId> {
    let return_token = p.advance(); // return
    let (value, span) = if stmt_ends(p.current()) {
        (None, return_token.span)
    } else {
        let value = expressions::expr(p)?;
        let span = return_token.span.merge(p.program.expr(value).span);
        (Some(value), span)
    };
    Some(p.program.arena.alloc_stmt(Stmt {
        kind: StmtKind::Return { value },
        span,
    }))
}

/// `break [@label] [value]`
fn break_stmt(p: &mut Parser) -> Option<StmtId> {
    let break_token = p.advance(); // break
    let label = if p.at(TokenKind::At) { loop_label(p) } else { None };
    let (value, span) = if stmt_ends(p.current()) {
        (None, break_token.span)
    } else {
        let value = expressions::expr(p)?;
        let span = break_token.span.merge(p.program.expr(value).span);
        (Some(value), span)
    };
    Some(p.program.arena.alloc_stmt(Stmt {
        kind: StmtKind::Break { label, value },
        span,
    }))
}

/// Whether the current token terminates a statement.
fn stmt_ends(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Newline | TokenKind::RBrace | TokenKind::Semicolon | TokenKind::Eof
    )
}

/// Expression statement, or assignment when followed by `=`.
fn expr_or_assign_stmt(p: &mut Parser) -> Option<StmtId> {
    let expr = expressions::expr(p)?;
    if p.at(TokenKind::Eq) {
        p.advance();
        let value = expressions::expr(p)?;
        let target_span = p.program.expr(expr).span;
        if !valid_assign_target(&p.program.expr(expr).kind) {
            p.error_with_code("P0003", target_span, "invalid assignment target");
            return None;
        }
        let span = target_span.merge(p.program.expr(value).span);
        return Some(p.program.arena.alloc_stmt(Stmt {
            kind: StmtKind::Assign {
                target: expr,
                value,
            },
            span,
        }));
    }
    let span = p.program.expr(expr).span;
    Some(p.program.arena.alloc_stmt(Stmt {
        kind: StmtKind::Expr(expr),
        span,
    }))
}

/// Assignment targets are identifiers, field accesses, and index accesses.
fn valid_assign_target(kind: &ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::Ident { .. } | ExprKind::Field { .. } | ExprKind::Index { .. }
    )
}
