//! Declaration parser for Kira: the program structure, functions, type
//! definitions, traits, impls, consts, top-level lets, and tests.

use kira_common::span::Span;
use kira_common::token::{LitValue, TokenKind};

use crate::ast::{
    Decl, DeclKind, FieldDef, FnDecl, GenericParam, ImportDecl, ImportItem, ModuleDecl, Param,
    TypeDefKind, TypeKind, VariantDef, VariantPayload, WherePred,
};

use super::{expressions, patterns, statements, types, Parser};

/// Parse a whole source file: optional module declaration, import block,
/// then declarations until end of file.
pub(crate) fn parse_program(p: &mut Parser) {
    p.skip_newlines();

    if p.at(TokenKind::Module) {
        module_decl(p);
        p.skip_newlines();
    }

    while p.at(TokenKind::Import) {
        if let Some(import) = import_decl(p) {
            p.program.imports.push(import);
        } else {
            p.recover_to_decl_boundary();
        }
        p.skip_newlines();
    }

    while !p.at_eof() {
        match declaration(p) {
            Some(decl) => {
                let id = p.program.arena.alloc_decl(decl);
                p.program.decls.push(id);
            }
            None => p.recover_to_decl_boundary(),
        }
        p.skip_newlines();
    }
}

/// `module a.b.c`
fn module_decl(p: &mut Parser) {
    let module_token = p.advance(); // module
    let Some((path, span)) = dotted_path(p) else {
        p.recover_to_decl_boundary();
        return;
    };
    if p.program.module.is_some() {
        p.error(span, "duplicate module declaration");
        return;
    }
    p.program.module = Some(ModuleDecl {
        path,
        span: module_token.span.merge(span),
    });
}

/// A dotted identifier path: `a.b.c`.
fn dotted_path(p: &mut Parser) -> Option<(Vec<String>, Span)> {
    let (first, mut span) = p.expect_ident()?;
    let mut path = vec![first];
    while p.at(TokenKind::Dot) && p.nth(1) == TokenKind::Ident {
        p.advance(); // .
        let seg = p.advance();
        span = span.merge(seg.span);
        path.push(seg.text);
    }
    Some((path, span))
}

/// `import a.b` or `import a.b.{ Foo, Bar as Baz }`.
fn import_decl(p: &mut Parser) -> Option<ImportDecl> {
    let import_token = p.advance(); // import
    let (first, mut span) = p.expect_ident()?;
    let mut path = vec![first];
    let mut items = None;

    while p.eat(TokenKind::Dot) {
        if p.at(TokenKind::LBrace) {
            p.advance(); // {
            p.skip_newlines();
            let mut list = Vec::new();
            while !p.at(TokenKind::RBrace) {
                let (name, item_span) = p.expect_ident()?;
                let alias = if p.eat(TokenKind::As) {
                    Some(p.expect_ident()?.0)
                } else {
                    None
                };
                list.push(ImportItem {
                    name,
                    alias,
                    span: item_span,
                });
                if !p.eat(TokenKind::Comma) {
                    p.skip_newlines();
                    break;
                }
                p.skip_newlines();
            }
            let close = p.expect(TokenKind::RBrace)?;
            span = span.merge(close.span);
            items = Some(list);
            break;
        }
        let seg = p.expect(TokenKind::Ident)?;
        span = span.merge(seg.span);
        path.push(seg.text);
    }

    Some(ImportDecl {
        path,
        items,
        span: import_token.span.merge(span),
    })
}

/// Parse one top-level declaration.
fn declaration(p: &mut Parser) -> Option<Decl> {
    let doc = p.take_doc();
    let public = p.eat(TokenKind::Pub);

    match p.current() {
        TokenKind::Effect | TokenKind::Fn => {
            let effect = p.eat(TokenKind::Effect);
            function(p, public, effect, doc, false).map(|f| Decl {
                span: f.span,
                kind: DeclKind::Function(f),
            })
        }
        TokenKind::Type => type_decl(p, public, doc),
        TokenKind::Trait => trait_decl(p, public, doc),
        TokenKind::Impl if !public => impl_decl(p),
        TokenKind::Const => const_decl(p, public, doc),
        TokenKind::Let => {
            let stmt = statements::let_stmt(p, public)?;
            let stmt = p.program.stmt(stmt).clone();
            match stmt.kind {
                crate::ast::StmtKind::Let {
                    pattern,
                    ty,
                    init,
                    public,
                } => Some(Decl {
                    kind: DeclKind::Let {
                        pattern,
                        ty,
                        init,
                        public,
                    },
                    span: stmt.span,
                }),
                _ => unreachable!("let_stmt produced a non-let statement"),
            }
        }
        TokenKind::Test if !public => test_decl(p),
        other => {
            let span = p.current_span();
            p.error_with_code(
                "P0002",
                span,
                format!("expected declaration, found {}", other.describe()),
            );
            None
        }
    }
}

/// `fn name[T: Bound](params) -> Type where T: Bound { body }`, with the
/// `effect` flag already consumed. Inside traits the body may be omitted.
pub(crate) fn function(
    p: &mut Parser,
    public: bool,
    effect: bool,
    doc: Option<String>,
    in_trait: bool,
) -> Option<FnDecl> {
    let fn_token = p.expect(TokenKind::Fn)?;
    let (name, _) = p.expect_ident()?;

    let generics = if p.at(TokenKind::LBracket) {
        generic_params(p)?
    } else {
        Vec::new()
    };

    p.expect(TokenKind::LParen)?;
    let mut has_self = false;
    let mut params = Vec::new();
    if p.at(TokenKind::SelfKw) {
        p.advance();
        has_self = true;
        if !p.at(TokenKind::RParen) {
            p.expect(TokenKind::Comma)?;
        }
    }
    while !p.at(TokenKind::RParen) {
        let (param_name, param_span) = p.expect_ident()?;
        p.expect(TokenKind::Colon)?;
        let ty = types::parse_type(p)?;
        let span = param_span.merge(p.program.type_expr(ty).span);
        params.push(Param {
            name: param_name,
            ty,
            span,
        });
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(TokenKind::RParen)?;

    p.expect(TokenKind::Arrow)?;
    let ret = types::parse_type(p)?;

    let where_clause = if p.at(TokenKind::Where) {
        parse_where_clause(p)?
    } else {
        Vec::new()
    };

    let (body, end_span) = if p.at(TokenKind::LBrace) {
        let (stmts, span) = statements::parse_block(p)?;
        (Some(stmts), span)
    } else if in_trait {
        (None, p.program.type_expr(ret).span)
    } else {
        let span = p.current_span();
        p.error_with_code("P0002", span, "function requires a body");
        return None;
    };

    Some(FnDecl {
        name,
        generics,
        has_self,
        params,
        ret,
        effect,
        public,
        where_clause,
        body,
        doc,
        span: fn_token.span.merge(end_span),
    })
}

/// `[T, U: Ord + Show]`
fn generic_params(p: &mut Parser) -> Option<Vec<GenericParam>> {
    p.expect(TokenKind::LBracket)?;
    let mut params = Vec::new();
    while !p.at(TokenKind::RBracket) {
        let (name, span) = p.expect_ident()?;
        let bounds = if p.eat(TokenKind::Colon) {
            trait_bounds(p)?
        } else {
            Vec::new()
        };
        params.push(GenericParam { name, bounds, span });
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    p.expect(TokenKind::RBracket)?;
    Some(params)
}

/// `Trait + Trait + ...`
fn trait_bounds(p: &mut Parser) -> Option<Vec<String>> {
    let mut bounds = vec![p.expect_ident()?.0];
    while p.eat(TokenKind::Plus) {
        bounds.push(p.expect_ident()?.0);
    }
    Some(bounds)
}

/// `where T: Ord, U: Show + Eq`
fn parse_where_clause(p: &mut Parser) -> Option<Vec<WherePred>> {
    p.expect(TokenKind::Where)?;
    let mut predicates = Vec::new();
    loop {
        let (param, _) = p.expect_ident()?;
        p.expect(TokenKind::Colon)?;
        let bounds = trait_bounds(p)?;
        predicates.push(WherePred { param, bounds });
        if !p.eat(TokenKind::Comma) {
            break;
        }
    }
    Some(predicates)
}

/// `type Name[T] = ...` -- sum type, product type, or alias.
fn type_decl(p: &mut Parser, public: bool, doc: Option<String>) -> Option<Decl> {
    let type_token = p.advance(); // type
    let (name, _) = p.expect_ident()?;
    let generics = if p.at(TokenKind::LBracket) {
        generic_params(p)?
    } else {
        Vec::new()
    };
    p.expect(TokenKind::Eq)?;
    p.skip_newlines();

    // Product type: `type Name = { field: T, ... }`
    if p.at(TokenKind::LBrace) {
        let (fields, end_span) = field_list(p)?;
        return Some(Decl {
            kind: DeclKind::TypeDef {
                name,
                generics,
                def: TypeDefKind::Product(fields),
                public,
                doc,
            },
            span: type_token.span.merge(end_span),
        });
    }

    // Sum type: leading `|`, or an uppercase variant followed by `|`,
    // `(`, or `{`. A single bare uppercase name is an alias.
    if p.at(TokenKind::Pipe) {
        p.advance();
        let (variants, end_span) = variant_list(p)?;
        return Some(Decl {
            kind: DeclKind::TypeDef {
                name,
                generics,
                def: TypeDefKind::Sum(variants),
                public,
                doc,
            },
            span: type_token.span.merge(end_span),
        });
    }

    if p.at(TokenKind::Ident) && starts_uppercase(p.current_text()) {
        let checkpoint = p.checkpoint();
        if let Some((variants, end_span)) = variant_list(p) {
            let is_sum = variants.len() > 1
                || variants
                    .first()
                    .is_some_and(|v| !matches!(v.payload, VariantPayload::Unit));
            if is_sum {
                return Some(Decl {
                    kind: DeclKind::TypeDef {
                        name,
                        generics,
                        def: TypeDefKind::Sum(variants),
                        public,
                        doc,
                    },
                    span: type_token.span.merge(end_span),
                });
            }
        }
        p.rewind(checkpoint);
    }

    // Alias: `type Meters = f64`
    let aliased = types::parse_type(p)?;
    let end_span = p.program.type_expr(aliased).span;
    Some(Decl {
        kind: DeclKind::TypeDef {
            name,
            generics,
            def: TypeDefKind::Alias(aliased),
            public,
            doc,
        },
        span: type_token.span.merge(end_span),
    })
}

fn starts_uppercase(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// `Variant | Variant(T) | Variant { field: T }`, newlines allowed
/// around the separators.
fn variant_list(p: &mut Parser) -> Option<(Vec<VariantDef>, Span)> {
    let mut variants = Vec::new();
    loop {
        let (name, name_span) = p.expect_ident()?;
        let (payload, span) = if p.at(TokenKind::LParen) {
            p.advance();
            let mut tys = Vec::new();
            while !p.at(TokenKind::RParen) {
                tys.push(types::parse_type(p)?);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            let close = p.expect(TokenKind::RParen)?;
            (VariantPayload::Tuple(tys), name_span.merge(close.span))
        } else if p.at(TokenKind::LBrace) {
            let (fields, end_span) = field_list(p)?;
            (VariantPayload::Record(fields), name_span.merge(end_span))
        } else {
            (VariantPayload::Unit, name_span)
        };
        variants.push(VariantDef {
            name,
            payload,
            span,
        });

        // Separator: `|`, possibly surrounded by newlines.
        let checkpoint = p.checkpoint();
        p.skip_newlines();
        if p.eat(TokenKind::Pipe) {
            p.skip_newlines();
        } else {
            p.rewind(checkpoint);
            break;
        }
    }
    let span = variants
        .first()
        .map(|v| v.span)
        .expect("at least one variant")
        .merge(variants.last().expect("at least one variant").span);
    Some((variants, span))
}

/// `{ field: Type, ... }` for products and record-payload variants.
fn field_list(p: &mut Parser) -> Option<(Vec<FieldDef>, Span)> {
    let open = p.expect(TokenKind::LBrace)?;
    p.skip_newlines();
    let mut fields = Vec::new();
    while !p.at(TokenKind::RBrace) {
        let (name, name_span) = p.expect_ident()?;
        p.expect(TokenKind::Colon)?;
        let ty = types::parse_type(p)?;
        let span = name_span.merge(p.program.type_expr(ty).span);
        fields.push(FieldDef { name, ty, span });
        if !p.eat(TokenKind::Comma) {
            p.skip_newlines();
            break;
        }
        p.skip_newlines();
    }
    let close = p.expect(TokenKind::RBrace)?;
    Some((fields, open.span.merge(close.span)))
}

/// `trait Name: Super + Super { method signatures }`
fn trait_decl(p: &mut Parser, public: bool, doc: Option<String>) -> Option<Decl> {
    let trait_token = p.advance(); // trait
    let (name, _) = p.expect_ident()?;
    let supers = if p.eat(TokenKind::Colon) {
        trait_bounds(p)?
    } else {
        Vec::new()
    };
    p.expect(TokenKind::LBrace)?;
    p.skip_newlines();
    let mut methods = Vec::new();
    while !p.at(TokenKind::RBrace) && !p.at_eof() {
        let method_doc = p.take_doc();
        let effect = p.eat(TokenKind::Effect);
        match function(p, false, effect, method_doc, true) {
            Some(method) => methods.push(method),
            None => p.recover_to_stmt_boundary(),
        }
        p.skip_newlines();
    }
    let close = p.expect(TokenKind::RBrace)?;
    Some(Decl {
        kind: DeclKind::Trait {
            name,
            supers,
            methods,
            public,
            doc,
        },
        span: trait_token.span.merge(close.span),
    })
}

/// `impl Trait for Type { methods }` or `impl Type { methods }`.
fn impl_decl(p: &mut Parser) -> Option<Decl> {
    let impl_token = p.advance(); // impl
    let first = types::parse_type(p)?;

    let (trait_name, target) = if p.eat(TokenKind::For) {
        let trait_name = match &p.program.type_expr(first).kind {
            TypeKind::Named(name) => name.clone(),
            _ => {
                let span = p.program.type_expr(first).span;
                p.error(span, "trait name expected before `for`");
                return None;
            }
        };
        let target = types::parse_type(p)?;
        (Some(trait_name), target)
    } else {
        (None, first)
    };

    let where_clause = if p.at(TokenKind::Where) {
        parse_where_clause(p)?
    } else {
        Vec::new()
    };

    p.expect(TokenKind::LBrace)?;
    p.skip_newlines();
    let mut methods = Vec::new();
    while !p.at(TokenKind::RBrace) && !p.at_eof() {
        let method_doc = p.take_doc();
        let public = p.eat(TokenKind::Pub);
        let effect = p.eat(TokenKind::Effect);
        match function(p, public, effect, method_doc, false) {
            Some(method) => methods.push(method),
            None => p.recover_to_stmt_boundary(),
        }
        p.skip_newlines();
    }
    let close = p.expect(TokenKind::RBrace)?;
    Some(Decl {
        kind: DeclKind::Impl {
            trait_name,
            target,
            methods,
            where_clause,
        },
        span: impl_token.span.merge(close.span),
    })
}

/// `const NAME: Type = value`
fn const_decl(p: &mut Parser, public: bool, doc: Option<String>) -> Option<Decl> {
    let const_token = p.advance(); // const
    let (name, _) = p.expect_ident()?;
    p.expect(TokenKind::Colon)?;
    let ty = types::parse_type(p)?;
    p.expect(TokenKind::Eq)?;
    let value = expressions::expr(p)?;
    let span = const_token.span.merge(p.program.expr(value).span);
    Some(Decl {
        kind: DeclKind::Const {
            name,
            ty,
            value,
            public,
            doc,
        },
        span,
    })
}

/// `test "name" { body }`
fn test_decl(p: &mut Parser) -> Option<Decl> {
    let test_token = p.advance(); // test
    let name_token = p.expect(TokenKind::StringLiteral)?;
    let name = match name_token.value {
        Some(LitValue::Str(name)) => name,
        _ => {
            p.error(name_token.span, "test names cannot be interpolated");
            return None;
        }
    };
    let (body, body_span) = statements::parse_block(p)?;
    Some(Decl {
        kind: DeclKind::Test { name, body },
        span: test_token.span.merge(body_span),
    })
}
