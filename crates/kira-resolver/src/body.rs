//! Pass 2 of resolution: function bodies, initializer expressions, type
//! references, and pattern bindings.

use kira_parser::ast::{
    ArmBody, DeclId, DeclKind, ElseBranch, ExprId, ExprKind, FnDecl, PatId, PatternKind, Program,
    StmtId, StmtKind, TypeDefKind, TypeId, TypeKind,
};

use crate::scope::{ScopeId, ScopeKind};
use crate::symbol::{SymbolKind, UnitId};
use crate::Resolver;

/// Per-function context threaded through statement resolution.
struct BodyCtx {
    unit: UnitId,
    /// Innermost-last stack of enclosing loop labels (None = unlabeled).
    loops: Vec<Option<String>>,
}

/// Resolve every body in one unit.
pub(crate) fn resolve_unit_bodies(
    r: &mut Resolver,
    program: &Program,
    unit: UnitId,
    unit_scope: ScopeId,
) {
    for decl_id in &program.decls {
        resolve_decl_body(r, program, unit, unit_scope, *decl_id);
    }
}

fn resolve_decl_body(
    r: &mut Resolver,
    program: &Program,
    unit: UnitId,
    unit_scope: ScopeId,
    decl_id: DeclId,
) {
    let decl = program.decl(decl_id);
    match &decl.kind {
        DeclKind::Function(f) => {
            resolve_fn(r, program, unit, unit_scope, Some(decl_id), f);
        }
        DeclKind::TypeDef { generics, def, .. } => {
            let scope = if generics.is_empty() {
                unit_scope
            } else {
                let scope = r.scopes.push(unit_scope, ScopeKind::GenericParams);
                define_generics(r, scope, generics);
                scope
            };
            r.decl_scopes.insert((unit, decl_id), scope);
            match def {
                TypeDefKind::Sum(variants) => {
                    for variant in variants {
                        match &variant.payload {
                            kira_parser::ast::VariantPayload::Unit => {}
                            kira_parser::ast::VariantPayload::Tuple(tys) => {
                                for ty in tys {
                                    resolve_type(r, program, unit, scope, *ty);
                                }
                            }
                            kira_parser::ast::VariantPayload::Record(fields) => {
                                for field in fields {
                                    resolve_type(r, program, unit, scope, field.ty);
                                }
                            }
                        }
                    }
                }
                TypeDefKind::Product(fields) => {
                    for field in fields {
                        resolve_type(r, program, unit, scope, field.ty);
                    }
                }
                TypeDefKind::Alias(ty) => resolve_type(r, program, unit, scope, *ty),
            }
        }
        DeclKind::Trait { methods, .. } => {
            let trait_scope = r.scopes.push(unit_scope, ScopeKind::TraitDef);
            r.decl_scopes.insert((unit, decl_id), trait_scope);
            for method in methods {
                resolve_fn(r, program, unit, trait_scope, None, method);
            }
        }
        DeclKind::Impl {
            target, methods, ..
        } => {
            let impl_scope = r.scopes.push(unit_scope, ScopeKind::ImplBlock);
            r.decl_scopes.insert((unit, decl_id), impl_scope);
            resolve_type(r, program, unit, impl_scope, *target);
            for method in methods {
                resolve_fn(r, program, unit, impl_scope, None, method);
            }
        }
        DeclKind::Const { ty, value, .. } => {
            resolve_type(r, program, unit, unit_scope, *ty);
            let mut ctx = BodyCtx {
                unit,
                loops: Vec::new(),
            };
            resolve_expr(r, program, &mut ctx, unit_scope, *value);
        }
        DeclKind::Let { ty, init, .. } => {
            // The pattern's names were bound in pass 1.
            resolve_type(r, program, unit, unit_scope, *ty);
            let mut ctx = BodyCtx {
                unit,
                loops: Vec::new(),
            };
            resolve_expr(r, program, &mut ctx, unit_scope, *init);
        }
        DeclKind::Test { body, .. } => {
            let scope = r.scopes.push(unit_scope, ScopeKind::Function);
            let mut ctx = BodyCtx {
                unit,
                loops: Vec::new(),
            };
            resolve_stmts(r, program, &mut ctx, scope, body);
        }
    }
}

/// Resolve a function: generic-parameter scope, function scope with the
/// parameters bound, signature types, then the body.
fn resolve_fn(
    r: &mut Resolver,
    program: &Program,
    unit: UnitId,
    parent: ScopeId,
    decl_id: Option<DeclId>,
    f: &FnDecl,
) {
    let outer = if f.generics.is_empty() {
        parent
    } else {
        let scope = r.scopes.push(parent, ScopeKind::GenericParams);
        define_generics(r, scope, &f.generics);
        scope
    };

    let fn_scope = r.scopes.push(outer, ScopeKind::Function);
    if let Some(decl_id) = decl_id {
        r.decl_scopes.insert((unit, decl_id), fn_scope);
    }

    if f.has_self {
        let symbol = r.symbols.define(
            "self",
            SymbolKind::Variable {
                mutable: false,
                ty: None,
            },
            f.span,
            false,
        );
        r.define_checked(fn_scope, "self", symbol, f.span);
    }

    for param in &f.params {
        resolve_type(r, program, unit, fn_scope, param.ty);
        let symbol = r.symbols.define(
            param.name.clone(),
            SymbolKind::Variable {
                mutable: false,
                ty: Some((unit, param.ty)),
            },
            param.span,
            false,
        );
        r.define_checked(fn_scope, &param.name, symbol, param.span);
    }
    resolve_type(r, program, unit, fn_scope, f.ret);

    if let Some(body) = &f.body {
        let mut ctx = BodyCtx {
            unit,
            loops: Vec::new(),
        };
        resolve_stmts(r, program, &mut ctx, fn_scope, body);
    }
}

fn define_generics(r: &mut Resolver, scope: ScopeId, generics: &[kira_parser::ast::GenericParam]) {
    for generic in generics {
        let symbol = r.symbols.define(
            generic.name.clone(),
            SymbolKind::TypeParam {
                bounds: generic.bounds.clone(),
            },
            generic.span,
            false,
        );
        r.define_checked(scope, &generic.name, symbol, generic.span);
    }
}

// ── Statements ─────────────────────────────────────────────────────────

fn resolve_stmts(
    r: &mut Resolver,
    program: &Program,
    ctx: &mut BodyCtx,
    scope: ScopeId,
    stmts: &[StmtId],
) {
    for stmt in stmts {
        resolve_stmt(r, program, ctx, scope, *stmt);
    }
}

fn resolve_stmt(
    r: &mut Resolver,
    program: &Program,
    ctx: &mut BodyCtx,
    scope: ScopeId,
    stmt_id: StmtId,
) {
    let stmt = program.stmt(stmt_id);
    match &stmt.kind {
        StmtKind::Let {
            pattern, ty, init, ..
        } => {
            resolve_type(r, program, ctx.unit, scope, *ty);
            // The initializer resolves before the pattern binds, so the
            // new names are not visible inside it.
            resolve_expr(r, program, ctx, scope, *init);
            bind_pattern(r, program, ctx.unit, scope, *pattern, Some((ctx.unit, *ty)), false);
        }
        StmtKind::Var { name, ty, init } => {
            resolve_type(r, program, ctx.unit, scope, *ty);
            if let Some(init) = init {
                resolve_expr(r, program, ctx, scope, *init);
            }
            let symbol = r.symbols.define(
                name.clone(),
                SymbolKind::Variable {
                    mutable: true,
                    ty: Some((ctx.unit, *ty)),
                },
                stmt.span,
                false,
            );
            r.define_checked(scope, name, symbol, stmt.span);
        }
        StmtKind::Assign { target, value } => {
            resolve_expr(r, program, ctx, scope, *target);
            resolve_expr(r, program, ctx, scope, *value);
            // Assigning through an identifier requires a mutable binding.
            if let ExprKind::Ident { name, .. } = &program.expr(*target).kind {
                if let Some(symbol) = r.expr_symbols.get(&(ctx.unit, *target)).copied() {
                    let resolved = r.symbols.resolve_alias(symbol);
                    let mutable = matches!(
                        r.symbols.get(resolved).kind,
                        SymbolKind::Variable { mutable: true, .. }
                    );
                    if !mutable {
                        r.error(
                            "R0006",
                            format!("cannot assign to immutable binding `{name}`"),
                            program.expr(*target).span,
                        );
                    }
                }
            }
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            resolve_expr(r, program, ctx, scope, *cond);
            let then_scope = r.scopes.push(scope, ScopeKind::Block);
            resolve_stmts(r, program, ctx, then_scope, then_branch);
            match else_branch {
                None => {}
                Some(ElseBranch::Block(stmts)) => {
                    let else_scope = r.scopes.push(scope, ScopeKind::Block);
                    resolve_stmts(r, program, ctx, else_scope, stmts);
                }
                Some(ElseBranch::If(nested)) => {
                    resolve_stmt(r, program, ctx, scope, *nested);
                }
            }
        }
        StmtKind::For {
            label,
            pattern,
            iterable,
            body,
        } => {
            resolve_expr(r, program, ctx, scope, *iterable);
            let body_scope = r.scopes.push(scope, ScopeKind::Block);
            bind_pattern(r, program, ctx.unit, body_scope, *pattern, None, false);
            ctx.loops.push(label.clone());
            resolve_stmts(r, program, ctx, body_scope, body);
            ctx.loops.pop();
        }
        StmtKind::While { label, cond, body } => {
            resolve_expr(r, program, ctx, scope, *cond);
            let body_scope = r.scopes.push(scope, ScopeKind::Block);
            ctx.loops.push(label.clone());
            resolve_stmts(r, program, ctx, body_scope, body);
            ctx.loops.pop();
        }
        StmtKind::Loop { label, body } => {
            let body_scope = r.scopes.push(scope, ScopeKind::Block);
            ctx.loops.push(label.clone());
            resolve_stmts(r, program, ctx, body_scope, body);
            ctx.loops.pop();
        }
        StmtKind::Match { subject, arms } => {
            resolve_expr(r, program, ctx, scope, *subject);
            for arm in arms {
                resolve_arm(r, program, ctx, scope, arm);
            }
        }
        StmtKind::Return { value } => {
            if let Some(value) = value {
                resolve_expr(r, program, ctx, scope, *value);
            }
        }
        StmtKind::Break { label, value } => {
            if ctx.loops.is_empty() {
                r.error("R0007", "`break` outside of a loop", stmt.span);
            } else if let Some(label) = label {
                let known = ctx
                    .loops
                    .iter()
                    .any(|l| l.as_deref() == Some(label.as_str()));
                if !known {
                    r.error(
                        "R0007",
                        format!("`break` references unknown label `@{label}`"),
                        stmt.span,
                    );
                }
            }
            if let Some(value) = value {
                resolve_expr(r, program, ctx, scope, *value);
            }
        }
        StmtKind::Expr(expr) => resolve_expr(r, program, ctx, scope, *expr),
        StmtKind::Block(stmts) => {
            let block_scope = r.scopes.push(scope, ScopeKind::Block);
            resolve_stmts(r, program, ctx, block_scope, stmts);
        }
    }
}

fn resolve_arm(
    r: &mut Resolver,
    program: &Program,
    ctx: &mut BodyCtx,
    scope: ScopeId,
    arm: &kira_parser::ast::MatchArm,
) {
    let arm_scope = r.scopes.push(scope, ScopeKind::Block);
    bind_pattern(r, program, ctx.unit, arm_scope, arm.pattern, None, false);
    if let Some(guard) = arm.guard {
        resolve_expr(r, program, ctx, arm_scope, guard);
    }
    match &arm.body {
        ArmBody::Expr(expr) => resolve_expr(r, program, ctx, arm_scope, *expr),
        ArmBody::Block(stmts) => resolve_stmts(r, program, ctx, arm_scope, stmts),
    }
}

// ── Expressions ────────────────────────────────────────────────────────

fn resolve_expr(
    r: &mut Resolver,
    program: &Program,
    ctx: &mut BodyCtx,
    scope: ScopeId,
    expr_id: ExprId,
) {
    let expr = program.expr(expr_id);
    match &expr.kind {
        ExprKind::Int { .. }
        | ExprKind::Float { .. }
        | ExprKind::Str(_)
        | ExprKind::Char(_)
        | ExprKind::Bool(_) => {}
        ExprKind::Ident { name, generic_args } => {
            for arg in generic_args {
                resolve_type(r, program, ctx.unit, scope, *arg);
            }
            match r.scopes.lookup(scope, name) {
                Some(symbol) => {
                    r.expr_symbols.insert((ctx.unit, expr_id), symbol);
                }
                None => {
                    r.error("R0001", format!("undefined symbol `{name}`"), expr.span);
                }
            }
        }
        ExprKind::SelfRef => match r.scopes.lookup(scope, "self") {
            Some(symbol) => {
                r.expr_symbols.insert((ctx.unit, expr_id), symbol);
            }
            None => {
                r.error("R0001", "`self` used outside of a method", expr.span);
            }
        },
        ExprKind::Binary { lhs, rhs, .. } => {
            resolve_expr(r, program, ctx, scope, *lhs);
            resolve_expr(r, program, ctx, scope, *rhs);
        }
        ExprKind::Unary { operand, .. } => resolve_expr(r, program, ctx, scope, *operand),
        ExprKind::Field { base, .. } => resolve_expr(r, program, ctx, scope, *base),
        ExprKind::Index { base, index } => {
            resolve_expr(r, program, ctx, scope, *base);
            resolve_expr(r, program, ctx, scope, *index);
        }
        ExprKind::TupleField { base, .. } => resolve_expr(r, program, ctx, scope, *base),
        ExprKind::Call {
            callee,
            generic_args,
            args,
        } => {
            resolve_expr(r, program, ctx, scope, *callee);
            for arg in generic_args {
                resolve_type(r, program, ctx.unit, scope, *arg);
            }
            for arg in args {
                resolve_expr(r, program, ctx, scope, *arg);
            }
        }
        ExprKind::MethodCall {
            receiver,
            generic_args,
            args,
            ..
        } => {
            resolve_expr(r, program, ctx, scope, *receiver);
            for arg in generic_args {
                resolve_type(r, program, ctx.unit, scope, *arg);
            }
            for arg in args {
                resolve_expr(r, program, ctx, scope, *arg);
            }
        }
        ExprKind::Closure {
            params, ret, body, ..
        } => {
            let fn_scope = r.scopes.push(scope, ScopeKind::Function);
            for param in params {
                resolve_type(r, program, ctx.unit, fn_scope, param.ty);
                let symbol = r.symbols.define(
                    param.name.clone(),
                    SymbolKind::Variable {
                        mutable: false,
                        ty: Some((ctx.unit, param.ty)),
                    },
                    param.span,
                    false,
                );
                r.define_checked(fn_scope, &param.name, symbol, param.span);
            }
            resolve_type(r, program, ctx.unit, fn_scope, *ret);
            // Loop context does not cross the closure boundary.
            let mut inner = BodyCtx {
                unit: ctx.unit,
                loops: Vec::new(),
            };
            resolve_stmts(r, program, &mut inner, fn_scope, body);
        }
        ExprKind::Match { subject, arms } => {
            resolve_expr(r, program, ctx, scope, *subject);
            for arm in arms {
                resolve_arm(r, program, ctx, scope, arm);
            }
        }
        ExprKind::Tuple(elements) | ExprKind::Array(elements) => {
            for element in elements {
                resolve_expr(r, program, ctx, scope, *element);
            }
        }
        ExprKind::Record { ty, fields } => {
            if let Some(ty) = ty {
                resolve_type(r, program, ctx.unit, scope, *ty);
            }
            for (_, value) in fields {
                resolve_expr(r, program, ctx, scope, *value);
            }
        }
        ExprKind::Variant { name, args } => {
            match r.scopes.lookup(scope, name) {
                Some(symbol) => {
                    r.expr_symbols.insert((ctx.unit, expr_id), symbol);
                }
                None => {
                    r.error("R0001", format!("undefined symbol `{name}`"), expr.span);
                }
            }
            if let Some(args) = args {
                for arg in args {
                    resolve_expr(r, program, ctx, scope, *arg);
                }
            }
        }
        ExprKind::Cast { expr, ty } => {
            resolve_expr(r, program, ctx, scope, *expr);
            resolve_type(r, program, ctx.unit, scope, *ty);
        }
        ExprKind::Range { start, end, .. } => {
            if let Some(start) = start {
                resolve_expr(r, program, ctx, scope, *start);
            }
            if let Some(end) = end {
                resolve_expr(r, program, ctx, scope, *end);
            }
        }
        ExprKind::Group(inner) => resolve_expr(r, program, ctx, scope, *inner),
        ExprKind::Interpolated(parts) => {
            for part in parts {
                if let kira_parser::ast::InterpPart::Expr(expr) = part {
                    resolve_expr(r, program, ctx, scope, *expr);
                }
            }
        }
        ExprKind::Try(inner) => resolve_expr(r, program, ctx, scope, *inner),
        ExprKind::Coalesce { value, default } => {
            resolve_expr(r, program, ctx, scope, *value);
            resolve_expr(r, program, ctx, scope, *default);
        }
    }
}

// ── Patterns ───────────────────────────────────────────────────────────

/// Bind a pattern's identifiers as fresh variable symbols in `scope`,
/// resolving constructor and type references along the way.
pub(crate) fn bind_pattern(
    r: &mut Resolver,
    program: &Program,
    unit: UnitId,
    scope: ScopeId,
    pat_id: PatId,
    ty: Option<(UnitId, TypeId)>,
    public: bool,
) {
    let pat = program.pat(pat_id);
    match &pat.kind {
        PatternKind::Wildcard | PatternKind::Literal(_) | PatternKind::Range { .. } | PatternKind::Rest => {}
        PatternKind::Ident { name, mutable } => {
            let symbol = r.symbols.define(
                name.clone(),
                SymbolKind::Variable {
                    mutable: *mutable,
                    ty,
                },
                pat.span,
                public,
            );
            r.pat_symbols.insert((unit, pat_id), symbol);
            r.define_checked(scope, name, symbol, pat.span);
        }
        PatternKind::Typed { pattern, ty: annotated } => {
            resolve_type(r, program, unit, scope, *annotated);
            bind_pattern(r, program, unit, scope, *pattern, Some((unit, *annotated)), public);
        }
        PatternKind::Constructor { name, args } => {
            match r.scopes.lookup(scope, name) {
                Some(symbol) => {
                    r.pat_symbols.insert((unit, pat_id), symbol);
                }
                None => {
                    r.error("R0001", format!("undefined symbol `{name}`"), pat.span);
                }
            }
            if let Some(args) = args {
                // Sub-pattern bindings never inherit the outer annotation.
                for arg in args {
                    bind_pattern(r, program, unit, scope, *arg, None, public);
                }
            }
        }
        PatternKind::Record {
            type_name, fields, ..
        } => {
            if let Some(type_name) = type_name {
                match r.scopes.lookup(scope, type_name) {
                    Some(symbol) => {
                        r.pat_symbols.insert((unit, pat_id), symbol);
                    }
                    None => {
                        r.error(
                            "R0001",
                            format!("undefined symbol `{type_name}`"),
                            pat.span,
                        );
                    }
                }
            }
            for (_, field_pat) in fields {
                bind_pattern(r, program, unit, scope, *field_pat, None, public);
            }
        }
        PatternKind::Tuple(elements) => {
            for element in elements {
                bind_pattern(r, program, unit, scope, *element, None, public);
            }
        }
        PatternKind::Or(alternatives) => {
            // All alternatives must bind the same names; bind through the
            // first and verify the rest against it.
            let mut first_names = collect_bound_names(program, alternatives[0]);
            first_names.sort();
            for (i, alternative) in alternatives.iter().enumerate() {
                if i == 0 {
                    bind_pattern(r, program, unit, scope, *alternative, None, public);
                    continue;
                }
                let mut names = collect_bound_names(program, *alternative);
                names.sort();
                if names != first_names {
                    r.error(
                        "R0007",
                        "or-pattern alternatives bind different names",
                        program.pat(*alternative).span,
                    );
                }
                // Resolve constructor references without redefining names.
                resolve_pattern_refs(r, program, unit, scope, *alternative);
            }
        }
    }
}

/// Resolve constructor/type references in a pattern without binding names.
fn resolve_pattern_refs(
    r: &mut Resolver,
    program: &Program,
    unit: UnitId,
    scope: ScopeId,
    pat_id: PatId,
) {
    let pat = program.pat(pat_id);
    match &pat.kind {
        PatternKind::Constructor { name, args } => {
            match r.scopes.lookup(scope, name) {
                Some(symbol) => {
                    r.pat_symbols.insert((unit, pat_id), symbol);
                }
                None => {
                    r.error("R0001", format!("undefined symbol `{name}`"), pat.span);
                }
            }
            if let Some(args) = args {
                for arg in args {
                    resolve_pattern_refs(r, program, unit, scope, *arg);
                }
            }
        }
        PatternKind::Record { fields, .. } => {
            for (_, field_pat) in fields {
                resolve_pattern_refs(r, program, unit, scope, *field_pat);
            }
        }
        PatternKind::Tuple(elements) | PatternKind::Or(elements) => {
            for element in elements {
                resolve_pattern_refs(r, program, unit, scope, *element);
            }
        }
        PatternKind::Typed { pattern, ty } => {
            resolve_type(r, program, unit, scope, *ty);
            resolve_pattern_refs(r, program, unit, scope, *pattern);
        }
        _ => {}
    }
}

/// Names bound by a pattern, for or-pattern consistency checks.
fn collect_bound_names(program: &Program, pat_id: PatId) -> Vec<String> {
    fn walk(program: &Program, pat_id: PatId, out: &mut Vec<String>) {
        match &program.pat(pat_id).kind {
            PatternKind::Ident { name, .. } => out.push(name.clone()),
            PatternKind::Typed { pattern, .. } => walk(program, *pattern, out),
            PatternKind::Constructor {
                args: Some(args), ..
            } => {
                for arg in args {
                    walk(program, *arg, out);
                }
            }
            PatternKind::Record { fields, .. } => {
                for (_, field_pat) in fields {
                    walk(program, *field_pat, out);
                }
            }
            PatternKind::Tuple(elements) | PatternKind::Or(elements) => {
                for element in elements {
                    walk(program, *element, out);
                }
            }
            _ => {}
        }
    }
    let mut names = Vec::new();
    walk(program, pat_id, &mut names);
    names
}

// ── Types ──────────────────────────────────────────────────────────────

/// Resolve the names inside a type expression and record them in the
/// type-symbol side table.
pub(crate) fn resolve_type(
    r: &mut Resolver,
    program: &Program,
    unit: UnitId,
    scope: ScopeId,
    type_id: TypeId,
) {
    let ty = program.type_expr(type_id);
    match &ty.kind {
        TypeKind::Prim(_) | TypeKind::SelfType | TypeKind::Infer => {}
        TypeKind::Named(name) => match r.scopes.lookup(scope, name) {
            Some(symbol) => {
                r.type_symbols.insert((unit, type_id), symbol);
            }
            None => {
                r.error("R0001", format!("undefined type `{name}`"), ty.span);
            }
        },
        TypeKind::Generic { base, args } => {
            match r.scopes.lookup(scope, base) {
                Some(symbol) => {
                    r.type_symbols.insert((unit, type_id), symbol);
                }
                None => {
                    r.error("R0001", format!("undefined type `{base}`"), ty.span);
                }
            }
            for arg in args {
                resolve_type(r, program, unit, scope, *arg);
            }
        }
        TypeKind::Path { segments, args } => {
            for arg in args {
                resolve_type(r, program, unit, scope, *arg);
            }
            let Some(first) = r.scopes.lookup(scope, &segments[0]) else {
                r.error(
                    "R0001",
                    format!("undefined symbol `{}`", segments[0]),
                    ty.span,
                );
                return;
            };
            let mut current = r.symbols.resolve_alias(first);
            for segment in &segments[1..] {
                let SymbolKind::Module {
                    scope: module_scope,
                    ..
                } = &r.symbols.get(current).kind
                else {
                    r.error(
                        "R0001",
                        format!("`{}` is not a module", r.symbols.get(current).name),
                        ty.span,
                    );
                    return;
                };
                let module_scope = *module_scope;
                let Some(next) = r.scopes.lookup_local(module_scope, segment) else {
                    r.error(
                        "R0001",
                        format!("undefined symbol `{segment}` in module path"),
                        ty.span,
                    );
                    return;
                };
                if !r.symbols.get(next).public {
                    r.error(
                        "R0003",
                        format!("`{segment}` is private to its module"),
                        ty.span,
                    );
                    return;
                }
                current = r.symbols.resolve_alias(next);
            }
            r.type_symbols.insert((unit, type_id), current);
        }
        TypeKind::Function { params, ret, .. } => {
            for param in params {
                resolve_type(r, program, unit, scope, *param);
            }
            resolve_type(r, program, unit, scope, *ret);
        }
        TypeKind::Tuple(elements) => {
            for element in elements {
                resolve_type(r, program, unit, scope, *element);
            }
        }
        TypeKind::Array { elem, .. } => resolve_type(r, program, unit, scope, *elem),
        TypeKind::Io(inner) | TypeKind::OptionType(inner) => {
            resolve_type(r, program, unit, scope, *inner)
        }
        TypeKind::ResultType { ok, err } => {
            resolve_type(r, program, unit, scope, *ok);
            resolve_type(r, program, unit, scope, *err);
        }
    }
}
