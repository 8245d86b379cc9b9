//! The checking walk: assigns a resolved type to every expression and
//! verifies the typing, effect, exhaustiveness, and pattern rules.
//!
//! Error codes: E0001 type mismatch, E0002 non-boolean condition, E0003
//! return type mismatch, E0004 arity mismatch, E0005 effect violation,
//! E0006 unknown/unsatisfied trait, E0007 missing trait method, E0008
//! trait signature mismatch, E0009 field errors, E0010 unknown variant or
//! constructor, E0011 integer literal overflow, E0012 non-exhaustive
//! match, E0013 invalid type reference, E0014 unknown or ambiguous
//! method, E0015 not callable, E0016 invalid `?`, E0017 invalid cast,
//! E0018 invalid `??`; W0001 unreachable match arm.

use rustc_hash::FxHashMap;

use kira_common::diagnostic::Diagnostic;
use kira_common::span::Span;
use kira_common::token::NumSuffix;
use kira_parser::ast::{
    ArmBody, BinaryOp, DeclKind, ElseBranch, ExprId, ExprKind, FnDecl, MatchArm, PatId, PatLit,
    PatternKind, PrimType, Program, RangeBound, StmtId, StmtKind, UnaryOp,
};
use kira_resolver::symbol::{SymbolId, SymbolKind, UnitId};
use kira_resolver::Resolution;

use crate::builtins;
use crate::defs::{self, DefKind, FnSig, PayloadInfo, Registries, TypeDefInfo};
use crate::exhaustiveness::{self, ConstructorSig, Pat, TypeInfo};
use crate::ty::Ty;

pub(crate) struct Checker<'r> {
    res: &'r Resolution,
    regs: Registries,
    pub(crate) types: FxHashMap<(UnitId, ExprId), Ty>,
    locals: FxHashMap<SymbolId, Ty>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    unit: UnitId,
    ret: Ty,
    effect: bool,
    self_ty: Option<Ty>,
}

impl<'r> Checker<'r> {
    pub(crate) fn new(res: &'r Resolution) -> Checker<'r> {
        let mut diagnostics = Vec::new();
        let regs = defs::build_registries(res, &mut diagnostics);
        Checker {
            res,
            regs,
            types: FxHashMap::default(),
            locals: FxHashMap::default(),
            diagnostics,
            unit: UnitId::ROOT,
            ret: Ty::void(),
            effect: true,
            self_ty: None,
        }
    }

    fn program(&self) -> &'r Program {
        &self.res.unit(self.unit).program
    }

    fn error(&mut self, code: &str, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }

    fn warning(&mut self, code: &str, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(Diagnostic::warning(code, message, span));
    }

    fn lower(&mut self, ty: kira_parser::ast::TypeId) -> Ty {
        let self_ty = self.self_ty.clone();
        let mut diagnostics = std::mem::take(&mut self.diagnostics);
        let lowered = defs::lower_type(self.res, self.unit, ty, self_ty.as_ref(), &mut diagnostics);
        self.diagnostics = diagnostics;
        lowered
    }

    fn normalize(&self, ty: &Ty) -> Ty {
        defs::normalize(&self.regs.defs, ty)
    }

    // ── Entry ──────────────────────────────────────────────────────────

    pub(crate) fn check_all(&mut self) {
        for unit_index in 0..self.res.units.len() {
            self.unit = UnitId(unit_index as u32);
            let program = self.program();
            for decl_id in &program.decls {
                let decl = program.decl(*decl_id);
                match &decl.kind {
                    DeclKind::Function(f) => self.check_fn(f, None),
                    DeclKind::Impl {
                        target, methods, ..
                    } => {
                        let target_ty = self.lower(*target);
                        for method in methods {
                            self.check_fn(method, Some(target_ty.clone()));
                        }
                    }
                    DeclKind::Trait { methods, .. } => {
                        for method in methods {
                            if method.body.is_some() {
                                self.check_fn(method, Some(Ty::Param("Self".into())));
                            }
                        }
                    }
                    DeclKind::Const {
                        name, ty, value, ..
                    } => {
                        let expected = self.lower(*ty);
                        let found = self.check_expr(*value, Some(&expected));
                        self.require_compatible(&expected, &found, self.expr_span(*value));
                        let scope = self.res.unit(self.unit).scope;
                        if let Some(symbol) = self.res.scopes.lookup_local(scope, name) {
                            self.locals.insert(symbol, expected);
                        }
                    }
                    DeclKind::Let {
                        pattern, ty, init, ..
                    } => {
                        let expected = self.lower(*ty);
                        let found = self.check_expr(*init, Some(&expected));
                        self.require_compatible(&expected, &found, self.expr_span(*init));
                        let mut bindings = Vec::new();
                        self.check_pattern(*pattern, &expected, &mut bindings);
                    }
                    DeclKind::Test { body, .. } => {
                        // Tests run in an effectful context with no result.
                        let saved = self.enter_fn(Ty::void(), true, None);
                        self.check_stmts(body);
                        self.leave_fn(saved);
                    }
                    DeclKind::TypeDef { .. } => {}
                }
            }
        }
    }

    fn enter_fn(&mut self, ret: Ty, effect: bool, self_ty: Option<Ty>) -> (Ty, bool, Option<Ty>) {
        let saved = (
            std::mem::replace(&mut self.ret, ret),
            std::mem::replace(&mut self.effect, effect),
            std::mem::replace(&mut self.self_ty, self_ty),
        );
        saved
    }

    fn leave_fn(&mut self, saved: (Ty, bool, Option<Ty>)) {
        self.ret = saved.0;
        self.effect = saved.1;
        self.self_ty = saved.2;
    }

    fn check_fn(&mut self, f: &FnDecl, self_ty: Option<Ty>) {
        self.self_ty = self_ty.clone();
        let ret = self.lower(f.ret);
        // Parameter symbols carry their declared types; nothing to seed.
        let saved = self.enter_fn(ret, f.effect, self_ty);
        if let Some(body) = &f.body {
            self.check_stmts(body);
        }
        self.leave_fn(saved);
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn check_stmts(&mut self, stmts: &[StmtId]) {
        for stmt in stmts {
            self.check_stmt(*stmt);
        }
    }

    fn check_stmt(&mut self, stmt_id: StmtId) {
        let stmt = self.program().stmt(stmt_id);
        match &stmt.kind {
            StmtKind::Let {
                pattern, ty, init, ..
            } => {
                let expected = self.lower(*ty);
                let found = self.check_expr(*init, Some(&expected));
                self.require_compatible(&expected, &found, self.expr_span(*init));
                let mut bindings = Vec::new();
                self.check_pattern(*pattern, &expected, &mut bindings);
            }
            StmtKind::Var { ty, init, .. } => {
                let expected = self.lower(*ty);
                if let Some(init) = init {
                    let found = self.check_expr(*init, Some(&expected));
                    self.require_compatible(&expected, &found, self.expr_span(*init));
                }
            }
            StmtKind::Assign { target, value } => {
                let target_ty = self.check_expr(*target, None);
                let value_ty = self.check_expr(*value, Some(&target_ty));
                self.require_compatible(&target_ty, &value_ty, self.expr_span(*value));
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.check_condition(*cond);
                self.check_stmts(then_branch);
                match else_branch {
                    None => {}
                    Some(ElseBranch::Block(stmts)) => self.check_stmts(stmts),
                    Some(ElseBranch::If(nested)) => self.check_stmt(*nested),
                }
            }
            StmtKind::For {
                pattern,
                iterable,
                body,
                ..
            } => {
                let iterable_ty = self.check_expr(*iterable, None);
                let elem = self.element_type(&iterable_ty, self.expr_span(*iterable));
                let mut bindings = Vec::new();
                self.check_pattern(*pattern, &elem, &mut bindings);
                self.check_stmts(body);
            }
            StmtKind::While { cond, body, .. } => {
                self.check_condition(*cond);
                self.check_stmts(body);
            }
            StmtKind::Loop { body, .. } => self.check_stmts(body),
            StmtKind::Match { subject, arms } => {
                self.check_match(*subject, arms, stmt.span);
            }
            StmtKind::Return { value } => {
                let expected = self.ret.clone();
                match value {
                    Some(value) => {
                        let found = self.check_expr(*value, Some(&expected));
                        if !found.compatible(&expected) {
                            let span = self.expr_span(*value);
                            self.error(
                                "E0003",
                                format!("return type mismatch: expected `{expected}`, found `{found}`"),
                                span,
                            );
                        }
                    }
                    None => {
                        let void_ok = matches!(
                            self.normalize(&expected),
                            Ty::Prim(PrimType::Void) | Ty::Io(_) | Ty::Unknown | Ty::Error
                        );
                        if !void_ok {
                            self.error(
                                "E0003",
                                format!("return type mismatch: expected `{expected}`, found `void`"),
                                stmt.span,
                            );
                        }
                    }
                }
            }
            StmtKind::Break { value, .. } => {
                if let Some(value) = value {
                    self.check_expr(*value, None);
                }
            }
            StmtKind::Expr(expr) => {
                self.check_expr(*expr, None);
            }
            StmtKind::Block(stmts) => self.check_stmts(stmts),
        }
    }

    fn check_condition(&mut self, cond: ExprId) {
        let ty = self.check_expr(cond, Some(&Ty::bool()));
        if !ty.compatible(&Ty::bool()) {
            let span = self.expr_span(cond);
            self.error("E0002", format!("condition must be `bool`, found `{ty}`"), span);
        }
    }

    fn require_compatible(&mut self, expected: &Ty, found: &Ty, span: Span) {
        if !found.compatible(expected) {
            self.error(
                "E0001",
                format!("type mismatch: expected `{expected}`, found `{found}`"),
                span,
            );
        }
    }

    fn expr_span(&self, expr: ExprId) -> Span {
        self.program().expr(expr).span
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn record(&mut self, expr: ExprId, ty: Ty) -> Ty {
        self.types.insert((self.unit, expr), ty.clone());
        ty
    }

    fn check_expr(&mut self, expr_id: ExprId, expected: Option<&Ty>) -> Ty {
        let expr = self.program().expr(expr_id);
        let span = expr.span;
        let ty = match &expr.kind {
            ExprKind::Int { value, suffix } => self.int_literal_ty(*value, *suffix, expected, span),
            ExprKind::Float { suffix, .. } => match suffix {
                Some(NumSuffix::F32) => Ty::Prim(PrimType::F32),
                Some(NumSuffix::F64) | None => match expected.map(|e| self.normalize(e)) {
                    Some(Ty::Prim(PrimType::F32)) if suffix.is_none() => Ty::Prim(PrimType::F32),
                    _ => Ty::f64(),
                },
                Some(_) => {
                    self.error("E0011", "float literal with integer suffix", span);
                    Ty::Error
                }
            },
            ExprKind::Str(_) => Ty::string(),
            ExprKind::Char(_) => Ty::Prim(PrimType::Char),
            ExprKind::Bool(_) => Ty::bool(),
            ExprKind::Ident { generic_args, .. } => {
                let generic_args = generic_args.clone();
                self.ident_ty(expr_id, &generic_args, expected, span)
            }
            ExprKind::SelfRef => match &self.self_ty {
                Some(self_ty) => self_ty.clone(),
                None => Ty::Error,
            },
            ExprKind::Binary { op, lhs, rhs } => self.binary_ty(*op, *lhs, *rhs, expected, span),
            ExprKind::Unary { op, operand } => {
                let operand_ty = self.check_expr(*operand, expected);
                match op {
                    UnaryOp::Neg => {
                        if operand_ty.is_numeric() || operand_ty.is_error() || operand_ty == Ty::Unknown {
                            operand_ty
                        } else {
                            self.error(
                                "E0001",
                                format!("negation requires a numeric operand, found `{operand_ty}`"),
                                span,
                            );
                            Ty::Error
                        }
                    }
                    UnaryOp::Not => {
                        if operand_ty.compatible(&Ty::bool()) {
                            Ty::bool()
                        } else {
                            self.error(
                                "E0001",
                                format!("`not` requires a `bool` operand, found `{operand_ty}`"),
                                span,
                            );
                            Ty::Error
                        }
                    }
                }
            }
            ExprKind::Field { base, name } => {
                let name = name.clone();
                self.field_ty(expr_id, *base, &name, span)
            }
            ExprKind::Index { base, index } => {
                let base_ty = self.check_expr(*base, None);
                let base_ty = self.normalize(&base_ty);
                let index_ty = self.check_expr(*index, Some(&Ty::i32()));
                if !index_ty.is_integer() && index_ty != Ty::Unknown && !index_ty.is_error() {
                    let index_span = self.expr_span(*index);
                    self.error(
                        "E0001",
                        format!("index must be an integer, found `{index_ty}`"),
                        index_span,
                    );
                }
                match base_ty {
                    Ty::Array { elem, .. } => *elem,
                    Ty::Prim(PrimType::String) => Ty::Prim(PrimType::Char),
                    Ty::Unknown => Ty::Unknown,
                    Ty::Error => Ty::Error,
                    other => {
                        self.error(
                            "E0001",
                            format!("`{other}` cannot be indexed"),
                            span,
                        );
                        Ty::Error
                    }
                }
            }
            ExprKind::TupleField { base, index } => {
                let base_ty = self.check_expr(*base, None);
                let base_ty = self.normalize(&base_ty);
                match base_ty {
                    Ty::Tuple(elements) => {
                        if (*index as usize) < elements.len() {
                            elements[*index as usize].clone()
                        } else {
                            self.error(
                                "E0001",
                                format!(
                                    "tuple has {} elements, no field `.{index}`",
                                    elements.len()
                                ),
                                span,
                            );
                            Ty::Error
                        }
                    }
                    Ty::Unknown => Ty::Unknown,
                    Ty::Error => Ty::Error,
                    other => {
                        self.error(
                            "E0001",
                            format!("`.{index}` access requires a tuple, found `{other}`"),
                            span,
                        );
                        Ty::Error
                    }
                }
            }
            ExprKind::Call {
                callee,
                generic_args,
                args,
            } => {
                let generic_args = generic_args.clone();
                let args = args.clone();
                self.call_ty(*callee, &generic_args, &args, expected, span)
            }
            ExprKind::MethodCall {
                receiver,
                method,
                args,
                ..
            } => {
                let method = method.clone();
                let args = args.clone();
                self.method_call_ty(*receiver, &method, &args, span)
            }
            ExprKind::Closure {
                params,
                ret,
                effect,
                body,
            } => {
                let param_tys: Vec<Ty> = params.iter().map(|p| p.ty).collect::<Vec<_>>()
                    .into_iter()
                    .map(|t| self.lower(t))
                    .collect();
                let ret_ty = self.lower(*ret);
                let body = body.clone();
                let saved = self.enter_fn(ret_ty.clone(), *effect, self.self_ty.clone());
                self.check_stmts(&body);
                self.leave_fn(saved);
                Ty::function(param_tys, ret_ty, *effect)
            }
            ExprKind::Match { subject, arms } => {
                let arms = arms.clone();
                self.check_match(*subject, &arms, span)
            }
            ExprKind::Tuple(elements) => {
                let elements = elements.clone();
                let expected_elems = match expected.map(|e| self.normalize(e)) {
                    Some(Ty::Tuple(tys)) if tys.len() == elements.len() => Some(tys),
                    _ => None,
                };
                let tys = elements
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        let hint = expected_elems.as_ref().map(|t| t[i].clone());
                        self.check_expr(*e, hint.as_ref())
                    })
                    .collect();
                Ty::Tuple(tys)
            }
            ExprKind::Array(elements) => {
                let elements = elements.clone();
                let expected_elem = match expected.map(|e| self.normalize(e)) {
                    Some(Ty::Array { elem, .. }) => Some(*elem),
                    _ => None,
                };
                let mut elem_ty = expected_elem.unwrap_or(Ty::Unknown);
                for element in &elements {
                    let found = self.check_expr(*element, Some(&elem_ty.clone()));
                    if elem_ty == Ty::Unknown {
                        elem_ty = found;
                    } else if !found.compatible(&elem_ty) {
                        let element_span = self.expr_span(*element);
                        self.error(
                            "E0001",
                            format!(
                                "array elements must share one type: expected `{elem_ty}`, found `{found}`"
                            ),
                            element_span,
                        );
                    }
                }
                Ty::Array {
                    elem: Box::new(elem_ty),
                    size: Some(elements.len() as u64),
                }
            }
            ExprKind::Record { ty, fields } => {
                let ty = *ty;
                let fields = fields.clone();
                self.record_literal_ty(ty, &fields, span)
            }
            ExprKind::Variant { name, args } => {
                let name = name.clone();
                let args = args.clone();
                self.variant_ty(expr_id, &name, args.as_deref(), expected, span)
            }
            ExprKind::Cast { expr, ty } => {
                let source = self.check_expr(*expr, None);
                let target = self.lower(*ty);
                let source_n = self.normalize(&source);
                let target_n = self.normalize(&target);
                let ok = source_n.is_numeric() && target_n.is_numeric()
                    || source_n.compatible(&target_n);
                if !ok {
                    self.error(
                        "E0017",
                        format!("cannot cast `{source}` to `{target}`"),
                        span,
                    );
                }
                target
            }
            ExprKind::Range {
                start,
                end,
                ..
            } => {
                let start = *start;
                let end = *end;
                let mut elem = Ty::i32();
                if let Some(start) = start {
                    elem = self.check_expr(start, None);
                }
                if let Some(end) = end {
                    let hint = elem.clone();
                    let end_ty = self.check_expr(end, Some(&hint));
                    if start.is_some() && !end_ty.compatible(&elem) {
                        let end_span = self.expr_span(end);
                        self.error(
                            "E0001",
                            format!("range bounds disagree: `{elem}` and `{end_ty}`"),
                            end_span,
                        );
                    } else if start.is_none() {
                        elem = end_ty;
                    }
                }
                let elem_ok = elem.is_integer()
                    || matches!(elem, Ty::Prim(PrimType::Char) | Ty::Unknown | Ty::Error);
                if !elem_ok {
                    self.error(
                        "E0001",
                        format!("range bounds must be integers or characters, found `{elem}`"),
                        span,
                    );
                }
                Ty::Range(Box::new(elem))
            }
            ExprKind::Group(inner) => self.check_expr(*inner, expected),
            ExprKind::Interpolated(parts) => {
                let parts = parts.clone();
                for part in &parts {
                    if let kira_parser::ast::InterpPart::Expr(expr) = part {
                        self.check_expr(*expr, None);
                    }
                }
                Ty::string()
            }
            ExprKind::Try(inner) => {
                let inner_ty = self.check_expr(*inner, None);
                let inner_ty = self.normalize(&inner_ty);
                self.try_ty(inner_ty, span)
            }
            ExprKind::Coalesce { value, default } => {
                let value_ty = self.check_expr(*value, None);
                let value_ty = self.normalize(&value_ty);
                match value_ty {
                    Ty::Option(inner) => {
                        let default_ty = self.check_expr(*default, Some(&inner));
                        self.require_compatible(&inner, &default_ty, self.expr_span(*default));
                        *inner
                    }
                    Ty::Result { ok, .. } => {
                        let default_ty = self.check_expr(*default, Some(&ok));
                        self.require_compatible(&ok, &default_ty, self.expr_span(*default));
                        *ok
                    }
                    Ty::Unknown | Ty::Error => {
                        self.check_expr(*default, None);
                        value_ty
                    }
                    other => {
                        self.check_expr(*default, None);
                        self.error(
                            "E0018",
                            format!("`??` requires an `Option` or `Result`, found `{other}`"),
                            span,
                        );
                        Ty::Error
                    }
                }
            }
        };
        self.record(expr_id, ty)
    }

    fn int_literal_ty(
        &mut self,
        value: i128,
        suffix: Option<NumSuffix>,
        expected: Option<&Ty>,
        span: Span,
    ) -> Ty {
        let prim = match suffix {
            Some(NumSuffix::I8) => PrimType::I8,
            Some(NumSuffix::I16) => PrimType::I16,
            Some(NumSuffix::I32) => PrimType::I32,
            Some(NumSuffix::I64) => PrimType::I64,
            Some(NumSuffix::I128) => PrimType::I128,
            Some(NumSuffix::U8) => PrimType::U8,
            Some(NumSuffix::U16) => PrimType::U16,
            Some(NumSuffix::U32) => PrimType::U32,
            Some(NumSuffix::U64) => PrimType::U64,
            Some(NumSuffix::U128) => PrimType::U128,
            Some(NumSuffix::F32) | Some(NumSuffix::F64) => {
                return Ty::Prim(if suffix == Some(NumSuffix::F32) {
                    PrimType::F32
                } else {
                    PrimType::F64
                })
            }
            None => match expected.map(|e| self.normalize(e)) {
                Some(Ty::Prim(p)) if p.is_integer() => p,
                _ => PrimType::I32,
            },
        };
        if !int_fits(value, prim) {
            self.error(
                "E0011",
                format!("integer literal `{value}` overflows `{}`", prim.as_str()),
                span,
            );
            return Ty::Error;
        }
        Ty::Prim(prim)
    }

    fn binary_ty(
        &mut self,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        expected: Option<&Ty>,
        span: Span,
    ) -> Ty {
        match op {
            BinaryOp::And | BinaryOp::Or => {
                self.check_condition(lhs);
                self.check_condition(rhs);
                Ty::bool()
            }
            BinaryOp::Eq | BinaryOp::NotEq => {
                let lhs_ty = self.check_expr(lhs, None);
                let rhs_ty = self.check_expr(rhs, Some(&lhs_ty));
                if !rhs_ty.compatible(&lhs_ty) {
                    self.error(
                        "E0001",
                        format!("cannot compare `{lhs_ty}` with `{rhs_ty}`"),
                        span,
                    );
                }
                Ty::bool()
            }
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                let lhs_ty = self.check_expr(lhs, None);
                let lhs_ty = self.normalize(&lhs_ty);
                let rhs_ty = self.check_expr(rhs, Some(&lhs_ty));
                let comparable = lhs_ty.is_numeric()
                    || matches!(lhs_ty, Ty::Prim(PrimType::Char) | Ty::Prim(PrimType::String))
                    || lhs_ty == Ty::Unknown
                    || lhs_ty.is_error();
                if !comparable || !rhs_ty.compatible(&lhs_ty) {
                    self.error(
                        "E0001",
                        format!("cannot order `{lhs_ty}` against `{rhs_ty}`"),
                        span,
                    );
                }
                Ty::bool()
            }
            BinaryOp::Is => {
                self.check_expr(lhs, None);
                // The right-hand side names a variant; it is not an
                // ordinary value.
                let program = self.program();
                let rhs_expr = program.expr(rhs);
                let named_variant = match &rhs_expr.kind {
                    ExprKind::Ident { .. } | ExprKind::Variant { .. } => self
                        .res
                        .expr_symbols
                        .get(&(self.unit, rhs))
                        .map(|symbol| {
                            let resolved = self.res.symbols.resolve_alias(*symbol);
                            matches!(
                                self.res.symbol(resolved).kind,
                                SymbolKind::Variant { .. } | SymbolKind::Builtin { .. }
                            )
                        })
                        .unwrap_or(false),
                    _ => false,
                };
                let rhs_span = rhs_expr.span;
                self.record(rhs, Ty::Unknown);
                if !named_variant {
                    self.error("E0010", "`is` requires a variant name on the right", rhs_span);
                }
                Ty::bool()
            }
            BinaryOp::In => {
                let elem_ty = self.check_expr(lhs, None);
                let collection_ty = self.check_expr(rhs, None);
                let collection_ty = self.normalize(&collection_ty);
                let ok = match &collection_ty {
                    Ty::Array { elem, .. } => elem_ty.compatible(elem),
                    Ty::List(elem) => elem_ty.compatible(elem),
                    Ty::Range(elem) => elem_ty.compatible(elem),
                    Ty::Prim(PrimType::String) => {
                        elem_ty.compatible(&Ty::string())
                            || elem_ty.compatible(&Ty::Prim(PrimType::Char))
                    }
                    Ty::Unknown | Ty::Error => true,
                    _ => false,
                };
                if !ok {
                    self.error(
                        "E0001",
                        format!("`in` cannot search `{collection_ty}` for `{elem_ty}`"),
                        span,
                    );
                }
                Ty::bool()
            }
            BinaryOp::Add => {
                // The expected type flows into the operands so unsuffixed
                // literals adopt the declared width.
                let lhs_ty = self.check_expr(lhs, expected);
                let lhs_ty = self.normalize(&lhs_ty);
                let rhs_ty = self.check_expr(rhs, Some(&lhs_ty));
                if lhs_ty.compatible(&Ty::string()) && rhs_ty.compatible(&Ty::string()) {
                    return Ty::string();
                }
                self.numeric_binary(lhs_ty, rhs_ty, "+", span)
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
                let lhs_ty = self.check_expr(lhs, expected);
                let lhs_ty = self.normalize(&lhs_ty);
                let rhs_ty = self.check_expr(rhs, Some(&lhs_ty));
                let op_str = match op {
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    _ => "%",
                };
                self.numeric_binary(lhs_ty, rhs_ty, op_str, span)
            }
        }
    }

    fn numeric_binary(&mut self, lhs: Ty, rhs: Ty, op: &str, span: Span) -> Ty {
        if lhs.is_error() || rhs.is_error() {
            return Ty::Error;
        }
        if lhs == Ty::Unknown {
            return rhs;
        }
        if rhs == Ty::Unknown {
            return lhs;
        }
        if lhs.is_numeric() && rhs == lhs {
            return lhs;
        }
        self.error(
            "E0001",
            format!("`{op}` requires operands of one numeric type, found `{lhs}` and `{rhs}`"),
            span,
        );
        Ty::Error
    }

    // ── Identifier and call typing ─────────────────────────────────────

    fn symbol_of(&self, expr: ExprId) -> Option<SymbolId> {
        self.res
            .expr_symbols
            .get(&(self.unit, expr))
            .map(|s| self.res.symbols.resolve_alias(*s))
    }

    /// Type of a variable symbol: checker-seeded, or its declared type.
    fn var_ty(&mut self, symbol: SymbolId) -> Ty {
        if let Some(ty) = self.locals.get(&symbol) {
            return ty.clone();
        }
        let sym = self.res.symbol(symbol);
        if let SymbolKind::Variable { ty: Some((unit, ty)), .. } = &sym.kind {
            let (unit, ty) = (*unit, *ty);
            let self_ty = self.self_ty.clone();
            let mut diagnostics = std::mem::take(&mut self.diagnostics);
            let lowered = defs::lower_type(self.res, unit, ty, self_ty.as_ref(), &mut diagnostics);
            self.diagnostics = diagnostics;
            self.locals.insert(symbol, lowered.clone());
            return lowered;
        }
        if sym.name == "self" {
            return self.self_ty.clone().unwrap_or(Ty::Unknown);
        }
        Ty::Unknown
    }

    fn fn_sig_of(&mut self, symbol: SymbolId) -> Option<FnSig> {
        let SymbolKind::Function { decl, .. } = &self.res.symbol(symbol).kind else {
            return None;
        };
        let decl = *decl;
        let program = &self.res.unit(decl.unit).program;
        let DeclKind::Function(f) = &program.decl(decl.decl).kind else {
            return None;
        };
        let mut diagnostics = std::mem::take(&mut self.diagnostics);
        let sig = defs::lower_fn_sig(self.res, decl.unit, f, None, &mut diagnostics);
        self.diagnostics = diagnostics;
        Some(sig)
    }

    fn ident_ty(
        &mut self,
        expr_id: ExprId,
        generic_args: &[kira_parser::ast::TypeId],
        expected: Option<&Ty>,
        span: Span,
    ) -> Ty {
        let Some(symbol) = self.symbol_of(expr_id) else {
            // The resolver reported the undefined name already.
            return Ty::Error;
        };
        match &self.res.symbol(symbol).kind {
            SymbolKind::Variable { .. } => self.var_ty(symbol),
            SymbolKind::Function { effect, .. } => {
                let effect = *effect;
                if effect && !self.effect {
                    self.error(
                        "E0005",
                        "cannot reference effect function from pure function",
                        span,
                    );
                }
                match self.fn_sig_of(symbol) {
                    Some(sig) => {
                        let mut ty = Ty::function(sig.params.clone(), sig.ret.clone(), sig.effect);
                        if !generic_args.is_empty() {
                            let args: Vec<Ty> =
                                generic_args.iter().map(|a| self.lower(*a)).collect();
                            let mut bindings = FxHashMap::default();
                            for (param, arg) in sig.generics.iter().zip(args) {
                                bindings.insert(param.clone(), arg);
                            }
                            ty = ty.substitute(&bindings);
                        }
                        ty
                    }
                    None => Ty::Unknown,
                }
            }
            SymbolKind::Builtin { effect } => {
                let name = self.res.symbol(symbol).name.clone();
                if *effect && !self.effect {
                    self.error(
                        "E0005",
                        "cannot reference effect function from pure function",
                        span,
                    );
                }
                match name.as_str() {
                    "None" => match expected.map(|e| self.normalize(e)) {
                        Some(Ty::Option(inner)) => Ty::Option(inner),
                        _ => Ty::option(Ty::Unknown),
                    },
                    "Nil" => match expected.map(|e| self.normalize(e)) {
                        Some(Ty::List(inner)) => Ty::List(inner),
                        _ => Ty::list(Ty::Unknown),
                    },
                    _ => Ty::Unknown,
                }
            }
            SymbolKind::Variant { owner, decl, index } => {
                let owner = *owner;
                let decl = *decl;
                let index = *index;
                let info = self.regs.defs.get(&owner).cloned();
                let _ = (decl, index);
                match info {
                    Some(info) => self.unit_variant_ty(owner, &info, index, expected, span),
                    None => Ty::Error,
                }
            }
            SymbolKind::Module { .. } => Ty::Module,
            SymbolKind::TypeDef { .. } | SymbolKind::TypeParam { .. } | SymbolKind::Trait { .. } => {
                let name = self.res.symbol(symbol).name.clone();
                self.error("E0013", format!("`{name}` is a type, not a value"), span);
                Ty::Error
            }
            SymbolKind::ImportAlias { .. } => Ty::Unknown,
        }
    }

    fn unit_variant_ty(
        &mut self,
        owner: SymbolId,
        info: &TypeDefInfo,
        index: usize,
        expected: Option<&Ty>,
        span: Span,
    ) -> Ty {
        let DefKind::Sum(variants) = &info.kind else {
            return Ty::Error;
        };
        let Some(variant) = variants.get(index) else {
            return Ty::Error;
        };
        if variant.payload.arity() != 0 {
            self.error(
                "E0010",
                format!(
                    "variant `{}` takes {} arguments",
                    variant.name,
                    variant.payload.arity()
                ),
                span,
            );
        }
        let args = match expected.map(|e| self.normalize(e)) {
            Some(Ty::Named {
                symbol,
                args,
                ..
            }) if symbol == owner && args.len() == info.generics.len() => args,
            _ => vec![Ty::Unknown; info.generics.len()],
        };
        Ty::Named {
            symbol: owner,
            name: info.name.clone(),
            args,
        }
    }

    fn call_ty(
        &mut self,
        callee: ExprId,
        generic_args: &[kira_parser::ast::TypeId],
        args: &[ExprId],
        expected: Option<&Ty>,
        span: Span,
    ) -> Ty {
        // Built-in functions are typed per call site.
        if let ExprKind::Ident { name, .. } = &self.program().expr(callee).kind {
            let name = name.clone();
            if let Some(symbol) = self.symbol_of(callee) {
                if matches!(self.res.symbol(symbol).kind, SymbolKind::Builtin { .. }) {
                    self.record(callee, Ty::Unknown);
                    return self.builtin_call_ty(&name, args, expected, span);
                }
            }
        }

        let callee_ty = self.check_expr(callee, None);
        let callee_ty = self.normalize(&callee_ty);
        match callee_ty {
            Ty::Fn {
                params,
                ret,
                effect,
            } => {
                if effect && !self.effect {
                    self.error(
                        "E0005",
                        "cannot call effect function from pure function",
                        span,
                    );
                }
                if params.len() != args.len() {
                    self.error(
                        "E0004",
                        format!(
                            "call expects {} arguments, found {}",
                            params.len(),
                            args.len()
                        ),
                        span,
                    );
                    for arg in args {
                        self.check_expr(*arg, None);
                    }
                    return Ty::Error;
                }

                // Call-site instantiation of generic parameters: explicit
                // arguments first, then first-order matching of argument
                // types against parameter types.
                let mut bindings: FxHashMap<String, Ty> = FxHashMap::default();
                let sig_info = self
                    .symbol_of(callee)
                    .and_then(|symbol| self.fn_sig_of(symbol));
                if let (Some(sig), false) = (&sig_info, generic_args.is_empty()) {
                    let lowered: Vec<Ty> =
                        generic_args.iter().map(|a| self.lower(*a)).collect();
                    for (param, arg) in sig.generics.iter().zip(lowered) {
                        bindings.insert(param.clone(), arg);
                    }
                }

                let mut arg_tys = Vec::with_capacity(args.len());
                for (arg, param) in args.iter().zip(&params) {
                    let hint = param.substitute(&bindings);
                    let arg_ty = self.check_expr(*arg, Some(&hint));
                    infer_bindings(param, &arg_ty, &mut bindings);
                    arg_tys.push(arg_ty);
                }
                for (arg, param) in args.iter().zip(&params) {
                    let expected_param = param.substitute(&bindings);
                    let found = self.types[&(self.unit, *arg)].clone();
                    if !found.compatible(&expected_param) {
                        let arg_span = self.expr_span(*arg);
                        self.error(
                            "E0001",
                            format!(
                                "argument type mismatch: expected `{expected_param}`, found `{found}`"
                            ),
                            arg_span,
                        );
                    }
                }

                if let Some(sig) = &sig_info {
                    self.check_bounds(sig, &bindings, span);
                }
                ret.substitute(&bindings)
            }
            Ty::Unknown | Ty::Error => {
                for arg in args {
                    self.check_expr(*arg, None);
                }
                callee_ty
            }
            other => {
                for arg in args {
                    self.check_expr(*arg, None);
                }
                self.error("E0015", format!("`{other}` is not callable"), span);
                Ty::Error
            }
        }
    }

    /// Verify that instantiated generic parameters satisfy their bounds.
    fn check_bounds(&mut self, sig: &FnSig, bindings: &FxHashMap<String, Ty>, span: Span) {
        for (param, bounds) in &sig.bounds {
            let Some(ty) = bindings.get(param) else {
                continue;
            };
            if matches!(ty, Ty::Unknown | Ty::Error | Ty::Param(_)) {
                continue;
            }
            for bound in bounds {
                let satisfied = self.regs.impls.iter().any(|imp| {
                    imp.trait_name.as_deref() == Some(bound.as_str())
                        && self.normalize(&imp.target).compatible(ty)
                });
                if !satisfied {
                    self.error(
                        "E0006",
                        format!("`{ty}` does not implement trait `{bound}`"),
                        span,
                    );
                }
            }
        }
    }

    fn builtin_call_ty(
        &mut self,
        name: &str,
        args: &[ExprId],
        expected: Option<&Ty>,
        span: Span,
    ) -> Ty {
        if builtins::builtin_effect(name) && !self.effect {
            self.error(
                "E0005",
                "cannot call effect function from pure function",
                span,
            );
        }

        let arg_tys: Vec<Ty> = args.iter().map(|a| self.check_expr(*a, None)).collect();
        let arity = |this: &mut Self, n: usize| {
            if arg_tys.len() != n {
                this.error(
                    "E0004",
                    format!("`{name}` expects {n} arguments, found {}", arg_tys.len()),
                    span,
                );
                return false;
            }
            true
        };

        match name {
            "print" | "println" => {
                arity(self, 1);
                Ty::void()
            }
            "type_of" | "to_string" => {
                arity(self, 1);
                Ty::string()
            }
            "to_int" => {
                arity(self, 1);
                Ty::Prim(PrimType::I64)
            }
            "to_float" => {
                arity(self, 1);
                Ty::f64()
            }
            "abs" => {
                if arity(self, 1) && !arg_tys[0].is_numeric() && arg_tys[0] != Ty::Unknown {
                    self.error(
                        "E0001",
                        format!("`abs` requires a numeric argument, found `{}`", arg_tys[0]),
                        span,
                    );
                }
                arg_tys.first().cloned().unwrap_or(Ty::Error)
            }
            "min" | "max" => {
                if arity(self, 2) && !arg_tys[0].compatible(&arg_tys[1]) {
                    self.error(
                        "E0001",
                        format!(
                            "`{name}` requires both arguments of one type, found `{}` and `{}`",
                            arg_tys[0], arg_tys[1]
                        ),
                        span,
                    );
                }
                arg_tys.first().cloned().unwrap_or(Ty::Error)
            }
            "len" => {
                arity(self, 1);
                Ty::i32()
            }
            "push" => {
                if arity(self, 2) {
                    match self.normalize(&arg_tys[0]) {
                        Ty::Array { .. } | Ty::List(_) | Ty::Unknown | Ty::Error => {}
                        other => self.error(
                            "E0001",
                            format!("`push` requires an array or list, found `{other}`"),
                            span,
                        ),
                    }
                }
                arg_tys.first().cloned().unwrap_or(Ty::Error)
            }
            "pop" | "reverse" | "tail" => arg_tys.first().cloned().unwrap_or(Ty::Error),
            "head" => match arg_tys.first().map(|t| self.normalize(t)) {
                Some(Ty::Array { elem, .. }) => Ty::Option(elem),
                Some(Ty::List(elem)) => Ty::Option(elem),
                Some(Ty::Prim(PrimType::String)) => Ty::option(Ty::Prim(PrimType::Char)),
                _ => Ty::option(Ty::Unknown),
            },
            "empty" => {
                arity(self, 1);
                Ty::bool()
            }
            "split" => {
                arity(self, 2);
                Ty::Array {
                    elem: Box::new(Ty::string()),
                    size: None,
                }
            }
            "join" => {
                arity(self, 2);
                Ty::string()
            }
            "trim" => {
                arity(self, 1);
                Ty::string()
            }
            "contains" | "starts_with" | "ends_with" => {
                arity(self, 2);
                Ty::bool()
            }
            "assert" => {
                if arity(self, 1) && !arg_tys[0].compatible(&Ty::bool()) {
                    self.error(
                        "E0001",
                        format!("`assert` requires a `bool`, found `{}`", arg_tys[0]),
                        span,
                    );
                }
                Ty::void()
            }
            "assert_eq" => {
                if arity(self, 2) && !arg_tys[0].compatible(&arg_tys[1]) {
                    self.error(
                        "E0001",
                        format!(
                            "`assert_eq` arguments differ: `{}` and `{}`",
                            arg_tys[0], arg_tys[1]
                        ),
                        span,
                    );
                }
                Ty::void()
            }
            "Some" => {
                arity(self, 1);
                Ty::option(arg_tys.first().cloned().unwrap_or(Ty::Unknown))
            }
            "Ok" => {
                arity(self, 1);
                let err = match expected.map(|e| self.normalize(e)) {
                    Some(Ty::Result { err, .. }) => *err,
                    _ => Ty::Unknown,
                };
                Ty::result(arg_tys.first().cloned().unwrap_or(Ty::Unknown), err)
            }
            "Err" => {
                arity(self, 1);
                let ok = match expected.map(|e| self.normalize(e)) {
                    Some(Ty::Result { ok, .. }) => *ok,
                    _ => Ty::Unknown,
                };
                Ty::result(ok, arg_tys.first().cloned().unwrap_or(Ty::Unknown))
            }
            "Cons" => {
                if arity(self, 2) {
                    let elem = arg_tys[0].clone();
                    let tail = self.normalize(&arg_tys[1]);
                    match tail {
                        Ty::List(tail_elem) => {
                            if *tail_elem != Ty::Unknown
                                && !tail_elem.compatible(&elem)
                            {
                                self.error(
                                    "E0001",
                                    format!(
                                        "`Cons` tail holds `{tail_elem}`, head is `{elem}`"
                                    ),
                                    span,
                                );
                            }
                            if *tail_elem == Ty::Unknown {
                                Ty::list(elem)
                            } else {
                                Ty::list(*tail_elem)
                            }
                        }
                        Ty::Unknown | Ty::Error => Ty::list(elem),
                        other => {
                            self.error(
                                "E0001",
                                format!("`Cons` tail must be a list, found `{other}`"),
                                span,
                            );
                            Ty::Error
                        }
                    }
                } else {
                    Ty::Error
                }
            }
            "None" | "Nil" => {
                self.error("E0015", format!("`{name}` is not callable"), span);
                Ty::Error
            }
            _ => Ty::Unknown,
        }
    }

    fn variant_ty(
        &mut self,
        expr_id: ExprId,
        name: &str,
        args: Option<&[ExprId]>,
        expected: Option<&Ty>,
        span: Span,
    ) -> Ty {
        let Some(symbol) = self.symbol_of(expr_id) else {
            if let Some(args) = args {
                for arg in args {
                    self.check_expr(*arg, None);
                }
            }
            return Ty::Error;
        };

        // Built-in constructors spelled as variant expressions.
        if matches!(self.res.symbol(symbol).kind, SymbolKind::Builtin { .. }) {
            let args = args.unwrap_or(&[]);
            return self.builtin_call_ty(name, args, expected, span);
        }

        let SymbolKind::Variant { owner, index, .. } = self.res.symbol(symbol).kind else {
            self.error("E0010", format!("`{name}` is not a variant"), span);
            return Ty::Error;
        };
        let Some(info) = self.regs.defs.get(&owner).cloned() else {
            return Ty::Error;
        };
        let DefKind::Sum(variants) = &info.kind else {
            return Ty::Error;
        };
        let variant = &variants[index];

        let payload_tys: Vec<Ty> = match &variant.payload {
            PayloadInfo::Unit => Vec::new(),
            PayloadInfo::Tuple(tys) => tys.clone(),
            PayloadInfo::Record(fields) => fields.iter().map(|(_, t)| t.clone()).collect(),
        };
        let args = args.unwrap_or(&[]);
        if payload_tys.len() != args.len() {
            self.error(
                "E0004",
                format!(
                    "variant `{name}` expects {} arguments, found {}",
                    payload_tys.len(),
                    args.len()
                ),
                span,
            );
            for arg in args {
                self.check_expr(*arg, None);
            }
            return Ty::Error;
        }

        let mut bindings: FxHashMap<String, Ty> = FxHashMap::default();
        if let Some(Ty::Named {
            symbol: expected_symbol,
            args: expected_args,
            ..
        }) = expected.map(|e| self.normalize(e))
        {
            if expected_symbol == owner && expected_args.len() == info.generics.len() {
                for (param, arg) in info.generics.iter().zip(expected_args) {
                    bindings.insert(param.clone(), arg);
                }
            }
        }

        for (arg, payload) in args.iter().zip(&payload_tys) {
            let hint = payload.substitute(&bindings);
            let found = self.check_expr(*arg, Some(&hint));
            infer_bindings(payload, &found, &mut bindings);
            let expected_arg = payload.substitute(&bindings);
            if !found.compatible(&expected_arg) {
                let arg_span = self.expr_span(*arg);
                self.error(
                    "E0001",
                    format!("argument type mismatch: expected `{expected_arg}`, found `{found}`"),
                    arg_span,
                );
            }
        }

        let type_args: Vec<Ty> = info
            .generics
            .iter()
            .map(|g| bindings.get(g).cloned().unwrap_or(Ty::Unknown))
            .collect();
        Ty::Named {
            symbol: owner,
            name: info.name.clone(),
            args: type_args,
        }
    }

    // ── Field and method access ────────────────────────────────────────

    /// Walk an `Ident`/`Field` chain rooted at the `std` builtin module,
    /// returning the path segments after `std`.
    fn std_path(&self, expr_id: ExprId) -> Option<Vec<String>> {
        let program = self.program();
        match &program.expr(expr_id).kind {
            ExprKind::Ident { name, .. } => {
                let symbol = self.symbol_of(expr_id)?;
                match &self.res.symbol(symbol).kind {
                    SymbolKind::Module { path, unit: None, .. }
                        if path.len() == 1 && path[0] == "std" && name == "std" =>
                    {
                        Some(Vec::new())
                    }
                    _ => None,
                }
            }
            ExprKind::Field { base, name } => {
                let mut path = self.std_path(*base)?;
                path.push(name.clone());
                Some(path)
            }
            _ => None,
        }
    }

    /// Record `Module` types along an `Ident`/`Field` chain so the
    /// every-expression-typed invariant holds for std paths.
    fn record_module_chain(&mut self, expr_id: ExprId) {
        let kind = &self.program().expr(expr_id).kind;
        if let ExprKind::Field { base, .. } = kind {
            let base = *base;
            self.record_module_chain(base);
        }
        self.record(expr_id, Ty::Module);
    }

    fn field_ty(&mut self, expr_id: ExprId, base: ExprId, name: &str, span: Span) -> Ty {
        // std.io, std.list.map, ...
        if let Some(path) = self.std_path(expr_id) {
            self.record_module_chain(base);
            return match path.len() {
                1 => {
                    if builtins::std_module_exists(&path[0]) {
                        Ty::Module
                    } else {
                        self.error(
                            "E0014",
                            format!("`std` has no module `{}`", path[0]),
                            span,
                        );
                        Ty::Error
                    }
                }
                2 => match builtins::std_fn(&path[0], &path[1]) {
                    Some(f) => {
                        if f.effect && !self.effect {
                            self.error(
                                "E0005",
                                "cannot reference effect function from pure function",
                                span,
                            );
                        }
                        Ty::function(f.params, f.ret, f.effect)
                    }
                    None => {
                        self.error(
                            "E0014",
                            format!("`std.{}` has no member `{}`", path[0], path[1]),
                            span,
                        );
                        Ty::Error
                    }
                },
                _ => {
                    self.error("E0014", "unknown standard-library path", span);
                    Ty::Error
                }
            };
        }

        let base_ty = self.check_expr(base, None);
        let base_ty = self.normalize(&base_ty);

        // Module member access: imported modules bind their scope.
        if base_ty == Ty::Module {
            return self.module_member_ty(base, name, span);
        }

        match &base_ty {
            Ty::Named { symbol, args, .. } => {
                let Some(info) = self.regs.defs.get(symbol).cloned() else {
                    return Ty::Error;
                };
                let mut bindings = FxHashMap::default();
                for (param, arg) in info.generics.iter().zip(args) {
                    bindings.insert(param.clone(), arg.clone());
                }
                let fields: Option<Vec<(String, Ty)>> = match &info.kind {
                    DefKind::Product(fields) => Some(fields.clone()),
                    DefKind::Sum(variants) => {
                        // Field access through a sum is only well-defined
                        // when every variant is the same record.
                        if variants.len() == 1 {
                            match &variants[0].payload {
                                PayloadInfo::Record(fields) => Some(fields.clone()),
                                _ => None,
                            }
                        } else {
                            None
                        }
                    }
                    DefKind::Alias(_) => None,
                };
                match fields.and_then(|fields| {
                    fields.iter().find(|(n, _)| n == name).map(|(_, t)| t.clone())
                }) {
                    Some(field_ty) => field_ty.substitute(&bindings),
                    None => {
                        self.error(
                            "E0009",
                            format!("`{base_ty}` has no field `{name}`"),
                            span,
                        );
                        Ty::Error
                    }
                }
            }
            Ty::AnonRecord(fields) => match fields.iter().find(|(n, _)| n == name) {
                Some((_, ty)) => ty.clone(),
                None => {
                    self.error("E0009", format!("record has no field `{name}`"), span);
                    Ty::Error
                }
            },
            Ty::Unknown => Ty::Unknown,
            Ty::Error => Ty::Error,
            other => {
                self.error(
                    "E0009",
                    format!("field access requires a record, found `{other}`"),
                    span,
                );
                Ty::Error
            }
        }
    }

    fn module_member_ty(&mut self, base: ExprId, name: &str, span: Span) -> Ty {
        let Some(symbol) = self.symbol_of(base) else {
            return Ty::Unknown;
        };
        let SymbolKind::Module { scope, .. } = &self.res.symbol(symbol).kind else {
            return Ty::Unknown;
        };
        let scope = *scope;
        let Some(member) = self.res.scopes.lookup_local(scope, name) else {
            let module = self.res.symbol(symbol).name.clone();
            self.error(
                "E0014",
                format!("module `{module}` has no member `{name}`"),
                span,
            );
            return Ty::Error;
        };
        if !self.res.symbol(member).public {
            self.error(
                "E0014",
                format!("`{name}` is private to its module"),
                span,
            );
            return Ty::Error;
        }
        let member = self.res.symbols.resolve_alias(member);
        match &self.res.symbol(member).kind {
            SymbolKind::Function { effect, .. } => {
                let effect = *effect;
                if effect && !self.effect {
                    self.error(
                        "E0005",
                        "cannot reference effect function from pure function",
                        span,
                    );
                }
                match self.fn_sig_of(member) {
                    Some(sig) => Ty::function(sig.params, sig.ret, sig.effect),
                    None => Ty::Unknown,
                }
            }
            SymbolKind::Variable { .. } => self.var_ty(member),
            SymbolKind::Module { .. } => Ty::Module,
            SymbolKind::Variant { owner, .. } => {
                let owner = *owner;
                match self.regs.defs.get(&owner).cloned() {
                    Some(info) => Ty::Named {
                        symbol: owner,
                        name: info.name,
                        args: vec![Ty::Unknown; 0],
                    },
                    None => Ty::Unknown,
                }
            }
            _ => Ty::Unknown,
        }
    }

    fn method_call_ty(
        &mut self,
        receiver: ExprId,
        method: &str,
        args: &[ExprId],
        span: Span,
    ) -> Ty {
        // std.io.println(...) and friends.
        if let Some(path) = self.std_path(receiver) {
            self.record_module_chain(receiver);
            if path.len() == 1 {
                return match builtins::std_fn(&path[0], method) {
                    Some(f) => {
                        if f.effect && !self.effect {
                            self.error(
                                "E0005",
                                "cannot call effect function from pure function",
                                span,
                            );
                        }
                        if f.params.len() != args.len() {
                            self.error(
                                "E0004",
                                format!(
                                    "`std.{}.{method}` expects {} arguments, found {}",
                                    path[0],
                                    f.params.len(),
                                    args.len()
                                ),
                                span,
                            );
                        }
                        for (i, arg) in args.iter().enumerate() {
                            let hint = f.params.get(i).cloned();
                            let found = self.check_expr(*arg, hint.as_ref());
                            if let Some(hint) = hint {
                                if !found.compatible(&hint) {
                                    let arg_span = self.expr_span(*arg);
                                    self.error(
                                        "E0001",
                                        format!(
                                            "argument type mismatch: expected `{hint}`, found `{found}`"
                                        ),
                                        arg_span,
                                    );
                                }
                            }
                        }
                        f.ret
                    }
                    None => {
                        for arg in args {
                            self.check_expr(*arg, None);
                        }
                        self.error(
                            "E0014",
                            format!("`std.{}` has no member `{method}`", path[0]),
                            span,
                        );
                        Ty::Error
                    }
                };
            }
        }

        let receiver_ty = self.check_expr(receiver, None);
        let receiver_ty = self.normalize(&receiver_ty);

        // Calls through a module path: `util.id(7)`.
        if receiver_ty == Ty::Module {
            let member_ty = self.module_member_ty(receiver, method, span);
            return self.call_through_ty(member_ty, args, span);
        }

        // Built-in methods short-circuit the impl lookup.
        if let Some(ty) = self.builtin_method_ty(&receiver_ty, method, args, span) {
            return ty;
        }

        // Trait/impl dispatch.
        let candidates: Vec<(FnSig, Option<String>)> = self
            .regs
            .impls
            .iter()
            .filter(|imp| self.normalize(&imp.target).compatible(&receiver_ty))
            .flat_map(|imp| {
                imp.methods
                    .iter()
                    .filter(|(name, _, _)| name == method)
                    .map(|(_, sig, _)| (sig.clone(), imp.trait_name.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();

        match candidates.len() {
            0 => {
                // Fall back to a function-valued field on record receivers.
                let field_ty = match &receiver_ty {
                    Ty::Named { .. } | Ty::AnonRecord(_) => {
                        self.peek_field_ty(&receiver_ty, method)
                    }
                    Ty::Unknown => Some(Ty::Unknown),
                    Ty::Error => Some(Ty::Error),
                    _ => None,
                };
                match field_ty {
                    Some(ty) => self.call_through_ty(ty, args, span),
                    None => {
                        for arg in args {
                            self.check_expr(*arg, None);
                        }
                        self.error(
                            "E0014",
                            format!("no method `{method}` on `{receiver_ty}`"),
                            span,
                        );
                        Ty::Error
                    }
                }
            }
            1 => {
                let (sig, _) = &candidates[0];
                if sig.effect && !self.effect {
                    self.error(
                        "E0005",
                        "cannot call effect function from pure function",
                        span,
                    );
                }
                if sig.params.len() != args.len() {
                    self.error(
                        "E0004",
                        format!(
                            "method `{method}` expects {} arguments, found {}",
                            sig.params.len(),
                            args.len()
                        ),
                        span,
                    );
                }
                for (arg, param) in args.iter().zip(&sig.params) {
                    let found = self.check_expr(*arg, Some(param));
                    if !found.compatible(param) {
                        let arg_span = self.expr_span(*arg);
                        self.error(
                            "E0001",
                            format!("argument type mismatch: expected `{param}`, found `{found}`"),
                            arg_span,
                        );
                    }
                }
                for arg in args.iter().skip(sig.params.len()) {
                    self.check_expr(*arg, None);
                }
                sig.ret.clone()
            }
            _ => {
                for arg in args {
                    self.check_expr(*arg, None);
                }
                self.error(
                    "E0014",
                    format!("ambiguous method `{method}` on `{receiver_ty}`"),
                    span,
                );
                Ty::Error
            }
        }
    }

    /// Field type without reporting unknown-field errors.
    fn peek_field_ty(&self, receiver: &Ty, name: &str) -> Option<Ty> {
        match receiver {
            Ty::AnonRecord(fields) => {
                fields.iter().find(|(n, _)| n == name).map(|(_, t)| t.clone())
            }
            Ty::Named { symbol, args, .. } => {
                let info = self.regs.defs.get(symbol)?;
                let DefKind::Product(fields) = &info.kind else {
                    return None;
                };
                let field = fields.iter().find(|(n, _)| n == name)?;
                let mut bindings = FxHashMap::default();
                for (param, arg) in info.generics.iter().zip(args) {
                    bindings.insert(param.clone(), arg.clone());
                }
                Some(field.1.substitute(&bindings))
            }
            _ => None,
        }
    }

    fn call_through_ty(&mut self, callee: Ty, args: &[ExprId], span: Span) -> Ty {
        match self.normalize(&callee) {
            Ty::Fn {
                params,
                ret,
                effect,
            } => {
                if effect && !self.effect {
                    self.error(
                        "E0005",
                        "cannot call effect function from pure function",
                        span,
                    );
                }
                if params.len() != args.len() {
                    self.error(
                        "E0004",
                        format!("call expects {} arguments, found {}", params.len(), args.len()),
                        span,
                    );
                }
                for (arg, param) in args.iter().zip(&params) {
                    let found = self.check_expr(*arg, Some(param));
                    if !found.compatible(param) {
                        let arg_span = self.expr_span(*arg);
                        self.error(
                            "E0001",
                            format!("argument type mismatch: expected `{param}`, found `{found}`"),
                            arg_span,
                        );
                    }
                }
                for arg in args.iter().skip(params.len()) {
                    self.check_expr(*arg, None);
                }
                *ret
            }
            Ty::Unknown | Ty::Error => {
                for arg in args {
                    self.check_expr(*arg, None);
                }
                callee
            }
            other => {
                for arg in args {
                    self.check_expr(*arg, None);
                }
                self.error("E0015", format!("`{other}` is not callable"), span);
                Ty::Error
            }
        }
    }

    fn builtin_method_ty(
        &mut self,
        receiver: &Ty,
        method: &str,
        args: &[ExprId],
        span: Span,
    ) -> Option<Ty> {
        let ty = match (receiver, method) {
            (_, "len") => {
                self.check_args_loosely(args);
                Ty::i32()
            }
            (Ty::Option(_), "is_some") | (Ty::Option(_), "is_none") => {
                self.check_args_loosely(args);
                Ty::bool()
            }
            (Ty::Result { .. }, "is_ok") | (Ty::Result { .. }, "is_err") => {
                self.check_args_loosely(args);
                Ty::bool()
            }
            (Ty::Option(inner), "unwrap") => {
                self.check_args_loosely(args);
                (**inner).clone()
            }
            (Ty::Result { ok, .. }, "unwrap") => {
                self.check_args_loosely(args);
                (**ok).clone()
            }
            (Ty::Option(inner), "unwrap_or") => {
                let inner = (**inner).clone();
                if args.len() != 1 {
                    self.error(
                        "E0004",
                        format!("`unwrap_or` expects 1 argument, found {}", args.len()),
                        span,
                    );
                }
                for arg in args {
                    let found = self.check_expr(*arg, Some(&inner));
                    self.require_compatible(&inner, &found, self.expr_span(*arg));
                }
                inner
            }
            (Ty::Result { ok, .. }, "unwrap_or") => {
                let ok = (**ok).clone();
                if args.len() != 1 {
                    self.error(
                        "E0004",
                        format!("`unwrap_or` expects 1 argument, found {}", args.len()),
                        span,
                    );
                }
                for arg in args {
                    let found = self.check_expr(*arg, Some(&ok));
                    self.require_compatible(&ok, &found, self.expr_span(*arg));
                }
                ok
            }
            _ => return None,
        };
        Some(ty)
    }

    fn check_args_loosely(&mut self, args: &[ExprId]) {
        for arg in args {
            self.check_expr(*arg, None);
        }
    }

    fn element_type(&mut self, iterable: &Ty, span: Span) -> Ty {
        match self.normalize(iterable) {
            Ty::Array { elem, .. } => *elem,
            Ty::List(elem) => *elem,
            Ty::Range(elem) => *elem,
            Ty::Prim(PrimType::String) => Ty::Prim(PrimType::Char),
            Ty::Tuple(elements) => {
                // Tuples iterate heterogeneously; a single shared type is
                // only available when every element agrees.
                let first = elements.first().cloned().unwrap_or(Ty::Unknown);
                if elements.iter().all(|e| e.compatible(&first)) {
                    first
                } else {
                    Ty::Unknown
                }
            }
            Ty::Unknown => Ty::Unknown,
            Ty::Error => Ty::Error,
            other => {
                self.error(
                    "E0001",
                    format!("`for` cannot iterate over `{other}`"),
                    span,
                );
                Ty::Error
            }
        }
    }

    fn try_ty(&mut self, operand: Ty, span: Span) -> Ty {
        if !self.effect {
            self.error(
                "E0016",
                "`?` is only allowed inside effect functions",
                span,
            );
        }
        match operand {
            Ty::Option(inner) => {
                let ret = self.ret.clone();
                let ret = self.normalize(&ret);
                if !matches!(ret, Ty::Option(_) | Ty::Unknown | Ty::Error | Ty::Io(_)) {
                    self.error(
                        "E0016",
                        format!("`?` on an `Option` requires an `Option` return type, found `{}`", self.ret),
                        span,
                    );
                }
                *inner
            }
            Ty::Result { ok, err } => {
                let ret = self.ret.clone();
                let ret = self.normalize(&ret);
                match ret {
                    Ty::Result { err: ret_err, .. } => {
                        if !err.compatible(&ret_err) {
                            self.error(
                                "E0016",
                                format!(
                                    "`?` propagates `{err}`, but the function returns errors of `{ret_err}`"
                                ),
                                span,
                            );
                        }
                    }
                    Ty::Unknown | Ty::Error | Ty::Io(_) => {}
                    other => {
                        self.error(
                            "E0016",
                            format!("`?` on a `Result` requires a `Result` return type, found `{other}`"),
                            span,
                        );
                    }
                }
                *ok
            }
            Ty::Unknown => Ty::Unknown,
            Ty::Error => Ty::Error,
            other => {
                self.error(
                    "E0016",
                    format!("`?` requires an `Option` or `Result`, found `{other}`"),
                    span,
                );
                Ty::Error
            }
        }
    }

    // ── Patterns ───────────────────────────────────────────────────────

    /// Check a pattern against the expected type, seeding binding types
    /// and collecting (name, type) pairs for or-pattern agreement.
    fn check_pattern(&mut self, pat_id: PatId, expected: &Ty, bindings: &mut Vec<(String, Ty)>) {
        let pat = self.program().pat(pat_id);
        let span = pat.span;
        let expected = self.normalize(expected);
        match &pat.kind {
            PatternKind::Wildcard | PatternKind::Rest => {}
            PatternKind::Ident { name, .. } => {
                bindings.push((name.clone(), expected.clone()));
                if let Some(symbol) = self.res.pat_symbols.get(&(self.unit, pat_id)) {
                    self.locals.insert(*symbol, expected.clone());
                }
            }
            PatternKind::Typed { pattern, ty } => {
                let annotated = self.lower(*ty);
                if !annotated.compatible(&expected) {
                    self.error(
                        "E0001",
                        format!("pattern annotation `{annotated}` does not match `{expected}`"),
                        span,
                    );
                }
                self.check_pattern(*pattern, &annotated, bindings);
            }
            PatternKind::Literal(lit) => {
                let lit_ty = match lit {
                    PatLit::Int(_) => {
                        if expected.is_integer() {
                            expected.clone()
                        } else {
                            Ty::i32()
                        }
                    }
                    PatLit::Float(_) => Ty::f64(),
                    PatLit::Str(_) => Ty::string(),
                    PatLit::Char(_) => Ty::Prim(PrimType::Char),
                    PatLit::Bool(_) => Ty::bool(),
                };
                if !lit_ty.compatible(&expected) {
                    self.error(
                        "E0001",
                        format!("pattern of type `{lit_ty}` cannot match `{expected}`"),
                        span,
                    );
                }
            }
            PatternKind::Constructor { name, args } => {
                let name = name.clone();
                let args = args.clone();
                self.check_ctor_pattern(pat_id, &name, args.as_deref(), &expected, span, bindings);
            }
            PatternKind::Record {
                type_name, fields, rest,
            } => {
                let fields = fields.clone();
                let rest = *rest;
                let type_name = type_name.clone();
                self.check_record_pattern(
                    pat_id, type_name, &fields, rest, &expected, span, bindings,
                );
            }
            PatternKind::Tuple(elements) => {
                let elements = elements.clone();
                match &expected {
                    Ty::Tuple(tys) if tys.len() == elements.len() => {
                        let tys = tys.clone();
                        for (element, ty) in elements.iter().zip(&tys) {
                            self.check_pattern(*element, ty, bindings);
                        }
                    }
                    Ty::Unknown | Ty::Error => {
                        for element in &elements {
                            self.check_pattern(*element, &Ty::Unknown, bindings);
                        }
                    }
                    other => {
                        self.error(
                            "E0001",
                            format!(
                                "tuple pattern of {} elements cannot match `{other}`",
                                elements.len()
                            ),
                            span,
                        );
                        for element in &elements {
                            self.check_pattern(*element, &Ty::Error, bindings);
                        }
                    }
                }
            }
            PatternKind::Or(alternatives) => {
                let alternatives = alternatives.clone();
                let mut first_bindings: Option<Vec<(String, Ty)>> = None;
                for alternative in &alternatives {
                    let mut alt_bindings = Vec::new();
                    self.check_pattern(*alternative, &expected, &mut alt_bindings);
                    match &first_bindings {
                        None => first_bindings = Some(alt_bindings.clone()),
                        Some(first) => {
                            let mut sorted_first = first.clone();
                            sorted_first.sort_by(|a, b| a.0.cmp(&b.0));
                            let mut sorted_alt = alt_bindings.clone();
                            sorted_alt.sort_by(|a, b| a.0.cmp(&b.0));
                            let agree = sorted_first.len() == sorted_alt.len()
                                && sorted_first.iter().zip(&sorted_alt).all(
                                    |((na, ta), (nb, tb))| na == nb && ta.compatible(tb),
                                );
                            if !agree {
                                let alt_span = self.program().pat(*alternative).span;
                                self.error(
                                    "E0001",
                                    "or-pattern alternatives must bind the same names to the same types",
                                    alt_span,
                                );
                            }
                        }
                    }
                    bindings.extend(alt_bindings);
                }
            }
            PatternKind::Range { start, end, .. } => {
                let bound_ty = match start {
                    RangeBound::Int(_) => {
                        if expected.is_integer() {
                            expected.clone()
                        } else {
                            Ty::i32()
                        }
                    }
                    RangeBound::Char(_) => Ty::Prim(PrimType::Char),
                };
                let end_matches = matches!(
                    (start, end),
                    (RangeBound::Int(_), RangeBound::Int(_))
                        | (RangeBound::Char(_), RangeBound::Char(_))
                );
                if !end_matches {
                    self.error("E0001", "range pattern bounds must share a type", span);
                }
                if !bound_ty.compatible(&expected) {
                    self.error(
                        "E0001",
                        format!("range pattern of `{bound_ty}` cannot match `{expected}`"),
                        span,
                    );
                }
            }
        }
    }

    fn check_ctor_pattern(
        &mut self,
        pat_id: PatId,
        name: &str,
        args: Option<&[PatId]>,
        expected: &Ty,
        span: Span,
        bindings: &mut Vec<(String, Ty)>,
    ) {
        let symbol = self
            .res
            .pat_symbols
            .get(&(self.unit, pat_id))
            .map(|s| self.res.symbols.resolve_alias(*s));
        let Some(symbol) = symbol else {
            // Unresolved constructor; sub-patterns still get visited.
            if let Some(args) = args {
                for arg in args {
                    self.check_pattern(*arg, &Ty::Error, bindings);
                }
            }
            return;
        };

        // Built-in constructors as patterns.
        if matches!(self.res.symbol(symbol).kind, SymbolKind::Builtin { .. }) {
            let args = args.unwrap_or(&[]);
            match (name, expected) {
                ("Some", Ty::Option(inner)) if args.len() == 1 => {
                    let inner = (**inner).clone();
                    self.check_pattern(args[0], &inner, bindings);
                }
                ("None", Ty::Option(_)) if args.is_empty() => {}
                ("Ok", Ty::Result { ok, .. }) if args.len() == 1 => {
                    let ok = (**ok).clone();
                    self.check_pattern(args[0], &ok, bindings);
                }
                ("Err", Ty::Result { err, .. }) if args.len() == 1 => {
                    let err = (**err).clone();
                    self.check_pattern(args[0], &err, bindings);
                }
                ("Cons", Ty::List(elem)) if args.len() == 2 => {
                    let elem_ty = (**elem).clone();
                    let list_ty = Ty::list(elem_ty.clone());
                    self.check_pattern(args[0], &elem_ty, bindings);
                    self.check_pattern(args[1], &list_ty, bindings);
                }
                ("Nil", Ty::List(_)) if args.is_empty() => {}
                (_, Ty::Unknown) | (_, Ty::Error) => {
                    for arg in args {
                        self.check_pattern(*arg, &Ty::Unknown, bindings);
                    }
                }
                _ => {
                    self.error(
                        "E0010",
                        format!("constructor `{name}` cannot match `{expected}`"),
                        span,
                    );
                    for arg in args {
                        self.check_pattern(*arg, &Ty::Error, bindings);
                    }
                }
            }
            return;
        }

        let SymbolKind::Variant { owner, index, .. } = self.res.symbol(symbol).kind else {
            self.error("E0010", format!("`{name}` is not a variant"), span);
            return;
        };

        // The pattern must name a variant of the subject's type.
        match expected {
            Ty::Named { symbol, .. } if *symbol == owner => {}
            Ty::Unknown | Ty::Error => {}
            other => {
                self.error(
                    "E0010",
                    format!("variant `{name}` is not part of `{other}`"),
                    span,
                );
            }
        }

        let Some(info) = self.regs.defs.get(&owner).cloned() else {
            return;
        };
        let DefKind::Sum(variants) = &info.kind else {
            return;
        };
        let variant = &variants[index];

        let mut payload_bindings = FxHashMap::default();
        if let Ty::Named { args, .. } = expected {
            for (param, arg) in info.generics.iter().zip(args) {
                payload_bindings.insert(param.clone(), arg.clone());
            }
        }
        let payload_tys: Vec<Ty> = match &variant.payload {
            PayloadInfo::Unit => Vec::new(),
            PayloadInfo::Tuple(tys) => {
                tys.iter().map(|t| t.substitute(&payload_bindings)).collect()
            }
            PayloadInfo::Record(fields) => fields
                .iter()
                .map(|(_, t)| t.substitute(&payload_bindings))
                .collect(),
        };

        let args = args.unwrap_or(&[]);
        if args.len() != payload_tys.len() {
            self.error(
                "E0004",
                format!(
                    "variant `{name}` has {} fields, pattern binds {}",
                    payload_tys.len(),
                    args.len()
                ),
                span,
            );
        }
        for (arg, payload) in args.iter().zip(&payload_tys) {
            self.check_pattern(*arg, payload, bindings);
        }
        for arg in args.iter().skip(payload_tys.len()) {
            self.check_pattern(*arg, &Ty::Error, bindings);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn check_record_pattern(
        &mut self,
        pat_id: PatId,
        type_name: Option<String>,
        fields: &[(String, PatId)],
        rest: bool,
        expected: &Ty,
        span: Span,
        bindings: &mut Vec<(String, Ty)>,
    ) {
        // Find the field table: the expected record type, or the named
        // variant's record payload.
        let def_fields: Option<Vec<(String, Ty)>> = if type_name.is_some() {
            let symbol = self
                .res
                .pat_symbols
                .get(&(self.unit, pat_id))
                .map(|s| self.res.symbols.resolve_alias(*s));
            match symbol.map(|s| (s, self.res.symbol(s).kind.clone())) {
                Some((s, SymbolKind::TypeDef { .. })) => {
                    match self.regs.defs.get(&s).map(|i| i.kind.clone()) {
                        Some(DefKind::Product(fields)) => Some(fields),
                        _ => None,
                    }
                }
                Some((_, SymbolKind::Variant { owner, index, .. })) => {
                    match self.regs.defs.get(&owner).map(|i| i.kind.clone()) {
                        Some(DefKind::Sum(variants)) => match &variants[index].payload {
                            PayloadInfo::Record(fields) => Some(fields.clone()),
                            _ => None,
                        },
                        _ => None,
                    }
                }
                _ => None,
            }
        } else {
            match expected {
                Ty::AnonRecord(fields) => Some(fields.clone()),
                Ty::Named { symbol, .. } => {
                    match self.regs.defs.get(symbol).map(|i| i.kind.clone()) {
                        Some(DefKind::Product(fields)) => Some(fields),
                        _ => None,
                    }
                }
                _ => None,
            }
        };

        let Some(def_fields) = def_fields else {
            if !matches!(expected, Ty::Unknown | Ty::Error) {
                self.error(
                    "E0009",
                    format!("record pattern cannot match `{expected}`"),
                    span,
                );
            }
            for (_, field_pat) in fields {
                self.check_pattern(*field_pat, &Ty::Unknown, bindings);
            }
            return;
        };

        for (field_name, field_pat) in fields {
            match def_fields.iter().find(|(n, _)| n == field_name) {
                Some((_, field_ty)) => {
                    let field_ty = field_ty.clone();
                    self.check_pattern(*field_pat, &field_ty, bindings);
                }
                None => {
                    self.error(
                        "E0009",
                        format!("no field `{field_name}` to match"),
                        span,
                    );
                    self.check_pattern(*field_pat, &Ty::Error, bindings);
                }
            }
        }
        if !rest {
            for (def_name, _) in &def_fields {
                if !fields.iter().any(|(n, _)| n == def_name) {
                    self.error(
                        "E0009",
                        format!("record pattern is missing field `{def_name}` (add `..` to ignore the rest)"),
                        span,
                    );
                }
            }
        }
    }

    // ── Match checking ─────────────────────────────────────────────────

    fn check_match(&mut self, subject: ExprId, arms: &[MatchArm], span: Span) -> Ty {
        let subject_ty = self.check_expr(subject, None);
        let subject_ty = self.normalize(&subject_ty);

        let mut common: Option<Ty> = None;
        for arm in arms {
            let mut bindings = Vec::new();
            self.check_pattern(arm.pattern, &subject_ty, &mut bindings);
            if let Some(guard) = arm.guard {
                self.check_condition(guard);
            }
            let arm_ty = match &arm.body {
                ArmBody::Expr(expr) => {
                    let hint = common.clone();
                    self.check_expr(*expr, hint.as_ref())
                }
                ArmBody::Block(stmts) => {
                    self.check_stmts(stmts);
                    Ty::void()
                }
            };
            match &common {
                None => common = Some(arm_ty),
                Some(common_ty) => {
                    if !arm_ty.compatible(common_ty) {
                        self.error(
                            "E0001",
                            format!(
                                "match arms disagree: expected `{common_ty}`, found `{arm_ty}`"
                            ),
                            arm.span,
                        );
                    }
                }
            }
        }

        self.check_exhaustiveness(arms, &subject_ty, span);
        common.unwrap_or(Ty::void())
    }

    fn check_exhaustiveness(&mut self, arms: &[MatchArm], subject_ty: &Ty, span: Span) {
        if matches!(subject_ty, Ty::Unknown | Ty::Error) {
            return;
        }
        let info = self.type_info(subject_ty, 0);

        let mut translated: Vec<Pat> = Vec::new();
        let mut arm_pats: Vec<Option<Vec<Pat>>> = Vec::new();
        for arm in arms {
            if arm.guard.is_some() {
                // A guarded arm guarantees nothing.
                arm_pats.push(None);
                continue;
            }
            let expanded = self.translate_pattern(arm.pattern, subject_ty);
            if expanded.len() > 64 {
                // Or-expansion blew up; skip the check rather than guess.
                return;
            }
            translated.extend(expanded.iter().cloned());
            arm_pats.push(Some(expanded));
        }

        if let Some(witnesses) = exhaustiveness::check_exhaustiveness(&translated, &info) {
            self.error(
                "E0012",
                format!("non-exhaustive match: missing {}", witnesses.join(", ")),
                span,
            );
            return;
        }

        // Redundancy: an arm none of whose expansions add coverage.
        let mut matrix: Vec<Vec<Pat>> = Vec::new();
        for (arm, pats) in arms.iter().zip(&arm_pats) {
            let Some(pats) = pats else {
                continue;
            };
            let useful = pats.iter().any(|p| {
                exhaustiveness::is_useful(
                    &matrix,
                    std::slice::from_ref(p),
                    std::slice::from_ref(&info),
                )
            });
            if !useful {
                self.warning("W0001", "unreachable match arm", arm.span);
            }
            for p in pats {
                matrix.push(vec![p.clone()]);
            }
        }
    }

    /// Constructor universe of a type, to a bounded depth. Recursive
    /// types bottom out at `Infinite`, which only ever errs toward
    /// requiring a wildcard.
    fn type_info(&self, ty: &Ty, depth: u32) -> TypeInfo {
        if depth > 8 {
            return TypeInfo::Infinite;
        }
        match self.normalize(ty) {
            Ty::Prim(PrimType::Bool) => TypeInfo::bool_type(),
            Ty::Prim(PrimType::Void) => TypeInfo::Sum {
                variants: vec![ConstructorSig {
                    name: "void".to_string(),
                    arity: 0,
                    args: vec![],
                }],
            },
            Ty::Option(inner) => TypeInfo::Sum {
                variants: vec![
                    ConstructorSig {
                        name: "Some".to_string(),
                        arity: 1,
                        args: vec![self.type_info(&inner, depth + 1)],
                    },
                    ConstructorSig {
                        name: "None".to_string(),
                        arity: 0,
                        args: vec![],
                    },
                ],
            },
            Ty::Result { ok, err } => TypeInfo::Sum {
                variants: vec![
                    ConstructorSig {
                        name: "Ok".to_string(),
                        arity: 1,
                        args: vec![self.type_info(&ok, depth + 1)],
                    },
                    ConstructorSig {
                        name: "Err".to_string(),
                        arity: 1,
                        args: vec![self.type_info(&err, depth + 1)],
                    },
                ],
            },
            Ty::List(elem) => TypeInfo::Sum {
                variants: vec![
                    ConstructorSig {
                        name: "Cons".to_string(),
                        arity: 2,
                        args: vec![
                            self.type_info(&elem, depth + 1),
                            self.type_info(&Ty::list((*elem).clone()), depth + 1),
                        ],
                    },
                    ConstructorSig {
                        name: "Nil".to_string(),
                        arity: 0,
                        args: vec![],
                    },
                ],
            },
            Ty::Tuple(elements) => TypeInfo::Sum {
                variants: vec![ConstructorSig {
                    name: "(fields)".to_string(),
                    arity: elements.len(),
                    args: elements
                        .iter()
                        .map(|e| self.type_info(e, depth + 1))
                        .collect(),
                }],
            },
            Ty::Named { symbol, args, .. } => {
                let Some(info) = self.regs.defs.get(&symbol) else {
                    return TypeInfo::Infinite;
                };
                let mut bindings = FxHashMap::default();
                for (param, arg) in info.generics.iter().zip(&args) {
                    bindings.insert(param.clone(), arg.clone());
                }
                match &info.kind {
                    DefKind::Sum(variants) => TypeInfo::Sum {
                        variants: variants
                            .iter()
                            .map(|v| {
                                let payload: Vec<Ty> = match &v.payload {
                                    PayloadInfo::Unit => vec![],
                                    PayloadInfo::Tuple(tys) => {
                                        tys.iter().map(|t| t.substitute(&bindings)).collect()
                                    }
                                    PayloadInfo::Record(fields) => fields
                                        .iter()
                                        .map(|(_, t)| t.substitute(&bindings))
                                        .collect(),
                                };
                                ConstructorSig {
                                    name: v.name.clone(),
                                    arity: payload.len(),
                                    args: payload
                                        .iter()
                                        .map(|t| self.type_info(t, depth + 1))
                                        .collect(),
                                }
                            })
                            .collect(),
                    },
                    DefKind::Product(fields) => TypeInfo::Sum {
                        variants: vec![ConstructorSig {
                            name: "(fields)".to_string(),
                            arity: fields.len(),
                            args: fields
                                .iter()
                                .map(|(_, t)| {
                                    self.type_info(&t.substitute(&bindings), depth + 1)
                                })
                                .collect(),
                        }],
                    },
                    DefKind::Alias(_) => TypeInfo::Infinite,
                }
            }
            Ty::AnonRecord(fields) => TypeInfo::Sum {
                variants: vec![ConstructorSig {
                    name: "(fields)".to_string(),
                    arity: fields.len(),
                    args: fields
                        .iter()
                        .map(|(_, t)| self.type_info(t, depth + 1))
                        .collect(),
                }],
            },
            _ => TypeInfo::Infinite,
        }
    }

    /// Translate an AST pattern into the abstract form, expanding
    /// or-patterns. Returns one abstract pattern per alternative.
    fn translate_pattern(&self, pat_id: PatId, subject: &Ty) -> Vec<Pat> {
        let program = self.program();
        let pat = program.pat(pat_id);
        let subject = self.normalize(subject);
        match &pat.kind {
            PatternKind::Wildcard | PatternKind::Ident { .. } | PatternKind::Rest => {
                vec![Pat::Wildcard]
            }
            PatternKind::Typed { pattern, .. } => self.translate_pattern(*pattern, &subject),
            PatternKind::Literal(lit) => vec![match lit {
                PatLit::Bool(value) => Pat::Constructor {
                    name: value.to_string(),
                    args: vec![],
                },
                PatLit::Int(value) => Pat::Literal(value.to_string()),
                PatLit::Float(value) => Pat::Literal(format!("{value:?}")),
                PatLit::Str(value) => Pat::Literal(format!("{value:?}")),
                PatLit::Char(value) => Pat::Literal(format!("'{value}'")),
            }],
            PatternKind::Range {
                start,
                end,
                inclusive,
            } => {
                let key = match (start, end) {
                    (RangeBound::Int(a), RangeBound::Int(b)) => {
                        format!("{a}{}{b}", if *inclusive { "..=" } else { ".." })
                    }
                    (RangeBound::Char(a), RangeBound::Char(b)) => {
                        format!("'{a}'{}'{b}'", if *inclusive { "..=" } else { ".." })
                    }
                    _ => "<range>".to_string(),
                };
                vec![Pat::Range(key)]
            }
            PatternKind::Constructor { name, args } => {
                let payload_tys = self.ctor_payload_types(pat_id, &subject);
                let arg_ids = args.clone().unwrap_or_default();
                let expanded_args: Vec<Vec<Pat>> = arg_ids
                    .iter()
                    .enumerate()
                    .map(|(i, arg)| {
                        let arg_ty = payload_tys.get(i).cloned().unwrap_or(Ty::Unknown);
                        self.translate_pattern(*arg, &arg_ty)
                    })
                    .collect();
                cartesian(&expanded_args)
                    .into_iter()
                    .map(|args| Pat::Constructor {
                        name: name.clone(),
                        args,
                    })
                    .collect()
            }
            PatternKind::Record {
                type_name,
                fields,
                ..
            } => {
                // Order fields by definition, missing ones are wildcards.
                let (ctor_name, def_fields) = self.record_field_table(pat_id, type_name, &subject);
                let per_field: Vec<Vec<Pat>> = def_fields
                    .iter()
                    .map(|(field_name, field_ty)| {
                        match fields.iter().find(|(n, _)| n == field_name) {
                            Some((_, field_pat)) => self.translate_pattern(*field_pat, field_ty),
                            None => vec![Pat::Wildcard],
                        }
                    })
                    .collect();
                cartesian(&per_field)
                    .into_iter()
                    .map(|args| Pat::Constructor {
                        name: ctor_name.clone(),
                        args,
                    })
                    .collect()
            }
            PatternKind::Tuple(elements) => {
                let elem_tys: Vec<Ty> = match &subject {
                    Ty::Tuple(tys) => tys.clone(),
                    _ => vec![Ty::Unknown; elements.len()],
                };
                let per_elem: Vec<Vec<Pat>> = elements
                    .iter()
                    .enumerate()
                    .map(|(i, e)| {
                        self.translate_pattern(*e, elem_tys.get(i).unwrap_or(&Ty::Unknown))
                    })
                    .collect();
                cartesian(&per_elem)
                    .into_iter()
                    .map(|args| Pat::Constructor {
                        name: "(fields)".to_string(),
                        args,
                    })
                    .collect()
            }
            PatternKind::Or(alternatives) => alternatives
                .iter()
                .flat_map(|a| self.translate_pattern(*a, &subject))
                .collect(),
        }
    }

    /// Payload types of a constructor pattern, for translating nested
    /// patterns with the right column types.
    fn ctor_payload_types(&self, pat_id: PatId, subject: &Ty) -> Vec<Ty> {
        let symbol = self
            .res
            .pat_symbols
            .get(&(self.unit, pat_id))
            .map(|s| self.res.symbols.resolve_alias(*s));
        let Some(symbol) = symbol else {
            return Vec::new();
        };
        match (&self.res.symbol(symbol).kind, subject) {
            (SymbolKind::Builtin { .. }, Ty::Option(inner)) => vec![(**inner).clone()],
            (SymbolKind::Builtin { .. }, Ty::Result { ok, err }) => {
                match self.res.symbol(symbol).name.as_str() {
                    "Ok" => vec![(**ok).clone()],
                    "Err" => vec![(**err).clone()],
                    _ => Vec::new(),
                }
            }
            (SymbolKind::Builtin { .. }, Ty::List(elem)) => {
                vec![(**elem).clone(), Ty::list((**elem).clone())]
            }
            (SymbolKind::Variant { owner, index, .. }, _) => {
                let Some(info) = self.regs.defs.get(owner) else {
                    return Vec::new();
                };
                let DefKind::Sum(variants) = &info.kind else {
                    return Vec::new();
                };
                let mut bindings = FxHashMap::default();
                if let Ty::Named { args, .. } = subject {
                    for (param, arg) in info.generics.iter().zip(args) {
                        bindings.insert(param.clone(), arg.clone());
                    }
                }
                match &variants[*index].payload {
                    PayloadInfo::Unit => Vec::new(),
                    PayloadInfo::Tuple(tys) => {
                        tys.iter().map(|t| t.substitute(&bindings)).collect()
                    }
                    PayloadInfo::Record(fields) => fields
                        .iter()
                        .map(|(_, t)| t.substitute(&bindings))
                        .collect(),
                }
            }
            _ => Vec::new(),
        }
    }

    /// Ordered field table for a record pattern: the variant's record
    /// payload or the product definition.
    fn record_field_table(
        &self,
        pat_id: PatId,
        type_name: &Option<String>,
        subject: &Ty,
    ) -> (String, Vec<(String, Ty)>) {
        if type_name.is_some() {
            let symbol = self
                .res
                .pat_symbols
                .get(&(self.unit, pat_id))
                .map(|s| self.res.symbols.resolve_alias(*s));
            if let Some(symbol) = symbol {
                if let SymbolKind::Variant { owner, index, .. } = self.res.symbol(symbol).kind {
                    if let Some(info) = self.regs.defs.get(&owner) {
                        if let DefKind::Sum(variants) = &info.kind {
                            if let PayloadInfo::Record(fields) = &variants[index].payload {
                                return (variants[index].name.clone(), fields.clone());
                            }
                        }
                    }
                }
            }
        }
        match subject {
            Ty::Named { symbol, .. } => match self.regs.defs.get(symbol).map(|i| &i.kind) {
                Some(DefKind::Product(fields)) => ("(fields)".to_string(), fields.clone()),
                _ => ("(fields)".to_string(), Vec::new()),
            },
            Ty::AnonRecord(fields) => ("(fields)".to_string(), fields.clone()),
            _ => ("(fields)".to_string(), Vec::new()),
        }
    }

    fn record_literal_ty(
        &mut self,
        ty: Option<kira_parser::ast::TypeId>,
        fields: &[(String, ExprId)],
        span: Span,
    ) -> Ty {
        let Some(ty_id) = ty else {
            // Anonymous record.
            let field_tys = fields
                .iter()
                .map(|(name, value)| (name.clone(), self.check_expr(*value, None)))
                .collect();
            return Ty::AnonRecord(field_tys);
        };

        let symbol = self
            .res
            .type_symbols
            .get(&(self.unit, ty_id))
            .map(|s| self.res.symbols.resolve_alias(*s));
        let Some(symbol) = symbol else {
            for (_, value) in fields {
                self.check_expr(*value, None);
            }
            return Ty::Error;
        };

        // Product type or record-payload variant.
        let (result_ty, def_fields): (Ty, Vec<(String, Ty)>) =
            match self.res.symbol(symbol).kind.clone() {
                SymbolKind::TypeDef { .. } => match self.regs.defs.get(&symbol).cloned() {
                    Some(info) => match &info.kind {
                        DefKind::Product(def_fields) => (
                            Ty::Named {
                                symbol,
                                name: info.name.clone(),
                                args: vec![Ty::Unknown; info.generics.len()],
                            },
                            def_fields.clone(),
                        ),
                        _ => {
                            self.error(
                                "E0009",
                                format!("`{}` is not a record type", info.name),
                                span,
                            );
                            for (_, value) in fields {
                                self.check_expr(*value, None);
                            }
                            return Ty::Error;
                        }
                    },
                    None => (Ty::Error, Vec::new()),
                },
                SymbolKind::Variant { owner, index, .. } => {
                    match self.regs.defs.get(&owner).cloned() {
                        Some(info) => match &info.kind {
                            DefKind::Sum(variants) => match &variants[index].payload {
                                PayloadInfo::Record(def_fields) => (
                                    Ty::Named {
                                        symbol: owner,
                                        name: info.name.clone(),
                                        args: vec![Ty::Unknown; info.generics.len()],
                                    },
                                    def_fields.clone(),
                                ),
                                _ => {
                                    self.error(
                                        "E0010",
                                        format!(
                                            "variant `{}` has no named fields",
                                            variants[index].name
                                        ),
                                        span,
                                    );
                                    for (_, value) in fields {
                                        self.check_expr(*value, None);
                                    }
                                    return Ty::Error;
                                }
                            },
                            _ => (Ty::Error, Vec::new()),
                        },
                        None => (Ty::Error, Vec::new()),
                    }
                }
                _ => {
                    self.error("E0009", "not a record type", span);
                    for (_, value) in fields {
                        self.check_expr(*value, None);
                    }
                    return Ty::Error;
                }
            };

        for (name, value) in fields {
            match def_fields.iter().find(|(n, _)| n == name) {
                Some((_, field_ty)) => {
                    let field_ty = field_ty.clone();
                    let found = self.check_expr(*value, Some(&field_ty));
                    self.require_compatible(&field_ty, &found, self.expr_span(*value));
                }
                None => {
                    let value_span = self.expr_span(*value);
                    self.check_expr(*value, None);
                    self.error("E0009", format!("unknown field `{name}`"), value_span);
                }
            }
        }
        for (def_name, _) in &def_fields {
            if !fields.iter().any(|(n, _)| n == def_name) {
                self.error(
                    "E0009",
                    format!("missing field `{def_name}` in record literal"),
                    span,
                );
            }
        }
        result_ty
    }
}

/// First-order matching of an argument type against a parameter type,
/// recording generic-parameter bindings. This is call-site instantiation,
/// not inference: it only ever fills `Param` holes.
fn infer_bindings(param: &Ty, arg: &Ty, bindings: &mut FxHashMap<String, Ty>) {
    match (param, arg) {
        (Ty::Param(name), _) => {
            if !matches!(arg, Ty::Unknown | Ty::Error) {
                bindings.entry(name.clone()).or_insert_with(|| arg.clone());
            }
        }
        (Ty::Named { args: pa, .. }, Ty::Named { args: aa, .. }) => {
            for (p, a) in pa.iter().zip(aa) {
                infer_bindings(p, a, bindings);
            }
        }
        (Ty::Tuple(pa), Ty::Tuple(aa)) => {
            for (p, a) in pa.iter().zip(aa) {
                infer_bindings(p, a, bindings);
            }
        }
        (Ty::Array { elem: p, .. }, Ty::Array { elem: a, .. }) => infer_bindings(p, a, bindings),
        (
            Ty::Fn {
                params: pp,
                ret: pr,
                ..
            },
            Ty::Fn {
                params: ap,
                ret: ar,
                ..
            },
        ) => {
            for (p, a) in pp.iter().zip(ap) {
                infer_bindings(p, a, bindings);
            }
            infer_bindings(pr, ar, bindings);
        }
        (Ty::List(p), Ty::List(a)) => infer_bindings(p, a, bindings),
        (Ty::Option(p), Ty::Option(a)) => infer_bindings(p, a, bindings),
        (
            Ty::Result { ok: po, err: pe },
            Ty::Result { ok: ao, err: ae },
        ) => {
            infer_bindings(po, ao, bindings);
            infer_bindings(pe, ae, bindings);
        }
        (Ty::Io(p), Ty::Io(a)) => infer_bindings(p, a, bindings),
        _ => {}
    }
}

fn int_fits(value: i128, prim: PrimType) -> bool {
    match prim {
        PrimType::I8 => i8::try_from(value).is_ok(),
        PrimType::I16 => i16::try_from(value).is_ok(),
        PrimType::I32 => i32::try_from(value).is_ok(),
        PrimType::I64 => i64::try_from(value).is_ok(),
        PrimType::I128 => true,
        PrimType::U8 => u8::try_from(value).is_ok(),
        PrimType::U16 => u16::try_from(value).is_ok(),
        PrimType::U32 => u32::try_from(value).is_ok(),
        PrimType::U64 => u64::try_from(value).is_ok(),
        PrimType::U128 => u128::try_from(value).is_ok(),
        _ => true,
    }
}

fn cartesian(lists: &[Vec<Pat>]) -> Vec<Vec<Pat>> {
    let mut result: Vec<Vec<Pat>> = vec![Vec::new()];
    for list in lists {
        let mut next = Vec::new();
        for prefix in &result {
            for item in list {
                let mut row = prefix.clone();
                row.push(item.clone());
                next.push(row);
            }
        }
        result = next;
        if result.len() > 256 {
            return result;
        }
    }
    result
}
