//! Canonical-source rendering of a parsed [`Program`].
//!
//! The dump is valid Kira source: parsing it again yields a structurally
//! identical AST, which is how the parser's round-trip tests compare
//! trees. `kirac parse` prints this form.

use std::fmt::Write;

use crate::ast::{
    ArmBody, DeclId, DeclKind, ElseBranch, ExprId, ExprKind, FnDecl, InterpPart, MatchArm, PatId,
    PatLit, PatternKind, Program, RangeBound, StmtId, StmtKind, TypeDefKind, TypeId, TypeKind,
    VariantPayload,
};

/// Render a whole program to canonical source text.
pub fn dump_program(program: &Program) -> String {
    let mut d = Dumper {
        program,
        out: String::new(),
        indent: 0,
    };
    d.program();
    d.out
}

struct Dumper<'p> {
    program: &'p Program,
    out: String,
    indent: usize,
}

impl<'p> Dumper<'p> {
    fn program(&mut self) {
        if let Some(module) = &self.program.module {
            let _ = writeln!(self.out, "module {}", module.path.join("."));
            self.out.push('\n');
        }
        for import in &self.program.imports {
            let path = import.path.join(".");
            match &import.items {
                None => {
                    let _ = writeln!(self.out, "import {path}");
                }
                Some(items) => {
                    let rendered: Vec<String> = items
                        .iter()
                        .map(|item| match &item.alias {
                            Some(alias) => format!("{} as {}", item.name, alias),
                            None => item.name.clone(),
                        })
                        .collect();
                    let _ = writeln!(self.out, "import {path}.{{ {} }}", rendered.join(", "));
                }
            }
        }
        if !self.program.imports.is_empty() {
            self.out.push('\n');
        }
        for (i, decl) in self.program.decls.iter().enumerate() {
            if i > 0 {
                self.out.push('\n');
            }
            self.decl(*decl);
        }
    }

    fn line_start(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn doc(&mut self, doc: &Option<String>) {
        if let Some(doc) = doc {
            for line in doc.lines() {
                self.line_start();
                let _ = writeln!(self.out, "/// {line}");
            }
        }
    }

    // ── Declarations ───────────────────────────────────────────────────

    fn decl(&mut self, id: DeclId) {
        let decl = self.program.decl(id);
        match &decl.kind {
            DeclKind::Function(f) => self.fn_decl(f),
            DeclKind::TypeDef {
                name,
                generics,
                def,
                public,
                doc,
            } => {
                self.doc(doc);
                self.line_start();
                if *public {
                    self.out.push_str("pub ");
                }
                let _ = write!(self.out, "type {name}");
                self.generic_params(generics);
                self.out.push_str(" = ");
                match def {
                    TypeDefKind::Sum(variants) => {
                        for (i, v) in variants.iter().enumerate() {
                            if i > 0 {
                                self.out.push_str(" | ");
                            }
                            let _ = write!(self.out, "{}", v.name);
                            match &v.payload {
                                VariantPayload::Unit => {}
                                VariantPayload::Tuple(tys) => {
                                    self.out.push('(');
                                    self.type_list(tys);
                                    self.out.push(')');
                                }
                                VariantPayload::Record(fields) => {
                                    self.out.push_str(" { ");
                                    for (i, f) in fields.iter().enumerate() {
                                        if i > 0 {
                                            self.out.push_str(", ");
                                        }
                                        let _ = write!(self.out, "{}: ", f.name);
                                        self.ty(f.ty);
                                    }
                                    self.out.push_str(" }");
                                }
                            }
                        }
                    }
                    TypeDefKind::Product(fields) => {
                        self.out.push_str("{ ");
                        for (i, f) in fields.iter().enumerate() {
                            if i > 0 {
                                self.out.push_str(", ");
                            }
                            let _ = write!(self.out, "{}: ", f.name);
                            self.ty(f.ty);
                        }
                        self.out.push_str(" }");
                    }
                    TypeDefKind::Alias(ty) => self.ty(*ty),
                }
                self.out.push('\n');
            }
            DeclKind::Trait {
                name,
                supers,
                methods,
                public,
                doc,
            } => {
                self.doc(doc);
                self.line_start();
                if *public {
                    self.out.push_str("pub ");
                }
                let _ = write!(self.out, "trait {name}");
                if !supers.is_empty() {
                    let _ = write!(self.out, ": {}", supers.join(" + "));
                }
                self.out.push_str(" {\n");
                self.indent += 1;
                for method in methods {
                    self.fn_decl(method);
                }
                self.indent -= 1;
                self.line_start();
                self.out.push_str("}\n");
            }
            DeclKind::Impl {
                trait_name,
                target,
                methods,
                where_clause,
            } => {
                self.line_start();
                self.out.push_str("impl ");
                if let Some(trait_name) = trait_name {
                    let _ = write!(self.out, "{trait_name} for ");
                }
                self.ty(*target);
                self.where_clause(where_clause);
                self.out.push_str(" {\n");
                self.indent += 1;
                for method in methods {
                    self.fn_decl(method);
                }
                self.indent -= 1;
                self.line_start();
                self.out.push_str("}\n");
            }
            DeclKind::Const {
                name,
                ty,
                value,
                public,
                doc,
            } => {
                self.doc(doc);
                self.line_start();
                if *public {
                    self.out.push_str("pub ");
                }
                let _ = write!(self.out, "const {name}: ");
                self.ty(*ty);
                self.out.push_str(" = ");
                self.expr(*value);
                self.out.push('\n');
            }
            DeclKind::Let {
                pattern,
                ty,
                init,
                public,
            } => {
                self.line_start();
                if *public {
                    self.out.push_str("pub ");
                }
                self.out.push_str("let ");
                self.pat(*pattern);
                self.out.push_str(": ");
                self.ty(*ty);
                self.out.push_str(" = ");
                self.expr(*init);
                self.out.push('\n');
            }
            DeclKind::Test { name, body } => {
                self.line_start();
                let _ = write!(self.out, "test \"{}\" ", escape(name));
                self.block_inline(body);
                self.out.push('\n');
            }
        }
    }

    fn fn_decl(&mut self, f: &FnDecl) {
        self.doc(&f.doc);
        self.line_start();
        if f.public {
            self.out.push_str("pub ");
        }
        if f.effect {
            self.out.push_str("effect ");
        }
        let _ = write!(self.out, "fn {}", f.name);
        self.generic_params(&f.generics);
        self.out.push('(');
        let mut first = true;
        if f.has_self {
            self.out.push_str("self");
            first = false;
        }
        for param in &f.params {
            if !first {
                self.out.push_str(", ");
            }
            first = false;
            let _ = write!(self.out, "{}: ", param.name);
            self.ty(param.ty);
        }
        self.out.push_str(") -> ");
        self.ty(f.ret);
        self.where_clause(&f.where_clause);
        match &f.body {
            Some(body) => {
                self.out.push(' ');
                self.block_inline(body);
                self.out.push('\n');
            }
            None => self.out.push('\n'),
        }
    }

    fn generic_params(&mut self, generics: &[crate::ast::GenericParam]) {
        if generics.is_empty() {
            return;
        }
        self.out.push('[');
        for (i, g) in generics.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&g.name);
            if !g.bounds.is_empty() {
                let _ = write!(self.out, ": {}", g.bounds.join(" + "));
            }
        }
        self.out.push(']');
    }

    fn where_clause(&mut self, predicates: &[crate::ast::WherePred]) {
        if predicates.is_empty() {
            return;
        }
        self.out.push_str(" where ");
        for (i, pred) in predicates.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            let _ = write!(self.out, "{}: {}", pred.param, pred.bounds.join(" + "));
        }
    }

    // ── Statements ─────────────────────────────────────────────────────

    /// `{ ... }` starting at the current output position.
    fn block_inline(&mut self, stmts: &[StmtId]) {
        if stmts.is_empty() {
            self.out.push_str("{}");
            return;
        }
        self.out.push_str("{\n");
        self.indent += 1;
        for stmt in stmts {
            self.stmt(*stmt);
        }
        self.indent -= 1;
        self.line_start();
        self.out.push('}');
    }

    fn stmt(&mut self, id: StmtId) {
        let stmt = self.program.stmt(id);
        match &stmt.kind {
            StmtKind::Let {
                pattern,
                ty,
                init,
                public,
            } => {
                self.line_start();
                if *public {
                    self.out.push_str("pub ");
                }
                self.out.push_str("let ");
                self.pat(*pattern);
                self.out.push_str(": ");
                self.ty(*ty);
                self.out.push_str(" = ");
                self.expr(*init);
                self.out.push('\n');
            }
            StmtKind::Var { name, ty, init } => {
                self.line_start();
                let _ = write!(self.out, "var {name}: ");
                self.ty(*ty);
                if let Some(init) = init {
                    self.out.push_str(" = ");
                    self.expr(*init);
                }
                self.out.push('\n');
            }
            StmtKind::Assign { target, value } => {
                self.line_start();
                self.expr(*target);
                self.out.push_str(" = ");
                self.expr(*value);
                self.out.push('\n');
            }
            StmtKind::If { .. } => {
                self.line_start();
                self.if_chain(id);
                self.out.push('\n');
            }
            StmtKind::For {
                label,
                pattern,
                iterable,
                body,
            } => {
                self.line_start();
                self.out.push_str("for ");
                self.label(label);
                self.pat(*pattern);
                self.out.push_str(" in ");
                self.expr(*iterable);
                self.out.push(' ');
                self.block_inline(body);
                self.out.push('\n');
            }
            StmtKind::While { label, cond, body } => {
                self.line_start();
                self.out.push_str("while ");
                self.label(label);
                self.expr(*cond);
                self.out.push(' ');
                self.block_inline(body);
                self.out.push('\n');
            }
            StmtKind::Loop { label, body } => {
                self.line_start();
                self.out.push_str("loop ");
                self.label(label);
                self.block_inline(body);
                self.out.push('\n');
            }
            StmtKind::Match { subject, arms } => {
                self.line_start();
                self.out.push_str("match ");
                self.expr(*subject);
                self.out.push(' ');
                self.arm_block(arms);
                self.out.push('\n');
            }
            StmtKind::Return { value } => {
                self.line_start();
                self.out.push_str("return");
                if let Some(value) = value {
                    self.out.push(' ');
                    self.expr(*value);
                }
                self.out.push('\n');
            }
            StmtKind::Break { label, value } => {
                self.line_start();
                self.out.push_str("break");
                if let Some(label) = label {
                    let _ = write!(self.out, " @{label}");
                }
                if let Some(value) = value {
                    self.out.push(' ');
                    self.expr(*value);
                }
                self.out.push('\n');
            }
            StmtKind::Expr(expr) => {
                self.line_start();
                self.expr(*expr);
                self.out.push('\n');
            }
            StmtKind::Block(stmts) => {
                self.line_start();
                self.block_inline(stmts);
                self.out.push('\n');
            }
        }
    }

    fn label(&mut self, label: &Option<String>) {
        if let Some(label) = label {
            let _ = write!(self.out, "@{label} ");
        }
    }

    /// Render an if-statement including any `else if` chain.
    fn if_chain(&mut self, id: StmtId) {
        let StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } = &self.program.stmt(id).kind
        else {
            unreachable!("if_chain on a non-if statement");
        };
        self.out.push_str("if ");
        self.expr(*cond);
        self.out.push(' ');
        self.block_inline(then_branch);
        match else_branch {
            None => {}
            Some(ElseBranch::Block(stmts)) => {
                self.out.push_str(" else ");
                self.block_inline(stmts);
            }
            Some(ElseBranch::If(nested)) => {
                self.out.push_str(" else ");
                self.if_chain(*nested);
            }
        }
    }

    fn arm_block(&mut self, arms: &[MatchArm]) {
        self.out.push_str("{\n");
        self.indent += 1;
        for arm in arms {
            self.line_start();
            self.pat(arm.pattern);
            if let Some(guard) = arm.guard {
                self.out.push_str(" if ");
                self.expr(guard);
            }
            self.out.push_str(" => ");
            match &arm.body {
                ArmBody::Expr(expr) => self.expr(*expr),
                ArmBody::Block(stmts) => self.block_inline(stmts),
            }
            self.out.push('\n');
        }
        self.indent -= 1;
        self.line_start();
        self.out.push('}');
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn expr(&mut self, id: ExprId) {
        let expr = self.program.expr(id);
        match &expr.kind {
            ExprKind::Int { value, suffix } => {
                let _ = write!(self.out, "{value}");
                if let Some(suffix) = suffix {
                    self.out.push_str(suffix.as_str());
                }
            }
            ExprKind::Float { value, suffix } => {
                let _ = write!(self.out, "{value:?}");
                if let Some(suffix) = suffix {
                    self.out.push_str(suffix.as_str());
                }
            }
            ExprKind::Str(value) => {
                let _ = write!(self.out, "\"{}\"", escape(value));
            }
            ExprKind::Char(value) => {
                let _ = write!(self.out, "'{}'", escape_char(*value));
            }
            ExprKind::Bool(value) => {
                let _ = write!(self.out, "{value}");
            }
            ExprKind::Ident { name, generic_args } => {
                self.out.push_str(name);
                self.generic_args(generic_args);
            }
            ExprKind::SelfRef => self.out.push_str("self"),
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(*lhs);
                let _ = write!(self.out, " {} ", op.as_str());
                self.expr(*rhs);
            }
            ExprKind::Unary { op, operand } => {
                self.out.push_str(op.as_str());
                if matches!(op, crate::ast::UnaryOp::Not) {
                    self.out.push(' ');
                }
                self.expr(*operand);
            }
            ExprKind::Field { base, name } => {
                self.expr(*base);
                let _ = write!(self.out, ".{name}");
            }
            ExprKind::Index { base, index } => {
                self.expr(*base);
                self.out.push('[');
                self.expr(*index);
                self.out.push(']');
            }
            ExprKind::TupleField { base, index } => {
                self.expr(*base);
                let _ = write!(self.out, ".{index}");
            }
            ExprKind::Call {
                callee,
                generic_args,
                args,
            } => {
                self.expr(*callee);
                self.generic_args(generic_args);
                self.out.push('(');
                self.expr_list(args);
                self.out.push(')');
            }
            ExprKind::MethodCall {
                receiver,
                method,
                generic_args,
                args,
            } => {
                self.expr(*receiver);
                let _ = write!(self.out, ".{method}");
                self.generic_args(generic_args);
                self.out.push('(');
                self.expr_list(args);
                self.out.push(')');
            }
            ExprKind::Closure {
                params,
                ret,
                effect,
                body,
            } => {
                if *effect {
                    self.out.push_str("effect ");
                }
                self.out.push_str("fn(");
                for (i, param) in params.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    let _ = write!(self.out, "{}: ", param.name);
                    self.ty(param.ty);
                }
                self.out.push_str(") -> ");
                self.ty(*ret);
                self.out.push(' ');
                self.block_inline(body);
            }
            ExprKind::Match { subject, arms } => {
                self.out.push_str("match ");
                self.expr(*subject);
                self.out.push(' ');
                self.arm_block(arms);
            }
            ExprKind::Tuple(elements) => {
                self.out.push('(');
                self.expr_list(elements);
                if elements.len() == 1 {
                    self.out.push(',');
                }
                self.out.push(')');
            }
            ExprKind::Array(elements) => {
                self.out.push('[');
                self.expr_list(elements);
                self.out.push(']');
            }
            ExprKind::Record { ty, fields } => {
                if let Some(ty) = ty {
                    self.ty(*ty);
                    self.out.push(' ');
                }
                self.out.push_str("{ ");
                for (i, (name, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    let _ = write!(self.out, "{name}: ");
                    self.expr(*value);
                }
                self.out.push_str(" }");
            }
            ExprKind::Variant { name, args } => {
                self.out.push_str(name);
                if let Some(args) = args {
                    self.out.push('(');
                    self.expr_list(args);
                    self.out.push(')');
                }
            }
            ExprKind::Cast { expr, ty } => {
                self.expr(*expr);
                self.out.push_str(" as ");
                self.ty(*ty);
            }
            ExprKind::Range {
                start,
                end,
                inclusive,
            } => {
                if let Some(start) = start {
                    self.expr(*start);
                }
                self.out.push_str(if *inclusive { "..=" } else { ".." });
                if let Some(end) = end {
                    self.expr(*end);
                }
            }
            ExprKind::Group(inner) => {
                self.out.push('(');
                self.expr(*inner);
                self.out.push(')');
            }
            ExprKind::Interpolated(parts) => {
                self.out.push('"');
                for part in parts {
                    match part {
                        InterpPart::Lit(text) => self.out.push_str(&escape(text)),
                        InterpPart::Expr(expr) => {
                            self.out.push_str("${");
                            self.expr(*expr);
                            self.out.push('}');
                        }
                    }
                }
                self.out.push('"');
            }
            ExprKind::Try(inner) => {
                self.expr(*inner);
                self.out.push('?');
            }
            ExprKind::Coalesce { value, default } => {
                self.expr(*value);
                self.out.push_str(" ?? ");
                self.expr(*default);
            }
        }
    }

    fn expr_list(&mut self, exprs: &[ExprId]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.expr(*expr);
        }
    }

    fn generic_args(&mut self, args: &[TypeId]) {
        if args.is_empty() {
            return;
        }
        self.out.push('[');
        self.type_list(args);
        self.out.push(']');
    }

    // ── Types ──────────────────────────────────────────────────────────

    fn ty(&mut self, id: TypeId) {
        let ty = self.program.type_expr(id);
        match &ty.kind {
            TypeKind::Prim(prim) => self.out.push_str(prim.as_str()),
            TypeKind::Named(name) => self.out.push_str(name),
            TypeKind::Generic { base, args } => {
                self.out.push_str(base);
                self.out.push('[');
                self.type_list(args);
                self.out.push(']');
            }
            TypeKind::Path { segments, args } => {
                self.out.push_str(&segments.join("."));
                if !args.is_empty() {
                    self.out.push('[');
                    self.type_list(args);
                    self.out.push(']');
                }
            }
            TypeKind::Function {
                params,
                ret,
                effect,
            } => {
                if *effect {
                    self.out.push_str("effect ");
                }
                self.out.push_str("fn(");
                self.type_list(params);
                self.out.push_str(") -> ");
                self.ty(*ret);
            }
            TypeKind::Tuple(elements) => {
                self.out.push('(');
                self.type_list(elements);
                if elements.len() == 1 {
                    self.out.push(',');
                }
                self.out.push(')');
            }
            TypeKind::Array { elem, size } => {
                self.out.push('[');
                self.ty(*elem);
                if let Some(size) = size {
                    let _ = write!(self.out, "; {size}");
                }
                self.out.push(']');
            }
            TypeKind::SelfType => self.out.push_str("Self"),
            TypeKind::Io(inner) => {
                self.out.push_str("IO[");
                self.ty(*inner);
                self.out.push(']');
            }
            TypeKind::ResultType { ok, err } => {
                self.out.push_str("Result[");
                self.ty(*ok);
                self.out.push_str(", ");
                self.ty(*err);
                self.out.push(']');
            }
            TypeKind::OptionType(inner) => {
                self.out.push_str("Option[");
                self.ty(*inner);
                self.out.push(']');
            }
            TypeKind::Infer => self.out.push('_'),
        }
    }

    fn type_list(&mut self, types: &[TypeId]) {
        for (i, ty) in types.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.ty(*ty);
        }
    }

    // ── Patterns ───────────────────────────────────────────────────────

    fn pat(&mut self, id: PatId) {
        let pat = self.program.pat(id);
        match &pat.kind {
            PatternKind::Wildcard => self.out.push('_'),
            PatternKind::Ident { name, mutable } => {
                if *mutable {
                    self.out.push_str("var ");
                }
                self.out.push_str(name);
            }
            PatternKind::Typed { pattern, ty } => {
                self.pat(*pattern);
                self.out.push_str(": ");
                self.ty(*ty);
            }
            PatternKind::Literal(lit) => match lit {
                PatLit::Int(value) => {
                    let _ = write!(self.out, "{value}");
                }
                PatLit::Float(value) => {
                    let _ = write!(self.out, "{value:?}");
                }
                PatLit::Str(value) => {
                    let _ = write!(self.out, "\"{}\"", escape(value));
                }
                PatLit::Char(value) => {
                    let _ = write!(self.out, "'{}'", escape_char(*value));
                }
                PatLit::Bool(value) => {
                    let _ = write!(self.out, "{value}");
                }
            },
            PatternKind::Constructor { name, args } => {
                self.out.push_str(name);
                if let Some(args) = args {
                    self.out.push('(');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            self.out.push_str(", ");
                        }
                        self.pat(*arg);
                    }
                    self.out.push(')');
                }
            }
            PatternKind::Record {
                type_name,
                fields,
                rest,
            } => {
                if let Some(type_name) = type_name {
                    self.out.push_str(type_name);
                    self.out.push(' ');
                }
                self.out.push_str("{ ");
                for (i, (name, pat)) in fields.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    let _ = write!(self.out, "{name}: ");
                    self.pat(*pat);
                }
                if *rest {
                    if !fields.is_empty() {
                        self.out.push_str(", ");
                    }
                    self.out.push_str("..");
                }
                self.out.push_str(" }");
            }
            PatternKind::Tuple(elements) => {
                self.out.push('(');
                for (i, pat) in elements.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.pat(*pat);
                }
                self.out.push(')');
            }
            PatternKind::Or(alternatives) => {
                for (i, pat) in alternatives.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(" | ");
                    }
                    self.pat(*pat);
                }
            }
            PatternKind::Range {
                start,
                end,
                inclusive,
            } => {
                self.range_bound(start);
                self.out.push_str(if *inclusive { "..=" } else { ".." });
                self.range_bound(end);
            }
            PatternKind::Rest => self.out.push_str(".."),
        }
    }

    fn range_bound(&mut self, bound: &RangeBound) {
        match bound {
            RangeBound::Int(value) => {
                let _ = write!(self.out, "{value}");
            }
            RangeBound::Char(value) => {
                let _ = write!(self.out, "'{}'", escape_char(*value));
            }
        }
    }
}

/// Escape a string literal body for re-lexing.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a character literal body for re-lexing.
fn escape_char(c: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\t' => "\\t".to_string(),
        '\r' => "\\r".to_string(),
        '\\' => "\\\\".to_string(),
        '\'' => "\\'".to_string(),
        '\0' => "\\0".to_string(),
        _ => c.to_string(),
    }
}
