//! Kira tree-walking interpreter.
//!
//! Evaluates a checked program. A session owns one environment arena, one
//! global environment with the built-ins and the `std` namespace, and one
//! frame per loaded module; `run` locates `main` and calls it. Resolution
//! and type checking are assumed to have succeeded.

pub mod builtins;
pub mod env;
pub mod error;
pub mod stdlib;
pub mod value;

mod eval;

use std::io::Write;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use kira_common::span::{Location, Span};
use kira_parser::ast::{DeclKind, ExprId, PrimType, Program, TypeDefKind, VariantPayload};
use kira_resolver::symbol::UnitId;
use kira_resolver::Resolution;
use kira_typeck::{Ty, TypeckResult};

use env::{EnvArena, EnvId};
use error::{Abort, EvalResult, RuntimeError, RuntimeErrorKind};
use value::{Closure, ClosureBody, ProgramRef, Value};

/// Non-tail calls may nest this deep before the session aborts with a
/// stack-overflow error. Tail calls do not consume frames.
const MAX_CALL_DEPTH: u32 = 2500;

/// One execution session: interpreter state plus its arena.
pub struct Interp<'r> {
    res: &'r Resolution,
    /// Checker output, when the caller ran the full pipeline. Arithmetic
    /// and call results are range-checked against the declared integer
    /// widths recorded here.
    typeck: Option<&'r TypeckResult>,
    /// The language-level standard-library prelude (list/option/result).
    prelude: Program,
    pub envs: EnvArena,
    /// Global frame: built-ins, constructors, `std`.
    globals: EnvId,
    /// Per-unit module frames, indexed by `UnitId`.
    unit_envs: Vec<EnvId>,
    /// Runtime method table: (receiver type key, method name) -> closure.
    impl_methods: FxHashMap<(String, String), Rc<Closure>>,
    out: Box<dyn Write>,
    depth: u32,
}

impl<'r> Interp<'r> {
    /// Create a session writing program output to standard output.
    pub fn new(res: &'r Resolution) -> Interp<'r> {
        Self::with_output(res, Box::new(std::io::stdout()))
    }

    /// Create a session with a custom output sink (used by tests).
    pub fn with_output(res: &'r Resolution, out: Box<dyn Write>) -> Interp<'r> {
        let mut interp = Interp {
            res,
            typeck: None,
            prelude: Program::default(),
            envs: EnvArena::new(),
            globals: EnvId(0),
            unit_envs: Vec::new(),
            impl_methods: FxHashMap::default(),
            out,
            depth: 0,
        };
        interp.globals = interp.envs.push(None);
        builtins::install(&mut interp);
        stdlib::install(&mut interp);
        interp.register_units();
        interp
    }

    /// Attach the checker's result so evaluation honors declared integer
    /// widths. The full pipeline (`kirac run`, the prompt's `:load`)
    /// always does this.
    pub fn with_typeck(mut self, typeck: &'r TypeckResult) -> Interp<'r> {
        self.typeck = Some(typeck);
        self
    }

    /// The declared integer type of an expression, when the checker
    /// assigned one. Prelude code carries no checker types.
    pub(crate) fn static_int_prim(&self, program: value::ProgramRef, expr: ExprId) -> Option<PrimType> {
        let value::ProgramRef::Unit(unit) = program else {
            return None;
        };
        match self.typeck?.expr_ty(unit, expr) {
            Some(Ty::Prim(p)) if p.is_integer() => Some(*p),
            _ => None,
        }
    }

    pub(crate) fn globals(&self) -> EnvId {
        self.globals
    }

    pub(crate) fn resolution(&self) -> &'r Resolution {
        self.res
    }

    pub(crate) fn write_out(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
    }

    pub(crate) fn flush_out(&mut self) {
        let _ = self.out.flush();
    }

    // ── Node access (owned clones, uniform for units and the prelude) ──

    pub(crate) fn node_expr(
        &self,
        program: ProgramRef,
        id: kira_parser::ast::ExprId,
    ) -> kira_parser::ast::Expr {
        match program {
            ProgramRef::Unit(unit) => self.res.unit(unit).program.expr(id).clone(),
            ProgramRef::Prelude => self.prelude.expr(id).clone(),
        }
    }

    pub(crate) fn node_stmt(
        &self,
        program: ProgramRef,
        id: kira_parser::ast::StmtId,
    ) -> kira_parser::ast::Stmt {
        match program {
            ProgramRef::Unit(unit) => self.res.unit(unit).program.stmt(id).clone(),
            ProgramRef::Prelude => self.prelude.stmt(id).clone(),
        }
    }

    pub(crate) fn node_pat(
        &self,
        program: ProgramRef,
        id: kira_parser::ast::PatId,
    ) -> kira_parser::ast::Pattern {
        match program {
            ProgramRef::Unit(unit) => self.res.unit(unit).program.pat(id).clone(),
            ProgramRef::Prelude => self.prelude.pat(id).clone(),
        }
    }

    pub(crate) fn node_type(
        &self,
        program: ProgramRef,
        id: kira_parser::ast::TypeId,
    ) -> kira_parser::ast::TypeExpr {
        match program {
            ProgramRef::Unit(unit) => self.res.unit(unit).program.type_expr(id).clone(),
            ProgramRef::Prelude => self.prelude.type_expr(id).clone(),
        }
    }

    /// Install the parsed prelude program. Called once from `stdlib`.
    pub(crate) fn set_prelude(&mut self, program: Program) {
        self.prelude = program;
    }

    pub(crate) fn prelude_program(&self) -> &Program {
        &self.prelude
    }

    // ── Module registration ────────────────────────────────────────────

    /// Register every unit's declarations in dependency order: a unit's
    /// imports must be initialized before its own initializers run.
    fn register_units(&mut self) {
        let unit_count = self.res.units.len();
        self.unit_envs = (0..unit_count)
            .map(|_| self.envs.push(Some(self.globals)))
            .collect();

        for unit_index in topo_order(self.res) {
            self.register_unit(UnitId(unit_index as u32));
        }
    }

    fn register_unit(&mut self, unit: UnitId) {
        let env = self.unit_envs[unit.0 as usize];
        let program_ref = ProgramRef::Unit(unit);
        let decls: Vec<kira_parser::ast::DeclId> = self.res.unit(unit).program.decls.clone();

        // Phase 1: functions, constructors, and impl methods, so that
        // initializers and imports can see them regardless of order.
        for decl_id in &decls {
            let decl = self.res.unit(unit).program.decl(*decl_id).clone();
            match &decl.kind {
                DeclKind::Function(f) => {
                    if let Some(body) = &f.body {
                        let closure = Value::Closure(Rc::new(Closure {
                            name: Some(Rc::from(f.name.as_str())),
                            params: f.params.iter().map(|p| Rc::from(p.name.as_str())).collect(),
                            body: ClosureBody::Block {
                                program: program_ref,
                                stmts: body.clone(),
                            },
                            env: Some(env),
                            effect: f.effect,
                        }));
                        self.envs.define(env, &f.name, closure, false);
                    }
                }
                DeclKind::TypeDef { name, def, .. } => {
                    if let TypeDefKind::Sum(variants) = def {
                        for variant in variants {
                            self.register_variant(env, name, variant);
                        }
                    }
                }
                DeclKind::Impl {
                    trait_name,
                    target,
                    methods,
                    ..
                } => {
                    let Some(key) = self.type_key_of(unit, *target) else {
                        continue;
                    };
                    for method in methods {
                        let Some(body) = &method.body else { continue };
                        let closure = Rc::new(Closure {
                            name: Some(Rc::from(method.name.as_str())),
                            params: method
                                .params
                                .iter()
                                .map(|p| Rc::from(p.name.as_str()))
                                .collect(),
                            body: ClosureBody::Block {
                                program: program_ref,
                                stmts: body.clone(),
                            },
                            env: Some(env),
                            effect: method.effect,
                        });
                        self.impl_methods
                            .insert((key.clone(), method.name.clone()), closure);
                    }
                    // Trait default methods fill the gaps.
                    if let Some(trait_name) = trait_name {
                        self.register_trait_defaults(unit, trait_name, &key, methods);
                    }
                }
                _ => {}
            }
        }

        // Phase 2: imported names, before any initializer can call them.
        let imports = self.res.unit(unit).program.imports.clone();
        for import in &imports {
            self.bind_import(unit, env, import);
        }

        // Phase 3: top-level consts and lets, in source order.
        for decl_id in &decls {
            let decl = self.res.unit(unit).program.decl(*decl_id).clone();
            match &decl.kind {
                DeclKind::Const { name, value, .. } => {
                    match self.eval_expr(program_ref, env, *value) {
                        Ok(v) => self.envs.define(env, name, v, false),
                        Err(_) => {
                            // Initializer failures surface when the name
                            // is read as an undefined variable.
                        }
                    }
                }
                DeclKind::Let { pattern, init, .. } => {
                    if let Ok(v) = self.eval_expr(program_ref, env, *init) {
                        let _ = self.bind_pattern(program_ref, env, *pattern, &v);
                    }
                }
                _ => {}
            }
        }
    }

    fn register_variant(
        &mut self,
        env: EnvId,
        type_name: &str,
        variant: &kira_parser::ast::VariantDef,
    ) {
        match &variant.payload {
            VariantPayload::Unit => {
                let value = Value::variant(type_name, &variant.name, None);
                self.envs.define(env, &variant.name, value, false);
            }
            VariantPayload::Tuple(tys) => {
                let ctor = Value::Closure(Rc::new(Closure {
                    name: Some(Rc::from(variant.name.as_str())),
                    params: (0..tys.len()).map(|i| Rc::from(format!("_{i}").as_str())).collect(),
                    body: ClosureBody::Ctor {
                        type_name: Rc::from(type_name),
                        variant: Rc::from(variant.name.as_str()),
                        arity: tys.len(),
                        record_fields: None,
                    },
                    env: None,
                    effect: false,
                }));
                self.envs.define(env, &variant.name, ctor, false);
            }
            VariantPayload::Record(fields) => {
                let field_names: Vec<Rc<str>> =
                    fields.iter().map(|f| Rc::from(f.name.as_str())).collect();
                let ctor = Value::Closure(Rc::new(Closure {
                    name: Some(Rc::from(variant.name.as_str())),
                    params: field_names.clone(),
                    body: ClosureBody::Ctor {
                        type_name: Rc::from(type_name),
                        variant: Rc::from(variant.name.as_str()),
                        arity: fields.len(),
                        record_fields: Some(field_names),
                    },
                    env: None,
                    effect: false,
                }));
                self.envs.define(env, &variant.name, ctor, false);
            }
        }
    }

    /// Use a trait's default method bodies for methods an impl omits.
    fn register_trait_defaults(
        &mut self,
        unit: UnitId,
        trait_name: &str,
        key: &str,
        provided: &[kira_parser::ast::FnDecl],
    ) {
        for (other_index, other_unit) in self.res.units.iter().enumerate() {
            for decl_id in &other_unit.program.decls {
                let decl = other_unit.program.decl(*decl_id);
                let DeclKind::Trait { name, methods, .. } = &decl.kind else {
                    continue;
                };
                if name != trait_name {
                    continue;
                }
                for method in methods {
                    let Some(body) = &method.body else { continue };
                    if provided.iter().any(|m| m.name == method.name) {
                        continue;
                    }
                    let trait_env = self.unit_envs[other_index];
                    let closure = Rc::new(Closure {
                        name: Some(Rc::from(method.name.as_str())),
                        params: method
                            .params
                            .iter()
                            .map(|p| Rc::from(p.name.as_str()))
                            .collect(),
                        body: ClosureBody::Block {
                            program: ProgramRef::Unit(UnitId(other_index as u32)),
                            stmts: body.clone(),
                        },
                        env: Some(trait_env),
                        effect: method.effect,
                    });
                    self.impl_methods
                        .insert((key.to_string(), method.name.clone()), closure);
                }
            }
        }
        let _ = unit;
    }

    /// Runtime dispatch key for an impl target type. Integer widths are
    /// erased at runtime, so all integer targets share the `int` key.
    fn type_key_of(&self, unit: UnitId, ty: kira_parser::ast::TypeId) -> Option<String> {
        use kira_parser::ast::TypeKind;
        let ty = self.res.unit(unit).program.type_expr(ty);
        Some(match &ty.kind {
            TypeKind::Prim(p) => {
                if p.is_integer() {
                    "int".to_string()
                } else if p.is_float() {
                    "float".to_string()
                } else {
                    p.as_str().to_string()
                }
            }
            TypeKind::Named(name) => name.clone(),
            TypeKind::Generic { base, .. } => base.clone(),
            TypeKind::Path { segments, .. } => segments.last()?.clone(),
            _ => return None,
        })
    }

    /// Runtime dispatch key for a receiver value.
    pub(crate) fn type_key_of_value(&self, value: &Value) -> String {
        match value {
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            _ => value.type_name(),
        }
    }

    pub(crate) fn impl_method(&self, key: &str, method: &str) -> Option<Rc<Closure>> {
        self.impl_methods
            .get(&(key.to_string(), method.to_string()))
            .cloned()
    }

    fn bind_import(&mut self, unit: UnitId, env: EnvId, import: &kira_parser::ast::ImportDecl) {
        let key = import.path.join(".");
        let Some(source_index) = self
            .res
            .units
            .iter()
            .position(|u| u.name.as_deref() == Some(key.as_str()))
        else {
            return;
        };
        let source_env = self.unit_envs[source_index];
        let source_scope = self.res.units[source_index].scope;
        let _ = unit;

        match &import.items {
            Some(items) => {
                for item in items {
                    if let Some(value) = self.envs.lookup(source_env, &item.name) {
                        let bound = item.alias.as_deref().unwrap_or(&item.name);
                        self.envs.define(env, bound, value, false);
                    }
                }
            }
            None => {
                // Bind the leaf name to a module record of the public
                // bindings, so `util.id(7)` is plain field access.
                let mut fields = Vec::new();
                let names: Vec<(Rc<str>, Value)> = self
                    .envs
                    .bindings(source_env)
                    .map(|(name, binding)| (name.clone(), binding.value.clone()))
                    .collect();
                for (name, value) in names {
                    let public = self
                        .res
                        .scopes
                        .lookup_local(source_scope, &name)
                        .map(|symbol| self.res.symbol(symbol).public)
                        .unwrap_or(false);
                    if public {
                        fields.push((name, value));
                    }
                }
                let record = Value::Record(Rc::new(value::RecordValue {
                    type_name: None,
                    fields: std::cell::RefCell::new(fields),
                }));
                let leaf = import.path.last().expect("non-empty import path");
                self.envs.define(env, leaf, record, false);
            }
        }
    }

    // ── Execution ──────────────────────────────────────────────────────

    /// Locate `main` in the root unit and call it with no arguments.
    pub fn run(&mut self) -> Result<Value, RuntimeError> {
        let root_env = self.unit_envs[UnitId::ROOT.0 as usize];
        let span = Span::point(Location::start());
        let Some(main) = self.envs.lookup(root_env, "main") else {
            return Err(RuntimeError::new(
                RuntimeErrorKind::UndefinedVariable,
                "program has no `main` function",
                span,
            ));
        };
        let result = self.call_value(main, Vec::new(), span);
        self.flush_out();
        match result {
            Ok(value) => Ok(value),
            Err(Abort::Propagate(value)) => Ok(value),
            Err(Abort::Error(err)) => Err(err),
        }
    }

    /// Run every `test "name" { ... }` declaration in the root unit.
    /// Returns (name, failure) pairs for tests that failed.
    pub fn run_tests(&mut self) -> Vec<(String, RuntimeError)> {
        let root_env = self.unit_envs[UnitId::ROOT.0 as usize];
        let decls = self.res.unit(UnitId::ROOT).program.decls.clone();
        let mut failures = Vec::new();
        for decl_id in decls {
            let decl = self.res.unit(UnitId::ROOT).program.decl(decl_id).clone();
            let DeclKind::Test { name, body } = &decl.kind else {
                continue;
            };
            let env = self.envs.push(Some(root_env));
            match self.exec_block(ProgramRef::Unit(UnitId::ROOT), env, body) {
                Ok(_) => {}
                Err(Abort::Propagate(_)) => {}
                Err(Abort::Error(err)) => failures.push((name.clone(), err)),
            }
        }
        failures
    }

    pub(crate) fn enter_call(&mut self, span: Span) -> EvalResult<()> {
        self.depth += 1;
        if self.depth > MAX_CALL_DEPTH {
            self.depth -= 1;
            return Err(Abort::Error(RuntimeError::new(
                RuntimeErrorKind::StackOverflow,
                "call stack overflow",
                span,
            )));
        }
        Ok(())
    }

    pub(crate) fn leave_call(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Dependency-first ordering of units (depth-first postorder).
fn topo_order(res: &Resolution) -> Vec<usize> {
    fn visit(res: &Resolution, index: usize, seen: &mut Vec<bool>, out: &mut Vec<usize>) {
        if seen[index] {
            return;
        }
        seen[index] = true;
        for dep in &res.units[index].deps {
            visit(res, dep.0 as usize, seen, out);
        }
        out.push(index);
    }
    let mut seen = vec![false; res.units.len()];
    let mut out = Vec::with_capacity(res.units.len());
    for index in 0..res.units.len() {
        visit(res, index, &mut seen, &mut out);
    }
    out
}
