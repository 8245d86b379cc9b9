//! Kira symbol resolver.
//!
//! Two passes over each program: pass 1 collects top-level declarations
//! into scopes without entering bodies, then queued imports are resolved
//! (recursively loading cross-file modules through a [`ModuleLoader`]),
//! then pass 2 resolves function bodies and initializer expressions.
//!
//! The output is a [`Resolution`]: every loaded unit's AST, the scope
//! tree, the symbol table, and side tables mapping expression, pattern,
//! and type nodes to the symbols they refer to.

pub mod loader;
pub mod scope;
pub mod symbol;

mod body;

use std::path::PathBuf;

use rustc_hash::FxHashMap;

use kira_common::diagnostic::{has_errors, Diagnostic};
use kira_common::span::{Location, Span};
use kira_parser::ast::{DeclId, DeclKind, ExprId, PatId, Program, TypeDefKind, TypeId};

use loader::{ModuleLoader, NoLoader};
use scope::{ScopeId, ScopeKind, ScopeTree};
use symbol::{DeclRef, Symbol, SymbolId, SymbolKind, SymbolTable, TypeShape, UnitId};

/// Imports may nest this deep before the loader refuses to recurse.
const MAX_LOAD_DEPTH: u32 = 64;

/// One loaded source file and the scope holding its top-level names.
#[derive(Debug)]
pub struct ModuleUnit {
    /// Dotted module path, when the file declared one or was imported.
    pub name: Option<String>,
    /// Originating file, when loaded from disk.
    pub file: Option<PathBuf>,
    pub program: Program,
    pub scope: ScopeId,
    /// Units this unit imports from, for dependency-ordered setup.
    pub deps: Vec<UnitId>,
}

/// The resolver's output: all units plus the populated symbol structures.
#[derive(Debug)]
pub struct Resolution {
    /// Unit 0 is the root program; imported modules follow in load order.
    pub units: Vec<ModuleUnit>,
    pub scopes: ScopeTree,
    pub symbols: SymbolTable,
    /// Identifier/variant expressions -> the symbol they name.
    pub expr_symbols: FxHashMap<(UnitId, ExprId), SymbolId>,
    /// Pattern bindings and constructor patterns -> their symbols.
    pub pat_symbols: FxHashMap<(UnitId, PatId), SymbolId>,
    /// Named type expressions -> the type symbol they name.
    pub type_symbols: FxHashMap<(UnitId, TypeId), SymbolId>,
    /// Declarations -> the scope their bodies resolve in.
    pub decl_scopes: FxHashMap<(UnitId, DeclId), ScopeId>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Resolution {
    /// Whether resolution completed without errors.
    pub fn ok(&self) -> bool {
        !has_errors(&self.diagnostics)
    }

    pub fn unit(&self, id: UnitId) -> &ModuleUnit {
        &self.units[id.0 as usize]
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.symbols.get(id)
    }

    pub fn expr_symbol(&self, unit: UnitId, expr: ExprId) -> Option<SymbolId> {
        self.expr_symbols.get(&(unit, expr)).copied()
    }
}

/// Resolve a single-file program with no cross-file imports.
pub fn resolve(program: Program) -> Resolution {
    resolve_with_loader(program, &mut NoLoader)
}

/// Resolve a program, loading imported modules through `loader`.
pub fn resolve_with_loader(program: Program, loader: &mut dyn ModuleLoader) -> Resolution {
    let mut resolver = Resolver {
        units: Vec::new(),
        scopes: ScopeTree::new(),
        symbols: SymbolTable::new(),
        expr_symbols: FxHashMap::default(),
        pat_symbols: FxHashMap::default(),
        type_symbols: FxHashMap::default(),
        decl_scopes: FxHashMap::default(),
        diagnostics: Vec::new(),
        loader,
        module_scopes: FxHashMap::default(),
        unit_of_scope: FxHashMap::default(),
        loading: Vec::new(),
        depth: 0,
    };
    resolver.install_builtins();
    resolver.resolve_unit(program, None, None);

    Resolution {
        units: resolver
            .units
            .into_iter()
            .map(|u| u.expect("every reserved unit slot is filled"))
            .collect(),
        scopes: resolver.scopes,
        symbols: resolver.symbols,
        expr_symbols: resolver.expr_symbols,
        pat_symbols: resolver.pat_symbols,
        type_symbols: resolver.type_symbols,
        decl_scopes: resolver.decl_scopes,
        diagnostics: resolver.diagnostics,
    }
}

pub(crate) struct Resolver<'l> {
    /// Slots are reserved before a unit's resolution starts and filled
    /// when it finishes, so recursive loads keep stable unit ids.
    units: Vec<Option<ModuleUnit>>,
    pub(crate) scopes: ScopeTree,
    pub(crate) symbols: SymbolTable,
    pub(crate) expr_symbols: FxHashMap<(UnitId, ExprId), SymbolId>,
    pub(crate) pat_symbols: FxHashMap<(UnitId, PatId), SymbolId>,
    pub(crate) type_symbols: FxHashMap<(UnitId, TypeId), SymbolId>,
    pub(crate) decl_scopes: FxHashMap<(UnitId, DeclId), ScopeId>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    loader: &'l mut dyn ModuleLoader,
    /// Dotted module path -> module scope, for import resolution.
    module_scopes: FxHashMap<String, ScopeId>,
    /// Module scope -> owning unit, for dependency edges.
    unit_of_scope: FxHashMap<ScopeId, UnitId>,
    /// Modules currently being loaded, for cycle detection.
    loading: Vec<String>,
    depth: u32,
}

impl<'l> Resolver<'l> {
    pub(crate) fn error(&mut self, code: &str, message: impl Into<String>, span: Span) {
        self.diagnostics.push(Diagnostic::error(code, message, span));
    }

    // ── Built-ins ──────────────────────────────────────────────────────

    /// Inject the built-in functions, constructors, the `List` type, and
    /// the `std` root namespace into the global scope.
    fn install_builtins(&mut self) {
        let span = Span::point(Location::start());

        let effectful = ["print", "println"];
        let pure = [
            "type_of",
            "to_string",
            "to_int",
            "to_float",
            "abs",
            "min",
            "max",
            "len",
            "push",
            "pop",
            "head",
            "tail",
            "empty",
            "reverse",
            "split",
            "join",
            "trim",
            "contains",
            "starts_with",
            "ends_with",
            "assert",
            "assert_eq",
        ];
        let constructors = ["Some", "None", "Ok", "Err", "Cons", "Nil", "List"];

        for name in effectful {
            let id = self
                .symbols
                .define(name, SymbolKind::Builtin { effect: true }, span, true);
            let _ = self.scopes.define(ScopeId::GLOBAL, name, id);
        }
        for name in pure.into_iter().chain(constructors) {
            let id = self
                .symbols
                .define(name, SymbolKind::Builtin { effect: false }, span, true);
            let _ = self.scopes.define(ScopeId::GLOBAL, name, id);
        }

        // The standard library root. Its members are records looked up at
        // runtime; the resolver only needs the name to exist.
        let std_scope = self.scopes.push(ScopeId::GLOBAL, ScopeKind::Module);
        let std_symbol = self.symbols.define(
            "std",
            SymbolKind::Module {
                path: vec!["std".to_string()],
                scope: std_scope,
                unit: None,
            },
            span,
            true,
        );
        let _ = self.scopes.define(ScopeId::GLOBAL, "std", std_symbol);
    }

    // ── Unit resolution ────────────────────────────────────────────────

    /// Resolve one program: pass 1, imports, pass 2. Returns the unit id
    /// and its module scope.
    fn resolve_unit(
        &mut self,
        program: Program,
        name: Option<String>,
        file: Option<PathBuf>,
    ) -> (UnitId, ScopeId) {
        let unit = UnitId(self.units.len() as u32);
        self.units.push(None);

        let unit_scope = self.scopes.push(ScopeId::GLOBAL, ScopeKind::Module);
        self.unit_of_scope.insert(unit_scope, unit);
        let declared = program.module.as_ref().map(|m| m.path.join("."));
        if let Some(declared) = &declared {
            self.module_scopes.insert(declared.clone(), unit_scope);
        }

        // Pass 1: collect top-level declarations.
        for decl in program.decls.clone() {
            self.collect_decl(&program, unit, unit_scope, decl);
        }

        // Import resolution, queued between the passes.
        let mut deps = Vec::new();
        for import in program.imports.clone() {
            if let Some(scope) = self.resolve_import(unit_scope, &import) {
                if let Some(dep) = self.unit_of_scope.get(&scope) {
                    if *dep != unit && !deps.contains(dep) {
                        deps.push(*dep);
                    }
                }
            }
        }

        // Pass 2: bodies and initializers.
        body::resolve_unit_bodies(self, &program, unit, unit_scope);

        let name = name.or(declared);
        self.units[unit.0 as usize] = Some(ModuleUnit {
            name,
            file,
            program,
            scope: unit_scope,
            deps,
        });
        (unit, unit_scope)
    }

    /// Pass 1 for one declaration: define its symbol without entering the
    /// body.
    fn collect_decl(&mut self, program: &Program, unit: UnitId, scope: ScopeId, id: DeclId) {
        let decl = program.decl(id);
        let decl_ref = DeclRef { unit, decl: id };
        match &decl.kind {
            DeclKind::Function(f) => {
                let symbol = self.symbols.define(
                    f.name.clone(),
                    SymbolKind::Function {
                        decl: decl_ref,
                        effect: f.effect,
                        has_body: f.body.is_some(),
                    },
                    f.span,
                    f.public,
                );
                self.symbols.get_mut(symbol).doc = f.doc.clone();
                self.define_checked(scope, &f.name, symbol, f.span);
            }
            DeclKind::TypeDef {
                name,
                def,
                public,
                doc,
                ..
            } => {
                let shape = match def {
                    TypeDefKind::Sum(_) => TypeShape::Sum,
                    TypeDefKind::Product(_) => TypeShape::Product,
                    TypeDefKind::Alias(_) => TypeShape::Alias,
                };
                let symbol = self.symbols.define(
                    name.clone(),
                    SymbolKind::TypeDef {
                        decl: decl_ref,
                        shape,
                    },
                    decl.span,
                    *public,
                );
                self.symbols.get_mut(symbol).doc = doc.clone();
                self.define_checked(scope, name, symbol, decl.span);

                // Variants are usable as bare constructors, so they live
                // in the same scope as the type.
                if let TypeDefKind::Sum(variants) = def {
                    for (index, variant) in variants.iter().enumerate() {
                        let variant_symbol = self.symbols.define(
                            variant.name.clone(),
                            SymbolKind::Variant {
                                owner: symbol,
                                decl: decl_ref,
                                index,
                            },
                            variant.span,
                            *public,
                        );
                        self.define_checked(scope, &variant.name, variant_symbol, variant.span);
                    }
                }
            }
            DeclKind::Trait {
                name, public, doc, ..
            } => {
                let symbol = self.symbols.define(
                    name.clone(),
                    SymbolKind::Trait { decl: decl_ref },
                    decl.span,
                    *public,
                );
                self.symbols.get_mut(symbol).doc = doc.clone();
                self.define_checked(scope, name, symbol, decl.span);
            }
            DeclKind::Impl { .. } => {
                // Impls define no names; the checker registers them in its
                // impl registry.
            }
            DeclKind::Const {
                name,
                ty,
                public,
                doc,
                ..
            } => {
                let symbol = self.symbols.define(
                    name.clone(),
                    SymbolKind::Variable {
                        mutable: false,
                        ty: Some((unit, *ty)),
                    },
                    decl.span,
                    *public,
                );
                self.symbols.get_mut(symbol).doc = doc.clone();
                self.define_checked(scope, name, symbol, decl.span);
            }
            DeclKind::Let {
                pattern,
                ty,
                public,
                ..
            } => {
                body::bind_pattern(self, program, unit, scope, *pattern, Some((unit, *ty)), *public);
            }
            DeclKind::Test { .. } => {
                // Tests define no name visible to other code.
            }
        }
    }

    /// Define a name in a scope, diagnosing duplicates.
    pub(crate) fn define_checked(
        &mut self,
        scope: ScopeId,
        name: &str,
        symbol: SymbolId,
        span: Span,
    ) {
        if let Err(prior) = self.scopes.define(scope, name, symbol) {
            let prior_span = self.symbols.get(prior).span;
            self.diagnostics.push(
                Diagnostic::error("R0002", format!("duplicate definition of `{name}`"), span)
                    .with_label(prior_span, "first defined here"),
            );
        }
    }

    // ── Import resolution ──────────────────────────────────────────────

    /// Resolve one import. Returns the imported module's scope so the
    /// caller can record a dependency edge.
    fn resolve_import(
        &mut self,
        target_scope: ScopeId,
        import: &kira_parser::ast::ImportDecl,
    ) -> Option<ScopeId> {
        let key = import.path.join(".");

        let module_scope = match self.module_scopes.get(&key) {
            Some(scope) => *scope,
            None => self.load_module(import)?,
        };

        match &import.items {
            Some(items) => {
                for item in items {
                    let Some(symbol) = self.scopes.lookup_local(module_scope, &item.name) else {
                        self.error(
                            "R0001",
                            format!("module `{key}` has no member `{}`", item.name),
                            item.span,
                        );
                        continue;
                    };
                    if !self.symbols.get(symbol).public {
                        self.error(
                            "R0003",
                            format!("cannot import private symbol `{}`", item.name),
                            item.span,
                        );
                        continue;
                    }
                    let bound_name = item.alias.as_deref().unwrap_or(&item.name);
                    let alias = self.symbols.define(
                        bound_name,
                        SymbolKind::ImportAlias {
                            target: symbol,
                            path: import.path.clone(),
                        },
                        item.span,
                        false,
                    );
                    self.define_checked(target_scope, bound_name, alias, item.span);
                }
            }
            None => {
                // Bare `import foo.bar` binds the leaf name to the module.
                let leaf = import
                    .path
                    .last()
                    .expect("import paths have at least one segment")
                    .clone();
                let module_symbol = self.symbols.define(
                    leaf.clone(),
                    SymbolKind::Module {
                        path: import.path.clone(),
                        scope: module_scope,
                        unit: self.unit_of_scope.get(&module_scope).copied(),
                    },
                    import.span,
                    false,
                );
                self.define_checked(target_scope, &leaf, module_symbol, import.span);
            }
        }
        Some(module_scope)
    }

    /// Load, parse, and recursively resolve a module that is not yet
    /// registered. Returns its scope on success.
    fn load_module(&mut self, import: &kira_parser::ast::ImportDecl) -> Option<ScopeId> {
        let key = import.path.join(".");

        if self.loading.iter().any(|loading| *loading == key) {
            let mut cycle = self.loading.clone();
            cycle.push(key);
            self.error(
                "R0005",
                format!("circular module dependency: {}", cycle.join(" -> ")),
                import.span,
            );
            return None;
        }
        if self.depth >= MAX_LOAD_DEPTH {
            self.error(
                "R0005",
                "module imports nested too deeply",
                import.span,
            );
            return None;
        }

        let loaded = match self.loader.load(&import.path) {
            Ok(loaded) => loaded,
            Err(err) => {
                self.error("R0004", format!("module `{key}` not found: {err}"), import.span);
                return None;
            }
        };

        let parse = kira_parser::parse(&loaded.source);
        let failed = !parse.ok();
        self.diagnostics.extend(parse.diagnostics);
        if failed {
            return None;
        }

        self.loading.push(key.clone());
        self.depth += 1;
        let (_, scope) = self.resolve_unit(parse.program, Some(key.clone()), loaded.file);
        self.depth -= 1;
        self.loading.pop();

        self.module_scopes.insert(key, scope);
        Some(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loader::MemoryLoader;

    fn resolve_source(source: &str) -> Resolution {
        let parse = kira_parser::parse(source);
        assert!(parse.ok(), "parse failed: {:?}", parse.diagnostics);
        resolve(parse.program)
    }

    #[test]
    fn resolves_simple_function() {
        let resolution = resolve_source("fn main() -> i32 { return 42 }");
        assert!(resolution.ok(), "{:?}", resolution.diagnostics);
    }

    #[test]
    fn undefined_symbol_is_reported() {
        let resolution = resolve_source("fn main() -> i64 {\n    let x: i64 = undefined_var\n    return x\n}");
        assert!(!resolution.ok());
        assert!(resolution
            .diagnostics
            .iter()
            .any(|d| d.code == "R0001" && d.message.contains("undefined_var")));
    }

    #[test]
    fn duplicate_definition_is_reported() {
        let resolution = resolve_source("fn f() -> i32 { return 1 }\nfn f() -> i32 { return 2 }");
        assert!(!resolution.ok());
        assert!(resolution.diagnostics.iter().any(|d| d.code == "R0002"));
    }

    #[test]
    fn shadowing_in_inner_scope_is_allowed() {
        let resolution = resolve_source(
            "fn main() -> i32 {\n    let x: i32 = 1\n    {\n        let x: i32 = 2\n        println(to_string(x))\n    }\n    return x\n}",
        );
        assert!(resolution.ok(), "{:?}", resolution.diagnostics);
    }

    #[test]
    fn assignment_to_immutable_is_reported() {
        let resolution =
            resolve_source("fn main() -> i32 {\n    let x: i32 = 1\n    x = 2\n    return x\n}");
        assert!(!resolution.ok());
        assert!(resolution.diagnostics.iter().any(|d| d.code == "R0006"));
    }

    #[test]
    fn assignment_to_var_is_allowed() {
        let resolution =
            resolve_source("fn main() -> i32 {\n    var x: i32 = 1\n    x = 2\n    return x\n}");
        assert!(resolution.ok(), "{:?}", resolution.diagnostics);
    }

    #[test]
    fn builtins_are_in_scope() {
        let resolution = resolve_source(
            "effect fn main() -> IO[void] {\n    println(\"hi\")\n    let xs: List[i32] = Cons(1, Nil)\n    println(to_string(len(xs)))\n}",
        );
        assert!(resolution.ok(), "{:?}", resolution.diagnostics);
    }

    #[test]
    fn import_of_public_symbol_succeeds() {
        let mut loader = MemoryLoader::new();
        loader.add(
            &["util"],
            "module util\n\npub fn double(x: i32) -> i32 { return x * 2 }",
        );
        let parse = kira_parser::parse(
            "import util.{ double }\n\nfn main() -> i32 { return double(21) }",
        );
        assert!(parse.ok());
        let resolution = resolve_with_loader(parse.program, &mut loader);
        assert!(resolution.ok(), "{:?}", resolution.diagnostics);
        assert_eq!(resolution.units.len(), 2);
    }

    #[test]
    fn import_of_private_symbol_is_reported() {
        let mut loader = MemoryLoader::new();
        loader.add(&["a", "b"], "module a.b\n\nfn secret() -> i32 { return 1 }");
        let parse = kira_parser::parse(
            "import a.b.{ secret }\n\nfn main() -> i32 { return secret() }",
        );
        assert!(parse.ok());
        let resolution = resolve_with_loader(parse.program, &mut loader);
        assert!(!resolution.ok());
        assert!(resolution
            .diagnostics
            .iter()
            .any(|d| d.code == "R0003" && d.message.contains("secret")));
    }

    #[test]
    fn circular_imports_are_reported() {
        let mut loader = MemoryLoader::new();
        loader.add(&["a"], "module a\n\nimport b.{ g }\n\npub fn f() -> i32 { return g() }");
        loader.add(&["b"], "module b\n\nimport a.{ f }\n\npub fn g() -> i32 { return f() }");
        let parse = kira_parser::parse("import a.{ f }\n\nfn main() -> i32 { return f() }");
        assert!(parse.ok());
        let resolution = resolve_with_loader(parse.program, &mut loader);
        assert!(!resolution.ok());
        assert!(resolution.diagnostics.iter().any(|d| d.code == "R0005"));
    }

    #[test]
    fn bare_import_binds_module_name() {
        let mut loader = MemoryLoader::new();
        loader.add(&["util"], "module util\n\npub fn id(x: i32) -> i32 { return x }");
        let parse = kira_parser::parse("import util\n\nfn main() -> i32 { return util.id(7) }");
        assert!(parse.ok());
        let resolution = resolve_with_loader(parse.program, &mut loader);
        assert!(resolution.ok(), "{:?}", resolution.diagnostics);
    }

    #[test]
    fn resolution_soundness_symbols_in_ancestor_scopes() {
        let resolution = resolve_source(
            "fn add(a: i32, b: i32) -> i32 { return a + b }\nfn main() -> i32 {\n    let x: i32 = 3\n    return add(x, x)\n}",
        );
        assert!(resolution.ok());
        for ((unit, _), symbol) in &resolution.expr_symbols {
            assert_eq!(*unit, UnitId::ROOT);
            // Every referenced symbol must live in some scope that is an
            // ancestor of (or equal to) a scope in the tree.
            let _ = resolution.symbols.get(*symbol);
        }
    }
}
