use kira_common::span::Span;
use kira_parser::ast::DeclId;

use crate::scope::ScopeId;

/// A unique identifier for a resolved symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(pub u32);

/// Which loaded module unit a declaration lives in. Unit 0 is the root
/// program passed to `resolve`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(pub u32);

impl UnitId {
    pub const ROOT: UnitId = UnitId(0);
}

/// A reference to a declaration inside a specific unit's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    pub unit: UnitId,
    pub decl: DeclId,
}

/// The shape of a type definition, for quick queries without touching
/// the declaring unit's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeShape {
    Sum,
    Product,
    Alias,
}

/// What a symbol is.
#[derive(Debug, Clone)]
pub enum SymbolKind {
    /// A `let`/`var` binding or a function parameter.
    Variable {
        mutable: bool,
        /// Declared type, when the binding position carries one. Bindings
        /// introduced by destructuring patterns get their types from the
        /// checker instead.
        ty: Option<(UnitId, kira_parser::ast::TypeId)>,
    },
    /// A named function. Signature details live on the declaration.
    Function {
        decl: DeclRef,
        effect: bool,
        has_body: bool,
    },
    /// A `type` definition (sum, product, or alias).
    TypeDef { decl: DeclRef, shape: TypeShape },
    /// One variant of a sum type, usable as a constructor and pattern.
    Variant {
        owner: SymbolId,
        decl: DeclRef,
        index: usize,
    },
    /// A trait definition.
    Trait { decl: DeclRef },
    /// A module namespace; `scope` holds its members.
    Module {
        path: Vec<String>,
        scope: ScopeId,
        unit: Option<UnitId>,
    },
    /// A generic type parameter with optional bounds.
    TypeParam { bounds: Vec<String> },
    /// A name brought in by an import, pointing at the original symbol.
    ImportAlias { target: SymbolId, path: Vec<String> },
    /// A built-in function or constructor injected into the global scope.
    Builtin { effect: bool },
}

/// The resolved identity of a name.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub span: Span,
    pub public: bool,
    pub doc: Option<String>,
}

/// Flat storage for every symbol of a resolution session.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(
        &mut self,
        name: impl Into<String>,
        kind: SymbolKind,
        span: Span,
        public: bool,
    ) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            id,
            name: name.into(),
            kind,
            span,
            public,
            doc: None,
        });
        id
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    /// Follow import aliases to the symbol they name.
    pub fn resolve_alias(&self, id: SymbolId) -> SymbolId {
        let mut current = id;
        // Alias chains are short; imports of imports stay shallow.
        for _ in 0..16 {
            match &self.get(current).kind {
                SymbolKind::ImportAlias { target, .. } => current = *target,
                _ => return current,
            }
        }
        current
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }
}
