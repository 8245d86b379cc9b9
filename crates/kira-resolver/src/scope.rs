use rustc_hash::FxHashMap;

use crate::symbol::SymbolId;

/// A unique identifier for a scope. Scope 0 is always the global scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);
}

/// What kind of lexical region a scope represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Module,
    Function,
    Block,
    TraitDef,
    ImplBlock,
    GenericParams,
}

/// A lexical region associating names with symbols.
#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub names: FxHashMap<String, SymbolId>,
    pub children: Vec<ScopeId>,
}

/// The scope tree for a resolution session. Built during resolution,
/// traversed by the type checker.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    /// Create a tree containing only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                id: ScopeId::GLOBAL,
                kind: ScopeKind::Global,
                parent: None,
                names: FxHashMap::default(),
                children: Vec::new(),
            }],
        }
    }

    /// Create a child scope and return its id.
    pub fn push(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            id,
            kind,
            parent: Some(parent),
            names: FxHashMap::default(),
            children: Vec::new(),
        });
        self.scopes[parent.0 as usize].children.push(id);
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Define a name in a scope. On a duplicate, returns the previously
    /// defined symbol as the error.
    pub fn define(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        symbol: SymbolId,
    ) -> Result<(), SymbolId> {
        let name = name.into();
        let names = &mut self.scopes[scope.0 as usize].names;
        if let Some(prior) = names.get(&name) {
            return Err(*prior);
        }
        names.insert(name, symbol);
        Ok(())
    }

    /// Look up a name starting from `scope` and walking outward through
    /// parents. Shadowing works because inner scopes are consulted first.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(symbol) = scope.names.get(name) {
                return Some(*symbol);
            }
            current = scope.parent;
        }
        None
    }

    /// Look up a name in exactly one scope, without walking parents.
    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.get(scope).names.get(name).copied()
    }

    /// Whether `ancestor` is `scope` itself or one of its ancestors.
    pub fn is_ancestor_or_self(&self, ancestor: ScopeId, scope: ScopeId) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).parent;
        }
        false
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_scope_is_zero() {
        let tree = ScopeTree::new();
        assert_eq!(tree.get(ScopeId::GLOBAL).kind, ScopeKind::Global);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn lookup_walks_parent_chain() {
        let mut tree = ScopeTree::new();
        let inner = tree.push(ScopeId::GLOBAL, ScopeKind::Function);
        tree.define(ScopeId::GLOBAL, "x", SymbolId(0)).unwrap();
        assert_eq!(tree.lookup(inner, "x"), Some(SymbolId(0)));
        assert_eq!(tree.lookup_local(inner, "x"), None);
    }

    #[test]
    fn shadowing_prefers_inner_scope() {
        let mut tree = ScopeTree::new();
        let inner = tree.push(ScopeId::GLOBAL, ScopeKind::Block);
        tree.define(ScopeId::GLOBAL, "x", SymbolId(0)).unwrap();
        tree.define(inner, "x", SymbolId(1)).unwrap();
        assert_eq!(tree.lookup(inner, "x"), Some(SymbolId(1)));
        assert_eq!(tree.lookup(ScopeId::GLOBAL, "x"), Some(SymbolId(0)));
    }

    #[test]
    fn duplicate_definition_reports_prior() {
        let mut tree = ScopeTree::new();
        tree.define(ScopeId::GLOBAL, "x", SymbolId(0)).unwrap();
        assert_eq!(tree.define(ScopeId::GLOBAL, "x", SymbolId(1)), Err(SymbolId(0)));
    }

    #[test]
    fn ancestry() {
        let mut tree = ScopeTree::new();
        let a = tree.push(ScopeId::GLOBAL, ScopeKind::Function);
        let b = tree.push(a, ScopeKind::Block);
        assert!(tree.is_ancestor_or_self(ScopeId::GLOBAL, b));
        assert!(tree.is_ancestor_or_self(a, b));
        assert!(tree.is_ancestor_or_self(b, b));
        assert!(!tree.is_ancestor_or_self(b, a));
    }
}
