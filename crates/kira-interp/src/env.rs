//! Environments: ordered name-to-binding frames with lexical parents.
//!
//! Every environment for an execution session lives in one [`EnvArena`],
//! addressed by [`EnvId`]. Closures capture the id of their defining
//! frame; the arena keeps every frame alive until session teardown, so
//! captures never dangle and the whole store is freed in bulk.

use std::rc::Rc;

use crate::value::Value;

/// Index of an environment frame in the session arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(pub u32);

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}

/// One lexical frame: ordered bindings plus a parent pointer.
#[derive(Debug, Default)]
pub struct Environment {
    pub parent: Option<EnvId>,
    bindings: Vec<(Rc<str>, Binding)>,
}

/// Why an assignment through the environment chain failed.
#[derive(Debug, PartialEq, Eq)]
pub enum AssignError {
    NotFound,
    Immutable,
}

/// The session's environment store.
#[derive(Debug, Default)]
pub struct EnvArena {
    envs: Vec<Environment>,
}

impl EnvArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh frame with the given parent.
    pub fn push(&mut self, parent: Option<EnvId>) -> EnvId {
        let id = EnvId(self.envs.len() as u32);
        self.envs.push(Environment {
            parent,
            bindings: Vec::new(),
        });
        id
    }

    /// Define a binding in a frame. Later definitions of the same name in
    /// the same frame shadow earlier ones (lookup scans from the back).
    pub fn define(&mut self, env: EnvId, name: impl AsRef<str>, value: Value, mutable: bool) {
        self.envs[env.0 as usize]
            .bindings
            .push((Rc::from(name.as_ref()), Binding { value, mutable }));
    }

    /// Look a name up through the parent chain.
    pub fn lookup(&self, env: EnvId, name: &str) -> Option<Value> {
        let mut current = Some(env);
        while let Some(id) = current {
            let frame = &self.envs[id.0 as usize];
            if let Some((_, binding)) = frame
                .bindings
                .iter()
                .rev()
                .find(|(n, _)| n.as_ref() == name)
            {
                return Some(binding.value.clone());
            }
            current = frame.parent;
        }
        None
    }

    /// Assign through the chain; only mutable bindings accept new values.
    pub fn assign(&mut self, env: EnvId, name: &str, value: Value) -> Result<(), AssignError> {
        let mut current = Some(env);
        while let Some(id) = current {
            let frame = &mut self.envs[id.0 as usize];
            if let Some((_, binding)) = frame
                .bindings
                .iter_mut()
                .rev()
                .find(|(n, _)| n.as_ref() == name)
            {
                if !binding.mutable {
                    return Err(AssignError::Immutable);
                }
                binding.value = value;
                return Ok(());
            }
            current = frame.parent;
        }
        Err(AssignError::NotFound)
    }

    /// The bindings of one frame, in definition order.
    pub fn bindings(&self, env: EnvId) -> impl Iterator<Item = (&Rc<str>, &Binding)> {
        self.envs[env.0 as usize]
            .bindings
            .iter()
            .map(|(name, binding)| (name, binding))
    }

    pub fn len(&self) -> usize {
        self.envs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.envs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parents() {
        let mut arena = EnvArena::new();
        let outer = arena.push(None);
        let inner = arena.push(Some(outer));
        arena.define(outer, "x", Value::Int(1), false);
        assert!(matches!(arena.lookup(inner, "x"), Some(Value::Int(1))));
        assert!(arena.lookup(inner, "y").is_none());
    }

    #[test]
    fn shadowing_resolves_to_innermost() {
        let mut arena = EnvArena::new();
        let outer = arena.push(None);
        let inner = arena.push(Some(outer));
        arena.define(outer, "x", Value::Int(1), false);
        arena.define(inner, "x", Value::Int(2), false);
        assert!(matches!(arena.lookup(inner, "x"), Some(Value::Int(2))));
        assert!(matches!(arena.lookup(outer, "x"), Some(Value::Int(1))));
    }

    #[test]
    fn assignment_respects_mutability() {
        let mut arena = EnvArena::new();
        let env = arena.push(None);
        arena.define(env, "a", Value::Int(1), false);
        arena.define(env, "b", Value::Int(1), true);
        assert_eq!(arena.assign(env, "a", Value::Int(2)), Err(AssignError::Immutable));
        assert_eq!(arena.assign(env, "b", Value::Int(2)), Ok(()));
        assert_eq!(arena.assign(env, "c", Value::Int(2)), Err(AssignError::NotFound));
        assert!(matches!(arena.lookup(env, "b"), Some(Value::Int(2))));
    }

    #[test]
    fn frames_survive_for_captures() {
        // A closure may outlive the block that created its frame; the
        // arena never frees frames mid-session.
        let mut arena = EnvArena::new();
        let block = arena.push(None);
        arena.define(block, "captured", Value::Int(7), false);
        // The block "ends" here, but the frame is still addressable.
        assert!(matches!(arena.lookup(block, "captured"), Some(Value::Int(7))));
    }
}
