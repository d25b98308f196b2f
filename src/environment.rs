use std::{
    cell::RefCell,
    collections::HashSet,
    rc::Rc,
};

use indexmap::IndexMap;
use tracing::debug;

use crate::value::Value;

pub type EnvironmentRef = Rc<RefCell<Environment>>;

/// One lexical scope. Children hold a shared handle to their parent; a parent
/// never knows its children, so the chain is acyclic by construction.
#[derive(Debug, Default)]
pub struct Environment {
    parent: Option<EnvironmentRef>,
    bindings: IndexMap<String, Value>,
    constants: HashSet<String>,
}

impl Environment {
    pub fn new() -> EnvironmentRef {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn with_parent(parent: EnvironmentRef) -> EnvironmentRef {
        Rc::new(RefCell::new(Self {
            parent: Some(parent),
            ..Self::default()
        }))
    }

    /// Binds `name` in this scope, replacing any local binding. A constant
    /// marker, once set, is never cleared.
    pub fn declare(&mut self, name: impl Into<String>, value: Value, constant: bool) {
        let name = name.into();
        if constant {
            self.constants.insert(name.clone());
        }
        self.bindings.insert(name, value);
    }

    pub fn is_constant(&self, name: &str) -> bool {
        self.constants.contains(name)
    }

    pub fn local(&self, name: &str) -> Option<Value> {
        self.bindings.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Updates the nearest binding of `name`, or declares it locally when no
    /// scope in the chain has one. Writes to a constant are dropped.
    pub fn assign(env: &EnvironmentRef, name: &str, value: Value) {
        let mut current = Some(Rc::clone(env));
        while let Some(scope) = current {
            let mut scope_mut = scope.borrow_mut();
            if scope_mut.constants.contains(name) {
                debug!(name, "ignoring assignment to constant");
                return;
            }
            if let Some(slot) = scope_mut.bindings.get_mut(name) {
                *slot = value;
                return;
            }
            current = scope_mut.parent.clone();
        }
        env.borrow_mut().bindings.insert(name.to_string(), value);
    }

    /// Resolves `name` through the scope chain; missing names are `undef`.
    pub fn lookup(env: &EnvironmentRef, name: &str) -> Value {
        Self::resolve(env, name).unwrap_or_else(Value::undefined)
    }

    pub fn has(env: &EnvironmentRef, name: &str) -> bool {
        Self::resolve(env, name).is_some()
    }

    fn resolve(env: &EnvironmentRef, name: &str) -> Option<Value> {
        let mut current = Some(Rc::clone(env));
        while let Some(scope) = current {
            let scope_ref = scope.borrow();
            if let Some(value) = scope_ref.bindings.get(name) {
                return Some(value.clone());
            }
            current = scope_ref.parent.clone();
        }
        None
    }
}
