use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::Value;

/// One lexical scope: a name table plus an optional link to the enclosing
/// scope. Scopes are shared (`Rc<RefCell<…>>`) between execution frames and
/// the closures that captured them; a closure keeps its defining chain
/// alive after the defining frame returns.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Self {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    /// Insert or overwrite a binding in this scope only. A definition in a
    /// child scope shadows, but never removes, an enclosing binding.
    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// Look up a name, walking outward through the enclosing chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        self.enclosing
            .as_ref()
            .and_then(|enclosing| enclosing.borrow().get(name))
    }

    /// Overwrite the first binding of `name` found walking outward.
    /// Returns false if no scope in the chain defines it; the caller
    /// decides whether that is an error or an implicit definition.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => false,
        }
    }
}
