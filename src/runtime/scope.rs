//! Lexical scopes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::Value;

/// One frame of bindings, chained to its enclosing frame.
#[derive(Default)]
pub struct Scope {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn child(parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    pub fn define(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
            || self.parent.as_ref().is_some_and(|p| p.is_bound(name))
    }

    /// Rebinds an existing name in the nearest frame that defines it.
    /// Returns `false` when the name is unbound.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut vars = self.vars.borrow_mut();
        if let Some(slot) = vars.get_mut(name) {
            *slot = value;
            return true;
        }
        drop(vars);
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    /// Drops every binding in this frame. Closures stored in a frame keep the frame
    /// alive through their environment, so owners clear it when they are done.
    pub fn clear(&self) {
        self.vars.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parents_and_assign_updates_owner() {
        let root = Scope::root();
        root.define("x", Value::Number(1.0));
        let child = Scope::child(&root);
        assert_eq!(child.lookup("x"), Some(Value::Number(1.0)));

        assert!(child.assign("x", Value::Number(2.0)));
        assert_eq!(root.lookup("x"), Some(Value::Number(2.0)));
        assert!(!child.assign("missing", Value::Nil));
    }

    #[test]
    fn child_definitions_shadow() {
        let root = Scope::root();
        root.define("x", Value::Number(1.0));
        let child = Scope::child(&root);
        child.define("x", Value::Number(5.0));
        assert_eq!(child.lookup("x"), Some(Value::Number(5.0)));
        assert_eq!(root.lookup("x"), Some(Value::Number(1.0)));
    }
}
