//! # Barbell Atom System
//!
//! Atoms are the primitive operations available to every script.
//!
//! ## Module Structure
//!
//! - **`helpers`**: Shared argument checking and extraction
//! - **`special_forms`**: `define`, `fn`, `let`, `if`, `cond`, `do`, `set!`, `while`, `and`, `or`, `quote`
//! - **`math`**: Arithmetic (`+`, `-`, `*`, `/`, `mod`, ...)
//! - **`logic`**: Comparison and logic (`=`, `<`, `not`, ...)
//! - **`collections`**: Lists and maps, including `map`, `filter`, `reduce`, `apply`
//! - **`string`**: String operations (`str`, `upper`, `split`, ...)
//! - **`external`**: `print`, `throw`, `now`, `rand`, `require`
//! - **`timers`**: The intercepted timer family
//!
//! The registration DSL (`suite`, `test`, ...) is not an atom: the runner binds it
//! into the bench file's own scope, so files loaded through `require` never see it.

use im::HashMap;
use std::rc::Rc;

use crate::ast::{AstNode, Span};
use crate::errors::ScriptError;
use crate::runtime::{EvaluationContext, Scope, Value};

// ============================================================================
// CORE TYPES
// ============================================================================

/// Eager atoms: receive evaluated argument values.
pub type EagerAtomFn =
    fn(args: &[Value], ctx: &mut EvaluationContext, span: Span) -> Result<Value, ScriptError>;

/// Special forms: receive unevaluated arguments and the calling scope.
pub type SpecialFormFn = fn(
    args: &[AstNode],
    scope: &Rc<Scope>,
    ctx: &mut EvaluationContext,
    span: Span,
) -> Result<Value, ScriptError>;

/// The atom representation supporting both calling conventions
#[derive(Clone, Copy)]
pub enum Atom {
    Eager(EagerAtomFn),
    SpecialForm(SpecialFormFn),
}

/// Registry for all atoms, inspectable at runtime.
#[derive(Clone, Default)]
pub struct AtomRegistry {
    pub atoms: HashMap<String, Atom>,
}

impl AtomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Atom> {
        self.atoms.get(name)
    }

    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.atoms.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn register(&mut self, name: &str, atom: Atom) {
        self.atoms.insert(name.to_string(), atom);
    }

    pub fn register_eager(&mut self, name: &str, func: EagerAtomFn) {
        self.register(name, Atom::Eager(func));
    }

    pub fn register_special_form(&mut self, name: &str, func: SpecialFormFn) {
        self.register(name, Atom::SpecialForm(func));
    }

    pub fn has(&self, name: &str) -> bool {
        self.atoms.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

// ============================================================================
// MODULAR ATOM IMPLEMENTATIONS
// ============================================================================

pub mod helpers;

pub mod collections;
pub mod external;
pub mod logic;
pub mod math;
pub mod special_forms;
pub mod string;
pub mod timers;

// ============================================================================
// UNIFIED REGISTRATION FUNCTION
// ============================================================================

/// Registers all standard atoms from all modules with the given registry.
pub fn register_all_atoms(registry: &mut AtomRegistry) {
    special_forms::register_special_forms(registry);
    math::register_math_atoms(registry);
    logic::register_logic_atoms(registry);
    collections::register_collection_atoms(registry);
    string::register_string_atoms(registry);
    external::register_external_atoms(registry);
    timers::register_timer_atoms(registry);
}

/// A registry holding every standard atom.
pub fn build_std_registry() -> AtomRegistry {
    let mut registry = AtomRegistry::new();
    register_all_atoms(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_registry_covers_the_sandbox_surface() {
        let registry = build_std_registry();
        for name in [
            "define", "fn", "lambda", "let", "if", "cond", "do", "set!", "while", "and", "or",
            "quote", "+", "=", "map", "filter", "reduce", "apply", "print", "throw", "require",
            "setTimeout", "setInterval", "setImmediate", "clearTimeout", "clearInterval",
            "clearImmediate",
        ] {
            assert!(registry.has(name), "missing atom {}", name);
        }
        assert!(!registry.has("suite"));
        assert!(!registry.has("test"));
    }
}
