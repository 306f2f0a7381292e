//! The isolated evaluation context for bench files.
//!
//! A [`Sandbox`] owns the atom registry and the output sink. Loading a file yields a
//! [`Script`]: parsed source plus a fresh root scope. Nothing from the host process
//! is reachable from a script except the standard atoms and whatever the caller
//! binds into the script's scope (the runner binds the registration DSL).

use std::fs;
use std::path::Path;
use std::rc::Rc;

use crate::ast::{AstNode, Span};
use crate::atoms::{build_std_registry, AtomRegistry};
use crate::errors::{BenchError, ScriptError, SourceContext};
use crate::runtime::eval::DEFAULT_MAX_DEPTH;
use crate::runtime::{evaluate_body, EvaluationContext, Scope, SharedOutput, Value};
use crate::syntax::parse;

pub struct Sandbox {
    registry: Rc<AtomRegistry>,
    output: SharedOutput,
    max_depth: usize,
}

impl Sandbox {
    pub fn new(output: SharedOutput) -> Self {
        Self {
            registry: Rc::new(build_std_registry()),
            output,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &AtomRegistry {
        &self.registry
    }

    /// Reads and parses a script file.
    pub fn load(&self, path: &Path) -> Result<Script, BenchError> {
        let text = fs::read_to_string(path).map_err(|e| BenchError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let source = SourceContext::from_path(path, text.as_str());
        Ok(self.prepare(&text, source)?)
    }

    /// Parses script text that does not come from a file.
    pub fn load_source(&self, name: &str, text: &str) -> Result<Script, ScriptError> {
        self.prepare(text, SourceContext::from_file(name, text))
    }

    fn prepare(&self, text: &str, source: SourceContext) -> Result<Script, ScriptError> {
        let nodes = parse(text, &source)?;
        let mut context =
            EvaluationContext::new(Rc::clone(&self.registry), source, Rc::clone(&self.output));
        context.max_depth = self.max_depth;
        Ok(Script {
            context,
            scope: Scope::root(),
            nodes,
        })
    }
}

/// A parsed script with its own root scope, ready to run.
pub struct Script {
    context: EvaluationContext,
    scope: Rc<Scope>,
    nodes: Vec<AstNode>,
}

impl Script {
    /// Makes `value` visible to the script under `name`.
    pub fn bind(&self, name: &str, value: Value) {
        self.scope.define(name, value);
    }

    /// Evaluates every top-level form, returning the last value.
    pub fn run(&mut self) -> Result<Value, ScriptError> {
        evaluate_body(&self.nodes, &self.scope, &mut self.context)
    }

    /// Calls a function value produced by this script with no arguments.
    pub fn call(&mut self, callable: &Value, span: Span) -> Result<Value, ScriptError> {
        self.context.apply(callable, &[], span)
    }

    pub fn source(&self) -> &SourceContext {
        &self.context.source
    }
}

impl Drop for Script {
    fn drop(&mut self) {
        // Functions defined at top level hold the root scope alive.
        self.scope.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::runtime::output;

    /// Evaluates `text` in a fresh sandbox with output discarded.
    pub(crate) fn eval_str(text: &str) -> Result<Value, ScriptError> {
        let sandbox = Sandbox::new(output::null());
        sandbox.load_source("test", text)?.run()
    }

    #[test]
    fn bindings_are_visible_to_the_script() {
        let sandbox = Sandbox::new(output::null());
        let mut script = sandbox.load_source("test", "(twice 21)").unwrap();
        script.bind(
            "twice",
            Value::native("twice", |args, _ctx, _span| match args {
                [Value::Number(n)] => Ok(Value::Number(n * 2.0)),
                _ => Ok(Value::Nil),
            }),
        );
        assert_eq!(script.run().unwrap(), Value::Number(42.0));
    }

    #[test]
    fn host_capabilities_are_not_exposed() {
        for name in ["suite", "test", "process", "env", "fs", "exit"] {
            let error = eval_str(name).unwrap_err();
            assert!(
                matches!(error.kind, ErrorKind::UndefinedSymbol { .. }),
                "{} should be unbound",
                name
            );
        }
    }

    #[test]
    fn functions_can_be_called_after_the_script_ran() {
        let sandbox = Sandbox::new(output::null());
        let mut script = sandbox
            .load_source("test", "(define hits 0) (fn () (set! hits (+ hits 1)) hits)")
            .unwrap();
        let callable = script.run().unwrap();
        script.call(&callable, Span::default()).unwrap();
        assert_eq!(script.call(&callable, Span::default()).unwrap(), Value::Number(2.0));
    }

    #[test]
    fn parse_errors_surface_on_load() {
        let sandbox = Sandbox::new(output::null());
        assert!(sandbox.load_source("test", "(oops").is_err());
        let missing = sandbox.load(Path::new("/definitely/not/here.bb"));
        assert!(matches!(missing, Err(BenchError::Io { .. })));
    }

    #[test]
    fn depth_limit_is_configurable() {
        let sandbox = Sandbox::new(output::null()).with_max_depth(32);
        let mut script = sandbox
            .load_source("test", "(define (f n) (if (= n 0) 0 (+ 1 (f (- n 1))))) (f 100)")
            .unwrap();
        let error = script.run().unwrap_err();
        assert_eq!(error.kind, ErrorKind::RecursionLimit);
    }
}
