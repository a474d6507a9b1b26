//! Variable scoping for render-time evaluation
//!
//! Scopes form a tree: foreach iterations and `scope` environments get a
//! child scope whose lookups fall through to the parent. All scope records
//! live in one arena owned by [`EvalContext`]; entering a child hands back
//! a handle for restoring the previous scope, so iteration-local bindings
//! vanish without any copying.

use std::collections::HashMap;

use crate::parse::fmt_number;

/// A variable value: numeric when evaluation succeeded, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Str(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Str(s) => s.trim().parse().ok(),
        }
    }
}

impl std::fmt::Display for Value {
    /// Integral floats print without the fractional part so substituted
    /// names stay stable (`P1`, not `P1.0`).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Num(n) => f.write_str(&fmt_number(*n)),
            Value::Str(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Default)]
struct ScopeRecord {
    parent: Option<usize>,
    variables: HashMap<String, Value>,
    coordinates: HashMap<String, (f64, f64)>,
}

/// Opaque handle to a scope, returned by [`EvalContext::enter_child`] and
/// consumed by [`EvalContext::restore`].
#[derive(Debug, Clone, Copy)]
pub struct ScopeHandle(usize);

/// Arena of parent-linked scopes with one active scope at a time.
#[derive(Debug)]
pub struct EvalContext {
    scopes: Vec<ScopeRecord>,
    current: usize,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

impl EvalContext {
    pub fn new() -> Self {
        EvalContext {
            scopes: vec![ScopeRecord::default()],
            current: 0,
        }
    }

    /// Bind a variable in the active scope. A leading backslash on the name
    /// is stripped, so `\i` and `i` are the same binding.
    pub fn set_variable(&mut self, name: &str, value: Value) {
        let name = normalize(name);
        self.scopes[self.current]
            .variables
            .insert(name.to_string(), value);
    }

    /// Look a variable up, walking the parent chain.
    pub fn get_variable(&self, name: &str) -> Option<&Value> {
        let name = normalize(name);
        let mut scope = Some(self.current);
        while let Some(idx) = scope {
            let record = &self.scopes[idx];
            if let Some(value) = record.variables.get(name) {
                return Some(value);
            }
            scope = record.parent;
        }
        None
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.get_variable(name).is_some()
    }

    /// Scope-local named point (distinct from the renderer's global
    /// coordinate table).
    pub fn set_coordinate(&mut self, name: &str, position: (f64, f64)) {
        self.scopes[self.current]
            .coordinates
            .insert(name.to_string(), position);
    }

    pub fn get_coordinate(&self, name: &str) -> Option<(f64, f64)> {
        let mut scope = Some(self.current);
        while let Some(idx) = scope {
            let record = &self.scopes[idx];
            if let Some(position) = record.coordinates.get(name) {
                return Some(*position);
            }
            scope = record.parent;
        }
        None
    }

    /// Enter a fresh child of the active scope. The returned handle restores
    /// the previous scope; bindings made in the child become unreachable
    /// after [`restore`](Self::restore).
    pub fn enter_child(&mut self) -> ScopeHandle {
        let previous = self.current;
        self.scopes.push(ScopeRecord {
            parent: Some(previous),
            variables: HashMap::new(),
            coordinates: HashMap::new(),
        });
        self.current = self.scopes.len() - 1;
        ScopeHandle(previous)
    }

    pub fn restore(&mut self, handle: ScopeHandle) {
        self.current = handle.0;
    }

    /// Flatten the active chain into one map, nearest scope winning.
    pub fn all_variables(&self) -> HashMap<String, Value> {
        let mut chain = Vec::new();
        let mut scope = Some(self.current);
        while let Some(idx) = scope {
            chain.push(idx);
            scope = self.scopes[idx].parent;
        }
        let mut all = HashMap::new();
        for idx in chain.into_iter().rev() {
            for (name, value) in &self.scopes[idx].variables {
                all.insert(name.clone(), value.clone());
            }
        }
        all
    }
}

fn normalize(name: &str) -> &str {
    name.strip_prefix('\\').unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backslash_is_normalized() {
        let mut ctx = EvalContext::new();
        ctx.set_variable("\\i", Value::Num(3.0));
        assert_eq!(ctx.get_variable("i"), Some(&Value::Num(3.0)));
        assert_eq!(ctx.get_variable("\\i"), Some(&Value::Num(3.0)));
    }

    #[test]
    fn child_shadows_parent() {
        let mut ctx = EvalContext::new();
        ctx.set_variable("x", Value::Num(1.0));
        let handle = ctx.enter_child();
        ctx.set_variable("x", Value::Num(2.0));
        assert_eq!(ctx.get_variable("x"), Some(&Value::Num(2.0)));
        ctx.restore(handle);
        assert_eq!(ctx.get_variable("x"), Some(&Value::Num(1.0)));
    }

    #[test]
    fn child_bindings_do_not_leak() {
        let mut ctx = EvalContext::new();
        let handle = ctx.enter_child();
        ctx.set_variable("inner", Value::Num(9.0));
        ctx.restore(handle);
        assert!(!ctx.has_variable("inner"));
    }

    #[test]
    fn parent_lookup_falls_through() {
        let mut ctx = EvalContext::new();
        ctx.set_variable("r", Value::Num(1.5));
        let _inner = ctx.enter_child();
        assert_eq!(ctx.get_variable("r"), Some(&Value::Num(1.5)));
    }

    #[test]
    fn all_variables_merges_with_override() {
        let mut ctx = EvalContext::new();
        ctx.set_variable("a", Value::Num(1.0));
        ctx.set_variable("b", Value::Num(2.0));
        let _inner = ctx.enter_child();
        ctx.set_variable("b", Value::Str("two".to_string()));
        let all = ctx.all_variables();
        assert_eq!(all.get("a"), Some(&Value::Num(1.0)));
        assert_eq!(all.get("b"), Some(&Value::Str("two".to_string())));
    }

    #[test]
    fn scope_coordinates() {
        let mut ctx = EvalContext::new();
        ctx.set_coordinate("A", (1.0, 2.0));
        let handle = ctx.enter_child();
        assert_eq!(ctx.get_coordinate("A"), Some((1.0, 2.0)));
        ctx.set_coordinate("B", (3.0, 4.0));
        ctx.restore(handle);
        assert_eq!(ctx.get_coordinate("B"), None);
    }

    #[test]
    fn value_display_trims_integral_floats() {
        assert_eq!(Value::Num(1.0).to_string(), "1");
        assert_eq!(Value::Num(2.5).to_string(), "2.5");
        assert_eq!(Value::Str("abc".to_string()).to_string(), "abc");
    }
}
