//! Lexical scopes.
//!
//! Scopes form a parent-linked chain shared by reference, so a closure keeps
//! its defining scope alive and observes later writes to it. Function scopes
//! additionally carry a [`Frame`] with the call's `this`, `super` home and
//! arguments; arrow functions have no frame and resolve those outward.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::{ClassData, JsValue, Obj};

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: JsValue,
    pub mutable: bool,
}

/// Per-call state of a non-arrow function.
pub struct Frame {
    /// `None` in a derived constructor until `super(...)` returns.
    pub this: RefCell<Option<JsValue>>,
    pub home: Option<Obj>,
    pub new_target: Option<Obj>,
    /// Set for class constructors; `super(...)` initialises through it.
    pub class: Option<Rc<ClassData>>,
    pub args: Vec<JsValue>,
}

impl Frame {
    pub fn with_this(this: JsValue) -> Self {
        Self {
            this: RefCell::new(Some(this)),
            home: None,
            new_target: None,
            class: None,
            args: Vec::new(),
        }
    }
}

/// Why an assignment to a name failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignError {
    Undeclared,
    Constant,
}

struct ScopeData {
    bindings: HashMap<String, Binding>,
    parent: Option<Scope>,
    frame: Option<Rc<Frame>>,
    /// Function bodies and the module body receive `var` declarations.
    var_scope: bool,
}

#[derive(Clone)]
pub struct Scope(Rc<RefCell<ScopeData>>);

impl Scope {
    fn from_data(data: ScopeData) -> Self {
        Scope(Rc::new(RefCell::new(data)))
    }

    /// The outermost scope, holding the built-in globals.
    pub fn new_root() -> Self {
        Self::from_data(ScopeData {
            bindings: HashMap::new(),
            parent: None,
            frame: None,
            var_scope: true,
        })
    }

    /// A block scope.
    pub fn child(&self) -> Scope {
        Self::from_data(ScopeData {
            bindings: HashMap::new(),
            parent: Some(self.clone()),
            frame: None,
            var_scope: false,
        })
    }

    /// A function (or module) body scope.
    pub fn function_child(&self, frame: Option<Frame>) -> Scope {
        Self::from_data(ScopeData {
            bindings: HashMap::new(),
            parent: Some(self.clone()),
            frame: frame.map(Rc::new),
            var_scope: true,
        })
    }

    /// A sibling holding copies of `names`, for per-iteration `let` bindings.
    pub fn copy_for_iteration(&self, names: &[String]) -> Scope {
        let data = self.0.borrow();
        let bindings = names
            .iter()
            .filter_map(|name| data.bindings.get(name).map(|b| (name.clone(), b.clone())))
            .collect();
        Self::from_data(ScopeData {
            bindings,
            parent: data.parent.clone(),
            frame: None,
            var_scope: false,
        })
    }

    /// Create (or shadow) a binding in this scope.
    pub fn declare(&self, name: &str, value: JsValue, mutable: bool) {
        self.0
            .borrow_mut()
            .bindings
            .insert(name.to_string(), Binding { value, mutable });
    }

    /// Hoist a `var` to the nearest function scope; redeclaring keeps the value.
    pub fn declare_var(&self, name: &str) {
        let target = self.var_scope();
        let mut data = target.0.borrow_mut();
        data.bindings.entry(name.to_string()).or_insert(Binding {
            value: JsValue::Undefined,
            mutable: true,
        });
    }

    pub fn var_scope(&self) -> Scope {
        let mut scope = self.clone();
        loop {
            let next = {
                let data = scope.0.borrow();
                if data.var_scope {
                    None
                } else {
                    data.parent.clone()
                }
            };
            match next {
                Some(parent) => scope = parent,
                None => return scope,
            }
        }
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.0.borrow().bindings.contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<JsValue> {
        let mut scope = self.clone();
        loop {
            let next = {
                let data = scope.0.borrow();
                if let Some(binding) = data.bindings.get(name) {
                    return Some(binding.value.clone());
                }
                data.parent.clone()
            };
            scope = next?;
        }
    }

    /// Write to the nearest binding of `name`.
    pub fn assign(&self, name: &str, value: JsValue) -> Result<(), AssignError> {
        let mut scope = self.clone();
        loop {
            let next = {
                let mut data = scope.0.borrow_mut();
                if let Some(binding) = data.bindings.get_mut(name) {
                    if !binding.mutable {
                        return Err(AssignError::Constant);
                    }
                    binding.value = value;
                    return Ok(());
                }
                data.parent.clone()
            };
            match next {
                Some(parent) => scope = parent,
                None => return Err(AssignError::Undeclared),
            }
        }
    }

    /// The nearest function frame and the scope that owns it.
    pub fn frame(&self) -> Option<(Rc<Frame>, Scope)> {
        let mut scope = self.clone();
        loop {
            let next = {
                let data = scope.0.borrow();
                if let Some(frame) = &data.frame {
                    return Some((frame.clone(), scope.clone()));
                }
                data.parent.clone()
            };
            scope = next?;
        }
    }

    /// Drop every binding, breaking reference cycles through closures.
    pub fn clear(&self) {
        self.0.borrow_mut().bindings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_outward_and_shadowing_wins() {
        let root = Scope::new_root();
        root.declare("x", JsValue::Number(1.0), true);
        let inner = root.child();
        assert_eq!(inner.lookup("x").and_then(|v| v.as_number()), Some(1.0));
        inner.declare("x", JsValue::Number(2.0), true);
        assert_eq!(inner.lookup("x").and_then(|v| v.as_number()), Some(2.0));
        assert_eq!(root.lookup("x").and_then(|v| v.as_number()), Some(1.0));
    }

    #[test]
    fn assign_respects_constness() {
        let root = Scope::new_root();
        root.declare("k", JsValue::Null, false);
        let inner = root.child();
        assert_eq!(inner.assign("k", JsValue::Undefined), Err(AssignError::Constant));
        assert_eq!(inner.assign("missing", JsValue::Undefined), Err(AssignError::Undeclared));
    }

    #[test]
    fn var_hoists_past_blocks() {
        let module = Scope::new_root().function_child(None);
        let block = module.child().child();
        block.declare_var("v");
        assert!(module.has_own("v"));
        assert!(!block.has_own("v"));
    }

    #[test]
    fn iteration_copies_are_independent() {
        let outer = Scope::new_root();
        let loop_scope = outer.child();
        loop_scope.declare("i", JsValue::Number(0.0), true);
        let first = loop_scope.copy_for_iteration(&["i".to_string()]);
        first.assign("i", JsValue::Number(5.0)).unwrap();
        assert_eq!(loop_scope.lookup("i").and_then(|v| v.as_number()), Some(0.0));
        assert_eq!(first.lookup("i").and_then(|v| v.as_number()), Some(5.0));
    }
}
