//! Variable environment for Cinder
//!
//! An [`Environment`] is a handle onto a chain of scopes, innermost first.
//! Cloning the handle shares the chain: a function value keeps the chain it
//! was defined in alive and resolves names through it when called later.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{ErrorKind, Result};
use crate::value::Value;

/// One level of bindings
#[derive(Debug, Default)]
struct Scope {
    values: HashMap<String, Value>,
    parent: Option<Rc<RefCell<Scope>>>,
}

/// Chain of scopes with lexical lookup
#[derive(Debug, Clone)]
pub struct Environment {
    current: Rc<RefCell<Scope>>,
}

impl Environment {
    /// Create a new environment holding only the global scope
    pub fn new() -> Self {
        Self {
            current: Rc::new(RefCell::new(Scope::default())),
        }
    }

    /// Push a fresh innermost scope
    pub fn enter_scope(&mut self) {
        let parent = Rc::clone(&self.current);
        self.current = Rc::new(RefCell::new(Scope {
            values: HashMap::new(),
            parent: Some(parent),
        }));
    }

    /// Pop the innermost scope. The global scope is never popped.
    pub fn exit_scope(&mut self) {
        let parent = self.current.borrow().parent.clone();
        if let Some(parent) = parent {
            self.current = parent;
        }
    }

    /// Number of scopes in the chain, the global scope included
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut scope = self.current.borrow().parent.clone();
        while let Some(s) = scope {
            depth += 1;
            scope = s.borrow().parent.clone();
        }
        depth
    }

    /// Bind `name` in the innermost scope, replacing any existing binding.
    ///
    /// Used by the host to register builtins; scripts go through [`declare`].
    ///
    /// [`declare`]: Environment::declare
    pub fn define(&mut self, name: &str, value: Value) {
        self.current.borrow_mut().values.insert(name.to_string(), value);
    }

    /// Bind `name` in the innermost scope
    pub fn declare(&mut self, name: &str, value: Value) -> Result<()> {
        let mut scope = self.current.borrow_mut();
        if scope.values.contains_key(name) {
            return Err(ErrorKind::AlreadyDeclared(name.to_string()).into());
        }
        scope.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Rebind `name` in the nearest scope that declares it
    pub fn assign(&mut self, name: &str, value: Value) -> Result<()> {
        let mut scope = Some(Rc::clone(&self.current));
        while let Some(s) = scope {
            if let Some(slot) = s.borrow_mut().values.get_mut(name) {
                *slot = value;
                return Ok(());
            }
            scope = s.borrow().parent.clone();
        }
        Err(ErrorKind::NotDeclared(name.to_string()).into())
    }

    /// Look `name` up, innermost scope first
    pub fn get(&self, name: &str) -> Result<Value> {
        let mut scope = Some(Rc::clone(&self.current));
        while let Some(s) = scope {
            if let Some(value) = s.borrow().values.get(name) {
                return Ok(value.clone());
            }
            scope = s.borrow().parent.clone();
        }
        Err(ErrorKind::NotDeclared(name.to_string()).into())
    }

    /// Names bound in the innermost scope, sorted
    pub fn local_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.current.borrow().values.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
