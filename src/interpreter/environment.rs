//=============================================
// krscript/interpreter/environment.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Lexical scoping for the Kr interpreter
// Objective: Provide the chained name-to-value mapping shared between call
//            frames and closures
//=============================================

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::symbol::Symbol;

use super::value::Value;

/// Environments are shared: every closure co-owns the environment it
/// captured, and call frames hold theirs for the duration of the call.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<Symbol, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Environment::default()))
    }

    pub fn with_enclosing(enclosing: EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }))
    }

    /// Insert into this environment, shadowing any outer binding.
    pub fn define(&mut self, name: Symbol, value: Value) {
        self.values.insert(name, value);
    }

    /// Walk the chain until the name is found.
    pub fn get(env: &EnvRef, name: &str) -> Option<Value> {
        let scope = env.borrow();
        if let Some(value) = scope.values.get(name) {
            return Some(value.clone());
        }
        let enclosing = scope.enclosing.clone();
        drop(scope);
        enclosing.and_then(|parent| Environment::get(&parent, name))
    }

    /// Overwrite the nearest existing binding; false when the name is
    /// undefined anywhere in the chain.
    pub fn assign(env: &EnvRef, name: &str, value: Value) -> bool {
        let mut scope = env.borrow_mut();
        if scope.values.contains_key(name) {
            scope.values.insert(Symbol::from(name), value);
            return true;
        }
        let enclosing = scope.enclosing.clone();
        drop(scope);
        match enclosing {
            Some(parent) => Environment::assign(&parent, name, value),
            None => false,
        }
    }
}

//=============================================
// End Of krscript/interpreter/environment.rs
//=============================================
