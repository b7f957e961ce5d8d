//! Scope chain: variables, constants, user types, procedures, and functions.
//!
//! A scope owns five maps plus a parent pointer. All identifiers are stored upper-case-folded.
//! Children borrow their parent through an `Rc`; shadowing never mutates a parent's bindings.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Stmt, TypeSpec};
use crate::error::EvalError;
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct TypeDef {
    pub fields: Vec<(String, TypeSpec)>,
}

#[derive(Debug)]
pub struct Scope {
    variables: RefCell<HashMap<String, Value>>,
    constants: RefCell<HashMap<String, Value>>,
    types: RefCell<HashMap<String, Rc<TypeDef>>>,
    procedures: RefCell<HashMap<String, Rc<Stmt>>>,
    functions: RefCell<HashMap<String, Rc<Stmt>>>,
    parent: Option<Rc<Scope>>,
    pub strict_mode: bool,
}

impl Scope {
    pub fn new(strict_mode: bool) -> Rc<Self> {
        Rc::new(Scope {
            variables: RefCell::new(HashMap::new()),
            constants: RefCell::new(HashMap::new()),
            types: RefCell::new(HashMap::new()),
            procedures: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
            parent: None,
            strict_mode,
        })
    }

    pub fn with_parent(parent: &Rc<Scope>) -> Rc<Self> {
        Rc::new(Scope {
            variables: RefCell::new(HashMap::new()),
            constants: RefCell::new(HashMap::new()),
            types: RefCell::new(HashMap::new()),
            procedures: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
            strict_mode: parent.strict_mode,
        })
    }

    pub fn define_variable(&self, name: &str, value: Value) -> Result<(), EvalError> {
        let key = name.to_uppercase();
        if self.constants.borrow().contains_key(&key) {
            return Err(EvalError::ConstantReassignment(name.to_string()));
        }
        self.variables.borrow_mut().insert(key, value);
        Ok(())
    }

    pub fn define_constant(&self, name: &str, value: Value) -> Result<(), EvalError> {
        let key = name.to_uppercase();
        if self.constants.borrow().contains_key(&key) || self.variables.borrow().contains_key(&key) {
            return Err(EvalError::ConstantReassignment(name.to_string()));
        }
        self.constants.borrow_mut().insert(key, value);
        Ok(())
    }

    pub fn define_type(&self, name: &str, def: TypeDef) {
        self.types.borrow_mut().insert(name.to_uppercase(), Rc::new(def));
    }

    pub fn define_procedure(&self, name: &str, def: Rc<Stmt>) {
        self.procedures.borrow_mut().insert(name.to_uppercase(), def);
    }

    pub fn define_function(&self, name: &str, def: Rc<Stmt>) {
        self.functions.borrow_mut().insert(name.to_uppercase(), def);
    }

    pub fn get_variable(&self, name: &str) -> Result<Value, EvalError> {
        let key = name.to_uppercase();
        if let Some(v) = self.constants.borrow().get(&key) {
            return Ok(v.clone());
        }
        if let Some(v) = self.variables.borrow().get(&key) {
            return Ok(v.clone());
        }
        if let Some(parent) = &self.parent {
            return parent.get_variable(name);
        }
        Err(EvalError::UndeclaredVariable(name.to_string()))
    }

    /// Resolves `name` along the scope chain and writes at its defining scope; in lax mode an
    /// unresolved name is implicitly declared in the current scope.
    pub fn set_variable(&self, name: &str, value: Value) -> Result<(), EvalError> {
        let key = name.to_uppercase();
        if self.constants.borrow().contains_key(&key) {
            return Err(EvalError::ConstantReassignment(name.to_string()));
        }
        if self.variables.borrow().contains_key(&key) {
            self.variables.borrow_mut().insert(key, value);
            return Ok(());
        }
        if let Some(parent) = &self.parent {
            if parent.has_variable(name) {
                return parent.set_variable(name, value);
            }
        }
        if self.strict_mode {
            return Err(EvalError::UndeclaredVariable(name.to_string()));
        }
        self.variables.borrow_mut().insert(key, value);
        Ok(())
    }

    pub fn has_variable(&self, name: &str) -> bool {
        let key = name.to_uppercase();
        if self.constants.borrow().contains_key(&key) || self.variables.borrow().contains_key(&key) {
            return true;
        }
        self.parent.as_ref().map(|p| p.has_variable(name)).unwrap_or(false)
    }

    pub fn get_type(&self, name: &str) -> Result<Rc<TypeDef>, EvalError> {
        let key = name.to_uppercase();
        if let Some(t) = self.types.borrow().get(&key) {
            return Ok(Rc::clone(t));
        }
        if let Some(parent) = &self.parent {
            return parent.get_type(name);
        }
        Err(EvalError::UnknownType(name.to_string()))
    }

    pub fn get_procedure(&self, name: &str) -> Result<Rc<Stmt>, EvalError> {
        let key = name.to_uppercase();
        if let Some(p) = self.procedures.borrow().get(&key) {
            return Ok(Rc::clone(p));
        }
        if let Some(parent) = &self.parent {
            return parent.get_procedure(name);
        }
        Err(EvalError::UnknownRoutine(name.to_string()))
    }

    pub fn get_function(&self, name: &str) -> Result<Rc<Stmt>, EvalError> {
        let key = name.to_uppercase();
        if let Some(f) = self.functions.borrow().get(&key) {
            return Ok(Rc::clone(f));
        }
        if let Some(parent) = &self.parent {
            return parent.get_function(name);
        }
        Err(EvalError::UnknownRoutine(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_and_get_variable() {
        let scope = Scope::new(false);
        scope.define_variable("x", Value::Integer(42)).unwrap();
        assert_eq!(scope.get_variable("x").unwrap(), Value::Integer(42));
    }

    #[test]
    fn identifiers_are_case_folded() {
        let scope = Scope::new(false);
        scope.define_variable("Count", Value::Integer(1)).unwrap();
        assert_eq!(scope.get_variable("COUNT").unwrap(), Value::Integer(1));
        assert_eq!(scope.get_variable("count").unwrap(), Value::Integer(1));
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let scope = Scope::new(false);
        assert!(scope.get_variable("missing").is_err());
    }

    #[test]
    fn child_shadows_without_mutating_parent() {
        let parent = Scope::new(false);
        parent.define_variable("x", Value::Integer(1)).unwrap();

        let child = Scope::with_parent(&parent);
        child.define_variable("x", Value::Integer(2)).unwrap();

        assert_eq!(child.get_variable("x").unwrap(), Value::Integer(2));
        assert_eq!(parent.get_variable("x").unwrap(), Value::Integer(1));
    }

    #[test]
    fn set_variable_writes_through_to_parent() {
        let parent = Scope::new(false);
        parent.define_variable("x", Value::Integer(1)).unwrap();

        let child = Scope::with_parent(&parent);
        child.set_variable("x", Value::Integer(9)).unwrap();

        assert_eq!(parent.get_variable("x").unwrap(), Value::Integer(9));
    }

    #[test]
    fn strict_mode_rejects_implicit_declaration() {
        let scope = Scope::new(true);
        assert!(scope.set_variable("x", Value::Integer(1)).is_err());
    }

    #[test]
    fn lax_mode_implicitly_declares() {
        let scope = Scope::new(false);
        scope.set_variable("x", Value::Integer(1)).unwrap();
        assert_eq!(scope.get_variable("x").unwrap(), Value::Integer(1));
    }

    #[test]
    fn constant_cannot_be_reassigned() {
        let scope = Scope::new(false);
        scope.define_constant("PI", Value::Real(3.14)).unwrap();
        assert!(scope.define_variable("PI", Value::Integer(1)).is_err());
        assert!(scope.set_variable("PI", Value::Integer(1)).is_err());
    }

    #[test]
    fn routine_lookup_walks_parent_chain() {
        let parent = Scope::new(false);
        parent.define_procedure(
            "GREET",
            Rc::new(Stmt::Return {
                value: crate::ast::Expr::Literal(crate::ast::Literal::Integer(1), 1),
                line: 1,
            }),
        );
        let child = Scope::with_parent(&parent);
        assert!(child.get_procedure("greet").is_ok());
    }
}
