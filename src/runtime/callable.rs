use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::FunctionDecl;

use super::env::Environment;
use super::{Interpreter, RuntimeError, StmtResult, Value};

/// The uniform contract shared by user functions, host built-ins, and
/// classes acting as constructors. The call site checks `arity()` before
/// any argument is bound.
pub trait Callable {
    fn arity(&self) -> usize;
    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError>;
}

/// A user-defined function: a shared declaration plus the environment that
/// was active at its definition site.
#[derive(Debug, Clone)]
pub struct Function {
    pub declaration: Rc<FunctionDecl>,
    pub closure: Rc<RefCell<Environment>>,
}

impl Function {
    pub fn new(declaration: Rc<FunctionDecl>, closure: Rc<RefCell<Environment>>) -> Self {
        Self {
            declaration,
            closure,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name
    }

    /// Produce a method bound to `instance`: a fresh function whose closure
    /// is a new scope defining `this`, parented on the original closure.
    /// Binding happens on every lookup, so each access yields a new bound
    /// function sharing the instance by reference.
    pub fn bind(&self, instance: Value) -> Function {
        let scope = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));
        scope.borrow_mut().define("this", instance);
        Function::new(self.declaration.clone(), scope)
    }
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let scope = Rc::new(RefCell::new(Environment::with_enclosing(
            self.closure.clone(),
        )));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            scope.borrow_mut().define(param, argument);
        }

        // A return unwinds exactly to this call boundary; falling off the
        // end of the body yields nil.
        match interpreter.execute_block(&self.declaration.body, scope)? {
            StmtResult::Return(value) => Ok(value),
            StmtResult::Continue => Ok(Value::Nil),
        }
    }
}

type NativeFn = Box<dyn Fn(&mut Interpreter, Vec<Value>) -> Result<Value, RuntimeError>>;

/// A host-provided built-in with a fixed arity. Stateless across calls
/// except through its captured handles (the list pseudo-methods capture the
/// list they were looked up on).
pub struct NativeFunction {
    name: String,
    arity: usize,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new<F>(name: &str, arity: usize, func: F) -> Self
    where
        F: Fn(&mut Interpreter, Vec<Value>) -> Result<Value, RuntimeError> + 'static,
    {
        Self {
            name: name.to_string(),
            arity,
            func: Box::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Callable for NativeFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        (self.func)(interpreter, arguments)
    }
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}
