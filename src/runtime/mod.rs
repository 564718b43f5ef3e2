pub mod builtins;
pub mod callable;
pub mod env;
pub mod object;
pub mod value;

use std::cell::RefCell;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::rc::Rc;
use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::ast::{Expr, Literal, Stmt};

pub use callable::{Callable, Function, NativeFunction};
pub use env::Environment;
pub use object::{Class, Instance};
pub use value::{Key, Value};

use object::instance_get;

// ── Errors ──────────────────────────────────────────────────────────────

/// Classification of runtime failures, for precise testing and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UndefinedVariable,
    UndefinedProperty,
    UndefinedClass,
    TypeMismatch,
    NotComparable,
    DivisionByZero,
    ModuloByZero,
    IndexOutOfRange,
    KeyNotFound,
    NotIndexable,
    NotCallable,
    ArityMismatch,
    InvalidAssignmentTarget,
    Overflow,
    Io,
}

#[derive(Debug)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: usize,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "Runtime error [line {}]: {}", self.line, self.message)
        } else {
            write!(f, "Runtime error: {}", self.message)
        }
    }
}

impl std::error::Error for RuntimeError {}

// ── Control flow ────────────────────────────────────────────────────────

/// Outcome of executing one statement. `Return` unwinds through blocks and
/// loops until a function-call boundary consumes it; it is ordinary control
/// flow, never an error.
pub enum StmtResult {
    Continue,
    Return(Value),
}

/// What assignment to a name no scope defines should do. `AutoDefine` is
/// the language default: the name is created in the current scope.
/// `Strict` fails with `UndefinedVariable`, matching plain variable reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssignPolicy {
    #[default]
    AutoDefine,
    Strict,
}

// ── Interpreter ─────────────────────────────────────────────────────────

pub struct Interpreter {
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    assign_policy: AssignPolicy,
    out: Box<dyn Write>,
    input: Box<dyn BufRead>,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Rc::new(RefCell::new(Environment::new()));
        builtins::install(&globals);
        Self {
            environment: globals.clone(),
            globals,
            assign_policy: AssignPolicy::default(),
            out: Box::new(io::stdout()),
            input: Box::new(io::BufReader::new(io::stdin())),
        }
    }

    pub fn with_assign_policy(mut self, policy: AssignPolicy) -> Self {
        self.assign_policy = policy;
        self
    }

    /// Redirect print/input, used by the test suites.
    pub fn with_io(mut self, out: Box<dyn Write>, input: Box<dyn BufRead>) -> Self {
        self.out = out;
        self.input = input;
        self
    }

    /// Read a global binding back out, used by the test suites.
    pub fn get_global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name)
    }

    /// Execute top-level statements in order. The first runtime error
    /// aborts the rest of the program; a stray top-level `return` simply
    /// ends execution.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in statements {
            if let StmtResult::Return(_) = self.execute(stmt)? {
                break;
            }
        }
        Ok(())
    }

    // ── Statement execution ─────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> Result<StmtResult, RuntimeError> {
        match stmt {
            Stmt::Expression { expr } => {
                self.evaluate(expr)?;
                Ok(StmtResult::Continue)
            }
            Stmt::Print { expr, line } => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)
                    .and_then(|_| self.out.flush())
                    .map_err(|e| {
                        RuntimeError::new(ErrorKind::Io, format!("Cannot write output: {}", e), *line)
                    })?;
                Ok(StmtResult::Continue)
            }
            Stmt::Input {
                variable,
                prompt,
                line,
            } => {
                self.exec_input(variable, prompt.as_ref(), *line)?;
                Ok(StmtResult::Continue)
            }
            Stmt::Block { statements } => {
                let scope = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));
                self.execute_block(statements, scope)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(StmtResult::Continue)
                }
            }
            Stmt::While {
                condition, body, ..
            } => {
                // Re-evaluated before every iteration; a diverging loop is
                // the program's responsibility, not the evaluator's.
                while self.evaluate(condition)?.is_truthy() {
                    if let StmtResult::Return(value) = self.execute(body)? {
                        return Ok(StmtResult::Return(value));
                    }
                }
                Ok(StmtResult::Continue)
            }
            Stmt::ForEach {
                variable,
                iterable,
                body,
                line,
            } => self.exec_foreach(variable, iterable, body, *line),
            Stmt::Function { decl } => {
                let function = Function::new(decl.clone(), self.environment.clone());
                self.environment
                    .borrow_mut()
                    .define(&decl.name, Value::Function(Rc::new(function)));
                Ok(StmtResult::Continue)
            }
            Stmt::Class {
                name,
                superclass,
                methods,
                line,
            } => {
                self.exec_class_decl(name, superclass.as_deref(), methods, *line)?;
                Ok(StmtResult::Continue)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };
                Ok(StmtResult::Return(value))
            }
        }
    }

    /// Run statements in `scope`, restoring the previous environment
    /// unconditionally — on normal exit, on return, and on error.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        scope: Rc<RefCell<Environment>>,
    ) -> Result<StmtResult, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, scope);
        let mut result = Ok(StmtResult::Continue);
        for stmt in statements {
            match self.execute(stmt) {
                Ok(StmtResult::Continue) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }
        self.environment = previous;
        result
    }

    fn exec_input(
        &mut self,
        variable: &str,
        prompt: Option<&Expr>,
        line: usize,
    ) -> Result<(), RuntimeError> {
        if let Some(prompt) = prompt {
            let text = self.evaluate(prompt)?;
            write!(self.out, "{}", text)
                .and_then(|_| self.out.flush())
                .map_err(|e| {
                    RuntimeError::new(ErrorKind::Io, format!("Cannot write prompt: {}", e), line)
                })?;
        }

        let mut buffer = String::new();
        self.input.read_line(&mut buffer).map_err(|e| {
            RuntimeError::new(ErrorKind::Io, format!("Cannot read input: {}", e), line)
        })?;
        while buffer.ends_with('\n') || buffer.ends_with('\r') {
            buffer.pop();
        }

        let value = coerce_input(&buffer);
        self.environment.borrow_mut().define(variable, value);
        Ok(())
    }

    fn exec_foreach(
        &mut self,
        variable: &str,
        iterable: &Expr,
        body: &Stmt,
        line: usize,
    ) -> Result<StmtResult, RuntimeError> {
        let iterable = self.evaluate(iterable)?;
        let items: Vec<Value> = match &iterable {
            Value::List(list) => list.borrow().clone(),
            Value::Str(s) => s.chars().map(|c| Value::Str(c.to_string())).collect(),
            Value::Map(map) => map.borrow().keys().map(Key::to_value).collect(),
            other => {
                return Err(RuntimeError::new(
                    ErrorKind::TypeMismatch,
                    format!(
                        "Can only iterate over lists, strings, and maps, got {}",
                        other.type_name()
                    ),
                    line,
                ));
            }
        };

        // Each iteration binds the loop variable in a fresh scope, so
        // mutating it inside the body does not leak into the next pass.
        for item in items {
            let scope = Rc::new(RefCell::new(Environment::with_enclosing(
                self.environment.clone(),
            )));
            scope.borrow_mut().define(variable, item);

            let previous = std::mem::replace(&mut self.environment, scope);
            let result = self.execute(body);
            self.environment = previous;

            if let StmtResult::Return(value) = result? {
                return Ok(StmtResult::Return(value));
            }
        }
        Ok(StmtResult::Continue)
    }

    fn exec_class_decl(
        &mut self,
        name: &str,
        superclass: Option<&str>,
        methods: &[Rc<crate::ast::FunctionDecl>],
        line: usize,
    ) -> Result<(), RuntimeError> {
        let superclass = match superclass {
            Some(super_name) => {
                let value = self.environment.borrow().get(super_name).ok_or_else(|| {
                    RuntimeError::new(
                        ErrorKind::UndefinedVariable,
                        format!("Undefined variable '{}'", super_name),
                        line,
                    )
                })?;
                match value {
                    Value::Class(class) => Some(class),
                    other => {
                        return Err(RuntimeError::new(
                            ErrorKind::TypeMismatch,
                            format!("Superclass must be a class, got {}", other.type_name()),
                            line,
                        ));
                    }
                }
            }
            None => None,
        };

        self.environment.borrow_mut().define(name, Value::Nil);

        // Methods of a subclass close over a scope that defines `super` as
        // the statically enclosing class's superclass; `super.m` dispatch
        // starts there regardless of the runtime instance's own class.
        let method_scope = match &superclass {
            Some(class) => {
                let scope = Rc::new(RefCell::new(Environment::with_enclosing(
                    self.environment.clone(),
                )));
                scope
                    .borrow_mut()
                    .define("super", Value::Class(class.clone()));
                scope
            }
            None => self.environment.clone(),
        };

        let mut table = std::collections::HashMap::new();
        for method in methods {
            table.insert(
                method.name.clone(),
                Function::new(method.clone(), method_scope.clone()),
            );
        }

        let class = Rc::new(Class::new(name.to_string(), superclass, table));
        self.environment
            .borrow_mut()
            .define(name, Value::Class(class));
        Ok(())
    }

    // ── Expression evaluation ───────────────────────────────────────────

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal { value, .. } => Ok(match value {
                Literal::Int(n) => Value::Int(*n),
                Literal::Float(n) => Value::Float(*n),
                Literal::Str(s) => Value::Str(s.clone()),
                Literal::Bool(b) => Value::Bool(*b),
            }),
            Expr::Variable { name, line } => {
                self.environment.borrow().get(name).ok_or_else(|| {
                    RuntimeError::new(
                        ErrorKind::UndefinedVariable,
                        format!("Undefined variable '{}'", name),
                        *line,
                    )
                })
            }
            Expr::Assign { name, value, line } => {
                let value = self.evaluate(value)?;
                let assigned = self.environment.borrow_mut().assign(name, value.clone());
                if !assigned {
                    match self.assign_policy {
                        AssignPolicy::AutoDefine => {
                            self.environment.borrow_mut().define(name, value.clone());
                        }
                        AssignPolicy::Strict => {
                            return Err(RuntimeError::new(
                                ErrorKind::UndefinedVariable,
                                format!("Undefined variable '{}'", name),
                                *line,
                            ));
                        }
                    }
                }
                Ok(value)
            }
            Expr::Binary {
                left,
                op,
                right,
                line,
            } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                eval_binary(&left, op, &right, *line)
            }
            Expr::Logical {
                left, op, right, ..
            } => {
                // Short-circuit: the returned value is whichever operand's
                // original value decided the result.
                let left = self.evaluate(left)?;
                match op.as_str() {
                    "or" if left.is_truthy() => Ok(left),
                    "and" if !left.is_truthy() => Ok(left),
                    _ => self.evaluate(right),
                }
            }
            Expr::Unary { op, operand, line } => {
                let value = self.evaluate(operand)?;
                match op.as_str() {
                    "-" => match value {
                        Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| {
                            RuntimeError::new(
                                ErrorKind::Overflow,
                                "Integer overflow in negation",
                                *line,
                            )
                        }),
                        Value::Float(n) => Ok(Value::Float(-n)),
                        other => Err(RuntimeError::new(
                            ErrorKind::TypeMismatch,
                            format!("Operand must be a number, got {}", other.type_name()),
                            *line,
                        )),
                    },
                    "!" => Ok(Value::Bool(!value.is_truthy())),
                    _ => Err(RuntimeError::new(
                        ErrorKind::TypeMismatch,
                        format!("Unknown unary operator: {}", op),
                        *line,
                    )),
                }
            }
            Expr::Grouping { expr } => self.evaluate(expr),
            Expr::Call {
                callee,
                arguments,
                line,
            } => {
                let callee = self.evaluate(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }
                self.call_value(callee, args, *line)
            }
            Expr::Get { object, name, line } => {
                let object = self.evaluate(object)?;
                self.eval_get(object, name, *line)
            }
            Expr::Set {
                object,
                name,
                value,
                line,
            } => {
                let object = self.evaluate(object)?;
                let value = self.evaluate(value)?;
                match object {
                    Value::Instance(instance) => {
                        instance.borrow_mut().set(name, value.clone());
                        Ok(value)
                    }
                    other => Err(RuntimeError::new(
                        ErrorKind::UndefinedProperty,
                        format!("Only instances have fields, got {}", other.type_name()),
                        *line,
                    )),
                }
            }
            Expr::Index {
                object,
                index,
                line,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                eval_index(&object, &index, *line)
            }
            Expr::IndexAssign {
                object,
                index,
                value,
                line,
            } => {
                let object = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                let value = self.evaluate(value)?;
                eval_index_assign(&object, &index, value, *line)
            }
            Expr::ListLiteral { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.evaluate(element)?);
                }
                Ok(Value::list(items))
            }
            Expr::MapLiteral { entries, line } => {
                let mut map = IndexMap::with_capacity(entries.len());
                for (key_expr, value_expr) in entries {
                    let key = self.evaluate(key_expr)?;
                    let key = Key::from_value(&key, *line)?;
                    let value = self.evaluate(value_expr)?;
                    map.insert(key, value);
                }
                Ok(Value::map(map))
            }
            Expr::This { line } => self.environment.borrow().get("this").ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::UndefinedVariable,
                    "Cannot use 'this' outside of a method",
                    *line,
                )
            }),
            Expr::Super { method, line } => self.eval_super(method, *line),
            Expr::New {
                class_name,
                arguments,
                line,
            } => {
                let class = match self.environment.borrow().get(class_name) {
                    Some(Value::Class(class)) => class,
                    Some(_) => {
                        return Err(RuntimeError::new(
                            ErrorKind::UndefinedClass,
                            format!("'{}' is not a class", class_name),
                            *line,
                        ));
                    }
                    None => {
                        return Err(RuntimeError::new(
                            ErrorKind::UndefinedClass,
                            format!("Undefined class '{}'", class_name),
                            *line,
                        ));
                    }
                };
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }
                self.call_value(Value::Class(class), args, *line)
            }
        }
    }

    /// Uniform call dispatch. The callee must expose the callable contract;
    /// argument count must exactly equal its arity before anything is bound.
    fn call_value(
        &mut self,
        callee: Value,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value, RuntimeError> {
        let callable: &dyn Callable = match &callee {
            Value::Function(function) => function.as_ref(),
            Value::Native(native) => native.as_ref(),
            Value::Class(class) => class,
            other => {
                return Err(RuntimeError::new(
                    ErrorKind::NotCallable,
                    format!("Can only call functions and classes, got {}", other.type_name()),
                    line,
                ));
            }
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError::new(
                ErrorKind::ArityMismatch,
                format!(
                    "Expected {} arguments but got {}",
                    callable.arity(),
                    arguments.len()
                ),
                line,
            ));
        }

        callable.call(self, arguments)
    }

    /// Property access: lists and strings expose a fixed set of structural
    /// pseudo-properties; instances go through the class method tables.
    fn eval_get(&mut self, object: Value, name: &str, line: usize) -> Result<Value, RuntimeError> {
        match (&object, name) {
            (Value::List(list), "append") => {
                let list = list.clone();
                Ok(Value::Native(Rc::new(NativeFunction::new(
                    "append",
                    1,
                    move |_interp, mut args| {
                        list.borrow_mut().push(args.pop().unwrap());
                        Ok(Value::Nil)
                    },
                ))))
            }
            (Value::List(list), "pop") => {
                let list = list.clone();
                Ok(Value::Native(Rc::new(NativeFunction::new(
                    "pop",
                    0,
                    move |_interp, _args| Ok(list.borrow_mut().pop().unwrap_or(Value::Nil)),
                ))))
            }
            (Value::List(list), "length") => Ok(Value::Int(list.borrow().len() as i64)),
            (Value::Map(map), "length") => Ok(Value::Int(map.borrow().len() as i64)),
            (Value::Str(s), "length") => Ok(Value::Int(s.chars().count() as i64)),
            (Value::Instance(instance), _) => instance_get(instance, name).ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::UndefinedProperty,
                    format!("Undefined property '{}'", name),
                    line,
                )
            }),
            _ => Err(RuntimeError::new(
                ErrorKind::UndefinedProperty,
                format!("No such property '{}' on {}", name, object.type_name()),
                line,
            )),
        }
    }

    /// `super.m`: `super` resolves through the chain to the statically
    /// enclosing class's superclass (defined at class declaration), `this`
    /// to the currently bound instance (defined at method binding).
    fn eval_super(&mut self, method: &str, line: usize) -> Result<Value, RuntimeError> {
        let superclass = match self.environment.borrow().get("super") {
            Some(Value::Class(class)) => class,
            _ => {
                return Err(RuntimeError::new(
                    ErrorKind::UndefinedVariable,
                    "Cannot use 'super' outside of a subclass method",
                    line,
                ));
            }
        };
        let instance = self.environment.borrow().get("this").ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::UndefinedVariable,
                "Cannot use 'super' outside of a method",
                line,
            )
        })?;

        let found = superclass.find_method(method).ok_or_else(|| {
            RuntimeError::new(
                ErrorKind::UndefinedProperty,
                format!("Undefined property '{}'", method),
                line,
            )
        })?;
        Ok(Value::Function(Rc::new(found.bind(instance))))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Operator semantics ──────────────────────────────────────────────────

fn eval_binary(left: &Value, op: &str, right: &Value, line: usize) -> Result<Value, RuntimeError> {
    match op {
        "+" => eval_add(left, right, line),
        "-" => match (left, right) {
            (Value::Int(a), Value::Int(b)) => {
                a.checked_sub(*b).map(Value::Int).ok_or_else(|| overflow("subtraction", line))
            }
            _ => {
                let (a, b) = number_operands(left, right, op, line)?;
                Ok(Value::Float(a - b))
            }
        },
        "*" => eval_mul(left, right, line),
        "/" => {
            let (a, b) = number_operands(left, right, op, line)?;
            if b == 0.0 {
                Err(RuntimeError::new(
                    ErrorKind::DivisionByZero,
                    "Division by zero",
                    line,
                ))
            } else {
                Ok(Value::Float(a / b))
            }
        }
        "%" => eval_modulo(left, right, line),
        "^" => eval_pow(left, right, line),
        "==" => Ok(Value::Bool(left == right)),
        "!=" => Ok(Value::Bool(left != right)),
        "<" | "<=" | ">" | ">=" => eval_comparison(left, op, right, line),
        _ => Err(RuntimeError::new(
            ErrorKind::TypeMismatch,
            format!("Unknown operator: {}", op),
            line,
        )),
    }
}

/// `+` is the one operator with coercion sugar: numbers add, strings and
/// lists concatenate, and when exactly one operand is a string the other is
/// stringified into it.
fn eval_add(left: &Value, right: &Value, line: usize) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            a.checked_add(*b).map(Value::Int).ok_or_else(|| overflow("addition", line))
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = (left.as_number().unwrap(), right.as_number().unwrap());
            Ok(Value::Float(a + b))
        }
        (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
        (Value::List(a), Value::List(b)) => {
            let mut combined = a.borrow().clone();
            combined.extend(b.borrow().iter().cloned());
            Ok(Value::list(combined))
        }
        (Value::Str(a), other) => Ok(Value::Str(format!("{}{}", a, other))),
        (other, Value::Str(b)) => Ok(Value::Str(format!("{}{}", other, b))),
        _ => Err(RuntimeError::new(
            ErrorKind::TypeMismatch,
            format!(
                "Operands must be two numbers, two strings, or two lists, got {} and {}",
                left.type_name(),
                right.type_name()
            ),
            line,
        )),
    }
}

fn eval_mul(left: &Value, right: &Value, line: usize) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            a.checked_mul(*b).map(Value::Int).ok_or_else(|| overflow("multiplication", line))
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let (a, b) = (left.as_number().unwrap(), right.as_number().unwrap());
            Ok(Value::Float(a * b))
        }
        // Repetition: a negative count yields an empty string/list.
        (Value::Str(s), Value::Int(n)) => Ok(Value::Str(s.repeat((*n).max(0) as usize))),
        (Value::List(items), Value::Int(n)) => {
            let source = items.borrow();
            let count = (*n).max(0) as usize;
            let mut repeated = Vec::with_capacity(source.len() * count);
            for _ in 0..count {
                repeated.extend(source.iter().cloned());
            }
            Ok(Value::list(repeated))
        }
        _ => Err(RuntimeError::new(
            ErrorKind::TypeMismatch,
            format!(
                "Operands must be numbers or a string/list and an integer, got {} and {}",
                left.type_name(),
                right.type_name()
            ),
            line,
        )),
    }
}

fn eval_modulo(left: &Value, right: &Value, line: usize) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            if *b == 0 {
                return Err(RuntimeError::new(
                    ErrorKind::ModuloByZero,
                    "Modulo by zero",
                    line,
                ));
            }
            let r = a.checked_rem(*b).ok_or_else(|| overflow("modulo", line))?;
            // Floored semantics: the result takes the divisor's sign.
            if r != 0 && (r < 0) != (*b < 0) {
                Ok(Value::Int(r + b))
            } else {
                Ok(Value::Int(r))
            }
        }
        _ => {
            let (a, b) = number_operands(left, right, "%", line)?;
            if b == 0.0 {
                return Err(RuntimeError::new(
                    ErrorKind::ModuloByZero,
                    "Modulo by zero",
                    line,
                ));
            }
            Ok(Value::Float(a - b * (a / b).floor()))
        }
    }
}

fn eval_pow(left: &Value, right: &Value, line: usize) -> Result<Value, RuntimeError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) if *b >= 0 => {
            let exp = u32::try_from(*b).map_err(|_| overflow("exponentiation", line))?;
            a.checked_pow(exp)
                .map(Value::Int)
                .ok_or_else(|| overflow("exponentiation", line))
        }
        _ => {
            let (a, b) = number_operands(left, right, "^", line)?;
            Ok(Value::Float(a.powf(b)))
        }
    }
}

/// Ordering is defined for two numbers or two strings only.
fn eval_comparison(
    left: &Value,
    op: &str,
    right: &Value,
    line: usize,
) -> Result<Value, RuntimeError> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => left
            .as_number()
            .unwrap()
            .partial_cmp(&right.as_number().unwrap()),
        (Value::Str(a), Value::Str(b)) => a.partial_cmp(b),
        _ => {
            return Err(RuntimeError::new(
                ErrorKind::NotComparable,
                format!("Cannot compare {} and {}", left.type_name(), right.type_name()),
                line,
            ));
        }
    };

    let ordering = ordering.ok_or_else(|| {
        RuntimeError::new(
            ErrorKind::NotComparable,
            format!("Cannot compare {} and {}", left, right),
            line,
        )
    })?;

    Ok(Value::Bool(match op {
        "<" => ordering.is_lt(),
        "<=" => ordering.is_le(),
        ">" => ordering.is_gt(),
        _ => ordering.is_ge(),
    }))
}

fn eval_index(object: &Value, index: &Value, line: usize) -> Result<Value, RuntimeError> {
    match object {
        Value::List(items) => {
            let items = items.borrow();
            let i = check_index(index, items.len(), "List", line)?;
            Ok(items[i].clone())
        }
        Value::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let i = check_index(index, chars.len(), "String", line)?;
            Ok(Value::Str(chars[i].to_string()))
        }
        Value::Map(entries) => {
            let key = Key::from_value(index, line)?;
            entries.borrow().get(&key).cloned().ok_or_else(|| {
                RuntimeError::new(
                    ErrorKind::KeyNotFound,
                    format!("Key not found in map: {}", index),
                    line,
                )
            })
        }
        other => Err(RuntimeError::new(
            ErrorKind::NotIndexable,
            format!("Cannot index into {}", other.type_name()),
            line,
        )),
    }
}

fn eval_index_assign(
    object: &Value,
    index: &Value,
    value: Value,
    line: usize,
) -> Result<Value, RuntimeError> {
    match object {
        Value::List(items) => {
            let mut items = items.borrow_mut();
            let i = check_index(index, items.len(), "List", line)?;
            items[i] = value.clone();
            Ok(value)
        }
        Value::Map(entries) => {
            let key = Key::from_value(index, line)?;
            entries.borrow_mut().insert(key, value.clone());
            Ok(value)
        }
        other => Err(RuntimeError::new(
            ErrorKind::NotIndexable,
            format!("Cannot assign to index of {}", other.type_name()),
            line,
        )),
    }
}

fn check_index(index: &Value, len: usize, what: &str, line: usize) -> Result<usize, RuntimeError> {
    let i = match index {
        Value::Int(i) => *i,
        other => {
            return Err(RuntimeError::new(
                ErrorKind::TypeMismatch,
                format!("{} indices must be integers, got {}", what, other.type_name()),
                line,
            ));
        }
    };
    if i < 0 || i as usize >= len {
        return Err(RuntimeError::new(
            ErrorKind::IndexOutOfRange,
            format!("{} index out of range: {}", what, i),
            line,
        ));
    }
    Ok(i as usize)
}

fn number_operands(
    left: &Value,
    right: &Value,
    op: &str,
    line: usize,
) -> Result<(f64, f64), RuntimeError> {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(RuntimeError::new(
            ErrorKind::TypeMismatch,
            format!(
                "Operands of '{}' must be numbers, got {} and {}",
                op,
                left.type_name(),
                right.type_name()
            ),
            line,
        )),
    }
}

fn overflow(operation: &str, line: usize) -> RuntimeError {
    RuntimeError::new(
        ErrorKind::Overflow,
        format!("Integer overflow in {}", operation),
        line,
    )
}

// ── Input coercion ──────────────────────────────────────────────────────

/// A whole line of input that is entirely numeric (after trimming) becomes
/// an integer or float; anything else stays a string.
fn coerce_input(text: &str) -> Value {
    static INT_RE: OnceLock<Regex> = OnceLock::new();
    static FLOAT_RE: OnceLock<Regex> = OnceLock::new();
    let int_re = INT_RE.get_or_init(|| Regex::new(r"^-?[0-9]+$").unwrap());
    let float_re = FLOAT_RE.get_or_init(|| Regex::new(r"^-?[0-9]+\.[0-9]+$").unwrap());

    let trimmed = text.trim();
    if int_re.is_match(trimmed) {
        if let Ok(n) = trimmed.parse::<i64>() {
            return Value::Int(n);
        }
    }
    if float_re.is_match(trimmed) {
        if let Ok(n) = trimmed.parse::<f64>() {
            return Value::Float(n);
        }
    }
    Value::Str(text.to_string())
}
