use std::cell::RefCell;
use std::rc::Rc;

use super::callable::NativeFunction;
use super::env::Environment;
use super::{ErrorKind, RuntimeError, Value};

/// Install the host built-ins into the global scope.
pub fn install(globals: &Rc<RefCell<Environment>>) {
    let mut scope = globals.borrow_mut();

    scope.define(
        "append",
        Value::Native(Rc::new(NativeFunction::new("append", 2, |_interp, mut args| {
            let value = args.pop().unwrap();
            match args.pop().unwrap() {
                Value::List(list) => {
                    list.borrow_mut().push(value);
                    Ok(Value::List(list))
                }
                other => Err(RuntimeError::new(
                    ErrorKind::TypeMismatch,
                    format!(
                        "append expects a list followed by a value, got {}",
                        other.type_name()
                    ),
                    0,
                )),
            }
        }))),
    );

    scope.define(
        "pop",
        Value::Native(Rc::new(NativeFunction::new("pop", 1, |_interp, mut args| {
            match args.pop().unwrap() {
                Value::List(list) => {
                    let popped = list.borrow_mut().pop();
                    popped.ok_or_else(|| {
                        RuntimeError::new(
                            ErrorKind::IndexOutOfRange,
                            "pop expects a non-empty list",
                            0,
                        )
                    })
                }
                other => Err(RuntimeError::new(
                    ErrorKind::TypeMismatch,
                    format!("pop expects a list, got {}", other.type_name()),
                    0,
                )),
            }
        }))),
    );

    scope.define(
        "length",
        Value::Native(Rc::new(NativeFunction::new("length", 1, |_interp, mut args| {
            match args.pop().unwrap() {
                Value::List(list) => Ok(Value::Int(list.borrow().len() as i64)),
                Value::Map(map) => Ok(Value::Int(map.borrow().len() as i64)),
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(RuntimeError::new(
                    ErrorKind::TypeMismatch,
                    format!(
                        "length expects a list, map, or string, got {}",
                        other.type_name()
                    ),
                    0,
                )),
            }
        }))),
    );
}
