use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::callable::{Callable, Function};
use super::{Interpreter, RuntimeError, Value};

/// A class: a name, at most one superclass, and a method table. Shared by
/// all its instances and subclasses.
#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub superclass: Option<Rc<Class>>,
    methods: HashMap<String, Function>,
}

impl Class {
    pub fn new(
        name: String,
        superclass: Option<Rc<Class>>,
        methods: HashMap<String, Function>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    /// First match walking the superclass chain. Not finding a method is
    /// not an error here; callers decide how to react.
    pub fn find_method(&self, name: &str) -> Option<&Function> {
        self.methods.get(name).or_else(|| {
            self.superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name))
        })
    }
}

/// Constructing: allocate the instance, then bind and run `init` if any
/// class in the chain defines one. Construction always yields the new
/// instance; init's return value is discarded.
impl Callable for Rc<Class> {
    fn arity(&self) -> usize {
        self.find_method("init").map_or(0, Callable::arity)
    }

    fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let instance = Rc::new(RefCell::new(Instance::new(self.clone())));
        if let Some(initializer) = self.find_method("init") {
            initializer
                .bind(Value::Instance(instance.clone()))
                .call(interpreter, arguments)?;
        }
        Ok(Value::Instance(instance))
    }
}

/// An instance: its class plus a mutable field map, initially empty.
/// Fields need not be pre-declared; `this.x = …` creates them.
#[derive(Debug)]
pub struct Instance {
    pub class: Rc<Class>,
    fields: HashMap<String, Value>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<Value> {
        self.fields.get(name).cloned()
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.fields.insert(name.to_string(), value);
    }
}

/// Property lookup on an instance: fields shadow methods; a method found on
/// the class chain comes back bound to this instance.
pub fn instance_get(instance: &Rc<RefCell<Instance>>, name: &str) -> Option<Value> {
    if let Some(value) = instance.borrow().field(name) {
        return Some(value);
    }
    let class = instance.borrow().class.clone();
    class
        .find_method(name)
        .map(|method| Value::Function(Rc::new(method.bind(Value::Instance(instance.clone())))))
}
