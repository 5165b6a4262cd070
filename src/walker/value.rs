use std::{
    cell::{Ref, RefCell, RefMut},
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use log::trace;

use crate::{
    parse::Stmt,
    walker::{exec, Context, ExecError},
    Name,
};

/// A single call frame's name-to-value bindings.
pub type Closure = HashMap<Name, Value>;

/// Names with built-in meaning to the runtime.
pub mod sym {
    use internment::LocalIntern;

    use crate::Name;

    pub fn slf() -> Name {
        LocalIntern::new("self".to_owned())
    }

    pub fn return_val() -> Name {
        LocalIntern::new("return_val".to_owned())
    }

    pub fn init() -> Name {
        LocalIntern::new("__init__".to_owned())
    }

    pub fn string() -> Name {
        LocalIntern::new("__str__".to_owned())
    }

    pub fn eq() -> Name {
        LocalIntern::new("__eq__".to_owned())
    }

    pub fn lt() -> Name {
        LocalIntern::new("__lt__".to_owned())
    }

    pub fn add() -> Name {
        LocalIntern::new("__add__".to_owned())
    }
}

#[derive(Clone)]
pub enum Value {
    None,
    Number(i64),
    Bool(bool),
    String(Rc<String>),
    Class(Rc<Class>),
    Instance(InstanceRef),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Number(_) => "number",
            Value::Bool(_) => "bool",
            Value::String(_) => "string",
            Value::Class(_) => "class",
            Value::Instance(_) => "object",
        }
    }

    pub fn is_true(&self) -> bool {
        match self {
            Value::Bool(value) => *value,
            Value::Number(value) => *value != 0,
            Value::String(value) => !value.is_empty(),
            _ => false,
        }
    }

    pub fn as_instance(&self) -> Result<&InstanceRef, ExecError> {
        match self {
            Value::Instance(handle) => Ok(handle),
            _ => Err(ExecError::NotAnInstance),
        }
    }

    /// The textual form `print` emits for this value.
    ///
    /// Instances defer to a zero-parameter `__str__` when their class
    /// provides one, and whatever that returns is rendered with the same
    /// rules, so `print` and `str()` agree on every value.
    pub fn render(&self, ctx: &mut Context) -> Result<String, ExecError> {
        Ok(match self {
            Value::None => "None".to_owned(),
            Value::Number(value) => value.to_string(),
            Value::Bool(true) => "True".to_owned(),
            Value::Bool(false) => "False".to_owned(),
            Value::String(value) => (**value).clone(),
            Value::Class(class) => format!("Class {}", class.name().as_str()),
            Value::Instance(handle) => {
                let instance = handle.get()?;
                if instance.has_method(sym::string(), 0) {
                    instance.call(sym::string(), Vec::new(), ctx)?.render(ctx)?
                } else {
                    format!(
                        "<{} object at {:p}>",
                        instance.class().name().as_str(),
                        Rc::as_ptr(&instance),
                    )
                }
            }
        })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Number(value) => write!(f, "{}", value),
            Value::Bool(value) => write!(f, "{}", if *value { "True" } else { "False" }),
            Value::String(value) => write!(f, "{:?}", value),
            Value::Class(class) => write!(f, "Class {}", class.name().as_str()),
            Value::Instance(handle) => match handle.get() {
                Ok(instance) => write!(f, "<{} object>", instance.class().name().as_str()),
                Err(_) => write!(f, "<dropped object>"),
            },
        }
    }
}

/// A holder for a class instance.
///
/// The `self` binding inside field maps and call frames is the `Weak` form,
/// so an instance's reference to itself never keeps it alive.
#[derive(Clone)]
pub enum InstanceRef {
    Strong(Rc<Instance>),
    Weak(Weak<Instance>),
}

impl InstanceRef {
    pub fn strong(instance: Rc<Instance>) -> Self {
        InstanceRef::Strong(instance)
    }

    pub fn get(&self) -> Result<Rc<Instance>, ExecError> {
        match self {
            InstanceRef::Strong(instance) => Ok(instance.clone()),
            InstanceRef::Weak(instance) => instance.upgrade().ok_or(ExecError::DanglingSelf),
        }
    }
}

#[derive(Debug)]
pub struct Method {
    pub name: Name,
    pub params: Vec<Name>,
    pub body: Stmt,
}

#[derive(Debug)]
pub struct Class {
    name: Name,
    methods: Vec<Rc<Method>>,
    parent: Option<Weak<Class>>,
}

impl Class {
    /// Parents are held weakly; the AST keeps every class alive for the
    /// whole run, so an unupgradable parent just means no inherited method.
    pub fn new(name: Name, methods: Vec<Rc<Method>>, parent: Option<&Rc<Class>>) -> Rc<Self> {
        Rc::new(Self {
            name,
            methods,
            parent: parent.map(Rc::downgrade),
        })
    }

    pub fn name(&self) -> Name {
        self.name
    }

    /// First name match in declaration order, then up the parent chain.
    pub fn method(&self, name: Name) -> Option<Rc<Method>> {
        if let Some(method) = self.methods.iter().find(|method| method.name == name) {
            return Some(method.clone());
        }
        self.parent.as_ref()?.upgrade()?.method(name)
    }
}

#[derive(Debug)]
pub struct Instance {
    class: Rc<Class>,
    fields: RefCell<Closure>,
}

impl Instance {
    pub fn new(class: Rc<Class>) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<Instance>| {
            let mut fields = Closure::new();
            fields.insert(sym::slf(), Value::Instance(InstanceRef::Weak(this.clone())));
            Self {
                class,
                fields: RefCell::new(fields),
            }
        })
    }

    pub fn class(&self) -> &Rc<Class> {
        &self.class
    }

    pub fn fields(&self) -> Ref<'_, Closure> {
        self.fields.borrow()
    }

    pub fn fields_mut(&self) -> RefMut<'_, Closure> {
        self.fields.borrow_mut()
    }

    /// Whether a call with `arg_count` arguments would resolve. A name
    /// match with the wrong parameter count counts as no method at all.
    pub fn has_method(&self, name: Name, arg_count: usize) -> bool {
        self.class
            .method(name)
            .is_some_and(|method| method.params.len() == arg_count)
    }

    pub fn call(
        self: Rc<Self>,
        name: Name,
        args: Vec<Value>,
        ctx: &mut Context,
    ) -> Result<Value, ExecError> {
        let method = self
            .class
            .method(name)
            .filter(|method| method.params.len() == args.len())
            .ok_or_else(|| ExecError::NoSuchMethod((*name).clone()))?;
        trace!(
            "calling {}.{} with {} arguments",
            self.class.name().as_str(),
            name.as_str(),
            args.len(),
        );
        let mut frame = Closure::new();
        for (param, arg) in method.params.iter().zip(args) {
            frame.insert(*param, arg);
        }
        frame.insert(
            sym::slf(),
            Value::Instance(InstanceRef::Weak(Rc::downgrade(&self))),
        );
        exec(&method.body, &mut frame, ctx)
    }
}

pub fn equal(lhs: &Value, rhs: &Value, ctx: &mut Context) -> Result<bool, ExecError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(a == b),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        (Value::String(a), Value::String(b)) => Ok(a == b),
        (Value::None, Value::None) => Ok(true),
        (Value::Instance(handle), _) => {
            let instance = handle.get()?;
            if instance.has_method(sym::eq(), 1) {
                match instance.call(sym::eq(), vec![rhs.clone()], ctx)? {
                    Value::Bool(result) => Ok(result),
                    _ => Err(ExecError::NotComparable("equality")),
                }
            } else {
                Err(ExecError::NotComparable("equality"))
            }
        }
        _ => Err(ExecError::NotComparable("equality")),
    }
}

pub fn less(lhs: &Value, rhs: &Value, ctx: &mut Context) -> Result<bool, ExecError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => Ok(a < b),
        (Value::Bool(a), Value::Bool(b)) => Ok(a < b),
        (Value::String(a), Value::String(b)) => Ok(a < b),
        (Value::Instance(handle), _) => {
            let instance = handle.get()?;
            if instance.has_method(sym::lt(), 1) {
                match instance.call(sym::lt(), vec![rhs.clone()], ctx)? {
                    Value::Bool(result) => Ok(result),
                    _ => Err(ExecError::NotComparable("ordering")),
                }
            } else {
                Err(ExecError::NotComparable("ordering"))
            }
        }
        _ => Err(ExecError::NotComparable("ordering")),
    }
}

pub fn not_equal(lhs: &Value, rhs: &Value, ctx: &mut Context) -> Result<bool, ExecError> {
    Ok(!equal(lhs, rhs, ctx)?)
}

// Any failure in the component relations here reads as "these values have
// no ordering", whatever the underlying cause was.
pub fn greater(lhs: &Value, rhs: &Value, ctx: &mut Context) -> Result<bool, ExecError> {
    let eq = equal(lhs, rhs, ctx).map_err(|_| ExecError::NotComparable("ordering"))?;
    let lt = less(lhs, rhs, ctx).map_err(|_| ExecError::NotComparable("ordering"))?;
    Ok(!eq && !lt)
}

pub fn less_or_equal(lhs: &Value, rhs: &Value, ctx: &mut Context) -> Result<bool, ExecError> {
    let eq = equal(lhs, rhs, ctx).map_err(|_| ExecError::NotComparable("ordering"))?;
    let lt = less(lhs, rhs, ctx).map_err(|_| ExecError::NotComparable("ordering"))?;
    Ok(eq || lt)
}

pub fn greater_or_equal(lhs: &Value, rhs: &Value, ctx: &mut Context) -> Result<bool, ExecError> {
    Ok(!less(lhs, rhs, ctx)?)
}
