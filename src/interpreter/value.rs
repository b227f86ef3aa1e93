//=============================================
// krscript/interpreter/value.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Kr runtime value model
// Objective: Define the tagged runtime value union, shared container types,
//            and the equality/truthiness/stringification rules
//=============================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{Accessibility, BlockStatement, Expr};
use crate::symbol::Symbol;

use super::environment::EnvRef;
use super::{Interpreter, RuntimeError};

//=============================================
//            Section 1: Shared Containers
//=============================================
// Arrays, objects, enums, and instances are reference values: assignment and
// returns share the container, mutation through one alias is visible through
// every other alias. Numbers, strings, booleans, and null copy by value.

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;
pub type InstanceRef = Rc<RefCell<InstanceValue>>;

pub struct EnumValue {
    pub name: Symbol,
    pub members: RefCell<IndexMap<String, Value>>,
}

impl fmt::Debug for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<enum {}>", self.name)
    }
}

/// A user function or method: the declaration's parameters and body plus the
/// environment captured at the definition site.
pub struct FunctionValue {
    pub name: Symbol,
    pub parameters: Vec<Symbol>,
    pub body: BlockStatement,
    pub closure: EnvRef,
    pub is_initializer: bool,
}

impl FunctionValue {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name)
    }
}

pub type NativeBody = fn(&mut Interpreter, &[Value]) -> Result<Value, RuntimeError>;

/// A host-provided function with a fixed parameter list.
pub struct NativeFunction {
    pub name: &'static str,
    pub parameters: &'static [&'static str],
    pub body: NativeBody,
}

impl NativeFunction {
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// An instance method or constructor together with its declaration metadata.
#[derive(Clone)]
pub struct MethodDef {
    pub function: Rc<FunctionValue>,
    pub accessibility: Accessibility,
}

/// A non-static field template; the initializer is evaluated per instance.
#[derive(Clone)]
pub struct FieldDef {
    pub name: Symbol,
    pub initializer: Option<Expr>,
    pub accessibility: Accessibility,
    pub is_readonly: bool,
}

pub struct ClassValue {
    pub name: Symbol,
    pub superclass: Option<Rc<ClassValue>>,
    /// Declaration-site environment; field initializers evaluate under it.
    pub closure: EnvRef,
    pub constructors: Vec<MethodDef>,
    pub methods: IndexMap<String, MethodDef>,
    pub fields: Vec<FieldDef>,
    /// Static fields and static methods, keyed by member name.
    pub statics: RefCell<IndexMap<String, (Value, Accessibility)>>,
}

impl ClassValue {
    /// Look up an instance method, walking the superclass chain. Returns the
    /// method and the class that defines it (the anchor for `super`).
    pub fn find_method(
        class: &Rc<ClassValue>,
        name: &str,
    ) -> Option<(MethodDef, Rc<ClassValue>)> {
        if let Some(method) = class.methods.get(name) {
            return Some((method.clone(), Rc::clone(class)));
        }
        class
            .superclass
            .as_ref()
            .and_then(|superclass| ClassValue::find_method(superclass, name))
    }

    /// Look up a field template by name, walking the superclass chain.
    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|field| field.name.as_str() == name)
            .or_else(|| {
                self.superclass
                    .as_ref()
                    .and_then(|superclass| superclass.find_field(name))
            })
    }

    /// All field templates, root class first so subclasses override.
    pub fn field_templates(&self) -> Vec<FieldDef> {
        let mut templates = match &self.superclass {
            Some(superclass) => superclass.field_templates(),
            None => Vec::new(),
        };
        templates.extend(self.fields.iter().cloned());
        templates
    }
}

impl fmt::Debug for ClassValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class {}>", self.name)
    }
}

#[derive(Debug)]
pub struct InstanceValue {
    pub class: Rc<ClassValue>,
    pub fields: IndexMap<String, Value>,
}

//=============================================
//            Section 2: Runtime Values
//=============================================

/// Kr runtime value types
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Boolean(bool),
    Null,
    Array(ArrayRef),
    Object(ObjectRef),
    Enum(Rc<EnumValue>),
    Function(Rc<FunctionValue>),
    Native(Rc<NativeFunction>),
    Class(Rc<ClassValue>),
    Instance(InstanceRef),
}

impl Value {
    /// Kr truthiness: only `null` and `false` are falsy. Zero and the empty
    /// string are truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            _ => true,
        }
    }

    /// Human-readable name for the underlying runtime variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Enum(_) => "enum",
            Value::Function(_) => "function",
            Value::Native(_) => "native function",
            Value::Class(_) => "class",
            Value::Instance(_) => "instance",
        }
    }

    /// Equality: primitives compare by value, containers by identity.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Enum(a), Value::Enum(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

fn write_numeric(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        write!(f, "{}", value as i64)
    } else {
        write!(f, "{}", value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write_numeric(f, *n),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, value) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            Value::Object(properties) => {
                write!(f, "{{")?;
                for (i, (key, value)) in properties.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Enum(def) => {
                write!(f, "{} {{", def.name)?;
                for (i, (key, value)) in def.members.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Function(function) => write!(f, "<fn {}>", function.name),
            Value::Native(native) => write!(f, "<native fn {}>", native.name),
            Value::Class(class) => write!(f, "<class {}>", class.name),
            Value::Instance(instance) => {
                write!(f, "{} instance", instance.borrow().class.name)
            }
        }
    }
}

//=============================================
// End Of krscript/interpreter/value.rs
//=============================================
