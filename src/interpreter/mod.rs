//=============================================
// krscript/interpreter/mod.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Kr tree-walking interpreter
// Objective: Execute parsed Kr programs against chained environments with
//            explicit control-flow threading
//=============================================

pub mod environment;
pub mod errors;
pub mod value;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{Accessibility, AssignOp, BinaryOp, ClassDecl, EnumDecl, Expr, Stmt, UnaryOp};
use crate::symbol::Symbol;
use crate::tokenizer::Span;

pub use environment::{EnvRef, Environment};
pub use errors::{ErrorCode, ScriptError};
pub use value::{
    ClassValue, EnumValue, FieldDef, FunctionValue, InstanceRef, InstanceValue, MethodDef,
    NativeFunction, Value,
};

//=============================================
//            Section 1: Runtime Errors
//=============================================

/// Interpreter error types; every variant carries the source span it was
/// raised at.
#[derive(Debug, Clone)]
pub enum RuntimeError {
    UndefinedVariable {
        name: Symbol,
        span: Span,
    },
    UndefinedProperty {
        name: String,
        container: String,
        span: Span,
    },
    UndefinedIndex {
        index: f64,
        container: String,
        span: Span,
    },
    TypeError {
        message: String,
        span: Span,
    },
    NotCallable {
        type_name: &'static str,
        span: Span,
    },
    ArityMismatch {
        expected: usize,
        found: usize,
        span: Span,
    },
    NoMatchingConstructor {
        class: String,
        arities: Vec<usize>,
        found: usize,
        span: Span,
    },
    InvalidAssignmentTarget {
        span: Span,
    },
    ReadonlyField {
        name: String,
        span: Span,
    },
    InaccessibleMember {
        name: String,
        span: Span,
    },
    MalformedEnumMember {
        name: String,
        span: Span,
    },
    ControlFlowOutsideContext {
        keyword: &'static str,
        span: Span,
    },
}

impl RuntimeError {
    pub fn span(&self) -> Span {
        match self {
            RuntimeError::UndefinedVariable { span, .. }
            | RuntimeError::UndefinedProperty { span, .. }
            | RuntimeError::UndefinedIndex { span, .. }
            | RuntimeError::TypeError { span, .. }
            | RuntimeError::NotCallable { span, .. }
            | RuntimeError::ArityMismatch { span, .. }
            | RuntimeError::NoMatchingConstructor { span, .. }
            | RuntimeError::InvalidAssignmentTarget { span }
            | RuntimeError::ReadonlyField { span, .. }
            | RuntimeError::InaccessibleMember { span, .. }
            | RuntimeError::MalformedEnumMember { span, .. }
            | RuntimeError::ControlFlowOutsideContext { span, .. } => *span,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::UndefinedVariable { name, .. } => {
                write!(f, "Undefined variable {}.", name)
            }
            RuntimeError::UndefinedProperty {
                name, container, ..
            } => {
                write!(f, "Undefined property {} in {}.", name, container)
            }
            RuntimeError::UndefinedIndex {
                index, container, ..
            } => {
                write!(f, "Undefined index {} in {}.", index, container)
            }
            RuntimeError::TypeError { message, .. } => write!(f, "{}", message),
            RuntimeError::NotCallable { type_name, .. } => {
                write!(f, "Can only call functions and classes, got {}.", type_name)
            }
            RuntimeError::ArityMismatch {
                expected, found, ..
            } => {
                write!(
                    f,
                    "Expected {} argument{} but got {}.",
                    expected,
                    if *expected == 1 { "" } else { "s" },
                    found
                )
            }
            RuntimeError::NoMatchingConstructor {
                class,
                arities,
                found,
                ..
            } => {
                write!(
                    f,
                    "No constructor of {} takes {} argument{}; declared constructors take {:?}.",
                    class,
                    found,
                    if *found == 1 { "" } else { "s" },
                    arities
                )
            }
            RuntimeError::InvalidAssignmentTarget { .. } => {
                write!(f, "Invalid assignment target.")
            }
            RuntimeError::ReadonlyField { name, .. } => {
                write!(f, "Cannot assign to readonly field {}.", name)
            }
            RuntimeError::InaccessibleMember { name, .. } => {
                write!(f, "Property {} is not accessible here.", name)
            }
            RuntimeError::MalformedEnumMember { name, .. } => {
                write!(f, "Enum member {} must be a number or a string.", name)
            }
            RuntimeError::ControlFlowOutsideContext { keyword, .. } => {
                write!(f, "'{}' outside of its valid context.", keyword)
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

//=============================================
//            Section 2: Control Flow
//=============================================

/// Result of executing a statement. `Return`, `Break`, and `Continue` travel
/// back through enclosing blocks until a function call or loop absorbs them.
#[derive(Debug, Clone)]
pub enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

//=============================================
//            Section 3: Interpreter State
//=============================================

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    /// When set, `print` appends here instead of writing to stdout.
    output: Option<Rc<RefCell<Vec<String>>>>,
    /// Instances whose constructor is currently on the call stack; readonly
    /// fields are writable only for these.
    constructing: Vec<InstanceRef>,
}

fn native_print(interpreter: &mut Interpreter, args: &[Value]) -> Result<Value, RuntimeError> {
    interpreter.write_line(args[0].to_string());
    Ok(Value::Null)
}

static PRINT_PARAMETERS: [&str; 1] = ["text"];

impl Interpreter {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Interpreter whose `print` output is captured into `sink`.
    pub fn with_output(sink: Rc<RefCell<Vec<String>>>) -> Self {
        Self::build(Some(sink))
    }

    fn build(output: Option<Rc<RefCell<Vec<String>>>>) -> Self {
        let globals = Environment::new();
        globals.borrow_mut().define(
            Symbol::from("print"),
            Value::Native(Rc::new(NativeFunction {
                name: "print",
                parameters: &PRINT_PARAMETERS,
                body: native_print,
            })),
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            output,
            constructing: Vec::new(),
        }
    }

    pub fn globals(&self) -> EnvRef {
        Rc::clone(&self.globals)
    }

    fn write_line(&mut self, text: String) {
        match &self.output {
            Some(sink) => sink.borrow_mut().push(text),
            None => println!("{}", text),
        }
    }

    //=============================================
    //            Section 4: Statement Execution
    //=============================================

    /// Execute top-level statements in order. The first error aborts the run;
    /// control-flow signals may not escape the program.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                Flow::Return(_) => {
                    return Err(RuntimeError::ControlFlowOutsideContext {
                        keyword: "return",
                        span: stmt.span(),
                    });
                }
                Flow::Break => {
                    return Err(RuntimeError::ControlFlowOutsideContext {
                        keyword: "break",
                        span: stmt.span(),
                    });
                }
                Flow::Continue => {
                    return Err(RuntimeError::ControlFlowOutsideContext {
                        keyword: "continue",
                        span: stmt.span(),
                    });
                }
            }
        }
        Ok(())
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::VariableDeclaration(decl) => {
                let value = self.evaluate(&decl.init)?;
                self.environment
                    .borrow_mut()
                    .define(decl.name.name.clone(), value);
                Ok(Flow::Normal)
            }

            Stmt::FunctionDeclaration(decl) => {
                let function = Value::Function(Rc::new(FunctionValue {
                    name: decl.name.name.clone(),
                    parameters: decl.parameters.iter().map(|p| p.name.clone()).collect(),
                    body: decl.body.clone(),
                    closure: Rc::clone(&self.environment),
                    is_initializer: false,
                }));
                self.environment
                    .borrow_mut()
                    .define(decl.name.name.clone(), function);
                Ok(Flow::Normal)
            }

            Stmt::EnumDeclaration(decl) => self.execute_enum_declaration(decl),
            Stmt::ClassDeclaration(decl) => self.execute_class_declaration(decl),

            // Blocks run in the enclosing environment; only function calls
            // open a new scope.
            Stmt::Block(block) => self.execute_all(&block.body),

            Stmt::If(stmt) => {
                if self.evaluate(&stmt.test)?.is_truthy() {
                    self.execute_all(&stmt.consequent.body)
                } else if let Some(alternate) = &stmt.alternate {
                    self.execute(alternate)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::For(stmt) => {
                self.execute(&stmt.init)?;
                loop {
                    if !self.evaluate(&stmt.condition)?.is_truthy() {
                        break;
                    }
                    match self.execute_all(&stmt.body.body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                    self.evaluate(&stmt.update)?;
                }
                Ok(Flow::Normal)
            }

            Stmt::ForIn(stmt) => {
                let iterable = self.evaluate(&stmt.right)?;
                let keys: Vec<String> = match &iterable {
                    Value::Object(map) => map.borrow().keys().cloned().collect(),
                    Value::Enum(def) => def.members.borrow().keys().cloned().collect(),
                    other => {
                        return Err(RuntimeError::TypeError {
                            message: format!(
                                "for-in expects an object or enum, got {}.",
                                other.type_name()
                            ),
                            span: stmt.right.span(),
                        });
                    }
                };
                for key in keys {
                    self.environment
                        .borrow_mut()
                        .define(stmt.left.name.name.clone(), Value::String(key));
                    match self.execute_all(&stmt.body.body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::ForOf(stmt) => {
                let iterable = self.evaluate(&stmt.right)?;
                let items: Vec<Value> = match &iterable {
                    Value::Array(elements) => elements.borrow().clone(),
                    Value::String(text) => text
                        .chars()
                        .map(|ch| Value::String(ch.to_string()))
                        .collect(),
                    other => {
                        return Err(RuntimeError::TypeError {
                            message: format!(
                                "for-of expects an array, string, or range, got {}.",
                                other.type_name()
                            ),
                            span: stmt.right.span(),
                        });
                    }
                };
                for item in items {
                    self.environment
                        .borrow_mut()
                        .define(stmt.left.name.name.clone(), item);
                    match self.execute_all(&stmt.body.body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Return(stmt) => {
                let value = match &stmt.argument {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }

            Stmt::Break { .. } => Ok(Flow::Break),
            Stmt::Continue { .. } => Ok(Flow::Continue),

            Stmt::Expression { expr, .. } => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn execute_all(&mut self, statements: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    /// Members get ascending values starting at 0. An explicit numeric member
    /// moves the counter to its value plus one; string members leave it alone.
    fn execute_enum_declaration(&mut self, decl: &EnumDecl) -> Result<Flow, RuntimeError> {
        let mut members = IndexMap::new();
        let mut next = 0.0;

        for member in &decl.members {
            let value = match &member.initializer {
                Some(expr) => {
                    let value = self.evaluate(expr)?;
                    match &value {
                        Value::Number(n) => next = n + 1.0,
                        Value::String(_) => {}
                        _ => {
                            return Err(RuntimeError::MalformedEnumMember {
                                name: member.name.name.to_string(),
                                span: member.span,
                            });
                        }
                    }
                    value
                }
                None => {
                    let value = Value::Number(next);
                    next += 1.0;
                    value
                }
            };
            members.insert(member.name.name.to_string(), value);
        }

        let value = Value::Enum(Rc::new(EnumValue {
            name: decl.name.name.clone(),
            members: RefCell::new(members),
        }));
        self.environment
            .borrow_mut()
            .define(decl.name.name.clone(), value);
        Ok(Flow::Normal)
    }

    fn execute_class_declaration(&mut self, decl: &ClassDecl) -> Result<Flow, RuntimeError> {
        let superclass = match &decl.superclass {
            Some(ident) => match Environment::get(&self.environment, ident.name.as_str()) {
                Some(Value::Class(class)) => Some(class),
                Some(other) => {
                    return Err(RuntimeError::TypeError {
                        message: format!(
                            "Superclass of {} must be a class, got {}.",
                            decl.name.name,
                            other.type_name()
                        ),
                        span: ident.span,
                    });
                }
                None => {
                    return Err(RuntimeError::UndefinedVariable {
                        name: ident.name.clone(),
                        span: ident.span,
                    });
                }
            },
            None => None,
        };

        let closure = Rc::clone(&self.environment);
        let mut methods = IndexMap::new();
        let mut statics = IndexMap::new();

        for method in &decl.methods {
            let function = Rc::new(FunctionValue {
                name: method.name.name.clone(),
                parameters: method.parameters.iter().map(|p| p.name.clone()).collect(),
                body: method.body.clone(),
                closure: Rc::clone(&closure),
                is_initializer: false,
            });
            if method.is_static {
                statics.insert(
                    method.name.name.to_string(),
                    (Value::Function(function), method.accessibility),
                );
            } else {
                methods.insert(
                    method.name.name.to_string(),
                    MethodDef {
                        function,
                        accessibility: method.accessibility,
                    },
                );
            }
        }

        let constructors = decl
            .constructors
            .iter()
            .map(|constructor| MethodDef {
                function: Rc::new(FunctionValue {
                    name: constructor.name.name.clone(),
                    parameters: constructor
                        .parameters
                        .iter()
                        .map(|p| p.name.clone())
                        .collect(),
                    body: constructor.body.clone(),
                    closure: Rc::clone(&closure),
                    is_initializer: true,
                }),
                accessibility: constructor.accessibility,
            })
            .collect();

        let mut fields = Vec::new();
        for field in &decl.fields {
            if field.is_static {
                let value = match &field.value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Null,
                };
                statics.insert(field.name.name.to_string(), (value, field.accessibility));
            } else {
                fields.push(FieldDef {
                    name: field.name.name.clone(),
                    initializer: field.value.clone(),
                    accessibility: field.accessibility,
                    is_readonly: field.is_readonly,
                });
            }
        }

        let class = Rc::new(ClassValue {
            name: decl.name.name.clone(),
            superclass,
            closure,
            constructors,
            methods,
            fields,
            statics: RefCell::new(statics),
        });
        self.environment
            .borrow_mut()
            .define(decl.name.name.clone(), Value::Class(class));
        Ok(Flow::Normal)
    }

    //=============================================
    //            Section 5: Expression Evaluation
    //=============================================

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::NumericLiteral { value, .. } => Ok(Value::Number(*value)),
            Expr::StringLiteral { value, .. } => Ok(Value::String(value.clone())),
            Expr::BooleanLiteral { value, .. } => Ok(Value::Boolean(*value)),
            Expr::NullLiteral { .. } => Ok(Value::Null),

            Expr::Identifier(ident) => Environment::get(&self.environment, ident.name.as_str())
                .ok_or_else(|| RuntimeError::UndefinedVariable {
                    name: ident.name.clone(),
                    span: ident.span,
                }),

            Expr::This { span } => Environment::get(&self.environment, "this").ok_or_else(|| {
                RuntimeError::TypeError {
                    message: "'this' outside of a class method.".to_string(),
                    span: *span,
                }
            }),

            Expr::Super { span } => Err(RuntimeError::TypeError {
                message: "'super' can only be used for member access.".to_string(),
                span: *span,
            }),

            Expr::Unary {
                operator,
                right,
                span,
            } => {
                let value = self.evaluate(right)?;
                match operator {
                    UnaryOp::Negate => match value.as_number() {
                        Some(n) => Ok(Value::Number(-n)),
                        None => Err(RuntimeError::TypeError {
                            message: "Operand must be a number.".to_string(),
                            span: *span,
                        }),
                    },
                    UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
                }
            }

            Expr::Binary {
                left,
                operator,
                right,
                span,
            } => match operator {
                BinaryOp::And => {
                    let left = self.evaluate(left)?;
                    if !left.is_truthy() {
                        return Ok(Value::Boolean(false));
                    }
                    let right = self.evaluate(right)?;
                    Ok(Value::Boolean(right.is_truthy()))
                }
                BinaryOp::Or => {
                    let left = self.evaluate(left)?;
                    if left.is_truthy() {
                        return Ok(Value::Boolean(true));
                    }
                    let right = self.evaluate(right)?;
                    Ok(Value::Boolean(right.is_truthy()))
                }
                _ => {
                    let left = self.evaluate(left)?;
                    let right = self.evaluate(right)?;
                    self.binary_values(*operator, left, right, *span)
                }
            },

            Expr::Assignment {
                left,
                operator,
                right,
                span,
            } => {
                let value = self.evaluate(right)?;
                self.assign_into(left, *operator, value, *span)
            }

            Expr::Call { callee, args, span } => {
                let target = Environment::get(&self.environment, callee.name.as_str())
                    .ok_or_else(|| RuntimeError::UndefinedVariable {
                        name: callee.name.clone(),
                        span: callee.span,
                    })?;
                let args = self.evaluate_arguments(args)?;
                self.call_value(target, args, *span)
            }

            Expr::New {
                class_name,
                args,
                span,
            } => {
                let class = match Environment::get(&self.environment, class_name.name.as_str()) {
                    Some(Value::Class(class)) => class,
                    Some(other) => {
                        return Err(RuntimeError::TypeError {
                            message: format!(
                                "'{}' is not a class, got {}.",
                                class_name.name,
                                other.type_name()
                            ),
                            span: class_name.span,
                        });
                    }
                    None => {
                        return Err(RuntimeError::UndefinedVariable {
                            name: class_name.name.clone(),
                            span: class_name.span,
                        });
                    }
                };
                let args = self.evaluate_arguments(args)?;
                self.instantiate(class, args, *span)
            }

            Expr::Member {
                object,
                property,
                span,
            } => self.evaluate_member(object, property, *span),

            Expr::ArrayMember {
                object,
                index,
                span,
            } => {
                let container = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                self.read_index(&container, &index, *span)
            }

            Expr::Array { elements, .. } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate(element)?);
                }
                Ok(Value::Array(Rc::new(RefCell::new(values))))
            }

            Expr::Object { properties, .. } => {
                let mut map = IndexMap::new();
                for property in properties {
                    let value = self.evaluate(&property.value)?;
                    map.insert(property.key.name.to_string(), value);
                }
                Ok(Value::Object(Rc::new(RefCell::new(map))))
            }

            Expr::Range {
                start, step, end, ..
            } => {
                let start = self.require_number(start, "Range bounds must be numbers.")?;
                let step = self.require_number(step, "Range step must be a number.")?;
                let end = self.require_number(end, "Range bounds must be numbers.")?;

                let mut items = Vec::new();
                if step > 0.0 {
                    let mut x = start;
                    while x < end {
                        items.push(Value::Number(x));
                        x += step;
                    }
                } else if step < 0.0 {
                    let mut x = start;
                    while x > end {
                        items.push(Value::Number(x));
                        x += step;
                    }
                }
                Ok(Value::Array(Rc::new(RefCell::new(items))))
            }

            Expr::Paren { expr, .. } => self.evaluate(expr),
        }
    }

    fn evaluate_arguments(&mut self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg)?);
        }
        Ok(values)
    }

    fn require_number(&mut self, expr: &Expr, message: &str) -> Result<f64, RuntimeError> {
        let value = self.evaluate(expr)?;
        value.as_number().ok_or_else(|| RuntimeError::TypeError {
            message: message.to_string(),
            span: expr.span(),
        })
    }

    /// Arithmetic and comparison on already-evaluated operands. `+` is the
    /// one irregular case: string+string concatenates, and string+number or
    /// string+boolean stringifies the right side. The mirrored forms
    /// (number+string, boolean+string) stay errors.
    fn binary_values(
        &self,
        operator: BinaryOp,
        left: Value,
        right: Value,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match operator {
            BinaryOp::Add => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => {
                    Ok(Value::String(format!("{}{}", a, b)))
                }
                (Value::String(a), Value::Number(_)) | (Value::String(a), Value::Boolean(_)) => {
                    Ok(Value::String(format!("{}{}", a, right)))
                }
                _ => Err(RuntimeError::TypeError {
                    message: "Operands must be strings or numbers.".to_string(),
                    span,
                }),
            },
            BinaryOp::Subtract
            | BinaryOp::Multiply
            | BinaryOp::Divide
            | BinaryOp::Modulo
            | BinaryOp::Power => match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => Ok(Value::Number(match operator {
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Divide => a / b,
                    BinaryOp::Modulo => a % b,
                    _ => a.powf(b),
                })),
                _ => Err(RuntimeError::TypeError {
                    message: format!("Operands of '{}' must be numbers.", operator),
                    span,
                }),
            },
            BinaryOp::Equal => Ok(Value::Boolean(left.equals(&right))),
            BinaryOp::NotEqual => Ok(Value::Boolean(!left.equals(&right))),
            BinaryOp::Greater
            | BinaryOp::GreaterEqual
            | BinaryOp::Less
            | BinaryOp::LessEqual => match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => Ok(Value::Boolean(match operator {
                    BinaryOp::Greater => a > b,
                    BinaryOp::GreaterEqual => a >= b,
                    BinaryOp::Less => a < b,
                    _ => a <= b,
                })),
                _ => Err(RuntimeError::TypeError {
                    message: format!("Operands of '{}' must be numbers.", operator),
                    span,
                }),
            },
            BinaryOp::And | BinaryOp::Or => unreachable!("logical operators short-circuit"),
        }
    }

    //=============================================
    //            Section 6: Assignment Targets
    //=============================================

    fn assign_into(
        &mut self,
        target: &Expr,
        operator: AssignOp,
        value: Value,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match target {
            Expr::Identifier(ident) => {
                let new_value = match operator.binary_op() {
                    Some(op) => {
                        let current = Environment::get(&self.environment, ident.name.as_str())
                            .ok_or_else(|| RuntimeError::UndefinedVariable {
                                name: ident.name.clone(),
                                span: ident.span,
                            })?;
                        self.binary_values(op, current, value, span)?
                    }
                    None => value,
                };
                if Environment::assign(&self.environment, ident.name.as_str(), new_value.clone()) {
                    Ok(new_value)
                } else {
                    Err(RuntimeError::UndefinedVariable {
                        name: ident.name.clone(),
                        span: ident.span,
                    })
                }
            }

            Expr::Member {
                object, property, ..
            } => {
                let name = match property.as_ref() {
                    Expr::Identifier(ident) => ident.name.to_string(),
                    _ => return Err(RuntimeError::InvalidAssignmentTarget { span }),
                };
                let container = self.evaluate(object)?;
                self.assign_member(&container, object, &name, operator, value, span)
            }

            Expr::ArrayMember { object, index, .. } => {
                let container = self.evaluate(object)?;
                let index = self.evaluate(index)?;
                self.assign_index(&container, &index, operator, value, span)
            }

            _ => Err(RuntimeError::InvalidAssignmentTarget { span }),
        }
    }

    fn assign_member(
        &mut self,
        container: &Value,
        object_expr: &Expr,
        name: &str,
        operator: AssignOp,
        value: Value,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match container {
            Value::Object(map) => {
                let new_value = match operator.binary_op() {
                    Some(op) => {
                        let current = map.borrow().get(name).cloned().ok_or_else(|| {
                            RuntimeError::UndefinedProperty {
                                name: name.to_string(),
                                container: container.to_string(),
                                span,
                            }
                        })?;
                        self.binary_values(op, current, value, span)?
                    }
                    None => value,
                };
                map.borrow_mut().insert(name.to_string(), new_value.clone());
                Ok(new_value)
            }

            Value::Enum(def) => {
                let new_value = match operator.binary_op() {
                    Some(op) => {
                        let current = def.members.borrow().get(name).cloned().ok_or_else(|| {
                            RuntimeError::UndefinedProperty {
                                name: name.to_string(),
                                container: container.to_string(),
                                span,
                            }
                        })?;
                        self.binary_values(op, current, value, span)?
                    }
                    None => value,
                };
                def.members
                    .borrow_mut()
                    .insert(name.to_string(), new_value.clone());
                Ok(new_value)
            }

            Value::Instance(instance) => {
                self.check_instance_access(instance, object_expr, name, span)?;
                let readonly = instance
                    .borrow()
                    .class
                    .find_field(name)
                    .map(|field| field.is_readonly)
                    .unwrap_or(false);
                if readonly && !self.is_constructing(instance) {
                    return Err(RuntimeError::ReadonlyField {
                        name: name.to_string(),
                        span,
                    });
                }
                let new_value = match operator.binary_op() {
                    Some(op) => {
                        let current =
                            instance.borrow().fields.get(name).cloned().ok_or_else(|| {
                                RuntimeError::UndefinedProperty {
                                    name: name.to_string(),
                                    container: container.to_string(),
                                    span,
                                }
                            })?;
                        self.binary_values(op, current, value, span)?
                    }
                    None => value,
                };
                instance
                    .borrow_mut()
                    .fields
                    .insert(name.to_string(), new_value.clone());
                Ok(new_value)
            }

            Value::Class(class) => {
                let accessibility = class
                    .statics
                    .borrow()
                    .get(name)
                    .map(|(_, accessibility)| *accessibility)
                    .unwrap_or(Accessibility::Public);
                let new_value = match operator.binary_op() {
                    Some(op) => {
                        let current = class
                            .statics
                            .borrow()
                            .get(name)
                            .map(|(value, _)| value.clone())
                            .ok_or_else(|| RuntimeError::UndefinedProperty {
                                name: name.to_string(),
                                container: container.to_string(),
                                span,
                            })?;
                        self.binary_values(op, current, value, span)?
                    }
                    None => value,
                };
                class
                    .statics
                    .borrow_mut()
                    .insert(name.to_string(), (new_value.clone(), accessibility));
                Ok(new_value)
            }

            other => Err(RuntimeError::TypeError {
                message: format!("Cannot assign to a property of {}.", other.type_name()),
                span,
            }),
        }
    }

    fn assign_index(
        &mut self,
        container: &Value,
        index: &Value,
        operator: AssignOp,
        value: Value,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match (container, index) {
            (Value::Array(elements), Value::Number(n)) => {
                let position = self.array_position(elements, *n, container, span)?;
                let new_value = match operator.binary_op() {
                    Some(op) => {
                        let current = elements.borrow()[position].clone();
                        self.binary_values(op, current, value, span)?
                    }
                    None => value,
                };
                elements.borrow_mut()[position] = new_value.clone();
                Ok(new_value)
            }
            (Value::Object(_), Value::String(key)) | (Value::Enum(_), Value::String(key)) => {
                // Bracket syntax over maps mirrors dot access.
                self.assign_member(
                    container,
                    &Expr::NullLiteral { span },
                    key,
                    operator,
                    value,
                    span,
                )
            }
            (other, index) => Err(RuntimeError::TypeError {
                message: format!(
                    "Cannot index {} with {}.",
                    other.type_name(),
                    index.type_name()
                ),
                span,
            }),
        }
    }

    //=============================================
    //            Section 7: Members & Indexing
    //=============================================

    fn evaluate_member(
        &mut self,
        object: &Expr,
        property: &Expr,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        if matches!(object, Expr::Super { .. }) {
            return self.evaluate_super_member(property, span);
        }

        let container = self.evaluate(object)?;
        match property {
            Expr::Identifier(ident) => {
                self.read_member(&container, object, ident.name.as_str(), span)
            }
            Expr::Call {
                callee,
                args,
                span: call_span,
            } => {
                let name = callee.name.as_str();
                match &container {
                    Value::Instance(instance) => {
                        self.check_instance_access(instance, object, name, *call_span)?;
                        let field_value = instance.borrow().fields.get(name).cloned();
                        if let Some(value) = field_value {
                            let args = self.evaluate_arguments(args)?;
                            return self.call_value(value, args, *call_span);
                        }
                        let class = Rc::clone(&instance.borrow().class);
                        match ClassValue::find_method(&class, name) {
                            Some((method, defining)) => {
                                let args = self.evaluate_arguments(args)?;
                                self.call_method(
                                    &method,
                                    Value::Instance(Rc::clone(instance)),
                                    &defining,
                                    args,
                                    *call_span,
                                )
                            }
                            None => Err(RuntimeError::UndefinedProperty {
                                name: name.to_string(),
                                container: container.to_string(),
                                span: *call_span,
                            }),
                        }
                    }
                    _ => {
                        let value = self.read_member(&container, object, name, *call_span)?;
                        let args = self.evaluate_arguments(args)?;
                        self.call_value(value, args, *call_span)
                    }
                }
            }
            other => Err(RuntimeError::TypeError {
                message: "Property access must use a name.".to_string(),
                span: other.span(),
            }),
        }
    }

    fn read_member(
        &mut self,
        container: &Value,
        object_expr: &Expr,
        name: &str,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match container {
            Value::Object(map) => map.borrow().get(name).cloned().ok_or_else(|| {
                RuntimeError::UndefinedProperty {
                    name: name.to_string(),
                    container: container.to_string(),
                    span,
                }
            }),

            Value::Enum(def) => def.members.borrow().get(name).cloned().ok_or_else(|| {
                RuntimeError::UndefinedProperty {
                    name: name.to_string(),
                    container: container.to_string(),
                    span,
                }
            }),

            Value::Instance(instance) => {
                self.check_instance_access(instance, object_expr, name, span)?;
                if let Some(value) = instance.borrow().fields.get(name).cloned() {
                    return Ok(value);
                }
                let class = Rc::clone(&instance.borrow().class);
                match ClassValue::find_method(&class, name) {
                    Some((method, defining)) => Ok(self.bind_method(
                        &method,
                        Value::Instance(Rc::clone(instance)),
                        &defining,
                    )),
                    None => Err(RuntimeError::UndefinedProperty {
                        name: name.to_string(),
                        container: container.to_string(),
                        span,
                    }),
                }
            }

            Value::Class(class) => class
                .statics
                .borrow()
                .get(name)
                .map(|(value, _)| value.clone())
                .ok_or_else(|| RuntimeError::UndefinedProperty {
                    name: name.to_string(),
                    container: container.to_string(),
                    span,
                }),

            other => Err(RuntimeError::TypeError {
                message: format!("Values of type {} have no properties.", other.type_name()),
                span,
            }),
        }
    }

    fn read_index(
        &mut self,
        container: &Value,
        index: &Value,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match (container, index) {
            (Value::Array(elements), Value::Number(n)) => {
                let position = self.array_position(elements, *n, container, span)?;
                Ok(elements.borrow()[position].clone())
            }
            (Value::String(text), Value::Number(n)) => {
                if n.fract() != 0.0 || *n < 0.0 {
                    return Err(RuntimeError::UndefinedIndex {
                        index: *n,
                        container: container.to_string(),
                        span,
                    });
                }
                match text.chars().nth(*n as usize) {
                    Some(ch) => Ok(Value::String(ch.to_string())),
                    None => Err(RuntimeError::UndefinedIndex {
                        index: *n,
                        container: container.to_string(),
                        span,
                    }),
                }
            }
            (Value::Object(map), Value::String(key)) => {
                map.borrow().get(key.as_str()).cloned().ok_or_else(|| {
                    RuntimeError::UndefinedProperty {
                        name: key.clone(),
                        container: container.to_string(),
                        span,
                    }
                })
            }
            (Value::Enum(def), Value::String(key)) => def
                .members
                .borrow()
                .get(key.as_str())
                .cloned()
                .ok_or_else(|| RuntimeError::UndefinedProperty {
                    name: key.clone(),
                    container: container.to_string(),
                    span,
                }),
            (other, index) => Err(RuntimeError::TypeError {
                message: format!(
                    "Cannot index {} with {}.",
                    other.type_name(),
                    index.type_name()
                ),
                span,
            }),
        }
    }

    fn array_position(
        &self,
        elements: &Rc<RefCell<Vec<Value>>>,
        index: f64,
        container: &Value,
        span: Span,
    ) -> Result<usize, RuntimeError> {
        if index.fract() != 0.0 {
            return Err(RuntimeError::TypeError {
                message: "Array index must be an integer.".to_string(),
                span,
            });
        }
        let length = elements.borrow().len();
        if index < 0.0 || index >= length as f64 {
            return Err(RuntimeError::UndefinedIndex {
                index,
                container: container.to_string(),
                span,
            });
        }
        Ok(index as usize)
    }

    /// Non-public members are reachable only through `this` (or `super`).
    fn check_instance_access(
        &self,
        instance: &InstanceRef,
        object_expr: &Expr,
        name: &str,
        span: Span,
    ) -> Result<(), RuntimeError> {
        if matches!(object_expr, Expr::This { .. } | Expr::Super { .. }) {
            return Ok(());
        }
        let borrowed = instance.borrow();
        let accessibility = match borrowed.class.find_field(name) {
            Some(field) => Some(field.accessibility),
            None => ClassValue::find_method(&borrowed.class, name)
                .map(|(method, _)| method.accessibility),
        };
        match accessibility {
            None | Some(Accessibility::Public) => Ok(()),
            Some(_) => Err(RuntimeError::InaccessibleMember {
                name: name.to_string(),
                span,
            }),
        }
    }

    //=============================================
    //            Section 8: Calls, Methods, Instances
    //=============================================

    fn call_value(
        &mut self,
        target: Value,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match target {
            Value::Function(function) => self.call_function(&function, args, span),
            Value::Native(native) => {
                if args.len() != native.arity() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: native.arity(),
                        found: args.len(),
                        span,
                    });
                }
                (native.body)(self, &args)
            }
            other => Err(RuntimeError::NotCallable {
                type_name: other.type_name(),
                span,
            }),
        }
    }

    /// Calls bind parameters positionally in a fresh environment parented to
    /// the closure; arity must match exactly. A body that completes without
    /// `return` yields null.
    fn call_function(
        &mut self,
        function: &Rc<FunctionValue>,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        if args.len() != function.arity() {
            return Err(RuntimeError::ArityMismatch {
                expected: function.arity(),
                found: args.len(),
                span,
            });
        }

        let env = Environment::with_enclosing(Rc::clone(&function.closure));
        for (parameter, arg) in function.parameters.iter().zip(args) {
            env.borrow_mut().define(parameter.clone(), arg);
        }

        self.run_function_body(&function.body.body, env, span)
    }

    fn call_method(
        &mut self,
        method: &MethodDef,
        this_value: Value,
        defining: &Rc<ClassValue>,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let bound = self.bind_function(&method.function, this_value, defining);
        self.call_function(&bound, args, span)
    }

    /// Wrap a method so its closure sees `this` (and `super` when the
    /// defining class has a parent).
    fn bind_function(
        &self,
        function: &Rc<FunctionValue>,
        this_value: Value,
        defining: &Rc<ClassValue>,
    ) -> Rc<FunctionValue> {
        let env = Environment::with_enclosing(Rc::clone(&function.closure));
        env.borrow_mut().define(Symbol::from("this"), this_value);
        if let Some(superclass) = &defining.superclass {
            env.borrow_mut()
                .define(Symbol::from("super"), Value::Class(Rc::clone(superclass)));
        }
        Rc::new(FunctionValue {
            name: function.name.clone(),
            parameters: function.parameters.clone(),
            body: function.body.clone(),
            closure: env,
            is_initializer: function.is_initializer,
        })
    }

    fn bind_method(
        &self,
        method: &MethodDef,
        this_value: Value,
        defining: &Rc<ClassValue>,
    ) -> Value {
        Value::Function(self.bind_function(&method.function, this_value, defining))
    }

    fn run_function_body(
        &mut self,
        statements: &[Stmt],
        env: EnvRef,
        call_span: Span,
    ) -> Result<Value, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, env);
        let result = self.execute_all(statements);
        self.environment = previous;

        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Null),
            Flow::Break => Err(RuntimeError::ControlFlowOutsideContext {
                keyword: "break",
                span: call_span,
            }),
            Flow::Continue => Err(RuntimeError::ControlFlowOutsideContext {
                keyword: "continue",
                span: call_span,
            }),
        }
    }

    fn evaluate_super_member(
        &mut self,
        property: &Expr,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let superclass = match Environment::get(&self.environment, "super") {
            Some(Value::Class(class)) => class,
            _ => {
                return Err(RuntimeError::TypeError {
                    message: "'super' outside of a subclass method.".to_string(),
                    span,
                });
            }
        };
        let this_value =
            Environment::get(&self.environment, "this").ok_or(RuntimeError::TypeError {
                message: "'super' requires an enclosing instance.".to_string(),
                span,
            })?;

        match property {
            Expr::Identifier(ident) => {
                match ClassValue::find_method(&superclass, ident.name.as_str()) {
                    Some((method, defining)) => {
                        Ok(self.bind_method(&method, this_value, &defining))
                    }
                    None => Err(RuntimeError::UndefinedProperty {
                        name: ident.name.to_string(),
                        container: format!("<class {}>", superclass.name),
                        span: ident.span,
                    }),
                }
            }
            Expr::Call {
                callee,
                args,
                span: call_span,
            } => match ClassValue::find_method(&superclass, callee.name.as_str()) {
                Some((method, defining)) => {
                    let args = self.evaluate_arguments(args)?;
                    self.call_method(&method, this_value, &defining, args, *call_span)
                }
                None => Err(RuntimeError::UndefinedProperty {
                    name: callee.name.to_string(),
                    container: format!("<class {}>", superclass.name),
                    span: *call_span,
                }),
            },
            other => Err(RuntimeError::TypeError {
                message: "Property access must use a name.".to_string(),
                span: other.span(),
            }),
        }
    }

    fn instantiate(
        &mut self,
        class: Rc<ClassValue>,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        let instance = Rc::new(RefCell::new(InstanceValue {
            class: Rc::clone(&class),
            fields: IndexMap::new(),
        }));

        self.constructing.push(Rc::clone(&instance));
        let result = self.initialize_instance(&class, &instance, args, span);
        self.constructing.pop();

        result.map(|_| Value::Instance(instance))
    }

    fn initialize_instance(
        &mut self,
        class: &Rc<ClassValue>,
        instance: &InstanceRef,
        args: Vec<Value>,
        span: Span,
    ) -> Result<(), RuntimeError> {
        // Field initializers run under the declaration environment with
        // `this` in scope, root class first.
        let field_env = Environment::with_enclosing(Rc::clone(&class.closure));
        field_env
            .borrow_mut()
            .define(Symbol::from("this"), Value::Instance(Rc::clone(instance)));

        let previous = std::mem::replace(&mut self.environment, field_env);
        let mut outcome = Ok(());
        for template in class.field_templates() {
            let value = match &template.initializer {
                Some(expr) => match self.evaluate(expr) {
                    Ok(value) => value,
                    Err(err) => {
                        outcome = Err(err);
                        break;
                    }
                },
                None => Value::Null,
            };
            instance
                .borrow_mut()
                .fields
                .insert(template.name.to_string(), value);
        }
        self.environment = previous;
        outcome?;

        if class.constructors.is_empty() {
            if args.is_empty() {
                return Ok(());
            }
            return Err(RuntimeError::NoMatchingConstructor {
                class: class.name.to_string(),
                arities: vec![0],
                found: args.len(),
                span,
            });
        }

        let selected = class
            .constructors
            .iter()
            .find(|constructor| constructor.function.arity() == args.len());
        match selected {
            Some(constructor) => {
                self.call_method(
                    constructor,
                    Value::Instance(Rc::clone(instance)),
                    class,
                    args,
                    span,
                )?;
                Ok(())
            }
            None => Err(RuntimeError::NoMatchingConstructor {
                class: class.name.to_string(),
                arities: class
                    .constructors
                    .iter()
                    .map(|constructor| constructor.function.arity())
                    .collect(),
                found: args.len(),
                span,
            }),
        }
    }

    fn is_constructing(&self, instance: &InstanceRef) -> bool {
        self.constructing
            .iter()
            .any(|candidate| Rc::ptr_eq(candidate, instance))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

//=============================================
// End Of krscript/interpreter/mod.rs
//=============================================
