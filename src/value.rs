use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use crate::{
    ast::FunctionDecl,
    diagnostics::{Diagnostic, LunaError, Result},
    environment::EnvironmentRef,
    prototype::Method,
};

/// Arity marker for natives that validate their own argument count.
pub const VARIADIC: usize = usize::MAX;

#[derive(Clone)]
pub struct Value(pub Rc<ValueKind>);

pub enum ValueKind {
    Null,
    Undefined,
    /// Result of statements and of calls that never `return`.
    Void,
    Number(f64),
    Bool(bool),
    String(String),
    Array(RefCell<Vec<Value>>),
    Object(RefCell<IndexMap<String, Value>>),
    Function(UserFunction),
    NativeFunction(NativeFunction),
    Method(BoundMethod),
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self(Rc::new(kind))
    }

    pub fn null() -> Self {
        Self::new(ValueKind::Null)
    }

    pub fn undefined() -> Self {
        Self::new(ValueKind::Undefined)
    }

    pub fn void() -> Self {
        Self::new(ValueKind::Void)
    }

    pub fn number(value: f64) -> Self {
        Self::new(ValueKind::Number(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ValueKind::Bool(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(ValueKind::String(value.into()))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Self::new(ValueKind::Array(RefCell::new(values)))
    }

    pub fn object(entries: IndexMap<String, Value>) -> Self {
        Self::new(ValueKind::Object(RefCell::new(entries)))
    }

    pub fn function(decl: Rc<FunctionDecl>, env: EnvironmentRef) -> Self {
        Self::new(ValueKind::Function(UserFunction { decl, env }))
    }

    pub fn native<F>(name: impl Into<String>, arity: usize, callback: F) -> Self
    where
        F: Fn(&[Value], &EnvironmentRef) -> Result<Value> + 'static,
    {
        Self::new(ValueKind::NativeFunction(NativeFunction {
            name: name.into(),
            arity,
            callback: Rc::new(callback),
        }))
    }

    pub fn method(receiver: Value, method: &'static Method) -> Self {
        Self::new(ValueKind::Method(BoundMethod { receiver, method }))
    }

    pub fn kind(&self) -> &ValueKind {
        &self.0
    }

    pub fn is_truthy(&self) -> bool {
        match &*self.0 {
            ValueKind::Null | ValueKind::Undefined | ValueKind::Void => false,
            ValueKind::Number(n) => *n != 0.0 && !n.is_nan(),
            ValueKind::Bool(b) => *b,
            ValueKind::String(s) => !s.is_empty(),
            ValueKind::Array(items) => !items.borrow().is_empty(),
            ValueKind::Object(props) => !props.borrow().is_empty(),
            ValueKind::Function(_) | ValueKind::NativeFunction(_) | ValueKind::Method(_) => true,
        }
    }

    /// Type tag as reported by `typeof`.
    pub fn type_name(&self) -> &'static str {
        match &*self.0 {
            ValueKind::Null => "null",
            ValueKind::Undefined => "undef",
            ValueKind::Void => "void",
            ValueKind::Number(_) => "number",
            ValueKind::Bool(_) => "boolean",
            ValueKind::String(_) => "string",
            ValueKind::Array(_) => "array",
            ValueKind::Object(_) => "object",
            ValueKind::Function(_) => "function",
            ValueKind::NativeFunction(_) | ValueKind::Method(_) => "native-fn",
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(&*self.0, ValueKind::Void)
    }

    pub fn as_number(&self) -> Option<f64> {
        match &*self.0 {
            ValueKind::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &*self.0 {
            ValueKind::String(s) => Some(s),
            _ => None,
        }
    }

    /// Shallow equality: containers and functions never compare equal.
    pub fn equals(&self, other: &Value) -> bool {
        match (&*self.0, &*other.0) {
            (ValueKind::Null, ValueKind::Null)
            | (ValueKind::Undefined, ValueKind::Undefined)
            | (ValueKind::Void, ValueKind::Void) => true,
            (ValueKind::Number(a), ValueKind::Number(b)) => a == b,
            (ValueKind::Bool(a), ValueKind::Bool(b)) => a == b,
            (ValueKind::String(a), ValueKind::String(b)) => a == b,
            _ => false,
        }
    }

    /// Quoted rendering used inside containers and by `debug`.
    pub fn repr(&self) -> String {
        format!("{self:?}")
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, quoted: bool) -> fmt::Result {
        match &*self.0 {
            ValueKind::Null => write!(f, "null"),
            ValueKind::Undefined => write!(f, "undef"),
            ValueKind::Void => Ok(()),
            ValueKind::Number(n) => write!(f, "{}", format_number(*n)),
            ValueKind::Bool(b) => write!(f, "{b}"),
            ValueKind::String(s) if quoted => write!(f, "'{s}'"),
            ValueKind::String(s) => write!(f, "{s}"),
            ValueKind::Array(items) => {
                write!(f, "[")?;
                for (idx, item) in items.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    item.render(f, true)?;
                }
                write!(f, "]")
            }
            ValueKind::Object(props) => {
                write!(f, "{{")?;
                for (idx, (key, value)) in props.borrow().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: ")?;
                    value.render(f, true)?;
                }
                write!(f, "}}")
            }
            ValueKind::Function(fun) => write!(f, "{fun}"),
            ValueKind::NativeFunction(native) => write!(f, "fn {}", native.name),
            ValueKind::Method(bound) => write!(f, "fn {}", bound.method.name),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, true)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, false)
    }
}

/// Integral finite numbers print without a fractional part.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let text = if n > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

#[derive(Clone)]
pub struct UserFunction {
    pub decl: Rc<FunctionDecl>,
    /// Scope the function was declared in, shared rather than copied.
    pub env: EnvironmentRef,
}

impl UserFunction {
    pub fn name(&self) -> Option<&str> {
        self.decl.name.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.decl.name.is_none()
    }
}

impl fmt::Display for UserFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.decl.exported {
            write!(f, "out ")?;
        }
        if self.is_anonymous() {
            write!(f, "lambda")?;
        } else {
            write!(f, "fn {}", self.name().unwrap_or_default())?;
        }
        for param in &self.decl.params {
            write!(f, " {}", param.name)?;
            if param.default.is_some() {
                write!(f, "=(...)")?;
            }
        }
        write!(f, " {{ ... }}")
    }
}

pub type NativeCallback = dyn Fn(&[Value], &EnvironmentRef) -> Result<Value>;

#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub callback: Rc<NativeCallback>,
}

impl NativeFunction {
    pub fn call(&self, args: &[Value], env: &EnvironmentRef) -> Result<Value> {
        if self.arity != VARIADIC && args.len() != self.arity {
            return Err(LunaError::from(Diagnostic::runtime(format!(
                "{} expects {} argument{}, got {}",
                self.name,
                self.arity,
                if self.arity == 1 { "" } else { "s" },
                args.len()
            ))));
        }
        (self.callback)(args, env)
    }
}

/// A prototype method looked up on a receiver, e.g. `items.push`.
#[derive(Clone)]
pub struct BoundMethod {
    pub receiver: Value,
    pub method: &'static Method,
}
