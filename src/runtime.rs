use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace, warn};

use crate::{
    ast::{
        BinaryOp, ComparisonOp, DeclKind, EqualityOp, Expr, ExprKind, Literal, LogicalOp,
        Program, Property, Stmt, StmtKind, UnaryOp,
    },
    diagnostics::{LunaError, Result},
    environment::{Environment, EnvironmentRef},
    host::HostContext,
    parser, prototype,
    value::{format_number, UserFunction, Value, ValueKind},
};

/// Evaluates `program` against `env` with a stdout host and no standard library.
pub fn evaluate(program: &Program, env: &EnvironmentRef) -> Result<Value> {
    Interpreter::with_environment(Rc::clone(env), HostContext::stdout()).evaluate(program, env)
}

pub struct Interpreter {
    env: EnvironmentRef,
    host: HostContext,
}

impl Interpreter {
    /// Fresh global scope with the standard library writing to stdout.
    pub fn new() -> Self {
        Self::with_host(HostContext::stdout())
    }

    pub fn with_host(host: HostContext) -> Self {
        let interpreter = Self::bare(host);
        crate::stdlib::install(&interpreter.env, &interpreter.host);
        interpreter
    }

    /// Fresh global scope with nothing installed.
    pub fn bare(host: HostContext) -> Self {
        Self::with_environment(Environment::new(), host)
    }

    pub fn with_environment(env: EnvironmentRef, host: HostContext) -> Self {
        Self { env, host }
    }

    pub fn environment(&self) -> EnvironmentRef {
        Rc::clone(&self.env)
    }

    pub fn host(&self) -> &HostContext {
        &self.host
    }

    /// Parses and runs `source` in the interpreter's global scope. Safe to call
    /// repeatedly; bindings persist between calls.
    pub fn eval_source(&mut self, source: &str) -> Result<Value> {
        let program = parser::parse_source(source)?;
        let env = self.environment();
        self.evaluate(&program, &env)
            .map_err(|err| err.with_source(source))
    }

    /// Runs every statement in order and yields the last statement's value. A
    /// top-level `return` stops the program early with its value.
    pub fn evaluate(&mut self, program: &Program, env: &EnvironmentRef) -> Result<Value> {
        debug!(statements = program.body.len(), "evaluating program");
        self.in_scope(Rc::clone(env), |interp| {
            match interp.execute_block(&program.body)? {
                FlowControl::Value(value) | FlowControl::Return(value) => Ok(value),
            }
        })
    }

    pub fn call_value(&mut self, callee: &Value, args: Vec<Value>) -> Result<Value> {
        match callee.kind() {
            ValueKind::Function(function) => self.call_function(function, args),
            ValueKind::NativeFunction(native) => {
                trace!(name = %native.name, args = args.len(), "calling native function");
                native.call(&args, &self.env)
            }
            ValueKind::Method(bound) => (bound.method.call)(self, &bound.receiver, &args),
            _ => Err(LunaError::runtime(format!(
                "cannot call non-function value of type {}",
                callee.type_name()
            ))),
        }
    }

    fn call_function(&mut self, function: &UserFunction, args: Vec<Value>) -> Result<Value> {
        trace!(
            name = function.name().unwrap_or("lambda"),
            args = args.len(),
            "calling function"
        );
        let scope = Environment::with_parent(Rc::clone(&function.env));
        let mut args = args.into_iter();
        for param in &function.decl.params {
            let value = match (args.next(), &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => {
                    self.in_scope(Rc::clone(&function.env), |interp| interp.eval(default))?
                }
                (None, None) => Value::undefined(),
            };
            scope.borrow_mut().declare(param.name.clone(), value, false);
        }

        let decl = Rc::clone(&function.decl);
        self.in_scope(scope, |interp| {
            for stmt in &decl.body {
                if let FlowControl::Return(value) = interp.execute(stmt)? {
                    return Ok(value);
                }
            }
            Ok(Value::void())
        })
    }

    /// Runs `body` with `env` as the current scope, restoring the previous
    /// scope whether or not `body` fails.
    fn in_scope<T>(
        &mut self,
        env: EnvironmentRef,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = std::mem::replace(&mut self.env, env);
        let result = body(self);
        self.env = previous;
        result
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<FlowControl> {
        match &stmt.kind {
            StmtKind::Expr(expr) => Ok(FlowControl::Value(self.eval(expr)?)),
            StmtKind::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.execute_block(consequent)
                } else {
                    self.execute_block(alternate)
                }
            }
            StmtKind::While { test, body } => {
                let mut last = Value::void();
                while self.eval(test)?.is_truthy() {
                    match self.execute_block(body)? {
                        FlowControl::Value(value) => last = value,
                        flow @ FlowControl::Return(_) => return Ok(flow),
                    }
                }
                Ok(FlowControl::Value(last))
            }
            StmtKind::For {
                init,
                test,
                update,
                body,
            } => {
                let scope = Environment::with_parent(Rc::clone(&self.env));
                self.in_scope(scope, |interp| {
                    interp.eval(init)?;
                    let mut last = Value::void();
                    while interp.eval(test)?.is_truthy() {
                        match interp.execute_block(body)? {
                            FlowControl::Value(value) => last = value,
                            flow @ FlowControl::Return(_) => return Ok(flow),
                        }
                        interp.eval(update)?;
                    }
                    Ok(FlowControl::Value(last))
                })
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::void(),
                };
                Ok(FlowControl::Return(value))
            }
            StmtKind::Debug(values) => {
                let mut rendered = Vec::with_capacity(values.len());
                for expr in values {
                    rendered.push(self.eval(expr)?.repr());
                }
                self.host
                    .output()
                    .write_line(&format!("DEBUG: {}", rendered.join(", ")))?;
                Ok(FlowControl::Value(Value::void()))
            }
            StmtKind::Use(path) => {
                warn!(path = %path, "`use` is not supported yet; nothing was imported");
                Ok(FlowControl::Value(Value::void()))
            }
        }
    }

    /// Runs statements in the current scope; `if` and `while` bodies do not
    /// open a scope of their own.
    fn execute_block(&mut self, statements: &[Stmt]) -> Result<FlowControl> {
        let mut last = Value::void();
        for stmt in statements {
            match self.execute(stmt)? {
                FlowControl::Value(value) => last = value,
                flow @ FlowControl::Return(_) => return Ok(flow),
            }
        }
        Ok(FlowControl::Value(last))
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value> {
        let position = expr.position;
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(self.literal(literal)),
            ExprKind::Identifier(name) => Ok(Environment::lookup(&self.env, name)),
            ExprKind::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element)?);
                }
                Ok(Value::array(values))
            }
            ExprKind::Object(properties) => {
                let mut map = IndexMap::new();
                for (key, value_expr) in properties {
                    let value = self.eval(value_expr)?;
                    map.insert(key.clone(), value);
                }
                Ok(Value::object(map))
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                binary(*op, &left, &right).map_err(|err| err.at(position))
            }
            ExprKind::Equality { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                let equal = left.equals(&right);
                Ok(Value::bool(match op {
                    EqualityOp::Equal => equal,
                    EqualityOp::NotEqual => !equal,
                }))
            }
            ExprKind::Comparison { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                compare(*op, &left, &right).map_err(|err| err.at(position))
            }
            ExprKind::Logical { op, left, right } => {
                let left = self.eval(left)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right),
                }
            }
            ExprKind::Unary { op, operand } => {
                self.unary(*op, operand).map_err(|err| err.at(position))
            }
            ExprKind::Assign { target, value } => {
                self.assign(target, value).map_err(|err| err.at(position))
            }
            ExprKind::Declare { kind, name, value } => {
                let value = self.eval(value)?;
                self.env
                    .borrow_mut()
                    .declare(name.clone(), value.clone(), *kind == DeclKind::Const);
                Ok(value)
            }
            ExprKind::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                self.call_value(&callee, values)
                    .map_err(|err| err.at(position))
            }
            ExprKind::Member { object, property } => {
                let object = self.eval(object)?;
                let key = self.property_key(property)?;
                member(&object, &key).map_err(|err| err.at(position))
            }
            ExprKind::Ternary {
                condition,
                consequent,
                alternate,
            } => {
                if self.eval(condition)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            ExprKind::Typeof(operand) => {
                let value = self.eval(operand)?;
                Ok(Value::string(value.type_name()))
            }
            ExprKind::Function(decl) => {
                let function = Value::function(Rc::clone(decl), Rc::clone(&self.env));
                if let Some(name) = &decl.name {
                    self.env
                        .borrow_mut()
                        .declare(name.clone(), function.clone(), true);
                }
                Ok(function)
            }
        }
    }

    fn literal(&self, literal: &Literal) -> Value {
        match literal {
            Literal::Number(n) => Value::number(*n),
            Literal::String(text) => Value::string(self.interpolate(text)),
            Literal::Bool(b) => Value::bool(*b),
            Literal::Undefined => Value::undefined(),
            Literal::Null => Value::null(),
        }
    }

    /// Replaces `{name}` with the display form of `name` when it is bound in
    /// the visible scope chain; any other braces are left as written.
    fn interpolate(&self, text: &str) -> String {
        if !text.contains('{') {
            return text.to_string();
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end)
                    if is_identifier(&after[..end]) && Environment::has(&self.env, &after[..end]) =>
                {
                    let value = Environment::lookup(&self.env, &after[..end]);
                    out.push_str(&value.to_string());
                    rest = &after[end + 1..];
                }
                _ => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value> {
        match op {
            UnaryOp::Not => Ok(Value::bool(!self.eval(operand)?.is_truthy())),
            UnaryOp::Plus | UnaryOp::Minus => {
                let value = self.eval(operand)?;
                match (op, value.as_number()) {
                    (UnaryOp::Minus, Some(n)) => Ok(Value::number(-n)),
                    (_, Some(_)) => Ok(value),
                    (UnaryOp::Minus, None) => Err(LunaError::runtime(format!(
                        "cannot negate value of type {}",
                        value.type_name()
                    ))),
                    (_, None) => Err(LunaError::runtime(format!(
                        "cannot apply unary `+` to value of type {}",
                        value.type_name()
                    ))),
                }
            }
            UnaryOp::PreIncrement
            | UnaryOp::PreDecrement
            | UnaryOp::PostIncrement
            | UnaryOp::PostDecrement => self.update(op, operand),
        }
    }

    /// `++`/`--` in either position; only plain identifiers holding numbers.
    fn update(&mut self, op: UnaryOp, operand: &Expr) -> Result<Value> {
        let symbol = match op {
            UnaryOp::PreIncrement | UnaryOp::PostIncrement => "++",
            _ => "--",
        };
        let ExprKind::Identifier(name) = &operand.kind else {
            return Err(LunaError::runtime(format!(
                "`{symbol}` is only valid on identifiers"
            )));
        };
        let Some(current) = Environment::lookup(&self.env, name).as_number() else {
            return Err(LunaError::runtime(format!(
                "cannot apply `{symbol}` to non-number variable `{name}`"
            )));
        };
        let updated = if symbol == "++" {
            current + 1.0
        } else {
            current - 1.0
        };
        Environment::assign(&self.env, name, Value::number(updated));
        Ok(Value::number(match op {
            UnaryOp::PostIncrement | UnaryOp::PostDecrement => current,
            _ => updated,
        }))
    }

    fn assign(&mut self, target: &Expr, value: &Expr) -> Result<Value> {
        match &target.kind {
            ExprKind::Identifier(name) => {
                let value = self.eval(value)?;
                Environment::assign(&self.env, name, value.clone());
                Ok(value)
            }
            ExprKind::Member { object, property } => {
                let object = self.eval(object)?;
                let key = self.property_key(property)?;
                let value = self.eval(value)?;
                set_member(&object, &key, value.clone())?;
                Ok(value)
            }
            _ => Err(LunaError::runtime("invalid assignment target")),
        }
    }

    fn property_key(&mut self, property: &Property) -> Result<Value> {
        match property {
            Property::Named(name) => Ok(Value::string(name.clone())),
            Property::Computed(expr) => self.eval(expr),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of executing a statement: either its value, or a `return` unwinding
/// to the nearest function call.
enum FlowControl {
    Value(Value),
    Return(Value),
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        let result = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div if b == 0.0 => f64::INFINITY,
            BinaryOp::Div => a / b,
            BinaryOp::Mod => a % b,
            BinaryOp::Pow => a.powf(b),
        };
        return Ok(Value::number(result));
    }
    let is_string = |value: &Value| matches!(value.kind(), ValueKind::String(_));
    if op == BinaryOp::Add && (is_string(left) || is_string(right)) {
        return Ok(Value::string(format!("{left}{right}")));
    }
    Err(LunaError::runtime(format!(
        "unsupported binary operation: {} {} {}",
        left.type_name(),
        op.symbol(),
        right.type_name()
    )))
}

fn compare(op: ComparisonOp, left: &Value, right: &Value) -> Result<Value> {
    let (Some(a), Some(b)) = (left.as_number(), right.as_number()) else {
        return Err(LunaError::runtime(format!(
            "cannot compare non-numeric values: {} and {}",
            left.type_name(),
            right.type_name()
        )));
    };
    Ok(Value::bool(match op {
        ComparisonOp::Less => a < b,
        ComparisonOp::LessEqual => a <= b,
        ComparisonOp::Greater => a > b,
        ComparisonOp::GreaterEqual => a >= b,
    }))
}

fn key_string(key: &Value) -> Result<String> {
    match key.kind() {
        ValueKind::String(s) => Ok(s.clone()),
        ValueKind::Number(n) => Ok(format_number(*n)),
        _ => Err(LunaError::runtime(format!(
            "invalid property key of type {}",
            key.type_name()
        ))),
    }
}

/// Own elements and properties first, then the prototype table; `undef` when
/// neither resolves.
fn member(object: &Value, key: &Value) -> Result<Value> {
    let key = key_string(key)?;
    match object.kind() {
        ValueKind::Array(items) => {
            if let Ok(index) = key.parse::<usize>() {
                if let Some(value) = items.borrow().get(index) {
                    return Ok(value.clone());
                }
            }
        }
        ValueKind::Object(props) => {
            if let Some(value) = props.borrow().get(&key) {
                return Ok(value.clone());
            }
        }
        _ => {}
    }
    Ok(prototype::lookup(object, &key)
        .map(|method| Value::method(object.clone(), method))
        .unwrap_or_else(Value::undefined))
}

fn set_member(object: &Value, key: &Value, value: Value) -> Result<()> {
    match object.kind() {
        ValueKind::Object(props) => {
            props.borrow_mut().insert(key_string(key)?, value);
            Ok(())
        }
        ValueKind::Array(items) => {
            let index = match key.kind() {
                ValueKind::Number(n) => *n,
                ValueKind::String(s) => s.parse::<f64>().map_err(|_| {
                    LunaError::runtime(format!("invalid array index `{s}`"))
                })?,
                _ => {
                    return Err(LunaError::runtime(format!(
                        "array index must be a number, got {}",
                        key.type_name()
                    )));
                }
            };
            let mut items = items.borrow_mut();
            let len = items.len();
            if !index.is_finite() || index < 0.0 || index.trunc() as usize >= len {
                return Err(LunaError::runtime(format!(
                    "array index {} out of bounds for length {len}",
                    format_number(index)
                )));
            }
            items[index.trunc() as usize] = value;
            Ok(())
        }
        _ => Err(LunaError::runtime(format!(
            "cannot assign property on value of type {}",
            object.type_name()
        ))),
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}
