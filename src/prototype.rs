//! Built-in methods reachable through member access on primitive and
//! container values, e.g. `"ab".toUpperCase()` or `items.push(4)`.
//!
//! Each value tag owns a fixed table; lookup returns a `&'static Method` that
//! the evaluator binds to its receiver without allocating a closure.

use crate::{
    diagnostics::{LunaError, Result},
    runtime::Interpreter,
    stdlib::{ensure_exact, ensure_min, expect_number, expect_string},
    value::{Value, ValueKind},
};

pub type MethodFn = fn(&mut Interpreter, &Value, &[Value]) -> Result<Value>;

pub struct Method {
    pub name: &'static str,
    pub call: MethodFn,
}

const fn method(name: &'static str, call: MethodFn) -> Method {
    Method { name, call }
}

static NUMBER_METHODS: &[Method] = &[method("string", to_string)];

static BOOLEAN_METHODS: &[Method] = &[method("string", to_string)];

static STRING_METHODS: &[Method] = &[
    method("length", string_length),
    method("toUpperCase", string_to_upper),
    method("toLowerCase", string_to_lower),
    method("charAt", string_char_at),
    method("substring", string_substring),
    method("split", string_split),
];

static ARRAY_METHODS: &[Method] = &[
    method("length", array_length),
    method("push", array_push),
    method("pop", array_pop),
    method("join", array_join),
    method("includes", array_includes),
];

static OBJECT_METHODS: &[Method] = &[method("keys", object_keys), method("values", object_values)];

static FUNCTION_METHODS: &[Method] = &[method("call", function_call)];

pub fn methods_for(value: &Value) -> &'static [Method] {
    match value.kind() {
        ValueKind::Number(_) => NUMBER_METHODS,
        ValueKind::Bool(_) => BOOLEAN_METHODS,
        ValueKind::String(_) => STRING_METHODS,
        ValueKind::Array(_) => ARRAY_METHODS,
        ValueKind::Object(_) => OBJECT_METHODS,
        ValueKind::Function(_) => FUNCTION_METHODS,
        _ => &[],
    }
}

pub fn lookup(value: &Value, name: &str) -> Option<&'static Method> {
    methods_for(value).iter().find(|method| method.name == name)
}

fn to_string(_: &mut Interpreter, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_exact(args, 0, "string")?;
    Ok(Value::string(receiver.to_string()))
}

fn receiver_str(receiver: &Value) -> &str {
    receiver.as_str().unwrap_or_default()
}

fn string_length(_: &mut Interpreter, receiver: &Value, _: &[Value]) -> Result<Value> {
    Ok(Value::number(receiver_str(receiver).chars().count() as f64))
}

fn string_to_upper(_: &mut Interpreter, receiver: &Value, _: &[Value]) -> Result<Value> {
    Ok(Value::string(receiver_str(receiver).to_uppercase()))
}

fn string_to_lower(_: &mut Interpreter, receiver: &Value, _: &[Value]) -> Result<Value> {
    Ok(Value::string(receiver_str(receiver).to_lowercase()))
}

fn string_char_at(_: &mut Interpreter, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_exact(args, 1, "charAt")?;
    let index = expect_number(&args[0], "charAt")?;
    if !index.is_finite() || index < 0.0 {
        return Ok(Value::string(""));
    }
    let ch = receiver_str(receiver).chars().nth(index as usize);
    Ok(Value::string(ch.map(String::from).unwrap_or_default()))
}

fn string_substring(_: &mut Interpreter, receiver: &Value, args: &[Value]) -> Result<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(LunaError::runtime("substring expects one or two arguments"));
    }
    let chars: Vec<char> = receiver_str(receiver).chars().collect();
    let start = expect_number(&args[0], "substring")?;
    let end = match args.get(1) {
        Some(end) => expect_number(end, "substring")?,
        None => chars.len() as f64,
    };
    let in_bounds = start.is_finite()
        && end.is_finite()
        && start >= 0.0
        && start <= end
        && end <= chars.len() as f64;
    if !in_bounds {
        return Err(LunaError::runtime(format!(
            "substring indices out of bounds: {start}..{end} for length {}",
            chars.len()
        )));
    }
    Ok(Value::string(
        chars[start as usize..end as usize].iter().collect::<String>(),
    ))
}

fn string_split(_: &mut Interpreter, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_exact(args, 1, "split")?;
    let separator = expect_string(&args[0], "split")?;
    let text = receiver_str(receiver);
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|ch| Value::string(ch.to_string())).collect()
    } else {
        text.split(separator.as_str()).map(Value::string).collect()
    };
    Ok(Value::array(parts))
}

fn with_items<T>(receiver: &Value, f: impl FnOnce(&mut Vec<Value>) -> T) -> T {
    match receiver.kind() {
        ValueKind::Array(items) => f(&mut items.borrow_mut()),
        _ => f(&mut Vec::new()),
    }
}

fn snapshot(receiver: &Value) -> Vec<Value> {
    match receiver.kind() {
        ValueKind::Array(items) => items.borrow().clone(),
        _ => Vec::new(),
    }
}

fn array_length(_: &mut Interpreter, receiver: &Value, _: &[Value]) -> Result<Value> {
    Ok(Value::number(with_items(receiver, |items| items.len()) as f64))
}

fn array_push(_: &mut Interpreter, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_min(args, 1, "push")?;
    let len = with_items(receiver, |items| {
        items.extend_from_slice(args);
        items.len()
    });
    Ok(Value::number(len as f64))
}

fn array_pop(_: &mut Interpreter, receiver: &Value, _: &[Value]) -> Result<Value> {
    with_items(receiver, |items| items.pop())
        .ok_or_else(|| LunaError::runtime("pop called on an empty array"))
}

fn array_join(_: &mut Interpreter, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_exact(args, 1, "join")?;
    let separator = expect_string(&args[0], "join")?;
    let parts: Vec<String> = snapshot(receiver).iter().map(Value::to_string).collect();
    Ok(Value::string(parts.join(&separator)))
}

fn array_includes(_: &mut Interpreter, receiver: &Value, args: &[Value]) -> Result<Value> {
    ensure_exact(args, 1, "includes")?;
    let needle = &args[0];
    let found = snapshot(receiver)
        .iter()
        .any(|item| item.type_name() == needle.type_name() && item.repr() == needle.repr());
    Ok(Value::bool(found))
}

fn object_keys(_: &mut Interpreter, receiver: &Value, _: &[Value]) -> Result<Value> {
    let keys = match receiver.kind() {
        ValueKind::Object(props) => props.borrow().keys().cloned().map(Value::string).collect(),
        _ => Vec::new(),
    };
    Ok(Value::array(keys))
}

fn object_values(_: &mut Interpreter, receiver: &Value, _: &[Value]) -> Result<Value> {
    let values = match receiver.kind() {
        ValueKind::Object(props) => props.borrow().values().cloned().collect(),
        _ => Vec::new(),
    };
    Ok(Value::array(values))
}

fn function_call(interpreter: &mut Interpreter, receiver: &Value, args: &[Value]) -> Result<Value> {
    if let ValueKind::Function(function) = receiver.kind() {
        let expected = function.decl.params.len();
        if args.len() != expected {
            return Err(LunaError::runtime(format!(
                "function {} expects {expected} arguments, got {}",
                function.name().unwrap_or("lambda"),
                args.len()
            )));
        }
    }
    interpreter.call_value(receiver, args.to_vec())
}
