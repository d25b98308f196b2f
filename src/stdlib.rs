use std::io::BufRead;

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    diagnostics::{LunaError, Result},
    environment::EnvironmentRef,
    host::{HostContext, OutputSink},
    value::{Value, ValueKind, VARIADIC},
};

/// Registers the standard library into `env`. Every binding is constant.
pub fn install(env: &EnvironmentRef, host: &HostContext) {
    let mut scope = env.borrow_mut();
    scope.declare("length", Value::native("length", 1, length), true);
    scope.declare("int", Value::native("int", 1, to_int), true);
    scope.declare("float", Value::native("float", 1, to_float), true);
    scope.declare("string", Value::native("string", 1, to_string), true);
    let output = host.output().clone();
    scope.declare(
        "exit",
        Value::native("exit", VARIADIC, move |args, _| exit(args, &output)),
        true,
    );
    scope.declare("null", Value::null(), true);
    scope.declare("io", io_object(host), true);
    scope.declare("math", math_object(), true);
}

pub(crate) fn ensure_exact(args: &[Value], expected: usize, name: &str) -> Result<()> {
    if args.len() != expected {
        return Err(LunaError::runtime(format!(
            "{name} expects {expected} argument{}, got {}",
            if expected == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn ensure_min(args: &[Value], min: usize, name: &str) -> Result<()> {
    if args.len() < min {
        return Err(LunaError::runtime(format!(
            "{name} expects at least {min} argument{}, got {}",
            if min == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn expect_string(value: &Value, name: &str) -> Result<String> {
    value.as_str().map(str::to_string).ok_or_else(|| {
        LunaError::runtime(format!(
            "{name} expects a string, got {}",
            value.type_name()
        ))
    })
}

pub(crate) fn expect_number(value: &Value, name: &str) -> Result<f64> {
    value.as_number().ok_or_else(|| {
        LunaError::runtime(format!(
            "{name} expects a number, got {}",
            value.type_name()
        ))
    })
}

fn length(args: &[Value], _: &EnvironmentRef) -> Result<Value> {
    let len = match args[0].kind() {
        ValueKind::String(s) => s.chars().count(),
        ValueKind::Array(items) => items.borrow().len(),
        ValueKind::Object(props) => props.borrow().len(),
        _ => {
            return Err(LunaError::runtime(format!(
                "length not supported for type {}",
                args[0].type_name()
            )));
        }
    };
    Ok(Value::number(len as f64))
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

fn to_int(args: &[Value], _: &EnvironmentRef) -> Result<Value> {
    let value = match args[0].kind() {
        ValueKind::Number(n) => n.trunc(),
        ValueKind::String(s) => parse_number(s).map(f64::trunc).unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(Value::number(value))
}

fn to_float(args: &[Value], _: &EnvironmentRef) -> Result<Value> {
    let value = match args[0].kind() {
        ValueKind::Number(n) => *n,
        ValueKind::String(s) => parse_number(s).unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(Value::number(value))
}

fn to_string(args: &[Value], _: &EnvironmentRef) -> Result<Value> {
    match args[0].kind() {
        ValueKind::String(_) => Ok(args[0].clone()),
        _ => Ok(Value::string(args[0].to_string())),
    }
}

/// Ends the whole process. The host sink is flushed first; text captured in a
/// `Buffer` sink is not preserved, since the process is gone once this returns.
fn exit(args: &[Value], output: &OutputSink) -> Result<Value> {
    if args.len() > 1 {
        return Err(LunaError::runtime(format!(
            "exit expects at most 1 argument, got {}",
            args.len()
        )));
    }
    let code = match args.first() {
        Some(value) => expect_number(value, "exit")? as i32,
        None => 0,
    };
    debug!(code, "exit requested by script");
    output.flush()?;
    std::process::exit(code)
}

fn io_object(host: &HostContext) -> Value {
    let mut props = IndexMap::new();

    let output = host.output().clone();
    props.insert(
        "print".to_string(),
        Value::native("print", VARIADIC, move |args, _| {
            let line = args
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            output.write_line(&line)?;
            Ok(Value::void())
        }),
    );

    let output = host.output().clone();
    props.insert(
        "input".to_string(),
        Value::native("input", VARIADIC, move |args, _| {
            if let Some(prompt) = args.first().and_then(Value::as_str) {
                output.write(prompt)?;
            }
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            let trimmed = line.trim_end_matches(&['\n', '\r'][..]);
            Ok(Value::string(trimmed))
        }),
    );

    let clock = host.clone();
    props.insert(
        "time".to_string(),
        Value::native("time", 0, move |_, _| {
            Ok(Value::number(clock.elapsed().as_secs_f64() * 1000.0))
        }),
    );

    Value::object(props)
}

fn unary_math(name: &'static str, op: fn(f64) -> f64) -> Value {
    Value::native(name, 1, move |args, _| {
        Ok(Value::number(op(expect_number(&args[0], name)?)))
    })
}

fn fold_math(name: &'static str, init: f64, pick: fn(f64, f64) -> f64) -> Value {
    Value::native(name, VARIADIC, move |args, _| {
        let mut acc = init;
        for arg in args {
            acc = pick(acc, expect_number(arg, name)?);
        }
        Ok(Value::number(acc))
    })
}

fn math_object() -> Value {
    use std::f64::consts;

    let mut props = IndexMap::new();
    let functions = [
        unary_math("abs", f64::abs),
        unary_math("sqrt", f64::sqrt),
        unary_math("sin", f64::sin),
        unary_math("cos", f64::cos),
        unary_math("tan", f64::tan),
        unary_math("floor", f64::floor),
        unary_math("ceil", f64::ceil),
        unary_math("round", f64::round),
        unary_math("log", f64::ln),
        unary_math("exp", f64::exp),
        fold_math("min", f64::INFINITY, f64::min),
        fold_math("max", f64::NEG_INFINITY, f64::max),
        Value::native("pow", 2, |args, _| {
            let base = expect_number(&args[0], "pow")?;
            let exponent = expect_number(&args[1], "pow")?;
            Ok(Value::number(base.powf(exponent)))
        }),
        Value::native("random", 0, |_, _| Ok(Value::number(rand::random::<f64>()))),
    ];
    for function in functions {
        if let ValueKind::NativeFunction(native) = function.kind() {
            props.insert(native.name.clone(), function.clone());
        }
    }

    let constants = [
        ("PI", consts::PI),
        ("E", consts::E),
        ("LN2", consts::LN_2),
        ("LN10", consts::LN_10),
        ("LOG2E", consts::LOG2_E),
        ("LOG10E", consts::LOG10_E),
        ("SQRT1_2", consts::FRAC_1_SQRT_2),
        ("SQRT2", consts::SQRT_2),
    ];
    for (name, value) in constants {
        props.insert(name.to_string(), Value::number(value));
    }

    Value::object(props)
}
