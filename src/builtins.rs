//! Builtin functions installed into the global scope

use crate::environment::Environment;
use crate::error::ErrorKind;
use crate::value::{Builtin, Value};

/// Every builtin, in registration order
pub fn builtins() -> Vec<Builtin> {
    vec![
        // print(args...)
        Builtin::new("print", None, |interp, args| {
            let line: Vec<String> = args.iter().map(Value::to_string).collect();
            interp.output().println(&line.join(" "));
            Ok(Value::Nothing)
        }),
        // int(val)
        Builtin::new("int", Some(1), |_interp, args| match &args[0] {
            Value::Int(n) => Ok(Value::Int(*n)),
            Value::Float(n) => float_to_int(*n)
                .map(Value::Int)
                .ok_or_else(|| conversion(&args[0], "int")),
            Value::Bool(b) => Ok(Value::Int(*b as i64)),
            Value::String(s) => {
                let text = s.trim();
                text.parse::<i64>()
                    .ok()
                    .or_else(|| {
                        text.parse::<f64>().ok().and_then(float_to_int)
                    })
                    .map(Value::Int)
                    .ok_or_else(|| conversion(&args[0], "int"))
            }
            other => Err(conversion(other, "int")),
        }),
        // float(val)
        Builtin::new("float", Some(1), |_interp, args| match &args[0] {
            Value::Int(n) => Ok(Value::Float(*n as f64)),
            Value::Float(n) => Ok(Value::Float(*n)),
            Value::Bool(b) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| conversion(&args[0], "float")),
            other => Err(conversion(other, "float")),
        }),
        // string(val)
        Builtin::new("string", Some(1), |_interp, args| {
            Ok(Value::String(args[0].to_string()))
        }),
        // len(val)
        Builtin::new("len", Some(1), |_interp, args| match &args[0] {
            Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
            Value::Array(items) => Ok(Value::Int(items.borrow().len() as i64)),
            other => Err(ErrorKind::TypeMismatch(format!(
                "len() requires string or array, got {}",
                other.type_name()
            ))
            .into()),
        }),
        // push(array, val)
        Builtin::new("push", Some(2), |_interp, args| match &args[0] {
            Value::Array(items) => {
                items.borrow_mut().push(args[1].clone());
                Ok(Value::Nothing)
            }
            other => Err(not_array("push", other)),
        }),
        // pop(array)
        Builtin::new("pop", Some(1), |_interp, args| match &args[0] {
            Value::Array(items) => items
                .borrow_mut()
                .pop()
                .ok_or_else(|| ErrorKind::IndexOutOfRange { index: -1, len: 0 }.into()),
            other => Err(not_array("pop", other)),
        }),
        // type(val)
        Builtin::new("type", Some(1), |_interp, args| {
            Ok(Value::from(args[0].type_name()))
        }),
    ]
}

/// Register every builtin in `env`, replacing same-named bindings
pub fn install(env: &mut Environment) {
    for builtin in builtins() {
        env.define(builtin.name, Value::Builtin(builtin));
    }
}

/// Truncate toward zero; `None` for NaN, infinities and values outside `i64`
fn float_to_int(n: f64) -> Option<i64> {
    let n = n.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    (n >= i64::MIN as f64 && n < i64::MAX as f64).then_some(n as i64)
}

fn conversion(value: &Value, target: &'static str) -> crate::error::CinderError {
    ErrorKind::InvalidConversion {
        value: value.repr(),
        target,
    }
    .into()
}

fn not_array(name: &str, value: &Value) -> crate::error::CinderError {
    ErrorKind::TypeMismatch(format!(
        "{}() requires an array, got {}",
        name,
        value.type_name()
    ))
    .into()
}
