//! Compile-time evaluation of whitelisted builtins.
//!
//! When a closure calls a function that has no relation to the entity
//! parameter and every operand is a literal, the call is folded into a
//! literal. Only the functions below are ever evaluated; anything else is
//! an [`CompileError::UnsupportedMethod`].

use crate::{
    error::{CompileError, CompileResult},
    value::Value,
};

/// Evaluates `name` against literal operands.
///
/// `receiver` is the literal the method is called on (`'abc'.toUpperCase()`),
/// or `None` for namespace functions (`Math.floor(2.5)`).
pub fn evaluate(name: &str, receiver: Option<&Value>, args: &[Value]) -> CompileResult<Value> {
    match receiver {
        None => evaluate_function(name, args),
        Some(Value::String(s)) => evaluate_string_method(s, name, args),
        Some(Value::Array(items)) => evaluate_array_method(items, name, args),
        Some(other) => Err(CompileError::unsupported_method(format!(
            "{}() cannot be evaluated on {}",
            name,
            other.type_name()
        ))),
    }
}

fn evaluate_function(name: &str, args: &[Value]) -> CompileResult<Value> {
    match name {
        "Math.floor" => number_arg(name, args).map(|n| whole(n.floor())),
        "Math.ceil" => number_arg(name, args).map(|n| whole(n.ceil())),
        // Half rounds toward positive infinity
        "Math.round" => number_arg(name, args).map(|n| {
            if n.fract() == -0.5 {
                whole(n.ceil())
            } else {
                whole(n.round())
            }
        }),
        "Math.abs" => match args {
            [Value::Integer(n)] => n
                .checked_abs()
                .map(Value::Integer)
                .ok_or_else(|| CompileError::arithmetic("abs overflows")),
            _ => number_arg(name, args).map(|n| Value::Float(n.abs())),
        },
        "Math.min" | "Math.max" => {
            if args.is_empty() {
                return Err(CompileError::MissingMethodArgument(name.to_string()));
            }
            let mut best: Option<&Value> = None;
            for arg in args {
                let n = arg.as_float().ok_or_else(|| type_error(name, arg))?;
                let replace = match best.and_then(Value::as_float) {
                    None => true,
                    Some(current) if name == "Math.min" => n < current,
                    Some(current) => n > current,
                };
                if replace {
                    best = Some(arg);
                }
            }
            Ok(best.cloned().unwrap_or(Value::Null))
        }
        _ => Err(CompileError::unsupported_method(format!(
            "{}() cannot be evaluated at compile time",
            name
        ))),
    }
}

fn evaluate_string_method(s: &str, name: &str, args: &[Value]) -> CompileResult<Value> {
    match name {
        "toLowerCase" | "toLocaleLowerCase" => Ok(Value::String(s.to_lowercase())),
        "toUpperCase" | "toLocaleUpperCase" => Ok(Value::String(s.to_uppercase())),
        "trim" => Ok(Value::String(s.trim().to_string())),
        "startsWith" => string_arg(name, args).map(|p| Value::Boolean(s.starts_with(p))),
        "endsWith" => string_arg(name, args).map(|p| Value::Boolean(s.ends_with(p))),
        "includes" => string_arg(name, args).map(|p| Value::Boolean(s.contains(p))),
        "indexOf" => string_arg(name, args).map(|p| {
            let index = s
                .find(p)
                .map(|byte| s[..byte].chars().count() as i64)
                .unwrap_or(-1);
            Value::Integer(index)
        }),
        "substr" => {
            let chars: Vec<char> = s.chars().collect();
            let len = chars.len() as i64;
            let start = match args.first() {
                Some(v) => v.as_int().ok_or_else(|| type_error(name, v))?,
                None => 0,
            };
            // Negative start counts from the end
            let start = if start < 0 { (len + start).max(0) } else { start.min(len) };
            let count = match args.get(1) {
                Some(v) => v.as_int().ok_or_else(|| type_error(name, v))?.max(0),
                None => len - start,
            };
            let end = start.saturating_add(count).min(len);
            Ok(Value::String(
                chars[start as usize..end as usize].iter().collect(),
            ))
        }
        "concat" => {
            let mut result = s.to_string();
            for arg in args {
                result.push_str(&arg.as_string());
            }
            Ok(Value::String(result))
        }
        _ => Err(CompileError::unsupported_method(format!(
            "string method {}() cannot be evaluated at compile time",
            name
        ))),
    }
}

fn evaluate_array_method(items: &[Value], name: &str, args: &[Value]) -> CompileResult<Value> {
    match (name, args) {
        ("includes", [needle]) => Ok(Value::Boolean(items.contains(needle))),
        ("indexOf", [needle]) => Ok(Value::Integer(
            items
                .iter()
                .position(|item| item == needle)
                .map(|i| i as i64)
                .unwrap_or(-1),
        )),
        _ => Err(CompileError::unsupported_method(format!(
            "array method {}() cannot be evaluated at compile time",
            name
        ))),
    }
}

fn number_arg(name: &str, args: &[Value]) -> CompileResult<f64> {
    match args.first() {
        Some(v) => v.as_float().ok_or_else(|| type_error(name, v)),
        None => Err(CompileError::MissingMethodArgument(name.to_string())),
    }
}

fn string_arg<'a>(name: &str, args: &'a [Value]) -> CompileResult<&'a str> {
    match args.first() {
        Some(Value::String(s)) => Ok(s),
        Some(v) => Err(type_error(name, v)),
        None => Err(CompileError::MissingMethodArgument(name.to_string())),
    }
}

fn whole(n: f64) -> Value {
    Value::Float(n).as_int().map(Value::Integer).unwrap_or(Value::Float(n))
}

fn type_error(name: &str, value: &Value) -> CompileError {
    CompileError::unsupported_method(format!(
        "{}() does not accept {}",
        name,
        value.type_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn math_functions() {
        assert_eq!(evaluate("Math.floor", None, &[Value::Float(2.7)]), Ok(Value::Integer(2)));
        assert_eq!(evaluate("Math.ceil", None, &[Value::Float(2.1)]), Ok(Value::Integer(3)));
        assert_eq!(evaluate("Math.round", None, &[Value::Float(-2.5)]), Ok(Value::Integer(-2)));
        assert_eq!(evaluate("Math.round", None, &[Value::Float(2.5)]), Ok(Value::Integer(3)));
        assert_eq!(
            evaluate("Math.max", None, &[Value::Integer(3), Value::Float(7.5), Value::Integer(1)]),
            Ok(Value::Float(7.5))
        );
        assert_eq!(
            evaluate("Math.min", None, &[Value::Integer(3), Value::Integer(1)]),
            Ok(Value::Integer(1))
        );
        assert_eq!(evaluate("Math.abs", None, &[Value::Integer(-4)]), Ok(Value::Integer(4)));
    }

    #[test]
    fn string_methods() {
        let s = Value::from("Hello World");
        assert_eq!(evaluate("toUpperCase", Some(&s), &[]), Ok(Value::from("HELLO WORLD")));
        assert_eq!(
            evaluate("startsWith", Some(&s), &[Value::from("Hell")]),
            Ok(Value::Boolean(true))
        );
        assert_eq!(
            evaluate("indexOf", Some(&s), &[Value::from("World")]),
            Ok(Value::Integer(6))
        );
        assert_eq!(
            evaluate("substr", Some(&s), &[Value::Integer(6), Value::Integer(3)]),
            Ok(Value::from("Wor"))
        );
        assert_eq!(
            evaluate("substr", Some(&s), &[Value::Integer(-5)]),
            Ok(Value::from("World"))
        );
        assert_eq!(
            evaluate("concat", Some(&Value::from("a")), &[Value::from("b"), Value::Integer(1)]),
            Ok(Value::from("ab1"))
        );
    }

    #[test]
    fn anything_else_is_rejected() {
        assert!(matches!(
            evaluate("eval", None, &[Value::from("1")]),
            Err(CompileError::UnsupportedMethod(_))
        ));
        assert!(matches!(
            evaluate("toFixed", Some(&Value::Integer(1)), &[Value::Integer(2)]),
            Err(CompileError::UnsupportedMethod(_))
        ));
    }
}
