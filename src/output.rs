//! Canonical serialization of the expression tree.
//!
//! Every node serializes to a JSON-compatible value: the wire form handed
//! to a SQL formatter. Shape rules that construction does not check are
//! enforced here, so a malformed tree fails on serialization rather than
//! reaching the formatter.
//!
//! # Features
//!
//! - **Compact output** via [`to_json()`]
//! - **Pretty output** via [`to_json_pretty()`] - 2-space indentation
//! - **Deterministic** - object keys keep insertion order, so serializing
//!   the same tree twice is byte-identical
//!
//! # Examples
//!
//! ```
//! use query_expr::ast::{ComparisonOp, Expression};
//! use query_expr::output::to_json;
//!
//! let expr = Expression::comparison(
//!     Expression::member("id"),
//!     ComparisonOp::Equal,
//!     Expression::literal(355),
//! );
//!
//! assert_eq!(to_json(&expr).unwrap(), r#"{"$eq":[{"$name":"id"},355]}"#);
//! ```

use serde_json::{Map, Value as JsonValue, json};

use crate::{
    ast::Expression,
    error::{CompileError, CompileResult},
};

impl Expression {
    /// Serializes this node and its children into the canonical wire form.
    pub fn serialize(&self) -> CompileResult<JsonValue> {
        match self {
            Expression::Literal(value) => Ok(value.to_json()),
            Expression::Member(name) => Ok(json!({ "$name": name })),
            Expression::Arithmetic { left, op, right } => binary(op.name(), left, right),
            Expression::Comparison { left, op, right }
            | Expression::AggregateComparison { left, op, right } => {
                binary(op.name(), left, right)
            }
            Expression::Logical { op, args } => {
                if args.len() < 2 {
                    return Err(CompileError::unknown_expression(format!(
                        "{} requires at least two operands",
                        op.name()
                    )));
                }
                Ok(single_key(op.name().to_string(), serialize_all(args)?))
            }
            Expression::MethodCall { name, args } => {
                Ok(single_key(format!("${}", name), serialize_all(args)?))
            }
            Expression::SimpleMethodCall { name, args } => match args.as_slice() {
                [] => Err(CompileError::MissingMethodArgument(name.clone())),
                [arg] => Ok(single_key(format!("${}", name), arg.serialize()?)),
                _ => Ok(single_key(format!("${}", name), serialize_all(args)?)),
            },
            Expression::Object(pairs) => {
                let mut map = Map::new();
                for (key, value) in pairs {
                    map.insert(key.clone(), value.serialize()?);
                }
                Ok(JsonValue::Object(map))
            }
            Expression::Sequence(elements) => serialize_sequence(elements),
            Expression::SelectAny { expr, alias } => match alias {
                Some(alias) => Ok(single_key(alias.clone(), expr.serialize()?)),
                None => Err(CompileError::MissingAlias),
            },
            Expression::OrderByAny { expr, direction } => {
                Ok(single_key(direction.name().to_string(), expr.serialize()?))
            }
            Expression::Switch { branches, default } => {
                let mut items = Vec::with_capacity(branches.len());
                for (case, then) in branches {
                    items.push(json!({ "case": case.serialize()?, "then": then.serialize()? }));
                }
                let mut body = Map::new();
                body.insert("branches".to_string(), JsonValue::Array(items));
                if let Some(default) = default {
                    body.insert("default".to_string(), default.serialize()?);
                }
                Ok(single_key("$switch".to_string(), JsonValue::Object(body)))
            }
        }
    }
}

impl serde::Serialize for Expression {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = Expression::serialize(self).map_err(serde::ser::Error::custom)?;
        serde::Serialize::serialize(&value, serializer)
    }
}

fn binary(key: &str, left: &Expression, right: &Expression) -> CompileResult<JsonValue> {
    Ok(single_key(
        key.to_string(),
        JsonValue::Array(vec![left.serialize()?, right.serialize()?]),
    ))
}

fn serialize_all(args: &[Expression]) -> CompileResult<JsonValue> {
    args.iter()
        .map(Expression::serialize)
        .collect::<CompileResult<Vec<_>>>()
        .map(JsonValue::Array)
}

fn single_key(key: String, value: JsonValue) -> JsonValue {
    let mut map = Map::new();
    map.insert(key, value);
    JsonValue::Object(map)
}

/// Inclusion-style projection: bare members become `name: 1`, method calls
/// become `<trailing name><index>: <call>`.
fn serialize_sequence(elements: &[Expression]) -> CompileResult<JsonValue> {
    let mut map = Map::new();
    for (index, element) in elements.iter().enumerate() {
        match element {
            Expression::Member(name) => {
                map.insert(name.clone(), json!(1));
            }
            Expression::MethodCall { name, .. } | Expression::SimpleMethodCall { name, .. } => {
                // Math.floor -> floor
                let trailing = name.rsplit('.').next().unwrap_or(name);
                map.insert(format!("{}{}", trailing, index), element.serialize()?);
            }
            other => {
                return Err(CompileError::InvalidSequenceMember(other.kind().to_string()));
            }
        }
    }
    Ok(JsonValue::Object(map))
}

/// Converts an expression to its compact JSON string.
pub fn to_json(expr: &Expression) -> CompileResult<String> {
    Ok(expr.serialize()?.to_string())
}

/// Converts an expression to pretty-printed JSON with 2-space indentation.
pub fn to_json_pretty(expr: &Expression) -> CompileResult<String> {
    let value = expr.serialize()?;
    // Serializing an in-memory JSON value cannot fail
    Ok(serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()))
}
