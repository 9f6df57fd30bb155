use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::{
    ast::ArithmeticOp,
    error::{CompileError, CompileResult},
};

/// A literal value embedded in an expression tree.
///
/// Literals come from closure source (`355`, `'Laptops'`), from the
/// parameter bag handed to the closure compiler, or from query-option
/// strings. They serialize unwrapped into the wire form.
///
/// # Type Preservation
///
/// Integers and floats stay distinct:
/// - Folded arithmetic keeps integer types when results are whole
/// - Mixed operations go through high-precision decimals before falling
///   back to `f64`
///
/// # Examples
///
/// ```
/// use query_expr::Value;
///
/// let price = Value::from(400);
/// let name = Value::from("Laptops");
/// let tags = Value::Array(vec![Value::from("a"), Value::from("b")]);
///
/// assert_eq!(price, Value::Integer(400));
/// assert_eq!(name.as_string(), "Laptops");
/// assert_eq!(tags.type_name(), "array");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Floating-point number
    Float(f64),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// UTF-8 string
    String(String),

    /// Array of values
    Array(Vec<Value>),

    /// Object with keys kept in insertion order
    Object(Vec<(String, Value)>),
}

impl Value {
    /// Returns a human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as integer, only when the number is whole
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Float(n) if n.fract() == 0.0 => n.to_i64(),
            _ => None,
        }
    }

    /// Get as string (concatenation)
    pub fn as_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(n) => n.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Null => "null".to_string(),
            _ => self.to_json().to_string(),
        }
    }

    /// Looks up a key of an object value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Converts to the JSON wire form.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(arr) => serde_json::Value::Array(arr.iter().map(Value::to_json).collect()),
            Value::Object(pairs) => serde_json::Value::Object(
                pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Applies a folded arithmetic operator to two literal operands.
    ///
    /// Follows the arithmetic of the closure host: `+` concatenates when
    /// either side is a string, integer results stay integers, and `&`
    /// works on whole numbers only. Results that JSON cannot carry
    /// (division by zero, overflow) are errors.
    pub fn apply_arithmetic(&self, op: ArithmeticOp, right: &Value) -> CompileResult<Value> {
        let left = self;
        match (left, right) {
            (Value::String(_), _) | (_, Value::String(_)) if op == ArithmeticOp::Add => Ok(
                Value::String(format!("{}{}", left.as_string(), right.as_string())),
            ),
            (Value::Integer(a), Value::Integer(b)) => integer_op(op, *a, *b),
            (Value::Float(a), Value::Float(b)) => float_op(op, *a, *b),
            (Value::Integer(a), Value::Float(b)) => mixed_op(
                op,
                Decimal::from_i64(*a),
                Decimal::from_f64(*b),
                (*a as f64, *b),
            ),
            (Value::Float(a), Value::Integer(b)) => mixed_op(
                op,
                Decimal::from_f64(*a),
                Decimal::from_i64(*b),
                (*a, *b as f64),
            ),
            (a, b) => Err(CompileError::arithmetic(format!(
                "cannot apply {} to {} and {}",
                op.name(),
                a.type_name(),
                b.type_name()
            ))),
        }
    }
}

fn integer_op(op: ArithmeticOp, a: i64, b: i64) -> CompileResult<Value> {
    let overflow = || CompileError::arithmetic(format!("{} overflows for {} and {}", op.name(), a, b));
    match op {
        ArithmeticOp::Add => a.checked_add(b).map(Value::Integer).ok_or_else(overflow),
        ArithmeticOp::Subtract => a.checked_sub(b).map(Value::Integer).ok_or_else(overflow),
        ArithmeticOp::Multiply => a.checked_mul(b).map(Value::Integer).ok_or_else(overflow),
        ArithmeticOp::Divide => {
            if b == 0 {
                return Err(CompileError::arithmetic("division by zero"));
            }
            // Check if division is exact; if not, return Float
            if a % b == 0 {
                a.checked_div(b).map(Value::Integer).ok_or_else(overflow)
            } else {
                Ok(Value::Float(a as f64 / b as f64))
            }
        }
        ArithmeticOp::Modulo => {
            if b == 0 {
                return Err(CompileError::arithmetic("modulo by zero"));
            }
            a.checked_rem(b).map(Value::Integer).ok_or_else(overflow)
        }
        ArithmeticOp::BitAnd => Ok(Value::Integer(a & b)),
    }
}

fn float_op(op: ArithmeticOp, a: f64, b: f64) -> CompileResult<Value> {
    let result = match op {
        ArithmeticOp::Add => a + b,
        ArithmeticOp::Subtract => a - b,
        ArithmeticOp::Multiply => a * b,
        ArithmeticOp::Divide | ArithmeticOp::Modulo if b == 0.0 => {
            return Err(CompileError::arithmetic("division by zero"));
        }
        ArithmeticOp::Divide => a / b,
        ArithmeticOp::Modulo => a % b,
        ArithmeticOp::BitAnd => {
            return match (Value::Float(a).as_int(), Value::Float(b).as_int()) {
                (Some(x), Some(y)) => Ok(Value::Integer(x & y)),
                _ => Err(CompileError::arithmetic(
                    "bitwise and requires whole numbers",
                )),
            };
        }
    };
    finite(result)
}

fn mixed_op(
    op: ArithmeticOp,
    a: Option<Decimal>,
    b: Option<Decimal>,
    fallback: (f64, f64),
) -> CompileResult<Value> {
    if let Some(ad) = a
        && let Some(bd) = b
    {
        let rd = match op {
            ArithmeticOp::Add => ad.checked_add(bd),
            ArithmeticOp::Subtract => ad.checked_sub(bd),
            ArithmeticOp::Multiply => ad.checked_mul(bd),
            ArithmeticOp::Divide | ArithmeticOp::Modulo if bd.is_zero() => {
                return Err(CompileError::arithmetic("division by zero"));
            }
            ArithmeticOp::Divide => ad.checked_div(bd),
            ArithmeticOp::Modulo => ad.checked_rem(bd),
            ArithmeticOp::BitAnd => None,
        };
        if let Some(rd) = rd {
            if rd.is_integer()
                && let Some(r) = rd.to_i64()
            {
                return Ok(Value::Integer(r));
            } else if let Some(r) = rd.to_f64() {
                return finite(r);
            }
        }
    }
    float_op(op, fallback.0, fallback.1)
}

fn finite(n: f64) -> CompileResult<Value> {
    if n.is_finite() {
        Ok(Value::Float(n))
    } else {
        Err(CompileError::arithmetic(format!("{} is not representable", n)))
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}
