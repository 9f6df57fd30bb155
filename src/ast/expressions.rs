use crate::{
    ast::{ArithmeticOp, ComparisonOp, LogicalOp, SortDirection},
    value::Value,
};

/// Canonical expression tree produced by both compiler front ends.
///
/// Nodes are immutable values built bottom-up during one compile call.
/// Construction never checks shape; every structural rule is enforced when
/// the tree is serialized (see [`crate::output`]).
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value, serialized unwrapped
    ///
    /// # Example
    /// ```text
    /// 355  ->  355
    /// ```
    Literal(Value),

    /// Field reference by dotted path
    ///
    /// # Example
    /// ```text
    /// x.price  ->  { "$name": "price" }
    /// ```
    Member(String),

    /// Arithmetic operation
    ///
    /// # Example
    /// ```text
    /// x.price * 2  ->  { "$multiply": [ { "$name": "price" }, 2 ] }
    /// ```
    Arithmetic {
        left: Box<Expression>,
        op: ArithmeticOp,
        right: Box<Expression>,
    },

    /// Comparison
    ///
    /// # Example
    /// ```text
    /// x.id === 355  ->  { "$eq": [ { "$name": "id" }, 355 ] }
    /// ```
    Comparison {
        left: Box<Expression>,
        op: ComparisonOp,
        right: Box<Expression>,
    },

    /// Comparison used in aggregate (having) contexts; same wire shape.
    AggregateComparison {
        left: Box<Expression>,
        op: ComparisonOp,
        right: Box<Expression>,
    },

    /// Logical combination of two or more operands
    Logical { op: LogicalOp, args: Vec<Expression> },

    /// Function call, serialized with an argument array
    ///
    /// # Example
    /// ```text
    /// x.name.startsWith('A')  ->  { "$startsWith": [ { "$name": "name" }, "A" ] }
    /// ```
    MethodCall { name: String, args: Vec<Expression> },

    /// Function call that flattens a single argument
    ///
    /// # Example
    /// ```text
    /// x.dateCreated.getFullYear()  ->  { "$year": { "$name": "dateCreated" } }
    /// ```
    SimpleMethodCall { name: String, args: Vec<Expression> },

    /// Projection document: output name -> expression, in declaration order
    Object(Vec<(String, Expression)>),

    /// Inclusion-style projection built from a list of bare references
    Sequence(Vec<Expression>),

    /// Select term with an output alias
    SelectAny {
        expr: Box<Expression>,
        alias: Option<String>,
    },

    /// Order-by term
    OrderByAny {
        expr: Box<Expression>,
        direction: SortDirection,
    },

    /// `case(condition:result, ..., true:default)`
    Switch {
        branches: Vec<(Expression, Expression)>,
        default: Option<Box<Expression>>,
    },
}

impl Expression {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    pub fn member(name: impl Into<String>) -> Self {
        Expression::Member(name.into())
    }

    pub fn arithmetic(left: Expression, op: ArithmeticOp, right: Expression) -> Self {
        Expression::Arithmetic {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn comparison(left: Expression, op: ComparisonOp, right: Expression) -> Self {
        Expression::Comparison {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn aggregate_comparison(left: Expression, op: ComparisonOp, right: Expression) -> Self {
        Expression::AggregateComparison {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Builds a logical node, flattening operands that already carry the
    /// same operator: `(a and b) and c` and `a and (b and c)` both become
    /// `and[a, b, c]`.
    pub fn logical(op: LogicalOp, left: Expression, right: Expression) -> Self {
        let mut args = Vec::with_capacity(2);
        for operand in [left, right] {
            match operand {
                Expression::Logical {
                    op: inner,
                    args: nested,
                } if inner == op => args.extend(nested),
                other => args.push(other),
            }
        }
        Expression::Logical { op, args }
    }

    pub fn method_call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::MethodCall {
            name: name.into(),
            args,
        }
    }

    pub fn simple_method_call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::SimpleMethodCall {
            name: name.into(),
            args,
        }
    }

    pub fn select(expr: Expression, alias: impl Into<String>) -> Self {
        Expression::SelectAny {
            expr: Box::new(expr),
            alias: Some(alias.into()),
        }
    }

    pub fn order_by(expr: Expression, direction: SortDirection) -> Self {
        Expression::OrderByAny {
            expr: Box::new(expr),
            direction,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expression::Literal(_))
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expression::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Short node kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Expression::Literal(_) => "literal",
            Expression::Member(_) => "member",
            Expression::Arithmetic { .. } => "arithmetic",
            Expression::Comparison { .. } => "comparison",
            Expression::AggregateComparison { .. } => "aggregate comparison",
            Expression::Logical { .. } => "logical",
            Expression::MethodCall { .. } => "method call",
            Expression::SimpleMethodCall { .. } => "simple method call",
            Expression::Object(_) => "object",
            Expression::Sequence(_) => "sequence",
            Expression::SelectAny { .. } => "select",
            Expression::OrderByAny { .. } => "order by",
            Expression::Switch { .. } => "switch",
        }
    }
}
