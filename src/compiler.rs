//! Closure compiler.
//!
//! Lowers the source text of a small predicate or projection closure into
//! the canonical [`Expression`] tree:
//!
//! ```
//! use query_expr::ClosureCompiler;
//! use serde_json::json;
//!
//! let compiler = ClosureCompiler::new();
//! let filter = compiler.compile_filter("x => x.id === 355", None).unwrap();
//! assert_eq!(filter, Some(json!({ "$eq": [ { "$name": "id" }, 355 ] })));
//! ```
//!
//! The closure's first parameter is the entity parameter; member chains
//! rooted at it become field references. Other free names are looked up in
//! the [`Params`] bag and embedded as literals. Arithmetic between literals
//! is folded, and whitelisted builtins over literals are evaluated (see
//! [`crate::builtins`]).
//!
//! Per-call state (entity parameter, bound values) lives in a call-scoped
//! context passed down the recursion, so one compiler instance can serve
//! concurrent calls.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::{
    ast::{
        BinOp, Closure, ClosureBody, ComparisonOp, Expression, LogicalOp, PropertyKey, Statement,
        SyntaxNode,
    },
    builtins,
    error::{CompileError, CompileResult},
    lexer::Lexer,
    parser::Parser,
    resolver::MethodResolverChain,
    validator::FieldNameValidator,
    value::Value,
};

/// Values a closure may refer to besides its entity parameter.
///
/// Named values are matched by identifier; positional values bind, in
/// order, to the closure's declared parameters after the entity parameter.
/// A named value wins over a positional one of the same name.
///
/// ```
/// use query_expr::Params;
///
/// let params = Params::new().bind("minPrice", 400).push("Laptops");
/// assert_eq!(params.get("minPrice"), Some(&400.into()));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    named: Vec<(String, Value)>,
    positional: Vec<Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a named value.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.named.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.named.push((name, value)),
        }
        self
    }

    /// Appends a positional value.
    pub fn push(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Builds a named bag from a JSON object. Any other JSON value is a
    /// configuration error.
    pub fn from_json(value: JsonValue) -> CompileResult<Self> {
        match Value::from(value) {
            Value::Object(named) => Ok(Params {
                named,
                positional: Vec::new(),
            }),
            other => Err(CompileError::Configuration(format!(
                "parameters must be a JSON object, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.named.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }
}

/// Whether a dereferenced captured string names a field or is a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberContext {
    /// Operand position: captured values are literals
    Value,
    /// Bare projection element: captured strings are field names
    Name,
}

/// Call-scoped compile context.
struct Scope<'a> {
    entity: Option<&'a str>,
    params: &'a Params,
    positional: Vec<(&'a str, &'a Value)>,
}

impl<'a> Scope<'a> {
    fn new(closure: &'a Closure, params: &'a Params) -> Self {
        let positional = closure
            .params
            .iter()
            .skip(1)
            .map(String::as_str)
            .zip(params.positional.iter())
            .collect();
        Scope {
            entity: closure.entity_param(),
            params,
            positional,
        }
    }

    fn lookup(&self, name: &str) -> Option<&'a Value> {
        self.params.get(name).or_else(|| {
            self.positional
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| *v)
        })
    }

    fn is_entity_rooted(&self, node: &SyntaxNode) -> bool {
        self.entity.is_some() && node.root_identifier() == self.entity
    }
}

pub type MemberResolverFn = Arc<dyn Fn(&str) -> CompileResult<String> + Send + Sync>;

/// Compiles closure source text into expression trees.
#[derive(Clone)]
pub struct ClosureCompiler {
    resolvers: Arc<MethodResolverChain>,
    validator: Arc<FieldNameValidator>,
    member_resolver: Option<MemberResolverFn>,
}

impl Default for ClosureCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl ClosureCompiler {
    /// A compiler with the default resolver chain and the installed
    /// validator.
    pub fn new() -> Self {
        ClosureCompiler {
            resolvers: Arc::new(MethodResolverChain::default()),
            validator: FieldNameValidator::installed(),
            member_resolver: None,
        }
    }

    pub fn with_resolvers(mut self, resolvers: impl Into<Arc<MethodResolverChain>>) -> Self {
        self.resolvers = resolvers.into();
        self
    }

    pub fn with_validator(mut self, validator: impl Into<Arc<FieldNameValidator>>) -> Self {
        self.validator = validator.into();
        self
    }

    /// Overrides how an entity member name maps to a field name (identity
    /// by default). The result still has to pass the validator.
    pub fn with_member_resolver(
        mut self,
        resolver: impl Fn(&str) -> CompileResult<String> + Send + Sync + 'static,
    ) -> Self {
        self.member_resolver = Some(Arc::new(resolver));
        self
    }

    /// Compiles a predicate closure into its serialized boolean expression.
    ///
    /// Returns `Ok(None)` when no closure is given.
    pub fn compile_filter<'s>(
        &self,
        closure: impl Into<Option<&'s str>>,
        params: Option<&Params>,
    ) -> CompileResult<Option<JsonValue>> {
        match closure.into() {
            Some(source) => {
                let expr = self.filter_expression(source, params)?;
                expr.serialize().map(Some)
            }
            None => Ok(None),
        }
    }

    /// Compiles a projection closure into an ordered list of serialized
    /// projections.
    pub fn compile_select(
        &self,
        closure: &str,
        params: Option<&Params>,
    ) -> CompileResult<Vec<JsonValue>> {
        match self.select_expression(closure, params)? {
            Expression::Sequence(elements) => elements.iter().map(Expression::serialize).collect(),
            member @ Expression::Member(_) => Ok(vec![member.serialize()?]),
            Expression::Object(pairs) => pairs
                .into_iter()
                .map(|(name, value)| {
                    Expression::Object(vec![(name, value)]).serialize()
                })
                .collect(),
            other => Err(CompileError::InvalidSelectClosure(format!(
                "a projection must be a member, a sequence of members, or an object literal, got {}",
                other.kind()
            ))),
        }
    }

    /// Compiles a predicate closure into an unserialized tree.
    #[tracing::instrument(level = "debug", skip(self, params), err)]
    pub fn filter_expression(
        &self,
        source: &str,
        params: Option<&Params>,
    ) -> CompileResult<Expression> {
        let closure = parse_closure(source)?;
        let empty = Params::default();
        let scope = Scope::new(&closure, params.unwrap_or(&empty));
        self.translate_body(&closure.body, &scope, MemberContext::Value)
    }

    /// Compiles a projection closure into an unserialized tree.
    #[tracing::instrument(level = "debug", skip(self, params), err)]
    pub fn select_expression(
        &self,
        source: &str,
        params: Option<&Params>,
    ) -> CompileResult<Expression> {
        let closure = parse_closure(source)?;
        let empty = Params::default();
        let scope = Scope::new(&closure, params.unwrap_or(&empty));
        self.translate_body(&closure.body, &scope, MemberContext::Name)
    }

    /// Maps a host method name and translated arguments to a canonical node
    /// through the resolver chain. A qualified name that no resolver knows
    /// (`Date.now`) is retried by its trailing name.
    pub fn resolve_method(&self, name: &str, args: Vec<Expression>) -> CompileResult<Expression> {
        if self.resolvers.resolves(name) {
            return self.resolvers.resolve(name, args);
        }
        let trailing = name.rsplit('.').next().unwrap_or(name);
        self.resolvers.resolve(trailing, args)
    }

    /// Maps an entity member to a validated field reference.
    pub fn resolve_member(&self, name: &str) -> CompileResult<Expression> {
        let resolved = match &self.member_resolver {
            Some(resolve) => resolve(name)?,
            None => name.to_string(),
        };
        self.validator.test(&resolved, true, true)?;
        Ok(Expression::Member(resolved))
    }

    fn translate_body(
        &self,
        body: &ClosureBody,
        scope: &Scope<'_>,
        ctx: MemberContext,
    ) -> CompileResult<Expression> {
        match body {
            ClosureBody::Expression(node) => self.translate_root(node, scope, ctx),
            ClosureBody::Block(statements) => match statements.as_slice() {
                [] => Err(CompileError::MissingClosureBody(
                    "closure body is empty".to_string(),
                )),
                [Statement::Return(Some(node))] => self.translate_root(node, scope, ctx),
                [Statement::Return(None)] => Err(CompileError::MissingReturnStatement(
                    "return statement has no value".to_string(),
                )),
                [Statement::Expression(node @ SyntaxNode::Sequence(_))]
                | [Statement::Expression(node @ SyntaxNode::Member { .. })] => {
                    self.translate_root(node, scope, ctx)
                }
                [Statement::Expression(node)] => Err(CompileError::unknown_expression(format!(
                    "{} statement",
                    node.type_name()
                ))),
                many if !many.iter().any(|s| matches!(s, Statement::Return(_))) => {
                    Err(CompileError::MissingReturnStatement(format!(
                        "block of {} statements has no return",
                        many.len()
                    )))
                }
                _ => Err(CompileError::unknown_expression(
                    "block with more than one statement",
                )),
            },
        }
    }

    fn translate_root(
        &self,
        node: &SyntaxNode,
        scope: &Scope<'_>,
        ctx: MemberContext,
    ) -> CompileResult<Expression> {
        match node {
            SyntaxNode::Object(properties) => self.translate_object(properties, scope),
            SyntaxNode::Sequence(elements) => elements
                .iter()
                .map(|element| self.translate(element, scope, ctx))
                .collect::<CompileResult<Vec<_>>>()
                .map(Expression::Sequence),
            other => self.translate(other, scope, ctx),
        }
    }

    fn translate_object(
        &self,
        properties: &[(PropertyKey, SyntaxNode)],
        scope: &Scope<'_>,
    ) -> CompileResult<Expression> {
        let mut pairs = Vec::with_capacity(properties.len());
        for (key, value) in properties {
            let name = match key {
                PropertyKey::Identifier(name) => name.clone(),
                PropertyKey::Literal(value) => value.as_string(),
                PropertyKey::Computed(node) => {
                    return Err(CompileError::InvalidObjectKey(format!(
                        "computed key of type {}",
                        node.type_name()
                    )));
                }
            };
            self.validator.test(&name, false, true)?;
            pairs.push((name, self.translate(value, scope, MemberContext::Value)?));
        }
        Ok(Expression::Object(pairs))
    }

    fn translate(
        &self,
        node: &SyntaxNode,
        scope: &Scope<'_>,
        ctx: MemberContext,
    ) -> CompileResult<Expression> {
        match node {
            SyntaxNode::Literal(value) => Ok(Expression::Literal(value.clone())),
            SyntaxNode::Identifier(name) => scope
                .lookup(name)
                .map(|value| Expression::Literal(value.clone()))
                .ok_or_else(|| CompileError::UnresolvedIdentifier(name.clone())),
            SyntaxNode::Logical { op, left, right } => {
                let op = match op.as_str() {
                    "&&" => LogicalOp::And,
                    "||" => LogicalOp::Or,
                    other => return Err(CompileError::InvalidOperator(other.to_string())),
                };
                Ok(Expression::Logical {
                    op,
                    args: vec![
                        self.translate(left, scope, MemberContext::Value)?,
                        self.translate(right, scope, MemberContext::Value)?,
                    ],
                })
            }
            SyntaxNode::Binary { op, left, right } => self.translate_binary(op, left, right, scope),
            SyntaxNode::Unary { op, argument } => self.translate_unary(op, argument, scope),
            SyntaxNode::Member { object, property } => {
                self.translate_member(node, object, property, scope, ctx)
            }
            SyntaxNode::Call { callee, arguments } => self.translate_call(callee, arguments, scope),
            SyntaxNode::Object(properties) => self.translate_object(properties, scope),
            SyntaxNode::Sequence(elements) => elements
                .iter()
                .map(|element| self.translate(element, scope, MemberContext::Name))
                .collect::<CompileResult<Vec<_>>>()
                .map(Expression::Sequence),
            SyntaxNode::Array(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    match self.translate(element, scope, MemberContext::Value)? {
                        Expression::Literal(value) => values.push(value),
                        other => {
                            return Err(CompileError::unknown_expression(format!(
                                "array element of type {}",
                                other.kind()
                            )));
                        }
                    }
                }
                Ok(Expression::Literal(Value::Array(values)))
            }
        }
    }

    fn translate_binary(
        &self,
        op: &str,
        left: &SyntaxNode,
        right: &SyntaxNode,
        scope: &Scope<'_>,
    ) -> CompileResult<Expression> {
        let canonical =
            BinOp::from_symbol(op).ok_or_else(|| CompileError::InvalidOperator(op.to_string()))?;
        let left = self.translate(left, scope, MemberContext::Value)?;
        let right = self.translate(right, scope, MemberContext::Value)?;

        match canonical {
            BinOp::Arithmetic(op) => match (&left, &right) {
                (Expression::Literal(a), Expression::Literal(b)) => {
                    let folded = a.apply_arithmetic(op, b)?;
                    tracing::debug!(op = op.name(), ?folded, "folded constant");
                    Ok(Expression::Literal(folded))
                }
                _ => Ok(Expression::arithmetic(left, op, right)),
            },
            BinOp::Comparison(op) => Ok(Expression::comparison(left, op, right)),
            BinOp::Logical(op) => Ok(Expression::Logical {
                op,
                args: vec![left, right],
            }),
        }
    }

    fn translate_unary(
        &self,
        op: &str,
        argument: &SyntaxNode,
        scope: &Scope<'_>,
    ) -> CompileResult<Expression> {
        let operand = self.translate(argument, scope, MemberContext::Value)?;
        match (op, operand) {
            ("-", Expression::Literal(Value::Integer(n))) => n
                .checked_neg()
                .map(|n| Expression::Literal(Value::Integer(n)))
                .ok_or_else(|| CompileError::arithmetic("negation overflows")),
            ("-", Expression::Literal(Value::Float(n))) => Ok(Expression::Literal(Value::Float(-n))),
            ("+", literal @ Expression::Literal(Value::Integer(_) | Value::Float(_))) => Ok(literal),
            ("!", Expression::Literal(Value::Boolean(b))) => {
                Ok(Expression::Literal(Value::Boolean(!b)))
            }
            (
                "!",
                Expression::Comparison {
                    left,
                    op: ComparisonOp::In,
                    right,
                },
            ) => Ok(Expression::Comparison {
                left,
                op: ComparisonOp::NotIn,
                right,
            }),
            (op, operand) => Err(CompileError::unknown_expression(format!(
                "unary {} on {}",
                op,
                operand.kind()
            ))),
        }
    }

    fn translate_member(
        &self,
        node: &SyntaxNode,
        object: &SyntaxNode,
        property: &str,
        scope: &Scope<'_>,
        ctx: MemberContext,
    ) -> CompileResult<Expression> {
        let Some(entity) = scope.entity else {
            return Err(CompileError::MissingClosureParameter(format!(
                "member `{}` is accessed but the closure declares no parameter",
                property
            )));
        };

        if node.root_identifier() == Some(entity) {
            return match object {
                SyntaxNode::Identifier(_) => self.resolve_member(property),
                // x.name.length -> length(name)
                _ => Ok(Expression::method_call(
                    property,
                    vec![self.translate(object, scope, MemberContext::Value)?],
                )),
            };
        }

        // Captured value: dereference now and embed the result
        let value = self.dereference(node, scope)?;
        match (ctx, value) {
            (MemberContext::Name, Value::String(name)) => {
                self.validator.test(&name, true, true)?;
                Ok(Expression::Member(name))
            }
            (_, value) => Ok(Expression::Literal(value)),
        }
    }

    /// Evaluates a chain that does not touch the entity parameter.
    fn dereference(&self, node: &SyntaxNode, scope: &Scope<'_>) -> CompileResult<Value> {
        match node {
            SyntaxNode::Identifier(name) => scope
                .lookup(name)
                .cloned()
                .ok_or_else(|| CompileError::UnresolvedIdentifier(name.clone())),
            SyntaxNode::Member { object, property } => {
                let base = self.dereference(object, scope)?;
                Ok(property_of(&base, property))
            }
            other => match self.translate(other, scope, MemberContext::Value)? {
                Expression::Literal(value) => Ok(value),
                expr => Err(CompileError::unknown_expression(format!(
                    "member access on {}",
                    expr.kind()
                ))),
            },
        }
    }

    fn translate_call(
        &self,
        callee: &SyntaxNode,
        arguments: &[SyntaxNode],
        scope: &Scope<'_>,
    ) -> CompileResult<Expression> {
        // x.name.startsWith('A'): receiver derived from the entity parameter
        if let SyntaxNode::Member { object, property } = callee
            && scope.is_entity_rooted(object)
        {
            let mut args = Vec::with_capacity(arguments.len() + 1);
            args.push(self.translate(object, scope, MemberContext::Value)?);
            for argument in arguments {
                args.push(self.translate(argument, scope, MemberContext::Value)?);
            }
            return self.resolve_method(property, args);
        }

        let args = arguments
            .iter()
            .map(|argument| self.translate(argument, scope, MemberContext::Value))
            .collect::<CompileResult<Vec<_>>>()?;

        // Unbound root: a namespace path such as `Math.floor`
        let namespaced = callee
            .root_identifier()
            .filter(|root| scope.lookup(root).is_none())
            .and_then(|_| callee.qualified_name());

        let (name, receiver) = match (namespaced, callee) {
            (Some(path), _) => (path, None),
            (None, SyntaxNode::Identifier(name)) => (name.clone(), None),
            (None, SyntaxNode::Member { object, property }) => (
                property.clone(),
                Some(self.translate(object, scope, MemberContext::Value)?),
            ),
            (None, other) => {
                return Err(CompileError::unknown_expression(format!(
                    "call of {}",
                    other.type_name()
                )));
            }
        };

        // [1, 2, 3].includes(x.id) -> x.id in [1, 2, 3]
        if name == "includes"
            && let Some(Expression::Literal(list @ Value::Array(_))) = &receiver
            && let [needle] = args.as_slice()
            && !needle.is_literal()
        {
            return Ok(Expression::comparison(
                needle.clone(),
                ComparisonOp::In,
                Expression::Literal(list.clone()),
            ));
        }

        let foldable = (receiver.is_some() || !args.is_empty())
            && receiver.iter().chain(args.iter()).all(Expression::is_literal);
        if foldable {
            let values: Vec<Value> = args.iter().filter_map(Expression::as_literal).cloned().collect();
            let result = builtins::evaluate(
                &name,
                receiver.as_ref().and_then(Expression::as_literal),
                &values,
            )?;
            tracing::debug!(method = %name, ?result, "evaluated call at compile time");
            return Ok(Expression::Literal(result));
        }

        let mut all = Vec::with_capacity(args.len() + 1);
        all.extend(receiver);
        all.extend(args);
        self.resolve_method(&name, all)
    }
}

fn parse_closure(source: &str) -> CompileResult<Closure> {
    let mut parser = Parser::new(Lexer::new(source))?;
    parser.parse_closure()
}

/// Property lookup on a captured value; absent properties are null.
fn property_of(value: &Value, property: &str) -> Value {
    match (value, property) {
        (Value::String(s), "length") => Value::Integer(s.chars().count() as i64),
        (Value::Array(items), "length") => Value::Integer(items.len() as i64),
        (Value::Array(items), index) => index
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Null),
        (value @ Value::Object(_), key) => value.get(key).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
