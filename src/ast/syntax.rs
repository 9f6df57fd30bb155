use crate::value::Value;

/// Generic syntax tree of a closure's source text.
///
/// This is the shape the closure compiler walks; it knows nothing about
/// entity parameters or canonical operators yet.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxNode {
    /// Free name: a parameter or captured value
    Identifier(String),

    /// Literal value
    Literal(Value),

    /// Member access
    ///
    /// # Examples
    /// ```text
    /// x.price
    /// x.dateCreated.getFullYear
    /// ```
    Member {
        object: Box<SyntaxNode>,
        property: String,
    },

    /// Call
    ///
    /// # Examples
    /// ```text
    /// x.name.startsWith('A')
    /// Math.floor(x.price)
    /// ```
    Call {
        callee: Box<SyntaxNode>,
        arguments: Vec<SyntaxNode>,
    },

    /// Binary operation, operator kept as source text
    Binary {
        op: String,
        left: Box<SyntaxNode>,
        right: Box<SyntaxNode>,
    },

    /// `&&` / `||`
    Logical {
        op: String,
        left: Box<SyntaxNode>,
        right: Box<SyntaxNode>,
    },

    /// Prefix operation (`-x`, `!x`)
    Unary { op: String, argument: Box<SyntaxNode> },

    /// Object literal
    ///
    /// # Example
    /// ```text
    /// { id: x.id, "lastName": x.familyName }
    /// ```
    Object(Vec<(PropertyKey, SyntaxNode)>),

    /// Array literal
    Array(Vec<SyntaxNode>),

    /// Comma expression
    ///
    /// # Example
    /// ```text
    /// x.id, x.name
    /// ```
    Sequence(Vec<SyntaxNode>),
}

/// Key of an object literal property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKey {
    Identifier(String),
    Literal(Value),
    /// `[expr]: value`
    Computed(Box<SyntaxNode>),
}

impl SyntaxNode {
    /// Short node type name, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            SyntaxNode::Identifier(_) => "Identifier",
            SyntaxNode::Literal(_) => "Literal",
            SyntaxNode::Member { .. } => "MemberExpression",
            SyntaxNode::Call { .. } => "CallExpression",
            SyntaxNode::Binary { .. } => "BinaryExpression",
            SyntaxNode::Logical { .. } => "LogicalExpression",
            SyntaxNode::Unary { .. } => "UnaryExpression",
            SyntaxNode::Object(_) => "ObjectExpression",
            SyntaxNode::Array(_) => "ArrayExpression",
            SyntaxNode::Sequence(_) => "SequenceExpression",
        }
    }

    /// Dotted source path of an identifier/member chain (`Math.floor`).
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            SyntaxNode::Identifier(name) => Some(name.clone()),
            SyntaxNode::Member { object, property } => object
                .qualified_name()
                .map(|base| format!("{}.{}", base, property)),
            _ => None,
        }
    }

    /// Name of the identifier at the root of a member/call chain.
    pub fn root_identifier(&self) -> Option<&str> {
        match self {
            SyntaxNode::Identifier(name) => Some(name),
            SyntaxNode::Member { object, .. } => object.root_identifier(),
            SyntaxNode::Call { callee, .. } => callee.root_identifier(),
            _ => None,
        }
    }
}
