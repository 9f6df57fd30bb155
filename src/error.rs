//! Error types shared by both compiler front ends.

/// Result type alias using [`CompileError`].
pub type CompileResult<T> = Result<T, CompileError>;

/// Everything that can go wrong while compiling a closure or a query-option
/// string into an expression tree, or while serializing that tree.
///
/// All errors are fail-fast: no partial tree is ever returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// The closure source has no body the compiler understands.
    #[error("missing closure body: {0}")]
    MissingClosureBody(String),

    /// A block body has no return statement to compile.
    #[error("missing return statement: {0}")]
    MissingReturnStatement(String),

    /// A syntax node that has no translation rule.
    #[error("expression not implemented: {0}")]
    UnknownExpressionType(String),

    /// An operator token outside the canonical operator map.
    #[error("invalid operator: {0}")]
    InvalidOperator(String),

    /// Member access on a closure that declares no entity parameter.
    #[error("missing closure parameter: {0}")]
    MissingClosureParameter(String),

    #[error("identifier `{0}` cannot be found; pass parameters if it is used inside a method")]
    UnresolvedIdentifier(String),

    /// Object literal property key is neither an identifier nor a literal.
    #[error("invalid object key: {0}")]
    InvalidObjectKey(String),

    /// Rejected by the field-name validator.
    #[error("invalid object name: `{0}`")]
    InvalidFieldName(String),

    /// Grammar violation while lexing or parsing.
    #[error("unexpected token at position {position}: {message}")]
    UnexpectedToken { position: usize, message: String },

    /// A specific syntax element was required but something else was found.
    #[error("expected {expected} at position {position}")]
    ExpectedSyntax { position: usize, expected: String },

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("invalid select closure: {0}")]
    InvalidSelectClosure(String),

    /// A sequence element that cannot appear in an inclusion-style projection.
    #[error("sequence expression has a member whose type is not implemented: {0}")]
    InvalidSequenceMember(String),

    #[error("method `{0}` requires at least one argument")]
    MissingMethodArgument(String),

    #[error("select expression is missing an alias")]
    MissingAlias,

    /// Constant folding failed (division by zero, overflow).
    #[error("arithmetic error: {0}")]
    ArithmeticError(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CompileError {
    pub fn unexpected(position: usize, message: impl Into<String>) -> Self {
        Self::UnexpectedToken {
            position,
            message: message.into(),
        }
    }

    pub fn expected(position: usize, expected: impl Into<String>) -> Self {
        Self::ExpectedSyntax {
            position,
            expected: expected.into(),
        }
    }

    pub fn unknown_expression(msg: impl Into<String>) -> Self {
        Self::UnknownExpressionType(msg.into())
    }

    pub fn unsupported_method(name: impl Into<String>) -> Self {
        Self::UnsupportedMethod(name.into())
    }

    pub fn arithmetic(msg: impl Into<String>) -> Self {
        Self::ArithmeticError(msg.into())
    }
}
