use crate::ast::SyntaxNode;

/// Statement inside a block-bodied closure.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Return statement
    ///
    /// # Example
    /// ```text
    /// return { id: x.id };
    /// ```
    Return(Option<SyntaxNode>),

    /// Bare expression statement
    ///
    /// # Example
    /// ```text
    /// x.id, x.name;
    /// ```
    Expression(SyntaxNode),
}

/// Body of a closure.
#[derive(Debug, Clone, PartialEq)]
pub enum ClosureBody {
    /// Concise arrow body (`x => x.id === 355`)
    Expression(SyntaxNode),

    /// Braced body (`x => { return x.id === 355; }`)
    Block(Vec<Statement>),
}
