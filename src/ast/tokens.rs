/// Lexical tokens of closure source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Floating-point number
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 1e3
    /// ```
    Float(f64),

    /// Integer
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 355
    /// ```
    Integer(i64),

    /// String literal in single or double quotes
    ///
    /// # Examples
    /// ```text
    /// 'Laptops'
    /// "item #1"
    /// ```
    String(String),

    /// Boolean values
    Boolean(bool),

    /// Null value (`null` or `undefined`)
    Null,

    // Identifiers and keywords
    /// Name of a parameter, property, or captured value
    ///
    /// # Examples
    /// ```text
    /// x
    /// familyName
    /// $price
    /// ```
    Identifier(String),

    /// `return`
    Return,

    /// `function`
    Function,

    /// Arrow separating closure parameters from the body (`=>`)
    Arrow,

    // Operators
    /// Any binary or unary operator symbol (`===`, `&&`, `+`, `!`, `<<`, ...)
    ///
    /// Kept as text so the compiler can report operators it has no
    /// canonical mapping for.
    Operator(String),

    // Delimiters
    /// Left parenthesis for grouping, parameter lists, or calls
    LParen,

    /// Right parenthesis
    RParen,

    /// Left brace for blocks and object literals
    LBrace,

    /// Right brace
    RBrace,

    /// Left bracket for array literals and computed keys
    LBracket,

    /// Right bracket
    RBracket,

    /// Dot for member access
    Dot,

    /// Comma for arguments, properties, and sequences
    Comma,

    /// Colon for object literal key-value pairs
    Colon,

    /// Statement terminator
    Semicolon,

    /// End of input
    Eof,
}

impl Token {
    pub fn is_operator(&self, symbol: &str) -> bool {
        matches!(self, Token::Operator(op) if op == symbol)
    }
}
