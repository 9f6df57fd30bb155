use crate::{
    ast::{Closure, ClosureBody, PropertyKey, Statement, SyntaxNode, Token},
    error::{CompileError, CompileResult},
    lexer::Lexer,
    value::Value,
};
use std::mem;

/// Binary operator levels, loosest first. `&&` and `||` produce logical
/// nodes; everything else produces binary nodes.
const BINARY_LEVELS: &[&[&str]] = &[
    &["||"],
    &["&&"],
    &["|"],
    &["^"],
    &["&"],
    &["==", "!=", "===", "!=="],
    &["<", ">", "<=", ">="],
    &["<<", ">>"],
    &["+", "-"],
    &["*", "/", "%"],
];

/// Recursive-descent parser for closure source text.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    token_start: usize,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> CompileResult<Self> {
        let current_token = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current_token,
            token_start: 0,
        })
    }

    fn advance(&mut self) -> CompileResult<()> {
        self.token_start = self.lexer.position();
        self.current_token = self.lexer.next_token()?;
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> CompileResult<()> {
        if !self.check(&expected) {
            return Err(CompileError::expected(
                self.token_start,
                format!("{:?}, got {:?}", expected, self.current_token),
            ));
        }
        self.advance()
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn unexpected(&self, context: &str) -> CompileError {
        CompileError::unexpected(
            self.token_start,
            format!("unexpected {:?} {}", self.current_token, context),
        )
    }

    /// Parse a complete closure: parameters and body.
    pub fn parse_closure(&mut self) -> CompileResult<Closure> {
        let params = match &self.current_token {
            Token::Function => {
                self.advance()?;
                // Optional function name
                if let Token::Identifier(_) = self.current_token {
                    self.advance()?;
                }
                self.parse_param_list()?
            }
            Token::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                vec![name]
            }
            Token::LParen => self.parse_param_list()?,
            _ => return Err(self.unexpected("at start of closure")),
        };

        let body = if self.check(&Token::Arrow) {
            self.advance()?;
            if self.check(&Token::LBrace) {
                ClosureBody::Block(self.parse_block()?)
            } else {
                ClosureBody::Expression(self.parse_assignment_level()?)
            }
        } else if self.check(&Token::LBrace) {
            ClosureBody::Block(self.parse_block()?)
        } else {
            return Err(CompileError::MissingClosureBody(format!(
                "expected `=>` or a block, got {:?}",
                self.current_token
            )));
        };

        self.expect(Token::Eof)?;
        Ok(Closure { params, body })
    }

    /// Parse a standalone expression.
    pub fn parse(&mut self) -> CompileResult<SyntaxNode> {
        let expr = self.parse_expression()?;
        self.expect(Token::Eof)?;
        Ok(expr)
    }

    fn parse_param_list(&mut self) -> CompileResult<Vec<String>> {
        self.expect(Token::LParen)?;
        let mut params = vec![];

        while !self.check(&Token::RParen) {
            match &self.current_token {
                Token::Identifier(name) => {
                    params.push(name.clone());
                    self.advance()?;
                }
                _ => return Err(self.unexpected("in parameter list")),
            }

            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }

        self.expect(Token::RParen)?;
        Ok(params)
    }

    fn parse_block(&mut self) -> CompileResult<Vec<Statement>> {
        self.expect(Token::LBrace)?;
        let mut statements = vec![];

        while !self.check(&Token::RBrace) {
            if self.check(&Token::Eof) {
                return Err(CompileError::expected(self.token_start, "`}`"));
            }
            if self.check(&Token::Semicolon) {
                self.advance()?;
                continue;
            }

            let statement = if self.check(&Token::Return) {
                self.advance()?;
                if self.check(&Token::Semicolon) || self.check(&Token::RBrace) {
                    Statement::Return(None)
                } else {
                    Statement::Return(Some(self.parse_expression()?))
                }
            } else {
                Statement::Expression(self.parse_expression()?)
            };
            statements.push(statement);

            if self.check(&Token::Semicolon) {
                self.advance()?;
            }
        }

        self.expect(Token::RBrace)?;
        Ok(statements)
    }

    /// Full expression including comma sequences.
    pub fn parse_expression(&mut self) -> CompileResult<SyntaxNode> {
        let first = self.parse_assignment_level()?;
        if !self.check(&Token::Comma) {
            return Ok(first);
        }

        let mut elements = vec![first];
        while self.check(&Token::Comma) {
            self.advance()?;
            elements.push(self.parse_assignment_level()?);
        }
        Ok(SyntaxNode::Sequence(elements))
    }

    /// A single expression without top-level commas.
    fn parse_assignment_level(&mut self) -> CompileResult<SyntaxNode> {
        self.parse_binary(0)
    }

    fn parse_binary(&mut self, level: usize) -> CompileResult<SyntaxNode> {
        if level == BINARY_LEVELS.len() {
            return self.parse_unary();
        }

        let mut left = self.parse_binary(level + 1)?;

        loop {
            let op = match &self.current_token {
                Token::Operator(op) if BINARY_LEVELS[level].contains(&op.as_str()) => op.clone(),
                _ => break,
            };

            self.advance()?;
            let right = self.parse_binary(level + 1)?;

            left = if op == "&&" || op == "||" {
                SyntaxNode::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            } else {
                SyntaxNode::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> CompileResult<SyntaxNode> {
        match &self.current_token {
            Token::Operator(op) if matches!(op.as_str(), "-" | "+" | "!") => {
                let op = op.clone();
                self.advance()?;
                let argument = self.parse_unary()?; // Right-associative
                Ok(SyntaxNode::Unary {
                    op,
                    argument: Box::new(argument),
                })
            }
            _ => self.parse_access(),
        }
    }

    /// Parse member access and call chains
    fn parse_access(&mut self) -> CompileResult<SyntaxNode> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&Token::Dot) {
                self.advance()?; // consume '.'

                // After dot, we expect an identifier
                let property = match &self.current_token {
                    Token::Identifier(n) => n.clone(),
                    _ => return Err(self.unexpected("after '.'")),
                };
                self.advance()?;

                expr = SyntaxNode::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.check(&Token::LBracket) {
                self.advance()?;
                let property = match mem::replace(&mut self.current_token, Token::Eof) {
                    Token::String(s) => s,
                    Token::Integer(n) => n.to_string(),
                    token => {
                        self.current_token = token;
                        return Err(CompileError::unknown_expression(format!(
                            "computed member access with {:?}",
                            self.current_token
                        )));
                    }
                };
                self.advance()?;
                self.expect(Token::RBracket)?;

                expr = SyntaxNode::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.check(&Token::LParen) {
                self.advance()?;
                let arguments = self.parse_arguments()?;
                expr = SyntaxNode::Call {
                    callee: Box::new(expr),
                    arguments,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> CompileResult<Vec<SyntaxNode>> {
        let mut arguments = vec![];

        while !self.check(&Token::RParen) {
            arguments.push(self.parse_assignment_level()?);

            if !self.check(&Token::RParen) {
                self.expect(Token::Comma)?;
            }
        }

        self.expect(Token::RParen)?;
        Ok(arguments)
    }

    /// Parse primary expressions (atoms): literals, identifiers, groups,
    /// object and array literals
    fn parse_primary(&mut self) -> CompileResult<SyntaxNode> {
        let node = match mem::replace(&mut self.current_token, Token::Eof) {
            // Literals
            Token::Float(n) => SyntaxNode::Literal(Value::Float(n)),
            Token::Integer(n) => SyntaxNode::Literal(Value::Integer(n)),
            Token::String(s) => SyntaxNode::Literal(Value::String(s)),
            Token::Boolean(b) => SyntaxNode::Literal(Value::Boolean(b)),
            Token::Null => SyntaxNode::Literal(Value::Null),

            Token::Identifier(name) => SyntaxNode::Identifier(name),

            Token::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                if !self.check(&Token::RParen) {
                    return Err(CompileError::expected(self.token_start, "`)`"));
                }
                expr
            }

            // Object literals
            Token::LBrace => {
                self.advance()?;
                return self.parse_object_literal();
            }
            // Array literals
            Token::LBracket => {
                self.advance()?;
                return self.parse_array_literal();
            }

            token => {
                self.current_token = token;
                return Err(self.unexpected("in expression"));
            }
        };
        self.advance()?;
        Ok(node)
    }

    fn parse_object_literal(&mut self) -> CompileResult<SyntaxNode> {
        let mut properties = vec![];

        while !self.check(&Token::RBrace) {
            let key = match mem::replace(&mut self.current_token, Token::Eof) {
                Token::Identifier(s) => PropertyKey::Identifier(s),
                Token::String(s) => PropertyKey::Literal(Value::String(s)),
                Token::Integer(n) => PropertyKey::Literal(Value::Integer(n)),
                Token::Float(n) => PropertyKey::Literal(Value::Float(n)),
                Token::LBracket => {
                    self.advance()?;
                    let key = self.parse_assignment_level()?;
                    if !self.check(&Token::RBracket) {
                        return Err(CompileError::expected(self.token_start, "`]`"));
                    }
                    PropertyKey::Computed(Box::new(key))
                }
                token => {
                    self.current_token = token;
                    return Err(self.unexpected("as object key"));
                }
            };
            self.advance()?;

            self.expect(Token::Colon)?;

            let value = self.parse_assignment_level()?;
            properties.push((key, value));

            if !self.check(&Token::RBrace) {
                self.expect(Token::Comma)?;
            }
        }

        self.expect(Token::RBrace)?;
        Ok(SyntaxNode::Object(properties))
    }

    fn parse_array_literal(&mut self) -> CompileResult<SyntaxNode> {
        let mut elements = vec![];

        while !self.check(&Token::RBracket) {
            elements.push(self.parse_assignment_level()?);

            if !self.check(&Token::RBracket) {
                self.expect(Token::Comma)?;
            }
        }

        self.expect(Token::RBracket)?;
        Ok(SyntaxNode::Array(elements))
    }
}
