use super::{
    QueryOptionParser,
    tokenizer::{QueryToken, Syntax, TokenKind, Tokenizer},
};
use crate::{
    ast::{BinOp, Expression, SortDirection},
    error::{CompileError, CompileResult},
    value::Value,
};

/// Token cursor for one parse call.
struct Cursor<'a> {
    tokens: Vec<QueryToken>,
    index: usize,
    end: usize,
    /// Expanded entity the option string belongs to
    target: Option<&'a str>,
}

impl<'a> Cursor<'a> {
    fn new(text: &str, target: Option<&'a str>) -> CompileResult<Self> {
        let tokenizer = Tokenizer::new(text);
        let end = tokenizer.len();
        Ok(Cursor {
            tokens: tokenizer.tokenize()?,
            index: 0,
            end,
            target,
        })
    }

    fn peek(&self) -> Option<&QueryToken> {
        self.tokens.get(self.index)
    }

    fn peek_at(&self, offset: usize) -> Option<&QueryToken> {
        self.tokens.get(self.index + offset)
    }

    fn advance(&mut self) -> Option<QueryToken> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn position(&self) -> usize {
        self.peek().map_or(self.end, |t| t.position)
    }

    fn check(&self, syntax: Syntax) -> bool {
        self.peek().is_some_and(|t| t.is_syntax(syntax))
    }

    /// Consumes the next token when it is the given keyword, ignoring case.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let matched = self
            .peek()
            .and_then(QueryToken::identifier)
            .is_some_and(|word| word.eq_ignore_ascii_case(keyword));
        if matched {
            self.index += 1;
        }
        matched
    }

    fn expect(&mut self, syntax: Syntax, what: &str) -> CompileResult<()> {
        if self.check(syntax) {
            self.index += 1;
            Ok(())
        } else {
            Err(CompileError::expected(self.position(), what))
        }
    }

    /// Operator keyword at the cursor, if any.
    fn operator(&self) -> Option<BinOp> {
        self.peek()
            .and_then(QueryToken::identifier)
            .and_then(BinOp::from_keyword)
    }

    fn at_terminator(&self) -> bool {
        match self.peek() {
            None => true,
            Some(token) => {
                token.is_syntax(Syntax::Comma)
                    || token.is_syntax(Syntax::RParen)
                    || token.is_syntax(Syntax::Colon)
            }
        }
    }

    fn unexpected(&self, context: &str) -> CompileError {
        match self.peek() {
            Some(token) => CompileError::unexpected(
                token.position,
                format!("unexpected {:?} {}", token.kind, context),
            ),
            None => CompileError::unexpected(self.end, format!("unexpected end of input {}", context)),
        }
    }
}

impl QueryOptionParser {
    pub(super) fn filter(&self, text: &str, target: Option<&str>) -> CompileResult<Expression> {
        let mut cursor = Cursor::new(text, target)?;
        let expr = self.parse_expression(&mut cursor)?;
        if cursor.peek().is_some() {
            return Err(cursor.unexpected("after filter expression"));
        }
        Ok(expr)
    }

    /// `$select` / `$groupby`: `term [as alias], ...`
    pub(super) fn select(&self, text: &str, target: Option<&str>) -> CompileResult<Vec<Expression>> {
        let mut cursor = Cursor::new(text, target)?;
        self.parse_list(&mut cursor, |parser, cursor| {
            let term = parser.parse_primary(cursor)?;
            if !cursor.eat_keyword("as") {
                return Ok(term);
            }
            let position = cursor.position();
            match cursor.advance().map(|t| t.kind) {
                Some(TokenKind::Identifier(alias)) => {
                    parser.validator.test(&alias, false, true)?;
                    Ok(Expression::select(term, alias))
                }
                _ => Err(CompileError::expected(position, "alias after `as`")),
            }
        })
    }

    /// `$orderby`: `term [asc|desc], ...`
    pub(super) fn order_by(
        &self,
        text: &str,
        target: Option<&str>,
    ) -> CompileResult<Vec<Expression>> {
        let mut cursor = Cursor::new(text, target)?;
        self.parse_list(&mut cursor, |parser, cursor| {
            let term = parser.parse_primary(cursor)?;
            let direction = if cursor.eat_keyword("desc") {
                SortDirection::Desc
            } else {
                cursor.eat_keyword("asc");
                SortDirection::Asc
            };
            Ok(Expression::order_by(term, direction))
        })
    }

    fn parse_list(
        &self,
        cursor: &mut Cursor<'_>,
        item: impl Fn(&Self, &mut Cursor<'_>) -> CompileResult<Expression>,
    ) -> CompileResult<Vec<Expression>> {
        let mut items = vec![item(self, cursor)?];
        while cursor.check(Syntax::Comma) {
            cursor.advance();
            items.push(item(self, cursor)?);
        }
        if cursor.peek().is_some() {
            return Err(cursor.unexpected("in list"));
        }
        Ok(items)
    }

    /// Relational operand, then an optional logical operator whose right
    /// side is a whole expression.
    fn parse_expression(&self, cursor: &mut Cursor<'_>) -> CompileResult<Expression> {
        let left = self.parse_operand(cursor, 0)?;
        if cursor.at_terminator() {
            return Ok(left);
        }
        match cursor.operator() {
            Some(BinOp::Logical(op)) => {
                cursor.advance();
                let right = self.parse_expression(cursor)?;
                Ok(Expression::logical(op, left, right))
            }
            _ => Err(cursor.unexpected("where an operator was expected")),
        }
    }

    /// Precedence climbing over comparison and arithmetic operators.
    fn parse_operand(&self, cursor: &mut Cursor<'_>, min_precedence: u8) -> CompileResult<Expression> {
        let mut left = self.parse_primary(cursor)?;

        loop {
            // Logical operators end an operand
            let Some(op) = cursor
                .operator()
                .filter(|op| !matches!(op, BinOp::Logical(_)))
            else {
                break;
            };
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            cursor.advance();
            let right = self.parse_operand(cursor, precedence + 1)?;
            left = match op {
                BinOp::Arithmetic(op) => Expression::arithmetic(left, op, right),
                BinOp::Comparison(op) => Expression::comparison(left, op, right),
                BinOp::Logical(op) => Expression::logical(op, left, right),
            };
        }

        Ok(left)
    }

    fn parse_primary(&self, cursor: &mut Cursor<'_>) -> CompileResult<Expression> {
        let Some(token) = cursor.peek().cloned() else {
            return Err(cursor.unexpected("where a term was expected"));
        };

        match token.kind {
            TokenKind::Literal(value) => {
                cursor.advance();
                Ok(Expression::Literal(value))
            }
            TokenKind::Syntax(Syntax::LParen) => {
                cursor.advance();
                let inner = self.parse_expression(cursor)?;
                cursor.expect(Syntax::RParen, "`)`")?;
                Ok(inner)
            }
            TokenKind::Syntax(Syntax::Negative) => Err(CompileError::unexpected(
                token.position,
                "unary negative is not supported",
            )),
            TokenKind::Identifier(name) if BinOp::from_keyword(&name).is_some() => {
                Err(cursor.unexpected("where a term was expected"))
            }
            TokenKind::Identifier(name) => {
                cursor.advance();
                if cursor.check(Syntax::LParen) {
                    cursor.advance();
                    if name.eq_ignore_ascii_case("case") {
                        self.parse_case(cursor)
                    } else {
                        self.parse_call(name, cursor)
                    }
                } else {
                    self.parse_member(name, cursor)
                }
            }
            TokenKind::Syntax(_) => Err(cursor.unexpected("where a term was expected")),
        }
    }

    /// `a/b/c` with the first segment already consumed.
    fn parse_member(&self, first: String, cursor: &mut Cursor<'_>) -> CompileResult<Expression> {
        let mut segments = vec![first];
        while cursor.check(Syntax::Slash) {
            cursor.advance();
            let position = cursor.position();
            match cursor.advance().map(|t| t.kind) {
                Some(TokenKind::Identifier(segment)) => segments.push(segment),
                _ => return Err(CompileError::expected(position, "member name after `/`")),
            }
        }
        if cursor.check(Syntax::LParen) {
            return Err(cursor.unexpected("after member path; calls on a path are not supported"));
        }
        if segments.first().is_some_and(|s| s == "$it") {
            segments.remove(0);
            if segments.is_empty() {
                return Err(CompileError::expected(cursor.position(), "member after `$it`"));
            }
        }
        self.resolve_member(segments.join("."), cursor.target)
    }

    /// Call arguments; the cursor is past `(`.
    fn parse_call(&self, name: String, cursor: &mut Cursor<'_>) -> CompileResult<Expression> {
        let mut args = Vec::new();
        if !cursor.check(Syntax::RParen) {
            loop {
                args.push(self.parse_expression(cursor)?);
                if cursor.check(Syntax::Comma) {
                    cursor.advance();
                } else {
                    break;
                }
            }
        }
        cursor.expect(Syntax::RParen, "`)`")?;
        self.resolve_method(name, args, cursor.target)
    }

    /// `case(cond : result, ..., true : default)`; the cursor is past `(`.
    fn parse_case(&self, cursor: &mut Cursor<'_>) -> CompileResult<Expression> {
        let mut branches = Vec::new();
        let mut default = None;

        while !cursor.check(Syntax::RParen) {
            let condition = self.parse_expression(cursor)?;
            cursor.expect(Syntax::Colon, "`:` in case branch")?;
            let result = self.parse_expression(cursor)?;

            if condition == Expression::Literal(Value::Boolean(true)) {
                default = Some(Box::new(result));
                break;
            }
            branches.push((condition, result));

            if cursor.check(Syntax::Comma) {
                cursor.advance();
            } else if !cursor.check(Syntax::RParen) {
                return Err(CompileError::expected(cursor.position(), "`,` or `)` in case"));
            }
        }
        cursor.expect(Syntax::RParen, "`)` closing case")?;

        if branches.is_empty() {
            return Err(CompileError::expected(cursor.position(), "at least one case branch"));
        }
        Ok(Expression::Switch { branches, default })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn precedence_inside_comparison() {
        let parser = QueryOptionParser::new();
        let expr = parser.parse_filter("price add 10 mul 2 gt 100").unwrap();
        assert_eq!(
            expr.serialize().unwrap(),
            json!({ "$gt": [
                { "$add": [ { "$name": "price" }, { "$multiply": [10, 2] } ] },
                100
            ] })
        );
    }

    #[test]
    fn it_prefix_and_paths() {
        let parser = QueryOptionParser::new();
        assert_eq!(
            parser.parse_filter("$it/category/name").unwrap(),
            Expression::member("category.name")
        );
        assert!(parser.parse_filter("$it").is_err());
        assert!(parser.parse_filter("a/b(1)").is_err());
    }

    #[test]
    fn keyword_in_term_position() {
        let parser = QueryOptionParser::new();
        assert!(matches!(
            parser.parse_filter("eq eq 1"),
            Err(CompileError::UnexpectedToken { position: 0, .. })
        ));
    }

    #[test]
    fn trailing_tokens_rejected() {
        let parser = QueryOptionParser::new();
        assert!(matches!(
            parser.parse_filter("price gt 1)"),
            Err(CompileError::UnexpectedToken { position: 10, .. })
        ));
    }
}
