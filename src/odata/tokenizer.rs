use crate::{
    error::{CompileError, CompileResult},
    value::Value,
};

/// Punctuation of the query-option grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Slash,
    Comma,
    LParen,
    RParen,
    Colon,
    /// `-` not followed by a digit
    Negative,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A word; operator keywords (`eq`, `and`, ...) are recognised by the
    /// parser from context.
    Identifier(String),
    Literal(Value),
    Syntax(Syntax),
}

/// A token and the character offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryToken {
    pub kind: TokenKind,
    pub position: usize,
}

impl QueryToken {
    pub fn is_syntax(&self, syntax: Syntax) -> bool {
        self.kind == TokenKind::Syntax(syntax)
    }

    pub fn identifier(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(name) => Some(name),
            _ => None,
        }
    }
}

/// Tokenizer for query-option strings.
pub struct Tokenizer {
    input: Vec<char>,
    position: usize,
}

impl Tokenizer {
    pub fn new(input: &str) -> Self {
        Tokenizer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Tokenizes the whole input.
    pub fn tokenize(mut self) -> CompileResult<Vec<QueryToken>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tracing::trace!(?token, "query token");
            tokens.push(token);
        }
        Ok(tokens)
    }

    /// Length of the input in characters.
    pub fn len(&self) -> usize {
        self.input.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn next_token(&mut self) -> CompileResult<Option<QueryToken>> {
        self.skip_whitespace();
        let position = self.position;
        let Some(ch) = self.current_char() else {
            return Ok(None);
        };

        let kind = match ch {
            '/' => self.syntax(Syntax::Slash),
            ',' => self.syntax(Syntax::Comma),
            '(' => self.syntax(Syntax::LParen),
            ')' => self.syntax(Syntax::RParen),
            ':' => self.syntax(Syntax::Colon),
            '-' if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                TokenKind::Literal(self.read_number(position, true)?)
            }
            '-' => self.syntax(Syntax::Negative),
            '\'' => TokenKind::Literal(Value::String(self.read_string()?)),
            c if c.is_ascii_digit() => TokenKind::Literal(self.read_number(position, false)?),
            c if is_identifier_start(c) => {
                let word = self.read_identifier();
                match word.as_str() {
                    "true" => TokenKind::Literal(Value::Boolean(true)),
                    "false" => TokenKind::Literal(Value::Boolean(false)),
                    "null" => TokenKind::Literal(Value::Null),
                    _ => TokenKind::Identifier(word),
                }
            }
            c => {
                return Err(CompileError::unexpected(
                    position,
                    format!("unexpected character '{}'", c),
                ));
            }
        };

        Ok(Some(QueryToken { kind, position }))
    }

    fn syntax(&mut self, syntax: Syntax) -> TokenKind {
        self.advance();
        TokenKind::Syntax(syntax)
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if is_identifier_part(ch) {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Single-quoted string; `''` stands for one quote.
    fn read_string(&mut self) -> CompileResult<String> {
        let start = self.position;
        let mut result = String::new();
        self.advance();

        while let Some(ch) = self.current_char() {
            self.advance();
            if ch != '\'' {
                result.push(ch);
                continue;
            }
            if self.current_char() == Some('\'') {
                result.push('\'');
                self.advance();
            } else {
                return Ok(result);
            }
        }

        Err(CompileError::unexpected(
            start,
            "unterminated string: missing closing quote",
        ))
    }

    fn read_number(&mut self, start: usize, negative: bool) -> CompileResult<Value> {
        let mut text = String::new();
        if negative {
            text.push('-');
        }
        let mut is_float = false;

        self.read_digits(&mut text);
        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.advance();
            self.read_digits(&mut text);
        }
        if matches!(self.current_char(), Some('e' | 'E')) {
            let sign = matches!(self.peek_char(1), Some('+' | '-'));
            let digit_at = if sign { 2 } else { 1 };
            if self.peek_char(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if sign {
                    text.extend(self.current_char());
                    self.advance();
                }
                self.read_digits(&mut text);
            }
        }

        // Type suffixes: decimal, double, float, long
        match self.current_char() {
            Some('m' | 'M' | 'd' | 'D' | 'f' | 'F') => {
                is_float = true;
                self.advance();
            }
            Some('l' | 'L') => self.advance(),
            _ => {}
        }
        if self.current_char().is_some_and(is_identifier_part) {
            return Err(CompileError::unexpected(
                self.position,
                format!("invalid numeric literal starting with `{}`", text),
            ));
        }

        let invalid = |_| CompileError::unexpected(start, format!("invalid number: {}", text));
        if is_float {
            text.parse::<f64>().map(Value::Float).map_err(invalid)
        } else {
            match text.parse::<i64>() {
                Ok(n) => Ok(Value::Integer(n)),
                Err(_) => text.parse::<f64>().map(Value::Float).map_err(invalid),
            }
        }
    }

    fn read_digits(&mut self, text: &mut String) {
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Tokenizer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            kinds("price ge 400"),
            vec![
                TokenKind::Identifier("price".into()),
                TokenKind::Identifier("ge".into()),
                TokenKind::Literal(Value::Integer(400)),
            ]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds("'O''Brien'"),
            vec![TokenKind::Literal(Value::from("O'Brien"))]
        );
        assert!(Tokenizer::new("'open").tokenize().is_err());
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("-5 2.5 1e3 10m 7L"),
            vec![
                TokenKind::Literal(Value::Integer(-5)),
                TokenKind::Literal(Value::Float(2.5)),
                TokenKind::Literal(Value::Float(1000.0)),
                TokenKind::Literal(Value::Float(10.0)),
                TokenKind::Literal(Value::Integer(7)),
            ]
        );
        assert!(Tokenizer::new("12abc").tokenize().is_err());
    }

    #[test]
    fn test_syntax_and_positions() {
        let tokens = Tokenizer::new("$it/name, -x").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier("$it".into()));
        assert!(tokens[1].is_syntax(Syntax::Slash));
        assert!(tokens[3].is_syntax(Syntax::Comma));
        assert!(tokens[4].is_syntax(Syntax::Negative));
        assert_eq!(tokens[4].position, 10);
    }
}
