use crate::{
    ast::Token,
    error::{CompileError, CompileResult},
};

/// Tokenizer for closure source text.
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

/// Operator symbols, longest first so that `===` wins over `==` and `=`.
const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "<<", ">>", "&&", "||", "<", ">", "+", "-", "*", "/",
    "%", "&", "|", "^", "!",
];

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Character offset of the next unread character.
    pub fn position(&self) -> usize {
        self.position
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

    fn starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_char(i) == Some(c))
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_string(&mut self, quote: char) -> CompileResult<String> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // Consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance(); // Consume backslash
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('0') => result.push('\0'),
                        Some('u') => {
                            result.push(self.read_unicode_escape()?);
                            continue;
                        }
                        Some(c @ ('"' | '\'' | '\\' | '/')) => result.push(c),
                        Some(c) => {
                            return Err(CompileError::unexpected(
                                self.position,
                                format!("invalid escape sequence \\{}", c),
                            ));
                        }
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(CompileError::unexpected(
            start,
            "unterminated string: missing closing quote",
        ))
    }

    /// Reads the `XXXX` of a `\uXXXX` escape; the cursor sits on `u`.
    fn read_unicode_escape(&mut self) -> CompileResult<char> {
        let start = self.position;
        self.advance();
        let mut hex = String::new();
        for _ in 0..4 {
            match self.current_char() {
                Some(c) if c.is_ascii_hexdigit() => {
                    hex.push(c);
                    self.advance();
                }
                _ => return Err(CompileError::unexpected(start, "invalid unicode escape")),
            }
        }
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| CompileError::unexpected(start, "invalid unicode escape"))
    }

    fn read_number(&mut self) -> CompileResult<Token> {
        let start = self.position;
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.' && !is_float && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E')
                && (self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
                    || (matches!(self.peek_char(1), Some('+' | '-'))
                        && self.peek_char(2).is_some_and(|c| c.is_ascii_digit())))
            {
                is_float = true;
                number.push(ch);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.current_char() {
                    number.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| CompileError::unexpected(start, format!("invalid number {}", number)))
        } else {
            match number.parse::<i64>() {
                Ok(n) => Ok(Token::Integer(n)),
                // Too large for an integer, keep it as a float like the host does
                Err(_) => number.parse::<f64>().map(Token::Float).map_err(|_| {
                    CompileError::unexpected(start, format!("invalid number {}", number))
                }),
            }
        }
    }

    pub fn next_token(&mut self) -> CompileResult<Token> {
        self.skip_whitespace();

        let token = match self.current_char() {
            None => Token::Eof,
            Some('(') => self.single(Token::LParen),
            Some(')') => self.single(Token::RParen),
            Some('{') => self.single(Token::LBrace),
            Some('}') => self.single(Token::RBrace),
            Some('[') => self.single(Token::LBracket),
            Some(']') => self.single(Token::RBracket),
            Some(',') => self.single(Token::Comma),
            Some(':') => self.single(Token::Colon),
            Some(';') => self.single(Token::Semicolon),
            Some('.') if !self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.single(Token::Dot)
            }
            Some('"') => Token::String(self.read_string('"')?),
            Some('\'') => Token::String(self.read_string('\'')?),
            Some('=') if self.starts_with("=>") => {
                self.position += 2;
                Token::Arrow
            }
            Some(ch) if ch.is_alphabetic() || ch == '_' || ch == '$' => {
                let ident = self.read_identifier();
                match ident.as_str() {
                    "return" => Token::Return,
                    "function" => Token::Function,
                    "true" => Token::Boolean(true),
                    "false" => Token::Boolean(false),
                    "null" | "undefined" => Token::Null,
                    _ => Token::Identifier(ident),
                }
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some('.') => {
                // `.5` style number
                let start = self.position;
                self.advance();
                let mut number = String::from("0.");
                while let Some(c) = self.current_char().filter(|c| c.is_ascii_digit()) {
                    number.push(c);
                    self.advance();
                }
                number
                    .parse::<f64>()
                    .map(Token::Float)
                    .map_err(|_| CompileError::unexpected(start, "invalid number"))?
            }
            Some(ch) => match OPERATORS.iter().find(|op| self.starts_with(op)) {
                Some(op) => {
                    self.position += op.chars().count();
                    Token::Operator(op.to_string())
                }
                None if ch == '=' => {
                    return Err(CompileError::unexpected(
                        self.position,
                        "unexpected '=' (did you mean '==' or '==='?)",
                    ));
                }
                None => {
                    return Err(CompileError::unexpected(
                        self.position,
                        format!("unexpected character '{}'", ch),
                    ));
                }
            },
        };
        Ok(token)
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("return function true false null undefined");
    assert_eq!(lexer.next_token(), Ok(Token::Return));
    assert_eq!(lexer.next_token(), Ok(Token::Function));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(true)));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(false)));
    assert_eq!(lexer.next_token(), Ok(Token::Null));
    assert_eq!(lexer.next_token(), Ok(Token::Null));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}

#[test]
fn test_arrow_filter() {
    let mut lexer = Lexer::new("x => x.id === 355");
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("x".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::Arrow));
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("x".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::Dot));
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("id".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::Operator("===".to_string())));
    assert_eq!(lexer.next_token(), Ok(Token::Integer(355)));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}
