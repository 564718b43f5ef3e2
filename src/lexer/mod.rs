pub mod tokens;

use tokens::{keyword_type, Token, TokenType};
use std::fmt;

#[derive(Debug)]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub file: String,
}

impl fmt::Display for LexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}: {}", self.file, self.line, self.column, self.message)
    }
}

impl std::error::Error for LexerError {}

pub struct Lexer {
    source: Vec<char>,
    filename: String,
    start: usize,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    pub fn new(source: &str, filename: &str) -> Self {
        Self {
            source: source.chars().collect(),
            filename: filename.to_string(),
            start: 0,
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        while !self.at_end() {
            self.start = self.pos;
            self.scan_token()?;
        }

        self.tokens
            .push(Token::new(TokenType::Eof, "", self.line, self.column));
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let start_column = self.column;
        let c = self.advance();

        match c {
            '(' => self.add_token(TokenType::LParen, start_column),
            ')' => self.add_token(TokenType::RParen, start_column),
            '{' => self.add_token(TokenType::LBrace, start_column),
            '}' => self.add_token(TokenType::RBrace, start_column),
            '[' => self.add_token(TokenType::LBracket, start_column),
            ']' => self.add_token(TokenType::RBracket, start_column),
            ',' => self.add_token(TokenType::Comma, start_column),
            '.' => self.add_token(TokenType::Dot, start_column),
            ':' => self.add_token(TokenType::Colon, start_column),
            ';' => self.add_token(TokenType::Semicolon, start_column),
            '+' => self.add_token(TokenType::Plus, start_column),
            '-' => self.add_token(TokenType::Minus, start_column),
            '*' => self.add_token(TokenType::Star, start_column),
            '%' => self.add_token(TokenType::Percent, start_column),
            '^' => self.add_token(TokenType::Caret, start_column),
            '!' => {
                let ttype = if self.match_char('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                self.add_token(ttype, start_column);
            }
            '=' => {
                let ttype = if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Assign
                };
                self.add_token(ttype, start_column);
            }
            '<' => {
                let ttype = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                self.add_token(ttype, start_column);
            }
            '>' => {
                let ttype = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                self.add_token(ttype, start_column);
            }
            '/' => {
                if self.match_char('/') {
                    // Comment runs to end of line
                    while !self.at_end() && self.peek() != '\n' {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenType::Slash, start_column);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            '"' => self.string(start_column)?,
            _ if c.is_ascii_digit() => self.number(start_column),
            _ if is_identifier_start(c) => self.identifier(start_column),
            _ => {
                return Err(LexerError {
                    message: format!("Unexpected character: '{}'", c),
                    line: self.line,
                    column: start_column,
                    file: self.filename.clone(),
                });
            }
        }
        Ok(())
    }

    fn string(&mut self, start_column: usize) -> Result<(), LexerError> {
        let start_line = self.line;
        while !self.at_end() && self.peek() != '"' {
            if self.peek() == '\n' {
                self.line += 1;
                self.column = 1;
            }
            self.advance();
        }

        if self.at_end() {
            return Err(LexerError {
                message: "Unterminated string".to_string(),
                line: start_line,
                column: start_column,
                file: self.filename.clone(),
            });
        }

        // Closing quote
        self.advance();

        let value: String = self.source[self.start + 1..self.pos - 1].iter().collect();
        self.tokens.push(Token::new(
            TokenType::StringLit,
            &value,
            start_line,
            start_column,
        ));
        Ok(())
    }

    fn number(&mut self, start_column: usize) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_ahead(1).map_or(false, |c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let lexeme: String = self.source[self.start..self.pos].iter().collect();
        let ttype = if is_float {
            TokenType::Float
        } else {
            TokenType::Integer
        };
        self.tokens
            .push(Token::new(ttype, &lexeme, self.line, start_column));
    }

    fn identifier(&mut self, start_column: usize) {
        while is_identifier_char(self.peek()) {
            self.advance();
        }

        let lexeme: String = self.source[self.start..self.pos].iter().collect();
        let ttype = keyword_type(&lexeme).unwrap_or(TokenType::Identifier);
        self.tokens
            .push(Token::new(ttype, &lexeme, self.line, start_column));
    }

    // ── Cursor helpers ──────────────────────────────────────────────────

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.pos];
        self.pos += 1;
        self.column += 1;
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.at_end() || self.source[self.pos] != expected {
            return false;
        }
        self.pos += 1;
        self.column += 1;
        true
    }

    fn peek(&self) -> char {
        if self.at_end() {
            '\0'
        } else {
            self.source[self.pos]
        }
    }

    fn peek_ahead(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    fn add_token(&mut self, ttype: TokenType, column: usize) {
        let lexeme: String = self.source[self.start..self.pos].iter().collect();
        self.tokens
            .push(Token::new(ttype, &lexeme, self.line, column));
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
