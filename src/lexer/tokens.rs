use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    // Literals
    StringLit,
    Integer,
    Float,
    True,
    False,

    // Identifiers & punctuation
    Identifier,
    Dot,
    Comma,
    Colon,
    Semicolon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,

    // Comparison / equality / assignment
    Bang,
    BangEqual,
    Assign,
    EqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // Keywords
    And,
    Or,
    If,
    Else,
    While,
    For,
    In,
    Function,
    Return,
    Print,
    Input,
    Class,
    This,
    Super,
    New,

    Eof,
}

/// Look up a keyword string and return its TokenType, or None if it's a
/// plain identifier.
pub fn keyword_type(word: &str) -> Option<TokenType> {
    match word {
        "and" => Some(TokenType::And),
        "or" => Some(TokenType::Or),
        "if" => Some(TokenType::If),
        "else" => Some(TokenType::Else),
        "while" => Some(TokenType::While),
        "for" => Some(TokenType::For),
        "in" => Some(TokenType::In),
        "function" => Some(TokenType::Function),
        "return" => Some(TokenType::Return),
        "print" => Some(TokenType::Print),
        "input" => Some(TokenType::Input),
        "class" => Some(TokenType::Class),
        "this" => Some(TokenType::This),
        "super" => Some(TokenType::Super),
        "new" => Some(TokenType::New),
        "true" => Some(TokenType::True),
        "false" => Some(TokenType::False),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: &str, line: usize, column: usize) -> Self {
        Self {
            token_type,
            lexeme: lexeme.to_string(),
            line,
            column,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lexeme.is_empty() {
            write!(f, "{}:{}: {:?}", self.line, self.column, self.token_type)
        } else {
            write!(
                f,
                "{}:{}: {:?} '{}'",
                self.line, self.column, self.token_type, self.lexeme
            )
        }
    }
}
