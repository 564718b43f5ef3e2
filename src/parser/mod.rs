use std::fmt;
use std::rc::Rc;

use crate::ast::*;
use crate::lexer::tokens::{Token, TokenType};

#[derive(Debug)]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub file: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}: {}", self.file, self.line, self.column, self.message)
    }
}

impl std::error::Error for ParseError {}

const MAX_PARSER_DEPTH: usize = 256;
const MAX_ARGUMENTS: usize = 255;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    filename: String,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, filename: &str) -> Self {
        Self {
            tokens,
            pos: 0,
            filename: filename.to_string(),
            depth: 0,
        }
    }

    // ── Public API ──────────────────────────────────────────────────────

    pub fn parse(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_semicolons();
            if self.at_end() {
                break;
            }
            statements.push(self.declaration()?);
        }
        Ok(statements)
    }

    // ── Statements ──────────────────────────────────────────────────────

    fn declaration(&mut self) -> Result<Stmt, ParseError> {
        if self.match_token(TokenType::Function) {
            let decl = self.function_declaration("function")?;
            return Ok(Stmt::Function { decl });
        }
        if self.match_token(TokenType::Class) {
            return self.class_declaration();
        }
        self.statement()
    }

    fn function_declaration(&mut self, kind: &str) -> Result<Rc<FunctionDecl>, ParseError> {
        let name = self.consume(
            TokenType::Identifier,
            &format!("Expected {} name", kind),
        )?;
        let fn_name = name.lexeme.clone();
        let line = name.line;

        self.consume(TokenType::LParen, &format!("Expected '(' after {} name", kind))?;
        let mut params = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    return Err(self.error_here(&format!(
                        "Cannot have more than {} parameters",
                        MAX_ARGUMENTS
                    )));
                }
                let param = self.consume(TokenType::Identifier, "Expected parameter name")?;
                params.push(param.lexeme.clone());
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RParen, "Expected ')' after parameters")?;

        self.consume(
            TokenType::LBrace,
            &format!("Expected '{{' before {} body", kind),
        )?;
        let body = self.block_statements()?;

        Ok(Rc::new(FunctionDecl {
            name: fn_name,
            params,
            body,
            line,
        }))
    }

    fn class_declaration(&mut self) -> Result<Stmt, ParseError> {
        let name = self.consume(TokenType::Identifier, "Expected class name")?;
        let class_name = name.lexeme.clone();
        let line = name.line;

        let superclass = if self.match_token(TokenType::Less) {
            let sup = self.consume(TokenType::Identifier, "Expected superclass name")?;
            Some(sup.lexeme.clone())
        } else {
            None
        };

        self.consume(TokenType::LBrace, "Expected '{' before class body")?;
        let mut methods = Vec::new();
        while !self.check(TokenType::RBrace) && !self.at_end() {
            methods.push(self.function_declaration("method")?);
        }
        self.consume(TokenType::RBrace, "Expected '}' after class body")?;

        Ok(Stmt::Class {
            name: class_name,
            superclass,
            methods,
            line,
        })
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        if self.match_token(TokenType::If) {
            return self.if_statement();
        }
        if self.match_token(TokenType::Return) {
            return self.return_statement();
        }
        if self.match_token(TokenType::While) {
            return self.while_statement();
        }
        if self.match_token(TokenType::For) {
            return self.for_statement();
        }
        if self.match_token(TokenType::LBrace) {
            let statements = self.block_statements()?;
            return Ok(Stmt::Block { statements });
        }
        if self.match_token(TokenType::Print) {
            return self.print_statement();
        }
        if self.match_token(TokenType::Input) {
            return self.input_statement();
        }
        self.expression_statement()
    }

    fn if_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.previous().line;
        self.consume(TokenType::LParen, "Expected '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RParen, "Expected ')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(TokenType::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            line,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.previous().line;
        let value = if self.check(TokenType::RBrace)
            || self.check(TokenType::Semicolon)
            || self.at_end()
        {
            None
        } else {
            Some(self.expression()?)
        };
        self.match_token(TokenType::Semicolon);
        Ok(Stmt::Return { value, line })
    }

    fn while_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.previous().line;
        self.consume(TokenType::LParen, "Expected '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(TokenType::RParen, "Expected ')' after while condition")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While {
            condition,
            body,
            line,
        })
    }

    fn for_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.previous().line;
        self.consume(TokenType::LParen, "Expected '(' after 'for'")?;
        let variable = self
            .consume(TokenType::Identifier, "Expected loop variable name")?
            .lexeme
            .clone();
        self.consume(TokenType::In, "Expected 'in' after loop variable")?;
        let iterable = self.expression()?;
        self.consume(TokenType::RParen, "Expected ')' after for loop header")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::ForEach {
            variable,
            iterable,
            body,
            line,
        })
    }

    fn block_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = Vec::new();
        loop {
            self.skip_semicolons();
            if self.check(TokenType::RBrace) || self.at_end() {
                break;
            }
            statements.push(self.declaration()?);
        }
        self.consume(TokenType::RBrace, "Expected '}' after block")?;
        Ok(statements)
    }

    fn print_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.previous().line;
        let expr = self.expression()?;
        self.match_token(TokenType::Semicolon);
        Ok(Stmt::Print { expr, line })
    }

    fn input_statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.previous().line;
        let prompt = if self.match_token(TokenType::LParen) {
            let p = self.expression()?;
            self.consume(TokenType::RParen, "Expected ')' after input prompt")?;
            Some(p)
        } else {
            None
        };
        let variable = self
            .consume(TokenType::Identifier, "Expected variable name after 'input'")?
            .lexeme
            .clone();
        self.match_token(TokenType::Semicolon);
        Ok(Stmt::Input {
            variable,
            prompt,
            line,
        })
    }

    fn expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.expression()?;
        self.match_token(TokenType::Semicolon);
        Ok(Stmt::Expression { expr })
    }

    // ── Expressions ─────────────────────────────────────────────────────

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.enter_depth()?;
        let result = self.assignment();
        self.exit_depth();
        result
    }

    fn assignment(&mut self) -> Result<Expr, ParseError> {
        let expr = self.logical_or()?;

        if self.match_token(TokenType::Assign) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            return match expr {
                Expr::Variable { name, line } => Ok(Expr::Assign { name, value, line }),
                Expr::Get { object, name, line } => Ok(Expr::Set {
                    object,
                    name,
                    value,
                    line,
                }),
                Expr::Index { object, index, line } => Ok(Expr::IndexAssign {
                    object,
                    index,
                    value,
                    line,
                }),
                _ => Err(ParseError {
                    message: "Invalid assignment target".to_string(),
                    line: equals.line,
                    column: equals.column,
                    file: self.filename.clone(),
                }),
            };
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.logical_and()?;
        while self.match_token(TokenType::Or) {
            let line = self.previous().line;
            let right = self.logical_and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op: "or".to_string(),
                right: Box::new(right),
                line,
            };
        }
        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.equality()?;
        while self.match_token(TokenType::And) {
            let line = self.previous().line;
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op: "and".to_string(),
                right: Box::new(right),
                line,
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.comparison()?;
        while self.match_any(&[TokenType::EqualEqual, TokenType::BangEqual]) {
            let op_token = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op: op_token.lexeme,
                right: Box::new(right),
                line: op_token.line,
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.additive()?;
        while self.match_any(&[
            TokenType::Less,
            TokenType::LessEqual,
            TokenType::Greater,
            TokenType::GreaterEqual,
        ]) {
            let op_token = self.previous().clone();
            let right = self.additive()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op: op_token.lexeme,
                right: Box::new(right),
                line: op_token.line,
            };
        }
        Ok(expr)
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.multiplicative()?;
        while self.match_any(&[TokenType::Plus, TokenType::Minus]) {
            let op_token = self.previous().clone();
            let right = self.multiplicative()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op: op_token.lexeme,
                right: Box::new(right),
                line: op_token.line,
            };
        }
        Ok(expr)
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.exponent()?;
        while self.match_any(&[TokenType::Star, TokenType::Slash, TokenType::Percent]) {
            let op_token = self.previous().clone();
            let right = self.exponent()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op: op_token.lexeme,
                right: Box::new(right),
                line: op_token.line,
            };
        }
        Ok(expr)
    }

    // `^` is right-associative: 2 ^ 3 ^ 2 parses as 2 ^ (3 ^ 2)
    fn exponent(&mut self) -> Result<Expr, ParseError> {
        let expr = self.unary()?;
        if self.match_token(TokenType::Caret) {
            let op_token = self.previous().clone();
            self.enter_depth()?;
            let right = self.exponent();
            self.exit_depth();
            return Ok(Expr::Binary {
                left: Box::new(expr),
                op: op_token.lexeme,
                right: Box::new(right?),
                line: op_token.line,
            });
        }
        Ok(expr)
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if self.match_any(&[TokenType::Bang, TokenType::Minus]) {
            let op_token = self.previous().clone();
            self.enter_depth()?;
            let operand = self.unary();
            self.exit_depth();
            return Ok(Expr::Unary {
                op: op_token.lexeme,
                operand: Box::new(operand?),
                line: op_token.line,
            });
        }
        self.call()
    }

    fn call(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(TokenType::LParen) {
                let line = self.previous().line;
                let arguments = self.argument_list()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    arguments,
                    line,
                };
            } else if self.match_token(TokenType::Dot) {
                let name = self.consume(TokenType::Identifier, "Expected property name after '.'")?;
                let prop = name.lexeme.clone();
                let line = name.line;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name: prop,
                    line,
                };
            } else if self.match_token(TokenType::LBracket) {
                let line = self.previous().line;
                let index = self.expression()?;
                self.consume(TokenType::RBracket, "Expected ']' after index")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    line,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn argument_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut arguments = Vec::new();
        if !self.check(TokenType::RParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    return Err(self.error_here(&format!(
                        "Cannot have more than {} arguments",
                        MAX_ARGUMENTS
                    )));
                }
                arguments.push(self.expression()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RParen, "Expected ')' after arguments")?;
        Ok(arguments)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();

        match token.token_type {
            TokenType::True => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Bool(true),
                    line: token.line,
                })
            }
            TokenType::False => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Bool(false),
                    line: token.line,
                })
            }
            TokenType::Integer => {
                self.advance();
                let value = token.lexeme.parse::<i64>().map_err(|_| ParseError {
                    message: format!("Integer literal out of range: {}", token.lexeme),
                    line: token.line,
                    column: token.column,
                    file: self.filename.clone(),
                })?;
                Ok(Expr::Literal {
                    value: Literal::Int(value),
                    line: token.line,
                })
            }
            TokenType::Float => {
                self.advance();
                let value = token.lexeme.parse::<f64>().map_err(|_| ParseError {
                    message: format!("Invalid float literal: {}", token.lexeme),
                    line: token.line,
                    column: token.column,
                    file: self.filename.clone(),
                })?;
                Ok(Expr::Literal {
                    value: Literal::Float(value),
                    line: token.line,
                })
            }
            TokenType::StringLit => {
                self.advance();
                Ok(Expr::Literal {
                    value: Literal::Str(token.lexeme),
                    line: token.line,
                })
            }
            TokenType::This => {
                self.advance();
                Ok(Expr::This { line: token.line })
            }
            TokenType::Super => {
                self.advance();
                self.consume(TokenType::Dot, "Expected '.' after 'super'")?;
                let method = self
                    .consume(TokenType::Identifier, "Expected superclass method name")?
                    .lexeme
                    .clone();
                Ok(Expr::Super {
                    method,
                    line: token.line,
                })
            }
            TokenType::New => {
                self.advance();
                let class_name = self
                    .consume(TokenType::Identifier, "Expected class name after 'new'")?
                    .lexeme
                    .clone();
                self.consume(TokenType::LParen, "Expected '(' after class name")?;
                let arguments = self.argument_list()?;
                Ok(Expr::New {
                    class_name,
                    arguments,
                    line: token.line,
                })
            }
            TokenType::Identifier => {
                self.advance();
                Ok(Expr::Variable {
                    name: token.lexeme,
                    line: token.line,
                })
            }
            TokenType::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(TokenType::RBracket) {
                    loop {
                        elements.push(self.expression()?);
                        if !self.match_token(TokenType::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenType::RBracket, "Expected ']' after list elements")?;
                Ok(Expr::ListLiteral {
                    elements,
                    line: token.line,
                })
            }
            TokenType::LBrace => {
                self.advance();
                let mut entries = Vec::new();
                if !self.check(TokenType::RBrace) {
                    loop {
                        let key = self.expression()?;
                        self.consume(TokenType::Colon, "Expected ':' after map key")?;
                        let value = self.expression()?;
                        entries.push((key, value));
                        if !self.match_token(TokenType::Comma) {
                            break;
                        }
                    }
                }
                self.consume(TokenType::RBrace, "Expected '}' after map entries")?;
                Ok(Expr::MapLiteral {
                    entries,
                    line: token.line,
                })
            }
            TokenType::LParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RParen, "Expected ')' after expression")?;
                Ok(Expr::Grouping {
                    expr: Box::new(expr),
                })
            }
            _ => Err(self.error_here("Expected expression")),
        }
    }

    // ── Helpers ─────────────────────────────────────────────────────────

    fn enter_depth(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_PARSER_DEPTH {
            Err(self.error_here(&format!(
                "Maximum nesting depth ({}) exceeded — expression is too deeply nested",
                MAX_PARSER_DEPTH
            )))
        } else {
            Ok(())
        }
    }

    fn exit_depth(&mut self) {
        self.depth -= 1;
    }

    fn skip_semicolons(&mut self) {
        while self.match_token(TokenType::Semicolon) {}
    }

    fn match_token(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_any(&mut self, types: &[TokenType]) -> bool {
        for &ttype in types {
            if self.check(ttype) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn check(&self, ttype: TokenType) -> bool {
        self.current().token_type == ttype
    }

    fn at_end(&self) -> bool {
        self.current().token_type == TokenType::Eof
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos - 1]
    }

    fn advance(&mut self) -> &Token {
        if !self.at_end() {
            self.pos += 1;
        }
        self.previous()
    }

    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&Token, ParseError> {
        if self.check(ttype) {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    fn error_here(&self, message: &str) -> ParseError {
        let tok = self.current();
        let message = if tok.token_type == TokenType::Eof {
            format!("{} (at end of file)", message)
        } else {
            format!("{} (at '{}')", message, tok.lexeme)
        };
        ParseError {
            message,
            line: tok.line,
            column: tok.column,
            file: self.filename.clone(),
        }
    }
}
