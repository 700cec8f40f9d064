pub mod ast;
mod annotation;
mod expression;
mod text;

pub use annotation::is_bare_target;
pub use text::{reconstruct_text, BadCharCode};

use tracing::debug;

use crate::config::ParseOptions;
use crate::errors::{find_similar_keyword, Diagnostic, URQ_KEYWORDS};
use crate::lexer::{Token, TokenInfo};
use ast::*;

pub struct Parser {
    tokens: Vec<TokenInfo>,
    pos: usize,
    options: ParseOptions,
    // How many link/button actions enclose this parse
    depth: usize,
    // Set when a construct must stop the whole parse
    fatal: Option<Diagnostic>,
    pub errors: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(tokens: Vec<TokenInfo>) -> Self {
        Parser {
            tokens,
            pos: 0,
            options: ParseOptions::default(),
            depth: 0,
            fatal: None,
            errors: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub(crate) fn at_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).map(|t| &t.token).unwrap_or(&Token::EOF)
    }

    fn current_info(&self) -> Option<&TokenInfo> {
        self.tokens.get(self.pos)
    }

    fn peek(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).map(|t| &t.token).unwrap_or(&Token::EOF)
    }

    fn advance(&mut self) -> Token {
        let tok = self.current().clone();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &Token) -> bool {
        if self.current() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn position(&self) -> (usize, usize) {
        match self.current_info().or_else(|| self.tokens.last()) {
            Some(info) => (info.line, info.column),
            None => (1, 1),
        }
    }

    /// Column where the payload text of the current token begins.
    fn payload_column(&self) -> usize {
        match self.current_info() {
            Some(info) => {
                let payload_len = info.token.payload().map(|p| p.chars().count()).unwrap_or(0);
                info.column + info.lexeme.chars().count().saturating_sub(payload_len)
            }
            None => self.position().1,
        }
    }

    fn err(&self, message: &str) -> Diagnostic {
        let (line, column) = self.position();
        Diagnostic::syntax(message, line, column).with_found(&self.current().describe())
    }

    fn err_expected(&self, expected: &str) -> Diagnostic {
        let found = self.current().describe();
        let (line, column) = self.position();
        Diagnostic::syntax(&format!("expected {}, found {}", expected, found), line, column)
            .with_found(&found)
            .with_expected(expected)
    }

    /// Parse the whole token stream.
    ///
    /// Local errors are collected in `self.errors` and parsing carries on at the next
    /// statement. `Err` is returned only for a fatal construct, such as an undecodable
    /// character code under the abort policy.
    pub fn parse(&mut self) -> Result<Program, Diagnostic> {
        debug!(tokens = self.tokens.len(), depth = self.depth, "parsing");
        let mut groups = Vec::new();

        loop {
            while *self.current() == Token::Newline {
                self.advance();
            }
            if *self.current() == Token::EOF {
                break;
            }

            let (line, _) = self.position();
            let statements = self.parse_line()?;
            if !statements.is_empty() {
                groups.push(StatementGroup::new(statements, line));
            }
        }

        debug!(groups = groups.len(), errors = self.errors.len(), depth = self.depth, "parsed");
        Ok(Program::new(groups))
    }

    /// One top-level logical line. A broken statement is reported and skipped up to
    /// the next `&`, so the rest of the line still parses. A broken `if` takes the
    /// rest of the line with it, since its branches run to the end of the line.
    fn parse_line(&mut self) -> Result<Vec<Statement>, Diagnostic> {
        let mut statements = Vec::new();

        loop {
            let conditional = *self.current() == Token::If;
            let failed = match self.parse_statement() {
                Ok(stmt) => {
                    statements.push(stmt);
                    false
                }
                Err(e) => {
                    if let Some(fatal) = self.fatal.take() {
                        return Err(fatal);
                    }
                    self.errors.push(e);
                    true
                }
            };

            if failed && conditional {
                self.skip_line();
                break;
            }

            if !matches!(self.current(), Token::Ampersand | Token::Newline | Token::EOF) {
                if !failed {
                    let e = self.err_expected("`&` or end of line");
                    self.errors.push(e);
                }
                self.synchronize();
            }

            if *self.current() == Token::Ampersand {
                self.advance();
                if matches!(self.current(), Token::Newline | Token::EOF) {
                    break;
                }
                continue;
            }
            break;
        }

        Ok(statements)
    }

    fn synchronize(&mut self) {
        while !matches!(self.current(), Token::Ampersand | Token::Newline | Token::EOF) {
            self.advance();
        }
    }

    fn skip_line(&mut self) {
        while !matches!(self.current(), Token::Newline | Token::EOF) {
            self.advance();
        }
    }

    /// Statements joined by `&`, as used for `then`/`else` branches.
    fn parse_group(&mut self, line: usize) -> Result<StatementGroup, Diagnostic> {
        let mut statements = vec![self.parse_statement()?];
        while *self.current() == Token::Ampersand
            && !matches!(self.peek(1), Token::Newline | Token::EOF)
        {
            self.advance();
            statements.push(self.parse_statement()?);
        }
        Ok(StatementGroup::new(statements, line))
    }

    fn parse_statement(&mut self) -> Result<Statement, Diagnostic> {
        let (line, column) = self.position();
        let payload_column = self.payload_column();

        match self.current().clone() {
            Token::Identifier(name) => self.parse_assignment(name),
            Token::If => self.parse_if(line),
            Token::Print { text, newline } => {
                self.advance();
                let segments = self.decompose_text(&text, line, payload_column)?;
                Ok(Statement::Print { segments, newline })
            }
            Token::Goto(target) => {
                self.advance();
                let target = required(&target, "`goto` needs a location name", line, column)?;
                Ok(Statement::Goto { target })
            }
            Token::Proc(target) => {
                self.advance();
                let target = required(&target, "`proc` needs a location name", line, column)?;
                Ok(Statement::Call { target })
            }
            Token::Label(name) => {
                self.advance();
                let name = required(&name, "label has no name", line, column)?;
                Ok(Statement::Label { name })
            }
            Token::Button(payload) => {
                self.advance();
                self.parse_button(&payload, line, payload_column)
            }
            Token::Save(slot) => {
                self.advance();
                Ok(Statement::Save { slot: optional(&slot) })
            }
            Token::InvAdd(payload) => {
                self.advance();
                self.parse_inventory_change(&payload, false, line, payload_column)
            }
            Token::InvRemove(payload) => {
                self.advance();
                self.parse_inventory_change(&payload, true, line, payload_column)
            }
            Token::InvKill(item) => {
                self.advance();
                Ok(Statement::Inventory(InventoryOp::Clear { item: optional(&item) }))
            }
            Token::Media { kind, source } => {
                self.advance();
                let source = strip_quotes(source.trim());
                let source = required(source, "media statement needs a file name", line, column)?;
                Ok(Statement::Multimedia { kind, source })
            }
            Token::End => {
                self.advance();
                Ok(Statement::End)
            }
            Token::Quit => {
                self.advance();
                Ok(Statement::Quit)
            }
            Token::ClearScreen => {
                self.advance();
                Ok(Statement::ClearScreen)
            }
            Token::ForgetProcs => {
                self.advance();
                Ok(Statement::DropCallStack)
            }
            Token::Input => {
                self.advance();
                Ok(Statement::Input { variable: self.optional_identifier() })
            }
            Token::AnyKey => {
                self.advance();
                Ok(Statement::AnyKey { variable: self.optional_identifier() })
            }
            Token::Pause => {
                self.advance();
                let duration = self.parse_number_expr()?;
                Ok(Statement::Pause { duration })
            }
            _ => Err(self.err_expected("a statement")),
        }
    }

    fn optional_identifier(&mut self) -> Option<String> {
        match self.current().clone() {
            Token::Identifier(name) => {
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    fn parse_assignment(&mut self, name: String) -> Result<Statement, Diagnostic> {
        self.advance();

        if !self.expect(&Token::Equal) {
            let mut e = self.err_expected("`=` after variable name");
            if let Some(suggestion) = find_similar_keyword(&name, URQ_KEYWORDS) {
                e = e.with_suggestion(&suggestion);
            }
            return Err(e);
        }

        let value = self.parse_value()?;
        Ok(Statement::Assign { name, value })
    }

    fn parse_if(&mut self, line: usize) -> Result<Statement, Diagnostic> {
        self.advance();

        let condition = self.parse_bool_expr()?;
        if !self.expect(&Token::Then) {
            return Err(self.err_expected("`then`"));
        }

        let then_group = self.parse_group(line)?;
        let else_group = if self.expect(&Token::Else) {
            Some(self.parse_group(line)?)
        } else {
            None
        };

        Ok(Statement::If { condition, then_group, else_group })
    }
}

fn required(text: &str, message: &str, line: usize, column: usize) -> Result<String, Diagnostic> {
    let text = text.trim();
    if text.is_empty() {
        Err(Diagnostic::syntax(message, line, column))
    } else {
        Ok(text.to_string())
    }
}

fn optional(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn strip_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

// ========================================================================
// Unit Tests for Statements
// ========================================================================
