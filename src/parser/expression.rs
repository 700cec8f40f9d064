use super::ast::*;
use super::Parser;
use crate::errors::Diagnostic;
use crate::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq)]
enum ValueKind {
    Bool,
    Number,
    Str,
}

impl Parser {
    /// Run `f`, rewinding to where it started if it fails.
    fn attempt<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, Diagnostic>) -> Option<T> {
        let saved = self.pos;
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.pos = saved;
                None
            }
        }
    }

    /// The right-hand side of an assignment. Its type is decided by the tokens up to
    /// the end of the statement: any logical or comparison token makes it a condition,
    /// otherwise a string literal makes it a string, otherwise it is a number.
    pub(crate) fn parse_value(&mut self) -> Result<Expr, Diagnostic> {
        match self.classify_value() {
            ValueKind::Bool => Ok(Expr::Bool(self.parse_bool_expr()?)),
            ValueKind::Str => Ok(Expr::Str(self.parse_string_expr()?)),
            ValueKind::Number => Ok(Expr::Number(self.parse_number_expr()?)),
        }
    }

    fn classify_value(&self) -> ValueKind {
        let mut kind = ValueKind::Number;
        for info in self.tokens.iter().skip(self.pos) {
            match info.token {
                Token::Ampersand | Token::Newline | Token::EOF | Token::Else | Token::Then => break,
                Token::And
                | Token::Or
                | Token::Xor
                | Token::Not
                | Token::True
                | Token::False
                | Token::Equal
                | Token::MaskEqual
                | Token::NotEqual
                | Token::Less
                | Token::LessEqual
                | Token::Greater
                | Token::GreaterEqual => return ValueKind::Bool,
                Token::Str(_) => kind = ValueKind::Str,
                _ => {}
            }
        }
        kind
    }

    // ---- Conditions ----

    pub(crate) fn parse_bool_expr(&mut self) -> Result<BoolExpr, Diagnostic> {
        let mut left = self.parse_bool_and()?;

        loop {
            let op = match self.current() {
                Token::Or => LogicalOperator::Or,
                Token::Xor => LogicalOperator::Xor,
                _ => break,
            };
            self.advance();
            let right = self.parse_bool_and()?;
            left = BoolExpr::Logical { op, left: Box::new(left), right: Box::new(right) };
        }

        Ok(left)
    }

    fn parse_bool_and(&mut self) -> Result<BoolExpr, Diagnostic> {
        let mut left = self.parse_bool_term()?;

        while *self.current() == Token::And {
            self.advance();
            let right = self.parse_bool_term()?;
            left = BoolExpr::Logical {
                op: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_bool_term(&mut self) -> Result<BoolExpr, Diagnostic> {
        if *self.current() == Token::Not {
            self.advance();
            return Ok(BoolExpr::Not(Box::new(self.parse_bool_term()?)));
        }

        if let Some(cmp) = self.attempt(|p| p.parse_string_comparison()) {
            return Ok(cmp);
        }
        if let Some(cmp) = self.attempt(|p| p.parse_number_comparison()) {
            return Ok(cmp);
        }

        let left = self.parse_bool_primary()?;
        let op = match self.current() {
            Token::Equal => CompareOperator::Equal,
            Token::NotEqual => CompareOperator::NotEqual,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_bool_primary()?;
        Ok(BoolExpr::CompareBools { op, left: Box::new(left), right: Box::new(right) })
    }

    fn parse_bool_primary(&mut self) -> Result<BoolExpr, Diagnostic> {
        match self.current().clone() {
            Token::True => {
                self.advance();
                Ok(BoolExpr::Const(true))
            }
            Token::False => {
                self.advance();
                Ok(BoolExpr::Const(false))
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(BoolExpr::Var(name))
            }
            Token::Not => {
                self.advance();
                Ok(BoolExpr::Not(Box::new(self.parse_bool_primary()?)))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_bool_expr()?;
                if !self.expect(&Token::RParen) {
                    return Err(self.err_expected("`)`"));
                }
                Ok(inner)
            }
            _ => Err(self.err_expected("a condition")),
        }
    }

    /// Only accepted when it is unambiguously about text: `==`, or a quoted literal
    /// on either side.
    fn parse_string_comparison(&mut self) -> Result<BoolExpr, Diagnostic> {
        let left = self.parse_string_expr()?;
        let op = match self.current() {
            Token::Equal => CompareOperator::Equal,
            Token::MaskEqual => CompareOperator::MaskEqual,
            Token::NotEqual => CompareOperator::NotEqual,
            _ => return Err(self.err_expected("a string comparison")),
        };
        self.advance();
        let right = self.parse_string_expr()?;

        if op != CompareOperator::MaskEqual && !has_literal(&left) && !has_literal(&right) {
            return Err(self.err("comparison has no string operand"));
        }
        Ok(BoolExpr::CompareStrings { op, left, right })
    }

    fn parse_number_comparison(&mut self) -> Result<BoolExpr, Diagnostic> {
        let left = self.parse_number_expr()?;
        let op = match self.current() {
            Token::Equal => CompareOperator::Equal,
            Token::NotEqual => CompareOperator::NotEqual,
            Token::Less => CompareOperator::Less,
            Token::LessEqual => CompareOperator::LessEqual,
            Token::Greater => CompareOperator::Greater,
            Token::GreaterEqual => CompareOperator::GreaterEqual,
            _ => return Err(self.err_expected("a comparison operator")),
        };
        self.advance();
        let right = self.parse_number_expr()?;
        Ok(BoolExpr::CompareNumbers { op, left, right })
    }

    // ---- Numbers ----

    pub(crate) fn parse_number_expr(&mut self) -> Result<NumberExpr, Diagnostic> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current() {
                Token::Plus => ArithmeticOperator::Add,
                Token::Minus => ArithmeticOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = NumberExpr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<NumberExpr, Diagnostic> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current() {
                Token::Star => ArithmeticOperator::Multiply,
                Token::Slash => ArithmeticOperator::Divide,
                Token::DoubleSlash => ArithmeticOperator::IntDivide,
                Token::Percent => ArithmeticOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = NumberExpr::Binary { op, left: Box::new(left), right: Box::new(right) };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<NumberExpr, Diagnostic> {
        match self.current() {
            Token::Minus => {
                self.advance();
                Ok(NumberExpr::Negate(Box::new(self.parse_unary()?)))
            }
            Token::Plus => {
                self.advance();
                self.parse_unary()
            }
            _ => self.parse_number_primary(),
        }
    }

    fn parse_number_primary(&mut self) -> Result<NumberExpr, Diagnostic> {
        match self.current().clone() {
            Token::Number(n) => {
                self.advance();
                Ok(NumberExpr::Const(n))
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(NumberExpr::Var(name))
            }
            Token::LParen => {
                self.advance();
                let inner = self.parse_number_expr()?;
                if !self.expect(&Token::RParen) {
                    return Err(self.err_expected("`)`"));
                }
                Ok(inner)
            }
            _ => Err(self.err_expected("a number")),
        }
    }

    // ---- Strings ----

    pub(crate) fn parse_string_expr(&mut self) -> Result<StringExpr, Diagnostic> {
        let mut left = self.parse_string_primary()?;

        while *self.current() == Token::Plus {
            self.advance();
            let right = self.parse_string_primary()?;
            left = StringExpr::Concat { left: Box::new(left), right: Box::new(right) };
        }

        Ok(left)
    }

    fn parse_string_primary(&mut self) -> Result<StringExpr, Diagnostic> {
        match self.current().clone() {
            Token::Str(s) => {
                self.advance();
                Ok(StringExpr::Const(s))
            }
            Token::Identifier(name) => {
                self.advance();
                Ok(StringExpr::Var(name))
            }
            _ => Err(self.err_expected("a string")),
        }
    }
}

fn has_literal(expr: &StringExpr) -> bool {
    match expr {
        StringExpr::Const(_) => true,
        StringExpr::Var(_) => false,
        StringExpr::Concat { left, right } => has_literal(left) || has_literal(right),
    }
}

// ========================================================================
// Unit Tests for Expressions
// ========================================================================
