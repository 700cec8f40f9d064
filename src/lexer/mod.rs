use crate::errors::Diagnostic;
use crate::parser::ast::MediaKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Control Flow
    If, Then, Else,

    // Boolean
    And, Or, Xor, Not, True, False,

    // Fixed-shape statements
    End, Input, AnyKey, ForgetProcs, Quit, ClearScreen, Pause,

    // Statements that swallow the rest of the logical line
    Print { text: String, newline: bool },
    Button(String),
    Goto(String),
    Proc(String),
    Save(String),
    Label(String),
    InvAdd(String),
    InvRemove(String),
    InvKill(String),
    Media { kind: MediaKind, source: String },

    // Literals
    Number(f64),
    Str(String),

    // Identifiers
    Identifier(String),

    // Arithmetic
    Plus, Minus, Star, Slash, DoubleSlash, Percent,

    // Comparisons
    Equal, MaskEqual, NotEqual, Less, LessEqual, Greater, GreaterEqual,

    // Punctuation
    LParen, RParen, Comma, Ampersand,

    // Special
    Newline, EOF,
}

impl Token {
    /// The verbatim text carried by a payload token.
    pub fn payload(&self) -> Option<&str> {
        match self {
            Token::Print { text, .. }
            | Token::Button(text)
            | Token::Goto(text)
            | Token::Proc(text)
            | Token::Save(text)
            | Token::Label(text)
            | Token::InvAdd(text)
            | Token::InvRemove(text)
            | Token::InvKill(text)
            | Token::Media { source: text, .. } => Some(text),
            _ => None,
        }
    }

    /// Human-readable form for error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Identifier(name) => format!("identifier `{}`", name),
            Token::Number(n) => format!("number `{}`", n),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::Newline => "end of line".to_string(),
            Token::EOF => "end of input".to_string(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Token::If => "if",
            Token::Then => "then",
            Token::Else => "else",
            Token::And => "and",
            Token::Or => "or",
            Token::Xor => "xor",
            Token::Not => "not",
            Token::True => "true",
            Token::False => "false",
            Token::End => "end",
            Token::Input => "input",
            Token::AnyKey => "anykey",
            Token::ForgetProcs => "forget_procs",
            Token::Quit => "quit",
            Token::ClearScreen => "cls",
            Token::Pause => "pause",
            Token::Print { newline: false, .. } => "p",
            Token::Print { newline: true, .. } => "pln",
            Token::Button(_) => "btn",
            Token::Goto(_) => "goto",
            Token::Proc(_) => "proc",
            Token::Save(_) => "save",
            Token::Label(_) => ":",
            Token::InvAdd(_) => "inv+",
            Token::InvRemove(_) => "inv-",
            Token::InvKill(_) => "invkill",
            Token::Media { kind: MediaKind::Play, .. } => "play",
            Token::Media { kind: MediaKind::Music, .. } => "music",
            Token::Media { kind: MediaKind::Image, .. } => "image",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::Percent => "%",
            Token::Equal => "=",
            Token::MaskEqual => "==",
            Token::NotEqual => "!=",
            Token::Less => "<",
            Token::LessEqual => "<=",
            Token::Greater => ">",
            Token::GreaterEqual => ">=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::Comma => ",",
            Token::Ampersand => "&",
            Token::Number(_) | Token::Str(_) | Token::Identifier(_) => "literal",
            Token::Newline => "newline",
            Token::EOF => "EOF",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub token: Token,
    pub lexeme: String,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PayloadEnd {
    LineEnd,
    Ampersand,
    Else,
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Index just past the `]]` closing a `[[` at `open`, if it closes on the same line.
/// At least one character must sit between the brackets.
pub(crate) fn find_link_end(chars: &[char], open: usize) -> Option<usize> {
    if chars.get(open) != Some(&'[') || chars.get(open + 1) != Some(&'[') {
        return None;
    }
    if matches!(chars.get(open + 2), None | Some('\n')) {
        return None;
    }
    let mut j = open + 3;
    loop {
        match chars.get(j)? {
            '\n' => return None,
            ']' if chars.get(j + 1) == Some(&']') => return Some(j + 2),
            _ => j += 1,
        }
    }
}

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    at_line_start: bool,
    // Next word begins a statement: line start, or after `&`, `then`, `else`
    statement_start: bool,
    // `if`s on the current line still waiting for their `else`
    open_ifs: usize,
    payload_start: Option<usize>,
    pub errors: Vec<Diagnostic>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
            statement_start: true,
            open_ifs: 0,
            payload_start: None,
            errors: Vec::new(),
        }
    }

    /// Report positions as if the input started at `line`:`column` of a larger source.
    pub fn starting_at(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied();
        if let Some(c) = ch {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn advance_to(&mut self, end: usize) {
        while self.pos < end {
            self.advance();
        }
    }

    fn slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip to the end of the line, leaving the newline itself in place.
    fn skip_line(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn read_newlines(&mut self) {
        while let Some(ch) = self.peek() {
            if matches!(ch, '\n' | ' ' | '\t' | '\r') {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Skip a `/* ... */` comment. Returns true if it spanned a line break.
    fn skip_block_comment(&mut self, line: usize, column: usize) -> bool {
        let start_line = self.line;
        self.advance();
        self.advance();
        loop {
            match self.advance() {
                Some('*') if self.peek() == Some('/') => {
                    self.advance();
                    break;
                }
                Some(_) => {}
                None => {
                    self.errors.push(Diagnostic::lex("unterminated block comment", line, column));
                    break;
                }
            }
        }
        self.line != start_line
    }

    fn read_string(&mut self, line: usize, column: usize) -> Option<String> {
        let close = self.chars[self.pos + 1..].iter().position(|&c| c == '"');
        match close {
            Some(offset) => {
                let end = self.pos + 1 + offset;
                let value = self.slice(self.pos + 1, end);
                self.advance_to(end + 1);
                Some(value)
            }
            None => {
                self.errors.push(
                    Diagnostic::lex("unterminated string literal", line, column).with_found("\""),
                );
                self.advance();
                None
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let digits_at = if matches!(self.peek_at(1), Some('+' | '-')) { 2 } else { 1 };
            if matches!(self.peek_at(digits_at), Some(c) if c.is_ascii_digit()) {
                for _ in 0..digits_at {
                    self.advance();
                }
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }
        let text = self.slice(start, self.pos);
        Token::Number(text.parse().unwrap_or(0.0))
    }

    fn read_word(&mut self) -> Option<Token> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if is_word_char(ch) {
                self.advance();
            } else {
                break;
            }
        }
        let word = self.slice(start, self.pos);

        let token = match word.to_lowercase().as_str() {
            "if" => {
                self.open_ifs += 1;
                Token::If
            }
            "then" => Token::Then,
            "else" => {
                self.open_ifs = self.open_ifs.saturating_sub(1);
                Token::Else
            }
            "and" => Token::And,
            "or" => Token::Or,
            "xor" => Token::Xor,
            "not" => Token::Not,
            "true" => Token::True,
            "false" => Token::False,
            "end" => Token::End,
            "input" => Token::Input,
            "anykey" => Token::AnyKey,
            "forget_proc" | "forget_procs" => Token::ForgetProcs,
            "quit" => Token::Quit,
            "cls" => Token::ClearScreen,
            "pause" => Token::Pause,
            "p" | "print" => Token::Print { text: self.read_payload(true), newline: false },
            "pln" | "println" => Token::Print { text: self.read_payload(true), newline: true },
            "btn" => Token::Button(self.read_button_payload()),
            "goto" => Token::Goto(self.read_payload(true)),
            "proc" => Token::Proc(self.read_payload(true)),
            "save" => Token::Save(self.read_payload(true)),
            "play" => Token::Media { kind: MediaKind::Play, source: self.read_payload(true) },
            "music" => Token::Media { kind: MediaKind::Music, source: self.read_payload(true) },
            "image" => Token::Media { kind: MediaKind::Image, source: self.read_payload(true) },
            "inv" if self.statement_start && self.peek() == Some('+') => {
                self.advance();
                Token::InvAdd(self.read_payload(true))
            }
            "inv" if self.statement_start && self.peek() == Some('-') => {
                self.advance();
                Token::InvRemove(self.read_payload(true))
            }
            "invkill" => Token::InvKill(self.read_payload(true)),
            "instr" if self.at_line_start => {
                self.skip_line();
                return None;
            }
            _ => Token::Identifier(word),
        };
        Some(token)
    }

    fn is_else_at(&self, i: usize, from: usize) -> bool {
        let matches_word = "else"
            .chars()
            .enumerate()
            .all(|(k, e)| matches!(self.chars.get(i + k), Some(c) if c.to_ascii_lowercase() == e));
        matches_word
            && (i == from || matches!(self.chars[i - 1], ' ' | '\t'))
            && !matches!(self.chars.get(i + 4), Some(&c) if is_word_char(c))
    }

    fn scan_payload(&self, from: usize) -> (usize, PayloadEnd) {
        let mut i = from;
        loop {
            match self.chars.get(i) {
                None | Some('\n') => return (i, PayloadEnd::LineEnd),
                Some('&') => return (i, PayloadEnd::Ampersand),
                Some('[') => {
                    if let Some(end) = find_link_end(&self.chars, i) {
                        i = end;
                        continue;
                    }
                }
                Some(_) if self.open_ifs > 0 && self.is_else_at(i, from) => {
                    return (i, PayloadEnd::Else);
                }
                _ => {}
            }
            i += 1;
        }
    }

    /// First comma outside a link span on this line; `&` does not stop the search.
    fn find_field_comma(&self, from: usize) -> Option<usize> {
        let mut i = from;
        loop {
            match self.chars.get(i) {
                None | Some('\n') => return None,
                Some(',') => return Some(i),
                Some('[') => {
                    if let Some(end) = find_link_end(&self.chars, i) {
                        i = end;
                        continue;
                    }
                }
                Some(_) if self.open_ifs > 0 && self.is_else_at(i, from) => return None,
                _ => {}
            }
            i += 1;
        }
    }

    fn skip_separator(&mut self) {
        if matches!(self.peek(), Some(' ' | '\t')) {
            self.advance();
        }
    }

    fn finish_payload(&mut self, from: usize, end: usize, how: PayloadEnd) -> String {
        let mut text = self.slice(from, end);
        match how {
            PayloadEnd::LineEnd => {
                if text.ends_with('\r') {
                    text.pop();
                }
            }
            PayloadEnd::Ampersand | PayloadEnd::Else => {
                let trimmed = text.trim_end_matches([' ', '\t', '\r']).len();
                text.truncate(trimmed);
            }
        }
        self.advance_to(end);
        self.payload_start = Some(from);
        text
    }

    fn read_payload(&mut self, skip_separator: bool) -> String {
        if skip_separator {
            self.skip_separator();
        }
        let from = self.pos;
        let (end, how) = self.scan_payload(from);
        self.finish_payload(from, end, how)
    }

    /// `btn ops, label`: the operator field may chain statements with `&`,
    /// the label after the first comma may not.
    fn read_button_payload(&mut self) -> String {
        self.skip_separator();
        let from = self.pos;
        let (end, how) = match self.find_field_comma(from) {
            Some(comma) => self.scan_payload(comma + 1),
            None => self.scan_payload(from),
        };
        self.finish_payload(from, end, how)
    }

    fn read_operator(&mut self, line: usize, column: usize) -> Option<Token> {
        let ch = self.advance()?;
        let next = self.peek();
        let (token, double) = match (ch, next) {
            ('&', Some('&')) => (Token::And, true),
            ('&', _) => (Token::Ampersand, false),
            ('|', Some('|')) => (Token::Or, true),
            ('^', Some('^')) => (Token::Xor, true),
            ('=', Some('=')) => (Token::MaskEqual, true),
            ('=', _) => (Token::Equal, false),
            ('!', Some('=')) => (Token::NotEqual, true),
            ('<', Some('>')) => (Token::NotEqual, true),
            ('<', Some('=')) => (Token::LessEqual, true),
            ('<', _) => (Token::Less, false),
            ('>', Some('=')) => (Token::GreaterEqual, true),
            ('>', _) => (Token::Greater, false),
            ('/', Some('/')) => (Token::DoubleSlash, true),
            ('/', _) => (Token::Slash, false),
            ('+', _) => (Token::Plus, false),
            ('-', _) => (Token::Minus, false),
            ('*', _) => (Token::Star, false),
            ('%', _) => (Token::Percent, false),
            ('(', _) => (Token::LParen, false),
            (')', _) => (Token::RParen, false),
            (',', _) => (Token::Comma, false),
            _ => {
                self.errors.push(
                    Diagnostic::lex(&format!("unexpected character `{}`", ch), line, column)
                        .with_found(&ch.to_string()),
                );
                return None;
            }
        };
        if double {
            self.advance();
        }
        Some(token)
    }

    pub fn tokenize(&mut self) -> Vec<TokenInfo> {
        let mut tokens: Vec<TokenInfo> = Vec::new();

        loop {
            self.skip_whitespace();
            let line = self.line;
            let column = self.column;
            let start = self.pos;

            let Some(ch) = self.peek() else {
                tokens.push(TokenInfo { token: Token::EOF, lexeme: String::new(), line, column });
                break;
            };

            let token = match ch {
                '\n' => {
                    self.read_newlines();
                    Some(Token::Newline)
                }
                ';' => {
                    self.skip_line();
                    None
                }
                '/' if self.peek_at(1) == Some('*') => {
                    if self.skip_block_comment(line, column) {
                        Some(Token::Newline)
                    } else {
                        None
                    }
                }
                '/' if self.peek_at(1) == Some('/') && self.at_line_start => {
                    self.skip_line();
                    None
                }
                '-' if self.peek_at(1) == Some('-') && self.at_line_start => {
                    self.skip_line();
                    None
                }
                ':' if self.at_line_start => {
                    self.advance();
                    self.skip_whitespace();
                    let name = self.read_payload(false);
                    Some(Token::Label(name.trim_end().to_string()))
                }
                '"' => self.read_string(line, column).map(Token::Str),
                c if c.is_ascii_digit() => Some(self.read_number()),
                '.' if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) => Some(self.read_number()),
                c if c.is_alphabetic() => self.read_word(),
                _ => self.read_operator(line, column),
            };

            let Some(token) = token else {
                continue;
            };

            if token == Token::Newline {
                self.at_line_start = true;
                self.statement_start = true;
                self.open_ifs = 0;
                // Blank and comment-only lines collapse into one separator
                if matches!(tokens.last(), None | Some(TokenInfo { token: Token::Newline, .. })) {
                    continue;
                }
            } else {
                self.at_line_start = false;
                self.statement_start = matches!(token, Token::Ampersand | Token::Then | Token::Else);
            }

            let lexeme = match (self.payload_start.take(), token.payload()) {
                (Some(payload_start), Some(text)) => {
                    format!("{}{}", self.slice(start, payload_start), text)
                }
                _ => self.slice(start, self.pos).trim_end().to_string(),
            };
            tokens.push(TokenInfo { token, lexeme, line, column });
        }

        tokens
    }
}
