//! Front-end for the URQ quest language: turns quest source into a typed
//! program tree plus positioned diagnostics.
//!
//! ```no_run
//! let output = urq::parse(":start\npln Hello, #name$!\nbtn cellar, Go down\nend").unwrap();
//! for d in &output.diagnostics {
//!     eprintln!("{}", d);
//! }
//! ```

pub mod config;
pub mod errors;
pub mod lexer;
pub mod parser;

use serde::Serialize;
use tracing::debug;

pub use config::{ParseOptions, SubstitutionPolicy};
pub use errors::{Diagnostic, DiagnosticKind, ParseAbort, SourceFile};
pub use lexer::{Lexer, Token, TokenInfo};
pub use parser::ast;
pub use parser::{is_bare_target, reconstruct_text, Parser};

/// A parsed program and everything worth reporting about it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseOutput {
    pub program: ast::Program,
    /// Lex, syntax and substitution problems, ordered by position.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Tokenize quest source. Unrecognized characters are reported and skipped.
pub fn tokenize(source: &str) -> (Vec<TokenInfo>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    (tokens, lexer.errors)
}

pub fn parse(source: &str) -> Result<ParseOutput, ParseAbort> {
    parse_with_options(source, &ParseOptions::default())
}

pub fn parse_with_options(source: &str, options: &ParseOptions) -> Result<ParseOutput, ParseAbort> {
    debug!(bytes = source.len(), ?options, "parsing quest source");

    let (tokens, mut diagnostics) = tokenize(source);
    let mut parser = Parser::new(tokens).with_options(options.clone());
    let result = parser.parse();

    diagnostics.append(&mut parser.errors);
    diagnostics.sort_by_key(|d| (d.line, d.column));

    match result {
        Ok(program) => {
            debug!(groups = program.groups.len(), diagnostics = diagnostics.len(), "parse finished");
            Ok(ParseOutput { program, diagnostics })
        }
        Err(cause) => {
            debug!(%cause, "parse aborted");
            Err(ParseAbort { cause, diagnostics })
        }
    }
}
