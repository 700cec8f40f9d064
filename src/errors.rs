use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    LexError,
    SyntaxError,
    SubstitutionError,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::LexError => write!(f, "lex error"),
            DiagnosticKind::SyntaxError => write!(f, "syntax error"),
            DiagnosticKind::SubstitutionError => write!(f, "substitution error"),
        }
    }
}

/// A problem found while tokenizing or parsing, with the position it was found at.
///
/// Lines and columns are 1-based and count characters, not bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind} at {line}:{column}: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub found: Option<String>,
    pub expected: Option<String>,
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: &str, line: usize, column: usize) -> Self {
        Diagnostic {
            kind,
            message: message.to_string(),
            line,
            column,
            found: None,
            expected: None,
            suggestion: None,
        }
    }

    pub fn lex(message: &str, line: usize, column: usize) -> Self {
        Diagnostic::new(DiagnosticKind::LexError, message, line, column)
    }

    pub fn syntax(message: &str, line: usize, column: usize) -> Self {
        Diagnostic::new(DiagnosticKind::SyntaxError, message, line, column)
    }

    pub fn substitution(message: &str, line: usize, column: usize) -> Self {
        Diagnostic::new(DiagnosticKind::SubstitutionError, message, line, column)
    }

    pub fn with_found(mut self, found: &str) -> Self {
        self.found = Some(found.to_string());
        self
    }

    pub fn with_expected(mut self, expected: &str) -> Self {
        self.expected = Some(expected.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    /// Render the diagnostic against its source, with the offending line and a caret.
    pub fn render(&self, source: &SourceFile) -> String {
        // ANSI color codes
        const RED: &str = "\x1b[1;31m";
        const BLUE: &str = "\x1b[1;34m";
        const YELLOW: &str = "\x1b[1;33m";
        const GREEN: &str = "\x1b[1;32m";
        const RESET: &str = "\x1b[0m";
        const BOLD: &str = "\x1b[1m";

        let mut out = String::new();
        out.push_str(&format!("{}{}{}: {}{}{}\n", RED, self.kind, RESET, BOLD, self.message, RESET));
        out.push_str(&format!(
            "  {}-->{} {}:{}:{}\n",
            BLUE, RESET, source.filename, self.line, self.column
        ));

        let gutter = self.line.to_string().len();
        let line_content = source.get_line(self.line).unwrap_or("");
        out.push_str(&format!("  {:width$} {}|{}\n", "", BLUE, RESET, width = gutter));
        out.push_str(&format!(
            "  {}{}{} {}|{} {}\n",
            BLUE, self.line, RESET, BLUE, RESET, line_content.trim_end()
        ));

        let spaces = " ".repeat(self.column.saturating_sub(1));
        let pointer = match self.expected {
            Some(ref expected) => format!("expected {}", expected),
            None => "here".to_string(),
        };
        out.push_str(&format!(
            "  {:width$} {}|{} {}{}^--- {}{}\n",
            "", BLUE, RESET, spaces, RED, pointer, RESET, width = gutter
        ));

        if let Some(ref suggestion) = self.suggestion {
            out.push_str(&format!(
                "  {}help{}: did you mean `{}{}{}`?\n",
                GREEN, RESET, YELLOW, suggestion, RESET
            ));
        }

        out
    }
}

/// Returned instead of a program when a fatal construct stops the whole parse.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse aborted: {cause}")]
pub struct ParseAbort {
    pub cause: Diagnostic,
    /// Everything reported before the parse stopped.
    pub diagnostics: Vec<Diagnostic>,
}

pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_lower = a.to_lowercase();
    let b_lower = b.to_lowercase();
    let a_chars: Vec<char> = a_lower.chars().collect();
    let b_chars: Vec<char> = b_lower.chars().collect();

    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 { return n; }
    if n == 0 { return m; }

    let mut dp = vec![vec![0usize; n + 1]; m + 1];

    for (i, row) in dp.iter_mut().enumerate() { row[0] = i; }
    for j in 0..=n { dp[0][j] = j; }

    for i in 1..=m {
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            dp[i][j] = (dp[i - 1][j] + 1)
                .min(dp[i][j - 1] + 1)
                .min(dp[i - 1][j - 1] + cost);
        }
    }

    dp[m][n]
}

pub fn find_similar_keyword(word: &str, keywords: &[&str]) -> Option<String> {
    let word_lower = word.to_lowercase();
    let mut best_match: Option<(String, usize)> = None;

    // Short names like `a` or `x1` are ordinary variables
    if word.chars().count() <= 2 {
        return None;
    }

    for &keyword in keywords {
        let len_diff = (word.len() as isize - keyword.len() as isize).unsigned_abs();
        if len_diff > 2 {
            continue;
        }

        let distance = levenshtein_distance(&word_lower, keyword);
        if distance == 0 {
            return None;
        }

        let max_distance = if word.len() >= 4 { 2 } else { 1 };

        if distance <= max_distance {
            match best_match {
                Some((_, best_dist)) if distance >= best_dist => {}
                _ => best_match = Some((keyword.to_string(), distance)),
            }
        }
    }

    best_match.map(|(s, _)| s)
}

pub const URQ_KEYWORDS: &[&str] = &[
    "print", "println", "pln", "btn", "goto", "proc", "forget_proc", "forget_procs",
    "end", "input", "anykey", "save", "quit", "cls", "pause", "play", "music", "image",
    "invkill", "instr", "if", "then", "else", "and", "or", "xor", "not", "true", "false",
];

pub struct SourceFile {
    pub filename: String,
    lines: Vec<String>,
}

impl SourceFile {
    pub fn new(filename: &str, content: &str) -> Self {
        let lines: Vec<String> = content.lines().map(|s| s.to_string()).collect();
        SourceFile {
            filename: filename.to_string(),
            lines,
        }
    }

    pub fn get_line(&self, line_num: usize) -> Option<&str> {
        if line_num > 0 && line_num <= self.lines.len() {
            Some(&self.lines[line_num - 1])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("goto", "goto"), 0);
        assert_eq!(levenshtein_distance("goto", "gota"), 1);
        assert_eq!(levenshtein_distance("print", "prnt"), 1);
        assert_eq!(levenshtein_distance("anykey", "ANYKEY"), 0);
    }

    #[test]
    fn test_find_similar() {
        assert_eq!(find_similar_keyword("pirnt", URQ_KEYWORDS), Some("print".to_string()));
        assert_eq!(find_similar_keyword("gotoo", URQ_KEYWORDS), Some("goto".to_string()));
        assert_eq!(find_similar_keyword("anykye", URQ_KEYWORDS), Some("anykey".to_string()));
        assert_eq!(find_similar_keyword("xy", URQ_KEYWORDS), None);
        assert_eq!(find_similar_keyword("money", URQ_KEYWORDS), None);
    }

    #[test]
    fn test_display_includes_position() {
        let d = Diagnostic::syntax("expected `then`", 3, 7);
        assert_eq!(d.to_string(), "syntax error at 3:7: expected `then`");
    }

    #[test]
    fn test_render_points_at_column() {
        let source = SourceFile::new("quest.qst", "a = 1\nif a then\n");
        let d = Diagnostic::syntax("missing statement", 2, 6).with_expected("a statement");
        let rendered = d.render(&source);
        assert!(rendered.contains("quest.qst:2:6"));
        assert!(rendered.contains("if a then"));
        assert!(rendered.contains("     \x1b[1;31m^--- expected a statement"));
    }

    #[test]
    fn test_render_with_suggestion() {
        let source = SourceFile::new("quest.qst", "pirnt hello");
        let d = Diagnostic::syntax("expected `=`", 1, 7).with_suggestion("print");
        assert!(d.render(&source).contains("did you mean"));
    }

    #[test]
    fn test_abort_display() {
        let abort = ParseAbort {
            cause: Diagnostic::substitution("bad code", 1, 4),
            diagnostics: Vec::new(),
        };
        assert_eq!(abort.to_string(), "parse aborted: substitution error at 1:4: bad code");
    }
}
