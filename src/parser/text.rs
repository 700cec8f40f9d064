use tracing::warn;

use super::annotation::is_bare_target;
use super::ast::{StatementGroup, TextSegment};
use super::Parser;
use crate::config::SubstitutionPolicy;
use crate::errors::Diagnostic;
use crate::lexer::find_link_end;

/// A `##code$` substitution whose code is not a valid character.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("`{0}` is not a decimal character code")]
pub struct BadCharCode(pub String);

/// Decode the body of a `#...$` substitution, without its delimiters.
fn decode_substitution(body: &str) -> Result<TextSegment, BadCharCode> {
    let body = body.strip_prefix('%').unwrap_or(body);

    if let Some(code) = body.strip_prefix('#') {
        return code
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(char::from_u32)
            .map(|c| TextSegment::Literal(c.to_string()))
            .ok_or_else(|| BadCharCode(code.to_string()));
    }

    Ok(match body {
        "" => TextSegment::Literal(" ".to_string()),
        "/" => TextSegment::Literal("\n".to_string()),
        name => TextSegment::Variable(name.to_string()),
    })
}

/// Segment list that merges neighbouring literals and drops empty ones.
#[derive(Default)]
struct Segments(Vec<TextSegment>);

impl Segments {
    fn push_literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(TextSegment::Literal(prev)) = self.0.last_mut() {
            prev.push_str(text);
        } else {
            self.0.push(TextSegment::Literal(text.to_string()));
        }
    }

    fn push(&mut self, segment: TextSegment) {
        match segment {
            TextSegment::Literal(text) => self.push_literal(&text),
            other => self.0.push(other),
        }
    }
}

impl Parser {
    /// Split print text into literals, `#var$` substitutions and `[[...]]` links.
    /// `column` is where `text` starts in the source line.
    pub(crate) fn decompose_text(
        &mut self,
        text: &str,
        line: usize,
        column: usize,
    ) -> Result<Vec<TextSegment>, Diagnostic> {
        let chars: Vec<char> = text.chars().collect();
        let mut segments = Segments::default();
        let mut literal_start = 0;
        let mut i = 0;

        while i < chars.len() {
            if let Some(end) = find_link_end(&chars, i) {
                segments.push_literal(&collect(&chars[literal_start..i]));
                let inner = collect(&chars[i + 2..end - 2]);
                let link = self.parse_link(&inner, line, column + i + 2)?;
                segments.push(link);
                i = end;
                literal_start = end;
                continue;
            }

            if chars[i] == '#' {
                if let Some(offset) = chars[i + 1..].iter().position(|&c| c == '$') {
                    let close = i + 1 + offset;
                    segments.push_literal(&collect(&chars[literal_start..i]));
                    let body = collect(&chars[i + 1..close]);
                    match decode_substitution(&body) {
                        Ok(segment) => segments.push(segment),
                        Err(bad) => return Err(self.substitution_failed(bad, line, column + i)),
                    }
                    i = close + 1;
                    literal_start = i;
                    continue;
                }
            }

            i += 1;
        }

        segments.push_literal(&collect(&chars[literal_start..]));
        Ok(segments.0)
    }

    fn substitution_failed(&mut self, bad: BadCharCode, line: usize, column: usize) -> Diagnostic {
        let diagnostic = Diagnostic::substitution(&bad.to_string(), line, column)
            .with_found(&bad.0)
            .with_expected("a decimal character code");

        warn!(line, column, code = %bad.0, policy = ?self.options.substitution_policy, "bad character code");
        if self.options.substitution_policy == SubstitutionPolicy::Abort {
            self.fatal = Some(diagnostic.clone());
        }
        diagnostic
    }
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

/// Write segments back as print text that decomposes to the same segments.
///
/// Returns `None` when a segment has no textual form, such as a link whose action
/// is more than a single goto.
pub fn reconstruct_text(segments: &[TextSegment]) -> Option<String> {
    let mut out = String::new();

    for segment in segments {
        match segment {
            TextSegment::Literal(text) => {
                for c in text.chars() {
                    match c {
                        '#' => out.push_str("##35$"),
                        '&' => out.push_str("##38$"),
                        '[' => out.push_str("##91$"),
                        '|' => out.push_str("##124$"),
                        '\n' => out.push_str("#/$"),
                        '\r' => out.push_str("##13$"),
                        c => out.push(c),
                    }
                }
            }
            TextSegment::Variable(name) => {
                if name.is_empty()
                    || name == "/"
                    || name.starts_with(['#', '%'])
                    || name.contains(['$', '&', '\n'])
                {
                    return None;
                }
                out.push('#');
                out.push_str(name);
                out.push('$');
            }
            TextSegment::Link { label, action } => {
                out.push_str(&reconstruct_link(label, action)?);
            }
        }
    }

    Some(out)
}

fn reconstruct_link(label: &str, action: &StatementGroup) -> Option<String> {
    let target = action.as_goto()?;
    let needs_escape = |s: &str| s.is_empty() || s.trim() != s || s.contains(['|', '[', ']', '&', '\n']);
    if needs_escape(label) || needs_escape(target) {
        return None;
    }

    if target == label {
        Some(format!("[[{}]]", label))
    } else if is_bare_target(target) {
        Some(format!("[[{}|{}]]", label, target))
    } else {
        Some(format!("[[{}|goto {}]]", label, target))
    }
}

// ========================================================================
// Unit Tests for Text Segments
// ========================================================================

#[cfg(test)]
mod text_tests {
    use super::*;
    use crate::config::ParseOptions;
    use crate::errors::DiagnosticKind;
    use crate::parser::ast::Statement;

    fn decompose(text: &str) -> Vec<TextSegment> {
        let mut parser = Parser::new(Vec::new());
        let segments = parser.decompose_text(text, 1, 5).expect("decomposes");
        assert!(parser.errors.is_empty(), "errors: {:?}", parser.errors);
        segments
    }

    fn lit(s: &str) -> TextSegment {
        TextSegment::Literal(s.to_string())
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(decompose("Hello there"), vec![lit("Hello there")]);
        assert_eq!(decompose(""), Vec::<TextSegment>::new());
    }

    #[test]
    fn test_variable_substitution() {
        assert_eq!(
            decompose("Hello, #name$!"),
            vec![lit("Hello, "), TextSegment::Variable("name".into()), lit("!")]
        );
        assert_eq!(decompose("#%gold$"), vec![TextSegment::Variable("gold".into())]);
    }

    #[test]
    fn test_special_substitutions_merge_into_literals() {
        assert_eq!(decompose("a##38$b"), vec![lit("a&b")]);
        assert_eq!(decompose("a#$b"), vec![lit("a b")]);
        assert_eq!(decompose("a#/$b"), vec![lit("a\nb")]);
        assert_eq!(decompose("## 65 $"), vec![lit("A")]);
    }

    #[test]
    fn test_hash_without_dollar_is_literal() {
        assert_eq!(decompose("Room #5"), vec![lit("Room #5")]);
    }

    #[test]
    fn test_bare_link() {
        assert_eq!(
            decompose("Go [[north]]"),
            vec![
                lit("Go "),
                TextSegment::Link {
                    label: "north".into(),
                    action: StatementGroup::goto("north", 1),
                },
            ]
        );
    }

    #[test]
    fn test_link_with_bare_target() {
        assert_eq!(
            decompose("[[Go north|north_room]]"),
            vec![TextSegment::Link {
                label: "Go north".into(),
                action: StatementGroup::goto("north_room", 1),
            }]
        );
    }

    #[test]
    fn test_link_with_empty_action_uses_label() {
        assert_eq!(
            decompose("[[Back| ]]"),
            vec![TextSegment::Link {
                label: "Back".into(),
                action: StatementGroup::goto("Back", 1),
            }]
        );
    }

    #[test]
    fn test_link_is_matched_before_substitution() {
        assert_eq!(
            decompose("[[Pay #1$|pay]]"),
            vec![TextSegment::Link {
                label: "Pay #1$".into(),
                action: StatementGroup::goto("pay", 1),
            }]
        );
    }

    #[test]
    fn test_link_with_statement_action() {
        let segments = decompose("[[Take|inv+ lamp & goto hall]]");
        match &segments[0] {
            TextSegment::Link { label, action } => {
                assert_eq!(label, "Take");
                assert_eq!(action.statements.len(), 2);
                assert_eq!(action.statements[1], Statement::Goto { target: "hall".into() });
            }
            other => panic!("Expected Link, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_link_is_error() {
        let mut parser = Parser::new(Vec::new());
        let err = parser.decompose_text("[[a|b|c]]", 2, 5).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SyntaxError);
        assert_eq!((err.line, err.column), (2, 7));
    }

    #[test]
    fn test_bad_char_code_aborts_by_default() {
        let mut parser = Parser::new(Vec::new());
        let err = parser.decompose_text("x ##abc$", 3, 5).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SubstitutionError);
        assert_eq!((err.line, err.column), (3, 7));
        assert_eq!(parser.fatal, Some(err));
    }

    #[test]
    fn test_bad_char_code_drop_policy_is_not_fatal() {
        let options = ParseOptions::new().with_substitution_policy(SubstitutionPolicy::DropStatement);
        let mut parser = Parser::new(Vec::new()).with_options(options);
        let err = parser.decompose_text("##99999999$", 1, 1).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SubstitutionError);
        assert!(parser.fatal.is_none());
    }

    #[test]
    fn test_reconstruct_escapes() {
        let segments = vec![
            lit("A&B #1 [x]\n"),
            TextSegment::Variable("name".into()),
            TextSegment::Link { label: "Go".into(), action: StatementGroup::goto("the hall", 1) },
            TextSegment::Link { label: "north".into(), action: StatementGroup::goto("north", 1) },
        ];
        assert_eq!(
            reconstruct_text(&segments).as_deref(),
            Some("A##38$B ##35$1 ##91$x]#/$#name$[[Go|goto the hall]][[north]]")
        );
    }

    #[test]
    fn test_reconstruct_round_trips() {
        let text = "Hi #who$, take ##38$ [[lamp|get_lamp]] or [[Leave]]#/$done ##35$";
        let segments = decompose(text);
        let rebuilt = reconstruct_text(&segments).expect("plain segments");
        assert_eq!(decompose(&rebuilt), segments);
    }

    #[test]
    fn test_reconstruct_refuses_compound_links() {
        let segments = decompose("[[Take|inv+ lamp & goto hall]]");
        assert_eq!(reconstruct_text(&segments), None);
    }
}
