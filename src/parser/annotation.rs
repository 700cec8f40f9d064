//! Statement text embedded in other statements: link and button actions, and the
//! quantity field of inventory changes. These are lexed and parsed on their own,
//! with positions mapped back onto the enclosing line.

use tracing::{trace, warn};

use super::ast::*;
use super::Parser;
use crate::errors::Diagnostic;
use crate::lexer::{find_link_end, is_word_char, Lexer, Token};

/// True when `text` is a plain location name rather than statement code.
pub fn is_bare_target(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| is_word_char(c) || c == '.' || c == '-')
}

/// Split on commas that are not inside a `[[...]]` link, into at most `max` fields.
/// The last field keeps any remaining commas.
fn split_fields(text: &str, max: usize) -> Vec<&str> {
    let chars: Vec<char> = text.chars().collect();
    let offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
    let mut fields = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() && fields.len() + 1 < max {
        if let Some(end) = find_link_end(&chars, i) {
            i = end;
            continue;
        }
        if chars[i] == ',' {
            fields.push(&text[start..offsets[i]]);
            start = offsets[i] + 1;
        }
        i += 1;
    }

    fields.push(&text[start..]);
    fields
}

/// The target of an action that is nothing but `goto <bare target>`.
fn direct_goto(text: &str) -> Option<&str> {
    let keyword = text.get(..4)?;
    let rest = &text[4..];
    if !keyword.eq_ignore_ascii_case("goto") || !rest.starts_with([' ', '\t']) {
        return None;
    }
    let target = rest.trim();
    is_bare_target(target).then_some(target)
}

fn leading_blanks(text: &str) -> usize {
    text.chars().take_while(|c| c.is_whitespace()).count()
}

impl Parser {
    /// The body of a `[[...]]` link, without its brackets.
    pub(crate) fn parse_link(
        &mut self,
        inner: &str,
        line: usize,
        column: usize,
    ) -> Result<TextSegment, Diagnostic> {
        let parts: Vec<&str> = inner.split('|').collect();

        match parts.as_slice() {
            [label, action] if !action.trim().is_empty() => {
                let action_column = column + label.chars().count() + 1 + leading_blanks(action);
                let action = self.parse_action(action.trim(), line, action_column)?;
                Ok(TextSegment::Link { label: label.trim().to_string(), action })
            }
            [label] | [label, _] => {
                let label = label.trim();
                Ok(TextSegment::Link {
                    label: label.to_string(),
                    action: StatementGroup::goto(label, line),
                })
            }
            _ => {
                warn!(line, column, "link with more than one separator");
                Err(Diagnostic::syntax("link has more than one `|` separator", line, column)
                    .with_found(inner)
                    .with_expected("`[[label]]` or `[[label|action]]`"))
            }
        }
    }

    /// `btn action, label[, extra]`, or `btn target` which both names and jumps.
    pub(crate) fn parse_button(
        &mut self,
        payload: &str,
        line: usize,
        column: usize,
    ) -> Result<Statement, Diagnostic> {
        match split_fields(payload, 3).as_slice() {
            [ops, label, rest @ ..] => {
                let action_text = ops.trim();
                if action_text.is_empty() {
                    return Err(Diagnostic::syntax("button has no action", line, column)
                        .with_expected("a location or statements before `,`"));
                }
                let action = self.parse_action(action_text, line, column + leading_blanks(ops))?;
                Ok(Statement::Button {
                    label: label.trim().to_string(),
                    action,
                    extra: rest.first().map(|extra| extra.trim().to_string()),
                })
            }
            [target] if !target.trim().is_empty() => {
                let target = target.trim();
                Ok(Statement::Button {
                    label: target.to_string(),
                    action: StatementGroup::goto(target, line),
                    extra: None,
                })
            }
            _ => Err(Diagnostic::syntax("`btn` needs a target", line, column)
                .with_expected("a location name")),
        }
    }

    /// A link or button action. Bare names, and `goto` of a bare name, become a goto
    /// without a sub-parse.
    pub(crate) fn parse_action(
        &mut self,
        text: &str,
        line: usize,
        column: usize,
    ) -> Result<StatementGroup, Diagnostic> {
        if is_bare_target(text) {
            return Ok(StatementGroup::goto(text, line));
        }
        if let Some(target) = direct_goto(text) {
            return Ok(StatementGroup::goto(target, line));
        }

        if self.depth >= self.options.max_nesting_depth {
            warn!(line, column, depth = self.depth, "action nesting limit reached");
            return Err(Diagnostic::syntax(
                &format!(
                    "actions nested more than {} levels deep",
                    self.options.max_nesting_depth
                ),
                line,
                column,
            ));
        }

        trace!(depth = self.depth + 1, line, column, action = text, "parsing embedded action");
        let mut lexer = Lexer::new(text).starting_at(line, column);
        let tokens = lexer.tokenize();
        self.errors.append(&mut lexer.errors);

        let mut nested = Parser::new(tokens)
            .with_options(self.options.clone())
            .at_depth(self.depth + 1);
        let result = nested.parse();
        self.errors.append(&mut nested.errors);

        match result {
            Ok(program) => {
                let statements: Vec<Statement> =
                    program.groups.into_iter().flat_map(|g| g.statements).collect();
                if statements.is_empty() {
                    Err(Diagnostic::syntax("action has no valid statements", line, column)
                        .with_found(text))
                } else {
                    Ok(StatementGroup::new(statements, line))
                }
            }
            Err(fatal) => {
                self.fatal = Some(fatal.clone());
                Err(fatal)
            }
        }
    }

    /// `inv+ [quantity,] item` and `inv- [quantity,] item`.
    pub(crate) fn parse_inventory_change(
        &mut self,
        payload: &str,
        remove: bool,
        line: usize,
        column: usize,
    ) -> Result<Statement, Diagnostic> {
        let fields = split_fields(payload, 2);
        let (quantity, item, item_column) = match fields.as_slice() {
            [quantity_text, item] => {
                let quantity_column = column + leading_blanks(quantity_text);
                let quantity = self.parse_quantity(quantity_text.trim(), line, quantity_column)?;
                (quantity, item.trim(), column + quantity_text.chars().count() + 1)
            }
            [item] => (NumberExpr::Const(1.0), item.trim(), column),
            _ => (NumberExpr::Const(1.0), "", column),
        };

        if item.is_empty() {
            return Err(Diagnostic::syntax("inventory change needs an item", line, item_column)
                .with_expected("an item name"));
        }

        let quantity = if remove { NumberExpr::Negate(Box::new(quantity)) } else { quantity };
        Ok(Statement::Inventory(InventoryOp::Change { quantity, item: item.to_string() }))
    }

    fn parse_quantity(&mut self, text: &str, line: usize, column: usize) -> Result<NumberExpr, Diagnostic> {
        let mut lexer = Lexer::new(text).starting_at(line, column);
        let tokens = lexer.tokenize();
        self.errors.append(&mut lexer.errors);

        let mut nested = Parser::new(tokens).at_depth(self.depth);
        let quantity = nested.parse_number_expr()?;
        if *nested.current() != Token::EOF {
            return Err(nested.err_expected("end of quantity"));
        }
        Ok(quantity)
    }
}

// ========================================================================
// Unit Tests for Embedded Statements
// ========================================================================
