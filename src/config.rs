use serde::Deserialize;

/// What to do when a `##code$` substitution cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubstitutionPolicy {
    /// Stop parsing and return the error instead of a program.
    #[default]
    Abort,
    /// Drop the enclosing statement, report it, and keep going.
    DropStatement,
}

/// Caller-controlled parse settings.
///
/// Deserializable so a host can keep these in its own config file:
///
/// ```toml
/// max_nesting_depth = 8
/// substitution_policy = "drop_statement"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// How many link/button actions may nest inside one another.
    pub max_nesting_depth: usize,
    pub substitution_policy: SubstitutionPolicy,
}

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 16;

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            substitution_policy: SubstitutionPolicy::Abort,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    pub fn with_substitution_policy(mut self, policy: SubstitutionPolicy) -> Self {
        self.substitution_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert_eq!(options.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
        assert_eq!(options.substitution_policy, SubstitutionPolicy::Abort);
    }

    #[test]
    fn test_builder() {
        let options = ParseOptions::new()
            .with_max_nesting_depth(2)
            .with_substitution_policy(SubstitutionPolicy::DropStatement);
        assert_eq!(options.max_nesting_depth, 2);
        assert_eq!(options.substitution_policy, SubstitutionPolicy::DropStatement);
    }

    #[test]
    fn test_deserialize_partial() {
        let options: ParseOptions =
            serde_json::from_str(r#"{"substitution_policy": "drop_statement"}"#).unwrap();
        assert_eq!(options.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
        assert_eq!(options.substitution_policy, SubstitutionPolicy::DropStatement);
    }
}
