//! Prompt mode definition.

use regex::bytes::Regex;

/// A named CLI mode recognised by its prompt (e.g. "privileged", "configuration").
///
/// Modes are used to tell which context a device returned to after a
/// command; they carry no navigation logic of their own.
#[derive(Debug, Clone)]
pub struct PromptMode {
    /// Name of this mode.
    pub name: String,

    /// Regex pattern matching the prompt for this mode.
    pub pattern: Regex,

    /// Strings that must NOT be in the prompt for this mode to match.
    /// Used for disambiguation (e.g., "#" matches both privileged and config modes).
    pub not_contains: Vec<String>,
}

impl PromptMode {
    /// Create a new prompt mode.
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            pattern: Regex::new(pattern)?,
            not_contains: vec![],
        })
    }

    /// Add a not_contains pattern.
    pub fn with_not_contains(mut self, pattern: impl Into<String>) -> Self {
        self.not_contains.push(pattern.into());
        self
    }

    /// Check if this mode matches a prompt.
    pub fn matches(&self, prompt: &str) -> bool {
        if self.not_contains.iter().any(|nc| prompt.contains(nc)) {
            return false;
        }
        self.pattern.is_match(prompt.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_contains_disambiguates() {
        let privileged = PromptMode::new("privileged", r"#\s*$")
            .unwrap()
            .with_not_contains("(config");

        assert!(privileged.matches("Switch#"));
        assert!(!privileged.matches("Switch(config)#"));
        assert!(!privileged.matches("Switch>"));
    }
}
