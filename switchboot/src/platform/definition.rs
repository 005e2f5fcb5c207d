//! Platform definition for vendor-specific prompt handling.

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::prompt_mode::PromptMode;
use crate::device::{DeviceFamily, TransportKind};

/// How far back from the end of an output the prompt checks look.
const PROMPT_TAIL: usize = 256;

/// Questions a device blocks on instead of showing its prompt.
const DIALOG_PATTERN: &str = r"(?i)(?:new password:|\[confirm\]|\[yes/no\]:?)\s*$";

/// Transport profile and prompt vocabulary for one device family.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "cisco_ios", "juniper_junos").
    pub name: String,

    /// Family this profile belongs to.
    pub family: DeviceFamily,

    /// Transport used when the catalog does not specify one.
    pub transport: TransportKind,

    /// Prompt modes, in match priority order.
    pub modes: IndexMap<String, PromptMode>,

    /// Substrings in command output that indicate the command was rejected.
    pub failed_when_contains: Vec<String>,

    /// Combined prompt pattern across all modes.
    prompt_pattern: Regex,

    /// Dialogs that end a prompt read early.
    dialog_pattern: Regex,
}

impl PlatformDefinition {
    /// Create a new platform definition with no prompt modes.
    pub fn new(name: impl Into<String>, family: DeviceFamily, transport: TransportKind) -> Self {
        Self {
            name: name.into(),
            family,
            transport,
            modes: IndexMap::new(),
            failed_when_contains: vec![],
            prompt_pattern: fallback_pattern(),
            dialog_pattern: Regex::new(DIALOG_PATTERN).expect("dialog pattern is valid"),
        }
    }

    /// Add a prompt mode.
    pub fn with_mode(mut self, mode: PromptMode) -> Self {
        self.modes.insert(mode.name.clone(), mode);
        self.prompt_pattern = Self::build_combined_pattern(&self.modes);
        self
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Build a combined regex pattern that matches any mode's prompt.
    fn build_combined_pattern(modes: &IndexMap<String, PromptMode>) -> Regex {
        let combined = modes
            .values()
            .map(|mode| format!("(?:{})", mode.pattern.as_str()))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&combined).unwrap_or_else(|_| fallback_pattern())
    }

    /// Pattern matching the standard prompt in any mode.
    pub fn prompt_pattern(&self) -> &Regex {
        &self.prompt_pattern
    }

    /// Pattern matching a dialog waiting for an answer.
    pub fn dialog_pattern(&self) -> &Regex {
        &self.dialog_pattern
    }

    /// Determine which mode a prompt belongs to.
    pub fn mode_of(&self, prompt: &str) -> Option<&PromptMode> {
        self.modes.values().find(|mode| mode.matches(prompt))
    }

    /// Whether an output ends with a standard prompt.
    pub fn prompt_seen(&self, output: &str) -> bool {
        let trimmed = output.trim_end_matches(['\r', '\n']);
        let mut start = trimmed.len().saturating_sub(PROMPT_TAIL);
        while !trimmed.is_char_boundary(start) {
            start += 1;
        }
        self.prompt_pattern.is_match(trimmed[start..].as_bytes())
    }

    /// Return the first failure pattern contained in an output.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

fn fallback_pattern() -> Regex {
    Regex::new(r"[$#>%]\s*$").expect("fallback prompt pattern is valid")
}
