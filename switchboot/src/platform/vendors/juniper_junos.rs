//! Juniper JUNOS platform definition.
//!
//! Supports Juniper switches with the following prompt modes:
//! - `exec` - Operational mode with `>` prompt
//! - `configuration` - Configuration mode with `#` prompt
//! - `shell` - Unix shell with `%` prompt (where a factory-default root login lands)
//!
//! Prompt patterns are adapted from [scrapli](https://github.com/carlmontanari/scrapli).
//!
//! # Prompt Examples
//!
//! ```text
//! root@:RE:0%               # shell after root login on a factory-default box
//! root>                     # exec mode after "cli"
//! {master:0}                # routing-engine indicator (separate line)
//! admin@ex1>                # exec prompt on next line
//! [edit]                    # config context (separate line)
//! root#                     # configuration mode
//! ```

use crate::device::{DeviceFamily, TransportKind};
use crate::platform::{PlatformDefinition, PromptMode};

/// Platform name for Juniper JUNOS.
pub const PLATFORM_NAME: &str = "juniper_junos";

/// Create the Juniper JUNOS platform definition.
///
/// Uses `(?mi)` flags for multiline (^ matches line start) and case-insensitive matching.
pub fn platform() -> PlatformDefinition {
    let exec = PromptMode::new(
        "exec",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\n)?[\w\-@()/:\.]{1,63}>\s?$",
    )
    .unwrap();

    let configuration = PromptMode::new(
        "configuration",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\[edit\]\n)?[\w\-@()/:\.]{1,63}#\s?$",
    )
    .unwrap();

    let shell = PromptMode::new("shell", r"(?mi)^[\w\-@()/:\.]{0,63}%\s?$").unwrap();

    PlatformDefinition::new(PLATFORM_NAME, DeviceFamily::JuniperJunos, TransportKind::Telnet)
        .with_mode(exec)
        .with_mode(configuration)
        .with_mode(shell)
        .with_failure_pattern("unknown command")
        .with_failure_pattern("syntax error")
        .with_failure_pattern("error:")
        .with_failure_pattern("missing argument")
        .with_failure_pattern("is ambiguous")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_juniper_platform() {
        let platform = platform();
        assert_eq!(platform.name, "juniper_junos");
        assert_eq!(platform.modes.len(), 3);
        assert!(platform.modes.contains_key("exec"));
        assert!(platform.modes.contains_key("configuration"));
        assert!(platform.modes.contains_key("shell"));
    }

    #[test]
    fn test_exec_prompt_match() {
        let platform = platform();
        let exec = platform.modes.get("exec").unwrap();

        assert!(exec.pattern.is_match(b"root>"));
        assert!(exec.pattern.is_match(b"root@device> "));
        assert!(exec.pattern.is_match(b"{master:0}\nadmin@ex1>"));

        assert!(!exec.pattern.is_match(b"root# "));
        assert!(!exec.pattern.is_match(b"root@:RE:0% "));
    }

    #[test]
    fn test_configuration_prompt_match() {
        let platform = platform();
        let config = platform.modes.get("configuration").unwrap();

        assert!(config.pattern.is_match(b"root#"));
        assert!(config.pattern.is_match(b"[edit]\nroot# "));
        assert!(config.pattern.is_match(b"{master:0}[edit]\nadmin@ex1#"));

        assert!(!config.pattern.is_match(b"root> "));
    }

    #[test]
    fn test_shell_prompt_match() {
        let platform = platform();
        assert_eq!(platform.mode_of("root@:RE:0%").unwrap().name, "shell");
        assert_eq!(platform.mode_of("% ").unwrap().name, "shell");
        assert!(platform.mode_of("login:").is_none());
    }

    #[test]
    fn test_failed_when_contains() {
        let platform = platform();
        assert!(platform.detect_failure("syntax error, expecting <command>.").is_some());
        assert!(platform.detect_failure("unknown command.").is_some());
    }
}
