//! Cisco IOS platform definition.
//!
//! Supports Cisco IOS switches with the following prompt modes:
//! - `user` - User EXEC mode with `>` prompt
//! - `privileged` - Privileged EXEC mode with `#` prompt
//! - `configuration` - Global and sub-configuration modes with `(config...)#` prompt
//!
//! # Prompt Examples
//!
//! ```text
//! Switch>                   # user mode (factory default)
//! Switch#                   # privileged mode after "enable"
//! Switch(config)#           # after "configure terminal"
//! SW1(config-if)#           # interface sub-mode after hostname change
//! SW1(config-line)#         # after "line vty 0 4"
//! ```

use crate::device::{DeviceFamily, TransportKind};
use crate::platform::{PlatformDefinition, PromptMode};

/// Platform name for Cisco IOS.
pub const PLATFORM_NAME: &str = "cisco_ios";

/// Create the Cisco IOS platform definition.
pub fn platform() -> PlatformDefinition {
    let user = PromptMode::new("user", r"(?m)^[\w.\-@/:]{1,63}>\s?$").unwrap();

    let privileged = PromptMode::new("privileged", r"(?m)^[\w.\-@/:]{1,63}#\s?$")
        .unwrap()
        .with_not_contains("(config");

    let configuration = PromptMode::new(
        "configuration",
        r"(?m)^[\w.\-@/:]{1,63}\(config[\w.\-@/:+]{0,32}\)#\s?$",
    )
    .unwrap();

    PlatformDefinition::new(PLATFORM_NAME, DeviceFamily::CiscoIos, TransportKind::Telnet)
        .with_mode(user)
        .with_mode(privileged)
        .with_mode(configuration)
        .with_failure_pattern("% Invalid input")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Unknown command")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cisco_platform() {
        let platform = platform();
        assert_eq!(platform.name, "cisco_ios");
        assert_eq!(platform.transport, TransportKind::Telnet);
        assert_eq!(platform.modes.len(), 3);
    }

    #[test]
    fn test_mode_detection() {
        let platform = platform();
        assert_eq!(platform.mode_of("Switch>").unwrap().name, "user");
        assert_eq!(platform.mode_of("Switch#").unwrap().name, "privileged");
        assert_eq!(platform.mode_of("Switch(config)#").unwrap().name, "configuration");
        assert_eq!(platform.mode_of("SW1(config-if)#").unwrap().name, "configuration");
        assert_eq!(platform.mode_of("SW1(config-line)# ").unwrap().name, "configuration");
    }

    #[test]
    fn test_non_prompts() {
        let platform = platform();
        assert!(!platform.prompt_seen("Proceed with reload? [confirm]"));
        assert!(!platform.prompt_seen("Would you like to enter the initial configuration dialog? [yes/no]: "));
        assert!(!platform.prompt_seen("Address or name of remote host [192.168.10.5]? "));
        assert!(platform.prompt_seen("Building configuration...\n[OK]\nSW1#"));
    }

    #[test]
    fn test_failed_when_contains() {
        let platform = platform();
        assert!(platform.detect_failure("% Invalid input detected at '^' marker.").is_some());
        assert!(platform.detect_failure("% Incomplete command.").is_some());
    }
}
