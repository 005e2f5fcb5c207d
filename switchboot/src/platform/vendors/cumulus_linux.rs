//! Cumulus Linux platform definition.
//!
//! Cumulus switches present a standard Linux shell with `$` (user) and
//! `#` (root) prompts and are reached over SSH.

use crate::device::{DeviceFamily, TransportKind};
use crate::platform::{PlatformDefinition, PromptMode};

/// Platform name for Cumulus Linux.
pub const PLATFORM_NAME: &str = "cumulus_linux";

/// Create the Cumulus Linux platform definition.
pub fn platform() -> PlatformDefinition {
    let user = PromptMode::new("user", r"[$]\s*$").unwrap();
    let root = PromptMode::new("root", r"[#]\s*$").unwrap();

    PlatformDefinition::new(PLATFORM_NAME, DeviceFamily::CumulusLinux, TransportKind::Ssh)
        .with_mode(user)
        .with_mode(root)
        .with_failure_pattern("command not found")
        .with_failure_pattern("No such file or directory")
        .with_failure_pattern("Permission denied")
}
