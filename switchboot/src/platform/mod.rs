//! Platform definitions for multi-vendor support.
//!
//! Each [`DeviceFamily`] maps to exactly one [`PlatformDefinition`] through an
//! exhaustive match, so adding a family is a compile-checked change.

mod definition;
mod prompt_mode;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use prompt_mode::PromptMode;

use std::sync::LazyLock;

use crate::device::DeviceFamily;

static CISCO_IOS: LazyLock<PlatformDefinition> = LazyLock::new(vendors::cisco_ios::platform);
static JUNIPER_JUNOS: LazyLock<PlatformDefinition> =
    LazyLock::new(vendors::juniper_junos::platform);
static CUMULUS_LINUX: LazyLock<PlatformDefinition> =
    LazyLock::new(vendors::cumulus_linux::platform);

impl DeviceFamily {
    /// The transport profile and prompt vocabulary for this family.
    pub fn platform(self) -> &'static PlatformDefinition {
        match self {
            DeviceFamily::CiscoIos => &CISCO_IOS,
            DeviceFamily::JuniperJunos => &JUNIPER_JUNOS,
            DeviceFamily::CumulusLinux => &CUMULUS_LINUX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_family_has_a_profile() {
        for family in [
            DeviceFamily::CiscoIos,
            DeviceFamily::JuniperJunos,
            DeviceFamily::CumulusLinux,
        ] {
            let platform = family.platform();
            assert_eq!(platform.family, family);
            assert!(!platform.modes.is_empty());
        }
    }
}
