//! Built-in platform definitions, one per device family.

pub mod cisco_ios;
pub mod cumulus_linux;
pub mod juniper_junos;
