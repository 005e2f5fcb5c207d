//! Channel layer for pattern matching and line-mode I/O.
//!
//! This module turns a raw byte stream into an interactive session:
//! Telnet option filtering, escape-sequence stripping and prompt detection.

mod buffer;
mod line;
pub mod telnet;

pub use buffer::PatternBuffer;
pub use line::{ChannelConfig, LineChannel};
pub use telnet::TelnetFilter;
