//! Telnet option filter (RFC 854 / RFC 855).
//!
//! Console servers and factory-fresh switches speak Telnet, which interleaves
//! `IAC` command sequences with the data stream. [`TelnetFilter`] removes them,
//! keeping its state between reads so sequences split across chunks are
//! handled, and produces the replies a minimal line-mode client owes the peer:
//! accept the server's `ECHO` and `SUPPRESS-GO-AHEAD`, offer
//! `SUPPRESS-GO-AHEAD`, refuse everything else.

use bytes::{BufMut, BytesMut};
use memchr::memchr;

pub const IAC: u8 = 255;
pub const DONT: u8 = 254;
pub const DO: u8 = 253;
pub const WONT: u8 = 252;
pub const WILL: u8 = 251;
pub const SB: u8 = 250;
pub const SE: u8 = 240;

pub const OPT_ECHO: u8 = 1;
pub const OPT_SGA: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Data,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Output of one [`TelnetFilter::feed`] call.
#[derive(Debug, Default)]
pub struct Filtered {
    /// Application data with all Telnet commands removed.
    pub data: BytesMut,

    /// Negotiation replies to write back to the peer.
    pub reply: BytesMut,
}

/// Incremental Telnet command stripper and negotiator.
#[derive(Debug)]
pub struct TelnetFilter {
    state: State,
}

impl TelnetFilter {
    pub fn new() -> Self {
        Self { state: State::Data }
    }

    /// Process one chunk read from the peer.
    pub fn feed(&mut self, input: &[u8]) -> Filtered {
        let mut out = Filtered {
            data: BytesMut::with_capacity(input.len()),
            reply: BytesMut::new(),
        };

        let mut rest = input;
        while !rest.is_empty() {
            if self.state == State::Data {
                match memchr(IAC, rest) {
                    None => {
                        out.data.extend_from_slice(rest);
                        break;
                    }
                    Some(pos) => {
                        out.data.extend_from_slice(&rest[..pos]);
                        self.state = State::Iac;
                        rest = &rest[pos + 1..];
                    }
                }
                continue;
            }

            let byte = rest[0];
            rest = &rest[1..];
            self.state = match self.state {
                State::Iac => match byte {
                    IAC => {
                        out.data.put_u8(IAC);
                        State::Data
                    }
                    DO | DONT | WILL | WONT => State::Negotiate(byte),
                    SB => State::Sub,
                    // NOP, GA, AYT and friends carry no payload
                    _ => State::Data,
                },
                State::Negotiate(verb) => {
                    respond(verb, byte, &mut out.reply);
                    State::Data
                }
                State::Sub if byte == IAC => State::SubIac,
                State::Sub => State::Sub,
                State::SubIac if byte == SE => State::Data,
                State::SubIac => State::Sub,
                State::Data => unreachable!("data bytes are consumed by the fast path"),
            };
        }

        out
    }
}

impl Default for TelnetFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn respond(verb: u8, option: u8, reply: &mut BytesMut) {
    let answer = match verb {
        DO if option == OPT_SGA => WILL,
        DO => WONT,
        WILL if option == OPT_ECHO || option == OPT_SGA => DO,
        WILL => DONT,
        _ => return,
    };
    reply.extend_from_slice(&[IAC, answer, option]);
}

/// Double any IAC bytes in outgoing data.
pub fn escape(data: &[u8]) -> BytesMut {
    let mut out = BytesMut::with_capacity(data.len());
    let mut rest = data;
    while let Some(pos) = memchr(IAC, rest) {
        out.extend_from_slice(&rest[..=pos]);
        out.put_u8(IAC);
        rest = &rest[pos + 1..];
    }
    out.extend_from_slice(rest);
    out
}
