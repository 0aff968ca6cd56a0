//! The debug command protocol.
//!
//! Commands are ASCII text terminated by `;`:
//!
//! ```text
//! Stop;
//! Read,<addr hex>,<count dec>;
//! Write,<addr hex>,<count dec>,<data hex>;
//! ROM,<addr hex>,<count dec>;
//! ```
//!
//! Only `[0-9A-Za-z,]` are kept while assembling a command; whitespace, newlines and
//! any other byte are dropped, so clients may pretty-print their commands. Replies
//! are rendered with uppercase hex and always end in `;`.


use thiserror::Error;

use crate::soc::debug::access::{AccessCommand, AccessOutcome, PendingAccess};

/// Reply name used when the command name itself does not fit in a reply.
pub const NAME_OVERRUN: &str = "CmdNameOverrun";

/// Errors reported to the client as `Error,<cmd>,<name>;`.
///
/// The `Display` form is the wire name.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The parameters could not be parsed.
    #[error("SyntaxError")]
    SyntaxError,
    /// The number of data digits does not match the byte count.
    #[error("DataSizeIncorrect")]
    DataSizeIncorrect,
    /// The byte count exceeds the per-command limit.
    #[error("AccessTooLarge")]
    AccessTooLarge,
    /// The command did not fit in the command buffer.
    #[error("CmdBufferOverrun")]
    CmdBufferOverrun,
    /// The command name is not known.
    #[error("UnknownCommand")]
    UnknownCommand,
    /// The simulator cannot perform the access.
    #[error("SimulatorError")]
    SimulatorError,
}

/// A terminated command, as collected by [`CommandAssembler`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// The accepted characters, truncated to the buffer capacity.
    pub text: String,
    /// Whether characters were lost because the buffer was full.
    pub overrun: bool,
}

impl Frame {
    /// Splits the frame at the first comma into command name and parameters.
    pub fn split(&self) -> (&str, &str) {
        self.text.split_once(',').unwrap_or((self.text.as_str(), ""))
    }
}

/// Collects bytes from a client into `;`-terminated frames.
#[derive(Clone, Debug)]
pub struct CommandAssembler {
    buffer: String,
    received: usize,
    capacity: usize,
}

impl CommandAssembler {
    /// Creates an assembler that stores at most `capacity` characters per command.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: String::with_capacity(capacity),
            received: 0,
            capacity,
        }
    }

    /// Feeds one byte; returns the frame when `byte` terminates a command.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        match byte {
            b',' | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' => {
                if self.received < self.capacity {
                    self.buffer.push(char::from(byte));
                }
                self.received += 1;
                None
            }
            b';' => {
                let frame = Frame {
                    text: std::mem::take(&mut self.buffer),
                    overrun: self.received > self.capacity,
                };
                self.received = 0;
                Some(frame)
            }
            _ => None,
        }
    }

    /// Number of accepted characters since the last terminator, including
    /// those that did not fit.
    pub const fn pending(&self) -> usize {
        self.received
    }
}

/// A parsed command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Stop the simulation.
    Stop,
    /// Start a bus or ROM access.
    Access(PendingAccess),
}

/// Parses a command from its name and parameters.
///
/// # Arguments
///
/// * `name` - Text before the first comma.
/// * `params` - Text after the first comma.
/// * `max_access_size` - Largest byte count accepted.
pub fn parse_command(name: &str, params: &str, max_access_size: usize) -> Result<Command, ProtocolError> {
    if name == "Stop" {
        return Ok(Command::Stop);
    }
    let command = AccessCommand::from_wire_name(name).ok_or(ProtocolError::UnknownCommand)?;

    let (address, rest) = parse_address(params)?;
    let (count, rest) = parse_count(rest)?;
    if count > max_access_size {
        return Err(ProtocolError::AccessTooLarge);
    }

    if command != AccessCommand::Write {
        return Ok(Command::Access(PendingAccess::read(command, address, count)));
    }

    let data = rest.split_once(',').map_or("", |(_, data)| data);
    if data.len() != 2 * count {
        return Err(ProtocolError::DataSizeIncorrect);
    }
    let bytes = data
        .as_bytes()
        .chunks(2)
        .map(|pair| Some((hex_value(pair[0])? << 4) | hex_value(pair[1])?))
        .collect::<Option<Vec<u8>>>()
        .ok_or(ProtocolError::SyntaxError)?;
    Ok(Command::Access(PendingAccess::write(address, &bytes)))
}

/// Parses 1 to 8 hex digits followed by a comma.
fn parse_address(params: &str) -> Result<(u32, &str), ProtocolError> {
    let digits = params.bytes().take(8).take_while(u8::is_ascii_hexdigit).count();
    if digits == 0 || params.as_bytes().get(digits) != Some(&b',') {
        return Err(ProtocolError::SyntaxError);
    }
    let address = u32::from_str_radix(&params[..digits], 16).map_err(|_| ProtocolError::SyntaxError)?;
    Ok((address, &params[digits + 1..]))
}

/// Parses a decimal count; anything after the digits is left to the caller.
fn parse_count(params: &str) -> Result<(usize, &str), ProtocolError> {
    let digits = params.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return Err(ProtocolError::SyntaxError);
    }
    // A count too large for usize is certainly too large for an access.
    let count = params[..digits].parse().map_err(|_| ProtocolError::AccessTooLarge)?;
    Ok((count, &params[digits..]))
}

const fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Renders `Error,<name>,<error>;`.
///
/// If that reply would not fit in `reply_capacity` characters, the command name is
/// replaced by [`NAME_OVERRUN`].
pub fn render_error(name: &str, error: ProtocolError, reply_capacity: usize) -> String {
    let reply = format!("Error,{name},{error};");
    if reply.len() > reply_capacity {
        format!("Error,{NAME_OVERRUN},{error};")
    } else {
        reply
    }
}

/// Renders the reply to `Stop`.
pub fn render_stop() -> String {
    "OK,Stop;".to_owned()
}

/// Renders the reply for a completed access.
pub fn render_completion(access: &PendingAccess) -> String {
    let name = access.command().wire_name();
    let address = access.address();
    let count = access.count();
    match access.outcome() {
        AccessOutcome::Ok => {
            let mut reply = format!("OK,{name},OK,{address:08X},{count}");
            if access.command() != AccessCommand::Write {
                let data: String = access.data().iter().map(|byte| format!("{byte:02X}")).collect();
                reply.push(',');
                reply.push_str(&data);
            }
            reply.push(';');
            reply
        }
        AccessOutcome::Fault(code) => format!("OK,{name},Fault,{address:08X},{count},{code:08X};"),
        AccessOutcome::Error | AccessOutcome::Pending => render_error(name, ProtocolError::SimulatorError, usize::MAX),
    }
}
