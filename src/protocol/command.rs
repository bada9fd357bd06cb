//! Outbound control frames

use std::fmt;

use crate::protocol::crc8;
use crate::types::{ETX, STX, TERM};

/// Wrap `tag` as `STX tag ETX hi lo TERM` with an uppercase hex checksum.
///
/// ```rust
/// use powermaster::protocol::encode_command;
///
/// assert_eq!(encode_command("D1"), [0x02, 0x44, 0x31, 0x03, 0x43, 0x30, 0x0D]);
/// ```
pub fn encode_command(tag: &str) -> Vec<u8> {
    let payload = tag.as_bytes();
    let [high, low] = crc8::to_hex(crc8::compute(payload));

    let mut frame = Vec::with_capacity(payload.len() + 5);
    frame.push(STX);
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[ETX, high, low, TERM]);
    frame
}

/// The two control commands the bridge sends to the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamCommand {
    /// Begin real-time reports (`D1`)
    Start,
    /// End real-time reports (`D0`)
    Stop,
}

impl StreamCommand {
    /// ASCII payload of the command.
    pub fn tag(self) -> &'static str {
        match self {
            StreamCommand::Start => "D1",
            StreamCommand::Stop => "D0",
        }
    }

    /// Complete wire frame for the command.
    pub fn encode(self) -> Vec<u8> {
        encode_command(self.tag())
    }
}

impl fmt::Display for StreamCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamCommand::Start => write!(f, "start-stream ({})", self.tag()),
            StreamCommand::Stop => write!(f, "stop-stream ({})", self.tag()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_matches_device_capture() {
        assert_eq!(StreamCommand::Start.encode(), vec![0x02, 0x44, 0x31, 0x03, 0x43, 0x30, 0x0D]);
    }

    #[test]
    fn stop_matches_device_capture() {
        assert_eq!(StreamCommand::Stop.encode(), vec![0x02, 0x44, 0x30, 0x03, 0x37, 0x31, 0x0D]);
    }

    #[test]
    fn mode_button_frames_match_captures() {
        assert_eq!(encode_command("M4"), vec![0x02, 0x4D, 0x34, 0x03, 0x35, 0x32, 0x0D]);
        assert_eq!(encode_command("M?"), vec![0x02, 0x4D, 0x3F, 0x03, 0x31, 0x45, 0x0D]);
    }

    #[test]
    fn encoding_is_deterministic() {
        assert_eq!(encode_command("D,1.0,2.0,1.5"), encode_command("D,1.0,2.0,1.5"));
    }

    #[test]
    fn display_names_command() {
        assert_eq!(StreamCommand::Stop.to_string(), "stop-stream (D0)");
    }
}
