//! Streaming session lifecycle

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a session is in its lifecycle.
///
/// ```text
/// Idle --start--> Streaming --stop--> Stopped --start--> Streaming
///                     |
///                     +--forward failure--> Halted --start--> Streaming
///
/// any --source ends--> Ended
/// any --source fails--> Failed
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StreamState {
    /// Source open, start command not sent yet
    #[default]
    Idle,

    /// Start command sent, records are forwarded
    Streaming,

    /// Forwarding failed; stop command sent and buffers cleared
    Halted { reason: String },

    /// Stopped on request
    Stopped,

    /// The byte source reached its end
    Ended,

    /// The byte source failed
    Failed { reason: String },
}

impl StreamState {
    pub fn is_streaming(&self) -> bool {
        matches!(self, StreamState::Streaming)
    }

    /// True once the driver has exited and no further transitions happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Ended | StreamState::Failed { .. })
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Idle => f.write_str("idle"),
            StreamState::Streaming => f.write_str("streaming"),
            StreamState::Halted { reason } => write!(f, "halted ({reason})"),
            StreamState::Stopped => f.write_str("stopped"),
            StreamState::Ended => f.write_str("ended"),
            StreamState::Failed { reason } => write!(f, "failed ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(StreamState::Ended.is_terminal());
        assert!(StreamState::Failed { reason: "eio".into() }.is_terminal());
        assert!(!StreamState::Halted { reason: "unreachable".into() }.is_terminal());
        assert!(!StreamState::Stopped.is_terminal());
        assert!(StreamState::Streaming.is_streaming());
    }

    #[test]
    fn serializes_with_state_tag() {
        let halted = StreamState::Halted { reason: "down".into() };
        let yaml = serde_yaml_ng::to_string(&halted).unwrap();
        assert!(yaml.contains("state: halted"));
        assert!(yaml.contains("reason: down"));
    }
}
