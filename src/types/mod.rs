//! Core types for the PowerMaster wire protocol and decoded telemetry.
//!
//! - [`Frame`] is one complete `STX ... TERM` unit as cut from the byte stream
//! - [`TelemetryRecord`] is a decoded real-time report, already clamped
//! - [`StatusFlags`] carries the optional alarm/LED field of a report
//! - [`UpdateRate`] controls how often subscribers see records
//! - [`StreamState`] tracks the streaming session lifecycle
//!
//! ## Usage Example
//!
//! ```rust
//! use powermaster::types::{StatusFlags, TelemetryRecord};
//!
//! let status = StatusFlags::from_fields("1;0;0;1;0".split(';'));
//! let record = TelemetryRecord::from_readings(120.0, 0.5, 0.9, status);
//!
//! assert!(!record.vswr_valid);
//! assert_eq!(record.vswr, 1.0);
//! assert!(record.status.unwrap().red_led);
//! ```

mod frame;
mod state;
mod telemetry;
mod update_rate;

pub use frame::{ETX, Frame, MIN_FRAME_LEN, STX, TERM};
pub use state::StreamState;
pub use telemetry::{StatusFlags, TelemetryRecord};
pub use update_rate::UpdateRate;
