//! PowerMaster serial protocol.
//!
//! ## Wire Format
//!
//! Both directions use the same framing:
//!
//! ```text
//! STX(0x02) <payload> ETX(0x03) <hex-high> <hex-low> TERM(0x0D)
//! ```
//!
//! The checksum covers the payload only and is sent as two uppercase ASCII
//! hex digits (see [`crc8`]).
//!
//! ## Layers
//!
//! 1. [`FrameAssembler`] cuts frames out of the raw byte stream
//! 2. [`decode`] validates a frame and turns report payloads into records
//! 3. [`encode_command`] builds outbound control frames

pub mod assembler;
pub mod command;
pub mod crc8;
pub mod decoder;

pub use assembler::{DEFAULT_MAX_SCAN, FrameAssembler};
pub use command::{StreamCommand, encode_command};
pub use decoder::{Decoded, REPORT_TAG, decode, validate};
