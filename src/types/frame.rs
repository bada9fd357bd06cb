//! Frame type and wire markers

use std::fmt;

/// Start-of-text marker, first byte of every frame.
pub const STX: u8 = 0x02;

/// End-of-text marker, closes the payload.
pub const ETX: u8 = 0x03;

/// Line terminator, last byte of every frame.
pub const TERM: u8 = 0x0D;

/// Smallest possible frame: `STX ETX hi lo TERM` with an empty payload.
pub const MIN_FRAME_LEN: usize = 5;

/// One complete `STX ... TERM` protocol unit.
///
/// The first byte is always [`STX`] and the last byte is always [`TERM`].
/// Frames produced by the assembler are immutable; the decoder only reads
/// them.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Wrap bytes already known to start with STX and end with TERM.
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        debug_assert_eq!(bytes.first(), Some(&STX));
        debug_assert_eq!(bytes.last(), Some(&TERM));
        Self { bytes }
    }

    /// Raw frame bytes including markers.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Frame length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a frame holds at least its two markers.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consume the frame and return its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl TryFrom<Vec<u8>> for Frame {
    type Error = Vec<u8>;

    /// Accepts any byte vector bounded by STX and TERM, handing it back otherwise.
    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() >= 2 && bytes.first() == Some(&STX) && bytes.last() == Some(&TERM) {
            Ok(Self { bytes })
        } else {
            Err(bytes)
        }
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Frame[")?;
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_from_checks_markers() {
        let ok = Frame::try_from(vec![STX, b'D', b'1', ETX, b'C', b'0', TERM]).unwrap();
        assert_eq!(ok.len(), 7);

        assert!(Frame::try_from(vec![b'D', ETX, TERM]).is_err());
        assert!(Frame::try_from(vec![STX, b'D', ETX]).is_err());
        assert!(Frame::try_from(vec![STX]).is_err());
    }

    #[test]
    fn debug_renders_hex() {
        let frame = Frame::new(vec![STX, b'D', b'0', ETX, b'7', b'1', TERM]);
        assert_eq!(format!("{frame:?}"), "Frame[02 44 30 03 37 31 0D]");
    }
}
