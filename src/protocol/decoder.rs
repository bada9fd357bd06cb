//! Frame validation and payload decoding
//!
//! A frame is accepted only when ETX sits directly before the two checksum
//! characters and the checksum matches the payload. Accepted payloads are
//! comma separated ASCII; the real-time report carries the tag `D`:
//!
//! ```text
//! D,<forward>,<reflected>,<vswr>[,<vswr_alarm>;<low_power>;<high_power>;<red_led>;<yellow_led>]
//! ```
//!
//! Every other tag (command echoes, query answers) is recognised and ignored.

use crate::error::FrameError;
use crate::protocol::crc8;
use crate::types::{ETX, Frame, MIN_FRAME_LEN, StatusFlags, TelemetryRecord};

/// Tag of the real-time report payload.
pub const REPORT_TAG: &str = "D";

/// Outcome of decoding a frame that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A real-time report
    Telemetry(TelemetryRecord),

    /// A valid frame that carries no telemetry, e.g. a command echo
    Ignored { tag: String },
}

impl Decoded {
    /// The record, if this was a report.
    pub fn into_record(self) -> Option<TelemetryRecord> {
        match self {
            Decoded::Telemetry(record) => Some(record),
            Decoded::Ignored { .. } => None,
        }
    }
}

/// Validate `frame` and decode its payload.
pub fn decode(frame: &Frame) -> Result<Decoded, FrameError> {
    let payload = validate(frame)?;

    let text = std::str::from_utf8(payload)
        .map_err(|e| FrameError::parse(format!("payload is not ASCII: {e}")))?;
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();

    if fields.len() < 4 || fields[0] != REPORT_TAG {
        return Ok(Decoded::Ignored { tag: fields[0].to_string() });
    }

    let forward = parse_reading("forward power", fields[1])?;
    let reflected = parse_reading("reflected power", fields[2])?;
    let vswr = parse_reading("vswr", fields[3])?;
    let status = fields.get(4).and_then(|field| StatusFlags::from_fields(field.split(';')));

    Ok(Decoded::Telemetry(TelemetryRecord::from_readings(forward, reflected, vswr, status)))
}

/// Check framing and checksum, returning the payload between STX and ETX.
pub fn validate(frame: &Frame) -> Result<&[u8], FrameError> {
    let bytes = frame.as_bytes();
    if bytes.len() < MIN_FRAME_LEN {
        return Err(FrameError::MissingDelimiter);
    }

    // ETX must be the first delimiter after STX and sit right before `hi lo TERM`
    let checksum_at = bytes.len() - 3;
    let etx = bytes[1..checksum_at]
        .iter()
        .position(|&b| b == ETX)
        .map(|offset| offset + 1)
        .ok_or(FrameError::MissingDelimiter)?;
    if etx != checksum_at - 1 {
        return Err(FrameError::MissingDelimiter);
    }

    let payload = &bytes[1..etx];
    let (high, low) = (bytes[checksum_at], bytes[checksum_at + 1]);
    if crc8::verify(payload, high, low)? {
        Ok(payload)
    } else {
        Err(FrameError::ChecksumMismatch {
            expected: crc8::decode_hex(high, low)?,
            actual: crc8::compute(payload),
        })
    }
}

fn parse_reading(name: &str, field: &str) -> Result<f64, FrameError> {
    match field.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        Ok(value) => Err(FrameError::parse(format!("{name} is not finite: {value}"))),
        Err(e) => Err(FrameError::parse(format!("{name} {field:?}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_command;
    use crate::types::{STX, TERM};

    fn frame(bytes: Vec<u8>) -> Frame {
        Frame::try_from(bytes).expect("test frame must be bounded by STX/TERM")
    }

    fn decode_payload(payload: &str) -> Result<Decoded, FrameError> {
        decode(&frame(encode_command(payload)))
    }

    #[test]
    fn decodes_report_without_status() {
        let record = decode_payload("D,100.0,2.5,1.38").unwrap().into_record().unwrap();
        assert!(record.vswr_valid);
        assert_eq!(record.forward_power, 100.0);
        assert_eq!(record.reflected_power, 2.5);
        assert_eq!(record.vswr, 1.38);
        assert_eq!(record.status, None);
    }

    #[test]
    fn decodes_report_with_status() {
        let record = decode_payload("D,120.0,0.5,1.05,1;0;0;1;0").unwrap().into_record().unwrap();
        let status = record.status.unwrap();
        assert!(status.vswr_alarm);
        assert!(!status.low_power_alarm);
        assert!(!status.high_power_alarm);
        assert!(status.red_led);
        assert!(!status.yellow_led);
    }

    #[test]
    fn trims_whitespace_around_fields() {
        let record = decode_payload("D, 12.5 , 0.1 , 1.10 ").unwrap().into_record().unwrap();
        assert_eq!(record.forward_power, 12.5);
        assert_eq!(record.reflected_power, 0.1);
        assert_eq!(record.vswr, 1.10);
    }

    #[test]
    fn clamps_out_of_range_readings() {
        let record = decode_payload("D,-5,0,0.3").unwrap().into_record().unwrap();
        assert!(!record.vswr_valid);
        assert_eq!(record.vswr, 1.0);
        assert_eq!(record.forward_power, 0.0);
    }

    #[test]
    fn wrong_status_arity_leaves_status_unset() {
        let record = decode_payload("D,50.0,1.0,1.33,0;0;1").unwrap().into_record().unwrap();
        assert_eq!(record.status, None);
    }

    #[test]
    fn command_echo_is_ignored() {
        assert_eq!(decode_payload("D1").unwrap(), Decoded::Ignored { tag: "D1".to_string() });
        assert_eq!(decode_payload("M?").unwrap(), Decoded::Ignored { tag: "M?".to_string() });
    }

    #[test]
    fn other_tags_and_short_reports_are_ignored() {
        assert!(matches!(decode_payload("X,1,2,3"), Ok(Decoded::Ignored { .. })));
        assert!(matches!(decode_payload("D,1,2"), Ok(Decoded::Ignored { .. })));
        assert!(matches!(decode_payload(""), Ok(Decoded::Ignored { tag }) if tag.is_empty()));
    }

    #[test]
    fn unparsable_number_is_a_parse_failure() {
        let err = decode_payload("D,abc,0.5,1.1").unwrap_err();
        assert!(matches!(err, FrameError::PayloadParseFailure { .. }));
        assert!(err.to_string().contains("forward power"));

        for payload in ["D,1.0,0.5,NaN", "D,inf,0.5,1.1"] {
            assert!(matches!(decode_payload(payload), Err(FrameError::PayloadParseFailure { .. })));
        }
    }

    #[test]
    fn non_ascii_payload_is_a_parse_failure() {
        let payload = [b'D', b',', 0xFF, 0xFE];
        let [high, low] = crc8::to_hex(crc8::compute(&payload));
        let mut bytes = vec![STX];
        bytes.extend(payload);
        bytes.extend([ETX, high, low, TERM]);

        assert!(matches!(decode(&frame(bytes)), Err(FrameError::PayloadParseFailure { .. })));
    }

    #[test]
    fn mutated_payload_fails_checksum() {
        let mut bytes = encode_command("D,100.0,2.5,1.38");
        bytes[3] = b'2';

        match decode(&frame(bytes)) {
            Err(FrameError::ChecksumMismatch { expected, actual }) => assert_ne!(expected, actual),
            other => panic!("expected checksum mismatch, got {other:?}"),
        }
    }

    #[test]
    fn non_hex_checksum_is_malformed() {
        let bytes = vec![STX, b'D', b'1', ETX, b'Z', b'0', TERM];
        assert_eq!(decode(&frame(bytes)), Err(FrameError::MalformedChecksum { digit: b'Z' }));
    }

    #[test]
    fn missing_etx_is_missing_delimiter() {
        let bytes = vec![STX, b'D', b'1', b'x', b'C', b'0', TERM];
        assert_eq!(decode(&frame(bytes)), Err(FrameError::MissingDelimiter));
    }

    #[test]
    fn misplaced_etx_is_missing_delimiter() {
        // ETX inside the payload, four bytes before TERM would be 'x'
        let bytes = vec![STX, b'D', ETX, b'1', b'x', b'C', b'0', TERM];
        assert_eq!(decode(&frame(bytes)), Err(FrameError::MissingDelimiter));
    }

    #[test]
    fn too_short_frame_is_missing_delimiter() {
        assert_eq!(decode(&frame(vec![STX, TERM])), Err(FrameError::MissingDelimiter));
        assert_eq!(decode(&frame(vec![STX, ETX, b'F', TERM])), Err(FrameError::MissingDelimiter));
    }

    #[test]
    fn empty_payload_with_valid_checksum_is_ignored() {
        let bytes = vec![STX, ETX, b'F', b'F', TERM];
        assert_eq!(decode(&frame(bytes)), Ok(Decoded::Ignored { tag: String::new() }));
    }
}
