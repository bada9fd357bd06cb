//! Byte path behaviour through the public API
//!
//! Covers reassembly, noise and corruption handling, the scan bound and the
//! exact datagram text produced for real device payloads.

use powermaster::protocol::{FrameAssembler, crc8, encode_command};
use powermaster::{Pipeline, PipelineStats, STX, format_record};
use proptest::prelude::*;

fn stream() -> Vec<u8> {
    let mut bytes = encode_command("D1");
    bytes.extend(encode_command("D,120.0,0.5,1.05,1;0;0;1;0"));
    bytes.extend(encode_command("D,100.0,2.5,1.38"));
    bytes.extend(encode_command("D,50.0,1.0,1.33,0;0;0;0;1"));
    bytes
}

fn datagrams(pipeline: &mut Pipeline, bytes: &[u8]) -> Vec<String> {
    pipeline.ingest(bytes).iter().map(format_record).collect()
}

#[test]
fn device_stream_becomes_datagrams() {
    let mut pipeline = Pipeline::default();

    assert_eq!(
        datagrams(&mut pipeline, &stream()),
        vec![
            "vswr_read:true:forward:120.0:reflected:0.5:vswr:1.05:vswr_alarm:true:low_power_alarm:false:high_power_alarm:false:red_led:true:yellow_led:false",
            "vswr_read:true:forward:100.0:reflected:2.5:vswr:1.38",
            "vswr_read:true:forward:50.0:reflected:1.0:vswr:1.33:vswr_alarm:false:low_power_alarm:false:high_power_alarm:false:red_led:false:yellow_led:true",
        ]
    );
    assert_eq!(
        pipeline.stats(),
        PipelineStats {
            bytes_received: stream().len() as u64,
            frames: 4,
            records: 3,
            ignored: 1,
            ..PipelineStats::default()
        }
    );
}

#[test]
fn start_command_matches_device_capture() {
    assert_eq!(encode_command("D1"), [0x02, 0x44, 0x31, 0x03, 0x43, 0x30, 0x0D]);
}

#[test]
fn clamped_values_are_formatted() {
    let mut pipeline = Pipeline::default();

    let out = datagrams(&mut pipeline, &encode_command("D,5.0,0.0,0.3"));
    assert_eq!(out, vec!["vswr_read:false:forward:5.0:reflected:0.0:vswr:1.00"]);

    let out = datagrams(&mut pipeline, &encode_command("D,-5,0,1.2"));
    assert_eq!(out, vec!["vswr_read:true:forward:0.0:reflected:0.0:vswr:1.20"]);
}

#[test]
fn overrun_clears_buffer_and_recovers() {
    let mut pipeline = Pipeline::default();
    let mut bytes = vec![STX];
    bytes.extend(std::iter::repeat_n(b'7', 1100));

    assert!(pipeline.ingest(&bytes).is_empty());
    assert_eq!(pipeline.buffered(), 0);
    assert_eq!(pipeline.stats().frames_too_long, 1);

    let out = datagrams(&mut pipeline, &encode_command("D,100.0,2.5,1.38"));
    assert_eq!(out.len(), 1);
}

#[test]
fn frame_split_across_many_reads() {
    let mut pipeline = Pipeline::default();
    let mut records = Vec::new();
    for byte in stream() {
        records.extend(pipeline.ingest(&[byte]));
    }
    assert_eq!(records.len(), 3);
    assert_eq!(pipeline.buffered(), 0);
}

proptest! {
    #[test]
    fn crc_round_trip(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let [high, low] = crc8::to_hex(crc8::compute(&bytes));
        prop_assert!(crc8::verify(&bytes, high, low).unwrap());
    }

    #[test]
    fn chunking_does_not_change_frames(cuts in proptest::collection::vec(0usize..200, 0..12)) {
        let bytes = stream();
        let mut whole = FrameAssembler::new();
        let expected = whole.ingest(&bytes);

        let mut cuts: Vec<usize> = cuts.into_iter().map(|c| c % (bytes.len() + 1)).collect();
        cuts.sort_unstable();

        let mut assembler = FrameAssembler::new();
        let mut frames = Vec::new();
        let mut start = 0;
        for cut in cuts.into_iter().chain(std::iter::once(bytes.len())) {
            frames.extend(assembler.ingest(&bytes[start..cut]));
            start = cut;
        }
        prop_assert_eq!(frames, expected);
    }

    #[test]
    fn leading_garbage_is_discarded(
        garbage in proptest::collection::vec(
            any::<u8>().prop_filter("no STX", |b| *b != STX),
            0..40,
        ),
    ) {
        let frame = encode_command("D,100.0,2.5,1.38");
        let mut bytes = garbage.clone();
        bytes.extend(&frame);

        let mut assembler = FrameAssembler::new();
        let frames = assembler.ingest(&bytes);
        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(frames[0].as_bytes(), frame.as_slice());
        prop_assert_eq!(assembler.noise_bytes(), garbage.len() as u64);
    }

    #[test]
    fn single_byte_corruption_drops_only_that_frame(
        index in 1usize..17,
        replacement in 0x20u8..0x7F,
    ) {
        let mut corrupt = encode_command("D,100.0,2.5,1.38");
        prop_assume!(corrupt[index] != replacement);
        corrupt[index] = replacement;

        let mut bytes = corrupt;
        bytes.extend(encode_command("D,50.0,1.0,1.33"));

        let mut pipeline = Pipeline::default();
        let records = pipeline.ingest(&bytes);
        prop_assert_eq!(records.len(), 1);
        prop_assert_eq!(records[0].forward_power, 50.0);
        prop_assert_eq!(pipeline.stats().discarded(), 1);
    }
}
