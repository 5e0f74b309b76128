//! Property-based tests using proptest

use monoframe::bits::{deframe_bits, frame_bits, BitString};
use monoframe::config::{self, CheckMode, FrameGeometry};
use monoframe::payload::{deframe_payload, frame_payload, FileMetadata};
use monoframe::raster::{extract_bits, render_frame};
use monoframe::{FrameStreamDecoder, FrameStreamEncoder, MemorySink, MemorySource, MonoframeConfig};
use proptest::prelude::*;

/// Payload bytes and a shuffled order of their indices.
fn payload_and_order() -> impl Strategy<Value = (Vec<u8>, Vec<usize>)> {
    prop::collection::vec(any::<u8>(), 2..64).prop_flat_map(|payload| {
        let order: Vec<usize> = (0..payload.len()).collect();
        (Just(payload), Just(order).prop_shuffle())
    })
}

fn geometry_strategy() -> impl Strategy<Value = FrameGeometry> {
    (1u32..12, 1u32..12, 1u32..6).prop_map(|(bx, by, bs)| {
        FrameGeometry::new(bx * bs, by * bs, bs).expect("aligned non-zero geometry")
    })
}

proptest! {
    #[test]
    fn prop_bit_framer_round_trip(
        payload in prop::collection::vec(any::<u8>(), 0..512),
        ecc in 0u8..=8,
    ) {
        let bits = frame_bits(&payload, ecc);
        prop_assert_eq!(bits.len(), payload.len() * config::bits_per_byte(ecc));
        prop_assert_eq!(deframe_bits(&bits, ecc, CheckMode::Strict).unwrap(), payload);
    }

    #[test]
    fn prop_payload_round_trip(
        creation in -1.0e10f64..1.0e10,
        modification in -1.0e10f64..1.0e10,
        archive in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let metadata = FileMetadata { creation_time: creation, modification_time: modification };
        let payload = frame_payload(&metadata, &archive).unwrap();
        let (decoded, rest) = deframe_payload(&payload).unwrap();
        prop_assert_eq!(decoded, metadata);
        prop_assert_eq!(rest, &archive[..]);
    }

    #[test]
    fn prop_raster_inverse(
        geometry in geometry_strategy(),
        seed in prop::collection::vec(any::<bool>(), 144),
    ) {
        let bits: BitString = seed.into_iter().take(geometry.bits_per_frame()).collect();
        let frame = render_frame(0, &bits, &geometry);
        prop_assert!(frame.as_raw().iter().all(|&p| p == config::BLACK || p == config::WHITE));

        let mut out = BitString::new();
        extract_bits(&frame, &geometry, &mut out).unwrap();
        prop_assert_eq!(out, bits);
    }

    #[test]
    fn prop_frame_count_and_stream_round_trip(
        payload in prop::collection::vec(any::<u8>(), 1..200),
        blocks_x in 1u32..9,
        blocks_y in 1u32..9,
    ) {
        let cfg = MonoframeConfig {
            frame_width: blocks_x * 2,
            frame_height: blocks_y * 2,
            block_size: 2,
            check_mode: CheckMode::Strict,
            ..Default::default()
        };
        let bits_per_frame = (blocks_x * blocks_y) as usize;
        let expected_frames = (16 * payload.len()).div_ceil(bits_per_frame);

        let mut sink = MemorySink::new();
        let written = FrameStreamEncoder::new(&cfg).unwrap().encode_payload(&payload, &mut sink).unwrap();
        prop_assert_eq!(written, expected_frames);
        prop_assert_eq!(sink.frames.len(), expected_frames);

        let decoded = FrameStreamDecoder::new(&cfg)
            .unwrap()
            .decode_payload(&mut MemorySource::new(sink.into_frames()))
            .unwrap();
        // whole 16-bit chunks of padding decode as trailing zero bytes
        let padding_bytes = (expected_frames * bits_per_frame - 16 * payload.len()) / 16;
        prop_assert_eq!(&decoded[..payload.len()], &payload[..]);
        prop_assert_eq!(decoded.len(), payload.len() + padding_bytes);
        prop_assert!(decoded[payload.len()..].iter().all(|&b| b == 0));
    }

    #[test]
    fn prop_permuted_frames_change_output((payload, order) in payload_and_order()) {
        // 4x4 grid of 1px blocks: frame i carries exactly payload byte i
        let cfg = MonoframeConfig {
            frame_width: 4,
            frame_height: 4,
            block_size: 1,
            ..Default::default()
        };
        prop_assume!(order.iter().enumerate().any(|(to, &from)| payload[from] != payload[to]));

        let mut sink = MemorySink::new();
        FrameStreamEncoder::new(&cfg).unwrap().encode_payload(&payload, &mut sink).unwrap();
        let frames = sink.into_frames();
        prop_assert_eq!(frames.len(), payload.len());

        let permuted: Vec<_> = order.iter().map(|&from| frames[from].clone()).collect();
        let decoded = FrameStreamDecoder::new(&cfg)
            .unwrap()
            .decode_payload(&mut MemorySource::new(permuted))
            .unwrap();

        let expected: Vec<u8> = order.iter().map(|&from| payload[from]).collect();
        prop_assert_ne!(&decoded, &payload);
        prop_assert_eq!(decoded, expected);
    }
}
