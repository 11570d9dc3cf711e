mod common;

use rans_codec::{compress, decompress, Order};

use crate::common::large_random_bytes;

#[test]
fn scenario_ababa_order0() {
    let input = b"ABABA";
    let frame = compress(input, Order::Zero).unwrap();
    assert_eq!(decompress(&frame).unwrap(), input);
}

#[test]
fn scenario_run_of_4096_order0() {
    let input = vec![0x41u8; 4096];
    let frame = compress(&input, Order::Zero).unwrap();
    assert_eq!(decompress(&frame).unwrap(), input);
}

#[test]
fn scenario_abababab_order1() {
    let input = b"ABABABAB";
    let frame = compress(input, Order::One).unwrap();
    assert_eq!(frame[0], 1);
    assert_eq!(decompress(&frame).unwrap(), input);
}

#[test]
fn scenario_all_256_byte_values_order0() {
    let input: Vec<u8> = (0..=255u8).collect();
    let frame = compress(&input, Order::Zero).unwrap();
    assert_eq!(decompress(&frame).unwrap(), input);
}

#[test]
fn scenario_million_random_bytes_both_orders() {
    let input = large_random_bytes(0xC0FFEE);

    let frame0 = compress(&input, Order::Zero).unwrap();
    assert_eq!(decompress(&frame0).unwrap(), input);
    assert!(frame0.len() < input.len() + 1000);

    let frame1 = compress(&input, Order::One).unwrap();
    assert_eq!(decompress(&frame1).unwrap(), input);
    assert!(frame1.len() < input.len() + 1000);
}

#[test]
fn scenario_corrupted_length_field_is_rejected() {
    let input = b"ABABA";
    let mut frame = compress(input, Order::Zero).unwrap();
    frame[1..5].copy_from_slice(&0xdead_beefu32.to_le_bytes());
    assert!(decompress(&frame).is_err());
}

#[test]
fn order1_beats_order0_on_markovian_input() {
    // alternating pairs are near-incompressible under order-0 (roughly 50/50
    // per symbol) but almost free under order-1 (each byte almost always
    // predicts the next).
    let input: Vec<u8> = (0..20_000).map(|i| if i % 2 == 0 { b'A' } else { b'B' }).collect();
    let frame0 = compress(&input, Order::Zero).unwrap();
    let frame1 = compress(&input, Order::One).unwrap();
    assert!(frame1.len() < frame0.len());
    assert_eq!(decompress(&frame1).unwrap(), input);
}

#[test]
fn order1_falls_back_to_order0_frame_below_4_bytes() {
    for input in [&b""[..], &b"a"[..], &b"ab"[..], &b"abc"[..]] {
        let frame = compress(input, Order::One).unwrap();
        assert_eq!(frame[0], 0, "expected order-0 fallback for {} bytes", input.len());
        assert_eq!(decompress(&frame).unwrap(), input);
    }
}

#[test]
fn empty_input_round_trips_both_orders() {
    for order in [Order::Zero, Order::One] {
        let frame = compress(&[], order).unwrap();
        assert!(decompress(&frame).unwrap().is_empty());
    }
}

#[test]
fn truncated_frame_is_rejected_not_panicking() {
    let input = large_random_bytes(7);
    let frame = compress(&input, Order::One).unwrap();
    for cut in [0, 1, 9, frame.len() / 2, frame.len() - 1] {
        assert!(decompress(&frame[..cut]).is_err());
    }
}

#[test]
fn frame_integrity_fields_match_actual_lengths() {
    let input = large_random_bytes(99);
    for order in [Order::Zero, Order::One] {
        let frame = compress(&input, order).unwrap();
        let body_len = u32::from_le_bytes(frame[1..5].try_into().unwrap());
        assert_eq!(body_len as usize, frame.len() - 9);
        let decoded_len = u32::from_le_bytes(frame[5..9].try_into().unwrap());
        assert_eq!(decoded_len as usize, decompress(&frame).unwrap().len());
    }
}

#[test]
fn compress_is_deterministic() {
    let input = large_random_bytes(314);
    assert_eq!(
        compress(&input, Order::One).unwrap(),
        compress(&input, Order::One).unwrap()
    );
}

#[test]
fn lane_starts_align_with_quarter_boundaries() {
    // Each lane's first decoded byte lands at k * floor(N/4) for k = 0..4.
    let input = large_random_bytes(2024);
    let quarter = input.len() / 4;
    let frame = compress(&input, Order::One).unwrap();
    let decoded = decompress(&frame).unwrap();
    assert_eq!(decoded, input);
    for k in 0..4 {
        assert_eq!(decoded[k * quarter], input[k * quarter]);
    }
}
