//! Frame orchestration: the 9-byte header, the four-lane interleave, and the
//! public [`compress`]/[`decompress`] entry points.
//!
//! Encoding always happens backward (high input index towards low) so that
//! forward decoding pops symbols in their original order; the four lanes
//! are pushed in program order 3, 2, 1, 0 so that decoding's natural
//! ascending loop pops them 0, 1, 2, 3.

use anyhow::{anyhow, ensure, Result};

use crate::rans::model::{Order0Model, Order1Model};
use crate::rans::state::{
    dec_advance_symbol, dec_get, dec_init, enc_flush, enc_init, enc_put_symbol, BackwardWriter,
    ForwardReader,
};
use crate::rans::table_codec::{self, MAX_TABLE_SIZE};
use crate::rans::{L, TF_SHIFT, TOTFREQ};

/// Statistical model selector. `One` transparently falls back to `Zero` for
/// inputs shorter than 4 bytes (an order-1 model needs at least that much
/// data to populate a usable context table).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    Zero,
    One,
}

const HEADER_LEN: usize = 9;

fn output_capacity(n: usize) -> usize {
    let expanded = (1.05_f64 * n as f64).ceil() as usize;
    expanded + MAX_TABLE_SIZE + HEADER_LEN
}

fn write_header(buf: &mut [u8], order: u8, body_len: u32, n: u32) {
    buf[0] = order;
    buf[1..5].copy_from_slice(&body_len.to_le_bytes());
    buf[5..9].copy_from_slice(&n.to_le_bytes());
}

/// Compresses `input` with the given model `order`, producing a
/// self-contained frame. Never panics on malformed input (there's no such
/// thing on the encode side); fails only if an internal invariant is
/// somehow violated, matching the reference's "allocation failure" error
/// class.
pub fn compress(input: &[u8], order: Order) -> Result<Vec<u8>> {
    let order = if order == Order::One && input.len() < 4 {
        log::debug!("order-1 requested for {} bytes, falling back to order-0", input.len());
        Order::Zero
    } else {
        order
    };

    match order {
        Order::Zero => compress_order0(input),
        Order::One => compress_order1(input),
    }
}

/// Decompresses a frame produced by [`compress`]. Returns an error, never
/// a panic or partial output, for any malformed frame: too short, a size
/// field that disagrees with the actual frame length, an order byte outside
/// `{0, 1}`, or a cumulative frequency that overflows `TOTFREQ` while
/// parsing the table.
pub fn decompress(frame: &[u8]) -> Result<Vec<u8>> {
    ensure!(frame.len() >= HEADER_LEN, "frame shorter than the 9-byte header");

    let body_len = u32::from_le_bytes(frame[1..5].try_into().unwrap());
    ensure!(
        body_len as usize == frame.len() - HEADER_LEN,
        "frame size field disagrees with actual frame length"
    );

    match frame[0] {
        0 => decompress_order0(frame),
        1 => decompress_order1(frame),
        other => Err(anyhow!("unknown order byte {other}")),
    }
}

fn compress_order0(input: &[u8]) -> Result<Vec<u8>> {
    let n = input.len();
    log::debug!("compress order-0: {n} bytes");

    let model = Order0Model::build(input);

    let mut table_bytes = Vec::with_capacity(512);
    let enc_syms = table_codec::write_order0_table(&model, &mut table_bytes);
    debug_assert!(table_bytes.len() <= MAX_TABLE_SIZE);

    let out_cap = output_capacity(n);
    let mut buf = vec![0u8; out_cap];
    let table_end = HEADER_LEN + table_bytes.len();
    ensure!(table_end <= out_cap, "output buffer too small for frequency table");
    buf[HEADER_LEN..table_end].copy_from_slice(&table_bytes);

    let payload_len = {
        let mut writer = BackwardWriter::new(&mut buf[table_end..]);
        let mut states = [enc_init(); 4];

        let tail = n % 4;
        match tail {
            3 => {
                states[2] = enc_put_symbol(states[2], &mut writer, &enc_syms[input[n - 1] as usize]);
                states[1] = enc_put_symbol(states[1], &mut writer, &enc_syms[input[n - 2] as usize]);
                states[0] = enc_put_symbol(states[0], &mut writer, &enc_syms[input[n - 3] as usize]);
            }
            2 => {
                states[1] = enc_put_symbol(states[1], &mut writer, &enc_syms[input[n - 1] as usize]);
                states[0] = enc_put_symbol(states[0], &mut writer, &enc_syms[input[n - 2] as usize]);
            }
            1 => {
                states[0] = enc_put_symbol(states[0], &mut writer, &enc_syms[input[n - 1] as usize]);
            }
            _ => {}
        }

        let main_len = n - tail;
        let mut i = main_len;
        while i > 0 {
            let s3 = &enc_syms[input[i - 1] as usize];
            let s2 = &enc_syms[input[i - 2] as usize];
            let s1 = &enc_syms[input[i - 3] as usize];
            let s0 = &enc_syms[input[i - 4] as usize];
            states[3] = enc_put_symbol(states[3], &mut writer, s3);
            states[2] = enc_put_symbol(states[2], &mut writer, s2);
            states[1] = enc_put_symbol(states[1], &mut writer, s1);
            states[0] = enc_put_symbol(states[0], &mut writer, s0);
            i -= 4;
        }

        enc_flush(states[3], &mut writer);
        enc_flush(states[2], &mut writer);
        enc_flush(states[1], &mut writer);
        enc_flush(states[0], &mut writer);

        writer.written().len()
    };

    let src_start = out_cap - payload_len;
    buf.copy_within(src_start..out_cap, table_end);
    buf.truncate(table_end + payload_len);

    write_header(&mut buf, 0, (table_bytes.len() + payload_len) as u32, n as u32);
    Ok(buf)
}

fn decompress_order0(frame: &[u8]) -> Result<Vec<u8>> {
    ensure!(frame[0] == 0, "expected order-0 frame");
    let n = u32::from_le_bytes(frame[5..9].try_into().unwrap());

    let (table, table_len) = table_codec::read_order0_table(&frame[HEADER_LEN..], n)?;
    let payload = &frame[HEADER_LEN + table_len..];

    let mut out = vec![0u8; n as usize];
    let mut reader = ForwardReader::new(payload);
    let mut r = [0u32; 4];
    for slot in r.iter_mut() {
        *slot = dec_init(&mut reader)?;
    }

    let mask = TOTFREQ - 1;
    let out_end = (n as usize) & !3usize;
    let mut i = 0usize;
    while i < out_end {
        let m = [r[0] & mask, r[1] & mask, r[2] & mask, r[3] & mask];
        let c = [
            table.reverse[m[0] as usize],
            table.reverse[m[1] as usize],
            table.reverse[m[2] as usize],
            table.reverse[m[3] as usize],
        ];
        out[i] = c[0];
        out[i + 1] = c[1];
        out[i + 2] = c[2];
        out[i + 3] = c[3];

        for k in 0..4 {
            let sym = &table.syms[c[k] as usize];
            r[k] = (sym.freq as u32) * (r[k] >> TF_SHIFT) + m[k] - sym.start as u32;
        }
        for slot in r.iter_mut() {
            while *slot < L {
                *slot = (*slot << 8) | reader.read_byte()? as u32;
            }
        }

        i += 4;
    }

    match (n as usize) & 3 {
        0 => {}
        1 => {
            let c = table.reverse[dec_get(r[0]) as usize];
            r[0] = dec_advance_symbol(r[0], &mut reader, &table.syms[c as usize])?;
            out[out_end] = c;
        }
        2 => {
            let c0 = table.reverse[dec_get(r[0]) as usize];
            r[0] = dec_advance_symbol(r[0], &mut reader, &table.syms[c0 as usize])?;
            out[out_end] = c0;

            let c1 = table.reverse[dec_get(r[1]) as usize];
            r[1] = dec_advance_symbol(r[1], &mut reader, &table.syms[c1 as usize])?;
            out[out_end + 1] = c1;
        }
        3 => {
            let c0 = table.reverse[dec_get(r[0]) as usize];
            r[0] = dec_advance_symbol(r[0], &mut reader, &table.syms[c0 as usize])?;
            out[out_end] = c0;

            let c1 = table.reverse[dec_get(r[1]) as usize];
            r[1] = dec_advance_symbol(r[1], &mut reader, &table.syms[c1 as usize])?;
            out[out_end + 1] = c1;

            let c2 = table.reverse[dec_get(r[2]) as usize];
            r[2] = dec_advance_symbol(r[2], &mut reader, &table.syms[c2 as usize])?;
            out[out_end + 2] = c2;
        }
        _ => unreachable!(),
    }

    Ok(out)
}

fn compress_order1(input: &[u8]) -> Result<Vec<u8>> {
    let n = input.len();
    debug_assert!(n >= 4);
    log::debug!("compress order-1: {n} bytes");

    let model = Order1Model::build(input);

    let mut table_bytes = Vec::with_capacity(4096);
    let enc_syms = table_codec::write_order1_table(&model, &mut table_bytes);
    debug_assert!(table_bytes.len() <= MAX_TABLE_SIZE);

    let out_cap = output_capacity(n);
    let mut buf = vec![0u8; out_cap];
    let table_end = HEADER_LEN + table_bytes.len();
    ensure!(table_end <= out_cap, "output buffer too small for frequency table");
    buf[HEADER_LEN..table_end].copy_from_slice(&table_bytes);

    let isz4 = n / 4;
    let lo = [0usize, isz4, 2 * isz4, 3 * isz4];
    let hi = [isz4 - 1, 2 * isz4 - 1, 3 * isz4 - 1, n - 1];

    let payload_len = {
        let mut writer = BackwardWriter::new(&mut buf[table_end..]);
        let mut states = [enc_init(); 4];

        // Lane 3 absorbs the remainder beyond the even quarter split; these
        // positions are pushed first (so popped last by the decoder), each
        // using its true predecessor byte.
        let catchup_lo = lo[3] + isz4;
        for pos in (catchup_lo..=hi[3]).rev() {
            let ctx = input[pos - 1] as usize;
            states[3] = enc_put_symbol(states[3], &mut writer, &enc_syms[ctx][input[pos] as usize]);
        }

        // The shared body: every lane's positions above its quarter start,
        // each with its true predecessor, walked in lockstep high-to-low so
        // the four lanes interleave 3, 2, 1, 0 per step.
        let num_steps = isz4.saturating_sub(1);
        for step in (0..num_steps).rev() {
            for k in [3usize, 2, 1, 0] {
                let pos = lo[k] + 1 + step;
                let ctx = input[pos - 1] as usize;
                states[k] = enc_put_symbol(states[k], &mut writer, &enc_syms[ctx][input[pos] as usize]);
            }
        }

        // Each lane's lowest position uses the virtual predecessor 0,
        // keeping the four lanes independent of one another.
        for k in [3usize, 2, 1, 0] {
            states[k] = enc_put_symbol(states[k], &mut writer, &enc_syms[0][input[lo[k]] as usize]);
        }

        enc_flush(states[3], &mut writer);
        enc_flush(states[2], &mut writer);
        enc_flush(states[1], &mut writer);
        enc_flush(states[0], &mut writer);

        writer.written().len()
    };

    let src_start = out_cap - payload_len;
    buf.copy_within(src_start..out_cap, table_end);
    buf.truncate(table_end + payload_len);

    write_header(&mut buf, 1, (table_bytes.len() + payload_len) as u32, n as u32);
    Ok(buf)
}

fn decompress_order1(frame: &[u8]) -> Result<Vec<u8>> {
    ensure!(frame[0] == 1, "expected order-1 frame");
    let n = u32::from_le_bytes(frame[5..9].try_into().unwrap());
    ensure!(n >= 4, "order-1 frame declares fewer than 4 decoded bytes");

    let (table, table_len) = table_codec::read_order1_table(&frame[HEADER_LEN..])?;
    let payload = &frame[HEADER_LEN + table_len..];

    let mut out = vec![0u8; n as usize];
    let mut reader = ForwardReader::new(payload);
    let mut r = [0u32; 4];
    for slot in r.iter_mut() {
        *slot = dec_init(&mut reader)?;
    }

    let mask = TOTFREQ - 1;
    let isz4 = (n as usize) / 4;
    let mut ctx = [0usize; 4];

    for step in 0..isz4 {
        let m = [r[0] & mask, r[1] & mask, r[2] & mask, r[3] & mask];
        let mut c = [0u8; 4];
        for k in 0..4 {
            let row = table.rows[ctx[k]]
                .as_ref()
                .ok_or_else(|| anyhow!("context {} never occurred in the encoded table", ctx[k]))?;
            c[k] = row.reverse[m[k] as usize];
            out[k * isz4 + step] = c[k];
        }

        for k in 0..4 {
            let row = table.rows[ctx[k]].as_ref().unwrap();
            let sym = &row.syms[c[k] as usize];
            r[k] = (sym.freq as u32) * (r[k] >> TF_SHIFT) + m[k] - sym.start as u32;
        }
        for slot in r.iter_mut() {
            while *slot < L {
                *slot = (*slot << 8) | reader.read_byte()? as u32;
            }
        }

        for k in 0..4 {
            ctx[k] = c[k] as usize;
        }
    }

    let mut pos = 4 * isz4;
    while pos < n as usize {
        let row = table.rows[ctx[3]]
            .as_ref()
            .ok_or_else(|| anyhow!("context {} never occurred in the encoded table", ctx[3]))?;
        let slot = dec_get(r[3]);
        let c3 = row.reverse[slot as usize];
        let sym = row.syms[c3 as usize];
        r[3] = dec_advance_symbol(r[3], &mut reader, &sym)?;
        out[pos] = c3;
        ctx[3] = c3 as usize;
        pos += 1;
    }

    Ok(out)
}
