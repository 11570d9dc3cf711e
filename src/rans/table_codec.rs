//! Serializes and deserializes frequency tables with run-length coding over
//! present symbol (or context) indices and a compact 7/15-bit frequency
//! encoding.
//!
//! The encoder side builds the [`symbol::EncSymbol`] records in the same
//! pass that writes the table bytes, since both need the same running
//! cumulative frequency `x`, exactly as the reference's `RansEncSymbolInit`
//! call sits inside its table-writing loop.

use anyhow::{ensure, Result};

use crate::rans::model::{Order0Model, Order1Model};
use crate::rans::symbol::{DecSymbol, EncSymbol};
use crate::rans::TOTFREQ;

/// Upper bound on a serialized table's size: up to 256 contexts, each with
/// up to 256 symbols at up to 3 bytes (index + 2-byte frequency), plus slack
/// for RLE run-length bytes and terminators.
pub const MAX_TABLE_SIZE: usize = 257 * 257 * 3;

/// A parsed order-0 table, ready for decoding: per-symbol `(start, freq)`
/// plus the reverse lookup from a 12-bit slot to its owning symbol.
pub struct DecoderTable0 {
    pub syms: Box<[DecSymbol; 256]>,
    pub reverse: Box<[u8; 4096]>,
}

/// A parsed order-1 table: one optional [`DecoderTable0`] per previous-byte
/// context, `None` for contexts that never occurred in the original input.
pub struct DecoderTable1 {
    pub rows: Vec<Option<DecoderTable0>>,
}

fn write_row(model_row: &[u16; 256], out: &mut Vec<u8>) -> [EncSymbol; 256] {
    let mut syms = [EncSymbol::default(); 256];
    let mut rle: i32 = 0;
    let mut x: u32 = 0;

    for j in 0..256 {
        let f = model_row[j] as u32;
        if f == 0 {
            continue;
        }

        if rle > 0 {
            rle -= 1;
        } else {
            out.push(j as u8);
            if j > 0 && model_row[j - 1] != 0 {
                let mut k = j + 1;
                while k < 256 && model_row[k] != 0 {
                    k += 1;
                }
                let run = (k - (j + 1)) as u8;
                out.push(run);
                rle = run as i32;
            }
        }

        if f < 128 {
            out.push(f as u8);
        } else {
            out.push((0x80 | (f >> 8)) as u8);
            out.push((f & 0xff) as u8);
        }

        syms[j] = EncSymbol::new(x, f);
        x += f;
    }
    out.push(0);
    syms
}

/// Writes the order-0 table and returns the encoder symbol records built
/// alongside it.
pub fn write_order0_table(model: &Order0Model, out: &mut Vec<u8>) -> [EncSymbol; 256] {
    write_row(&model.freq, out)
}

/// Writes the nested order-1 table (RLE over present contexts, each row
/// using the order-0 format) and returns the per-context encoder symbol
/// tables.
pub fn write_order1_table(model: &Order1Model, out: &mut Vec<u8>) -> Vec<[EncSymbol; 256]> {
    let mut syms: Vec<[EncSymbol; 256]> = vec![[EncSymbol::default(); 256]; 256];
    let mut rle_i: i32 = 0;

    for i in 0..256 {
        if !model.is_present(i) {
            continue;
        }

        if rle_i > 0 {
            rle_i -= 1;
        } else {
            out.push(i as u8);
            if i > 0 && model.is_present(i - 1) {
                let mut k = i + 1;
                while k < 256 && model.is_present(k) {
                    k += 1;
                }
                let run = (k - (i + 1)) as u8;
                out.push(run);
                rle_i = run as i32;
            }
        }

        syms[i] = write_row(&model.rows[i], out);
    }
    out.push(0);
    debug_assert!(out.len() <= MAX_TABLE_SIZE);
    syms
}

/// Parses one order-0-formatted row (symbol index + run-length byte +
/// frequency, terminated by `0x00`) starting at `buf[pos..]`.
///
/// `zero_means_totfreq` reproduces the order-1-only decode quirk where a
/// stored frequency of literal zero is reinterpreted as `TOTFREQ` (a
/// historical workaround for single-symbol rows); order-0 rows never apply
/// it.
fn parse_row(
    buf: &[u8],
    mut pos: usize,
    zero_means_totfreq: bool,
) -> Result<(Box<[DecSymbol; 256]>, Box<[u8; 4096]>, usize)> {
    let mut syms = [DecSymbol::default(); 256];
    let mut reverse = Box::new([0u8; 4096]);

    ensure!(pos < buf.len(), "truncated frequency table");
    let mut j = buf[pos] as usize;
    pos += 1;
    let mut rle: i32 = 0;
    let mut x: u32 = 0;

    loop {
        ensure!(pos < buf.len(), "truncated frequency table");
        let mut f = buf[pos] as u32;
        pos += 1;
        if f >= 128 {
            f &= !0x80u32;
            ensure!(pos < buf.len(), "truncated frequency table");
            f = (f << 8) | buf[pos] as u32;
            pos += 1;
        }
        if zero_means_totfreq && f == 0 {
            f = TOTFREQ;
        }

        ensure!(x + f <= TOTFREQ, "cumulative frequency exceeds TOTFREQ while parsing table");
        syms[j] = DecSymbol::new(x, f);
        for slot in x..x + f {
            reverse[slot as usize] = j as u8;
        }
        x += f;

        ensure!(pos < buf.len(), "truncated frequency table");
        if rle == 0 && j + 1 == buf[pos] as usize {
            j = buf[pos] as usize;
            pos += 1;
            ensure!(pos < buf.len(), "truncated frequency table");
            rle = buf[pos] as i32;
            pos += 1;
        } else if rle > 0 {
            rle -= 1;
            j += 1;
        } else {
            j = buf[pos] as usize;
            pos += 1;
        }

        if j == 0 {
            break;
        }
    }

    Ok((Box::new(syms), reverse, pos))
}

/// Parses an order-0 table. `decoded_len == 0` is special-cased: the
/// encoder then emits nothing but the lone `0x00` terminator (no symbol was
/// ever counted), and the generic RLE walker above cannot distinguish that
/// terminator from "symbol 0 present" without knowing the decoded length up
/// front.
pub fn read_order0_table(buf: &[u8], decoded_len: u32) -> Result<(DecoderTable0, usize)> {
    if decoded_len == 0 {
        ensure!(!buf.is_empty(), "truncated frequency table");
        ensure!(buf[0] == 0, "expected empty-table terminator for zero-length output");
        return Ok((
            DecoderTable0 {
                syms: Box::new([DecSymbol::default(); 256]),
                reverse: Box::new([0u8; 4096]),
            },
            1,
        ));
    }

    let (syms, reverse, pos) = parse_row(buf, 0, false)?;
    Ok((DecoderTable0 { syms, reverse }, pos))
}

/// Parses an order-1 table (RLE over present contexts, each row nested in
/// the order-0 format). Callers must ensure `decoded_len >= 4` before
/// reaching here. A well-formed frame never encodes order-1 for shorter
/// input, so that's a malformed-frame condition the frame orchestrator
/// rejects up front rather than a case this parser needs to special-case.
pub fn read_order1_table(buf: &[u8]) -> Result<(DecoderTable1, usize)> {
    let mut rows: Vec<Option<DecoderTable0>> = (0..256).map(|_| None).collect();

    ensure!(!buf.is_empty(), "truncated frequency table");
    let mut pos = 0usize;
    let mut i = buf[pos] as usize;
    pos += 1;
    let mut rle_i: i32 = 0;

    loop {
        let (syms, reverse, new_pos) = parse_row(buf, pos, true)?;
        pos = new_pos;
        rows[i] = Some(DecoderTable0 { syms, reverse });

        ensure!(pos < buf.len(), "truncated frequency table");
        if rle_i == 0 && i + 1 == buf[pos] as usize {
            i = buf[pos] as usize;
            pos += 1;
            ensure!(pos < buf.len(), "truncated frequency table");
            rle_i = buf[pos] as i32;
            pos += 1;
        } else if rle_i > 0 {
            rle_i -= 1;
            i += 1;
        } else {
            i = buf[pos] as usize;
            pos += 1;
        }

        if i == 0 {
            break;
        }
    }

    Ok((DecoderTable1 { rows }, pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rans::model::{Order0Model, Order1Model};

    #[test]
    fn order0_table_round_trips() {
        let input = b"the quick brown fox jumps over the lazy dog";
        let model = Order0Model::build(input);
        let mut bytes = Vec::new();
        let enc_syms = write_order0_table(&model, &mut bytes);

        let (table, consumed) = read_order0_table(&bytes, input.len() as u32).unwrap();
        assert_eq!(consumed, bytes.len());

        for j in 0..256 {
            if model.freq[j] == 0 {
                continue;
            }
            assert_eq!(table.syms[j].freq, model.freq[j]);
            let enc = enc_syms[j];
            assert_eq!(enc.cmpl_freq, (1u32 << 12) - model.freq[j] as u32);
        }

        // reverse lookup covers every slot assigned to a present symbol.
        let mut covered = 0u32;
        for j in 0..256 {
            covered += model.freq[j] as u32;
        }
        assert_eq!(covered, 4096);
    }

    #[test]
    fn order0_empty_table_round_trips() {
        let model = Order0Model::build(&[]);
        let mut bytes = Vec::new();
        write_order0_table(&model, &mut bytes);
        assert_eq!(bytes, vec![0u8]);

        let (_, consumed) = read_order0_table(&bytes, 0).unwrap();
        assert_eq!(consumed, 1);
    }

    #[test]
    fn order0_all_distinct_symbols_round_trip() {
        let input: Vec<u8> = (0..=255u8).collect();
        let model = Order0Model::build(&input);
        let mut bytes = Vec::new();
        write_order0_table(&model, &mut bytes);
        let (table, consumed) = read_order0_table(&bytes, input.len() as u32).unwrap();
        assert_eq!(consumed, bytes.len());
        for j in 0..256 {
            assert_eq!(table.syms[j].freq, 16);
        }
    }

    #[test]
    fn order1_table_round_trips() {
        let input = b"ABABABAB".repeat(8);
        let model = Order1Model::build(&input);
        let mut bytes = Vec::new();
        write_order1_table(&model, &mut bytes);

        let (table, consumed) = read_order1_table(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());

        for i in 0..256 {
            match (&table.rows[i], model.is_present(i)) {
                (Some(row), true) => {
                    for j in 0..256 {
                        assert_eq!(row.syms[j].freq, model.rows[i][j]);
                    }
                }
                (None, false) => {}
                (got, want_present) => panic!("context {i}: row present = {}, expected {want_present}", got.is_some()),
            }
        }
    }

    #[test]
    fn rejects_frequency_overflow() {
        // Hand-craft a malformed order-0 table: two symbols whose stored
        // frequencies sum past TOTFREQ.
        let mut corrupt = Vec::new();
        corrupt.push(0u8); // j = 0
        corrupt.push(0x80 | (4000u32 >> 8) as u8);
        corrupt.push((4000u32 & 0xff) as u8); // freq = 4000
        corrupt.push(1u8); // j = 1
        corrupt.push(0x80 | (4000u32 >> 8) as u8);
        corrupt.push((4000u32 & 0xff) as u8); // freq = 4000 again -> overflow
        corrupt.push(0u8);
        assert!(read_order0_table(&corrupt, 1000).is_err());
    }
}
