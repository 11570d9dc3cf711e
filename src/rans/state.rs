//! The rANS state engine: per-lane encode/decode primitives over a 32-bit
//! state, byte-granular renormalization, and lower bound `L`.
//!
//! This is Giesen's `rans_byte` construction. Encoding is LIFO: the last
//! symbol encoded is the first decoded, so the encoder writes bytes into
//! the *end* of a buffer, moving towards the front, while the decoder reads
//! forward from the start. [`BackwardWriter`] turns the reference's raw
//! decrementing pointer into a checked countdown index over a Rust slice;
//! [`ForwardReader`] does the same for the decoder's forward cursor.

use anyhow::{ensure, Result};

use crate::rans::symbol::{DecSymbol, EncSymbol};
use crate::rans::{L, TF_SHIFT, TOTFREQ};

/// A cursor that fills a byte slice from the end towards the start.
///
/// Standing in for the reference's `uint8_t **pptr` that is decremented on
/// every emitted byte; `pos` is the index of the first already-written byte,
/// so `buf[pos..]` is always the portion written so far.
pub struct BackwardWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> BackwardWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        let pos = buf.len();
        Self { buf, pos }
    }

    #[inline(always)]
    pub fn put_byte(&mut self, byte: u8) {
        self.pos -= 1;
        self.buf[self.pos] = byte;
    }

    /// The bytes written so far, in forward (read) order.
    pub fn written(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    pub fn pos(&self) -> usize {
        self.pos
    }
}

/// A cursor that reads a byte slice from the start towards the end.
pub struct ForwardReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ForwardReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    #[inline(always)]
    pub fn read_byte(&mut self) -> Result<u8> {
        ensure!(self.pos < self.buf.len(), "rANS payload truncated");
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    pub fn pos(&self) -> usize {
        self.pos
    }
}

/// `EncInit`: set the encoder state to the lower bound.
#[inline(always)]
pub fn enc_init() -> u32 {
    L
}

/// `EncPut`: the textbook (non-table-driven) encode step, renormalizing then
/// folding `(start, freq)` into the state. Kept alongside the fast
/// `enc_put_symbol` below as the reference definition it must agree with;
/// the frame orchestrator always uses the fast path.
#[inline]
pub fn enc_put(state: u32, out: &mut BackwardWriter, start: u32, freq: u32) -> u32 {
    let x_max = ((L >> TF_SHIFT) << 8) * freq;
    let mut x = state;
    while x >= x_max {
        out.put_byte((x & 0xff) as u8);
        x >>= 8;
    }
    ((x / freq) << TF_SHIFT) + (x % freq) + start
}

/// `EncPutSymbol`: renormalize against `sym.x_max`, then fold the state
/// using the precomputed reciprocal so the division becomes a multiply-high.
#[inline(always)]
pub fn enc_put_symbol(state: u32, out: &mut BackwardWriter, sym: &EncSymbol) -> u32 {
    debug_assert!(sym.x_max != 0, "can't encode a symbol with freq=0");

    let mut x = state;
    while x >= sym.x_max {
        out.put_byte((x & 0xff) as u8);
        x >>= 8;
    }

    let q = (((x as u64) * sym.rcp_freq as u64) >> sym.rcp_shift) as u32;
    x + sym.bias + q * sym.cmpl_freq
}

/// `EncFlush`: emit the 4 bytes of the state little-endian. Because the
/// writer moves backward, the low byte is written first so it ends up at
/// the lowest address once reading resumes forward.
#[inline]
pub fn enc_flush(state: u32, out: &mut BackwardWriter) {
    out.put_byte((state >> 24) as u8);
    out.put_byte((state >> 16) as u8);
    out.put_byte((state >> 8) as u8);
    out.put_byte(state as u8);
}

/// `DecInit`: read the 4-byte little-endian state from the front of the
/// payload.
#[inline]
pub fn dec_init(input: &mut ForwardReader) -> Result<u32> {
    let b0 = input.read_byte()? as u32;
    let b1 = input.read_byte()? as u32;
    let b2 = input.read_byte()? as u32;
    let b3 = input.read_byte()? as u32;
    Ok(b0 | (b1 << 8) | (b2 << 16) | (b3 << 24))
}

/// `DecGet`: the state's low 12 bits, i.e. the cumulative-frequency slot to
/// look up in the reverse table.
#[inline(always)]
pub fn dec_get(state: u32) -> u32 {
    state & (TOTFREQ - 1)
}

/// `DecAdvance`: pop a symbol with the given `(start, freq)` and renormalize
/// from `input`.
#[inline]
pub fn dec_advance(state: u32, input: &mut ForwardReader, start: u32, freq: u32) -> Result<u32> {
    let mask = TOTFREQ - 1;
    let mut x = freq * (state >> TF_SHIFT) + (state & mask) - start;
    while x < L {
        x = (x << 8) | input.read_byte()? as u32;
    }
    Ok(x)
}

/// Equivalent to [`dec_advance`] but driven by a precomputed [`DecSymbol`].
#[inline(always)]
pub fn dec_advance_symbol(state: u32, input: &mut ForwardReader, sym: &DecSymbol) -> Result<u32> {
    dec_advance(state, input, sym.start as u32, sym.freq as u32)
}
