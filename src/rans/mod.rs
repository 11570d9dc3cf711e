//! The whole implementation of the rANS entropy codec.
//!
//! Module layout mirrors the component breakdown of the design: [`state`] is
//! the per-lane rANS arithmetic (component A), [`symbol`] the precomputed
//! per-symbol encoder/decoder records (component B), [`model`] the frequency
//! counting and normalization (component C), [`table_codec`] the frequency
//! table's RLE-aware (de)serialization (component D), and [`frame`] the
//! frame header, four-lane interleave, and public `compress`/`decompress`
//! entry points (component E).

pub mod frame;
pub mod model;
pub mod state;
pub mod symbol;
pub mod table_codec;

/// Scale bits: every normalized frequency row sums to `1 << TF_SHIFT`.
pub const TF_SHIFT: u32 = 12;

/// The fixed scale every frequency row is normalized to sum to.
pub const TOTFREQ: u32 = 1 << TF_SHIFT;

/// Lower bound of the rANS normalization interval.
pub const L: u32 = 1 << 23;

/// Default block size a caller should chunk input into before compressing;
/// the codec itself has no notion of multi-block streams.
pub const BLK_SIZE: usize = 1024 * 1024;

/// Result alias used throughout the codec: `Err` stands in for the
/// reference implementation's null/empty return on allocation failure or a
/// malformed frame.
pub type RansResult<T> = anyhow::Result<T>;
