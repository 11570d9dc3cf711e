//! A byte-aligned rANS (range-coding Asymmetric Numeral Systems) entropy
//! codec, specialized for the order-0 and order-1 statistical models used on
//! genomic base-call and quality-score streams.
//!
//! The codec turns a contiguous input byte slice into a self-contained
//! compressed frame (9-byte header + frequency table + interleaved 4-lane
//! rANS payload) and back. Everything above "bytes in, bytes out" (CRAM
//! container I/O, ITF-8 varints, SAM headers, reference fetch, quality
//! binning) is the caller's concern.

pub mod rans;

pub use rans::frame::{compress, decompress, Order};
pub use rans::{RansResult, BLK_SIZE, L, TF_SHIFT, TOTFREQ};
