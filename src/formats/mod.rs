//! Binary format building blocks
//!
//! All multi-byte values are little-endian.

pub mod crc;
pub mod io;
