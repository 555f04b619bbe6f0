//! Wire-byte utilities: varint encoding and the key comparator abstraction.

pub mod compare;
pub mod varint;

pub use compare::{lexical, Comparator};
pub use varint::{decode_varint, encode_varint, varint_len};
