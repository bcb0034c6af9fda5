//! Low-level encoding helpers: the base64 VLQ codec and the differential
//! state records shared by the encoder and decoder.

pub(crate) mod state;
mod vlq;

pub use vlq::{TokenIterator, VLQ_MAX_DIGITS, encode_signed_vlq, encode_unsigned_vlq};
