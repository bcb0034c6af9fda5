#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Fluent builders assembling scope information.
pub mod builder;
/// Streaming decoder for the scopes item stream.
pub mod decoder;
/// Encoder producing the scopes item stream.
pub mod encoder;
/// Encoding helpers such as the base64 VLQ codec.
pub mod encoding;
/// Shared error and result types.
pub mod error;
/// Serde model of the host source-map document.
pub mod sourcemap;
/// Data model of scope information.
pub mod types;

pub use builder::{RangeOptions, SafeScopeInfoBuilder, ScopeInfoBuilder, ScopeOptions};
pub use decoder::{DecodeMode, DecodeOptions, decode};
pub use encoder::encode;
pub use error::{Error, Result};
pub use sourcemap::{IndexSection, SourceMapJson};
pub use types::*;
