//! ISO 15118-2 message layer
//!
//! - `types`: data types and enumerations of the message schema
//! - `body`: request/response bodies and the `Body` union
//! - `envelope`: header + body framing and JSON codec

pub mod types;
pub mod body;
pub mod envelope;

pub use types::*;
pub use body::*;
pub use envelope::{EnvelopeError, Header, V2gMessage};
