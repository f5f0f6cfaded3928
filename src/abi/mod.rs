//! Contract ABI codec.
//!
//! The codec is split along the encode/decode axis:
//!
//! - [`schema::TypeSchema`] — a static description of an ABI type, enough to
//!   drive decoding.
//! - [`value::AbiValue`] — a tagged value carrying both type and content,
//!   enough to drive encoding (a value is its own schema).
//! - [`encoder`] — two-pass head/tail encoding into a single pre-sized buffer.
//! - [`decoder`] — schema-driven decoding with checked offsets and lengths.
//! - [`registry::AbiRegistry`] — contract ABI JSON parsed into function/event
//!   entries with pre-computed selectors and per-parameter converters.
//!
//! The wire format is the Ethereum Contract ABI: every head slot is 32 bytes,
//! dynamic components are reached through offsets measured from the start of
//! the enclosing tuple's encoding, and tails are laid out back-to-back in
//! source order.

pub mod decoder;
pub mod encoder;
pub mod registry;
pub mod schema;
pub mod value;

pub use decoder::decode;
pub use encoder::{encode, encode_constructor, encode_function};
pub use registry::{
    decode_multicall_aggregate, AbiRegistry, DecodedEvent, EventEntry, FunctionEntry,
    StateMutability,
};
pub use schema::TypeSchema;
pub use value::AbiValue;
