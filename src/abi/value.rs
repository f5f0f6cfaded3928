//! Typed ABI values.
//!
//! An [`AbiValue`] carries both the type and the content, so a value tree is
//! sufficient input for encoding. Constructors range-check integers, address
//! and fixed-bytes lengths, and array element types; the rest of the codec
//! relies on those invariants.
//!
//! Large integers use `num-bigint`, which gives us minimal-magnitude
//! big-endian bytes and two's-complement conversion for free.

use crate::abi::schema::TypeSchema;
use crate::error::{Error, Result};
use crate::utils::bytes::{self, to_hex};
use num_bigint::{BigInt, BigUint};
use num_traits::{One, ToPrimitive};

/// A tagged ABI value. Each variant is its own schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    /// Unsigned integer of the given bit width; `value < 2^bits`.
    Uint { bits: u16, value: BigUint },
    /// Signed integer of the given bit width; `-2^(bits-1) <= value < 2^(bits-1)`.
    Int { bits: u16, value: BigInt },
    Address([u8; 20]),
    Bool(bool),
    /// 1..=32 bytes, encoded right-padded.
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    /// `size: None` is a dynamic `T[]`; `Some(n)` a fixed `T[n]` with
    /// `values.len() == n`. The element schema keeps empty arrays typed.
    Array {
        elem: TypeSchema,
        size: Option<usize>,
        values: Vec<AbiValue>,
    },
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    // ---- Constructors ------------------------------------------------------

    /// Unsigned integer with a range check: `0 <= value < 2^bits`.
    pub fn uint(bits: u16, value: impl Into<BigUint>) -> Result<Self> {
        TypeSchema::uint(bits)?;
        let value = value.into();
        if value.bits() > u64::from(bits) {
            return Err(Error::AbiEncode(format!(
                "uint{bits}: value {value} out of range"
            )));
        }
        Ok(AbiValue::Uint { bits, value })
    }

    /// `uint256` shorthand. Every unsigned primitive fits the width, so this
    /// cannot fail; for `BigUint` inputs use the checked [`AbiValue::uint`].
    pub fn uint256(value: impl Into<u128>) -> Self {
        AbiValue::Uint { bits: 256, value: BigUint::from(value.into()) }
    }

    /// Signed integer with a range check: `-2^(bits-1) <= value < 2^(bits-1)`.
    pub fn int(bits: u16, value: impl Into<BigInt>) -> Result<Self> {
        TypeSchema::int(bits)?;
        let value = value.into();
        let bound = BigInt::one() << (u32::from(bits) - 1);
        if value < -&bound || value >= bound {
            return Err(Error::AbiEncode(format!(
                "int{bits}: value {value} out of range"
            )));
        }
        Ok(AbiValue::Int { bits, value })
    }

    pub fn address(bytes: [u8; 20]) -> Self {
        AbiValue::Address(bytes)
    }

    /// Parse a 20-byte `0x`-hex address.
    pub fn address_from_hex(s: &str) -> Result<Self> {
        Ok(AbiValue::Address(bytes::address_from_hex(s)?))
    }

    pub fn fixed_bytes(bytes: Vec<u8>) -> Result<Self> {
        if !(1..=32).contains(&bytes.len()) {
            return Err(Error::AbiEncode(format!(
                "bytes{}: fixed bytes must be 1..=32 long",
                bytes.len()
            )));
        }
        Ok(AbiValue::FixedBytes(bytes))
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        AbiValue::Bytes(bytes.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        AbiValue::String(s.into())
    }

    /// Dynamic array `T[]`; every element must match the element schema.
    pub fn array(elem: TypeSchema, values: Vec<AbiValue>) -> Result<Self> {
        check_elements(&elem, &values)?;
        Ok(AbiValue::Array { elem, size: None, values })
    }

    /// Fixed array `T[n]` with `n = values.len()`.
    pub fn fixed_array(elem: TypeSchema, values: Vec<AbiValue>) -> Result<Self> {
        check_elements(&elem, &values)?;
        let size = Some(values.len());
        Ok(AbiValue::Array { elem, size, values })
    }

    pub fn tuple(values: Vec<AbiValue>) -> Self {
        AbiValue::Tuple(values)
    }

    // ---- Type information --------------------------------------------------

    /// The schema this value encodes as (the value→schema direction of the
    /// isomorphism).
    pub fn schema(&self) -> TypeSchema {
        match self {
            AbiValue::Uint { bits, .. } => TypeSchema::Uint(*bits),
            AbiValue::Int { bits, .. } => TypeSchema::Int(*bits),
            AbiValue::Address(_) => TypeSchema::Address,
            AbiValue::Bool(_) => TypeSchema::Bool,
            AbiValue::FixedBytes(b) => TypeSchema::FixedBytes(b.len()),
            AbiValue::Bytes(_) => TypeSchema::Bytes,
            AbiValue::String(_) => TypeSchema::String,
            AbiValue::Array { elem, size, .. } => {
                TypeSchema::Array(Box::new(elem.clone()), *size)
            }
            AbiValue::Tuple(values) => {
                TypeSchema::Tuple(values.iter().map(|v| v.schema()).collect())
            }
        }
    }

    /// Whether this value encodes into the tail of its enclosing tuple.
    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiValue::Bytes(_) | AbiValue::String(_) => true,
            AbiValue::Array { size: None, .. } => true,
            AbiValue::Array { size: Some(_), elem, .. } => elem.is_dynamic(),
            AbiValue::Tuple(values) => values.iter().any(|v| v.is_dynamic()),
            _ => false,
        }
    }

    // ---- Coercions ---------------------------------------------------------

    pub fn as_biguint(&self) -> Option<&BigUint> {
        match self {
            AbiValue::Uint { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn as_bigint(&self) -> Option<&BigInt> {
        match self {
            AbiValue::Int { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Narrow an unsigned integer value; `None` on kind or range mismatch.
    pub fn as_u64(&self) -> Option<u64> {
        self.as_biguint().and_then(|v| v.to_u64())
    }

    pub fn as_u128(&self) -> Option<u128> {
        self.as_biguint().and_then(|v| v.to_u128())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_bigint().and_then(|v| v.to_i64())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AbiValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Byte content of `bytes` and `bytesN` values.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AbiValue::Bytes(b) | AbiValue::FixedBytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<&[u8; 20]> {
        match self {
            AbiValue::Address(a) => Some(a),
            _ => None,
        }
    }

    /// Address in canonical `0x`-hex string form.
    pub fn address_hex(&self) -> Option<String> {
        self.as_address().map(to_hex)
    }

    pub fn as_slice(&self) -> Option<&[AbiValue]> {
        match self {
            AbiValue::Array { values, .. } => Some(values),
            AbiValue::Tuple(values) => Some(values),
            _ => None,
        }
    }

    /// JSON-friendly rendering: integers become decimal strings, byte-like
    /// values `0x`-hex, arrays and tuples JSON arrays.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            AbiValue::Uint { value, .. } => Value::String(value.to_str_radix(10)),
            AbiValue::Int { value, .. } => Value::String(value.to_string()),
            AbiValue::Address(a) => Value::String(to_hex(a)),
            AbiValue::Bool(b) => Value::Bool(*b),
            AbiValue::FixedBytes(b) | AbiValue::Bytes(b) => Value::String(to_hex(b)),
            AbiValue::String(s) => Value::String(s.clone()),
            AbiValue::Array { values, .. } | AbiValue::Tuple(values) => {
                Value::Array(values.iter().map(|v| v.to_json()).collect())
            }
        }
    }
}

fn check_elements(elem: &TypeSchema, values: &[AbiValue]) -> Result<()> {
    for (i, v) in values.iter().enumerate() {
        let got = v.schema();
        if got != *elem {
            return Err(Error::AbiEncode(format!(
                "array element {i}: expected {}, got {}",
                elem.canonical(),
                got.canonical()
            )));
        }
    }
    Ok(())
}
