//! Two-pass ABI encoder.
//!
//! Pass one walks the value tree and sums head and tail sizes so the output
//! buffer is allocated exactly once; pass two emits heads (inline statics,
//! offset words for dynamics) and then tails in source order. Offsets are
//! measured from the start of the enclosing tuple's encoding.

use crate::abi::value::AbiValue;
use crate::error::{Error, Result};
use crate::utils::hash::selector4;
use num_bigint::{BigInt, BigUint, Sign};

/// Encode a sequence of values as a tuple.
pub fn encode(values: &[AbiValue]) -> Result<Vec<u8>> {
    let mut total = 0usize;
    for v in values {
        total += encoded_size(v)?;
    }
    let mut out = Vec::with_capacity(total);
    encode_tuple_into(values, &mut out)?;
    debug_assert_eq!(out.len(), total);
    Ok(out)
}

/// Encode a function call: 4-byte selector of the canonical signature,
/// followed by the tuple encoding of the arguments.
pub fn encode_function(signature: &str, values: &[AbiValue]) -> Result<Vec<u8>> {
    let mut total = 4usize;
    for v in values {
        total += encoded_size(v)?;
    }
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&selector4(signature));
    encode_tuple_into(values, &mut out)?;
    Ok(out)
}

/// Encode constructor arguments: the bare tuple encoding, no selector.
/// No values means empty bytes.
pub fn encode_constructor(values: &[AbiValue]) -> Result<Vec<u8>> {
    encode(values)
}

// ---- Size pass ---------------------------------------------------------------

/// Total bytes this value contributes to its enclosing tuple: head plus, for
/// dynamics, the tail.
pub(crate) fn encoded_size(v: &AbiValue) -> Result<usize> {
    let head = head_size(v);
    if v.is_dynamic() {
        Ok(head + content_size(v)?)
    } else {
        Ok(head)
    }
}

/// Head bytes: 32 for a dynamic value (the offset slot), the full static
/// encoding otherwise.
pub(crate) fn head_size(v: &AbiValue) -> usize {
    if v.is_dynamic() {
        return 32;
    }
    match v {
        AbiValue::Array { values, .. } => values.iter().map(head_size).sum(),
        AbiValue::Tuple(values) => values.iter().map(head_size).sum(),
        _ => 32,
    }
}

/// Tail bytes of a dynamic value.
pub(crate) fn content_size(v: &AbiValue) -> Result<usize> {
    match v {
        AbiValue::Bytes(b) => Ok(32 + padded_len(b.len())),
        // `str::len` is already the UTF-8 byte length; no temporary encoding.
        AbiValue::String(s) => Ok(32 + padded_len(s.len())),
        AbiValue::Array { size, values, .. } => {
            let mut sum = if size.is_none() { 32 } else { 0 };
            for e in values {
                sum += encoded_size(e)?;
            }
            Ok(sum)
        }
        AbiValue::Tuple(values) => {
            let mut sum = 0;
            for c in values {
                sum += encoded_size(c)?;
            }
            Ok(sum)
        }
        _ => Err(Error::AbiEncode(format!(
            "{}: static value has no tail",
            v.schema().canonical()
        ))),
    }
}

#[inline]
pub(crate) fn padded_len(len: usize) -> usize {
    len.div_ceil(32) * 32
}

// ---- Emit pass ---------------------------------------------------------------

/// Emit the tuple encoding of `values`: heads first, then dynamic tails in
/// source order.
pub(crate) fn encode_tuple_into(values: &[AbiValue], out: &mut Vec<u8>) -> Result<()> {
    let head_len: usize = values.iter().map(head_size).sum();
    let mut tail_cursor = head_len;
    for v in values {
        if v.is_dynamic() {
            out.extend_from_slice(&usize_word(tail_cursor));
            tail_cursor += content_size(v)?;
        } else {
            encode_static_into(v, out)?;
        }
    }
    for v in values {
        if v.is_dynamic() {
            encode_content_into(v, out)?;
        }
    }
    Ok(())
}

/// Emit the full inline encoding of a static value.
fn encode_static_into(v: &AbiValue, out: &mut Vec<u8>) -> Result<()> {
    match v {
        AbiValue::Uint { value, .. } => out.extend_from_slice(&uint_word(value)?),
        AbiValue::Int { value, .. } => out.extend_from_slice(&int_word(value)?),
        AbiValue::Address(a) => {
            out.extend_from_slice(&[0u8; 12]);
            out.extend_from_slice(a);
        }
        AbiValue::Bool(b) => {
            let mut word = [0u8; 32];
            word[31] = u8::from(*b);
            out.extend_from_slice(&word);
        }
        AbiValue::FixedBytes(b) => {
            if b.is_empty() || b.len() > 32 {
                return Err(Error::AbiEncode(format!(
                    "bytes{}: fixed bytes must be 1..=32 long",
                    b.len()
                )));
            }
            out.extend_from_slice(b);
            out.extend_from_slice(&ZERO_WORD[..32 - b.len()]);
        }
        AbiValue::Array { values, .. } | AbiValue::Tuple(values) => {
            // Static arrays and tuples recurse inline; all components are
            // static here, so this is a plain head walk.
            encode_tuple_into(values, out)?;
        }
        AbiValue::Bytes(_) | AbiValue::String(_) => {
            return Err(Error::AbiEncode(
                "dynamic value reached the static emit path".into(),
            ))
        }
    }
    Ok(())
}

/// Emit the tail bytes of a dynamic value.
fn encode_content_into(v: &AbiValue, out: &mut Vec<u8>) -> Result<()> {
    match v {
        AbiValue::Bytes(b) => {
            out.extend_from_slice(&usize_word(b.len()));
            out.extend_from_slice(b);
            out.extend_from_slice(&ZERO_WORD[..padded_len(b.len()) - b.len()]);
        }
        AbiValue::String(s) => {
            let b = s.as_bytes();
            out.extend_from_slice(&usize_word(b.len()));
            out.extend_from_slice(b);
            out.extend_from_slice(&ZERO_WORD[..padded_len(b.len()) - b.len()]);
        }
        AbiValue::Array { size, values, .. } => {
            if size.is_none() {
                out.extend_from_slice(&usize_word(values.len()));
            }
            encode_tuple_into(values, out)?;
        }
        AbiValue::Tuple(values) => encode_tuple_into(values, out)?,
        _ => {
            return Err(Error::AbiEncode(format!(
                "{}: static value has no tail",
                v.schema().canonical()
            )))
        }
    }
    Ok(())
}

// ---- Word helpers ------------------------------------------------------------

const ZERO_WORD: [u8; 32] = [0u8; 32];

/// 32-byte big-endian word for an unsigned integer; the magnitude must fit.
pub(crate) fn uint_word(v: &BigUint) -> Result<[u8; 32]> {
    let bytes = v.to_bytes_be();
    if bytes.len() > 32 {
        return Err(Error::AbiEncode(format!(
            "uint: magnitude of {v} exceeds 32 bytes"
        )));
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

/// 32-byte two's-complement word for a signed integer, sign-extended with
/// 0x00 or 0xFF.
pub(crate) fn int_word(v: &BigInt) -> Result<[u8; 32]> {
    let bytes = v.to_signed_bytes_be();
    if bytes.len() > 32 {
        return Err(Error::AbiEncode(format!(
            "int: magnitude of {v} exceeds 256 bits"
        )));
    }
    let fill = if v.sign() == Sign::Minus { 0xFF } else { 0x00 };
    let mut word = [fill; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}

/// 32-byte big-endian word for a buffer length or offset.
pub(crate) fn usize_word(n: usize) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&(n as u64).to_be_bytes());
    word
}
