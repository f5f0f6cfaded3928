//! Schema-driven ABI decoder.
//!
//! The decoder walks the head area of a tuple encoding with a cursor; static
//! schemas decode in place, dynamic schemas follow a 32-byte offset into the
//! tail. Offsets are relative to the tuple root of the current invocation,
//! so recursion re-roots on the nested slice.
//!
//! Every offset and length read off the wire is bounds-checked and must fit
//! a signed 32-bit integer; malformed input yields `Error::AbiDecode`, never
//! a panic.

use crate::abi::schema::TypeSchema;
use crate::abi::value::AbiValue;
use crate::error::{Error, Result};
use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;

/// Decode `data` as a tuple encoding under the given schemas.
pub fn decode(data: &[u8], schemas: &[TypeSchema]) -> Result<Vec<AbiValue>> {
    decode_tuple(data, schemas)
}

fn decode_tuple(root: &[u8], schemas: &[TypeSchema]) -> Result<Vec<AbiValue>> {
    let head_len: usize = schemas.iter().map(|s| s.head_size()).sum();
    if head_len > root.len() {
        return Err(Error::AbiDecode(format!(
            "tuple of {} components: static head area exceeds the data",
            schemas.len()
        )));
    }
    let mut out = Vec::with_capacity(schemas.len());
    let mut cursor = 0usize;
    for schema in schemas {
        let value = decode_component(root, schema, cursor)?;
        cursor += schema.head_size();
        out.push(value);
    }
    Ok(out)
}

/// Decode a run of `count` identical element types rooted at `root`
/// (fixed-array body, or dynamic-array body after the length word).
fn decode_repeated(root: &[u8], elem: &TypeSchema, count: usize) -> Result<Vec<AbiValue>> {
    let head_len = count
        .checked_mul(elem.head_size())
        .ok_or_else(|| decode_err(elem, "array length overflows the head area"))?;
    if head_len > root.len() {
        return Err(decode_err(elem, "array head area exceeds the data"));
    }
    let mut out = Vec::with_capacity(count);
    let mut cursor = 0usize;
    for _ in 0..count {
        let value = decode_component(root, elem, cursor)?;
        cursor += elem.head_size();
        out.push(value);
    }
    Ok(out)
}

/// Decode one component whose head slot sits at `cursor` within `root`.
fn decode_component(root: &[u8], schema: &TypeSchema, cursor: usize) -> Result<AbiValue> {
    if schema.is_dynamic() {
        let offset = read_word_usize(root, cursor, schema, "offset")?;
        let tail = root
            .get(offset..)
            .ok_or_else(|| decode_err(schema, "offset points past the end of the data"))?;
        decode_dynamic(tail, schema)
    } else {
        decode_static(root, schema, cursor)
    }
}

/// Decode a static value at an absolute position within `root`.
fn decode_static(root: &[u8], schema: &TypeSchema, pos: usize) -> Result<AbiValue> {
    match schema {
        TypeSchema::Uint(bits) => {
            let word = read_word(root, pos, schema)?;
            let value = BigUint::from_bytes_be(word);
            AbiValue::uint(*bits, value)
                .map_err(|_| decode_err(schema, "decoded value exceeds the type's range"))
        }
        TypeSchema::Int(bits) => {
            let word = read_word(root, pos, schema)?;
            let value = BigInt::from_signed_bytes_be(word);
            AbiValue::int(*bits, value)
                .map_err(|_| decode_err(schema, "decoded value exceeds the type's range"))
        }
        TypeSchema::Address => {
            let word = read_word(root, pos, schema)?;
            let mut addr = [0u8; 20];
            addr.copy_from_slice(&word[12..32]);
            Ok(AbiValue::Address(addr))
        }
        TypeSchema::Bool => {
            let word = read_word(root, pos, schema)?;
            // Lenient reading: only a final byte of exactly 1 is true.
            Ok(AbiValue::Bool(word[31] == 1))
        }
        TypeSchema::FixedBytes(n) => {
            let word = read_word(root, pos, schema)?;
            let content = word
                .get(..*n)
                .ok_or_else(|| decode_err(schema, "invalid fixed-bytes width"))?;
            AbiValue::fixed_bytes(content.to_vec())
                .map_err(|_| decode_err(schema, "invalid fixed-bytes width"))
        }
        TypeSchema::Array(elem, Some(n)) => {
            let body = root
                .get(pos..)
                .ok_or_else(|| decode_err(schema, "array body starts past the end of the data"))?;
            let values = decode_repeated(body, elem, *n)?;
            AbiValue::fixed_array((**elem).clone(), values)
                .map_err(|e| Error::AbiDecode(e.to_string()))
        }
        TypeSchema::Tuple(components) => {
            let body = root
                .get(pos..)
                .ok_or_else(|| decode_err(schema, "tuple body starts past the end of the data"))?;
            Ok(AbiValue::Tuple(decode_tuple(body, components)?))
        }
        _ => Err(decode_err(schema, "dynamic type reached the static path")),
    }
}

/// Decode a dynamic value whose encoding starts at the beginning of `tail`.
fn decode_dynamic(tail: &[u8], schema: &TypeSchema) -> Result<AbiValue> {
    match schema {
        TypeSchema::Bytes => Ok(AbiValue::Bytes(read_sized_payload(tail, schema)?)),
        TypeSchema::String => {
            let raw = read_sized_payload(tail, schema)?;
            let s = String::from_utf8(raw)
                .map_err(|_| decode_err(schema, "payload is not valid UTF-8"))?;
            Ok(AbiValue::String(s))
        }
        TypeSchema::Array(elem, None) => {
            let count = read_word_usize(tail, 0, schema, "length")?;
            let body = tail
                .get(32..)
                .ok_or_else(|| decode_err(schema, "array body starts past the end of the data"))?;
            let values = decode_repeated(body, elem, count)?;
            AbiValue::array((**elem).clone(), values).map_err(|e| Error::AbiDecode(e.to_string()))
        }
        TypeSchema::Array(elem, Some(n)) => {
            // Fixed-length array of dynamic elements: no length word.
            let values = decode_repeated(tail, elem, *n)?;
            AbiValue::fixed_array((**elem).clone(), values)
                .map_err(|e| Error::AbiDecode(e.to_string()))
        }
        TypeSchema::Tuple(components) => Ok(AbiValue::Tuple(decode_tuple(tail, components)?)),
        _ => Err(decode_err(schema, "static type reached the dynamic path")),
    }
}

/// Length word plus payload of a `bytes`/`string` tail. The payload is
/// right-zero-padded to a word boundary on the wire; the padded region must
/// be present, so any truncation surfaces as an error.
fn read_sized_payload(tail: &[u8], schema: &TypeSchema) -> Result<Vec<u8>> {
    let len = read_word_usize(tail, 0, schema, "length")?;
    let padded_end = crate::abi::encoder::padded_len(len)
        .checked_add(32)
        .ok_or_else(|| decode_err(schema, "length overflows the data"))?;
    if tail.len() < padded_end {
        return Err(decode_err(schema, "payload extends past the end of the data"));
    }
    Ok(tail[32..32 + len].to_vec())
}

fn read_word<'a>(root: &'a [u8], pos: usize, schema: &TypeSchema) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(32)
        .ok_or_else(|| decode_err(schema, "word position overflows"))?;
    root.get(pos..end)
        .ok_or_else(|| decode_err(schema, "word extends past the end of the data"))
}

/// Read a 32-byte unsigned word and narrow it to `usize`, rejecting anything
/// that does not fit a signed 32-bit integer.
fn read_word_usize(root: &[u8], pos: usize, schema: &TypeSchema, what: &str) -> Result<usize> {
    let word = read_word(root, pos, schema)?;
    let value = BigUint::from_bytes_be(word);
    let n = value
        .to_u64()
        .filter(|&n| n <= i32::MAX as u64)
        .ok_or_else(|| decode_err(schema, &format!("{what} does not fit a 32-bit integer")))?;
    Ok(n as usize)
}

fn decode_err(schema: &TypeSchema, msg: &str) -> Error {
    Error::AbiDecode(format!("{}: {}", schema.canonical(), msg))
}
