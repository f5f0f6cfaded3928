//! Static ABI type descriptions.
//!
//! A [`TypeSchema`] carries exactly the information needed to decode a value:
//! the variant picks the layout, widths pick the range checks. Parsing covers
//! the ABI type-string grammar (`uint256`, `bytes32`, `address[4][]`, ...);
//! `tuple` type strings need their `components` and are assembled by the
//! registry instead.

use crate::error::{Error, Result};

/// Closed description of an ABI type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSchema {
    /// Unsigned integer, width in bits (8, 16, ..., 256).
    Uint(u16),
    /// Signed two's-complement integer, width in bits (8, 16, ..., 256).
    Int(u16),
    /// 20-byte account address.
    Address,
    Bool,
    /// Fixed-length byte string, 1..=32 bytes.
    FixedBytes(usize),
    /// Dynamic byte string.
    Bytes,
    /// Dynamic UTF-8 string.
    String,
    /// Array of an element type; `None` length means dynamic `T[]`.
    Array(Box<TypeSchema>, Option<usize>),
    Tuple(Vec<TypeSchema>),
}

impl TypeSchema {
    /// Whether values of this type live in the tail of the enclosing tuple.
    pub fn is_dynamic(&self) -> bool {
        match self {
            TypeSchema::Bytes | TypeSchema::String => true,
            TypeSchema::Array(_, None) => true,
            TypeSchema::Array(elem, Some(_)) => elem.is_dynamic(),
            TypeSchema::Tuple(components) => components.iter().any(|c| c.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head of the enclosing tuple: 32 for
    /// any dynamic type (the offset slot), otherwise the full static size.
    pub fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            TypeSchema::Array(elem, Some(n)) => n * elem.head_size(),
            TypeSchema::Tuple(components) => components.iter().map(|c| c.head_size()).sum(),
            _ => 32,
        }
    }

    /// Canonical type name as used in signatures: `uint256`, `bytes32`,
    /// `(uint256,bool)[]`, ...
    pub fn canonical(&self) -> String {
        match self {
            TypeSchema::Uint(bits) => format!("uint{bits}"),
            TypeSchema::Int(bits) => format!("int{bits}"),
            TypeSchema::Address => "address".into(),
            TypeSchema::Bool => "bool".into(),
            TypeSchema::FixedBytes(n) => format!("bytes{n}"),
            TypeSchema::Bytes => "bytes".into(),
            TypeSchema::String => "string".into(),
            TypeSchema::Array(elem, Some(n)) => format!("{}[{n}]", elem.canonical()),
            TypeSchema::Array(elem, None) => format!("{}[]", elem.canonical()),
            TypeSchema::Tuple(components) => {
                let inner: Vec<String> = components.iter().map(|c| c.canonical()).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    /// Validated constructor for integer widths.
    pub fn uint(bits: u16) -> Result<Self> {
        check_int_width(bits, "uint")?;
        Ok(TypeSchema::Uint(bits))
    }

    /// Validated constructor for signed integer widths.
    pub fn int(bits: u16) -> Result<Self> {
        check_int_width(bits, "int")?;
        Ok(TypeSchema::Int(bits))
    }

    /// Validated constructor for `bytesN`.
    pub fn fixed_bytes(n: usize) -> Result<Self> {
        if !(1..=32).contains(&n) {
            return Err(Error::AbiEncode(format!("bytes{n}: size must be in 1..=32")));
        }
        Ok(TypeSchema::FixedBytes(n))
    }

    /// Parse an ABI type string: primitives plus `[N]`/`[]` array suffixes.
    ///
    /// `tuple` strings are rejected here; they carry their component types in
    /// a separate JSON field and are assembled by the registry.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (base, suffixes) = split_array_suffixes(s)?;
        let mut schema = parse_base(base)?;
        for suffix in suffixes {
            schema = TypeSchema::Array(Box::new(schema), suffix);
        }
        Ok(schema)
    }
}

fn check_int_width(bits: u16, kind: &str) -> Result<()> {
    if bits == 0 || bits > 256 || bits % 8 != 0 {
        return Err(Error::AbiEncode(format!(
            "{kind}{bits}: width must be a multiple of 8 in 8..=256"
        )));
    }
    Ok(())
}

/// Split `"uint8[3][]"` into `("uint8", [Some(3), None])`. Suffixes apply
/// left to right: the first group is the innermost array.
pub(crate) fn split_array_suffixes(s: &str) -> Result<(&str, Vec<Option<usize>>)> {
    let Some(open) = s.find('[') else {
        return Ok((s, Vec::new()));
    };
    let base = &s[..open];
    let mut suffixes = Vec::new();
    let mut rest = &s[open..];
    while !rest.is_empty() {
        if !rest.starts_with('[') {
            return Err(Error::AbiEncode(format!("unknown type string: {s}")));
        }
        let close = rest
            .find(']')
            .ok_or_else(|| Error::AbiEncode(format!("unbalanced array suffix in type: {s}")))?;
        let inner = &rest[1..close];
        if inner.is_empty() {
            suffixes.push(None);
        } else {
            let n: usize = inner
                .parse()
                .map_err(|_| Error::AbiEncode(format!("bad array length in type: {s}")))?;
            suffixes.push(Some(n));
        }
        rest = &rest[close + 1..];
    }
    Ok((base, suffixes))
}

fn parse_base(base: &str) -> Result<TypeSchema> {
    match base {
        "address" => return Ok(TypeSchema::Address),
        "bool" => return Ok(TypeSchema::Bool),
        "bytes" => return Ok(TypeSchema::Bytes),
        "string" => return Ok(TypeSchema::String),
        "uint" => return Ok(TypeSchema::Uint(256)),
        "int" => return Ok(TypeSchema::Int(256)),
        "tuple" => {
            return Err(Error::AbiEncode(
                "tuple type string requires components".into(),
            ))
        }
        _ => {}
    }
    if let Some(width) = base.strip_prefix("uint") {
        let bits: u16 = width
            .parse()
            .map_err(|_| Error::AbiEncode(format!("unknown type string: {base}")))?;
        return TypeSchema::uint(bits);
    }
    if let Some(width) = base.strip_prefix("int") {
        let bits: u16 = width
            .parse()
            .map_err(|_| Error::AbiEncode(format!("unknown type string: {base}")))?;
        return TypeSchema::int(bits);
    }
    if let Some(size) = base.strip_prefix("bytes") {
        let n: usize = size
            .parse()
            .map_err(|_| Error::AbiEncode(format!("unknown type string: {base}")))?;
        return TypeSchema::fixed_bytes(n);
    }
    Err(Error::AbiEncode(format!("unknown type string: {base}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_primitives() {
        assert_eq!(TypeSchema::parse("uint256").unwrap(), TypeSchema::Uint(256));
        assert_eq!(TypeSchema::parse("uint").unwrap(), TypeSchema::Uint(256));
        assert_eq!(TypeSchema::parse("int8").unwrap(), TypeSchema::Int(8));
        assert_eq!(TypeSchema::parse("bytes32").unwrap(), TypeSchema::FixedBytes(32));
        assert_eq!(TypeSchema::parse("bytes").unwrap(), TypeSchema::Bytes);
        assert_eq!(TypeSchema::parse("address").unwrap(), TypeSchema::Address);
        assert_eq!(TypeSchema::parse("string").unwrap(), TypeSchema::String);
    }

    #[test]
    fn parse_array_suffixes_innermost_first() {
        let t = TypeSchema::parse("uint8[3][]").unwrap();
        assert_eq!(
            t,
            TypeSchema::Array(
                Box::new(TypeSchema::Array(Box::new(TypeSchema::Uint(8)), Some(3))),
                None
            )
        );
    }

    #[test]
    fn reject_bad_widths_and_strings() {
        assert!(TypeSchema::parse("uint7").is_err());
        assert!(TypeSchema::parse("uint264").is_err());
        assert!(TypeSchema::parse("int0").is_err());
        assert!(TypeSchema::parse("bytes0").is_err());
        assert!(TypeSchema::parse("bytes33").is_err());
        assert!(TypeSchema::parse("tuple").is_err());
        assert!(TypeSchema::parse("uint256[").is_err());
        assert!(TypeSchema::parse("weird").is_err());
    }

    #[test]
    fn dynamic_classification() {
        assert!(!TypeSchema::Uint(256).is_dynamic());
        assert!(TypeSchema::Bytes.is_dynamic());
        assert!(TypeSchema::String.is_dynamic());
        assert!(TypeSchema::Array(Box::new(TypeSchema::Bool), None).is_dynamic());
        assert!(!TypeSchema::Array(Box::new(TypeSchema::Bool), Some(4)).is_dynamic());
        assert!(TypeSchema::Array(Box::new(TypeSchema::String), Some(4)).is_dynamic());
        assert!(!TypeSchema::Tuple(vec![TypeSchema::Bool, TypeSchema::Address]).is_dynamic());
        assert!(TypeSchema::Tuple(vec![TypeSchema::Bool, TypeSchema::Bytes]).is_dynamic());
    }

    #[test]
    fn head_sizes() {
        assert_eq!(TypeSchema::Uint(8).head_size(), 32);
        assert_eq!(TypeSchema::Bytes.head_size(), 32);
        assert_eq!(
            TypeSchema::Array(Box::new(TypeSchema::Uint(256)), Some(3)).head_size(),
            96
        );
        let pair = TypeSchema::Tuple(vec![TypeSchema::Bool, TypeSchema::Uint(256)]);
        assert_eq!(pair.head_size(), 64);
        assert_eq!(TypeSchema::Array(Box::new(pair), Some(2)).head_size(), 128);
    }

    #[test]
    fn canonical_names() {
        assert_eq!(TypeSchema::Uint(256).canonical(), "uint256");
        assert_eq!(
            TypeSchema::Array(Box::new(TypeSchema::FixedBytes(4)), Some(2)).canonical(),
            "bytes4[2]"
        );
        let t = TypeSchema::Array(
            Box::new(TypeSchema::Tuple(vec![TypeSchema::Uint(256), TypeSchema::Bool])),
            None,
        );
        assert_eq!(t.canonical(), "(uint256,bool)[]");
    }
}
