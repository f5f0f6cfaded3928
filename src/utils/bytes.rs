//! Hex codec for the ABI wire surface.
//!
//! Everything this SDK exchanges with a node is hex text: calldata, return
//! blobs, event topics, addresses. Canonical output is lowercase and
//! `0x`-prefixed; parsing accepts the prefix in either case (servers
//! disagree) and tolerates an odd digit count, which nodes produce when they
//! print quantities. Beyond the raw codec, the helpers here enforce the two
//! fixed widths the ABI cares about: the 32-byte word and the 20-byte
//! address.

use crate::error::{Error, Result};

/// Strip an optional `0x`/`0X` prefix.
#[inline]
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Canonical lowercase `0x`-hex. Empty input renders as `"0x"`.
pub fn to_hex<B: AsRef<[u8]>>(bytes: B) -> String {
    let bytes = bytes.as_ref();
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    out.push_str(&hex::encode(bytes));
    out
}

/// Decode hex with or without the prefix, case-insensitively. An odd digit
/// count gets a leading zero nibble, so `"0x3e8"` reads as `[0x03, 0xe8]`.
pub fn from_hex(s: &str) -> Result<Vec<u8>> {
    let digits = strip_hex_prefix(s.trim());
    if digits.is_empty() {
        return Ok(Vec::new());
    }
    if digits.len() % 2 == 0 {
        Ok(hex::decode(digits)?)
    } else {
        let mut padded = String::with_capacity(digits.len() + 1);
        padded.push('0');
        padded.push_str(digits);
        Ok(hex::decode(padded)?)
    }
}

/// Decode exactly one 32-byte ABI word (an event topic, a head slot).
pub fn word_from_hex(s: &str) -> Result<[u8; 32]> {
    let bytes = from_hex(s)?;
    bytes.as_slice().try_into().map_err(|_| {
        Error::AbiDecode(format!(
            "expected a 32-byte word, got {} bytes",
            bytes.len()
        ))
    })
}

/// Decode a 20-byte account address.
pub fn address_from_hex(s: &str) -> Result<[u8; 20]> {
    let bytes = from_hex(s)?;
    bytes.as_slice().try_into().map_err(|_| {
        Error::AbiEncode(format!(
            "address: expected 20 bytes, got {}",
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_is_lowercase_prefixed() {
        assert_eq!(to_hex([0xDE, 0xAD, 0x01]), "0xdead01");
        assert_eq!(to_hex([0u8; 0]), "0x");
        assert_eq!(from_hex(&to_hex([0xC0, 0xFF, 0xEE])).unwrap(), vec![0xc0, 0xff, 0xee]);
    }

    #[test]
    fn accepts_prefix_case_and_odd_nibbles() {
        assert_eq!(from_hex("0X00FF").unwrap(), vec![0x00, 0xff]);
        assert_eq!(from_hex("a9059cbb").unwrap(), vec![0xa9, 0x05, 0x9c, 0xbb]);
        // Quantity form: odd digit count, as eth_blockNumber returns it.
        assert_eq!(from_hex("0x3e8").unwrap(), vec![0x03, 0xe8]);
        assert!(from_hex("0x").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_hex_digits() {
        assert!(from_hex("0xzz").is_err());
        assert!(from_hex("12 34").is_err());
    }

    #[test]
    fn word_width_enforced() {
        let topic = "0x000000000000000000000000000000000000000000000000000000000000002a";
        assert_eq!(word_from_hex(topic).unwrap()[31], 0x2a);
        // A 20-byte address is not a word.
        assert!(word_from_hex("0x1111111111111111111111111111111111111111").is_err());
        assert!(word_from_hex("0x").is_err());
    }

    #[test]
    fn address_width_enforced() {
        let addr = address_from_hex("0x5FbDB2315678afecb367f032d93F642f64180aa3").unwrap();
        assert_eq!(addr[0], 0x5f);
        assert_eq!(addr[19], 0xa3);
        // A 32-byte word is not an address.
        assert!(address_from_hex(
            "0x0000000000000000000000005fbdb2315678afecb367f032d93f642f64180aa3"
        )
        .is_err());
    }
}
