//! Keccak-256, as the ABI uses it.
//!
//! Canonical signatures hash to a 32-byte digest; a function call carries
//! the first four bytes of that digest as its selector, an event log carries
//! the whole digest as topic0. Note this is the original Keccak padding, not
//! the NIST SHA-3 variant.

use sha3::{Digest, Keccak256};

/// Keccak-256 digest of arbitrary bytes.
#[inline]
pub fn keccak256<B: AsRef<[u8]>>(bytes: B) -> [u8; 32] {
    Keccak256::digest(bytes.as_ref()).into()
}

/// Function selector: the leading four digest bytes of the canonical
/// signature, e.g. `"approve(address,uint256)"` → `095ea7b3`.
pub fn selector4(signature: &str) -> [u8; 4] {
    let digest = keccak256(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest[..4]);
    selector
}

/// Event topic0: the full digest of the canonical event signature.
#[inline]
pub fn event_topic(signature: &str) -> [u8; 32] {
    keccak256(signature.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::bytes::to_hex;

    #[test]
    fn erc20_selectors() {
        assert_eq!(to_hex(selector4("approve(address,uint256)")), "0x095ea7b3");
        assert_eq!(to_hex(selector4("balanceOf(address)")), "0x70a08231");
    }

    #[test]
    fn selector_is_topic_prefix() {
        let signature = "Approval(address,address,uint256)";
        assert_eq!(selector4(signature), event_topic(signature)[..4]);
    }

    #[test]
    fn transfer_event_topic_matches_reference() {
        assert_eq!(
            to_hex(event_topic("Transfer(address,address,uint256)")),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn empty_input_digest() {
        assert_eq!(
            to_hex(keccak256(b"")),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }
}
