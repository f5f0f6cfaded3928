// Codec properties: round-trips over randomly generated schema/value trees
// (nesting depth up to 3), determinism, truncation safety, and the literal
// byte layouts every implementation must reproduce.

use ethlink_sdk::abi::{decode, encode, encode_function, AbiValue, TypeSchema};
use ethlink_sdk::utils::bytes::to_hex;
use ethlink_sdk::utils::hash::{event_topic, selector4};
use proptest::prelude::*;

// ----------------------------- Strategies -------------------------------------

fn arb_schema(depth: u32) -> BoxedStrategy<TypeSchema> {
    let leaf = prop_oneof![
        (1u16..=32).prop_map(|k| TypeSchema::Uint(k * 8)),
        (1u16..=32).prop_map(|k| TypeSchema::Int(k * 8)),
        Just(TypeSchema::Address),
        Just(TypeSchema::Bool),
        (1usize..=32).prop_map(TypeSchema::FixedBytes),
        Just(TypeSchema::Bytes),
        Just(TypeSchema::String),
    ];
    if depth == 0 {
        return leaf.boxed();
    }
    let inner = arb_schema(depth - 1);
    prop_oneof![
        4 => leaf,
        1 => inner
            .clone()
            .prop_map(|e| TypeSchema::Array(Box::new(e), None)),
        1 => (inner.clone(), 0usize..=3)
            .prop_map(|(e, n)| TypeSchema::Array(Box::new(e), Some(n))),
        1 => prop::collection::vec(inner, 1..=3).prop_map(TypeSchema::Tuple),
    ]
    .boxed()
}

fn value_for(schema: &TypeSchema) -> BoxedStrategy<AbiValue> {
    match schema {
        TypeSchema::Uint(bits) => {
            let bits = *bits;
            any::<u64>()
                .prop_map(move |v| {
                    let v = if bits < 64 { v & ((1u64 << bits) - 1) } else { v };
                    AbiValue::uint(bits, v).unwrap()
                })
                .boxed()
        }
        TypeSchema::Int(bits) => {
            let bits = *bits;
            any::<i64>()
                .prop_map(move |v| {
                    let v = if bits <= 64 {
                        let bound = 1i128 << (bits - 1);
                        (v as i128).rem_euclid(bound << 1) - bound
                    } else {
                        v as i128
                    };
                    AbiValue::int(bits, v).unwrap()
                })
                .boxed()
        }
        TypeSchema::Address => any::<[u8; 20]>().prop_map(AbiValue::address).boxed(),
        TypeSchema::Bool => any::<bool>().prop_map(AbiValue::Bool).boxed(),
        TypeSchema::FixedBytes(n) => prop::collection::vec(any::<u8>(), *n)
            .prop_map(|b| AbiValue::fixed_bytes(b).unwrap())
            .boxed(),
        TypeSchema::Bytes => prop::collection::vec(any::<u8>(), 0..=64)
            .prop_map(AbiValue::bytes)
            .boxed(),
        TypeSchema::String => "[ -~]{0,48}".prop_map(AbiValue::string).boxed(),
        TypeSchema::Array(elem, None) => {
            let elem_schema = (**elem).clone();
            prop::collection::vec(value_for(elem), 0..=3)
                .prop_map(move |vs| AbiValue::array(elem_schema.clone(), vs).unwrap())
                .boxed()
        }
        TypeSchema::Array(elem, Some(n)) => {
            let elem_schema = (**elem).clone();
            prop::collection::vec(value_for(elem), *n)
                .prop_map(move |vs| AbiValue::fixed_array(elem_schema.clone(), vs).unwrap())
                .boxed()
        }
        TypeSchema::Tuple(components) => {
            let strategies: Vec<BoxedStrategy<AbiValue>> =
                components.iter().map(value_for).collect();
            strategies.prop_map(AbiValue::Tuple).boxed()
        }
    }
}

fn schema_and_value() -> impl Strategy<Value = (TypeSchema, AbiValue)> {
    arb_schema(2).prop_flat_map(|schema| {
        let cloned = schema.clone();
        value_for(&schema).prop_map(move |value| (cloned.clone(), value))
    })
}

// ----------------------------- Properties -------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn roundtrip_preserves_value((schema, value) in schema_and_value()) {
        let data = encode(std::slice::from_ref(&value)).unwrap();
        let decoded = decode(&data, std::slice::from_ref(&schema)).unwrap();
        prop_assert_eq!(decoded, vec![value]);
    }

    #[test]
    fn encoding_is_deterministic((_schema, value) in schema_and_value()) {
        let a = encode(std::slice::from_ref(&value)).unwrap();
        let b = encode(std::slice::from_ref(&value)).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn single_byte_truncation_errors((schema, value) in schema_and_value()) {
        let data = encode(std::slice::from_ref(&value)).unwrap();
        prop_assert!(!data.is_empty());
        let truncated = &data[..data.len() - 1];
        prop_assert!(decode(truncated, std::slice::from_ref(&schema)).is_err());
    }

    #[test]
    fn value_schema_dynamicity_agrees((schema, value) in schema_and_value()) {
        prop_assert_eq!(schema.is_dynamic(), value.is_dynamic());
        prop_assert_eq!(value.schema(), schema);
    }
}

// ----------------------------- Literal vectors --------------------------------

fn word(n: u64) -> [u8; 32] {
    let mut w = [0u8; 32];
    w[24..].copy_from_slice(&n.to_be_bytes());
    w
}

#[test]
fn transfer_call_is_byte_exact() {
    let mut to = [0u8; 20];
    to[19] = 1;
    let data = encode_function(
        "transfer(address,uint256)",
        &[AbiValue::address(to), AbiValue::uint256(1000u32)],
    )
    .unwrap();
    assert_eq!(to_hex(&data[..4]), "0xa9059cbb");
    assert_eq!(data[4..36], word(1));
    assert_eq!(data[36..68], word(0x3e8));
}

#[test]
fn set_string_layout_is_byte_exact() {
    let data = encode_function("set(string)", &[AbiValue::string("Hello, Bob!")]).unwrap();
    assert_eq!(data[4..36], word(0x20));
    assert_eq!(data[36..68], word(0x0b));
    let mut padded = [0u8; 32];
    padded[..11].copy_from_slice(b"Hello, Bob!");
    assert_eq!(data[68..100], padded);
}

#[test]
fn transfer_event_topic_matches_reference() {
    assert_eq!(
        to_hex(event_topic("Transfer(address,address,uint256)")),
        "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
    );
}

#[test]
fn selectors_match_keccak_prefix() {
    for signature in [
        "transfer(address,uint256)",
        "balanceOf(address)",
        "approve(address,uint256)",
        "submit((address,uint256[]))",
    ] {
        let selector = selector4(signature);
        let topic = event_topic(signature);
        assert_eq!(selector, topic[..4]);
    }
}

#[test]
fn uint256_array_five_word_roundtrip() {
    let array = AbiValue::array(
        TypeSchema::Uint(256),
        vec![
            AbiValue::uint256(1u8),
            AbiValue::uint256(2u8),
            AbiValue::uint256(3u8),
        ],
    )
    .unwrap();
    let data = encode(std::slice::from_ref(&array)).unwrap();

    let words: Vec<[u8; 32]> = data.chunks(32).map(|c| c.try_into().unwrap()).collect();
    assert_eq!(words, vec![word(0x20), word(3), word(1), word(2), word(3)]);

    let schema = TypeSchema::Array(Box::new(TypeSchema::Uint(256)), None);
    let decoded = decode(&data, std::slice::from_ref(&schema)).unwrap();
    assert_eq!(decoded, vec![array]);
}

#[test]
fn nested_dynamic_composition_roundtrip() {
    // string[][2] inside a tuple next to statics, depth 3.
    let inner_a = AbiValue::array(
        TypeSchema::String,
        vec![AbiValue::string("alpha"), AbiValue::string("beta")],
    )
    .unwrap();
    let inner_b = AbiValue::array(TypeSchema::String, vec![]).unwrap();
    let pair = AbiValue::fixed_array(
        TypeSchema::Array(Box::new(TypeSchema::String), None),
        vec![inner_a, inner_b],
    )
    .unwrap();
    let value = AbiValue::tuple(vec![
        AbiValue::uint(32, 9u8).unwrap(),
        pair,
        AbiValue::Bool(true),
    ]);

    let schema = value.schema();
    let data = encode(std::slice::from_ref(&value)).unwrap();
    let decoded = decode(&data, std::slice::from_ref(&schema)).unwrap();
    assert_eq!(decoded, vec![value]);
}
