//! JSON-driven ABI registry.
//!
//! Parses a contract ABI (the standard JSON array of function/event/
//! constructor entries) into named entries with pre-computed canonical
//! signatures, 4-byte selectors, and event topics. Each input parameter also
//! gets a pre-built converter tree mirroring its type structure, so encoding
//! a call from generic `serde_json::Value` arguments runs the two-pass
//! head/tail layout directly, without building intermediate typed values.
//!
//! Accepted argument shapes:
//! - integers: JSON numbers, decimal strings, or `0x`-hex strings
//! - `address` / `bytes` / `bytesN`: `0x`-hex strings
//! - `bool`: JSON booleans
//! - arrays and tuples: JSON arrays (tuples positional)

use crate::abi::decoder;
use crate::abi::encoder::{int_word, padded_len, uint_word, usize_word};
use crate::abi::schema::{split_array_suffixes, TypeSchema};
use crate::abi::value::AbiValue;
use crate::error::{Error, Result};
use crate::utils::bytes::{from_hex, to_hex, word_from_hex};
use crate::utils::hash::{event_topic, selector4};
use num_bigint::{BigInt, BigUint};
use serde::Deserialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;

// ----------------------------- Raw JSON shape ---------------------------------

fn default_kind() -> String {
    "function".into()
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(rename = "type", default = "default_kind")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    #[serde(rename = "stateMutability", default)]
    state_mutability: Option<String>,
    /// Legacy pre-metadata flag: `constant: true` means `view`.
    #[serde(default)]
    constant: Option<bool>,
    #[serde(default)]
    payable: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawParam {
    #[serde(default)]
    name: String,
    #[serde(rename = "type")]
    typ: String,
    #[serde(default)]
    indexed: bool,
    #[serde(default)]
    components: Vec<RawParam>,
}

impl RawParam {
    /// Build the schema, resolving `tuple` bases from `components` and
    /// applying array suffixes innermost-first.
    fn schema(&self) -> Result<TypeSchema> {
        let (base, suffixes) = split_array_suffixes(self.typ.trim())?;
        let mut schema = if base == "tuple" {
            let components = self
                .components
                .iter()
                .map(|c| c.schema())
                .collect::<Result<Vec<_>>>()?;
            if components.is_empty() {
                return Err(Error::AbiEncode(format!(
                    "parameter '{}': tuple type without components",
                    self.name
                )));
            }
            TypeSchema::Tuple(components)
        } else {
            TypeSchema::parse(base)?
        };
        for suffix in suffixes {
            schema = TypeSchema::Array(Box::new(schema), suffix);
        }
        Ok(schema)
    }
}

// ----------------------------- Public entries ---------------------------------

/// Function state mutability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateMutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl StateMutability {
    fn from_raw(entry: &RawEntry) -> Result<Self> {
        if let Some(s) = &entry.state_mutability {
            return match s.as_str() {
                "pure" => Ok(StateMutability::Pure),
                "view" => Ok(StateMutability::View),
                "nonpayable" => Ok(StateMutability::NonPayable),
                "payable" => Ok(StateMutability::Payable),
                other => Err(Error::AbiEncode(format!(
                    "'{}': unknown stateMutability '{other}'",
                    entry.name
                ))),
            };
        }
        if entry.payable == Some(true) {
            Ok(StateMutability::Payable)
        } else if entry.constant == Some(true) {
            Ok(StateMutability::View)
        } else {
            Ok(StateMutability::NonPayable)
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }
}

/// One typed parameter with its pre-built converter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub schema: TypeSchema,
    converter: Converter,
}

/// A contract function with pre-computed signature and selector.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub name: String,
    pub signature: String,
    pub selector: [u8; 4],
    pub inputs: Vec<ParamSpec>,
    pub outputs: Vec<ParamSpec>,
    pub mutability: StateMutability,
}

/// A contract event with pre-computed signature and topic0.
#[derive(Debug, Clone)]
pub struct EventEntry {
    pub name: String,
    pub signature: String,
    pub topic0: [u8; 32],
    pub inputs: Vec<EventParam>,
}

#[derive(Debug, Clone)]
pub struct EventParam {
    pub name: String,
    pub schema: TypeSchema,
    pub indexed: bool,
}

/// Constructor arguments (no name, no selector).
#[derive(Debug, Clone)]
pub struct ConstructorEntry {
    pub inputs: Vec<ParamSpec>,
}

/// A decoded event log: name plus named parameters in JSON-friendly form.
///
/// Dynamic indexed parameters only carry their hash in the topic; they are
/// surfaced as `<name>_hash` hex strings.
#[derive(Debug, Clone)]
pub struct DecodedEvent {
    pub name: String,
    pub params: JsonMap<String, JsonValue>,
}

// ----------------------------- Registry ---------------------------------------

/// Parsed contract ABI with named function/event/constructor entries.
#[derive(Debug, Clone, Default)]
pub struct AbiRegistry {
    functions: BTreeMap<String, FunctionEntry>,
    events: BTreeMap<String, EventEntry>,
    constructor: Option<ConstructorEntry>,
}

impl AbiRegistry {
    /// Parse a contract ABI JSON array.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: Vec<RawEntry> = serde_json::from_str(json)?;
        Self::from_entries(entries)
    }

    /// Parse from an already-deserialized JSON value.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let entries: Vec<RawEntry> = serde_json::from_value(value.clone())?;
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<RawEntry>) -> Result<Self> {
        let mut registry = AbiRegistry::default();
        for entry in entries {
            match entry.kind.as_str() {
                "function" => {
                    let f = build_function(&entry)?;
                    if registry.functions.contains_key(&f.name) {
                        // Overloading is out of scope for this layer.
                        return Err(Error::AbiEncode(format!(
                            "duplicate function name '{}'",
                            f.name
                        )));
                    }
                    registry.functions.insert(f.name.clone(), f);
                }
                "event" => {
                    let e = build_event(&entry)?;
                    if registry.events.contains_key(&e.name) {
                        return Err(Error::AbiEncode(format!(
                            "duplicate event name '{}'",
                            e.name
                        )));
                    }
                    registry.events.insert(e.name.clone(), e);
                }
                "constructor" => {
                    if registry.constructor.is_some() {
                        return Err(Error::AbiEncode("duplicate constructor entry".into()));
                    }
                    let inputs = build_params(&entry.inputs)?;
                    registry.constructor = Some(ConstructorEntry { inputs });
                }
                // fallback / receive / error entries carry nothing we encode
                // against at this layer.
                _ => {}
            }
        }
        Ok(registry)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionEntry> {
        self.functions.get(name)
    }

    pub fn event(&self, name: &str) -> Option<&EventEntry> {
        self.events.get(name)
    }

    pub fn constructor(&self) -> Option<&ConstructorEntry> {
        self.constructor.as_ref()
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionEntry> {
        self.functions.values()
    }

    pub fn events(&self) -> impl Iterator<Item = &EventEntry> {
        self.events.values()
    }

    /// Resolve a function by plain name, or by full canonical signature when
    /// the argument contains a `(`.
    fn resolve_function(&self, name_or_signature: &str) -> Result<&FunctionEntry> {
        if name_or_signature.contains('(') {
            self.functions
                .values()
                .find(|f| f.signature == name_or_signature)
                .ok_or_else(|| {
                    Error::AbiEncode(format!("unknown function signature '{name_or_signature}'"))
                })
        } else {
            self.functions.get(name_or_signature).ok_or_else(|| {
                Error::AbiEncode(format!("unknown function name '{name_or_signature}'"))
            })
        }
    }

    /// Encode a call to a named function from generic JSON arguments:
    /// 4-byte selector followed by the two-pass tuple layout run directly
    /// against the converter tree.
    pub fn encode_call(&self, name_or_signature: &str, args: &[JsonValue]) -> Result<Vec<u8>> {
        let f = self.resolve_function(name_or_signature)?;
        if args.len() != f.inputs.len() {
            return Err(Error::AbiEncode(format!(
                "{}: expected {} arguments, got {}",
                f.name,
                f.inputs.len(),
                args.len()
            )));
        }
        let items: Vec<(&Converter, &JsonValue)> = f
            .inputs
            .iter()
            .zip(args)
            .map(|(spec, arg)| (&spec.converter, arg))
            .collect();

        let mut total = 4usize;
        for (c, v) in &items {
            total += c.encoded_size(v).map_err(|e| in_function(&f.name, e))?;
        }
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&f.selector);
        encode_json_tuple(&items, &mut out).map_err(|e| in_function(&f.name, e))?;
        Ok(out)
    }

    /// Encode constructor arguments. An ABI without a constructor yields
    /// empty bytes only when no arguments are supplied.
    pub fn encode_constructor_args(&self, args: &[JsonValue]) -> Result<Vec<u8>> {
        let Some(ctor) = &self.constructor else {
            if args.is_empty() {
                return Ok(Vec::new());
            }
            return Err(Error::AbiEncode(format!(
                "no constructor in ABI but {} arguments supplied",
                args.len()
            )));
        };
        if args.len() != ctor.inputs.len() {
            return Err(Error::AbiEncode(format!(
                "constructor: expected {} arguments, got {}",
                ctor.inputs.len(),
                args.len()
            )));
        }
        let items: Vec<(&Converter, &JsonValue)> = ctor
            .inputs
            .iter()
            .zip(args)
            .map(|(spec, arg)| (&spec.converter, arg))
            .collect();
        let mut total = 0usize;
        for (c, v) in &items {
            total += c.encoded_size(v)?;
        }
        let mut out = Vec::with_capacity(total);
        encode_json_tuple(&items, &mut out)?;
        Ok(out)
    }

    /// Decode a hex response string under a function's output schemas.
    pub fn decode_output(&self, name_or_signature: &str, data: &str) -> Result<Vec<AbiValue>> {
        let f = self.resolve_function(name_or_signature)?;
        let bytes = from_hex(data)?;
        let schemas: Vec<TypeSchema> = f.outputs.iter().map(|o| o.schema.clone()).collect();
        decoder::decode(&bytes, &schemas)
    }

    /// Convenience for single-output functions.
    pub fn decode_output_single(&self, name_or_signature: &str, data: &str) -> Result<AbiValue> {
        let mut values = self.decode_output(name_or_signature, data)?;
        if values.len() != 1 {
            return Err(Error::AbiDecode(format!(
                "{name_or_signature}: expected a single output value, got {}",
                values.len()
            )));
        }
        Ok(values.remove(0))
    }

    /// Decode an event log: `topics[0]` must equal the event's topic0
    /// (case-insensitive hex), indexed parameters come out of `topics[1..]`,
    /// non-indexed parameters out of the data blob as one tuple.
    pub fn decode_event(
        &self,
        name: &str,
        topics: &[String],
        data: &str,
    ) -> Result<DecodedEvent> {
        let event = self
            .events
            .get(name)
            .ok_or_else(|| Error::AbiDecode(format!("unknown event name '{name}'")))?;

        let Some(topic0) = topics.first() else {
            return Err(Error::AbiDecode(format!("{name}: log has no topics")));
        };
        if from_hex(topic0)? != event.topic0 {
            return Err(Error::AbiDecode(format!(
                "{name}: topic0 does not match event signature {}",
                event.signature
            )));
        }

        let indexed_count = event.inputs.iter().filter(|p| p.indexed).count();
        if topics.len() - 1 != indexed_count {
            return Err(Error::AbiDecode(format!(
                "{name}: expected {indexed_count} indexed topics, got {}",
                topics.len() - 1
            )));
        }

        let mut params = JsonMap::new();
        let mut topic_iter = topics[1..].iter();
        for (i, input) in event.inputs.iter().enumerate() {
            if !input.indexed {
                continue;
            }
            let Some(topic) = topic_iter.next() else { break };
            let word = word_from_hex(topic).map_err(|_| {
                Error::AbiDecode(format!("{name}: indexed topic is not a 32-byte word"))
            })?;
            let key = param_key(&input.name, i);
            // Values that do not fit one word are stored hashed in the topic.
            if input.schema.is_dynamic() || input.schema.head_size() != 32 {
                params.insert(format!("{key}_hash"), JsonValue::String(to_hex(word)));
            } else {
                let mut decoded = decoder::decode(&word, &[input.schema.clone()])?;
                params.insert(key, decoded.remove(0).to_json());
            }
        }

        let non_indexed: Vec<(usize, &EventParam)> = event
            .inputs
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.indexed)
            .collect();
        let data_bytes = from_hex(data)?;
        let schemas: Vec<TypeSchema> =
            non_indexed.iter().map(|(_, p)| p.schema.clone()).collect();
        let values = decoder::decode(&data_bytes, &schemas)?;
        for ((i, param), value) in non_indexed.iter().zip(values) {
            params.insert(param_key(&param.name, *i), value.to_json());
        }

        Ok(DecodedEvent { name: event.name.clone(), params })
    }
}

fn param_key(name: &str, index: usize) -> String {
    if name.is_empty() {
        format!("arg{index}")
    } else {
        name.to_string()
    }
}

/// Decode the well-known multicall aggregate response `(bool,bytes)[]`.
pub fn decode_multicall_aggregate(data: &str) -> Result<Vec<(bool, Vec<u8>)>> {
    let bytes = from_hex(data)?;
    if bytes.is_empty() {
        return Err(Error::AbiDecode(
            "multicall aggregate response: empty payload".into(),
        ));
    }
    let schema = TypeSchema::Array(
        Box::new(TypeSchema::Tuple(vec![TypeSchema::Bool, TypeSchema::Bytes])),
        None,
    );
    let mut decoded = decoder::decode(&bytes, &[schema])?;
    let AbiValue::Array { values, .. } = decoded.remove(0) else {
        return Err(Error::AbiDecode(
            "multicall aggregate response: unexpected shape".into(),
        ));
    };
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        let AbiValue::Tuple(fields) = v else {
            return Err(Error::AbiDecode(
                "multicall aggregate entry: unexpected shape".into(),
            ));
        };
        let success = fields[0].as_bool().unwrap_or(false);
        let payload = fields[1].as_bytes().unwrap_or_default().to_vec();
        out.push((success, payload));
    }
    Ok(out)
}

// ----------------------------- Entry builders ---------------------------------

fn build_params(raw: &[RawParam]) -> Result<Vec<ParamSpec>> {
    raw.iter()
        .map(|p| {
            let schema = p.schema()?;
            let converter = Converter::from_schema(&schema);
            Ok(ParamSpec { name: p.name.clone(), schema, converter })
        })
        .collect()
}

fn canonical_signature(name: &str, params: &[ParamSpec]) -> String {
    let types: Vec<String> = params.iter().map(|p| p.schema.canonical()).collect();
    format!("{}({})", name, types.join(","))
}

fn build_function(entry: &RawEntry) -> Result<FunctionEntry> {
    if entry.name.is_empty() {
        return Err(Error::AbiEncode("function entry without a name".into()));
    }
    let inputs = build_params(&entry.inputs)?;
    let outputs = build_params(&entry.outputs)?;
    let signature = canonical_signature(&entry.name, &inputs);
    let selector = selector4(&signature);
    Ok(FunctionEntry {
        name: entry.name.clone(),
        signature,
        selector,
        inputs,
        outputs,
        mutability: StateMutability::from_raw(entry)?,
    })
}

fn build_event(entry: &RawEntry) -> Result<EventEntry> {
    if entry.name.is_empty() {
        return Err(Error::AbiEncode("event entry without a name".into()));
    }
    let mut inputs = Vec::with_capacity(entry.inputs.len());
    let mut types = Vec::with_capacity(entry.inputs.len());
    for p in &entry.inputs {
        let schema = p.schema()?;
        types.push(schema.canonical());
        inputs.push(EventParam { name: p.name.clone(), schema, indexed: p.indexed });
    }
    let signature = format!("{}({})", entry.name, types.join(","));
    let topic0 = event_topic(&signature);
    Ok(EventEntry { name: entry.name.clone(), signature, topic0, inputs })
}

fn in_function(name: &str, err: Error) -> Error {
    match err {
        Error::AbiEncode(msg) => Error::AbiEncode(format!("{name}: {msg}")),
        other => other,
    }
}

// ----------------------------- Converters -------------------------------------

/// Pre-built encoder for one parameter type, operating directly on JSON
/// values. The tree mirrors the parameter structure; it is constructed once
/// per ABI load and referenced on every encode.
#[derive(Debug, Clone)]
enum Converter {
    Uint(u16),
    Int(u16),
    Address,
    Bool,
    FixedBytes(usize),
    Bytes,
    String,
    Array { elem: Box<Converter>, size: Option<usize> },
    Tuple(Vec<Converter>),
}

impl Converter {
    fn from_schema(schema: &TypeSchema) -> Self {
        match schema {
            TypeSchema::Uint(bits) => Converter::Uint(*bits),
            TypeSchema::Int(bits) => Converter::Int(*bits),
            TypeSchema::Address => Converter::Address,
            TypeSchema::Bool => Converter::Bool,
            TypeSchema::FixedBytes(n) => Converter::FixedBytes(*n),
            TypeSchema::Bytes => Converter::Bytes,
            TypeSchema::String => Converter::String,
            TypeSchema::Array(elem, size) => Converter::Array {
                elem: Box::new(Converter::from_schema(elem)),
                size: *size,
            },
            TypeSchema::Tuple(components) => {
                Converter::Tuple(components.iter().map(Converter::from_schema).collect())
            }
        }
    }

    fn is_dynamic(&self) -> bool {
        match self {
            Converter::Bytes | Converter::String => true,
            Converter::Array { size: None, .. } => true,
            Converter::Array { elem, size: Some(_) } => elem.is_dynamic(),
            Converter::Tuple(components) => components.iter().any(|c| c.is_dynamic()),
            _ => false,
        }
    }

    fn head_size(&self) -> usize {
        if self.is_dynamic() {
            return 32;
        }
        match self {
            Converter::Array { elem, size: Some(n) } => n * elem.head_size(),
            Converter::Tuple(components) => components.iter().map(|c| c.head_size()).sum(),
            _ => 32,
        }
    }

    fn encoded_size(&self, v: &JsonValue) -> Result<usize> {
        if self.is_dynamic() {
            Ok(32 + self.content_size(v)?)
        } else {
            Ok(self.head_size())
        }
    }

    /// Tail size of a dynamic parameter for the given argument.
    fn content_size(&self, v: &JsonValue) -> Result<usize> {
        match self {
            Converter::Bytes => {
                let raw = json_to_bytes(v, "bytes")?;
                Ok(32 + padded_len(raw.len()))
            }
            Converter::String => {
                let s = v
                    .as_str()
                    .ok_or_else(|| Error::AbiEncode("string: expected a JSON string".into()))?;
                Ok(32 + padded_len(s.len()))
            }
            Converter::Array { elem, size } => {
                let items = self.array_items(v, *size)?;
                let mut sum = if size.is_none() { 32 } else { 0 };
                for item in items {
                    sum += elem.encoded_size(item)?;
                }
                Ok(sum)
            }
            Converter::Tuple(components) => {
                let fields = tuple_fields(v, components.len())?;
                let mut sum = 0;
                for (c, f) in components.iter().zip(fields) {
                    sum += c.encoded_size(f)?;
                }
                Ok(sum)
            }
            _ => Err(Error::AbiEncode("static parameter has no tail".into())),
        }
    }

    /// Emit the full inline encoding of a static parameter.
    fn encode_static(&self, v: &JsonValue, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Converter::Uint(bits) => {
                let value = json_to_biguint(v, *bits)?;
                out.extend_from_slice(&uint_word(&value)?);
            }
            Converter::Int(bits) => {
                let value = json_to_bigint(v, *bits)?;
                out.extend_from_slice(&int_word(&value)?);
            }
            Converter::Address => {
                let raw = json_to_bytes(v, "address")?;
                if raw.len() != 20 {
                    return Err(Error::AbiEncode(format!(
                        "address: expected 20 bytes, got {}",
                        raw.len()
                    )));
                }
                out.extend_from_slice(&[0u8; 12]);
                out.extend_from_slice(&raw);
            }
            Converter::Bool => {
                let b = v
                    .as_bool()
                    .ok_or_else(|| Error::AbiEncode("bool: expected a JSON boolean".into()))?;
                let mut word = [0u8; 32];
                word[31] = u8::from(b);
                out.extend_from_slice(&word);
            }
            Converter::FixedBytes(n) => {
                let raw = json_to_bytes(v, "bytes")?;
                if raw.len() != *n {
                    return Err(Error::AbiEncode(format!(
                        "bytes{n}: expected exactly {n} bytes, got {}",
                        raw.len()
                    )));
                }
                let mut word = [0u8; 32];
                word[..raw.len()].copy_from_slice(&raw);
                out.extend_from_slice(&word);
            }
            Converter::Array { elem, size } => {
                let items = self.array_items(v, *size)?;
                for item in items {
                    elem.encode_static(item, out)?;
                }
            }
            Converter::Tuple(components) => {
                let fields = tuple_fields(v, components.len())?;
                for (c, f) in components.iter().zip(fields) {
                    c.encode_static(f, out)?;
                }
            }
            Converter::Bytes | Converter::String => {
                return Err(Error::AbiEncode(
                    "dynamic parameter reached the static emit path".into(),
                ))
            }
        }
        Ok(())
    }

    /// Emit the tail bytes of a dynamic parameter.
    fn encode_content(&self, v: &JsonValue, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Converter::Bytes => {
                let raw = json_to_bytes(v, "bytes")?;
                out.extend_from_slice(&usize_word(raw.len()));
                let pad = padded_len(raw.len()) - raw.len();
                out.extend_from_slice(&raw);
                out.extend_from_slice(&vec![0u8; pad]);
            }
            Converter::String => {
                let s = v
                    .as_str()
                    .ok_or_else(|| Error::AbiEncode("string: expected a JSON string".into()))?;
                let raw = s.as_bytes();
                out.extend_from_slice(&usize_word(raw.len()));
                let pad = padded_len(raw.len()) - raw.len();
                out.extend_from_slice(raw);
                out.extend_from_slice(&vec![0u8; pad]);
            }
            Converter::Array { elem, size } => {
                let items = self.array_items(v, *size)?;
                if size.is_none() {
                    out.extend_from_slice(&usize_word(items.len()));
                }
                let pairs: Vec<(&Converter, &JsonValue)> =
                    items.iter().map(|item| (&**elem, *item)).collect();
                encode_json_tuple(&pairs, out)?;
            }
            Converter::Tuple(components) => {
                let fields = tuple_fields(v, components.len())?;
                let pairs: Vec<(&Converter, &JsonValue)> =
                    components.iter().zip(fields.iter().copied()).collect();
                encode_json_tuple(&pairs, out)?;
            }
            _ => return Err(Error::AbiEncode("static parameter has no tail".into())),
        }
        Ok(())
    }

    fn array_items<'v>(&self, v: &'v JsonValue, size: Option<usize>) -> Result<Vec<&'v JsonValue>> {
        let items = v
            .as_array()
            .ok_or_else(|| Error::AbiEncode("array: expected a JSON array".into()))?;
        if let Some(n) = size {
            if items.len() != n {
                return Err(Error::AbiEncode(format!(
                    "array: expected exactly {n} elements, got {}",
                    items.len()
                )));
            }
        }
        Ok(items.iter().collect())
    }
}

fn tuple_fields(v: &JsonValue, arity: usize) -> Result<Vec<&JsonValue>> {
    let fields = v
        .as_array()
        .ok_or_else(|| Error::AbiEncode("tuple: expected a JSON array".into()))?;
    if fields.len() != arity {
        return Err(Error::AbiEncode(format!(
            "tuple: expected {arity} fields, got {}",
            fields.len()
        )));
    }
    Ok(fields.iter().collect())
}

/// Two-pass tuple layout over (converter, argument) pairs.
fn encode_json_tuple(items: &[(&Converter, &JsonValue)], out: &mut Vec<u8>) -> Result<()> {
    let head_len: usize = items.iter().map(|(c, _)| c.head_size()).sum();
    let mut tail_cursor = head_len;
    for (c, v) in items {
        if c.is_dynamic() {
            out.extend_from_slice(&usize_word(tail_cursor));
            tail_cursor += c.content_size(v)?;
        } else {
            c.encode_static(v, out)?;
        }
    }
    for (c, v) in items {
        if c.is_dynamic() {
            c.encode_content(v, out)?;
        }
    }
    Ok(())
}

// ----------------------------- JSON coercions ---------------------------------

fn json_to_biguint(v: &JsonValue, bits: u16) -> Result<BigUint> {
    let value = match v {
        JsonValue::Number(n) => {
            let u = n.as_u64().ok_or_else(|| {
                Error::AbiEncode(format!("uint{bits}: expected a non-negative integer, got {n}"))
            })?;
            BigUint::from(u)
        }
        JsonValue::String(s) => parse_biguint_str(s)
            .ok_or_else(|| Error::AbiEncode(format!("uint{bits}: cannot parse '{s}'")))?,
        other => {
            return Err(Error::AbiEncode(format!(
                "uint{bits}: expected an integer, got {other}"
            )))
        }
    };
    if value.bits() > u64::from(bits) {
        return Err(Error::AbiEncode(format!("uint{bits}: value {value} out of range")));
    }
    Ok(value)
}

fn json_to_bigint(v: &JsonValue, bits: u16) -> Result<BigInt> {
    let value = match v {
        JsonValue::Number(n) => {
            let i = n.as_i64().ok_or_else(|| {
                Error::AbiEncode(format!("int{bits}: expected an integer, got {n}"))
            })?;
            BigInt::from(i)
        }
        JsonValue::String(s) => parse_bigint_str(s)
            .ok_or_else(|| Error::AbiEncode(format!("int{bits}: cannot parse '{s}'")))?,
        other => {
            return Err(Error::AbiEncode(format!(
                "int{bits}: expected an integer, got {other}"
            )))
        }
    };
    let bound = BigInt::from(1) << (u32::from(bits) - 1);
    if value < -&bound || value >= bound {
        return Err(Error::AbiEncode(format!("int{bits}: value {value} out of range")));
    }
    Ok(value)
}

fn parse_biguint_str(s: &str) -> Option<BigUint> {
    let s = s.trim();
    if let Some(hexpart) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        BigUint::parse_bytes(hexpart.as_bytes(), 16)
    } else {
        BigUint::parse_bytes(s.as_bytes(), 10)
    }
}

fn parse_bigint_str(s: &str) -> Option<BigInt> {
    let s = s.trim();
    if let Some(hexpart) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        BigInt::parse_bytes(hexpart.as_bytes(), 16)
    } else {
        BigInt::parse_bytes(s.as_bytes(), 10)
    }
}

fn json_to_bytes(v: &JsonValue, what: &str) -> Result<Vec<u8>> {
    let s = v
        .as_str()
        .ok_or_else(|| Error::AbiEncode(format!("{what}: expected a hex string")))?;
    from_hex(s).map_err(|_| Error::AbiEncode(format!("{what}: invalid hex string '{s}'")))
}

// ----------------------------- Tests ------------------------------------------
