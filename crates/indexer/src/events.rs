// Copyright (C) 2026 Parity Technologies (UK) Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

//! Runtime event model: decoding `System.Events` storage into a JSON shape
//! that survives persistence, the per-chain event-type filter, and the typed
//! view of the handful of Asset Hub events the interpreter acts on.
//!
//! Incoming event payloads are dynamically shaped; everything is kept as
//! `serde_json::Value` with camelCase keys, u128 amounts rendered as decimal
//! strings and byte blobs rendered as hex. Events the interpreter does not
//! recognize are persisted verbatim but never interpreted.

use crate::types::{ChainTag, ScoreStatus, ScoreTriple};
use heck::ToLowerCamelCase;
use scale_value::{Composite, Primitive, Value, ValueDef, Variant};
use serde_json::{Value as JsonValue, json};
use sp_core::crypto::{AccountId32, Ss58Codec};

/// A single decoded runtime event, in block order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Index of the event within its block.
    pub index: u32,
    /// Pallet name, lowerCamelCase (e.g. `stakingRcClient`).
    pub pallet: String,
    /// Event method name as emitted by the runtime (e.g. `SessionReportReceived`).
    pub method: String,
    /// Event fields: an object for named fields, an array otherwise.
    pub data: JsonValue,
}

impl RawEvent {
    /// `"{pallet}.{Method}"`, the type string persisted and filtered on.
    pub fn event_type(&self) -> String {
        format!("{}.{}", self.pallet, self.method)
    }

    /// `"{block}-{index}"`, the external deep-link id.
    pub fn event_id(&self, block_number: u64) -> String {
        format!("{}-{}", block_number, self.index)
    }
}

// ================================================================================================
// Event filtering
// ================================================================================================

/// Relay Chain: minimal set kept for cross-chain debugging.
const RC_EVENT_PREFIXES: &[&str] = &["staking.", "session."];

const AH_EVENT_PREFIXES: &[&str] = &[
    "staking.",
    "stakingrcclient.",
    "multiblockelection.",
    "multiblockelectionsigned.",
    "multiblockelectionverifier.",
];

const AH_EVENT_EXACT: &[&str] = &["session.newqueued", "session.newsession"];

/// Whether an event type string should be persisted for the given chain.
/// Matching is case-insensitive.
pub fn passes_filter(chain: ChainTag, event_type: &str) -> bool {
    let lowered = event_type.to_ascii_lowercase();
    match chain {
        ChainTag::Relay => RC_EVENT_PREFIXES.iter().any(|p| lowered.starts_with(p)),
        ChainTag::AssetHub => {
            AH_EVENT_PREFIXES.iter().any(|p| lowered.starts_with(p))
                || AH_EVENT_EXACT.iter().any(|e| lowered == *e)
        }
    }
}

// ================================================================================================
// scale-value -> JSON conversion
// ================================================================================================

/// Decode the value of `System.Events` storage into individual events.
///
/// The storage value is a sequence of event records, each a composite of
/// `phase`, `event` (the two-level pallet/method variant) and `topics`.
/// Records that do not match that shape are skipped.
pub fn decode_event_records<T>(value: Value<T>) -> Vec<RawEvent> {
    let records = match value.value {
        ValueDef::Composite(Composite::Unnamed(records)) => records,
        _ => return Vec::new(),
    };

    let mut events = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match decode_event_record(index as u32, record) {
            Some(event) => events.push(event),
            None => tracing::debug!(index, "skipped unparseable event record"),
        }
    }
    events
}

fn decode_event_record<T>(index: u32, record: Value<T>) -> Option<RawEvent> {
    let fields = match record.value {
        ValueDef::Composite(fields) => fields,
        _ => return None,
    };

    // EventRecord { phase, event, topics }; the dispatchable payload is the
    // `event` field (second position when the metadata carries no names).
    let event = match fields {
        Composite::Named(entries) => entries
            .into_iter()
            .find(|(name, _)| name == "event")
            .map(|(_, value)| value)?,
        Composite::Unnamed(mut items) => {
            if items.len() < 2 {
                return None;
            }
            items.swap_remove(1)
        }
    };

    // Outer variant names the pallet, inner variant names the method.
    let ValueDef::Variant(Variant {
        name: pallet,
        values,
    }) = event.value
    else {
        return None;
    };
    let inner = first_composite_value(values)?;
    let ValueDef::Variant(Variant {
        name: method,
        values: data,
    }) = inner.value
    else {
        return None;
    };

    Some(RawEvent {
        index,
        pallet: pallet.to_lower_camel_case(),
        method,
        data: composite_to_json(data),
    })
}

fn first_composite_value<T>(composite: Composite<T>) -> Option<Value<T>> {
    match composite {
        Composite::Unnamed(mut items) if !items.is_empty() => Some(items.swap_remove(0)),
        Composite::Named(entries) => entries.into_iter().next().map(|(_, value)| value),
        _ => None,
    }
}

/// Convert a decoded SCALE value into JSON: named composites become objects
/// with camelCase keys, byte blobs become hex strings, amounts wider than
/// u64 become decimal strings and variants become `{name, value(s)}`.
pub fn value_to_json<T>(value: Value<T>) -> JsonValue {
    match value.value {
        ValueDef::Composite(composite) => composite_to_json(composite),
        ValueDef::Variant(variant) => variant_to_json(variant),
        ValueDef::BitSequence(bits) => {
            JsonValue::Array(bits.iter().map(JsonValue::Bool).collect())
        }
        ValueDef::Primitive(primitive) => primitive_to_json(primitive),
    }
}

fn composite_to_json<T>(composite: Composite<T>) -> JsonValue {
    match composite {
        Composite::Named(entries) => {
            let mut object = serde_json::Map::with_capacity(entries.len());
            for (name, value) in entries {
                object.insert(name.to_lower_camel_case(), value_to_json(value));
            }
            JsonValue::Object(object)
        }
        Composite::Unnamed(items) => {
            if let Some(bytes) = as_byte_string(&items) {
                return JsonValue::String(format!("0x{}", hex::encode(bytes)));
            }
            JsonValue::Array(items.into_iter().map(value_to_json).collect())
        }
    }
}

fn variant_to_json<T>(variant: Variant<T>) -> JsonValue {
    let name = variant.name;
    match variant.values {
        Composite::Named(entries) if !entries.is_empty() => {
            let values = composite_to_json(Composite::Named(entries));
            json!({ "name": name, "values": values })
        }
        Composite::Unnamed(items) if items.len() == 1 => {
            let mut items = items;
            json!({ "name": name, "value": value_to_json(items.swap_remove(0)) })
        }
        Composite::Unnamed(items) if !items.is_empty() => {
            let values = composite_to_json(Composite::Unnamed(items));
            json!({ "name": name, "values": values })
        }
        _ => JsonValue::String(name),
    }
}

fn primitive_to_json(primitive: Primitive) -> JsonValue {
    match primitive {
        Primitive::Bool(b) => JsonValue::Bool(b),
        Primitive::Char(c) => JsonValue::String(c.to_string()),
        Primitive::String(s) => JsonValue::String(s),
        Primitive::U128(v) => {
            if v <= u64::MAX as u128 {
                json!(v as u64)
            } else {
                JsonValue::String(v.to_string())
            }
        }
        Primitive::I128(v) => {
            if v >= i64::MIN as i128 && v <= i64::MAX as i128 {
                json!(v as i64)
            } else {
                JsonValue::String(v.to_string())
            }
        }
        Primitive::U256(le_bytes) => {
            JsonValue::String(primitive_types::U256::from_little_endian(&le_bytes).to_string())
        }
        Primitive::I256(le_bytes) => JsonValue::String(format!("0x{}", hex::encode(le_bytes))),
    }
}

/// Byte-blob heuristic: an unnamed composite of at least four sub-255
/// integers is rendered as hex (account ids, hashes, opaque bytes).
fn as_byte_string<T>(items: &[Value<T>]) -> Option<Vec<u8>> {
    if items.len() < 4 {
        return None;
    }
    let mut bytes = Vec::with_capacity(items.len());
    for item in items {
        match &item.value {
            ValueDef::Primitive(Primitive::U128(v)) if *v <= u8::MAX as u128 => {
                bytes.push(*v as u8)
            }
            _ => return None,
        }
    }
    Some(bytes)
}

// ================================================================================================
// Typed view of the interpreted Asset Hub events
// ================================================================================================

/// The session report emitted on the Asset Hub once per ended session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub end_index: Option<u64>,
    pub validator_points: u64,
    /// Present exactly when this session boundary also starts a new era:
    /// `(start_timestamp_ms, new_era_id)`.
    pub activation: Option<(u64, u64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EraPaid {
    pub era_index: Option<u64>,
    pub validator_payout: Option<String>,
    pub remainder: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTransition {
    pub from: Option<String>,
    pub to: Option<String>,
    pub round: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedEventKind {
    Registered,
    Rewarded,
    Slashed,
    Ejected,
    Discarded,
    Bailed,
}

impl SignedEventKind {
    pub fn status(&self) -> ScoreStatus {
        match self {
            SignedEventKind::Registered => ScoreStatus::Registered,
            SignedEventKind::Rewarded => ScoreStatus::Rewarded,
            SignedEventKind::Slashed => ScoreStatus::Slashed,
            SignedEventKind::Ejected => ScoreStatus::Ejected,
            SignedEventKind::Discarded => ScoreStatus::Discarded,
            SignedEventKind::Bailed => ScoreStatus::Bailed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedSubmissionEvent {
    pub kind: SignedEventKind,
    pub round: Option<u64>,
    pub submitter: Option<String>,
    pub score: Option<ScoreTriple>,
}

/// The tagged union of events the interpreter acts on. Anything else is
/// persisted (when it passes the filter) but not interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum AhEvent {
    SessionReport(SessionReport),
    EraPaid(EraPaid),
    PhaseTransitioned(PhaseTransition),
    ElectionSigned(SignedSubmissionEvent),
}

impl AhEvent {
    pub fn parse(event: &RawEvent, ss58_prefix: u16) -> Option<AhEvent> {
        let pallet = event.pallet.as_str();
        if pallet.eq_ignore_ascii_case("stakingRcClient")
            && event.method == "SessionReportReceived"
        {
            return Some(AhEvent::SessionReport(parse_session_report(&event.data)));
        }
        if pallet.eq_ignore_ascii_case("staking") && event.method == "EraPaid" {
            return Some(AhEvent::EraPaid(parse_era_paid(&event.data)));
        }
        if pallet.eq_ignore_ascii_case("multiBlockElection")
            && event.method == "PhaseTransitioned"
        {
            return Some(AhEvent::PhaseTransitioned(parse_phase_transition(
                &event.data,
            )));
        }
        if pallet.eq_ignore_ascii_case("multiBlockElectionSigned") {
            let kind = match event.method.as_str() {
                "Registered" => SignedEventKind::Registered,
                "Rewarded" => SignedEventKind::Rewarded,
                "Slashed" => SignedEventKind::Slashed,
                "Ejected" => SignedEventKind::Ejected,
                "Discarded" => SignedEventKind::Discarded,
                "Bailed" => SignedEventKind::Bailed,
                // Unknown sub-events are silently ignored.
                _ => return None,
            };
            return Some(AhEvent::ElectionSigned(parse_signed_event(
                kind,
                &event.data,
                ss58_prefix,
            )));
        }
        None
    }
}

fn parse_session_report(data: &JsonValue) -> SessionReport {
    SessionReport {
        end_index: field(data, "endIndex").and_then(as_u64),
        validator_points: field(data, "validatorPointsCounts")
            .and_then(as_u64)
            .unwrap_or(0),
        activation: field(data, "activationTimestamp")
            .and_then(unwrap_option)
            .and_then(as_u64_pair),
    }
}

fn parse_era_paid(data: &JsonValue) -> EraPaid {
    EraPaid {
        era_index: field(data, "eraIndex").and_then(as_u64),
        validator_payout: field(data, "validatorPayout").and_then(as_big_decimal),
        remainder: field(data, "remainder").and_then(as_big_decimal),
    }
}

fn parse_phase_transition(data: &JsonValue) -> PhaseTransition {
    PhaseTransition {
        from: field(data, "from").and_then(phase_name),
        to: field(data, "to").and_then(phase_name),
        round: field(data, "round").and_then(as_u64),
    }
}

fn parse_signed_event(
    kind: SignedEventKind,
    data: &JsonValue,
    ss58_prefix: u16,
) -> SignedSubmissionEvent {
    let score = field(data, "claimedScore")
        .or_else(|| field(data, "score"))
        .and_then(as_score_triple);
    SignedSubmissionEvent {
        kind,
        round: field(data, "round").and_then(as_u64),
        submitter: field(data, "who")
            .or_else(|| field(data, "submitter"))
            .and_then(|v| account_ss58(v, ss58_prefix)),
        score,
    }
}

// ================================================================================================
// Field extractors
// ================================================================================================

fn field<'a>(data: &'a JsonValue, name: &str) -> Option<&'a JsonValue> {
    data.as_object().and_then(|object| object.get(name))
}

/// Accepts a JSON number or a decimal string.
fn as_u64(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// A planck amount: a number or a decimal string, normalized to a string.
fn as_big_decimal(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Number(n) => n.as_u64().map(|v| v.to_string()),
        JsonValue::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            Some(s.clone())
        }
        _ => None,
    }
}

/// Unwraps the JSON rendering of `Option<T>`: `"None"`/null yields `None`,
/// `{"name": "Some", "value": inner}` yields the inner value. A bare value
/// is passed through for runtimes that do not wrap.
fn unwrap_option(value: &JsonValue) -> Option<&JsonValue> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) if s == "None" => None,
        JsonValue::Object(object) => match object.get("name").and_then(|n| n.as_str()) {
            Some("Some") => object.get("value"),
            Some("None") => None,
            _ => Some(value),
        },
        _ => Some(value),
    }
}

fn as_u64_pair(value: &JsonValue) -> Option<(u64, u64)> {
    let items = value.as_array()?;
    if items.len() != 2 {
        return None;
    }
    Some((as_u64(&items[0])?, as_u64(&items[1])?))
}

fn as_score_triple(value: &JsonValue) -> Option<ScoreTriple> {
    // Named form {minimalStake, sumStake, sumStakeSquared} or positional triple.
    if let Some(object) = value.as_object() {
        return Some(ScoreTriple {
            minimal_stake: object.get("minimalStake").and_then(as_big_decimal)?,
            sum_stake: object.get("sumStake").and_then(as_big_decimal)?,
            sum_stake_squared: object.get("sumStakeSquared").and_then(as_big_decimal)?,
        });
    }
    let items = value.as_array()?;
    if items.len() != 3 {
        return None;
    }
    Some(ScoreTriple {
        minimal_stake: as_big_decimal(&items[0])?,
        sum_stake: as_big_decimal(&items[1])?,
        sum_stake_squared: as_big_decimal(&items[2])?,
    })
}

/// An election phase, either a bare name (`"Off"`) or a carrying variant
/// (`{"name": "Snapshot", "value": 4}`).
fn phase_name(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(object) => object
            .get("name")
            .and_then(|n| n.as_str())
            .map(|n| n.to_string()),
        _ => None,
    }
}

/// Renders an account id (hex string or byte array) as SS58.
fn account_ss58(value: &JsonValue, ss58_prefix: u16) -> Option<String> {
    let bytes: Vec<u8> = match value {
        JsonValue::String(s) => hex::decode(s.strip_prefix("0x")?).ok()?,
        JsonValue::Array(items) => items
            .iter()
            .map(|item| as_u64(item).and_then(|v| u8::try_from(v).ok()))
            .collect::<Option<Vec<u8>>>()?,
        _ => return None,
    };
    let raw: [u8; 32] = bytes.try_into().ok()?;
    Some(AccountId32::from(raw).to_ss58check_with_version(ss58_prefix.into()))
}
