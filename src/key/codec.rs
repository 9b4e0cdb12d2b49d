//! Order-preserving composite key encoding
//!
//! Application keys are heterogeneous: numbers, strings, timestamps and
//! arrays of any of them can share one index. The byte encoding produced here
//! compares (bytewise) exactly like the `Ord` of [`Key`], so the ordered store
//! iterates keys in application order.
//!
//! # Layout
//!
//! Every encoded key starts with a type tag. Tags start at `0x10`, which
//! leaves `0x00..0x10` free for reserved view records.
//!
//! - Null: `0x10`
//! - Bool: `0x20` (false) / `0x21` (true)
//! - Number: `0x30` + 8 bytes, IEEE-754 bits with sign handling
//! - Timestamp: `0x40` + 8 bytes of seconds since epoch (sign bit flipped),
//!   then 4 bytes of nanoseconds within the second
//! - Text: `0x50` + bytes with `0x00` escaped as `0x00 0xFF`, ends `0x00 0x01`
//! - Array: `0x60` + encoded elements, ends `0x00`

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{KeyError, KeyResult};

const TAG_NULL: u8 = 0x10;
const TAG_FALSE: u8 = 0x20;
const TAG_TRUE: u8 = 0x21;
const TAG_NUMBER: u8 = 0x30;
const TAG_TIMESTAMP: u8 = 0x40;
const TAG_TEXT: u8 = 0x50;
const TAG_ARRAY: u8 = 0x60;

const ESCAPE: u8 = 0x00;
const ESCAPED_ZERO: u8 = 0xFF;
const TEXT_END: u8 = 0x01;
const ARRAY_END: u8 = 0x00;

/// Largest integer magnitude an `f64` holds exactly.
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Lowest tag an application key can start with.
pub(crate) const MIN_USER_TAG: u8 = TAG_NULL;

/// An application index key.
///
/// Ordering is by type first (Null < Bool < Number < Timestamp < Text < Array)
/// and then by value. Numbers use IEEE-754 total ordering, so `-0.0 < 0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Null,
    Bool(bool),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
    Array(Vec<Key>),
}

impl Key {
    /// Create a key from a JSON value.
    ///
    /// Objects have no defined order and are not indexable.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Key::Null),
            serde_json::Value::Bool(b) => Some(Key::Bool(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Key::Number),
            serde_json::Value::String(s) => Some(Key::Text(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Key::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Key::Array),
            serde_json::Value::Object(_) => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Key::Null => 0,
            Key::Bool(_) => 1,
            Key::Number(_) => 2,
            Key::Timestamp(_) => 3,
            Key::Text(_) => 4,
            Key::Array(_) => 5,
        }
    }

    /// Encode into order-preserving bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        self.encode_into(&mut out);
        out
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Key::Null => out.push(TAG_NULL),
            Key::Bool(false) => out.push(TAG_FALSE),
            Key::Bool(true) => out.push(TAG_TRUE),
            Key::Number(n) => {
                out.push(TAG_NUMBER);
                out.extend_from_slice(&order_float(*n).to_be_bytes());
            }
            Key::Timestamp(ts) => {
                out.push(TAG_TIMESTAMP);
                let secs = ts.timestamp() as u64 ^ (1 << 63);
                out.extend_from_slice(&secs.to_be_bytes());
                out.extend_from_slice(&ts.timestamp_subsec_nanos().to_be_bytes());
            }
            Key::Text(s) => {
                out.push(TAG_TEXT);
                for &b in s.as_bytes() {
                    if b == ESCAPE {
                        out.push(ESCAPE);
                        out.push(ESCAPED_ZERO);
                    } else {
                        out.push(b);
                    }
                }
                out.push(ESCAPE);
                out.push(TEXT_END);
            }
            Key::Array(items) => {
                out.push(TAG_ARRAY);
                for item in items {
                    item.encode_into(out);
                }
                out.push(ARRAY_END);
            }
        }
    }

    /// Decode a key previously produced by [`Key::encode`].
    pub fn decode(bytes: &[u8]) -> KeyResult<Self> {
        if bytes.is_empty() {
            return Err(KeyError::Empty);
        }
        let (key, used) = Self::decode_at(bytes, 0)?;
        if used != bytes.len() {
            return Err(KeyError::Trailing(used));
        }
        Ok(key)
    }

    fn decode_at(bytes: &[u8], offset: usize) -> KeyResult<(Self, usize)> {
        let tag = *bytes.get(offset).ok_or(KeyError::Truncated(offset))?;
        let body = offset + 1;
        match tag {
            TAG_NULL => Ok((Key::Null, body)),
            TAG_FALSE => Ok((Key::Bool(false), body)),
            TAG_TRUE => Ok((Key::Bool(true), body)),
            TAG_NUMBER => {
                let raw = read_u64(bytes, body)?;
                Ok((Key::Number(unorder_float(raw)), body + 8))
            }
            TAG_TIMESTAMP => {
                let secs = (read_u64(bytes, body)? ^ (1 << 63)) as i64;
                let nanos = read_u32(bytes, body + 8)?;
                let ts = DateTime::<Utc>::from_timestamp(secs, nanos)
                    .ok_or(KeyError::InvalidTimestamp(secs))?;
                Ok((Key::Timestamp(ts), body + 12))
            }
            TAG_TEXT => {
                let mut raw = Vec::new();
                let mut pos = body;
                loop {
                    let b = *bytes.get(pos).ok_or(KeyError::Truncated(pos))?;
                    if b != ESCAPE {
                        raw.push(b);
                        pos += 1;
                        continue;
                    }
                    match bytes.get(pos + 1) {
                        Some(&ESCAPED_ZERO) => {
                            raw.push(0);
                            pos += 2;
                        }
                        Some(&TEXT_END) => {
                            pos += 2;
                            break;
                        }
                        Some(&other) => {
                            return Err(KeyError::UnknownTag {
                                tag: other,
                                offset: pos + 1,
                            })
                        }
                        None => return Err(KeyError::Truncated(pos + 1)),
                    }
                }
                let text = String::from_utf8(raw).map_err(|_| KeyError::InvalidText(body))?;
                Ok((Key::Text(text), pos))
            }
            TAG_ARRAY => {
                let mut items = Vec::new();
                let mut pos = body;
                loop {
                    match bytes.get(pos) {
                        Some(&ARRAY_END) => return Ok((Key::Array(items), pos + 1)),
                        Some(_) => {
                            let (item, next) = Self::decode_at(bytes, pos)?;
                            items.push(item);
                            pos = next;
                        }
                        None => return Err(KeyError::Truncated(pos)),
                    }
                }
            }
            other => Err(KeyError::UnknownTag { tag: other, offset }),
        }
    }
}

/// Map f64 bits onto u64 so unsigned comparison matches `f64::total_cmp`.
fn order_float(v: f64) -> u64 {
    let bits = v.to_bits();
    if (bits >> 63) == 1 {
        !bits
    } else {
        bits ^ (1 << 63)
    }
}

fn unorder_float(ordered: u64) -> f64 {
    let bits = if (ordered >> 63) == 1 {
        ordered ^ (1 << 63)
    } else {
        !ordered
    };
    f64::from_bits(bits)
}

fn read_u64(bytes: &[u8], offset: usize) -> KeyResult<u64> {
    let end = offset + 8;
    let slice = bytes.get(offset..end).ok_or(KeyError::Truncated(offset))?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(slice);
    Ok(u64::from_be_bytes(buf))
}

fn read_u32(bytes: &[u8], offset: usize) -> KeyResult<u32> {
    let end = offset + 4;
    let slice = bytes.get(offset..end).ok_or(KeyError::Truncated(offset))?;
    let mut buf = [0u8; 4];
    buf.copy_from_slice(slice);
    Ok(u32::from_be_bytes(buf))
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Null, Key::Null) => Ordering::Equal,
            (Key::Bool(a), Key::Bool(b)) => a.cmp(b),
            (Key::Number(a), Key::Number(b)) => a.total_cmp(b),
            (Key::Timestamp(a), Key::Timestamp(b)) => a.cmp(b),
            (Key::Text(a), Key::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Key::Array(a), Key::Array(b)) => a.iter().cmp(b.iter()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Null => write!(f, "null"),
            Key::Bool(b) => write!(f, "{}", b),
            Key::Number(n) => write!(f, "{}", n),
            Key::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
            Key::Text(s) => write!(f, "{:?}", s),
            Key::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Key {
    fn from(v: bool) -> Self {
        Key::Bool(v)
    }
}

impl From<i32> for Key {
    fn from(v: i32) -> Self {
        Key::Number(v as f64)
    }
}

/// Numbers are stored as `f64`; integers beyond [`MAX_SAFE_INTEGER`] would
/// collide with their neighbours and are rejected.
impl TryFrom<i64> for Key {
    type Error = KeyError;

    fn try_from(v: i64) -> KeyResult<Self> {
        if v.unsigned_abs() > MAX_SAFE_INTEGER as u64 {
            return Err(KeyError::UnsafeInteger(v.into()));
        }
        Ok(Key::Number(v as f64))
    }
}

impl From<u32> for Key {
    fn from(v: u32) -> Self {
        Key::Number(v as f64)
    }
}

impl TryFrom<u64> for Key {
    type Error = KeyError;

    fn try_from(v: u64) -> KeyResult<Self> {
        if v > MAX_SAFE_INTEGER as u64 {
            return Err(KeyError::UnsafeInteger(v.into()));
        }
        Ok(Key::Number(v as f64))
    }
}

impl From<f64> for Key {
    fn from(v: f64) -> Self {
        Key::Number(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Text(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Text(v)
    }
}

impl From<DateTime<Utc>> for Key {
    fn from(v: DateTime<Utc>) -> Self {
        Key::Timestamp(v)
    }
}

impl<K: Into<Key>> From<Vec<K>> for Key {
    fn from(v: Vec<K>) -> Self {
        Key::Array(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_keys() -> Vec<Key> {
        vec![
            Key::Null,
            Key::Bool(false),
            Key::Bool(true),
            Key::Number(f64::NEG_INFINITY),
            Key::Number(-1.5),
            Key::Number(-0.0),
            Key::Number(0.0),
            Key::Number(1.0),
            Key::Number(2.0),
            Key::Number(1e300),
            Key::Timestamp(Utc.timestamp_opt(-10, 0).unwrap()),
            Key::Timestamp(Utc.timestamp_opt(-1, 999_999_999).unwrap()),
            Key::Timestamp(Utc.timestamp_opt(0, 0).unwrap()),
            Key::Timestamp(Utc.timestamp_opt(0, 100).unwrap()),
            Key::Timestamp(Utc.timestamp_opt(0, 200).unwrap()),
            Key::Timestamp(Utc.timestamp_opt(0, 1_000).unwrap()),
            Key::Timestamp(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
            Key::from(""),
            Key::from("a"),
            Key::from("a\0"),
            Key::from("a\0b"),
            Key::from("a\u{1}"),
            Key::from("ab"),
            Key::from("b"),
            Key::Array(vec![]),
            Key::from(vec![1]),
            Key::from(vec![1, 2]),
            Key::Array(vec![Key::from(1), Key::from("x")]),
            Key::from(vec![2]),
            Key::Array(vec![Key::Array(vec![])]),
        ]
    }

    #[test]
    fn test_sample_keys_are_sorted() {
        let keys = sample_keys();
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "{} should sort before {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_encoding_preserves_order() {
        let keys = sample_keys();
        for a in &keys {
            for b in &keys {
                assert_eq!(
                    a.cmp(b),
                    a.encode().cmp(&b.encode()),
                    "encoding order differs for {} vs {}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn test_decode_inverts_encode() {
        for key in sample_keys() {
            let decoded = Key::decode(&key.encode()).unwrap();
            assert_eq!(decoded, key);
        }
    }

    #[test]
    fn test_user_keys_start_above_reserved_range() {
        for key in sample_keys() {
            assert!(key.encode()[0] >= MIN_USER_TAG);
        }
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(Key::decode(&[]), Err(KeyError::Empty));
        assert!(matches!(
            Key::decode(&[0x99]),
            Err(KeyError::UnknownTag { tag: 0x99, .. })
        ));
        assert!(matches!(Key::decode(&[TAG_NUMBER, 1, 2]), Err(KeyError::Truncated(_))));
        assert!(matches!(Key::decode(&[TAG_TEXT, b'a']), Err(KeyError::Truncated(_))));
        assert!(matches!(Key::decode(&[TAG_NULL, TAG_NULL]), Err(KeyError::Trailing(1))));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Key::from_json(&json!(3)), Some(Key::Number(3.0)));
        assert_eq!(Key::from_json(&json!("x")), Some(Key::from("x")));
        assert_eq!(
            Key::from_json(&json!(["a", 1, null])),
            Some(Key::Array(vec![Key::from("a"), Key::from(1), Key::Null]))
        );
        assert_eq!(Key::from_json(&json!({"a": 1})), None);
        assert_eq!(Key::from_json(&json!([{"a": 1}])), None);
    }

    #[test]
    fn test_ints_and_floats_share_one_order() {
        assert!(Key::from(1) < Key::from(1.5));
        assert!(Key::from(1.5) < Key::try_from(2i64).unwrap());
        assert_eq!(Key::try_from(2u64).unwrap(), Key::from(2.0));
    }

    #[test]
    fn test_integers_beyond_f64_precision_are_rejected() {
        assert_eq!(
            Key::try_from(MAX_SAFE_INTEGER).unwrap(),
            Key::Number(MAX_SAFE_INTEGER as f64)
        );
        assert!(Key::try_from(-MAX_SAFE_INTEGER).is_ok());
        assert_eq!(
            Key::try_from(MAX_SAFE_INTEGER + 1),
            Err(KeyError::UnsafeInteger(i128::from(MAX_SAFE_INTEGER) + 1))
        );
        assert!(Key::try_from(i64::MIN).is_err());
        assert!(Key::try_from(u64::MAX).is_err());
    }

    #[test]
    fn test_sub_microsecond_timestamps_stay_distinct() {
        let a = Key::Timestamp(Utc.timestamp_opt(0, 100).unwrap());
        let b = Key::Timestamp(Utc.timestamp_opt(0, 200).unwrap());
        assert!(a < b);
        assert_ne!(a.encode(), b.encode());
        assert_eq!(Key::decode(&b.encode()).unwrap(), b);
    }
}
