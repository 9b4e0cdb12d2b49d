//! Projected record shapes

use serde_json::Value;

use crate::key::ViewKey;
use crate::log::Seq;

/// Which fields a range read emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Full,
    KeyValue,
    KeySeq,
    SeqValue,
    KeyOnly,
    SeqOnly,
    ValueOnly,
}

impl Projection {
    /// `None` when nothing is requested.
    pub fn from_flags(keys: bool, values: bool, seqs: bool) -> Option<Self> {
        match (keys, values, seqs) {
            (true, true, true) => Some(Projection::Full),
            (true, true, false) => Some(Projection::KeyValue),
            (true, false, true) => Some(Projection::KeySeq),
            (false, true, true) => Some(Projection::SeqValue),
            (true, false, false) => Some(Projection::KeyOnly),
            (false, false, true) => Some(Projection::SeqOnly),
            (false, true, false) => Some(Projection::ValueOnly),
            (false, false, false) => None,
        }
    }

    /// Whether values must be resolved.
    pub fn wants_values(self) -> bool {
        matches!(
            self,
            Projection::Full | Projection::KeyValue | Projection::SeqValue | Projection::ValueOnly
        )
    }

    /// `value` is ignored unless [`wants_values`](Self::wants_values).
    pub(crate) fn build(self, key: ViewKey, seq: Seq, value: Option<Value>) -> Record {
        let value = value.unwrap_or(Value::Null);
        match self {
            Projection::Full => Record::Full { key, seq, value },
            Projection::KeyValue => Record::KeyValue { key, value },
            Projection::KeySeq => Record::KeySeq { key, seq },
            Projection::SeqValue => Record::SeqValue { seq, value },
            Projection::KeyOnly => Record::Key(key),
            Projection::SeqOnly => Record::Seq(seq),
            Projection::ValueOnly => Record::Value(value),
        }
    }
}

/// One emitted record, shaped by its [`Projection`].
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Full { key: ViewKey, seq: Seq, value: Value },
    KeyValue { key: ViewKey, value: Value },
    KeySeq { key: ViewKey, seq: Seq },
    SeqValue { seq: Seq, value: Value },
    Key(ViewKey),
    Seq(Seq),
    Value(Value),
}

impl Record {
    pub fn key(&self) -> Option<&ViewKey> {
        match self {
            Record::Full { key, .. }
            | Record::KeyValue { key, .. }
            | Record::KeySeq { key, .. }
            | Record::Key(key) => Some(key),
            _ => None,
        }
    }

    pub fn seq(&self) -> Option<Seq> {
        match self {
            Record::Full { seq, .. }
            | Record::KeySeq { seq, .. }
            | Record::SeqValue { seq, .. }
            | Record::Seq(seq) => Some(*seq),
            _ => None,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Record::Full { value, .. }
            | Record::KeyValue { value, .. }
            | Record::SeqValue { value, .. }
            | Record::Value(value) => Some(value),
            _ => None,
        }
    }
}
