//! The view's key space
//!
//! Two reserved records live next to the application keys. Their position is
//! part of the type: `Meta < Cursor < User(_)`, and the byte encoding keeps
//! that order because every application key begins with a tag at or above
//! [`MIN_USER_TAG`].

use std::fmt;

use serde::{Deserialize, Serialize};

use super::codec::{Key, MIN_USER_TAG};
use super::errors::{KeyError, KeyResult};

const META_BYTE: u8 = 0x00;
const CURSOR_BYTE: u8 = 0x01;

/// Key of any record persisted by a view.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKey {
    /// The metadata record
    Meta,
    /// The lightweight cursor record
    Cursor,
    /// An application index key
    User(Key),
}

impl ViewKey {
    /// Returns true for the metadata and cursor records.
    pub fn is_reserved(&self) -> bool {
        !matches!(self, ViewKey::User(_))
    }

    /// Returns the application key, if this is one.
    pub fn user(&self) -> Option<&Key> {
        match self {
            ViewKey::User(k) => Some(k),
            _ => None,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            ViewKey::Meta => vec![META_BYTE],
            ViewKey::Cursor => vec![CURSOR_BYTE],
            ViewKey::User(k) => k.encode(),
        }
    }

    pub fn decode(bytes: &[u8]) -> KeyResult<Self> {
        match bytes {
            [] => Err(KeyError::Empty),
            [META_BYTE] => Ok(ViewKey::Meta),
            [CURSOR_BYTE] => Ok(ViewKey::Cursor),
            [first, ..] if *first >= MIN_USER_TAG => Key::decode(bytes).map(ViewKey::User),
            [first, ..] => Err(KeyError::UnknownTag {
                tag: *first,
                offset: 0,
            }),
        }
    }

    /// Smallest encoding any application key can have.
    pub(crate) fn user_floor() -> Vec<u8> {
        vec![MIN_USER_TAG]
    }
}

impl From<Key> for ViewKey {
    fn from(k: Key) -> Self {
        ViewKey::User(k)
    }
}

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewKey::Meta => write!(f, "<meta>"),
            ViewKey::Cursor => write!(f, "<cursor>"),
            ViewKey::User(k) => write!(f, "{}", k),
        }
    }
}
