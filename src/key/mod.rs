//! Key space for logview
//!
//! Application keys ([`Key`]) are heterogeneous comparable values. The view
//! wraps them in [`ViewKey`], which adds the two reserved bookkeeping records.
//!
//! # Invariants
//!
//! - Byte order of encodings equals `Ord` of the decoded keys
//! - Reserved keys sort before every application key

mod codec;
mod errors;
mod view_key;

pub use codec::{Key, MAX_SAFE_INTEGER};
pub use errors::{KeyError, KeyResult};
pub use view_key::ViewKey;
