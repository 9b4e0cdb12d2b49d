//! Range read options

use std::cmp::Ordering;
use std::ops::Bound;

use crate::errors::{ViewError, ViewResult};
use crate::key::{Key, ViewKey};
use crate::store::ScanRange;

use super::record::Projection;

/// Options for [`View::read`](crate::View::read).
///
/// Bounds apply to application keys. When both `gt` and `gte` (or `lt` and
/// `lte`) are set, the tighter one applies.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadOptions {
    pub gt: Option<Key>,
    pub gte: Option<Key>,
    pub lt: Option<Key>,
    pub lte: Option<Key>,
    pub reverse: bool,
    /// Maximum number of records emitted
    pub limit: Option<usize>,
    pub keys: bool,
    pub values: bool,
    pub seqs: bool,
    /// Also emit the metadata and cursor records (as `ViewKey::Meta` and
    /// `ViewKey::Cursor`) when no lower bound is given
    pub include_internal: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            gt: None,
            gte: None,
            lt: None,
            lte: None,
            reverse: false,
            limit: None,
            keys: true,
            values: true,
            seqs: true,
            include_internal: false,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gt(mut self, key: impl Into<Key>) -> Self {
        self.gt = Some(key.into());
        self
    }

    pub fn gte(mut self, key: impl Into<Key>) -> Self {
        self.gte = Some(key.into());
        self
    }

    pub fn lt(mut self, key: impl Into<Key>) -> Self {
        self.lt = Some(key.into());
        self
    }

    pub fn lte(mut self, key: impl Into<Key>) -> Self {
        self.lte = Some(key.into());
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn keys(mut self, keys: bool) -> Self {
        self.keys = keys;
        self
    }

    pub fn values(mut self, values: bool) -> Self {
        self.values = values;
        self
    }

    pub fn seqs(mut self, seqs: bool) -> Self {
        self.seqs = seqs;
        self
    }

    pub fn include_internal(mut self, include: bool) -> Self {
        self.include_internal = include;
        self
    }

    pub(crate) fn projection(&self) -> ViewResult<Projection> {
        Projection::from_flags(self.keys, self.values, self.seqs).ok_or_else(|| {
            ViewError::invalid_options("at least one of keys, values or seqs must be requested")
        })
    }

    pub(crate) fn range(&self) -> ScanRange {
        let lower = match tighter(&self.gt, &self.gte, Ordering::Greater) {
            Some(bound) => bound,
            None if self.include_internal => Bound::Unbounded,
            None => Bound::Included(ViewKey::user_floor()),
        };
        let upper = tighter(&self.lt, &self.lte, Ordering::Less).unwrap_or(Bound::Unbounded);
        ScanRange { lower, upper }
    }
}

/// Pick between an exclusive and an inclusive bound. `toward` is the
/// direction in which a bound becomes more restrictive.
fn tighter(
    exclusive: &Option<Key>,
    inclusive: &Option<Key>,
    toward: Ordering,
) -> Option<Bound<Vec<u8>>> {
    match (exclusive, inclusive) {
        (None, None) => None,
        (Some(ex), None) => Some(Bound::Excluded(ex.encode())),
        (None, Some(inc)) => Some(Bound::Included(inc.encode())),
        (Some(ex), Some(inc)) => {
            if inc.cmp(ex) == toward {
                Some(Bound::Included(inc.encode()))
            } else {
                Some(Bound::Excluded(ex.encode()))
            }
        }
    }
}
