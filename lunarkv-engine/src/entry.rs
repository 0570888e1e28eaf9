//! # Entry
//!
//! The value union stored behind every key: either a string or an
//! ordered list, carrying an optional absolute expiry on the monotonic
//! clock.

use std::collections::VecDeque;
use std::time::Instant;

/// The payload half of an [`Entry`]. The variant tag is fixed for the
/// lifetime of an entry; a list can never be overwritten as a string
/// (or vice versa) without a delete in between.
#[derive(Debug, Clone)]
pub enum EntryValue {
    Str(Vec<u8>),
    List(VecDeque<Vec<u8>>),
}

impl EntryValue {
    pub fn is_list(&self) -> bool {
        matches!(self, EntryValue::List(_))
    }
}

/// A single stored key's value plus its expiry.
#[derive(Debug, Clone)]
pub struct Entry {
    pub value: EntryValue,
    /// `None` means the entry never expires.
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new_str(value: Vec<u8>, expires_at: Option<Instant>) -> Self {
        Entry {
            value: EntryValue::Str(value),
            expires_at,
        }
    }

    pub fn new_list(initial: Vec<u8>) -> Self {
        let mut list = VecDeque::with_capacity(1);
        list.push_back(initial);
        Entry {
            value: EntryValue::List(list),
            expires_at: None,
        }
    }

    /// Returns true if the entry's expiry is set and not in the future.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}
