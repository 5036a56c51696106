//! Record identifiers and key normalization.

use std::borrow::Cow;

use crate::error::{Error, Result};

/// Default maximum length of a record id, in characters.
pub const DEFAULT_MAX_ID_LEN: usize = 64;

/// Anything that can address a record in a bounded store.
///
/// Integers are rendered in decimal, so `3` and `"3"` address the same
/// record.
pub trait RecordKey {
    /// Borrow or render the key as a string.
    fn as_key(&self) -> Cow<'_, str>;
}

impl RecordKey for &str {
    fn as_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl RecordKey for String {
    fn as_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl RecordKey for &String {
    fn as_key(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

macro_rules! integer_record_keys {
    ($($ty:ty),* $(,)?) => {
        $(
            impl RecordKey for $ty {
                fn as_key(&self) -> Cow<'_, str> {
                    Cow::Owned(self.to_string())
                }
            }
        )*
    };
}

integer_record_keys!(i32, i64, u32, u64, usize);

/// Render `key` and reject it when it is longer than `max_len` characters.
pub fn normalize_id<K: RecordKey + ?Sized>(key: &K, max_len: usize) -> Result<Cow<'_, str>> {
    let key = key.as_key();
    let len = key.chars().count();
    if len > max_len {
        return Err(Error::IdTooLong { len, max: max_len });
    }
    Ok(key)
}
