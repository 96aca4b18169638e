//! The capability traits shared by every session kind.
//!
//! [`Store`](super::Store) handles and [`Scanner`](super::Scanner) cursors
//! are generic over these, so the same prefixed-key translation serves
//! snapshot, batch and transient sessions alike. Write capability is a
//! property of the session type: read-only sessions simply do not
//! implement [`WriteSession`].

use std::future::Future;
use std::ops::Range;

use crate::cnf::SCAN_BATCH_SIZE;
use crate::err::Error;
use crate::kvs::{Key, Scanner, Val};

pub trait ReadSession {
	/// Fetch a key. Fails with [`Error::NotFound`] when the key is absent.
	fn get<K>(&self, key: K) -> impl Future<Output = Result<Val, Error>>
	where
		K: Into<Key>;

	/// Check if a key exists.
	fn exists<K>(&self, key: K) -> impl Future<Output = Result<bool, Error>>
	where
		K: Into<Key>;

	/// Fetch one page of an ordered range. An empty range end means no
	/// upper bound.
	fn scan(
		&self,
		rng: Range<Key>,
		limit: u32,
	) -> impl Future<Output = Result<Vec<(Key, Val)>, Error>>;

	/// An ordered cursor over `[lower, upper)`, streaming pages of
	/// [`SCAN_BATCH_SIZE`] behind the scenes. The cursor is released by
	/// dropping it.
	fn iter<K>(&self, lower: K, upper: K) -> Scanner<'_, Self>
	where
		K: Into<Key>,
		Self: Sized,
	{
		Scanner::new(self, SCAN_BATCH_SIZE, lower.into()..upper.into())
	}
}

pub trait WriteSession: ReadSession {
	/// Set a key, overwriting any existing value.
	fn put<K, V>(&mut self, key: K, val: V) -> impl Future<Output = Result<(), Error>>
	where
		K: Into<Key>,
		V: Into<Val>;

	/// Set a key, failing with [`Error::AlreadyExists`] if it is present.
	fn insert<K, V>(&mut self, key: K, val: V) -> impl Future<Output = Result<(), Error>>
	where
		K: Into<Key>,
		V: Into<Val>;

	/// Delete a key. Deleting an absent key is a no-op.
	fn delete<K>(&mut self, key: K) -> impl Future<Output = Result<(), Error>>
	where
		K: Into<Key>;

	/// Delete every key in `[lower, upper)`, one key at a time so each
	/// pre-image is recorded.
	fn delete_range<K>(&mut self, lower: K, upper: K) -> impl Future<Output = Result<(), Error>>
	where
		K: Into<Key>;
}

/// Reject the zero-length keys and values the layout reserves.
pub(super) fn check_key(key: &[u8]) -> Result<(), Error> {
	match key.is_empty() {
		true => Err(Error::Invalid("empty key".into())),
		false => Ok(()),
	}
}

pub(super) fn check_val(val: &[u8]) -> Result<(), Error> {
	match val.is_empty() {
		true => Err(Error::Invalid("empty value".into())),
		false => Ok(()),
	}
}

pub(super) fn not_found(key: &[u8]) -> Error {
	Error::NotFound(format!("key `{}`", String::from_utf8_lossy(key)))
}
