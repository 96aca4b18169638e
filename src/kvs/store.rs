use futures::stream::Stream;
use futures::StreamExt;

use crate::cnf::SCAN_BATCH_SIZE;
use crate::err::Error;
use crate::key;
use crate::kvs::scanner::Scanner;
use crate::kvs::session::{check_key, check_val, ReadSession, WriteSession};
use crate::kvs::{Key, Val};

/// A handle onto one logical store, bound to a session.
///
/// A store is a named prefix inside the engine. The handle translates
/// user keys to prefixed keys in both directions; user keys compare
/// byte-lexicographically once the prefix is stripped. Write operations
/// are only available when the underlying session can write.
pub struct Store<'a, S> {
	session: &'a mut S,
	name: Vec<u8>,
	prefix: Key,
}

impl<'a, S: ReadSession> Store<'a, S> {
	pub(super) fn new(session: &'a mut S, name: &[u8]) -> Store<'a, S> {
		Store {
			session,
			name: name.to_vec(),
			prefix: key::store::prefix(name),
		}
	}

	/// Fetch a key from this store.
	pub async fn get(&self, key: &[u8]) -> Result<Val, Error> {
		check_key(key)?;
		match self.session.get(self.data_key(key)).await {
			Err(Error::NotFound(_)) => Err(self.not_found(key)),
			other => other,
		}
	}

	/// Check if a key exists in this store.
	pub async fn exists(&self, key: &[u8]) -> Result<bool, Error> {
		check_key(key)?;
		self.session.exists(self.data_key(key)).await
	}

	/// An ordered cursor over `[start, end)` of this store's user keys,
	/// with the store prefix already stripped. Empty bounds mean the
	/// start and end of the store.
	pub fn iter(
		&self,
		start: &[u8],
		end: &[u8],
	) -> impl Stream<Item = Result<(Key, Val), Error>> + '_ {
		let lower = match start.is_empty() {
			true => self.prefix.clone(),
			false => self.data_key(start),
		};
		let upper = match end.is_empty() {
			true => key::store::upper_bound(&self.name),
			false => self.data_key(end),
		};
		let strip = self.prefix.len();
		Scanner::new(&*self.session, SCAN_BATCH_SIZE, lower..upper)
			.map(move |res| res.map(|(k, v)| (k[strip..].to_vec(), v)))
	}

	fn data_key(&self, key: &[u8]) -> Key {
		let mut out = self.prefix.clone();
		out.extend_from_slice(key);
		out
	}

	fn not_found(&self, key: &[u8]) -> Error {
		Error::NotFound(format!(
			"key `{}` in store `{}`",
			String::from_utf8_lossy(key),
			String::from_utf8_lossy(&self.name)
		))
	}
}

impl<'a, S: WriteSession> Store<'a, S> {
	/// Set a key in this store, overwriting any existing value.
	pub async fn put(&mut self, key: &[u8], val: impl Into<Val>) -> Result<(), Error> {
		let val = val.into();
		check_key(key)?;
		check_val(&val)?;
		let data = self.data_key(key);
		self.session.put(data, val).await
	}

	/// Set a key in this store, failing if it already exists.
	pub async fn insert(&mut self, key: &[u8], val: impl Into<Val>) -> Result<(), Error> {
		let val = val.into();
		check_key(key)?;
		check_val(&val)?;
		let data = self.data_key(key);
		match self.session.insert(data, val).await {
			Err(Error::AlreadyExists(_)) => Err(Error::AlreadyExists(format!(
				"key `{}` in store `{}`",
				String::from_utf8_lossy(key),
				String::from_utf8_lossy(&self.name)
			))),
			other => other,
		}
	}

	/// Delete a key from this store. A no-op when the key is absent.
	pub async fn delete(&mut self, key: &[u8]) -> Result<(), Error> {
		check_key(key)?;
		let data = self.data_key(key);
		self.session.delete(data).await
	}

	/// Delete every key in this store.
	pub async fn truncate(&mut self) -> Result<(), Error> {
		let lower = self.prefix.clone();
		let upper = key::store::upper_bound(&self.name);
		self.session.delete_range(lower, upper).await
	}
}
