use std::ops::Range;

use crate::ctx::Canceller;
use crate::err::Error;
use crate::kvs::session::{check_key, check_val, not_found, ReadSession, WriteSession};
use crate::kvs::{Key, Val};

/// An ephemeral scratch store for sort and materialisation work.
///
/// Backed by its own engine instance with the write-ahead log disabled;
/// for the in-memory engine the scratch instance is simply another map.
/// Nothing written here ever reaches the durable datastore.
pub struct TransientStore {
	inner: super::ds::Inner,
	max_batch_size: usize,
}

impl TransientStore {
	pub(super) async fn new(max_batch_size: usize) -> Result<TransientStore, Error> {
		#[cfg(feature = "kv-mem")]
		{
			let inner = super::ds::Inner::Mem(super::mem::Datastore::new().await?);
			debug!("opened a transient store");
			Ok(TransientStore {
				inner,
				max_batch_size,
			})
		}
		#[cfg(not(feature = "kv-mem"))]
		{
			let _ = max_batch_size;
			Err(Error::Internal(
				"no storage engine enabled in this build".to_owned(),
			))
		}
	}

	/// Open a scratch session. One session at a time per transient store.
	pub async fn session(&self) -> Result<TransientSession, Error> {
		Ok(TransientSession {
			inner: self.inner.batch().await?,
			cancel: Canceller::new(),
			max_batch_size: self.max_batch_size,
			done: false,
		})
	}

	/// Close the backing engine and remove any scratch directory.
	pub async fn destroy(self) -> Result<(), Error> {
		self.inner.shutdown().await
	}
}

/// A scratch writer. Never durable: the batch flushes without sync when
/// it outgrows its budget, committing is refused, and no pre-images are
/// recorded because there is nothing to roll back to.
pub struct TransientSession {
	inner: super::batch::Inner,
	cancel: Canceller,
	max_batch_size: usize,
	done: bool,
}

impl TransientSession {
	/// A handle for cancelling this session from elsewhere.
	pub fn canceller(&self) -> Canceller {
		self.cancel.clone()
	}

	/// Scratch work is never durable. Committing a transient session
	/// always fails with [`Error::ReadOnly`]; drop the session or
	/// [`reset`](TransientSession::reset) it instead.
	pub async fn commit(&mut self) -> Result<(), Error> {
		Err(Error::ReadOnly)
	}

	/// Clear the scratch batch in place, keeping the session usable.
	pub async fn reset(&mut self) -> Result<(), Error> {
		self.check_active()?;
		self.inner.reset().await
	}

	/// Discard the session. Idempotent.
	pub async fn close(&mut self) -> Result<(), Error> {
		if self.done {
			return Ok(());
		}
		self.done = true;
		self.inner.close().await
	}

	fn check_active(&self) -> Result<(), Error> {
		if self.done {
			return Err(Error::Discarded);
		}
		self.cancel.check()
	}

	async fn maybe_flush(&mut self) -> Result<(), Error> {
		if self.inner.size() <= self.max_batch_size {
			return Ok(());
		}
		debug!("transient flush at {} buffered bytes", self.inner.size());
		self.inner.commit(false).await?;
		self.inner.reset().await
	}
}

impl ReadSession for TransientSession {
	async fn get<K>(&self, key: K) -> Result<Val, Error>
	where
		K: Into<Key>,
	{
		self.check_active()?;
		let key = key.into();
		check_key(&key)?;
		self.inner.get(&key).await?.ok_or_else(|| not_found(&key))
	}

	async fn exists<K>(&self, key: K) -> Result<bool, Error>
	where
		K: Into<Key>,
	{
		self.check_active()?;
		let key = key.into();
		check_key(&key)?;
		Ok(self.inner.get(&key).await?.is_some())
	}

	async fn scan(&self, rng: Range<Key>, limit: u32) -> Result<Vec<(Key, Val)>, Error> {
		self.check_active()?;
		self.inner.scan(rng, limit).await
	}
}

impl WriteSession for TransientSession {
	async fn put<K, V>(&mut self, key: K, val: V) -> Result<(), Error>
	where
		K: Into<Key>,
		V: Into<Val>,
	{
		self.check_active()?;
		let (key, val) = (key.into(), val.into());
		check_key(&key)?;
		check_val(&val)?;
		self.inner.set(key, val).await?;
		self.maybe_flush().await
	}

	/// Uniqueness has no meaning in a scratch namespace.
	async fn insert<K, V>(&mut self, _key: K, _val: V) -> Result<(), Error>
	where
		K: Into<Key>,
		V: Into<Val>,
	{
		Err(Error::Invalid("transient sessions do not support insert".into()))
	}

	async fn delete<K>(&mut self, key: K) -> Result<(), Error>
	where
		K: Into<Key>,
	{
		self.check_active()?;
		let key = key.into();
		check_key(&key)?;
		self.inner.del(key).await?;
		self.maybe_flush().await
	}

	async fn delete_range<K>(&mut self, lower: K, upper: K) -> Result<(), Error>
	where
		K: Into<Key>,
	{
		self.check_active()?;
		// No pre-images to record, so the engine primitive suffices
		self.inner.delr(lower.into()..upper.into()).await?;
		self.maybe_flush().await
	}
}
