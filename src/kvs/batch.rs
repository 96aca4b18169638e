use std::ops::Range;

use tokio::sync::OwnedSemaphorePermit;

use crate::cnf::SCAN_BATCH_SIZE;
use crate::ctx::Canceller;
use crate::err::Error;
use crate::key;
use crate::kvs::api::Batch;
use crate::kvs::rollback::RollbackSegment;
use crate::kvs::session::{check_key, check_val, not_found, ReadSession, WriteSession};
use crate::kvs::store::Store;
use crate::kvs::{Datastore, Key, Val};

/// The engine-dispatch for write batches.
pub(super) enum Inner {
	#[cfg(feature = "kv-mem")]
	Mem(super::mem::Batch),
}

impl Inner {
	pub(super) async fn get(&self, key: &[u8]) -> Result<Option<Val>, Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.get(key).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	pub(super) async fn scan(&self, rng: Range<Key>, limit: u32) -> Result<Vec<(Key, Val)>, Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.scan(rng, limit).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	pub(super) async fn set(&mut self, key: Key, val: Val) -> Result<(), Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.set(key, val).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	pub(super) async fn del(&mut self, key: Key) -> Result<(), Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.del(key).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	pub(super) async fn delr(&mut self, rng: Range<Key>) -> Result<(), Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.delr(rng).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	pub(super) fn size(&self) -> usize {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.size(),
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	pub(super) async fn commit(&mut self, sync: bool) -> Result<(), Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.commit(sync).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	pub(super) async fn reset(&mut self) -> Result<(), Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.reset().await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	pub(super) async fn close(&mut self) -> Result<(), Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.close().await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}
}

/// The writer session. At most one exists per datastore at a time.
///
/// Every mutation first records the pre-image of the affected key in the
/// rollback segment, then lands in the indexed batch, where it is visible
/// to this session's own reads. Once the batch outgrows the configured
/// budget it is flushed to the engine non-durably together with the
/// recorded pre-images, so the whole session either commits or can be
/// rolled back as one unit.
pub struct BatchSession<'a> {
	/// The owning datastore
	ds: &'a Datastore,
	/// The engine write batch
	inner: Inner,
	/// Pre-images of every key touched this session
	segment: RollbackSegment,
	/// The cooperative cancellation signal
	cancel: Canceller,
	/// Intermediate flush threshold in bytes
	max_batch_size: usize,
	/// Has the session reached a terminal state?
	done: bool,
	/// Held while the session is open; releasing it admits the next writer
	permit: Option<OwnedSemaphorePermit>,
}

impl<'a> BatchSession<'a> {
	pub(super) fn new(
		ds: &'a Datastore,
		inner: Inner,
		max_batch_size: usize,
		permit: OwnedSemaphorePermit,
	) -> BatchSession<'a> {
		BatchSession {
			ds,
			inner,
			segment: RollbackSegment::new(),
			cancel: Canceller::new(),
			max_batch_size,
			done: false,
			permit: Some(permit),
		}
	}

	/// A handle for cancelling this session from elsewhere.
	pub fn canceller(&self) -> Canceller {
		self.cancel.clone()
	}

	/// Commit the session durably. Clears the rollback segment in the
	/// same engine commit as the remaining data, then admits the next
	/// writer. A cancelled session refuses to commit and discards its
	/// work instead.
	pub async fn commit(&mut self) -> Result<(), Error> {
		if self.done {
			return Err(Error::Discarded);
		}
		if self.cancel.is_cancelled() {
			self.discard().await?;
			return Err(Error::Canceled);
		}
		// Entries never flushed protect nothing durable yet
		self.segment.discard_pending();
		if self.segment.applied() {
			RollbackSegment::clear(&mut self.inner).await?;
		}
		self.inner.commit(true).await?;
		self.inner.close().await?;
		self.done = true;
		self.release();
		trace!("writer session committed");
		Ok(())
	}

	/// Discard the session without committing. Any state an intermediate
	/// flush pushed to the engine is restored from the rollback segment
	/// before the next writer is admitted. Idempotent.
	pub async fn close(&mut self) -> Result<(), Error> {
		if self.done {
			return Ok(());
		}
		self.discard().await
	}

	/// Open a write handle onto a named store.
	pub async fn store<'b>(&'b mut self, name: &[u8]) -> Result<Store<'b, Self>, Error> {
		self.check_active()?;
		key::store::check_name(name)?;
		let meta = key::store::Meta::new(name).encode();
		if self.inner.get(&meta).await?.is_none() {
			return Err(Error::NotFound(format!(
				"store `{}`",
				String::from_utf8_lossy(name)
			)));
		}
		Ok(Store::new(self, name))
	}

	/// Create a named store. Fails with [`Error::AlreadyExists`] when the
	/// store is already present.
	pub async fn create_store(&mut self, name: &[u8]) -> Result<(), Error> {
		self.check_active()?;
		key::store::check_name(name)?;
		let meta = key::store::Meta::new(name).encode();
		if self.inner.get(&meta).await?.is_some() {
			return Err(Error::AlreadyExists(format!(
				"store `{}`",
				String::from_utf8_lossy(name)
			)));
		}
		// The metadata key carries an empty value by layout
		self.apply_put(meta, Vec::new()).await
	}

	/// Drop a named store: truncate its data range, then remove its
	/// metadata key.
	pub async fn drop_store(&mut self, name: &[u8]) -> Result<(), Error> {
		self.check_active()?;
		key::store::check_name(name)?;
		let meta = key::store::Meta::new(name).encode();
		if self.inner.get(&meta).await?.is_none() {
			return Err(Error::NotFound(format!(
				"store `{}`",
				String::from_utf8_lossy(name)
			)));
		}
		self.delete_range(key::store::prefix(name), key::store::upper_bound(name)).await?;
		self.record_pre_image(&meta).await?;
		self.inner.del(meta).await?;
		Ok(())
	}

	fn check_active(&self) -> Result<(), Error> {
		if self.done {
			return Err(Error::Discarded);
		}
		self.cancel.check()
	}

	async fn discard(&mut self) -> Result<(), Error> {
		self.inner.close().await?;
		self.done = true;
		// Walk back anything an intermediate flush already pushed
		if self.segment.applied() {
			RollbackSegment::rollback(self.ds.engine()).await?;
		}
		self.release();
		trace!("writer session closed without commit");
		Ok(())
	}

	fn release(&mut self) {
		self.ds.release_writer();
		self.permit.take();
	}

	async fn record_pre_image(&mut self, key: &[u8]) -> Result<(), Error> {
		if self.segment.is_seen(key) {
			return Ok(());
		}
		// The durable value is read from the engine, outside the batch
		let current = self.ds.engine().get(key).await?;
		self.segment.record(key, current);
		Ok(())
	}

	async fn apply_put(&mut self, key: Key, val: Val) -> Result<(), Error> {
		self.record_pre_image(&key).await?;
		self.inner.set(key, val).await?;
		self.maybe_flush().await
	}

	async fn maybe_flush(&mut self) -> Result<(), Error> {
		if self.inner.size() <= self.max_batch_size {
			return Ok(());
		}
		debug!("intermediate flush at {} buffered bytes", self.inner.size());
		// Pre-images land in the same engine commit as the data
		self.segment.apply_into(&mut self.inner).await?;
		self.inner.commit(false).await?;
		self.inner.reset().await
	}
}

impl Drop for BatchSession<'_> {
	fn drop(&mut self) {
		if !self.done {
			// Check if already panicking
			if std::thread::panicking() {
				return;
			}
			warn!("A writer session was dropped without being committed or closed");
			self.release();
		}
	}
}

impl ReadSession for BatchSession<'_> {
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

impl WriteSession for BatchSession<'_> {
	async fn put<K, V>(&mut self, key: K, val: V) -> Result<(), Error>
	where
		K: Into<Key>,
		V: Into<Val>,
	{
		self.check_active()?;
		let (key, val) = (key.into(), val.into());
		check_key(&key)?;
		check_val(&val)?;
		self.apply_put(key, val).await
	}

	async fn insert<K, V>(&mut self, key: K, val: V) -> Result<(), Error>
	where
		K: Into<Key>,
		V: Into<Val>,
	{
		self.check_active()?;
		let (key, val) = (key.into(), val.into());
		check_key(&key)?;
		check_val(&val)?;
		if self.inner.get(&key).await?.is_some() {
			return Err(Error::AlreadyExists(format!(
				"key `{}`",
				String::from_utf8_lossy(&key)
			)));
		}
		self.apply_put(key, val).await
	}

	async fn delete<K>(&mut self, key: K) -> Result<(), Error>
	where
		K: Into<Key>,
	{
		self.check_active()?;
		let key = key.into();
		check_key(&key)?;
		self.record_pre_image(&key).await?;
		self.inner.del(key).await?;
		self.maybe_flush().await
	}

	async fn delete_range<K>(&mut self, lower: K, upper: K) -> Result<(), Error>
	where
		K: Into<Key>,
	{
		self.check_active()?;
		let (lower, upper) = (lower.into(), upper.into());
		// One key at a time, so every pre-image is recorded
		loop {
			self.cancel.check()?;
			let page = self.inner.scan(lower.clone()..upper.clone(), SCAN_BATCH_SIZE).await?;
			if page.is_empty() {
				return Ok(());
			}
			for (key, _) in page {
				self.record_pre_image(&key).await?;
				self.inner.del(key).await?;
			}
			self.maybe_flush().await?;
		}
	}
}
