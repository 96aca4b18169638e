use std::ops::Range;
use std::sync::Arc;

use crate::ctx::Canceller;
use crate::err::Error;
use crate::key;
use crate::kvs::api::Snapshot;
use crate::kvs::session::{check_key, not_found, ReadSession};
use crate::kvs::store::Store;
use crate::kvs::{Key, Val};

/// The engine-dispatch for snapshots.
pub(super) enum Inner {
	#[cfg(feature = "kv-mem")]
	Mem(super::mem::Snapshot),
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
}

/// A read-only session over a consistent, point-in-time view.
///
/// Sessions created while a writer is open share the one snapshot pinned
/// when that writer began; the underlying view is released when the last
/// such session closes. Write capability does not exist on this type, so
/// misuse is caught at compile time rather than with a runtime
/// [`Error::ReadOnly`].
pub struct SnapshotSession {
	/// The shared, reference-counted view
	snap: Option<Arc<Inner>>,
	/// The cooperative cancellation signal
	cancel: Canceller,
}

impl SnapshotSession {
	pub(super) fn new(snap: Arc<Inner>) -> SnapshotSession {
		SnapshotSession {
			snap: Some(snap),
			cancel: Canceller::new(),
		}
	}

	/// A handle for cancelling this session from elsewhere.
	pub fn canceller(&self) -> Canceller {
		self.cancel.clone()
	}

	/// Release this session's hold on the shared snapshot. Idempotent.
	pub fn close(&mut self) {
		self.snap = None;
	}

	/// Open a read handle onto a named store. Fails with
	/// [`Error::NotFound`] when the store has not been created.
	pub async fn store<'a>(&'a mut self, name: &[u8]) -> Result<Store<'a, Self>, Error> {
		self.cancel.check()?;
		key::store::check_name(name)?;
		let meta = key::store::Meta::new(name).encode();
		if self.view()?.get(&meta).await?.is_none() {
			return Err(Error::NotFound(format!(
				"store `{}`",
				String::from_utf8_lossy(name)
			)));
		}
		Ok(Store::new(self, name))
	}

	fn view(&self) -> Result<&Arc<Inner>, Error> {
		self.snap.as_ref().ok_or(Error::Discarded)
	}
}

impl ReadSession for SnapshotSession {
	async fn get<K>(&self, key: K) -> Result<Val, Error>
	where
		K: Into<Key>,
	{
		self.cancel.check()?;
		let key = key.into();
		check_key(&key)?;
		self.view()?.get(&key).await?.ok_or_else(|| not_found(&key))
	}

	async fn exists<K>(&self, key: K) -> Result<bool, Error>
	where
		K: Into<Key>,
	{
		self.cancel.check()?;
		let key = key.into();
		check_key(&key)?;
		Ok(self.view()?.get(&key).await?.is_some())
	}

	async fn scan(&self, rng: Range<Key>, limit: u32) -> Result<Vec<(Key, Val)>, Error> {
		self.cancel.check()?;
		self.view()?.scan(rng, limit).await
	}
}
