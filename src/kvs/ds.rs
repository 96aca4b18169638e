use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::cnf;
use crate::err::Error;
use crate::kvs::api::Engine;
use crate::kvs::rollback::RollbackSegment;
use crate::kvs::snapshot::SnapshotSession;
use crate::kvs::transient::TransientStore;
use crate::kvs::BatchSession;
use crate::kvs::Val;

/// Datastore tuning knobs. The defaults come from [`crate::cnf`] and can
/// be overridden per datastore.
#[derive(Clone, Debug)]
pub struct Options {
	/// Intermediate flush threshold for writer sessions, in bytes
	pub max_batch_size: usize,
	/// Flush threshold for transient sessions, in bytes
	pub max_transient_batch_size: usize,
	/// Ask the engine to skip its write-ahead log. The in-memory engine
	/// has none; file-backed engines trade durability for speed.
	pub disable_wal: bool,
}

impl Default for Options {
	fn default() -> Options {
		Options {
			max_batch_size: *cnf::MAX_BATCH_SIZE,
			max_transient_batch_size: *cnf::MAX_TRANSIENT_BATCH_SIZE,
			disable_wal: false,
		}
	}
}

/// The engine-dispatch for datastores.
pub(super) enum Inner {
	#[cfg(feature = "kv-mem")]
	Mem(super::mem::Datastore),
}

impl fmt::Display for Inner {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		#![allow(unused_variables)]
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(_) => write!(f, "memory"),
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}
}

impl Inner {
	pub(super) async fn snapshot(&self) -> Result<super::snapshot::Inner, Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => Ok(super::snapshot::Inner::Mem(v.snapshot().await?)),
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	pub(super) async fn batch(&self) -> Result<super::batch::Inner, Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => Ok(super::batch::Inner::Mem(v.batch().await?)),
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	pub(super) async fn get(&self, key: &[u8]) -> Result<Option<Val>, Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.get(key).await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}

	pub(super) async fn shutdown(&self) -> Result<(), Error> {
		match self {
			#[cfg(feature = "kv-mem")]
			Inner::Mem(v) => v.shutdown().await,
			#[allow(unreachable_patterns)]
			_ => unreachable!(),
		}
	}
}

/// The datastore. Owns one engine, mediates writer exclusion, and hands
/// out sessions.
///
/// Safe to share between tasks. At any instant at most one
/// [`BatchSession`] exists; readers opened while it is open all observe
/// the snapshot pinned when the writer began.
pub struct Datastore {
	/// The underlying engine
	inner: Inner,
	/// Per-datastore tuning
	opts: Options,
	/// The single writer permit
	writer: Arc<Semaphore>,
	/// The snapshot readers share while a writer is open
	pinned: Mutex<Option<Arc<super::snapshot::Inner>>>,
}

impl Datastore {
	/// Open a datastore from a path, e.g. `memory`.
	pub async fn new(path: &str) -> Result<Datastore, Error> {
		Datastore::new_with_options(path, Options::default()).await
	}

	/// Open a datastore with explicit options.
	pub async fn new_with_options(path: &str, opts: Options) -> Result<Datastore, Error> {
		// Initiate the desired engine
		let inner = match path {
			"memory" => {
				#[cfg(feature = "kv-mem")]
				{
					info!("Starting kvs store in {}", path);
					Inner::Mem(super::mem::Datastore::new().await?)
				}
				#[cfg(not(feature = "kv-mem"))]
				return Err(Error::Internal(
					"Cannot connect to the `memory` storage engine as it is not enabled in this build of Genji".to_owned(),
				));
			}
			_ => {
				return Err(Error::Internal(format!(
					"Unable to load the specified datastore {path}"
				)))
			}
		};
		let ds = Datastore {
			inner,
			opts,
			writer: Arc::new(Semaphore::new(1)),
			pinned: Mutex::new(None),
		};
		// Restore any rollback segment a crashed writer left behind
		RollbackSegment::rollback(&ds.inner).await?;
		info!("Started kvs store in {}", ds.inner);
		Ok(ds)
	}

	/// Open a read-only session. While a writer is open, every reader
	/// shares the snapshot pinned when that writer began; otherwise the
	/// session takes a fresh point-in-time view.
	pub async fn session_read(&self) -> Result<SnapshotSession, Error> {
		let pinned = self.pinned.lock().map_err(lock_poisoned)?.clone();
		let snap = match pinned {
			Some(snap) => snap,
			None => Arc::new(self.inner.snapshot().await?),
		};
		Ok(SnapshotSession::new(snap))
	}

	/// Open the writer session, waiting until any current writer commits
	/// or closes.
	pub async fn session_write(&self) -> Result<BatchSession<'_>, Error> {
		let permit = self
			.writer
			.clone()
			.acquire_owned()
			.await
			.map_err(|_| Error::Internal("the writer semaphore was closed".to_owned()))?;
		self.open_write(permit).await
	}

	/// Open the writer session, failing with [`Error::Busy`] when another
	/// writer is active.
	pub async fn try_session_write(&self) -> Result<BatchSession<'_>, Error> {
		let permit = self.writer.clone().try_acquire_owned().map_err(|_| Error::Busy)?;
		self.open_write(permit).await
	}

	async fn open_write(
		&self,
		permit: tokio::sync::OwnedSemaphorePermit,
	) -> Result<BatchSession<'_>, Error> {
		// Pin the snapshot readers will share while this writer is open
		let snap = Arc::new(self.inner.snapshot().await?);
		*self.pinned.lock().map_err(lock_poisoned)? = Some(snap);
		let batch = self.inner.batch().await?;
		trace!("writer session opened");
		Ok(BatchSession::new(self, batch, self.opts.max_batch_size, permit))
	}

	/// Restore the datastore to the state before the last uncommitted
	/// writer, using the rollback segment it recorded. A no-op when no
	/// segment is present. Idempotent.
	pub async fn rollback(&self) -> Result<(), Error> {
		let _permit = self
			.writer
			.clone()
			.acquire_owned()
			.await
			.map_err(|_| Error::Internal("the writer semaphore was closed".to_owned()))?;
		RollbackSegment::rollback(&self.inner).await
	}

	/// Open a transient scratch store beside this datastore.
	pub async fn transient(&self) -> Result<TransientStore, Error> {
		TransientStore::new(self.opts.max_transient_batch_size).await
	}

	/// Release the engine.
	pub async fn shutdown(&self) -> Result<(), Error> {
		self.inner.shutdown().await
	}

	pub(super) fn engine(&self) -> &Inner {
		&self.inner
	}

	pub(super) fn release_writer(&self) {
		if let Ok(mut pinned) = self.pinned.lock() {
			*pinned = None;
		}
	}
}

fn lock_poisoned<T>(_: std::sync::PoisonError<T>) -> Error {
	Error::Internal("the datastore lock was poisoned".to_owned())
}
