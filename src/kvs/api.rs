//! The minimal capability an ordered key value engine must provide.
//!
//! Keys compare byte-lexicographically. Absent keys read as `Ok(None)`.
//! Any engine supplying these primitives with the documented semantics can
//! back a datastore; the crate ships the in-memory engine.

use std::future::Future;
use std::ops::Range;

use crate::err::Error;
use crate::kvs::{Key, Val};

pub trait Engine {
	type Snapshot: Snapshot;
	type Batch: Batch;

	/// Take an immutable, point-in-time view of the database.
	fn snapshot(&self) -> impl Future<Output = Result<Self::Snapshot, Error>>;

	/// Open an indexed write batch: reads through it observe its own
	/// pending writes merged over the database.
	fn batch(&self) -> impl Future<Output = Result<Self::Batch, Error>>;

	/// Read the current committed value of a key, outside any batch or
	/// snapshot. The rollback segment records pre-images through this.
	fn get(&self, key: &[u8]) -> impl Future<Output = Result<Option<Val>, Error>>;

	/// Release the engine. For file-backed engines this closes the
	/// database; transient engines also remove their scratch directory.
	fn shutdown(&self) -> impl Future<Output = Result<(), Error>>;
}

/// An immutable view. Released by dropping it.
pub trait Snapshot {
	fn get(&self, key: &[u8]) -> impl Future<Output = Result<Option<Val>, Error>>;

	/// Fetch up to `limit` pairs from a key range, in order. An empty
	/// range end means no upper bound; a zero limit means no limit.
	fn scan(
		&self,
		rng: Range<Key>,
		limit: u32,
	) -> impl Future<Output = Result<Vec<(Key, Val)>, Error>>;
}

/// An indexed write batch. `commit` may be called repeatedly with `reset`
/// in between; `close` discards whatever is pending.
pub trait Batch {
	fn get(&self, key: &[u8]) -> impl Future<Output = Result<Option<Val>, Error>>;

	/// Ordered range read merged with the batch's own pending writes.
	fn scan(
		&self,
		rng: Range<Key>,
		limit: u32,
	) -> impl Future<Output = Result<Vec<(Key, Val)>, Error>>;

	/// Buffer an overwrite.
	fn set(&mut self, key: Key, val: Val) -> impl Future<Output = Result<(), Error>>;

	/// Buffer a deletion.
	fn del(&mut self, key: Key) -> impl Future<Output = Result<(), Error>>;

	/// Buffer the deletion of a whole range.
	fn delr(&mut self, rng: Range<Key>) -> impl Future<Output = Result<(), Error>>;

	/// The byte size of the buffered mutations.
	fn size(&self) -> usize;

	/// Apply the buffered mutations. `sync` requests durability; a
	/// non-durable commit becomes durable on the next clean shutdown.
	fn commit(&mut self, sync: bool) -> impl Future<Output = Result<(), Error>>;

	/// Clear the buffered mutations, keeping the batch usable.
	fn reset(&mut self) -> impl Future<Output = Result<(), Error>>;

	/// Discard the batch.
	fn close(&mut self) -> impl Future<Output = Result<(), Error>>;
}
