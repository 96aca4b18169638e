//! The rollback segment.
//!
//! A reserved key range inside the same engine holding the pre-image of
//! every key a writer session touches. A session that only ever buffers
//! in memory never materialises the segment; the first intermediate flush
//! writes the recorded entries along with the data, and from then on the
//! durable state can always be walked back to the pre-session state, even
//! across a crash.

use std::collections::HashSet;

use crate::cnf::SCAN_BATCH_SIZE;
use crate::err::Error;
use crate::key::rollback::{range, Entry};
use crate::kvs::{Key, Val};

/// The value recorded for a key that did not exist before the session.
pub(super) const TOMBSTONE: &[u8] = &[0x00];

pub(super) struct RollbackSegment {
	/// Keys recorded this transaction, so each is recorded at most once
	seen: HashSet<Key, ahash::RandomState>,
	/// Encoded entries not yet written to the engine
	entries: Vec<(Key, Val)>,
	/// Has any flush carried entries into the engine?
	applied: bool,
}

impl RollbackSegment {
	pub(super) fn new() -> RollbackSegment {
		RollbackSegment {
			seen: HashSet::default(),
			entries: Vec::new(),
			applied: false,
		}
	}

	pub(super) fn is_seen(&self, key: &[u8]) -> bool {
		self.seen.contains(key)
	}

	/// Record the pre-image of a key observed before its first mutation
	/// in this transaction. Later mutations of the same key are ignored.
	pub(super) fn record(&mut self, key: &[u8], pre_image: Option<Val>) {
		if !self.seen.insert(key.to_vec()) {
			return;
		}
		let entry = Entry::new(key).encode();
		self.entries.push((entry, pre_image.unwrap_or_else(|| TOMBSTONE.to_vec())));
	}

	pub(super) fn applied(&self) -> bool {
		self.applied
	}

	/// Forget entries that were never flushed. They protect nothing
	/// durable, so a committing session can drop them.
	pub(super) fn discard_pending(&mut self) {
		self.entries.clear();
	}

	/// Write the recorded entries into the batch about to be flushed, so
	/// they land atomically with the data they protect.
	pub(super) async fn apply_into(&mut self, batch: &mut super::batch::Inner) -> Result<(), Error> {
		for (key, val) in self.entries.drain(..) {
			batch.set(key, val).await?;
		}
		self.applied = true;
		Ok(())
	}

	/// Emit the range deletion clearing the whole segment into a batch.
	/// Committing that batch finishes the transaction.
	pub(super) async fn clear(batch: &mut super::batch::Inner) -> Result<(), Error> {
		batch.delr(range()).await
	}

	/// Restore the engine to the pre-transaction state described by the
	/// segment, then clear it. A no-op when the segment is empty, and
	/// idempotent: replaying it cannot undo more than once.
	pub(super) async fn rollback(engine: &super::ds::Inner) -> Result<(), Error> {
		let mut batch = engine.batch().await?;
		let mut lower = range().start;
		let mut restored = 0usize;
		loop {
			let page = batch.scan(lower.clone()..range().end, SCAN_BATCH_SIZE).await?;
			let full = page.len() == SCAN_BATCH_SIZE as usize;
			match page.last() {
				Some((last, _)) => {
					// Resume after the last entry of this page
					lower.clone_from(last);
					lower.push(0x00);
				}
				None => break,
			}
			for (key, val) in page {
				let original = Entry::decode(&key)?;
				match val == TOMBSTONE {
					true => batch.del(original).await?,
					false => batch.set(original, val).await?,
				}
				restored += 1;
			}
			if !full {
				break;
			}
		}
		if restored == 0 {
			return batch.close().await;
		}
		Self::clear(&mut batch).await?;
		batch.commit(false).await?;
		batch.close().await?;
		debug!("rolled back {restored} keys from the rollback segment");
		Ok(())
	}
}
