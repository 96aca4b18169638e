#![cfg(feature = "kv-mem")]

//! The in-memory engine.
//!
//! An ordered map behind a read-write lock. Snapshots clone the whole
//! tree, which makes them genuinely immutable at the cost of a copy;
//! batches keep an ordered overlay of pending mutations and merge it over
//! the live tree on reads. Durability options are accepted and ignored.

use std::collections::BTreeMap;
use std::ops::{Bound, Range};
use std::sync::{Arc, RwLock};

use crate::err::Error;
use crate::kvs::api;
use crate::kvs::Check;
use crate::kvs::{Key, Val};

type Tree = BTreeMap<Key, Val>;

#[non_exhaustive]
pub struct Datastore {
	db: Arc<RwLock<Tree>>,
}

impl Datastore {
	/// Open a new database
	pub(crate) async fn new() -> Result<Datastore, Error> {
		Ok(Datastore {
			db: Arc::new(RwLock::new(Tree::new())),
		})
	}
}

impl api::Engine for Datastore {
	type Snapshot = Snapshot;
	type Batch = Batch;

	async fn snapshot(&self) -> Result<Snapshot, Error> {
		let view = self.db.read().map_err(lock_poisoned)?.clone();
		Ok(Snapshot {
			view,
		})
	}

	async fn batch(&self) -> Result<Batch, Error> {
		// Specify the check level
		#[cfg(not(debug_assertions))]
		let check = Check::Warn;
		#[cfg(debug_assertions)]
		let check = Check::Panic;
		// Create a new batch
		Ok(Batch {
			db: self.db.clone(),
			pending: BTreeMap::new(),
			size: 0,
			done: false,
			check,
		})
	}

	async fn get(&self, key: &[u8]) -> Result<Option<Val>, Error> {
		Ok(self.db.read().map_err(lock_poisoned)?.get(key).cloned())
	}

	async fn shutdown(&self) -> Result<(), Error> {
		Ok(())
	}
}

#[non_exhaustive]
pub struct Snapshot {
	view: Tree,
}

impl api::Snapshot for Snapshot {
	async fn get(&self, key: &[u8]) -> Result<Option<Val>, Error> {
		Ok(self.view.get(key).cloned())
	}

	async fn scan(&self, rng: Range<Key>, limit: u32) -> Result<Vec<(Key, Val)>, Error> {
		Ok(scan_tree(&self.view, &rng, limit))
	}
}

#[non_exhaustive]
pub struct Batch {
	/// The live tree shared with the engine
	db: Arc<RwLock<Tree>>,
	/// Pending mutations; `None` marks a deletion
	pending: BTreeMap<Key, Option<Val>>,
	/// Byte size of the pending mutations
	size: usize,
	/// Is the batch discarded?
	done: bool,
	/// Should we check unclosed batches?
	check: Check,
}

impl Drop for Batch {
	fn drop(&mut self) {
		if !self.done && !self.pending.is_empty() {
			// Check if already panicking
			if std::thread::panicking() {
				return;
			}
			// Handle the behaviour
			match self.check {
				Check::None => {
					trace!("A batch was dropped without being committed or closed");
				}
				Check::Warn => {
					warn!("A batch was dropped without being committed or closed");
				}
				Check::Panic => {
					panic!("A batch was dropped without being committed or closed");
				}
			}
		}
	}
}

impl Batch {
	fn check_open(&self) -> Result<(), Error> {
		match self.done {
			true => Err(Error::Discarded),
			false => Ok(()),
		}
	}
}

impl api::Batch for Batch {
	async fn get(&self, key: &[u8]) -> Result<Option<Val>, Error> {
		self.check_open()?;
		match self.pending.get(key) {
			Some(pending) => Ok(pending.clone()),
			None => Ok(self.db.read().map_err(lock_poisoned)?.get(key).cloned()),
		}
	}

	async fn scan(&self, rng: Range<Key>, limit: u32) -> Result<Vec<(Key, Val)>, Error> {
		self.check_open()?;
		// Merge the pending overlay onto the live range
		let mut merged: Tree = {
			let db = self.db.read().map_err(lock_poisoned)?;
			scan_tree(&db, &rng, 0).into_iter().collect()
		};
		for (key, pending) in range_of(&self.pending, &rng) {
			match pending {
				Some(val) => {
					merged.insert(key.clone(), val.clone());
				}
				None => {
					merged.remove(key);
				}
			}
		}
		let mut out: Vec<(Key, Val)> = merged.into_iter().collect();
		if limit > 0 {
			out.truncate(limit as usize);
		}
		Ok(out)
	}

	async fn set(&mut self, key: Key, val: Val) -> Result<(), Error> {
		self.check_open()?;
		self.size += key.len() + val.len();
		self.pending.insert(key, Some(val));
		Ok(())
	}

	async fn del(&mut self, key: Key) -> Result<(), Error> {
		self.check_open()?;
		self.size += key.len();
		self.pending.insert(key, None);
		Ok(())
	}

	async fn delr(&mut self, rng: Range<Key>) -> Result<(), Error> {
		self.check_open()?;
		let keys: Vec<Key> = {
			let merged = api::Batch::scan(self, rng, 0).await?;
			merged.into_iter().map(|(k, _)| k).collect()
		};
		for key in keys {
			self.size += key.len();
			self.pending.insert(key, None);
		}
		Ok(())
	}

	fn size(&self) -> usize {
		self.size
	}

	async fn commit(&mut self, _sync: bool) -> Result<(), Error> {
		self.check_open()?;
		let pending = std::mem::take(&mut self.pending);
		self.size = 0;
		let mut db = self.db.write().map_err(lock_poisoned)?;
		for (key, pending) in pending {
			match pending {
				Some(val) => {
					db.insert(key, val);
				}
				None => {
					db.remove(&key);
				}
			}
		}
		Ok(())
	}

	async fn reset(&mut self) -> Result<(), Error> {
		self.pending.clear();
		self.size = 0;
		Ok(())
	}

	async fn close(&mut self) -> Result<(), Error> {
		self.pending.clear();
		self.size = 0;
		self.done = true;
		Ok(())
	}
}

fn scan_tree(tree: &Tree, rng: &Range<Key>, limit: u32) -> Vec<(Key, Val)> {
	let iter = range_of(tree, rng);
	match limit {
		0 => iter.map(|(k, v)| (k.clone(), v.clone())).collect(),
		n => iter.take(n as usize).map(|(k, v)| (k.clone(), v.clone())).collect(),
	}
}

fn range_of<'a, V>(
	tree: &'a BTreeMap<Key, V>,
	rng: &Range<Key>,
) -> Box<dyn Iterator<Item = (&'a Key, &'a V)> + 'a> {
	// An empty upper bound means the range is unbounded above
	if rng.end.is_empty() {
		Box::new(tree.range::<[u8], _>((Bound::Included(&rng.start[..]), Bound::Unbounded)))
	} else if rng.start < rng.end {
		Box::new(
			tree.range::<[u8], _>((Bound::Included(&rng.start[..]), Bound::Excluded(&rng.end[..]))),
		)
	} else {
		Box::new(std::iter::empty())
	}
}

fn lock_poisoned<T>(_: std::sync::PoisonError<T>) -> Error {
	Error::Internal("the in-memory engine lock was poisoned".into())
}
