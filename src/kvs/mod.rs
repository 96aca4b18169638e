//! The module defining the key value storage layer.
//!
//! A [`Datastore`] owns one engine and hands out sessions:
//! - [`SnapshotSession`]: a read-only, point-in-time view;
//! - [`BatchSession`]: the single writer, buffering mutations into an
//!   indexed batch with size-bounded intermediate flushes kept atomic by
//!   the rollback segment;
//! - [`TransientSession`]: a scratch writer over a separate, never-durable
//!   engine instance, for sort and materialisation work.
//!
//! Logical stores live inside the same engine as prefixed key ranges and
//! are reached through [`Store`] handles bound to a session.
//!
//! Engines plug in behind the capability traits in [`api`]. These
//! operations can be processed by the following storage engines:
//! - `mem`: in-memory ordered database

pub mod api;

mod batch;
mod ds;
mod mem;
mod rollback;
mod scanner;
mod session;
mod snapshot;
mod store;
mod transient;

#[cfg(test)]
mod tests;

pub use self::batch::BatchSession;
pub use self::ds::{Datastore, Options};
pub use self::scanner::Scanner;
pub use self::session::{ReadSession, WriteSession};
pub use self::snapshot::SnapshotSession;
pub use self::store::Store;
pub use self::transient::{TransientSession, TransientStore};

/// The key part of a key-value pair. An alias for byte vec.
pub type Key = Vec<u8>;

/// The value part of a key-value pair. An alias for byte vec.
pub type Val = Vec<u8>;

/// Used to determine the behaviour when a batch is not closed correctly.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) enum Check {
	#[default]
	None,
	Warn,
	Panic,
}
