#![cfg(feature = "kv-mem")]

mod rollback;
mod store;

use crate::kvs::{Datastore, Options};

pub(crate) async fn new_ds() -> Datastore {
	Datastore::new("memory").await.unwrap()
}

pub(crate) async fn new_ds_with_batch_size(max_batch_size: usize) -> Datastore {
	let opts = Options {
		max_batch_size,
		..Options::default()
	};
	Datastore::new_with_options("memory", opts).await.unwrap()
}
