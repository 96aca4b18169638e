use super::new_ds;
use crate::err::Error;
use futures::TryStreamExt;

#[tokio::test]
async fn create_put_and_read_back() {
	let ds = new_ds().await;
	let mut tx = ds.session_write().await.unwrap();
	tx.create_store(b"accounts").await.unwrap();
	{
		let mut st = tx.store(b"accounts").await.unwrap();
		st.put(b"foo", "FOO").await.unwrap();
		assert_eq!(st.get(b"foo").await.unwrap(), b"FOO".to_vec());
	}
	tx.commit().await.unwrap();
	// Reads work through a snapshot session too
	let mut rd = ds.session_read().await.unwrap();
	let st = rd.store(b"accounts").await.unwrap();
	assert_eq!(st.get(b"foo").await.unwrap(), b"FOO".to_vec());
	assert!(matches!(st.get(b"bar").await, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn stores_are_isolated() {
	let ds = new_ds().await;
	let mut tx = ds.session_write().await.unwrap();
	tx.create_store(b"a").await.unwrap();
	{
		let mut st = tx.store(b"a").await.unwrap();
		st.put(b"foo", "FOO").await.unwrap();
	}
	tx.create_store(b"b").await.unwrap();
	{
		let st = tx.store(b"b").await.unwrap();
		// Same user key, different store
		assert!(matches!(st.get(b"foo").await, Err(Error::NotFound(_))));
	}
	// Drop "a" and check "b" is unaffected
	tx.drop_store(b"a").await.unwrap();
	assert!(matches!(tx.store(b"a").await, Err(Error::NotFound(_))));
	{
		let mut st = tx.store(b"b").await.unwrap();
		st.put(b"bar", "BAR").await.unwrap();
		assert_eq!(st.get(b"bar").await.unwrap(), b"BAR".to_vec());
	}
	tx.commit().await.unwrap();
}

#[tokio::test]
async fn create_twice_fails_drop_missing_fails() {
	let ds = new_ds().await;
	let mut tx = ds.session_write().await.unwrap();
	tx.create_store(b"s").await.unwrap();
	assert!(matches!(tx.create_store(b"s").await, Err(Error::AlreadyExists(_))));
	assert!(matches!(tx.drop_store(b"missing").await, Err(Error::NotFound(_))));
	assert!(matches!(tx.store(b"missing").await, Err(Error::NotFound(_))));
	tx.commit().await.unwrap();
}

#[tokio::test]
async fn insert_enforces_uniqueness_per_store() {
	let ds = new_ds().await;
	let mut tx = ds.session_write().await.unwrap();
	tx.create_store(b"s").await.unwrap();
	let mut st = tx.store(b"s").await.unwrap();
	st.insert(b"k", "one").await.unwrap();
	assert!(matches!(st.insert(b"k", "two").await, Err(Error::AlreadyExists(_))));
	assert_eq!(st.get(b"k").await.unwrap(), b"one".to_vec());
	drop(st);
	tx.commit().await.unwrap();
}

#[tokio::test]
async fn iteration_strips_the_store_prefix() {
	let ds = new_ds().await;
	let mut tx = ds.session_write().await.unwrap();
	tx.create_store(b"s").await.unwrap();
	let mut st = tx.store(b"s").await.unwrap();
	for key in ["c", "a", "d", "b"] {
		st.put(key.as_bytes(), "v").await.unwrap();
	}
	let pairs: Vec<_> = st.iter(b"", b"").try_collect().await.unwrap();
	let keys: Vec<_> = pairs.into_iter().map(|(k, _)| k).collect();
	assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);
	// Bounded iteration uses user-key bounds
	let pairs: Vec<_> = st.iter(b"b", b"d").try_collect().await.unwrap();
	let keys: Vec<_> = pairs.into_iter().map(|(k, _)| k).collect();
	assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);
	drop(st);
	tx.commit().await.unwrap();
}

#[tokio::test]
async fn truncate_empties_only_that_store() {
	let ds = new_ds().await;
	let mut tx = ds.session_write().await.unwrap();
	tx.create_store(b"a").await.unwrap();
	tx.create_store(b"b").await.unwrap();
	{
		let mut st = tx.store(b"a").await.unwrap();
		st.put(b"k", "v").await.unwrap();
	}
	{
		let mut st = tx.store(b"b").await.unwrap();
		st.put(b"k", "v").await.unwrap();
	}
	{
		let mut st = tx.store(b"a").await.unwrap();
		st.truncate().await.unwrap();
		assert!(!st.exists(b"k").await.unwrap());
	}
	{
		let st = tx.store(b"b").await.unwrap();
		assert!(st.exists(b"k").await.unwrap());
	}
	tx.commit().await.unwrap();
}

#[tokio::test]
async fn store_names_and_keys_are_validated() {
	let ds = new_ds().await;
	let mut tx = ds.session_write().await.unwrap();
	assert!(matches!(tx.create_store(b"").await, Err(Error::Invalid(_))));
	assert!(matches!(tx.create_store(b"a\x1fb").await, Err(Error::Invalid(_))));
	tx.create_store(b"s").await.unwrap();
	let mut st = tx.store(b"s").await.unwrap();
	assert!(matches!(st.put(b"", "v").await, Err(Error::Invalid(_))));
	assert!(matches!(st.put(b"k", "").await, Err(Error::Invalid(_))));
	assert!(matches!(st.get(b"").await, Err(Error::Invalid(_))));
	drop(st);
	tx.commit().await.unwrap();
}

#[tokio::test]
async fn dropping_a_store_rolls_back_like_any_write() {
	let ds = new_ds().await;
	let mut tx = ds.session_write().await.unwrap();
	tx.create_store(b"keep").await.unwrap();
	{
		let mut st = tx.store(b"keep").await.unwrap();
		st.put(b"k", "v").await.unwrap();
	}
	tx.commit().await.unwrap();
	// A session that drops the store but never commits
	let mut tx = ds.session_write().await.unwrap();
	tx.drop_store(b"keep").await.unwrap();
	tx.close().await.unwrap();
	// The store and its content are still there
	let mut rd = ds.session_read().await.unwrap();
	let st = rd.store(b"keep").await.unwrap();
	assert_eq!(st.get(b"k").await.unwrap(), b"v".to_vec());
}
