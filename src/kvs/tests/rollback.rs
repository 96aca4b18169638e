use super::{new_ds, new_ds_with_batch_size};
use crate::err::Error;
use crate::key::rollback::{range, Entry};
use crate::kvs::rollback::TOMBSTONE;
use crate::kvs::{Key, ReadSession, Val, WriteSession};

async fn all_pairs(ds: &crate::kvs::Datastore) -> Vec<(Key, Val)> {
	let tx = ds.session_read().await.unwrap();
	tx.scan(vec![0x00]..Vec::new(), 0).await.unwrap()
}

#[tokio::test]
async fn rollback_after_intermediate_flushes() {
	// A tiny budget so the session flushes many times
	let ds = new_ds_with_batch_size(128).await;
	let mut tx = ds.session_write().await.unwrap();
	for i in 0..100 {
		let key = format!("key-{i:03}");
		let val = format!("val-{i:03}");
		tx.put(key, val).await.unwrap();
	}
	// Close without committing, then roll back
	tx.close().await.unwrap();
	ds.rollback().await.unwrap();
	// Every written key is gone
	let tx = ds.session_read().await.unwrap();
	for i in 0..100 {
		let key = format!("key-{i:03}");
		assert!(
			matches!(tx.get(key).await, Err(Error::NotFound(_))),
			"key-{i:03} survived the rollback"
		);
	}
	// And the segment is empty
	assert!(tx.scan(range(), 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn rollback_restores_the_pre_session_state_byte_for_byte() {
	let ds = new_ds_with_batch_size(64).await;
	// Seed some committed state
	let mut tx = ds.session_write().await.unwrap();
	for i in 0..20 {
		tx.put(format!("seed-{i:02}"), format!("value-{i:02}")).await.unwrap();
	}
	tx.commit().await.unwrap();
	let before = all_pairs(&ds).await;
	// A writer that overwrites, deletes and inserts, with flushes
	let mut tx = ds.session_write().await.unwrap();
	for i in 0..20 {
		tx.put(format!("seed-{i:02}"), "overwritten").await.unwrap();
	}
	tx.delete("seed-03").await.unwrap();
	tx.delete_range("seed-10", "seed-15").await.unwrap();
	for i in 0..20 {
		tx.put(format!("new-{i:02}"), "fresh").await.unwrap();
	}
	tx.close().await.unwrap();
	// The datastore reads back exactly as before the session
	assert_eq!(all_pairs(&ds).await, before);
}

#[tokio::test]
async fn commit_leaves_an_empty_segment() {
	let ds = new_ds_with_batch_size(32).await;
	let mut tx = ds.session_write().await.unwrap();
	for i in 0..20 {
		tx.put(format!("k-{i:02}"), "value").await.unwrap();
	}
	tx.commit().await.unwrap();
	let tx = ds.session_read().await.unwrap();
	assert!(tx.scan(range(), 0).await.unwrap().is_empty());
	assert!(tx.exists("k-00").await.unwrap());
}

#[tokio::test]
async fn rollback_is_idempotent() {
	let ds = new_ds().await;
	// Hand-craft the durable footprint of a crashed writer: the data it
	// flushed plus the segment describing the pre-image of every key
	let mut batch = ds.engine().batch().await.unwrap();
	batch.set(b"a".to_vec(), b"2".to_vec()).await.unwrap();
	batch.set(b"b".to_vec(), b"2".to_vec()).await.unwrap();
	batch.set(Entry::new(b"a").encode(), b"1".to_vec()).await.unwrap();
	batch.set(Entry::new(b"b").encode(), TOMBSTONE.to_vec()).await.unwrap();
	batch.commit(false).await.unwrap();
	batch.close().await.unwrap();
	// First rollback restores the pre-image and deletes the tombstoned key
	ds.rollback().await.unwrap();
	let after_once = all_pairs(&ds).await;
	assert_eq!(after_once, vec![(b"a".to_vec(), b"1".to_vec())]);
	// A second rollback finds an empty segment and changes nothing
	ds.rollback().await.unwrap();
	assert_eq!(all_pairs(&ds).await, after_once);
}

#[tokio::test]
async fn sessions_without_flushes_roll_back_in_memory() {
	let ds = new_ds().await;
	let mut tx = ds.session_write().await.unwrap();
	tx.put("only-buffered", "v").await.unwrap();
	// Nothing was flushed, so closing simply discards the batch
	tx.close().await.unwrap();
	assert!(all_pairs(&ds).await.is_empty());
	ds.rollback().await.unwrap();
	assert!(all_pairs(&ds).await.is_empty());
}
