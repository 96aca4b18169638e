//! How the keys are structured in the key value store.
//!
//! Three disjoint ranges share one engine:
//!
//! ```text
//! crate::key::store::Meta      __genji.store 0x1F {name}
//! crate::key::store::Data      s 0x1F {name} 0x1F 0x00 {user_key}
//! crate::key::rollback::Entry  svarint(SEGMENT_ID) lex64({original_key})
//! ```
//!
//! The `0x1F` separator and the `0x00` byte after the store name make
//! `prefix 0xFF` an upper bound above every legal user key, so full-store
//! scans need no key inspection to terminate.

pub mod rollback;
pub mod store;
