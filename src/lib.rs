//! Genji is an embedded document database core. It stores schemaless
//! documents inside logical stores backed by an ordered key value engine,
//! and keeps every encoded key sort-ordered so that range scans and index
//! lookups run directly against the engine's byte ordering.
//!
//! The crate is split into two halves:
//! - the codecs ([`val`], [`enc`]): the document value model, the
//!   random-access document format, and the order-preserving scalar and
//!   composite key encodings;
//! - the storage layer ([`kvs`], [`key`]): snapshot and batch sessions over
//!   a pluggable engine, logical stores, transient scratch stores, and the
//!   rollback segment that keeps multi-flush writes atomic.

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod cnf;
pub mod ctx;
pub mod enc;
pub mod err;
pub mod key;
pub mod kvs;
pub mod val;

pub use self::err::Error;
pub use self::val::{Array, Document, Value};
