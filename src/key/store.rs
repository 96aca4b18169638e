//! Keys for store metadata and store data.

use crate::err::Error;
use crate::kvs::Key;

/// Separates the layout components of a store key.
pub const SEPARATOR: u8 = 0x1F;

const META_PREFIX: &[u8] = b"__genji.store";
const DATA_TAG: u8 = b's';

/// Validate a user-chosen store name. Names are non-empty byte sequences
/// and must not contain the separator byte.
pub fn check_name(name: &[u8]) -> Result<(), Error> {
	if name.is_empty() {
		return Err(Error::Invalid("empty store name".into()));
	}
	if name.contains(&SEPARATOR) {
		return Err(Error::Invalid("store name contains the separator byte 0x1f".into()));
	}
	Ok(())
}

/// The metadata key recording a store's existence. Its value is empty.
pub struct Meta<'a> {
	pub name: &'a [u8],
}

impl<'a> Meta<'a> {
	pub fn new(name: &'a [u8]) -> Self {
		Meta {
			name,
		}
	}

	pub fn encode(&self) -> Key {
		let mut key = Vec::with_capacity(META_PREFIX.len() + 1 + self.name.len());
		key.extend_from_slice(META_PREFIX);
		key.push(SEPARATOR);
		key.extend_from_slice(self.name);
		key
	}
}

/// A data key inside a store's own prefix.
pub struct Data<'a> {
	pub name: &'a [u8],
	pub key: &'a [u8],
}

impl<'a> Data<'a> {
	pub fn new(name: &'a [u8], key: &'a [u8]) -> Self {
		Data {
			name,
			key,
		}
	}

	pub fn encode(&self) -> Key {
		let mut key = prefix(self.name);
		key.extend_from_slice(self.key);
		key
	}
}

/// The byte prefix every data key of the named store carries.
pub fn prefix(name: &[u8]) -> Key {
	let mut key = Vec::with_capacity(name.len() + 4);
	key.push(DATA_TAG);
	key.push(SEPARATOR);
	key.extend_from_slice(name);
	key.push(SEPARATOR);
	key.push(0x00);
	key
}

/// An exclusive upper bound above every data key of the named store.
pub fn upper_bound(name: &[u8]) -> Key {
	let mut key = Vec::with_capacity(name.len() + 4);
	key.push(DATA_TAG);
	key.push(SEPARATOR);
	key.extend_from_slice(name);
	key.push(SEPARATOR);
	key.push(0xFF);
	key
}
