use std::fmt::{self, Display, Formatter};

use crate::enc::document::{EncodedDocument, Fields};
use crate::err::Error;
use crate::val::Value;

/// An insertion-ordered mapping from unique field names to values.
///
/// A document either owns its fields or lazily views an encoded buffer, in
/// which case every access parses just enough of the header to answer.
/// Iteration order is the order in which fields were added and is part of
/// the contract: re-encoding a decoded document yields the original bytes.
#[derive(Clone, Debug, Default)]
pub struct Document {
	pub(crate) repr: Repr,
}

#[derive(Clone, Debug)]
pub(crate) enum Repr {
	Owned(Vec<(String, Value)>),
	Encoded(EncodedDocument),
}

impl Default for Repr {
	fn default() -> Self {
		Repr::Owned(Vec::new())
	}
}

impl Document {
	pub fn new() -> Document {
		Document::default()
	}

	/// Set a field, replacing the value in place if the name is already
	/// present. Keeps field names unique by construction.
	pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Document {
		let name = name.into();
		let value = value.into();
		let fields = self.owned_fields();
		match fields.iter_mut().find(|(n, _)| *n == name) {
			Some((_, v)) => *v = value,
			None => fields.push((name, value)),
		}
		self
	}

	/// Append a field without checking for duplicates. A duplicate name is
	/// reported when the document is encoded.
	pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Document {
		self.owned_fields().push((name.into(), value.into()));
		self
	}

	/// Fetch a field by name. Fails with [`Error::NotFound`] when the field
	/// is absent, or [`Error::Malformed`] when an encoded buffer does not
	/// parse.
	pub fn get(&self, name: &str) -> Result<Value, Error> {
		match &self.repr {
			Repr::Owned(fields) => match fields.iter().find(|(n, _)| n == name) {
				Some((_, v)) => Ok(v.clone()),
				None => Err(Error::NotFound(format!("field `{name}`"))),
			},
			Repr::Encoded(enc) => enc.get(name),
		}
	}

	/// The number of fields. Fallible because an encoded header is only
	/// parsed on access.
	pub fn len(&self) -> Result<usize, Error> {
		match &self.repr {
			Repr::Owned(fields) => Ok(fields.len()),
			Repr::Encoded(enc) => enc.len(),
		}
	}

	pub fn is_empty(&self) -> Result<bool, Error> {
		Ok(self.len()? == 0)
	}

	/// Iterate fields in insertion order.
	pub fn iter(&self) -> DocumentIter<'_> {
		match &self.repr {
			Repr::Owned(fields) => DocumentIter(IterRepr::Owned(fields.iter())),
			Repr::Encoded(enc) => DocumentIter(IterRepr::Encoded(enc.iter())),
		}
	}

	// Switching an encoded document to owned form materialises every field
	// once, so in-place mutation stays cheap afterwards.
	fn owned_fields(&mut self) -> &mut Vec<(String, Value)> {
		if let Repr::Encoded(enc) = &self.repr {
			let fields = enc.iter().collect::<Result<Vec<_>, Error>>().unwrap_or_default();
			self.repr = Repr::Owned(fields);
		}
		match &mut self.repr {
			Repr::Owned(fields) => fields,
			Repr::Encoded(_) => unreachable!(),
		}
	}
}

impl From<EncodedDocument> for Document {
	fn from(enc: EncodedDocument) -> Self {
		Document {
			repr: Repr::Encoded(enc),
		}
	}
}

impl<N: Into<String>, V: Into<Value>> FromIterator<(N, V)> for Document {
	fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
		let mut doc = Document::new();
		for (n, v) in iter {
			doc.insert(n, v);
		}
		doc
	}
}

impl PartialEq for Document {
	fn eq(&self, other: &Self) -> bool {
		let mut a = self.iter();
		let mut b = other.iter();
		loop {
			match (a.next(), b.next()) {
				(None, None) => return true,
				(Some(Ok(x)), Some(Ok(y))) => {
					if x != y {
						return false;
					}
				}
				_ => return false,
			}
		}
	}
}

impl Display for Document {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str("{")?;
		for (i, entry) in self.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			match entry {
				Ok((name, value)) => write!(f, "{name:?}: {value}")?,
				Err(e) => write!(f, "<{e}>")?,
			}
		}
		f.write_str("}")
	}
}

pub struct DocumentIter<'a>(IterRepr<'a>);

enum IterRepr<'a> {
	Owned(std::slice::Iter<'a, (String, Value)>),
	Encoded(Fields),
}

impl Iterator for DocumentIter<'_> {
	type Item = Result<(String, Value), Error>;

	fn next(&mut self) -> Option<Self::Item> {
		match &mut self.0 {
			IterRepr::Owned(it) => it.next().map(|(n, v)| Ok((n.clone(), v.clone()))),
			IterRepr::Encoded(it) => it.next(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_replaces_in_place() {
		let mut doc = Document::new();
		doc.insert("a", 1).insert("b", 2).insert("a", 3);
		assert_eq!(doc.len().unwrap(), 2);
		assert_eq!(doc.get("a").unwrap(), Value::Integer(3));
		let order: Vec<String> =
			doc.iter().map(|r| r.unwrap().0).collect();
		assert_eq!(order, vec!["a", "b"]);
	}

	#[test]
	fn get_missing_field_is_not_found() {
		let doc = Document::new();
		assert!(matches!(doc.get("nope"), Err(Error::NotFound(_))));
	}

	#[test]
	fn equality_is_order_sensitive() {
		let a: Document = [("x", 1), ("y", 2)].into_iter().collect();
		let b: Document = [("y", 2), ("x", 1)].into_iter().collect();
		let c: Document = [("x", 1), ("y", 2)].into_iter().collect();
		assert_ne!(a, b);
		assert_eq!(a, c);
	}
}
