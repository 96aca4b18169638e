//! The document value model.
//!
//! A [`Value`] is a tagged union over a closed set of eight types. Documents
//! are insertion-ordered mappings from unique field names to values, arrays
//! are ordered sequences. Both can either own their content or lazily view
//! an encoded byte buffer produced by the document codec.

pub mod array;
pub mod document;

pub use self::array::Array;
pub use self::document::Document;

use std::fmt::{self, Display, Formatter, Write};

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::err::Error;

/// The type tag of a [`Value`].
///
/// The discriminants are the shared tag vocabulary of the document codec
/// and the composite key codec. Their numeric order is the order in which
/// types sort relative to each other inside encoded keys, with room left
/// between tags; integers are promoted to [`Type::Double`] when used as
/// key material so that all numbers sort together.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[repr(u8)]
pub enum Type {
	Null = 0x05,
	Bool = 0x10,
	Integer = 0x20,
	Double = 0x25,
	Text = 0x30,
	Blob = 0x35,
	Array = 0x40,
	Document = 0x50,
}

impl Type {
	pub fn from_u8(tag: u8) -> Result<Type, Error> {
		match tag {
			0x05 => Ok(Type::Null),
			0x10 => Ok(Type::Bool),
			0x20 => Ok(Type::Integer),
			0x25 => Ok(Type::Double),
			0x30 => Ok(Type::Text),
			0x35 => Ok(Type::Blob),
			0x40 => Ok(Type::Array),
			0x50 => Ok(Type::Document),
			_ => Err(Error::Malformed(format!("unknown type tag {tag:#04x}"))),
		}
	}

	pub fn as_u8(self) -> u8 {
		self as u8
	}
}

impl Display for Type {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Type::Null => f.write_str("null"),
			Type::Bool => f.write_str("bool"),
			Type::Integer => f.write_str("integer"),
			Type::Double => f.write_str("double"),
			Type::Text => f.write_str("text"),
			Type::Blob => f.write_str("blob"),
			Type::Array => f.write_str("array"),
			Type::Document => f.write_str("document"),
		}
	}
}

/// A single database value.
///
/// Equality is type tag equality plus payload equality. Compound values
/// compare element-wise in order. An `Integer` never equals a `Double`,
/// even when both hold the same number.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Integer(i64),
	Double(f64),
	Blob(Vec<u8>),
	Text(String),
	Array(Array),
	Document(Document),
}

impl Value {
	pub fn type_of(&self) -> Type {
		match self {
			Value::Null => Type::Null,
			Value::Bool(_) => Type::Bool,
			Value::Integer(_) => Type::Integer,
			Value::Double(_) => Type::Double,
			Value::Blob(_) => Type::Blob,
			Value::Text(_) => Type::Text,
			Value::Array(_) => Type::Array,
			Value::Document(_) => Type::Document,
		}
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Integer(v)
	}
}

impl From<i32> for Value {
	fn from(v: i32) -> Self {
		Value::Integer(v as i64)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Double(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::Text(v.to_owned())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::Text(v)
	}
}

impl From<Vec<u8>> for Value {
	fn from(v: Vec<u8>) -> Self {
		Value::Blob(v)
	}
}

impl From<Array> for Value {
	fn from(v: Array) -> Self {
		Value::Array(v)
	}
}

impl From<Document> for Value {
	fn from(v: Document) -> Self {
		Value::Document(v)
	}
}

impl Display for Value {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("NULL"),
			Value::Bool(v) => write!(f, "{v}"),
			Value::Integer(v) => write!(f, "{v}"),
			Value::Double(v) => {
				if v.fract() == 0.0 && v.is_finite() {
					write!(f, "{v:.1}")
				} else {
					write!(f, "{v}")
				}
			}
			Value::Blob(v) => {
				f.write_str("x'")?;
				for b in v {
					write!(f, "{b:02x}")?;
				}
				f.write_char('\'')
			}
			Value::Text(v) => write!(f, "{v:?}"),
			Value::Array(v) => Display::fmt(v, f),
			Value::Document(v) => Display::fmt(v, f),
		}
	}
}

impl Serialize for Value {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self {
			Value::Null => serializer.serialize_unit(),
			Value::Bool(v) => serializer.serialize_bool(*v),
			Value::Integer(v) => serializer.serialize_i64(*v),
			Value::Double(v) => serializer.serialize_f64(*v),
			Value::Blob(v) => serializer.serialize_bytes(v),
			Value::Text(v) => serializer.serialize_str(v),
			Value::Array(v) => v.serialize(serializer),
			Value::Document(v) => v.serialize(serializer),
		}
	}
}

impl Serialize for Array {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(self.len().ok())?;
		for v in self.iter() {
			let v = v.map_err(serde::ser::Error::custom)?;
			seq.serialize_element(&v)?;
		}
		seq.end()
	}
}

impl Serialize for Document {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut map = serializer.serialize_map(self.len().ok())?;
		for entry in self.iter() {
			let (name, value) = entry.map_err(serde::ser::Error::custom)?;
			map.serialize_entry(&name, &value)?;
		}
		map.end()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn type_tags_round_trip() {
		for t in [
			Type::Null,
			Type::Bool,
			Type::Integer,
			Type::Double,
			Type::Text,
			Type::Blob,
			Type::Array,
			Type::Document,
		] {
			assert_eq!(Type::from_u8(t.as_u8()).unwrap(), t);
		}
		assert!(matches!(Type::from_u8(0xee), Err(Error::Malformed(_))));
	}

	#[test]
	fn integers_and_doubles_are_distinct() {
		assert_ne!(Value::Integer(10), Value::Double(10.0));
		assert_eq!(Value::Integer(10), Value::Integer(10));
	}

	#[test]
	fn display_renders_every_variant() {
		let mut doc = Document::new();
		doc.insert("a", Value::Integer(1));
		doc.insert("b", Value::Double(2.0));
		let v = Value::Array(Array::from(vec![
			Value::Null,
			Value::Bool(true),
			Value::Text("x".into()),
			Value::Blob(vec![0xde, 0xad]),
			Value::Document(doc),
		]));
		assert_eq!(v.to_string(), r#"[NULL, true, "x", x'dead', {"a": 1, "b": 2.0}]"#);
	}
}
