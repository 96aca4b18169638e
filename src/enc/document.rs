//! The random-access document format.
//!
//! An encoded document is a header followed by a body:
//!
//! ```text
//! document := header-size (uvarint) || header || body
//! header   := field-count (uvarint) || field-descriptor*
//! field-descriptor := name-size (uvarint) || name-bytes
//!                  || type-tag (uvarint)
//!                  || value-size (uvarint)
//!                  || offset (uvarint)
//! body     := concatenation of field bodies in descriptor order
//! ```
//!
//! Looking up one field scans only the header and then slices the body at
//! the recorded offset; no other field body is touched. Arrays use the same
//! layout with the zig-zag encoded element index in place of the name.
//! Nested documents and arrays recurse, so a compound field body is itself
//! a complete encoding and can be viewed without copying.
//!
//! Scalar bodies: Bool is one byte, Integer a zig-zag varint, Double the
//! 8-byte sort-ordered form, Text and Blob raw bytes, Null empty.

use bytes::Bytes;
use std::collections::HashSet;

use crate::cnf::{MAX_DOCUMENT_SIZE, MAX_FIELD_NAME_SIZE};
use crate::enc::sort;
use crate::enc::varint::{put_svarint, put_uvarint, svarint, uvarint};
use crate::err::Error;
use crate::val::document::Repr as DocRepr;
use crate::val::{Array, Document, Type, Value};

/// Encode a document, appending to `buf`.
///
/// Encoding a document that is already a view over encoded bytes appends
/// the original bytes unchanged.
pub fn encode_document(buf: &mut Vec<u8>, doc: &Document) -> Result<(), Error> {
	match &doc.repr {
		DocRepr::Encoded(enc) => {
			buf.extend_from_slice(enc.as_bytes());
			Ok(())
		}
		DocRepr::Owned(fields) => {
			check_names(fields)?;
			let descriptors = fields.iter().map(|(n, v)| (FieldName::Name(n.as_str()), v));
			encode_entries(buf, descriptors)
		}
	}
}

/// Encode an array, appending to `buf`. Same format as documents, with the
/// zig-zag encoded index standing in for the field name.
pub fn encode_array(buf: &mut Vec<u8>, arr: &Array) -> Result<(), Error> {
	match &arr.repr {
		crate::val::array::Repr::Encoded(enc) => {
			buf.extend_from_slice(enc.as_bytes());
			Ok(())
		}
		crate::val::array::Repr::Owned(elements) => {
			let descriptors =
				elements.iter().enumerate().map(|(i, v)| (FieldName::Index(i as i64), v));
			encode_entries(buf, descriptors)
		}
	}
}

enum FieldName<'a> {
	Name(&'a str),
	Index(i64),
}

fn check_names(fields: &[(String, Value)]) -> Result<(), Error> {
	let mut seen: HashSet<&str, ahash::RandomState> = HashSet::default();
	for (name, _) in fields {
		if name.is_empty() {
			return Err(Error::Invalid("empty field name".into()));
		}
		if name.len() > MAX_FIELD_NAME_SIZE {
			return Err(Error::Invalid(format!(
				"field name longer than {MAX_FIELD_NAME_SIZE} bytes"
			)));
		}
		if !seen.insert(name) {
			return Err(Error::AlreadyExists(format!("field `{name}`")));
		}
	}
	Ok(())
}

fn encode_entries<'a>(
	buf: &mut Vec<u8>,
	entries: impl ExactSizeIterator<Item = (FieldName<'a>, &'a Value)>,
) -> Result<(), Error> {
	let mut header = Vec::new();
	let mut body = Vec::new();
	let mut name = Vec::new();
	put_uvarint(&mut header, entries.len() as u64);
	for (field, value) in entries {
		name.clear();
		match field {
			FieldName::Name(n) => name.extend_from_slice(n.as_bytes()),
			FieldName::Index(i) => put_svarint(&mut name, i),
		}
		let offset = body.len();
		encode_value_body(&mut body, value)?;
		put_uvarint(&mut header, name.len() as u64);
		header.extend_from_slice(&name);
		put_uvarint(&mut header, value.type_of().as_u8() as u64);
		put_uvarint(&mut header, (body.len() - offset) as u64);
		put_uvarint(&mut header, offset as u64);
	}
	let total = uvarint_len(header.len() as u64) + header.len() + body.len();
	if total > MAX_DOCUMENT_SIZE {
		return Err(Error::Invalid(format!(
			"encoded document exceeds {MAX_DOCUMENT_SIZE} bytes"
		)));
	}
	put_uvarint(buf, header.len() as u64);
	buf.extend_from_slice(&header);
	buf.extend_from_slice(&body);
	Ok(())
}

fn encode_value_body(body: &mut Vec<u8>, value: &Value) -> Result<(), Error> {
	match value {
		Value::Null => Ok(()),
		Value::Bool(v) => {
			sort::put_bool(body, *v);
			Ok(())
		}
		Value::Integer(v) => {
			put_svarint(body, *v);
			Ok(())
		}
		Value::Double(v) => sort::put_f64(body, *v),
		Value::Text(v) => {
			body.extend_from_slice(v.as_bytes());
			Ok(())
		}
		Value::Blob(v) => {
			body.extend_from_slice(v);
			Ok(())
		}
		Value::Array(v) => encode_array(body, v),
		Value::Document(v) => encode_document(body, v),
	}
}

fn uvarint_len(v: u64) -> usize {
	let mut buf = Vec::with_capacity(10);
	put_uvarint(&mut buf, v);
	buf.len()
}

/// A lazy, immutable view presenting the document capability over encoded
/// bytes.
///
/// Construction never fails; malformed bytes surface as
/// [`Error::Malformed`] on the first access. The view can be re-bound to a
/// fresh buffer with [`EncodedDocument::reset`] to amortise allocation
/// across decodes.
#[derive(Clone, Debug)]
pub struct EncodedDocument {
	bytes: Bytes,
}

impl EncodedDocument {
	pub fn new(bytes: impl Into<Bytes>) -> EncodedDocument {
		EncodedDocument {
			bytes: bytes.into(),
		}
	}

	/// Re-bind the view to a new buffer.
	pub fn reset(&mut self, bytes: impl Into<Bytes>) {
		self.bytes = bytes.into();
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}

	/// The number of fields recorded in the header.
	pub fn len(&self) -> Result<usize, Error> {
		let layout = Layout::split(&self.bytes)?;
		Ok(layout.count)
	}

	pub fn is_empty(&self) -> Result<bool, Error> {
		Ok(self.len()? == 0)
	}

	/// Look up one field by name, scanning only the header and decoding
	/// only the matching body slice.
	pub fn get(&self, name: &str) -> Result<Value, Error> {
		let mut layout = Layout::split(&self.bytes)?;
		while let Some(d) = layout.next_descriptor()? {
			if &d.name[..] == name.as_bytes() {
				return decode_value(d.tag, layout.body_slice(&d)?);
			}
		}
		Err(Error::NotFound(format!("field `{name}`")))
	}

	/// Iterate `(name, value)` pairs in encoding order. Iteration yields a
	/// single error and stops if the buffer turns out to be malformed.
	pub fn iter(&self) -> Fields {
		Fields {
			inner: Walk::start(&self.bytes),
		}
	}
}

/// The array twin of [`EncodedDocument`].
#[derive(Clone, Debug)]
pub struct EncodedArray {
	bytes: Bytes,
}

impl EncodedArray {
	pub fn new(bytes: impl Into<Bytes>) -> EncodedArray {
		EncodedArray {
			bytes: bytes.into(),
		}
	}

	pub fn reset(&mut self, bytes: impl Into<Bytes>) {
		self.bytes = bytes.into();
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.bytes
	}

	pub fn len(&self) -> Result<usize, Error> {
		let layout = Layout::split(&self.bytes)?;
		Ok(layout.count)
	}

	pub fn is_empty(&self) -> Result<bool, Error> {
		Ok(self.len()? == 0)
	}

	/// Look up one element by index.
	pub fn get(&self, index: usize) -> Result<Value, Error> {
		let mut layout = Layout::split(&self.bytes)?;
		while let Some(d) = layout.next_descriptor()? {
			let (i, n) = svarint(&d.name)?;
			if n != d.name.len() {
				return Err(Error::Malformed("trailing bytes after array index".into()));
			}
			if i == index as i64 {
				return decode_value(d.tag, layout.body_slice(&d)?);
			}
		}
		Err(Error::NotFound(format!("array index {index}")))
	}

	pub fn iter(&self) -> Elements {
		Elements {
			inner: Walk::start(&self.bytes),
		}
	}
}

/// Decode one value body given its type tag. Compound values come back as
/// lazy views over the same underlying buffer.
pub fn decode_value(tag: Type, data: Bytes) -> Result<Value, Error> {
	match tag {
		Type::Null => match data.is_empty() {
			true => Ok(Value::Null),
			false => Err(Error::Malformed("null body must be empty".into())),
		},
		Type::Bool => Ok(Value::Bool(sort::decode_bool(&data)?)),
		Type::Integer => {
			let (v, n) = svarint(&data)?;
			if n != data.len() {
				return Err(Error::Malformed("trailing bytes after integer body".into()));
			}
			Ok(Value::Integer(v))
		}
		Type::Double => Ok(Value::Double(sort::decode_f64(&data)?)),
		Type::Text => Ok(Value::Text(std::str::from_utf8(&data)?.to_owned())),
		Type::Blob => Ok(Value::Blob(data.to_vec())),
		Type::Array => Ok(Value::Array(Array::from(EncodedArray::new(data)))),
		Type::Document => Ok(Value::Document(Document::from(EncodedDocument::new(data)))),
	}
}

struct Descriptor {
	name: Bytes,
	tag: Type,
	size: usize,
	offset: usize,
}

/// The parsed frame of one encoded document: header walk state plus the
/// body region.
struct Layout {
	header: Bytes,
	body: Bytes,
	count: usize,
	seen: usize,
	pos: usize,
}

impl Layout {
	fn split(bytes: &Bytes) -> Result<Layout, Error> {
		if bytes.len() > MAX_DOCUMENT_SIZE {
			return Err(Error::Malformed(format!(
				"encoded document exceeds {MAX_DOCUMENT_SIZE} bytes"
			)));
		}
		let (header_size, n) = uvarint(bytes)?;
		let header_size = header_size as usize;
		let end = n
			.checked_add(header_size)
			.filter(|end| *end <= bytes.len())
			.ok_or_else(|| Error::Malformed("header size points past buffer end".into()))?;
		let header = bytes.slice(n..end);
		let body = bytes.slice(end..);
		let (count, read) = uvarint(&header)?;
		Ok(Layout {
			header,
			body,
			count: count as usize,
			seen: 0,
			pos: read,
		})
	}

	fn next_descriptor(&mut self) -> Result<Option<Descriptor>, Error> {
		if self.seen == self.count {
			return Ok(None);
		}
		let (name_size, n) = uvarint(&self.header[self.pos..])?;
		let name_size = name_size as usize;
		if name_size == 0 || name_size > MAX_FIELD_NAME_SIZE {
			return Err(Error::Malformed("invalid field name size".into()));
		}
		self.pos += n;
		let name_end = self
			.pos
			.checked_add(name_size)
			.filter(|end| *end <= self.header.len())
			.ok_or_else(|| Error::Malformed("truncated field name".into()))?;
		let name = self.header.slice(self.pos..name_end);
		self.pos = name_end;
		let (tag, n) = uvarint(&self.header[self.pos..])?;
		self.pos += n;
		if tag > u8::MAX as u64 {
			return Err(Error::Malformed(format!("unknown type tag {tag:#x}")));
		}
		let tag = Type::from_u8(tag as u8)?;
		let (size, n) = uvarint(&self.header[self.pos..])?;
		self.pos += n;
		let (offset, n) = uvarint(&self.header[self.pos..])?;
		self.pos += n;
		self.seen += 1;
		Ok(Some(Descriptor {
			name,
			tag,
			size: size as usize,
			offset: offset as usize,
		}))
	}

	fn body_slice(&self, d: &Descriptor) -> Result<Bytes, Error> {
		let end = d
			.offset
			.checked_add(d.size)
			.filter(|end| *end <= self.body.len())
			.ok_or_else(|| Error::Malformed("field body points past buffer end".into()))?;
		Ok(self.body.slice(d.offset..end))
	}
}

/// Shared walk state for the two encoded iterators. Owns its buffer, so an
/// iterator stays valid independently of the view that created it.
enum Walk {
	Failed(Option<Error>),
	Walking(Layout),
}

impl Walk {
	fn start(bytes: &Bytes) -> Walk {
		match Layout::split(bytes) {
			Ok(layout) => Walk::Walking(layout),
			Err(e) => Walk::Failed(Some(e)),
		}
	}

	fn next(&mut self) -> Option<Result<(Descriptor, Bytes), Error>> {
		let layout = match self {
			Walk::Failed(e) => return e.take().map(Err),
			Walk::Walking(layout) => layout,
		};
		let step = layout.next_descriptor().and_then(|d| match d {
			Some(d) => {
				let body = layout.body_slice(&d)?;
				Ok(Some((d, body)))
			}
			None => Ok(None),
		});
		match step {
			Ok(Some(entry)) => Some(Ok(entry)),
			Ok(None) => None,
			Err(e) => {
				*self = Walk::Failed(None);
				Some(Err(e))
			}
		}
	}
}

/// Ordered `(name, value)` iterator over an [`EncodedDocument`].
pub struct Fields {
	inner: Walk,
}

impl Iterator for Fields {
	type Item = Result<(String, Value), Error>;

	fn next(&mut self) -> Option<Self::Item> {
		let entry = match self.inner.next()? {
			Ok(entry) => entry,
			Err(e) => return Some(Err(e)),
		};
		let (d, body) = entry;
		let item = std::str::from_utf8(&d.name)
			.map_err(Error::from)
			.and_then(|name| Ok((name.to_owned(), decode_value(d.tag, body)?)));
		if item.is_err() {
			self.inner = Walk::Failed(None);
		}
		Some(item)
	}
}

/// Ordered element iterator over an [`EncodedArray`].
pub struct Elements {
	inner: Walk,
}

impl Iterator for Elements {
	type Item = Result<Value, Error>;

	fn next(&mut self) -> Option<Self::Item> {
		let entry = match self.inner.next()? {
			Ok(entry) => entry,
			Err(e) => return Some(Err(e)),
		};
		let (d, body) = entry;
		let item = decode_value(d.tag, body);
		if item.is_err() {
			self.inner = Walk::Failed(None);
		}
		Some(item)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn encode(doc: &Document) -> Vec<u8> {
		let mut buf = Vec::new();
		encode_document(&mut buf, doc).unwrap();
		buf
	}

	#[test]
	fn document_round_trip_preserves_order_and_types() {
		let mut doc = Document::new();
		doc.insert("age", Value::Integer(10));
		doc.insert("name", Value::Text("john".into()));
		let bytes = encode(&doc);
		let view = EncodedDocument::new(bytes.clone());
		let fields: Vec<(String, Value)> =
			view.iter().collect::<Result<_, _>>().unwrap();
		assert_eq!(
			fields,
			vec![
				("age".to_owned(), Value::Integer(10)),
				("name".to_owned(), Value::Text("john".into())),
			]
		);
		// Encoding the decoded copy yields the original bytes
		let decoded = Document::from(view);
		assert_eq!(encode(&decoded), bytes);
	}

	#[test]
	fn random_access_matches_iteration() {
		let mut doc = Document::new();
		doc.insert("a", Value::Bool(true));
		doc.insert("b", Value::Double(-3.25));
		doc.insert("c", Value::Blob(vec![1, 2, 3]));
		doc.insert("d", Value::Null);
		let view = EncodedDocument::new(encode(&doc));
		for entry in view.iter() {
			let (name, value) = entry.unwrap();
			assert_eq!(view.get(&name).unwrap(), value);
			assert_eq!(doc.get(&name).unwrap(), value);
		}
		assert!(matches!(view.get("missing"), Err(Error::NotFound(_))));
	}

	#[test]
	fn nested_compound_access() {
		let mut inner = Document::new();
		inner.insert("c", Value::Text("x".into()));
		inner.insert(
			"d",
			Value::Array(Array::from(vec![Value::Bool(true), Value::Double(-3.14)])),
		);
		let mut doc = Document::new();
		doc.insert("a", Value::Integer(10));
		doc.insert("b", Value::Document(inner));
		let view = EncodedDocument::new(encode(&doc));
		let b = match view.get("b").unwrap() {
			Value::Document(d) => d,
			v => panic!("expected a document, got {v}"),
		};
		let d = match b.get("d").unwrap() {
			Value::Array(a) => a,
			v => panic!("expected an array, got {v}"),
		};
		assert_eq!(d.get(1).unwrap(), Value::Double(-3.14));
	}

	#[test]
	fn array_round_trip_and_indexing() {
		let arr = Array::from(vec![
			Value::Integer(1),
			Value::Text("two".into()),
			Value::Null,
		]);
		let mut buf = Vec::new();
		encode_array(&mut buf, &arr).unwrap();
		let view = EncodedArray::new(buf);
		assert_eq!(view.len().unwrap(), 3);
		for i in 0..3 {
			assert_eq!(view.get(i).unwrap(), arr.get(i).unwrap());
		}
		assert!(matches!(view.get(3), Err(Error::NotFound(_))));
		let elements: Vec<Value> = view.iter().collect::<Result<_, _>>().unwrap();
		assert_eq!(Array::from(elements), arr);
	}

	#[test]
	fn duplicate_field_names_fail_to_encode() {
		let mut doc = Document::new();
		doc.push("a", Value::Integer(1));
		doc.push("a", Value::Integer(2));
		let mut buf = Vec::new();
		assert!(matches!(
			encode_document(&mut buf, &doc),
			Err(Error::AlreadyExists(_))
		));
	}

	#[test]
	fn empty_field_names_fail_to_encode() {
		let mut doc = Document::new();
		doc.push("", Value::Integer(1));
		let mut buf = Vec::new();
		assert!(matches!(encode_document(&mut buf, &doc), Err(Error::Invalid(_))));
	}

	#[test]
	fn construction_is_infallible_errors_surface_on_access() {
		// A header size pointing past the end of the buffer
		let view = EncodedDocument::new(vec![0x20, 0x01]);
		assert!(matches!(view.get("x"), Err(Error::Malformed(_))));
		let mut it = view.iter();
		assert!(matches!(it.next(), Some(Err(Error::Malformed(_)))));
		assert!(it.next().is_none());
	}

	#[test]
	fn truncated_and_corrupt_buffers_are_malformed() {
		let mut doc = Document::new();
		doc.insert("name", Value::Text("john".into()));
		let bytes = encode(&doc);
		// Truncate the body
		let view = EncodedDocument::new(bytes[..bytes.len() - 2].to_vec());
		assert!(matches!(view.get("name"), Err(Error::Malformed(_))));
		// Corrupt the type tag: header starts after the size varint, with
		// field count, name size, then the 4-byte name
		let mut corrupt = bytes.clone();
		corrupt[1 + 1 + 1 + 4] = 0xee;
		let view = EncodedDocument::new(corrupt);
		assert!(matches!(view.get("name"), Err(Error::Malformed(_))));
	}

	#[test]
	fn reset_rebinds_the_view() {
		let mut a = Document::new();
		a.insert("a", Value::Integer(1));
		let mut b = Document::new();
		b.insert("b", Value::Integer(2));
		let mut view = EncodedDocument::new(encode(&a));
		assert!(view.get("a").is_ok());
		view.reset(encode(&b));
		assert!(view.get("b").is_ok());
		assert!(matches!(view.get("a"), Err(Error::NotFound(_))));
	}

	#[test]
	fn empty_document_and_array() {
		let bytes = encode(&Document::new());
		let view = EncodedDocument::new(bytes);
		assert_eq!(view.len().unwrap(), 0);
		assert!(view.iter().next().is_none());

		let mut buf = Vec::new();
		encode_array(&mut buf, &Array::new()).unwrap();
		let view = EncodedArray::new(buf);
		assert_eq!(view.len().unwrap(), 0);
		assert!(view.iter().next().is_none());
	}
}
