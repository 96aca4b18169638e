//! The composite key codec.
//!
//! Serialises a whole value tree into one byte string whose lexicographic
//! order agrees with the semantic order of the values: within a type,
//! values sort naturally; across types, keys sort in type-tag order.
//!
//! Every encoded value starts with its one-byte type tag. Integers are
//! promoted onto the [`Type::Double`] tag with an all-zero 8-byte
//! discriminator appended, which is how the decoder tells the two apart.
//! Text and blob payloads go through the lexicographic base64 alphabet so
//! their encodings stay delimiter-free. Compound values nest with four
//! reserved delimiter bytes, all chosen below every type tag and every
//! base64 character so that a shorter prefix always sorts first.

use crate::enc::sort;
use crate::err::Error;
use crate::val::{Array, Document, Type, Value};

/// Terminates an encoded document. Lowest delimiter so a document that is
/// a strict prefix of another sorts first.
pub const DOCUMENT_END: u8 = 0x01;
/// Separates field names from values and fields from each other.
pub const DOCUMENT_VALUE_DELIM: u8 = 0x02;
/// Terminates an encoded array. Below every element tag so a shorter
/// array sorts before its extensions.
pub const ARRAY_END: u8 = 0x03;
/// Separates successive array elements.
pub const ARRAY_VALUE_DELIM: u8 = 0x04;

fn is_delim(b: u8) -> bool {
	(DOCUMENT_END..=ARRAY_VALUE_DELIM).contains(&b)
}

/// Append the ordered key encoding of `value` to `buf`.
pub fn encode_key(buf: &mut Vec<u8>, value: &Value) -> Result<(), Error> {
	match value {
		Value::Null => {
			buf.push(Type::Null.as_u8());
			Ok(())
		}
		Value::Bool(v) => {
			buf.push(Type::Bool.as_u8());
			sort::put_bool(buf, *v);
			Ok(())
		}
		Value::Integer(v) => {
			// Integers ride the double tag with a zero discriminator
			buf.push(Type::Double.as_u8());
			sort::put_i64(buf, *v);
			buf.extend_from_slice(&[0; 8]);
			Ok(())
		}
		Value::Double(v) => {
			buf.push(Type::Double.as_u8());
			sort::put_f64(buf, *v)
		}
		Value::Text(v) => {
			buf.push(Type::Text.as_u8());
			sort::put_lex64(buf, v.as_bytes());
			Ok(())
		}
		Value::Blob(v) => {
			buf.push(Type::Blob.as_u8());
			sort::put_lex64(buf, v);
			Ok(())
		}
		Value::Array(v) => encode_array_key(buf, v),
		Value::Document(v) => encode_document_key(buf, v),
	}
}

fn encode_array_key(buf: &mut Vec<u8>, arr: &Array) -> Result<(), Error> {
	buf.push(Type::Array.as_u8());
	for (i, element) in arr.iter().enumerate() {
		if i > 0 {
			buf.push(ARRAY_VALUE_DELIM);
		}
		encode_key(buf, &element?)?;
	}
	buf.push(ARRAY_END);
	Ok(())
}

fn encode_document_key(buf: &mut Vec<u8>, doc: &Document) -> Result<(), Error> {
	buf.push(Type::Document.as_u8());
	for (i, entry) in doc.iter().enumerate() {
		let (name, value) = entry?;
		if name.is_empty() {
			return Err(Error::Invalid("empty field name".into()));
		}
		if i > 0 {
			buf.push(DOCUMENT_VALUE_DELIM);
		}
		sort::put_lex64(buf, name.as_bytes());
		buf.push(DOCUMENT_VALUE_DELIM);
		encode_key(buf, &value)?;
	}
	buf.push(DOCUMENT_END);
	Ok(())
}

/// Decode a full key. Fails with [`Error::Malformed`] when bytes remain
/// after the first value.
pub fn decode_key(src: &[u8]) -> Result<Value, Error> {
	let (value, n) = decode_first(src)?;
	if n != src.len() {
		return Err(Error::Malformed("trailing bytes after encoded key".into()));
	}
	Ok(value)
}

/// Decode the first value of a composite key, returning it along with the
/// number of bytes consumed. Lets callers walk keys built from several
/// concatenated encodings.
pub fn decode_first(src: &[u8]) -> Result<(Value, usize), Error> {
	let tag = match src.first() {
		Some(&tag) => Type::from_u8(tag)?,
		None => return Err(Error::Malformed("empty key".into())),
	};
	let rest = &src[1..];
	match tag {
		Type::Null => Ok((Value::Null, 1)),
		Type::Bool => {
			let v = rest
				.first()
				.ok_or_else(|| Error::Malformed("truncated boolean key".into()))?;
			Ok((Value::Bool(sort::decode_bool(&[*v])?), 2))
		}
		// The integer tag never appears on the wire
		Type::Integer => Err(Error::Malformed("unexpected integer tag in key".into())),
		Type::Double => decode_number(rest),
		Type::Text => {
			let data = scan_base64(rest);
			let text = String::from_utf8(sort::decode_lex64(data)?)?;
			Ok((Value::Text(text), 1 + data.len()))
		}
		Type::Blob => {
			let data = scan_base64(rest);
			Ok((Value::Blob(sort::decode_lex64(data)?), 1 + data.len()))
		}
		Type::Array => decode_array_key(rest),
		Type::Document => decode_document_key(rest),
	}
}

/// A number is 8 ordered bytes for a double, or 16 for an integer whose
/// trailing 8 bytes are all zero. Delimiters and type tags are never zero,
/// so the discriminator cannot be confused with following key material.
fn decode_number(rest: &[u8]) -> Result<(Value, usize), Error> {
	if rest.len() >= 16 && rest[8..16] == [0; 8] {
		return Ok((Value::Integer(sort::decode_i64(&rest[..8])?), 17));
	}
	if rest.len() < 8 {
		return Err(Error::Malformed("truncated number key".into()));
	}
	Ok((Value::Double(sort::decode_f64(&rest[..8])?), 9))
}

fn scan_base64(rest: &[u8]) -> &[u8] {
	let end = rest.iter().position(|b| is_delim(*b)).unwrap_or(rest.len());
	&rest[..end]
}

fn decode_array_key(rest: &[u8]) -> Result<(Value, usize), Error> {
	let mut arr = Array::new();
	let mut pos = 0;
	if rest.first() == Some(&ARRAY_END) {
		return Ok((Value::Array(arr), 2));
	}
	loop {
		let (element, n) = decode_first(&rest[pos..])?;
		arr.push(element);
		pos += n;
		match rest.get(pos) {
			Some(&ARRAY_VALUE_DELIM) => pos += 1,
			Some(&ARRAY_END) => return Ok((Value::Array(arr), 1 + pos + 1)),
			_ => return Err(Error::Malformed("unterminated array key".into())),
		}
	}
}

fn decode_document_key(rest: &[u8]) -> Result<(Value, usize), Error> {
	let mut doc = Document::new();
	let mut pos = 0;
	if rest.first() == Some(&DOCUMENT_END) {
		return Ok((Value::Document(doc), 2));
	}
	loop {
		let name_bytes = scan_base64(&rest[pos..]);
		if rest.get(pos + name_bytes.len()) != Some(&DOCUMENT_VALUE_DELIM) {
			return Err(Error::Malformed("unterminated document field name".into()));
		}
		let name = String::from_utf8(sort::decode_lex64(name_bytes)?)?;
		pos += name_bytes.len() + 1;
		let (value, n) = decode_first(&rest[pos..])?;
		doc.push(name, value);
		pos += n;
		match rest.get(pos) {
			Some(&DOCUMENT_VALUE_DELIM) => pos += 1,
			Some(&DOCUMENT_END) => return Ok((Value::Document(doc), 1 + pos + 1)),
			_ => return Err(Error::Malformed("unterminated document key".into())),
		}
	}
}
