use std::fmt::{self, Display, Formatter};

use crate::enc::document::{Elements, EncodedArray};
use crate::err::Error;
use crate::val::Value;

/// An ordered, zero-indexed sequence of values.
///
/// Like [`super::Document`], an array either owns its elements or lazily
/// views an encoded buffer. Iterators are not restartable; create a new one
/// from the array to scan again.
#[derive(Clone, Debug, Default)]
pub struct Array {
	pub(crate) repr: Repr,
}

#[derive(Clone, Debug)]
pub(crate) enum Repr {
	Owned(Vec<Value>),
	Encoded(EncodedArray),
}

impl Default for Repr {
	fn default() -> Self {
		Repr::Owned(Vec::new())
	}
}

impl Array {
	pub fn new() -> Array {
		Array::default()
	}

	pub fn push(&mut self, value: impl Into<Value>) -> &mut Array {
		let value = value.into();
		self.owned_elements().push(value);
		self
	}

	/// Fetch an element by index. Fails with [`Error::NotFound`] when the
	/// index is past the end of the array.
	pub fn get(&self, index: usize) -> Result<Value, Error> {
		match &self.repr {
			Repr::Owned(elements) => match elements.get(index) {
				Some(v) => Ok(v.clone()),
				None => Err(Error::NotFound(format!("array index {index}"))),
			},
			Repr::Encoded(enc) => enc.get(index),
		}
	}

	pub fn len(&self) -> Result<usize, Error> {
		match &self.repr {
			Repr::Owned(elements) => Ok(elements.len()),
			Repr::Encoded(enc) => enc.len(),
		}
	}

	pub fn is_empty(&self) -> Result<bool, Error> {
		Ok(self.len()? == 0)
	}

	/// Iterate elements in order.
	pub fn iter(&self) -> ArrayIter<'_> {
		match &self.repr {
			Repr::Owned(elements) => ArrayIter(IterRepr::Owned(elements.iter())),
			Repr::Encoded(enc) => ArrayIter(IterRepr::Encoded(enc.iter())),
		}
	}

	fn owned_elements(&mut self) -> &mut Vec<Value> {
		if let Repr::Encoded(enc) = &self.repr {
			let elements = enc.iter().collect::<Result<Vec<_>, Error>>().unwrap_or_default();
			self.repr = Repr::Owned(elements);
		}
		match &mut self.repr {
			Repr::Owned(elements) => elements,
			Repr::Encoded(_) => unreachable!(),
		}
	}
}

impl From<EncodedArray> for Array {
	fn from(enc: EncodedArray) -> Self {
		Array {
			repr: Repr::Encoded(enc),
		}
	}
}

impl From<Vec<Value>> for Array {
	fn from(v: Vec<Value>) -> Self {
		Array {
			repr: Repr::Owned(v),
		}
	}
}

impl<V: Into<Value>> FromIterator<V> for Array {
	fn from_iter<T: IntoIterator<Item = V>>(iter: T) -> Self {
		Array {
			repr: Repr::Owned(iter.into_iter().map(Into::into).collect()),
		}
	}
}

impl PartialEq for Array {
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

impl Display for Array {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str("[")?;
		for (i, v) in self.iter().enumerate() {
			if i > 0 {
				f.write_str(", ")?;
			}
			match v {
				Ok(v) => Display::fmt(&v, f)?,
				Err(e) => write!(f, "<{e}>")?,
			}
		}
		f.write_str("]")
	}
}

pub struct ArrayIter<'a>(IterRepr<'a>);

enum IterRepr<'a> {
	Owned(std::slice::Iter<'a, Value>),
	Encoded(Elements),
}

impl Iterator for ArrayIter<'_> {
	type Item = Result<Value, Error>;

	fn next(&mut self) -> Option<Self::Item> {
		match &mut self.0 {
			IterRepr::Owned(it) => it.next().map(|v| Ok(v.clone())),
			IterRepr::Encoded(it) => it.next(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn indexing_past_the_end_is_not_found() {
		let arr: Array = vec![Value::Integer(1), Value::Integer(2)].into();
		assert_eq!(arr.get(1).unwrap(), Value::Integer(2));
		assert!(matches!(arr.get(2), Err(Error::NotFound(_))));
	}

	#[test]
	fn equality_is_element_wise() {
		let a = Array::from(vec![Value::Integer(1), Value::Text("x".into())]);
		let b = Array::from(vec![Value::Integer(1), Value::Text("x".into())]);
		let c = Array::from(vec![Value::Text("x".into()), Value::Integer(1)]);
		assert_eq!(a, b);
		assert_ne!(a, c);
	}
}
