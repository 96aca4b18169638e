//! Order-preserving scalar encodings.
//!
//! For any two values of the same type, the byte-lexicographic order of
//! their encodings matches the semantic order of the originals, which lets
//! range scans and index lookups run directly against the engine ordering.
//!
//! Booleans are a single byte. Unsigned integers are big-endian. Signed
//! integers are biased by flipping the sign bit of the big-endian form.
//! Doubles flip the sign bit when non-negative and all 64 bits when
//! negative, mapping the IEEE-754 total order onto unsigned comparison.
//! Text and blobs destined for keys go through a base64 alphabet whose
//! characters sort in ASCII order.

use base64_lib::alphabet::Alphabet;
use base64_lib::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64_lib::engine::{DecodePaddingMode, Engine};
use once_cell::sync::Lazy;

use crate::err::Error;

/// The standard base64 alphabet reordered so that encoded text sorts the
/// same way as its source bytes. No padding is ever emitted.
static LEX64: Lazy<GeneralPurpose> = Lazy::new(|| {
	let alphabet =
		Alphabet::new("-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz")
			.expect("the lexicographic base64 alphabet is well-formed");
	let config = GeneralPurposeConfig::new()
		.with_encode_padding(false)
		.with_decode_padding_mode(DecodePaddingMode::RequireNone);
	GeneralPurpose::new(&alphabet, config)
});

/// Append the one-byte encoding of a boolean to `buf`.
pub fn put_bool(buf: &mut Vec<u8>, v: bool) {
	buf.push(v as u8);
}

pub fn decode_bool(src: &[u8]) -> Result<bool, Error> {
	match src {
		[0] => Ok(false),
		[1] => Ok(true),
		_ => Err(Error::Malformed("expected a one-byte boolean".into())),
	}
}

/// Append the big-endian encoding of an unsigned integer to `buf`.
pub fn put_u64(buf: &mut Vec<u8>, v: u64) {
	buf.extend_from_slice(&v.to_be_bytes());
}

pub fn decode_u64(src: &[u8]) -> Result<u64, Error> {
	let bytes = fixed8(src)?;
	Ok(u64::from_be_bytes(bytes))
}

/// Append the biased big-endian encoding of a signed integer to `buf`.
/// Flipping the sign bit shifts the whole signed range into unsigned
/// space, so byte comparison agrees with integer comparison.
pub fn put_i64(buf: &mut Vec<u8>, v: i64) {
	put_u64(buf, (v as u64) ^ (1 << 63));
}

pub fn decode_i64(src: &[u8]) -> Result<i64, Error> {
	Ok((decode_u64(src)? ^ (1 << 63)) as i64)
}

/// Append the order-preserving encoding of a double to `buf`.
///
/// NaN has no place in a total order and is rejected. Both infinities
/// encode normally and sort outside every finite value.
pub fn put_f64(buf: &mut Vec<u8>, v: f64) -> Result<(), Error> {
	if v.is_nan() {
		return Err(Error::Malformed("NaN cannot be encoded in sort order".into()));
	}
	let mut bits = v.to_bits();
	if bits >> 63 == 0 {
		bits ^= 1 << 63;
	} else {
		bits = !bits;
	}
	put_u64(buf, bits);
	Ok(())
}

pub fn decode_f64(src: &[u8]) -> Result<f64, Error> {
	let mut bits = decode_u64(src)?;
	if bits >> 63 == 1 {
		bits ^= 1 << 63;
	} else {
		bits = !bits;
	}
	Ok(f64::from_bits(bits))
}

/// Append the lexicographic base64 encoding of `data` to `buf`.
pub fn put_lex64(buf: &mut Vec<u8>, data: &[u8]) {
	let encoded = LEX64.encode(data);
	buf.extend_from_slice(encoded.as_bytes());
}

pub fn decode_lex64(src: &[u8]) -> Result<Vec<u8>, Error> {
	LEX64.decode(src).map_err(|e| Error::Malformed(format!("invalid base64 key material: {e}")))
}

fn fixed8(src: &[u8]) -> Result<[u8; 8], Error> {
	match src.len() {
		8 => {
			let mut bytes = [0; 8];
			bytes.copy_from_slice(src);
			Ok(bytes)
		}
		_ => Err(Error::Malformed("expected an 8-byte encoding".into())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn enc_i64(v: i64) -> Vec<u8> {
		let mut buf = Vec::new();
		put_i64(&mut buf, v);
		buf
	}

	fn enc_f64(v: f64) -> Vec<u8> {
		let mut buf = Vec::new();
		put_f64(&mut buf, v).unwrap();
		buf
	}

	#[test]
	fn bool_round_trip() {
		for v in [false, true] {
			let mut buf = Vec::new();
			put_bool(&mut buf, v);
			assert_eq!(decode_bool(&buf).unwrap(), v);
		}
		assert!(decode_bool(&[2]).is_err());
		assert!(decode_bool(&[]).is_err());
	}

	#[test]
	fn u64_round_trip_and_order() {
		let seq = [0u64, 1, 255, 256, 1 << 32, u64::MAX - 1, u64::MAX];
		for w in seq.windows(2) {
			let mut a = Vec::new();
			let mut b = Vec::new();
			put_u64(&mut a, w[0]);
			put_u64(&mut b, w[1]);
			assert!(a < b);
			assert_eq!(decode_u64(&a).unwrap(), w[0]);
		}
	}

	#[test]
	fn i64_round_trip() {
		for v in [i64::MIN, -1000, -1, 0, 1, 1000, i64::MAX] {
			assert_eq!(decode_i64(&enc_i64(v)).unwrap(), v);
		}
	}

	#[test]
	fn i64_order_over_a_monotone_sequence() {
		for i in -1000i64..999 {
			assert!(enc_i64(i) < enc_i64(i + 1), "ordering broken at {i}");
		}
		assert!(enc_i64(i64::MIN) < enc_i64(-1000));
		assert!(enc_i64(1000) < enc_i64(i64::MAX));
	}

	#[test]
	fn f64_round_trip() {
		for v in [
			f64::NEG_INFINITY,
			f64::MIN,
			-3.14,
			-f64::MIN_POSITIVE,
			-0.0,
			0.0,
			f64::MIN_POSITIVE,
			3.14,
			f64::MAX,
			f64::INFINITY,
		] {
			assert_eq!(decode_f64(&enc_f64(v)).unwrap(), v);
		}
	}

	#[test]
	fn f64_order_over_a_monotone_sequence() {
		let seq = [
			f64::NEG_INFINITY,
			f64::MIN,
			-1000.0,
			-1.5,
			-f64::MIN_POSITIVE,
			0.0,
			f64::MIN_POSITIVE,
			1.5,
			1000.0,
			f64::MAX,
			f64::INFINITY,
		];
		for w in seq.windows(2) {
			assert!(enc_f64(w[0]) < enc_f64(w[1]), "ordering broken at {}", w[0]);
		}
		for i in -1000i64..999 {
			assert!(enc_f64(i as f64) < enc_f64((i + 1) as f64));
		}
	}

	#[test]
	fn random_pairs_order_like_their_encodings() {
		use rand::Rng;
		let mut rng = rand::thread_rng();
		for _ in 0..1000 {
			let (a, b): (i64, i64) = (rng.gen(), rng.gen());
			assert_eq!(a.cmp(&b), enc_i64(a).cmp(&enc_i64(b)));
			let (a, b): (f64, f64) = (rng.gen(), rng.gen());
			assert_eq!(
				a.partial_cmp(&b),
				Some(enc_f64(a).cmp(&enc_f64(b))),
				"order mismatch for {a} vs {b}"
			);
		}
	}

	#[test]
	fn f64_rejects_nan() {
		let mut buf = Vec::new();
		assert!(matches!(put_f64(&mut buf, f64::NAN), Err(Error::Malformed(_))));
		assert!(buf.is_empty());
	}

	#[test]
	fn lex64_round_trip() {
		for data in [&b""[..], b"a", b"ab", b"abc", b"abcd", &[0x00, 0xff, 0x10]] {
			let mut buf = Vec::new();
			put_lex64(&mut buf, data);
			assert_eq!(decode_lex64(&buf).unwrap(), data);
		}
	}

	#[test]
	fn lex64_preserves_byte_order() {
		let inputs: Vec<&[u8]> = vec![
			b"", b"\x00", b"\x00\x00", b"\x01", b"a", b"ab", b"abc", b"abd", b"b", b"ba",
			&[0xfe], &[0xff], &[0xff, 0x00],
		];
		for a in &inputs {
			for b in &inputs {
				let mut ea = Vec::new();
				let mut eb = Vec::new();
				put_lex64(&mut ea, a);
				put_lex64(&mut eb, b);
				assert_eq!(a.cmp(b), ea.cmp(&eb), "order mismatch for {a:?} vs {b:?}");
			}
		}
	}

	#[test]
	fn lex64_rejects_foreign_characters() {
		// '+' belongs to the standard alphabet, not this one
		assert!(matches!(decode_lex64(b"+a"), Err(Error::Malformed(_))));
	}

	#[test]
	fn fixed_width_decoders_reject_short_input() {
		assert!(matches!(decode_u64(&[1, 2, 3]), Err(Error::Malformed(_))));
		assert!(matches!(decode_i64(&[]), Err(Error::Malformed(_))));
		assert!(matches!(decode_f64(&[0; 7]), Err(Error::Malformed(_))));
	}
}
