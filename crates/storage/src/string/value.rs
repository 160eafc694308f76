use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::data_type::DataType;
use crate::error::DecoderError;
use crate::expirable::Expirable;

/// High bit of a stored timestamp: set means the timestamp is already in
/// milliseconds, clear means it is a legacy seconds value that must be
/// converted to ms on every read.
const UNIT_MS_BIT: u64 = 1 << 63;

/// High bit of `reserve[0]`: set means the value is a HyperLogLog register
/// set rather than an ordinary string.
const HLL_BIT: u8 = 0x80;

const RESERVE_LEN: usize = 16;
const FIXED_SUFFIX_LEN: usize = 1 + RESERVE_LEN + 8 + 8;

/// The on-disk suffix for a `string`-typed user key: `[type][value][reserve:16][ctime:8][etime:8]`.
///
/// This struct is both the meta *and* data value for string keys; there is
/// no separate data CF entry for a scalar string.
#[derive(Debug, PartialEq, Clone)]
pub struct StringValue {
	pub reserve: [u8; RESERVE_LEN],
	pub ctime: u64,
	/// Raw stored expiration; 0 means no expiration. Use [`Expirable::expire_time`]
	/// for the normalized milliseconds value.
	pub etime: u64,
	pub value: Bytes,
}

impl StringValue {
	pub fn new(value: impl Into<Bytes>) -> Self {
		Self {
			reserve: [0u8; RESERVE_LEN],
			ctime: 0,
			etime: 0,
			value: value.into(),
		}
	}

	pub fn new_with_ttl(value: impl Into<Bytes>, etime_ms: u64) -> Self {
		let mut v = Self::new(value);
		v.set_expire_time(etime_ms);
		v
	}

	pub fn is_hyperloglog(&self) -> bool {
		self.reserve[0] & HLL_BIT != 0
	}

	pub fn set_hyperloglog(&mut self, is_hll: bool) {
		if is_hll {
			self.reserve[0] |= HLL_BIT;
		} else {
			self.reserve[0] &= !HLL_BIT;
		}
	}

	pub fn encode(&self) -> Bytes {
		let mut bytes = BytesMut::with_capacity(1 + self.value.len() + FIXED_SUFFIX_LEN - 1);
		bytes.put_u8(DataType::String as u8);
		bytes.extend_from_slice(&self.value);
		bytes.extend_from_slice(&self.reserve);
		bytes.put_u64(self.ctime);
		bytes.put_u64(self.etime);
		bytes.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		if bytes.is_empty() {
			return Err(DecoderError::Empty);
		}
		if bytes.len() < FIXED_SUFFIX_LEN {
			return Err(DecoderError::InvalidLength);
		}
		let mut buf = bytes;
		if buf.get_u8() != DataType::String as u8 {
			return Err(DecoderError::InvalidType);
		}
		let value_len = buf.len() - (FIXED_SUFFIX_LEN - 1);
		let value = Bytes::copy_from_slice(&buf[..value_len]);
		buf.advance(value_len);

		let mut reserve = [0u8; RESERVE_LEN];
		reserve.copy_from_slice(&buf[..RESERVE_LEN]);
		buf.advance(RESERVE_LEN);

		let ctime = buf.get_u64();
		let etime = buf.get_u64();

		Ok(Self {
			reserve,
			ctime,
			etime,
			value,
		})
	}
}

impl Expirable for StringValue {
	fn expire_time(&self) -> u64 {
		if self.etime == 0 {
			return 0;
		}
		if self.etime & UNIT_MS_BIT != 0 {
			self.etime & !UNIT_MS_BIT
		} else {
			self.etime.saturating_mul(1000)
		}
	}

	fn set_expire_time(&mut self, timestamp: u64) {
		self.etime = if timestamp == 0 {
			0
		} else {
			timestamp | UNIT_MS_BIT
		};
	}
}

impl From<Bytes> for StringValue {
	fn from(value: Bytes) -> Self {
		Self::new(value)
	}
}

impl From<&str> for StringValue {
	fn from(value: &str) -> Self {
		Self::new(Bytes::copy_from_slice(value.as_bytes()))
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("hello world", 0)]
	#[case("", 1000)]
	#[case("test value", 123456789)]
	fn test_roundtrip(#[case] input: &str, #[case] etime_ms: u64) {
		let original = StringValue::new_with_ttl(Bytes::copy_from_slice(input.as_bytes()), etime_ms);
		let encoded = original.encode();
		assert_eq!(encoded[0], DataType::String as u8);
		let decoded = StringValue::decode(&encoded).unwrap();
		assert_eq!(original, decoded);
		assert_eq!(decoded.expire_time(), etime_ms);
	}

	#[test]
	fn test_decode_invalid_type() {
		let mut buf = BytesMut::new();
		buf.put_u8(DataType::Hash as u8);
		buf.extend_from_slice(&[0u8; FIXED_SUFFIX_LEN - 1]);
		let err = StringValue::decode(&buf.freeze()).unwrap_err();
		assert!(matches!(err, DecoderError::InvalidType));
	}

	#[test]
	fn test_decode_errors() {
		let err = StringValue::decode(b"").unwrap_err();
		assert!(matches!(err, DecoderError::Empty));

		let buf = [DataType::String as u8, 1, 2, 3];
		let err = StringValue::decode(&buf).unwrap_err();
		assert!(matches!(err, DecoderError::InvalidLength));
	}

	#[test]
	fn test_legacy_seconds_converted_on_read() {
		let mut v = StringValue::new("x");
		v.etime = 5; // legacy: seconds, unit bit clear
		assert_eq!(v.expire_time(), 5000);
	}

	#[test]
	fn test_hyperloglog_bit_is_only_difference() {
		let mut plain = StringValue::new_with_ttl(Bytes::from_static(b"abc"), 42);
		plain.ctime = 7;
		let mut hll = plain.clone();
		hll.set_hyperloglog(true);

		let plain_enc = plain.encode();
		let hll_enc = hll.encode();
		assert_eq!(plain_enc.len(), hll_enc.len());
		let mut diff_positions = Vec::new();
		for i in 0..plain_enc.len() {
			if plain_enc[i] != hll_enc[i] {
				diff_positions.push(i);
			}
		}
		// Only the reserve[0] byte differs, and only in its high bit.
		assert_eq!(diff_positions.len(), 1);
		let pos = diff_positions[0];
		assert_eq!(plain_enc[pos] ^ hll_enc[pos], HLL_BIT);
	}
}
