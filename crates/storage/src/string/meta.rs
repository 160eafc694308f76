use bytes::Buf;
use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::data_type::DataType;
use crate::error::DecoderError;
use crate::expirable::Expirable;
use crate::string::value::StringValue;

const COMPOSITE_HEADER_LEN: usize = 1 + 8 + 8 + 8;

/// Key into the meta column family: the raw user key, unprefixed. A user key
/// appears at most once here regardless of its logical type.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaKey {
	user_key: Bytes,
}

impl MetaKey {
	pub fn new(user_key: impl Into<Bytes>) -> Self {
		Self {
			user_key: user_key.into(),
		}
	}

	pub fn encode(&self) -> Bytes {
		self.user_key.clone()
	}
}

/// Common shape of a composite-type meta header: a version stamp used to
/// invalidate orphaned sub-keys left behind by deletes and overwrites, plus
/// an element count and a TTL.
pub trait CompositeMeta: Sized {
	fn data_type() -> DataType;
	fn version(&self) -> u64;
	fn count(&self) -> u64;
	fn encode(&self) -> Bytes;
	fn decode(bytes: &[u8]) -> Result<Self, DecoderError>;
}

/// Meta header for a `hash` key: `[type][version:8][count:8][ttl:8]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashMetaValue {
	pub version: u64,
	pub count: u64,
	pub ttl: u64,
}

impl HashMetaValue {
	pub fn new(version: u64, count: u64) -> Self {
		Self {
			version,
			count,
			ttl: 0,
		}
	}

	pub fn data_type(&self) -> DataType {
		DataType::Hash
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = BytesMut::with_capacity(COMPOSITE_HEADER_LEN);
		buf.put_u8(DataType::Hash as u8);
		buf.put_u64(self.version);
		buf.put_u64(self.count);
		buf.put_u64(self.ttl);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		if bytes.is_empty() {
			return Err(DecoderError::Empty);
		}
		if bytes.len() < COMPOSITE_HEADER_LEN {
			return Err(DecoderError::InvalidLength);
		}
		let mut buf = bytes;
		if buf.get_u8() != DataType::Hash as u8 {
			return Err(DecoderError::InvalidType);
		}
		Ok(Self {
			version: buf.get_u64(),
			count: buf.get_u64(),
			ttl: buf.get_u64(),
		})
	}
}

impl Expirable for HashMetaValue {
	fn expire_time(&self) -> u64 {
		self.ttl
	}

	fn set_expire_time(&mut self, timestamp: u64) {
		self.ttl = timestamp;
	}
}

impl CompositeMeta for HashMetaValue {
	fn data_type() -> DataType {
		DataType::Hash
	}

	fn version(&self) -> u64 {
		self.version
	}

	fn count(&self) -> u64 {
		self.count
	}

	fn encode(&self) -> Bytes {
		HashMetaValue::encode(self)
	}

	fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		HashMetaValue::decode(bytes)
	}
}

/// Meta header for a `set` key: `[type][version:8][count:8][ttl:8]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetMetaValue {
	pub version: u64,
	pub count: u64,
	pub ttl: u64,
}

impl SetMetaValue {
	pub fn new(version: u64, count: u64) -> Self {
		Self {
			version,
			count,
			ttl: 0,
		}
	}

	pub fn data_type(&self) -> DataType {
		DataType::Set
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = BytesMut::with_capacity(COMPOSITE_HEADER_LEN);
		buf.put_u8(DataType::Set as u8);
		buf.put_u64(self.version);
		buf.put_u64(self.count);
		buf.put_u64(self.ttl);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		if bytes.is_empty() {
			return Err(DecoderError::Empty);
		}
		if bytes.len() < COMPOSITE_HEADER_LEN {
			return Err(DecoderError::InvalidLength);
		}
		let mut buf = bytes;
		if buf.get_u8() != DataType::Set as u8 {
			return Err(DecoderError::InvalidType);
		}
		Ok(Self {
			version: buf.get_u64(),
			count: buf.get_u64(),
			ttl: buf.get_u64(),
		})
	}
}

impl Expirable for SetMetaValue {
	fn expire_time(&self) -> u64 {
		self.ttl
	}

	fn set_expire_time(&mut self, timestamp: u64) {
		self.ttl = timestamp;
	}
}

impl CompositeMeta for SetMetaValue {
	fn data_type() -> DataType {
		DataType::Set
	}

	fn version(&self) -> u64 {
		self.version
	}

	fn count(&self) -> u64 {
		self.count
	}

	fn encode(&self) -> Bytes {
		SetMetaValue::encode(self)
	}

	fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		SetMetaValue::decode(bytes)
	}
}

/// Meta header for a `zset` key: `[type][version:8][count:8][ttl:8]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZSetMetaValue {
	pub version: u64,
	pub count: u64,
	pub ttl: u64,
}

impl ZSetMetaValue {
	pub fn new(version: u64, count: u64) -> Self {
		Self {
			version,
			count,
			ttl: 0,
		}
	}

	pub fn data_type(&self) -> DataType {
		DataType::ZSet
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = BytesMut::with_capacity(COMPOSITE_HEADER_LEN);
		buf.put_u8(DataType::ZSet as u8);
		buf.put_u64(self.version);
		buf.put_u64(self.count);
		buf.put_u64(self.ttl);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		if bytes.is_empty() {
			return Err(DecoderError::Empty);
		}
		if bytes.len() < COMPOSITE_HEADER_LEN {
			return Err(DecoderError::InvalidLength);
		}
		let mut buf = bytes;
		if buf.get_u8() != DataType::ZSet as u8 {
			return Err(DecoderError::InvalidType);
		}
		Ok(Self {
			version: buf.get_u64(),
			count: buf.get_u64(),
			ttl: buf.get_u64(),
		})
	}
}

impl Expirable for ZSetMetaValue {
	fn expire_time(&self) -> u64 {
		self.ttl
	}

	fn set_expire_time(&mut self, timestamp: u64) {
		self.ttl = timestamp;
	}
}

impl CompositeMeta for ZSetMetaValue {
	fn data_type() -> DataType {
		DataType::ZSet
	}

	fn version(&self) -> u64 {
		self.version
	}

	fn count(&self) -> u64 {
		self.count
	}

	fn encode(&self) -> Bytes {
		ZSetMetaValue::encode(self)
	}

	fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		ZSetMetaValue::decode(bytes)
	}
}

/// Meta header for a `list` key: `[type][head:8][tail:8][version:8][count:8][ttl:8]`.
///
/// `head`/`tail` bound the open interval of currently-valid element
/// sequence numbers; they start at the midpoint of the `i64` range so a
/// list can grow from either end without special-casing the first push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMetaValue {
	pub head: i64,
	pub tail: i64,
	pub version: u64,
	pub count: u64,
	pub ttl: u64,
}

impl ListMetaValue {
	pub fn new(version: u64, count: u64) -> Self {
		let mid = i64::MAX / 2;
		Self {
			head: mid,
			tail: mid,
			version,
			count,
			ttl: 0,
		}
	}

	pub fn data_type(&self) -> DataType {
		DataType::List
	}

	pub fn encode(&self) -> Bytes {
		let mut buf = BytesMut::with_capacity(1 + 8 * 5);
		buf.put_u8(DataType::List as u8);
		buf.put_i64(self.head);
		buf.put_i64(self.tail);
		buf.put_u64(self.version);
		buf.put_u64(self.count);
		buf.put_u64(self.ttl);
		buf.freeze()
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		if bytes.is_empty() {
			return Err(DecoderError::Empty);
		}
		if bytes.len() < 1 + 8 * 5 {
			return Err(DecoderError::InvalidLength);
		}
		let mut buf = bytes;
		if buf.get_u8() != DataType::List as u8 {
			return Err(DecoderError::InvalidType);
		}
		Ok(Self {
			head: buf.get_i64(),
			tail: buf.get_i64(),
			version: buf.get_u64(),
			count: buf.get_u64(),
			ttl: buf.get_u64(),
		})
	}
}

impl Expirable for ListMetaValue {
	fn expire_time(&self) -> u64 {
		self.ttl
	}

	fn set_expire_time(&mut self, timestamp: u64) {
		self.ttl = timestamp;
	}
}

impl CompositeMeta for ListMetaValue {
	fn data_type() -> DataType {
		DataType::List
	}

	fn version(&self) -> u64 {
		self.version
	}

	fn count(&self) -> u64 {
		self.count
	}

	fn encode(&self) -> Bytes {
		ListMetaValue::encode(self)
	}

	fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		ListMetaValue::decode(bytes)
	}
}

/// Any value that can live in the meta column family: either the full
/// string envelope (string keys have no separate data entries) or one of
/// the composite meta headers.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyValue {
	String(StringValue),
	Hash(HashMetaValue),
	List(ListMetaValue),
	Set(SetMetaValue),
	ZSet(ZSetMetaValue),
}

impl AnyValue {
	pub fn data_type(&self) -> DataType {
		match self {
			AnyValue::String(_) => DataType::String,
			AnyValue::Hash(_) => DataType::Hash,
			AnyValue::List(_) => DataType::List,
			AnyValue::Set(_) => DataType::Set,
			AnyValue::ZSet(_) => DataType::ZSet,
		}
	}

	/// The meta version stamped on composite types; `None` for plain
	/// strings, which have no sub-keys to version against.
	pub fn version(&self) -> Option<u64> {
		match self {
			AnyValue::String(_) => None,
			AnyValue::Hash(m) => Some(m.version),
			AnyValue::List(m) => Some(m.version),
			AnyValue::Set(m) => Some(m.version),
			AnyValue::ZSet(m) => Some(m.version),
		}
	}

	/// The element count stamped on composite types; `None` for plain
	/// strings, which carry no count.
	pub fn count(&self) -> Option<u64> {
		match self {
			AnyValue::String(_) => None,
			AnyValue::Hash(m) => Some(m.count),
			AnyValue::List(m) => Some(m.count),
			AnyValue::Set(m) => Some(m.count),
			AnyValue::ZSet(m) => Some(m.count),
		}
	}

	pub fn is_expired(&self) -> bool {
		match self {
			AnyValue::String(v) => v.is_expired(),
			AnyValue::Hash(v) => v.is_expired(),
			AnyValue::List(v) => v.is_expired(),
			AnyValue::Set(v) => v.is_expired(),
			AnyValue::ZSet(v) => v.is_expired(),
		}
	}

	pub fn encode(&self) -> Bytes {
		match self {
			AnyValue::String(v) => v.encode(),
			AnyValue::Hash(v) => v.encode(),
			AnyValue::List(v) => v.encode(),
			AnyValue::Set(v) => v.encode(),
			AnyValue::ZSet(v) => v.encode(),
		}
	}

	pub fn decode(bytes: &[u8]) -> Result<Self, DecoderError> {
		let tag = *bytes.first().ok_or(DecoderError::Empty)?;
		match DataType::from_u8(tag).ok_or(DecoderError::InvalidType)? {
			DataType::String => Ok(AnyValue::String(StringValue::decode(bytes)?)),
			DataType::Hash => Ok(AnyValue::Hash(HashMetaValue::decode(bytes)?)),
			DataType::List => Ok(AnyValue::List(ListMetaValue::decode(bytes)?)),
			DataType::Set => Ok(AnyValue::Set(SetMetaValue::decode(bytes)?)),
			DataType::ZSet => Ok(AnyValue::ZSet(ZSetMetaValue::decode(bytes)?)),
		}
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("mykey", b"mykey")]
	#[case("", b"")]
	fn test_meta_key_encode(#[case] key: &str, #[case] expected: &[u8]) {
		let meta_key = MetaKey::new(Bytes::copy_from_slice(key.as_bytes()));
		assert_eq!(&meta_key.encode()[..], expected);
	}

	#[test]
	fn test_hash_meta_value_roundtrip() {
		let mut val = HashMetaValue::new(10, 5);
		val.ttl = 9999;
		let decoded = HashMetaValue::decode(&val.encode()).unwrap();
		assert_eq!(decoded, val);
	}

	#[test]
	fn test_set_meta_constructor_order_is_version_then_count() {
		let meta = SetMetaValue::new(42, 3);
		assert_eq!(meta.version, 42);
		assert_eq!(meta.count, 3);
	}

	#[test]
	fn test_list_meta_roundtrip() {
		let meta = ListMetaValue::new(3, 2);
		let decoded = ListMetaValue::decode(&meta.encode()).unwrap();
		assert_eq!(meta, decoded);
	}

	#[test]
	fn test_any_value_dispatch() {
		let hash_meta = HashMetaValue::new(10, 5);
		let any = AnyValue::decode(&hash_meta.encode()).unwrap();
		assert_eq!(any.data_type(), DataType::Hash);
		assert_eq!(any.version(), Some(10));

		let str_val = StringValue::new("hi");
		let any = AnyValue::decode(&str_val.encode()).unwrap();
		assert_eq!(any.data_type(), DataType::String);
		assert_eq!(any.version(), None);
	}
}
