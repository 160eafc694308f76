use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

#[derive(Debug, PartialEq)]
pub struct ListElementKey {
	user_key: Bytes,
	version: u64,
	seq: i64,
}

impl ListElementKey {
	pub fn new(user_key: impl Into<Bytes>, version: u64, seq: i64) -> Self {
		Self {
			user_key: user_key.into(),
			version,
			seq,
		}
	}

	pub fn encode(&self) -> Bytes {
		// Key format: len(user_key) (u16 BE) + user_key + version (u64 BE) + seq (i64 BE)
		let mut bytes = BytesMut::with_capacity(2 + self.user_key.len() + 8 + 8);
		bytes.put_u16(self.user_key.len() as u16);
		bytes.extend_from_slice(&self.user_key);
		bytes.put_u64(self.version);
		bytes.put_i64(self.seq);
		bytes.freeze()
	}

	/// Prefix shared by every element key of `user_key` at `version`.
	pub fn prefix(user_key: &[u8], version: u64) -> Bytes {
		let mut bytes = BytesMut::with_capacity(2 + user_key.len() + 8);
		bytes.put_u16(user_key.len() as u16);
		bytes.extend_from_slice(user_key);
		bytes.put_u64(version);
		bytes.freeze()
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case("mykey", 1, 1, b"\x00\x05mykey\x00\x00\x00\x00\x00\x00\x00\x01\x00\x00\x00\x00\x00\x00\x00\x01")]
	#[case("key", 0, 255, b"\x00\x03key\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\xff")]
	fn test_list_element_key_encode(
		#[case] key: &str,
		#[case] version: u64,
		#[case] seq: i64,
		#[case] expected: &[u8],
	) {
		let element_key = ListElementKey::new(Bytes::copy_from_slice(key.as_bytes()), version, seq);
		assert_eq!(&element_key.encode()[..], expected);
	}

	#[test]
	fn test_prefix_is_encode_minus_seq() {
		let key = ListElementKey::new(Bytes::from_static(b"mykey"), 3, 10);
		let prefix = ListElementKey::prefix(b"mykey", 3);
		assert!(key.encode().starts_with(&prefix));
	}
}
