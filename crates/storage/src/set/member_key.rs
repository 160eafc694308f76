use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

#[derive(Debug, PartialEq)]
pub struct SetMemberKey {
	user_key: Bytes,
	version: u64,
	member: Bytes,
}

impl SetMemberKey {
	pub fn new(user_key: impl Into<Bytes>, version: u64, member: impl Into<Bytes>) -> Self {
		Self {
			user_key: user_key.into(),
			version,
			member: member.into(),
		}
	}

	pub fn encode(&self) -> Bytes {
		// Key format: len(user_key) (u16 BE) + user_key + version (u64 BE) + len(member) (u32 BE) + member
		let member_len = self.member.len() as u32;

		let mut bytes =
			BytesMut::with_capacity(2 + self.user_key.len() + 8 + 4 + self.member.len());
		bytes.put_u16(self.user_key.len() as u16);
		bytes.extend_from_slice(&self.user_key);
		bytes.put_u64(self.version);
		bytes.put_u32(member_len);
		bytes.extend_from_slice(&self.member);
		bytes.freeze()
	}

	/// Prefix shared by every member key of `user_key` at `version`.
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
	#[case("user", 1, "member", b"\x00\x04user\x00\x00\x00\x00\x00\x00\x00\x01\x00\x00\x00\x06member")]
	#[case("key", 0, "m", b"\x00\x03key\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x01m")]
	fn test_set_member_key_encode(
		#[case] key: &str,
		#[case] version: u64,
		#[case] member: &str,
		#[case] expected: &[u8],
	) {
		let member_key = SetMemberKey::new(
			Bytes::copy_from_slice(key.as_bytes()),
			version,
			Bytes::copy_from_slice(member.as_bytes()),
		);
		assert_eq!(&member_key.encode()[..], expected);
	}
}
