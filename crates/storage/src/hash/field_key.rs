use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

#[derive(Debug, PartialEq)]
pub struct HashFieldKey {
	user_key: Bytes,
	version: u64,
	field: Bytes,
}

impl HashFieldKey {
	pub fn new(user_key: impl Into<Bytes>, version: u64, field: impl Into<Bytes>) -> Self {
		Self {
			user_key: user_key.into(),
			version,
			field: field.into(),
		}
	}

	pub fn encode(&self) -> Bytes {
		// Key format: len(user_key) (u16 BE) + user_key + version (u64 BE) + len(field) (u32 BE) + field
		let field_len = self.field.len() as u32;

		let mut bytes =
			BytesMut::with_capacity(2 + self.user_key.len() + 8 + 4 + self.field.len());
		bytes.put_u16(self.user_key.len() as u16);
		bytes.extend_from_slice(&self.user_key);
		bytes.put_u64(self.version);
		bytes.put_u32(field_len);
		bytes.extend_from_slice(&self.field);
		bytes.freeze()
	}

	/// Prefix shared by every field key of `user_key` at `version`, used to
	/// scan all fields of a hash without knowing them ahead of time.
	pub fn prefix(user_key: &[u8], version: u64) -> Bytes {
		let mut bytes = BytesMut::with_capacity(2 + user_key.len() + 8);
		bytes.put_u16(user_key.len() as u16);
		bytes.extend_from_slice(user_key);
		bytes.put_u64(version);
		bytes.freeze()
	}
}
