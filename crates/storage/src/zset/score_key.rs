use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

#[derive(Debug, PartialEq)]
pub struct ScoreKey {
	user_key: Bytes,
	version: u64,
	score: f64,
	member: Bytes,
}

impl ScoreKey {
	pub fn new(user_key: impl Into<Bytes>, version: u64, score: f64, member: impl Into<Bytes>) -> Self {
		Self {
			user_key: user_key.into(),
			version,
			score,
			member: member.into(),
		}
	}

	/// Sortable encoding of a raw score, shared between the `ScoreKey` suffix
	/// and the score cached in [`crate::zset::MemberKey`]'s value.
	///
	/// IEEE 754 floats don't sort correctly when compared byte-wise, especially
	/// across the sign boundary. Flip the sign bit for non-negative scores and
	/// flip every bit for negative ones, which maps the whole range onto an
	/// unsigned order that matches numeric order:
	///   negative scores -> 0x0000... .. 0x7fff... (ascending)
	///   non-negative scores -> 0x8000... .. 0xffff... (ascending)
	pub fn encode_score(score: f64) -> u64 {
		let bits = score.to_bits();
		if score >= 0.0 {
			bits | 0x8000_0000_0000_0000
		} else {
			!bits
		}
	}

	pub fn encode(&self) -> Bytes {
		// Key format: len(user_key) (u16 BE) + user_key + version (u64 BE) + b'S' +
		// score (u64 BE, sortable encoding) + member
		let encoded_score = Self::encode_score(self.score);

		let mut bytes =
			BytesMut::with_capacity(2 + self.user_key.len() + 8 + 1 + 8 + self.member.len());
		bytes.put_u16(self.user_key.len() as u16);
		bytes.extend_from_slice(&self.user_key);
		bytes.put_u64(self.version);
		bytes.put_u8(b'S');
		bytes.put_u64(encoded_score);
		bytes.extend_from_slice(&self.member);
		bytes.freeze()
	}

	/// Prefix shared by every score key of `user_key` at `version`, the base
	/// for a full-range forward scan over the sorted set.
	pub fn prefix(user_key: &[u8], version: u64) -> Bytes {
		let mut bytes = BytesMut::with_capacity(2 + user_key.len() + 8 + 1);
		bytes.put_u16(user_key.len() as u16);
		bytes.extend_from_slice(user_key);
		bytes.put_u64(version);
		bytes.put_u8(b'S');
		bytes.freeze()
	}

	pub fn decode_score(encoded: u64) -> f64 {
		let bits = if (encoded & 0x8000_0000_0000_0000) != 0 {
			encoded & !0x8000_0000_0000_0000
		} else {
			!encoded
		};
		f64::from_bits(bits)
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	#[rstest]
	#[case(0.0)]
	#[case(-0.0)]
	#[case(1.5)]
	#[case(-1.5)]
	#[case(f64::MAX)]
	#[case(f64::MIN)]
	fn test_score_roundtrip(#[case] score: f64) {
		let key = ScoreKey::new(Bytes::from_static(b"k"), 1, score, Bytes::from_static(b"m"));
		let encoded = key.encode();
		let encoded_score = u64::from_be_bytes(encoded[12..20].try_into().unwrap());
		assert_eq!(ScoreKey::decode_score(encoded_score), score);
	}

	#[test]
	fn test_ordering_matches_numeric_order() {
		let scores = [-10.0, -1.0, -0.5, 0.0, 0.5, 1.0, 10.0];
		let mut encoded: Vec<Bytes> = scores
			.iter()
			.map(|&s| ScoreKey::new(Bytes::from_static(b"k"), 1, s, Bytes::from_static(b"m")).encode())
			.collect();
		let mut sorted = encoded.clone();
		sorted.sort();
		encoded.sort();
		assert_eq!(encoded, sorted);
		for w in encoded.windows(2) {
			assert!(w[0] <= w[1]);
		}
	}

	#[test]
	fn test_prefix_is_encode_minus_score_and_member() {
		let key = ScoreKey::new(Bytes::from_static(b"k"), 1, 5.0, Bytes::from_static(b"m"));
		let prefix = ScoreKey::prefix(b"k", 1);
		assert!(key.encode().starts_with(&prefix));
	}
}
