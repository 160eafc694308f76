//! Hash-slot partitioning of the user keyspace and the advisory per-slot
//! membership index that drives migration.
//!
//! The slot of a key is `CRC32(tag(key)) & (HASH_SLOTS_SIZE - 1)`, using the
//! reflected IEEE-802.3 polynomial that `crc32fast` computes. `tag(key)` is
//! the substring between the first `{` and the next `}` when both exist and
//! the substring is non-empty; otherwise it is the whole key. Keys sharing a
//! tag always land in the same slot.

use bytes::Bytes;

use crate::data_type::DataType;
use crate::error::StorageError;
use crate::storage::Storage;

pub const HASH_SLOTS_SIZE: u16 = 1024;
const SLOT_KEY_PREFIX: &[u8] = b"_internal:slotkey:4migrate:";

/// Extracts the hash-tag portion of `key`, per Redis's `{tag}` convention.
pub fn hash_tag(key: &[u8]) -> &[u8] {
	let Some(open) = key.iter().position(|&b| b == b'{') else {
		return key;
	};
	let Some(close_rel) = key[open + 1..].iter().position(|&b| b == b'}') else {
		return key;
	};
	if close_rel == 0 {
		return key;
	}
	&key[open + 1..open + 1 + close_rel]
}

/// Computes the hash slot for a user key.
pub fn key_hash_slot(key: &[u8]) -> u16 {
	let tag = hash_tag(key);
	let crc = crc32fast::hash(tag);
	(crc & (HASH_SLOTS_SIZE as u32 - 1)) as u16
}

pub fn slot_index_key(slot: u16) -> Bytes {
	let mut buf = Vec::with_capacity(SLOT_KEY_PREFIX.len() + 4);
	buf.extend_from_slice(SLOT_KEY_PREFIX);
	buf.extend_from_slice(slot.to_string().as_bytes());
	Bytes::from(buf)
}

/// `<type-char><user-key>` member stored in a slot's index set.
fn slot_member(type_char: u8, key: &Bytes) -> Bytes {
	let mut buf = Vec::with_capacity(1 + key.len());
	buf.push(type_char);
	buf.extend_from_slice(key);
	Bytes::from(buf)
}

pub fn type_char(data_type: DataType) -> u8 {
	match data_type {
		DataType::String => b's',
		DataType::Hash => b'h',
		DataType::Set => b'S',
		DataType::List => b'l',
		DataType::ZSet => b'z',
	}
}

impl Storage {
	/// Enable or disable slot-index maintenance. Absence of slot-migrate
	/// mode makes `note_slot_write`/`note_slot_delete` no-ops.
	pub fn set_slotmigrate(&self, enabled: bool) {
		self.slotmigrate_enabled
			.store(enabled, std::sync::atomic::Ordering::Relaxed);
	}

	pub fn slotmigrate_enabled(&self) -> bool {
		self.slotmigrate_enabled.load(std::sync::atomic::Ordering::Relaxed)
	}

	/// Adds `key` to its slot's index set. No-op unless slot-migrate mode is
	/// enabled.
	pub async fn note_slot_write(&self, key: &Bytes, data_type: DataType) -> Result<(), StorageError> {
		if !self.slotmigrate_enabled() || key.starts_with(SLOT_KEY_PREFIX) {
			return Ok(());
		}
		let slot = key_hash_slot(key);
		let member = slot_member(type_char(data_type), key);
		self.sadd(slot_index_key(slot), vec![member]).await?;
		Ok(())
	}

	/// Removes `key` from its slot's index set, trying every type tag since
	/// the caller may not know which one was current. No-op unless
	/// slot-migrate mode is enabled.
	pub async fn note_slot_delete(&self, key: &Bytes) -> Result<(), StorageError> {
		if !self.slotmigrate_enabled() || key.starts_with(SLOT_KEY_PREFIX) {
			return Ok(());
		}
		let slot = key_hash_slot(key);
		let index_key = slot_index_key(slot);
		for dt in [DataType::String, DataType::Hash, DataType::Set, DataType::List, DataType::ZSet] {
			let member = slot_member(type_char(dt), key);
			self.srem(index_key.clone(), vec![member]).await?;
		}
		Ok(())
	}

	/// `[(slot, cardinality)]` for every non-empty slot.
	pub async fn slots_info(&self) -> Result<Vec<(u16, u64)>, StorageError> {
		let mut out = Vec::new();
		for slot in 0..HASH_SLOTS_SIZE {
			let card = self.scard(slot_index_key(slot)).await?;
			if card > 0 {
				out.push((slot, card));
			}
		}
		Ok(out)
	}

	pub fn slots_hashkey(&self, keys: &[Bytes]) -> Vec<u16> {
		keys.iter().map(|k| key_hash_slot(k)).collect()
	}

	/// Deletes every slot's index set, returning how many actually existed.
	pub async fn slots_del(&self, slots: &[u16]) -> Result<u64, StorageError> {
		let mut deleted = 0;
		for &slot in slots {
			if self.del(slot_index_key(slot)).await? {
				deleted += 1;
			}
		}
		Ok(deleted)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_tag_extraction() {
		assert_eq!(hash_tag(b"{u1}foo"), b"u1");
		assert_eq!(hash_tag(b"{u1}bar"), b"u1");
		assert_eq!(hash_tag(b"plain"), b"plain");
		assert_eq!(hash_tag(b"{}empty"), b"{}empty");
		assert_eq!(hash_tag(b"no-close{tag"), b"no-close{tag");
	}

	#[test]
	fn test_tagged_keys_share_a_slot() {
		assert_eq!(key_hash_slot(b"{u1}foo"), key_hash_slot(b"{u1}bar"));
	}

	#[test]
	fn test_slot_is_in_range() {
		for key in [&b"a"[..], b"hello", b"{tag}x", b""] {
			assert!(key_hash_slot(key) < HASH_SLOTS_SIZE);
		}
	}

	#[tokio::test]
	async fn test_slot_index_add_remove_roundtrip() {
		let path = std::env::temp_dir().join(format!("corvid_test_slot_{}", ulid::Ulid::new()));
		std::fs::create_dir_all(&path).unwrap();
		let storage = Storage::open(&path, None).await.unwrap();
		storage.set_slotmigrate(true);

		let key = Bytes::from("k");
		let slot = key_hash_slot(&key);

		storage.note_slot_write(&key, DataType::String).await.unwrap();
		assert_eq!(storage.scard(slot_index_key(slot)).await.unwrap(), 1);

		storage.note_slot_delete(&key).await.unwrap();
		assert_eq!(storage.scard(slot_index_key(slot)).await.unwrap(), 0);

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_disabled_slotmigrate_is_a_noop() {
		let path = std::env::temp_dir().join(format!("corvid_test_slot_{}", ulid::Ulid::new()));
		std::fs::create_dir_all(&path).unwrap();
		let storage = Storage::open(&path, None).await.unwrap();

		let key = Bytes::from("k");
		storage.note_slot_write(&key, DataType::String).await.unwrap();
		let slot = key_hash_slot(&key);
		assert_eq!(storage.scard(slot_index_key(slot)).await.unwrap(), 0);

		let _ = std::fs::remove_dir_all(path);
	}
}
