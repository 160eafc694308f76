use bytes::Bytes;

use crate::data_type::DataType;
use crate::error::StorageError;
use crate::expirable::Expirable;
use crate::storage::Storage;
use crate::string::meta::HashMetaValue;
use crate::string::meta::ListMetaValue;
use crate::string::meta::MetaKey;
use crate::string::meta::SetMetaValue;
use crate::string::meta::ZSetMetaValue;
use crate::string::value::StringValue;

impl Storage {
	/// Clean up collection data left behind when `user_key` is about to be
	/// overwritten with a different logical type, or deleted outright.
	pub(crate) async fn cleanup_collection_type(
		&self,
		user_key: Bytes,
		data_type: DataType,
		meta: &[u8],
	) -> Result<(), StorageError> {
		match data_type {
			DataType::Hash => self.delete_hash_fields(user_key).await,
			DataType::List => {
				let meta_val = ListMetaValue::decode(meta)?;
				self.delete_list_elements(user_key, &meta_val).await
			}
			DataType::Set => self.delete_set_members(user_key).await,
			DataType::ZSet => self.delete_zset_content(user_key).await,
			DataType::String => Ok(()),
		}
	}

	pub async fn get(&self, key: Bytes) -> Result<Option<Bytes>, StorageError> {
		let meta_key = MetaKey::new(key.clone());
		let Some(bytes) = self.meta_db.get(meta_key.encode()).await? else {
			return Ok(None);
		};
		if bytes.is_empty() {
			return Ok(None);
		}

		match DataType::from_u8(bytes[0]) {
			Some(DataType::String) => {
				let string_val = StringValue::decode(&bytes)?;
				if string_val.is_expired() {
					self.del(key).await?;
					return Ok(None);
				}
				Ok(Some(string_val.value))
			}
			Some(actual) => Err(StorageError::wrong_type(DataType::String, actual)),
			None => Err(StorageError::Corruption("unrecognized type tag".into())),
		}
	}

	pub async fn set(&self, key: Bytes, value: Bytes) -> Result<(), StorageError> {
		let _guard = self.lock_manager.lock(&key).await;
		let user_key = key.clone();
		let meta_key = MetaKey::new(key);
		let meta_encoded_key = meta_key.encode();

		let existing = self.meta_db.get(meta_encoded_key.clone()).await?;
		if let Some(meta) = existing
			&& let Some(dt) = meta.first().and_then(|&b| DataType::from_u8(b))
		{
			self.cleanup_collection_type(user_key.clone(), dt, &meta).await?;
		}

		let value = StringValue::new(value);
		self.meta_db.put(meta_encoded_key, value.encode()).await?;
		self.note_slot_write(&user_key, DataType::String).await?;
		Ok(())
	}

	pub async fn del(&self, key: Bytes) -> Result<bool, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;
		let user_key = key.clone();
		let meta_key = MetaKey::new(key);
		let meta_encoded_key = meta_key.encode();

		let Some(meta) = self.meta_db.get(meta_encoded_key.clone()).await? else {
			return Ok(false);
		};

		if let Some(dt) = meta.first().and_then(|&b| DataType::from_u8(b)) {
			self.cleanup_collection_type(user_key.clone(), dt, &meta).await?;
		}

		self.meta_db.delete(meta_encoded_key).await?;
		self.note_slot_delete(&user_key).await?;
		Ok(true)
	}

	pub async fn expire(&self, key: Bytes, expire_time_ms: u64) -> Result<bool, StorageError> {
		let meta_key = MetaKey::new(key.clone());
		let encoded_key = meta_key.encode();

		let Some(bytes) = self.meta_db.get(encoded_key.clone()).await? else {
			return Ok(false);
		};
		if bytes.is_empty() {
			return Ok(false);
		}

		let encoded_val = match DataType::from_u8(bytes[0]) {
			Some(DataType::String) => {
				let mut val = StringValue::decode(&bytes)?;
				val.expire_at(expire_time_ms);
				val.encode()
			}
			Some(DataType::Hash) => {
				let mut val = HashMetaValue::decode(&bytes)?;
				val.expire_at(expire_time_ms);
				val.encode()
			}
			Some(DataType::List) => {
				let mut val = ListMetaValue::decode(&bytes)?;
				val.expire_at(expire_time_ms);
				val.encode()
			}
			Some(DataType::Set) => {
				let mut val = SetMetaValue::decode(&bytes)?;
				val.expire_at(expire_time_ms);
				val.encode()
			}
			Some(DataType::ZSet) => {
				let mut val = ZSetMetaValue::decode(&bytes)?;
				val.expire_at(expire_time_ms);
				val.encode()
			}
			None => return Ok(false),
		};

		let now = chrono::Utc::now().timestamp_millis() as u64;
		if expire_time_ms > 0 && expire_time_ms <= now {
			self.del(key).await?;
			return Ok(true);
		}

		self.meta_db.put(encoded_key, encoded_val).await?;
		Ok(true)
	}

	pub async fn ttl(&self, key: Bytes) -> Result<Option<i64>, StorageError> {
		let meta_key = MetaKey::new(key);
		let encoded_key = meta_key.encode();

		let Some(bytes) = self.meta_db.get(encoded_key).await? else {
			return Ok(None);
		};
		if bytes.is_empty() {
			return Ok(None);
		}

		let remaining = match DataType::from_u8(bytes[0]) {
			Some(DataType::String) => StringValue::decode(&bytes)?.remaining_ttl(),
			Some(DataType::Hash) => HashMetaValue::decode(&bytes)?.remaining_ttl(),
			Some(DataType::List) => ListMetaValue::decode(&bytes)?.remaining_ttl(),
			Some(DataType::Set) => SetMetaValue::decode(&bytes)?.remaining_ttl(),
			Some(DataType::ZSet) => ZSetMetaValue::decode(&bytes)?.remaining_ttl(),
			None => return Ok(None),
		};

		match remaining {
			Some(duration) => Ok(Some(duration.as_millis() as i64)),
			None => Ok(Some(-1)),
		}
	}

	pub async fn exists(&self, key: Bytes) -> Result<bool, StorageError> {
		let user_key = key.clone();
		let meta_key = MetaKey::new(key);
		let encoded_key = meta_key.encode();

		let Some(bytes) = self.meta_db.get(encoded_key).await? else {
			return Ok(false);
		};
		if bytes.is_empty() {
			return Ok(false);
		}

		let is_expired = match DataType::from_u8(bytes[0]) {
			Some(DataType::String) => StringValue::decode(&bytes)?.is_expired(),
			Some(DataType::Hash) => HashMetaValue::decode(&bytes)?.is_expired(),
			Some(DataType::List) => ListMetaValue::decode(&bytes)?.is_expired(),
			Some(DataType::Set) => SetMetaValue::decode(&bytes)?.is_expired(),
			Some(DataType::ZSet) => ZSetMetaValue::decode(&bytes)?.is_expired(),
			None => return Ok(false),
		};

		if is_expired {
			self.del(user_key).await?;
			Ok(false)
		} else {
			Ok(true)
		}
	}

	pub async fn incr(&self, key: Bytes) -> Result<i64, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;
		let current_val = self.get(key.clone()).await?;

		let mut int_val: i64 = match current_val {
			Some(bytes) => {
				let s = std::str::from_utf8(&bytes)?;
				s.parse::<i64>().map_err(|_| StorageError::NotAnInteger)?
			}
			None => 0,
		};

		int_val += 1;
		self.set(key, Bytes::from(int_val.to_string())).await?;
		Ok(int_val)
	}

	pub async fn decr(&self, key: Bytes) -> Result<i64, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;
		let current_val = self.get(key.clone()).await?;

		let mut int_val: i64 = match current_val {
			Some(bytes) => {
				let s = std::str::from_utf8(&bytes)?;
				s.parse::<i64>().map_err(|_| StorageError::NotAnInteger)?
			}
			None => 0,
		};

		int_val -= 1;
		self.set(key, Bytes::from(int_val.to_string())).await?;
		Ok(int_val)
	}

	pub async fn append(&self, key: Bytes, suffix: Bytes) -> Result<usize, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;
		let current_val = self.get(key.clone()).await?;

		let mut buf = match current_val {
			Some(bytes) => bytes.to_vec(),
			None => Vec::new(),
		};
		buf.extend_from_slice(&suffix);
		let len = buf.len();
		self.set(key, Bytes::from(buf)).await?;
		Ok(len)
	}
}

#[cfg(test)]
mod tests {
	use rstest::rstest;

	use super::*;

	async fn get_storage() -> (Storage, std::path::PathBuf) {
		let timestamp = ulid::Ulid::new().to_string();
		let path = std::env::temp_dir().join(format!("corvid_test_{}", timestamp));
		std::fs::create_dir_all(&path).unwrap();
		let storage = Storage::open(&path, None).await.unwrap();
		(storage, path)
	}

	#[rstest]
	#[case("key1", "value1")]
	#[case("empty_val", "")]
	#[case("unicode_key_🔑", "unicode_val_🚀")]
	#[case("special_!@#", "value_!@#")]
	#[tokio::test]
	async fn test_storage_string_roundtrip(#[case] key: &str, #[case] value: &str) {
		let (storage, path) = get_storage().await;

		storage
			.set(Bytes::from(key.to_string()), Bytes::from(value.to_string()))
			.await
			.unwrap();
		let result = storage.get(Bytes::from(key.to_string())).await.unwrap();
		assert_eq!(result, Some(Bytes::copy_from_slice(value.as_bytes())));

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_storage_string_missing() {
		let (storage, path) = get_storage().await;

		let missing = storage.get(Bytes::from("missing")).await.unwrap();
		assert_eq!(missing, None);

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_storage_string_overwrite() {
		let (storage, path) = get_storage().await;

		storage
			.set(Bytes::from("key_overwrite"), Bytes::from("val1"))
			.await
			.unwrap();
		storage
			.set(Bytes::from("key_overwrite"), Bytes::from("val2"))
			.await
			.unwrap();
		let result = storage.get(Bytes::from("key_overwrite")).await.unwrap();
		assert_eq!(result, Some(Bytes::from("val2")));

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_collision_string_hash() {
		let (storage, path) = get_storage().await;
		let k = Bytes::from("k");
		let v = Bytes::from("v");
		let f = Bytes::from("f");

		storage.set(k.clone(), v.clone()).await.unwrap();

		let err = storage
			.hset(k.clone(), f.clone(), v.clone())
			.await
			.unwrap_err();
		assert!(matches!(err, StorageError::WrongType { .. }));

		let err = storage.hget(k.clone(), f.clone()).await.unwrap_err();
		assert!(matches!(err, StorageError::WrongType { .. }));

		let deleted = storage.del(k.clone()).await.unwrap();
		assert!(deleted);

		let res = storage.hset(k.clone(), f.clone(), v.clone()).await.unwrap();
		assert_eq!(res, 1);

		storage.set(k.clone(), Bytes::from("v2")).await.unwrap();

		let val = storage.get(k.clone()).await.unwrap();
		assert_eq!(val, Some(Bytes::from("v2")));

		let err = storage.hget(k.clone(), f.clone()).await.unwrap_err();
		assert!(matches!(err, StorageError::WrongType { .. }));

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_incr() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("counter");

		assert_eq!(storage.incr(key.clone()).await.unwrap(), 1);
		assert_eq!(storage.incr(key.clone()).await.unwrap(), 2);

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_decr() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("counter");

		assert_eq!(storage.decr(key.clone()).await.unwrap(), -1);
		assert_eq!(storage.decr(key.clone()).await.unwrap(), -2);

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_append() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("greeting");

		assert_eq!(storage.append(key.clone(), Bytes::from("Hello ")).await.unwrap(), 6);
		assert_eq!(storage.append(key.clone(), Bytes::from("World")).await.unwrap(), 11);
		assert_eq!(storage.get(key.clone()).await.unwrap(), Some(Bytes::from("Hello World")));

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_expire_and_ttl() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("expiring");

		storage.set(key.clone(), Bytes::from("v")).await.unwrap();
		assert_eq!(storage.ttl(key.clone()).await.unwrap(), Some(-1));

		let future = (chrono::Utc::now().timestamp_millis() + 100_000) as u64;
		assert!(storage.expire(key.clone(), future).await.unwrap());
		assert!(storage.ttl(key.clone()).await.unwrap().unwrap() > 0);
		assert!(storage.exists(key.clone()).await.unwrap());

		let _ = std::fs::remove_dir_all(path);
	}
}
