use bytes::Buf;
use bytes::Bytes;
use futures::future;
use slatedb::config::PutOptions;
use slatedb::config::Ttl;
use slatedb::config::WriteOptions;

use crate::error::StorageError;
use crate::expirable::Expirable;
use crate::hash::HashFieldKey;
use crate::storage::Storage;
use crate::string::meta::HashMetaValue;
use crate::string::meta::MetaKey;

impl Storage {
	/// Delete every field of `key`'s hash. Used when overwriting a hash with
	/// a different type, or deleting it outright; the compaction filter
	/// reclaims anything this misses once the meta version moves on.
	pub(crate) async fn delete_hash_fields(&self, key: Bytes) -> Result<(), StorageError> {
		let Some(meta) = self.get_meta::<HashMetaValue>(&key).await? else {
			return Ok(());
		};

		let prefix = HashFieldKey::prefix(&key, meta.version);
		let range = prefix.clone()..;
		let mut stream = self.hash_db.scan(range).await?;
		let mut keys_to_delete = Vec::new();

		while let Some(kv) = stream.next().await? {
			if !kv.key.starts_with(&prefix) {
				break;
			}
			keys_to_delete.push(kv.key);
		}

		let write_opts = WriteOptions {
			await_durable: false,
		};
		for k in keys_to_delete {
			self.hash_db.delete_with_options(k, &write_opts).await?;
		}
		Ok(())
	}

	pub async fn hset(&self, key: Bytes, field: Bytes, value: Bytes) -> Result<i64, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;
		let meta_key = MetaKey::new(key.clone());
		let meta_encoded_key = meta_key.encode();

		let mut meta_val = match self.get_meta::<HashMetaValue>(&key).await? {
			Some(m) => m,
			None => HashMetaValue::new(self.version_generator.next(), 0),
		};

		let field_key = HashFieldKey::new(key.clone(), meta_val.version, field);
		let encoded_field_key = field_key.encode();
		let is_new_field = self.hash_db.get(encoded_field_key.clone()).await?.is_none();

		let write_opts = WriteOptions {
			await_durable: false,
		};
		let put_opts = PutOptions::default();
		self.hash_db
			.put_with_options(encoded_field_key, value, &put_opts, &write_opts)
			.await?;

		if is_new_field {
			meta_val.count += 1;
			let ttl = meta_val
				.remaining_ttl()
				.map(|d| d.as_millis() as u64)
				.map(Ttl::ExpireAfter)
				.unwrap_or(Ttl::NoExpiry);
			let put_opts = PutOptions { ttl };
			self.meta_db
				.put_with_options(meta_encoded_key, meta_val.encode(), &put_opts, &write_opts)
				.await?;
			self.note_slot_write(&key, crate::data_type::DataType::Hash).await?;
			Ok(1)
		} else {
			self.note_slot_write(&key, crate::data_type::DataType::Hash).await?;
			Ok(0)
		}
	}

	pub async fn hget(&self, key: Bytes, field: Bytes) -> Result<Option<Bytes>, StorageError> {
		let Some(meta) = self.get_meta::<HashMetaValue>(&key).await? else {
			return Ok(None);
		};
		let field_key = HashFieldKey::new(key, meta.version, field);
		Ok(self.hash_db.get(field_key.encode()).await?)
	}

	pub async fn hlen(&self, key: Bytes) -> Result<u64, StorageError> {
		Ok(self
			.get_meta::<HashMetaValue>(&key)
			.await?
			.map(|m| m.count)
			.unwrap_or(0))
	}

	pub async fn hmget(&self, key: Bytes, fields: &[Bytes]) -> Result<Vec<Option<Bytes>>, StorageError> {
		let Some(meta) = self.get_meta::<HashMetaValue>(&key).await? else {
			return Ok(vec![None; fields.len()]);
		};

		let futures: Vec<_> = fields
			.iter()
			.map(|field| {
				let field_key = HashFieldKey::new(key.clone(), meta.version, field.clone());
				async move { self.hash_db.get(field_key.encode()).await }
			})
			.collect();

		Ok(future::try_join_all(futures).await?)
	}

	pub async fn hgetall(&self, key: Bytes) -> Result<Vec<(Bytes, Bytes)>, StorageError> {
		let Some(meta) = self.get_meta::<HashMetaValue>(&key).await? else {
			return Ok(Vec::new());
		};

		let prefix = HashFieldKey::prefix(&key, meta.version);
		let range = prefix.clone()..;
		let mut stream = self.hash_db.scan(range).await?;
		let mut results = Vec::new();

		while let Some(kv) = stream.next().await? {
			let k = kv.key;
			if !k.starts_with(&prefix) {
				break;
			}
			let suffix = &k[prefix.len()..];
			if suffix.len() < 4 {
				continue;
			}
			let mut buf = suffix;
			let field_len = buf.get_u32() as usize;
			if buf.len() != field_len {
				continue;
			}
			results.push((Bytes::copy_from_slice(buf), kv.value));
		}

		Ok(results)
	}

	pub async fn hdel(&self, key: Bytes, fields: &[Bytes]) -> Result<i64, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;
		let meta_key = MetaKey::new(key.clone());
		let meta_encoded_key = meta_key.encode();

		let mut meta_val = match self.get_meta::<HashMetaValue>(&key).await? {
			Some(m) => m,
			None => return Ok(0),
		};

		let mut deleted_count = 0;
		let write_opts = WriteOptions {
			await_durable: false,
		};

		for field in fields {
			let field_key = HashFieldKey::new(key.clone(), meta_val.version, field.clone());
			let encoded_field_key = field_key.encode();

			if self.hash_db.get(encoded_field_key.clone()).await?.is_some() {
				self.hash_db
					.delete_with_options(encoded_field_key, &write_opts)
					.await?;
				deleted_count += 1;
			}
		}

		if deleted_count > 0 {
			if meta_val.count <= deleted_count as u64 {
				self.meta_db
					.delete_with_options(meta_encoded_key, &write_opts)
					.await?;
			} else {
				meta_val.count -= deleted_count as u64;
				let ttl = meta_val
					.remaining_ttl()
					.map(|d| d.as_millis() as u64)
					.map(Ttl::ExpireAfter)
					.unwrap_or(Ttl::NoExpiry);
				let put_opts = PutOptions { ttl };
				self.meta_db
					.put_with_options(meta_encoded_key, meta_val.encode(), &put_opts, &write_opts)
					.await?;
			}
		}

		Ok(deleted_count)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn get_storage() -> (Storage, std::path::PathBuf) {
		let timestamp = ulid::Ulid::new().to_string();
		let path = std::env::temp_dir().join(format!("corvid_test_hash_{}", timestamp));
		std::fs::create_dir_all(&path).unwrap();
		let storage = Storage::open(&path, None).await.unwrap();
		(storage, path)
	}

	#[tokio::test]
	async fn test_hset_hget() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("myhash");
		let field = Bytes::from("f1");
		let val = Bytes::from("v1");

		let res = storage
			.hset(key.clone(), field.clone(), val.clone())
			.await
			.unwrap();
		assert_eq!(res, 1);

		let got = storage.hget(key.clone(), field.clone()).await.unwrap();
		assert_eq!(got, Some(val.clone()));

		let len = storage.hlen(key.clone()).await.unwrap();
		assert_eq!(len, 1);

		let val2 = Bytes::from("v2");
		let res = storage
			.hset(key.clone(), field.clone(), val2.clone())
			.await
			.unwrap();
		assert_eq!(res, 0);

		let got = storage.hget(key.clone(), field.clone()).await.unwrap();
		assert_eq!(got, Some(val2.clone()));

		let field2 = Bytes::from("f2");
		let val2_initial = Bytes::from("v2_initial");
		storage
			.hset(key.clone(), field2.clone(), val2_initial.clone())
			.await
			.unwrap();

		let results = storage
			.hmget(
				key.clone(),
				&[field.clone(), field2.clone(), Bytes::from("missing")],
			)
			.await
			.unwrap();
		assert_eq!(results.len(), 3);
		assert_eq!(results[0], Some(val2.clone()));
		assert_eq!(results[1], Some(val2_initial.clone()));
		assert_eq!(results[2], None);

		let all = storage.hgetall(key.clone()).await.unwrap();
		assert_eq!(all.len(), 2);
		let mut sorted = all;
		sorted.sort_by(|a, b| a.0.cmp(&b.0));
		assert_eq!(sorted[0], (field.clone(), val2));
		assert_eq!(sorted[1], (field2.clone(), val2_initial));

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_hdel() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("myhash_del");
		let f1 = Bytes::from("f1");
		let f2 = Bytes::from("f2");
		let v1 = Bytes::from("v1");
		let v2 = Bytes::from("v2");

		storage
			.hset(key.clone(), f1.clone(), v1.clone())
			.await
			.unwrap();
		storage
			.hset(key.clone(), f2.clone(), v2.clone())
			.await
			.unwrap();

		let count = storage.hdel(key.clone(), &[f1.clone()]).await.unwrap();
		assert_eq!(count, 1);

		let val1 = storage.hget(key.clone(), f1.clone()).await.unwrap();
		assert_eq!(val1, None);
		let val2 = storage.hget(key.clone(), f2.clone()).await.unwrap();
		assert_eq!(val2, Some(v2.clone()));
		let len = storage.hlen(key.clone()).await.unwrap();
		assert_eq!(len, 1);

		let count = storage
			.hdel(key.clone(), &[Bytes::from("missing")])
			.await
			.unwrap();
		assert_eq!(count, 0);

		let count = storage.hdel(key.clone(), &[f2.clone()]).await.unwrap();
		assert_eq!(count, 1);

		let len = storage.hlen(key.clone()).await.unwrap();
		assert_eq!(len, 0);

		let exists = storage.exists(key.clone()).await.unwrap();
		assert!(!exists);

		let _ = std::fs::remove_dir_all(path);
	}
}
