use bytes::Buf;
use bytes::Bytes;
use slatedb::config::PutOptions;
use slatedb::config::Ttl;
use slatedb::config::WriteOptions;

use crate::error::StorageError;
use crate::set::SetMemberKey;
use crate::storage::Storage;
use crate::string::meta::MetaKey;
use crate::string::meta::SetMetaValue;

impl Storage {
	pub(crate) async fn delete_set_members(&self, key: Bytes) -> Result<(), StorageError> {
		let Some(meta) = self.get_meta::<SetMetaValue>(&key).await? else {
			return Ok(());
		};

		let prefix = SetMemberKey::prefix(&key, meta.version);
		let range = prefix.clone()..;
		let mut stream = self.set_db.scan(range).await?;
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
			self.set_db.delete_with_options(k, &write_opts).await?;
		}
		Ok(())
	}

	pub async fn sadd(&self, key: Bytes, members: Vec<Bytes>) -> Result<u64, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;
		let meta_key = MetaKey::new(key.clone());
		let meta_encoded_key = meta_key.encode();

		let mut meta_val = match self.get_meta::<SetMetaValue>(&key).await? {
			Some(m) => m,
			None => SetMetaValue::new(self.version_generator.next(), 0),
		};

		let mut added_count = 0;
		let write_opts = WriteOptions {
			await_durable: false,
		};
		let put_opts = PutOptions::default();

		for member in members {
			let member_key = SetMemberKey::new(key.clone(), meta_val.version, member);
			let encoded_member_key = member_key.encode();

			if self.set_db.get(encoded_member_key.clone()).await?.is_none() {
				self.set_db
					.put_with_options(encoded_member_key, Bytes::new(), &put_opts, &write_opts)
					.await?;
				added_count += 1;
			}
		}

		if added_count > 0 {
			meta_val.count += added_count;

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

		self.note_slot_write(&key, crate::data_type::DataType::Set).await?;
		Ok(added_count)
	}

	pub async fn smembers(&self, key: Bytes) -> Result<Vec<Bytes>, StorageError> {
		let Some(meta) = self.get_meta::<SetMetaValue>(&key).await? else {
			return Ok(Vec::new());
		};

		let prefix = SetMemberKey::prefix(&key, meta.version);
		let range = prefix.clone()..;
		let mut stream = self.set_db.scan(range).await?;
		let mut members = Vec::new();

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
			let member_len = buf.get_u32() as usize;
			if buf.len() != member_len {
				continue;
			}

			members.push(Bytes::copy_from_slice(buf));
		}

		Ok(members)
	}

	pub async fn sismember(&self, key: Bytes, member: Bytes) -> Result<bool, StorageError> {
		let Some(meta) = self.get_meta::<SetMetaValue>(&key).await? else {
			return Ok(false);
		};

		let member_key = SetMemberKey::new(key, meta.version, member);
		Ok(self.set_db.get(member_key.encode()).await?.is_some())
	}

	pub async fn srem(&self, key: Bytes, members: Vec<Bytes>) -> Result<u64, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;
		let meta_key = MetaKey::new(key.clone());
		let meta_encoded_key = meta_key.encode();

		let mut meta_val = match self.get_meta::<SetMetaValue>(&key).await? {
			Some(val) => val,
			None => return Ok(0),
		};

		let mut removed_count = 0;
		let write_opts = WriteOptions {
			await_durable: false,
		};

		for member in members {
			let member_key = SetMemberKey::new(key.clone(), meta_val.version, member);
			let encoded_key = member_key.encode();

			if self.set_db.get(encoded_key.clone()).await?.is_some() {
				self.set_db
					.delete_with_options(encoded_key, &write_opts)
					.await?;
				removed_count += 1;
			}
		}

		if removed_count > 0 {
			if meta_val.count <= removed_count {
				self.meta_db
					.delete_with_options(meta_encoded_key, &write_opts)
					.await?;
			} else {
				meta_val.count -= removed_count;
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

		Ok(removed_count)
	}

	pub async fn scard(&self, key: Bytes) -> Result<u64, StorageError> {
		Ok(self
			.get_meta::<SetMetaValue>(&key)
			.await?
			.map(|m| m.count)
			.unwrap_or(0))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn get_storage() -> (Storage, std::path::PathBuf) {
		let timestamp = ulid::Ulid::new().to_string();
		let path = std::env::temp_dir().join(format!("corvid_test_set_{}", timestamp));
		std::fs::create_dir_all(&path).unwrap();
		let storage = Storage::open(&path, None).await.unwrap();
		(storage, path)
	}

	#[tokio::test]
	async fn test_sadd_smembers() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("myset");
		let m1 = Bytes::from("m1");
		let m2 = Bytes::from("m2");

		let added = storage.sadd(key.clone(), vec![m1.clone()]).await.unwrap();
		assert_eq!(added, 1);

		let added = storage
			.sadd(key.clone(), vec![m1.clone(), m2.clone()])
			.await
			.unwrap();
		assert_eq!(added, 1);

		let members = storage.smembers(key.clone()).await.unwrap();
		assert_eq!(members.len(), 2);
		assert!(members.contains(&m1));
		assert!(members.contains(&m2));

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_sismember() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("myset");
		let m1 = Bytes::from("m1");

		storage.sadd(key.clone(), vec![m1.clone()]).await.unwrap();

		assert!(storage.sismember(key.clone(), m1.clone()).await.unwrap());
		assert!(
			!storage
				.sismember(key.clone(), Bytes::from("missing"))
				.await
				.unwrap()
		);

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_srem() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("myset");
		let m1 = Bytes::from("m1");
		let m2 = Bytes::from("m2");

		storage
			.sadd(key.clone(), vec![m1.clone(), m2.clone()])
			.await
			.unwrap();

		let removed = storage.srem(key.clone(), vec![m1.clone()]).await.unwrap();
		assert_eq!(removed, 1);

		let members = storage.smembers(key.clone()).await.unwrap();
		assert_eq!(members.len(), 1);
		assert!(members.contains(&m2));

		let removed = storage.srem(key.clone(), vec![m2.clone()]).await.unwrap();
		assert_eq!(removed, 1);
		assert!(!storage.exists(key.clone()).await.unwrap());

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_scard() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("myset");
		let m1 = Bytes::from("m1");

		assert_eq!(storage.scard(key.clone()).await.unwrap(), 0);

		storage.sadd(key.clone(), vec![m1.clone()]).await.unwrap();
		assert_eq!(storage.scard(key.clone()).await.unwrap(), 1);

		let _ = std::fs::remove_dir_all(path);
	}
}
