use bytes::Bytes;
use futures::future;
use log::warn;
use slatedb::config::PutOptions;
use slatedb::config::Ttl;
use slatedb::config::WriteOptions;

use crate::error::StorageError;
use crate::list::ListElementKey;
use crate::storage::Storage;
use crate::string::meta::ListMetaValue;
use crate::string::meta::MetaKey;

impl Storage {
	/// Delete every element of `key`'s list. Used when overwriting a list
	/// with a different type; the compaction filter reclaims anything
	/// left behind once the meta version moves on.
	pub(crate) async fn delete_list_elements(
		&self,
		key: Bytes,
		meta_val: &ListMetaValue,
	) -> Result<(), StorageError> {
		let prefix = ListElementKey::prefix(&key, meta_val.version);
		let range = prefix.clone()..;
		let mut stream = self.list_db.scan(range).await?;
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
			self.list_db.delete_with_options(k, &write_opts).await?;
		}
		Ok(())
	}

	pub async fn lpush(&self, key: Bytes, elements: Vec<Bytes>) -> Result<u64, StorageError> {
		self.list_push(key, elements, true).await
	}

	pub async fn rpush(&self, key: Bytes, elements: Vec<Bytes>) -> Result<u64, StorageError> {
		self.list_push(key, elements, false).await
	}

	async fn list_push(
		&self,
		key: Bytes,
		elements: Vec<Bytes>,
		is_left: bool,
	) -> Result<u64, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;

		if elements.is_empty() {
			if let Some(meta) = self.get_meta::<ListMetaValue>(&key).await? {
				return Ok(meta.count);
			} else {
				return Ok(0);
			}
		}

		let meta_key = MetaKey::new(key.clone());
		let meta_encoded_key = meta_key.encode();

		let mut meta_val = match self.get_meta::<ListMetaValue>(&key).await? {
			Some(m) => m,
			None => ListMetaValue::new(self.version_generator.next(), 0),
		};

		let write_opts = WriteOptions {
			await_durable: false,
		};
		let put_opts = PutOptions::default();

		for element in elements {
			let seq = if is_left {
				meta_val.head -= 1;
				meta_val.head
			} else {
				let s = meta_val.tail;
				meta_val.tail += 1;
				s
			};

			let element_key = ListElementKey::new(key.clone(), meta_val.version, seq);
			self.list_db
				.put_with_options(element_key.encode(), element, &put_opts, &write_opts)
				.await?;
			meta_val.count += 1;
		}

		let ttl = meta_val
			.remaining_ttl()
			.map(|d| d.as_millis() as u64)
			.map(Ttl::ExpireAfter)
			.unwrap_or(Ttl::NoExpiry);

		let meta_put_opts = PutOptions { ttl };

		self.meta_db
			.put_with_options(
				meta_encoded_key,
				meta_val.encode(),
				&meta_put_opts,
				&write_opts,
			)
			.await?;

		self.note_slot_write(&key, crate::data_type::DataType::List).await?;
		Ok(meta_val.count)
	}

	pub async fn lpop(&self, key: Bytes, count: Option<usize>) -> Result<Vec<Bytes>, StorageError> {
		self.list_pop(key, count, true).await
	}

	pub async fn rpop(&self, key: Bytes, count: Option<usize>) -> Result<Vec<Bytes>, StorageError> {
		self.list_pop(key, count, false).await
	}

	async fn list_pop(
		&self,
		key: Bytes,
		count: Option<usize>,
		is_left: bool,
	) -> Result<Vec<Bytes>, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;

		let Some(mut meta_val) = self.get_meta::<ListMetaValue>(&key).await? else {
			return Ok(Vec::new());
		};

		let num = count.unwrap_or(1);
		if num == 0 {
			return Ok(Vec::new());
		}

		let mut results = Vec::with_capacity(num);
		let write_opts = WriteOptions {
			await_durable: false,
		};

		let loop_count = std::cmp::min(num as u64, meta_val.count);

		for _ in 0..loop_count {
			let seq = if is_left {
				meta_val.head
			} else {
				meta_val.tail - 1
			};

			let element_key = ListElementKey::new(key.clone(), meta_val.version, seq);
			if let Some(val) = self.list_db.get(element_key.encode()).await? {
				results.push(val);

				if is_left {
					meta_val.head += 1;
				} else {
					meta_val.tail -= 1;
				}
				meta_val.count -= 1;

				self.list_db
					.delete_with_options(element_key.encode(), &write_opts)
					.await?;
			}
		}

		let meta_key = MetaKey::new(key.clone());

		if meta_val.count == 0 {
			self.meta_db
				.delete_with_options(meta_key.encode(), &write_opts)
				.await?;
		} else {
			let ttl = meta_val
				.remaining_ttl()
				.map(|d| d.as_millis() as u64)
				.map(Ttl::ExpireAfter)
				.unwrap_or(Ttl::NoExpiry);

			let meta_put_opts = PutOptions { ttl };

			self.meta_db
				.put_with_options(
					meta_key.encode(),
					meta_val.encode(),
					&meta_put_opts,
					&write_opts,
				)
				.await?;
		}

		Ok(results)
	}

	pub async fn llen(&self, key: Bytes) -> Result<u64, StorageError> {
		if let Some(meta_val) = self.get_meta::<ListMetaValue>(&key).await? {
			Ok(meta_val.count)
		} else {
			Ok(0)
		}
	}

	pub async fn lrange(&self, key: Bytes, start: i64, stop: i64) -> Result<Vec<Bytes>, StorageError> {
		let Some(meta_val) = self.get_meta::<ListMetaValue>(&key).await? else {
			return Ok(Vec::new());
		};

		if meta_val.count == 0 {
			return Ok(Vec::new());
		}

		let len = meta_val.count as i64;
		let start_idx = if start < 0 { len + start } else { start };
		let stop_idx = if stop < 0 { len + stop } else { stop };

		let start_idx = std::cmp::max(0, start_idx);
		let stop_idx = std::cmp::min(len - 1, stop_idx);

		if start_idx > stop_idx {
			return Ok(Vec::new());
		}

		let count = (stop_idx - start_idx + 1) as usize;
		let mut results = Vec::with_capacity(count);

		let start_seq = meta_val.head + start_idx;
		let stop_seq = meta_val.head + stop_idx;

		let futures: Vec<_> = (start_seq..=stop_seq)
			.map(|seq| {
				let element_key = ListElementKey::new(key.clone(), meta_val.version, seq);
				async move { self.list_db.get(element_key.encode()).await }
			})
			.collect();

		let found_results = future::try_join_all(futures).await?;

		for res in found_results {
			if let Some(val) = res {
				results.push(val);
			} else {
				warn!(
					"List element missing for key {:?} at sequence. Potential data inconsistency.",
					key
				);
			}
		}

		Ok(results)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn get_storage() -> (Storage, std::path::PathBuf) {
		let timestamp = ulid::Ulid::new().to_string();
		let path = std::env::temp_dir().join(format!("corvid_test_list_{}", timestamp));
		std::fs::create_dir_all(&path).unwrap();
		let storage = Storage::open(&path, None).await.unwrap();
		(storage, path)
	}

	#[tokio::test]
	async fn test_lpush_lpop() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("mylist");

		let len = storage
			.lpush(key.clone(), vec![Bytes::from("v1"), Bytes::from("v2")])
			.await
			.unwrap();
		assert_eq!(len, 2);

		let popped = storage.lpop(key.clone(), None).await.unwrap();
		assert_eq!(popped.len(), 1);
		assert_eq!(popped[0], Bytes::from("v2"));

		let popped = storage.lpop(key.clone(), None).await.unwrap();
		assert_eq!(popped[0], Bytes::from("v1"));

		let len = storage.llen(key.clone()).await.unwrap();
		assert_eq!(len, 0);

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_rpush_rpop() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("mylist_r");

		let len = storage
			.rpush(key.clone(), vec![Bytes::from("v1"), Bytes::from("v2")])
			.await
			.unwrap();
		assert_eq!(len, 2);

		let popped = storage.rpop(key.clone(), None).await.unwrap();
		assert_eq!(popped[0], Bytes::from("v2"));

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_lrange() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("mylist_range");

		storage
			.rpush(
				key.clone(),
				vec![Bytes::from("1"), Bytes::from("2"), Bytes::from("3")],
			)
			.await
			.unwrap();

		let all = storage.lrange(key.clone(), 0, -1).await.unwrap();
		assert_eq!(all.len(), 3);
		assert_eq!(all[0], Bytes::from("1"));
		assert_eq!(all[2], Bytes::from("3"));

		let part = storage.lrange(key.clone(), 0, 1).await.unwrap();
		assert_eq!(part.len(), 2);
		assert_eq!(part[1], Bytes::from("2"));

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_pop_more_than_present() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("mylist_pop_excess");

		storage
			.rpush(key.clone(), vec![Bytes::from("a"), Bytes::from("b")])
			.await
			.unwrap();

		let popped = storage.lpop(key.clone(), Some(10)).await.unwrap();
		assert_eq!(popped, vec![Bytes::from("a"), Bytes::from("b")]);
		assert!(!storage.exists(key.clone()).await.unwrap());

		let _ = std::fs::remove_dir_all(path);
	}
}
