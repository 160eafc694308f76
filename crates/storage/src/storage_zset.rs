use bytes::Bytes;
use futures::future;
use slatedb::WriteBatch;
use slatedb::config::PutOptions;
use slatedb::config::Ttl;
use slatedb::config::WriteOptions;

use crate::error::StorageError;
use crate::storage::Storage;
use crate::string::meta::MetaKey;
use crate::string::meta::ZSetMetaValue;
use crate::zset::MemberKey;
use crate::zset::ScoreKey;

impl Storage {
	pub(crate) async fn delete_zset_content(&self, key: Bytes) -> Result<(), StorageError> {
		let Some(meta) = self.get_meta::<ZSetMetaValue>(&key).await? else {
			return Ok(());
		};

		let mut batch = WriteBatch::new();
		let write_opts = WriteOptions {
			await_durable: false,
		};

		for prefix in [
			MemberKey::prefix(&key, meta.version),
			ScoreKey::prefix(&key, meta.version),
		] {
			let range = prefix.clone()..;
			let mut stream = self.zset_db.scan(range).await?;
			while let Some(kv) = stream.next().await? {
				if !kv.key.starts_with(&prefix) {
					break;
				}
				batch.delete(kv.key);
			}
		}

		self.zset_db.write_with_options(batch, &write_opts).await?;
		Ok(())
	}

	pub async fn zadd(
		&self,
		key: Bytes,
		elements: Vec<(f64, Bytes)>,
	) -> Result<u64, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;
		let meta_key = MetaKey::new(key.clone());
		let meta_encoded_key = meta_key.encode();

		let mut meta_val = match self.get_meta::<ZSetMetaValue>(&key).await? {
			Some(m) => m,
			None => ZSetMetaValue::new(self.version_generator.next(), 0),
		};

		let mut member_encoded_keys = Vec::with_capacity(elements.len());
		let mut member_futs = Vec::with_capacity(elements.len());
		for (_, member) in &elements {
			let member_key = MemberKey::new(key.clone(), meta_val.version, member.clone());
			let enc = member_key.encode();
			member_encoded_keys.push(enc.clone());
			member_futs.push(self.zset_db.get(enc));
		}

		let old_values: Vec<_> = future::try_join_all(member_futs).await?;

		let mut added_count = 0;
		let write_opts = WriteOptions {
			await_durable: false,
		};
		let put_opts = PutOptions::default();

		let mut batch = WriteBatch::new();

		for (idx, (score, member)) in elements.into_iter().enumerate() {
			let encoded_member_key = &member_encoded_keys[idx];
			let old_score_bytes = &old_values[idx];

			if let Some(old_score_bytes) = old_score_bytes {
				let old_encoded_score = u64::from_be_bytes(old_score_bytes[..8].try_into()?);
				let old_score = ScoreKey::decode_score(old_encoded_score);
				if old_score != score {
					let old_score_key =
						ScoreKey::new(key.clone(), meta_val.version, old_score, member.clone());
					batch.delete(old_score_key.encode());

					let new_score_key =
						ScoreKey::new(key.clone(), meta_val.version, score, member.clone());
					batch.put_with_options(new_score_key.encode(), Bytes::new(), &put_opts);

					let encoded_score = ScoreKey::encode_score(score);
					batch.put_with_options(
						encoded_member_key.clone(),
						Bytes::copy_from_slice(&encoded_score.to_be_bytes()),
						&put_opts,
					);
				}
			} else {
				added_count += 1;

				let encoded_score = ScoreKey::encode_score(score);
				batch.put_with_options(
					encoded_member_key.clone(),
					Bytes::copy_from_slice(&encoded_score.to_be_bytes()),
					&put_opts,
				);

				let score_key = ScoreKey::new(key.clone(), meta_val.version, score, member);
				batch.put_with_options(score_key.encode(), Bytes::new(), &put_opts);
			}
		}
		self.zset_db.write_with_options(batch, &write_opts).await?;

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

		self.note_slot_write(&key, crate::data_type::DataType::ZSet).await?;
		Ok(added_count)
	}

	pub async fn zrange(
		&self,
		key: Bytes,
		start: isize,
		stop: isize,
		with_scores: bool,
	) -> Result<Vec<Bytes>, StorageError> {
		let Some(meta) = self.get_meta::<ZSetMetaValue>(&key).await? else {
			return Ok(Vec::new());
		};

		let len = meta.count as isize;
		let start = if start < 0 { len + start } else { start };
		let stop = if stop < 0 { len + stop } else { stop };

		if start < 0 || start >= len || start > stop {
			return Ok(Vec::new());
		}

		let prefix = ScoreKey::prefix(&key, meta.version);
		let range = prefix.clone()..;
		let mut stream = self.zset_db.scan(range).await?;

		let mut result = Vec::new();
		let mut current_idx = 0;
		let header_len = prefix.len() + 8;
		let score_offset = prefix.len();

		while let Some(kv) = stream.next().await? {
			let k = kv.key;
			if !k.starts_with(&prefix) {
				break;
			}

			if current_idx >= start && current_idx <= stop && k.len() > header_len {
				let member = k.slice(header_len..);
				result.push(member);
				if with_scores {
					let score_bytes: [u8; 8] = k[score_offset..score_offset + 8].try_into()?;
					let encoded_score = u64::from_be_bytes(score_bytes);
					let score = ScoreKey::decode_score(encoded_score);
					result.push(Bytes::copy_from_slice(score.to_string().as_bytes()));
				}
			}

			if current_idx > stop {
				break;
			}
			current_idx += 1;
		}
		Ok(result)
	}

	pub async fn zscore(&self, key: Bytes, member: Bytes) -> Result<Option<f64>, StorageError> {
		let Some(meta) = self.get_meta::<ZSetMetaValue>(&key).await? else {
			return Ok(None);
		};

		let member_key = MemberKey::new(key, meta.version, member);
		if let Some(val) = self.zset_db.get(member_key.encode()).await? {
			let encoded_score = u64::from_be_bytes(val[..8].try_into()?);
			Ok(Some(ScoreKey::decode_score(encoded_score)))
		} else {
			Ok(None)
		}
	}

	pub async fn zrem(&self, key: Bytes, members: Vec<Bytes>) -> Result<u64, StorageError> {
		let _guard = self.lock_manager.lock(&key).await;
		let meta_key = MetaKey::new(key.clone());
		let meta_encoded_key = meta_key.encode();

		let mut meta_val = match self.get_meta::<ZSetMetaValue>(&key).await? {
			Some(val) => val,
			None => return Ok(0),
		};

		let mut removed_count = 0;
		let write_opts = WriteOptions {
			await_durable: false,
		};

		let mut member_encoded_keys = Vec::with_capacity(members.len());
		for member in &members {
			let member_key = MemberKey::new(key.clone(), meta_val.version, member.clone());
			member_encoded_keys.push(member_key.encode());
		}

		let mut old_values = Vec::new();
		for encoded_key in &member_encoded_keys {
			old_values.push(self.zset_db.get(encoded_key.clone()).await?);
		}

		let mut batch = WriteBatch::new();

		for (idx, member) in members.into_iter().enumerate() {
			let encoded_member_key = &member_encoded_keys[idx];
			if let Some(val) = &old_values[idx] {
				batch.delete(encoded_member_key.clone());

				let encoded_score = u64::from_be_bytes(val[..8].try_into()?);
				let score = ScoreKey::decode_score(encoded_score);
				let score_key = ScoreKey::new(key.clone(), meta_val.version, score, member);
				batch.delete(score_key.encode());

				removed_count += 1;
			}
		}

		self.zset_db.write_with_options(batch, &write_opts).await?;

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

	pub async fn zcard(&self, key: Bytes) -> Result<u64, StorageError> {
		Ok(self
			.get_meta::<ZSetMetaValue>(&key)
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
		let path = std::env::temp_dir().join(format!("corvid_test_zset_{}", timestamp));
		std::fs::create_dir_all(&path).unwrap();
		let storage = Storage::open(&path, None).await.unwrap();
		(storage, path)
	}

	#[tokio::test]
	async fn test_zadd_zrange() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("myzset");

		let added = storage
			.zadd(
				key.clone(),
				vec![
					(1.0, Bytes::from("one")),
					(2.0, Bytes::from("two")),
					(3.0, Bytes::from("three")),
				],
			)
			.await
			.unwrap();
		assert_eq!(added, 3);

		let added = storage
			.zadd(key.clone(), vec![(5.0, Bytes::from("two"))])
			.await
			.unwrap();
		assert_eq!(added, 0);

		let members = storage.zrange(key.clone(), 0, -1, false).await.unwrap();
		assert_eq!(members.len(), 3);
		assert_eq!(members[0], Bytes::from("one"));
		assert_eq!(members[1], Bytes::from("three"));
		assert_eq!(members[2], Bytes::from("two"));

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_zscore() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("myzset");

		storage
			.zadd(key.clone(), vec![(1.5, Bytes::from("one"))])
			.await
			.unwrap();

		let score = storage
			.zscore(key.clone(), Bytes::from("one"))
			.await
			.unwrap();
		assert_eq!(score, Some(1.5));

		let score = storage
			.zscore(key.clone(), Bytes::from("missing"))
			.await
			.unwrap();
		assert_eq!(score, None);

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_zrem() {
		let (storage, path) = get_storage().await;
		let key = Bytes::from("myzset");

		storage
			.zadd(
				key.clone(),
				vec![(1.0, Bytes::from("one")), (2.0, Bytes::from("two"))],
			)
			.await
			.unwrap();

		let removed = storage
			.zrem(key.clone(), vec![Bytes::from("one")])
			.await
			.unwrap();
		assert_eq!(removed, 1);

		let members = storage.zrange(key.clone(), 0, -1, false).await.unwrap();
		assert_eq!(members.len(), 1);
		assert_eq!(members[0], Bytes::from("two"));

		let _ = std::fs::remove_dir_all(path);
	}

	#[tokio::test]
	async fn test_zset_collision_repro() {
		let (storage, path) = get_storage().await;
		let key1 = Bytes::from("user1");

		storage
			.zadd(key1.clone(), vec![(1.0, Bytes::from("m1"))])
			.await
			.unwrap();

		storage.flush_all().await.unwrap();

		storage
			.zadd(key1.clone(), vec![(1.0, Bytes::from("m1"))])
			.await
			.unwrap();

		let card = storage.zcard(key1.clone()).await.unwrap();
		assert_eq!(card, 1, "ZCard user1 should be 1");

		let members = storage.zrange(key1.clone(), 0, -1, false).await.unwrap();
		assert_eq!(members.len(), 1, "ZRange user1 should have 1 member");
		assert_eq!(members[0], Bytes::from("m1"));

		let _ = std::fs::remove_dir_all(path);
	}
}
