use std::sync::Arc;

use async_trait::async_trait;
use bytes::Buf;
use bytes::Bytes;
use log::debug;
use slatedb::CompactionFilter;
use slatedb::CompactionFilterDecision;
use slatedb::CompactionFilterError;
use slatedb::CompactionFilterSupplier;
use slatedb::CompactionJobContext;
use slatedb::Db;
use slatedb::RowEntry;
use slatedb::ValueDeletable;

use crate::data_type::DataType;
use crate::expirable::Expirable;
use crate::string::meta::AnyValue;
use crate::string::meta::MetaKey;

pub struct CorvidCompactionFilter {
	pub(crate) string_db: Option<Arc<Db>>,
	pub(crate) data_type: DataType,
}

impl CorvidCompactionFilter {
	fn decode_sub_key(key: &[u8]) -> Option<(Bytes, u64)> {
		if key.len() < 2 {
			return None;
		}
		let mut buf = key;
		let key_len = buf.get_u16() as usize;
		if buf.len() < key_len + 8 {
			return None;
		}
		let user_key = Bytes::copy_from_slice(&buf[..key_len]);
		buf.advance(key_len);
		let version = buf.get_u64();
		Some((user_key, version))
	}
}

#[async_trait]
impl CompactionFilter for CorvidCompactionFilter {
	async fn filter(
		&mut self,
		entry: &RowEntry,
	) -> Result<CompactionFilterDecision, CompactionFilterError> {
		// We only care about entries that are not already tombstones
		let bytes = match &entry.value {
			ValueDeletable::Value(bytes) | ValueDeletable::Merge(bytes) => bytes,
			ValueDeletable::Tombstone => return Ok(CompactionFilterDecision::Keep),
		};

		match self.data_type {
			DataType::String => {
				// Meta DB: entries are self-describing (string envelope or a
				// composite meta header); dispatch on the decoded type rather
				// than `self.data_type`, which only selects this branch.
				let any_val = match AnyValue::decode(bytes) {
					Ok(val) => val,
					Err(e) => {
						debug!(
							"[MetaFilter] failed to decode value for key {:?}: {:?}",
							entry.key, e
						);
						return Ok(CompactionFilterDecision::Keep);
					}
				};

				let Some(version) = any_val.version() else {
					// Plain string: no version/count to protect, just TTL.
					if any_val.is_expired() {
						debug!("[MetaFilter] Drop[Stale] key: {:?}", entry.key);
						return Ok(CompactionFilterDecision::Modify(ValueDeletable::Tombstone));
					}
					return Ok(CompactionFilterDecision::Keep);
				};

				// Composite meta header. `version` is seeded from a Unix
				// timestamp (seconds); never drop while it's still current or
				// in the future, protecting a ghost still in flight through the
				// data files.
				let now = chrono::Utc::now().timestamp() as u64;
				if version >= now {
					return Ok(CompactionFilterDecision::Keep);
				}

				let ttl_expired = any_val.is_expired();
				let empty = any_val.count() == Some(0);
				if ttl_expired || empty {
					debug!(
						"[MetaFilter] Drop[ttl_expired={} empty={}] key: {:?}, version: {}",
						ttl_expired, empty, entry.key, version
					);
					return Ok(CompactionFilterDecision::Modify(ValueDeletable::Tombstone));
				}
				Ok(CompactionFilterDecision::Keep)
			}
			_ => {
				// Collection DB: Check metadata in string_db
				let Some(string_db) = &self.string_db else {
					// Should not happen if configured correctly
					return Ok(CompactionFilterDecision::Keep);
				};

				// Decode sub-key to getKey and Version
				let Some((user_key, version)) = Self::decode_sub_key(&entry.key) else {
					// Invalid key format? Keep safe.
					debug!(
						"[{:?}Filter] Invalid key format: {:?}",
						self.data_type, entry.key
					);
					return Ok(CompactionFilterDecision::Keep);
				};

				// Lookup metadata
				let meta_key = MetaKey::new(user_key.clone());
				let meta_encoded = match string_db.get(meta_key.encode()).await {
					Ok(Some(v)) => v,
					Ok(None) => {
						// Metadata missing -> Orphaned sub-key -> Delete
						debug!(
							"[{:?}DataFilter] Drop[Meta key not exist] key: {:?}, version: {}",
							self.data_type, user_key, version
						);
						return Ok(CompactionFilterDecision::Modify(ValueDeletable::Tombstone));
					}
					Err(e) => {
						debug!(
							"[{:?}DataFilter] Reserve[Get meta_key failed: {:?}] key: {:?}",
							self.data_type, e, user_key
						);
						return Ok(CompactionFilterDecision::Keep);
					}
				};

				let any_val = match AnyValue::decode(&meta_encoded) {
					Ok(v) => v,
					Err(e) => {
						debug!(
							"[{:?}DataFilter] Reserve[Decode meta failed: {:?}] key: {:?}",
							self.data_type, e, user_key
						);
						return Ok(CompactionFilterDecision::Keep);
					}
				};

				// Check expiration
				if any_val.is_expired() {
					debug!(
						"[{:?}DataFilter] Drop[Timeout] key: {:?}, version: {}",
						self.data_type, user_key, version
					);
					return Ok(CompactionFilterDecision::Modify(ValueDeletable::Tombstone));
				}

				// Check Type
				if any_val.data_type() != self.data_type {
					// Type mismatch -> Orphaned sub-key (collision) -> Delete
					debug!(
						"[{:?}DataFilter] Drop[Type mismatch: expected {:?}, found {:?}] key: {:?}, version: {}",
						self.data_type,
						self.data_type,
						any_val.data_type(),
						user_key,
						version
					);
					return Ok(CompactionFilterDecision::Modify(ValueDeletable::Tombstone));
				}

				// Check Version
				if let Some(meta_version) = any_val.version()
					&& meta_version != version
				{
					debug!(
						"[{:?}DataFilter] Drop[version mismatch: cur_meta_version {}, data_key_version {}] key: {:?}",
						self.data_type, meta_version, version, user_key
					);
					return Ok(CompactionFilterDecision::Modify(ValueDeletable::Tombstone));
				}

				Ok(CompactionFilterDecision::Keep)
			}
		}
	}

	async fn on_compaction_end(&mut self) -> Result<(), CompactionFilterError> {
		Ok(())
	}
}

pub struct CorvidCompactionFilterSupplier {
	pub string_db: Option<Arc<Db>>,
	pub data_type: DataType,
}

#[async_trait]
impl CompactionFilterSupplier for CorvidCompactionFilterSupplier {
	async fn create_compaction_filter(
		&self,
		_context: &CompactionJobContext,
	) -> Result<Box<dyn CompactionFilter>, CompactionFilterError> {
		Ok(Box::new(CorvidCompactionFilter {
			string_db: self.string_db.clone(),
			data_type: self.data_type,
		}))
	}
}
