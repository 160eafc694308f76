use std::path::Path;
use std::sync::Arc;

use slatedb::Db;
use slatedb::object_store::ObjectStore;
use slatedb::object_store::local::LocalFileSystem;
use slatedb::object_store::path::Path as ObjectPath;

use crate::binlog::Binlog;
use crate::binlog::BinlogItem;
use crate::binlog::BinlogOffset;
use crate::binlog::BinlogReader;
use crate::binlog::DEFAULT_ROTATE_SIZE;
use crate::compaction_filter::CorvidCompactionFilterSupplier;
use crate::data_type::DataType;
use crate::error::StorageError;
use crate::lock_manager::LockManager;
use crate::string::meta::CompositeMeta;
use crate::string::meta::MetaKey;
use crate::version::VersionGenerator;

/// Top-level storage engine.
///
/// Every logical key type gets its own SlateDB database so compaction
/// filters can be scoped per type: `meta_db` holds one entry per user key
/// (the full string envelope for strings, a small header for everything
/// else), and `hash_db`/`list_db`/`set_db`/`zset_db` hold the sub-keys of
/// composite values, versioned against their meta entry so stale sub-keys
/// left behind by overwrites are reclaimed by compaction instead of by an
/// explicit sweep.
#[derive(Clone)]
pub struct Storage {
	pub(crate) meta_db: Arc<Db>,
	pub(crate) hash_db: Arc<Db>,
	pub(crate) list_db: Arc<Db>,
	pub(crate) set_db: Arc<Db>,
	pub(crate) zset_db: Arc<Db>,
	pub(crate) version_generator: VersionGenerator,
	pub(crate) lock_manager: LockManager,
	pub(crate) slotmigrate_enabled: Arc<std::sync::atomic::AtomicBool>,
	binlog: Arc<Binlog>,
}

impl Storage {
	/// Open a storage engine rooted at `path` on the local filesystem.
	pub async fn open(
		path: impl AsRef<Path>,
		object_store: Option<Arc<dyn ObjectStore>>,
	) -> Result<Self, StorageError> {
		let binlog_dir = path.as_ref().join("binlog");

		let object_store: Arc<dyn ObjectStore> = match object_store {
			Some(store) => store,
			None => Arc::new(
				LocalFileSystem::new_with_prefix(path)
					.map_err(|e| StorageError::InvalidArgument(e.to_string()))?,
			),
		};

		let meta_supplier: Arc<dyn slatedb::CompactionFilterSupplier> =
			Arc::new(CorvidCompactionFilterSupplier {
				string_db: None,
				data_type: DataType::String,
			});
		let meta_db = Arc::new(
			Db::builder(ObjectPath::from("/meta"), object_store.clone())
				.with_compaction_filter_supplier(meta_supplier)
				.build()
				.await?,
		);

		let hash_db = Self::open_composite(
			ObjectPath::from("/hash"),
			object_store.clone(),
			meta_db.clone(),
			DataType::Hash,
		)
		.await?;
		let list_db = Self::open_composite(
			ObjectPath::from("/list"),
			object_store.clone(),
			meta_db.clone(),
			DataType::List,
		)
		.await?;
		let set_db = Self::open_composite(
			ObjectPath::from("/set"),
			object_store.clone(),
			meta_db.clone(),
			DataType::Set,
		)
		.await?;
		let zset_db = Self::open_composite(
			ObjectPath::from("/zset"),
			object_store,
			meta_db.clone(),
			DataType::ZSet,
		)
		.await?;

		let binlog = Arc::new(Binlog::open(binlog_dir, DEFAULT_ROTATE_SIZE).await?);

		Ok(Self {
			meta_db,
			hash_db,
			list_db,
			set_db,
			zset_db,
			version_generator: VersionGenerator::new(),
			lock_manager: LockManager::new(),
			slotmigrate_enabled: Arc::new(std::sync::atomic::AtomicBool::new(false)),
			binlog,
		})
	}

	/// Appends a replayable record of a write command to the binlog. Called
	/// by the server's dispatch path after a write command succeeds; read
	/// commands never reach this.
	pub async fn append_binlog(&self, cmd_name: &str, args: &[bytes::Bytes]) -> Result<BinlogOffset, StorageError> {
		let item = BinlogItem {
			cmd_name: cmd_name.to_string(),
			args: args.to_vec(),
			ctime_ms: chrono::Utc::now().timestamp_millis() as u64,
		};
		self.binlog.append(&item).await
	}

	pub fn binlog_reader(&self, from: BinlogOffset) -> BinlogReader {
		self.binlog.reader(from)
	}

	pub async fn binlog_producer_status(&self) -> BinlogOffset {
		self.binlog.producer_status().await
	}

	async fn open_composite(
		path: ObjectPath,
		object_store: Arc<dyn ObjectStore>,
		meta_db: Arc<Db>,
		data_type: DataType,
	) -> Result<Arc<Db>, StorageError> {
		let supplier: Arc<dyn slatedb::CompactionFilterSupplier> =
			Arc::new(CorvidCompactionFilterSupplier {
				string_db: Some(meta_db),
				data_type,
			});
		let db = Db::builder(path, object_store)
			.with_compaction_filter_supplier(supplier)
			.build()
			.await?;
		Ok(Arc::new(db))
	}

	pub fn lock_manager(&self) -> &LockManager {
		&self.lock_manager
	}

	/// Look up and decode the meta header for a composite-typed key,
	/// transparently reclaiming it if it has expired and surfacing a
	/// `WrongType` error if `key` holds a different logical type.
	pub(crate) async fn get_meta<T: CompositeMeta + crate::expirable::Expirable>(
		&self,
		key: &bytes::Bytes,
	) -> Result<Option<T>, StorageError> {
		let meta_key = MetaKey::new(key.clone());
		let Some(meta_bytes) = self.meta_db.get(meta_key.encode()).await? else {
			return Ok(None);
		};
		if meta_bytes.is_empty() {
			return Ok(None);
		}
		let actual = DataType::from_u8(meta_bytes[0]).ok_or(crate::error::DecoderError::InvalidType)?;
		if actual != T::data_type() {
			return Err(StorageError::wrong_type(T::data_type(), actual));
		}
		let val = T::decode(&meta_bytes)?;
		if crate::expirable::Expirable::is_expired(&val) {
			self.del(key.clone()).await?;
			return Ok(None);
		}
		Ok(Some(val))
	}

	pub async fn flush_all(&self) -> Result<(), StorageError> {
		for db in [&self.meta_db, &self.hash_db, &self.list_db, &self.set_db, &self.zset_db] {
			let range = bytes::Bytes::new()..;
			let mut stream = db.scan(range).await?;
			let mut batch = slatedb::WriteBatch::new();
			while let Some(kv) = stream.next().await? {
				batch.delete(kv.key);
			}
			db.write(batch).await?;
		}
		Ok(())
	}
}
