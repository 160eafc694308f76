//! Append-only command log used to drive replication.
//!
//! One file per `filenum` under the binlog directory, each record framed as
//! `[len:u32][term:u64][index:u64][payload:bincode(BinlogItem)]`. The writer
//! is single-producer; the reader is a lazy, multi-consumer sequence over
//! sealed files plus the synchronized tail.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;
use tokio::fs::File;
use tokio::fs::OpenOptions;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufWriter;
use tokio::sync::Mutex;

use crate::error::StorageError;

/// Default size at which a binlog file is sealed and a new one started.
pub const DEFAULT_ROTATE_SIZE: u64 = 64 * 1024 * 1024;

/// The command a binlog record replays: name plus raw argument bytes, as
/// they arrived over the client connection, so the replication applier can
/// dispatch them through the ordinary command path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinlogItem {
	pub cmd_name: String,
	pub args: Vec<Bytes>,
	pub ctime_ms: u64,
}

/// Physical + logical position of a binlog record. `(filenum, offset)` is
/// where to read next; `(term, index)` is the logical sequence number used
/// for replication progress comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinlogOffset {
	pub filenum: u64,
	pub offset: u64,
	pub term: u64,
	pub index: u64,
}

impl BinlogOffset {
	pub fn zero() -> Self {
		Self {
			filenum: 0,
			offset: 0,
			term: 0,
			index: 0,
		}
	}
}

/// The zero-payload projection of a binlog record: everything needed to
/// advertise producer progress without touching the command body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinlogItemWithoutContent {
	pub term: u64,
	pub index: u64,
	pub filenum: u64,
	pub offset: u64,
}

pub fn binlog_item_without_content(offset: BinlogOffset) -> BinlogItemWithoutContent {
	BinlogItemWithoutContent {
		term: offset.term,
		index: offset.index,
		filenum: offset.filenum,
		offset: offset.offset,
	}
}

struct ProducerState {
	file: BufWriter<File>,
	filenum: u64,
	offset: u64,
	term: u64,
	index: u64,
}

/// Single-producer, multi-consumer append-only log.
pub struct Binlog {
	dir: PathBuf,
	rotate_size: u64,
	state: Mutex<ProducerState>,
}

fn journal_path(dir: &Path, filenum: u64) -> PathBuf {
	dir.join(format!("{filenum:020}"))
}

impl Binlog {
	/// Open (creating if absent) the binlog rooted at `dir`, resuming from
	/// the highest-numbered existing journal file.
	pub async fn open(dir: impl AsRef<Path>, rotate_size: u64) -> Result<Self, StorageError> {
		let dir = dir.as_ref().to_path_buf();
		tokio::fs::create_dir_all(&dir).await?;

		let mut filenum = 0u64;
		let mut read_dir = tokio::fs::read_dir(&dir).await?;
		while let Some(entry) = read_dir.next_entry().await? {
			if let Some(n) = entry.file_name().to_str().and_then(|s| s.parse::<u64>().ok()) {
				filenum = filenum.max(n);
			}
		}

		let path = journal_path(&dir, filenum);
		let file = OpenOptions::new()
			.create(true)
			.append(true)
			.read(true)
			.open(&path)
			.await?;
		let offset = file.metadata().await?.len();

		Ok(Self {
			dir,
			rotate_size,
			state: Mutex::new(ProducerState {
				file: BufWriter::new(file),
				filenum,
				offset,
				term: 0,
				index: 0,
			}),
		})
	}

	/// Append `item`, flushing immediately, and return the position it was
	/// written at. Rotates to a new file first if the current one is past
	/// `rotate_size`.
	pub async fn append(&self, item: &BinlogItem) -> Result<BinlogOffset, StorageError> {
		let payload = bincode::serialize(item)
			.map_err(|e| StorageError::Corruption(format!("binlog encode failed: {e}")))?;

		let mut state = self.state.lock().await;

		if state.offset >= self.rotate_size {
			self.rotate_locked(&mut state).await?;
		}

		state.index += 1;
		let term = state.term;
		let index = state.index;

		let frame_len = (8 + 8 + payload.len()) as u32;
		state.file.write_u32(frame_len).await?;
		state.file.write_u64(term).await?;
		state.file.write_u64(index).await?;
		state.file.write_all(&payload).await?;
		state.file.flush().await?;

		let written = 4 + frame_len as u64;
		let result = BinlogOffset {
			filenum: state.filenum,
			offset: state.offset,
			term,
			index,
		};
		state.offset += written;

		Ok(result)
	}

	async fn rotate_locked(&self, state: &mut ProducerState) -> Result<(), StorageError> {
		state.file.flush().await?;
		let next_filenum = state.filenum + 1;
		let path = journal_path(&self.dir, next_filenum);
		let file = OpenOptions::new()
			.create(true)
			.append(true)
			.read(true)
			.open(&path)
			.await?;
		state.file = BufWriter::new(file);
		state.filenum = next_filenum;
		state.offset = 0;
		Ok(())
	}

	/// Force a rotation regardless of current file size.
	pub async fn rotate(&self) -> Result<(), StorageError> {
		let mut state = self.state.lock().await;
		self.rotate_locked(&mut state).await
	}

	/// Current producer position; the next record appended will land here.
	pub async fn producer_status(&self) -> BinlogOffset {
		let state = self.state.lock().await;
		BinlogOffset {
			filenum: state.filenum,
			offset: state.offset,
			term: state.term,
			index: state.index,
		}
	}

	/// Delete every sealed journal file strictly before `before`. The file
	/// currently being written is never removed.
	pub async fn trim(&self, before: u64) -> Result<(), StorageError> {
		let mut read_dir = tokio::fs::read_dir(&self.dir).await?;
		while let Some(entry) = read_dir.next_entry().await? {
			if let Some(n) = entry.file_name().to_str().and_then(|s| s.parse::<u64>().ok())
				&& n < before
			{
				tokio::fs::remove_file(entry.path()).await?;
			}
		}
		Ok(())
	}

	/// Open a lazy reader starting at `from`. Only records already flushed
	/// by the writer are visible.
	pub fn reader(self: &Arc<Self>, from: BinlogOffset) -> BinlogReader {
		BinlogReader {
			dir: self.dir.clone(),
			filenum: from.filenum,
			offset: from.offset,
		}
	}
}

/// Lazy sequence of `(BinlogItem, next_offset)` over sealed files and the
/// synchronized tail. Multiple readers may exist concurrently over the same
/// binlog; each owns its own position.
pub struct BinlogReader {
	dir: PathBuf,
	filenum: u64,
	offset: u64,
}

impl BinlogReader {
	/// Read the next available record, or `None` if the writer has not
	/// flushed anything past the current position yet.
	pub async fn next(&mut self) -> Result<Option<(BinlogItem, BinlogOffset)>, StorageError> {
		let path = journal_path(&self.dir, self.filenum);
		let mut file = match File::open(&path).await {
			Ok(f) => f,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(e.into()),
		};

		let len = file.metadata().await?.len();
		if self.offset >= len {
			// Nothing new in this file; check whether a successor file
			// exists (meaning this file was sealed by a rotation).
			let next_path = journal_path(&self.dir, self.filenum + 1);
			if tokio::fs::try_exists(&next_path).await? {
				self.filenum += 1;
				self.offset = 0;
				return Box::pin(self.next()).await;
			}
			return Ok(None);
		}

		use tokio::io::AsyncSeekExt;
		file.seek(std::io::SeekFrom::Start(self.offset)).await?;

		let frame_len = match file.read_u32().await {
			Ok(v) => v,
			Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
			Err(e) => return Err(e.into()),
		};
		if 4 + frame_len as u64 > len - self.offset {
			// Partial record at EOF: writer hasn't finished flushing it.
			return Ok(None);
		}

		let term = file.read_u64().await?;
		let index = file.read_u64().await?;
		let payload_len = frame_len as usize - 16;
		let mut payload = vec![0u8; payload_len];
		file.read_exact(&mut payload).await?;

		let item: BinlogItem = bincode::deserialize(&payload)
			.map_err(|e| StorageError::Corruption(format!("binlog decode failed: {e}")))?;

		let record_offset = self.offset;
		self.offset += 4 + frame_len as u64;

		Ok(Some((
			item,
			BinlogOffset {
				filenum: self.filenum,
				offset: record_offset,
				term,
				index,
			},
		)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(name: &str, idx: u64) -> BinlogItem {
		BinlogItem {
			cmd_name: name.to_string(),
			args: vec![Bytes::from(idx.to_string())],
			ctime_ms: idx,
		}
	}

	#[tokio::test]
	async fn test_append_and_read_back() {
		let dir = tempfile::tempdir().unwrap();
		let binlog = Arc::new(Binlog::open(dir.path(), DEFAULT_ROTATE_SIZE).await.unwrap());

		let first = binlog.append(&item("SET", 1)).await.unwrap();
		let second = binlog.append(&item("SET", 2)).await.unwrap();
		assert_eq!(first.index, 1);
		assert_eq!(second.index, 2);

		let mut reader = binlog.reader(BinlogOffset::zero());
		let (read_item, off1) = reader.next().await.unwrap().unwrap();
		assert_eq!(read_item.cmd_name, "SET");
		assert_eq!(off1.index, 1);

		let (_, off2) = reader.next().await.unwrap().unwrap();
		assert_eq!(off2.index, 2);

		assert!(reader.next().await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_producer_status_monotonic() {
		let dir = tempfile::tempdir().unwrap();
		let binlog = Binlog::open(dir.path(), DEFAULT_ROTATE_SIZE).await.unwrap();

		let before = binlog.producer_status().await;
		binlog.append(&item("PING", 0)).await.unwrap();
		let after = binlog.producer_status().await;

		assert!(after.index > before.index);
	}

	#[tokio::test]
	async fn test_rotate_then_read_across_files() {
		let dir = tempfile::tempdir().unwrap();
		let binlog = Arc::new(Binlog::open(dir.path(), DEFAULT_ROTATE_SIZE).await.unwrap());

		binlog.append(&item("SET", 1)).await.unwrap();
		binlog.rotate().await.unwrap();
		binlog.append(&item("SET", 2)).await.unwrap();

		let mut reader = binlog.reader(BinlogOffset::zero());
		let (_, off1) = reader.next().await.unwrap().unwrap();
		assert_eq!(off1.filenum, 0);
		let (_, off2) = reader.next().await.unwrap().unwrap();
		assert_eq!(off2.filenum, 1);
	}

	#[tokio::test]
	async fn test_trim_removes_old_sealed_files_only() {
		let dir = tempfile::tempdir().unwrap();
		let binlog = Binlog::open(dir.path(), DEFAULT_ROTATE_SIZE).await.unwrap();

		binlog.append(&item("SET", 1)).await.unwrap();
		binlog.rotate().await.unwrap();
		binlog.append(&item("SET", 2)).await.unwrap();

		binlog.trim(1).await.unwrap();

		let mut names = Vec::new();
		let mut read_dir = tokio::fs::read_dir(dir.path()).await.unwrap();
		while let Some(e) = read_dir.next_entry().await.unwrap() {
			names.push(e.file_name().to_str().unwrap().to_string());
		}
		assert_eq!(names.len(), 1);
	}
}
