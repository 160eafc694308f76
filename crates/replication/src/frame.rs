//! Wire framing for replication messages: `[len:u32][bincode(ReplFrame)]`
//! over a plain `TcpStream`, read and written by the same small framed-codec
//! shape on both the master and slave sides.

use bytes::Bytes;
use serde::Deserialize;
use serde::Serialize;
use storage::binlog::BinlogOffset;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::error::ReplError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplFrame {
	MetaSync,
	TrySync {
		db_name: String,
		master_offset_hint: BinlogOffset,
	},
	DBSync {
		snapshot_id: String,
		db_name: String,
	},
	BinlogSync {
		session_id: u64,
		db_name: String,
		binlog_offset: BinlogOffset,
		binlog: Bytes,
	},
	RemoveSlaveNode {
		session_id: u64,
	},
	BinlogAck {
		start: BinlogOffset,
		end: BinlogOffset,
	},
}

pub async fn write_frame<W: AsyncWrite + Unpin>(w: &mut W, frame: &ReplFrame) -> Result<(), ReplError> {
	let payload = bincode::serialize(frame).map_err(|e| ReplError::Codec(e.to_string()))?;
	w.write_u32(payload.len() as u32).await?;
	w.write_all(&payload).await?;
	w.flush().await?;
	Ok(())
}

/// Read one frame, or `Ok(None)` on a clean EOF before any bytes of the
/// next frame arrive.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> Result<Option<ReplFrame>, ReplError> {
	let len = match r.read_u32().await {
		Ok(v) => v,
		Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
		Err(e) => return Err(e.into()),
	};

	let mut buf = vec![0u8; len as usize];
	r.read_exact(&mut buf).await?;
	let frame = bincode::deserialize(&buf).map_err(|e| ReplError::Codec(e.to_string()))?;
	Ok(Some(frame))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_frame_roundtrip() {
		let frame = ReplFrame::BinlogAck {
			start: BinlogOffset::zero(),
			end: BinlogOffset {
				filenum: 0,
				offset: 10,
				term: 0,
				index: 3,
			},
		};

		let mut buf = Vec::new();
		write_frame(&mut buf, &frame).await.unwrap();

		let mut cursor = std::io::Cursor::new(buf);
		let read_back = read_frame(&mut cursor).await.unwrap().unwrap();
		assert_eq!(read_back, frame);
	}

	#[tokio::test]
	async fn test_read_frame_clean_eof() {
		let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
		let result = read_frame(&mut cursor).await.unwrap();
		assert!(result.is_none());
	}

	#[tokio::test]
	async fn test_empty_binlog_is_keepalive() {
		let frame = ReplFrame::BinlogSync {
			session_id: 1,
			db_name: "db0".to_string(),
			binlog_offset: BinlogOffset::zero(),
			binlog: Bytes::new(),
		};
		let mut buf = Vec::new();
		write_frame(&mut buf, &frame).await.unwrap();
		let mut cursor = std::io::Cursor::new(buf);
		match read_frame(&mut cursor).await.unwrap().unwrap() {
			ReplFrame::BinlogSync { binlog, .. } => assert!(binlog.is_empty()),
			other => panic!("unexpected frame {other:?}"),
		}
	}
}
