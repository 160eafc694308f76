//! Peer-to-peer replication I/O: the master side streams binlog records to
//! connected slaves, the slave side applies what it receives through the
//! ordinary command table.
//!
//! This speaks `replication::frame::ReplFrame` over its own TCP listener,
//! separate from the client-facing RESP port (SPEC_FULL.md doesn't pin a
//! transport, so replication gets `host:port+1` by convention, matching
//! the common master/slave port-offset pattern; see DESIGN.md).

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use bytes::Bytes;
use command::CmdTable;
use replication::MasterReplicator;
use replication::ReplFrame;
use replication::SlaveReplicator;
use replication::frame::read_frame;
use replication::frame::write_frame;
use replication::slave::SlaveEvent;
use storage::Storage;
use storage::binlog::BinlogItem;
use tokio::net::TcpListener;
use tokio::net::TcpStream;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

fn new_session_id() -> u64 {
	NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Accepts peer connections and serves each with its own binlog stream.
pub async fn run_master_listener(listener: TcpListener, storage: Arc<Storage>, replicator: Arc<MasterReplicator>) {
	loop {
		let (socket, peer) = match listener.accept().await {
			Ok(v) => v,
			Err(e) => {
				log::warn!("replication accept failed: {}", e);
				continue;
			}
		};
		let storage = storage.clone();
		let replicator = replicator.clone();
		tokio::spawn(async move {
			if let Err(e) = serve_slave(socket, storage, replicator).await {
				log::warn!("replication peer {} disconnected: {}", peer, e);
			}
		});
	}
}

async fn serve_slave(stream: TcpStream, storage: Arc<Storage>, replicator: Arc<MasterReplicator>) -> Result<(), ReplNetError> {
	let (mut rx, mut tx) = stream.into_split();

	let (db_name, offset_hint) = loop {
		match read_frame(&mut rx).await? {
			Some(ReplFrame::MetaSync) => continue,
			Some(ReplFrame::TrySync { db_name, master_offset_hint }) => break (db_name, master_offset_hint),
			Some(other) => return Err(ReplNetError::Protocol(format!("expected TrySync, got {:?}", other))),
			None => return Ok(()),
		}
	};

	let session_id = new_session_id();
	replicator.register_slave(&db_name, session_id, 1024);

	// A zero-payload BinlogSync frame doubles as the TrySync acceptance:
	// it carries the session id the slave must echo back in every ack.
	write_frame(&mut tx, &ReplFrame::BinlogSync {
		session_id,
		db_name: db_name.clone(),
		binlog_offset: offset_hint,
		binlog: Bytes::new(),
	})
	.await?;

	let stream_storage = storage.clone();
	let stream_replicator = replicator.clone();
	let stream_db = db_name.clone();
	let writer = tokio::spawn(async move {
		let mut reader = stream_storage.binlog_reader(offset_hint);
		let mut ticker = tokio::time::interval(Duration::from_millis(50));
		loop {
			ticker.tick().await;
			loop {
				match reader.next().await {
					Ok(Some((item, next_offset))) => {
						let Ok(payload) = bincode::serialize(&item) else { continue };
						let frame = ReplFrame::BinlogSync {
							session_id,
							db_name: stream_db.clone(),
							binlog_offset: next_offset,
							binlog: Bytes::from(payload),
						};
						if write_frame(&mut tx, &frame).await.is_err() {
							return;
						}
						stream_replicator.note_sent(&stream_db, session_id, next_offset);
					}
					Ok(None) => break,
					Err(e) => {
						log::warn!("binlog read failed: {}", e);
						return;
					}
				}
			}
		}
	});

	loop {
		match read_frame(&mut rx).await? {
			Some(ReplFrame::BinlogAck { end, .. }) => {
				let _ = replicator.record_ack(&db_name, session_id, session_id, end);
			}
			Some(ReplFrame::RemoveSlaveNode { .. }) | None => break,
			Some(_) => {}
		}
	}

	writer.abort();
	replicator.remove_slave(&db_name, session_id);
	Ok(())
}

/// Connects to a master and applies everything it streams through
/// `cmd_table`, retrying the connection on any error.
pub async fn run_slave(master_addr: SocketAddr, db_name: String, storage: Arc<Storage>, cmd_table: Arc<CmdTable>) {
	loop {
		if let Err(e) = sync_from_master(master_addr, &db_name, &storage, &cmd_table).await {
			log::warn!("replication from {} failed, retrying: {}", master_addr, e);
		}
		tokio::time::sleep(Duration::from_secs(1)).await;
	}
}

async fn sync_from_master(
	master_addr: SocketAddr,
	db_name: &str,
	storage: &Arc<Storage>,
	cmd_table: &Arc<CmdTable>,
) -> Result<(), ReplNetError> {
	let mut slave = SlaveReplicator::new(db_name);
	slave.apply(SlaveEvent::Start);

	let mut stream = TcpStream::connect(master_addr).await?;
	write_frame(&mut stream, &ReplFrame::MetaSync).await?;
	slave.apply(SlaveEvent::MetaSyncSent);

	let offset_hint = storage.binlog_producer_status().await;
	write_frame(&mut stream, &ReplFrame::TrySync {
		db_name: db_name.to_string(),
		master_offset_hint: offset_hint,
	})
	.await?;

	loop {
		match read_frame(&mut stream).await? {
			Some(ReplFrame::BinlogSync { session_id, binlog_offset, binlog, .. }) => {
				if binlog.is_empty() {
					slave.apply(SlaveEvent::TrySyncAccepted {
						session_id,
						offset: binlog_offset,
					});
					continue;
				}

				let item: BinlogItem = bincode::deserialize(&binlog).map_err(|e| ReplNetError::Protocol(e.to_string()))?;
				if let Some(cmd) = cmd_table.get_cmd(&item.cmd_name) {
					cmd.execute(storage, &item.args).await;
				}
				slave.apply(SlaveEvent::BinlogApplied { offset: binlog_offset });

				write_frame(&mut stream, &ReplFrame::BinlogAck {
					start: binlog_offset,
					end: binlog_offset,
				})
				.await?;
			}
			Some(_) => {}
			None => return Err(ReplNetError::Protocol("master closed connection".to_string())),
		}
	}
}

#[derive(Debug, thiserror::Error)]
enum ReplNetError {
	#[error(transparent)]
	Io(#[from] std::io::Error),
	#[error(transparent)]
	Repl(#[from] replication::ReplError),
	#[error("replication protocol error: {0}")]
	Protocol(String),
}
