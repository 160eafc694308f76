//! Single-key and batched slot migration to a peer instance.
//!
//! Migration speaks the same RESP wire the server exposes to clients: the
//! source replays the key as a sequence of write commands to the
//! destination and waits for a `+OK` before deleting locally. Only one
//! migration runs per server instance at a time.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use resp::RespEncoder;
use resp::RespValue;
use storage::Storage;
use storage::data_type::DataType;
use storage::slot::key_hash_slot;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::error::ReplError;

const MAX_RECVS_IN_FLIGHT: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
	pub dest: String,
	pub port: u16,
	pub slot: u16,
	pub migrating: bool,
	pub moved: u64,
	pub remaining: u64,
}

struct InFlight {
	dest: String,
	port: u16,
	slot: u16,
	moved: u64,
	cancel_requested: bool,
}

/// Owns the server's single in-flight batched migration slot and performs
/// one-off synchronous migrations for `SLOTSMGRTTAGONE`/`SLOTSMGRTTAGSLOT`.
pub struct Migrator {
	storage: Arc<Storage>,
	in_flight: Mutex<Option<InFlight>>,
}

impl Migrator {
	pub fn new(storage: Arc<Storage>) -> Self {
		Self {
			storage,
			in_flight: Mutex::new(None),
		}
	}

	/// Replays `key`'s current value to `dest:port` and deletes it locally
	/// on success. Returns `false` if the key did not exist.
	pub async fn migrate_key(&self, dest: &str, port: u16, timeout_ms: u64, key: Bytes) -> Result<bool, ReplError> {
		let Some(commands) = self.build_replay_commands(&key).await? else {
			return Ok(false);
		};

		self.storage.note_slot_delete(&key).await.map_err(|e| ReplError::Codec(e.to_string()))?;

		let send_result = timeout(Duration::from_millis(timeout_ms), self.send_and_await_ok(dest, port, &commands)).await;

		match send_result {
			Ok(Ok(())) => {
				self.storage.del(key).await.map_err(|e| ReplError::Codec(e.to_string()))?;
				Ok(true)
			}
			Ok(Err(e)) => {
				self.restore_slot_membership(&key).await;
				Err(e)
			}
			Err(_) => {
				self.restore_slot_membership(&key).await;
				Err(ReplError::Closed)
			}
		}
	}

	async fn restore_slot_membership(&self, key: &Bytes) {
		let data_type = self.key_data_type(key).await;
		if let Some(dt) = data_type {
			let _ = self.storage.note_slot_write(key, dt).await;
		}
	}

	async fn key_data_type(&self, key: &Bytes) -> Option<DataType> {
		if self.storage.get(key.clone()).await.ok().flatten().is_some() {
			return Some(DataType::String);
		}
		if self.storage.hlen(key.clone()).await.unwrap_or(0) > 0 {
			return Some(DataType::Hash);
		}
		if self.storage.scard(key.clone()).await.unwrap_or(0) > 0 {
			return Some(DataType::Set);
		}
		if self.storage.llen(key.clone()).await.unwrap_or(0) > 0 {
			return Some(DataType::List);
		}
		if self.storage.zcard(key.clone()).await.unwrap_or(0) > 0 {
			return Some(DataType::ZSet);
		}
		None
	}

	/// Builds the RESP command(s) that would reconstruct `key` on the
	/// destination, or `None` if the key doesn't currently exist. If the key
	/// carries a TTL, a trailing `PEXPIREAT` is appended to the batch.
	async fn build_replay_commands(&self, key: &Bytes) -> Result<Option<Vec<RespValue>>, ReplError> {
		let map_err = |e: storage::error::StorageError| ReplError::Codec(e.to_string());

		let mut commands = if let Some(value) = self.storage.get(key.clone()).await.map_err(map_err)? {
			vec![resp_array_bytes(vec![Bytes::from_static(b"SET"), key.clone(), value])]
		} else {
			let hash = self.storage.hgetall(key.clone()).await.map_err(map_err)?;
			if !hash.is_empty() {
				let mut args = vec![Bytes::from_static(b"HSET"), key.clone()];
				for (field, value) in hash {
					args.push(field);
					args.push(value);
				}
				vec![resp_array_bytes(args)]
			} else {
				let members = self.storage.smembers(key.clone()).await.map_err(map_err)?;
				if !members.is_empty() {
					let mut args = vec![Bytes::from_static(b"SADD"), key.clone()];
					args.extend(members);
					vec![resp_array_bytes(args)]
				} else {
					let list = self.storage.lrange(key.clone(), 0, -1).await.map_err(map_err)?;
					if !list.is_empty() {
						let mut args = vec![Bytes::from_static(b"RPUSH"), key.clone()];
						args.extend(list);
						vec![resp_array_bytes(args)]
					} else {
						let zset = self.storage.zrange(key.clone(), 0, -1, true).await.map_err(map_err)?;
						if !zset.is_empty() {
							let mut args = vec![Bytes::from_static(b"ZADD"), key.clone()];
							for pair in zset.chunks_exact(2) {
								args.push(pair[1].clone());
								args.push(pair[0].clone());
							}
							vec![resp_array_bytes(args)]
						} else {
							return Ok(None);
						}
					}
				}
			}
		};

		if let Some(ttl_ms) = self.storage.ttl(key.clone()).await.map_err(map_err)?
			&& ttl_ms >= 0
		{
			let now = chrono::Utc::now().timestamp_millis() as u64;
			let etime_ms = now + ttl_ms as u64;
			commands.push(resp_array_bytes(vec![
				Bytes::from_static(b"PEXPIREAT"),
				key.clone(),
				Bytes::from(etime_ms.to_string()),
			]));
		}

		Ok(Some(commands))
	}

	async fn send_and_await_ok(&self, dest: &str, port: u16, commands: &[RespValue]) -> Result<(), ReplError> {
		let mut stream = TcpStream::connect((dest, port)).await?;
		self.handshake(&mut stream).await?;
		for cmd in commands {
			let encoded = cmd.encode().map_err(|e| ReplError::Codec(e.to_string()))?;
			stream.write_all(&encoded).await?;
		}
		stream.flush().await?;

		let reply = read_reply(&mut stream).await?;
		if reply.starts_with('-') {
			return Err(ReplError::Codec(reply));
		}
		Ok(())
	}

	/// Authenticates against the destination if a shared secret is
	/// configured, else pings it to confirm it's reachable and unprotected.
	async fn handshake(&self, stream: &mut TcpStream) -> Result<(), ReplError> {
		let requirepass = config::SERVER_CONF.load().requirepass.clone();
		let cmd = if requirepass.is_empty() {
			resp_array_bytes(vec![Bytes::from_static(b"PING")])
		} else {
			resp_array_bytes(vec![Bytes::from_static(b"AUTH"), Bytes::from(requirepass)])
		};
		let encoded = cmd.encode().map_err(|e| ReplError::Codec(e.to_string()))?;
		stream.write_all(&encoded).await?;
		stream.flush().await?;

		let reply = read_reply(stream).await?;
		if reply.starts_with('+') || reply.to_lowercase().contains("no password") {
			return Ok(());
		}
		Err(ReplError::Codec(format!("migration destination auth failed: {}", reply.trim())))
	}

	/// Starts or continues a background batched migration of `slot`,
	/// moving up to `keys_per_round` keys. Fails if a different migration
	/// is already in flight.
	pub async fn start_async(
		&self,
		dest: &str,
		port: u16,
		timeout_ms: u64,
		slot: u16,
		keys_per_round: usize,
	) -> Result<(u64, u64), ReplError> {
		if !self.storage.slotmigrate_enabled() {
			return Err(ReplError::Codec("slot-migrate mode is not enabled".to_string()));
		}

		{
			let mut guard = self.in_flight.lock().await;
			match guard.as_ref() {
				Some(existing) if existing.slot != slot || existing.dest != dest || existing.port != port => {
					return Err(ReplError::Codec("another migration is already in flight".to_string()));
				}
				Some(_) => {}
				None => {
					*guard = Some(InFlight {
						dest: dest.to_string(),
						port,
						slot,
						moved: 0,
						cancel_requested: false,
					});
				}
			}
		}

		let index_key = storage::slot::slot_index_key(slot);
		let mut moved_this_round = 0u64;
		let mut in_flight_sends = 0usize;

		while moved_this_round < keys_per_round as u64 {
			if self.cancel_requested().await {
				break;
			}

			let members = self.storage.smembers(index_key.clone()).await.map_err(|e| ReplError::Codec(e.to_string()))?;
			let Some(member) = members.into_iter().next() else {
				break;
			};
			if member.is_empty() {
				break;
			}
			let key = member.slice(1..);

			match self.migrate_key(dest, port, timeout_ms, key).await {
				Ok(true) => {
					moved_this_round += 1;
					in_flight_sends += 1;
					if in_flight_sends >= MAX_RECVS_IN_FLIGHT {
						in_flight_sends = 0;
					}
				}
				Ok(false) => break,
				Err(_) => break,
			}
		}

		let remaining = self.storage.scard(index_key).await.unwrap_or(0);

		{
			let mut guard = self.in_flight.lock().await;
			if let Some(state) = guard.as_mut() {
				state.moved += moved_this_round;
			}
			if remaining == 0 {
				*guard = None;
			}
		}

		Ok((moved_this_round, remaining))
	}

	async fn cancel_requested(&self) -> bool {
		self.in_flight
			.lock()
			.await
			.as_ref()
			.map(|s| s.cancel_requested)
			.unwrap_or(false)
	}

	pub async fn cancel(&self) {
		if let Some(state) = self.in_flight.lock().await.as_mut() {
			state.cancel_requested = true;
		}
	}

	pub async fn status(&self) -> Option<MigrationStatus> {
		let guard = self.in_flight.lock().await;
		let state = guard.as_ref()?;
		let remaining = self.storage.scard(storage::slot::slot_index_key(state.slot)).await.unwrap_or(0);
		Some(MigrationStatus {
			dest: state.dest.clone(),
			port: state.port,
			slot: state.slot,
			migrating: !state.cancel_requested,
			moved: state.moved,
			remaining,
		})
	}
}

async fn read_reply(stream: &mut TcpStream) -> Result<String, ReplError> {
	let mut buf = [0u8; 256];
	let n = stream.read(&mut buf).await?;
	if n == 0 {
		return Err(ReplError::Closed);
	}
	Ok(String::from_utf8_lossy(&buf[..n]).to_string())
}

fn resp_array_bytes(parts: Vec<Bytes>) -> RespValue {
	RespValue::array(parts.into_iter().map(RespValue::bulk_string))
}

fn key_slot(key: &Bytes) -> u16 {
	key_hash_slot(key)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_key_slot_matches_storage_slot_fn() {
		let key = Bytes::from("{u1}foo");
		assert_eq!(key_slot(&key), key_hash_slot(&key));
	}
}
