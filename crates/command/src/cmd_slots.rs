use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use replication::Migrator;
use resp::RespValue;
use storage::Storage;

use crate::Cmd;
use crate::CmdMeta;

pub struct SlotsInfoCmd {
	meta: CmdMeta,
}

impl Default for SlotsInfoCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "SLOTSINFO".to_string(),
				arity: 1,
			},
		}
	}
}

#[async_trait]
impl Cmd for SlotsInfoCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, _args: &[Bytes]) -> RespValue {
		match storage.slots_info().await {
			Ok(entries) => RespValue::array(entries.into_iter().map(|(slot, card)| {
				RespValue::array([RespValue::integer(slot as i64), RespValue::integer(card as i64)])
			})),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct SlotsHashKeyCmd {
	meta: CmdMeta,
}

impl Default for SlotsHashKeyCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "SLOTSHASHKEY".to_string(),
				arity: -2,
			},
		}
	}
}

#[async_trait]
impl Cmd for SlotsHashKeyCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let slots = storage.slots_hashkey(args);
		RespValue::array(slots.into_iter().map(|s| RespValue::integer(s as i64)))
	}
}

pub struct SlotsDelCmd {
	meta: CmdMeta,
}

impl Default for SlotsDelCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "SLOTSDEL".to_string(),
				arity: -2,
			},
		}
	}
}

#[async_trait]
impl Cmd for SlotsDelCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let slots: Result<Vec<u16>, _> = args.iter().map(|a| String::from_utf8_lossy(a).parse::<u16>()).collect();
		let Ok(slots) = slots else {
			return RespValue::error("ERR invalid slot id");
		};

		match storage.slots_del(&slots).await {
			Ok(count) => RespValue::integer(count as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

fn parse_host_port_timeout(args: &[Bytes]) -> Result<(String, u16, u64), RespValue> {
	let host = String::from_utf8_lossy(&args[0]).to_string();
	let port = String::from_utf8_lossy(&args[1])
		.parse::<u16>()
		.map_err(|_| RespValue::error("ERR invalid port"))?;
	let timeout_ms = String::from_utf8_lossy(&args[2])
		.parse::<u64>()
		.map_err(|_| RespValue::error("ERR invalid timeout"))?;
	reject_self_destination(&host, port)?;
	Ok((host, port, timeout_ms))
}

/// Refuses a migration destination that is this server itself: `127.0.0.1`,
/// `localhost`, or this server's own configured host/port.
fn reject_self_destination(host: &str, port: u16) -> Result<(), RespValue> {
	if host == "127.0.0.1" || host == "localhost" {
		return Err(RespValue::error("ERR migration destination can't be self"));
	}
	let own_addr = config::SERVER_CONF.load().addr.clone();
	if own_addr == format!("{}:{}", host, port) {
		return Err(RespValue::error("ERR migration destination can't be self"));
	}
	Ok(())
}

pub struct SlotsMgrtTagOneCmd {
	meta: CmdMeta,
	migrator: Arc<Migrator>,
}

impl SlotsMgrtTagOneCmd {
	pub fn new(migrator: Arc<Migrator>) -> Self {
		Self {
			meta: CmdMeta {
				name: "SLOTSMGRTTAGONE".to_string(),
				arity: 5,
			},
			migrator,
		}
	}
}

#[async_trait]
impl Cmd for SlotsMgrtTagOneCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, _storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let (host, port, timeout_ms) = match parse_host_port_timeout(args) {
			Ok(v) => v,
			Err(e) => return e,
		};
		let key = args[3].clone();

		match self.migrator.migrate_key(&host, port, timeout_ms, key).await {
			Ok(true) => RespValue::integer(1),
			Ok(false) => RespValue::integer(0),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct SlotsMgrtTagSlotCmd {
	meta: CmdMeta,
	migrator: Arc<Migrator>,
}

impl SlotsMgrtTagSlotCmd {
	pub fn new(migrator: Arc<Migrator>) -> Self {
		Self {
			meta: CmdMeta {
				name: "SLOTSMGRTTAGSLOT".to_string(),
				arity: 5,
			},
			migrator,
		}
	}
}

#[async_trait]
impl Cmd for SlotsMgrtTagSlotCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let (host, port, timeout_ms) = match parse_host_port_timeout(args) {
			Ok(v) => v,
			Err(e) => return e,
		};
		let slot = match String::from_utf8_lossy(&args[3]).parse::<u16>() {
			Ok(s) => s,
			Err(_) => return RespValue::error("ERR invalid slot id"),
		};

		let index_key = storage::slot::slot_index_key(slot);
		let members = match storage.smembers(index_key.clone()).await {
			Ok(m) => m,
			Err(e) => return RespValue::error(e.to_string()),
		};
		let Some(member) = members.into_iter().next() else {
			return RespValue::array([RespValue::integer(0), RespValue::integer(0)]);
		};

		let key = member.slice(1..);
		let moved = match self.migrator.migrate_key(&host, port, timeout_ms, key).await {
			Ok(v) => v,
			Err(e) => return RespValue::error(e.to_string()),
		};

		let remaining = storage.scard(index_key).await.unwrap_or(0);
		RespValue::array([
			RespValue::integer(if moved { 1 } else { 0 }),
			RespValue::integer(remaining as i64),
		])
	}
}

pub struct SlotsMgrtAsyncCmd {
	meta: CmdMeta,
	migrator: Arc<Migrator>,
}

impl SlotsMgrtAsyncCmd {
	pub fn new(migrator: Arc<Migrator>) -> Self {
		Self {
			meta: CmdMeta {
				name: "SLOTSMGRTTAGSLOT-ASYNC".to_string(),
				arity: 8,
			},
			migrator,
		}
	}
}

#[async_trait]
impl Cmd for SlotsMgrtAsyncCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, _storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let (host, port, timeout_ms) = match parse_host_port_timeout(args) {
			Ok(v) => v,
			Err(e) => return e,
		};

		let parse_usize = |arg: &Bytes| String::from_utf8_lossy(arg).parse::<usize>();
		let Ok(_max_bulks) = parse_usize(&args[3]) else {
			return RespValue::error("ERR invalid max_bulks");
		};
		let Ok(_max_bytes) = parse_usize(&args[4]) else {
			return RespValue::error("ERR invalid max_bytes");
		};
		let Ok(slot) = String::from_utf8_lossy(&args[5]).parse::<u16>() else {
			return RespValue::error("ERR invalid slot id");
		};
		let Ok(keys_per_round) = parse_usize(&args[6]) else {
			return RespValue::error("ERR invalid keys count");
		};

		match self.migrator.start_async(&host, port, timeout_ms, slot, keys_per_round).await {
			Ok((moved, remaining)) => RespValue::array([
				RespValue::integer(moved as i64),
				RespValue::integer(remaining as i64),
			]),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct SlotsMgrtAsyncStatusCmd {
	meta: CmdMeta,
	migrator: Arc<Migrator>,
}

impl SlotsMgrtAsyncStatusCmd {
	pub fn new(migrator: Arc<Migrator>) -> Self {
		Self {
			meta: CmdMeta {
				name: "SLOTSMGRT-ASYNC-STATUS".to_string(),
				arity: 1,
			},
			migrator,
		}
	}
}

#[async_trait]
impl Cmd for SlotsMgrtAsyncStatusCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, _storage: &Arc<Storage>, _args: &[Bytes]) -> RespValue {
		match self.migrator.status().await {
			Some(status) => RespValue::array([
				RespValue::bulk_string(Bytes::from(status.dest)),
				RespValue::integer(status.port as i64),
				RespValue::integer(status.slot as i64),
				RespValue::integer(if status.migrating { 1 } else { 0 }),
				RespValue::integer(status.moved as i64),
				RespValue::integer(status.remaining as i64),
			]),
			None => RespValue::array([RespValue::bulk_string(Bytes::from_static(b"no-migrating"))]),
		}
	}
}

pub struct SlotsMgrtAsyncCancelCmd {
	meta: CmdMeta,
	migrator: Arc<Migrator>,
}

impl SlotsMgrtAsyncCancelCmd {
	pub fn new(migrator: Arc<Migrator>) -> Self {
		Self {
			meta: CmdMeta {
				name: "SLOTSMGRT-ASYNC-CANCEL".to_string(),
				arity: 1,
			},
			migrator,
		}
	}
}

#[async_trait]
impl Cmd for SlotsMgrtAsyncCancelCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, _storage: &Arc<Storage>, _args: &[Bytes]) -> RespValue {
		self.migrator.cancel().await;
		RespValue::simple_string("OK")
	}
}
