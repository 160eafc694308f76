use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use resp::RespValue;
use storage::Storage;

use crate::Cmd;
use crate::CmdMeta;

macro_rules! simple_cmd {
	($struct_name:ident, $name:expr, $arity:expr) => {
		pub struct $struct_name {
			meta: CmdMeta,
		}

		impl Default for $struct_name {
			fn default() -> Self {
				Self {
					meta: CmdMeta {
						name: $name.to_string(),
						arity: $arity,
					},
				}
			}
		}
	};
}

simple_cmd!(GetCmd, "GET", 2);

#[async_trait]
impl Cmd for GetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();
		match storage.get(key).await {
			Ok(Some(value)) => RespValue::bulk_string(value),
			Ok(None) => RespValue::Null,
			Err(e) => RespValue::error(format!("ERR {}", e)),
		}
	}
}

simple_cmd!(SetCmd, "SET", 3);

#[async_trait]
impl Cmd for SetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();
		let value = args[1].clone();
		match storage.set(key, value).await {
			Ok(_) => RespValue::simple_string("OK"),
			Err(e) => RespValue::error(format!("ERR {}", e)),
		}
	}
}

simple_cmd!(DelCmd, "DEL", -2);

#[async_trait]
impl Cmd for DelCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let mut count = 0;
		for key in args {
			match storage.del(key.clone()).await {
				Ok(true) => count += 1,
				Ok(false) => {}
				Err(e) => return RespValue::error(e.to_string()),
			}
		}
		RespValue::integer(count)
	}
}

simple_cmd!(ExistsCmd, "EXISTS", -2);

#[async_trait]
impl Cmd for ExistsCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let mut count = 0;
		for key in args {
			match storage.exists(key.clone()).await {
				Ok(true) => count += 1,
				Ok(false) => {}
				Err(e) => return RespValue::error(e.to_string()),
			}
		}
		RespValue::integer(count)
	}
}

simple_cmd!(ExpireCmd, "EXPIRE", 3);

#[async_trait]
impl Cmd for ExpireCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();
		let seconds = match String::from_utf8_lossy(&args[1]).parse::<u64>() {
			Ok(s) => s,
			Err(_) => return RespValue::error("ERR value is not an integer or out of range"),
		};

		let now = chrono::Utc::now().timestamp_millis() as u64;
		let expire_time = now + seconds * 1000;

		match storage.expire(key, expire_time).await {
			Ok(true) => RespValue::integer(1),
			Ok(false) => RespValue::integer(0),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

simple_cmd!(PexpireAtCmd, "PEXPIREAT", 3);

#[async_trait]
impl Cmd for PexpireAtCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();
		let expire_time_ms = match String::from_utf8_lossy(&args[1]).parse::<u64>() {
			Ok(ms) => ms,
			Err(_) => return RespValue::error("ERR value is not an integer or out of range"),
		};

		match storage.expire(key, expire_time_ms).await {
			Ok(true) => RespValue::integer(1),
			Ok(false) => RespValue::integer(0),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

simple_cmd!(TtlCmd, "TTL", 2);

#[async_trait]
impl Cmd for TtlCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();
		match storage.ttl(key).await {
			Ok(Some(-1)) => RespValue::integer(-1),
			Ok(Some(ttl_ms)) => RespValue::integer(ttl_ms / 1000),
			Ok(None) => RespValue::integer(-2),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

simple_cmd!(IncrCmd, "INCR", 2);

#[async_trait]
impl Cmd for IncrCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.incr(args[0].clone()).await {
			Ok(v) => RespValue::integer(v),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

simple_cmd!(DecrCmd, "DECR", 2);

#[async_trait]
impl Cmd for DecrCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.decr(args[0].clone()).await {
			Ok(v) => RespValue::integer(v),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

simple_cmd!(AppendCmd, "APPEND", 3);

#[async_trait]
impl Cmd for AppendCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.append(args[0].clone(), args[1].clone()).await {
			Ok(len) => RespValue::integer(len as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

simple_cmd!(FlushDbCmd, "FLUSHDB", 1);

#[async_trait]
impl Cmd for FlushDbCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, _args: &[Bytes]) -> RespValue {
		match storage.flush_all().await {
			Ok(_) => RespValue::simple_string("OK"),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

simple_cmd!(AuthCmd, "AUTH", 2);

#[async_trait]
impl Cmd for AuthCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, _storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let requirepass = config::SERVER_CONF.load().requirepass.clone();
		if requirepass.is_empty() {
			return RespValue::error("ERR Client sent AUTH, but no password is set");
		}
		if args[0].as_ref() == requirepass.as_bytes() {
			RespValue::simple_string("OK")
		} else {
			RespValue::error("ERR invalid password")
		}
	}
}

simple_cmd!(PingCmd, "PING", -1);

#[async_trait]
impl Cmd for PingCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, _storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match args.len() {
			0 => RespValue::simple_string("PONG"),
			1 => RespValue::bulk_string(args[0].clone()),
			_ => RespValue::error("ERR wrong number of arguments for 'ping' command"),
		}
	}
}
