use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use resp::RespValue;
use storage::Storage;

use crate::Cmd;
use crate::CmdMeta;

fn parse_int(arg: &Bytes) -> Result<i64, RespValue> {
	String::from_utf8_lossy(arg)
		.parse::<i64>()
		.map_err(|_| RespValue::error("ERR value is not an integer or out of range"))
}

pub struct LPushCmd {
	meta: CmdMeta,
}

impl Default for LPushCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "LPUSH".to_string(),
				arity: -3,
			},
		}
	}
}

#[async_trait]
impl Cmd for LPushCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.lpush(args[0].clone(), args[1..].to_vec()).await {
			Ok(len) => RespValue::integer(len as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct RPushCmd {
	meta: CmdMeta,
}

impl Default for RPushCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "RPUSH".to_string(),
				arity: -3,
			},
		}
	}
}

#[async_trait]
impl Cmd for RPushCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.rpush(args[0].clone(), args[1..].to_vec()).await {
			Ok(len) => RespValue::integer(len as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct LPopCmd {
	meta: CmdMeta,
}

impl Default for LPopCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "LPOP".to_string(),
				arity: -2,
			},
		}
	}
}

#[async_trait]
impl Cmd for LPopCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let count = match args.get(1) {
			Some(arg) => match parse_int(arg) {
				Ok(v) if v >= 0 => Some(v as usize),
				Ok(_) => return RespValue::error("ERR value is out of range, must be positive"),
				Err(e) => return e,
			},
			None => None,
		};

		match storage.lpop(args[0].clone(), count).await {
			Ok(values) if values.is_empty() => RespValue::Null,
			Ok(values) if count.is_none() => RespValue::bulk_string(values[0].clone()),
			Ok(values) => RespValue::array(values.into_iter().map(RespValue::bulk_string)),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct RPopCmd {
	meta: CmdMeta,
}

impl Default for RPopCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "RPOP".to_string(),
				arity: -2,
			},
		}
	}
}

#[async_trait]
impl Cmd for RPopCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let count = match args.get(1) {
			Some(arg) => match parse_int(arg) {
				Ok(v) if v >= 0 => Some(v as usize),
				Ok(_) => return RespValue::error("ERR value is out of range, must be positive"),
				Err(e) => return e,
			},
			None => None,
		};

		match storage.rpop(args[0].clone(), count).await {
			Ok(values) if values.is_empty() => RespValue::Null,
			Ok(values) if count.is_none() => RespValue::bulk_string(values[0].clone()),
			Ok(values) => RespValue::array(values.into_iter().map(RespValue::bulk_string)),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct LLenCmd {
	meta: CmdMeta,
}

impl Default for LLenCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "LLEN".to_string(),
				arity: 2,
			},
		}
	}
}

#[async_trait]
impl Cmd for LLenCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.llen(args[0].clone()).await {
			Ok(len) => RespValue::integer(len as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct LRangeCmd {
	meta: CmdMeta,
}

impl Default for LRangeCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "LRANGE".to_string(),
				arity: 4,
			},
		}
	}
}

#[async_trait]
impl Cmd for LRangeCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let start = match parse_int(&args[1]) {
			Ok(v) => v,
			Err(e) => return e,
		};
		let stop = match parse_int(&args[2]) {
			Ok(v) => v,
			Err(e) => return e,
		};

		match storage.lrange(args[0].clone(), start, stop).await {
			Ok(values) => RespValue::array(values.into_iter().map(RespValue::bulk_string)),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}
