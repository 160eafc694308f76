use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use resp::RespValue;
use storage::Storage;

use crate::Cmd;
use crate::CmdMeta;

pub struct HSetCmd {
	meta: CmdMeta,
}

impl Default for HSetCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "HSET".to_string(),
				arity: -4,
			},
		}
	}
}

#[async_trait]
impl Cmd for HSetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		if args.len() < 3 || !(args.len() - 1).is_multiple_of(2) {
			return RespValue::error("ERR wrong number of arguments for 'hset' command");
		}

		let key = &args[0];
		let mut added_count = 0;
		for chunk in args[1..].chunks_exact(2) {
			match storage.hset(key.clone(), chunk[0].clone(), chunk[1].clone()).await {
				Ok(count) => added_count += count,
				Err(e) => return RespValue::error(e.to_string()),
			}
		}

		RespValue::integer(added_count)
	}
}

pub struct HGetCmd {
	meta: CmdMeta,
}

impl Default for HGetCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "HGET".to_string(),
				arity: 3,
			},
		}
	}
}

#[async_trait]
impl Cmd for HGetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.hget(args[0].clone(), args[1].clone()).await {
			Ok(Some(v)) => RespValue::bulk_string(v),
			Ok(None) => RespValue::Null,
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct HLenCmd {
	meta: CmdMeta,
}

impl Default for HLenCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "HLEN".to_string(),
				arity: 2,
			},
		}
	}
}

#[async_trait]
impl Cmd for HLenCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.hlen(args[0].clone()).await {
			Ok(len) => RespValue::integer(len as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct HMGetCmd {
	meta: CmdMeta,
}

impl Default for HMGetCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "HMGET".to_string(),
				arity: -3,
			},
		}
	}
}

#[async_trait]
impl Cmd for HMGetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();
		let fields = &args[1..];
		match storage.hmget(key, fields).await {
			Ok(values) => RespValue::array(values.into_iter().map(|v| match v {
				Some(b) => RespValue::bulk_string(b),
				None => RespValue::Null,
			})),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct HGetAllCmd {
	meta: CmdMeta,
}

impl Default for HGetAllCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "HGETALL".to_string(),
				arity: 2,
			},
		}
	}
}

#[async_trait]
impl Cmd for HGetAllCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.hgetall(args[0].clone()).await {
			Ok(pairs) => RespValue::array(pairs.into_iter().flat_map(|(f, v)| {
				[RespValue::bulk_string(f), RespValue::bulk_string(v)]
			})),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct HDelCmd {
	meta: CmdMeta,
}

impl Default for HDelCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "HDEL".to_string(),
				arity: -3,
			},
		}
	}
}

#[async_trait]
impl Cmd for HDelCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();
		let fields = &args[1..];
		match storage.hdel(key, fields).await {
			Ok(count) => RespValue::integer(count),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}
