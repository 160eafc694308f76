use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use resp::RespValue;
use storage::Storage;

use crate::Cmd;
use crate::CmdMeta;

pub struct SAddCmd {
	meta: CmdMeta,
}

impl Default for SAddCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "SADD".to_string(),
				arity: -3,
			},
		}
	}
}

#[async_trait]
impl Cmd for SAddCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();
		let members = args[1..].to_vec();
		match storage.sadd(key, members).await {
			Ok(count) => RespValue::integer(count as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct SMembersCmd {
	meta: CmdMeta,
}

impl Default for SMembersCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "SMEMBERS".to_string(),
				arity: 2,
			},
		}
	}
}

#[async_trait]
impl Cmd for SMembersCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.smembers(args[0].clone()).await {
			Ok(members) => RespValue::array(members.into_iter().map(RespValue::bulk_string)),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct SIsMemberCmd {
	meta: CmdMeta,
}

impl Default for SIsMemberCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "SISMEMBER".to_string(),
				arity: 3,
			},
		}
	}
}

#[async_trait]
impl Cmd for SIsMemberCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.sismember(args[0].clone(), args[1].clone()).await {
			Ok(true) => RespValue::integer(1),
			Ok(false) => RespValue::integer(0),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct SRemCmd {
	meta: CmdMeta,
}

impl Default for SRemCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "SREM".to_string(),
				arity: -3,
			},
		}
	}
}

#[async_trait]
impl Cmd for SRemCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();
		let members = args[1..].to_vec();
		match storage.srem(key, members).await {
			Ok(count) => RespValue::integer(count as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct SCardCmd {
	meta: CmdMeta,
}

impl Default for SCardCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "SCARD".to_string(),
				arity: 2,
			},
		}
	}
}

#[async_trait]
impl Cmd for SCardCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.scard(args[0].clone()).await {
			Ok(count) => RespValue::integer(count as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}
