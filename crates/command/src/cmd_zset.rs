use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use resp::RespValue;
use storage::Storage;

use crate::Cmd;
use crate::CmdMeta;

pub struct ZAddCmd {
	meta: CmdMeta,
}

impl Default for ZAddCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "ZADD".to_string(),
				arity: -4,
			},
		}
	}
}

#[async_trait]
impl Cmd for ZAddCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();
		let remaining = &args[1..];
		if !remaining.len().is_multiple_of(2) {
			return RespValue::error("ERR syntax error");
		}

		let mut elements = Vec::with_capacity(remaining.len() / 2);
		for chunk in remaining.chunks_exact(2) {
			let score = match String::from_utf8_lossy(&chunk[0]).parse::<f64>() {
				Ok(s) if !s.is_nan() => s,
				Ok(_) => return RespValue::error("ERR resulting score is not a number (NaN)"),
				Err(_) => return RespValue::error("ERR value is not a valid float"),
			};
			elements.push((score, chunk[1].clone()));
		}

		match storage.zadd(key, elements).await {
			Ok(added) => RespValue::integer(added as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct ZRangeCmd {
	meta: CmdMeta,
}

impl Default for ZRangeCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "ZRANGE".to_string(),
				arity: -4,
			},
		}
	}
}

#[async_trait]
impl Cmd for ZRangeCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();

		let parse = |arg: &Bytes| -> Result<isize, RespValue> {
			String::from_utf8_lossy(arg)
				.parse::<isize>()
				.map_err(|_| RespValue::error("ERR value is not an integer or out of range"))
		};

		let start = match parse(&args[1]) {
			Ok(v) => v,
			Err(e) => return e,
		};
		let stop = match parse(&args[2]) {
			Ok(v) => v,
			Err(e) => return e,
		};

		let mut with_scores = false;
		if let Some(opt) = args.get(3) {
			if String::from_utf8_lossy(opt).eq_ignore_ascii_case("WITHSCORES") {
				with_scores = true;
			} else {
				return RespValue::error("ERR syntax error");
			}
		}

		match storage.zrange(key, start, stop, with_scores).await {
			Ok(members) => RespValue::array(members.into_iter().map(RespValue::bulk_string)),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct ZScoreCmd {
	meta: CmdMeta,
}

impl Default for ZScoreCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "ZSCORE".to_string(),
				arity: 3,
			},
		}
	}
}

#[async_trait]
impl Cmd for ZScoreCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.zscore(args[0].clone(), args[1].clone()).await {
			Ok(Some(score)) => RespValue::bulk_string(Bytes::from(score.to_string())),
			Ok(None) => RespValue::Null,
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct ZRemCmd {
	meta: CmdMeta,
}

impl Default for ZRemCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "ZREM".to_string(),
				arity: -3,
			},
		}
	}
}

#[async_trait]
impl Cmd for ZRemCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let key = args[0].clone();
		let members = args[1..].to_vec();
		match storage.zrem(key, members).await {
			Ok(count) => RespValue::integer(count as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}

pub struct ZCardCmd {
	meta: CmdMeta,
}

impl Default for ZCardCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "ZCARD".to_string(),
				arity: 2,
			},
		}
	}
}

#[async_trait]
impl Cmd for ZCardCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		match storage.zcard(args[0].clone()).await {
			Ok(count) => RespValue::integer(count as i64),
			Err(e) => RespValue::error(e.to_string()),
		}
	}
}
