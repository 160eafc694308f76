use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use resp::RespValue;
use storage::Storage;

use crate::Cmd;
use crate::CmdMeta;

/// `CONFIG GET`/`CONFIG SET` dispatcher.
pub struct ConfigCmd {
	meta: CmdMeta,
	sub_cmds: HashMap<String, Box<dyn Cmd>>,
}

impl Default for ConfigCmd {
	fn default() -> Self {
		let mut sub_cmds: HashMap<String, Box<dyn Cmd>> = HashMap::new();
		sub_cmds.insert("GET".to_string(), Box::new(ConfigGetCmd::default()));
		sub_cmds.insert("SET".to_string(), Box::new(ConfigSetCmd::default()));

		Self {
			meta: CmdMeta {
				name: "CONFIG".to_string(),
				arity: -3,
			},
			sub_cmds,
		}
	}
}

#[async_trait]
impl Cmd for ConfigCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		if args.is_empty() {
			return RespValue::error("ERR wrong number of arguments for CONFIG command");
		}

		let sub_cmd_name = String::from_utf8_lossy(&args[0]).to_uppercase();
		match self.sub_cmds.get(&sub_cmd_name) {
			Some(sub_cmd) => sub_cmd.execute(storage, &args[1..]).await,
			None => RespValue::error(format!("ERR unknown CONFIG subcommand '{}'", sub_cmd_name)),
		}
	}
}

struct ConfigGetCmd {
	meta: CmdMeta,
}

impl Default for ConfigGetCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "GET".to_string(),
				arity: 2,
			},
		}
	}
}

#[async_trait]
impl Cmd for ConfigGetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, _storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let pattern = String::from_utf8_lossy(&args[0]);

		if pattern.contains('*') {
			let matched_fields = config::ServerConfig::match_fields(&pattern);
			let config = config::SERVER_CONF.load();

			let mut result = Vec::new();
			for field_name in matched_fields {
				if let Ok(value) = config.get_field(field_name) {
					result.push(RespValue::bulk_string(Bytes::from(field_name.to_string())));
					result.push(RespValue::bulk_string(Bytes::from(value)));
				}
			}
			RespValue::array(result)
		} else {
			match config::SERVER_CONF.load().get_field(&pattern) {
				Ok(value) => RespValue::array([
					RespValue::bulk_string(Bytes::from(pattern.into_owned())),
					RespValue::bulk_string(Bytes::from(value)),
				]),
				Err(e) => RespValue::error(e),
			}
		}
	}
}

struct ConfigSetCmd {
	meta: CmdMeta,
}

impl Default for ConfigSetCmd {
	fn default() -> Self {
		Self {
			meta: CmdMeta {
				name: "SET".to_string(),
				arity: 3,
			},
		}
	}
}

#[async_trait]
impl Cmd for ConfigSetCmd {
	fn meta(&self) -> &CmdMeta {
		&self.meta
	}

	async fn do_cmd(&self, _storage: &Arc<Storage>, args: &[Bytes]) -> RespValue {
		let field_name = String::from_utf8_lossy(&args[0]);
		let value = String::from_utf8_lossy(&args[1]);

		let current = config::SERVER_CONF.load();
		let mut new_config = (**current).clone();

		match new_config.set_field(&field_name, &value) {
			Ok(_) => {
				config::SERVER_CONF.update(new_config);
				RespValue::simple_string("OK")
			}
			Err(e) => RespValue::error(e),
		}
	}
}
