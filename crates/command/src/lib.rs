pub mod cmd_config;
pub mod cmd_hash;
pub mod cmd_list;
pub mod cmd_meta;
pub mod cmd_set;
pub mod cmd_slots;
pub mod cmd_string;
pub mod cmd_table;
pub mod cmd_trait;
pub mod cmd_zset;
pub mod parsed_cmd;

pub use cmd_meta::CmdMeta;
pub use cmd_table::CmdTable;
pub use cmd_trait::Cmd;
pub use parsed_cmd::ParsedCmd;
