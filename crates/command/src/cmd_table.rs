use std::collections::HashMap;
use std::sync::Arc;

use replication::Migrator;
use storage::Storage;

use crate::Cmd;
use crate::cmd_config::ConfigCmd;
use crate::cmd_hash::HDelCmd;
use crate::cmd_hash::HGetAllCmd;
use crate::cmd_hash::HGetCmd;
use crate::cmd_hash::HLenCmd;
use crate::cmd_hash::HMGetCmd;
use crate::cmd_hash::HSetCmd;
use crate::cmd_list::LLenCmd;
use crate::cmd_list::LPopCmd;
use crate::cmd_list::LPushCmd;
use crate::cmd_list::LRangeCmd;
use crate::cmd_list::RPopCmd;
use crate::cmd_list::RPushCmd;
use crate::cmd_set::SAddCmd;
use crate::cmd_set::SCardCmd;
use crate::cmd_set::SIsMemberCmd;
use crate::cmd_set::SMembersCmd;
use crate::cmd_set::SRemCmd;
use crate::cmd_slots::SlotsDelCmd;
use crate::cmd_slots::SlotsHashKeyCmd;
use crate::cmd_slots::SlotsInfoCmd;
use crate::cmd_slots::SlotsMgrtAsyncCancelCmd;
use crate::cmd_slots::SlotsMgrtAsyncCmd;
use crate::cmd_slots::SlotsMgrtAsyncStatusCmd;
use crate::cmd_slots::SlotsMgrtTagOneCmd;
use crate::cmd_slots::SlotsMgrtTagSlotCmd;
use crate::cmd_string::AppendCmd;
use crate::cmd_string::AuthCmd;
use crate::cmd_string::DecrCmd;
use crate::cmd_string::DelCmd;
use crate::cmd_string::ExistsCmd;
use crate::cmd_string::ExpireCmd;
use crate::cmd_string::FlushDbCmd;
use crate::cmd_string::GetCmd;
use crate::cmd_string::IncrCmd;
use crate::cmd_string::PexpireAtCmd;
use crate::cmd_string::PingCmd;
use crate::cmd_string::SetCmd;
use crate::cmd_string::TtlCmd;
use crate::cmd_zset::ZAddCmd;
use crate::cmd_zset::ZCardCmd;
use crate::cmd_zset::ZRangeCmd;
use crate::cmd_zset::ZRemCmd;
use crate::cmd_zset::ZScoreCmd;

/// Dispatch table from uppercased command name to its implementation.
pub struct CmdTable {
	inner: HashMap<String, Arc<dyn Cmd>>,
	pub migrator: Arc<Migrator>,
}

impl CmdTable {
	pub fn new(storage: Arc<Storage>) -> Self {
		let migrator = Arc::new(Migrator::new(storage));
		let mut inner: HashMap<String, Arc<dyn Cmd>> = HashMap::new();

		macro_rules! register {
			($($cmd:expr),* $(,)?) => {
				$(
					let cmd: Arc<dyn Cmd> = Arc::new($cmd);
					inner.insert(cmd.meta().name.clone(), cmd);
				)*
			};
		}

		register!(
			AuthCmd::default(),
			ConfigCmd::default(),
			GetCmd::default(),
			SetCmd::default(),
			DelCmd::default(),
			ExistsCmd::default(),
			ExpireCmd::default(),
			PexpireAtCmd::default(),
			TtlCmd::default(),
			IncrCmd::default(),
			DecrCmd::default(),
			AppendCmd::default(),
			FlushDbCmd::default(),
			PingCmd::default(),
			HSetCmd::default(),
			HGetCmd::default(),
			HLenCmd::default(),
			HMGetCmd::default(),
			HGetAllCmd::default(),
			HDelCmd::default(),
			SAddCmd::default(),
			SMembersCmd::default(),
			SIsMemberCmd::default(),
			SRemCmd::default(),
			SCardCmd::default(),
			LPushCmd::default(),
			RPushCmd::default(),
			LPopCmd::default(),
			RPopCmd::default(),
			LLenCmd::default(),
			LRangeCmd::default(),
			ZAddCmd::default(),
			ZRangeCmd::default(),
			ZScoreCmd::default(),
			ZRemCmd::default(),
			ZCardCmd::default(),
			SlotsInfoCmd::default(),
			SlotsHashKeyCmd::default(),
			SlotsDelCmd::default(),
		);

		inner.insert(
			"SLOTSMGRTTAGONE".to_string(),
			Arc::new(SlotsMgrtTagOneCmd::new(migrator.clone())),
		);
		inner.insert(
			"SLOTSMGRTTAGSLOT".to_string(),
			Arc::new(SlotsMgrtTagSlotCmd::new(migrator.clone())),
		);
		inner.insert(
			"SLOTSMGRTTAGSLOT-ASYNC".to_string(),
			Arc::new(SlotsMgrtAsyncCmd::new(migrator.clone())),
		);
		inner.insert(
			"SLOTSMGRT-ASYNC-STATUS".to_string(),
			Arc::new(SlotsMgrtAsyncStatusCmd::new(migrator.clone())),
		);
		inner.insert(
			"SLOTSMGRT-ASYNC-CANCEL".to_string(),
			Arc::new(SlotsMgrtAsyncCancelCmd::new(migrator.clone())),
		);

		Self { inner, migrator }
	}

	pub fn get_cmd(&self, name: &str) -> Option<&Arc<dyn Cmd>> {
		self.inner.get(name)
	}
}
