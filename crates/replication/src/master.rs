//! Master-side bookkeeping: per-database slave tracking and the decision of
//! which slaves are due another batch of binlog records.

use std::time::Duration;
use std::time::Instant;

use dashmap::DashMap;
use storage::binlog::BinlogOffset;

use crate::error::ReplError;

#[derive(Debug, Clone)]
pub struct SlaveHandle {
	pub session_id: u64,
	pub ack_offset: BinlogOffset,
	pub sent_offset: BinlogOffset,
	pub window: u64,
	pub last_active: Instant,
	/// Set when an ack arrives with a session id that no longer matches;
	/// the slave must re-handshake before anything else is sent to it.
	pub needs_rehandshake: bool,
}

impl SlaveHandle {
	pub fn new(session_id: u64, window: u64) -> Self {
		Self {
			session_id,
			ack_offset: BinlogOffset::zero(),
			sent_offset: BinlogOffset::zero(),
			window,
			last_active: Instant::now(),
			needs_rehandshake: false,
		}
	}

	/// Whether this slave is behind by less than its configured window and
	/// so eligible for another batch.
	pub fn has_room(&self) -> bool {
		!self.needs_rehandshake && self.sent_offset.index.saturating_sub(self.ack_offset.index) < self.window
	}

	pub fn is_idle(&self, keepalive_interval: Duration) -> bool {
		self.last_active.elapsed() > keepalive_interval
	}
}

/// Tracks, per database name, the set of slaves subscribed to that
/// database's binlog.
pub struct MasterReplicator {
	dbs: DashMap<String, DashMap<u64, SlaveHandle>>,
	keepalive_interval: Duration,
	leader_protected_min_acked_slaves: usize,
	leader_protected_window: Duration,
	started_at: Instant,
}

impl MasterReplicator {
	pub fn new(
		keepalive_interval: Duration,
		leader_protected_min_acked_slaves: usize,
		leader_protected_window: Duration,
	) -> Self {
		Self {
			dbs: DashMap::new(),
			keepalive_interval,
			leader_protected_min_acked_slaves,
			leader_protected_window,
			started_at: Instant::now(),
		}
	}

	pub fn register_slave(&self, db_name: &str, session_id: u64, window: u64) {
		self.dbs
			.entry(db_name.to_string())
			.or_default()
			.insert(session_id, SlaveHandle::new(session_id, window));
	}

	pub fn remove_slave(&self, db_name: &str, session_id: u64) {
		if let Some(slaves) = self.dbs.get(db_name) {
			slaves.remove(&session_id);
		}
	}

	/// Sessions currently eligible for another batch of binlog records.
	pub fn slaves_ready_to_send(&self, db_name: &str) -> Vec<u64> {
		let Some(slaves) = self.dbs.get(db_name) else {
			return Vec::new();
		};
		slaves
			.iter()
			.filter(|s| s.has_room())
			.map(|s| s.session_id)
			.collect()
	}

	/// Sessions idle long enough to need a keepalive record.
	pub fn slaves_needing_keepalive(&self, db_name: &str) -> Vec<u64> {
		let Some(slaves) = self.dbs.get(db_name) else {
			return Vec::new();
		};
		slaves
			.iter()
			.filter(|s| s.is_idle(self.keepalive_interval))
			.map(|s| s.session_id)
			.collect()
	}

	pub fn note_sent(&self, db_name: &str, session_id: u64, sent_offset: BinlogOffset) {
		if let Some(slaves) = self.dbs.get(db_name)
			&& let Some(mut slave) = slaves.get_mut(&session_id)
		{
			slave.sent_offset = sent_offset;
			slave.last_active = Instant::now();
		}
	}

	/// Apply an ack from a slave. A session mismatch drops the ack and
	/// flags the slave for re-handshake instead of erroring the caller.
	pub fn record_ack(
		&self,
		db_name: &str,
		session_id: u64,
		ack_session_id: u64,
		ack_offset: BinlogOffset,
	) -> Result<(), ReplError> {
		let Some(slaves) = self.dbs.get(db_name) else {
			return Ok(());
		};
		let Some(mut slave) = slaves.get_mut(&session_id) else {
			return Ok(());
		};

		if session_id != ack_session_id {
			slave.needs_rehandshake = true;
			return Err(ReplError::SessionMismatch {
				expected: session_id,
				actual: ack_session_id,
			});
		}

		if ack_offset.index >= slave.ack_offset.index {
			slave.ack_offset = ack_offset;
		}
		slave.last_active = Instant::now();
		Ok(())
	}

	pub fn acked_slave_count(&self, db_name: &str) -> usize {
		self.dbs
			.get(db_name)
			.map(|slaves| slaves.iter().filter(|s| !s.needs_rehandshake).count())
			.unwrap_or(0)
	}

	/// Leader-protected mode: refuse writes if the master hasn't observed
	/// enough acked slaves within the configured startup window.
	pub fn is_write_available(&self, db_name: &str) -> bool {
		if self.started_at.elapsed() < self.leader_protected_window {
			return true;
		}
		self.acked_slave_count(db_name) >= self.leader_protected_min_acked_slaves
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_new_slave_has_room() {
		let master = MasterReplicator::new(Duration::from_secs(5), 0, Duration::from_secs(0));
		master.register_slave("db0", 1, 10);
		assert_eq!(master.slaves_ready_to_send("db0"), vec![1]);
	}

	#[test]
	fn test_slave_outside_window_is_not_ready() {
		let master = MasterReplicator::new(Duration::from_secs(5), 0, Duration::from_secs(0));
		master.register_slave("db0", 1, 2);
		master.note_sent(
			"db0",
			1,
			BinlogOffset {
				filenum: 0,
				offset: 0,
				term: 0,
				index: 5,
			},
		);
		assert!(master.slaves_ready_to_send("db0").is_empty());
	}

	#[test]
	fn test_ack_with_wrong_session_flags_rehandshake() {
		let master = MasterReplicator::new(Duration::from_secs(5), 0, Duration::from_secs(0));
		master.register_slave("db0", 1, 10);

		let result = master.record_ack("db0", 1, 999, BinlogOffset::zero());
		assert!(result.is_err());
		assert!(master.slaves_ready_to_send("db0").is_empty());
	}

	#[test]
	fn test_ack_advances_offset() {
		let master = MasterReplicator::new(Duration::from_secs(5), 0, Duration::from_secs(0));
		master.register_slave("db0", 1, 10);

		let offset = BinlogOffset {
			filenum: 0,
			offset: 0,
			term: 0,
			index: 3,
		};
		master.record_ack("db0", 1, 1, offset).unwrap();
		assert_eq!(master.acked_slave_count("db0"), 1);
	}

	#[test]
	fn test_leader_protected_blocks_writes_with_no_acked_slaves() {
		let master = MasterReplicator::new(Duration::from_secs(5), 1, Duration::from_secs(0));
		assert!(!master.is_write_available("db0"));

		master.register_slave("db0", 1, 10);
		master
			.record_ack("db0", 1, 1, BinlogOffset::zero())
			.unwrap();
		assert!(master.is_write_available("db0"));
	}
}
