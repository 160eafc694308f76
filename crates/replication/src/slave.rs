//! Slave-side per-database replication state machine.
//!
//! ```text
//! NotStarted -> TryConnect -> WaitReply   -> Connected
//!                          \-> TryDBSync  -> WaitDBSync -> Connected
//! any state -> TryConnect   (on error, session mismatch, or timeout)
//! ```

use storage::binlog::BinlogOffset;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlaveState {
	NotStarted,
	TryConnect,
	WaitReply,
	TryDBSync,
	WaitDBSync { snapshot_id: String },
	Connected { session_id: u64, offset: BinlogOffset },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlaveEvent {
	Start,
	MetaSyncSent,
	TrySyncAccepted { session_id: u64, offset: BinlogOffset },
	TrySyncRejected,
	DBSyncOffered { snapshot_id: String },
	DBSyncDone { session_id: u64, offset: BinlogOffset },
	BinlogApplied { offset: BinlogOffset },
	SessionMismatch,
	ConnectionLost,
	Timeout,
}

/// Per-database slave replication state machine. Holds no I/O; callers
/// drive it with events observed from the wire and read `state()` to decide
/// what to do next.
pub struct SlaveReplicator {
	db_name: String,
	state: SlaveState,
}

impl SlaveReplicator {
	pub fn new(db_name: impl Into<String>) -> Self {
		Self {
			db_name: db_name.into(),
			state: SlaveState::NotStarted,
		}
	}

	pub fn db_name(&self) -> &str {
		&self.db_name
	}

	pub fn state(&self) -> &SlaveState {
		&self.state
	}

	/// Applies one event, returning the new state. Unrecognized transitions
	/// for the current state leave the state unchanged except for the
	/// universal fallbacks (`ConnectionLost`, `SessionMismatch`, `Timeout`),
	/// which always send the machine back to `TryConnect`.
	pub fn apply(&mut self, event: SlaveEvent) -> &SlaveState {
		use SlaveEvent as E;
		use SlaveState as S;

		self.state = match (&self.state, event) {
			(_, E::ConnectionLost) | (_, E::SessionMismatch) | (_, E::Timeout) => S::TryConnect,

			(S::NotStarted, E::Start) => S::TryConnect,

			(S::TryConnect, E::MetaSyncSent) => S::WaitReply,

			(S::WaitReply, E::TrySyncAccepted { session_id, offset }) => S::Connected { session_id, offset },
			(S::WaitReply, E::TrySyncRejected) => S::TryDBSync,
			(S::WaitReply, E::DBSyncOffered { snapshot_id }) => S::WaitDBSync { snapshot_id },

			(S::TryDBSync, E::DBSyncOffered { snapshot_id }) => S::WaitDBSync { snapshot_id },

			(S::WaitDBSync { .. }, E::DBSyncDone { session_id, offset }) => S::Connected { session_id, offset },

			(S::Connected { session_id, .. }, E::BinlogApplied { offset }) => S::Connected {
				session_id: *session_id,
				offset,
			},

			(other, _) => other.clone(),
		};

		&self.state
	}

	pub fn is_connected(&self) -> bool {
		matches!(self.state, SlaveState::Connected { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_happy_path_trysync() {
		let mut slave = SlaveReplicator::new("db0");
		slave.apply(SlaveEvent::Start);
		assert_eq!(slave.state(), &SlaveState::TryConnect);
		slave.apply(SlaveEvent::MetaSyncSent);
		assert_eq!(slave.state(), &SlaveState::WaitReply);
		slave.apply(SlaveEvent::TrySyncAccepted {
			session_id: 7,
			offset: BinlogOffset::zero(),
		});
		assert!(slave.is_connected());
	}

	#[test]
	fn test_falls_back_to_dbsync_when_trysync_rejected() {
		let mut slave = SlaveReplicator::new("db0");
		slave.apply(SlaveEvent::Start);
		slave.apply(SlaveEvent::MetaSyncSent);
		slave.apply(SlaveEvent::TrySyncRejected);
		assert_eq!(slave.state(), &SlaveState::TryDBSync);

		slave.apply(SlaveEvent::DBSyncOffered {
			snapshot_id: "snap-1".to_string(),
		});
		assert_eq!(
			slave.state(),
			&SlaveState::WaitDBSync {
				snapshot_id: "snap-1".to_string()
			}
		);

		slave.apply(SlaveEvent::DBSyncDone {
			session_id: 9,
			offset: BinlogOffset::zero(),
		});
		assert!(slave.is_connected());
	}

	#[test]
	fn test_session_mismatch_resets_to_try_connect() {
		let mut slave = SlaveReplicator::new("db0");
		slave.apply(SlaveEvent::Start);
		slave.apply(SlaveEvent::MetaSyncSent);
		slave.apply(SlaveEvent::TrySyncAccepted {
			session_id: 1,
			offset: BinlogOffset::zero(),
		});
		assert!(slave.is_connected());

		slave.apply(SlaveEvent::SessionMismatch);
		assert_eq!(slave.state(), &SlaveState::TryConnect);
	}

	#[test]
	fn test_binlog_applied_advances_offset_while_connected() {
		let mut slave = SlaveReplicator::new("db0");
		slave.apply(SlaveEvent::Start);
		slave.apply(SlaveEvent::MetaSyncSent);
		slave.apply(SlaveEvent::TrySyncAccepted {
			session_id: 1,
			offset: BinlogOffset::zero(),
		});

		let next = BinlogOffset {
			filenum: 0,
			offset: 40,
			term: 0,
			index: 2,
		};
		slave.apply(SlaveEvent::BinlogApplied { offset: next });
		assert_eq!(
			slave.state(),
			&SlaveState::Connected {
				session_id: 1,
				offset: next
			}
		);
	}

	#[test]
	fn test_timeout_resets_from_any_state() {
		let mut slave = SlaveReplicator::new("db0");
		slave.apply(SlaveEvent::Start);
		slave.apply(SlaveEvent::Timeout);
		assert_eq!(slave.state(), &SlaveState::TryConnect);
	}
}
