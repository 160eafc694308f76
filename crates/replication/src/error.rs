use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplError {
	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("frame encode/decode failed: {0}")]
	Codec(String),

	#[error("peer closed the connection")]
	Closed,

	#[error("replication session mismatch, expected {expected} got {actual}")]
	SessionMismatch { expected: u64, actual: u64 },

	#[error("leader-protected mode: not enough acked slaves")]
	Unavailable,
}
