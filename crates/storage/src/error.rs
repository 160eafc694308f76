use thiserror::Error;

use crate::data_type::DataType;

#[derive(Debug, Error)]
pub enum DecoderError {
	#[error("Empty key, cannot decode")]
	Empty,
	#[error("Invalid type code")]
	InvalidType,
	#[error("Invalid data length")]
	InvalidLength,
}

#[derive(Debug, Error)]
pub enum StorageError {
	#[error("WRONGTYPE Operation against a key holding the wrong kind of value (expected {expected:?}, found {actual:?})")]
	WrongType { expected: DataType, actual: DataType },

	#[error("no such key")]
	NotFound,

	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	#[error("engine is busy, retry later")]
	Busy,

	#[error(transparent)]
	Decode(#[from] DecoderError),

	#[error(transparent)]
	Engine(#[from] slatedb::Error),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("data corruption detected: {0}")]
	Corruption(String),

	#[error("slice conversion failed: {0}")]
	SliceConversion(#[from] std::array::TryFromSliceError),

	#[error("value is not an integer or out of range")]
	NotAnInteger,

	#[error(transparent)]
	Utf8(#[from] std::str::Utf8Error),
}

impl StorageError {
	pub fn wrong_type(expected: DataType, actual: DataType) -> Self {
		StorageError::WrongType { expected, actual }
	}
}
