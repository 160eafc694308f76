pub mod error;
pub mod frame;
pub mod master;
pub mod migrator;
pub mod slave;

pub use error::ReplError;
pub use frame::ReplFrame;
pub use master::MasterReplicator;
pub use migrator::MigrationStatus;
pub use migrator::Migrator;
pub use slave::SlaveReplicator;
