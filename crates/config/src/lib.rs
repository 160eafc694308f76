//! Configuration module for corvid server
//!
//! This module provides dynamic configuration management with support for
//! both immutable and mutable configuration fields. Configuration changes
//! can trigger callbacks for side effects like reloading the log level.
//!
//! # Example
//!
//! ```no_run
//! use config::{Cli, Parser, SERVER_CONF, setup};
//!
//! // Initialize from CLI arguments
//! setup(Cli::parse());
//!
//! // Access configuration
//! let config = SERVER_CONF.load();
//! println!("Server address: {}", config.addr);
//! ```

use std::str::FromStr;
use std::sync::Arc;
use std::sync::OnceLock;

use arc_swap::ArcSwap;
pub use clap::Parser;
pub use config_derive::OnlineConfig;

/// Command-line arguments for the server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
	/// Port to listen on
	#[arg(short, long, default_value_t = 6379)]
	pub port: u16,

	/// Host to bind to
	#[arg(long, default_value = "127.0.0.1")]
	pub host: String,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	pub log_level: String,

	/// Directory for the storage engine's data files
	#[arg(long, default_value = "./corvid_data")]
	pub data_path: String,

	/// Maintain the slot-index for SLOTSMGRT* migration commands
	#[arg(long, default_value_t = false)]
	pub slotmigrate: bool,

	/// Run the master/slave meta-sync + trysync handshake
	#[arg(long, default_value_t = false)]
	pub classic_mode: bool,

	/// Shared secret required for migration and client auth
	#[arg(long, default_value = "")]
	pub requirepass: String,

	/// Master address ("host:port") to replicate from. Empty runs as a master only.
	#[arg(long, default_value = "")]
	pub replicaof: String,

	/// Minimum acked slaves required, past the startup window, to accept writes.
	#[arg(long, default_value_t = 0)]
	pub leader_protected_min_acked_slaves: usize,

	/// Startup grace period, in seconds, before leader-protected mode applies.
	#[arg(long, default_value_t = 5)]
	pub leader_protected_window_secs: u64,
}

#[derive(Debug, Clone, OnlineConfig)]
pub struct ServerConfig {
	#[online_config(immutable)]
	pub addr: String,
	#[online_config(immutable)]
	pub data_path: String,
	// Support redis-benchmark
	#[online_config(immutable)]
	pub save: String,
	#[online_config(immutable)]
	pub appendonly: String,
	#[online_config(callback = "on_log_level_change")]
	pub log_level: String,
	/// Maintain the advisory `_internal:slotkey:4migrate:<slot>` index on every write.
	#[online_config(mutable)]
	pub slotmigrate: bool,
	/// Run the master/slave meta-sync + trysync handshake; off runs bare per-database state machines.
	#[online_config(immutable)]
	pub classic_mode: bool,
	/// Shared secret required for migration and client auth. Empty disables the check.
	#[online_config(mutable)]
	pub requirepass: String,
	/// Commands slower than this many microseconds are captured in the slow log. -1 disables.
	#[online_config(mutable)]
	pub slowlog_slower_than_us: i64,
	/// One of "none", "read", "readwrite".
	#[online_config(mutable)]
	pub cache_model: String,
	/// Master address ("host:port") to replicate from. Empty runs as a master only.
	#[online_config(immutable)]
	pub replicaof: String,
	/// Minimum acked slaves required, past the startup window, to accept writes. 0 disables.
	#[online_config(mutable)]
	pub leader_protected_min_acked_slaves: usize,
	/// Startup grace period, in seconds, before leader-protected mode applies.
	#[online_config(mutable)]
	pub leader_protected_window_secs: u64,
}

impl ServerConfig {
	fn on_log_level_change(&self) -> Result<(), String> {
		telemetry::logger::reload_log_level(&self.log_level).map_err(|e| e.to_string())
	}
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			addr: "127.0.0.1:6379".to_string(),
			data_path: "./corvid_data".to_string(),
			save: "".to_string(),
			appendonly: "no".to_string(),
			log_level: "info".to_string(),
			slotmigrate: false,
			classic_mode: false,
			requirepass: "".to_string(),
			slowlog_slower_than_us: -1,
			cache_model: "none".to_string(),
			replicaof: "".to_string(),
			leader_protected_min_acked_slaves: 0,
			leader_protected_window_secs: 5,
		}
	}
}

pub struct GlobalConfig {
	inner: OnceLock<ArcSwap<ServerConfig>>,
}

impl Default for GlobalConfig {
	fn default() -> Self {
		Self::new()
	}
}

impl GlobalConfig {
	pub const fn new() -> Self {
		Self {
			inner: OnceLock::new(),
		}
	}

	pub fn init(&self, config: ServerConfig) {
		let _ = self.inner.set(ArcSwap::from_pointee(config));
	}

	pub fn load(&self) -> arc_swap::Guard<Arc<ServerConfig>> {
		self.inner.get().expect("Config is not initialized").load()
	}

	/// Update the configuration with a new one
	pub fn update(&self, new_config: ServerConfig) {
		self.inner
			.get()
			.expect("Config is not initialized")
			.store(Arc::new(new_config));
	}
}

pub static SERVER_CONF: GlobalConfig = GlobalConfig::new();

/// Helper macro to access server configuration fields
///
/// Usage: `server_config!(field_name)`
#[macro_export]
macro_rules! server_config {
	($field:ident) => {
		&$crate::SERVER_CONF.load().$field
	};
}

/// Setup configuration from CLI arguments
pub fn setup(args: Cli) {
	let addr = format!("{}:{}", args.host, args.port);

	let config = ServerConfig {
		addr,
		data_path: args.data_path.clone(),
		log_level: args.log_level.clone(),
		slotmigrate: args.slotmigrate,
		classic_mode: args.classic_mode,
		requirepass: args.requirepass.clone(),
		replicaof: args.replicaof.clone(),
		leader_protected_min_acked_slaves: args.leader_protected_min_acked_slaves,
		leader_protected_window_secs: args.leader_protected_window_secs,
		..ServerConfig::default()
	};

	SERVER_CONF.init(config);
}
