mod replication_net;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use command::CmdTable;
use command::ParsedCmd;
use config::Cli;
use config::Parser;
use config::SERVER_CONF;
use replication::MasterReplicator;
use resp::RespEncoder;
use resp::RespParseResult;
use resp::RespParser;
use resp::RespValue;
use storage::Storage;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;

/// Commands whose successful execution mutates data and so must be
/// streamed to slaves. Administrative slot/migration commands and `CONFIG
/// SET` are deliberately excluded: they mutate local state that has no
/// business being replayed verbatim on a peer.
const REPLICATED_WRITE_COMMANDS: &[&str] = &[
	"SET", "DEL", "EXPIRE", "PEXPIREAT", "INCR", "DECR", "APPEND", "FLUSHDB", "HSET", "HDEL", "SADD", "SREM", "LPUSH",
	"RPUSH", "LPOP", "RPOP", "ZADD", "ZREM",
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let args = Cli::parse();
	telemetry::logger::init(&args.log_level);
	config::setup(args);

	let conf = SERVER_CONF.load();
	let storage = Arc::new(Storage::open(&conf.data_path, None).await?);
	storage.set_slotmigrate(conf.slotmigrate);

	let cmd_table = Arc::new(CmdTable::new(storage.clone()));
	let replicator = Arc::new(MasterReplicator::new(
		Duration::from_millis(100),
		conf.leader_protected_min_acked_slaves,
		Duration::from_secs(conf.leader_protected_window_secs),
	));

	let listener = TcpListener::bind(&conf.addr).await?;
	log::info!("corvid-server listening on {}", conf.addr);

	tokio::spawn(replication_tick(replicator.clone()));

	if conf.classic_mode {
		let client_addr: SocketAddr = conf.addr.parse()?;
		let repl_addr = SocketAddr::new(client_addr.ip(), client_addr.port() + 1);
		let repl_listener = TcpListener::bind(repl_addr).await?;
		log::info!("replication listening on {}", repl_addr);
		tokio::spawn(replication_net::run_master_listener(repl_listener, storage.clone(), replicator.clone()));
	}

	if !conf.replicaof.is_empty() {
		// `replicaof` names the master's client-facing address; replication
		// traffic itself goes to that same host, one port up.
		let master_client_addr: SocketAddr = conf.replicaof.parse()?;
		let master_repl_addr = SocketAddr::new(master_client_addr.ip(), master_client_addr.port() + 1);
		tokio::spawn(replication_net::run_slave(
			master_repl_addr,
			"db0".to_string(),
			storage.clone(),
			cmd_table.clone(),
		));
	}

	loop {
		let (socket, peer) = listener.accept().await?;
		let storage = storage.clone();
		let cmd_table = cmd_table.clone();
		let replicator = replicator.clone();

		tokio::spawn(async move {
			if let Err(e) = handle_client(socket, storage, cmd_table, replicator).await {
				log::warn!("client {} disconnected: {}", peer, e);
			}
		});
	}
}

/// Periodically steps housekeeping that doesn't belong to any one client
/// connection: slave keepalive timeouts, leader-protected-mode gating. Peer
/// socket I/O for the handshake/binlog-sync itself belongs to the
/// replication listener, not to this tick.
async fn replication_tick(replicator: Arc<MasterReplicator>) {
	let mut interval = tokio::time::interval(Duration::from_millis(100));
	loop {
		interval.tick().await;
		let _ = replicator.slaves_needing_keepalive("db0");
	}
}

async fn handle_client(
	mut socket: TcpStream,
	storage: Arc<Storage>,
	cmd_table: Arc<CmdTable>,
	replicator: Arc<MasterReplicator>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	let mut buffer = BytesMut::with_capacity(4096);
	let mut parser = RespParser::new();
	let mut authenticated = SERVER_CONF.load().requirepass.is_empty();

	loop {
		let n = socket.read_buf(&mut buffer).await?;
		if n == 0 {
			return if buffer.is_empty() {
				Ok(())
			} else {
				Err("connection closed with a partial request".into())
			};
		}

		loop {
			match parser.parse(&mut buffer) {
				RespParseResult::Complete(value) => {
					let response = match ParsedCmd::try_from(value) {
						Ok(parsed) => {
							let is_write = REPLICATED_WRITE_COMMANDS.contains(&parsed.name.as_str());
							if !authenticated && parsed.name != "AUTH" {
								RespValue::error("NOAUTH Authentication required")
							} else if is_write && !replicator.is_write_available("db0") {
								RespValue::error("UNAVAILABLE leader-protected mode: not enough acked replicas")
							} else {
								let is_auth = parsed.name == "AUTH";
								let name = parsed.name.clone();
								let args = parsed.args.clone();
								let response = dispatch(&cmd_table, &storage, parsed).await;
								if is_auth && matches!(&response, RespValue::SimpleString(s) if s == "OK") {
									authenticated = true;
								}
								if is_write && !matches!(&response, RespValue::Error(_)) {
									let _ = storage.append_binlog(&name, &args).await;
								}
								response
							}
						}
						Err(e) => RespValue::error(format!("ERR {}", e)),
					};
					let encoded = response.encode()?;
					socket.write_all(&encoded).await?;
				}
				RespParseResult::Incomplete => break,
				RespParseResult::Error(e) => {
					let encoded = RespValue::error(format!("ERR Protocol error: {}", e)).encode()?;
					socket.write_all(&encoded).await?;
					return Err(e.into());
				}
			}
		}
	}
}

async fn dispatch(cmd_table: &CmdTable, storage: &Arc<Storage>, parsed: ParsedCmd) -> RespValue {
	match cmd_table.get_cmd(&parsed.name) {
		Some(cmd) => cmd.execute(storage, &parsed.args).await,
		None => RespValue::error(format!("ERR unknown command '{}'", parsed.name)),
	}
}
