//! Command-line and environment configuration.

use crate::commands;
use crate::logging::LogLevel;
use clap::{Args, Parser, Subcommand, ValueEnum};
use corelib::{NodeId, RingCapacity};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chord-node", version, about = "Chord ring node and admin client")]
pub struct CliConfig {
    #[arg(long, value_enum, env = "LOG_LEVEL", default_value_t = LogLevel::Info, global = true)]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a ring node until it leaves the ring.
    Serve(ServeArgs),
    /// Send one request to a running node.
    Client(ClientArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionerKind {
    Blake3,
    Sip,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// This node's ring position.
    #[arg(long, env = "NODE_ID")]
    pub node_id: NodeId,

    /// Every ring member, as `nodeX` or `X`, comma separated.
    #[arg(long, env = "ALL_NODES", value_delimiter = ',', required = true)]
    pub all_nodes: Vec<NodeId>,

    #[arg(long, env = "NODE_PORT")]
    pub node_port: u16,

    /// Name this node is reachable under.
    #[arg(long, env = "NODE_HOSTNAME")]
    pub node_hostname: String,

    #[arg(long, env = "RING_SIZE", default_value_t = RingCapacity::DEFAULT)]
    pub ring_size: u64,

    #[arg(long, env = "DATA_DIR", default_value = "/data")]
    pub data_dir: PathBuf,

    /// Peers are dialled at `{prefix}{id}:{port}`.
    #[arg(long, env = "PEER_PREFIX", default_value = "node")]
    pub peer_prefix: String,

    #[arg(long, env = "RPC_TIMEOUT_MS", default_value_t = 5_000)]
    pub rpc_timeout_ms: u64,

    /// Upper bound on waiting for a peer's reply, which may cover several
    /// downstream hops. A peer that misses it is reported slow, not dead.
    #[arg(long, env = "REPLY_TIMEOUT_MS", default_value_t = 30_000)]
    pub reply_timeout_ms: u64,

    #[arg(long, value_enum, env = "PARTITIONER", default_value_t = PartitionerKind::Blake3)]
    pub partitioner: PartitionerKind,
}

#[derive(Args, Debug, Clone)]
pub struct ClientArgs {
    /// Node to talk to, as `host:port`.
    #[arg(long, env = "CHORD_NODE", default_value = "127.0.0.1:8080")]
    pub node: String,

    #[arg(long, env = "CLIENT_TIMEOUT_MS", default_value_t = 30_000)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: ClientCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Download a file; writes to stdout unless `--output` is given.
    Get {
        name: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Upload a local file under `name`.
    Put { name: String, file: PathBuf },
    /// Overwrite or create `name` from a local file.
    Update { name: String, file: PathBuf },
    Delete { name: String },
    /// Which node owns `key`.
    Resolve { key: u64 },
    /// Print the node's finger table.
    Fingers {
        #[arg(long)]
        json: bool,
    },
    Whoami,
    /// Ask the node to leave the ring.
    Leave,
}

impl CliConfig {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Serve(args) => commands::serve(args).await,
            Command::Client(args) => commands::client(args).await,
        }
    }
}
