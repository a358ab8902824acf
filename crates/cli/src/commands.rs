//! `serve` and `client` implementations.

use crate::config::{ClientArgs, ClientCommand, PartitionerKind, ServeArgs};
use anyhow::{bail, Context};
use corelib::partitioner::{Blake3Partitioner, SipPartitioner};
use corelib::{Key, NodeState, Partitioner, RingCapacity};
use routing::{ChordNode, FsBlobStore, Request, Response, RouteError};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use streaming::{PeerDirectory, StreamReceiver, StreamSender, TcpTransport};

/// Run a node until it completes a controlled leave.
pub async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let capacity = RingCapacity::new(args.ring_size)?;
    let state = NodeState::new(args.node_id, capacity, args.all_nodes.iter().copied())
        .context("invalid ring configuration")?;
    tracing::info!(
        node = %args.node_id,
        hostname = %args.node_hostname,
        port = args.node_port,
        members = ?state.membership().ids(),
        ring_size = capacity.get(),
        "starting chord node"
    );

    let partitioner: Arc<dyn Partitioner> = match args.partitioner {
        PartitionerKind::Blake3 => Arc::new(Blake3Partitioner),
        PartitionerKind::Sip => Arc::new(SipPartitioner),
    };
    let sender = StreamSender::new(
        Duration::from_millis(args.rpc_timeout_ms),
        Duration::from_millis(args.reply_timeout_ms),
    );
    let transport = TcpTransport::new(
        PeerDirectory::template(args.peer_prefix.clone(), args.node_port),
        sender,
    );
    let node = ChordNode::builder(state)
        .partitioner(partitioner)
        .store(Arc::new(FsBlobStore::new(&args.data_dir)))
        .transport(Arc::new(transport))
        .build()?;

    tracing::info!("\n{}", node.describe_finger_table());
    let owned = node.owned_names().await?;
    tracing::info!(
        node = %node.id(),
        data_dir = %args.data_dir.display(),
        count = owned.len(),
        names = ?owned,
        "files this node is responsible for"
    );

    let receiver = StreamReceiver::bind(("0.0.0.0", args.node_port), node.clone()).await?;
    tokio::select! {
        result = receiver.run() => result?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::warn!(node = %node.id(), "interrupted, exiting without leaving the ring");
            return Ok(());
        }
    }
    tracing::info!(node = %node.id(), "left the ring, exiting");
    Ok(())
}

/// Send one admin request and print the answer.
pub async fn client(args: ClientArgs) -> anyhow::Result<()> {
    let timeout = Duration::from_millis(args.timeout_ms);
    let sender = StreamSender::new(timeout, timeout);
    let request = build_request(&args.command).await?;

    let reply = sender
        .call(&args.node, request)
        .await
        .with_context(|| format!("no answer from {}", args.node))?;
    let response = reply.map_err(RouteError::from)?;
    print_response(&args.command, response).await
}

async fn build_request(command: &ClientCommand) -> anyhow::Result<Request> {
    let request = match command {
        ClientCommand::Get { name, .. } => Request::Fetch { name: name.clone() },
        ClientCommand::Put { name, file } => Request::Store {
            name: name.clone(),
            content: tokio::fs::read(file)
                .await
                .with_context(|| format!("reading {}", file.display()))?,
        },
        ClientCommand::Update { name, file } => Request::Update {
            name: name.clone(),
            content: tokio::fs::read(file)
                .await
                .with_context(|| format!("reading {}", file.display()))?,
        },
        ClientCommand::Delete { name } => Request::Delete { name: name.clone() },
        ClientCommand::Resolve { key } => Request::Resolve { key: Key(*key) },
        ClientCommand::Fingers { json: false } => Request::DescribeFingerTable,
        ClientCommand::Fingers { json: true } => Request::DescribeRing,
        ClientCommand::Whoami => Request::GetNodeId,
        ClientCommand::Leave => Request::RequestLeave,
    };
    Ok(request)
}

async fn print_response(command: &ClientCommand, response: Response) -> anyhow::Result<()> {
    match (command, response) {
        (ClientCommand::Get { output: Some(path), .. }, Response::Content(bytes)) => {
            tokio::fs::write(path, &bytes)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("wrote {} bytes to {}", bytes.len(), path.display());
        }
        (ClientCommand::Get { output: None, .. }, Response::Content(bytes)) => {
            std::io::stdout().write_all(&bytes)?;
        }
        (ClientCommand::Put { name, .. }, Response::Ack) => println!("uploaded {name}"),
        (ClientCommand::Update { name, .. }, Response::Created(created)) => {
            if created {
                println!("created {name}");
            } else {
                println!("updated {name}");
            }
        }
        (ClientCommand::Delete { name }, Response::Ack) => println!("deleted {name}"),
        (ClientCommand::Resolve { key }, Response::Node(owner)) => {
            println!("key {key} is owned by node {owner}")
        }
        (ClientCommand::Whoami, Response::Node(id)) => println!("{id}"),
        (ClientCommand::Fingers { json: true }, Response::Ring(summary)) => {
            println!("{}", serde_json::to_string_pretty(&summary)?)
        }
        (_, Response::Text(text)) => println!("{text}"),
        (command, other) => bail!("unexpected answer {other:?} to {command:?}"),
    }
    Ok(())
}
