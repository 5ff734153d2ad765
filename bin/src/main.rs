#![allow(clippy::cognitive_complexity)]
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};

mod config;
mod join;

use config::{
    cli::{self, Command, Parser},
    trace,
};
use etcd_coordination::{
    Coordination, EtcdCoordination, FromStrSerializer, HttpTransport, LockResult,
};
use tokio::{runtime::Builder, signal};
use tokio_util::sync::CancellationToken;
use tracing::*;
use tracing_futures::Instrument;

#[cfg(not(target_env = "musl"))]
use jemallocator::Jemalloc;

#[cfg(not(target_env = "musl"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn main() -> Result<()> {
    // load .env first so it can feed the cli's env fallbacks
    let dotenv_result = dotenv::dotenv();
    // parses from cli or environment var
    let config = cli::Config::parse();
    let trace_config = trace::Config::init(&config.constructr_log, &config.log_format)?;
    debug!(?config, ?trace_config);
    if let Err(err) = dotenv_result {
        debug!(?err, ".env file not loaded");
    }

    let mut builder = Builder::new_multi_thread();
    // configure thread name & enable IO/time
    builder.thread_name(&config.thread_name).enable_all();
    if let Some(num) = config.threads {
        builder.worker_threads(num);
    }
    let rt = builder.build()?;

    rt.block_on(async move {
        match tokio::spawn(async move { start(config).await }).await {
            Err(err) => Err(anyhow!(err)).context("coordination task failed"),
            Ok(result) => result,
        }
    })
}

async fn start(config: cli::Config) -> Result<()> {
    let namespace = config.namespace()?;
    info!(
        host = %config.etcd_host,
        port = config.etcd_port,
        prefix = namespace.prefix(),
        cluster = namespace.cluster_name(),
        "using coordination namespace"
    );
    let transport = HttpTransport::new(Some(config.request_timeout()))
        .context("failed to build etcd transport")?;
    let coordination =
        EtcdCoordination::new(namespace, FromStrSerializer::<SocketAddr>::new(), transport);

    match config.command {
        Command::Nodes => {
            let nodes = coordination
                .list_nodes()
                .await
                .context("failed to list nodes")?;
            debug!(count = nodes.len(), "listed nodes");
            for node in nodes {
                println!("{node}");
            }
        }
        Command::Lock { ttl } => {
            let result = coordination
                .acquire_lock(Duration::from_secs(ttl))
                .await
                .context("failed to acquire lock")?;
            match result {
                LockResult::Success => println!("acquired"),
                LockResult::Failure => println!("held"),
            }
        }
        Command::Register(args) => {
            coordination
                .register_self(&args.node, args.ttl())
                .await
                .context("failed to register self")?;
            println!("registered {}", args.node);
        }
        Command::Refresh(args) => {
            coordination
                .refresh_self(&args.node, args.ttl())
                .await
                .context("failed to refresh self")?;
            println!("refreshed {}", args.node);
        }
        Command::Join {
            node,
            refresh_interval,
        } => {
            let ttl = node.ttl();
            let interval = cli::refresh_interval(ttl, refresh_interval);
            let token = CancellationToken::new();
            let signal_task = tokio::spawn(shutdown_signal(token.clone()));

            let result = join::join(&coordination, &node.node, ttl, interval, token.clone())
                .instrument(info_span!("join", node = %node.node))
                .await;
            // stop waiting for ctrl-c if registration failed
            token.cancel();
            signal_task.abort();
            let attempts = result?;
            info!(attempts, "left cluster refresh loop");
        }
    }
    Ok(())
}

async fn shutdown_signal(token: CancellationToken) -> Result<()> {
    let ret = signal::ctrl_c().await.map_err(|err| anyhow!(err));
    token.cancel();
    ret
}
