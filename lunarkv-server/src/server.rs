//! # Line-protocol TCP server
//!
//! Accepts connections, frames requests on `\n`, and dispatches each
//! complete line. Grounded on `original_source/server/server.cpp`'s
//! accept loop (per-client reads into a growable buffer, `max_clients`
//! enforced by rejecting the connection outright) re-expressed with a
//! tokio accept loop spawning one task per client, per the redesign
//! note to move off a thread-per-connection model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use lunarkv_engine::ShardManager;
use tracing::{info, warn};

use crate::dispatcher::{dispatch, DispatchOutcome};
use crate::metrics::Metrics;
use crate::taskqueue::TaskQueue;

const READ_CHUNK: usize = 4 * 1024;

/// Shared state every connection task needs a handle to.
pub struct ServerState {
    pub shards: ShardManager,
    pub queue: Arc<TaskQueue>,
    pub metrics: Metrics,
    pub max_clients: usize,
    client_count: AtomicUsize,
}

impl ServerState {
    pub fn new(shards: ShardManager, queue: Arc<TaskQueue>, max_clients: usize) -> Arc<Self> {
        Arc::new(ServerState {
            shards,
            queue,
            metrics: Metrics::new(),
            max_clients,
            client_count: AtomicUsize::new(0),
        })
    }
}

/// Binds `addr` and serves line-protocol connections until the process
/// is torn down. Each accepted client is handled on its own task; the
/// loop itself never returns an error for a single bad accept.
pub async fn run(addr: &str, state: Arc<ServerState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "line server listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let state = Arc::clone(&state);

        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, &state).await {
                warn!(%peer, %err, "connection ended with error");
            }
        });
    }
}

async fn handle_connection(mut stream: TcpStream, state: &ServerState) -> std::io::Result<()> {
    let current = state.client_count.fetch_add(1, Ordering::SeqCst) + 1;
    if current > state.max_clients {
        state.client_count.fetch_sub(1, Ordering::SeqCst);
        stream.write_all(b"Server at maximum capacity\n").await?;
        return Ok(());
    }

    let result = serve_client(&mut stream, state).await;
    state.client_count.fetch_sub(1, Ordering::SeqCst);
    result
}

async fn serve_client(stream: &mut TcpStream, state: &ServerState) -> std::io::Result<()> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes[..line_bytes.len() - 1]);

            state.metrics.record_request_start();
            let started = Instant::now();
            let outcome = dispatch(line.trim_end_matches('\r'), &state.shards, &state.queue);
            state.metrics.record_request_end(started.elapsed());

            match outcome {
                DispatchOutcome::Reply(resp) => {
                    if resp.starts_with("ERR") {
                        state.metrics.record_error();
                    }
                    stream.write_all(resp.as_bytes()).await?;
                }
                DispatchOutcome::Close(resp) => {
                    stream.write_all(resp.as_bytes()).await?;
                    return Ok(());
                }
            }
        }

        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
    }

    Ok(())
}
