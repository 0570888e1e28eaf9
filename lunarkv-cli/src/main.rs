//! # Interactive prompt and server entry point
//!
//! Grounded on `original_source/src/main.cpp`'s REPL (global cache,
//! task queue, background processor, shard manager wired up once at
//! startup, then a `std::getline` command loop) and its `--health`
//! flag. Argument parsing is `clap` derive and config loading is
//! `serde`/`toml` (ambient stack), in place of `argc`/`argv` and a
//! hand-rolled provider-config prompt.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};

use lunarkv_common::ServerConfig;
use lunarkv_engine::{snapshot, ShardManager};
use lunarkv_server::{dispatch, http, server, DispatchOutcome, Scheduler, ServerState, TaskQueue};

#[derive(Parser, Debug)]
#[command(name = "lunarkv", about = "LunarKV server and interactive prompt")]
struct Args {
    /// Override the configured host.
    #[arg(long)]
    host: Option<String>,
    /// Override the configured line-protocol port.
    #[arg(long)]
    port: Option<u16>,
    /// Load server settings from a TOML file before applying flags.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Run a one-shot self-check and exit 0 (healthy) or 1 (unhealthy).
    #[arg(long)]
    health: bool,
}

fn load_config(args: &Args) -> ServerConfig {
    let mut config = match &args.config {
        Some(path) => match ServerConfig::from_file(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(%err, path = %path.display(), "failed to load config file, using defaults");
                ServerConfig::default()
            }
        },
        None => ServerConfig::default(),
    };

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    config
}

/// Sets, gets, and deletes one well-known key, mirroring `checkHealth()`.
fn run_health_check(shards: &ShardManager) -> bool {
    let key = b"__lunarkv_health__".to_vec();
    let wrote = shards.set(key.clone(), b"ok".to_vec(), 0).is_ok();
    let read_back = shards
        .get(&key)
        .map(|value| value.as_deref() == Some(b"ok".as_slice()))
        .unwrap_or(false);
    let removed = shards.del(&key).unwrap_or(false);
    wrote && read_back && removed
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let config = load_config(&args);

    if args.health {
        let shards = ShardManager::new(config.shard_count, config.capacity_per_shard)?;
        if run_health_check(&shards) {
            println!("healthy");
            std::process::exit(0);
        } else {
            println!("unhealthy");
            std::process::exit(1);
        }
    }

    let shards = match ShardManager::new(config.shard_count, config.capacity_per_shard) {
        Ok(shards) => shards,
        Err(err) => {
            error!(%err, "failed to initialize shard manager");
            std::process::exit(1);
        }
    };
    let queue = TaskQueue::new(config.worker_threads);
    let state = ServerState::new(shards, queue, config.max_clients);

    let scheduler = Scheduler::new();
    {
        let state = Arc::clone(&state);
        scheduler.schedule(Duration::from_secs(5 * 60), move || {
            let removed = state.shards.cleanup_expired();
            info!(removed, "scheduled cleanup sweep");
        });
    }
    {
        let state = Arc::clone(&state);
        let snapshot_path = config.snapshot_path.clone();
        scheduler.schedule(Duration::from_secs(15 * 60), move || {
            match snapshot::save(&state.shards, std::path::Path::new(&snapshot_path)) {
                Ok(()) => info!(path = %snapshot_path, "autosave snapshot written"),
                Err(err) => error!(%err, "autosave snapshot failed"),
            }
        });
    }
    scheduler.start();

    let line_addr = format!("{}:{}", config.host, config.port);
    let http_addr = format!("{}:{}", config.host, config.http_port);

    let line_state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(err) = server::run(&line_addr, line_state).await {
            error!(%err, "line server exited");
        }
    });

    let http_state = Arc::clone(&state);
    tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(&http_addr).await {
            Ok(listener) => listener,
            Err(err) => {
                error!(%err, %http_addr, "failed to bind http listener");
                return;
            }
        };
        if let Err(err) = axum::serve(listener, http::router(http_state)).await {
            error!(%err, "http server exited");
        }
    });

    println!("LunarDB! A Redis-like cache database, reborn in Rust.");
    print_help();

    let repl_state = Arc::clone(&state);
    let exit_code = tokio::task::spawn_blocking(move || repl(repl_state)).await?;

    scheduler.stop();
    state.queue.stop();
    std::process::exit(exit_code);
}

fn repl(state: Arc<ServerState>) -> i32 {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        if stdout.flush().is_err() {
            return 0;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return 0,
            Ok(_) => {}
            Err(_) => return 0,
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.trim().is_empty() {
            continue;
        }
        if trimmed.trim().eq_ignore_ascii_case("HELP") {
            print_help();
            continue;
        }

        match dispatch(trimmed, &state.shards, &state.queue) {
            DispatchOutcome::Reply(resp) => print!("{resp}"),
            DispatchOutcome::Close(resp) => {
                print!("{resp}");
                return 0;
            }
        }
    }
}

fn print_help() {
    println!(
        "Commands: SET k v [ttl] | GET k | DEL k | MSET k1 v1 ... | MGET k1 ... | KEYS | CLEAR |\n\
         SIZE | CLEANUP | SAVE path | LOAD path | LPUSH/RPUSH k v | LPOP/RPOP k | LRANGE k s e |\n\
         LLEN k | PING | THREADS | SHARD INFO|LOCATE k|REBALANCE n | HELP | QUIT"
    );
}
