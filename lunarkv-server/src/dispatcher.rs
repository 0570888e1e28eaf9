//! # Command dispatcher
//!
//! A pure function that turns a whitespace-tokenized line into a
//! response, given a shard manager and task queue. Transport adapters
//! (the line server, the interactive prompt) call this directly; the
//! HTTP surface calls the shard manager directly to build structured
//! JSON instead of reparsing line-protocol text (see DESIGN.md).
//!
//! Grounded on `original_source/src/main.cpp`'s REPL command switch and
//! `original_source/server/server.cpp`'s `processCommand` (tokenize,
//! uppercase command, dispatch, `"ERR " + what()` on failure), per the
//! redesign note to factor a pure dispatcher out from any one
//! transport.

use lunarkv_common::HkvError;
use lunarkv_engine::ShardManager;

use crate::taskqueue::TaskQueue;

/// What the caller should do after a command runs.
pub enum DispatchOutcome {
    /// Keep the connection open; write this response.
    Reply(String),
    /// Write this response, then close the connection (`QUIT`).
    Close(String),
}

const NIL: &str = "(nil)";
const EMPTY_LIST: &str = "(empty list)";

pub fn dispatch(line: &str, shards: &ShardManager, queue: &TaskQueue) -> DispatchOutcome {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return DispatchOutcome::Reply(err_line("empty command"));
    }

    let cmd = tokens[0].to_ascii_uppercase();
    let args = &tokens[1..];

    let reply = match cmd.as_str() {
        "PING" => "PONG!".to_string(),
        "QUIT" => return DispatchOutcome::Close("OK".to_string() + "\n"),
        "SET" => cmd_set(args, shards),
        "GET" => cmd_get(args, shards),
        "DEL" => cmd_del(args, shards),
        "MSET" => cmd_mset(args, shards),
        "MGET" => cmd_mget(args, shards),
        "KEYS" => cmd_keys(args, shards),
        "CLEAR" => cmd_clear(args, shards),
        "SIZE" => cmd_size(args, shards),
        "CLEANUP" => cmd_cleanup(args, shards),
        "SAVE" => cmd_save(args, shards),
        "LOAD" => cmd_load(args, shards),
        "LPUSH" => cmd_push(args, shards, true),
        "RPUSH" => cmd_push(args, shards, false),
        "LPOP" => cmd_pop(args, shards, true),
        "RPOP" => cmd_pop(args, shards, false),
        "LRANGE" => cmd_lrange(args, shards),
        "LLEN" => cmd_llen(args, shards),
        "THREADS" => cmd_threads(args, queue),
        "SHARD" => cmd_shard(args, shards),
        _ => err_line("Unknown command"),
    };

    DispatchOutcome::Reply(reply)
}

fn arity_err(name: &str) -> String {
    err_line(&format!("wrong number of arguments for '{name}'"))
}

fn err_line(message: &str) -> String {
    format!("ERR {message}\n")
}

fn engine_err_line(err: HkvError) -> String {
    match err {
        HkvError::WrongType => err_line("WRONGTYPE operation against the wrong kind of entry"),
        other => err_line(&other.to_string()),
    }
}

fn parse_u64(raw: &str) -> Result<u64, String> {
    raw.parse::<u64>().map_err(|_| err_line("invalid integer"))
}

fn parse_i64(raw: &str) -> Result<i64, String> {
    raw.parse::<i64>().map_err(|_| err_line("invalid integer"))
}

fn cmd_set(args: &[&str], shards: &ShardManager) -> String {
    if args.len() != 2 && args.len() != 3 {
        return arity_err("SET");
    }

    let ttl = if args.len() == 3 {
        match parse_u64(args[2]) {
            Ok(value) => value,
            Err(resp) => return resp,
        }
    } else {
        0
    };

    match shards.set(args[0].as_bytes().to_vec(), args[1].as_bytes().to_vec(), ttl) {
        Ok(()) => "OK\n".to_string(),
        Err(err) => engine_err_line(err),
    }
}

fn cmd_get(args: &[&str], shards: &ShardManager) -> String {
    if args.len() != 1 {
        return arity_err("GET");
    }
    match shards.get(args[0].as_bytes()) {
        Ok(Some(value)) => format!("{}\n", String::from_utf8_lossy(&value)),
        Ok(None) => format!("{NIL}\n"),
        Err(err) => engine_err_line(err),
    }
}

fn cmd_del(args: &[&str], shards: &ShardManager) -> String {
    if args.len() != 1 {
        return arity_err("DEL");
    }
    match shards.del(args[0].as_bytes()) {
        Ok(true) => "OK\n".to_string(),
        Ok(false) => format!("{NIL}\n"),
        Err(err) => engine_err_line(err),
    }
}

fn cmd_mset(args: &[&str], shards: &ShardManager) -> String {
    if args.is_empty() || args.len() % 2 != 0 {
        return arity_err("MSET");
    }
    let pairs = args
        .chunks(2)
        .map(|pair| (pair[0].as_bytes().to_vec(), pair[1].as_bytes().to_vec()))
        .collect();

    match shards.mset(pairs) {
        Ok(()) => "OK\n".to_string(),
        Err(err) => engine_err_line(err),
    }
}

fn cmd_mget(args: &[&str], shards: &ShardManager) -> String {
    if args.is_empty() {
        return arity_err("MGET");
    }
    let keys: Vec<Vec<u8>> = args.iter().map(|k| k.as_bytes().to_vec()).collect();
    match shards.mget(&keys) {
        Ok(values) => {
            let mut out = String::new();
            for value in values {
                match value {
                    Some(bytes) => out.push_str(&String::from_utf8_lossy(&bytes)),
                    None => out.push_str(NIL),
                }
                out.push('\n');
            }
            out
        }
        Err(err) => engine_err_line(err),
    }
}

fn cmd_keys(args: &[&str], shards: &ShardManager) -> String {
    if !args.is_empty() {
        return arity_err("KEYS");
    }
    let keys = shards.keys();
    if keys.is_empty() {
        return format!("{EMPTY_LIST}\n");
    }
    let mut out = String::new();
    for key in keys {
        out.push_str(&String::from_utf8_lossy(&key));
        out.push('\n');
    }
    out
}

fn cmd_clear(args: &[&str], shards: &ShardManager) -> String {
    if !args.is_empty() {
        return arity_err("CLEAR");
    }
    shards.clear();
    "OK\n".to_string()
}

fn cmd_size(args: &[&str], shards: &ShardManager) -> String {
    if !args.is_empty() {
        return arity_err("SIZE");
    }
    format!("{}\n", shards.size())
}

fn cmd_cleanup(args: &[&str], shards: &ShardManager) -> String {
    if !args.is_empty() {
        return arity_err("CLEANUP");
    }
    shards.cleanup_expired();
    "OK\n".to_string()
}

fn cmd_save(args: &[&str], shards: &ShardManager) -> String {
    if args.len() != 1 {
        return arity_err("SAVE");
    }
    match lunarkv_engine::snapshot::save(shards, std::path::Path::new(args[0])) {
        Ok(()) => "OK\n".to_string(),
        Err(err) => engine_err_line(err),
    }
}

fn cmd_load(args: &[&str], shards: &ShardManager) -> String {
    if args.len() != 1 {
        return arity_err("LOAD");
    }
    match lunarkv_engine::snapshot::load(shards, std::path::Path::new(args[0])) {
        Ok(_) => "OK\n".to_string(),
        Err(err) => engine_err_line(err),
    }
}

fn cmd_push(args: &[&str], shards: &ShardManager, front: bool) -> String {
    let name = if front { "LPUSH" } else { "RPUSH" };
    if args.len() != 2 {
        return arity_err(name);
    }
    let key = args[0].as_bytes().to_vec();
    let value = args[1].as_bytes().to_vec();
    let result = if front { shards.lpush(key, value) } else { shards.rpush(key, value) };
    match result {
        Ok(()) => "OK\n".to_string(),
        Err(err) => engine_err_line(err),
    }
}

fn cmd_pop(args: &[&str], shards: &ShardManager, front: bool) -> String {
    let name = if front { "LPOP" } else { "RPOP" };
    if args.len() != 1 {
        return arity_err(name);
    }
    let result = if front { shards.lpop(args[0].as_bytes()) } else { shards.rpop(args[0].as_bytes()) };
    match result {
        Ok(Some(value)) => format!("{}\n", String::from_utf8_lossy(&value)),
        Ok(None) => format!("{NIL}\n"),
        Err(err) => engine_err_line(err),
    }
}

fn cmd_lrange(args: &[&str], shards: &ShardManager) -> String {
    if args.len() != 3 {
        return arity_err("LRANGE");
    }
    let start = match parse_i64(args[1]) {
        Ok(value) => value,
        Err(resp) => return resp,
    };
    let stop = match parse_i64(args[2]) {
        Ok(value) => value,
        Err(resp) => return resp,
    };

    match shards.lrange(args[0].as_bytes(), start, stop) {
        Ok(items) if items.is_empty() => format!("{EMPTY_LIST}\n"),
        Ok(items) => {
            let mut out = String::new();
            for item in items {
                out.push_str(&String::from_utf8_lossy(&item));
                out.push('\n');
            }
            out
        }
        Err(err) => engine_err_line(err),
    }
}

fn cmd_llen(args: &[&str], shards: &ShardManager) -> String {
    if args.len() != 1 {
        return arity_err("LLEN");
    }
    match shards.llen(args[0].as_bytes()) {
        Ok(len) => format!("{len}\n"),
        Err(err) => engine_err_line(err),
    }
}

fn cmd_threads(args: &[&str], queue: &TaskQueue) -> String {
    if !args.is_empty() {
        return arity_err("THREADS");
    }
    format!("{}\n{}\n", queue.active_count(), queue.queue_size())
}

fn cmd_shard(args: &[&str], shards: &ShardManager) -> String {
    if args.is_empty() {
        return arity_err("SHARD");
    }

    match args[0].to_ascii_uppercase().as_str() {
        "INFO" => format!(
            "shards: {}\nkeys: {}\n",
            shards.get_shard_count(),
            shards.get_total_key_count()
        ),
        "LOCATE" => {
            if args.len() != 2 {
                return arity_err("SHARD LOCATE");
            }
            format!("{}\n", shards.get_shard_index(args[1].as_bytes()))
        }
        "REBALANCE" => {
            if args.len() != 2 {
                return arity_err("SHARD REBALANCE");
            }
            let count = match args[1].parse::<usize>() {
                Ok(value) => value,
                Err(_) => return err_line("invalid shard count"),
            };
            match shards.rebalance(count) {
                Ok(()) => "OK\n".to_string(),
                Err(err) => engine_err_line(err),
            }
        }
        _ => err_line("Unknown SHARD subcommand"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn harness() -> (ShardManager, std::sync::Arc<TaskQueue>) {
        (ShardManager::new(4, 1000).unwrap(), TaskQueue::new(1))
    }

    fn reply(outcome: DispatchOutcome) -> String {
        match outcome {
            DispatchOutcome::Reply(s) | DispatchOutcome::Close(s) => s,
        }
    }

    #[test]
    fn basic_set_get_del() {
        let (shards, queue) = harness();
        assert_eq!(reply(dispatch("SET foo bar", &shards, &queue)), "OK\n");
        assert_eq!(reply(dispatch("GET foo", &shards, &queue)), "bar\n");
        assert_eq!(reply(dispatch("DEL foo", &shards, &queue)), "OK\n");
        assert_eq!(reply(dispatch("GET foo", &shards, &queue)), "(nil)\n");
    }

    #[test]
    fn unknown_command_errors() {
        let (shards, queue) = harness();
        let resp = reply(dispatch("NOPE", &shards, &queue));
        assert!(resp.starts_with("ERR"));
    }

    #[test]
    fn wrong_arity_errors() {
        let (shards, queue) = harness();
        let resp = reply(dispatch("GET", &shards, &queue));
        assert!(resp.contains("wrong number of arguments"));
    }

    #[test]
    fn list_roundtrip() {
        let (shards, queue) = harness();
        dispatch("LPUSH nums 1", &shards, &queue);
        dispatch("LPUSH nums 2", &shards, &queue);
        dispatch("RPUSH nums 3", &shards, &queue);

        assert_eq!(reply(dispatch("LRANGE nums 0 -1", &shards, &queue)), "2\n1\n3\n");
        assert_eq!(reply(dispatch("LLEN nums", &shards, &queue)), "3\n");
    }

    #[test]
    fn wrongtype_reports_wrongtype() {
        let (shards, queue) = harness();
        dispatch("SET s hello", &shards, &queue);
        let resp = reply(dispatch("LPUSH s x", &shards, &queue));
        assert!(resp.contains("WRONGTYPE"));
    }

    #[test]
    fn quit_closes() {
        let (shards, queue) = harness();
        assert!(matches!(dispatch("QUIT", &shards, &queue), DispatchOutcome::Close(_)));
    }
}
