use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

use lunarkv_client::{ClientConfig, KVClient};

fn spawn_server(expected_commands: usize, handler: fn(usize, Vec<u8>, &mut TcpStream)) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let mut reader = BufReader::new(stream.try_clone().expect("clone"));
        for idx in 0..expected_commands {
            let mut line = Vec::new();
            reader.read_until(b'\n', &mut line).expect("read command");
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            handler(idx, line, &mut stream);
        }
    });

    addr
}

fn write_line(stream: &mut TcpStream, line: &str) {
    let _ = stream.write_all(line.as_bytes());
    let _ = stream.write_all(b"\n");
    let _ = stream.flush();
}

fn client_with_addr(addr: String) -> KVClient {
    let config = ClientConfig {
        addr,
        max_idle: 1,
        max_total: 1,
        read_timeout: Some(Duration::from_secs(1)),
        write_timeout: Some(Duration::from_secs(1)),
        connect_timeout: Some(Duration::from_secs(1)),
    };
    KVClient::with_config(config).expect("client")
}

#[test]
fn client_set_get_roundtrip() {
    let addr = spawn_server(2, |idx, line, stream| {
        if idx == 0 {
            assert_eq!(line, b"SET key value");
            write_line(stream, "OK");
        } else {
            assert_eq!(line, b"GET key");
            write_line(stream, "value");
        }
    });

    let client = client_with_addr(addr);
    client.set(b"key", b"value").expect("set");
    let value = client.get(b"key").expect("get");
    assert_eq!(value, Some(b"value".to_vec()));
}

#[test]
fn client_delete_and_missing_get() {
    let addr = spawn_server(2, |idx, line, stream| {
        if idx == 0 {
            assert_eq!(line, b"DEL key");
            write_line(stream, "OK");
        } else {
            assert_eq!(line, b"GET key");
            write_line(stream, "(nil)");
        }
    });

    let client = client_with_addr(addr);
    assert!(client.delete(b"key").expect("delete"));
    assert_eq!(client.get(b"key").expect("get"), None);
}

#[test]
fn client_mget_reads_one_line_per_key() {
    let addr = spawn_server(1, |_idx, line, stream| {
        assert_eq!(line, b"MGET a b c");
        let _ = stream.write_all(b"1\n(nil)\n3\n");
        let _ = stream.flush();
    });

    let client = client_with_addr(addr);
    let values = client.mget(&[b"a", b"b", b"c"]).expect("mget");
    assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
}

#[test]
fn client_surfaces_server_errors() {
    let addr = spawn_server(1, |_idx, line, stream| {
        assert_eq!(line, b"LPUSH s x");
        write_line(stream, "ERR WRONGTYPE operation against the wrong kind of entry");
    });

    let client = client_with_addr(addr);
    let err = client.lpush(b"s", b"x").unwrap_err();
    assert!(err.to_string().contains("WRONGTYPE"));
}

#[test]
fn client_ping() {
    let addr = spawn_server(1, |_idx, line, stream| {
        assert_eq!(line, b"PING");
        write_line(stream, "PONG!");
    });

    let client = client_with_addr(addr);
    assert!(client.ping().expect("ping"));
}
