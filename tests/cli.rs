//! End-to-end tests driving the compiled binary against local servers.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

/// An empty config file, so a user's own config can't leak into the tests.
/// One fixed path shared by every test and every run.
fn empty_config() -> &'static PathBuf {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        let path = std::env::temp_dir().join("tcpclient-test-empty-config.toml");
        std::fs::write(&path, "").unwrap();
        path
    })
}

fn tcpclient(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tcpclient"));
    cmd.arg("--config").arg(empty_config()).args(args);
    cmd
}

fn run_with_stdin(mut cmd: Command, stdin: &str) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(stdin.as_bytes()).unwrap();
    child.wait_with_output().unwrap()
}

/// Echo server for a single connection. Returns its port and what it received.
fn echo_server() -> (u16, thread::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut buf = [0u8; 4096];
        let n = stream.read(&mut buf).unwrap();
        stream.write_all(&buf[..n]).unwrap();
        // Hold the connection until the client hangs up.
        let _ = stream.read(&mut buf);
        buf[..n].to_vec()
    });
    (port, handle)
}

/// Server that sends fixed bytes as soon as a client connects.
fn greeting_server(greeting: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        let (mut stream, _): (TcpStream, _) = listener.accept().unwrap();
        stream.write_all(greeting).unwrap();
        let mut buf = [0u8; 64];
        let _ = stream.read(&mut buf);
    });
    port
}

#[test]
fn test_echo_scenario_from_stdin() {
    let (port, server) = echo_server();
    let port = port.to_string();
    let output = run_with_stdin(tcpclient(&["127.0.0.1", &port, "-s", "16", "-t", "5"]), "hello\n");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello\n");
    assert_eq!(server.join().unwrap(), b"hello");
}

#[test]
fn test_reply_truncated_to_buffer_size() {
    let (port, _server) = echo_server();
    let port = port.to_string();
    let output = tcpclient(&["-s", "4", "-m", "abcdefghij", "127.0.0.1", &port])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "abcd\n");
}

#[test]
fn test_reply_decoded_with_encoding() {
    let port = greeting_server(&[b'c', b'a', b'f', 0xE9]).to_string();
    let output = run_with_stdin(tcpclient(&["-e", "latin1", "127.0.0.1", &port]), "");

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap(), "café\n");
}

#[test]
fn test_unknown_encoding_fails_before_connecting() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let port = listener.local_addr().unwrap().port().to_string();

    let output = tcpclient(&["-e", "klingon", "-m", "hi", "127.0.0.1", &port])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let err = listener.accept().unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
}

#[test]
fn test_invalid_port_is_an_argument_error() {
    let output = tcpclient(&["127.0.0.1", "0"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));

    let output = tcpclient(&["127.0.0.1", "99999"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_refused_connection_exits_with_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port().to_string();
    drop(listener);

    let started = Instant::now();
    let output = tcpclient(&["-t", "2", "-m", "hi", "127.0.0.1", &port])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    assert!(output.stdout.is_empty());
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_silent_server_exits_after_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port().to_string();
    thread::spawn(move || {
        let (_stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_secs(5));
    });

    let started = Instant::now();
    let output = tcpclient(&["-t", "0.5", "-m", "anyone?", "127.0.0.1", &port])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    assert!(started.elapsed() >= Duration::from_millis(500));
}

#[test]
fn test_help_exits_zero() {
    let output = Command::new(env!("CARGO_BIN_EXE_tcpclient"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let help = String::from_utf8_lossy(&output.stdout);
    assert!(help.contains("--size"));
    assert!(help.contains("--timeout"));
    assert!(help.contains("--encoding"));
}
