//! tcpclient - a minimal one-shot TCP client.
//!
//! Connects to a host and port, sends one line of text, waits a bounded time
//! for a reply, and prints the reply decoded with a configurable encoding.

mod client;
mod config;
mod encoding;
mod error;

use clap::Parser;
use client::{Session, Target};
use config::{Config, Overrides, SessionSettings};
use encoding::TextEncoding;
use error::ClientError;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tcpclient")]
#[command(author, version, about = "A minimal one-shot TCP client")]
#[command(long_about = "Connects to ADDRESS:PORT, sends one line of text (from --message or stdin), \
waits for a single reply and prints it.\n\nWith --interactive, keeps the connection open and sends \
each line typed at the prompt. Press ESC or Ctrl+C to quit.")]
struct Cli {
    /// Address or hostname of the TCP server
    #[arg(value_name = "ADDRESS")]
    address: String,

    /// Port of the TCP server
    #[arg(value_name = "PORT", value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Receive buffer size in bytes [default: 1024]
    #[arg(short = 's', long = "size", value_name = "SIZE", value_parser = config::parse_buffer_size)]
    size: Option<usize>,

    /// Timeout of the connection and of the receive, in seconds [default: 5]
    #[arg(short = 't', long, value_name = "TIMEOUT", value_parser = config::parse_timeout)]
    timeout: Option<Duration>,

    /// Encoding used for outgoing and incoming text [default: utf-8]
    #[arg(short = 'e', long, value_name = "ENCODING", value_parser = parse_encoding)]
    encoding: Option<TextEncoding>,

    /// Payload to send instead of reading a line from stdin
    #[arg(short = 'm', long, value_name = "MESSAGE", conflicts_with = "interactive")]
    message: Option<String>,

    /// Keep the connection open and send each line typed at the prompt
    #[arg(short = 'i', long)]
    interactive: bool,

    /// Read defaults from this config file instead of the standard location
    #[arg(short = 'c', long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Log debug details to stderr
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn parse_encoding(s: &str) -> Result<TextEncoding, String> {
    TextEncoding::from_label(s).map_err(|e| e.to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Initialize logging. Everything goes to stderr so stdout carries only the reply.
fn init_logging(verbose: bool) {
    let directive = if verbose {
        "tcpclient=debug"
    } else {
        "tcpclient=info"
    };
    let filter = match directive.parse::<Directive>() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    // Validate everything before touching the network.
    let target = Target::new(&cli.address, cli.port)?;
    let config =
        Config::load(cli.config.as_deref()).map_err(|e| ClientError::Config(format!("{:#}", e)))?;
    let overrides = Overrides {
        buffer_size: cli.size,
        timeout: cli.timeout,
        encoding: cli.encoding,
    };
    let settings = SessionSettings::resolve(overrides, &config)?;
    debug!(
        "Session settings: buffer {} bytes, timeout {:?}, encoding {}",
        settings.buffer_size, settings.timeout, settings.encoding
    );

    if cli.interactive {
        client::console::ensure_terminal()?;
        let mut session = interruptible(Session::connect(&target, settings.timeout)).await?;
        let result = client::run_console(&mut session, &settings).await;
        session.close().await;
        return result;
    }

    let text = match cli.message {
        Some(message) => message,
        None => read_payload_line().await?,
    };
    let payload = settings.encoding.encode(&text);

    let mut session = interruptible(Session::connect(&target, settings.timeout)).await?;
    let reply = interruptible(session.send_receive(
        &payload,
        settings.timeout,
        settings.buffer_size,
    ))
    .await;
    session.close().await;

    print_reply(&settings.encoding.decode(&reply?))
}

/// Read one line from stdin, without its line terminator.
async fn read_payload_line() -> Result<String, ClientError> {
    if atty::is(atty::Stream::Stdin) {
        info!("Type the payload and press Enter");
    }

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|e| ClientError::Argument(format!("failed to read payload from stdin: {}", e)))?;

    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
    let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
    Ok(trimmed.to_string())
}

fn print_reply(text: &str) -> Result<(), ClientError> {
    let mut out = text.to_string();
    if !out.ends_with('\n') {
        out.push('\n');
    }
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(out.as_bytes()).map_err(ClientError::Terminal)?;
    stdout.flush().map_err(ClientError::Terminal)
}

/// Race a blocking step against Ctrl+C.
async fn interruptible<T>(
    step: impl std::future::Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    tokio::select! {
        result = step => result,
        _ = tokio::signal::ctrl_c() => {
            info!("CTRL+C pressed, aborting");
            Err(ClientError::Interrupted)
        }
    }
}
