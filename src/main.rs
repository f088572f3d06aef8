//! tcp-native echo server
//!
//! A small echo service wired through the whole support layer: every
//! accepted connection gets a service record and a session, its work runs on
//! a worker pool, and every read is drained through a bounded read buffer.

use std::io;
use std::sync::Arc;
use std::time::Duration;
use tcp_native::buffer::{ReadBuffer, DEFAULT_READ_BUFFER_SIZE};
use tcp_native::error::{ErrorKind, TcpResult};
use tcp_native::pool::{shutdown_gracefully_until, Interrupt, PoolConfig, WorkerPool};
use tcp_native::session::{create_session, ConnectionSession, ServiceRecord};
use tokio::net::{TcpListener, TcpStream};
use tokio::signal;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// First pause after a failed accept
const ACCEPT_BACKOFF_BASE: Duration = Duration::from_millis(10);

/// Longest pause between accept attempts while accept keeps failing
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Connections served at once
    workers: usize,
    /// Per-connection read buffer bound
    buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7000,
            workers: PoolConfig::default().workers,
            buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    config.host = value_of(&args, i, "--host").to_string();
                    i += 2;
                }
                "--port" | "-p" => {
                    config.port = parse_value(&args, i, "--port");
                    i += 2;
                }
                "--workers" | "-w" => {
                    config.workers = parse_value(&args, i, "--workers");
                    i += 2;
                }
                "--buffer-size" | "-b" => {
                    config.buffer_size = parse_value(&args, i, "--buffer-size");
                    if config.buffer_size == 0 {
                        eprintln!("Error: --buffer-size must be greater than 0");
                        std::process::exit(1);
                    }
                    i += 2;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("tcp-native version {}", tcp_native::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> &'a str {
    match args.get(i + 1) {
        Some(value) => value,
        None => {
            eprintln!("Error: {} requires a value", flag);
            std::process::exit(1);
        }
    }
}

fn parse_value<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> T {
    value_of(args, i, flag).parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value for {}", flag);
        std::process::exit(1);
    })
}

fn print_help() {
    println!(
        r#"
tcp-native echo server

USAGE:
    tcp-native-echo [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>          Port to listen on (default: 7000)
    -w, --workers <N>          Connections served at once (default: CPU count)
    -b, --buffer-size <BYTES>  Read buffer size per connection (default: 8192)
    -v, --version              Print version information
        --help                 Print this help message

SHUTDOWN:
    Ctrl+C once     stop accepting, let open connections finish (up to 1 minute)
    Ctrl+C again    cancel open connections immediately
"#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let pool = WorkerPool::new(PoolConfig {
        name: "echo".to_string(),
        workers: config.workers,
        ..Default::default()
    });

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    tokio::select! {
        _ = accept_loop(listener, pool.clone(), config.buffer_size) => {}
        result = signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received, draining connections...");
        }
    }

    // A second Ctrl+C cuts the graceful phase short
    let interrupt = Interrupt::new();
    {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("Second shutdown signal received, cancelling connections");
                interrupt.raise();
            }
        });
    }

    shutdown_gracefully_until(&pool, &interrupt).await;

    info!(state = %pool.state(), "Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(listener: TcpListener, pool: WorkerPool, buffer_size: usize) {
    let mut failures = 0u32;
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                failures = 0;
                let record = Arc::new(ServiceRecord::new());

                // Accept hook: a stream that cannot be configured is never attached
                match stream.set_nodelay(true) {
                    Ok(()) => {
                        record.attach_channel(stream);
                    }
                    Err(e) => warn!(client = %addr, error = %e, "Failed to configure socket"),
                }

                let session = create_session(&record);
                if let Err(e) = pool.submit(serve(session, buffer_size)) {
                    warn!(client = %addr, error = %e, "Connection rejected");
                }
            }
            Err(e) => {
                // Persistent errors (e.g. out of file descriptors) would otherwise spin
                failures = failures.saturating_add(1);
                let pause = accept_backoff(failures);
                error!(
                    error = %e,
                    failures = failures,
                    pause_ms = pause.as_millis(),
                    "Failed to accept connection"
                );
                tokio::time::sleep(pause).await;
            }
        }
    }
}

/// Pause before the next accept after `failures` consecutive errors.
fn accept_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(16);
    ACCEPT_BACKOFF_BASE
        .saturating_mul(1 << shift)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Serves one session until the client disconnects.
async fn serve(session: ConnectionSession, buffer_size: usize) {
    let (Some(channel), Some(id), Some(client)) =
        (session.channel(), session.id(), session.remote_addr())
    else {
        debug!("Session has no channel, nothing to serve");
        return;
    };

    info!(id = %id, client = %client, "Client connected");

    match echo(channel, buffer_size).await {
        Ok(bytes) => info!(id = %id, client = %client, bytes = bytes, "Client disconnected"),
        Err(e) if e.is(ErrorKind::ConnectionClosed) => {
            debug!(id = %id, client = %client, "Connection reset by client")
        }
        Err(e) => warn!(id = %id, client = %client, error = %e, "Connection error"),
    }
}

/// Echoes every read back to the client. Returns the number of bytes echoed.
async fn echo(stream: &TcpStream, buffer_size: usize) -> TcpResult<u64> {
    let mut buffer = ReadBuffer::with_capacity(buffer_size);
    let mut total = 0u64;

    loop {
        stream.readable().await?;
        match buffer.try_fill_from(stream) {
            Ok(0) => return Ok(total),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e.into()),
        }

        let payload = buffer.take_written();
        write_all(stream, &payload).await?;
        total += payload.len() as u64;
    }
}

async fn write_all(stream: &TcpStream, mut data: &[u8]) -> io::Result<()> {
    while !data.is_empty() {
        stream.writable().await?;
        match stream.try_write(data) {
            Ok(n) => data = &data[n..],
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_backoff_grows_then_caps() {
        assert_eq!(accept_backoff(1), ACCEPT_BACKOFF_BASE);
        assert_eq!(accept_backoff(2), ACCEPT_BACKOFF_BASE * 2);
        assert_eq!(accept_backoff(3), ACCEPT_BACKOFF_BASE * 4);
        assert!(accept_backoff(5) > accept_backoff(4));

        assert_eq!(accept_backoff(8), ACCEPT_BACKOFF_MAX);
        assert_eq!(accept_backoff(u32::MAX), ACCEPT_BACKOFF_MAX);
    }
}
