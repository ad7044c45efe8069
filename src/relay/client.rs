//! Scoreboard-side relay client
//!
//! A worker thread keeps one outbound connection to the game process alive,
//! feeds received records into a [`Scoreboard`] and publishes the ranked
//! view into shared standings.

use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::{LineBuffer, decode_line};
use crate::scoreboard::{Scoreboard, SharedStandings};

/// Longest single sleep while waiting to reconnect
const PAUSE_SLICE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub connect_timeout: Duration,
    /// Blocking read timeout; bounds how long shutdown goes unnoticed
    pub read_timeout: Duration,
    /// Wait after a failed connect
    pub retry_delay: Duration,
    /// Wait after a socket error on an established connection
    pub error_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(1),
            retry_delay: Duration::from_secs(2),
            error_delay: Duration::from_secs(1),
        }
    }
}

/// Accept `host`, `ip` or `host:port`; bare hosts get `default_port`
pub fn with_default_port(input: &str, default_port: u16) -> String {
    let input = input.trim();
    if input.parse::<SocketAddr>().is_ok() {
        return input.to_string();
    }
    if let Ok(ip) = input.parse::<IpAddr>() {
        return SocketAddr::new(ip, default_port).to_string();
    }
    if input.contains(':') {
        input.to_string()
    } else {
        format!("{}:{}", input, default_port)
    }
}

pub struct ScoreboardClient {
    server: String,
    options: ClientOptions,
    scoreboard: Scoreboard,
    standings: SharedStandings,
    shutdown: Arc<AtomicBool>,
}

impl ScoreboardClient {
    pub fn new(
        server: impl Into<String>,
        options: ClientOptions,
        standings: SharedStandings,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            server: server.into(),
            options,
            scoreboard: Scoreboard::new(),
            standings,
            shutdown,
        }
    }

    /// Run the connection loop on its own thread
    pub fn spawn(self) -> io::Result<JoinHandle<Scoreboard>> {
        thread::Builder::new()
            .name("scoreboard-client".into())
            .spawn(move || self.run())
    }

    /// Connect, read and reconnect until shutdown. Returns the full history.
    pub fn run(mut self) -> Scoreboard {
        let mut buffer = LineBuffer::new();
        let mut chunk = [0u8; 4096];

        while !self.stopping() {
            let mut stream = match self.connect() {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!(
                        "Could not connect to game server {}: {}. Retrying in {:?}",
                        self.server,
                        e,
                        self.options.retry_delay
                    );
                    self.pause(self.options.retry_delay);
                    continue;
                }
            };
            log::info!("Connected to game server at {}", self.server);
            buffer.clear();

            while !self.stopping() {
                match stream.read(&mut chunk) {
                    Ok(0) => {
                        log::warn!(
                            "Game server closed the connection. Reconnecting in {:?}",
                            self.options.retry_delay
                        );
                        self.pause(self.options.retry_delay);
                        break;
                    }
                    Ok(n) => {
                        for line in buffer.push(&chunk[..n]) {
                            self.handle_line(&line);
                        }
                    }
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::WouldBlock
                                | io::ErrorKind::TimedOut
                                | io::ErrorKind::Interrupted
                        ) => {}
                    Err(e) => {
                        log::warn!("Socket error: {}. Reconnecting...", e);
                        self.pause(self.options.error_delay);
                        break;
                    }
                }
            }
        }

        log::info!("Scoreboard client stopped");
        self.scoreboard
    }

    fn stopping(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    fn connect(&self) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in self.server.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, self.options.connect_timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(self.options.read_timeout))?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "address resolved to nothing")
        }))
    }

    fn handle_line(&mut self, line: &str) {
        match decode_line(line) {
            Ok(record) => {
                log::info!("Received score {} at {}", record.score, record.timestamp);
                let rows = self.scoreboard.push(record);
                *self.standings.lock() = rows;
            }
            Err(e) => log::warn!("Skipping record {:?}: {}", line, e),
        }
    }

    /// Sleep in short slices so shutdown is noticed
    fn pause(&self, total: Duration) {
        let deadline = Instant::now() + total;
        while !self.stopping() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(PAUSE_SLICE));
        }
    }
}
