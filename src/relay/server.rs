//! Game-side relay: a background accept loop holding at most one subscriber

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use super::{RelayError, ScoreRecord, ScoreSink, encode_line};

/// Relay server tunables
#[derive(Debug, Clone, Copy)]
pub struct ServerOptions {
    /// Sleep between non-blocking accept attempts (bounds shutdown latency)
    pub poll_interval: Duration,
    /// Longest a score write may stall the caller
    pub write_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            write_timeout: Duration::from_millis(250),
        }
    }
}

/// Result of `RelayServer::send`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Nobody listening; record discarded
    NoSubscriber,
    /// Write failed; subscriber dropped and record discarded
    Dropped,
}

struct Subscriber {
    stream: TcpStream,
    peer: SocketAddr,
}

type SubscriberSlot = Arc<Mutex<Option<Subscriber>>>;

/// Listening relay. Dropping it stops the accept loop.
pub struct RelayServer {
    local_addr: SocketAddr,
    subscriber: SubscriberSlot,
    shutdown: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl RelayServer {
    /// Bind the listener and start the accept loop.
    ///
    /// The loop exits once `shutdown` is set.
    pub fn bind(
        addr: impl ToSocketAddrs + std::fmt::Display,
        options: ServerOptions,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, RelayError> {
        let bind_err = |source: io::Error| RelayError::Bind {
            addr: addr.to_string(),
            source,
        };
        let listener = TcpListener::bind(&addr).map_err(bind_err)?;
        listener.set_nonblocking(true).map_err(bind_err)?;
        let local_addr = listener.local_addr()?;

        let subscriber: SubscriberSlot = Arc::new(Mutex::new(None));
        let worker = {
            let subscriber = Arc::clone(&subscriber);
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("score-relay".into())
                .spawn(move || accept_loop(listener, subscriber, shutdown, options))?
        };

        log::info!("Score relay listening on {}", local_addr);
        Ok(Self {
            local_addr,
            subscriber,
            shutdown,
            worker: Some(worker),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber.lock().is_some()
    }

    pub fn subscriber_addr(&self) -> Option<SocketAddr> {
        self.subscriber.lock().as_ref().map(|s| s.peer)
    }

    /// Fire-and-forget: write one record to the current subscriber, if any.
    /// Never retried, never queued.
    pub fn send(&self, record: &ScoreRecord) -> SendOutcome {
        let line = match encode_line(record) {
            Ok(line) => line,
            Err(e) => {
                log::error!("{}", e);
                return SendOutcome::Dropped;
            }
        };

        let mut slot = self.subscriber.lock();
        let Some(subscriber) = slot.as_mut() else {
            log::info!("No scoreboard connected; score {} not sent", record.score);
            return SendOutcome::NoSubscriber;
        };

        match subscriber
            .stream
            .write_all(&line)
            .and_then(|()| subscriber.stream.flush())
        {
            Ok(()) => {
                log::info!(
                    "Sent score {} ({}) to scoreboard {}",
                    record.score,
                    record.timestamp,
                    subscriber.peer
                );
                SendOutcome::Delivered
            }
            Err(e) => {
                log::warn!(
                    "Sending to scoreboard {} failed: {}. Closing connection.",
                    subscriber.peer,
                    e
                );
                let _ = subscriber.stream.shutdown(Shutdown::Both);
                *slot = None;
                SendOutcome::Dropped
            }
        }
    }

    /// Stop the accept loop and wait for it
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Score relay thread panicked");
            }
        }
        if let Some(subscriber) = self.subscriber.lock().take() {
            let _ = subscriber.stream.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for RelayServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl ScoreSink for RelayServer {
    fn dispatch(&mut self, record: &ScoreRecord) {
        self.send(record);
    }
}

fn accept_loop(
    listener: TcpListener,
    subscriber: SubscriberSlot,
    shutdown: Arc<AtomicBool>,
    options: ServerOptions,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = prepare_stream(&stream, options.write_timeout) {
                    log::warn!("Rejecting scoreboard {}: {}", peer, e);
                    continue;
                }
                log::info!("Scoreboard connected from {}", peer);
                // Last connection wins the slot
                let previous = subscriber.lock().replace(Subscriber { stream, peer });
                if let Some(old) = previous {
                    log::info!("Scoreboard {} replaced by {}", old.peer, peer);
                    let _ = old.stream.shutdown(Shutdown::Both);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(options.poll_interval);
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted
                        | io::ErrorKind::ConnectionAborted
                        | io::ErrorKind::ConnectionReset
                ) =>
            {
                log::debug!("Transient accept error: {}", e);
            }
            Err(e) => {
                log::error!("Score relay accept failed: {}", e);
                break;
            }
        }
    }
    log::info!("Score relay stopped");
}

/// Accepted sockets may inherit non-blocking mode; writes must block briefly instead
fn prepare_stream(stream: &TcpStream, write_timeout: Duration) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_write_timeout(Some(write_timeout))?;
    stream.set_nodelay(true)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::time::Instant;

    fn start() -> RelayServer {
        let options = ServerOptions {
            poll_interval: Duration::from_millis(10),
            ..Default::default()
        };
        RelayServer::bind("127.0.0.1:0", options, Arc::new(AtomicBool::new(false))).unwrap()
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn connect(server: &RelayServer) -> BufReader<TcpStream> {
        let stream = TcpStream::connect(server.local_addr()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let local = stream.local_addr().unwrap();
        assert!(wait_for(|| server.subscriber_addr() == Some(local)));
        BufReader::new(stream)
    }

    #[test]
    fn test_send_without_subscriber_is_silent() {
        let server = start();
        assert_eq!(
            server.send(&ScoreRecord::new(5, "2024-01-01 00:00:00")),
            SendOutcome::NoSubscriber
        );
    }

    #[test]
    fn test_no_backlog_replay() {
        let server = start();
        server.send(&ScoreRecord::new(1, "2024-01-01 00:00:00"));

        let mut reader = connect(&server);
        assert_eq!(
            server.send(&ScoreRecord::new(2, "2024-01-01 00:00:01")),
            SendOutcome::Delivered
        );

        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert_eq!(
            line,
            "{\"score\":2,\"timestamp\":\"2024-01-01 00:00:01\"}\n"
        );
    }

    #[test]
    fn test_new_connection_replaces_subscriber() {
        let server = start();
        let mut first = connect(&server);
        let mut second = connect(&server);

        assert_eq!(
            server.send(&ScoreRecord::new(9, "2024-01-01 00:00:00")),
            SendOutcome::Delivered
        );

        let mut line = String::new();
        second.read_line(&mut line).unwrap();
        assert!(line.contains("\"score\":9"));

        // The replaced subscriber was shut down and sees EOF, not the record
        let mut stale = String::new();
        let n = first.read_line(&mut stale).unwrap_or(0);
        assert_eq!(n, 0);
    }

    #[test]
    fn test_write_failure_drops_subscriber() {
        let server = start();
        let reader = connect(&server);
        drop(reader);

        // The first write after the peer closes may still be buffered locally;
        // keep sending until the broken pipe surfaces.
        let mut dropped = false;
        for i in 0..50 {
            match server.send(&ScoreRecord::new(i, "2024-01-01 00:00:00")) {
                SendOutcome::Dropped => {
                    dropped = true;
                    break;
                }
                SendOutcome::Delivered => thread::sleep(Duration::from_millis(20)),
                SendOutcome::NoSubscriber => panic!("subscriber vanished without a failed write"),
            }
        }
        assert!(dropped);
        assert!(!server.has_subscriber());
        assert_eq!(
            server.send(&ScoreRecord::new(0, "2024-01-01 00:00:00")),
            SendOutcome::NoSubscriber
        );
    }

    #[test]
    fn test_bind_conflict_is_an_error() {
        let server = start();
        let result = RelayServer::bind(
            server.local_addr(),
            ServerOptions::default(),
            Arc::new(AtomicBool::new(false)),
        );
        assert!(matches!(result, Err(RelayError::Bind { .. })));
    }

    #[test]
    fn test_shutdown_stops_accept_loop() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut server = RelayServer::bind(
            "127.0.0.1:0",
            ServerOptions {
                poll_interval: Duration::from_millis(10),
                ..Default::default()
            },
            Arc::clone(&flag),
        )
        .unwrap();

        let started = Instant::now();
        server.shutdown();
        assert!(flag.load(Ordering::Relaxed));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
