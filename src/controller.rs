//! Physical controller link
//!
//! The controller streams one line of ten comma-separated integers per
//! sample over a serial device. Reads can block, so a reader thread owns the
//! device and forwards raw lines over a channel; the tick loop drains it
//! without ever waiting.

use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::input::ControllerSample;

/// Line speed of the controller firmware
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Serial read timeout; the reader thread retries after each one
const READ_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("could not open controller device {path} at {baud_rate} baud: {source}")]
    Open {
        path: String,
        baud_rate: u32,
        #[source]
        source: serialport::Error,
    },

    #[error("could not start controller reader: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Non-blocking view of the controller stream
pub struct Controller {
    lines: Receiver<String>,
    latest: Option<(ControllerSample, Instant)>,
    max_age: Duration,
    connected: bool,
}

impl Controller {
    /// Open a serial device at the given line speed
    pub fn open(path: &str, baud_rate: u32, max_age: Duration) -> Result<Self, ControllerError> {
        let port = serialport::new(path, baud_rate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|source| ControllerError::Open {
                path: path.to_string(),
                baud_rate,
                source,
            })?;
        log::info!("Controller connected on {} at {} baud", path, baud_rate);
        Self::from_reader(port, max_age)
    }

    /// Spawn a reader thread over an arbitrary byte stream
    pub fn from_reader<R>(reader: R, max_age: Duration) -> Result<Self, ControllerError>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("controller-reader".into())
            .spawn(move || {
                let mut reader = BufReader::new(reader);
                let mut buf = Vec::new();
                loop {
                    // A timeout mid-line leaves the partial line in `buf`
                    match reader.read_until(b'\n', &mut buf) {
                        Ok(0) => break,
                        Ok(_) => {
                            let line = String::from_utf8_lossy(&buf).trim().to_string();
                            buf.clear();
                            if line.is_empty() {
                                continue;
                            }
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(e)
                            if matches!(
                                e.kind(),
                                ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
                            ) =>
                        {
                            continue;
                        }
                        Err(e) => {
                            log::warn!("Controller read failed: {}", e);
                            break;
                        }
                    }
                }
                log::info!("Controller reader stopped");
            })
            .map_err(ControllerError::Spawn)?;

        Ok(Self {
            lines: rx,
            latest: None,
            max_age,
            connected: true,
        })
    }

    /// Whether the reader thread is still delivering lines
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Drain pending lines and return the sample usable this tick.
    ///
    /// A malformed newest line clears the sample, so that tick falls back to
    /// the keyboard. A sample older than `max_age` counts as no sample.
    pub fn poll(&mut self, now: Instant) -> Option<ControllerSample> {
        loop {
            match self.lines.try_recv() {
                Ok(line) => match line.parse::<ControllerSample>() {
                    Ok(sample) => self.latest = Some((sample, now)),
                    Err(e) => {
                        log::debug!("Ignoring controller line {:?}: {}", line, e);
                        self.latest = None;
                    }
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if self.connected {
                        log::warn!("Controller disconnected, using keyboard only");
                        self.connected = false;
                    }
                    self.latest = None;
                    break;
                }
            }
        }

        match self.latest {
            Some((sample, at)) if now.duration_since(at) <= self.max_age => Some(sample),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_reader_thread_reports_end_of_stream() {
        let data = "511,511,511,511,511,511,0,0,0,0\n";
        let mut controller =
            Controller::from_reader(Cursor::new(data.as_bytes().to_vec()), Duration::from_secs(5))
                .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while controller.is_connected() && Instant::now() < deadline {
            controller.poll(Instant::now());
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!controller.is_connected());
        assert!(controller.poll(Instant::now()).is_none());
    }

    fn channel_controller(max_age: Duration) -> (mpsc::Sender<String>, Controller) {
        let (tx, rx) = mpsc::channel();
        let controller = Controller {
            lines: rx,
            latest: None,
            max_age,
            connected: true,
        };
        (tx, controller)
    }

    #[test]
    fn test_newest_line_wins() {
        let (tx, mut controller) = channel_controller(Duration::from_secs(5));
        tx.send("511,511,511,511,511,511,0,0,0,0".to_string()).unwrap();
        tx.send("1023,511,511,511,511,511,0,0,0,0".to_string()).unwrap();

        let sample = controller.poll(Instant::now()).unwrap();
        assert_eq!(sample.sticks[0].x, 1023);
    }

    #[test]
    fn test_malformed_line_means_no_sample() {
        let (tx, mut controller) = channel_controller(Duration::from_secs(5));
        let now = Instant::now();

        tx.send("511,511,511,511,511,511,0,0,0,0".to_string()).unwrap();
        assert!(controller.poll(now).is_some());

        tx.send("511,511,511".to_string()).unwrap();
        assert!(controller.poll(now).is_none());

        tx.send("511,511,511,511,511,511,0,0,0,0".to_string()).unwrap();
        assert!(controller.poll(now).is_some());
    }

    #[test]
    fn test_disconnect_is_reported() {
        let (tx, mut controller) = channel_controller(Duration::from_secs(5));
        drop(tx);
        assert!(controller.poll(Instant::now()).is_none());
        assert!(!controller.is_connected());
    }

    #[test]
    fn test_stale_sample_expires() {
        let (tx, mut controller) = channel_controller(Duration::from_millis(100));
        tx.send("511,511,511,511,511,511,0,0,0,0".to_string()).unwrap();

        let t0 = Instant::now();
        assert!(controller.poll(t0).is_some());
        assert!(controller.poll(t0 + Duration::from_millis(50)).is_some());
        assert!(controller.poll(t0 + Duration::from_millis(150)).is_none());
    }

    #[test]
    fn test_zero_max_age_uses_sample_once() {
        let (tx, mut controller) = channel_controller(Duration::ZERO);
        tx.send("1023,511,511,511,511,511,0,0,0,0".to_string()).unwrap();

        let t0 = Instant::now();
        assert!(controller.poll(t0).is_some());
        assert!(controller.poll(t0 + Duration::from_millis(16)).is_none());
    }

    #[test]
    fn test_open_missing_device_fails() {
        let result = Controller::open(
            "/nonexistent/controller-device",
            DEFAULT_BAUD_RATE,
            Duration::from_millis(100),
        );
        assert!(matches!(
            result,
            Err(ControllerError::Open {
                baud_rate: DEFAULT_BAUD_RATE,
                ..
            })
        ));
    }

    /// Replays scripted reads, then times out like an idle serial port
    struct TimeoutReader {
        chunks: Vec<Result<&'static [u8], ErrorKind>>,
    }

    impl Read for TimeoutReader {
        fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
            if self.chunks.is_empty() {
                thread::sleep(Duration::from_millis(10));
                return Err(ErrorKind::TimedOut.into());
            }
            match self.chunks.remove(0) {
                Ok(bytes) => {
                    out[..bytes.len()].copy_from_slice(bytes);
                    Ok(bytes.len())
                }
                Err(kind) => Err(kind.into()),
            }
        }
    }

    #[test]
    fn test_read_timeouts_keep_partial_lines() {
        let reader = TimeoutReader {
            chunks: vec![
                Err(ErrorKind::TimedOut),
                Ok(b"1023,511,511,"),
                Err(ErrorKind::TimedOut),
                Ok(b"511,511,511,0,0,0,0\n"),
            ],
        };
        let mut controller = Controller::from_reader(reader, Duration::from_secs(5)).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut sample = None;
        while sample.is_none() && Instant::now() < deadline {
            sample = controller.poll(Instant::now());
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(sample.map(|s| s.sticks[0].x), Some(1023));
        assert!(controller.is_connected());
    }
}
