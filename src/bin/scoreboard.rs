//! Scoreboard display process
//!
//! Usage: `scoreboard [host[:port]]`. Without an argument the operator is
//! asked for the game server address.

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use grab_game::Settings;
use grab_game::relay::ScoreboardClient;
use grab_game::relay::client::with_default_port;
use grab_game::scoreboard::{SharedStandings, render_table};

/// Display refresh interval
const REFRESH: Duration = Duration::from_millis(100);

fn prompt_for_address() -> io::Result<String> {
    print!("Enter game server IP: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// `quit` on stdin stops the display
fn spawn_console(shutdown: Arc<AtomicBool>) -> io::Result<()> {
    thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if matches!(line.trim(), "quit" | "exit") {
                    shutdown.store(true, Ordering::Relaxed);
                    break;
                }
            }
        })?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let settings = Settings::load()?;
    let input = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => prompt_for_address()?,
    };
    if input.is_empty() {
        return Err("no game server address given".into());
    }
    let server = with_default_port(&input, settings.relay_port()?);
    log::info!("Scoreboard starting, game server {}", server);

    let shutdown = Arc::new(AtomicBool::new(false));
    let standings: SharedStandings = Arc::new(Mutex::new(Vec::new()));
    let worker = ScoreboardClient::new(
        server,
        settings.client_options(),
        Arc::clone(&standings),
        Arc::clone(&shutdown),
    )
    .spawn()?;
    spawn_console(Arc::clone(&shutdown))?;

    println!("{}", render_table(&[]));
    let mut shown = Vec::new();
    while !shutdown.load(Ordering::Relaxed) {
        // Copy out; never hold the lock while drawing
        let current = standings.lock().clone();
        if current != shown {
            println!("{}", render_table(&current));
            shown = current;
        }
        thread::sleep(REFRESH);
    }

    match worker.join() {
        Ok(board) => log::info!("Scoreboard closed after {} rounds", board.len()),
        Err(_) => log::error!("Scoreboard client thread panicked"),
    }
    Ok(())
}
