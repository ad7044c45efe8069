//! Grab Game - headless game process
//!
//! Runs the fixed-rate tick loop, reads the optional serial controller,
//! takes operator commands on stdin and relays finished rounds to the
//! scoreboard.

use std::error::Error;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Instant;

use grab_game::Settings;
use grab_game::controller::Controller;
use grab_game::hud::HudSnapshot;
use grab_game::input::{InputNormalizer, Key, KeyBindings, KeyboardState, PlayerId, TickInput};
use grab_game::relay::RelayServer;
use grab_game::sim::{Game, GamePhase};

/// Operator commands accepted on stdin.
///
/// `down <key>` holds a key until `up <key>`, so the keyboard movement
/// bindings (`w`, `up`, `kp4`, ...) work from the console. `stop` lets go
/// of every held key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConsoleCommand {
    Ready(PlayerId),
    Grab(PlayerId),
    Toggle(PlayerId),
    Hold(Key),
    Release(Key),
    ReleaseAll,
    Quit,
}

impl ConsoleCommand {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim().to_ascii_lowercase();
        let mut words = line.split_whitespace();
        let first = words.next()?;
        if let Some(name) = words.next() {
            if words.next().is_some() {
                return None;
            }
            let key = Key::from_name(name)?;
            return match first {
                "down" | "hold" => Some(ConsoleCommand::Hold(key)),
                "up" | "release" => Some(ConsoleCommand::Release(key)),
                _ => None,
            };
        }

        let cmd = match first {
            "ready1" => ConsoleCommand::Ready(PlayerId::One),
            "ready2" => ConsoleCommand::Ready(PlayerId::Two),
            "grab1" => ConsoleCommand::Grab(PlayerId::One),
            "grab2" => ConsoleCommand::Grab(PlayerId::Two),
            "toggle1" => ConsoleCommand::Toggle(PlayerId::One),
            "toggle2" => ConsoleCommand::Toggle(PlayerId::Two),
            "stop" => ConsoleCommand::ReleaseAll,
            "quit" | "exit" => ConsoleCommand::Quit,
            _ => return None,
        };
        Some(cmd)
    }
}

/// Forward stdin lines as commands; EOF counts as quit
fn spawn_console(shutdown: Arc<AtomicBool>) -> std::io::Result<Receiver<ConsoleCommand>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match ConsoleCommand::parse(&line) {
                    Some(cmd) => {
                        if tx.send(cmd).is_err() {
                            return;
                        }
                    }
                    None => log::warn!("Unknown command {:?}", line.trim()),
                }
            }
            log::info!("Console closed");
            shutdown.store(true, Ordering::Relaxed);
        })?;
    Ok(rx)
}

/// Turn queued console commands into this tick's key events.
/// Returns the toggles, which have no key binding.
fn apply_console(
    commands: &Receiver<ConsoleCommand>,
    keys: &mut KeyboardState,
    shutdown: &AtomicBool,
) -> [bool; 2] {
    let mut toggles = [false; 2];
    loop {
        match commands.try_recv() {
            Ok(ConsoleCommand::Ready(id)) => tap(keys, KeyBindings::for_player(id).ready),
            Ok(ConsoleCommand::Grab(id)) => tap(keys, KeyBindings::for_player(id).grab),
            Ok(ConsoleCommand::Toggle(id)) => toggles[id.index()] = true,
            Ok(ConsoleCommand::Hold(key)) => keys.key_down(key),
            Ok(ConsoleCommand::Release(key)) => keys.key_up(key),
            Ok(ConsoleCommand::ReleaseAll) => keys.release_all(),
            Ok(ConsoleCommand::Quit) => shutdown.store(true, Ordering::Relaxed),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
    toggles
}

fn tap(keys: &mut KeyboardState, key: Key) {
    keys.key_down(key);
    keys.key_up(key);
}

fn print_hud(game: &Game) {
    for line in HudSnapshot::capture(game).lines() {
        println!("{}", line);
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    log::info!("Grab Game starting...");

    let settings = Settings::load()?;
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut relay = match RelayServer::bind(
        settings.bind_addr.as_str(),
        settings.server_options(),
        Arc::clone(&shutdown),
    ) {
        Ok(server) => Some(server),
        Err(e) => {
            log::error!("{}. Score relay disabled for this session.", e);
            None
        }
    };

    let mut controller = match &settings.controller_path {
        Some(path) => match Controller::open(
            path,
            settings.controller_baud,
            settings.controller_max_age(),
        ) {
            Ok(controller) => {
                log::info!("Controller opened on {}", path);
                Some(controller)
            }
            Err(e) => {
                log::warn!("{}. Using keyboard controls.", e);
                None
            }
        },
        None => {
            log::info!("No controller configured. Using keyboard controls.");
            None
        }
    };

    let commands = spawn_console(Arc::clone(&shutdown))?;

    let seed = settings.seed_or_random();
    log::info!("Game initialized with seed: {}", seed);
    let mut game = Game::new(seed, settings.round_timings());
    let mut normalizer = InputNormalizer::default();
    let mut keys = KeyboardState::new();

    let tick = settings.tick_interval();
    let started = Instant::now();
    let mut last_ms = 0u64;
    let mut next_tick = started;
    let mut last_clock = String::new();

    print_hud(&game);

    while !shutdown.load(Ordering::Relaxed) {
        let now = Instant::now();
        let now_ms = now.duration_since(started).as_millis() as u64;
        let dt_ms = now_ms - last_ms;
        last_ms = now_ms;

        let toggles = apply_console(&commands, &mut keys, &shutdown);
        let sample = controller.as_mut().and_then(|c| c.poll(now));
        let mut input: TickInput = normalizer.normalize(sample.as_ref(), &keys);
        keys.end_tick();
        for id in PlayerId::ALL {
            input.player_mut(id).toggle_ready |= toggles[id.index()];
        }
        if input.quit {
            shutdown.store(true, Ordering::Relaxed);
        }

        let ready_before = game.ready;
        let transition = game.update(&input, now_ms, dt_ms, &mut relay);

        if let Some(t) = transition {
            if t.to == GamePhase::Playing {
                last_clock.clear();
            }
            print_hud(&game);
        } else if game.ready != ready_before {
            print_hud(&game);
        } else if game.phase == GamePhase::Playing {
            let hud = HudSnapshot::capture(&game);
            if hud.clock_text != last_clock {
                last_clock = hud.clock_text.clone();
                print_hud(&game);
            }
        }

        next_tick += tick;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            // Fell behind: skip the missed ticks
            next_tick = now;
        }
    }

    log::info!("Shutting down");
    if let Some(mut server) = relay.take() {
        server.shutdown();
    }
    Ok(())
}
