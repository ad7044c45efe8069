//! Game phases and the round state machine
//!
//! MainMenu → Countdown → Playing → GameOver → MainMenu. Transitions are the
//! only place where rounds reset and scores are dispatched.

use serde::{Deserialize, Serialize};

use super::tick::{StepReport, step};
use super::timer::{TimerId, TimerManager};
use super::world::SimulationWorld;
use crate::consts::*;
use crate::input::{PlayerId, TickInput};
use crate::relay::{ScoreRecord, ScoreSink};

/// Current phase of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Waiting for both players to ready up
    MainMenu,
    /// Short pre-round countdown
    Countdown,
    /// Round in progress
    Playing,
    /// Final scores on screen until the auto-return timer fires
    GameOver,
}

/// Durations that shape a round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundTimings {
    pub countdown_secs: f32,
    pub round_secs: f32,
    pub item_spawn_interval_ms: u64,
    pub game_over_delay_ms: u64,
}

impl Default for RoundTimings {
    fn default() -> Self {
        Self {
            countdown_secs: COUNTDOWN_SECS,
            round_secs: ROUND_SECS,
            item_spawn_interval_ms: ITEM_SPAWN_INTERVAL_MS,
            game_over_delay_ms: GAME_OVER_RESET_DELAY_MS,
        }
    }
}

/// Round clock counting down by elapsed real time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchClock {
    /// Seconds left, never negative
    pub time_left: f32,
    pub running: bool,
}

impl MatchClock {
    pub fn new(total_secs: f32) -> Self {
        Self {
            time_left: total_secs,
            running: true,
        }
    }

    pub fn advance(&mut self, dt_ms: u64) {
        if !self.running {
            return;
        }
        self.time_left -= dt_ms as f32 / 1000.0;
        if self.time_left <= 0.0 {
            self.time_left = 0.0;
            self.running = false;
        }
    }
}

/// A phase change, reported by `Game::update`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: GamePhase,
    pub to: GamePhase,
}

/// Complete game: phase, timers, ready flags and the world
#[derive(Debug, Clone)]
pub struct Game {
    pub phase: GamePhase,
    pub world: SimulationWorld,
    pub timers: TimerManager,
    pub clock: MatchClock,
    /// Menu ready flags per player
    pub ready: [bool; 2],
    pub timings: RoundTimings,
    countdown_started_ms: u64,
    countdown_remaining: f32,
    /// Record sent when the last round ended
    last_record: Option<ScoreRecord>,
    /// Report from the most recent playing tick
    last_step: StepReport,
}

impl Game {
    pub fn new(seed: u64, timings: RoundTimings) -> Self {
        Self {
            phase: GamePhase::MainMenu,
            world: SimulationWorld::new(seed),
            timers: TimerManager::new(),
            clock: MatchClock::new(timings.round_secs),
            ready: [false; 2],
            timings,
            countdown_started_ms: 0,
            countdown_remaining: timings.countdown_secs,
            last_record: None,
            last_step: StepReport::default(),
        }
    }

    pub fn is_ready(&self, id: PlayerId) -> bool {
        self.ready[id.index()]
    }

    /// Countdown digit to display (ceil of remaining, never below 1)
    pub fn countdown_display(&self) -> Option<u32> {
        (self.phase == GamePhase::Countdown)
            .then(|| (self.countdown_remaining.ceil() as u32).max(1))
    }

    pub fn last_record(&self) -> Option<&ScoreRecord> {
        self.last_record.as_ref()
    }

    pub fn last_step(&self) -> &StepReport {
        &self.last_step
    }

    /// Advance the state machine by one tick.
    ///
    /// `now_ms` is the wall clock in milliseconds and `dt_ms` the time since
    /// the previous tick. Finished rounds are handed to `sink`.
    pub fn update(
        &mut self,
        input: &TickInput,
        now_ms: u64,
        dt_ms: u64,
        sink: &mut dyn ScoreSink,
    ) -> Option<Transition> {
        let from = self.phase;
        match self.phase {
            GamePhase::MainMenu => {
                for id in PlayerId::ALL {
                    let cmd = input.player(id);
                    let ready = &mut self.ready[id.index()];
                    if cmd.toggle_ready {
                        *ready = !*ready;
                    }
                    if cmd.ready {
                        *ready = true;
                    }
                }
                if self.ready.iter().all(|r| *r) {
                    self.enter_countdown(now_ms);
                }
            }
            GamePhase::Countdown => {
                let elapsed = now_ms.saturating_sub(self.countdown_started_ms) as f32 / 1000.0;
                self.countdown_remaining = self.timings.countdown_secs - elapsed;
                if self.countdown_remaining <= 0.0 {
                    self.phase = GamePhase::Playing;
                }
            }
            GamePhase::Playing => {
                self.clock.advance(dt_ms);
                if self.clock.running {
                    self.last_step = step(
                        &mut self.world,
                        &mut self.timers,
                        input,
                        now_ms,
                        self.timings.item_spawn_interval_ms,
                    );
                } else {
                    self.finish_round(now_ms, sink);
                }
            }
            GamePhase::GameOver => {
                if self.timers.check_once(TimerId::GameOverReset, now_ms) {
                    self.return_to_menu();
                }
            }
        }

        let to = self.phase;
        (from != to).then(|| {
            log::info!("Game phase {:?} -> {:?}", from, to);
            Transition { from, to }
        })
    }

    /// Fresh round state: entities, baskets, clock and every timer
    fn reset_round(&mut self) {
        self.world.reset();
        self.timers.clear();
        self.clock = MatchClock::new(self.timings.round_secs);
        self.last_step = StepReport::default();
    }

    fn enter_countdown(&mut self, now_ms: u64) {
        self.reset_round();
        self.phase = GamePhase::Countdown;
        self.countdown_started_ms = now_ms;
        self.countdown_remaining = self.timings.countdown_secs;
    }

    fn finish_round(&mut self, now_ms: u64, sink: &mut dyn ScoreSink) {
        self.phase = GamePhase::GameOver;
        let record = ScoreRecord::stamped_now(i64::from(self.world.total_score()));
        log::info!(
            "Round over: blue {} red {} total {}",
            self.world.baskets[0].score,
            self.world.baskets[1].score,
            record.score
        );
        sink.dispatch(&record);
        self.last_record = Some(record);
        self.timers
            .set(TimerId::GameOverReset, now_ms, self.timings.game_over_delay_ms);
    }

    fn return_to_menu(&mut self) {
        self.reset_round();
        self.ready = [false; 2];
        self.phase = GamePhase::MainMenu;
    }
}
